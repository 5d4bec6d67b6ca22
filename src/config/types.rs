//! Core configuration types
//!
//! This module defines the data structures that represent an argtree.yml
//! configuration file.

use crate::args::ScalarKind;
use crate::error::Result;
use crate::runner::{
    autocomplete_profile_name, default_profile_name, ArgSpec, ArgSpecs, Command, Commands,
};
use serde::{Deserialize, Serialize};

/// Top-level configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Program name, the first word of every command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Profiles offered when completing `--profile`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_profile: Option<String>,

    #[serde(default)]
    pub commands: Vec<CommandConfig>,
}

/// A command declared in the configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommandConfig {
    #[serde(default)]
    pub namespace: String,

    #[serde(default)]
    pub resource: String,

    #[serde(default)]
    pub verb: String,

    /// One-line description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub short: String,

    /// Whether the command accepts `--wait`
    #[serde(default)]
    pub wait: bool,

    /// Pass the arguments through verbatim
    #[serde(default)]
    pub raw: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<ArgConfig>,
}

/// An argument of a configured command
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ArgConfig {
    /// Argument name, `{index}` and `{key}` placeholders allowed
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub short: String,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub positional: bool,

    #[serde(default, rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Value type, `string` when omitted
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub arg_type: Option<ArgType>,
}

/// Value types an argument can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgType {
    #[serde(alias = "boolean")]
    Bool,
    #[serde(alias = "integer")]
    Int,
    Uint,
    Float,
    String,
    /// Byte size such as `20gb`
    Size,
    /// Profile name, defaulting to the active profile
    Profile,
}

impl From<ArgType> for ScalarKind {
    fn from(arg_type: ArgType) -> Self {
        match arg_type {
            ArgType::Bool => ScalarKind::Bool,
            ArgType::Int => ScalarKind::Signed,
            ArgType::Uint => ScalarKind::Unsigned,
            ArgType::Float => ScalarKind::Float,
            ArgType::String | ArgType::Profile => ScalarKind::String,
            ArgType::Size => ScalarKind::Size,
        }
    }
}

impl Config {
    /// Build the command registry
    pub fn into_commands(self) -> Result<Commands> {
        let commands = self
            .commands
            .iter()
            .map(CommandConfig::to_command)
            .collect();
        Ok(Commands::new(commands)?)
    }
}

impl CommandConfig {
    /// Space separated command path
    pub fn path(&self) -> String {
        [&self.namespace, &self.resource, &self.verb]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn arg_specs(&self) -> ArgSpecs {
        self.args.iter().map(ArgConfig::to_arg_spec).collect()
    }

    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.namespace, &self.resource, &self.verb)
            .short(self.short.clone())
            .arg_specs(self.arg_specs());
        if self.wait {
            command = command.with_wait();
        }
        if self.raw {
            command = command.raw_args();
        }
        command
    }
}

impl ArgConfig {
    pub fn to_arg_spec(&self) -> ArgSpec {
        let mut spec = ArgSpec::new(self.name.clone())
            .short(self.short.clone())
            .enum_values(self.enum_values.clone());
        if self.required {
            spec = spec.required();
        }
        if self.positional {
            spec = spec.positional();
        }
        if let Some(default) = &self.default {
            spec = spec.default_value(default.clone());
        }
        if let Some(arg_type) = self.arg_type {
            spec = spec.kind(arg_type.into());
        }
        if self.arg_type == Some(ArgType::Profile) {
            spec.auto_complete = Some(autocomplete_profile_name());
            if spec.default.is_none() {
                spec.default = Some(default_profile_name());
            }
        }
        spec
    }
}
