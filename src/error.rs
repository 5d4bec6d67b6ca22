//! Error types for argtree

use std::io;
use thiserror::Error;

/// Result type alias for argtree operations
pub type Result<T> = std::result::Result<T, ArgtreeError>;

/// Main error type for argtree
#[derive(Error, Debug)]
pub enum ArgtreeError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Command registry assembly errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Errors raised while running a command line
    #[error("{0}")]
    Command(#[from] CommandError),

    /// Argument unmarshaling errors
    #[error("{0}")]
    Unmarshal(#[from] UnmarshalError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON rendering errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ArgtreeError {
    /// A follow-up suggestion for the user, when one is known
    pub fn hint(&self) -> Option<String> {
        match self {
            ArgtreeError::Command(err) => err.hint(),
            _ => None,
        }
    }
}

/// Configuration parsing and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find config file (searched: {0})")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid argument name '{name}' in command '{command}'")]
    InvalidArgName { command: String, name: String },
}

/// Errors detected while assembling commands and their argument specs.
///
/// These are programming errors in command registration, reported before any
/// user input is processed.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("more than one positional parameter detected: {first} and {second} are flagged as positional arg")]
    MultiplePositional { first: String, second: String },

    #[error("argument '{0}' is declared more than once")]
    DuplicateArgSpec(String),

    #[error("argument '{0}' not found")]
    ArgSpecNotFound(String),

    #[error("command '{0}' is registered more than once")]
    DuplicateCommand(String),

    #[error("argument '{name}' conflicts with argument '{other}'")]
    ConflictingArgSpec { name: String, other: String },
}

/// Errors raised while resolving, validating and running a command line
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("a positional argument is required for this command")]
    PositionalArgumentMissing { hint: String },

    #[error("missing required argument '{0}'")]
    MissingRequiredArgument(String),

    #[error("invalid argument '{name}': {source}")]
    InvalidArgument {
        name: String,
        #[source]
        source: ValidationError,
    },

    #[error("{source}")]
    BadArgument {
        #[source]
        source: UnmarshalError,
        valid: Vec<String>,
    },

    #[error("unknown command '{0}'")]
    UnknownCommand(String),
}

impl CommandError {
    /// A follow-up suggestion for the user, when one is known
    pub fn hint(&self) -> Option<String> {
        match self {
            CommandError::PositionalArgumentMissing { hint } => Some(hint.clone()),
            CommandError::BadArgument { valid, .. } if !valid.is_empty() => {
                Some(format!("Valid arguments are: {}", valid.join(", ")))
            }
            _ => None,
        }
    }
}

/// Errors returned by argument spec validators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("'{value}' is not a valid value, expected one of: {}", .allowed.join(", "))]
    NotInEnum { value: String, allowed: Vec<String> },

    #[error("{0}")]
    Invalid(String),
}

/// Errors raised while turning command-line tokens into a destination value
#[derive(Error, Debug)]
pub enum UnmarshalError {
    #[error("invalid argument '{0}': arg name must only contain lowercase letters, numbers or dashes")]
    InvalidArgumentName(String),

    #[error("unknown argument '{0}'")]
    UnknownArgument(String),

    #[error("duplicate argument '{0}'")]
    DuplicateArgument(String),

    #[error("missing index in the array: trying to set array at index {index} before index {missing}")]
    MissingSliceIndex { index: usize, missing: usize },

    #[error(
        "missing indices in the array: trying to set array at index {index} before indices {}",
        missing_indices(.from, .index)
    )]
    MissingSliceIndices { index: usize, from: usize },

    #[error("invalid index: '{0}' is not a positive integer")]
    InvalidIndex(String),

    #[error("{source}")]
    InvalidValue {
        name: String,
        value: String,
        #[source]
        source: CoerceError,
    },

    #[error("cannot set argument '{name}': {type_name} has no nested fields")]
    CannotDescendIntoLeaf {
        name: String,
        type_name: &'static str,
    },

    #[error("data must be a record, a mapping or raw arguments, got {0}")]
    DestinationNotAddressable(&'static str),

    #[error("cannot unmarshal {type_name} '{name}' without a field name")]
    MissingFieldName {
        name: String,
        type_name: &'static str,
    },

    #[error("cannot build the request: {0}")]
    Reflect(String),
}

impl UnmarshalError {
    /// Argument name the error is attributed to, if any
    pub fn arg_name(&self) -> Option<&str> {
        match self {
            UnmarshalError::InvalidArgumentName(name)
            | UnmarshalError::UnknownArgument(name)
            | UnmarshalError::DuplicateArgument(name) => Some(name),
            UnmarshalError::InvalidValue { name, .. }
            | UnmarshalError::CannotDescendIntoLeaf { name, .. }
            | UnmarshalError::MissingFieldName { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Errors raised by leaf value coercion
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoerceError {
    #[error("invalid value {0}: valid values are true or false")]
    InvalidBooleanValue(String),

    #[error("invalid value {value}: expected {expected}")]
    InvalidNumericValue {
        value: String,
        expected: &'static str,
    },

    #[error("invalid value {value}: valid values are {}", .allowed.join(", "))]
    InvalidEnumValue { value: String, allowed: Vec<String> },

    #[error("invalid size {0}: expected a number followed by an optional unit (b, kb, mb, gb, tb, kib, mib, gib, tib)")]
    InvalidSize(String),

    #[error("invalid {type_name} value: {message}")]
    Custom {
        type_name: &'static str,
        message: String,
    },

    #[error("no unmarshal function registered for type {0}")]
    Unsupported(&'static str),

    #[error("coercer registered for {0} produced a value of another type")]
    TypeMismatch(&'static str),
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for registry assembly
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Specialized result type for unmarshal operations
pub type UnmarshalResult<T> = std::result::Result<T, UnmarshalError>;

/// Specialized result type for leaf coercion
pub type CoerceResult<T> = std::result::Result<T, CoerceError>;

/// Maximum number of missing indices listed in an error message
const MAX_LISTED_INDICES: usize = 10;

fn missing_indices(from: &usize, index: &usize) -> String {
    let mut listed: Vec<String> = (*from..*index)
        .take(MAX_LISTED_INDICES)
        .map(|i| i.to_string())
        .collect();
    if index - from > MAX_LISTED_INDICES {
        listed.push("...".to_string());
    }
    listed.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_indices_message() {
        let err = UnmarshalError::MissingSliceIndices { index: 5, from: 0 };
        assert_eq!(
            err.to_string(),
            "missing indices in the array: trying to set array at index 5 before indices 0,1,2,3,4"
        );
    }

    #[test]
    fn test_missing_indices_are_elided_after_ten() {
        let err = UnmarshalError::MissingSliceIndices {
            index: 99999,
            from: 0,
        };
        assert_eq!(
            err.to_string(),
            "missing indices in the array: trying to set array at index 99999 before indices 0,1,2,3,4,5,6,7,8,9,..."
        );
    }

    #[test]
    fn test_positional_hint() {
        let err = ArgtreeError::from(CommandError::PositionalArgumentMissing {
            hint: "Try running: scw test positional <name-id>".to_string(),
        });
        assert_eq!(
            err.hint().as_deref(),
            Some("Try running: scw test positional <name-id>")
        );
    }

    #[test]
    fn test_bad_argument_hint() {
        let err = CommandError::BadArgument {
            source: UnmarshalError::UnknownArgument("nme".to_string()),
            valid: vec!["name".to_string(), "tag".to_string()],
        };
        assert_eq!(err.to_string(), "unknown argument 'nme'");
        assert_eq!(err.hint().as_deref(), Some("Valid arguments are: name, tag"));
    }
}
