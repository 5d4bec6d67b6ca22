//! Argument specs
//!
//! An `ArgSpec` describes one argument of a command by its path schema
//! (`volumes.{index}.size`). The ordered `ArgSpecs` of a command drive
//! validation, defaults, completion and the schema of untyped commands.

use crate::args::{
    arg_names, find, has_placeholder, parse_schema, schema_matches, unit_variants, Addressing,
    Schema, SchemaLeaf, ScalarKind,
};
use crate::error::{RegistryError, RegistryResult, ValidationError};
use crate::runner::context::Context;
use facet_core::Shape;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Validates the value given to an argument
pub type ValidateFn = Arc<dyn Fn(&ArgSpec, &str) -> Result<(), ValidationError> + Send + Sync>;

/// Computes a default `(value, doc)` for an absent argument
pub type DefaultFn = Arc<dyn Fn(&Context) -> (String, String) + Send + Sync>;

/// Suggests values for an argument from the prefix typed so far
pub type AutoCompleteFn = Arc<dyn Fn(&Context, &str) -> Vec<String> + Send + Sync>;

/// One argument of a command
#[derive(Clone, Default)]
pub struct ArgSpec {
    /// Path schema of the argument
    pub name: String,

    /// One-line description
    pub short: String,

    pub required: bool,

    /// Given as a bare value instead of `name=value`; implies required
    pub positional: bool,

    /// Permitted values, in display order
    pub enum_values: Vec<String>,

    /// Replaces the enum check when set
    pub validate: Option<ValidateFn>,

    pub default: Option<DefaultFn>,

    /// Replaces enum-based completion when set
    pub auto_complete: Option<AutoCompleteFn>,

    /// Kind of the leaf the argument lands in, when known
    pub kind: Option<ScalarKind>,
}

impl ArgSpec {
    pub fn new(name: impl Into<String>) -> Self {
        ArgSpec {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn short(mut self, short: impl Into<String>) -> Self {
        self.short = short.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn positional(mut self) -> Self {
        self.positional = true;
        self
    }

    pub fn enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate<F>(mut self, validate: F) -> Self
    where
        F: Fn(&ArgSpec, &str) -> Result<(), ValidationError> + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(validate));
        self
    }

    pub fn default_fn<F>(mut self, default: F) -> Self
    where
        F: Fn(&Context) -> (String, String) + Send + Sync + 'static,
    {
        self.default = Some(Arc::new(default));
        self
    }

    /// Default to a fixed value
    pub fn default_value(self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.default_fn(move |_| (value.clone(), value.clone()))
    }

    pub fn auto_complete<F>(mut self, auto_complete: F) -> Self
    where
        F: Fn(&Context, &str) -> Vec<String> + Send + Sync + 'static,
    {
        self.auto_complete = Some(Arc::new(auto_complete));
        self
    }

    pub fn kind(mut self, kind: ScalarKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// `name=`, the form the argument takes on the command line
    pub fn prefix(&self) -> String {
        format!("{}=", self.name)
    }

    pub fn is_boolean(&self) -> bool {
        self.kind == Some(ScalarKind::Bool)
    }

    pub fn is_part_of_map_or_slice(&self) -> bool {
        has_placeholder(&self.name)
    }

    pub fn is_required(&self) -> bool {
        self.required || self.positional
    }

    /// Whether a concrete argument name is described by this spec
    pub fn matches(&self, name: &str) -> bool {
        schema_matches(&self.name, name)
    }

    /// Check a value with the spec's validator, or against its enum values
    pub fn validate_value(&self, value: &str) -> Result<(), ValidationError> {
        if let Some(validate) = &self.validate {
            return validate(self, value);
        }
        if self.enum_values.is_empty() || self.enum_values.iter().any(|v| v == value) {
            return Ok(());
        }
        Err(ValidationError::NotInEnum {
            value: value.to_string(),
            allowed: self.enum_values.clone(),
        })
    }

    /// Default value and its doc, if the spec has one
    pub fn default_for(&self, ctx: &Context) -> Option<(String, String)> {
        self.default.as_ref().map(|default| default(ctx))
    }

    fn schema_leaf(&self) -> SchemaLeaf {
        SchemaLeaf::new(self.kind.unwrap_or(ScalarKind::String)).with_enum(self.enum_values.clone())
    }
}

impl fmt::Debug for ArgSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgSpec")
            .field("name", &self.name)
            .field("short", &self.short)
            .field("required", &self.required)
            .field("positional", &self.positional)
            .field("enum_values", &self.enum_values)
            .field("validate", &self.validate.is_some())
            .field("default", &self.default.is_some())
            .field("auto_complete", &self.auto_complete.is_some())
            .field("kind", &self.kind)
            .finish()
    }
}

/// The ordered arguments of a command
#[derive(Debug, Clone, Default)]
pub struct ArgSpecs(Vec<ArgSpec>);

impl ArgSpecs {
    pub fn new(specs: Vec<ArgSpec>) -> Self {
        ArgSpecs(specs)
    }

    /// Specs for every leaf of a typed destination
    pub fn from_shape(shape: &'static Shape) -> Self {
        let specs = arg_names(shape, None)
            .into_iter()
            .map(|name| {
                let mut spec = ArgSpec::new(name);
                if let Some(Addressing::Leaf(leaf)) = find(shape, &parse_schema(&spec.name), None) {
                    spec.kind = Some(ScalarKind::of(leaf));
                    spec.enum_values = unit_variants(leaf)
                        .unwrap_or_default()
                        .into_iter()
                        .map(str::to_string)
                        .collect();
                }
                spec
            })
            .collect();
        ArgSpecs(specs)
    }

    pub fn push(&mut self, spec: ArgSpec) {
        self.0.push(spec);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ArgSpec> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, ArgSpec> {
        self.0.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|spec| spec.name.clone()).collect()
    }

    pub fn get_by_name(&self, name: &str) -> Option<&ArgSpec> {
        self.0.iter().find(|spec| spec.name == name)
    }

    /// The positional spec, if any
    pub fn positional(&self) -> RegistryResult<Option<&ArgSpec>> {
        let mut found: Option<&ArgSpec> = None;
        for spec in self.0.iter().filter(|spec| spec.positional) {
            if let Some(first) = found {
                return Err(RegistryError::MultiplePositional {
                    first: first.name.clone(),
                    second: spec.name.clone(),
                });
            }
            found = Some(spec);
        }
        Ok(found)
    }

    /// Insert `spec` right before the spec called `name`
    pub fn add_before(&mut self, name: &str, spec: ArgSpec) -> RegistryResult<()> {
        if self.get_by_name(&spec.name).is_some() {
            return Err(RegistryError::DuplicateArgSpec(spec.name));
        }
        let index = self
            .0
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| RegistryError::ArgSpecNotFound(name.to_string()))?;
        self.0.insert(index, spec);
        Ok(())
    }

    pub fn delete_by_name(&mut self, name: &str) -> RegistryResult<ArgSpec> {
        let index = self
            .0
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| RegistryError::ArgSpecNotFound(name.to_string()))?;
        Ok(self.0.remove(index))
    }

    /// Spec describing a concrete argument name, exact names first
    pub fn find_matching(&self, name: &str) -> Option<&ArgSpec> {
        self.get_by_name(name)
            .or_else(|| self.0.iter().find(|spec| spec.matches(name)))
    }

    /// Names are unique and at most one spec is positional
    pub fn check(&self) -> RegistryResult<()> {
        let mut seen = HashSet::new();
        for spec in &self.0 {
            if !seen.insert(spec.name.as_str()) {
                return Err(RegistryError::DuplicateArgSpec(spec.name.clone()));
            }
        }
        self.positional().map(|_| ())
    }

    /// Compile the names into a schema for untyped commands
    pub fn schema(&self) -> RegistryResult<Schema> {
        Schema::build(
            self.0
                .iter()
                .map(|spec| (spec.name.as_str(), spec.schema_leaf())),
        )
    }
}

impl From<Vec<ArgSpec>> for ArgSpecs {
    fn from(specs: Vec<ArgSpec>) -> Self {
        ArgSpecs(specs)
    }
}

impl FromIterator<ArgSpec> for ArgSpecs {
    fn from_iter<I: IntoIterator<Item = ArgSpec>>(iter: I) -> Self {
        ArgSpecs(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ArgSpecs {
    type Item = &'a ArgSpec;
    type IntoIter = std::slice::Iter<'a, ArgSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
