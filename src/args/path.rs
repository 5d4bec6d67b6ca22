//! Argument path parsing
//!
//! An argument token is `name=value` or a bare `name`. The name is a dotted
//! path: `volumes.0.size`, `tags.env`, `basic.string`. Argument specs describe
//! the same paths with placeholders: `volumes.{index}.size`, `tags.{key}`.

use crate::error::{UnmarshalError, UnmarshalResult};
use regex::Regex;

/// Placeholder for a sequential index in an argument schema
pub const SLICE_SCHEMA: &str = "{index}";

/// Placeholder for an arbitrary map key in an argument schema
pub const MAP_SCHEMA: &str = "{key}";

/// Character class matched by the `{index}` placeholder
const INDEX_PATTERN: &str = "[0-9]+";

/// Character class matched by the `{key}` placeholder
const KEY_PATTERN: &str = "[0-9a-zA-Z-]+";

/// Value given to a bare argument
pub const BARE_VALUE: &str = "true";

/// One component of a concrete argument path.
///
/// Both variants keep the text as written: a digit-only segment is only
/// read as a number when it addresses a sequence, and stays a verbatim key
/// when it addresses a mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A field name (or a map key, when the destination is a mapping)
    Field(String),
    /// A digit-only segment
    Index(String),
}

impl PathSegment {
    /// The segment as written on the command line
    pub fn as_str(&self) -> &str {
        match self {
            PathSegment::Field(text) | PathSegment::Index(text) => text,
        }
    }

    /// Sequence index of the segment.
    ///
    /// Leading zeros are rejected so that every element has exactly one
    /// spelling (`strings.00` does not alias `strings.0`).
    pub fn index(&self) -> UnmarshalResult<usize> {
        let invalid = || UnmarshalError::InvalidIndex(self.as_str().to_string());
        match self {
            PathSegment::Index(digits) if digits == "0" || !digits.starts_with('0') => {
                digits.parse().map_err(|_| invalid())
            }
            _ => Err(invalid()),
        }
    }
}

/// One component of an argument schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSegment {
    Literal(String),
    AnyIndex,
    AnyKey,
}

/// Split a token into its argument name and value.
///
/// A token without `=` is a boolean argument set to `true`.
pub fn split_token(token: &str) -> (&str, &str) {
    match token.split_once('=') {
        Some((name, value)) => (name, value),
        None => (token, BARE_VALUE),
    }
}

/// Parse an argument name into path segments
pub fn parse_path(name: &str) -> UnmarshalResult<Vec<PathSegment>> {
    name.split('.')
        .map(|segment| {
            if !is_valid_segment(segment) {
                return Err(UnmarshalError::InvalidArgumentName(name.to_string()));
            }
            if segment.bytes().all(|b| b.is_ascii_digit()) {
                return Ok(PathSegment::Index(segment.to_string()));
            }
            Ok(PathSegment::Field(segment.to_string()))
        })
        .collect()
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// Parse an argument spec name into schema segments
pub fn parse_schema(name: &str) -> Vec<SchemaSegment> {
    name.split('.')
        .map(|segment| match segment {
            SLICE_SCHEMA => SchemaSegment::AnyIndex,
            MAP_SCHEMA => SchemaSegment::AnyKey,
            literal => SchemaSegment::Literal(literal.to_string()),
        })
        .collect()
}

/// Check that an argument spec name is well formed
pub fn is_valid_schema(name: &str) -> bool {
    name.split('.')
        .all(|segment| segment == SLICE_SCHEMA || segment == MAP_SCHEMA || is_valid_segment(segment))
}

/// Whether a schema key contains a placeholder
pub fn has_placeholder(key: &str) -> bool {
    key.contains(SLICE_SCHEMA) || key.contains(MAP_SCHEMA)
}

/// Regex source matching the whole of a schema key, placeholders included
pub fn schema_pattern(key: &str) -> String {
    let escaped = regex::escape(key)
        .replace(&regex::escape(SLICE_SCHEMA), INDEX_PATTERN)
        .replace(&regex::escape(MAP_SCHEMA), KEY_PATTERN);
    format!("^{}$", escaped)
}

/// Compile a schema key into an anchored regex
pub fn schema_regex(key: &str) -> Option<Regex> {
    Regex::new(&schema_pattern(key)).ok()
}

/// Whether a concrete argument name is described by a schema name
pub fn schema_matches(schema: &str, name: &str) -> bool {
    if !has_placeholder(schema) {
        return schema == name;
    }
    schema_regex(schema).map_or(false, |re| re.is_match(name))
}
