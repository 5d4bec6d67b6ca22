//! Path-addressed argument unmarshaling
//!
//! Tokens such as `volumes.0.size=20gb` are parsed into paths, walked down a
//! destination and coerced into its leaves.

pub mod coerce;
pub mod document;
pub mod path;
pub mod shape;
pub mod unmarshal;

pub use coerce::{builtin_parser, coerce, setter, ByteSize, CoercerRegistry, Scalar, ScalarKind, Setter};
pub use document::{Document, Schema, SchemaLeaf, SchemaNode};
pub use path::{
    has_placeholder, is_valid_schema, parse_path, parse_schema, schema_matches, schema_pattern,
    schema_regex, split_token, PathSegment, SchemaSegment, BARE_VALUE, MAP_SCHEMA, SLICE_SCHEMA,
};
pub use shape::{
    arg_name, arg_names, field_matches, field_names, find, is_unmarshalable_value, peel, shape_of,
    unit_variants, Addressing, Draft, Leaf, Mapping, Node, RawArgs, Record, Sequence, Target,
};
pub use unmarshal::{unmarshal, Unmarshaler};
