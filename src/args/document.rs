//! Schema-built destinations
//!
//! Commands declared in a config file have no Rust type to unmarshal into.
//! Their argument names are compiled into a `Schema`, and a `Document` built
//! from it is filled by the same engine as typed records, then rendered as
//! JSON.

use crate::args::coerce::{ByteSize, Scalar, ScalarKind, Setter};
use crate::args::path::{parse_schema, SchemaSegment};
use crate::args::shape::{Leaf, Mapping, Node, Record, Sequence, Target};
use crate::error::{CoerceError, CoerceResult, RegistryError, RegistryResult};
use facet_core::ConstTypeId;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Leaf description carried by a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaLeaf {
    pub kind: ScalarKind,
    pub enum_values: Vec<String>,
}

impl SchemaLeaf {
    pub fn new(kind: ScalarKind) -> Self {
        SchemaLeaf {
            kind,
            enum_values: Vec::new(),
        }
    }

    pub fn with_enum(mut self, values: Vec<String>) -> Self {
        if !values.is_empty() {
            self.kind = ScalarKind::Enum;
        }
        self.enum_values = values;
        self
    }
}

/// A node of a compiled schema
#[derive(Debug)]
pub enum SchemaNode {
    Record(Vec<(String, Arc<SchemaNode>)>),
    Sequence(Arc<SchemaNode>),
    Mapping(Arc<SchemaNode>),
    Leaf(Arc<SchemaLeaf>),
}

/// Argument names compiled into a tree
#[derive(Debug, Clone)]
pub struct Schema {
    root: Arc<SchemaNode>,
}

impl Schema {
    /// Compile `(name, leaf)` pairs.
    ///
    /// Two names that need different containers at the same position
    /// (`size` and `size.unit`, `ips.{index}` and `ips.{key}`) conflict.
    pub fn build<'a, I>(specs: I) -> RegistryResult<Self>
    where
        I: IntoIterator<Item = (&'a str, SchemaLeaf)>,
    {
        let mut root = PendingNode::new("");
        for (name, leaf) in specs {
            let segments = parse_schema(name);
            root.insert(&segments, name, leaf)
                .map_err(|other| RegistryError::ConflictingArgSpec {
                    name: name.to_string(),
                    other,
                })?;
        }
        let root = match root.kind {
            PendingKind::Empty => Arc::new(SchemaNode::Record(Vec::new())),
            _ => root.finish(),
        };
        Ok(Schema { root })
    }

    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    /// An empty document following this schema
    pub fn document(&self) -> Document {
        Document {
            root: DocNode::new(&self.root),
        }
    }
}

struct PendingNode {
    owner: String,
    kind: PendingKind,
}

enum PendingKind {
    Empty,
    Record(Vec<(String, PendingNode)>),
    Sequence(Box<PendingNode>),
    Mapping(Box<PendingNode>),
    Leaf(SchemaLeaf),
}

impl PendingNode {
    fn new(owner: &str) -> Self {
        PendingNode {
            owner: owner.to_string(),
            kind: PendingKind::Empty,
        }
    }

    /// Insert a name; on conflict returns the name that claimed the position
    fn insert(&mut self, segments: &[SchemaSegment], name: &str, leaf: SchemaLeaf) -> Result<(), String> {
        let Some((segment, rest)) = segments.split_first() else {
            return match self.kind {
                PendingKind::Empty => {
                    self.owner = name.to_string();
                    self.kind = PendingKind::Leaf(leaf);
                    Ok(())
                }
                _ => Err(self.owner.clone()),
            };
        };

        if matches!(self.kind, PendingKind::Empty) {
            self.owner = name.to_string();
            self.kind = match segment {
                SchemaSegment::Literal(_) => PendingKind::Record(Vec::new()),
                SchemaSegment::AnyIndex => PendingKind::Sequence(Box::new(PendingNode::new(name))),
                SchemaSegment::AnyKey => PendingKind::Mapping(Box::new(PendingNode::new(name))),
            };
        }

        let owner = self.owner.clone();
        match (&mut self.kind, segment) {
            (PendingKind::Record(fields), SchemaSegment::Literal(field)) => {
                let position = match fields.iter().position(|(f, _)| f == field) {
                    Some(position) => position,
                    None => {
                        fields.push((field.clone(), PendingNode::new(name)));
                        fields.len() - 1
                    }
                };
                fields[position].1.insert(rest, name, leaf)
            }
            (PendingKind::Sequence(element), SchemaSegment::AnyIndex)
            | (PendingKind::Mapping(element), SchemaSegment::AnyKey) => element.insert(rest, name, leaf),
            _ => Err(owner),
        }
    }

    fn finish(self) -> Arc<SchemaNode> {
        Arc::new(match self.kind {
            PendingKind::Record(fields) => SchemaNode::Record(
                fields
                    .into_iter()
                    .map(|(name, draft)| (name, draft.finish()))
                    .collect(),
            ),
            PendingKind::Sequence(element) => SchemaNode::Sequence(element.finish()),
            PendingKind::Mapping(value) => SchemaNode::Mapping(value.finish()),
            PendingKind::Leaf(leaf) => SchemaNode::Leaf(Arc::new(leaf)),
            PendingKind::Empty => SchemaNode::Leaf(Arc::new(SchemaLeaf::new(ScalarKind::String))),
        })
    }
}

/// A value filled from tokens following a `Schema`
#[derive(Debug)]
pub struct Document {
    root: DocNode,
}

impl Document {
    pub fn to_json(&self) -> Value {
        self.root.to_json()
    }
}

impl Target for Document {
    fn node(&mut self) -> Node<'_> {
        self.root.node()
    }
}

#[derive(Debug)]
enum DocNode {
    Record(DocRecord),
    Sequence(DocSequence),
    Mapping(DocMapping),
    Leaf(DocLeaf),
}

impl DocNode {
    fn new(schema: &Arc<SchemaNode>) -> Self {
        match schema.as_ref() {
            SchemaNode::Record(_) => DocNode::Record(DocRecord {
                schema: Arc::clone(schema),
                fields: BTreeMap::new(),
            }),
            SchemaNode::Sequence(element) => DocNode::Sequence(DocSequence {
                element: Arc::clone(element),
                items: Vec::new(),
            }),
            SchemaNode::Mapping(value) => DocNode::Mapping(DocMapping {
                value: Arc::clone(value),
                entries: BTreeMap::new(),
            }),
            SchemaNode::Leaf(leaf) => DocNode::Leaf(DocLeaf {
                schema: Arc::clone(leaf),
                value: None,
            }),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            DocNode::Record(record) => Value::Object(
                record
                    .fields
                    .iter()
                    .map(|(name, node)| (name.clone(), node.to_json()))
                    .collect::<Map<_, _>>(),
            ),
            DocNode::Sequence(sequence) => {
                Value::Array(sequence.items.iter().map(DocNode::to_json).collect())
            }
            DocNode::Mapping(mapping) => Value::Object(
                mapping
                    .entries
                    .iter()
                    .map(|(key, node)| (key.clone(), node.to_json()))
                    .collect::<Map<_, _>>(),
            ),
            DocNode::Leaf(leaf) => leaf.value.clone().unwrap_or(Value::Null),
        }
    }
}

impl Target for DocNode {
    fn node(&mut self) -> Node<'_> {
        match self {
            DocNode::Record(record) => Node::Record(record),
            DocNode::Sequence(sequence) => Node::Sequence(sequence),
            DocNode::Mapping(mapping) => Node::Mapping(mapping),
            DocNode::Leaf(leaf) => Node::Leaf(leaf),
        }
    }
}

#[derive(Debug)]
struct DocRecord {
    schema: Arc<SchemaNode>,
    fields: BTreeMap<String, DocNode>,
}

impl DocRecord {
    fn schema_fields(&self) -> &[(String, Arc<SchemaNode>)] {
        match self.schema.as_ref() {
            SchemaNode::Record(fields) => fields,
            _ => &[],
        }
    }
}

impl Record for DocRecord {
    fn type_name(&self) -> &'static str {
        "record"
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut dyn Target> {
        let schema = self
            .schema_fields()
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, schema)| Arc::clone(schema))?;
        let node = self
            .fields
            .entry(name.to_string())
            .or_insert_with(|| DocNode::new(&schema));
        Some(node as &mut dyn Target)
    }

    fn field_names(&self) -> Vec<String> {
        self.schema_fields()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[derive(Debug)]
struct DocSequence {
    element: Arc<SchemaNode>,
    items: Vec<DocNode>,
}

impl Sequence for DocSequence {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn element_mut(&mut self, index: usize) -> Option<&mut dyn Target> {
        self.items.get_mut(index).map(|item| item as &mut dyn Target)
    }

    fn push_default(&mut self) -> &mut dyn Target {
        self.items.push(DocNode::new(&self.element));
        let last = self.items.len() - 1;
        &mut self.items[last]
    }
}

#[derive(Debug)]
struct DocMapping {
    value: Arc<SchemaNode>,
    entries: BTreeMap<String, DocNode>,
}

impl Mapping for DocMapping {
    fn entry_mut(&mut self, key: &str) -> &mut dyn Target {
        let schema = &self.value;
        self.entries
            .entry(key.to_string())
            .or_insert_with(|| DocNode::new(schema))
    }
}

#[derive(Debug)]
struct DocLeaf {
    schema: Arc<SchemaLeaf>,
    value: Option<Value>,
}

impl Leaf for DocLeaf {
    fn type_name(&self) -> &'static str {
        match self.schema.kind {
            ScalarKind::Bool => "bool",
            ScalarKind::Signed | ScalarKind::Unsigned => "integer",
            ScalarKind::Float => "number",
            ScalarKind::Size => "size",
            ScalarKind::Enum => "enum",
            ScalarKind::String | ScalarKind::Custom => "string",
        }
    }

    // Untyped leaves never take registered coercers
    fn type_key(&self) -> Option<ConstTypeId> {
        None
    }

    fn enum_values(&self) -> Vec<&str> {
        self.schema.enum_values.iter().map(String::as_str).collect()
    }

    fn assign(&mut self, _value: Setter) -> CoerceResult<()> {
        Err(CoerceError::TypeMismatch("document value"))
    }

    fn parse(&mut self, raw: &str) -> CoerceResult<()> {
        let value = match self.schema.kind {
            ScalarKind::Bool => Value::Bool(bool::parse_scalar(raw)?),
            ScalarKind::Signed => Value::from(i64::parse_scalar(raw)?),
            ScalarKind::Unsigned => Value::from(u64::parse_scalar(raw)?),
            ScalarKind::Float => Number::from_f64(f64::parse_scalar(raw)?)
                .map(Value::Number)
                .ok_or_else(|| CoerceError::InvalidNumericValue {
                    value: raw.to_string(),
                    expected: "a finite number",
                })?,
            ScalarKind::Size => Value::from(ByteSize::parse_scalar(raw)?.bytes()),
            ScalarKind::String | ScalarKind::Enum | ScalarKind::Custom => {
                Value::String(raw.to_string())
            }
        };
        self.value = Some(value);
        Ok(())
    }
}
