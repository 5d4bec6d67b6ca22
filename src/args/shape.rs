//! Destination shapes
//!
//! Typed destinations derive `Facet`. Their reflected `Shape` says whether a
//! type is addressed as a record, a sequence, a mapping or a single leaf.
//! Tokens are collected into a `Draft` that follows the shape, and the value
//! is built through `Partial` once every token has been walked.

use crate::args::coerce::{builtin_parser, CoercerRegistry, Setter};
use crate::args::path::{SchemaSegment, MAP_SCHEMA, SLICE_SCHEMA};
use crate::error::{CoerceError, CoerceResult, UnmarshalError, UnmarshalResult};
use facet::Facet;
use facet_core::{ConstTypeId, Def, Field, Shape, StructKind, Type, UserType};
use facet_reflect::Partial;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Recursive shapes are not flattened deeper than this
const MAX_SHAPE_DEPTH: usize = 8;

/// How a type is reached by argument paths
#[derive(Clone, Copy)]
pub enum Addressing {
    /// Named fields
    Record(&'static Shape, &'static [Field]),
    /// Ordered, index-addressed, append-only; holds the element shape
    Sequence(&'static Shape),
    /// String keys; holds the value shape
    Mapping(&'static Shape),
    /// A single coerced value
    Leaf(&'static Shape),
    /// Tokens kept verbatim
    Raw,
}

impl Addressing {
    /// Classify a shape.
    ///
    /// Optional and boxed values are transparent. With a registry, every
    /// type owning a coercer is a leaf, whatever its own structure.
    pub fn of(shape: &'static Shape, registry: Option<&CoercerRegistry>) -> Self {
        let shape = peel(shape);
        if registry.map_or(false, |registry| registry.contains_shape(shape)) {
            return Addressing::Leaf(shape);
        }
        if shape.id == RawArgs::SHAPE.id {
            return Addressing::Raw;
        }
        match shape.def {
            Def::List(list) => return Addressing::Sequence(list.t()),
            Def::Map(map) if map.k().id == String::SHAPE.id => return Addressing::Mapping(map.v()),
            _ => {}
        }
        match shape.ty {
            Type::User(UserType::Struct(sd)) if matches!(sd.kind, StructKind::Struct) => {
                Addressing::Record(shape, sd.fields)
            }
            _ => Addressing::Leaf(shape),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Addressing::Leaf(_))
    }
}

impl fmt::Debug for Addressing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Addressing::Record(shape, _) => write!(f, "Record({})", shape.type_identifier),
            Addressing::Sequence(element) => write!(f, "Sequence({})", element.type_identifier),
            Addressing::Mapping(value) => write!(f, "Mapping({})", value.type_identifier),
            Addressing::Leaf(shape) => write!(f, "Leaf({})", shape.type_identifier),
            Addressing::Raw => f.write_str("Raw"),
        }
    }
}

/// Strip `Option` and smart pointer wrappers
pub fn peel(mut shape: &'static Shape) -> &'static Shape {
    loop {
        shape = match shape.def {
            Def::Option(option) => option.t,
            Def::Pointer(pointer) => match pointer.pointee() {
                Some(pointee) => pointee,
                None => return shape,
            },
            _ => return shape,
        };
    }
}

/// Variant names of an enum whose variants carry no data
pub fn unit_variants(shape: &'static Shape) -> Option<Vec<&'static str>> {
    let Type::User(UserType::Enum(ed)) = shape.ty else {
        return None;
    };
    if ed.variants.iter().any(|v| !v.data.fields.is_empty()) {
        return None;
    }
    Some(ed.variants.iter().map(|v| v.name).collect())
}

/// Reflected shape of `T`
pub fn shape_of<T: Facet<'static>>() -> &'static Shape {
    T::SHAPE
}

/// Whether `T` is filled from a single value rather than a path
pub fn is_unmarshalable_value<T: Facet<'static>>() -> bool {
    Addressing::of(T::SHAPE, None).is_leaf()
}

/// Command-line name of a field (`u_int16` is `u-int16`)
pub fn arg_name(field: &Field) -> String {
    field.name.trim_start_matches("r#").replace('_', "-")
}

/// Whether a record field answers to a command-line segment
pub fn field_matches(ident: &str, segment: &str) -> bool {
    let ident = ident.trim_start_matches("r#");
    ident.len() == segment.len()
        && ident
            .bytes()
            .zip(segment.bytes())
            .all(|(a, b)| normalize(a) == normalize(b))
}

fn normalize(b: u8) -> u8 {
    match b {
        b'-' => b'_',
        other => other.to_ascii_lowercase(),
    }
}

/// Argument names of the fields of a record
pub fn field_names(shape: &'static Shape) -> Vec<String> {
    match Addressing::of(shape, None) {
        Addressing::Record(_, fields) => fields.iter().map(arg_name).collect(),
        _ => Vec::new(),
    }
}

/// Follow a schema path down a shape
pub fn find(
    shape: &'static Shape,
    path: &[SchemaSegment],
    registry: Option<&CoercerRegistry>,
) -> Option<Addressing> {
    let addressing = Addressing::of(shape, registry);
    let Some((first, rest)) = path.split_first() else {
        return Some(addressing);
    };
    let next = match (addressing, first) {
        (Addressing::Record(_, fields), SchemaSegment::Literal(name)) => {
            let field = fields.iter().find(|f| field_matches(f.name, name))?;
            (field.shape)()
        }
        (Addressing::Sequence(element), SchemaSegment::AnyIndex) => element,
        (Addressing::Mapping(value), SchemaSegment::AnyKey) => value,
        _ => return None,
    };
    find(next, rest, registry)
}

/// Schema names of every leaf reachable from a shape
/// (`volumes.{index}.size`, `tags.{key}`, ...)
pub fn arg_names(shape: &'static Shape, registry: Option<&CoercerRegistry>) -> Vec<String> {
    let mut names = Vec::new();
    collect_arg_names(shape, registry, "", 0, &mut names);
    names
}

fn collect_arg_names(
    shape: &'static Shape,
    registry: Option<&CoercerRegistry>,
    prefix: &str,
    depth: usize,
    names: &mut Vec<String>,
) {
    if depth > MAX_SHAPE_DEPTH {
        return;
    }
    let join = |segment: &str| {
        if prefix.is_empty() {
            segment.to_string()
        } else {
            format!("{}.{}", prefix, segment)
        }
    };
    match Addressing::of(shape, registry) {
        Addressing::Record(_, fields) => {
            for field in fields {
                collect_arg_names((field.shape)(), registry, &join(&arg_name(field)), depth + 1, names);
            }
        }
        Addressing::Sequence(element) => {
            collect_arg_names(element, registry, &join(SLICE_SCHEMA), depth + 1, names)
        }
        Addressing::Mapping(value) => {
            collect_arg_names(value, registry, &join(MAP_SCHEMA), depth + 1, names)
        }
        Addressing::Leaf(_) | Addressing::Raw => {
            if !prefix.is_empty() {
                names.push(prefix.to_string());
            }
        }
    }
}

/// A value arguments can be unmarshaled into
pub trait Target {
    /// Mutable access to the destination
    fn node(&mut self) -> Node<'_>;
}

/// Mutable view of a destination, by kind
pub enum Node<'a> {
    Record(&'a mut dyn Record),
    Sequence(&'a mut dyn Sequence),
    Mapping(&'a mut dyn Mapping),
    Leaf(&'a mut dyn Leaf),
    Raw(&'a mut Vec<String>),
}

impl Node<'_> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Record(record) => record.type_name(),
            Node::Sequence(_) => "sequence",
            Node::Mapping(_) => "mapping",
            Node::Leaf(leaf) => leaf.type_name(),
            Node::Raw(_) => "raw arguments",
        }
    }
}

/// A destination with named fields
pub trait Record {
    fn type_name(&self) -> &'static str;

    /// Field answering to `name`, if any
    fn field_mut(&mut self, name: &str) -> Option<&mut dyn Target>;

    /// Argument names of all fields
    fn field_names(&self) -> Vec<String>;
}

/// A growable, index-addressed destination
pub trait Sequence {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn element_mut(&mut self, index: usize) -> Option<&mut dyn Target>;

    /// Append a default element and return it
    fn push_default(&mut self) -> &mut dyn Target;
}

/// A destination keyed by strings
pub trait Mapping {
    /// Existing entry for `key`, or a freshly inserted default one
    fn entry_mut(&mut self, key: &str) -> &mut dyn Target;
}

/// A destination holding one coerced value
pub trait Leaf {
    fn type_name(&self) -> &'static str;

    /// Key of registered coercers for this leaf, `None` when it takes none
    fn type_key(&self) -> Option<ConstTypeId>;

    /// Permitted literal values, empty when unconstrained
    fn enum_values(&self) -> Vec<&str>;

    /// Store a value produced by a registered coercer
    fn assign(&mut self, value: Setter) -> CoerceResult<()>;

    /// Parse and store a value with the built-in rules of the type
    fn parse(&mut self, raw: &str) -> CoerceResult<()>;
}

/// Tokens captured verbatim, for commands that parse their own arguments
#[derive(Facet, Debug, Clone, Default, PartialEq, Eq)]
pub struct RawArgs(pub Vec<String>);

impl Deref for RawArgs {
    type Target = Vec<String>;

    fn deref(&self) -> &Vec<String> {
        &self.0
    }
}

impl DerefMut for RawArgs {
    fn deref_mut(&mut self) -> &mut Vec<String> {
        &mut self.0
    }
}

/// Tokens accepted so far for a typed destination.
///
/// Containers and leaves are created as paths reach them; a leaf only
/// counts once a value was coerced into it, so a failing token leaves no
/// optional value, element or entry behind.
pub struct Draft<'r> {
    value: DraftValue<'r>,
}

enum DraftValue<'r> {
    Record(DraftRecord<'r>),
    Sequence(DraftSequence<'r>),
    Mapping(DraftMapping<'r>),
    Leaf(DraftLeaf),
    Raw(Vec<String>),
}

struct DraftRecord<'r> {
    shape: &'static Shape,
    fields: &'static [Field],
    registry: &'r CoercerRegistry,
    children: BTreeMap<usize, Draft<'r>>,
}

struct DraftSequence<'r> {
    element: &'static Shape,
    registry: &'r CoercerRegistry,
    items: Vec<Draft<'r>>,
}

struct DraftMapping<'r> {
    value: &'static Shape,
    registry: &'r CoercerRegistry,
    entries: BTreeMap<String, Draft<'r>>,
}

struct DraftLeaf {
    shape: &'static Shape,
    setter: Option<Setter>,
}

impl<'r> Draft<'r> {
    /// An empty draft of a value of `shape`
    pub fn new(shape: &'static Shape, registry: &'r CoercerRegistry) -> Self {
        let value = match Addressing::of(shape, Some(registry)) {
            Addressing::Record(shape, fields) => DraftValue::Record(DraftRecord {
                shape,
                fields,
                registry,
                children: BTreeMap::new(),
            }),
            Addressing::Sequence(element) => DraftValue::Sequence(DraftSequence {
                element,
                registry,
                items: Vec::new(),
            }),
            Addressing::Mapping(value) => DraftValue::Mapping(DraftMapping {
                value,
                registry,
                entries: BTreeMap::new(),
            }),
            Addressing::Leaf(shape) => DraftValue::Leaf(DraftLeaf {
                shape,
                setter: None,
            }),
            Addressing::Raw => DraftValue::Raw(Vec::new()),
        };
        Draft { value }
    }

    /// Whether any token reached a leaf of this draft
    pub fn is_assigned(&self) -> bool {
        match &self.value {
            DraftValue::Record(record) => record.children.values().any(Draft::is_assigned),
            DraftValue::Sequence(sequence) => sequence.items.iter().any(Draft::is_assigned),
            DraftValue::Mapping(mapping) => mapping.entries.values().any(Draft::is_assigned),
            DraftValue::Leaf(leaf) => leaf.setter.is_some(),
            DraftValue::Raw(tokens) => !tokens.is_empty(),
        }
    }

    /// Build a `T` from defaults and the accepted tokens
    pub fn build<T: Facet<'static>>(self) -> UnmarshalResult<T> {
        let mut typed = Partial::alloc::<T>().map_err(reflect_error)?;
        self.write(typed.inner_mut())
            .map_err(UnmarshalError::Reflect)?;
        let value = typed.build().map_err(reflect_error)?;
        Ok(*value)
    }

    fn write(self, partial: &mut Partial<'static>) -> Result<(), String> {
        match partial.shape().def {
            Def::Option(_) => {
                partial.begin_some().map_err(describe)?;
                self.write(partial)?;
                partial.end().map_err(describe)?;
                return Ok(());
            }
            Def::Pointer(_) => {
                partial.begin_smart_ptr().map_err(describe)?;
                self.write(partial)?;
                partial.end().map_err(describe)?;
                return Ok(());
            }
            _ => {}
        }

        match self.value {
            DraftValue::Record(record) => {
                let mut children = record.children;
                for index in 0..record.fields.len() {
                    match children.remove(&index) {
                        Some(child) if child.is_assigned() => {
                            partial.begin_nth_field(index).map_err(describe)?;
                            child.write(partial)?;
                            partial.end().map_err(describe)?;
                        }
                        _ => {
                            partial.set_nth_field_to_default(index).map_err(describe)?;
                        }
                    }
                }
            }
            DraftValue::Sequence(sequence) => {
                partial.begin_list().map_err(describe)?;
                for item in sequence.items.into_iter().filter(Draft::is_assigned) {
                    partial.begin_list_item().map_err(describe)?;
                    item.write(partial)?;
                    partial.end().map_err(describe)?;
                }
            }
            DraftValue::Mapping(mapping) => {
                partial.begin_map().map_err(describe)?;
                for (key, entry) in mapping.entries {
                    if !entry.is_assigned() {
                        continue;
                    }
                    partial.begin_key().map_err(describe)?;
                    partial.set(key).map_err(describe)?;
                    partial.end().map_err(describe)?;
                    partial.begin_value().map_err(describe)?;
                    entry.write(partial)?;
                    partial.end().map_err(describe)?;
                }
            }
            DraftValue::Leaf(leaf) => match leaf.setter {
                Some(setter) => setter(partial)?,
                None => {
                    partial.set_default().map_err(describe)?;
                }
            },
            DraftValue::Raw(tokens) => {
                partial.set(RawArgs(tokens)).map_err(describe)?;
            }
        }
        Ok(())
    }
}

fn describe<E: fmt::Display>(err: E) -> String {
    err.to_string()
}

fn reflect_error<E: fmt::Display>(err: E) -> UnmarshalError {
    UnmarshalError::Reflect(err.to_string())
}

impl Target for Draft<'_> {
    fn node(&mut self) -> Node<'_> {
        match &mut self.value {
            DraftValue::Record(record) => Node::Record(record),
            DraftValue::Sequence(sequence) => Node::Sequence(sequence),
            DraftValue::Mapping(mapping) => Node::Mapping(mapping),
            DraftValue::Leaf(leaf) => Node::Leaf(leaf),
            DraftValue::Raw(tokens) => Node::Raw(tokens),
        }
    }
}

impl Record for DraftRecord<'_> {
    fn type_name(&self) -> &'static str {
        self.shape.type_identifier
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut dyn Target> {
        let index = self.fields.iter().position(|f| field_matches(f.name, name))?;
        let field_shape = (self.fields[index].shape)();
        let registry = self.registry;
        let child = self
            .children
            .entry(index)
            .or_insert_with(|| Draft::new(field_shape, registry));
        Some(child as &mut dyn Target)
    }

    fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(arg_name).collect()
    }
}

impl Sequence for DraftSequence<'_> {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn element_mut(&mut self, index: usize) -> Option<&mut dyn Target> {
        self.items.get_mut(index).map(|item| item as &mut dyn Target)
    }

    fn push_default(&mut self) -> &mut dyn Target {
        self.items.push(Draft::new(self.element, self.registry));
        let last = self.items.len() - 1;
        &mut self.items[last]
    }
}

impl Mapping for DraftMapping<'_> {
    fn entry_mut(&mut self, key: &str) -> &mut dyn Target {
        let (value, registry) = (self.value, self.registry);
        self.entries
            .entry(key.to_string())
            .or_insert_with(|| Draft::new(value, registry))
    }
}

impl Leaf for DraftLeaf {
    fn type_name(&self) -> &'static str {
        self.shape.type_identifier
    }

    fn type_key(&self) -> Option<ConstTypeId> {
        Some(self.shape.id)
    }

    fn enum_values(&self) -> Vec<&str> {
        unit_variants(self.shape).unwrap_or_default()
    }

    fn assign(&mut self, value: Setter) -> CoerceResult<()> {
        self.setter = Some(value);
        Ok(())
    }

    fn parse(&mut self, raw: &str) -> CoerceResult<()> {
        let setter = if let Some((_, parse)) = builtin_parser(self.shape) {
            parse(raw)?
        } else if unit_variants(self.shape).is_some() {
            let variant = raw.to_string();
            Box::new(move |partial: &mut Partial<'static>| {
                partial
                    .select_variant_named(&variant)
                    .map(|_| ())
                    .map_err(describe)
            }) as Setter
        } else {
            return Err(CoerceError::Unsupported(self.shape.type_identifier));
        };
        self.setter = Some(setter);
        Ok(())
    }
}
