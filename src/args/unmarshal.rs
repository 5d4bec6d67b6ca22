//! Unmarshal command-line tokens into a destination
//!
//! Every token names a path from the destination root. The path is walked
//! one segment at a time, creating sequence elements, map entries and
//! optional values on the way, and the value is coerced into the leaf found
//! at the end.

use crate::args::coerce::{coerce, CoercerRegistry};
use crate::args::path::{parse_path, split_token, PathSegment};
use crate::args::shape::{Draft, Node, Target};
use crate::error::{UnmarshalError, UnmarshalResult};
use facet::Facet;
use std::collections::HashSet;

/// Unmarshal tokens into a typed destination with the built-in coercers only
pub fn unmarshal<T, S>(tokens: &[S], dest: &mut T) -> UnmarshalResult<()>
where
    T: Facet<'static>,
    S: AsRef<str>,
{
    let registry = CoercerRegistry::new();
    Unmarshaler::new(&registry).unmarshal_into(tokens, dest)
}

/// The argument unmarshaling engine
#[derive(Debug, Clone, Copy)]
pub struct Unmarshaler<'r> {
    registry: &'r CoercerRegistry,
}

impl<'r> Unmarshaler<'r> {
    pub fn new(registry: &'r CoercerRegistry) -> Self {
        Unmarshaler { registry }
    }

    /// Fill a typed destination from `tokens`.
    ///
    /// `dest` is rebuilt from its defaults and the accepted tokens. On error
    /// it still receives the values of the tokens before the failing one.
    pub fn unmarshal_into<T, S>(&self, tokens: &[S], dest: &mut T) -> UnmarshalResult<()>
    where
        T: Facet<'static>,
        S: AsRef<str>,
    {
        let mut draft = Draft::new(T::SHAPE, self.registry);
        let result = self.unmarshal(tokens, &mut draft);
        self.finish(draft, result, dest)
    }

    /// Build a `T` from `tokens`
    pub fn unmarshal_as<T, S>(&self, tokens: &[S]) -> UnmarshalResult<T>
    where
        T: Facet<'static>,
        S: AsRef<str>,
    {
        let mut draft = Draft::new(T::SHAPE, self.registry);
        self.unmarshal(tokens, &mut draft)?;
        draft.build()
    }

    /// Set a typed leaf from its value
    pub fn unmarshal_value<T: Facet<'static>>(&self, raw: &str, dest: &mut T) -> UnmarshalResult<()> {
        let mut draft = Draft::new(T::SHAPE, self.registry);
        let result = self.descend(&mut draft, "", &[], raw);
        self.finish(draft, result, dest)
    }

    fn finish<T: Facet<'static>>(
        &self,
        draft: Draft<'_>,
        result: UnmarshalResult<()>,
        dest: &mut T,
    ) -> UnmarshalResult<()> {
        match draft.build() {
            Ok(value) => *dest = value,
            Err(err) => return result.and(Err(err)),
        }
        result
    }

    /// Fill `root` from `tokens`.
    ///
    /// Stops at the first failing token; values assigned by earlier tokens
    /// are kept.
    pub fn unmarshal<S: AsRef<str>>(&self, tokens: &[S], root: &mut dyn Target) -> UnmarshalResult<()> {
        match root.node() {
            Node::Raw(raw) => {
                raw.extend(tokens.iter().map(|t| t.as_ref().to_string()));
                return Ok(());
            }
            node @ (Node::Leaf(_) | Node::Sequence(_)) => {
                return Err(UnmarshalError::DestinationNotAddressable(node.kind_name()));
            }
            Node::Record(_) | Node::Mapping(_) => {}
        }

        let mut seen = HashSet::new();
        for token in tokens {
            let (name, value) = split_token(token.as_ref());
            let path = parse_path(name)?;
            // Leading zeros are rejected as indices, so the raw name is the
            // only spelling of a sequence element.
            if !seen.insert(name) {
                return Err(UnmarshalError::DuplicateArgument(name.to_string()));
            }
            log::trace!("unmarshal {} = {:?}", name, value);
            self.descend(&mut *root, name, &path, value)?;
        }
        Ok(())
    }

    fn descend(
        &self,
        target: &mut dyn Target,
        name: &str,
        path: &[PathSegment],
        value: &str,
    ) -> UnmarshalResult<()> {
        let Some((segment, rest)) = path.split_first() else {
            return self.assign(target, name, value);
        };

        match target.node() {
            Node::Record(record) => {
                let PathSegment::Field(field) = segment else {
                    return Err(UnmarshalError::UnknownArgument(name.to_string()));
                };
                let child = record
                    .field_mut(field)
                    .ok_or_else(|| UnmarshalError::UnknownArgument(name.to_string()))?;
                self.descend(child, name, rest, value)
            }
            Node::Sequence(sequence) => {
                let index = segment.index()?;
                let len = sequence.len();
                if index > len {
                    return Err(if index - len == 1 {
                        UnmarshalError::MissingSliceIndex {
                            index,
                            missing: len,
                        }
                    } else {
                        UnmarshalError::MissingSliceIndices { index, from: len }
                    });
                }
                let element = if index == len {
                    sequence.push_default()
                } else {
                    sequence
                        .element_mut(index)
                        .ok_or_else(|| UnmarshalError::InvalidIndex(index.to_string()))?
                };
                self.descend(element, name, rest, value)
            }
            Node::Mapping(mapping) => {
                let entry = mapping.entry_mut(segment.as_str());
                self.descend(entry, name, rest, value)
            }
            Node::Leaf(leaf) => Err(UnmarshalError::CannotDescendIntoLeaf {
                name: name.to_string(),
                type_name: leaf.type_name(),
            }),
            Node::Raw(raw) => {
                raw.push(format!("{}={}", path_suffix(path), value));
                Ok(())
            }
        }
    }

    fn assign(&self, target: &mut dyn Target, name: &str, value: &str) -> UnmarshalResult<()> {
        match target.node() {
            Node::Leaf(leaf) => {
                coerce(leaf, value, self.registry).map_err(|source| UnmarshalError::InvalidValue {
                    name: name.to_string(),
                    value: value.to_string(),
                    source,
                })
            }
            Node::Raw(raw) => {
                raw.push(value.to_string());
                Ok(())
            }
            Node::Sequence(_) => Err(UnmarshalError::InvalidIndex(String::new())),
            node @ (Node::Record(_) | Node::Mapping(_)) => Err(UnmarshalError::MissingFieldName {
                name: name.to_string(),
                type_name: node.kind_name(),
            }),
        }
    }
}

fn path_suffix(path: &[PathSegment]) -> String {
    path.iter()
        .map(PathSegment::as_str)
        .collect::<Vec<_>>()
        .join(".")
}
