//! Leaf value coercion
//!
//! A leaf is set from a string in three steps: a coercer registered for its
//! exact type wins, then enum values are enforced, then the built-in parser
//! of the type runs. Typed leaves are not written directly: coercion yields
//! a `Setter` that stores the value once the destination is built.

use crate::args::shape::{unit_variants, Leaf};
use crate::error::{CoerceError, CoerceResult};
use facet::Facet;
use facet_core::{ConstTypeId, Shape};
use facet_reflect::Partial;
use std::collections::HashMap;
use std::fmt;

/// Kind of scalar a leaf holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Signed,
    Unsigned,
    Float,
    String,
    Size,
    Enum,
    Custom,
}

impl ScalarKind {
    /// Kind of a reflected leaf type
    pub fn of(shape: &'static Shape) -> Self {
        match builtin_parser(shape) {
            Some((kind, _)) => kind,
            None if unit_variants(shape).is_some() => ScalarKind::Enum,
            None => ScalarKind::Custom,
        }
    }
}

/// A built-in type set from a single command-line value
pub trait Scalar: Sized {
    const KIND: ScalarKind;

    fn parse_scalar(raw: &str) -> CoerceResult<Self>;
}

/// Stores a coerced value into the destination under construction
pub type Setter = Box<dyn FnOnce(&mut Partial<'static>) -> Result<(), String>>;

/// Setter storing `value` as is
pub fn setter<T: Facet<'static> + 'static>(value: T) -> Setter {
    Box::new(move |partial| partial.set(value).map(|_| ()).map_err(|e| e.to_string()))
}

type ParseFn = fn(&str) -> CoerceResult<Setter>;

fn parse_with<T: Scalar + Facet<'static> + 'static>(raw: &str) -> CoerceResult<Setter> {
    T::parse_scalar(raw).map(setter)
}

/// Kind and parser of the built-in scalar types
pub fn builtin_parser(shape: &'static Shape) -> Option<(ScalarKind, ParseFn)> {
    macro_rules! lookup {
        ($($ty:ty),*) => {
            $(
                if shape.id == <$ty as Facet<'static>>::SHAPE.id {
                    return Some((<$ty as Scalar>::KIND, parse_with::<$ty>));
                }
            )*
        };
    }
    lookup!(
        bool, String, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
        ByteSize
    );
    None
}

type CoerceFn = Box<dyn Fn(&str) -> CoerceResult<Setter> + Send + Sync>;

/// Coercers for user-defined leaf types, keyed by reflected type.
///
/// The registry is filled during start-up, before the first command runs,
/// and only read afterwards.
#[derive(Default)]
pub struct CoercerRegistry {
    coercers: HashMap<ConstTypeId, CoerceFn>,
}

impl CoercerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the coercer used for every leaf of type `T`
    pub fn register<T, F, E>(&mut self, coercer: F)
    where
        T: Facet<'static> + 'static,
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        let type_name = T::SHAPE.type_identifier;
        log::debug!("registering coercer for {}", type_name);
        self.coercers.insert(
            T::SHAPE.id,
            Box::new(move |raw| {
                coercer(raw).map(setter).map_err(|e| CoerceError::Custom {
                    type_name,
                    message: e.to_string(),
                })
            }),
        );
    }

    pub fn contains<T: Facet<'static>>(&self) -> bool {
        self.contains_shape(T::SHAPE)
    }

    pub fn contains_shape(&self, shape: &Shape) -> bool {
        self.coercers.contains_key(&shape.id)
    }

    fn get(&self, key: ConstTypeId) -> Option<&CoerceFn> {
        self.coercers.get(&key)
    }
}

impl fmt::Debug for CoercerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoercerRegistry")
            .field("coercers", &self.coercers.len())
            .finish()
    }
}

/// Set a leaf from its command-line value
pub fn coerce(leaf: &mut dyn Leaf, raw: &str, registry: &CoercerRegistry) -> CoerceResult<()> {
    if let Some(coercer) = leaf.type_key().and_then(|key| registry.get(key)) {
        return leaf.assign(coercer(raw)?);
    }

    let allowed = leaf.enum_values();
    if !allowed.is_empty() && !allowed.contains(&raw) {
        return Err(CoerceError::InvalidEnumValue {
            value: raw.to_string(),
            allowed: allowed.iter().map(|v| v.to_string()).collect(),
        });
    }

    leaf.parse(raw)
}

impl Scalar for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    fn parse_scalar(raw: &str) -> CoerceResult<Self> {
        match raw {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(CoerceError::InvalidBooleanValue(raw.to_string())),
        }
    }
}

impl Scalar for String {
    const KIND: ScalarKind = ScalarKind::String;

    fn parse_scalar(raw: &str) -> CoerceResult<Self> {
        Ok(raw.to_string())
    }
}

macro_rules! numeric_scalar {
    ($kind:expr, $expected:literal => $($ty:ty),*) => {
        $(
            impl Scalar for $ty {
                const KIND: ScalarKind = $kind;

                fn parse_scalar(raw: &str) -> CoerceResult<Self> {
                    raw.parse().map_err(|_| CoerceError::InvalidNumericValue {
                        value: raw.to_string(),
                        expected: concat!($expected, " (", stringify!($ty), ")"),
                    })
                }
            }
        )*
    };
}

numeric_scalar!(ScalarKind::Signed, "an integer" => i8, i16, i32, i64, i128, isize);
numeric_scalar!(ScalarKind::Unsigned, "a positive integer" => u8, u16, u32, u64, u128, usize);
numeric_scalar!(ScalarKind::Float, "a number" => f32, f64);

/// A quantity of bytes written with an optional unit: `20gb`, `10G`, `512MiB`.
///
/// Decimal units are powers of 1000, `i` units powers of 1024.
#[derive(Facet, Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub const B: u64 = 1;
    pub const KB: u64 = 1000;
    pub const MB: u64 = 1000 * Self::KB;
    pub const GB: u64 = 1000 * Self::MB;
    pub const TB: u64 = 1000 * Self::GB;
    pub const KIB: u64 = 1024;
    pub const MIB: u64 = 1024 * Self::KIB;
    pub const GIB: u64 = 1024 * Self::MIB;
    pub const TIB: u64 = 1024 * Self::GIB;

    pub fn bytes(self) -> u64 {
        self.0
    }
}

impl Scalar for ByteSize {
    const KIND: ScalarKind = ScalarKind::Size;

    fn parse_scalar(raw: &str) -> CoerceResult<Self> {
        let invalid = || CoerceError::InvalidSize(raw.to_string());
        let trimmed = raw.trim();
        let split = trimmed
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(trimmed.len());
        let (number, unit) = trimmed.split_at(split);
        if number.is_empty() {
            return Err(invalid());
        }
        let multiplier = match unit.trim().to_ascii_lowercase().as_str() {
            "" | "b" => Self::B,
            "k" | "kb" => Self::KB,
            "m" | "mb" => Self::MB,
            "g" | "gb" => Self::GB,
            "t" | "tb" => Self::TB,
            "ki" | "kib" => Self::KIB,
            "mi" | "mib" => Self::MIB,
            "gi" | "gib" => Self::GIB,
            "ti" | "tib" => Self::TIB,
            _ => return Err(invalid()),
        };
        if let Ok(whole) = number.parse::<u64>() {
            return whole.checked_mul(multiplier).map(ByteSize).ok_or_else(invalid);
        }
        let value: f64 = number.parse().map_err(|_| invalid())?;
        let bytes = (value * multiplier as f64).round();
        if !bytes.is_finite() || bytes < 0.0 || bytes > u64::MAX as f64 {
            return Err(invalid());
        }
        Ok(ByteSize(bytes as u64))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let units = [
            (Self::TB, "TB"),
            (Self::GB, "GB"),
            (Self::MB, "MB"),
            (Self::KB, "KB"),
        ];
        for (size, unit) in units {
            if self.0 >= size && self.0 % size == 0 {
                return write!(f, "{} {}", self.0 / size, unit);
            }
        }
        write!(f, "{} B", self.0)
    }
}
