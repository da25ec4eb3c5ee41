use std::fmt;
use std::rc::Rc;

use num_bigint::BigInt;

use super::value::Value;

/// A hashable value, used for dict keys and set members.
///
/// Integral floats and booleans hash like the equal integer, so `1`, `1.0`
/// and `True` address the same entry. The original kind is preserved for
/// round-tripping through `to_value`.
#[derive(Debug, Clone)]
pub enum Key {
    None,
    Bool(bool),
    Int(BigInt),
    Float(f64),
    Str(Rc<str>),
    Bytes(Rc<[u8]>),
    Tuple(Rc<[Key]>),
}

#[derive(PartialEq, Eq, Hash)]
enum Canonical<'a> {
    None,
    Int(BigInt),
    Float(u64),
    Str(&'a str),
    Bytes(&'a [u8]),
    Tuple(Vec<Canonical<'a>>),
}

impl Key {
    fn canonical(&self) -> Canonical<'_> {
        match self {
            Key::None => Canonical::None,
            Key::Bool(b) => Canonical::Int(BigInt::from(u8::from(*b))),
            Key::Int(i) => Canonical::Int(i.clone()),
            Key::Float(f) if f.fract() == 0.0 && f.is_finite() => {
                match num_traits::FromPrimitive::from_f64(*f) {
                    Some(i) => Canonical::Int(i),
                    None => Canonical::Float(f.to_bits()),
                }
            }
            Key::Float(f) => Canonical::Float(f.to_bits()),
            Key::Str(s) => Canonical::Str(s),
            Key::Bytes(b) => Canonical::Bytes(b),
            Key::Tuple(items) => Canonical::Tuple(items.iter().map(Key::canonical).collect()),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Key::None => Value::None,
            Key::Bool(b) => Value::Bool(*b),
            Key::Int(i) => Value::Int(i.clone()),
            Key::Float(f) => Value::Float(*f),
            Key::Str(s) => Value::Str(s.clone()),
            Key::Bytes(b) => Value::Bytes(b.clone()),
            Key::Tuple(items) => Value::Tuple(items.iter().map(Key::to_value).collect()),
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for Key {}

impl std::hash::Hash for Key {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(Rc::from(value))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&super::ops::repr(&self.to_value()))
    }
}
