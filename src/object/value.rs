use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use num_bigint::BigInt;

use super::context::Module;
use super::exception::Exception;
use super::key::Key;
use super::native::{NativeFunction, NativeObject};
use super::types::{BuiltinType, TypeObject};

pub type DictRef = Rc<RefCell<IndexMap<Key, Value>>>;
pub type ListRef = Rc<RefCell<Vec<Value>>>;
pub type SetRef = Rc<RefCell<IndexSet<Key>>>;

/// An object-runtime value.
///
/// ## Memory model
///
/// Immutable values (`Str`, `Bytes`, `Tuple`) share their payload through
/// `Rc`. Mutable containers (`List`, `Dict`, `Set`) are `Rc<RefCell<..>>`,
/// so every clone of the value aliases the same container and mutation
/// through one handle is visible through all of them.
#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(BigInt),
    Float(f64),
    Str(Rc<str>),
    Bytes(Rc<[u8]>),
    List(ListRef),
    Tuple(Rc<[Value]>),
    Set(SetRef),
    Dict(DictRef),
    Slice(Rc<Slice>),
    Function(Rc<NativeFunction>),
    Module(Rc<Module>),
    Type(TypeObject),
    Exception(Rc<Exception>),
    Native(Rc<dyn NativeObject>),
    /// Returned by binary-operator slots that do not handle an operand.
    NotImplemented,
}

#[derive(Debug, Clone)]
pub struct Slice {
    pub start: Value,
    pub stop: Value,
    pub step: Value,
}

impl Value {
    pub fn str(text: &str) -> Value {
        Value::Str(Rc::from(text))
    }

    pub fn int(value: impl Into<BigInt>) -> Value {
        Value::Int(value.into())
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<Value>) -> Value {
        Value::Tuple(Rc::from(items))
    }

    pub fn bytes(bytes: &[u8]) -> Value {
        Value::Bytes(Rc::from(bytes))
    }

    pub fn dict(map: IndexMap<Key, Value>) -> Value {
        Value::Dict(Rc::new(RefCell::new(map)))
    }

    pub fn set(items: IndexSet<Key>) -> Value {
        Value::Set(Rc::new(RefCell::new(items)))
    }

    pub fn empty_dict() -> Value {
        Value::dict(IndexMap::new())
    }

    /// The value's type object.
    pub fn type_object(&self) -> TypeObject {
        let builtin = match self {
            Value::None => BuiltinType::NoneType,
            Value::Bool(_) => BuiltinType::Bool,
            Value::Int(_) => BuiltinType::Int,
            Value::Float(_) => BuiltinType::Float,
            Value::Str(_) => BuiltinType::Str,
            Value::Bytes(_) => BuiltinType::Bytes,
            Value::List(_) => BuiltinType::List,
            Value::Tuple(_) => BuiltinType::Tuple,
            Value::Set(_) => BuiltinType::Set,
            Value::Dict(_) => BuiltinType::Dict,
            Value::Slice(_) => BuiltinType::Slice,
            Value::Function(_) => BuiltinType::Function,
            Value::Module(_) => BuiltinType::Module,
            Value::Type(_) => BuiltinType::Type,
            Value::NotImplemented => BuiltinType::NotImplementedType,
            Value::Exception(exception) => return TypeObject::Class(exception.class.clone()),
            Value::Native(object) => return TypeObject::Class(object.class()),
        };
        TypeObject::Builtin(builtin)
    }

    /// User-visible type name, as `type(x).__name__` reports it.
    pub fn type_name(&self) -> String {
        self.type_object().name()
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Hashable view of the value, if it has one.
    pub fn to_key(&self) -> Option<Key> {
        match self {
            Value::None => Some(Key::None),
            Value::Bool(b) => Some(Key::Bool(*b)),
            Value::Int(i) => Some(Key::Int(i.clone())),
            Value::Float(f) => Some(Key::Float(*f)),
            Value::Str(s) => Some(Key::Str(s.clone())),
            Value::Bytes(b) => Some(Key::Bytes(b.clone())),
            Value::Tuple(items) => items
                .iter()
                .map(Value::to_key)
                .collect::<Option<Vec<Key>>>()
                .map(|keys| Key::Tuple(Rc::from(keys))),
            _ => None,
        }
    }

    pub fn as_native<T: 'static>(&self) -> Option<&T> {
        match self {
            Value::Native(object) => object.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Identity comparison (`is`).
    pub fn is(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) | (Value::NotImplemented, Value::NotImplemented) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b),
            (Value::Bytes(a), Value::Bytes(b)) => Rc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b),
            (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Exception(a), Value::Exception(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => {
                std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&super::ops::repr(self))
    }
}

/// Structural equality for builtin values; natives compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        super::ops::values_equal(self, other)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(BigInt::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::str(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Rc::from(value))
    }
}

impl From<Exception> for Value {
    fn from(value: Exception) -> Self {
        Value::Exception(Rc::new(value))
    }
}
