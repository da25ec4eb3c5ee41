use std::rc::Rc;

use crate::error::{BridgeError, Result};
use crate::object::{BuiltinType, TypeObject, Value};

use super::proxy;

/// Result type requested for a script value crossing into the object
/// runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Str,
    Int,
    Bool,
    Float,
    List,
    Set,
    Dict,
    Tuple,
    Bytes,
    /// A `scriptobj` proxy owning the value.
    Obj,
    /// A `scriptdict` proxy owning the value.
    DictObj,
}

impl Target {
    /// Resolve a caller-supplied `to=` descriptor: `None`, a type object
    /// or a type name.
    pub fn from_value(value: &Value) -> Result<Target> {
        match value {
            Value::None => Ok(Target::Str),
            Value::Type(TypeObject::Builtin(builtin)) => Target::from_builtin(*builtin)
                .ok_or_else(|| unsupported(&builtin.name())),
            Value::Type(TypeObject::Class(class)) => {
                if Rc::ptr_eq(class, &proxy::scriptobj_class()) {
                    Ok(Target::Obj)
                } else if Rc::ptr_eq(class, &proxy::scriptdict_class()) {
                    Ok(Target::DictObj)
                } else {
                    Err(unsupported(&class.qualified_name()))
                }
            }
            Value::Str(name) => Target::from_name(name).ok_or_else(|| unsupported(name)),
            other => Err(BridgeError::Type(format!(
                "to= must be a type, not {}",
                other.type_name()
            ))),
        }
    }

    /// Optional descriptor: absent or `None` means no preference.
    pub fn from_optional(value: Option<&Value>) -> Result<Option<Target>> {
        match value {
            None | Some(Value::None) => Ok(None),
            Some(value) => Target::from_value(value).map(Some),
        }
    }

    pub fn from_name(name: &str) -> Option<Target> {
        let target = match name {
            "str" => Target::Str,
            "int" => Target::Int,
            "bool" => Target::Bool,
            "float" => Target::Float,
            "list" => Target::List,
            "set" => Target::Set,
            "dict" => Target::Dict,
            "tuple" => Target::Tuple,
            "bytes" => Target::Bytes,
            "scriptobj" => Target::Obj,
            "scriptdict" => Target::DictObj,
            _ => return None,
        };
        Some(target)
    }

    fn from_builtin(builtin: BuiltinType) -> Option<Target> {
        let target = match builtin {
            BuiltinType::Str => Target::Str,
            BuiltinType::Int => Target::Int,
            BuiltinType::Bool => Target::Bool,
            BuiltinType::Float => Target::Float,
            BuiltinType::List => Target::List,
            BuiltinType::Set => Target::Set,
            BuiltinType::Dict => Target::Dict,
            BuiltinType::Tuple => Target::Tuple,
            BuiltinType::Bytes => Target::Bytes,
            _ => return None,
        };
        Some(target)
    }

    pub fn name(self) -> &'static str {
        match self {
            Target::Str => "str",
            Target::Int => "int",
            Target::Bool => "bool",
            Target::Float => "float",
            Target::List => "list",
            Target::Set => "set",
            Target::Dict => "dict",
            Target::Tuple => "tuple",
            Target::Bytes => "bytes",
            Target::Obj => "scriptobj",
            Target::DictObj => "scriptdict",
        }
    }

    /// The type object a `to` attribute reads back as.
    pub fn type_value(self) -> Value {
        let builtin = match self {
            Target::Str => BuiltinType::Str,
            Target::Int => BuiltinType::Int,
            Target::Bool => BuiltinType::Bool,
            Target::Float => BuiltinType::Float,
            Target::List => BuiltinType::List,
            Target::Set => BuiltinType::Set,
            Target::Dict => BuiltinType::Dict,
            Target::Tuple => BuiltinType::Tuple,
            Target::Bytes => BuiltinType::Bytes,
            Target::Obj => return Value::Type(TypeObject::Class(proxy::scriptobj_class())),
            Target::DictObj => return Value::Type(TypeObject::Class(proxy::scriptdict_class())),
        };
        Value::Type(TypeObject::Builtin(builtin))
    }
}

fn unsupported(name: &str) -> BridgeError {
    BridgeError::Type(format!("unsupported conversion target '{name}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptors_resolve_once() {
        assert_eq!(Target::from_value(&Value::None).unwrap(), Target::Str);
        assert_eq!(
            Target::from_value(&Value::Type(TypeObject::Builtin(BuiltinType::Int))).unwrap(),
            Target::Int
        );
        assert_eq!(Target::from_value(&Value::from("tuple")).unwrap(), Target::Tuple);
        assert_eq!(
            Target::from_value(&Target::DictObj.type_value()).unwrap(),
            Target::DictObj
        );
    }

    #[test]
    fn unknown_descriptors_are_type_errors() {
        let error = Target::from_value(&Value::from("complex")).unwrap_err();
        assert_eq!(error.to_string(), "unsupported conversion target 'complex'");
        assert!(matches!(
            Target::from_value(&Value::from(3_i64)),
            Err(BridgeError::Type(_))
        ));
        assert!(Target::from_optional(None).unwrap().is_none());
    }
}
