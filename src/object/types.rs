use std::fmt;
use std::rc::Rc;

use super::native::NativeFn;

/// Types implemented directly by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Object,
    NoneType,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    List,
    Tuple,
    Set,
    Dict,
    Slice,
    Function,
    Module,
    Type,
    NotImplementedType,
}

impl BuiltinType {
    pub fn name(self) -> &'static str {
        match self {
            BuiltinType::Object => "object",
            BuiltinType::NoneType => "NoneType",
            BuiltinType::Bool => "bool",
            BuiltinType::Int => "int",
            BuiltinType::Float => "float",
            BuiltinType::Str => "str",
            BuiltinType::Bytes => "bytes",
            BuiltinType::List => "list",
            BuiltinType::Tuple => "tuple",
            BuiltinType::Set => "set",
            BuiltinType::Dict => "dict",
            BuiltinType::Slice => "slice",
            BuiltinType::Function => "builtin_function_or_method",
            BuiltinType::Module => "module",
            BuiltinType::Type => "type",
            BuiltinType::NotImplementedType => "NotImplementedType",
        }
    }

    /// Types reachable by name from the builtins namespace.
    pub fn from_name(name: &str) -> Option<BuiltinType> {
        let found = match name {
            "object" => BuiltinType::Object,
            "bool" => BuiltinType::Bool,
            "int" => BuiltinType::Int,
            "float" => BuiltinType::Float,
            "str" => BuiltinType::Str,
            "bytes" => BuiltinType::Bytes,
            "list" => BuiltinType::List,
            "tuple" => BuiltinType::Tuple,
            "set" => BuiltinType::Set,
            "dict" => BuiltinType::Dict,
            "type" => BuiltinType::Type,
            _ => return None,
        };
        Some(found)
    }
}

/// A class defined outside the builtin set: exception classes and the
/// types of native objects.
pub struct ClassInfo {
    pub name: String,
    pub module: String,
    pub base: Option<Rc<ClassInfo>>,
    /// Called when the class object is called. Exception classes without
    /// a constructor build an instance from their arguments.
    pub constructor: Option<NativeFn>,
}

impl ClassInfo {
    pub fn new(name: &str, module: &str, base: Option<Rc<ClassInfo>>) -> Self {
        ClassInfo {
            name: name.to_string(),
            module: module.to_string(),
            base,
            constructor: None,
        }
    }

    pub fn with_constructor(mut self, constructor: NativeFn) -> Self {
        self.constructor = Some(constructor);
        self
    }

    pub fn qualified_name(&self) -> String {
        if self.module == "builtins" {
            self.name.clone()
        } else {
            format!("{}.{}", self.module, self.name)
        }
    }

    pub fn is_subclass_of(self: &Rc<Self>, other: &Rc<ClassInfo>) -> bool {
        let mut current = Some(self.clone());
        while let Some(class) = current {
            if Rc::ptr_eq(&class, other) {
                return true;
            }
            current = class.base.clone();
        }
        false
    }
}

impl fmt::Debug for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class '{}'>", self.qualified_name())
    }
}

#[derive(Clone)]
pub enum TypeObject {
    Builtin(BuiltinType),
    Class(Rc<ClassInfo>),
}

impl TypeObject {
    pub fn name(&self) -> String {
        match self {
            TypeObject::Builtin(builtin) => builtin.name().to_string(),
            TypeObject::Class(class) => class.name.clone(),
        }
    }

    pub fn qualified_name(&self) -> String {
        match self {
            TypeObject::Builtin(builtin) => builtin.name().to_string(),
            TypeObject::Class(class) => class.qualified_name(),
        }
    }

    pub fn as_class(&self) -> Option<&Rc<ClassInfo>> {
        match self {
            TypeObject::Class(class) => Some(class),
            TypeObject::Builtin(_) => None,
        }
    }

    /// `issubclass(self, other)`.
    pub fn is_subclass_of(&self, other: &TypeObject) -> bool {
        match (self, other) {
            (_, TypeObject::Builtin(BuiltinType::Object)) => true,
            (TypeObject::Builtin(BuiltinType::Bool), TypeObject::Builtin(BuiltinType::Int)) => true,
            (TypeObject::Builtin(a), TypeObject::Builtin(b)) => a == b,
            (TypeObject::Class(a), TypeObject::Class(b)) => a.is_subclass_of(b),
            _ => false,
        }
    }
}

impl PartialEq for TypeObject {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TypeObject::Builtin(a), TypeObject::Builtin(b)) => a == b,
            (TypeObject::Class(a), TypeObject::Class(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for TypeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class '{}'>", self.qualified_name())
    }
}
