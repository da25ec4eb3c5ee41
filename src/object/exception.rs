use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::ops;
use super::types::{ClassInfo, TypeObject};
use super::value::Value;

/// The builtin exception hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExcKind {
    BaseException,
    Exception,
    ArithmeticError,
    ZeroDivisionError,
    OverflowError,
    LookupError,
    IndexError,
    KeyError,
    NameError,
    TypeError,
    ValueError,
    AttributeError,
    RuntimeError,
    NotImplementedError,
    SystemError,
    StopIteration,
    ImportError,
    ModuleNotFoundError,
    SyntaxError,
}

pub const ALL_KINDS: &[ExcKind] = &[
    ExcKind::BaseException,
    ExcKind::Exception,
    ExcKind::ArithmeticError,
    ExcKind::ZeroDivisionError,
    ExcKind::OverflowError,
    ExcKind::LookupError,
    ExcKind::IndexError,
    ExcKind::KeyError,
    ExcKind::NameError,
    ExcKind::TypeError,
    ExcKind::ValueError,
    ExcKind::AttributeError,
    ExcKind::RuntimeError,
    ExcKind::NotImplementedError,
    ExcKind::SystemError,
    ExcKind::StopIteration,
    ExcKind::ImportError,
    ExcKind::ModuleNotFoundError,
    ExcKind::SyntaxError,
];

impl ExcKind {
    pub fn name(self) -> &'static str {
        match self {
            ExcKind::BaseException => "BaseException",
            ExcKind::Exception => "Exception",
            ExcKind::ArithmeticError => "ArithmeticError",
            ExcKind::ZeroDivisionError => "ZeroDivisionError",
            ExcKind::OverflowError => "OverflowError",
            ExcKind::LookupError => "LookupError",
            ExcKind::IndexError => "IndexError",
            ExcKind::KeyError => "KeyError",
            ExcKind::NameError => "NameError",
            ExcKind::TypeError => "TypeError",
            ExcKind::ValueError => "ValueError",
            ExcKind::AttributeError => "AttributeError",
            ExcKind::RuntimeError => "RuntimeError",
            ExcKind::NotImplementedError => "NotImplementedError",
            ExcKind::SystemError => "SystemError",
            ExcKind::StopIteration => "StopIteration",
            ExcKind::ImportError => "ImportError",
            ExcKind::ModuleNotFoundError => "ModuleNotFoundError",
            ExcKind::SyntaxError => "SyntaxError",
        }
    }

    fn parent(self) -> Option<ExcKind> {
        let parent = match self {
            ExcKind::BaseException => return None,
            ExcKind::Exception => ExcKind::BaseException,
            ExcKind::ZeroDivisionError | ExcKind::OverflowError => ExcKind::ArithmeticError,
            ExcKind::IndexError | ExcKind::KeyError => ExcKind::LookupError,
            ExcKind::NotImplementedError => ExcKind::RuntimeError,
            ExcKind::ModuleNotFoundError => ExcKind::ImportError,
            _ => ExcKind::Exception,
        };
        Some(parent)
    }

    /// The class object for this kind. Classes are created once per thread.
    pub fn class(self) -> Rc<ClassInfo> {
        if let Some(class) = CLASSES.with(|classes| classes.borrow().get(&self).cloned()) {
            return class;
        }
        let base = self.parent().map(ExcKind::class);
        let class = Rc::new(ClassInfo::new(self.name(), "builtins", base));
        CLASSES.with(|classes| classes.borrow_mut().insert(self, class.clone()));
        class
    }

    pub fn from_name(name: &str) -> Option<ExcKind> {
        ALL_KINDS.iter().copied().find(|kind| kind.name() == name)
    }
}

thread_local! {
    static CLASSES: RefCell<HashMap<ExcKind, Rc<ClassInfo>>> = RefCell::new(HashMap::new());
}

/// True when `class` derives from `BaseException`.
pub fn is_exception_class(class: &Rc<ClassInfo>) -> bool {
    class.is_subclass_of(&ExcKind::BaseException.class())
}

/// An exception instance.
#[derive(Clone)]
pub struct Exception {
    pub class: Rc<ClassInfo>,
    pub args: Vec<Value>,
    pub traceback: Vec<String>,
}

impl Exception {
    pub fn new(kind: ExcKind, message: impl Into<String>) -> Self {
        Exception::with_args(kind.class(), vec![Value::from(message.into())])
    }

    pub fn with_args(class: Rc<ClassInfo>, args: Vec<Value>) -> Self {
        Exception {
            class,
            args,
            traceback: Vec::new(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Exception::new(ExcKind::TypeError, message)
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Exception::new(ExcKind::ValueError, message)
    }

    pub fn is_instance_of(&self, class: &Rc<ClassInfo>) -> bool {
        self.class.is_subclass_of(class)
    }

    pub fn is(&self, kind: ExcKind) -> bool {
        self.is_instance_of(&kind.class())
    }

    pub fn type_object(&self) -> TypeObject {
        TypeObject::Class(self.class.clone())
    }

    /// `str(exception)`: empty, the lone argument, or the argument tuple.
    /// KeyError shows its lone argument as a repr.
    pub fn message(&self) -> String {
        match self.args.as_slice() {
            [] => String::new(),
            [only] if self.is(ExcKind::KeyError) => ops::repr(only),
            [only] => ops::str_lossy(only),
            many => ops::repr(&Value::tuple(many.to_vec())),
        }
    }

    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.traceback.push(frame.into());
        self
    }
}

impl fmt::Debug for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class.name, self.message())
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// A context's error indicator. The value may be unrealised: a bare
/// argument, an argument tuple, or nothing at all.
#[derive(Debug, Clone)]
pub struct PendingError {
    pub class: Rc<ClassInfo>,
    pub value: Option<Value>,
    pub traceback: Vec<String>,
}

impl PendingError {
    pub fn from_exception(exception: Exception) -> Self {
        let traceback = exception.traceback.clone();
        PendingError {
            class: exception.class.clone(),
            value: Some(Value::from(exception)),
            traceback,
        }
    }

    /// Realise the value into a full exception instance of `class`.
    pub fn normalize(self) -> Rc<Exception> {
        let PendingError {
            class,
            value,
            traceback,
        } = self;
        match value {
            Some(Value::Exception(exception)) if exception.class.is_subclass_of(&class) => {
                exception
            }
            Some(Value::Tuple(items)) => Rc::new(Exception {
                class,
                args: items.to_vec(),
                traceback,
            }),
            Some(value) => Rc::new(Exception {
                class,
                args: vec![value],
                traceback,
            }),
            None => Rc::new(Exception {
                class,
                args: Vec::new(),
                traceback,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchy_follows_the_builtin_tree() {
        let zero = Exception::new(ExcKind::ZeroDivisionError, "division by zero");
        assert!(zero.is(ExcKind::ArithmeticError));
        assert!(zero.is(ExcKind::Exception));
        assert!(!zero.is(ExcKind::LookupError));
        assert!(Rc::ptr_eq(&ExcKind::KeyError.class(), &ExcKind::KeyError.class()));
    }

    #[test]
    fn message_depends_on_argument_count() {
        assert_eq!(Exception::new(ExcKind::ValueError, "bad").message(), "bad");
        assert_eq!(Exception::new(ExcKind::KeyError, "k").message(), "'k'");
        let pair = Exception::with_args(
            ExcKind::Exception.class(),
            vec![Value::from("a"), Value::from(1_i64)],
        );
        assert_eq!(pair.message(), "('a', 1)");
    }

    #[test]
    fn normalize_realises_bare_values() {
        let pending = PendingError {
            class: ExcKind::RuntimeError.class(),
            value: Some(Value::from("late")),
            traceback: Vec::new(),
        };
        let exception = pending.normalize();
        assert!(exception.is(ExcKind::RuntimeError));
        assert_eq!(exception.message(), "late");

        let empty = PendingError {
            class: ExcKind::StopIteration.class(),
            value: None,
            traceback: Vec::new(),
        };
        assert!(empty.normalize().args.is_empty());
    }
}
