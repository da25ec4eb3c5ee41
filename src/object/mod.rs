//! The object runtime: reference-counted dynamic values with Python-like
//! semantics, exceptions with a per-context pending indicator, modules,
//! native functions and native object types, and a small evaluator.

pub mod builtins;
pub mod context;
mod eval;
pub mod exception;
pub mod key;
pub mod methods;
pub mod native;
pub mod numeric;
pub mod ops;
pub mod syntax;
pub mod types;
pub mod value;

pub use context::{Context, ContextId, Module, ModuleLoader, Runtime};
pub use exception::{ExcKind, Exception, PendingError};
pub use key::Key;
pub use native::{BinOp, CallArgs, CmpOp, NativeFn, NativeFunction, NativeObject, UnaryOp};
pub use types::{BuiltinType, ClassInfo, TypeObject};
pub use value::{DictRef, ListRef, SetRef, Slice, Value};
