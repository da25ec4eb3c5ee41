//! The script runtime: a small command language with lazily dual-represented
//! values, namespaces, procs and child interpreters.

pub mod commands;
mod expr;
pub mod flow;
pub mod interp;
pub mod leak_detector;
pub mod list_format;
pub mod number;
pub mod obj;
pub mod parser;
mod reader;

#[cfg(test)]
mod interp_test;
#[cfg(test)]
mod obj_test;

pub use flow::{EvalResult, Flow, ReturnCode, ScriptError};
pub use interp::{Interp, InterpId, WeakInterp};
pub use obj::{DictMap, Number, Obj};
