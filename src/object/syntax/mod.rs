//! Source language for `eval` and `exec`: expressions plus a handful of
//! simple statements.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use parser::{parse_expression, parse_program};
