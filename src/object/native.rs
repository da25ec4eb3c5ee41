use std::any::Any;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use num_bigint::BigInt;

use super::context::Context;
use super::exception::{ExcKind, Exception};
use super::types::ClassInfo;
use super::value::Value;

pub type NativeFn = Rc<dyn Fn(&Context, CallArgs) -> Result<Value, Exception>>;

/// A callable implemented in Rust.
pub struct NativeFunction {
    pub name: String,
    pub func: NativeFn,
}

impl NativeFunction {
    pub fn new(
        name: &str,
        func: impl Fn(&Context, CallArgs) -> Result<Value, Exception> + 'static,
    ) -> Self {
        NativeFunction {
            name: name.to_string(),
            func: Rc::new(func),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Function(Rc::new(self))
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<built-in function {}>", self.name)
    }
}

/// Positional and keyword arguments of a call.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub keywords: IndexMap<String, Value>,
}

impl CallArgs {
    pub fn new(positional: Vec<Value>) -> Self {
        CallArgs {
            positional,
            keywords: IndexMap::new(),
        }
    }

    pub fn keyword(mut self, name: &str, value: Value) -> Self {
        self.keywords.insert(name.to_string(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keywords.is_empty()
    }

    /// Bind arguments to named parameters; the first `required` are
    /// mandatory. Returns one slot per parameter.
    pub fn bind(
        &self,
        function: &str,
        params: &[&str],
        required: usize,
    ) -> Result<Vec<Option<Value>>, Exception> {
        if self.positional.len() > params.len() {
            return Err(Exception::type_error(format!(
                "{function}() takes {} positional argument{} but {} {} given",
                params.len(),
                if params.len() == 1 { "" } else { "s" },
                self.positional.len(),
                if self.positional.len() == 1 { "was" } else { "were" },
            )));
        }
        let mut slots: Vec<Option<Value>> = vec![None; params.len()];
        for (slot, value) in slots.iter_mut().zip(&self.positional) {
            *slot = Some(value.clone());
        }
        self.bind_keywords(function, params, &mut slots)?;
        check_required(function, params, required, &slots)?;
        Ok(slots)
    }

    /// Like `bind`, but positional arguments after the leading parameters
    /// are collected instead of rejected. `keyword_only` parameters can
    /// only be passed by name.
    pub fn bind_varargs(
        &self,
        function: &str,
        leading: &[&str],
        required: usize,
        keyword_only: &[&str],
    ) -> Result<(Vec<Option<Value>>, Vec<Value>, Vec<Option<Value>>), Exception> {
        let split = self.positional.len().min(leading.len());
        let mut slots: Vec<Option<Value>> = vec![None; leading.len()];
        for (slot, value) in slots.iter_mut().zip(&self.positional[..split]) {
            *slot = Some(value.clone());
        }
        let rest = self.positional[split..].to_vec();

        let mut named: Vec<Option<Value>> = vec![None; keyword_only.len()];
        for (name, value) in &self.keywords {
            if let Some(index) = leading.iter().position(|p| p == name) {
                if slots[index].is_some() {
                    return Err(multiple_values(function, name));
                }
                slots[index] = Some(value.clone());
            } else if let Some(index) = keyword_only.iter().position(|p| p == name) {
                named[index] = Some(value.clone());
            } else {
                return Err(unexpected_keyword(function, name));
            }
        }
        check_required(function, leading, required, &slots)?;
        Ok((slots, rest, named))
    }

    fn bind_keywords(
        &self,
        function: &str,
        params: &[&str],
        slots: &mut [Option<Value>],
    ) -> Result<(), Exception> {
        for (name, value) in &self.keywords {
            let Some(index) = params.iter().position(|p| p == name) else {
                return Err(unexpected_keyword(function, name));
            };
            if slots[index].is_some() {
                return Err(multiple_values(function, name));
            }
            slots[index] = Some(value.clone());
        }
        Ok(())
    }

    /// Exactly `count` positional arguments and no keywords.
    pub fn exact(&self, function: &str, count: usize) -> Result<&[Value], Exception> {
        if !self.keywords.is_empty() {
            return Err(Exception::type_error(format!(
                "{function}() takes no keyword arguments"
            )));
        }
        if self.positional.len() != count {
            return Err(Exception::type_error(format!(
                "{function}() takes exactly {} argument{} ({} given)",
                count,
                if count == 1 { "" } else { "s" },
                self.positional.len()
            )));
        }
        Ok(&self.positional)
    }

    /// Between `min` and `max` positional arguments and no keywords.
    pub fn range(&self, function: &str, min: usize, max: usize) -> Result<&[Value], Exception> {
        if !self.keywords.is_empty() {
            return Err(Exception::type_error(format!(
                "{function}() takes no keyword arguments"
            )));
        }
        let given = self.positional.len();
        if given < min {
            return Err(Exception::type_error(format!(
                "{function}() expected at least {min} argument{}, got {given}",
                if min == 1 { "" } else { "s" }
            )));
        }
        if given > max {
            return Err(Exception::type_error(format!(
                "{function}() expected at most {max} argument{}, got {given}",
                if max == 1 { "" } else { "s" }
            )));
        }
        Ok(&self.positional)
    }
}

fn unexpected_keyword(function: &str, name: &str) -> Exception {
    Exception::type_error(format!(
        "{function}() got an unexpected keyword argument '{name}'"
    ))
}

fn multiple_values(function: &str, name: &str) -> Exception {
    Exception::type_error(format!(
        "{function}() got multiple values for argument '{name}'"
    ))
}

fn check_required(
    function: &str,
    params: &[&str],
    required: usize,
    slots: &[Option<Value>],
) -> Result<(), Exception> {
    for (name, slot) in params.iter().zip(slots).take(required) {
        if slot.is_none() {
            return Err(Exception::type_error(format!(
                "{function}() missing required argument: '{name}'"
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    TrueDiv,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    And,
    Or,
    Xor,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::TrueDiv => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::LShift => "<<",
            BinOp::RShift => ">>",
            BinOp::And => "&",
            BinOp::Or => "|",
            BinOp::Xor => "^",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Invert,
    Abs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Eq,
    Ne,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }

    /// The operator to try on the right operand when the left one
    /// declines.
    pub fn swapped(self) -> CmpOp {
        match self {
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::Le => CmpOp::Ge,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::Ge => CmpOp::Le,
            other => other,
        }
    }

    pub fn holds(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            CmpOp::Lt => ordering == Less,
            CmpOp::Le => ordering != Greater,
            CmpOp::Eq => ordering == Equal,
            CmpOp::Ne => ordering != Equal,
            CmpOp::Gt => ordering == Greater,
            CmpOp::Ge => ordering != Less,
        }
    }
}

/// Type slots of an object implemented in Rust. Every slot has a default
/// meaning "not supported", so implementors only fill in their protocols.
///
/// Slots returning `Option` report `None` for "no such slot"; binary and
/// comparison slots return `Value::NotImplemented` to let the other operand
/// try.
pub trait NativeObject {
    fn class(&self) -> Rc<ClassInfo>;

    fn as_any(&self) -> &dyn Any;

    fn repr(&self) -> Result<String, Exception> {
        let class = self.class();
        Ok(format!("<{} object>", class.qualified_name()))
    }

    fn str(&self) -> Result<String, Exception> {
        self.repr()
    }

    fn truthy(&self) -> Result<bool, Exception> {
        match self.len() {
            Some(len) => len.map(|n| n > 0),
            None => Ok(true),
        }
    }

    fn len(&self) -> Option<Result<usize, Exception>> {
        None
    }

    fn get_item(&self, _key: &Value) -> Option<Result<Value, Exception>> {
        None
    }

    fn set_item(&self, _key: &Value, _value: &Value) -> Option<Result<(), Exception>> {
        None
    }

    fn del_item(&self, _key: &Value) -> Option<Result<(), Exception>> {
        None
    }

    fn contains(&self, _item: &Value) -> Option<Result<bool, Exception>> {
        None
    }

    /// A fresh iterator over the object.
    fn iter(&self, _this: &Rc<dyn NativeObject>) -> Option<Result<Value, Exception>> {
        None
    }

    /// Advance an iterator: `Ok(None)` when exhausted.
    fn next(&self) -> Option<Result<Option<Value>, Exception>> {
        None
    }

    fn get_attr(&self, _this: &Rc<dyn NativeObject>, _name: &str) -> Option<Result<Value, Exception>> {
        None
    }

    fn set_attr(&self, _name: &str, _value: &Value) -> Option<Result<(), Exception>> {
        None
    }

    fn binary_op(&self, _op: BinOp, _other: &Value, _reflected: bool) -> Result<Value, Exception> {
        Ok(Value::NotImplemented)
    }

    fn inplace_op(
        &self,
        _this: &Rc<dyn NativeObject>,
        _op: BinOp,
        _other: &Value,
    ) -> Result<Value, Exception> {
        Ok(Value::NotImplemented)
    }

    fn unary_op(&self, _op: UnaryOp) -> Option<Result<Value, Exception>> {
        None
    }

    fn compare(&self, _op: CmpOp, _other: &Value) -> Result<Value, Exception> {
        Ok(Value::NotImplemented)
    }

    fn to_int(&self) -> Option<Result<BigInt, Exception>> {
        None
    }

    fn to_float(&self) -> Option<Result<f64, Exception>> {
        None
    }

    fn call(&self, _ctx: &Context, _args: CallArgs) -> Option<Result<Value, Exception>> {
        None
    }
}

/// `AttributeError` for a missing attribute.
pub fn no_attribute(type_name: &str, name: &str) -> Exception {
    Exception::new(
        ExcKind::AttributeError,
        format!("'{type_name}' object has no attribute '{name}'"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_fills_positional_then_keywords() {
        let args = CallArgs::new(vec![Value::from("x")]).keyword("to", Value::from("int"));
        let slots = args.bind("getvar", &["name", "to", "default"], 1).unwrap();
        assert_eq!(slots[0], Some(Value::from("x")));
        assert_eq!(slots[1], Some(Value::from("int")));
        assert!(slots[2].is_none());
    }

    #[test]
    fn bind_reports_bad_calls() {
        let missing = CallArgs::default().bind("getvar", &["name"], 1).unwrap_err();
        assert_eq!(missing.message(), "getvar() missing required argument: 'name'");

        let unknown = CallArgs::new(vec![Value::from("x")])
            .keyword("bogus", Value::None)
            .bind("getvar", &["name"], 1)
            .unwrap_err();
        assert_eq!(
            unknown.message(),
            "getvar() got an unexpected keyword argument 'bogus'"
        );

        let twice = CallArgs::new(vec![Value::from("x")])
            .keyword("name", Value::None)
            .bind("getvar", &["name"], 1)
            .unwrap_err();
        assert!(twice.is(ExcKind::TypeError));
    }

    #[test]
    fn varargs_split_leading_rest_and_keywords() {
        let args = CallArgs::new(vec![Value::from("cmd"), Value::from(1_i64), Value::from(2_i64)])
            .keyword("to", Value::from("int"));
        let (leading, rest, named) = args
            .bind_varargs("call", &["command"], 1, &["kwlist", "to"])
            .unwrap();
        assert_eq!(leading[0], Some(Value::from("cmd")));
        assert_eq!(rest.len(), 2);
        assert!(named[0].is_none());
        assert_eq!(named[1], Some(Value::from("int")));
    }
}
