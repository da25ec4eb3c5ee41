//! Number protocol of proxies.
//!
//! An operand is numeric when it is a builtin number or a proxy whose
//! value parses as one. Two numeric operands use the object runtime's
//! arithmetic; `+` with a non-numeric proxy concatenates text instead.

use std::rc::Rc;

use num_bigint::BigInt;

use crate::error::{BridgeError, Result};
use crate::object::builtins::float_to_int;
use crate::object::numeric::{self, Num};
use crate::object::{BinOp, NativeObject, UnaryOp, Value};
use crate::script::{Number, Obj};

use super::{Flavour, Proxy};
use crate::bridge::convert::to_obj;

fn as_num(obj: &Obj) -> Option<Num> {
    match obj.number()? {
        Number::Int(i) => Some(Num::Int(i)),
        Number::Double(d) => Some(Num::Float(d)),
    }
}

/// Numeric view of an operand; `None` when it has none.
fn operand_number(value: &Value) -> Result<Option<Num>> {
    if let Some(proxy) = value.as_native::<Proxy>() {
        return Ok(as_num(&proxy.obj()?));
    }
    Ok(Num::from_value(value))
}

/// Text of an operand `+` can concatenate with.
fn concat_text(value: &Value) -> Result<Option<Rc<str>>> {
    match value {
        Value::Native(_) => match value.as_native::<Proxy>() {
            Some(proxy) => Ok(Some(proxy.text()?)),
            None => Ok(None),
        },
        Value::Str(text) => Ok(Some(text.clone())),
        Value::Int(_) | Value::Float(_) => Ok(Some(to_obj(value)?.text())),
        _ => Ok(None),
    }
}

pub fn binary(proxy: &Proxy, op: BinOp, other: &Value, reflected: bool) -> Result<Value> {
    let obj = proxy.obj()?;
    let mine = as_num(&obj);
    let theirs = operand_number(other)?;

    if let (Some(a), Some(b)) = (&mine, &theirs) {
        let (left, right) = if reflected { (b, a) } else { (a, b) };
        return match numeric::binary(op, left, right) {
            Some(result) => Ok(result?.into_value()),
            None => Ok(Value::NotImplemented),
        };
    }

    if op == BinOp::Add
        && let Some(text) = concat_text(other)?
    {
        let joined = if reflected {
            format!("{text}{}", obj.as_str())
        } else {
            format!("{}{text}", obj.as_str())
        };
        return Ok(Proxy::owned(Obj::new(joined), Flavour::List).into_value());
    }

    if other.as_native::<Proxy>().is_some() || theirs.is_some() {
        let (left, right) = if reflected {
            (other.type_name(), proxy.class().name.clone())
        } else {
            (proxy.class().name.clone(), other.type_name())
        };
        return Err(numeric::unsupported(op.symbol(), &left, &right).into());
    }
    Ok(Value::NotImplemented)
}

/// `proxy <op>= other`: the result is written back through the binding
/// and the proxy itself is the value of the statement.
pub fn inplace(
    proxy: &Proxy,
    this: &Rc<dyn NativeObject>,
    op: BinOp,
    other: &Value,
) -> Result<Value> {
    let result = binary(proxy, op, other, false)?;
    if matches!(result, Value::NotImplemented) {
        return Ok(result);
    }
    proxy.set_obj(to_obj(&result)?)?;
    Ok(Value::Native(this.clone()))
}

pub fn unary(proxy: &Proxy, op: UnaryOp) -> Result<Value> {
    let obj = proxy.obj()?;
    let Some(number) = as_num(&obj) else {
        return Err(BridgeError::TypeCoercion(format!(
            "expected number but got \"{}\"",
            obj.as_str()
        )));
    };
    Ok(numeric::unary(op, &number)?.into_value())
}

pub fn to_int(proxy: &Proxy) -> Result<BigInt> {
    let obj = proxy.obj()?;
    match obj.number() {
        Some(Number::Int(i)) => Ok(i),
        Some(Number::Double(d)) => Ok(float_to_int(d)?),
        None => obj.int().map_err(BridgeError::TypeCoercion),
    }
}

pub fn to_float(proxy: &Proxy) -> Result<f64> {
    proxy.obj()?.double().map_err(BridgeError::TypeCoercion)
}

/// Numbers are true when non-zero, boolean words by their meaning, and
/// any other text when non-empty.
pub fn truthy(proxy: &Proxy) -> Result<bool> {
    let obj = proxy.obj()?;
    if let Some(number) = as_num(&obj) {
        return Ok(!number.is_zero());
    }
    match obj.boolean() {
        Ok(value) => Ok(value),
        Err(_) => Ok(!obj.as_str().is_empty()),
    }
}
