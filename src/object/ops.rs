//! Generic operations on values: rendering, truthiness, operators,
//! containers, attributes, calls and iteration. Native objects are
//! dispatched through their slots; everything else is handled here.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

use super::context::Context;
use super::exception::{is_exception_class, ExcKind, Exception};
use super::key::Key;
use super::methods;
use super::native::{no_attribute, BinOp, CallArgs, CmpOp, NativeObject, UnaryOp};
use super::numeric::{self, Num};
use super::types::{BuiltinType, TypeObject};
use super::value::{Slice, Value};
use super::builtins;

// -------------------------------------------------------------------------
// Rendering
// -------------------------------------------------------------------------

thread_local! {
    static REPR_STACK: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Run `render` unless the container at `address` is already being
/// rendered further up the stack.
fn guarded(address: usize, placeholder: &str, render: impl FnOnce() -> String) -> String {
    let active = REPR_STACK.with(|stack| stack.borrow().contains(&address));
    if active {
        return placeholder.to_string();
    }
    REPR_STACK.with(|stack| stack.borrow_mut().push(address));
    let text = render();
    REPR_STACK.with(|stack| stack.borrow_mut().pop());
    text
}

/// `repr(value)`. A native whose repr slot fails renders generically.
pub fn repr(value: &Value) -> String {
    match try_repr(value) {
        Ok(text) => text,
        Err(_) => format!("<{} object>", value.type_name()),
    }
}

pub fn try_repr(value: &Value) -> Result<String, Exception> {
    let text = match value {
        Value::None => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format_float(*f),
        Value::Str(s) => quote_str(s),
        Value::Bytes(b) => bytes_repr(b),
        Value::List(items) => guarded(Rc::as_ptr(items) as *const () as usize, "[...]", || {
            format!("[{}]", join_reprs(items.borrow().iter()))
        }),
        Value::Tuple(items) => {
            if items.len() == 1 {
                format!("({},)", repr(&items[0]))
            } else {
                format!("({})", join_reprs(items.iter()))
            }
        }
        Value::Set(items) => {
            let items = items.borrow();
            if items.is_empty() {
                "set()".to_string()
            } else {
                let values: Vec<Value> = items.iter().map(Key::to_value).collect();
                format!("{{{}}}", join_reprs(values.iter()))
            }
        }
        Value::Dict(map) => guarded(Rc::as_ptr(map) as *const () as usize, "{...}", || {
            let map = map.borrow();
            let parts: Vec<String> = map
                .iter()
                .map(|(key, value)| format!("{}: {}", repr(&key.to_value()), repr(value)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }),
        Value::Slice(slice) => format!(
            "slice({}, {}, {})",
            repr(&slice.start),
            repr(&slice.stop),
            repr(&slice.step)
        ),
        Value::Function(function) => format!("<built-in function {}>", function.name),
        Value::Module(module) => format!("<module '{}'>", module.name),
        Value::Type(type_object) => format!("<class '{}'>", type_object.qualified_name()),
        Value::Exception(exception) => {
            format!(
                "{}({})",
                exception.class.name,
                join_reprs(exception.args.iter())
            )
        }
        Value::Native(object) => return object.repr(),
        Value::NotImplemented => "NotImplemented".to_string(),
    };
    Ok(text)
}

fn join_reprs<'a>(values: impl Iterator<Item = &'a Value>) -> String {
    values.map(repr).collect::<Vec<_>>().join(", ")
}

/// `str(value)`. Fails only when a native's str slot fails.
pub fn str(value: &Value) -> Result<String, Exception> {
    match value {
        Value::Str(s) => Ok(s.to_string()),
        Value::Exception(exception) => Ok(exception.message()),
        Value::Native(object) => object.str(),
        other => try_repr(other),
    }
}

pub fn str_lossy(value: &Value) -> String {
    str(value).unwrap_or_else(|_| repr(value))
}

/// Shortest round-trip float rendering.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf".into() } else { "-inf".into() };
    }
    crate::script::number::render_finite(value)
}

fn quote_str(text: &str) -> String {
    let quote = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(text.len() + 2);
    out.push(quote);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn bytes_repr(bytes: &[u8]) -> String {
    let quote = if bytes.contains(&b'\'') && !bytes.contains(&b'"') {
        b'"'
    } else {
        b'\''
    };
    let mut out = String::from("b");
    out.push(quote as char);
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            b if b == quote => {
                out.push('\\');
                out.push(b as char);
            }
            0x20..=0x7e => out.push(b as char),
            b => out.push_str(&format!("\\x{b:02x}")),
        }
    }
    out.push(quote as char);
    out
}

// -------------------------------------------------------------------------
// Truthiness and equality
// -------------------------------------------------------------------------

pub fn truthy(value: &Value) -> Result<bool, Exception> {
    let result = match value {
        Value::None => false,
        Value::Bool(b) => *b,
        Value::Int(i) => !i.is_zero(),
        Value::Float(f) => *f != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::Bytes(b) => !b.is_empty(),
        Value::List(items) => !items.borrow().is_empty(),
        Value::Tuple(items) => !items.is_empty(),
        Value::Set(items) => !items.borrow().is_empty(),
        Value::Dict(map) => !map.borrow().is_empty(),
        Value::Native(object) => return object.truthy(),
        _ => true,
    };
    Ok(result)
}

/// `a == b` without the possibility of failure: natives that cannot
/// answer compare by identity.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (Num::from_value(a), Num::from_value(b)) {
        return numeric::compare(&x, &y) == Some(Ordering::Equal);
    }
    match (a, b) {
        (Value::None, Value::None) | (Value::NotImplemented, Value::NotImplemented) => true,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Bytes(x), Value::Bytes(y)) => x == y,
        (Value::List(x), Value::List(y)) => {
            Rc::ptr_eq(x, y) || sequences_equal(&x.borrow(), &y.borrow())
        }
        (Value::Tuple(x), Value::Tuple(y)) => sequences_equal(x, y),
        (Value::Set(x), Value::Set(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len() && x.iter().all(|key| y.contains(key))
        }
        (Value::Dict(x), Value::Dict(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && x.iter()
                    .all(|(key, value)| y.get(key).is_some_and(|other| values_equal(value, other)))
        }
        (Value::Native(_), _) | (_, Value::Native(_)) => {
            match compare(CmpOp::Eq, a, b) {
                Ok(Value::Bool(result)) => result,
                Ok(other) => truthy(&other).unwrap_or(false),
                Err(_) => a.is(b),
            }
        }
        _ => a.is(b),
    }
}

fn sequences_equal(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
}

// -------------------------------------------------------------------------
// Operators
// -------------------------------------------------------------------------

/// `a <op> b`: the left native's slot, then the right native's reflected
/// slot, then the builtin meaning.
pub fn binary(op: BinOp, a: &Value, b: &Value) -> Result<Value, Exception> {
    if let Value::Native(object) = a {
        let result = object.binary_op(op, b, false)?;
        if !matches!(result, Value::NotImplemented) {
            return Ok(result);
        }
    }
    if let Value::Native(object) = b {
        let result = object.binary_op(op, a, true)?;
        if !matches!(result, Value::NotImplemented) {
            return Ok(result);
        }
    }
    if let Some(result) = builtin_binary(op, a, b) {
        return result;
    }
    Err(numeric::unsupported(op.symbol(), &a.type_name(), &b.type_name()))
}

fn builtin_binary(op: BinOp, a: &Value, b: &Value) -> Option<Result<Value, Exception>> {
    if let (Some(x), Some(y)) = (Num::from_value(a), Num::from_value(b)) {
        if let (Value::Bool(p), Value::Bool(q), BinOp::And | BinOp::Or | BinOp::Xor) = (a, b, op) {
            let result = match op {
                BinOp::And => p & q,
                BinOp::Or => p | q,
                _ => p ^ q,
            };
            return Some(Ok(Value::Bool(result)));
        }
        return numeric::binary(op, &x, &y).map(|r| r.map(Num::into_value));
    }
    let result = match (op, a, b) {
        (BinOp::Add, Value::Str(x), Value::Str(y)) => Ok(Value::from(format!("{x}{y}"))),
        (BinOp::Add, Value::Bytes(x), Value::Bytes(y)) => Ok(Value::bytes(&[&x[..], &y[..]].concat())),
        (BinOp::Add, Value::List(x), Value::List(y)) => {
            let mut items = x.borrow().clone();
            items.extend(y.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        (BinOp::Add, Value::Tuple(x), Value::Tuple(y)) => {
            Ok(Value::tuple(x.iter().chain(y.iter()).cloned().collect()))
        }
        (BinOp::Mul, seq, Value::Int(n)) | (BinOp::Mul, Value::Int(n), seq)
            if is_sequence(seq) =>
        {
            repeat(seq, n)
        }
        (BinOp::Or | BinOp::And | BinOp::Sub | BinOp::Xor, Value::Set(x), Value::Set(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            let result = match op {
                BinOp::Or => x.union(&y).cloned().collect(),
                BinOp::And => x.intersection(&y).cloned().collect(),
                BinOp::Sub => x.difference(&y).cloned().collect(),
                _ => x.symmetric_difference(&y).cloned().collect(),
            };
            Ok(Value::set(result))
        }
        (BinOp::Or, Value::Dict(x), Value::Dict(y)) => {
            let mut map = x.borrow().clone();
            for (key, value) in y.borrow().iter() {
                map.insert(key.clone(), value.clone());
            }
            Ok(Value::dict(map))
        }
        _ => return None,
    };
    Some(result)
}

fn is_sequence(value: &Value) -> bool {
    matches!(
        value,
        Value::Str(_) | Value::Bytes(_) | Value::List(_) | Value::Tuple(_)
    )
}

fn repeat(sequence: &Value, count: &BigInt) -> Result<Value, Exception> {
    let count = if count.is_negative() {
        0
    } else {
        count.to_usize().ok_or_else(repeat_overflow)?
    };
    let len = match sequence {
        Value::Str(s) => s.len(),
        Value::Bytes(b) => b.len(),
        Value::List(items) => items.borrow().len(),
        Value::Tuple(items) => items.len(),
        _ => 0,
    };
    if len.checked_mul(count).is_none() {
        return Err(repeat_overflow());
    }
    let result = match sequence {
        Value::Str(s) => Value::from(s.repeat(count)),
        Value::Bytes(b) => Value::bytes(&b.repeat(count)),
        Value::List(items) => {
            let items = items.borrow();
            Value::list((0..count).flat_map(|_| items.iter().cloned()).collect())
        }
        Value::Tuple(items) => Value::tuple((0..count).flat_map(|_| items.iter().cloned()).collect()),
        other => {
            return Err(Exception::type_error(format!(
                "can't multiply sequence of type '{}'",
                other.type_name()
            )));
        }
    };
    Ok(result)
}

fn repeat_overflow() -> Exception {
    Exception::new(ExcKind::OverflowError, "cannot fit 'int' into an index-sized integer")
}

/// `a <op>= b`. Returns the value to store back into the target.
pub fn inplace(op: BinOp, a: &Value, b: &Value) -> Result<Value, Exception> {
    match (op, a) {
        (_, Value::Native(object)) => {
            let result = object.inplace_op(object, op, b)?;
            if !matches!(result, Value::NotImplemented) {
                return Ok(result);
            }
        }
        (BinOp::Add, Value::List(items)) => {
            let extra = collect(b)?;
            items.borrow_mut().extend(extra);
            return Ok(a.clone());
        }
        (BinOp::Or, Value::Set(items)) => {
            let extra = collect(b)?
                .iter()
                .map(hash_key)
                .collect::<Result<Vec<_>, _>>()?;
            items.borrow_mut().extend(extra);
            return Ok(a.clone());
        }
        (BinOp::Or, Value::Dict(map)) => {
            if let Value::Dict(other) = b {
                let pairs: Vec<_> = other
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                map.borrow_mut().extend(pairs);
                return Ok(a.clone());
            }
        }
        _ => {}
    }
    binary(op, a, b)
}

pub fn unary(op: UnaryOp, value: &Value) -> Result<Value, Exception> {
    if let Value::Native(object) = value
        && let Some(result) = object.unary_op(op)
    {
        return result;
    }
    match Num::from_value(value) {
        Some(number) => numeric::unary(op, &number).map(Num::into_value),
        None => {
            let symbol = match op {
                UnaryOp::Neg => "unary -",
                UnaryOp::Pos => "unary +",
                UnaryOp::Invert => "unary ~",
                UnaryOp::Abs => "abs()",
            };
            Err(Exception::type_error(format!(
                "bad operand type for {symbol}: '{}'",
                value.type_name()
            )))
        }
    }
}

/// Rich comparison. Natives get the first say, reflected if needed.
pub fn compare(op: CmpOp, a: &Value, b: &Value) -> Result<Value, Exception> {
    if let Value::Native(object) = a {
        let result = object.compare(op, b)?;
        if !matches!(result, Value::NotImplemented) {
            return Ok(result);
        }
    }
    if let Value::Native(object) = b {
        let result = object.compare(op.swapped(), a)?;
        if !matches!(result, Value::NotImplemented) {
            return Ok(result);
        }
    }
    match op {
        CmpOp::Eq if is_native(a) || is_native(b) => Ok(Value::Bool(a.is(b))),
        CmpOp::Ne if is_native(a) || is_native(b) => Ok(Value::Bool(!a.is(b))),
        CmpOp::Eq => Ok(Value::Bool(values_equal(a, b))),
        CmpOp::Ne => Ok(Value::Bool(!values_equal(a, b))),
        _ => match order(a, b)? {
            Some(ordering) => Ok(Value::Bool(op.holds(ordering))),
            None => Ok(Value::Bool(false)),
        },
    }
}

pub fn compare_bool(op: CmpOp, a: &Value, b: &Value) -> Result<bool, Exception> {
    truthy(&compare(op, a, b)?)
}

fn is_native(value: &Value) -> bool {
    matches!(value, Value::Native(_))
}

/// Ordering of two builtin values; `None` for unordered floats.
fn order(a: &Value, b: &Value) -> Result<Option<Ordering>, Exception> {
    if let (Some(x), Some(y)) = (Num::from_value(a), Num::from_value(b)) {
        return Ok(numeric::compare(&x, &y));
    }
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(Some(x.cmp(y))),
        (Value::Bytes(x), Value::Bytes(y)) => Ok(Some(x.cmp(y))),
        (Value::List(x), Value::List(y)) => order_sequences(&x.borrow(), &y.borrow()),
        (Value::Tuple(x), Value::Tuple(y)) => order_sequences(x, y),
        _ => Err(Exception::type_error(format!(
            "'<' not supported between instances of '{}' and '{}'",
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn order_sequences(a: &[Value], b: &[Value]) -> Result<Option<Ordering>, Exception> {
    for (x, y) in a.iter().zip(b) {
        if !values_equal(x, y) {
            return order(x, y);
        }
    }
    Ok(Some(a.len().cmp(&b.len())))
}

// -------------------------------------------------------------------------
// Containers
// -------------------------------------------------------------------------

pub fn len(value: &Value) -> Result<usize, Exception> {
    let length = match value {
        Value::Str(s) => s.chars().count(),
        Value::Bytes(b) => b.len(),
        Value::List(items) => items.borrow().len(),
        Value::Tuple(items) => items.len(),
        Value::Set(items) => items.borrow().len(),
        Value::Dict(map) => map.borrow().len(),
        Value::Native(object) => match object.len() {
            Some(result) => return result,
            None => return Err(no_len(value)),
        },
        _ => return Err(no_len(value)),
    };
    Ok(length)
}

fn no_len(value: &Value) -> Exception {
    Exception::type_error(format!(
        "object of type '{}' has no len()",
        value.type_name()
    ))
}

pub fn contains(container: &Value, item: &Value) -> Result<bool, Exception> {
    match container {
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(&**needle)),
            other => Err(Exception::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Value::Bytes(haystack) => match item {
            Value::Bytes(needle) => Ok(needle.is_empty()
                || haystack.windows(needle.len()).any(|w| w == &needle[..])),
            Value::Int(i) => Ok(i.to_u8().is_some_and(|b| haystack.contains(&b))),
            other => Err(Exception::type_error(format!(
                "a bytes-like object is required, not '{}'",
                other.type_name()
            ))),
        },
        Value::List(items) => Ok(items.borrow().iter().any(|x| values_equal(x, item))),
        Value::Tuple(items) => Ok(items.iter().any(|x| values_equal(x, item))),
        Value::Set(items) => Ok(items.borrow().contains(&hash_key(item)?)),
        Value::Dict(map) => Ok(map.borrow().contains_key(&hash_key(item)?)),
        Value::Native(object) => match object.contains(item) {
            Some(result) => result,
            None => {
                for candidate in iter(container)? {
                    if values_equal(&candidate?, item) {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        },
        other => Err(Exception::type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

/// Hashable form of `value`, or `TypeError` for unhashable values.
pub fn hash_key(value: &Value) -> Result<Key, Exception> {
    value.to_key().ok_or_else(|| {
        Exception::type_error(format!("unhashable type: '{}'", value.type_name()))
    })
}

/// An integer usable as an index.
pub fn index_value(value: &Value) -> Option<BigInt> {
    match value {
        Value::Int(i) => Some(i.clone()),
        Value::Bool(b) => Some(BigInt::from(u8::from(*b))),
        _ => None,
    }
}

/// Resolve a possibly negative index against `len`.
pub fn normalize_index(index: &BigInt, len: usize) -> Option<usize> {
    let index = index.to_i64()?;
    let resolved = if index < 0 { index + len as i64 } else { index };
    if resolved < 0 || resolved >= len as i64 {
        None
    } else {
        Some(resolved as usize)
    }
}

fn optional_i64(value: &Value, what: &str) -> Result<Option<i64>, Exception> {
    match value {
        Value::None => Ok(None),
        other => match index_value(other) {
            Some(i) => Ok(Some(i.to_i64().unwrap_or(if i.is_negative() {
                i64::MIN
            } else {
                i64::MAX
            }))),
            None => Err(Exception::type_error(format!(
                "slice {what} must be an integer or None"
            ))),
        },
    }
}

/// Positions selected by `slice` over a sequence of length `len`.
pub fn slice_positions(slice: &Slice, len: usize) -> Result<Vec<usize>, Exception> {
    let step = optional_i64(&slice.step, "indices")?.unwrap_or(1);
    if step == 0 {
        return Err(Exception::value_error("slice step cannot be zero"));
    }
    let len = len as i64;
    let clamp = |bound: Option<i64>, default: i64| -> i64 {
        match bound {
            None => default,
            Some(i) if i < 0 => {
                let shifted = i.saturating_add(len);
                if step < 0 { shifted.max(-1) } else { shifted.max(0) }
            }
            Some(i) => {
                if step < 0 { i.min(len - 1) } else { i.min(len) }
            }
        }
    };
    let (start, stop) = if step > 0 {
        (clamp(optional_i64(&slice.start, "indices")?, 0), clamp(optional_i64(&slice.stop, "indices")?, len))
    } else {
        (clamp(optional_i64(&slice.start, "indices")?, len - 1), clamp(optional_i64(&slice.stop, "indices")?, -1))
    };

    let mut positions = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        positions.push(i as usize);
        match i.checked_add(step) {
            Some(next) => i = next,
            None => break,
        }
    }
    Ok(positions)
}

pub fn get_item(container: &Value, key: &Value) -> Result<Value, Exception> {
    if let Value::Native(object) = container {
        return match object.get_item(key) {
            Some(result) => result,
            None => Err(not_subscriptable(container)),
        };
    }
    if let Value::Dict(map) = container {
        let found = map.borrow().get(&hash_key(key)?).cloned();
        return found.ok_or_else(|| Exception::with_args(ExcKind::KeyError.class(), vec![key.clone()]));
    }
    if let Value::Slice(slice) = key {
        return slice_sequence(container, slice);
    }
    let Some(index) = index_value(key) else {
        return match container {
            Value::Str(_) | Value::Bytes(_) | Value::List(_) | Value::Tuple(_) => {
                Err(Exception::type_error(format!(
                    "{} indices must be integers or slices, not {}",
                    container.type_name(),
                    key.type_name()
                )))
            }
            _ => Err(not_subscriptable(container)),
        };
    };
    let out_of_range = || {
        Exception::new(
            ExcKind::IndexError,
            format!("{} index out of range", container.type_name()),
        )
    };
    match container {
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let at = normalize_index(&index, chars.len()).ok_or_else(out_of_range)?;
            Ok(Value::from(chars[at].to_string()))
        }
        Value::Bytes(b) => {
            let at = normalize_index(&index, b.len()).ok_or_else(out_of_range)?;
            Ok(Value::from(i64::from(b[at])))
        }
        Value::List(items) => {
            let items = items.borrow();
            let at = normalize_index(&index, items.len()).ok_or_else(out_of_range)?;
            Ok(items[at].clone())
        }
        Value::Tuple(items) => {
            let at = normalize_index(&index, items.len()).ok_or_else(out_of_range)?;
            Ok(items[at].clone())
        }
        _ => Err(not_subscriptable(container)),
    }
}

fn slice_sequence(container: &Value, slice: &Slice) -> Result<Value, Exception> {
    let result = match container {
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let picked: String = slice_positions(slice, chars.len())?
                .into_iter()
                .map(|i| chars[i])
                .collect();
            Value::from(picked)
        }
        Value::Bytes(b) => {
            let picked: Vec<u8> = slice_positions(slice, b.len())?
                .into_iter()
                .map(|i| b[i])
                .collect();
            Value::bytes(&picked)
        }
        Value::List(items) => {
            let items = items.borrow();
            Value::list(
                slice_positions(slice, items.len())?
                    .into_iter()
                    .map(|i| items[i].clone())
                    .collect(),
            )
        }
        Value::Tuple(items) => Value::tuple(
            slice_positions(slice, items.len())?
                .into_iter()
                .map(|i| items[i].clone())
                .collect(),
        ),
        _ => return Err(not_subscriptable(container)),
    };
    Ok(result)
}

fn not_subscriptable(value: &Value) -> Exception {
    Exception::type_error(format!(
        "'{}' object is not subscriptable",
        value.type_name()
    ))
}

pub fn set_item(container: &Value, key: &Value, value: Value) -> Result<(), Exception> {
    match container {
        Value::Native(object) => match object.set_item(key, &value) {
            Some(result) => result,
            None => Err(no_item_assignment(container)),
        },
        Value::Dict(map) => {
            let key = hash_key(key)?;
            map.borrow_mut().insert(key, value);
            Ok(())
        }
        Value::List(items) => {
            if let Value::Slice(slice) = key {
                let replacement = collect(&value)?;
                let mut items = items.borrow_mut();
                let positions = slice_positions(slice, items.len())?;
                let (start, end) = match (positions.first(), positions.last()) {
                    (Some(&first), Some(&last)) => (first, last + 1),
                    _ => {
                        let start = optional_i64(&slice.start, "indices")?
                            .map_or(0, |i| i.clamp(0, items.len() as i64) as usize);
                        (start, start)
                    }
                };
                items.splice(start..end, replacement);
                return Ok(());
            }
            let index = index_value(key).ok_or_else(|| {
                Exception::type_error(format!(
                    "list indices must be integers or slices, not {}",
                    key.type_name()
                ))
            })?;
            let mut items = items.borrow_mut();
            let at = normalize_index(&index, items.len()).ok_or_else(|| {
                Exception::new(ExcKind::IndexError, "list assignment index out of range")
            })?;
            items[at] = value;
            Ok(())
        }
        _ => Err(no_item_assignment(container)),
    }
}

fn no_item_assignment(value: &Value) -> Exception {
    Exception::type_error(format!(
        "'{}' object does not support item assignment",
        value.type_name()
    ))
}

pub fn del_item(container: &Value, key: &Value) -> Result<(), Exception> {
    match container {
        Value::Native(object) => match object.del_item(key) {
            Some(result) => result,
            None => Err(no_item_deletion(container)),
        },
        Value::Dict(map) => {
            let removed = map.borrow_mut().shift_remove(&hash_key(key)?);
            match removed {
                Some(_) => Ok(()),
                None => Err(Exception::with_args(ExcKind::KeyError.class(), vec![key.clone()])),
            }
        }
        Value::List(items) => {
            let index = index_value(key).ok_or_else(|| {
                Exception::type_error(format!(
                    "list indices must be integers or slices, not {}",
                    key.type_name()
                ))
            })?;
            let mut items = items.borrow_mut();
            let at = normalize_index(&index, items.len()).ok_or_else(|| {
                Exception::new(ExcKind::IndexError, "list assignment index out of range")
            })?;
            items.remove(at);
            Ok(())
        }
        _ => Err(no_item_deletion(container)),
    }
}

fn no_item_deletion(value: &Value) -> Exception {
    Exception::type_error(format!(
        "'{}' object doesn't support item deletion",
        value.type_name()
    ))
}

// -------------------------------------------------------------------------
// Attributes and calls
// -------------------------------------------------------------------------

pub fn get_attr(value: &Value, name: &str) -> Result<Value, Exception> {
    match value {
        Value::Module(module) => module.get(name).ok_or_else(|| {
            Exception::new(
                ExcKind::AttributeError,
                format!("module '{}' has no attribute '{name}'", module.name),
            )
        }),
        Value::Native(object) => match object.get_attr(object, name) {
            Some(result) => result,
            None => Err(no_attribute(&value.type_name(), name)),
        },
        Value::Exception(exception) if name == "args" => {
            Ok(Value::tuple(exception.args.clone()))
        }
        Value::Type(type_object) if name == "__name__" => Ok(Value::from(type_object.name())),
        Value::Function(function) if name == "__name__" => {
            Ok(Value::from(function.name.clone()))
        }
        other => methods::lookup(other, name)
            .ok_or_else(|| no_attribute(&other.type_name(), name)),
    }
}

pub fn set_attr(target: &Value, name: &str, value: Value) -> Result<(), Exception> {
    match target {
        Value::Module(module) => {
            module.set(name, value);
            Ok(())
        }
        Value::Native(object) => match object.set_attr(name, &value) {
            Some(result) => result,
            None => Err(no_attribute(&target.type_name(), name)),
        },
        other => Err(no_attribute(&other.type_name(), name)),
    }
}

pub fn call(ctx: &Context, callable: &Value, args: CallArgs) -> Result<Value, Exception> {
    match callable {
        Value::Function(function) => (function.func)(ctx, args),
        Value::Type(TypeObject::Builtin(builtin)) => builtins::construct(ctx, *builtin, args),
        Value::Type(TypeObject::Class(class)) => {
            if let Some(constructor) = &class.constructor {
                return constructor(ctx, args);
            }
            if is_exception_class(class) {
                if !args.keywords.is_empty() {
                    return Err(Exception::type_error(format!(
                        "{}() takes no keyword arguments",
                        class.name
                    )));
                }
                return Ok(Value::from(Exception::with_args(class.clone(), args.positional)));
            }
            Err(Exception::type_error(format!(
                "cannot create '{}' instances",
                class.qualified_name()
            )))
        }
        Value::Native(object) => match object.call(ctx, args) {
            Some(result) => result,
            None => Err(not_callable(callable)),
        },
        other => Err(not_callable(other)),
    }
}

fn not_callable(value: &Value) -> Exception {
    Exception::type_error(format!("'{}' object is not callable", value.type_name()))
}

pub fn is_callable(value: &Value) -> bool {
    match value {
        Value::Function(_) | Value::Type(_) => true,
        Value::Native(object) => object.get_attr(object, "__call__").is_some(),
        _ => false,
    }
}

pub fn is_instance(value: &Value, type_object: &TypeObject) -> bool {
    value.type_object().is_subclass_of(type_object)
}

// -------------------------------------------------------------------------
// Iteration
// -------------------------------------------------------------------------

/// An iteration in progress: a snapshot of a builtin container, or a
/// native iterator object.
pub enum ValueIter {
    Items(std::vec::IntoIter<Value>),
    Native(Rc<dyn NativeObject>),
}

impl Iterator for ValueIter {
    type Item = Result<Value, Exception>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            ValueIter::Items(items) => items.next().map(Ok),
            ValueIter::Native(object) => match object.next() {
                Some(Ok(Some(value))) => Some(Ok(value)),
                Some(Ok(None)) => None,
                Some(Err(error)) => Some(Err(error)),
                None => Some(Err(Exception::type_error(format!(
                    "'{}' object is not an iterator",
                    object.class().name
                )))),
            },
        }
    }
}

pub fn iter(value: &Value) -> Result<ValueIter, Exception> {
    let items: Vec<Value> = match value {
        Value::Str(s) => s.chars().map(|c| Value::from(c.to_string())).collect(),
        Value::Bytes(b) => b.iter().map(|&byte| Value::from(i64::from(byte))).collect(),
        Value::List(items) => items.borrow().clone(),
        Value::Tuple(items) => items.to_vec(),
        Value::Set(items) => items.borrow().iter().map(Key::to_value).collect(),
        Value::Dict(map) => map.borrow().keys().map(Key::to_value).collect(),
        Value::Native(object) => {
            return match object.iter(object) {
                Some(Ok(Value::Native(iterator))) => Ok(ValueIter::Native(iterator)),
                Some(Ok(other)) => iter(&other),
                Some(Err(error)) => Err(error),
                None => Err(not_iterable(value)),
            };
        }
        other => return Err(not_iterable(other)),
    };
    Ok(ValueIter::Items(items.into_iter()))
}

fn not_iterable(value: &Value) -> Exception {
    Exception::type_error(format!("'{}' object is not iterable", value.type_name()))
}

pub fn collect(value: &Value) -> Result<Vec<Value>, Exception> {
    iter(value)?.collect()
}

/// Identify a builtin type object by value.
pub fn builtin_type(value: &Value) -> Option<BuiltinType> {
    match value {
        Value::Type(TypeObject::Builtin(builtin)) => Some(*builtin),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i64) -> Value {
        Value::from(i)
    }

    #[test]
    fn reprs_match_the_object_runtime() {
        assert_eq!(repr(&Value::from("it's")), "\"it's\"");
        assert_eq!(repr(&Value::from("a\nb")), "'a\\nb'");
        assert_eq!(repr(&Value::from(1.0)), "1.0");
        assert_eq!(repr(&Value::from(1e16)), "1e+16");
        assert_eq!(repr(&Value::from(f64::INFINITY)), "inf");
        assert_eq!(repr(&Value::tuple(vec![int(1)])), "(1,)");
        assert_eq!(repr(&Value::bytes(b"a\x00")), "b'a\\x00'");
        assert_eq!(repr(&Value::set(Default::default())), "set()");
        assert_eq!(
            repr(&Value::list(vec![Value::None, Value::Bool(true), Value::from("x")])),
            "[None, True, 'x']"
        );
    }

    #[test]
    fn self_referencing_lists_render_finitely() {
        let list = Value::list(vec![int(1)]);
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        assert_eq!(repr(&list), "[1, [...]]");
        if let Value::List(items) = &list {
            items.borrow_mut().clear();
        }
    }

    #[test]
    fn numbers_compare_across_types() {
        assert!(values_equal(&int(1), &Value::from(1.0)));
        assert!(values_equal(&Value::Bool(true), &int(1)));
        assert!(!values_equal(&Value::from("1"), &int(1)));
        assert!(compare_bool(CmpOp::Lt, &int(1), &Value::from(1.5)).unwrap());
    }

    #[test]
    fn huge_slice_steps_stop_at_the_end() {
        let slice = Slice {
            start: int(1),
            stop: Value::None,
            step: Value::Int(BigInt::from(1) << 70),
        };
        assert_eq!(slice_positions(&slice, 3).unwrap(), vec![1]);
        let backwards = Slice {
            start: Value::None,
            stop: Value::None,
            step: Value::Int(-(BigInt::from(1) << 70usize)),
        };
        assert_eq!(slice_positions(&backwards, 3).unwrap(), vec![2]);
    }

    #[test]
    fn repeat_counts() {
        let items = Value::list(vec![int(1), int(2)]);
        assert_eq!(repr(&binary(BinOp::Mul, &items, &int(-3)).unwrap()), "[]");
        let tuple = binary(BinOp::Mul, &Value::tuple(vec![int(7)]), &int(3)).unwrap();
        assert_eq!(repr(&tuple), "(7, 7, 7)");
        let huge = Value::Int(BigInt::from(1) << 70);
        let error = binary(BinOp::Mul, &items, &huge).unwrap_err();
        assert!(error.is(ExcKind::OverflowError));
    }

    #[test]
    fn sequence_operators() {
        let joined = binary(BinOp::Add, &Value::from("ab"), &Value::from("cd")).unwrap();
        assert_eq!(joined, Value::from("abcd"));
        let repeated = binary(BinOp::Mul, &int(2), &Value::list(vec![int(0)])).unwrap();
        assert_eq!(repr(&repeated), "[0, 0]");
        let error = binary(BinOp::Add, &Value::from("a"), &int(1)).unwrap_err();
        assert_eq!(
            error.message(),
            "unsupported operand type(s) for +: 'str' and 'int'"
        );
    }

    #[test]
    fn inplace_add_extends_lists_in_place() {
        let list = Value::list(vec![int(1)]);
        let alias = list.clone();
        let result = inplace(BinOp::Add, &list, &Value::tuple(vec![int(2)])).unwrap();
        assert!(result.is(&alias));
        assert_eq!(repr(&alias), "[1, 2]");
    }

    #[test]
    fn slices_follow_step_rules() {
        let list = Value::list((0..6).map(int).collect());
        let slice = |start: Value, stop: Value, step: Value| {
            Value::Slice(Rc::new(Slice { start, stop, step }))
        };
        let evens = get_item(&list, &slice(Value::None, Value::None, int(2))).unwrap();
        assert_eq!(repr(&evens), "[0, 2, 4]");
        let reversed = get_item(&list, &slice(Value::None, Value::None, int(-1))).unwrap();
        assert_eq!(repr(&reversed), "[5, 4, 3, 2, 1, 0]");
        let tail = get_item(&list, &slice(int(-2), Value::None, Value::None)).unwrap();
        assert_eq!(repr(&tail), "[4, 5]");
        let error = get_item(&list, &slice(Value::None, Value::None, int(0))).unwrap_err();
        assert!(error.is(ExcKind::ValueError));
    }

    #[test]
    fn dict_lookup_errors_carry_the_key() {
        let dict = Value::empty_dict();
        set_item(&dict, &Value::from("a"), int(1)).unwrap();
        assert_eq!(get_item(&dict, &Value::from(1.0)).unwrap_err().message(), "1.0");
        assert_eq!(get_item(&dict, &Value::from("a")).unwrap(), int(1));
        let error = get_item(&dict, &Value::from("b")).unwrap_err();
        assert!(error.is(ExcKind::KeyError));
        assert_eq!(error.message(), "'b'");
    }

    #[test]
    fn membership() {
        assert!(contains(&Value::from("hello"), &Value::from("ell")).unwrap());
        assert!(contains(&Value::list(vec![int(1)]), &Value::from(1.0)).unwrap());
        assert!(contains(&Value::from("abc"), &int(1)).is_err());
    }
}
