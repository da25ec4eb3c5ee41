use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use num_bigint::BigInt;
use num_traits::{FromPrimitive, Num as _, ToPrimitive};

use super::context::{Context, Module};
use super::exception::{ALL_KINDS, ExcKind, Exception};
use super::key::Key;
use super::methods;
use super::native::{CallArgs, CmpOp, NativeFunction, UnaryOp};
use super::numeric::{self, Num};
use super::ops;
use super::types::{BuiltinType, TypeObject};
use super::value::Value;

pub type BuiltinFn = fn(&Context, CallArgs) -> Result<Value, Exception>;

/// A function in the builtins namespace.
pub struct BuiltinFunction {
    pub name: &'static str,
    pub func: BuiltinFn,
}

pub static BUILTINS: &[BuiltinFunction] = &[
    BuiltinFunction { name: "len", func: builtin_len },
    BuiltinFunction { name: "repr", func: builtin_repr },
    BuiltinFunction { name: "isinstance", func: builtin_isinstance },
    BuiltinFunction { name: "divmod", func: builtin_divmod },
    BuiltinFunction { name: "abs", func: builtin_abs },
    BuiltinFunction { name: "print", func: builtin_print },
    BuiltinFunction { name: "hasattr", func: builtin_hasattr },
    BuiltinFunction { name: "getattr", func: builtin_getattr },
    BuiltinFunction { name: "callable", func: builtin_callable },
    BuiltinFunction { name: "sorted", func: builtin_sorted },
    BuiltinFunction { name: "sum", func: builtin_sum },
    BuiltinFunction { name: "min", func: builtin_min },
    BuiltinFunction { name: "max", func: builtin_max },
];

/// Resolve a name in the builtins namespace.
pub fn lookup(name: &str) -> Option<Value> {
    if let Some(builtin) = BUILTINS.iter().find(|b| b.name == name) {
        let func = builtin.func;
        return Some(NativeFunction::new(builtin.name, func).into_value());
    }
    if let Some(builtin) = BuiltinType::from_name(name) {
        return Some(Value::Type(TypeObject::Builtin(builtin)));
    }
    ExcKind::from_name(name).map(|kind| Value::Type(TypeObject::Class(kind.class())))
}

/// Names visible in the builtins namespace.
pub fn names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = BUILTINS.iter().map(|b| b.name).collect();
    names.extend([
        "object", "bool", "int", "float", "str", "bytes", "list", "tuple", "set", "dict", "type",
    ]);
    names.extend(ALL_KINDS.iter().map(|kind| kind.name()));
    names
}

fn builtin_len(_: &Context, args: CallArgs) -> Result<Value, Exception> {
    let value = &args.exact("len", 1)?[0];
    Ok(Value::from(ops::len(value)? as i64))
}

fn builtin_repr(_: &Context, args: CallArgs) -> Result<Value, Exception> {
    let value = &args.exact("repr", 1)?[0];
    Ok(Value::from(ops::try_repr(value)?))
}

fn builtin_isinstance(_: &Context, args: CallArgs) -> Result<Value, Exception> {
    let given = args.exact("isinstance", 2)?;
    let (value, class) = (&given[0], &given[1]);
    let candidates: Vec<Value> = match class {
        Value::Tuple(items) => items.to_vec(),
        other => vec![other.clone()],
    };
    for candidate in &candidates {
        let Value::Type(type_object) = candidate else {
            return Err(Exception::type_error(
                "isinstance() arg 2 must be a type or tuple of types",
            ));
        };
        if ops::is_instance(value, type_object) {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn builtin_divmod(_: &Context, args: CallArgs) -> Result<Value, Exception> {
    let given = args.exact("divmod", 2)?;
    let (a, b) = (&given[0], &given[1]);
    match (Num::from_value(a), Num::from_value(b)) {
        (Some(x), Some(y)) => {
            let (quotient, remainder) = numeric::divmod(&x, &y)?;
            Ok(Value::tuple(vec![quotient.into_value(), remainder.into_value()]))
        }
        _ => {
            let quotient = ops::binary(super::native::BinOp::FloorDiv, a, b)?;
            let remainder = ops::binary(super::native::BinOp::Mod, a, b)?;
            Ok(Value::tuple(vec![quotient, remainder]))
        }
    }
}

fn builtin_abs(_: &Context, args: CallArgs) -> Result<Value, Exception> {
    let value = &args.exact("abs", 1)?[0];
    ops::unary(UnaryOp::Abs, value)
}

fn builtin_print(ctx: &Context, args: CallArgs) -> Result<Value, Exception> {
    let mut sep = " ".to_string();
    let mut end = "\n".to_string();
    for (name, value) in &args.keywords {
        let text = match value {
            Value::None => continue,
            Value::Str(s) => s.to_string(),
            other => {
                return Err(Exception::type_error(format!(
                    "{name} must be None or a string, not {}",
                    other.type_name()
                )));
            }
        };
        match name.as_str() {
            "sep" => sep = text,
            "end" => end = text,
            other => {
                return Err(Exception::type_error(format!(
                    "print() got an unexpected keyword argument '{other}'"
                )));
            }
        }
    }
    let parts = args
        .positional
        .iter()
        .map(ops::str)
        .collect::<Result<Vec<_>, _>>()?;
    ctx.write_output(&format!("{}{}", parts.join(&sep), end));
    Ok(Value::None)
}

fn builtin_hasattr(_: &Context, args: CallArgs) -> Result<Value, Exception> {
    let given = args.exact("hasattr", 2)?;
    let (value, name) = (&given[0], &given[1]);
    let Value::Str(name) = name else {
        return Err(Exception::type_error("hasattr(): attribute name must be string"));
    };
    match ops::get_attr(value, name) {
        Ok(_) => Ok(Value::Bool(true)),
        Err(error) if error.is(ExcKind::AttributeError) => Ok(Value::Bool(false)),
        Err(error) => Err(error),
    }
}

fn builtin_getattr(_: &Context, args: CallArgs) -> Result<Value, Exception> {
    let given = args.range("getattr", 2, 3)?;
    let Value::Str(name) = &given[1] else {
        return Err(Exception::type_error("getattr(): attribute name must be string"));
    };
    match (ops::get_attr(&given[0], name), given.get(2)) {
        (Err(error), Some(default)) if error.is(ExcKind::AttributeError) => Ok(default.clone()),
        (result, _) => result,
    }
}

fn builtin_callable(_: &Context, args: CallArgs) -> Result<Value, Exception> {
    let value = &args.exact("callable", 1)?[0];
    Ok(Value::Bool(ops::is_callable(value)))
}

fn builtin_sorted(ctx: &Context, args: CallArgs) -> Result<Value, Exception> {
    let slots = args.bind("sorted", &["iterable", "reverse"], 1)?;
    let items = match &slots[0] {
        Some(iterable) => Value::list(ops::collect(iterable)?),
        None => Value::list(Vec::new()),
    };
    let sort = ops::get_attr(&items, "sort")?;
    let mut sort_args = CallArgs::default();
    if let Some(reverse) = &slots[1] {
        sort_args = sort_args.keyword("reverse", reverse.clone());
    }
    ops::call(ctx, &sort, sort_args)?;
    Ok(items)
}

fn builtin_sum(_: &Context, args: CallArgs) -> Result<Value, Exception> {
    let given = args.range("sum", 1, 2)?;
    let mut total = given.get(1).cloned().unwrap_or_else(|| Value::from(0_i64));
    for item in ops::iter(&given[0])? {
        total = ops::binary(super::native::BinOp::Add, &total, &item?)?;
    }
    Ok(total)
}

fn extreme(name: &str, args: CallArgs, keep: CmpOp) -> Result<Value, Exception> {
    let candidates = match args.positional.as_slice() {
        [] => {
            return Err(Exception::type_error(format!(
                "{name} expected at least 1 argument, got 0"
            )));
        }
        [single] => ops::collect(single)?,
        many => many.to_vec(),
    };
    let mut best: Option<Value> = None;
    for candidate in candidates {
        best = match best {
            Some(current) if !ops::compare_bool(keep, &candidate, &current)? => Some(current),
            _ => Some(candidate),
        };
    }
    best.ok_or_else(|| Exception::value_error(format!("{name}() arg is an empty sequence")))
}

fn builtin_min(_: &Context, args: CallArgs) -> Result<Value, Exception> {
    extreme("min", args, CmpOp::Lt)
}

fn builtin_max(_: &Context, args: CallArgs) -> Result<Value, Exception> {
    extreme("max", args, CmpOp::Gt)
}

// -------------------------------------------------------------------------
// Type constructors
// -------------------------------------------------------------------------

/// Call a builtin type object.
pub fn construct(ctx: &Context, builtin: BuiltinType, args: CallArgs) -> Result<Value, Exception> {
    match builtin {
        BuiltinType::Str => construct_str(args),
        BuiltinType::Int => construct_int(args),
        BuiltinType::Float => construct_float(args),
        BuiltinType::Bool => {
            let given = args.range("bool", 0, 1)?;
            match given.first() {
                Some(value) => Ok(Value::Bool(ops::truthy(value)?)),
                None => Ok(Value::Bool(false)),
            }
        }
        BuiltinType::List => {
            let given = args.range("list", 0, 1)?;
            match given.first() {
                Some(value) => Ok(Value::list(ops::collect(value)?)),
                None => Ok(Value::list(Vec::new())),
            }
        }
        BuiltinType::Tuple => {
            let given = args.range("tuple", 0, 1)?;
            match given.first() {
                Some(Value::Tuple(items)) => Ok(Value::Tuple(items.clone())),
                Some(value) => Ok(Value::tuple(ops::collect(value)?)),
                None => Ok(Value::tuple(Vec::new())),
            }
        }
        BuiltinType::Set => {
            let given = args.range("set", 0, 1)?;
            let mut items = IndexSet::new();
            if let Some(value) = given.first() {
                for item in ops::iter(value)? {
                    items.insert(ops::hash_key(&item?)?);
                }
            }
            Ok(Value::set(items))
        }
        BuiltinType::Dict => {
            let dict = Value::empty_dict();
            let update = ops::get_attr(&dict, "update")?;
            ops::call(ctx, &update, args)?;
            Ok(dict)
        }
        BuiltinType::Bytes => construct_bytes(args),
        BuiltinType::Type => {
            let value = &args.exact("type", 1)?[0];
            Ok(Value::Type(value.type_object()))
        }
        other => Err(Exception::type_error(format!(
            "cannot create '{}' instances",
            other.name()
        ))),
    }
}

fn construct_str(args: CallArgs) -> Result<Value, Exception> {
    let slots = args.bind("str", &["object", "encoding", "errors"], 0)?;
    match (&slots[0], &slots[1]) {
        (None, _) => Ok(Value::from("")),
        (Some(Value::Bytes(bytes)), Some(encoding)) => {
            let encoding = text_arg(encoding, "str")?;
            Ok(Value::from(methods::decode(bytes, encoding)?))
        }
        (Some(value), _) => Ok(Value::from(ops::str(value)?)),
    }
}

fn text_arg<'a>(value: &'a Value, function: &str) -> Result<&'a str, Exception> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(Exception::type_error(format!(
            "{function}() argument 'encoding' must be str, not {}",
            other.type_name()
        ))),
    }
}

fn construct_int(args: CallArgs) -> Result<Value, Exception> {
    let slots = args.bind("int", &["x", "base"], 0)?;
    let base = match &slots[1] {
        Some(value) => Some(
            ops::index_value(value)
                .and_then(|b| b.to_u32())
                .filter(|b| *b == 0 || (2..=36).contains(b))
                .ok_or_else(|| Exception::value_error("int() base must be >= 2 and <= 36, or 0"))?,
        ),
        None => None,
    };
    let Some(value) = &slots[0] else {
        return Ok(Value::from(0_i64));
    };
    match (value, base) {
        (Value::Str(text), base) => parse_int(text, base.unwrap_or(10)).map(Value::Int),
        (_, Some(_)) => Err(Exception::type_error(
            "int() can't convert non-string with explicit base",
        )),
        (Value::Int(i), None) => Ok(Value::Int(i.clone())),
        (Value::Bool(b), None) => Ok(Value::from(i64::from(*b))),
        (Value::Float(f), None) => float_to_int(*f).map(Value::Int),
        (Value::Native(object), None) => match object.to_int() {
            Some(result) => result.map(Value::Int),
            None => Err(int_argument_error(value)),
        },
        (other, None) => Err(int_argument_error(other)),
    }
}

fn int_argument_error(value: &Value) -> Exception {
    Exception::type_error(format!(
        "int() argument must be a string, a bytes-like object or a real number, not '{}'",
        value.type_name()
    ))
}

pub fn float_to_int(value: f64) -> Result<BigInt, Exception> {
    if value.is_nan() {
        return Err(Exception::value_error("cannot convert float NaN to integer"));
    }
    BigInt::from_f64(value.trunc()).ok_or_else(|| {
        Exception::new(
            ExcKind::OverflowError,
            "cannot convert float infinity to integer",
        )
    })
}

/// Parse an integer literal the way `int(text, base)` does.
pub fn parse_int(text: &str, base: u32) -> Result<BigInt, Exception> {
    let invalid = || {
        Exception::value_error(format!(
            "invalid literal for int() with base {base}: {}",
            ops::repr(&Value::from(text))
        ))
    };
    let trimmed = text.trim();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let lower = unsigned.to_ascii_lowercase();
    let (radix, digits) = match (base, lower.get(..2)) {
        (0 | 16, Some("0x")) => (16, &lower[2..]),
        (0 | 8, Some("0o")) => (8, &lower[2..]),
        (0 | 2, Some("0b")) => (2, &lower[2..]),
        (0, _) => (10, lower.as_str()),
        (base, _) => (base, lower.as_str()),
    };
    let digits = digits.strip_prefix('_').unwrap_or(digits);
    if digits.is_empty()
        || digits.starts_with('_')
        || digits.ends_with('_')
        || digits.contains("__")
    {
        return Err(invalid());
    }
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    let magnitude = BigInt::from_str_radix(&cleaned, radix).map_err(|_| invalid())?;
    Ok(if negative { -magnitude } else { magnitude })
}

fn construct_float(args: CallArgs) -> Result<Value, Exception> {
    let given = args.range("float", 0, 1)?;
    let Some(value) = given.first() else {
        return Ok(Value::from(0.0));
    };
    let result = match value {
        Value::Float(f) => *f,
        Value::Int(i) => numeric::int_to_f64(i)?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Str(text) => parse_float(text)?,
        Value::Native(object) => match object.to_float() {
            Some(result) => result?,
            None => {
                return Err(Exception::type_error(format!(
                    "float() argument must be a string or a real number, not '{}'",
                    value.type_name()
                )));
            }
        },
        other => {
            return Err(Exception::type_error(format!(
                "float() argument must be a string or a real number, not '{}'",
                other.type_name()
            )));
        }
    };
    Ok(Value::from(result))
}

pub fn parse_float(text: &str) -> Result<f64, Exception> {
    let trimmed = text.trim();
    let lower = trimmed.to_ascii_lowercase();
    let unsigned = lower.trim_start_matches(['+', '-']);
    let special = matches!(unsigned, "inf" | "infinity" | "nan");
    let well_formed = special
        || (!trimmed.is_empty()
            && trimmed
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-' | '_')));
    if well_formed && let Ok(value) = trimmed.replace('_', "").parse::<f64>() {
        return Ok(value);
    }
    Err(Exception::value_error(format!(
        "could not convert string to float: {}",
        ops::repr(&Value::from(text))
    )))
}

fn construct_bytes(args: CallArgs) -> Result<Value, Exception> {
    let slots = args.bind("bytes", &["source", "encoding", "errors"], 0)?;
    let Some(source) = &slots[0] else {
        return Ok(Value::bytes(&[]));
    };
    match (source, &slots[1]) {
        (Value::Str(text), Some(encoding)) => {
            let encoding = text_arg(encoding, "bytes")?;
            Ok(Value::bytes(&methods::encode(text, encoding)?))
        }
        (Value::Str(_), None) => Err(Exception::type_error("string argument without an encoding")),
        (Value::Bytes(b), _) => Ok(Value::Bytes(b.clone())),
        (Value::Int(n), _) => {
            let size = n
                .to_usize()
                .ok_or_else(|| Exception::value_error("negative count"))?;
            Ok(Value::bytes(&vec![0; size]))
        }
        (other, _) => {
            let mut bytes = Vec::new();
            for item in ops::iter(other)? {
                let item = item?;
                let byte = ops::index_value(&item)
                    .and_then(|i| i.to_u8())
                    .ok_or_else(|| Exception::value_error("bytes must be in range(0, 256)"))?;
                bytes.push(byte);
            }
            Ok(Value::bytes(&bytes))
        }
    }
}

// -------------------------------------------------------------------------
// Bundled modules
// -------------------------------------------------------------------------

fn number_arg(value: &Value, function: &str) -> Result<f64, Exception> {
    match Num::from_value(value) {
        Some(number) => number.to_f64(),
        None => match value {
            Value::Native(object) => object.to_float().unwrap_or_else(|| {
                Err(Exception::type_error(format!(
                    "{function}() argument must be a real number, not '{}'",
                    value.type_name()
                )))
            }),
            other => Err(Exception::type_error(format!(
                "must be real number, not {}",
                other.type_name()
            ))),
        },
    }
}

/// Populate the `math` module.
pub fn load_math(_: &Context, module: &Rc<Module>) -> Result<(), Exception> {
    module.set("pi", Value::from(std::f64::consts::PI));
    module.set("e", Value::from(std::f64::consts::E));
    module.set("inf", Value::from(f64::INFINITY));
    module.set(
        "sqrt",
        NativeFunction::new("sqrt", |_, args| {
            let x = &args.exact("sqrt", 1)?[0];
            let x = number_arg(x, "sqrt")?;
            if x < 0.0 {
                return Err(Exception::value_error("math domain error"));
            }
            Ok(Value::from(x.sqrt()))
        })
        .into_value(),
    );
    module.set(
        "floor",
        NativeFunction::new("floor", |_, args| {
            let x = &args.exact("floor", 1)?[0];
            if let Value::Int(i) = x {
                return Ok(Value::Int(i.clone()));
            }
            float_to_int(number_arg(x, "floor")?.floor()).map(Value::Int)
        })
        .into_value(),
    );
    module.set(
        "ceil",
        NativeFunction::new("ceil", |_, args| {
            let x = &args.exact("ceil", 1)?[0];
            if let Value::Int(i) = x {
                return Ok(Value::Int(i.clone()));
            }
            float_to_int(number_arg(x, "ceil")?.ceil()).map(Value::Int)
        })
        .into_value(),
    );
    module.set(
        "pow",
        NativeFunction::new("pow", |_, args| {
            let given = args.exact("pow", 2)?;
            let (x, y) = (&given[0], &given[1]);
            Ok(Value::from(number_arg(x, "pow")?.powf(number_arg(y, "pow")?)))
        })
        .into_value(),
    );
    Ok(())
}

/// A dict from string keys, for natives that build mappings.
pub fn string_dict(pairs: impl IntoIterator<Item = (String, Value)>) -> Value {
    let map: IndexMap<Key, Value> = pairs
        .into_iter()
        .map(|(key, value)| (Key::Str(Rc::from(key)), value))
        .collect();
    Value::dict(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_literals_accept_prefixes_and_underscores() {
        assert_eq!(parse_int(" 42 ", 10).unwrap(), BigInt::from(42));
        assert_eq!(parse_int("-1_000", 10).unwrap(), BigInt::from(-1000));
        assert_eq!(parse_int("0x1f", 0).unwrap(), BigInt::from(31));
        assert_eq!(parse_int("ff", 16).unwrap(), BigInt::from(255));
        let error = parse_int("abc", 10).unwrap_err();
        assert_eq!(error.message(), "invalid literal for int() with base 10: 'abc'");
        assert!(parse_int("1__0", 10).is_err());
    }

    #[test]
    fn float_literals() {
        assert_eq!(parse_float("2.5").unwrap(), 2.5);
        assert_eq!(parse_float(" -inf ").unwrap(), f64::NEG_INFINITY);
        assert!(parse_float("1.0.0").is_err());
        assert_eq!(
            parse_float("x").unwrap_err().message(),
            "could not convert string to float: 'x'"
        );
    }

    #[test]
    fn float_truncation() {
        assert_eq!(float_to_int(-3.7).unwrap(), BigInt::from(-3));
        assert!(float_to_int(f64::NAN).unwrap_err().is(ExcKind::ValueError));
        assert!(float_to_int(f64::INFINITY).unwrap_err().is(ExcKind::OverflowError));
    }

    #[test]
    fn builtins_namespace_resolves_functions_types_and_exceptions() {
        assert!(matches!(lookup("len"), Some(Value::Function(_))));
        assert!(matches!(
            lookup("dict"),
            Some(Value::Type(TypeObject::Builtin(BuiltinType::Dict)))
        ));
        assert!(matches!(lookup("KeyError"), Some(Value::Type(TypeObject::Class(_)))));
        assert!(lookup("nope").is_none());
        assert!(names().contains(&"ValueError"));
    }
}
