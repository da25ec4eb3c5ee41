//! Methods of the builtin container and text types.

use std::cmp::Ordering;

use num_traits::ToPrimitive;

use super::context::Context;
use super::exception::{ExcKind, Exception};
use super::native::{CallArgs, CmpOp, NativeFunction};
use super::ops;
use super::value::Value;

type Method = fn(&Context, &Value, CallArgs) -> Result<Value, Exception>;

fn bound(name: &str, receiver: &Value, method: Method) -> Value {
    let receiver = receiver.clone();
    NativeFunction::new(name, move |ctx, args| method(ctx, &receiver, args)).into_value()
}

/// Look up a method of a builtin value, bound to that value.
pub fn lookup(value: &Value, name: &str) -> Option<Value> {
    let method: Method = match (value, name) {
        (Value::Str(_), "upper") => str_upper,
        (Value::Str(_), "lower") => str_lower,
        (Value::Str(_), "split") => str_split,
        (Value::Str(_), "join") => str_join,
        (Value::Str(_), "strip") => str_strip,
        (Value::Str(_), "lstrip") => str_lstrip,
        (Value::Str(_), "rstrip") => str_rstrip,
        (Value::Str(_), "startswith") => str_startswith,
        (Value::Str(_), "endswith") => str_endswith,
        (Value::Str(_), "replace") => str_replace,
        (Value::Str(_), "find") => str_find,
        (Value::Str(_), "encode") => str_encode,
        (Value::Bytes(_), "decode") => bytes_decode,
        (Value::List(_), "append") => list_append,
        (Value::List(_), "extend") => list_extend,
        (Value::List(_), "pop") => list_pop,
        (Value::List(_), "insert") => list_insert,
        (Value::List(_), "remove") => list_remove,
        (Value::List(_), "clear") => list_clear,
        (Value::List(_), "reverse") => list_reverse,
        (Value::List(_), "sort") => list_sort,
        (Value::List(_) | Value::Tuple(_), "index") => seq_index,
        (Value::List(_) | Value::Tuple(_), "count") => seq_count,
        (Value::Dict(_), "keys") => dict_keys,
        (Value::Dict(_), "values") => dict_values,
        (Value::Dict(_), "items") => dict_items,
        (Value::Dict(_), "get") => dict_get,
        (Value::Dict(_), "update") => dict_update,
        (Value::Dict(_), "pop") => dict_pop,
        (Value::Dict(_), "setdefault") => dict_setdefault,
        (Value::Set(_), "add") => set_add,
        (Value::Set(_), "discard") => set_discard,
        _ => return None,
    };
    Some(bound(name, value, method))
}

fn text(receiver: &Value) -> &str {
    match receiver {
        Value::Str(s) => s,
        _ => "",
    }
}

fn str_arg<'a>(value: &'a Value, function: &str) -> Result<&'a str, Exception> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(Exception::type_error(format!(
            "{function}() argument must be str, not {}",
            other.type_name()
        ))),
    }
}

fn optional_str(value: Option<&Value>, function: &str) -> Result<Option<String>, Exception> {
    match value {
        None | Some(Value::None) => Ok(None),
        Some(other) => str_arg(other, function).map(|s| Some(s.to_string())),
    }
}

fn str_upper(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    args.exact("upper", 0)?;
    Ok(Value::from(text(receiver).to_uppercase()))
}

fn str_lower(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    args.exact("lower", 0)?;
    Ok(Value::from(text(receiver).to_lowercase()))
}

fn str_split(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    let slots = args.bind("split", &["sep", "maxsplit"], 0)?;
    let sep = optional_str(slots[0].as_ref(), "split")?;
    let limit = match &slots[1] {
        Some(value) => ops::index_value(value)
            .and_then(|i| i.to_i64())
            .ok_or_else(|| Exception::type_error("maxsplit must be an integer"))?,
        None => -1,
    };
    let source = text(receiver);
    let parts: Vec<Value> = match sep.as_deref() {
        Some("") => return Err(Exception::value_error("empty separator")),
        Some(sep) if limit < 0 => source.split(sep).map(Value::from).collect(),
        Some(sep) => source.splitn(limit as usize + 1, sep).map(Value::from).collect(),
        None => {
            let mut parts: Vec<Value> = Vec::new();
            let mut rest = source.trim_start();
            while !rest.is_empty() {
                if limit >= 0 && parts.len() as i64 == limit {
                    parts.push(Value::from(rest.trim_end()));
                    break;
                }
                let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
                parts.push(Value::from(&rest[..end]));
                rest = rest[end..].trim_start();
            }
            parts
        }
    };
    Ok(Value::list(parts))
}

fn str_join(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    let iterable = &args.exact("join", 1)?[0];
    let mut pieces = Vec::new();
    for (index, item) in ops::iter(iterable)?.enumerate() {
        match item? {
            Value::Str(s) => pieces.push(s.to_string()),
            other => {
                return Err(Exception::type_error(format!(
                    "sequence item {index}: expected str instance, {} found",
                    other.type_name()
                )));
            }
        }
    }
    Ok(Value::from(pieces.join(text(receiver))))
}

fn strip_with(
    receiver: &Value,
    args: CallArgs,
    name: &str,
    strip: fn(&str, &[char]) -> String,
    whitespace: fn(&str) -> &str,
) -> Result<Value, Exception> {
    let slots = args.bind(name, &["chars"], 0)?;
    let result = match optional_str(slots[0].as_ref(), name)? {
        Some(chars) => strip(text(receiver), &chars.chars().collect::<Vec<_>>()),
        None => whitespace(text(receiver)).to_string(),
    };
    Ok(Value::from(result))
}

fn str_strip(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    strip_with(receiver, args, "strip", |s, set| s.trim_matches(set).to_string(), str::trim)
}

fn str_lstrip(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    strip_with(
        receiver,
        args,
        "lstrip",
        |s, set| s.trim_start_matches(set).to_string(),
        str::trim_start,
    )
}

fn str_rstrip(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    strip_with(
        receiver,
        args,
        "rstrip",
        |s, set| s.trim_end_matches(set).to_string(),
        str::trim_end,
    )
}

fn affix_candidates(value: &Value, function: &str) -> Result<Vec<String>, Exception> {
    match value {
        Value::Str(s) => Ok(vec![s.to_string()]),
        Value::Tuple(items) => items
            .iter()
            .map(|item| str_arg(item, function).map(str::to_string))
            .collect(),
        other => Err(Exception::type_error(format!(
            "{function} first arg must be str or a tuple of str, not {}",
            other.type_name()
        ))),
    }
}

fn str_startswith(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    let prefix = &args.exact("startswith", 1)?[0];
    let candidates = affix_candidates(prefix, "startswith")?;
    Ok(Value::Bool(
        candidates.iter().any(|p| text(receiver).starts_with(p.as_str())),
    ))
}

fn str_endswith(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    let suffix = &args.exact("endswith", 1)?[0];
    let candidates = affix_candidates(suffix, "endswith")?;
    Ok(Value::Bool(
        candidates.iter().any(|p| text(receiver).ends_with(p.as_str())),
    ))
}

fn str_replace(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    let given = args.exact("replace", 2)?;
    let (old, new) = (&given[0], &given[1]);
    let old = str_arg(old, "replace")?;
    let new = str_arg(new, "replace")?;
    Ok(Value::from(text(receiver).replace(old, new)))
}

fn str_find(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    let needle = &args.exact("find", 1)?[0];
    let needle = str_arg(needle, "find")?;
    let haystack = text(receiver);
    let found = haystack
        .find(needle)
        .map_or(-1, |byte| haystack[..byte].chars().count() as i64);
    Ok(Value::from(found))
}

fn encoding_name(value: Option<&Value>, function: &str) -> Result<String, Exception> {
    Ok(optional_str(value, function)?
        .unwrap_or_else(|| "utf-8".to_string()))
}

fn normalize_encoding(name: &str) -> String {
    name.to_ascii_lowercase().replace('_', "-")
}

fn unknown_encoding(name: &str) -> Exception {
    Exception::new(ExcKind::LookupError, format!("unknown encoding: {name}"))
}

/// `text.encode(encoding)`.
pub fn encode(text: &str, encoding: &str) -> Result<Vec<u8>, Exception> {
    let encoding = normalize_encoding(encoding);
    match encoding.as_str() {
        "utf-8" | "utf8" => Ok(text.as_bytes().to_vec()),
        "ascii" | "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" => {
            let limit = if encoding == "ascii" { 0x80 } else { 0x100 };
            let mut bytes = Vec::with_capacity(text.len());
            for (position, c) in text.chars().enumerate() {
                if (c as u32) >= limit {
                    return Err(Exception::value_error(format!(
                        "'{encoding}' codec can't encode character '\\u{:04x}' in position {position}",
                        c as u32
                    )));
                }
                bytes.push(c as u8);
            }
            Ok(bytes)
        }
        other => Err(unknown_encoding(other)),
    }
}

/// `bytes.decode(encoding)`.
pub fn decode(bytes: &[u8], encoding: &str) -> Result<String, Exception> {
    let encoding = normalize_encoding(encoding);
    match encoding.as_str() {
        "utf-8" | "utf8" => String::from_utf8(bytes.to_vec()).map_err(|error| {
            let position = error.utf8_error().valid_up_to();
            Exception::value_error(format!(
                "'utf-8' codec can't decode byte 0x{:02x} in position {position}",
                bytes[position]
            ))
        }),
        "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" => {
            Ok(bytes.iter().map(|&b| char::from(b)).collect())
        }
        "ascii" => {
            if let Some(position) = bytes.iter().position(|b| !b.is_ascii()) {
                return Err(Exception::value_error(format!(
                    "'ascii' codec can't decode byte 0x{:02x} in position {position}",
                    bytes[position]
                )));
            }
            Ok(bytes.iter().map(|&b| char::from(b)).collect())
        }
        other => Err(unknown_encoding(other)),
    }
}

fn str_encode(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    let slots = args.bind("encode", &["encoding", "errors"], 0)?;
    let encoding = encoding_name(slots[0].as_ref(), "encode")?;
    Ok(Value::bytes(&encode(text(receiver), &encoding)?))
}

fn bytes_decode(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    let slots = args.bind("decode", &["encoding", "errors"], 0)?;
    let encoding = encoding_name(slots[0].as_ref(), "decode")?;
    let bytes: &[u8] = match receiver {
        Value::Bytes(bytes) => bytes,
        _ => &[],
    };
    Ok(Value::from(decode(bytes, &encoding)?))
}

fn with_list<R>(receiver: &Value, f: impl FnOnce(&mut Vec<Value>) -> R) -> R {
    match receiver {
        Value::List(items) => f(&mut items.borrow_mut()),
        _ => f(&mut Vec::new()),
    }
}

fn list_append(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    let item = &args.exact("append", 1)?[0];
    let item = item.clone();
    with_list(receiver, |items| items.push(item));
    Ok(Value::None)
}

fn list_extend(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    let iterable = &args.exact("extend", 1)?[0];
    let extra = ops::collect(iterable)?;
    with_list(receiver, |items| items.extend(extra));
    Ok(Value::None)
}

fn list_pop(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    let given = args.range("pop", 0, 1)?;
    let index = match given.first() {
        Some(value) => ops::index_value(value).ok_or_else(|| {
            Exception::type_error(format!(
                "'{}' object cannot be interpreted as an integer",
                value.type_name()
            ))
        })?,
        None => (-1).into(),
    };
    with_list(receiver, |items| {
        if items.is_empty() {
            return Err(Exception::new(ExcKind::IndexError, "pop from empty list"));
        }
        let at = ops::normalize_index(&index, items.len())
            .ok_or_else(|| Exception::new(ExcKind::IndexError, "pop index out of range"))?;
        Ok(items.remove(at))
    })
}

fn list_insert(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    let given = args.exact("insert", 2)?;
    let (index, item) = (&given[0], &given[1]);
    let index = ops::index_value(index)
        .and_then(|i| i.to_i64())
        .ok_or_else(|| Exception::type_error("insert() index must be an integer"))?;
    let item = item.clone();
    with_list(receiver, |items| {
        let len = items.len() as i64;
        let at = if index < 0 { (index + len).max(0) } else { index.min(len) };
        items.insert(at as usize, item);
    });
    Ok(Value::None)
}

fn list_remove(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    let target = &args.exact("remove", 1)?[0];
    with_list(receiver, |items| {
        let position = items
            .iter()
            .position(|item| ops::values_equal(item, target))
            .ok_or_else(|| Exception::value_error("list.remove(x): x not in list"))?;
        items.remove(position);
        Ok(Value::None)
    })
}

fn list_clear(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    args.exact("clear", 0)?;
    with_list(receiver, Vec::clear);
    Ok(Value::None)
}

fn list_reverse(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    args.exact("reverse", 0)?;
    with_list(receiver, |items| items.reverse());
    Ok(Value::None)
}

fn list_sort(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    let slots = args.bind("sort", &["reverse"], 0)?;
    if !args.positional.is_empty() {
        return Err(Exception::type_error("sort() takes no positional arguments"));
    }
    let reverse = match &slots[0] {
        Some(value) => ops::truthy(value)?,
        None => false,
    };
    let mut items = with_list(receiver, std::mem::take);
    let mut failure = None;
    items.sort_by(|a, b| {
        if failure.is_some() {
            return Ordering::Equal;
        }
        match ops::compare_bool(CmpOp::Lt, a, b) {
            Ok(true) => Ordering::Less,
            Ok(false) => match ops::compare_bool(CmpOp::Lt, b, a) {
                Ok(true) => Ordering::Greater,
                Ok(false) => Ordering::Equal,
                Err(error) => {
                    failure = Some(error);
                    Ordering::Equal
                }
            },
            Err(error) => {
                failure = Some(error);
                Ordering::Equal
            }
        }
    });
    if reverse {
        items.reverse();
    }
    with_list(receiver, |slot| *slot = items);
    match failure {
        Some(error) => Err(error),
        None => Ok(Value::None),
    }
}

fn sequence_items(receiver: &Value) -> Vec<Value> {
    match receiver {
        Value::List(items) => items.borrow().clone(),
        Value::Tuple(items) => items.to_vec(),
        _ => Vec::new(),
    }
}

fn seq_index(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    let target = &args.exact("index", 1)?[0];
    sequence_items(receiver)
        .iter()
        .position(|item| ops::values_equal(item, target))
        .map(|i| Value::from(i as i64))
        .ok_or_else(|| {
            Exception::value_error(format!("{} is not in {}", ops::repr(target), receiver.type_name()))
        })
}

fn seq_count(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    let target = &args.exact("count", 1)?[0];
    let count = sequence_items(receiver)
        .iter()
        .filter(|item| ops::values_equal(item, target))
        .count();
    Ok(Value::from(count as i64))
}

fn dict_entries(receiver: &Value) -> Vec<(Value, Value)> {
    match receiver {
        Value::Dict(map) => map
            .borrow()
            .iter()
            .map(|(key, value)| (key.to_value(), value.clone()))
            .collect(),
        _ => Vec::new(),
    }
}

fn dict_keys(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    args.exact("keys", 0)?;
    Ok(Value::list(dict_entries(receiver).into_iter().map(|(k, _)| k).collect()))
}

fn dict_values(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    args.exact("values", 0)?;
    Ok(Value::list(dict_entries(receiver).into_iter().map(|(_, v)| v).collect()))
}

fn dict_items(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    args.exact("items", 0)?;
    Ok(Value::list(
        dict_entries(receiver)
            .into_iter()
            .map(|(k, v)| Value::tuple(vec![k, v]))
            .collect(),
    ))
}

fn dict_get(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    let given = args.range("get", 1, 2)?;
    let key = ops::hash_key(&given[0])?;
    let found = match receiver {
        Value::Dict(map) => map.borrow().get(&key).cloned(),
        _ => None,
    };
    Ok(found.unwrap_or_else(|| given.get(1).cloned().unwrap_or(Value::None)))
}

fn dict_update(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    let Value::Dict(map) = receiver else {
        return Ok(Value::None);
    };
    let mut pairs = Vec::new();
    if let Some(source) = args.positional.first() {
        match source {
            Value::Dict(other) => {
                pairs.extend(other.borrow().iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            other => {
                for item in ops::iter(other)? {
                    let pair = ops::collect(&item?)?;
                    let [key, value] = pair.as_slice() else {
                        return Err(Exception::value_error(
                            "dictionary update sequence element has wrong length",
                        ));
                    };
                    pairs.push((ops::hash_key(key)?, value.clone()));
                }
            }
        }
    }
    for (name, value) in &args.keywords {
        pairs.push((name.as_str().into(), value.clone()));
    }
    map.borrow_mut().extend(pairs);
    Ok(Value::None)
}

fn dict_pop(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    let given = args.range("pop", 1, 2)?;
    let key = ops::hash_key(&given[0])?;
    let removed = match receiver {
        Value::Dict(map) => map.borrow_mut().shift_remove(&key),
        _ => None,
    };
    match (removed, given.get(1)) {
        (Some(value), _) => Ok(value),
        (None, Some(default)) => Ok(default.clone()),
        (None, None) => Err(Exception::with_args(
            ExcKind::KeyError.class(),
            vec![given[0].clone()],
        )),
    }
}

fn dict_setdefault(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    let given = args.range("setdefault", 1, 2)?;
    let key = ops::hash_key(&given[0])?;
    let default = given.get(1).cloned().unwrap_or(Value::None);
    match receiver {
        Value::Dict(map) => Ok(map.borrow_mut().entry(key).or_insert(default).clone()),
        _ => Ok(default),
    }
}

fn set_add(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    let item = &args.exact("add", 1)?[0];
    let key = ops::hash_key(item)?;
    if let Value::Set(items) = receiver {
        items.borrow_mut().insert(key);
    }
    Ok(Value::None)
}

fn set_discard(_: &Context, receiver: &Value, args: CallArgs) -> Result<Value, Exception> {
    let item = &args.exact("discard", 1)?[0];
    let key = ops::hash_key(item)?;
    if let Value::Set(items) = receiver {
        items.borrow_mut().shift_remove(&key);
    }
    Ok(Value::None)
}
