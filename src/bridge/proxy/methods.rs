//! Named methods of `scriptobj` and `scriptdict`.

use crate::error::{BridgeError, Result};
use crate::object::{ops, CallArgs, Context, Value};
use crate::script::Obj;

use super::{iter, mapping, sequence, Flavour, Proxy};
use crate::bridge::convert::{to_obj, to_value};
use crate::bridge::resolve;
use crate::bridge::target::Target;

pub(super) type Method = fn(&Proxy, &Context, CallArgs) -> Result<Value>;

const COMMON_METHODS: &[(&str, Method)] = &[
    ("get", get),
    ("set", set),
    ("reset", reset),
    ("as_str", as_str),
    ("as_int", as_int),
    ("as_float", as_float),
    ("as_bool", as_bool),
    ("as_list", as_list),
    ("as_set", as_set),
    ("as_tuple", as_tuple),
    ("as_dict", as_dict),
    ("as_byte_array", as_byte_array),
    ("incr", incr),
    ("setvar", setvar),
    ("td_get", td_get),
    ("td_set", td_set),
    ("td_remove", td_remove),
    ("td_exists", td_exists),
    ("td_size", td_size),
    ("llength", llength),
    ("lindex", lindex),
    ("append", append),
    ("extend", extend),
    ("insert", insert),
    ("pop", pop),
    ("keys", keys),
    ("values", values),
    ("items", items),
];

const DICT_METHODS: &[(&str, Method)] = &[("get", dict_get)];

pub(super) fn lookup(flavour: Flavour, name: &str) -> Option<(&'static str, Method)> {
    let dict: &[(&str, Method)] = match flavour {
        Flavour::Dict => DICT_METHODS,
        Flavour::List => &[],
    };
    dict.iter()
        .chain(COMMON_METHODS)
        .find(|(method, _)| *method == name)
        .copied()
}

fn target_arg(slot: &Option<Value>) -> Result<Option<Target>> {
    Target::from_optional(slot.as_ref())
}

/// A slot `CallArgs::bind` already checked for presence.
fn required(slot: &Option<Value>) -> Result<&Value> {
    slot.as_ref()
        .ok_or_else(|| BridgeError::Internal("required argument was not bound".to_string()))
}

/// `get(to=None)`: the whole value, as `str` unless a `to` says otherwise.
fn get(proxy: &Proxy, _: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("get", &["to"], 0)?;
    proxy.convert(&proxy.obj()?, target_arg(&slots[0])?, Target::Str)
}

fn set(proxy: &Proxy, _: &Context, args: CallArgs) -> Result<Value> {
    let value = &args.exact("set", 1)?[0];
    proxy.set_obj(to_obj(value)?)?;
    Ok(Value::None)
}

fn reset(proxy: &Proxy, _: &Context, args: CallArgs) -> Result<Value> {
    args.exact("reset", 0)?;
    proxy.reset()?;
    Ok(Value::None)
}

macro_rules! conversions {
    ($($name:ident => $target:ident),* $(,)?) => {
        $(
            fn $name(proxy: &Proxy, _: &Context, args: CallArgs) -> Result<Value> {
                args.exact(stringify!($name), 0)?;
                to_value(&proxy.obj()?, Target::$target)
            }
        )*
    };
}

conversions! {
    as_str => Str,
    as_int => Int,
    as_float => Float,
    as_bool => Bool,
    as_list => List,
    as_set => Set,
    as_tuple => Tuple,
    as_dict => Dict,
    as_byte_array => Bytes,
}

/// `incr(by=1)`: add to the integer value in place and return the sum.
fn incr(proxy: &Proxy, _: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("incr", &["by"], 0)?;
    let by = match &slots[0] {
        Some(value) => ops::index_value(value).ok_or_else(|| {
            BridgeError::Type(format!(
                "incr() by must be an integer, not {}",
                value.type_name()
            ))
        })?,
        None => 1.into(),
    };
    let sum = proxy.update(|obj| {
        let sum = obj.int().map_err(BridgeError::TypeCoercion)? + by;
        *obj = Obj::from_int(sum.clone());
        Ok(sum)
    })?;
    Ok(Value::Int(sum))
}

/// `setvar(name)`: store the current value into a script variable.
fn setvar(proxy: &Proxy, ctx: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("setvar", &["name"], 1)?;
    let name = ops::str(required(&slots[0])?)?;
    let (_, interp) = resolve(ctx)?;
    interp
        .set_var(&name, proxy.obj()?)
        .map_err(BridgeError::Value)?;
    Ok(Value::None)
}

fn td_get(proxy: &Proxy, _: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("td_get", &["key", "to"], 1)?;
    let path = mapping::key_path(required(&slots[0])?)?;
    let found = mapping::lookup(proxy, &path)?.ok_or_else(|| {
        let keys: Vec<&str> = path.iter().map(Obj::as_str).collect();
        BridgeError::Key(keys.join(" "))
    })?;
    proxy.convert(&found, target_arg(&slots[1])?, Target::Str)
}

fn td_set(proxy: &Proxy, _: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("td_set", &["key", "value"], 2)?;
    mapping::set_item(proxy, required(&slots[0])?, required(&slots[1])?)?;
    Ok(Value::None)
}

fn td_remove(proxy: &Proxy, _: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("td_remove", &["key"], 1)?;
    mapping::remove(proxy, required(&slots[0])?)?;
    Ok(Value::None)
}

fn td_exists(proxy: &Proxy, _: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("td_exists", &["key"], 1)?;
    Ok(Value::Bool(mapping::contains(proxy, required(&slots[0])?)?))
}

fn td_size(proxy: &Proxy, _: &Context, args: CallArgs) -> Result<Value> {
    args.exact("td_size", 0)?;
    Ok(Value::from(mapping::size(proxy)? as i64))
}

fn llength(proxy: &Proxy, _: &Context, args: CallArgs) -> Result<Value> {
    args.exact("llength", 0)?;
    Ok(Value::from(sequence::llength(proxy)? as i64))
}

fn lindex(proxy: &Proxy, _: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("lindex", &["index", "to"], 1)?;
    sequence::lindex(proxy, required(&slots[0])?, target_arg(&slots[1])?)
}

fn append(proxy: &Proxy, _: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("append", &["value"], 1)?;
    sequence::append(proxy, required(&slots[0])?)?;
    Ok(Value::None)
}

fn extend(proxy: &Proxy, _: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("extend", &["values"], 1)?;
    sequence::extend(proxy, required(&slots[0])?)?;
    Ok(Value::None)
}

fn insert(proxy: &Proxy, _: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("insert", &["index", "value"], 2)?;
    sequence::insert(proxy, required(&slots[0])?, required(&slots[1])?)?;
    Ok(Value::None)
}

fn pop(proxy: &Proxy, _: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("pop", &["index", "to"], 0)?;
    sequence::pop(proxy, slots[0].as_ref(), target_arg(&slots[1])?)
}

fn keys(proxy: &Proxy, _: &Context, args: CallArgs) -> Result<Value> {
    args.exact("keys", 0)?;
    iter::keys(proxy)
}

fn values(proxy: &Proxy, _: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("values", &["to"], 0)?;
    iter::values(proxy, target_arg(&slots[0])?)
}

fn items(proxy: &Proxy, _: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("items", &["to"], 0)?;
    iter::items(proxy, target_arg(&slots[0])?)
}

/// `scriptdict.get(key, default=None, to=None)`.
fn dict_get(proxy: &Proxy, _: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("get", &["key", "default", "to"], 1)?;
    mapping::get(
        proxy,
        required(&slots[0])?,
        slots[1].as_ref(),
        target_arg(&slots[2])?,
    )
}
