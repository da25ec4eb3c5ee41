//! Value conversion between the two runtimes.

use indexmap::{IndexMap, IndexSet};

use crate::error::{BridgeError, Result};
use crate::object::{ops, Key, Value};
use crate::script::{DictMap, Obj};

use super::proxy::{Flavour, Proxy};
use super::target::Target;

/// Containers nested deeper than this are assumed to be cyclic.
const MAX_NESTING: usize = 512;

/// Marshal an object-runtime value into a script value.
pub fn to_obj(value: &Value) -> Result<Obj> {
    to_obj_nested(value, 0)
}

fn to_obj_nested(value: &Value, depth: usize) -> Result<Obj> {
    if depth > MAX_NESTING {
        return Err(BridgeError::Conversion(
            "maximum nesting depth exceeded while converting".to_string(),
        ));
    }
    let obj = match value {
        Value::None => Obj::empty(),
        Value::Bool(b) => Obj::from_bool(*b),
        Value::Native(_) => match value.as_native::<Proxy>() {
            Some(proxy) => return proxy.obj(),
            None => stringify(value)?,
        },
        Value::Bytes(bytes) => Obj::from_bytes(bytes.to_vec()),
        Value::Str(text) => Obj::new(text.clone()),
        Value::Int(i) => Obj::new(i.to_string()),
        Value::Float(f) => Obj::new(ops::format_float(*f)),
        Value::List(items) => {
            let items = items.borrow().clone();
            convert_items(&items, depth)?
        }
        Value::Tuple(items) => convert_items(items, depth)?,
        Value::Set(keys) => {
            let items: Vec<Value> = keys.borrow().iter().map(Key::to_value).collect();
            convert_items(&items, depth)?
        }
        Value::Dict(map) => {
            let pairs: Vec<(Value, Value)> = map
                .borrow()
                .iter()
                .map(|(key, value)| (key.to_value(), value.clone()))
                .collect();
            // Nothing is returned unless every pair converted.
            let mut converted = DictMap::with_capacity(pairs.len());
            for (key, value) in &pairs {
                let key = to_obj_nested(key, depth + 1)?;
                let value = to_obj_nested(value, depth + 1)?;
                converted.insert(key.text(), value);
            }
            Obj::from_dict(converted)
        }
        other => stringify(other)?,
    };
    Ok(obj)
}

fn stringify(value: &Value) -> Result<Obj> {
    let text = ops::str(value).map_err(|error| {
        BridgeError::Conversion(format!(
            "cannot convert {} object: {}",
            value.type_name(),
            error.message()
        ))
    })?;
    Ok(Obj::new(text))
}

fn convert_items(items: &[Value], depth: usize) -> Result<Obj> {
    let converted = items
        .iter()
        .map(|item| to_obj_nested(item, depth + 1))
        .collect::<Result<Vec<Obj>>>()?;
    Ok(Obj::from_list(converted))
}

/// Marshal a script value into the object runtime as `target`.
pub fn to_value(obj: &Obj, target: Target) -> Result<Value> {
    let value = match target {
        Target::Str => Value::Str(obj.text()),
        Target::Int => Value::Int(obj.int().map_err(BridgeError::TypeCoercion)?),
        Target::Bool => Value::Bool(obj.boolean().map_err(BridgeError::TypeCoercion)?),
        Target::Float => Value::Float(obj.double().map_err(BridgeError::TypeCoercion)?),
        Target::List => Value::list(elements(obj)?),
        Target::Tuple => Value::tuple(elements(obj)?),
        Target::Set => {
            let keys: IndexSet<Key> = obj
                .with_list(|items| items.iter().map(|item| Key::Str(item.text())).collect())
                .map_err(BridgeError::TypeCoercion)?;
            Value::set(keys)
        }
        Target::Dict => {
            let map: IndexMap<Key, Value> = obj
                .with_dict(|map| {
                    map.iter()
                        .map(|(key, value)| (Key::Str(key.clone()), Value::Str(value.text())))
                        .collect()
                })
                .map_err(BridgeError::TypeCoercion)?;
            Value::dict(map)
        }
        Target::Bytes => Value::bytes(&obj.bytes()),
        Target::Obj => Proxy::owned(obj.clone(), Flavour::List).into_value(),
        Target::DictObj => Proxy::owned(obj.clone(), Flavour::Dict).into_value(),
    };
    Ok(value)
}

fn elements(obj: &Obj) -> Result<Vec<Value>> {
    obj.with_list(|items| items.iter().map(|item| Value::Str(item.text())).collect())
        .map_err(BridgeError::TypeCoercion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    #[test]
    fn scalars_follow_the_precedence_order() {
        assert_eq!(to_obj(&Value::None).unwrap().as_str(), "");
        assert_eq!(to_obj(&Value::Bool(true)).unwrap().as_str(), "1");
        assert_eq!(to_obj(&Value::from("hi")).unwrap().as_str(), "hi");
        assert_eq!(to_obj(&Value::from(2.5)).unwrap().as_str(), "2.5");
        let big: BigInt = "123456789012345678901234567890".parse().unwrap();
        assert_eq!(
            to_obj(&Value::Int(big)).unwrap().as_str(),
            "123456789012345678901234567890"
        );
    }

    // Unsupported values are rendered with str() rather than rejected.
    #[test]
    fn unsupported_values_fall_back_to_their_display_text() {
        let error = Value::from(crate::object::Exception::value_error("bad input"));
        assert_eq!(to_obj(&error).unwrap().as_str(), "bad input");
    }

    #[test]
    fn containers_keep_order_and_count() {
        let list = Value::list(vec![Value::from(1_i64), Value::from("a b"), Value::None]);
        let obj = to_obj(&list).unwrap();
        assert_eq!(obj.list_len().unwrap(), 3);
        assert_eq!(obj.as_str(), "1 {a b} {}");

        let mut map = IndexMap::new();
        map.insert(Key::from("z"), Value::from(1_i64));
        map.insert(Key::from("a"), Value::list(vec![Value::from("x")]));
        let obj = to_obj(&Value::dict(map)).unwrap();
        assert_eq!(obj.as_str(), "z 1 a x");
        assert_eq!(obj.dict_size().unwrap(), 2);
    }

    #[test]
    fn proxies_yield_their_obj_without_copying() {
        let obj = Obj::from_strs(&["a", "b"]);
        let proxy = Proxy::owned(obj.clone(), Flavour::List).into_value();
        assert!(Obj::ptr_eq(&to_obj(&proxy).unwrap(), &obj));
    }

    #[test]
    fn cyclic_lists_fail_instead_of_recursing() {
        let list = Value::list(Vec::new());
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        assert!(matches!(to_obj(&list), Err(BridgeError::Conversion(_))));
        if let Value::List(items) = &list {
            items.borrow_mut().clear();
        }
    }

    #[test]
    fn coercion_errors_carry_the_script_diagnostic() {
        let error = to_value(&Obj::new("abc"), Target::Int).unwrap_err();
        assert!(matches!(error, BridgeError::TypeCoercion(_)));
        assert_eq!(error.to_string(), "expected integer but got \"abc\"");

        let error = to_value(&Obj::new("a b c"), Target::Dict).unwrap_err();
        assert_eq!(error.to_string(), "missing value to go with key");
    }

    #[test]
    fn containers_come_back_as_strings() {
        let value = to_value(&Obj::new("1 2 {3 4}"), Target::List).unwrap();
        assert_eq!(ops::repr(&value), "['1', '2', '3 4']");
        let value = to_value(&Obj::new("a 1 b 2"), Target::Dict).unwrap();
        assert_eq!(ops::repr(&value), "{'a': '1', 'b': '2'}");
        let value = to_value(&Obj::new("99999999999999999999"), Target::Int).unwrap();
        assert_eq!(ops::repr(&value), "99999999999999999999");
    }
}
