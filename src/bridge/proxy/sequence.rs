//! List protocol of proxies.

use crate::error::{BridgeError, Result};
use crate::object::{ops, Value};
use crate::script::Obj;

use super::{Flavour, Proxy};
use crate::bridge::convert::to_obj;
use crate::bridge::target::Target;

fn out_of_range() -> BridgeError {
    BridgeError::Index("list index out of range".to_string())
}

/// Resolve a possibly negative index against `len`.
fn position(key: &Value, len: usize) -> Result<usize> {
    let index = ops::index_value(key).ok_or_else(|| {
        BridgeError::Type(format!(
            "list indices must be integers or slices, not {}",
            key.type_name()
        ))
    })?;
    ops::normalize_index(&index, len).ok_or_else(out_of_range)
}

fn index_arg(value: &Value, function: &str) -> Result<i64> {
    ops::index_value(value)
        .and_then(|index| num_traits::ToPrimitive::to_i64(&index))
        .ok_or_else(|| {
            BridgeError::Type(format!(
                "{function}() index must be an integer, not {}",
                value.type_name()
            ))
        })
}

pub fn len(proxy: &Proxy) -> Result<usize> {
    let obj = proxy.obj()?;
    let len = match proxy.flavour() {
        Flavour::List => obj.list_len(),
        Flavour::Dict => obj.dict_size(),
    };
    len.map_err(BridgeError::TypeCoercion)
}

pub fn get_item(proxy: &Proxy, key: &Value) -> Result<Value> {
    let obj = proxy.obj()?;
    if let Value::Slice(slice) = key {
        let items = obj.list().map_err(BridgeError::TypeCoercion)?;
        let picked = ops::slice_positions(slice, items.len())?
            .into_iter()
            .map(|i| items[i].clone())
            .collect();
        return Ok(Proxy::owned(Obj::from_list(picked), Flavour::List)
            .with_to(proxy.target())
            .into_value());
    }
    let len = obj.list_len().map_err(BridgeError::TypeCoercion)?;
    let at = position(key, len)?;
    let item = obj
        .list_index(at)
        .map_err(BridgeError::TypeCoercion)?
        .ok_or_else(out_of_range)?;
    proxy.element(item)
}

pub fn set_item(proxy: &Proxy, key: &Value, value: &Value) -> Result<()> {
    if let Value::Slice(_) = key {
        return Err(BridgeError::Type(
            "scriptobj does not support slice assignment".to_string(),
        ));
    }
    let item = to_obj(value)?;
    proxy.update(|obj| {
        let len = obj.list_len().map_err(BridgeError::TypeCoercion)?;
        let at = position(key, len)?;
        obj.list_set(at, item).map_err(BridgeError::Index)
    })
}

pub fn del_item(proxy: &Proxy, key: &Value) -> Result<()> {
    proxy.update(|obj| {
        let len = obj.list_len().map_err(BridgeError::TypeCoercion)?;
        let at = position(key, len)?;
        obj.list_remove(at).map_err(BridgeError::Index)?;
        Ok(())
    })
}

/// Membership compares string representations.
pub fn contains(proxy: &Proxy, item: &Value) -> Result<bool> {
    let needle = to_obj(item)?;
    proxy
        .obj()?
        .with_list(|items| items.iter().any(|element| element.as_str() == needle.as_str()))
        .map_err(BridgeError::TypeCoercion)
}

pub fn append(proxy: &Proxy, value: &Value) -> Result<()> {
    let item = to_obj(value)?;
    proxy.update(|obj| obj.list_append(item).map_err(BridgeError::TypeCoercion))
}

/// Append every element of another proxy or of any iterable.
pub fn extend(proxy: &Proxy, source: &Value) -> Result<()> {
    let items = match source.as_native::<Proxy>() {
        Some(other) => other.obj()?.list().map_err(BridgeError::TypeCoercion)?,
        None => ops::collect(source)?
            .iter()
            .map(to_obj)
            .collect::<Result<Vec<Obj>>>()?,
    };
    proxy.update(|obj| obj.list_extend(items).map_err(BridgeError::TypeCoercion))
}

/// Insert before `index`, clamped to the list like a builtin list does.
pub fn insert(proxy: &Proxy, index: &Value, value: &Value) -> Result<()> {
    let index = index_arg(index, "insert")?;
    let item = to_obj(value)?;
    proxy.update(|obj| {
        let len = obj.list_len().map_err(BridgeError::TypeCoercion)? as i64;
        let at = if index < 0 { (index + len).max(0) } else { index.min(len) };
        obj.list_insert(at as usize, item).map_err(BridgeError::TypeCoercion)
    })
}

pub fn pop(proxy: &Proxy, index: Option<&Value>, to: Option<Target>) -> Result<Value> {
    let index = index.map(|value| index_arg(value, "pop")).transpose()?;
    let removed = proxy.update(|obj| {
        let len = obj.list_len().map_err(BridgeError::TypeCoercion)?;
        if len == 0 {
            return Err(BridgeError::Index("pop from empty list".to_string()));
        }
        let index = index.unwrap_or(-1);
        let resolved = if index < 0 { index + len as i64 } else { index };
        if resolved < 0 || resolved >= len as i64 {
            return Err(BridgeError::Index("pop index out of range".to_string()));
        }
        obj.list_remove(resolved as usize).map_err(BridgeError::Index)
    })?;
    proxy.convert(&removed, to, Target::Str)
}

/// `lindex`: no negative index normalisation.
pub fn lindex(proxy: &Proxy, index: &Value, to: Option<Target>) -> Result<Value> {
    let index = index_arg(index, "lindex")?;
    if index < 0 {
        return Err(out_of_range());
    }
    let item = proxy
        .obj()?
        .list_index(index as usize)
        .map_err(BridgeError::TypeCoercion)?
        .ok_or_else(out_of_range)?;
    proxy.convert(&item, to, Target::Str)
}

pub fn llength(proxy: &Proxy) -> Result<usize> {
    proxy.obj()?.list_len().map_err(BridgeError::TypeCoercion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Slice;
    use std::rc::Rc;

    fn list(items: &[&str]) -> Proxy {
        Proxy::owned(Obj::from_strs(items), Flavour::List)
    }

    #[test]
    fn negative_indices_count_from_the_end() {
        let proxy = list(&["a", "b", "c"]).with_to(Some(Target::Str));
        assert_eq!(get_item(&proxy, &Value::from(-1_i64)).unwrap(), Value::from("c"));
        let error = get_item(&proxy, &Value::from(3_i64)).unwrap_err();
        assert!(matches!(error, BridgeError::Index(_)));
    }

    #[test]
    fn slices_with_step_make_new_proxies() {
        let proxy = list(&["a", "b", "c", "d", "e"]);
        let slice = Value::Slice(Rc::new(Slice {
            start: Value::None,
            stop: Value::None,
            step: Value::from(-2_i64),
        }));
        let picked = get_item(&proxy, &slice).unwrap();
        let picked = picked.as_native::<Proxy>().unwrap();
        assert_eq!(&*picked.text().unwrap(), "e c a");
        assert_eq!(&*proxy.text().unwrap(), "a b c d e");
    }

    #[test]
    fn enormous_steps_pick_only_the_start() {
        let proxy = list(&["1", "2", "3"]);
        let slice = Value::Slice(Rc::new(Slice {
            start: Value::from(1_i64),
            stop: Value::None,
            step: Value::Int(num_bigint::BigInt::from(1) << 70),
        }));
        let picked = get_item(&proxy, &slice).unwrap();
        let picked = picked.as_native::<Proxy>().unwrap();
        assert_eq!(&*picked.text().unwrap(), "2");
    }

    #[test]
    fn mutation_copies_a_shared_value() {
        let shared = Obj::from_strs(&["1", "2"]);
        let proxy = Proxy::owned(shared.clone(), Flavour::List);
        append(&proxy, &Value::from(3_i64)).unwrap();
        assert_eq!(shared.as_str(), "1 2");
        assert_eq!(&*proxy.text().unwrap(), "1 2 3");
        assert!(!Obj::ptr_eq(&proxy.obj().unwrap(), &shared));
    }

    #[test]
    fn pop_reports_empty_and_out_of_range() {
        let proxy = list(&["x"]);
        assert_eq!(pop(&proxy, None, None).unwrap(), Value::from("x"));
        assert_eq!(
            pop(&proxy, None, None).unwrap_err().to_string(),
            "pop from empty list"
        );
        let proxy = list(&["x", "y"]);
        assert_eq!(
            pop(&proxy, Some(&Value::from(5_i64)), None).unwrap_err().to_string(),
            "pop index out of range"
        );
        assert_eq!(pop(&proxy, Some(&Value::from(0_i64)), None).unwrap(), Value::from("x"));
    }

    #[test]
    fn insert_clamps_and_extend_accepts_iterables() {
        let proxy = list(&["b"]);
        insert(&proxy, &Value::from(-10_i64), &Value::from("a")).unwrap();
        insert(&proxy, &Value::from(10_i64), &Value::from("c")).unwrap();
        extend(&proxy, &Value::tuple(vec![Value::from("d"), Value::from(5_i64)])).unwrap();
        extend(&proxy, &list(&["e f"]).into_value()).unwrap();
        assert_eq!(&*proxy.text().unwrap(), "a b c d 5 {e f}");
        assert!(contains(&proxy, &Value::from(5_i64)).unwrap());
        assert!(!contains(&proxy, &Value::from("e")).unwrap());
    }

    #[test]
    fn lindex_does_not_wrap_negative_indices() {
        let proxy = list(&["a", "b"]);
        assert_eq!(lindex(&proxy, &Value::from(1_i64), None).unwrap(), Value::from("b"));
        assert!(matches!(
            lindex(&proxy, &Value::from(-1_i64), None),
            Err(BridgeError::Index(_))
        ));
        assert_eq!(llength(&proxy).unwrap(), 2);
    }
}
