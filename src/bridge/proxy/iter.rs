//! Lazy iterators over proxies.
//!
//! An iterator snapshots the proxy's value when it is created; later
//! changes to the proxy or its variable do not affect it.

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use crate::bridge::convert::to_value;
use crate::bridge::exception::plain_exception;
use crate::bridge::target::Target;
use crate::error::{BridgeError, Result};
use crate::object::{ClassInfo, Exception, NativeObject, Value};
use crate::script::Obj;

use super::{Flavour, Proxy};

#[derive(Debug, Clone, Copy)]
enum Kind {
    /// List elements, converted per `to` or wrapped in a new `scriptobj`.
    Elements(Option<Target>),
    Keys,
    Values(Target),
    Items(Target),
    /// Plain iteration of a `scriptdict`: keys, or `(key, value)` pairs
    /// when the proxy has a `to`.
    Dict(Option<Target>),
}

pub struct ProxyIter {
    obj: Obj,
    position: Cell<usize>,
    kind: Kind,
}

thread_local! {
    static ITERATOR: Rc<ClassInfo> = Rc::new(ClassInfo::new("scriptobj_iterator", "twine", None));
    static DICT_ITERATOR: Rc<ClassInfo> = Rc::new(ClassInfo::new("scriptdict_iterator", "twine", None));
}

impl ProxyIter {
    fn new(obj: Obj, kind: Kind) -> Value {
        Value::Native(Rc::new(ProxyIter {
            obj,
            position: Cell::new(0),
            kind,
        }))
    }

    fn entry(&self, at: usize) -> Result<Option<(Rc<str>, Obj)>> {
        self.obj
            .with_dict(|map| map.get_index(at).map(|(k, v)| (k.clone(), v.clone())))
            .map_err(BridgeError::TypeCoercion)
    }

    fn advance(&self) -> Result<Option<Value>> {
        let at = self.position.get();
        let item = match self.kind {
            Kind::Elements(to) => {
                let Some(element) = self.obj.list_index(at).map_err(BridgeError::TypeCoercion)? else {
                    return Ok(None);
                };
                match to {
                    Some(to) => to_value(&element, to)?,
                    None => Proxy::owned(element, Flavour::List).into_value(),
                }
            }
            Kind::Keys | Kind::Dict(None) => match self.entry(at)? {
                Some((key, _)) => Value::Str(key),
                None => return Ok(None),
            },
            Kind::Values(to) => match self.entry(at)? {
                Some((_, value)) => to_value(&value, to)?,
                None => return Ok(None),
            },
            Kind::Items(to) | Kind::Dict(Some(to)) => match self.entry(at)? {
                Some((key, value)) => Value::tuple(vec![Value::Str(key), to_value(&value, to)?]),
                None => return Ok(None),
            },
        };
        self.position.set(at + 1);
        Ok(Some(item))
    }
}

impl NativeObject for ProxyIter {
    fn class(&self) -> Rc<ClassInfo> {
        match self.kind {
            Kind::Elements(_) => ITERATOR.with(Rc::clone),
            _ => DICT_ITERATOR.with(Rc::clone),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn iter(&self, this: &Rc<dyn NativeObject>) -> Option<std::result::Result<Value, Exception>> {
        Some(Ok(Value::Native(this.clone())))
    }

    fn next(&self) -> Option<std::result::Result<Option<Value>, Exception>> {
        Some(self.advance().map_err(plain_exception))
    }
}

/// `iter(proxy)`.
pub fn for_proxy(proxy: &Proxy) -> Result<Value> {
    let obj = proxy.obj()?;
    let kind = match proxy.flavour() {
        Flavour::List => {
            obj.list_len().map_err(BridgeError::TypeCoercion)?;
            Kind::Elements(proxy.target())
        }
        Flavour::Dict => {
            obj.dict_size().map_err(BridgeError::TypeCoercion)?;
            Kind::Dict(proxy.target())
        }
    };
    Ok(ProxyIter::new(obj, kind))
}

fn dict_obj(proxy: &Proxy) -> Result<Obj> {
    let obj = proxy.obj()?;
    obj.dict_size().map_err(BridgeError::TypeCoercion)?;
    Ok(obj)
}

pub fn keys(proxy: &Proxy) -> Result<Value> {
    Ok(ProxyIter::new(dict_obj(proxy)?, Kind::Keys))
}

pub fn values(proxy: &Proxy, to: Option<Target>) -> Result<Value> {
    let to = to.or(proxy.target()).unwrap_or(Target::Str);
    Ok(ProxyIter::new(dict_obj(proxy)?, Kind::Values(to)))
}

pub fn items(proxy: &Proxy, to: Option<Target>) -> Result<Value> {
    let to = to.or(proxy.target()).unwrap_or(Target::Str);
    Ok(ProxyIter::new(dict_obj(proxy)?, Kind::Items(to)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ops;

    fn drain(iterator: Value) -> Vec<Value> {
        ops::iter(&iterator)
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn list_iteration_wraps_or_converts() {
        let proxy = Proxy::owned(Obj::new("1 {2 3}"), Flavour::List);
        let items = drain(for_proxy(&proxy).unwrap());
        assert_eq!(items.len(), 2);
        assert_eq!(ops::str(&items[1]).unwrap(), "2 3");

        let proxy = Proxy::owned(Obj::new("1 2"), Flavour::List).with_to(Some(Target::Int));
        assert_eq!(drain(for_proxy(&proxy).unwrap()), vec![Value::from(1_i64), Value::from(2_i64)]);
    }

    #[test]
    fn dict_iteration_yields_keys_or_pairs() {
        let proxy = Proxy::owned(Obj::new("a 1 b 2"), Flavour::Dict);
        assert_eq!(drain(for_proxy(&proxy).unwrap()), vec![Value::from("a"), Value::from("b")]);
        assert_eq!(
            ops::repr(&Value::list(drain(items(&proxy, Some(Target::Int)).unwrap()))),
            "[('a', 1), ('b', 2)]"
        );
        assert_eq!(drain(values(&proxy, None).unwrap()), vec![Value::from("1"), Value::from("2")]);

        proxy.set_target(Some(Target::Float));
        assert_eq!(
            ops::repr(&Value::list(drain(for_proxy(&proxy).unwrap()))),
            "[('a', 1.0), ('b', 2.0)]"
        );
    }

    #[test]
    fn iterators_snapshot_the_value() {
        let proxy = Proxy::owned(Obj::new("a 1"), Flavour::Dict);
        let pending = keys(&proxy).unwrap();
        proxy.set_obj(Obj::new("z 9 y 8")).unwrap();
        assert_eq!(drain(pending), vec![Value::from("a")]);
    }

    #[test]
    fn malformed_dicts_fail_up_front() {
        let proxy = Proxy::owned(Obj::new("a 1 b"), Flavour::Dict);
        assert!(matches!(keys(&proxy), Err(BridgeError::TypeCoercion(_))));
    }
}
