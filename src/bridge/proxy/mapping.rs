//! Dict protocol of proxies. Keys are single keys or key paths given as
//! a list or tuple, one nesting level per key.

use crate::error::{BridgeError, Result};
use crate::object::Value;
use crate::script::Obj;

use super::Proxy;
use crate::bridge::convert::to_obj;
use crate::bridge::target::Target;

pub fn key_path(key: &Value) -> Result<Vec<Obj>> {
    let keys = match key {
        Value::List(items) => items.borrow().clone(),
        Value::Tuple(items) => items.to_vec(),
        single => return Ok(vec![to_obj(single)?]),
    };
    if keys.is_empty() {
        return Err(BridgeError::Key("empty key path".to_string()));
    }
    keys.iter().map(to_obj).collect()
}

fn missing(path: &[Obj]) -> BridgeError {
    let text: Vec<&str> = path.iter().map(Obj::as_str).collect();
    BridgeError::Key(text.join(" "))
}

/// Value at `path`, or `None` when any key along it is missing.
pub fn lookup(proxy: &Proxy, path: &[Obj]) -> Result<Option<Obj>> {
    proxy
        .obj()?
        .dict_get_path(path)
        .map_err(BridgeError::TypeCoercion)
}

pub fn get_item(proxy: &Proxy, key: &Value) -> Result<Value> {
    let path = key_path(key)?;
    let found = lookup(proxy, &path)?.ok_or_else(|| missing(&path))?;
    proxy.element(found)
}

pub fn set_item(proxy: &Proxy, key: &Value, value: &Value) -> Result<()> {
    let path = key_path(key)?;
    let value = to_obj(value)?;
    proxy.update(|obj| obj.dict_put_path(&path, value).map_err(BridgeError::Value))
}

pub fn del_item(proxy: &Proxy, key: &Value) -> Result<()> {
    let path = key_path(key)?;
    let removed = proxy.update(|obj| obj.dict_remove_path(&path).map_err(BridgeError::Key))?;
    if !removed {
        return Err(missing(&path));
    }
    Ok(())
}

pub fn contains(proxy: &Proxy, key: &Value) -> Result<bool> {
    let path = key_path(key)?;
    Ok(lookup(proxy, &path)?.is_some())
}

/// `get(key, default=None, to=None)`: the default comes back unconverted.
pub fn get(proxy: &Proxy, key: &Value, default: Option<&Value>, to: Option<Target>) -> Result<Value> {
    let path = key_path(key)?;
    match lookup(proxy, &path)? {
        Some(found) => proxy.convert(&found, to, Target::Str),
        None => Ok(default.cloned().unwrap_or(Value::None)),
    }
}

/// `td_remove`: like `del` but a missing final key is not an error.
pub fn remove(proxy: &Proxy, key: &Value) -> Result<()> {
    let path = key_path(key)?;
    proxy.update(|obj| obj.dict_remove_path(&path).map_err(BridgeError::Key))?;
    Ok(())
}

pub fn size(proxy: &Proxy) -> Result<usize> {
    proxy.obj()?.dict_size().map_err(BridgeError::TypeCoercion)
}
