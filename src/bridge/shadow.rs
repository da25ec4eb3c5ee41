//! `shadowdict`: a mapping over a script array variable.
//!
//! Nothing is cached; every access goes to the array's elements in the
//! interpreter.

use std::any::Any;
use std::rc::Rc;

use crate::error::{BridgeError, Result};
use crate::object::{ops, CallArgs, ClassInfo, Context, Exception, NativeFunction, NativeObject, Value};
use crate::script::{Interp, WeakInterp};

use super::convert::{to_obj, to_value};
use super::exception::{plain_exception, raise_in};
use super::target::Target;

thread_local! {
    static SHADOWDICT: Rc<ClassInfo> = Rc::new(ClassInfo::new("shadowdict", "twine", None));
}

pub struct ShadowDict {
    array: String,
    interp: WeakInterp,
    to: Target,
    default: Option<Value>,
}

impl ShadowDict {
    pub fn new(interp: &Interp, array: &str, to: Option<Target>, default: Option<Value>) -> ShadowDict {
        ShadowDict {
            array: array.to_string(),
            interp: interp.downgrade(),
            to: to.unwrap_or(Target::Str),
            default: default.filter(|value| !value.is_none()),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Native(Rc::new(self))
    }

    fn interp(&self) -> Result<Interp> {
        self.interp
            .upgrade()
            .filter(|interp| !interp.is_deleted())
            .ok_or_else(|| {
                BridgeError::Name(format!(
                    "can't read \"{}\": interpreter has been deleted",
                    self.array
                ))
            })
    }

    fn element(&self, key: &Value) -> Result<String> {
        Ok(format!("{}({})", self.array, ops::str(key)?))
    }

    /// `shadow[key]`: the default when one was given, `KeyError` otherwise.
    pub fn get_item(&self, key: &Value) -> Result<Value> {
        let interp = self.interp()?;
        match interp.get_var(&self.element(key)?) {
            Ok(obj) => to_value(&obj, self.to),
            Err(_) => match &self.default {
                Some(default) => Ok(default.clone()),
                None => Err(BridgeError::Key(ops::str(key)?)),
            },
        }
    }

    pub fn set_item(&self, key: &Value, value: &Value) -> Result<()> {
        self.interp()?
            .set_var(&self.element(key)?, to_obj(value)?)
            .map_err(BridgeError::Value)?;
        Ok(())
    }

    pub fn del_item(&self, key: &Value) -> Result<()> {
        self.interp()?
            .unset_var(&self.element(key)?)
            .map_err(|_| BridgeError::Key(ops::str(key).unwrap_or_default()))
    }

    pub fn contains(&self, key: &Value) -> Result<bool> {
        Ok(self.interp()?.var_exists(&self.element(key)?))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.interp()?.array_size(&self.array))
    }

    /// Element names in the array's order.
    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self.interp()?.array_names(&self.array))
    }

    /// `get(key, default=None, to=None)`: never raises for a missing key;
    /// the default is converted like a present value would be.
    pub fn get(&self, key: &Value, default: Option<&Value>, to: Option<Target>) -> Result<Value> {
        let to = to.unwrap_or(self.to);
        let interp = self.interp()?;
        match interp.get_var(&self.element(key)?) {
            Ok(obj) => to_value(&obj, to),
            Err(_) => match default {
                None | Some(Value::None) => Ok(Value::None),
                Some(default) => to_value(&to_obj(default)?, to),
            },
        }
    }

    /// `pop(key, *default, to=None)`.
    pub fn pop(&self, key: &Value, default: Option<&Value>, to: Option<Target>) -> Result<Value> {
        let to = to.unwrap_or(self.to);
        let interp = self.interp()?;
        let name = self.element(key)?;
        if let Ok(obj) = interp.get_var(&name) {
            interp.unset_var(&name).map_err(BridgeError::Key)?;
            return to_value(&obj, to);
        }
        match default {
            None => Err(BridgeError::Key(ops::str(key)?)),
            Some(Value::None) => Ok(Value::None),
            Some(default) => to_value(&to_obj(default)?, to),
        }
    }

    /// Remove every element by unsetting the array.
    pub fn clear(&self) -> Result<()> {
        self.interp()?.array_unset(&self.array, None);
        Ok(())
    }

    fn method(&self, this: &Rc<dyn NativeObject>, name: &str) -> Option<Value> {
        let method: fn(&ShadowDict, CallArgs) -> Result<Value> = match name {
            "keys" => |shadow, args| {
                args.exact("keys", 0)?;
                Ok(Value::list(shadow.keys()?.into_iter().map(Value::from).collect()))
            },
            "get" => |shadow, args| {
                let slots = args.bind("get", &["key", "default", "to"], 1)?;
                let key = slots[0].as_ref().ok_or_else(|| unbound("key"))?;
                shadow.get(key, slots[1].as_ref(), Target::from_optional(slots[2].as_ref())?)
            },
            "pop" => |shadow, args| {
                let (slots, rest, named) = args.bind_varargs("pop", &["key"], 1, &["to"])?;
                if rest.len() > 1 {
                    return Err(BridgeError::Type(
                        "pop() takes one or two positional arguments".to_string(),
                    ));
                }
                let key = slots[0].as_ref().ok_or_else(|| unbound("key"))?;
                shadow.pop(key, rest.first(), Target::from_optional(named[0].as_ref())?)
            },
            "clear" => |shadow, args| {
                args.exact("clear", 0)?;
                shadow.clear()?;
                Ok(Value::None)
            },
            _ => return None,
        };
        let this = this.clone();
        let label = name.to_string();
        Some(
            NativeFunction::new(name, move |ctx: &Context, args| {
                let shadow = this.as_any().downcast_ref::<ShadowDict>().ok_or_else(|| {
                    plain_exception(BridgeError::Internal(format!("{label} bound to a foreign object")))
                })?;
                method(shadow, args).map_err(raise_in(ctx))
            })
            .into_value(),
        )
    }
}

fn unbound(name: &str) -> BridgeError {
    BridgeError::Internal(format!("argument '{name}' was not bound"))
}

impl NativeObject for ShadowDict {
    fn class(&self) -> Rc<ClassInfo> {
        SHADOWDICT.with(Rc::clone)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn repr(&self) -> std::result::Result<String, Exception> {
        let interp = self.interp().map_err(plain_exception)?;
        let pairs = interp
            .array_get(&self.array)
            .into_iter()
            .map(|(key, obj)| (key, Value::Str(obj.text())));
        Ok(ops::repr(&crate::object::builtins::string_dict(pairs)))
    }

    fn len(&self) -> Option<std::result::Result<usize, Exception>> {
        Some(ShadowDict::len(self).map_err(plain_exception))
    }

    fn get_item(&self, key: &Value) -> Option<std::result::Result<Value, Exception>> {
        Some(ShadowDict::get_item(self, key).map_err(plain_exception))
    }

    fn set_item(&self, key: &Value, value: &Value) -> Option<std::result::Result<(), Exception>> {
        Some(ShadowDict::set_item(self, key, value).map_err(plain_exception))
    }

    fn del_item(&self, key: &Value) -> Option<std::result::Result<(), Exception>> {
        Some(ShadowDict::del_item(self, key).map_err(plain_exception))
    }

    fn contains(&self, key: &Value) -> Option<std::result::Result<bool, Exception>> {
        Some(ShadowDict::contains(self, key).map_err(plain_exception))
    }

    /// Iteration walks a sorted snapshot of the element names.
    fn iter(&self, _this: &Rc<dyn NativeObject>) -> Option<std::result::Result<Value, Exception>> {
        let keys = self.keys().map(|mut keys| {
            keys.sort();
            Value::list(keys.into_iter().map(Value::from).collect())
        });
        Some(keys.map_err(plain_exception))
    }

    fn get_attr(&self, this: &Rc<dyn NativeObject>, name: &str) -> Option<std::result::Result<Value, Exception>> {
        self.method(this, name).map(Ok)
    }
}
