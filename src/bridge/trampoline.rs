//! `scriptproc`: script commands callable from object code.
//!
//! A proc's parameter list is read once, when the wrapper is created, so
//! calls can bind keyword arguments and fill in defaults the way the
//! object runtime binds its own functions. Commands that are not procs
//! take positional arguments only.

use std::any::Any;
use std::rc::Rc;

use tracing::debug;

use crate::error::{BridgeError, Result};
use crate::object::{ops, CallArgs, ClassInfo, Context, Exception, NativeObject, Value};
use crate::script::interp::Proc;
use crate::script::{Interp, Obj, WeakInterp};

use super::convert::{to_obj, to_value};
use super::exception::{plain_exception, to_exception};
use super::state_of;
use super::target::Target;

thread_local! {
    static SCRIPTPROC: Rc<ClassInfo> = Rc::new(ClassInfo::new("scriptproc", "twine", None));
}

pub struct ScriptProc {
    name: String,
    /// `None` for commands implemented natively.
    proc: Option<Rc<Proc>>,
    interp: WeakInterp,
    to: std::cell::Cell<Target>,
}

impl ScriptProc {
    /// Wrap the command `name`, which must exist.
    pub fn lookup(interp: &Interp, name: &str, to: Option<Target>) -> Result<ScriptProc> {
        if !interp.command_exists(name) {
            return Err(BridgeError::Name(format!("invalid command name \"{name}\"")));
        }
        Ok(ScriptProc {
            name: name.to_string(),
            proc: interp.proc_info(name),
            interp: interp.downgrade(),
            to: std::cell::Cell::new(to.unwrap_or(Target::Str)),
        })
    }

    pub fn into_value(self) -> Value {
        Value::Native(Rc::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter names, empty for native commands.
    pub fn params(&self) -> Vec<&str> {
        self.proc
            .iter()
            .flat_map(|proc| proc.params.iter().map(|param| param.name.as_str()))
            .collect()
    }

    /// The full word list of a call: command name, then one word per
    /// parameter in declaration order, then any `args` tail.
    pub fn words(&self, args: &[Value], keywords: &[(String, Value)]) -> Result<Vec<Obj>> {
        let mut words = vec![Obj::new(self.name.as_str())];
        let Some(proc) = &self.proc else {
            if !keywords.is_empty() {
                return Err(BridgeError::Type(format!(
                    "can't pass named parameters to '{}', which is not a proc",
                    self.name
                )));
            }
            for arg in args {
                words.push(to_obj(arg)?);
            }
            return Ok(words);
        };

        let params = &proc.params;
        let variadic = params.last().is_some_and(|param| param.name == "args");
        let fixed = if variadic { params.len() - 1 } else { params.len() };
        if !variadic && args.len() + keywords.len() > fixed {
            return Err(BridgeError::Type(format!(
                "too many arguments specified to be passed to proc '{}'",
                self.name
            )));
        }

        let mut slots: Vec<Option<Obj>> = vec![None; fixed];
        for (key, value) in keywords {
            let Some(index) = params[..fixed].iter().position(|param| &param.name == key) else {
                return Err(BridgeError::Type(format!(
                    "named parameter '{key}' is not a valid argument for proc '{}'",
                    self.name
                )));
            };
            slots[index] = Some(to_obj(value)?);
        }

        let mut positional = args.iter();
        for slot in slots.iter_mut().filter(|slot| slot.is_none()) {
            match positional.next() {
                Some(arg) => *slot = Some(to_obj(arg)?),
                None => break,
            }
        }
        let rest: Vec<&Value> = positional.collect();
        if !variadic && !rest.is_empty() {
            return Err(BridgeError::Type(format!(
                "too many arguments specified to be passed to proc '{}'",
                self.name
            )));
        }

        for (slot, param) in slots.into_iter().zip(params) {
            let value = slot
                .or_else(|| param.default.clone())
                .ok_or_else(|| BridgeError::Type(format!("required arg '{}' missing", param.name)))?;
            words.push(value);
        }
        for arg in rest {
            words.push(to_obj(arg)?);
        }
        Ok(words)
    }

    fn invoke(&self, ctx: &Context, args: CallArgs) -> Result<Value> {
        let mut keywords: Vec<(String, Value)> = args.keywords.into_iter().collect();
        let to = match keywords.iter().position(|(key, _)| key == "to") {
            Some(index) => Target::from_value(&keywords.remove(index).1)?,
            None => self.to.get(),
        };
        let words = self.words(&args.positional, &keywords)?;

        let interp = self
            .interp
            .upgrade()
            .filter(|interp| !interp.is_deleted())
            .ok_or_else(|| BridgeError::Name(format!("invalid command name \"{}\": interpreter has been deleted", self.name)))?;
        let _guard = match state_of(ctx) {
            Some(state) => Some(state.enter(&interp)?),
            None => None,
        };
        debug!(command = %self.name, words = words.len(), "scriptproc call");
        let result = interp.call(&words)?;
        to_value(&result, to)
    }
}

impl NativeObject for ScriptProc {
    fn class(&self) -> Rc<ClassInfo> {
        SCRIPTPROC.with(Rc::clone)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn repr(&self) -> std::result::Result<String, Exception> {
        let params: Vec<Value> = self.params().into_iter().map(Value::from).collect();
        Ok(format!(
            "<twine.scriptproc '{}', args {}>",
            self.name,
            ops::repr(&Value::list(params))
        ))
    }

    fn get_attr(&self, _this: &Rc<dyn NativeObject>, name: &str) -> Option<std::result::Result<Value, Exception>> {
        match name {
            "name" => Some(Ok(Value::from(self.name.as_str()))),
            "to" => Some(Ok(self.to.get().type_value())),
            "__call__" => Some(Ok(Value::None)),
            _ => None,
        }
    }

    fn set_attr(&self, name: &str, value: &Value) -> Option<std::result::Result<(), Exception>> {
        if name != "to" {
            return None;
        }
        let result = Target::from_value(value).map(|to| self.to.set(to));
        Some(result.map_err(plain_exception))
    }

    fn call(&self, ctx: &Context, args: CallArgs) -> Option<std::result::Result<Value, Exception>> {
        Some(self.invoke(ctx, args).map_err(|error| to_exception(ctx, error)))
    }
}
