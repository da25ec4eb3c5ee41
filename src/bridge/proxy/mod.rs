//! `scriptobj` and `scriptdict`: object-runtime handles on script values.
//!
//! A proxy either owns an [`Obj`] or names a script variable. Variable
//! bindings are resolved on every access, so a bound proxy always sees
//! the variable's current value. Mutations go through `Rc::make_mut`
//! on the owned value or on the variable slot, so a value shared with
//! anyone else is copied before it changes.

pub mod compare;
pub mod iter;
pub mod mapping;
mod methods;
pub mod numeric;
pub mod sequence;

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use num_bigint::BigInt;

use crate::error::{BridgeError, Result};
use crate::object::{
    ops, BinOp, CallArgs, ClassInfo, CmpOp, Context, Exception, NativeFunction, NativeObject,
    UnaryOp, Value,
};
use crate::script::{leak_detector, Interp, Obj, WeakInterp};

use super::convert::{to_obj, to_value};
use super::exception::{plain_exception, raise_in};
use super::resolve;
use super::target::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavour {
    List,
    Dict,
}

pub enum Binding {
    Owned(Obj),
    Var { name: Rc<str>, interp: WeakInterp },
}

pub struct Proxy {
    binding: RefCell<Binding>,
    flavour: Flavour,
    to: Cell<Option<Target>>,
}

thread_local! {
    static SCRIPTOBJ: Rc<ClassInfo> = Rc::new(
        ClassInfo::new("scriptobj", "twine", None)
            .with_constructor(Rc::new(|ctx: &Context, args: CallArgs| construct(ctx, args, Flavour::List))),
    );
    static SCRIPTDICT: Rc<ClassInfo> = Rc::new(
        ClassInfo::new("scriptdict", "twine", None)
            .with_constructor(Rc::new(|ctx: &Context, args: CallArgs| construct(ctx, args, Flavour::Dict))),
    );
}

pub fn scriptobj_class() -> Rc<ClassInfo> {
    SCRIPTOBJ.with(Rc::clone)
}

pub fn scriptdict_class() -> Rc<ClassInfo> {
    SCRIPTDICT.with(Rc::clone)
}

/// `scriptobj(source=None, to=None, var=None, default=None)`.
fn construct(ctx: &Context, args: CallArgs, flavour: Flavour) -> std::result::Result<Value, Exception> {
    let function = match flavour {
        Flavour::List => "scriptobj",
        Flavour::Dict => "scriptdict",
    };
    let slots = args.bind(function, &["source", "to", "var", "default"], 0)?;
    let [source, to, var, default] = [&slots[0], &slots[1], &slots[2], &slots[3]].map(present);
    let proxy = build(ctx, flavour, source, to, var, default).map_err(raise_in(ctx))?;
    Ok(proxy.into_value())
}

fn present(slot: &Option<Value>) -> Option<&Value> {
    slot.as_ref().filter(|value| !value.is_none())
}

fn build(
    ctx: &Context,
    flavour: Flavour,
    source: Option<&Value>,
    to: Option<&Value>,
    var: Option<&Value>,
    default: Option<&Value>,
) -> Result<Proxy> {
    let to = Target::from_optional(to)?;
    let Some(var) = var else {
        let obj = match source {
            Some(source) => to_obj(source)?,
            None => empty_obj(flavour),
        };
        return Ok(Proxy::owned(obj, flavour).with_to(to));
    };

    let name = ops::str(var)?;
    let (_, interp) = resolve(ctx)?;
    if let Some(source) = source {
        interp
            .set_var(&name, to_obj(source)?)
            .map_err(BridgeError::Value)?;
    } else if let Some(default) = default
        && !interp.var_exists(&name)
    {
        interp
            .set_var(&name, to_obj(default)?)
            .map_err(BridgeError::Value)?;
    }
    Ok(Proxy::bound(&interp, &name, flavour).with_to(to))
}

fn empty_obj(flavour: Flavour) -> Obj {
    match flavour {
        Flavour::List => Obj::empty(),
        Flavour::Dict => Obj::empty_dict(),
    }
}

impl Proxy {
    pub fn owned(obj: Obj, flavour: Flavour) -> Proxy {
        leak_detector::record_proxy_created();
        Proxy {
            binding: RefCell::new(Binding::Owned(obj)),
            flavour,
            to: Cell::new(None),
        }
    }

    pub fn bound(interp: &Interp, name: &str, flavour: Flavour) -> Proxy {
        leak_detector::record_proxy_created();
        Proxy {
            binding: RefCell::new(Binding::Var {
                name: Rc::from(name),
                interp: interp.downgrade(),
            }),
            flavour,
            to: Cell::new(None),
        }
    }

    pub fn with_to(self, to: Option<Target>) -> Proxy {
        self.to.set(to);
        self
    }

    pub fn into_value(self) -> Value {
        Value::Native(Rc::new(self))
    }

    pub fn flavour(&self) -> Flavour {
        self.flavour
    }

    pub fn target(&self) -> Option<Target> {
        self.to.get()
    }

    pub fn set_target(&self, to: Option<Target>) {
        self.to.set(to);
    }

    /// Name of the bound variable, if any.
    pub fn var_name(&self) -> Option<Rc<str>> {
        match &*self.binding.borrow() {
            Binding::Owned(_) => None,
            Binding::Var { name, .. } => Some(name.clone()),
        }
    }

    fn live_interp(name: &str, interp: &WeakInterp) -> Result<Interp> {
        interp
            .upgrade()
            .filter(|interp| !interp.is_deleted())
            .ok_or_else(|| {
                BridgeError::Name(format!(
                    "can't read \"{name}\": interpreter has been deleted"
                ))
            })
    }

    /// The current script value: the owned value, or the variable's value
    /// looked up now.
    pub fn obj(&self) -> Result<Obj> {
        let (name, interp) = match &*self.binding.borrow() {
            Binding::Owned(obj) => return Ok(obj.clone()),
            Binding::Var { name, interp } => (name.clone(), interp.clone()),
        };
        Proxy::live_interp(&name, &interp)?
            .get_var(&name)
            .map_err(BridgeError::Name)
    }

    pub fn text(&self) -> Result<Rc<str>> {
        Ok(self.obj()?.text())
    }

    /// Replace the value: the owned value, or the variable's value.
    pub fn set_obj(&self, obj: Obj) -> Result<()> {
        let (name, interp) = match &mut *self.binding.borrow_mut() {
            Binding::Owned(slot) => {
                *slot = obj;
                return Ok(());
            }
            Binding::Var { name, interp } => (name.clone(), interp.clone()),
        };
        Proxy::live_interp(&name, &interp)?
            .set_var(&name, obj)
            .map_err(BridgeError::Value)?;
        Ok(())
    }

    /// Mutate the value in place, copying it first when it is shared.
    /// `f` must not touch this proxy or the bound interpreter.
    pub fn update<R>(&self, f: impl FnOnce(&mut Obj) -> Result<R>) -> Result<R> {
        let (name, interp) = match &mut *self.binding.borrow_mut() {
            Binding::Owned(obj) => return f(obj),
            Binding::Var { name, interp } => (name.clone(), interp.clone()),
        };
        Proxy::live_interp(&name, &interp)?
            .with_var_mut(&name, f)
            .map_err(BridgeError::Name)?
    }

    /// Back to the empty value of the proxy's flavour.
    pub fn reset(&self) -> Result<()> {
        self.set_obj(empty_obj(self.flavour))
    }

    /// Convert a script value produced by this proxy: an explicit target
    /// first, then the proxy's `to`, then `fallback`.
    pub fn convert(&self, obj: &Obj, to: Option<Target>, fallback: Target) -> Result<Value> {
        to_value(obj, to.or(self.target()).unwrap_or(fallback))
    }

    /// An element handed out by indexing: converted per `to` when set,
    /// otherwise a new owned `scriptobj`.
    pub fn element(&self, obj: Obj) -> Result<Value> {
        match self.target() {
            Some(to) => to_value(&obj, to),
            None => Ok(Proxy::owned(obj, Flavour::List).into_value()),
        }
    }

    fn class_name(&self) -> &'static str {
        match self.flavour {
            Flavour::List => "scriptobj",
            Flavour::Dict => "scriptdict",
        }
    }
}

impl Drop for Proxy {
    fn drop(&mut self) {
        leak_detector::record_proxy_released();
    }
}

fn bound_method(this: &Rc<dyn NativeObject>, name: &'static str, method: methods::Method) -> Value {
    let this = this.clone();
    NativeFunction::new(name, move |ctx, args| {
        let proxy = this.as_any().downcast_ref::<Proxy>().ok_or_else(|| {
            plain_exception(BridgeError::Internal(format!("{name} bound to a foreign object")))
        })?;
        method(proxy, ctx, args).map_err(raise_in(ctx))
    })
    .into_value()
}

impl NativeObject for Proxy {
    fn class(&self) -> Rc<ClassInfo> {
        match self.flavour {
            Flavour::List => scriptobj_class(),
            Flavour::Dict => scriptdict_class(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn repr(&self) -> std::result::Result<String, Exception> {
        let text = self.text().map_err(plain_exception)?;
        Ok(format!(
            "<twine.{}: {}>",
            self.class_name(),
            ops::repr(&Value::Str(text))
        ))
    }

    fn str(&self) -> std::result::Result<String, Exception> {
        Ok(self.text().map_err(plain_exception)?.to_string())
    }

    fn truthy(&self) -> std::result::Result<bool, Exception> {
        numeric::truthy(self).map_err(plain_exception)
    }

    fn len(&self) -> Option<std::result::Result<usize, Exception>> {
        Some(sequence::len(self).map_err(plain_exception))
    }

    fn get_item(&self, key: &Value) -> Option<std::result::Result<Value, Exception>> {
        let result = match self.flavour {
            Flavour::List => sequence::get_item(self, key),
            Flavour::Dict => mapping::get_item(self, key),
        };
        Some(result.map_err(plain_exception))
    }

    fn set_item(&self, key: &Value, value: &Value) -> Option<std::result::Result<(), Exception>> {
        let result = match self.flavour {
            Flavour::List => sequence::set_item(self, key, value),
            Flavour::Dict => mapping::set_item(self, key, value),
        };
        Some(result.map_err(plain_exception))
    }

    fn del_item(&self, key: &Value) -> Option<std::result::Result<(), Exception>> {
        let result = match self.flavour {
            Flavour::List => sequence::del_item(self, key),
            Flavour::Dict => mapping::del_item(self, key),
        };
        Some(result.map_err(plain_exception))
    }

    fn contains(&self, item: &Value) -> Option<std::result::Result<bool, Exception>> {
        let result = match self.flavour {
            Flavour::List => sequence::contains(self, item),
            Flavour::Dict => mapping::contains(self, item),
        };
        Some(result.map_err(plain_exception))
    }

    fn iter(&self, _this: &Rc<dyn NativeObject>) -> Option<std::result::Result<Value, Exception>> {
        Some(iter::for_proxy(self).map_err(plain_exception))
    }

    fn get_attr(
        &self,
        this: &Rc<dyn NativeObject>,
        name: &str,
    ) -> Option<std::result::Result<Value, Exception>> {
        if name == "to" {
            return Some(Ok(self.target().map_or(Value::None, Target::type_value)));
        }
        let method = methods::lookup(self.flavour, name)?;
        Some(Ok(bound_method(this, method.0, method.1)))
    }

    fn set_attr(&self, name: &str, value: &Value) -> Option<std::result::Result<(), Exception>> {
        if name != "to" {
            return None;
        }
        let result = Target::from_optional(Some(value)).map(|to| self.set_target(to));
        Some(result.map_err(plain_exception))
    }

    fn binary_op(&self, op: BinOp, other: &Value, reflected: bool) -> std::result::Result<Value, Exception> {
        numeric::binary(self, op, other, reflected).map_err(plain_exception)
    }

    fn inplace_op(
        &self,
        this: &Rc<dyn NativeObject>,
        op: BinOp,
        other: &Value,
    ) -> std::result::Result<Value, Exception> {
        numeric::inplace(self, this, op, other).map_err(plain_exception)
    }

    fn unary_op(&self, op: UnaryOp) -> Option<std::result::Result<Value, Exception>> {
        Some(numeric::unary(self, op).map_err(plain_exception))
    }

    fn compare(&self, op: CmpOp, other: &Value) -> std::result::Result<Value, Exception> {
        compare::compare(self, op, other).map_err(plain_exception)
    }

    fn to_int(&self) -> Option<std::result::Result<BigInt, Exception>> {
        Some(numeric::to_int(self).map_err(plain_exception))
    }

    fn to_float(&self) -> Option<std::result::Result<f64, Exception>> {
        Some(numeric::to_float(self).map_err(plain_exception))
    }
}

#[cfg(test)]
mod proxy_test;
