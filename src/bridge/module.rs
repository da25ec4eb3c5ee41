//! The bridge module of the object runtime.
//!
//! Every context imports its own instance; natives find their
//! interpreter through the context they run in.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use num_bigint::BigInt;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::object::exception::ExcKind;
use crate::object::{ops, CallArgs, ClassInfo, Context, Exception, Module, NativeFunction, TypeObject, Value};

use super::exception::{default_handler_result, raise_in};
use super::namespace::ScriptNamespace;
use super::proxy::{scriptdict_class, scriptobj_class};
use super::session::Session;
use super::shadow::ShadowDict;
use super::target::Target;
use super::trampoline::ScriptProc;
use super::{resolve, state_of};

type Native = fn(&Context, CallArgs) -> Result<Value>;

const NATIVES: &[(&str, Native)] = &[
    ("eval", eval),
    ("exec", exec),
    ("expr", expr),
    ("getvar", getvar),
    ("setvar", setvar),
    ("exists", exists),
    ("unset", unset),
    ("incr", incr),
    ("subst", subst),
    ("call", call),
    ("convert", convert),
    ("scriptvar", scriptvar),
    ("shadowdict", shadowdict),
    ("proc", proc),
    ("source", source),
    ("package_require", package_require),
    ("run", run),
    ("interact", interact),
    ("import_tcl", import_tcl),
];

/// Populate a fresh bridge module for `ctx`.
pub fn load(ctx: &Context, module: &Rc<Module>) -> std::result::Result<(), Exception> {
    let config = state_of(ctx)
        .map(|state| state.config().clone())
        .unwrap_or_else(BridgeConfig::default);

    for (name, native) in NATIVES {
        let native = *native;
        module.set(
            name,
            NativeFunction::new(name, move |ctx, args| native(ctx, args).map_err(raise_in(ctx)))
                .into_value(),
        );
    }
    module.set(
        &config.exception_handler,
        NativeFunction::new(&config.exception_handler, handle_exception).into_value(),
    );
    module.set("scriptobj", Value::Type(TypeObject::Class(scriptobj_class())));
    module.set("scriptdict", Value::Type(TypeObject::Class(scriptdict_class())));

    let error_class = ClassInfo::new(&config.error_class, &config.module, Some(ExcKind::Exception.class()));
    module.set(&config.error_class, Value::Type(TypeObject::Class(Rc::new(error_class))));
    module.set("__version__", Value::from(env!("CARGO_PKG_VERSION")));
    Ok(())
}

fn session(ctx: &Context) -> Result<Session> {
    let (state, interp) = resolve(ctx)?;
    Ok(Session::new(state, interp))
}

/// A slot `CallArgs::bind` already checked for presence.
fn value(slot: &Option<Value>) -> Result<&Value> {
    slot.as_ref()
        .ok_or_else(|| BridgeError::Internal("required argument was not bound".to_string()))
}

fn text(slot: &Option<Value>) -> Result<String> {
    Ok(ops::str(value(slot)?)?)
}

/// The `to=` slot, defaulting to `str`.
fn target(slot: &Option<Value>) -> Result<Target> {
    Ok(Target::from_optional(slot.as_ref())?.unwrap_or(Target::Str))
}

fn eval(ctx: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("eval", &["code", "to"], 1)?;
    session(ctx)?.eval(&text(&slots[0])?, target(&slots[1])?)
}

fn exec(ctx: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("exec", &["code"], 1)?;
    session(ctx)?.exec(&text(&slots[0])?)?;
    Ok(Value::None)
}

fn expr(ctx: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("expr", &["expression", "to"], 1)?;
    session(ctx)?.expr(&text(&slots[0])?, target(&slots[1])?)
}

fn getvar(ctx: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("getvar", &["name", "to", "default"], 1)?;
    session(ctx)?.getvar(&text(&slots[0])?, target(&slots[1])?, slots[2].as_ref())
}

fn setvar(ctx: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("setvar", &["name", "value"], 2)?;
    session(ctx)?.setvar(&text(&slots[0])?, value(&slots[1])?)?;
    Ok(Value::None)
}

fn exists(ctx: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("exists", &["name"], 1)?;
    Ok(Value::Bool(session(ctx)?.exists(&text(&slots[0])?)?))
}

fn unset(ctx: &Context, args: CallArgs) -> Result<Value> {
    let (_, names, _) = args.bind_varargs("unset", &[], 0, &[])?;
    let names = names
        .iter()
        .map(ops::str)
        .collect::<std::result::Result<Vec<String>, Exception>>()?;
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    session(ctx)?.unset(&names)?;
    Ok(Value::None)
}

fn incr(ctx: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("incr", &["name", "by"], 1)?;
    let by = match &slots[1] {
        Some(value) => ops::index_value(value).ok_or_else(|| {
            BridgeError::Type(format!(
                "incr() by must be an integer, not {}",
                value.type_name()
            ))
        })?,
        None => BigInt::from(1),
    };
    session(ctx)?.incr(&text(&slots[0])?, &by)
}

fn subst(ctx: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("subst", &["template", "to"], 1)?;
    session(ctx)?.subst(&text(&slots[0])?, target(&slots[1])?)
}

fn call(ctx: &Context, args: CallArgs) -> Result<Value> {
    let (slots, rest, named) = args.bind_varargs("call", &["command"], 1, &["kwlist", "to"])?;
    let kwlist = named[0].as_ref().filter(|value| !value.is_none());
    session(ctx)?.call(value(&slots[0])?, &rest, kwlist, target(&named[1])?)
}

fn convert(ctx: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("convert", &["value", "to"], 1)?;
    session(ctx)?.convert(value(&slots[0])?, target(&slots[1])?)
}

/// `scriptvar(name, **kw)`: a `scriptobj` bound to a variable.
fn scriptvar(ctx: &Context, args: CallArgs) -> Result<Value> {
    let [name] = args.positional.as_slice() else {
        return Err(BridgeError::Type(format!(
            "scriptvar() takes exactly 1 positional argument ({} given)",
            args.positional.len()
        )));
    };
    let mut forwarded = CallArgs::default().keyword("var", name.clone());
    for (key, value) in &args.keywords {
        forwarded = forwarded.keyword(key, value.clone());
    }
    Ok(ops::call(ctx, &Value::Type(TypeObject::Class(scriptobj_class())), forwarded)?)
}

fn shadowdict(ctx: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("shadowdict", &["array", "to", "default"], 1)?;
    let (_, interp) = resolve(ctx)?;
    let to = Target::from_optional(slots[1].as_ref())?;
    let shadow = ShadowDict::new(&interp, &text(&slots[0])?, to, slots[2].clone());
    Ok(shadow.into_value())
}

fn proc(ctx: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("proc", &["name", "to"], 1)?;
    let (_, interp) = resolve(ctx)?;
    let to = Target::from_optional(slots[1].as_ref())?;
    Ok(ScriptProc::lookup(&interp, &text(&slots[0])?, to)?.into_value())
}

/// `source(file, encoding=None)`.
fn source(ctx: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("source", &["file", "encoding"], 1)?;
    let mut words = Vec::new();
    if let Some(encoding) = slots[1].as_ref().filter(|value| !value.is_none()) {
        words.push(Value::from("-encoding"));
        words.push(encoding.clone());
    }
    words.push(Value::from(text(&slots[0])?));
    session(ctx)?.call(&Value::from("source"), &words, None, Target::Str)
}

/// `package_require(package, version=None)`.
fn package_require(ctx: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("package_require", &["package", "version"], 1)?;
    let mut words = vec![Value::from("require"), Value::from(text(&slots[0])?)];
    if let Some(version) = slots[1].as_ref().filter(|value| !value.is_none()) {
        words.push(version.clone());
    }
    session(ctx)?.call(&Value::from("package"), &words, None, Target::Str)
}

/// Collects everything written to the runtime's output while installed.
#[derive(Clone, Default)]
struct Capture(Rc<RefCell<Vec<u8>>>);

impl Capture {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// `run(code)`: `exec` with output captured, returning what was printed
/// without trailing whitespace.
fn run(ctx: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("run", &["code"], 1)?;
    let code = text(&slots[0])?;
    let runtime = ctx
        .runtime()
        .ok_or_else(|| BridgeError::Internal("the object runtime is gone".to_string()))?;
    let capture = Capture::default();
    let previous = runtime.replace_output(Box::new(capture.clone()));
    let outcome = ctx.exec(&code);
    runtime.replace_output(previous);
    outcome?;
    Ok(Value::from(capture.text().trim_end()))
}

/// `interact()`: the script command loop on the process's standard streams.
fn interact(ctx: &Context, args: CallArgs) -> Result<Value> {
    args.bind("interact", &[], 0)?;
    let stdin = io::stdin();
    session(ctx)?.shell(&mut stdin.lock(), &mut io::stdout())?;
    Ok(Value::None)
}

/// `import_tcl(namespace='::')`: the commands of a script namespace as
/// callable attributes, child namespaces as nested objects.
fn import_tcl(ctx: &Context, args: CallArgs) -> Result<Value> {
    let slots = args.bind("import_tcl", &["namespace"], 0)?;
    let namespace = match slots[0].as_ref().filter(|value| !value.is_none()) {
        Some(value) => ops::str(value)?,
        None => "::".to_string(),
    };
    let (_, interp) = resolve(ctx)?;
    if !interp.namespace_exists(&namespace) {
        return Err(BridgeError::Name(format!(
            "namespace \"{namespace}\" not found"
        )));
    }
    Ok(ScriptNamespace::import(&interp, &namespace)?.into_value())
}

/// The default exception handler: `(errorcode, errorinfo)` for an
/// exception crossing into the script runtime.
fn handle_exception(_: &Context, args: CallArgs) -> std::result::Result<Value, Exception> {
    let slots = args.bind("handle_exception", &["type", "value", "traceback"], 2)?;
    let none = Value::None;
    default_handler_result(
        slots[0].as_ref().unwrap_or(&none),
        slots[1].as_ref().unwrap_or(&none),
        slots[2].as_ref().unwrap_or(&none),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::Bridge;
    use crate::object::exception::is_exception_class;

    #[test]
    fn the_module_exposes_the_api() {
        let bridge = Bridge::new().unwrap();
        let module = bridge.runtime().root().import("twine").unwrap();
        for (name, _) in NATIVES {
            assert!(module.contains(name), "{name} missing");
        }
        assert!(module.contains("handle_exception"));
        match module.get("ScriptError") {
            Some(Value::Type(TypeObject::Class(class))) => assert!(is_exception_class(&class)),
            other => panic!("unexpected ScriptError entry: {other:?}"),
        }
    }

    #[test]
    fn run_returns_what_was_printed() {
        let bridge = Bridge::new().unwrap();
        let ctx = bridge.runtime().root();
        ctx.exec("import twine").unwrap();
        assert_eq!(
            ops::repr(&ctx.eval("twine.run('print(\"hi\")\\nprint(1 + 1)')").unwrap()),
            "'hi\\n2'"
        );
        assert_eq!(ops::repr(&ctx.eval("twine.run('x = 5')").unwrap()), "''");
        assert_eq!(ops::repr(&ctx.eval("x").unwrap()), "5");

        let error = ctx.eval("twine.run('print(1)\\n1 // 0')").unwrap_err();
        assert!(error.is(ExcKind::ZeroDivisionError));
    }

    #[test]
    fn import_tcl_exposes_procs_as_attributes() {
        let bridge = Bridge::new().unwrap();
        bridge
            .interp()
            .eval("namespace eval ::geo { proc area {w {h 2}} { expr {$w * $h} } }")
            .unwrap();
        bridge.interp().eval("proc greet-user {name} { return \"hi $name\" }").unwrap();
        let ctx = bridge.runtime().root();
        ctx.exec("import twine\nscript = twine.import_tcl()").unwrap();
        assert_eq!(ops::repr(&ctx.eval("script.greet_user('ann')").unwrap()), "'hi ann'");
        assert_eq!(ops::repr(&ctx.eval("script.geo.area(3)").unwrap()), "'6'");
        assert_eq!(ops::repr(&ctx.eval("script.geo.area(3, h=4, to=int)").unwrap()), "12");
        assert_eq!(
            ops::repr(&ctx.eval("twine.import_tcl('::geo')").unwrap()),
            "<twine.scriptnamespace '::geo'>"
        );
        let error = ctx.eval("twine.import_tcl('::nowhere')").unwrap_err();
        assert!(error.is(ExcKind::NameError));
        assert!(ctx.eval("script.geo.nope").unwrap_err().is(ExcKind::AttributeError));
    }

    #[test]
    fn interact_is_exposed() {
        let bridge = Bridge::new().unwrap();
        let module = bridge.runtime().root().import("twine").unwrap();
        assert!(module.get("interact").is_some_and(|value| ops::is_callable(&value)));
    }

    #[test]
    fn natives_raise_in_the_calling_context() {
        let bridge = Bridge::new().unwrap();
        let ctx = bridge.runtime().root();
        ctx.exec("import twine").unwrap();
        let error = ctx.eval("twine.getvar('nope')").unwrap_err();
        assert!(error.is(ExcKind::NameError));
        assert!(!ctx.error_occurred());
        assert_eq!(
            ops::repr(&ctx.eval("twine.getvar('nope', default=7)").unwrap()),
            "7"
        );
    }
}
