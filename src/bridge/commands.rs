//! Script commands reaching into the object runtime.
//!
//! Installed in the bridge namespace of every paired interpreter. Each
//! command runs in the context paired with the interpreter that invoked
//! it; object exceptions come back as script errors through the bridge
//! module's exception handler.

use std::io;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use crate::error::BridgeError;
use crate::object::{ops, CallArgs, Context, ExcKind, Exception, Value};
use crate::script::commands::helpers::{check_args, wrong_args};
use crate::script::flow::{EvalResult, Flow};
use crate::script::{Interp, Obj};

use super::convert::to_obj;
use super::exception::{script_error_from_exception, script_error_from_pending};
use super::session::Session;
use super::BridgeState;

type Command = fn(&Rc<BridgeState>, &Interp, &Context, &[Obj]) -> EvalResult;

const COMMANDS: &[(&str, Command)] = &[
    ("call", cmd_call),
    ("import", cmd_import),
    ("eval", cmd_eval),
    ("exec", cmd_exec),
    ("interact", cmd_interact),
];

/// Register the bridge commands in `interp`.
pub fn install(interp: &Interp, state: &Rc<BridgeState>) {
    let namespace = state.config().namespace.trim_end_matches(':').to_string();
    for (name, command) in COMMANDS {
        let command = *command;
        let state: Weak<BridgeState> = Rc::downgrade(state);
        interp.register_command(&format!("{namespace}::{name}"), move |interp, objv| {
            let state = state
                .upgrade()
                .ok_or_else(|| Flow::error("twine bridge is no longer available"))?;
            let guard = state.enter(interp).map_err(|error| Flow::error(error.to_string()))?;
            let context = guard.context().clone();
            discard_pending(&context, name);
            let result = command(&state, interp, &context, objv);
            discard_pending(&context, name);
            result
        });
    }
}

/// An exception left pending by someone else must not be reported as the
/// outcome of this command.
fn discard_pending(context: &Context, command: &str) {
    if let Some(stale) = context.fetch_error() {
        warn!(
            context = context.id(),
            command,
            class = %stale.class.name,
            "discarding stale pending exception"
        );
    }
}

/// Object failures go through the context's error indicator, which is
/// drained into the returned script error.
fn exception_flow(context: &Context, exception: Exception) -> Flow {
    context.raise(exception);
    Flow::Error(script_error_from_pending(context))
}

fn bridge_flow(context: &Context, error: BridgeError) -> Flow {
    match error {
        BridgeError::Script(script) => Flow::Error(script),
        BridgeError::Object(exception) => Flow::Error(script_error_from_exception(context, &exception)),
        other => Flow::error(other.to_string()),
    }
}

/// `call ?-kwlist list? function ?arg ...?`
fn cmd_call(_: &Rc<BridgeState>, _: &Interp, context: &Context, objv: &[Obj]) -> EvalResult {
    const USAGE: &str = "?-kwlist list? function ?arg ...?";
    check_args(objv, 1, usize::MAX, USAGE)?;
    let mut rest = &objv[1..];
    let mut kwlist = None;
    if rest[0].as_str() == "-kwlist" {
        if rest.len() < 3 {
            return Err(wrong_args(objv, USAGE));
        }
        kwlist = Some(rest[1].list()?);
        rest = &rest[2..];
    }

    let function = lookup_path(context, rest[0].as_str()).map_err(|error| exception_flow(context, error))?;
    let mut args = CallArgs::new(rest[1..].iter().map(|word| Value::Str(word.text())).collect());
    if let Some(pairs) = kwlist {
        if pairs.len() % 2 != 0 {
            return Err(Flow::error("kwlist must contain an even number of elements"));
        }
        for pair in pairs.chunks(2) {
            args = args.keyword(pair[0].as_str(), Value::Str(pair[1].text()));
        }
    }

    debug!(function = %rest[0], args = rest.len() - 1, "call into object runtime");
    let result = context
        .call_raw(&function, args)
        .ok_or_else(|| Flow::Error(script_error_from_pending(context)))?;
    to_obj(&result).map_err(|error| bridge_flow(context, error))
}

/// Resolve `a.b.c` from the context's globals, importing `a` when it is
/// not bound there.
fn lookup_path(context: &Context, path: &str) -> Result<Value, Exception> {
    let mut parts = path.split('.');
    let head = parts.next().unwrap_or_default();
    let mut value = match context.lookup(head) {
        Ok(value) => value,
        Err(error) if error.is(ExcKind::NameError) && path.contains('.') => {
            Value::Module(context.import(head)?)
        }
        Err(error) => return Err(error),
    };
    for part in parts {
        value = ops::get_attr(&value, part)?;
    }
    Ok(value)
}

/// `import module`: bind the module in the context's globals.
fn cmd_import(_: &Rc<BridgeState>, _: &Interp, context: &Context, objv: &[Obj]) -> EvalResult {
    check_args(objv, 1, 1, "module")?;
    let name = objv[1].as_str();
    let module = context.import(name).map_err(|error| exception_flow(context, error))?;
    let binding = name.split('.').next().unwrap_or(name);
    context.globals().set(binding, Value::Module(module));
    Ok(Obj::empty())
}

fn cmd_eval(_: &Rc<BridgeState>, _: &Interp, context: &Context, objv: &[Obj]) -> EvalResult {
    check_args(objv, 1, 1, "code")?;
    let result = context
        .eval(objv[1].as_str())
        .map_err(|error| exception_flow(context, error))?;
    to_obj(&result).map_err(|error| bridge_flow(context, error))
}

fn cmd_exec(_: &Rc<BridgeState>, _: &Interp, context: &Context, objv: &[Obj]) -> EvalResult {
    check_args(objv, 1, 1, "code")?;
    context
        .exec(objv[1].as_str())
        .map_err(|error| exception_flow(context, error))?;
    Ok(Obj::empty())
}

/// `interact`: a read-eval-print loop over the object runtime on the
/// process's standard streams.
fn cmd_interact(state: &Rc<BridgeState>, interp: &Interp, context: &Context, objv: &[Obj]) -> EvalResult {
    check_args(objv, 0, 0, "")?;
    let session = Session::new(state.clone(), interp.clone());
    let stdin = io::stdin();
    session
        .interact(&mut stdin.lock(), &mut io::stdout())
        .map_err(|error| bridge_flow(context, error))?;
    Ok(Obj::empty())
}
