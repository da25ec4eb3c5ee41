//! Error translation across the bridge.
//!
//! Object runtime exceptions become script errors through the bridge
//! module's exception handler, which supplies the `-errorcode` and
//! `-errorinfo` of the resulting error. Script errors become instances of
//! the bridge's error class carrying the return options as a
//! `scriptdict`.

use std::rc::Rc;

use tracing::{debug, error, warn};

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::object::exception::is_exception_class;
use crate::object::{ops, CallArgs, Context, ExcKind, Exception, TypeObject, Value};
use crate::script::{Obj, ScriptError};

use super::convert::to_obj;
use super::proxy::{Flavour, Proxy};
use super::state_of;

const HANDLER_FAILED: &str =
    "twine: the exception handler failed while translating an object exception";

/// Settings of the bridge `context` belongs to, or the defaults when the
/// bridge is already gone.
fn config_for(context: &Context) -> BridgeConfig {
    state_of(context)
        .map(|state| state.config().clone())
        .unwrap_or_default()
}

/// Drain the pending exception of `context` into a script error.
///
/// The indicator is always clear afterwards, including when the handler
/// itself raises.
pub fn script_error_from_pending(context: &Context) -> ScriptError {
    let Some(pending) = context.fetch_error() else {
        warn!(context = context.id(), "no exception pending while translating");
        return internal_error("twine: an object call failed without raising an exception");
    };
    let exception = pending.normalize();
    script_error_from_exception(context, &exception)
}

pub fn script_error_from_exception(context: &Context, exception: &Rc<Exception>) -> ScriptError {
    let message = exception.message();
    match run_handler(context, exception) {
        Ok((code, info)) => {
            debug!(
                class = %exception.class.name,
                %message,
                "object exception crossing into script"
            );
            ScriptError::new(message.as_str())
                .with_code(code)
                .with_info(format!("{message}{info}"))
        }
        Err(reason) => {
            let secondary = context.fetch_error().map(|pending| pending.normalize().message());
            error!(
                class = %exception.class.name,
                %message,
                %reason,
                secondary = secondary.as_deref().unwrap_or(""),
                "exception handler failed"
            );
            internal_error(HANDLER_FAILED)
        }
    }
}

fn internal_error(message: &str) -> ScriptError {
    ScriptError::new(message).with_code(Obj::from_strs(&["TWINE", "INTERNAL", "HANDLER"]))
}

fn run_handler(context: &Context, exception: &Rc<Exception>) -> Result<(Obj, String), String> {
    let config = config_for(context);
    let module = context
        .import(&config.module)
        .map_err(|error| format!("cannot import '{}': {}", config.module, error.message()))?;
    let handler = module.get(&config.exception_handler).ok_or_else(|| {
        format!(
            "module '{}' has no attribute '{}'",
            config.module, config.exception_handler
        )
    })?;
    if !ops::is_callable(&handler) {
        return Err(format!("'{}' is not callable", config.exception_handler));
    }

    let traceback = if exception.traceback.is_empty() {
        Value::None
    } else {
        Value::list(exception.traceback.iter().map(|frame| Value::str(frame)).collect())
    };
    let args = CallArgs::new(vec![
        Value::Type(exception.type_object()),
        Value::Exception(exception.clone()),
        traceback,
    ]);
    let result = context.call_raw(&handler, args).ok_or_else(|| {
        match context.fetch_error() {
            Some(pending) => {
                let raised = pending.normalize();
                format!("handler raised {}: {}", raised.class.name, raised.message())
            }
            None => "handler failed without raising".to_string(),
        }
    })?;

    let pair = match &result {
        Value::Tuple(items) if items.len() == 2 => items.to_vec(),
        Value::List(items) if items.borrow().len() == 2 => items.borrow().clone(),
        other => {
            return Err(format!(
                "handler must return a 2-element tuple or list, not {}",
                ops::repr(other)
            ));
        }
    };
    let code = to_obj(&pair[0]).map_err(|error| error.to_string())?;
    let info = ops::str(&pair[1]).map_err(|error| error.message())?;
    Ok((code, info))
}

/// The exception a script error raises in the object runtime.
pub fn object_exception(context: &Context, error: &ScriptError) -> Exception {
    let config = config_for(context);
    let class = context
        .import(&config.module)
        .ok()
        .and_then(|module| module.get(&config.error_class));
    match class {
        Some(Value::Type(TypeObject::Class(class))) if is_exception_class(&class) => {
            debug!(message = %error.message, "script error crossing into object code");
            let options = Proxy::owned(error.return_options(), Flavour::Dict).into_value();
            Exception::with_args(class, vec![Value::Str(error.message.text()), options])
        }
        _ => {
            error!(class = %config.error_class, module = %config.module, "bridge error class is missing");
            Exception::new(
                ExcKind::SystemError,
                format!(
                    "twine: error class '{}' is missing from module '{}' (script error: {})",
                    config.error_class, config.module, error.message
                ),
            )
        }
    }
}

/// Map a bridge error onto the exception the object runtime raises.
pub fn to_exception(context: &Context, error: BridgeError) -> Exception {
    match error {
        BridgeError::Script(script) => object_exception(context, &script),
        other => plain_exception(other),
    }
}

/// Like [`to_exception`] for callers without a context. Script errors
/// become `RuntimeError`s since the bridge error class cannot be looked up.
pub fn plain_exception(error: BridgeError) -> Exception {
    if error.is_internal() {
        error!(kind = error.kind(), %error, "internal bridge error");
    } else {
        debug!(kind = error.kind(), %error, "bridge error raised as exception");
    }
    match error {
        BridgeError::Object(exception) => Rc::unwrap_or_clone(exception),
        BridgeError::Script(script) => Exception::new(ExcKind::RuntimeError, script.message.to_string()),
        BridgeError::Key(key) => Exception::with_args(ExcKind::KeyError.class(), vec![Value::from(key)]),
        BridgeError::Conversion(message)
        | BridgeError::TypeCoercion(message)
        | BridgeError::Value(message) => Exception::new(ExcKind::ValueError, message),
        BridgeError::Name(message) => Exception::new(ExcKind::NameError, message),
        BridgeError::Index(message) => Exception::new(ExcKind::IndexError, message),
        BridgeError::ZeroDivision(message) => Exception::new(ExcKind::ZeroDivisionError, message),
        BridgeError::Type(message) => Exception::new(ExcKind::TypeError, message),
        BridgeError::Internal(message) => {
            Exception::new(ExcKind::SystemError, format!("twine internal error: {message}"))
        }
    }
}

/// `map_err` adapter raising bridge errors in `context`.
pub fn raise_in(context: &Context) -> impl Fn(BridgeError) -> Exception + '_ {
    move |error| to_exception(context, error)
}

/// `(errorcode, errorinfo)` for an exception, the value the default
/// exception handler returns.
pub fn default_handler_result(
    type_value: &Value,
    value: &Value,
    traceback: &Value,
) -> Result<Value, Exception> {
    let type_name = match type_value {
        Value::Type(type_object) => type_object.name(),
        other => ops::str(other)?,
    };
    let code = Value::list(vec![
        Value::str("OBJECT"),
        Value::from(type_name),
        Value::from(ops::str(value)?),
    ]);
    let mut info = String::from("\nfrom object code executed by twine");
    if !traceback.is_none() {
        for frame in ops::collect(traceback)? {
            info.push_str("\n    ");
            info.push_str(&ops::str(&frame)?);
        }
    }
    Ok(Value::tuple(vec![code, Value::from(info)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Runtime;

    #[test]
    fn bridge_errors_map_onto_exception_kinds() {
        let runtime = Runtime::new();
        let ctx = runtime.root();
        let cases = [
            (BridgeError::Name("no such variable".into()), ExcKind::NameError),
            (BridgeError::TypeCoercion("expected integer".into()), ExcKind::ValueError),
            (BridgeError::Index("out of range".into()), ExcKind::IndexError),
            (BridgeError::ZeroDivision("division by zero".into()), ExcKind::ZeroDivisionError),
            (BridgeError::Internal("broken".into()), ExcKind::SystemError),
        ];
        for (error, kind) in cases {
            assert!(to_exception(&ctx, error).is(kind));
        }
        let key = to_exception(&ctx, BridgeError::Key("missing".into()));
        assert_eq!(key.message(), "'missing'");
    }

    #[test]
    fn script_errors_without_a_bridge_are_system_errors() {
        let runtime = Runtime::new();
        let exception = object_exception(&runtime.root(), &ScriptError::new("boom"));
        assert!(exception.is(ExcKind::SystemError));
        assert!(exception.message().contains("'ScriptError'"));
    }

    #[test]
    fn default_handler_builds_code_and_info() {
        let exception = Exception::value_error("bad");
        let result = default_handler_result(
            &Value::Type(exception.type_object()),
            &Value::from(exception),
            &Value::list(vec![Value::from("line 1")]),
        )
        .unwrap();
        assert_eq!(
            ops::repr(&result),
            "(['OBJECT', 'ValueError', 'bad'], '\\nfrom object code executed by twine\\n    line 1')"
        );
    }
}
