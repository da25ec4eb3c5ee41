use twine::bridge::Bridge;
use twine::config::BridgeConfig;
use twine::object::{ops, ExcKind, NativeFunction, Runtime, Value};

#[test]
fn error_code_names_the_exception() {
    let bridge = Bridge::new().unwrap();
    let error = bridge.interp().eval("::twine::eval {int('x')}").unwrap_err();
    insta::assert_snapshot!(error.code.to_string(), @"OBJECT ValueError {invalid literal for int() with base 10: 'x'}");
    assert!(error.info.contains("from object code executed by twine"));
    assert!(error.info.contains("invoked from within"));
}

#[test]
fn catch_exposes_the_return_options() {
    let bridge = Bridge::new().unwrap();
    let result = bridge
        .interp()
        .eval(
            "catch {::twine::eval {[][1]}} message options\n\
             lindex [dict get $options -errorcode] 1",
        )
        .unwrap();
    assert_eq!(result.as_str(), "IndexError");
}

#[test]
fn a_custom_handler_supplies_code_and_info() {
    let bridge = Bridge::new().unwrap();
    let ctx = bridge.runtime().root();
    let module = ctx.import("twine").unwrap();
    module.set(
        "handle_exception",
        NativeFunction::new("handle_exception", |_, args| {
            let given = args.exact("handle_exception", 3)?;
            let kind = match &given[0] {
                Value::Type(type_object) => type_object.name(),
                other => ops::str(other)?,
            };
            Ok(Value::tuple(vec![
                Value::list(vec![Value::from("CUSTOM"), Value::from(kind)]),
                Value::from("\n(custom handler)"),
            ]))
        })
        .into_value(),
    );
    let error = bridge.interp().eval("::twine::eval {1 // 0}").unwrap_err();
    assert_eq!(error.code.to_string(), "CUSTOM ZeroDivisionError");
    assert!(error.info.contains("\n(custom handler)"), "{}", error.info);
}

#[test]
fn a_failing_handler_is_an_internal_error() {
    let bridge = Bridge::new().unwrap();
    let ctx = bridge.runtime().root();
    let module = ctx.import("twine").unwrap();
    module.set("handle_exception", Value::from("not callable"));
    let error = bridge.interp().eval("::twine::eval {1 / 0}").unwrap_err();
    assert_eq!(error.code.to_string(), "TWINE INTERNAL HANDLER");
    assert!(!ctx.error_occurred());

    module.set(
        "handle_exception",
        NativeFunction::new("handle_exception", |_, _| Ok(Value::from(1_i64))).into_value(),
    );
    let error = bridge.interp().eval("::twine::eval {1 / 0}").unwrap_err();
    assert_eq!(error.code.to_string(), "TWINE INTERNAL HANDLER");
}

#[test]
fn the_error_class_name_is_configurable() {
    let config = BridgeConfig {
        error_class: "TclError".to_string(),
        ..BridgeConfig::default()
    };
    let bridge = Bridge::from_runtime(Runtime::new(), config).unwrap();
    let ctx = bridge.runtime().root();
    ctx.exec("import twine").unwrap();
    let error = ctx.eval("twine.eval('error {went wrong}')").unwrap_err();
    assert_eq!(error.class.name, "TclError");
    assert_eq!(ops::str(&error.args[0]).unwrap(), "went wrong");
    assert!(ctx.eval("twine.ScriptError").is_err());
    assert!(ctx.eval("twine.TclError").is_ok());
}

#[test]
fn script_error_options_are_a_scriptdict() {
    let bridge = Bridge::new().unwrap();
    let ctx = bridge.runtime().root();
    ctx.exec("import twine").unwrap();
    let error = ctx.eval("twine.eval('error oops {} {MY CODE}')").unwrap_err();
    let options = &error.args[1];
    ctx.globals().set("options", options.clone());
    assert_eq!(
        ops::repr(&ctx.eval("options['-errorcode']").unwrap()),
        "<twine.scriptobj: 'MY CODE'>"
    );
    assert_eq!(
        ops::repr(&ctx.eval("options.td_get('-code', to=int)").unwrap()),
        "1"
    );
}

#[test]
fn errors_raised_in_object_code_keep_their_class() {
    let bridge = Bridge::new().unwrap();
    let ctx = bridge.runtime().root();
    ctx.exec("import twine").unwrap();
    let error = ctx.eval("twine.call('::twine::eval', 'missing_name')").unwrap_err();
    assert_eq!(error.class.name, "ScriptError");
    assert!(ops::str(&error.args[0]).unwrap().contains("missing_name"));
    let error = ctx.exec("raise ValueError('direct')").unwrap_err();
    assert!(error.is(ExcKind::ValueError));
}
