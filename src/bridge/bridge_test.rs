use crate::bridge::{Bridge, Parent, Target};
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::object::{ops, ExcKind, Exception, Runtime, Value};
use crate::script::Interp;

#[test]
fn either_side_can_be_the_parent() {
    let bridge = Bridge::new().unwrap();
    assert_eq!(bridge.parent(), Parent::Object);

    let interp = Interp::new();
    let bridge = Bridge::from_interp(&interp, BridgeConfig::default()).unwrap();
    assert_eq!(bridge.parent(), Parent::Script);
    let again = Bridge::from_interp(&interp, BridgeConfig::default()).unwrap();
    assert_eq!(again.state().pairing_count(), 1);
}

#[test]
fn a_runtime_takes_one_bridge() {
    let runtime = Runtime::new();
    let _bridge = Bridge::from_runtime(runtime.clone(), BridgeConfig::default()).unwrap();
    assert!(Bridge::from_runtime(runtime, BridgeConfig::default()).is_err());
}

#[test]
fn child_interpreters_get_their_own_context() {
    let bridge = Bridge::new().unwrap();
    let child = bridge.interp().create_child(Some("kid")).unwrap();
    child.eval("package require twine").unwrap();
    assert_eq!(bridge.state().pairing_count(), 2);
    assert_eq!(bridge.runtime().context_count(), 1);

    bridge.interp().eval("::twine::exec {x = 1}").unwrap();
    child.eval("::twine::exec {x = 2}").unwrap();
    assert_eq!(bridge.interp().eval("::twine::eval x").unwrap().as_str(), "1");
    assert_eq!(child.eval("::twine::eval x").unwrap().as_str(), "2");

    bridge.interp().delete_child("kid").unwrap();
    assert_eq!(bridge.state().pairing_count(), 1);
    assert_eq!(bridge.runtime().context_count(), 0);
    assert_eq!(bridge.interp().eval("::twine::eval x").unwrap().as_str(), "1");
}

#[test]
fn dropping_an_attached_interpreter_ends_its_context() {
    let bridge = Bridge::new().unwrap();
    let child = Interp::new();
    bridge.attach(&child).unwrap();
    assert_eq!(bridge.runtime().context_count(), 1);
    assert_eq!(bridge.state().pairing_count(), 2);

    drop(child);
    assert_eq!(bridge.runtime().context_count(), 0);
    assert_eq!(bridge.state().pairing_count(), 1);
}

#[test]
fn entering_restores_the_previous_context() {
    let bridge = Bridge::new().unwrap();
    let child = bridge.interp().create_child(Some("kid")).unwrap();
    bridge.attach(&child).unwrap();
    let root = bridge.runtime().root();
    {
        let guard = bridge.enter(&child).unwrap();
        assert!(!guard.context().is_root());
        assert_eq!(bridge.runtime().active().id(), guard.context().id());
    }
    assert_eq!(bridge.runtime().active().id(), root.id());
}

#[test]
fn call_passes_words_as_strings() {
    let bridge = Bridge::new().unwrap();
    let interp = bridge.interp();
    assert_eq!(interp.eval("::twine::call len {a b c}").unwrap().as_str(), "5");
    assert_eq!(interp.eval("::twine::call int 42").unwrap().as_str(), "42");
    assert_eq!(interp.eval("::twine::call -kwlist {x 42} int").unwrap().as_str(), "42");
    assert!(interp.eval("::twine::call -kwlist {x} int").is_err());
}

#[test]
fn dotted_names_resolve_through_modules() {
    let bridge = Bridge::new().unwrap();
    let interp = bridge.interp();
    let error = interp.eval("::twine::call math.nope").unwrap_err();
    assert!(error.message.as_str().contains("nope"), "{}", error.message);
    interp.eval("::twine::import math").unwrap();
    assert_eq!(interp.eval("::twine::eval {math.floor(2.5)}").unwrap().as_str(), "2");
}

#[test]
fn object_exceptions_become_script_errors() {
    let bridge = Bridge::new().unwrap();
    let error = bridge.interp().eval("::twine::eval {1 / 0}").unwrap_err();
    assert_eq!(error.message.as_str(), "division by zero");
    let code: Vec<String> = error.code.list().unwrap().iter().map(ToString::to_string).collect();
    assert_eq!(code[..2], ["OBJECT".to_string(), "ZeroDivisionError".to_string()]);
    let ctx = bridge.runtime().root();
    assert!(!ctx.error_occurred());

    let caught = bridge
        .interp()
        .eval("catch {::twine::eval {undefined_name}} message; set message")
        .unwrap();
    assert_eq!(caught.as_str(), "name 'undefined_name' is not defined");
}

#[test]
fn a_stale_pending_error_is_not_reported_later() {
    let bridge = Bridge::new().unwrap();
    let ctx = bridge.runtime().root();
    ctx.raise(Exception::value_error("left behind"));

    assert_eq!(bridge.interp().eval("::twine::eval {1 + 1}").unwrap().as_str(), "2");
    assert!(!ctx.error_occurred());

    ctx.raise(Exception::value_error("left behind"));
    let error = bridge.interp().eval("::twine::call len 5 6").unwrap_err();
    assert!(error.message.as_str().contains("len()"), "{}", error.message);
    assert!(!ctx.error_occurred());

    let error = bridge.interp().eval("::twine::exec {raise KeyError('k')}").unwrap_err();
    let code: Vec<String> = error.code.list().unwrap().iter().map(ToString::to_string).collect();
    assert_eq!(code[1], "KeyError");
    assert!(!ctx.error_occurred());
}

#[test]
fn script_errors_become_the_bridge_error_class() {
    let bridge = Bridge::new().unwrap();
    let ctx = bridge.runtime().root();
    ctx.exec("import twine").unwrap();
    let error = ctx.eval("twine.eval('error boom')").unwrap_err();
    assert_eq!(error.class.name, "ScriptError");
    assert!(error.is(ExcKind::Exception));
    assert_eq!(ops::str(&error.args[0]).unwrap(), "boom");
    let options = ops::repr(&error.args[1]);
    assert!(options.starts_with("<twine.scriptdict:"), "{options}");
}

#[test]
fn errors_survive_a_round_trip() {
    let bridge = Bridge::new().unwrap();
    let ctx = bridge.runtime().root();
    ctx.exec("import twine").unwrap();
    let error = ctx
        .eval("twine.eval('::twine::eval {int(\"x\")}')")
        .unwrap_err();
    assert_eq!(error.class.name, "ScriptError");
    assert!(ops::str(&error.args[0]).unwrap().contains("invalid literal"));
}

#[test]
fn procs_bind_keyword_arguments() {
    let bridge = Bridge::new().unwrap();
    bridge
        .interp()
        .eval("proc greet {name {greeting hello}} {return \"$greeting $name\"}")
        .unwrap();
    let ctx = bridge.runtime().root();
    ctx.exec("import twine").unwrap();
    ctx.exec("greet = twine.proc('greet')").unwrap();
    assert_eq!(ctx.eval("greet('ann')").unwrap(), Value::from("hello ann"));
    assert_eq!(
        ctx.eval("greet(greeting='hi', name='bo')").unwrap(),
        Value::from("hi bo")
    );
    let error = ctx.eval("greet()").unwrap_err();
    assert!(error.is(ExcKind::TypeError));
    let error = ctx.eval("greet('a', 'b', 'c')").unwrap_err();
    assert!(error.is(ExcKind::TypeError));
}

#[test]
fn shadowdicts_see_array_changes() {
    let bridge = Bridge::new().unwrap();
    bridge.interp().eval("array set colours {red 1 green 2}").unwrap();
    let ctx = bridge.runtime().root();
    ctx.exec("import twine").unwrap();
    ctx.exec("c = twine.shadowdict('colours', to=int)").unwrap();
    assert_eq!(ops::repr(&ctx.eval("c['green']").unwrap()), "2");
    bridge.interp().eval("set colours(blue) 3").unwrap();
    assert_eq!(ops::repr(&ctx.eval("len(c)").unwrap()), "3");
    assert_eq!(ops::repr(&ctx.eval("sorted(c)").unwrap()), "['blue', 'green', 'red']");
    ctx.exec("c['red'] = 10").unwrap();
    assert_eq!(bridge.interp().get_var("colours(red)").unwrap().as_str(), "10");
}

#[test]
fn session_targets_convert_results() {
    let bridge = Bridge::new().unwrap();
    let session = bridge.session();
    assert_eq!(session.expr("6 * 7", Target::Int).unwrap(), Value::from(42_i64));
    assert_eq!(
        ops::repr(&session.eval("list a {b c}", Target::List).unwrap()),
        "['a', 'b c']"
    );
    assert!(matches!(
        session.subst("$undefined", Target::Str),
        Err(BridgeError::Script(_))
    ));
}
