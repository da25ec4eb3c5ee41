use std::rc::Rc;

use crate::bridge::Bridge;
use crate::object::{ops, Context, ExcKind, Value};
use crate::script::leak_detector;

fn setup() -> (Bridge, Rc<Context>) {
    let bridge = Bridge::new().unwrap();
    let ctx = bridge.runtime().root();
    ctx.exec("import twine").unwrap();
    (bridge, ctx)
}

fn text(ctx: &Context, source: &str) -> String {
    ops::str(&ctx.eval(source).unwrap()).unwrap()
}

fn repr(ctx: &Context, source: &str) -> String {
    ops::repr(&ctx.eval(source).unwrap())
}

#[test]
fn owned_lists_index_into_new_proxies() {
    let (_bridge, ctx) = setup();
    ctx.exec("t = twine.scriptobj('a {b c} d')").unwrap();
    assert_eq!(repr(&ctx, "len(t)"), "3");
    assert_eq!(repr(&ctx, "t[1]"), "<twine.scriptobj: 'b c'>");
    assert_eq!(text(&ctx, "t[-1]"), "d");
    assert_eq!(repr(&ctx, "t.lindex(1)"), "'b c'");
    assert_eq!(repr(&ctx, "t.as_list()"), "['a', 'b c', 'd']");
    assert_eq!(repr(&ctx, "'d' in t"), "True");
}

#[test]
fn to_converts_elements() {
    let (_bridge, ctx) = setup();
    ctx.exec("t = twine.scriptobj('1 2 3', to=int)").unwrap();
    assert_eq!(repr(&ctx, "t[2]"), "3");
    assert_eq!(repr(&ctx, "t.to"), "<class 'int'>");
    ctx.exec("t.to = None").unwrap();
    assert_eq!(repr(&ctx, "t[2]"), "<twine.scriptobj: '3'>");
}

#[test]
fn mutation_copies_values_shared_with_variables() {
    let (_bridge, ctx) = setup();
    ctx.exec("a = twine.scriptobj('1 2 3')").unwrap();
    ctx.exec("twine.setvar('shared', a)").unwrap();
    ctx.exec("a.append(4)").unwrap();
    assert_eq!(text(&ctx, "a"), "1 2 3 4");
    assert_eq!(repr(&ctx, "twine.getvar('shared')"), "'1 2 3'");
}

#[test]
fn bound_proxies_follow_their_variable() {
    let (bridge, ctx) = setup();
    bridge.interp().eval("set counter 5").unwrap();
    ctx.exec("c = twine.scriptvar('counter')").unwrap();
    assert_eq!(repr(&ctx, "c.as_int()"), "5");
    bridge.interp().eval("set counter 7").unwrap();
    assert_eq!(repr(&ctx, "c.as_int()"), "7");
    ctx.exec("c.incr(3)").unwrap();
    assert_eq!(bridge.interp().get_var("counter").unwrap().as_str(), "10");
}

#[test]
fn scriptvar_default_only_initialises() {
    let (bridge, ctx) = setup();
    ctx.exec("v = twine.scriptvar('fresh', default='x y')").unwrap();
    assert_eq!(bridge.interp().get_var("fresh").unwrap().as_str(), "x y");
    ctx.exec("w = twine.scriptvar('fresh', default='ignored')").unwrap();
    assert_eq!(text(&ctx, "w"), "x y");
    ctx.exec("w = twine.scriptvar('fresh', source='z')").unwrap();
    assert_eq!(text(&ctx, "v"), "z");
}

#[test]
fn dicts_walk_key_paths() {
    let (_bridge, ctx) = setup();
    ctx.exec("d = twine.scriptdict('a 1 b {c 2}')").unwrap();
    assert_eq!(repr(&ctx, "len(d)"), "2");
    assert_eq!(text(&ctx, "d['a']"), "1");
    assert_eq!(repr(&ctx, "d.td_get(['b', 'c'], to=int)"), "2");
    assert_eq!(repr(&ctx, "d.get('zz', 9)"), "9");
    assert_eq!(repr(&ctx, "d.get('zz')"), "None");
    assert_eq!(repr(&ctx, "'a' in d"), "True");
    ctx.exec("d[['b', 'e']] = 5").unwrap();
    assert_eq!(repr(&ctx, "d.td_get(['b', 'e'])"), "'5'");
    ctx.exec("del d['a']").unwrap();
    assert_eq!(repr(&ctx, "list(d.keys())"), "['b']");
}

#[test]
fn missing_dict_keys_raise_key_error() {
    let (_bridge, ctx) = setup();
    ctx.exec("d = twine.scriptdict('a 1')").unwrap();
    let error = ctx.eval("d['nope']").unwrap_err();
    assert!(error.is(ExcKind::KeyError));
}

#[test]
fn arithmetic_uses_the_numeric_value() {
    let (_bridge, ctx) = setup();
    ctx.exec("n = twine.scriptobj('6')").unwrap();
    assert_eq!(repr(&ctx, "n + 1"), "7");
    assert_eq!(repr(&ctx, "1 - n"), "-5");
    assert_eq!(repr(&ctx, "n / 4"), "1.5");
    assert_eq!(repr(&ctx, "n // 4"), "1");
    let error = ctx.eval("n // 0").unwrap_err();
    assert!(error.is(ExcKind::ZeroDivisionError));
}

#[test]
fn comparison_is_textual() {
    let (_bridge, ctx) = setup();
    ctx.exec("one = twine.scriptobj('1')").unwrap();
    assert_eq!(repr(&ctx, "one == 1"), "True");
    assert_eq!(repr(&ctx, "one == '1.0'"), "False");
    assert_eq!(repr(&ctx, "one < 'a'"), "True");
}

#[test]
fn unknown_attributes_are_attribute_errors() {
    let (_bridge, ctx) = setup();
    ctx.exec("t = twine.scriptobj('x')").unwrap();
    let error = ctx.eval("t.nonexistent").unwrap_err();
    assert!(error.is(ExcKind::AttributeError));
}

#[test]
fn proxies_are_released() {
    let before = leak_detector::snapshot().live_proxies();
    {
        let (_bridge, ctx) = setup();
        ctx.exec("t = twine.scriptobj('a b')").unwrap();
        ctx.exec("u = t[0]").unwrap();
        ctx.exec("del t").unwrap();
        ctx.exec("del u").unwrap();
    }
    assert_eq!(leak_detector::snapshot().live_proxies(), before);
}

#[test]
fn values_passed_by_value_survive_round_trips() {
    let (_bridge, ctx) = setup();
    let value = ctx.eval("twine.convert([1, 'two', [3]], to=list)").unwrap();
    assert_eq!(ops::repr(&value), "['1', 'two', '3']");
    assert_eq!(
        ctx.eval("twine.convert(2 ** 70, to=int)").unwrap(),
        ctx.eval("2 ** 70").unwrap()
    );
    assert!(matches!(ctx.eval("twine.convert(None)").unwrap(), Value::Str(text) if text.is_empty()));
}
