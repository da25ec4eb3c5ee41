use std::rc::Rc;

use twine::bridge::{Bridge, Flavour, Proxy, Target};
use twine::object::{ops, Context, ExcKind, Value};
use twine::script::Obj;

fn setup() -> (Bridge, Rc<Context>) {
    let bridge = Bridge::new().unwrap();
    let ctx = bridge.runtime().root();
    ctx.exec("import twine").unwrap();
    (bridge, ctx)
}

fn repr(ctx: &Context, source: &str) -> String {
    ops::repr(&ctx.eval(source).unwrap())
}

#[test]
fn list_iteration_wraps_or_converts() {
    let (_bridge, ctx) = setup();
    ctx.exec("t = twine.scriptobj('1 2 3')").unwrap();
    assert_eq!(
        repr(&ctx, "list(t)"),
        "[<twine.scriptobj: '1'>, <twine.scriptobj: '2'>, <twine.scriptobj: '3'>]"
    );
    ctx.exec("t.to = int").unwrap();
    assert_eq!(repr(&ctx, "list(t)"), "[1, 2, 3]");
    assert_eq!(repr(&ctx, "sum(t)"), "6");
}

#[test]
fn dict_iteration_yields_keys_or_pairs() {
    let (_bridge, ctx) = setup();
    ctx.exec("d = twine.scriptdict('b 2 a 1')").unwrap();
    assert_eq!(repr(&ctx, "list(d)"), "['b', 'a']");
    assert_eq!(repr(&ctx, "list(d.keys())"), "['b', 'a']");
    assert_eq!(repr(&ctx, "list(d.values(to=int))"), "[2, 1]");
    assert_eq!(repr(&ctx, "list(d.items())"), "[('b', '2'), ('a', '1')]");
    ctx.exec("d.to = int").unwrap();
    assert_eq!(repr(&ctx, "list(d)"), "[('b', 2), ('a', 1)]");
}

#[test]
fn list_editing_methods() {
    let (_bridge, ctx) = setup();
    ctx.exec("t = twine.scriptobj('a b c')").unwrap();
    ctx.exec("t.insert(0, 'z')").unwrap();
    ctx.exec("t.extend(['d', 'e f'])").unwrap();
    assert_eq!(ops::str(&ctx.eval("t").unwrap()).unwrap(), "z a b c d {e f}");
    assert_eq!(repr(&ctx, "t.pop()"), "'e f'");
    assert_eq!(repr(&ctx, "t.pop(0)"), "'z'");
    assert_eq!(repr(&ctx, "t.llength()"), "4");
    ctx.exec("t[1] = 'B'").unwrap();
    ctx.exec("del t[0]").unwrap();
    assert_eq!(repr(&ctx, "t.as_list()"), "['B', 'c', 'd']");
    assert_eq!(repr(&ctx, "t[1:].as_list()"), "['c', 'd']");
}

#[test]
fn slice_assignment_is_refused() {
    let (_bridge, ctx) = setup();
    ctx.exec("t = twine.scriptobj('a b c')").unwrap();
    let error = ctx.exec("t[0:1] = 'x'").unwrap_err();
    assert!(error.is(ExcKind::TypeError));
}

#[test]
fn out_of_range_indexes_raise_index_error() {
    let (_bridge, ctx) = setup();
    ctx.exec("t = twine.scriptobj('a')").unwrap();
    assert!(ctx.eval("t[5]").unwrap_err().is(ExcKind::IndexError));
    assert!(ctx.eval("t.lindex(-1)").unwrap_err().is(ExcKind::IndexError));
    assert!(ctx.eval("twine.scriptobj().pop()").unwrap_err().is(ExcKind::IndexError));
}

#[test]
fn conversions_from_the_proxy() {
    let (_bridge, ctx) = setup();
    ctx.exec("t = twine.scriptobj('3 1 3')").unwrap();
    assert_eq!(repr(&ctx, "t.as_tuple()"), "('3', '1', '3')");
    assert_eq!(repr(&ctx, "len(t.as_set())"), "2");
    assert_eq!(repr(&ctx, "twine.scriptobj('true').as_bool()"), "True");
    assert_eq!(repr(&ctx, "twine.scriptobj('2.5').as_float()"), "2.5");
    assert_eq!(repr(&ctx, "twine.scriptobj('a 1').as_dict()"), "{'a': '1'}");
    assert_eq!(repr(&ctx, "twine.scriptobj('hi').as_byte_array()"), "b'hi'");
    let error = ctx.eval("twine.scriptobj('x').as_int()").unwrap_err();
    assert!(error.is(ExcKind::ValueError));
}

#[test]
fn truthiness() {
    let (_bridge, ctx) = setup();
    assert_eq!(repr(&ctx, "bool(twine.scriptobj('0'))"), "False");
    assert_eq!(repr(&ctx, "bool(twine.scriptobj('0.0'))"), "False");
    assert_eq!(repr(&ctx, "bool(twine.scriptobj('no'))"), "False");
    assert_eq!(repr(&ctx, "bool(twine.scriptobj(''))"), "False");
    assert_eq!(repr(&ctx, "bool(twine.scriptobj('word'))"), "True");
    assert_eq!(repr(&ctx, "bool(twine.scriptobj('12'))"), "True");
}

#[test]
fn in_place_operators_store_back() {
    let (bridge, ctx) = setup();
    bridge.interp().eval("set n 10").unwrap();
    ctx.exec("n = twine.scriptvar('n')").unwrap();
    ctx.exec("n += 5").unwrap();
    assert_eq!(bridge.interp().get_var("n").unwrap().as_str(), "15");
    ctx.exec("n *= 2").unwrap();
    assert_eq!(bridge.interp().get_var("n").unwrap().as_str(), "30");
}

#[test]
fn set_and_reset() {
    let (_bridge, ctx) = setup();
    ctx.exec("t = twine.scriptobj('a b')").unwrap();
    ctx.exec("t.set([1, 2, 3])").unwrap();
    assert_eq!(repr(&ctx, "len(t)"), "3");
    ctx.exec("t.reset()").unwrap();
    assert_eq!(repr(&ctx, "len(t)"), "0");

    ctx.exec("t.set('x y')").unwrap();
    assert!(ctx.exec("t.set()").unwrap_err().is(ExcKind::TypeError));
    assert!(ctx.exec("t.set(1, 2)").unwrap_err().is(ExcKind::TypeError));
    assert_eq!(repr(&ctx, "len(t)"), "2");
}

#[test]
fn proxies_are_usable_from_rust() {
    let proxy = Proxy::owned(Obj::from_strs(&["x", "y"]), Flavour::List).with_to(Some(Target::Str));
    assert_eq!(proxy.text().unwrap().as_ref(), "x y");
    assert_eq!(proxy.element(Obj::new("x")).unwrap(), Value::from("x"));
    proxy.set_obj(Obj::new("z")).unwrap();
    assert_eq!(proxy.obj().unwrap().as_str(), "z");
}
