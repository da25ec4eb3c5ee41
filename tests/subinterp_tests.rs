use twine::bridge::Bridge;
use twine::config::BridgeConfig;
use twine::object::{ops, ExcKind};
use twine::script::{leak_detector, Interp};

fn bridge_with_children(names: &[&str]) -> Bridge {
    let bridge = Bridge::from_interp(&Interp::new(), BridgeConfig::default()).unwrap();
    for name in names {
        bridge
            .interp()
            .eval(&format!("interp create {name}; interp eval {name} {{package require twine}}"))
            .unwrap();
    }
    bridge
}

#[test]
fn children_have_isolated_globals() {
    let bridge = bridge_with_children(&["a", "b"]);
    let interp = bridge.interp();
    interp.eval("interp eval a {::twine::exec {value = 'from a'}}").unwrap();
    interp.eval("interp eval b {::twine::exec {value = 'from b'}}").unwrap();
    assert_eq!(interp.eval("interp eval a {::twine::eval value}").unwrap().as_str(), "from a");
    assert_eq!(interp.eval("interp eval b {::twine::eval value}").unwrap().as_str(), "from b");
    assert!(interp.eval("::twine::eval value").is_err());
}

#[test]
fn natives_use_the_calling_interpreter() {
    let bridge = bridge_with_children(&["kid"]);
    let interp = bridge.interp();
    interp.eval("set where root").unwrap();
    interp.eval("interp eval kid {set where kid}").unwrap();
    let seen = interp
        .eval("interp eval kid {::twine::exec {import twine}; ::twine::eval {twine.getvar('where')}}")
        .unwrap();
    assert_eq!(seen.as_str(), "kid");
    assert_eq!(
        interp.eval("::twine::exec {import twine}; ::twine::eval {twine.getvar('where')}").unwrap().as_str(),
        "root"
    );
}

#[test]
fn deleting_a_child_ends_its_context() {
    let bridge = bridge_with_children(&["kid"]);
    assert_eq!(bridge.runtime().context_count(), 1);
    let before = leak_detector::snapshot().live_proxies();
    bridge
        .interp()
        .eval("interp eval kid {::twine::exec {import twine; keep = twine.scriptobj('a b c')}}")
        .unwrap();
    assert_eq!(leak_detector::snapshot().live_proxies(), before + 1);

    bridge.interp().eval("interp delete kid").unwrap();
    assert_eq!(bridge.runtime().context_count(), 0);
    assert_eq!(bridge.state().pairing_count(), 1);
    assert_eq!(leak_detector::snapshot().live_proxies(), before);
}

#[test]
fn deleting_the_root_interpreter_leaves_the_runtime() {
    let bridge = Bridge::new().unwrap();
    let ctx = bridge.runtime().root();
    ctx.exec("x = 41").unwrap();
    bridge.interp().delete();
    assert_eq!(ops::repr(&ctx.eval("x + 1").unwrap()), "42");
}

#[test]
fn proxies_outliving_their_interpreter_raise() {
    let bridge = bridge_with_children(&["kid"]);
    let kid = bridge.interp().child("kid").unwrap();
    kid.eval("set v 1").unwrap();
    let root = bridge.runtime().root();
    root.exec("import twine").unwrap();

    let proxy = {
        let _guard = bridge.enter(&kid).unwrap();
        let ctx = bridge.context_for(&kid).unwrap();
        ctx.exec("import twine").unwrap();
        ctx.eval("twine.scriptvar('v')").unwrap()
    };
    root.globals().set("p", proxy);
    assert_eq!(ops::str(&root.eval("p").unwrap()).unwrap(), "1");

    bridge.interp().eval("interp delete kid").unwrap();
    let error = root.eval("p.get()").unwrap_err();
    assert!(error.is(ExcKind::NameError));
}

#[test]
fn attaching_twice_keeps_one_pairing() {
    let bridge = bridge_with_children(&["kid"]);
    let kid = bridge.interp().child("kid").unwrap();
    kid.eval("package require twine").unwrap();
    bridge.attach(&kid).unwrap();
    assert_eq!(bridge.state().pairing_count(), 2);
}
