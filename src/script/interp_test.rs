use std::cell::Cell;
use std::rc::Rc;

use super::interp::Interp;
use super::obj::Obj;

#[test]
fn eval_returns_last_command_result() {
    let interp = Interp::new();
    assert_eq!(interp.eval("set a 1; set b 2").unwrap().as_str(), "2");
}

#[test]
fn variables_through_the_api() {
    let interp = Interp::new();
    interp.set_var("x", Obj::from_int(3)).unwrap();
    assert_eq!(interp.get_var("x").unwrap().as_str(), "3");
    assert!(interp.var_exists("x"));
    interp.set_var("arr(k)", Obj::new("v")).unwrap();
    assert!(interp.array_exists("arr"));
    assert_eq!(interp.get_var("arr(k)").unwrap().as_str(), "v");
    interp.unset_var("x").unwrap();
    assert!(!interp.var_exists("x"));
    assert_eq!(
        interp.get_var("arr").unwrap_err(),
        "can't read \"arr\": variable is array"
    );
}

#[test]
fn variable_values_are_shared_not_copied() {
    let interp = Interp::new();
    let value = Obj::from_strs(&["a", "b"]);
    interp.set_var("l", value.clone()).unwrap();
    let read = interp.get_var("l").unwrap();
    assert!(Obj::ptr_eq(&value, &read));
}

#[test]
fn in_place_mutation_copies_shared_values() {
    let interp = Interp::new();
    let original = Obj::from_strs(&["a"]);
    interp.set_var("l", original.clone()).unwrap();
    interp
        .with_var_mut("l", |value| value.list_append(Obj::new("b")))
        .unwrap()
        .unwrap();
    assert_eq!(original.as_str(), "a");
    assert_eq!(interp.get_var("l").unwrap().as_str(), "a b");
}

#[test]
fn error_info_accumulates_through_procs() {
    let interp = Interp::new();
    interp.eval("proc inner {} {error oops}\nproc outer {} {inner}").unwrap();
    let error = interp.eval("outer").unwrap_err();
    assert_eq!(error.message.as_str(), "oops");
    insta::assert_snapshot!(error.error_info(), @r#"
    oops
        while executing
    "error oops"
        (procedure "inner" line 1)
        invoked from within
    "inner"
        (procedure "outer" line 1)
        invoked from within
    "outer"
    "#);
    assert_eq!(
        interp.get_var("::errorInfo").unwrap().as_str(),
        error.error_info()
    );
}

#[test]
fn return_options_describe_errors() {
    let interp = Interp::new();
    let error = interp.eval("set x 1\nerror bad {} {E X}").unwrap_err();
    let options = error.return_options();
    assert_eq!(options.dict_get("-code").unwrap().unwrap().as_str(), "1");
    assert_eq!(options.dict_get("-level").unwrap().unwrap().as_str(), "0");
    assert_eq!(options.dict_get("-errorcode").unwrap().unwrap().as_str(), "E X");
    assert_eq!(options.dict_get("-errorline").unwrap().unwrap().as_str(), "2");
}

#[test]
fn runaway_recursion_is_stopped() {
    let interp = Interp::new();
    interp.set_max_depth(50);
    interp.eval("proc forever {} {forever}").unwrap();
    let error = interp.eval("forever").unwrap_err();
    assert_eq!(
        error.message.as_str(),
        "too many nested evaluations (infinite loop?)"
    );
}

#[test]
fn call_passes_words_verbatim() {
    let interp = Interp::new();
    interp.eval("proc echo {a} {return $a}").unwrap();
    let result = interp
        .call(&[Obj::new("echo"), Obj::new("[not evaluated] $x")])
        .unwrap();
    assert_eq!(result.as_str(), "[not evaluated] $x");
}

#[test]
fn native_commands_receive_full_words() {
    let interp = Interp::new();
    interp.register_command("argc", |_, objv| Ok(Obj::from_int(objv.len() as i64)));
    assert_eq!(interp.eval("argc a b {c d}").unwrap().as_str(), "4");
    assert_eq!(interp.eval("argc {*}{a b c}").unwrap().as_str(), "4");
}

#[test]
fn child_deletion_runs_callbacks_once() {
    let parent = Interp::new();
    let child = parent.create_child(Some("c")).unwrap();
    let calls = Rc::new(Cell::new(0));
    let seen = calls.clone();
    child.call_when_deleted(move |_| seen.set(seen.get() + 1));

    parent.delete_child("c").unwrap();
    child.delete();
    assert_eq!(calls.get(), 1);
    assert!(child.is_deleted());
    assert!(parent.child("c").is_none());
    assert!(child.eval("set x 1").is_err());
}

#[test]
fn dropping_the_last_handle_deletes() {
    let calls = Rc::new(Cell::new(0));
    let interp = Interp::new();
    let seen = calls.clone();
    interp.call_when_deleted(move |_| seen.set(seen.get() + 1));
    let weak = interp.downgrade();

    let extra = interp.clone();
    drop(extra);
    assert_eq!(calls.get(), 0);
    drop(interp);
    assert_eq!(calls.get(), 1);
    assert!(weak.upgrade().is_none());

    let interp = Interp::new();
    let seen = calls.clone();
    interp.call_when_deleted(move |_| seen.set(seen.get() + 1));
    interp.delete();
    drop(interp);
    assert_eq!(calls.get(), 2);
}

#[test]
fn deleting_a_parent_deletes_children_first() {
    let parent = Interp::new();
    let child = parent.create_child(None).unwrap();
    assert_eq!(child.name(), "interp0");
    assert!(Interp::ptr_eq(&child.parent().unwrap(), &parent));
    parent.delete();
    assert!(child.is_deleted());
}

#[test]
fn packages_are_shared_with_children() {
    let parent = Interp::new();
    let loads = Rc::new(Cell::new(0));
    let counter = loads.clone();
    parent.provide_package(
        "demo",
        Rc::new(move |interp: &Interp| {
            counter.set(counter.get() + 1);
            interp.set_var("::demo_loaded", Obj::new("yes")).map(|_| ())
        }),
    );
    let child = parent.create_child(None).unwrap();
    child.eval("package require demo").unwrap();
    child.eval("package require demo").unwrap();
    assert_eq!(loads.get(), 1);
    assert_eq!(child.get_var("::demo_loaded").unwrap().as_str(), "yes");
    assert!(!parent.package_loaded("demo"));
    assert_eq!(
        parent.eval("package require missing").unwrap_err().to_string(),
        "can't find package missing"
    );
}

#[test]
fn assoc_data_round_trips_by_type() {
    let interp = Interp::new();
    interp.set_assoc_data("counter", Rc::new(7_u32));
    assert_eq!(interp.assoc_data::<u32>("counter").as_deref(), Some(&7));
    assert!(interp.assoc_data::<String>("counter").is_none());
}
