use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use super::glob_match;
use crate::script::interp::Interp;

fn run(script: &str) -> String {
    let interp = Interp::new();
    interp.eval(script).unwrap().to_string()
}

fn run_err(script: &str) -> String {
    let interp = Interp::new();
    interp.eval(script).unwrap_err().to_string()
}

#[derive(Clone, Default)]
struct Captured(Rc<RefCell<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn glob_patterns() {
    assert!(glob_match("a*c", "abbbc"));
    assert!(glob_match("?b", "ab"));
    assert!(glob_match("[a-c]x", "bx"));
    assert!(!glob_match("[a-c]x", "dx"));
    assert!(glob_match("a\\*", "a*"));
    assert!(!glob_match("a\\*", "ab"));
    assert!(glob_match("*", ""));
}

#[test]
fn variables_and_incr() {
    assert_eq!(run("set a 5; incr a 3"), "8");
    assert_eq!(run("incr fresh"), "1");
    assert_eq!(run("set s ab; append s cd ef"), "abcdef");
    assert_eq!(run("lappend l a {b c}; lappend l d"), "a {b c} d");
    assert_eq!(run_err("set nope"), "can't read \"nope\": no such variable");
    assert_eq!(run("unset -nocomplain nope; set x ok"), "ok");
}

#[test]
fn arrays() {
    let interp = Interp::new();
    interp.eval("array set colors {red 1 green 2}").unwrap();
    assert_eq!(interp.eval("array size colors").unwrap().as_str(), "2");
    assert_eq!(interp.eval("set colors(red)").unwrap().as_str(), "1");
    assert_eq!(interp.eval("array names colors g*").unwrap().as_str(), "green");
    interp.eval("array unset colors r*").unwrap();
    assert_eq!(interp.eval("array get colors").unwrap().as_str(), "green 2");
}

#[test]
fn control_flow() {
    assert_eq!(run("if {1 > 2} {set r a} elseif {2 > 1} {set r b} else {set r c}"), "b");
    assert_eq!(
        run("set t 0; for {set i 0} {$i < 10} {incr i} {if {$i == 5} break; incr t $i}; set t"),
        "10"
    );
    assert_eq!(
        run("set out {}; foreach {k v} {a 1 b 2} {lappend out $v$k}; set out"),
        "1a 2b"
    );
    assert_eq!(
        run("set n 0; while {$n < 5} {incr n; if {$n % 2} continue}; set n"),
        "5"
    );
}

#[test]
fn procs_with_defaults_and_varargs() {
    let interp = Interp::new();
    interp
        .eval("proc greet {name {greeting hello} args} {return \"$greeting $name [llength $args]\"}")
        .unwrap();
    assert_eq!(interp.eval("greet bob").unwrap().as_str(), "hello bob 0");
    assert_eq!(interp.eval("greet bob hi 1 2").unwrap().as_str(), "hi bob 2");
    assert_eq!(
        interp.eval("proc one {a} {}; one").unwrap_err().to_string(),
        "wrong # args: should be \"one a\""
    );
}

#[test]
fn catch_reports_codes_and_options() {
    let interp = Interp::new();
    assert_eq!(interp.eval("catch {error boom} msg").unwrap().as_str(), "1");
    assert_eq!(interp.eval("set msg").unwrap().as_str(), "boom");
    assert_eq!(
        interp
            .eval("catch {error boom {} {MY CODE}} m opts; dict get $opts -errorcode")
            .unwrap()
            .as_str(),
        "MY CODE"
    );
    assert_eq!(interp.eval("catch {return -code break}").unwrap().as_str(), "2");
    assert_eq!(interp.eval("catch {break}").unwrap().as_str(), "3");
    assert_eq!(interp.eval("catch {set x 1}").unwrap().as_str(), "0");
}

#[test]
fn return_with_error_code_from_proc() {
    let interp = Interp::new();
    interp
        .eval("proc fail {} {return -code error -errorcode {APP BAD} failed}")
        .unwrap();
    let error = interp.eval("fail").unwrap_err();
    assert_eq!(error.message.as_str(), "failed");
    assert_eq!(error.code.as_str(), "APP BAD");
}

#[test]
fn list_commands() {
    assert_eq!(run("llength {a b {c d}}"), "3");
    assert_eq!(run("lindex {a {b c} d} 1 0"), "b");
    assert_eq!(run("lindex {a b c} end"), "c");
    assert_eq!(run("lindex {a b c} 7"), "");
    assert_eq!(run("lrange {a b c d e} 1 end-1"), "b c d");
    assert_eq!(run("linsert {a c} 1 b"), "a b c");
    assert_eq!(run("lreplace {a b c d} 1 2 X"), "a X d");
    assert_eq!(run("lsearch {a b c} c"), "2");
    assert_eq!(run("lsearch -all -inline {ax b ay} a*"), "ax ay");
    assert_eq!(run("lsort -integer {10 9 100}"), "9 10 100");
    assert_eq!(run("lsort -decreasing -unique {b a b c}"), "c b a");
    assert_eq!(run("lreverse {1 2 3}"), "3 2 1");
    assert_eq!(run("join {a b c} -"), "a-b-c");
    assert_eq!(run("split a,b,,c ,"), "a b {} c");
    assert_eq!(run("concat {a b} {} {c}"), "a b c");
}

#[test]
fn dict_commands() {
    let interp = Interp::new();
    interp.eval("set d [dict create a 1 b 2]").unwrap();
    assert_eq!(interp.eval("dict get $d b").unwrap().as_str(), "2");
    interp.eval("dict set d m i i1").unwrap();
    assert_eq!(interp.eval("dict get $d m i").unwrap().as_str(), "i1");
    assert_eq!(interp.eval("dict exists $d m j").unwrap().as_str(), "0");
    interp.eval("dict unset d a").unwrap();
    assert_eq!(interp.eval("dict keys $d").unwrap().as_str(), "b m");
    assert_eq!(interp.eval("dict size $d").unwrap().as_str(), "2");
    assert_eq!(
        interp.eval("dict get $d zz").unwrap_err().to_string(),
        "key \"zz\" not known in dictionary"
    );
    assert_eq!(
        interp.eval("dict merge {a 1} {a 2 c 3}").unwrap().as_str(),
        "a 2 c 3"
    );
}

#[test]
fn string_commands() {
    assert_eq!(run("string length héllo"), "5");
    assert_eq!(run("string bytelength héllo"), "6");
    assert_eq!(run("string index abc end"), "c");
    assert_eq!(run("string range abcdef 1 3"), "bcd");
    assert_eq!(run("string toupper abc"), "ABC");
    assert_eq!(run("string trim {  x  }"), "x");
    assert_eq!(run("string trimleft xxab x"), "ab");
    assert_eq!(run("string equal -nocase ABC abc"), "1");
    assert_eq!(run("string compare a b"), "-1");
    assert_eq!(run("string first b abcb"), "1");
    assert_eq!(run("string last b abcb"), "3");
    assert_eq!(run("string match -nocase A* abc"), "1");
    assert_eq!(run("string repeat ab 3"), "ababab");
    assert_eq!(run("string reverse abc"), "cba");
    assert_eq!(run("string map {a 1 b 2} abcab"), "12c12");
    assert_eq!(run("string is integer 0x1f"), "1");
    assert_eq!(run("string is double abc"), "0");
    assert_eq!(run("string is integer -strict {}"), "0");
}

#[test]
fn info_commands() {
    let interp = Interp::new();
    interp.eval("proc p {a {b 2}} {return $a}").unwrap();
    assert_eq!(interp.eval("info args p").unwrap().as_str(), "a b");
    assert_eq!(interp.eval("info body p").unwrap().as_str(), "return $a");
    assert_eq!(interp.eval("info default p b v").unwrap().as_str(), "1");
    assert_eq!(interp.eval("set v").unwrap().as_str(), "2");
    assert_eq!(interp.eval("info procs p*").unwrap().as_str(), "p");
    assert_eq!(interp.eval("info exists v").unwrap().as_str(), "1");
    assert_eq!(interp.eval("info level").unwrap().as_str(), "0");
}

#[test]
fn namespaces_and_variables() {
    let interp = Interp::new();
    interp
        .eval("namespace eval app { variable count 3; proc bump {} { variable count; incr count } }")
        .unwrap();
    assert_eq!(interp.eval("app::bump").unwrap().as_str(), "4");
    assert_eq!(interp.eval("set ::app::count").unwrap().as_str(), "4");
    assert_eq!(interp.eval("namespace exists app").unwrap().as_str(), "1");
    assert_eq!(interp.eval("namespace children").unwrap().as_str(), "::app");
    interp.eval("namespace delete app").unwrap();
    assert_eq!(interp.eval("namespace exists app").unwrap().as_str(), "0");
}

#[test]
fn global_links_to_global_variable() {
    let interp = Interp::new();
    interp.eval("set total 1; proc add {n} { global total; incr total $n }").unwrap();
    interp.eval("add 4").unwrap();
    assert_eq!(interp.eval("set total").unwrap().as_str(), "5");
}

#[test]
fn child_interpreters() {
    let interp = Interp::new();
    assert_eq!(interp.eval("interp create kid").unwrap().as_str(), "kid");
    assert_eq!(interp.eval("interp eval kid {set x 41; incr x}").unwrap().as_str(), "42");
    assert_eq!(interp.eval("interp exists kid").unwrap().as_str(), "1");
    assert_eq!(interp.eval("interp children").unwrap().as_str(), "kid");
    assert_eq!(interp.eval("info exists x").unwrap().as_str(), "0");
    interp.eval("interp delete kid").unwrap();
    assert_eq!(interp.eval("interp exists kid").unwrap().as_str(), "0");
}

#[test]
fn puts_writes_to_the_output() {
    let interp = Interp::new();
    let captured = Captured::default();
    interp.set_output(Box::new(captured.clone()));
    interp.eval("puts hello; puts -nonewline world").unwrap();
    assert_eq!(
        String::from_utf8(captured.0.borrow().clone()).unwrap(),
        "hello\nworld"
    );
}

#[test]
fn encoding_round_trip() {
    assert_eq!(
        run("encoding convertfrom utf-8 [encoding convertto utf-8 héllo]"),
        "héllo"
    );
    assert_eq!(run("string length [encoding convertto utf-8 é]"), "2");
}

#[test]
fn subst_honours_flags() {
    let interp = Interp::new();
    interp.eval("set a 1").unwrap();
    assert_eq!(
        interp.eval("subst -novariables {$a [set a]}").unwrap().as_str(),
        "$a 1"
    );
}

#[test]
fn rename_and_unknown_commands() {
    let interp = Interp::new();
    interp.eval("proc old {} {return ok}; rename old new").unwrap();
    assert_eq!(interp.eval("new").unwrap().as_str(), "ok");
    assert_eq!(
        interp.eval("old").unwrap_err().to_string(),
        "invalid command name \"old\""
    );
}
