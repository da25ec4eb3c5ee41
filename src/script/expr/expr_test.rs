use crate::script::interp::Interp;

fn eval(source: &str) -> String {
    let interp = Interp::new();
    interp.expr(source).unwrap().to_string()
}

fn eval_err(source: &str) -> String {
    let interp = Interp::new();
    interp.expr(source).unwrap_err().to_string()
}

#[test]
fn integer_arithmetic_floors() {
    assert_eq!(eval("1 + 1"), "2");
    assert_eq!(eval("7 / 2"), "3");
    assert_eq!(eval("-7 / 2"), "-4");
    assert_eq!(eval("-7 % 2"), "1");
    assert_eq!(eval("7 % -2"), "-1");
}

#[test]
fn doubles_mix_in() {
    assert_eq!(eval("7.0 / 2"), "3.5");
    assert_eq!(eval("double(3)"), "3.0");
    assert_eq!(eval("1 / 0.0"), "Inf");
}

#[test]
fn big_integers_do_not_overflow() {
    assert_eq!(eval("2 ** 100"), "1267650600228229401496703205376");
    assert_eq!(
        eval("9223372036854775807 + 1"),
        "9223372036854775808"
    );
}

#[test]
fn power_is_right_associative_and_unary_binds_tighter() {
    assert_eq!(eval("2 ** 3 ** 2"), "512");
    assert_eq!(eval("-2 ** 2"), "4");
    assert_eq!(eval("2 ** -1"), "0");
}

#[test]
fn precedence_follows_c() {
    assert_eq!(eval("1 + 2 * 3"), "7");
    assert_eq!(eval("(1 + 2) * 3"), "9");
    assert_eq!(eval("1 << 4 | 1"), "17");
    assert_eq!(eval("1 || 0 && 0"), "1");
}

#[test]
fn comparisons_are_numeric_when_possible() {
    assert_eq!(eval("10 > 9"), "1");
    assert_eq!(eval("{10} < {9}"), "0");
    assert_eq!(eval("\"abc\" < \"abd\""), "1");
    assert_eq!(eval("1 == 1.0"), "1");
    assert_eq!(eval("1 eq 1.0"), "0");
}

#[test]
fn list_membership() {
    assert_eq!(eval("\"b\" in {a b c}"), "1");
    assert_eq!(eval("\"z\" ni {a b c}"), "1");
}

#[test]
fn ternary_and_boolean_literals() {
    assert_eq!(eval("1 ? \"yes\" : \"no\""), "yes");
    assert_eq!(eval("false ? 1 : 0 ? 2 : 3"), "3");
    assert_eq!(eval("!true"), "0");
}

#[test]
fn math_functions() {
    assert_eq!(eval("max(1, 5, 3)"), "5");
    assert_eq!(eval("min(4, 2.5)"), "2.5");
    assert_eq!(eval("int(3.7)"), "3");
    assert_eq!(eval("round(2.5)"), "3");
    assert_eq!(eval("abs(-4)"), "4");
    assert_eq!(eval("sqrt(16)"), "4.0");
    assert_eq!(eval("bool(\"yes\")"), "1");
}

#[test]
fn operands_are_substituted() {
    let interp = Interp::new();
    interp.eval("set x 5").unwrap();
    assert_eq!(interp.expr("$x * 2").unwrap().as_str(), "10");
    assert_eq!(interp.expr("[set x] + 1").unwrap().as_str(), "6");
}

#[test]
fn logical_operators_short_circuit() {
    assert_eq!(eval("0 && [error boom]"), "0");
    assert_eq!(eval("1 || [error boom]"), "1");
}

#[test]
fn errors() {
    assert_eq!(eval_err("1 / 0"), "divide by zero");
    assert_eq!(eval_err("5 % 0"), "divide by zero");
    assert_eq!(
        eval_err("\"abc\" + 1"),
        "can't use non-numeric string as operand of \"+\""
    );
    assert_eq!(eval_err("1 << -1"), "negative shift argument");
    assert_eq!(eval_err("foo"), "invalid bareword \"foo\"");
    assert_eq!(eval_err(""), "empty expression");
}

#[test]
fn divide_by_zero_sets_error_code() {
    let interp = Interp::new();
    let error = interp.expr("1 / 0").unwrap_err();
    assert_eq!(error.code.as_str(), "ARITH DIVZERO {divide by zero}");
}
