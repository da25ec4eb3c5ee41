use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use proptest::prelude::*;

use twine::bridge::{to_obj, to_value, Bridge, Flavour, Proxy, Target};
use twine::object::{ops, Context, ExcKind, Value};
use twine::script::{Interp, Obj};

fn element() -> impl Strategy<Value = String> {
    "[a-z0-9 {}\\[\\]$\";#\n]{0,8}"
}

fn big_int() -> impl Strategy<Value = BigInt> {
    (any::<i64>(), any::<u64>(), any::<bool>()).prop_map(|(high, low, wide)| {
        let value = BigInt::from(high);
        if wide { (value << 64) + BigInt::from(low) } else { value }
    })
}

fn proxy_context() -> (Bridge, Rc<Context>) {
    let bridge = Bridge::new().unwrap();
    let ctx = bridge.runtime().root();
    ctx.exec("import twine").unwrap();
    (bridge, ctx)
}

fn int_of(value: Value) -> BigInt {
    match value {
        Value::Int(i) => i,
        other => panic!("expected an int, got {}", ops::repr(&other)),
    }
}

fn float_of(value: Value) -> f64 {
    match value {
        Value::Float(f) => f,
        other => panic!("expected a float, got {}", ops::repr(&other)),
    }
}

fn divides_by_zero(ctx: &Context, source: &str) -> bool {
    ctx.eval(source).is_err_and(|error| error.is(ExcKind::ZeroDivisionError))
}

proptest! {
    #[test]
    fn strings_survive_both_directions(text in ".{0,24}") {
        let obj = to_obj(&Value::from(text.as_str())).unwrap();
        prop_assert_eq!(obj.as_str(), text.as_str());
        prop_assert_eq!(to_value(&obj, Target::Str).unwrap(), Value::from(text.as_str()));
    }

    #[test]
    fn integers_keep_every_digit(value in big_int()) {
        let obj = to_obj(&Value::Int(value.clone())).unwrap();
        prop_assert_eq!(obj.as_str(), value.to_string());
        prop_assert_eq!(to_value(&obj, Target::Int).unwrap(), Value::Int(value));
    }

    #[test]
    fn lists_keep_count_and_order(items in prop::collection::vec(element(), 0..8)) {
        let values = Value::list(items.iter().map(|item| Value::from(item.as_str())).collect());
        let obj = to_obj(&values).unwrap();
        let elements = obj.list().unwrap();
        prop_assert_eq!(elements.len(), items.len());
        for (element, item) in elements.iter().zip(&items) {
            prop_assert_eq!(element.as_str(), item.as_str());
        }
        let back = Obj::new(obj.to_string());
        prop_assert_eq!(to_value(&back, Target::List).unwrap(), values);
    }

    #[test]
    fn proxy_text_is_the_owned_value(text in "[a-z {}]{0,16}") {
        let proxy = Proxy::owned(Obj::new(text.as_str()), Flavour::List);
        let proxy_text = proxy.text().unwrap();
        prop_assert_eq!(proxy_text.as_ref(), text.as_str());
    }

    #[test]
    fn floor_division_agrees_across_runtimes(a in -1000i64..1000, b in -50i64..50) {
        prop_assume!(b != 0);
        let interp = Interp::new();
        let scripted = interp.eval(&format!("expr {{{a} / {b}}}")).unwrap();
        let bridge = Bridge::new().unwrap();
        let ctx = bridge.runtime().root();
        let native = ctx.eval(&format!("({a}) // ({b})")).unwrap();
        prop_assert_eq!(scripted.as_str(), ops::repr(&native));
    }

    #[test]
    fn proxy_floor_division_keeps_the_divisor_sign(v in -1_000_000i64..1_000_000, w in -1000i64..1000) {
        prop_assume!(w != 0);
        let (_bridge, ctx) = proxy_context();
        ctx.exec(&format!("a = twine.scriptobj('{v}')\nb = twine.scriptobj('{w}')")).unwrap();
        let (v, w) = (BigInt::from(v), BigInt::from(w));

        for (q, r) in [
            (ctx.eval(&format!("a // ({w})")).unwrap(), ctx.eval(&format!("a % ({w})")).unwrap()),
            (ctx.eval(&format!("({v}) // b")).unwrap(), ctx.eval(&format!("({v}) % b")).unwrap()),
            (ctx.eval("a // b").unwrap(), ctx.eval("a % b").unwrap()),
        ] {
            let (q, r) = (int_of(q), int_of(r));
            prop_assert_eq!(&q * &w + &r, v.clone());
            prop_assert!(r.is_zero() || r.is_negative() == w.is_negative());
        }

        prop_assert!(divides_by_zero(&ctx, "a // 0"));
        prop_assert!(divides_by_zero(&ctx, "a % 0"));
        prop_assert!(divides_by_zero(&ctx, "a // 0.0"));
    }

    #[test]
    fn proxy_float_division_keeps_the_divisor_sign(i in -8000i64..8000, j in -400i64..400) {
        prop_assume!(j != 0);
        let (v, w) = (i as f64 / 8.0, j as f64 / 8.0);
        let (_bridge, ctx) = proxy_context();
        ctx.exec(&format!("a = twine.scriptobj('{v:?}')\nb = twine.scriptobj('{w:?}')")).unwrap();

        let q = float_of(ctx.eval("a // b").unwrap());
        let r = float_of(ctx.eval("a % b").unwrap());
        prop_assert_eq!(q, q.floor());
        prop_assert_eq!(q * w + r, v);
        prop_assert!(r == 0.0 || (r < 0.0) == (w < 0.0));

        prop_assert!(divides_by_zero(&ctx, "a // 0"));
        prop_assert!(divides_by_zero(&ctx, "a % 0.0"));
    }
}
