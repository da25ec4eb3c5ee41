//! Rich comparison of proxies: string representations, with an identity
//! fast path for equality.

use crate::error::Result;
use crate::object::{CmpOp, Value};
use crate::script::Obj;

use super::Proxy;
use crate::bridge::convert::to_obj;

pub fn compare(proxy: &Proxy, op: CmpOp, other: &Value) -> Result<Value> {
    let mine = proxy.obj()?;
    let theirs = match other.as_native::<Proxy>() {
        Some(other) => other.obj()?,
        None => match to_obj(other) {
            Ok(obj) => obj,
            Err(_) => return Ok(Value::NotImplemented),
        },
    };
    if matches!(op, CmpOp::Eq | CmpOp::Ne) && Obj::ptr_eq(&mine, &theirs) {
        return Ok(Value::Bool(op == CmpOp::Eq));
    }
    let ordering = mine.as_str().cmp(theirs.as_str());
    Ok(Value::Bool(op.holds(ordering)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::proxy::Flavour;

    fn proxy(text: &str) -> Proxy {
        Proxy::owned(Obj::new(text), Flavour::List)
    }

    #[test]
    fn numerically_equal_texts_differ() {
        let one = proxy("1");
        assert_eq!(compare(&one, CmpOp::Eq, &Value::from("1.0")).unwrap(), Value::Bool(false));
        assert_eq!(compare(&one, CmpOp::Eq, &Value::from(1_i64)).unwrap(), Value::Bool(true));
        assert_eq!(compare(&one, CmpOp::Ne, &Value::from(1.0)).unwrap(), Value::Bool(true));
    }

    #[test]
    fn ordering_is_lexicographic() {
        let ten = proxy("10");
        assert_eq!(compare(&ten, CmpOp::Lt, &Value::from("9")).unwrap(), Value::Bool(true));
        assert_eq!(
            compare(&ten, CmpOp::Ge, &proxy("10").into_value()).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn the_same_obj_is_equal_to_itself() {
        let shared = Obj::from_strs(&["a", "b"]);
        let left = Proxy::owned(shared.clone(), Flavour::List);
        let right = Proxy::owned(shared, Flavour::Dict).into_value();
        assert_eq!(compare(&left, CmpOp::Eq, &right).unwrap(), Value::Bool(true));
    }
}
