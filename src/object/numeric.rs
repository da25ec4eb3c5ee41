//! Number arithmetic shared by the builtin numeric types and by anything
//! else that wants the same semantics: unbounded integers, floor division
//! with a remainder that takes the divisor's sign, IEEE floats.

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{FromPrimitive, Signed, ToPrimitive, Zero};

use super::exception::{ExcKind, Exception};
use super::native::{BinOp, UnaryOp};
use super::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Num {
    Int(BigInt),
    Float(f64),
}

impl Num {
    /// Numeric view of a builtin value; booleans count as integers.
    pub fn from_value(value: &Value) -> Option<Num> {
        match value {
            Value::Bool(b) => Some(Num::Int(BigInt::from(u8::from(*b)))),
            Value::Int(i) => Some(Num::Int(i.clone())),
            Value::Float(f) => Some(Num::Float(*f)),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Num::Int(i) => Value::Int(i),
            Num::Float(f) => Value::Float(f),
        }
    }

    pub fn to_f64(&self) -> Result<f64, Exception> {
        match self {
            Num::Float(f) => Ok(*f),
            Num::Int(i) => int_to_f64(i),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Num::Int(i) => i.is_zero(),
            Num::Float(f) => *f == 0.0,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Num::Int(_) => "int",
            Num::Float(_) => "float",
        }
    }
}

pub fn int_to_f64(value: &BigInt) -> Result<f64, Exception> {
    match value.to_f64() {
        Some(f) if f.is_finite() => Ok(f),
        _ => Err(Exception::new(
            ExcKind::OverflowError,
            "int too large to convert to float",
        )),
    }
}

/// Apply a binary operator. `None` means the operator does not apply to
/// this pair of operand types.
pub fn binary(op: BinOp, left: &Num, right: &Num) -> Option<Result<Num, Exception>> {
    match (left, right) {
        (Num::Int(a), Num::Int(b)) => Some(int_binary(op, a, b)),
        _ => {
            if matches!(
                op,
                BinOp::LShift | BinOp::RShift | BinOp::And | BinOp::Or | BinOp::Xor
            ) {
                return None;
            }
            Some(left.to_f64().and_then(|a| {
                right
                    .to_f64()
                    .and_then(|b| float_binary(op, a, b).map(Num::Float))
            }))
        }
    }
}

fn int_binary(op: BinOp, a: &BigInt, b: &BigInt) -> Result<Num, Exception> {
    let result = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::TrueDiv => {
            if b.is_zero() {
                return Err(zero_division("division by zero"));
            }
            return Ok(Num::Float(int_to_f64(a)? / int_to_f64(b)?));
        }
        BinOp::FloorDiv => {
            if b.is_zero() {
                return Err(zero_division("integer division or modulo by zero"));
            }
            a.div_floor(b)
        }
        BinOp::Mod => {
            if b.is_zero() {
                return Err(zero_division("integer division or modulo by zero"));
            }
            a.mod_floor(b)
        }
        BinOp::Pow => {
            if b.is_negative() {
                if a.is_zero() {
                    return Err(zero_division(
                        "0.0 cannot be raised to a negative power",
                    ));
                }
                return Ok(Num::Float(int_to_f64(a)?.powf(int_to_f64(b)?)));
            }
            let exponent = b.to_u32().ok_or_else(|| {
                Exception::new(ExcKind::OverflowError, "exponent too large")
            })?;
            num_traits::pow(a.clone(), exponent as usize)
        }
        BinOp::LShift => {
            let count = shift_count(b)?;
            a << count
        }
        BinOp::RShift => {
            let count = shift_count(b)?;
            a >> count
        }
        BinOp::And => a & b,
        BinOp::Or => a | b,
        BinOp::Xor => a ^ b,
    };
    Ok(Num::Int(result))
}

fn shift_count(count: &BigInt) -> Result<usize, Exception> {
    if count.is_negative() {
        return Err(Exception::value_error("negative shift count"));
    }
    count
        .to_usize()
        .ok_or_else(|| Exception::new(ExcKind::OverflowError, "too many digits in integer"))
}

fn float_binary(op: BinOp, a: f64, b: f64) -> Result<f64, Exception> {
    let result = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::TrueDiv => {
            if b == 0.0 {
                return Err(zero_division("float division by zero"));
            }
            a / b
        }
        BinOp::FloorDiv => {
            if b == 0.0 {
                return Err(zero_division("float floor division by zero"));
            }
            float_divmod(a, b).0
        }
        BinOp::Mod => {
            if b == 0.0 {
                return Err(zero_division("float modulo"));
            }
            float_divmod(a, b).1
        }
        BinOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(zero_division("0.0 cannot be raised to a negative power"));
            }
            a.powf(b)
        }
        BinOp::LShift | BinOp::RShift | BinOp::And | BinOp::Or | BinOp::Xor => {
            return Err(Exception::type_error(format!(
                "unsupported operand type(s) for {}: 'float' and 'float'",
                op.symbol()
            )));
        }
    };
    Ok(result)
}

/// Floor quotient and remainder, the remainder taking the sign of `b`.
pub fn float_divmod(a: f64, b: f64) -> (f64, f64) {
    let mut remainder = a % b;
    let mut quotient = (a - remainder) / b;
    if remainder != 0.0 {
        if (b < 0.0) != (remainder < 0.0) {
            remainder += b;
            quotient -= 1.0;
        }
    } else {
        remainder = 0.0_f64.copysign(b);
    }
    let floored = if quotient != 0.0 {
        let floor = quotient.floor();
        if quotient - floor > 0.5 { floor + 1.0 } else { floor }
    } else {
        0.0_f64.copysign(a / b)
    };
    (floored, remainder)
}

/// `divmod(a, b)` as a pair of numbers.
pub fn divmod(left: &Num, right: &Num) -> Result<(Num, Num), Exception> {
    let quotient = binary(BinOp::FloorDiv, left, right).unwrap_or_else(|| {
        Err(unsupported("divmod()", left.type_name(), right.type_name()))
    })?;
    let remainder = binary(BinOp::Mod, left, right).unwrap_or_else(|| {
        Err(unsupported("divmod()", left.type_name(), right.type_name()))
    })?;
    Ok((quotient, remainder))
}

pub fn unary(op: UnaryOp, value: &Num) -> Result<Num, Exception> {
    let result = match (op, value) {
        (UnaryOp::Neg, Num::Int(i)) => Num::Int(-i),
        (UnaryOp::Neg, Num::Float(f)) => Num::Float(-f),
        (UnaryOp::Pos, n) => n.clone(),
        (UnaryOp::Abs, Num::Int(i)) => Num::Int(i.abs()),
        (UnaryOp::Abs, Num::Float(f)) => Num::Float(f.abs()),
        (UnaryOp::Invert, Num::Int(i)) => Num::Int(-(i + BigInt::from(1))),
        (UnaryOp::Invert, Num::Float(_)) => {
            return Err(Exception::type_error("bad operand type for unary ~: 'float'"));
        }
    };
    Ok(result)
}

/// Numeric ordering; `None` when a NaN is involved.
pub fn compare(left: &Num, right: &Num) -> Option<Ordering> {
    match (left, right) {
        (Num::Int(a), Num::Int(b)) => Some(a.cmp(b)),
        (Num::Float(a), Num::Float(b)) => a.partial_cmp(b),
        (Num::Int(a), Num::Float(b)) => compare_int_float(a, *b),
        (Num::Float(a), Num::Int(b)) => compare_int_float(b, *a).map(Ordering::reverse),
    }
}

fn compare_int_float(int: &BigInt, float: f64) -> Option<Ordering> {
    if float.is_nan() {
        return None;
    }
    if float.is_infinite() {
        return Some(if float > 0.0 { Ordering::Less } else { Ordering::Greater });
    }
    let floor = BigInt::from_f64(float.floor())?;
    match int.cmp(&floor) {
        Ordering::Equal if float.fract() != 0.0 => Some(Ordering::Less),
        ordering => Some(ordering),
    }
}

pub fn unsupported(op: &str, left: &str, right: &str) -> Exception {
    Exception::type_error(format!(
        "unsupported operand type(s) for {op}: '{left}' and '{right}'"
    ))
}

fn zero_division(message: &str) -> Exception {
    Exception::new(ExcKind::ZeroDivisionError, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i64) -> Num {
        Num::Int(BigInt::from(i))
    }

    fn apply(op: BinOp, a: Num, b: Num) -> Num {
        binary(op, &a, &b).unwrap().unwrap()
    }

    #[test]
    fn floor_division_and_modulo_follow_the_divisor() {
        assert_eq!(apply(BinOp::FloorDiv, int(-7), int(2)), int(-4));
        assert_eq!(apply(BinOp::Mod, int(-7), int(2)), int(1));
        assert_eq!(apply(BinOp::Mod, int(7), int(-2)), int(-1));
        assert_eq!(apply(BinOp::FloorDiv, Num::Float(7.5), int(2)), Num::Float(3.0));
        assert_eq!(apply(BinOp::Mod, Num::Float(-1.0), Num::Float(3.0)), Num::Float(2.0));
    }

    #[test]
    fn true_division_always_yields_a_float() {
        assert_eq!(apply(BinOp::TrueDiv, int(7), int(2)), Num::Float(3.5));
        assert_eq!(apply(BinOp::TrueDiv, int(4), int(2)), Num::Float(2.0));
    }

    #[test]
    fn zero_divisors_raise() {
        let error = binary(BinOp::TrueDiv, &int(1), &int(0)).unwrap().unwrap_err();
        assert!(error.is(ExcKind::ZeroDivisionError));
        assert_eq!(error.message(), "division by zero");
        let error = binary(BinOp::Mod, &Num::Float(1.0), &int(0)).unwrap().unwrap_err();
        assert_eq!(error.message(), "float modulo");
    }

    #[test]
    fn integers_are_unbounded() {
        let big = apply(BinOp::Pow, int(2), int(100));
        assert_eq!(
            big,
            Num::Int("1267650600228229401496703205376".parse().unwrap())
        );
        assert_eq!(apply(BinOp::Pow, int(2), int(-1)), Num::Float(0.5));
    }

    #[test]
    fn shifts_reject_negative_counts_and_floats() {
        let error = binary(BinOp::LShift, &int(1), &int(-1)).unwrap().unwrap_err();
        assert!(error.is(ExcKind::ValueError));
        assert!(binary(BinOp::LShift, &Num::Float(1.0), &int(1)).is_none());
        assert_eq!(apply(BinOp::LShift, int(1), int(70)), Num::Int(BigInt::from(1) << 70));
    }

    #[test]
    fn mixed_comparisons_are_exact() {
        assert_eq!(compare(&int(1), &Num::Float(1.5)), Some(Ordering::Less));
        assert_eq!(compare(&int(2), &Num::Float(2.0)), Some(Ordering::Equal));
        assert_eq!(compare(&Num::Float(f64::NAN), &int(0)), None);
        assert_eq!(compare(&Num::Float(-0.5), &int(-1)), Some(Ordering::Greater));
    }
}
