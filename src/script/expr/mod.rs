//! The `expr` sub-language: parsing and evaluation of arithmetic, logical
//! and string-comparison expressions over script values.
//!
//! Integers are arbitrary precision; `/` and `%` on integers floor toward
//! negative infinity, so the remainder takes the sign of the divisor.

mod lexer;
mod parser;
mod precedence;

#[cfg(test)]
mod expr_test;

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{FromPrimitive, One, Signed, ToPrimitive, Zero};

use self::lexer::{Op, Operand};
use self::lexer::tokenize;
use self::parser::{Expr, Parser};
use super::flow::{EvalResult, Flow, ScriptError};
use super::interp::Interp;
use super::number;
use super::obj::{Number, Obj};

/// Parse and evaluate `source` in `interp`.
pub(crate) fn evaluate(interp: &Interp, source: &str) -> EvalResult {
    let tokens = tokenize(source).map_err(Flow::error)?;
    let ast = Parser::new(tokens).parse().map_err(Flow::error)?;
    eval(interp, &ast)
}

fn divide_by_zero() -> Flow {
    Flow::Error(
        ScriptError::new("divide by zero").with_code(Obj::from_strs(&[
            "ARITH",
            "DIVZERO",
            "divide by zero",
        ])),
    )
}

fn non_numeric(value: &Obj, op: Op) -> Flow {
    let what = if value.as_str().is_empty() {
        "empty string"
    } else {
        "non-numeric string"
    };
    Flow::error(format!("can't use {what} as operand of \"{}\"", op.symbol()))
}

fn numeric(value: &Obj, op: Op) -> Result<Number, Flow> {
    value.number().ok_or_else(|| non_numeric(value, op))
}

fn integer(value: &Obj, op: Op) -> Result<BigInt, Flow> {
    match numeric(value, op)? {
        Number::Int(i) => Ok(i),
        Number::Double(_) => Err(Flow::error(format!(
            "can't use floating-point value as operand of \"{}\"",
            op.symbol()
        ))),
    }
}

fn truth(value: &Obj) -> Result<bool, Flow> {
    value.boolean().map_err(Flow::error)
}

fn number_obj(number: Number) -> Obj {
    match number {
        Number::Int(i) => Obj::from_int(i),
        Number::Double(d) => Obj::from_f64(d),
    }
}

fn as_f64(number: &Number) -> f64 {
    match number {
        Number::Int(i) => i.to_f64().unwrap_or(f64::NAN),
        Number::Double(d) => *d,
    }
}

fn eval(interp: &Interp, expr: &Expr) -> EvalResult {
    match expr {
        Expr::Number(text) => {
            if let Some(int) = number::parse_int(text) {
                return Ok(Obj::from_int(int));
            }
            number::parse_double(text)
                .map(Obj::from_f64)
                .ok_or_else(|| Flow::error(format!("expected number but got \"{text}\"")))
        }
        Expr::Boolean(value) => Ok(Obj::from_int(i64::from(*value))),
        Expr::Operand(operand) => match operand {
            Operand::Var(part) => interp.subst_parts(std::slice::from_ref(part)),
            Operand::Script(script) => interp.eval_script(script),
            Operand::Quoted(parts) => interp.subst_parts(parts),
            Operand::Braced(text) => Ok(Obj::new(text.as_str())),
        },
        Expr::Unary(op, operand) => {
            let value = eval(interp, operand)?;
            unary(*op, &value)
        }
        Expr::Binary(Op::And, left, right) => {
            let result = truth(&eval(interp, left)?)? && truth(&eval(interp, right)?)?;
            Ok(Obj::from_int(i64::from(result)))
        }
        Expr::Binary(Op::Or, left, right) => {
            let result = truth(&eval(interp, left)?)? || truth(&eval(interp, right)?)?;
            Ok(Obj::from_int(i64::from(result)))
        }
        Expr::Binary(op, left, right) => {
            let left = eval(interp, left)?;
            let right = eval(interp, right)?;
            binary(*op, &left, &right)
        }
        Expr::Ternary(condition, then, otherwise) => {
            if truth(&eval(interp, condition)?)? {
                eval(interp, then)
            } else {
                eval(interp, otherwise)
            }
        }
        Expr::Call(name, args) => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval(interp, arg)?);
            }
            call_function(name, &values)
        }
    }
}

fn unary(op: Op, value: &Obj) -> EvalResult {
    match op {
        Op::Not => Ok(Obj::from_int(i64::from(!truth(value)?))),
        Op::BitNot => Ok(Obj::from_int(-integer(value, op)? - 1)),
        Op::Sub => Ok(number_obj(match numeric(value, op)? {
            Number::Int(i) => Number::Int(-i),
            Number::Double(d) => Number::Double(-d),
        })),
        Op::Add => Ok(number_obj(numeric(value, op)?)),
        _ => Err(Flow::error(format!(
            "syntax error in expression: unexpected operator {}",
            op.symbol()
        ))),
    }
}

fn compare(left: &Obj, right: &Obj) -> Ordering {
    match (left.number(), right.number()) {
        (Some(Number::Int(a)), Some(Number::Int(b))) => a.cmp(&b),
        (Some(a), Some(b)) => as_f64(&a)
            .partial_cmp(&as_f64(&b))
            .unwrap_or(Ordering::Equal),
        _ => left.as_str().cmp(right.as_str()),
    }
}

fn binary(op: Op, left: &Obj, right: &Obj) -> EvalResult {
    let flag = |b: bool| Ok(Obj::from_int(i64::from(b)));

    match op {
        Op::Eq => flag(compare(left, right) == Ordering::Equal),
        Op::Ne => flag(compare(left, right) != Ordering::Equal),
        Op::Lt => flag(compare(left, right) == Ordering::Less),
        Op::Gt => flag(compare(left, right) == Ordering::Greater),
        Op::Le => flag(compare(left, right) != Ordering::Greater),
        Op::Ge => flag(compare(left, right) != Ordering::Less),
        Op::StrEq => flag(left.as_str() == right.as_str()),
        Op::StrNe => flag(left.as_str() != right.as_str()),
        Op::In | Op::Ni => {
            let found = right.with_list(|items| items.iter().any(|item| item.as_str() == left.as_str()))?;
            flag(found == (op == Op::In))
        }
        Op::BitAnd => Ok(Obj::from_int(integer(left, op)? & integer(right, op)?)),
        Op::BitOr => Ok(Obj::from_int(integer(left, op)? | integer(right, op)?)),
        Op::BitXor => Ok(Obj::from_int(integer(left, op)? ^ integer(right, op)?)),
        Op::Shl | Op::Shr => {
            let value = integer(left, op)?;
            let shift = integer(right, op)?;
            if shift.is_negative() {
                return Err(Flow::error("negative shift argument"));
            }
            let shift = shift
                .to_usize()
                .ok_or_else(|| Flow::error("integer value too large to represent"))?;
            Ok(Obj::from_int(if op == Op::Shl {
                value << shift
            } else {
                value >> shift
            }))
        }
        Op::Mod => {
            let a = integer(left, op)?;
            let b = integer(right, op)?;
            if b.is_zero() {
                return Err(divide_by_zero());
            }
            Ok(Obj::from_int(a.mod_floor(&b)))
        }
        Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Pow => {
            let a = numeric(left, op)?;
            let b = numeric(right, op)?;
            arithmetic(op, a, b).map(number_obj)
        }
        Op::And | Op::Or | Op::Not | Op::BitNot => Err(Flow::error(format!(
            "syntax error in expression: unexpected operator {}",
            op.symbol()
        ))),
    }
}

fn arithmetic(op: Op, a: Number, b: Number) -> Result<Number, Flow> {
    if let (Number::Int(a), Number::Int(b)) = (&a, &b) {
        return match op {
            Op::Add => Ok(Number::Int(a + b)),
            Op::Sub => Ok(Number::Int(a - b)),
            Op::Mul => Ok(Number::Int(a * b)),
            Op::Div => {
                if b.is_zero() {
                    return Err(divide_by_zero());
                }
                Ok(Number::Int(a.div_floor(b)))
            }
            _ => int_power(a, b).map(Number::Int),
        };
    }

    let (x, y) = (as_f64(&a), as_f64(&b));
    Ok(Number::Double(match op {
        Op::Add => x + y,
        Op::Sub => x - y,
        Op::Mul => x * y,
        Op::Div => x / y,
        _ => x.powf(y),
    }))
}

fn int_power(base: &BigInt, exponent: &BigInt) -> Result<BigInt, Flow> {
    if exponent.is_negative() {
        if base.is_zero() {
            return Err(Flow::error("exponentiation of zero by negative power"));
        }
        if base.is_one() {
            return Ok(BigInt::one());
        }
        if *base == BigInt::from(-1) {
            return Ok(if exponent.is_even() {
                BigInt::one()
            } else {
                BigInt::from(-1)
            });
        }
        return Ok(BigInt::zero());
    }
    let exponent = exponent
        .to_u32()
        .ok_or_else(|| Flow::error("exponent too large"))?;
    Ok(num_traits::pow(base.clone(), exponent as usize))
}

fn arity(name: &str, args: &[Obj], expected: usize) -> Result<(), Flow> {
    if args.len() == expected {
        Ok(())
    } else if args.len() > expected {
        Err(Flow::error(format!("too many arguments for math function \"{name}\"")))
    } else {
        Err(Flow::error(format!("too few arguments for math function \"{name}\"")))
    }
}

fn function_arg(name: &str, value: &Obj) -> Result<Number, Flow> {
    value.number().ok_or_else(|| {
        Flow::error(format!(
            "expected number but got \"{}\" in call to \"{name}\"",
            value.as_str()
        ))
    })
}

fn call_function(name: &str, args: &[Obj]) -> EvalResult {
    match name {
        "abs" => {
            arity(name, args, 1)?;
            Ok(number_obj(match function_arg(name, &args[0])? {
                Number::Int(i) => Number::Int(i.abs()),
                Number::Double(d) => Number::Double(d.abs()),
            }))
        }
        "int" | "wide" | "entier" => {
            arity(name, args, 1)?;
            match function_arg(name, &args[0])? {
                Number::Int(i) => Ok(Obj::from_int(i)),
                Number::Double(d) => double_to_int(d.trunc()),
            }
        }
        "round" => {
            arity(name, args, 1)?;
            match function_arg(name, &args[0])? {
                Number::Int(i) => Ok(Obj::from_int(i)),
                Number::Double(d) => double_to_int(d.round()),
            }
        }
        "double" => {
            arity(name, args, 1)?;
            Ok(Obj::from_f64(as_f64(&function_arg(name, &args[0])?)))
        }
        "floor" | "ceil" | "sqrt" => {
            arity(name, args, 1)?;
            let x = as_f64(&function_arg(name, &args[0])?);
            Ok(Obj::from_f64(match name {
                "floor" => x.floor(),
                "ceil" => x.ceil(),
                _ => x.sqrt(),
            }))
        }
        "pow" => {
            arity(name, args, 2)?;
            let x = as_f64(&function_arg(name, &args[0])?);
            let y = as_f64(&function_arg(name, &args[1])?);
            Ok(Obj::from_f64(x.powf(y)))
        }
        "bool" => {
            arity(name, args, 1)?;
            Ok(Obj::from_int(i64::from(truth(&args[0])?)))
        }
        "min" | "max" => {
            if args.is_empty() {
                return Err(Flow::error(format!("too few arguments for math function \"{name}\"")));
            }
            let mut best = args[0].clone();
            function_arg(name, &best)?;
            for candidate in &args[1..] {
                function_arg(name, candidate)?;
                let ordering = compare(candidate, &best);
                let better = if name == "min" {
                    ordering == Ordering::Less
                } else {
                    ordering == Ordering::Greater
                };
                if better {
                    best = candidate.clone();
                }
            }
            Ok(number_obj(function_arg(name, &best)?))
        }
        _ => Err(Flow::error(format!("invalid command name \"tcl::mathfunc::{name}\""))),
    }
}

fn double_to_int(value: f64) -> EvalResult {
    BigInt::from_f64(value)
        .map(Obj::from_int)
        .ok_or_else(|| Flow::error("integer value too large to represent"))
}
