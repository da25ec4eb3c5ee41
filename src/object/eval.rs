//! Tree-walking evaluation of parsed source against a context's globals.

use indexmap::{IndexMap, IndexSet};
use tracing::trace;

use super::context::Context;
use super::exception::{ExcKind, Exception, is_exception_class};
use super::native::{BinOp, CallArgs};
use super::ops;
use super::syntax::ast::{Argument, BoolOp, Comparison, Expr, Prefix, Statement, StatementKind};
use super::syntax::{parse_expression, parse_program};
use super::types::TypeObject;
use super::value::{Slice, Value};

pub fn eval_expression(ctx: &Context, source: &str) -> Result<Value, Exception> {
    let expr = parse_expression(source)?;
    Evaluator { ctx }
        .expression(&expr)
        .map_err(|error| error.with_frame(frame(1)))
}

pub fn exec_statements(ctx: &Context, source: &str) -> Result<(), Exception> {
    let program = parse_program(source)?;
    trace!(context = ctx.id(), statements = program.len(), "exec");
    let evaluator = Evaluator { ctx };
    for statement in &program {
        evaluator
            .statement(statement)
            .map_err(|error| error.with_frame(frame(statement.line)))?;
    }
    Ok(())
}

fn frame(line: usize) -> String {
    format!("File \"<string>\", line {line}, in <module>")
}

struct Evaluator<'a> {
    ctx: &'a Context,
}

impl Evaluator<'_> {
    fn statement(&self, statement: &Statement) -> Result<(), Exception> {
        match &statement.kind {
            StatementKind::Expression(expr) => {
                self.expression(expr)?;
            }
            StatementKind::Assign { targets, value } => {
                let value = self.expression(value)?;
                for target in targets {
                    self.assign(target, value.clone())?;
                }
            }
            StatementKind::AugAssign {
                target,
                operator,
                value,
            } => self.augmented_assign(target, *operator, value)?,
            StatementKind::Import { module, alias } => {
                let loaded = self.ctx.import(module)?;
                let name = alias.as_deref().unwrap_or(module);
                self.ctx.globals().set(name, Value::Module(loaded));
            }
            StatementKind::ImportFrom { module, names } => {
                let loaded = self.ctx.import(module)?;
                for (name, alias) in names {
                    let value = loaded.get(name).ok_or_else(|| {
                        Exception::new(
                            ExcKind::ImportError,
                            format!("cannot import name '{name}' from '{module}'"),
                        )
                    })?;
                    self.ctx
                        .globals()
                        .set(alias.as_deref().unwrap_or(name), value);
                }
            }
            StatementKind::Del(targets) => {
                for target in targets {
                    self.delete(target)?;
                }
            }
            StatementKind::Raise(expr) => return Err(self.raise(expr.as_ref())?),
            StatementKind::Pass => {}
        }
        Ok(())
    }

    /// The exception a `raise` statement throws.
    fn raise(&self, expr: Option<&Expr>) -> Result<Exception, Exception> {
        let Some(expr) = expr else {
            return Ok(Exception::new(
                ExcKind::RuntimeError,
                "No active exception to reraise",
            ));
        };
        let value = self.expression(expr)?;
        match &value {
            Value::Exception(exception) => Ok((**exception).clone()),
            Value::Type(TypeObject::Class(class)) if is_exception_class(class) => {
                match ops::call(self.ctx, &value, CallArgs::default())? {
                    Value::Exception(exception) => Ok((*exception).clone()),
                    _ => Ok(Exception::with_args(class.clone(), Vec::new())),
                }
            }
            _ => Ok(Exception::type_error(
                "exceptions must derive from BaseException",
            )),
        }
    }

    fn assign(&self, target: &Expr, value: Value) -> Result<(), Exception> {
        match target {
            Expr::Name(name) => {
                self.ctx.globals().set(name, value);
                Ok(())
            }
            Expr::Attribute { object, name } => {
                let object = self.expression(object)?;
                ops::set_attr(&object, name, value)
            }
            Expr::Subscript { object, index } => {
                let object = self.expression(object)?;
                let index = self.expression(index)?;
                ops::set_item(&object, &index, value)
            }
            Expr::Tuple(targets) | Expr::List(targets) => {
                let values = ops::collect(&value)?;
                if values.len() > targets.len() {
                    return Err(Exception::value_error(format!(
                        "too many values to unpack (expected {})",
                        targets.len()
                    )));
                }
                if values.len() < targets.len() {
                    return Err(Exception::value_error(format!(
                        "not enough values to unpack (expected {}, got {})",
                        targets.len(),
                        values.len()
                    )));
                }
                for (target, value) in targets.iter().zip(values) {
                    self.assign(target, value)?;
                }
                Ok(())
            }
            _ => Err(Exception::new(ExcKind::SyntaxError, "cannot assign to expression")),
        }
    }

    // The container and index are evaluated once.
    fn augmented_assign(&self, target: &Expr, operator: BinOp, value: &Expr) -> Result<(), Exception> {
        match target {
            Expr::Name(name) => {
                let current = self.ctx.lookup(name)?;
                let result = ops::inplace(operator, &current, &self.expression(value)?)?;
                self.ctx.globals().set(name, result);
                Ok(())
            }
            Expr::Attribute { object, name } => {
                let object = self.expression(object)?;
                let current = ops::get_attr(&object, name)?;
                let result = ops::inplace(operator, &current, &self.expression(value)?)?;
                ops::set_attr(&object, name, result)
            }
            Expr::Subscript { object, index } => {
                let object = self.expression(object)?;
                let index = self.expression(index)?;
                let current = ops::get_item(&object, &index)?;
                let result = ops::inplace(operator, &current, &self.expression(value)?)?;
                ops::set_item(&object, &index, result)
            }
            _ => Err(Exception::new(
                ExcKind::SyntaxError,
                "illegal expression for augmented assignment",
            )),
        }
    }

    fn delete(&self, target: &Expr) -> Result<(), Exception> {
        match target {
            Expr::Name(name) => match self.ctx.globals().remove(name) {
                Some(_) => Ok(()),
                None => Err(Exception::new(
                    ExcKind::NameError,
                    format!("name '{name}' is not defined"),
                )),
            },
            Expr::Subscript { object, index } => {
                let object = self.expression(object)?;
                let index = self.expression(index)?;
                ops::del_item(&object, &index)
            }
            Expr::Attribute { object, name } => match self.expression(object)? {
                Value::Module(module) => match module.remove(name) {
                    Some(_) => Ok(()),
                    None => Err(Exception::new(
                        ExcKind::AttributeError,
                        format!("module '{}' has no attribute '{name}'", module.name),
                    )),
                },
                other => Err(Exception::new(
                    ExcKind::AttributeError,
                    format!(
                        "'{}' object attribute '{name}' cannot be deleted",
                        other.type_name()
                    ),
                )),
            },
            _ => Err(Exception::new(ExcKind::SyntaxError, "cannot delete expression")),
        }
    }

    fn expression(&self, expr: &Expr) -> Result<Value, Exception> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Name(name) => self.ctx.lookup(name),
            Expr::List(items) => Ok(Value::list(self.expressions(items)?)),
            Expr::Tuple(items) => Ok(Value::tuple(self.expressions(items)?)),
            Expr::Set(items) => {
                let mut set = IndexSet::new();
                for item in items {
                    set.insert(ops::hash_key(&self.expression(item)?)?);
                }
                Ok(Value::set(set))
            }
            Expr::Dict(entries) => {
                let mut map = IndexMap::new();
                for (key, value) in entries {
                    let key = ops::hash_key(&self.expression(key)?)?;
                    map.insert(key, self.expression(value)?);
                }
                Ok(Value::dict(map))
            }
            Expr::Attribute { object, name } => ops::get_attr(&self.expression(object)?, name),
            Expr::Subscript { object, index } => {
                let object = self.expression(object)?;
                ops::get_item(&object, &self.expression(index)?)
            }
            Expr::Slice { start, stop, step } => {
                let bound = |part: &Option<Box<Expr>>| match part {
                    Some(expr) => self.expression(expr),
                    None => Ok(Value::None),
                };
                Ok(Value::Slice(std::rc::Rc::new(Slice {
                    start: bound(start)?,
                    stop: bound(stop)?,
                    step: bound(step)?,
                })))
            }
            Expr::Call {
                function,
                arguments,
            } => {
                let function = self.expression(function)?;
                let args = self.arguments(arguments)?;
                ops::call(self.ctx, &function, args)
            }
            Expr::Prefix { operator, operand } => {
                let operand = self.expression(operand)?;
                match operator {
                    Prefix::Not => Ok(Value::Bool(!ops::truthy(&operand)?)),
                    Prefix::Op(op) => ops::unary(*op, &operand),
                }
            }
            Expr::Infix {
                operator,
                left,
                right,
            } => {
                let left = self.expression(left)?;
                let right = self.expression(right)?;
                ops::binary(*operator, &left, &right)
            }
            Expr::Compare { left, chain } => self.compare(left, chain),
            Expr::Bool {
                operator,
                left,
                right,
            } => {
                let left = self.expression(left)?;
                let decided = match operator {
                    BoolOp::And => !ops::truthy(&left)?,
                    BoolOp::Or => ops::truthy(&left)?,
                };
                if decided {
                    Ok(left)
                } else {
                    self.expression(right)
                }
            }
            Expr::Conditional {
                condition,
                consequence,
                alternative,
            } => {
                if ops::truthy(&self.expression(condition)?)? {
                    self.expression(consequence)
                } else {
                    self.expression(alternative)
                }
            }
        }
    }

    fn expressions(&self, items: &[Expr]) -> Result<Vec<Value>, Exception> {
        items.iter().map(|item| self.expression(item)).collect()
    }

    /// `a < b < c` evaluates `b` once and stops at the first false link.
    fn compare(&self, left: &Expr, chain: &[(Comparison, Expr)]) -> Result<Value, Exception> {
        let mut left = self.expression(left)?;
        let mut result = Value::Bool(true);
        for (comparison, right) in chain {
            let right = self.expression(right)?;
            result = match comparison {
                Comparison::Op(op) => ops::compare(*op, &left, &right)?,
                Comparison::In => Value::Bool(ops::contains(&right, &left)?),
                Comparison::NotIn => Value::Bool(!ops::contains(&right, &left)?),
                Comparison::Is => Value::Bool(left.is(&right)),
                Comparison::IsNot => Value::Bool(!left.is(&right)),
            };
            if !ops::truthy(&result)? {
                return Ok(result);
            }
            left = right;
        }
        Ok(result)
    }

    fn arguments(&self, arguments: &[Argument]) -> Result<CallArgs, Exception> {
        let mut args = CallArgs::default();
        for argument in arguments {
            match argument {
                Argument::Positional(expr) => args.positional.push(self.expression(expr)?),
                Argument::Star(expr) => args.positional.extend(ops::collect(&self.expression(expr)?)?),
                Argument::Keyword(name, expr) => {
                    args.keywords.insert(name.clone(), self.expression(expr)?);
                }
                Argument::DoubleStar(expr) => {
                    let mapping = self.expression(expr)?;
                    for key in ops::collect(&mapping)? {
                        let Value::Str(name) = &key else {
                            return Err(Exception::type_error("keywords must be strings"));
                        };
                        if args.keywords.contains_key(&**name) {
                            return Err(Exception::type_error(format!(
                                "got multiple values for keyword argument '{name}'"
                            )));
                        }
                        let value = ops::get_item(&mapping, &key)?;
                        args.keywords.insert(name.to_string(), value);
                    }
                }
            }
        }
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::context::Runtime;

    fn eval(runtime: &Runtime, source: &str) -> Value {
        runtime.root().eval(source).unwrap()
    }

    fn repr(runtime: &Runtime, source: &str) -> String {
        ops::repr(&eval(runtime, source))
    }

    #[test]
    fn expressions_follow_python_semantics() {
        let rt = Runtime::new();
        assert_eq!(repr(&rt, "1 + 2 * 3"), "7");
        assert_eq!(repr(&rt, "7 / 2"), "3.5");
        assert_eq!(repr(&rt, "-7 // 2, -7 % 2"), "(-4, 1)");
        assert_eq!(repr(&rt, "2 ** 100"), "1267650600228229401496703205376");
        assert_eq!(repr(&rt, "[1, 2] + [3]"), "[1, 2, 3]");
        assert_eq!(repr(&rt, "'ab' * 2"), "'abab'");
        assert_eq!(repr(&rt, "1 < 2 < 3, 3 < 2 < 1"), "(True, False)");
        assert_eq!(repr(&rt, "0 or 'x', 1 and []"), "('x', [])");
        assert_eq!(repr(&rt, "'yes' if 2 in [1, 2] else 'no'"), "'yes'");
        assert_eq!(repr(&rt, "{'a': 1}['a']"), "1");
        assert_eq!(repr(&rt, "'hello'[1:3]"), "'el'");
        assert_eq!(repr(&rt, "None is None"), "True");
    }

    #[test]
    fn statements_bind_globals() {
        let rt = Runtime::new();
        let ctx = rt.root();
        ctx.exec("x = [1, 2]\nx += [3]\na, b = 'ab'\nd = {}\nd['k'] = a\n")
            .unwrap();
        assert_eq!(repr(&rt, "x"), "[1, 2, 3]");
        assert_eq!(repr(&rt, "d"), "{'k': 'a'}");
        ctx.exec("del d['k']; del b").unwrap();
        assert_eq!(repr(&rt, "d"), "{}");
        assert!(ctx.eval("b").unwrap_err().is(ExcKind::NameError));
    }

    #[test]
    fn augmented_assignment_mutates_lists_in_place() {
        let rt = Runtime::new();
        let ctx = rt.root();
        ctx.exec("x = [1]\ny = x\nx += [2]").unwrap();
        assert_eq!(repr(&rt, "y"), "[1, 2]");
        ctx.exec("n = 1\nm = n\nn += 1").unwrap();
        assert_eq!(repr(&rt, "m, n"), "(1, 2)");
    }

    #[test]
    fn imports() {
        let rt = Runtime::new();
        let ctx = rt.root();
        ctx.exec("import math\nfrom math import sqrt as root").unwrap();
        assert_eq!(repr(&rt, "root(16.0)"), "4.0");
        assert_eq!(repr(&rt, "math.floor(2.5)"), "2");
        let error = ctx.exec("from math import nope").unwrap_err();
        assert_eq!(error.message(), "cannot import name 'nope' from 'math'");
        assert!(ctx.exec("import nope").unwrap_err().is(ExcKind::ModuleNotFoundError));
    }

    #[test]
    fn raise_records_the_line() {
        let rt = Runtime::new();
        let ctx = rt.root();
        let error = ctx.exec("x = 1\nraise ValueError('bad', 2)").unwrap_err();
        assert!(error.is(ExcKind::ValueError));
        assert_eq!(error.message(), "('bad', 2)");
        assert_eq!(error.traceback, vec![frame(2)]);

        let error = ctx.exec("raise KeyError").unwrap_err();
        assert!(error.is(ExcKind::KeyError));
        let error = ctx.exec("raise 5").unwrap_err();
        assert_eq!(error.message(), "exceptions must derive from BaseException");
    }

    #[test]
    fn unpacking_checks_lengths() {
        let rt = Runtime::new();
        let error = rt.root().exec("a, b = [1, 2, 3]").unwrap_err();
        assert_eq!(error.message(), "too many values to unpack (expected 2)");
        let error = rt.root().exec("a, b, c = (1, 2)").unwrap_err();
        assert_eq!(error.message(), "not enough values to unpack (expected 3, got 2)");
    }

    #[test]
    fn calls_accept_keywords_and_unpacking() {
        let rt = Runtime::new();
        let ctx = rt.root();
        ctx.exec("args = [3, 1, 2]").unwrap();
        assert_eq!(repr(&rt, "sorted(args, reverse=True)"), "[3, 2, 1]");
        assert_eq!(repr(&rt, "max(*args)"), "3");
        assert_eq!(repr(&rt, "dict(**{'a': 1})"), "{'a': 1}");
        assert_eq!(repr(&rt, "1 == 1.0"), "True");
    }
}
