//! Object-runtime entry points into the script runtime.
//!
//! A [`Session`] runs script operations in one paired interpreter, with
//! the runtime switched to that interpreter's context for the duration
//! of each call. The natives of the bridge module are thin wrappers over
//! these methods.

use std::io::{BufRead, Write};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::error::{BridgeError, Result};
use crate::object::{ops, Context, ExcKind, Value};
use crate::script::{Interp, Obj};

use super::convert::{to_obj, to_value};
use super::exception::script_error_from_exception;
use super::lifecycle::ContextGuard;
use super::target::Target;
use super::BridgeState;

pub struct Session {
    state: Rc<BridgeState>,
    interp: Interp,
}

impl Session {
    pub fn new(state: Rc<BridgeState>, interp: Interp) -> Session {
        Session { state, interp }
    }

    pub fn interp(&self) -> &Interp {
        &self.interp
    }

    pub fn state(&self) -> &Rc<BridgeState> {
        &self.state
    }

    pub fn context(&self) -> Result<Rc<Context>> {
        self.state.context_for(&self.interp).ok_or_else(|| {
            BridgeError::Internal(format!("interpreter {} is not paired", self.interp.id()))
        })
    }

    fn enter(&self) -> Result<ContextGuard> {
        self.state.enter(&self.interp)
    }

    /// `eval(code, to=str)`: evaluate a script in the current scope.
    pub fn eval(&self, code: &str, to: Target) -> Result<Value> {
        let _guard = self.enter()?;
        debug!(interp = %self.interp.id(), "eval");
        let result = self.interp.eval(code)?;
        to_value(&result, to)
    }

    /// `exec(code)`: evaluate a script at global level, discarding the
    /// result.
    pub fn exec(&self, code: &str) -> Result<()> {
        let _guard = self.enter()?;
        debug!(interp = %self.interp.id(), "exec");
        self.interp.eval_global(code)?;
        Ok(())
    }

    pub fn expr(&self, expression: &str, to: Target) -> Result<Value> {
        let _guard = self.enter()?;
        let result = self.interp.expr(expression)?;
        to_value(&result, to)
    }

    pub fn subst(&self, template: &str, to: Target) -> Result<Value> {
        let _guard = self.enter()?;
        let result = self.interp.subst(template)?;
        to_value(&result, to)
    }

    /// `getvar(name, to=str, default=)`. A missing variable yields the
    /// default, unconverted, when one is given.
    pub fn getvar(&self, name: &str, to: Target, default: Option<&Value>) -> Result<Value> {
        let _guard = self.enter()?;
        match self.interp.get_var(name) {
            Ok(obj) => to_value(&obj, to),
            Err(message) => match default {
                Some(default) => Ok(default.clone()),
                None => Err(BridgeError::Name(message)),
            },
        }
    }

    pub fn setvar(&self, name: &str, value: &Value) -> Result<()> {
        let _guard = self.enter()?;
        self.interp
            .set_var(name, to_obj(value)?)
            .map_err(BridgeError::Value)?;
        Ok(())
    }

    pub fn exists(&self, name: &str) -> Result<bool> {
        let _guard = self.enter()?;
        Ok(self.interp.var_exists(name))
    }

    /// Unset every name; missing variables are ignored.
    pub fn unset(&self, names: &[&str]) -> Result<()> {
        let _guard = self.enter()?;
        for name in names {
            if let Err(message) = self.interp.unset_var(name) {
                trace!(%name, %message, "unset of missing variable ignored");
            }
        }
        Ok(())
    }

    /// `incr(name, by=1)`: a missing variable is created holding `by`.
    pub fn incr(&self, name: &str, by: &num_bigint::BigInt) -> Result<Value> {
        let _guard = self.enter()?;
        if !self.interp.var_exists(name) {
            self.interp
                .set_var(name, Obj::from_int(by.clone()))
                .map_err(BridgeError::Value)?;
            return Ok(Value::Int(by.clone()));
        }
        let sum = self
            .interp
            .with_var_mut(name, |obj| {
                let sum = obj.int()? + by;
                *obj = Obj::from_int(sum.clone());
                Ok(sum)
            })
            .map_err(BridgeError::Name)?
            .map_err(BridgeError::TypeCoercion)?;
        Ok(Value::Int(sum))
    }

    /// `call(command, *args, kwlist=None, to=str)`: invoke a command with
    /// pre-split words. `kwlist` pairs follow the positional arguments as
    /// `-key value`.
    pub fn call(
        &self,
        command: &Value,
        args: &[Value],
        kwlist: Option<&Value>,
        to: Target,
    ) -> Result<Value> {
        let mut words = Vec::with_capacity(args.len() + 1);
        words.push(to_obj(command)?);
        for arg in args {
            words.push(to_obj(arg)?);
        }
        if let Some(kwlist) = kwlist {
            for (key, value) in keyword_pairs(kwlist)? {
                let key = if key.starts_with('-') { key } else { format!("-{key}") };
                words.push(Obj::new(key));
                words.push(value);
            }
        }

        let _guard = self.enter()?;
        debug!(interp = %self.interp.id(), command = %words[0], "call");
        let result = self.interp.call(&words)?;
        to_value(&result, to)
    }

    /// `convert(value, to=str)`: a round trip through a script value.
    pub fn convert(&self, value: &Value, to: Target) -> Result<Value> {
        to_value(&to_obj(value)?, to)
    }

    /// Read-eval-print loop over the object runtime in this session's
    /// context. Expressions print their `repr`; anything else is executed
    /// as statements. Ends at end of input.
    pub fn interact(&self, input: &mut impl BufRead, output: &mut impl Write) -> Result<()> {
        let context = self.context()?;
        let _guard = self.enter()?;
        let config = self.state.config();
        loop {
            prompt(output, &config.prompt)?;
            let Some(source) = read_input(input, output, &config.continuation_prompt)? else {
                break;
            };
            if source.trim().is_empty() {
                continue;
            }
            let result = match context.eval(&source) {
                Err(error) if error.is(ExcKind::SyntaxError) => context.exec(&source).map(|_| Value::None),
                other => other,
            };
            match result {
                Ok(Value::None) => {}
                Ok(value) => writeln!(output, "{}", ops::repr(&value)).map_err(io_error)?,
                Err(error) => {
                    let error = script_error_from_exception(&context, &Rc::new(error));
                    writeln!(output, "{}", error.error_info()).map_err(io_error)?;
                }
            }
        }
        Ok(())
    }

    /// Read-eval-print loop over this session's interpreter.
    pub fn shell(&self, input: &mut impl BufRead, output: &mut impl Write) -> Result<()> {
        let _guard = self.enter()?;
        let config = self.state.config();
        loop {
            prompt(output, &config.prompt)?;
            let Some(source) = read_input(input, output, &config.continuation_prompt)? else {
                break;
            };
            if source.trim().is_empty() {
                continue;
            }
            match self.interp.eval_global(&source) {
                Ok(result) if result.as_str().is_empty() => {}
                Ok(result) => writeln!(output, "{result}").map_err(io_error)?,
                Err(error) => writeln!(output, "{}", error.error_info()).map_err(io_error)?,
            }
        }
        Ok(())
    }
}

/// Keyword pairs from a dict or an even-length sequence.
fn keyword_pairs(kwlist: &Value) -> Result<Vec<(String, Obj)>> {
    if let Value::Dict(map) = kwlist {
        return map
            .borrow()
            .iter()
            .map(|(key, value)| Ok((ops::str(&key.to_value())?, to_obj(value)?)))
            .collect();
    }
    let items = match kwlist.as_native::<super::Proxy>() {
        Some(proxy) => proxy
            .obj()?
            .list()
            .map_err(BridgeError::TypeCoercion)?
            .into_iter()
            .map(|obj| Value::Str(obj.text()))
            .collect(),
        None => ops::collect(kwlist)?,
    };
    if items.len() % 2 != 0 {
        return Err(BridgeError::Value(
            "kwlist must contain an even number of elements".to_string(),
        ));
    }
    items
        .chunks(2)
        .map(|pair| Ok((ops::str(&pair[0])?, to_obj(&pair[1])?)))
        .collect()
}

fn io_error(error: std::io::Error) -> BridgeError {
    BridgeError::Internal(format!("console: {error}"))
}

fn prompt(output: &mut impl Write, text: &str) -> Result<()> {
    write!(output, "{text}").map_err(io_error)?;
    output.flush().map_err(io_error)
}

/// One complete input: further lines are read while brackets are open.
fn read_input(
    input: &mut impl BufRead,
    output: &mut impl Write,
    continuation: &str,
) -> Result<Option<String>> {
    let mut source = String::new();
    let mut depth: i32 = 0;
    loop {
        let mut line = String::new();
        if input.read_line(&mut line).map_err(io_error)? == 0 {
            return Ok((!source.is_empty()).then_some(source));
        }
        for ch in line.chars() {
            match ch {
                '{' | '(' | '[' => depth += 1,
                '}' | ')' | ']' => depth -= 1,
                _ => {}
            }
        }
        source.push_str(&line);
        if depth <= 0 {
            return Ok(Some(source));
        }
        prompt(output, continuation)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::Bridge;
    use std::io::Cursor;

    #[test]
    fn variables_round_trip() {
        let bridge = Bridge::new().unwrap();
        let session = bridge.session();
        session.setvar("x", &Value::from(5_i64)).unwrap();
        assert_eq!(session.getvar("x", Target::Int, None).unwrap(), Value::from(5_i64));
        assert!(session.exists("x").unwrap());
        session.unset(&["x", "never_set"]).unwrap();
        assert!(!session.exists("x").unwrap());
        assert_eq!(
            session.getvar("x", Target::Str, Some(&Value::from(0_i64))).unwrap(),
            Value::from(0_i64)
        );
        assert!(matches!(session.getvar("x", Target::Str, None), Err(BridgeError::Name(_))));
    }

    #[test]
    fn incr_creates_missing_variables() {
        let bridge = Bridge::new().unwrap();
        let session = bridge.session();
        let by = num_bigint::BigInt::from(3);
        assert_eq!(session.incr("n", &by).unwrap(), Value::from(3_i64));
        assert_eq!(session.incr("n", &by).unwrap(), Value::from(6_i64));
        session.setvar("s", &Value::from("abc")).unwrap();
        assert!(matches!(session.incr("s", &by), Err(BridgeError::TypeCoercion(_))));
    }

    #[test]
    fn variable_access_needs_a_paired_interpreter() {
        let bridge = Bridge::new().unwrap();
        let child = bridge.interp().create_child(Some("kid")).unwrap();
        bridge.attach(&child).unwrap();
        let session = bridge.session_for(&child).unwrap();
        session.setvar("x", &Value::from(1_i64)).unwrap();
        assert!(session.exists("x").unwrap());

        child.delete();
        let by = num_bigint::BigInt::from(1);
        assert!(matches!(session.getvar("x", Target::Str, None), Err(BridgeError::Internal(_))));
        assert!(matches!(session.setvar("x", &Value::from(2_i64)), Err(BridgeError::Internal(_))));
        assert!(matches!(session.exists("x"), Err(BridgeError::Internal(_))));
        assert!(matches!(session.unset(&["x"]), Err(BridgeError::Internal(_))));
        assert!(matches!(session.incr("x", &by), Err(BridgeError::Internal(_))));
    }

    #[test]
    fn call_passes_words_without_reparsing() {
        let bridge = Bridge::new().unwrap();
        let session = bridge.session();
        let result = session
            .call(&Value::from("list"), &[Value::from("a b"), Value::from("$x")], None, Target::List)
            .unwrap();
        assert_eq!(ops::repr(&result), "['a b', '$x']");

        let kwlist = Value::list(vec![Value::from("to"), Value::from(1_i64)]);
        let result = session
            .call(&Value::from("list"), &[], Some(&kwlist), Target::Str)
            .unwrap();
        assert_eq!(result, Value::from("-to 1"));
    }

    #[test]
    fn shell_prints_results_and_errors() {
        let bridge = Bridge::new().unwrap();
        let session = bridge.session();
        let mut input = Cursor::new("set x {a\nb}\nerror boom\n");
        let mut output = Vec::new();
        session.shell(&mut input, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("a\nb\n"));
        assert!(text.contains("boom"));
    }

    #[test]
    fn interact_evaluates_expressions_and_statements() {
        let bridge = Bridge::new().unwrap();
        let session = bridge.session();
        let mut input = Cursor::new("x = 2\nx * 21\n1 / 0\n");
        let mut output = Vec::new();
        session.interact(&mut input, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("42\n"));
        assert!(text.contains("division by zero"));
    }
}
