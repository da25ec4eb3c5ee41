use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::script::flow::Flow;
use crate::script::obj::Obj;

pub(crate) fn wrong_args(objv: &[Obj], usage: &str) -> Flow {
    let name = objv.first().map(Obj::as_str).unwrap_or_default();
    if usage.is_empty() {
        Flow::error(format!("wrong # args: should be \"{name}\""))
    } else {
        Flow::error(format!("wrong # args: should be \"{name} {usage}\""))
    }
}

/// Accept between `min` and `max` words after the command name.
pub(crate) fn check_args(objv: &[Obj], min: usize, max: usize, usage: &str) -> Result<(), Flow> {
    let argc = objv.len().saturating_sub(1);
    if argc < min || argc > max {
        return Err(wrong_args(objv, usage));
    }
    Ok(())
}

pub(super) fn sub_args(objv: &[Obj], min: usize, max: usize, usage: &str) -> Result<(), Flow> {
    let argc = objv.len().saturating_sub(2);
    if argc < min || argc > max {
        return Err(Flow::error(format!(
            "wrong # args: should be \"{} {} {usage}\"",
            objv[0].as_str(),
            objv[1].as_str()
        )));
    }
    Ok(())
}

pub(super) fn arg_int(obj: &Obj) -> Result<i64, Flow> {
    Ok(obj.i64()?)
}

pub(super) fn bad_option(kind: &str, given: &str, options: &[&str]) -> Flow {
    let mut listed = String::new();
    for (i, option) in options.iter().enumerate() {
        if i > 0 {
            listed.push_str(if i + 1 == options.len() { ", or " } else { ", " });
        }
        listed.push_str(option);
    }
    Flow::error(format!("bad {kind} \"{given}\": must be {listed}"))
}

/// Resolve `end`, `end-N`, `N+M` and plain integers against a length.
pub(super) fn parse_index(obj: &Obj, len: usize) -> Result<i64, Flow> {
    let text = obj.as_str().trim();
    let end = len as i64 - 1;
    if text == "end" {
        return Ok(end);
    }
    if let Some(offset) = text.strip_prefix("end") {
        return offset_value(offset)
            .map(|delta| end + delta)
            .ok_or_else(|| index_error(text));
    }
    if let Ok(value) = text.parse::<i64>() {
        return Ok(value);
    }
    if let Some(split) = text
        .char_indices()
        .skip(1)
        .find(|(_, c)| matches!(c, '+' | '-'))
        .map(|(i, _)| i)
    {
        let (base, offset) = text.split_at(split);
        if let (Ok(base), Some(delta)) = (base.parse::<i64>(), offset_value(offset)) {
            return Ok(base + delta);
        }
    }
    Err(index_error(text))
}

fn offset_value(offset: &str) -> Option<i64> {
    if let Some(rest) = offset.strip_prefix('+') {
        rest.parse().ok()
    } else if let Some(rest) = offset.strip_prefix('-') {
        rest.parse::<i64>().ok().map(|v| -v)
    } else {
        None
    }
}

fn index_error(text: &str) -> Flow {
    Flow::error(format!(
        "bad index \"{text}\": must be integer?[+-]integer? or end?[+-]integer?"
    ))
}

/// Clamp a resolved index into `0..=len`.
pub(super) fn clamp(index: i64, len: usize) -> usize {
    index.clamp(0, len as i64) as usize
}

pub(super) fn big_to_i64(value: &BigInt) -> Result<i64, Flow> {
    value
        .to_i64()
        .ok_or_else(|| Flow::error("integer value too large to represent"))
}
