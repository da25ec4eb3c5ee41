use crate::script::expr;
use crate::script::flow::{EvalResult, Flow, ReturnCode, ReturnFlow, ScriptError};
use crate::script::interp::{Interp, Param};
use crate::script::obj::{DictMap, Obj};
use crate::script::parser::SubstFlags;

use super::helpers::{arg_int, bad_option, check_args, sub_args, wrong_args};

fn condition(interp: &Interp, expression: &Obj) -> Result<bool, Flow> {
    Ok(expr::evaluate(interp, expression.as_str())?.boolean()?)
}

/// Run a loop body; `Ok(false)` means the loop was broken out of.
fn loop_body(interp: &Interp, body: &Obj) -> Result<bool, Flow> {
    match interp.eval_script(body.as_str()) {
        Ok(_) | Err(Flow::Continue) => Ok(true),
        Err(Flow::Break) => Ok(false),
        Err(other) => Err(other),
    }
}

fn concat_words(words: &[Obj]) -> String {
    let trimmed: Vec<&str> = words
        .iter()
        .map(|w| w.as_str().trim())
        .filter(|w| !w.is_empty())
        .collect();
    trimmed.join(" ")
}

pub(super) fn cmd_if(interp: &Interp, objv: &[Obj]) -> EvalResult {
    let mut i = 1;
    loop {
        let Some(test) = objv.get(i) else {
            return Err(Flow::error(format!(
                "wrong # args: no expression after \"{}\" argument",
                objv[i - 1].as_str()
            )));
        };
        let truth = condition(interp, test)?;
        i += 1;
        if objv.get(i).map(Obj::as_str) == Some("then") {
            i += 1;
        }
        let Some(body) = objv.get(i) else {
            return Err(Flow::error(format!(
                "wrong # args: no script following \"{}\" argument",
                objv[i - 1].as_str()
            )));
        };
        if truth {
            return interp.eval_script(body.as_str());
        }
        i += 1;
        match objv.get(i).map(Obj::as_str) {
            None => return Ok(Obj::empty()),
            Some("elseif") => i += 1,
            Some("else") => {
                let body = objv.get(i + 1).ok_or_else(|| {
                    Flow::error("wrong # args: no script following \"else\" argument")
                })?;
                return interp.eval_script(body.as_str());
            }
            Some(body) => return interp.eval_script(body),
        }
    }
}

pub(super) fn cmd_while(interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 2, 2, "test command")?;
    while condition(interp, &objv[1])? {
        if !loop_body(interp, &objv[2])? {
            break;
        }
    }
    Ok(Obj::empty())
}

pub(super) fn cmd_for(interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 4, 4, "start test next command")?;
    interp.eval_script(objv[1].as_str())?;
    while condition(interp, &objv[2])? {
        if !loop_body(interp, &objv[4])? {
            break;
        }
        match interp.eval_script(objv[3].as_str()) {
            Ok(_) => {}
            Err(Flow::Break) => break,
            Err(other) => return Err(other),
        }
    }
    Ok(Obj::empty())
}

pub(super) fn cmd_foreach(interp: &Interp, objv: &[Obj]) -> EvalResult {
    if objv.len() < 4 || objv.len() % 2 != 0 {
        return Err(wrong_args(objv, "varList list ?varList list ...? command"));
    }
    let body = &objv[objv.len() - 1];

    let mut groups = Vec::new();
    let mut iterations = 0;
    for pair in objv[1..objv.len() - 1].chunks(2) {
        let vars = pair[0].list()?;
        if vars.is_empty() {
            return Err(Flow::error("foreach varlist is empty"));
        }
        let values = pair[1].list()?;
        iterations = iterations.max(values.len().div_ceil(vars.len()));
        groups.push((vars, values));
    }

    for iteration in 0..iterations {
        for (vars, values) in &groups {
            for (offset, var) in vars.iter().enumerate() {
                let value = values
                    .get(iteration * vars.len() + offset)
                    .cloned()
                    .unwrap_or_else(Obj::empty);
                interp.set_var(var.as_str(), value)?;
            }
        }
        if !loop_body(interp, body)? {
            break;
        }
    }
    Ok(Obj::empty())
}

pub(super) fn cmd_break(_interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 0, 0, "")?;
    Err(Flow::Break)
}

pub(super) fn cmd_continue(_interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 0, 0, "")?;
    Err(Flow::Continue)
}

pub(super) fn cmd_return(_interp: &Interp, objv: &[Obj]) -> EvalResult {
    let mut flow = ReturnFlow {
        value: Obj::empty(),
        code: ReturnCode::Ok,
        level: 1,
        error_code: None,
        error_info: None,
    };

    let mut args = &objv[1..];
    if args.len() % 2 == 1 {
        flow.value = args[args.len() - 1].clone();
        args = &args[..args.len() - 1];
    }
    for pair in args.chunks(2) {
        let value = &pair[1];
        match pair[0].as_str() {
            "-code" => {
                flow.code = match value.i64() {
                    Ok(n) => ReturnCode::parse(&n.to_string())?,
                    Err(_) => ReturnCode::parse(value.as_str())?,
                }
            }
            "-level" => {
                let level = arg_int(value)?;
                if level < 0 {
                    return Err(Flow::error(format!(
                        "bad -level value: expected non-negative integer but got \"{value}\""
                    )));
                }
                flow.level = level as usize;
            }
            "-errorcode" => flow.error_code = Some(value.clone()),
            "-errorinfo" => flow.error_info = Some(value.to_string()),
            "-options" => {
                for (key, option) in value.with_dict(|map| map.clone())? {
                    match &*key {
                        "-code" => flow.code = ReturnCode::parse(option.as_str())?,
                        "-errorcode" => flow.error_code = Some(option),
                        "-errorinfo" => flow.error_info = Some(option.to_string()),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    if flow.level == 0 {
        flow.level = 1;
        return Flow::Return(Box::new(flow)).complete();
    }
    Err(Flow::Return(Box::new(flow)))
}

pub(super) fn cmd_error(_interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 1, 3, "message ?errorInfo? ?errorCode?")?;
    let mut error = ScriptError::new(objv[1].clone());
    if let Some(info) = objv.get(2).filter(|info| !info.as_str().is_empty()) {
        error = error.with_info(info.as_str());
    }
    if let Some(code) = objv.get(3) {
        error = error.with_code(code.clone());
    }
    Err(Flow::Error(error))
}

fn options_dict(code: i64, level: i64) -> Obj {
    let mut map = DictMap::new();
    map.insert("-code".into(), Obj::from_int(code));
    map.insert("-level".into(), Obj::from_int(level));
    Obj::from_dict(map)
}

pub(super) fn cmd_catch(interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 1, 3, "script ?resultVarName? ?optionVarName?")?;

    let (code, result, options) = match interp.eval_script(objv[1].as_str()) {
        Ok(value) => (0, value, options_dict(0, 0)),
        Err(Flow::Error(error)) => {
            interp.set_var("::errorInfo", Obj::new(error.error_info()))?;
            interp.set_var("::errorCode", error.code.clone())?;
            let options = error.return_options();
            (1, error.message, options)
        }
        Err(Flow::Return(ret)) => {
            let mut options = options_dict(ret.code.as_int(), ret.level as i64);
            if let Some(code) = &ret.error_code {
                options.dict_put_path(&[Obj::new("-errorcode")], code.clone())?;
            }
            (2, ret.value, options)
        }
        Err(Flow::Break) => (3, Obj::empty(), options_dict(3, 0)),
        Err(Flow::Continue) => (4, Obj::empty(), options_dict(4, 0)),
    };

    if let Some(var) = objv.get(2) {
        interp.set_var(var.as_str(), result)?;
    }
    if let Some(var) = objv.get(3) {
        interp.set_var(var.as_str(), options)?;
    }
    Ok(Obj::from_int(code))
}

pub(super) fn cmd_proc(interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 3, 3, "name args body")?;
    let mut params = Vec::new();
    for spec in objv[2].list()? {
        let parts = spec.list()?;
        match parts.as_slice() {
            [name] => params.push(Param {
                name: name.to_string(),
                default: None,
            }),
            [name, default] => params.push(Param {
                name: name.to_string(),
                default: Some(default.clone()),
            }),
            [] => {
                return Err(Flow::error(format!(
                    "argument with no name in procedure \"{}\"",
                    objv[1]
                )));
            }
            _ => {
                return Err(Flow::error(format!(
                    "too many fields in argument specifier \"{spec}\""
                )));
            }
        }
    }
    interp.create_proc(objv[1].as_str(), params, objv[3].as_str());
    Ok(Obj::empty())
}

pub(super) fn cmd_eval(interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 1, usize::MAX, "arg ?arg ...?")?;
    if objv.len() == 2 {
        return interp.eval_script(objv[1].as_str());
    }
    interp.eval_script(&concat_words(&objv[1..]))
}

pub(super) fn cmd_expr(interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 1, usize::MAX, "arg ?arg ...?")?;
    if objv.len() == 2 {
        return expr::evaluate(interp, objv[1].as_str());
    }
    expr::evaluate(interp, &concat_words(&objv[1..]))
}

pub(super) fn cmd_subst(interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(
        objv,
        1,
        4,
        "?-nobackslashes? ?-nocommands? ?-novariables? string",
    )?;
    let mut flags = SubstFlags::default();
    for option in &objv[1..objv.len() - 1] {
        match option.as_str() {
            "-nobackslashes" => flags.backslashes = false,
            "-nocommands" => flags.commands = false,
            "-novariables" => flags.variables = false,
            other => {
                return Err(bad_option(
                    "option",
                    other,
                    &["-nobackslashes", "-nocommands", "-novariables"],
                ));
            }
        }
    }
    interp.subst_with(objv[objv.len() - 1].as_str(), flags)
}

pub(super) fn cmd_namespace(interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 1, usize::MAX, "subcommand ?arg ...?")?;
    match objv[1].as_str() {
        "eval" => {
            sub_args(objv, 2, usize::MAX, "name arg ?arg...?")?;
            let namespace = interp.create_namespace(objv[2].as_str());
            let script = if objv.len() == 4 {
                objv[3].to_string()
            } else {
                concat_words(&objv[3..])
            };
            interp.in_namespace(&namespace, || interp.eval_script(&script))
        }
        "current" => {
            sub_args(objv, 0, 0, "")?;
            Ok(Obj::new(interp.current_namespace()))
        }
        "children" => {
            sub_args(objv, 0, 1, "?name?")?;
            let parent = objv.get(2).map_or("::", Obj::as_str);
            Ok(Obj::from_strs(&interp.namespace_children(parent)))
        }
        "exists" => {
            sub_args(objv, 1, 1, "name")?;
            Ok(Obj::from_bool(interp.namespace_exists(objv[2].as_str())))
        }
        "delete" => {
            for name in &objv[2..] {
                interp.delete_namespace(name.as_str())?;
            }
            Ok(Obj::empty())
        }
        "qualifiers" => {
            sub_args(objv, 1, 1, "string")?;
            let name = objv[2].as_str();
            Ok(Obj::new(name.rsplit_once("::").map_or("", |(head, _)| head)))
        }
        "tail" => {
            sub_args(objv, 1, 1, "string")?;
            let name = objv[2].as_str();
            Ok(Obj::new(name.rsplit_once("::").map_or(name, |(_, tail)| tail)))
        }
        other => Err(bad_option(
            "option",
            other,
            &["children", "current", "delete", "eval", "exists", "qualifiers", "tail"],
        )),
    }
}

pub(super) fn cmd_rename(interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 2, 2, "oldName newName")?;
    interp.rename_command(objv[1].as_str(), objv[2].as_str())?;
    Ok(Obj::empty())
}
