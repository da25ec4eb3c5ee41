use std::rc::Rc;

use crate::script::flow::{EvalResult, Flow};
use crate::script::interp::{Interp, Proc};
use crate::script::obj::Obj;

use super::glob_match;
use super::helpers::{bad_option, check_args, sub_args};

fn filtered(names: Vec<String>, pattern: Option<&Obj>) -> Obj {
    let names: Vec<String> = match pattern {
        Some(pattern) => names
            .into_iter()
            .filter(|name| glob_match(pattern.as_str(), name))
            .collect(),
        None => names,
    };
    Obj::from_strs(&names)
}

fn proc_named(interp: &Interp, name: &Obj) -> Result<Rc<Proc>, Flow> {
    interp
        .proc_info(name.as_str())
        .ok_or_else(|| Flow::error(format!("\"{name}\" isn't a procedure")))
}

pub(super) fn cmd_info(interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 1, usize::MAX, "subcommand ?arg ...?")?;
    match objv[1].as_str() {
        "exists" => {
            sub_args(objv, 1, 1, "varName")?;
            Ok(Obj::from_bool(interp.var_exists(objv[2].as_str())))
        }
        "commands" | "procs" => {
            sub_args(objv, 0, 1, "?pattern?")?;
            let procs_only = objv[1].as_str() == "procs";
            let mut names = interp.command_names(&interp.current_namespace(), procs_only);
            if interp.current_namespace() != "::" {
                names.extend(interp.command_names("::", procs_only));
            }
            Ok(filtered(names, objv.get(2)))
        }
        "args" => {
            sub_args(objv, 1, 1, "procname")?;
            let proc = proc_named(interp, &objv[2])?;
            let names: Vec<&str> = proc.params.iter().map(|p| p.name.as_str()).collect();
            Ok(Obj::from_strs(&names))
        }
        "body" => {
            sub_args(objv, 1, 1, "procname")?;
            let proc = proc_named(interp, &objv[2])?;
            Ok(Obj::new(proc.body.clone()))
        }
        "default" => {
            sub_args(objv, 3, 3, "procname arg varname")?;
            let proc = proc_named(interp, &objv[2])?;
            let param = proc
                .params
                .iter()
                .find(|p| p.name == objv[3].as_str())
                .ok_or_else(|| {
                    Flow::error(format!(
                        "procedure \"{}\" doesn't have an argument \"{}\"",
                        objv[2], objv[3]
                    ))
                })?;
            match &param.default {
                Some(default) => {
                    interp.set_var(objv[4].as_str(), default.clone())?;
                    Ok(Obj::from_bool(true))
                }
                None => {
                    interp.set_var(objv[4].as_str(), Obj::empty())?;
                    Ok(Obj::from_bool(false))
                }
            }
        }
        "globals" => {
            sub_args(objv, 0, 1, "?pattern?")?;
            Ok(filtered(interp.namespace_var_names("::"), objv.get(2)))
        }
        "vars" | "locals" => {
            sub_args(objv, 0, 1, "?pattern?")?;
            Ok(filtered(interp.visible_var_names(), objv.get(2)))
        }
        "level" => {
            sub_args(objv, 0, 0, "")?;
            Ok(Obj::from_int(interp.level() as i64))
        }
        other => Err(bad_option(
            "subcommand",
            other,
            &[
                "args", "body", "commands", "default", "exists", "globals", "level", "locals",
                "procs", "vars",
            ],
        )),
    }
}
