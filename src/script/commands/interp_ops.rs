use crate::script::flow::{EvalResult, Flow};
use crate::script::interp::Interp;
use crate::script::obj::Obj;

use super::helpers::{bad_option, check_args, sub_args};

/// Walk a child path (a list of names) down from `interp`.
fn resolve(interp: &Interp, path: &Obj) -> Result<Interp, Flow> {
    let mut current = interp.clone();
    for name in path.list()? {
        current = current
            .child(name.as_str())
            .ok_or_else(|| Flow::error(format!("could not find interpreter \"{path}\"")))?;
    }
    Ok(current)
}

/// Split a path into the interpreter owning the last element and its name.
fn resolve_parent(interp: &Interp, path: &Obj) -> Result<(Interp, String), Flow> {
    let mut names = path.list()?;
    let Some(last) = names.pop() else {
        return Err(Flow::error("cannot use the current interpreter here"));
    };
    let parent = resolve(interp, &Obj::from_list(names))?;
    Ok((parent, last.to_string()))
}

pub(super) fn cmd_interp(interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 1, usize::MAX, "cmd ?arg ...?")?;
    match objv[1].as_str() {
        "create" => {
            sub_args(objv, 0, 2, "?-safe? ?--? ?path?")?;
            let path = objv[2..]
                .iter()
                .find(|arg| !matches!(arg.as_str(), "-safe" | "--"));
            let child = match path {
                Some(path) => {
                    let (parent, name) = resolve_parent(interp, path)?;
                    parent.create_child(Some(&name))?
                }
                None => interp.create_child(None)?,
            };
            Ok(Obj::new(child.name()))
        }
        "delete" => {
            for path in &objv[2..] {
                let (parent, name) = resolve_parent(interp, path)?;
                parent.delete_child(&name)?;
            }
            Ok(Obj::empty())
        }
        "eval" => {
            sub_args(objv, 2, usize::MAX, "path arg ?arg ...?")?;
            let target = resolve(interp, &objv[2])?;
            let script = if objv.len() == 4 {
                objv[3].to_string()
            } else {
                let words: Vec<&str> = objv[3..].iter().map(|w| w.as_str().trim()).collect();
                words.join(" ")
            };
            // Error info restarts in the calling interpreter.
            target
                .eval_global(&script)
                .map_err(|error| Flow::Error(error.with_info(String::new())))
        }
        "exists" => {
            sub_args(objv, 0, 1, "?path?")?;
            let exists = match objv.get(2) {
                Some(path) => resolve(interp, path).is_ok(),
                None => true,
            };
            Ok(Obj::from_bool(exists))
        }
        "children" | "slaves" => {
            sub_args(objv, 0, 1, "?path?")?;
            let target = match objv.get(2) {
                Some(path) => resolve(interp, path)?,
                None => interp.clone(),
            };
            Ok(Obj::from_strs(&target.child_names()))
        }
        other => Err(bad_option(
            "option",
            other,
            &["children", "create", "delete", "eval", "exists", "slaves"],
        )),
    }
}
