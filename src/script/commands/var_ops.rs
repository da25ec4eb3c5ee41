use num_bigint::BigInt;

use crate::script::flow::{EvalResult, Flow};
use crate::script::interp::Interp;
use crate::script::obj::Obj;

use super::glob_match;
use super::helpers::{bad_option, check_args, sub_args};

pub(super) fn cmd_set(interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 1, 2, "varName ?newValue?")?;
    match objv.get(2) {
        Some(value) => Ok(interp.set_var(objv[1].as_str(), value.clone())?),
        None => Ok(interp.get_var(objv[1].as_str())?),
    }
}

pub(super) fn cmd_unset(interp: &Interp, objv: &[Obj]) -> EvalResult {
    let mut complain = true;
    let mut names = &objv[1..];
    while let Some(first) = names.first() {
        match first.as_str() {
            "-nocomplain" => complain = false,
            "--" => {
                names = &names[1..];
                break;
            }
            _ => break,
        }
        names = &names[1..];
    }
    for name in names {
        if let Err(message) = interp.unset_var(name.as_str())
            && complain
        {
            return Err(Flow::error(message));
        }
    }
    Ok(Obj::empty())
}

pub(super) fn cmd_incr(interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 1, 2, "varName ?increment?")?;
    let by = match objv.get(2) {
        Some(by) => by.int()?,
        None => BigInt::from(1),
    };
    let name = objv[1].as_str();
    let current = if interp.var_exists(name) {
        interp.get_var(name)?.int()?
    } else {
        BigInt::from(0)
    };
    Ok(interp.set_var(name, Obj::from_int(current + by))?)
}

pub(super) fn cmd_append(interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 1, usize::MAX, "varName ?value ...?")?;
    let name = objv[1].as_str();
    let suffix: String = objv[2..].iter().map(Obj::as_str).collect();
    if !interp.var_exists(name) {
        return Ok(interp.set_var(name, Obj::new(suffix))?);
    }
    Ok(interp.with_var_mut(name, |value| {
        value.append_text(&suffix);
        value.clone()
    })?)
}

pub(super) fn cmd_lappend(interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 1, usize::MAX, "varName ?value ...?")?;
    let name = objv[1].as_str();
    let items = objv[2..].to_vec();
    if !interp.var_exists(name) {
        return Ok(interp.set_var(name, Obj::from_list(items))?);
    }
    let appended = interp.with_var_mut(name, |value| {
        value.list_extend(items)?;
        Ok::<Obj, String>(value.clone())
    })?;
    Ok(appended?)
}

pub(super) fn cmd_global(interp: &Interp, objv: &[Obj]) -> EvalResult {
    for name in &objv[1..] {
        let name = name.as_str();
        let local = name.rsplit_once("::").map_or(name, |(_, tail)| tail);
        let target = if name.starts_with("::") {
            name.to_string()
        } else {
            format!("::{name}")
        };
        interp.link_var(local, &target)?;
    }
    Ok(Obj::empty())
}

pub(super) fn cmd_variable(interp: &Interp, objv: &[Obj]) -> EvalResult {
    let namespace = interp.current_namespace();
    for pair in objv[1..].chunks(2) {
        let name = pair[0].as_str();
        let qualified = if name.starts_with("::") {
            name.to_string()
        } else if namespace == "::" {
            format!("::{name}")
        } else {
            format!("{namespace}::{name}")
        };
        if let Some(value) = pair.get(1) {
            interp.set_var(&qualified, value.clone())?;
        }
        let local = name.rsplit_once("::").map_or(name, |(_, tail)| tail);
        interp.link_var(local, &qualified)?;
    }
    Ok(Obj::empty())
}

fn matching(names: Vec<String>, pattern: Option<&Obj>) -> Vec<String> {
    match pattern {
        Some(pattern) => names
            .into_iter()
            .filter(|name| glob_match(pattern.as_str(), name))
            .collect(),
        None => names,
    }
}

pub(super) fn cmd_array(interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 2, usize::MAX, "option arrayName ?arg ...?")?;
    let name = objv[2].as_str();
    match objv[1].as_str() {
        "exists" => {
            sub_args(objv, 1, 1, "arrayName")?;
            Ok(Obj::from_bool(interp.array_exists(name)))
        }
        "size" => {
            sub_args(objv, 1, 1, "arrayName")?;
            Ok(Obj::from_int(interp.array_size(name) as i64))
        }
        "names" => {
            sub_args(objv, 1, 2, "arrayName ?pattern?")?;
            Ok(Obj::from_strs(&matching(interp.array_names(name), objv.get(3))))
        }
        "get" => {
            sub_args(objv, 1, 2, "arrayName ?pattern?")?;
            let mut flat = Vec::new();
            for (key, value) in interp.array_get(name) {
                if objv.get(3).is_none_or(|p| glob_match(p.as_str(), &key)) {
                    flat.push(Obj::new(key));
                    flat.push(value);
                }
            }
            Ok(Obj::from_list(flat))
        }
        "set" => {
            sub_args(objv, 2, 2, "arrayName list")?;
            let items = objv[3].list()?;
            if items.len() % 2 != 0 {
                return Err(Flow::error("list must have an even number of elements"));
            }
            let pairs = items
                .chunks(2)
                .map(|pair| (pair[0].to_string(), pair[1].clone()))
                .collect();
            interp.array_set(name, pairs)?;
            Ok(Obj::empty())
        }
        "unset" => {
            sub_args(objv, 1, 2, "arrayName ?pattern?")?;
            interp.array_unset(name, objv.get(3).map(Obj::as_str));
            Ok(Obj::empty())
        }
        other => Err(bad_option(
            "option",
            other,
            &["exists", "get", "names", "set", "size", "unset"],
        )),
    }
}
