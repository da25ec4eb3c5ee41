use crate::script::flow::{EvalResult, Flow};
use crate::script::interp::Interp;
use crate::script::obj::{DictMap, Obj};

use super::glob_match;
use super::helpers::{bad_option, check_args, sub_args};

pub(super) fn cmd_dict(interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 1, usize::MAX, "subcommand ?arg ...?")?;
    match objv[1].as_str() {
        "create" => dict_create(&objv[2..]),
        "get" => {
            sub_args(objv, 1, usize::MAX, "dictionary ?key ...?")?;
            dict_get(&objv[2], &objv[3..])
        }
        "set" => {
            sub_args(objv, 3, usize::MAX, "dictVarName key ?key ...? value")?;
            let value = objv[objv.len() - 1].clone();
            update_var(interp, objv[2].as_str(), |dict| {
                dict.dict_put_path(&objv[3..objv.len() - 1], value)
            })
        }
        "unset" => {
            sub_args(objv, 2, usize::MAX, "dictVarName key ?key ...?")?;
            update_var(interp, objv[2].as_str(), |dict| {
                dict.dict_remove_path(&objv[3..]).map(|_| ())
            })
        }
        "exists" => {
            sub_args(objv, 2, usize::MAX, "dictionary key ?key ...?")?;
            let found = matches!(objv[2].dict_get_path(&objv[3..]), Ok(Some(_)));
            Ok(Obj::from_bool(found))
        }
        "size" => {
            sub_args(objv, 1, 1, "dictionary")?;
            Ok(Obj::from_int(objv[2].dict_size()? as i64))
        }
        "keys" => {
            sub_args(objv, 1, 2, "dictionary ?pattern?")?;
            let pattern = objv.get(3).map(Obj::as_str);
            let keys = objv[2].with_dict(|map| {
                map.keys()
                    .filter(|key| pattern.is_none_or(|p| glob_match(p, key)))
                    .map(|key| Obj::new(key.clone()))
                    .collect()
            })?;
            Ok(Obj::from_list(keys))
        }
        "values" => {
            sub_args(objv, 1, 2, "dictionary ?pattern?")?;
            let pattern = objv.get(3).map(Obj::as_str);
            let values = objv[2].with_dict(|map| {
                map.values()
                    .filter(|value| pattern.is_none_or(|p| glob_match(p, value.as_str())))
                    .cloned()
                    .collect()
            })?;
            Ok(Obj::from_list(values))
        }
        "merge" => {
            let mut merged = DictMap::new();
            for dict in &objv[2..] {
                dict.with_dict(|map| {
                    for (key, value) in map {
                        merged.insert(key.clone(), value.clone());
                    }
                })?;
            }
            Ok(Obj::from_dict(merged))
        }
        "for" => {
            sub_args(objv, 3, 3, "{keyVarName valueVarName} dictionary script")?;
            let vars = objv[2].list()?;
            let [key_var, value_var] = vars.as_slice() else {
                return Err(Flow::error("must have exactly two variable names"));
            };
            let entries = objv[3].with_dict(|map| map.clone())?;
            for (key, value) in entries {
                interp.set_var(key_var.as_str(), Obj::new(key))?;
                interp.set_var(value_var.as_str(), value)?;
                match interp.eval_script(objv[4].as_str()) {
                    Ok(_) | Err(Flow::Continue) => {}
                    Err(Flow::Break) => break,
                    Err(other) => return Err(other),
                }
            }
            Ok(Obj::empty())
        }
        other => Err(bad_option(
            "subcommand",
            other,
            &[
                "create", "exists", "for", "get", "keys", "merge", "set", "size", "unset",
                "values",
            ],
        )),
    }
}

fn dict_create(args: &[Obj]) -> EvalResult {
    if args.len() % 2 != 0 {
        return Err(Flow::error(
            "wrong # args: should be \"dict create ?key value ...?\"",
        ));
    }
    let mut map = DictMap::new();
    for pair in args.chunks(2) {
        map.insert(pair[0].text(), pair[1].clone());
    }
    Ok(Obj::from_dict(map))
}

fn dict_get(dict: &Obj, path: &[Obj]) -> EvalResult {
    if path.is_empty() {
        dict.dict_size()?;
        return Ok(dict.clone());
    }
    let mut current = dict.clone();
    for key in path {
        current = current.dict_get(key.as_str())?.ok_or_else(|| {
            Flow::error(format!("key \"{key}\" not known in dictionary"))
        })?;
    }
    Ok(current)
}

/// Apply `f` to the dict stored in a variable, creating it empty if missing.
fn update_var(
    interp: &Interp,
    name: &str,
    f: impl FnOnce(&mut Obj) -> Result<(), String>,
) -> EvalResult {
    if !interp.var_exists(name) {
        interp.set_var(name, Obj::empty_dict())?;
    }
    let updated = interp.with_var_mut(name, |dict| {
        f(dict)?;
        Ok::<Obj, String>(dict.clone())
    })?;
    Ok(updated?)
}
