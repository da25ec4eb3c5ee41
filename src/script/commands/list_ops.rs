use std::cmp::Ordering;

use crate::script::flow::EvalResult;
use crate::script::interp::Interp;
use crate::script::obj::Obj;

use super::glob_match;
use super::helpers::{bad_option, check_args, clamp, parse_index};

pub(super) fn cmd_list(_interp: &Interp, objv: &[Obj]) -> EvalResult {
    Ok(Obj::from_list(objv[1..].to_vec()))
}

pub(super) fn cmd_llength(_interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 1, 1, "list")?;
    Ok(Obj::from_int(objv[1].list_len()? as i64))
}

pub(super) fn cmd_lindex(_interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 1, usize::MAX, "list ?index ...?")?;
    let mut indices = Vec::new();
    for index in &objv[2..] {
        if objv.len() == 3 {
            indices.extend(index.list()?);
        } else {
            indices.push(index.clone());
        }
    }

    let mut current = objv[1].clone();
    for index in &indices {
        let len = current.list_len()?;
        let position = parse_index(index, len)?;
        if position < 0 || position as usize >= len {
            return Ok(Obj::empty());
        }
        current = match current.list_index(position as usize)? {
            Some(item) => item,
            None => return Ok(Obj::empty()),
        };
    }
    Ok(current)
}

pub(super) fn cmd_lrange(_interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 3, 3, "list first last")?;
    let items = objv[1].list()?;
    let first = clamp(parse_index(&objv[2], items.len())?, items.len());
    let last = parse_index(&objv[3], items.len())?;
    if last < first as i64 {
        return Ok(Obj::empty());
    }
    let last = clamp(last + 1, items.len());
    Ok(Obj::from_list(items[first..last].to_vec()))
}

pub(super) fn cmd_linsert(_interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 2, usize::MAX, "list index ?element ...?")?;
    let mut list = objv[1].clone();
    let len = list.list_len()?;
    let index = objv[2].as_str();
    let position = if index.starts_with("end") {
        parse_index(&objv[2], len)? + 1
    } else {
        parse_index(&objv[2], len)?
    };
    list.list_splice(clamp(position, len), 0, objv[3..].to_vec())?;
    Ok(list)
}

pub(super) fn cmd_lreplace(_interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 3, usize::MAX, "list first last ?element ...?")?;
    let mut list = objv[1].clone();
    let len = list.list_len()?;
    let first = clamp(parse_index(&objv[2], len)?, len);
    let last = parse_index(&objv[3], len)?;
    let count = if last < first as i64 {
        0
    } else {
        clamp(last + 1, len) - first
    };
    list.list_splice(first, count, objv[4..].to_vec())?;
    Ok(list)
}

#[derive(Clone, Copy, PartialEq)]
enum MatchMode {
    Exact,
    Glob,
}

pub(super) fn cmd_lsearch(_interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 2, usize::MAX, "?-option value ...? list pattern")?;
    let mut mode = MatchMode::Glob;
    let mut all = false;
    let mut inline = false;
    let mut negate = false;
    for option in &objv[1..objv.len() - 2] {
        match option.as_str() {
            "-exact" => mode = MatchMode::Exact,
            "-glob" => mode = MatchMode::Glob,
            "-all" => all = true,
            "-inline" => inline = true,
            "-not" => negate = true,
            other => {
                return Err(bad_option(
                    "option",
                    other,
                    &["-all", "-exact", "-glob", "-inline", "-not"],
                ));
            }
        }
    }

    let items = objv[objv.len() - 2].list()?;
    let pattern = objv[objv.len() - 1].as_str();
    let matches = |item: &Obj| {
        let hit = match mode {
            MatchMode::Exact => item.as_str() == pattern,
            MatchMode::Glob => glob_match(pattern, item.as_str()),
        };
        hit != negate
    };

    if all {
        let found: Vec<Obj> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| matches(item))
            .map(|(i, item)| if inline { item.clone() } else { Obj::from_int(i as i64) })
            .collect();
        return Ok(Obj::from_list(found));
    }
    match items.iter().position(|item| matches(item)) {
        Some(i) if inline => Ok(items[i].clone()),
        Some(i) => Ok(Obj::from_int(i as i64)),
        None if inline => Ok(Obj::empty()),
        None => Ok(Obj::from_int(-1)),
    }
}

#[derive(Clone, Copy)]
enum SortMode {
    Ascii,
    Integer,
    Real,
    Dictionary,
}

fn dictionary_order(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

pub(super) fn cmd_lsort(_interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 1, usize::MAX, "?-option value ...? list")?;
    let mut mode = SortMode::Ascii;
    let mut decreasing = false;
    let mut unique = false;
    for option in &objv[1..objv.len() - 1] {
        match option.as_str() {
            "-ascii" => mode = SortMode::Ascii,
            "-integer" => mode = SortMode::Integer,
            "-real" => mode = SortMode::Real,
            "-dictionary" => mode = SortMode::Dictionary,
            "-increasing" => decreasing = false,
            "-decreasing" => decreasing = true,
            "-unique" => unique = true,
            other => {
                return Err(bad_option(
                    "option",
                    other,
                    &[
                        "-ascii",
                        "-decreasing",
                        "-dictionary",
                        "-increasing",
                        "-integer",
                        "-real",
                        "-unique",
                    ],
                ));
            }
        }
    }

    let mut items = objv[objv.len() - 1].list()?;
    // Validate up front so the comparator never fails.
    match mode {
        SortMode::Integer => {
            for item in &items {
                item.int()?;
            }
        }
        SortMode::Real => {
            for item in &items {
                item.double()?;
            }
        }
        SortMode::Ascii | SortMode::Dictionary => {}
    }

    let compare = |a: &Obj, b: &Obj| -> Ordering {
        let ordering = match mode {
            SortMode::Ascii => a.as_str().cmp(b.as_str()),
            SortMode::Dictionary => dictionary_order(a.as_str(), b.as_str()),
            SortMode::Integer => a.int().ok().cmp(&b.int().ok()),
            SortMode::Real => a
                .double()
                .unwrap_or(0.0)
                .partial_cmp(&b.double().unwrap_or(0.0))
                .unwrap_or(Ordering::Equal),
        };
        if decreasing {
            ordering.reverse()
        } else {
            ordering
        }
    };
    items.sort_by(compare);
    if unique {
        items.dedup_by(|a, b| compare(a, b) == Ordering::Equal);
    }
    Ok(Obj::from_list(items))
}

pub(super) fn cmd_lreverse(_interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 1, 1, "list")?;
    let mut items = objv[1].list()?;
    items.reverse();
    Ok(Obj::from_list(items))
}

pub(super) fn cmd_join(_interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 1, 2, "list ?joinString?")?;
    let separator = objv.get(2).map_or(" ", Obj::as_str);
    let joined = objv[1].with_list(|items| {
        items
            .iter()
            .map(Obj::as_str)
            .collect::<Vec<_>>()
            .join(separator)
    })?;
    Ok(Obj::new(joined))
}

pub(super) fn cmd_split(_interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 1, 2, "string ?splitChars?")?;
    let text = objv[1].as_str();
    let separators = objv.get(2).map_or(" \t\n\r", Obj::as_str);
    if separators.is_empty() {
        let chars: Vec<Obj> = text.chars().map(|c| Obj::new(c.to_string())).collect();
        return Ok(Obj::from_list(chars));
    }
    if text.is_empty() {
        return Ok(Obj::empty());
    }
    let parts: Vec<Obj> = text
        .split(|c| separators.contains(c))
        .map(Obj::new)
        .collect();
    Ok(Obj::from_list(parts))
}

pub(super) fn cmd_concat(_interp: &Interp, objv: &[Obj]) -> EvalResult {
    let mut items = Vec::new();
    for word in &objv[1..] {
        if word.as_str().trim().is_empty() {
            continue;
        }
        items.extend(word.list()?);
    }
    if items.is_empty() && objv.len() > 1 {
        return Ok(Obj::empty());
    }
    Ok(Obj::from_list(items))
}
