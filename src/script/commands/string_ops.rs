use std::cmp::Ordering;

use crate::script::flow::{EvalResult, Flow};
use crate::script::interp::Interp;
use crate::script::number;
use crate::script::obj::Obj;

use super::glob_match;
use super::helpers::{bad_option, check_args, clamp, parse_index, sub_args};

const SUBCOMMANDS: &[&str] = &[
    "bytelength",
    "compare",
    "equal",
    "first",
    "index",
    "is",
    "last",
    "length",
    "map",
    "match",
    "range",
    "repeat",
    "reverse",
    "tolower",
    "toupper",
    "trim",
    "trimleft",
    "trimright",
];

fn chars(obj: &Obj) -> Vec<char> {
    obj.as_str().chars().collect()
}

fn trim_set(objv: &[Obj]) -> Vec<char> {
    objv.get(3)
        .map_or_else(|| vec![' ', '\t', '\n', '\r', '\0'], chars)
}

/// Leading `-nocase` / `-length n` options shared by `compare` and `equal`.
fn compare_options(objv: &[Obj]) -> Result<(bool, Option<usize>, &Obj, &Obj), Flow> {
    let mut nocase = false;
    let mut length = None;
    let mut i = 2;
    while i + 2 < objv.len() {
        match objv[i].as_str() {
            "-nocase" => nocase = true,
            "-length" => {
                i += 1;
                let n = objv[i].i64()?;
                length = usize::try_from(n).ok();
            }
            other => return Err(bad_option("option", other, &["-length", "-nocase"])),
        }
        i += 1;
    }
    if i + 2 != objv.len() {
        return Err(Flow::error(format!(
            "wrong # args: should be \"string {} ?-nocase? ?-length int? string1 string2\"",
            objv[1]
        )));
    }
    Ok((nocase, length, &objv[i], &objv[i + 1]))
}

fn compare_strings(a: &str, b: &str, nocase: bool, length: Option<usize>) -> Ordering {
    let fold = |s: &str| -> String {
        let truncated: String = match length {
            Some(n) => s.chars().take(n).collect(),
            None => s.to_string(),
        };
        if nocase {
            truncated.to_lowercase()
        } else {
            truncated
        }
    };
    fold(a).cmp(&fold(b))
}

pub(super) fn cmd_string(_interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 1, usize::MAX, "subcommand ?arg ...?")?;
    match objv[1].as_str() {
        "length" => {
            sub_args(objv, 1, 1, "string")?;
            Ok(Obj::from_int(objv[2].as_str().chars().count() as i64))
        }
        "bytelength" => {
            sub_args(objv, 1, 1, "string")?;
            Ok(Obj::from_int(objv[2].as_str().len() as i64))
        }
        "index" => {
            sub_args(objv, 2, 2, "string charIndex")?;
            let text = chars(&objv[2]);
            let index = parse_index(&objv[3], text.len())?;
            Ok(usize::try_from(index)
                .ok()
                .and_then(|i| text.get(i))
                .map_or_else(Obj::empty, |c| Obj::new(c.to_string())))
        }
        "range" => {
            sub_args(objv, 3, 3, "string first last")?;
            let text = chars(&objv[2]);
            let first = clamp(parse_index(&objv[3], text.len())?, text.len());
            let last = parse_index(&objv[4], text.len())?;
            if last < first as i64 {
                return Ok(Obj::empty());
            }
            let last = clamp(last + 1, text.len());
            Ok(Obj::new(text[first..last].iter().collect::<String>()))
        }
        "toupper" => {
            sub_args(objv, 1, 1, "string")?;
            Ok(Obj::new(objv[2].as_str().to_uppercase()))
        }
        "tolower" => {
            sub_args(objv, 1, 1, "string")?;
            Ok(Obj::new(objv[2].as_str().to_lowercase()))
        }
        "trim" | "trimleft" | "trimright" => {
            sub_args(objv, 1, 2, "string ?chars?")?;
            let set = trim_set(objv);
            let text = objv[2].as_str();
            let trimmed = match objv[1].as_str() {
                "trimleft" => text.trim_start_matches(set.as_slice()),
                "trimright" => text.trim_end_matches(set.as_slice()),
                _ => text.trim_matches(set.as_slice()),
            };
            Ok(Obj::new(trimmed))
        }
        "equal" => {
            let (nocase, length, a, b) = compare_options(objv)?;
            Ok(Obj::from_bool(
                compare_strings(a.as_str(), b.as_str(), nocase, length) == Ordering::Equal,
            ))
        }
        "compare" => {
            let (nocase, length, a, b) = compare_options(objv)?;
            Ok(Obj::from_int(
                match compare_strings(a.as_str(), b.as_str(), nocase, length) {
                    Ordering::Less => -1,
                    Ordering::Equal => 0,
                    Ordering::Greater => 1,
                },
            ))
        }
        "first" | "last" => {
            sub_args(objv, 2, 3, "needleString haystackString ?startIndex?")?;
            let needle = chars(&objv[2]);
            let haystack = chars(&objv[3]);
            if needle.is_empty() || needle.len() > haystack.len() {
                return Ok(Obj::from_int(-1));
            }
            let positions = 0..=haystack.len() - needle.len();
            let hit = |&i: &usize| haystack[i..i + needle.len()] == needle[..];
            let found = if objv[1].as_str() == "first" {
                let start = match objv.get(4) {
                    Some(start) => clamp(parse_index(start, haystack.len())?, haystack.len()),
                    None => 0,
                };
                positions.filter(|i| *i >= start).find(hit)
            } else {
                let limit = match objv.get(4) {
                    Some(last) => parse_index(last, haystack.len())?,
                    None => haystack.len() as i64,
                };
                positions.rev().filter(|i| (*i as i64) <= limit).find(hit)
            };
            Ok(Obj::from_int(found.map_or(-1, |i| i as i64)))
        }
        "match" => {
            let (nocase, pattern, text) = match objv.len() {
                4 => (false, &objv[2], &objv[3]),
                5 if objv[2].as_str() == "-nocase" => (true, &objv[3], &objv[4]),
                _ => {
                    return Err(Flow::error(
                        "wrong # args: should be \"string match ?-nocase? pattern string\"",
                    ));
                }
            };
            let matched = if nocase {
                glob_match(
                    &pattern.as_str().to_lowercase(),
                    &text.as_str().to_lowercase(),
                )
            } else {
                glob_match(pattern.as_str(), text.as_str())
            };
            Ok(Obj::from_bool(matched))
        }
        "repeat" => {
            sub_args(objv, 2, 2, "string count")?;
            let count = objv[3].i64()?.max(0) as usize;
            Ok(Obj::new(objv[2].as_str().repeat(count)))
        }
        "reverse" => {
            sub_args(objv, 1, 1, "string")?;
            Ok(Obj::new(objv[2].as_str().chars().rev().collect::<String>()))
        }
        "map" => {
            sub_args(objv, 2, 2, "mapping string")?;
            let mapping = objv[2].list()?;
            if mapping.len() % 2 != 0 {
                return Err(Flow::error("char map list unbalanced"));
            }
            Ok(Obj::new(string_map(&mapping, objv[3].as_str())))
        }
        "is" => {
            sub_args(objv, 2, 3, "class ?-strict? string")?;
            let strict = objv.len() == 5 && objv[3].as_str() == "-strict";
            let text = objv[objv.len() - 1].as_str();
            if text.is_empty() {
                return Ok(Obj::from_bool(!strict));
            }
            let result = match objv[2].as_str() {
                "integer" | "entier" | "wide" => number::parse_int(text).is_some(),
                "double" => number::parse_double(text).is_some(),
                "boolean" => number::parse_bool(text).is_some(),
                "true" => number::parse_bool(text) == Some(true),
                "false" => number::parse_bool(text) == Some(false),
                "digit" => text.chars().all(|c| c.is_ascii_digit()),
                "alpha" => text.chars().all(char::is_alphabetic),
                "alnum" => text.chars().all(char::is_alphanumeric),
                "space" => text.chars().all(char::is_whitespace),
                "upper" => text.chars().all(char::is_uppercase),
                "lower" => text.chars().all(char::is_lowercase),
                "ascii" => text.is_ascii(),
                "list" => objv[objv.len() - 1].list_len().is_ok(),
                other => {
                    return Err(bad_option(
                        "class",
                        other,
                        &[
                            "alnum", "alpha", "ascii", "boolean", "digit", "double", "entier",
                            "false", "integer", "list", "lower", "space", "true", "upper",
                            "wide",
                        ],
                    ));
                }
            };
            Ok(Obj::from_bool(result))
        }
        other => Err(bad_option("option", other, SUBCOMMANDS)),
    }
}

fn string_map(mapping: &[Obj], text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    'outer: while !rest.is_empty() {
        for pair in mapping.chunks(2) {
            let from = pair[0].as_str();
            if !from.is_empty() && rest.starts_with(from) {
                out.push_str(pair[1].as_str());
                rest = &rest[from.len()..];
                continue 'outer;
            }
        }
        let mut iter = rest.chars();
        if let Some(c) = iter.next() {
            out.push(c);
        }
        rest = iter.as_str();
    }
    out
}
