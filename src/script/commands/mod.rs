//! The core command set every interpreter starts with.

mod control;
mod dict_ops;
pub(crate) mod helpers;
mod info_ops;
mod interp_ops;
mod io_ops;
mod list_ops;
mod string_ops;
mod var_ops;

#[cfg(test)]
mod commands_test;

use super::flow::EvalResult;
use super::interp::Interp;
use super::obj::Obj;

pub struct CoreCommand {
    pub name: &'static str,
    pub func: fn(&Interp, &[Obj]) -> EvalResult,
}

/// All core commands, registered into the global namespace of every new
/// interpreter.
pub static CORE_COMMANDS: &[CoreCommand] = &[
    CoreCommand { name: "if", func: control::cmd_if },
    CoreCommand { name: "while", func: control::cmd_while },
    CoreCommand { name: "for", func: control::cmd_for },
    CoreCommand { name: "foreach", func: control::cmd_foreach },
    CoreCommand { name: "break", func: control::cmd_break },
    CoreCommand { name: "continue", func: control::cmd_continue },
    CoreCommand { name: "return", func: control::cmd_return },
    CoreCommand { name: "error", func: control::cmd_error },
    CoreCommand { name: "catch", func: control::cmd_catch },
    CoreCommand { name: "proc", func: control::cmd_proc },
    CoreCommand { name: "eval", func: control::cmd_eval },
    CoreCommand { name: "expr", func: control::cmd_expr },
    CoreCommand { name: "subst", func: control::cmd_subst },
    CoreCommand { name: "namespace", func: control::cmd_namespace },
    CoreCommand { name: "rename", func: control::cmd_rename },
    CoreCommand { name: "set", func: var_ops::cmd_set },
    CoreCommand { name: "unset", func: var_ops::cmd_unset },
    CoreCommand { name: "incr", func: var_ops::cmd_incr },
    CoreCommand { name: "append", func: var_ops::cmd_append },
    CoreCommand { name: "lappend", func: var_ops::cmd_lappend },
    CoreCommand { name: "global", func: var_ops::cmd_global },
    CoreCommand { name: "variable", func: var_ops::cmd_variable },
    CoreCommand { name: "array", func: var_ops::cmd_array },
    CoreCommand { name: "list", func: list_ops::cmd_list },
    CoreCommand { name: "llength", func: list_ops::cmd_llength },
    CoreCommand { name: "lindex", func: list_ops::cmd_lindex },
    CoreCommand { name: "lrange", func: list_ops::cmd_lrange },
    CoreCommand { name: "linsert", func: list_ops::cmd_linsert },
    CoreCommand { name: "lreplace", func: list_ops::cmd_lreplace },
    CoreCommand { name: "lsearch", func: list_ops::cmd_lsearch },
    CoreCommand { name: "lsort", func: list_ops::cmd_lsort },
    CoreCommand { name: "lreverse", func: list_ops::cmd_lreverse },
    CoreCommand { name: "join", func: list_ops::cmd_join },
    CoreCommand { name: "split", func: list_ops::cmd_split },
    CoreCommand { name: "concat", func: list_ops::cmd_concat },
    CoreCommand { name: "dict", func: dict_ops::cmd_dict },
    CoreCommand { name: "string", func: string_ops::cmd_string },
    CoreCommand { name: "info", func: info_ops::cmd_info },
    CoreCommand { name: "interp", func: interp_ops::cmd_interp },
    CoreCommand { name: "puts", func: io_ops::cmd_puts },
    CoreCommand { name: "flush", func: io_ops::cmd_flush },
    CoreCommand { name: "source", func: io_ops::cmd_source },
    CoreCommand { name: "encoding", func: io_ops::cmd_encoding },
    CoreCommand { name: "package", func: io_ops::cmd_package },
    CoreCommand { name: "clock", func: io_ops::cmd_clock },
];

pub(crate) fn register_core(interp: &Interp) {
    for command in CORE_COMMANDS {
        interp.register_command(command.name, command.func);
    }
}

/// Glob-style matching: `*`, `?`, `[chars]`, `[a-z]` and `\x` escapes.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    glob_at(&pattern, &text)
}

fn glob_at(pattern: &[char], text: &[char]) -> bool {
    let Some((&first, rest)) = pattern.split_first() else {
        return text.is_empty();
    };
    match first {
        '*' => (0..=text.len()).any(|skip| glob_at(rest, &text[skip..])),
        '?' => !text.is_empty() && glob_at(rest, &text[1..]),
        '[' => {
            let Some((&ch, text_rest)) = text.split_first() else {
                return false;
            };
            let Some(close) = rest.iter().position(|&c| c == ']') else {
                return false;
            };
            let class = &rest[..close];
            let mut matched = false;
            let mut i = 0;
            while i < class.len() {
                if i + 2 < class.len() && class[i + 1] == '-' {
                    let (lo, hi) = if class[i] <= class[i + 2] {
                        (class[i], class[i + 2])
                    } else {
                        (class[i + 2], class[i])
                    };
                    matched |= (lo..=hi).contains(&ch);
                    i += 3;
                } else {
                    matched |= class[i] == ch;
                    i += 1;
                }
            }
            matched && glob_at(&rest[close + 1..], text_rest)
        }
        '\\' if !rest.is_empty() => {
            text.first() == Some(&rest[0]) && glob_at(&rest[1..], &text[1..])
        }
        literal => text.first() == Some(&literal) && glob_at(rest, &text[1..]),
    }
}
