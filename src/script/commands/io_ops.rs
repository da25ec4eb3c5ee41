use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::encoding::{self, Encoding};
use crate::script::flow::{EvalResult, Flow};
use crate::script::interp::Interp;
use crate::script::obj::Obj;

use super::helpers::{bad_option, check_args, sub_args, wrong_args};

pub(super) fn cmd_puts(interp: &Interp, objv: &[Obj]) -> EvalResult {
    let mut args = &objv[1..];
    let mut newline = true;
    if args.first().map(Obj::as_str) == Some("-nonewline") {
        newline = false;
        args = &args[1..];
    }
    let text = match args {
        [text] => text,
        [channel, text] if matches!(channel.as_str(), "stdout" | "stderr") => text,
        [channel, _] => {
            return Err(Flow::error(format!(
                "can not find channel named \"{channel}\""
            )));
        }
        _ => return Err(wrong_args(objv, "?-nonewline? ?channelId? string")),
    };
    let mut out = text.to_string();
    if newline {
        out.push('\n');
    }
    interp.write_output(&out)?;
    Ok(Obj::empty())
}

pub(super) fn cmd_flush(interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 0, 1, "?channelId?")?;
    interp.write_output("")?;
    Ok(Obj::empty())
}

fn encoding_named(name: &Obj) -> Result<Encoding, Flow> {
    Encoding::from_name(name.as_str())
        .ok_or_else(|| Flow::error(format!("unknown encoding \"{name}\"")))
}

pub(super) fn cmd_source(interp: &Interp, objv: &[Obj]) -> EvalResult {
    let (encoding, path) = match objv {
        [_, path] => (Encoding::Utf8, path),
        [_, option, name, path] if option.as_str() == "-encoding" => {
            (encoding_named(name)?, path)
        }
        _ => return Err(wrong_args(objv, "?-encoding name? fileName")),
    };
    let bytes = std::fs::read(path.as_str()).map_err(|e| {
        Flow::error(format!("couldn't read file \"{path}\": {e}"))
    })?;
    let script = encoding::convert_from(encoding, &bytes);
    debug!(file = %path, encoding = %encoding, "sourcing script");
    interp.eval_script(&script)
}

pub(super) fn cmd_encoding(_interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 1, 3, "option ?arg ...?")?;
    match objv[1].as_str() {
        "names" => Ok(Obj::from_strs(&Encoding::names())),
        "system" => Ok(Obj::new(Encoding::Utf8.name())),
        "convertto" => {
            sub_args(objv, 1, 2, "?encoding? string")?;
            let encoding = if objv.len() == 4 {
                encoding_named(&objv[2])?
            } else {
                Encoding::Utf8
            };
            let text = objv[objv.len() - 1].as_str();
            Ok(Obj::from_bytes(encoding::convert_to(encoding, text)))
        }
        "convertfrom" => {
            sub_args(objv, 1, 2, "?encoding? data")?;
            let encoding = if objv.len() == 4 {
                encoding_named(&objv[2])?
            } else {
                Encoding::Utf8
            };
            let bytes = objv[objv.len() - 1].bytes();
            Ok(Obj::new(encoding::convert_from(encoding, &bytes)))
        }
        other => Err(bad_option(
            "option",
            other,
            &["convertfrom", "convertto", "names", "system"],
        )),
    }
}

pub(super) fn cmd_package(interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 1, usize::MAX, "option ?arg ...?")?;
    match objv[1].as_str() {
        "require" => {
            let name = objv[2..]
                .iter()
                .find(|arg| arg.as_str() != "-exact")
                .ok_or_else(|| wrong_args(objv, "?-exact? package ?version?"))?;
            interp.require_package(name.as_str())?;
            Ok(Obj::empty())
        }
        "provide" => {
            sub_args(objv, 1, 2, "package ?version?")?;
            interp.mark_package_loaded(objv[2].as_str());
            Ok(Obj::empty())
        }
        "present" => {
            sub_args(objv, 1, 2, "package ?version?")?;
            if interp.package_loaded(objv[2].as_str()) {
                Ok(Obj::empty())
            } else {
                Err(Flow::error(format!("package {} is not present", objv[2])))
            }
        }
        other => Err(bad_option("option", other, &["present", "provide", "require"])),
    }
}

pub(super) fn cmd_clock(_interp: &Interp, objv: &[Obj]) -> EvalResult {
    check_args(objv, 1, 1, "subcommand")?;
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Flow::error(e.to_string()))?;
    match objv[1].as_str() {
        "seconds" => Ok(Obj::from_int(elapsed.as_secs())),
        "milliseconds" => Ok(Obj::from_int(elapsed.as_millis())),
        "microseconds" => Ok(Obj::from_int(elapsed.as_micros())),
        other => Err(bad_option(
            "subcommand",
            other,
            &["microseconds", "milliseconds", "seconds"],
        )),
    }
}
