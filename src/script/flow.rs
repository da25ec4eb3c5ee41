//! Non-local control flow out of script evaluation.

use std::fmt;

use super::obj::{DictMap, Obj};

/// Completion code of a `return -code` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCode {
    Ok,
    Error,
    Return,
    Break,
    Continue,
}

impl ReturnCode {
    pub fn parse(text: &str) -> Result<ReturnCode, String> {
        match text {
            "ok" | "0" => Ok(ReturnCode::Ok),
            "error" | "1" => Ok(ReturnCode::Error),
            "return" | "2" => Ok(ReturnCode::Return),
            "break" | "3" => Ok(ReturnCode::Break),
            "continue" | "4" => Ok(ReturnCode::Continue),
            other => Err(format!(
                "bad completion code \"{other}\": must be ok, error, return, break, continue, or an integer"
            )),
        }
    }

    pub fn as_int(self) -> i64 {
        match self {
            ReturnCode::Ok => 0,
            ReturnCode::Error => 1,
            ReturnCode::Return => 2,
            ReturnCode::Break => 3,
            ReturnCode::Continue => 4,
        }
    }
}

/// A script error with its structured metadata.
#[derive(Debug, Clone)]
pub struct ScriptError {
    pub message: Obj,
    /// The `-errorcode` list, `NONE` unless set explicitly.
    pub code: Obj,
    /// Accumulated stack trace text; empty until the error leaves its first command.
    pub info: String,
    pub line: usize,
}

impl ScriptError {
    pub fn new(message: impl Into<Obj>) -> Self {
        ScriptError {
            message: message.into(),
            code: Obj::new("NONE"),
            info: String::new(),
            line: 0,
        }
    }

    pub fn with_code(mut self, code: Obj) -> Self {
        self.code = code;
        self
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }

    /// Error info as reported to callers: the message alone if no command
    /// context was recorded.
    pub fn error_info(&self) -> String {
        if self.info.is_empty() {
            self.message.to_string()
        } else {
            self.info.clone()
        }
    }

    /// The return options dictionary describing this error.
    pub fn return_options(&self) -> Obj {
        let mut map = DictMap::new();
        map.insert("-code".into(), Obj::from_int(1));
        map.insert("-level".into(), Obj::from_int(0));
        map.insert("-errorcode".into(), self.code.clone());
        map.insert("-errorinfo".into(), Obj::new(self.error_info()));
        map.insert("-errorline".into(), Obj::from_int(self.line as i64));
        Obj::from_dict(map)
    }

    /// Record the command that was running when the error passed through it.
    pub(crate) fn add_context(&mut self, command: &str, line: usize) {
        let command = truncate_command(command);
        if self.info.is_empty() {
            self.info = format!(
                "{}\n    while executing\n\"{}\"",
                self.message.as_str(),
                command
            );
            if self.line == 0 {
                self.line = line;
            }
        } else {
            self.info
                .push_str(&format!("\n    invoked from within\n\"{command}\""));
        }
    }
}

fn truncate_command(command: &str) -> String {
    const LIMIT: usize = 150;
    let trimmed = command.trim();
    if trimmed.chars().count() <= LIMIT {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(LIMIT).collect();
    format!("{head}...")
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message.as_str())
    }
}

impl std::error::Error for ScriptError {}

/// An unwinding `return` that has not reached its target level yet.
#[derive(Debug, Clone)]
pub struct ReturnFlow {
    pub value: Obj,
    pub code: ReturnCode,
    pub level: usize,
    pub error_code: Option<Obj>,
    pub error_info: Option<String>,
}

/// Everything that ends a script early.
#[derive(Debug, Clone)]
pub enum Flow {
    Error(ScriptError),
    Return(Box<ReturnFlow>),
    Break,
    Continue,
}

impl Flow {
    pub fn error(message: impl Into<Obj>) -> Flow {
        Flow::Error(ScriptError::new(message))
    }

    /// Convert a flow that escaped a proc body or the top level into its
    /// final completion.
    pub(crate) fn complete(self) -> Result<Obj, Flow> {
        match self {
            Flow::Return(mut ret) => {
                ret.level = ret.level.saturating_sub(1);
                if ret.level > 0 {
                    return Err(Flow::Return(ret));
                }
                let ReturnFlow {
                    value,
                    code,
                    error_code,
                    error_info,
                    ..
                } = *ret;
                match code {
                    ReturnCode::Ok => Ok(value),
                    ReturnCode::Error => {
                        let mut error = ScriptError::new(value);
                        if let Some(code) = error_code {
                            error.code = code;
                        }
                        if let Some(info) = error_info {
                            error.info = info;
                        }
                        Err(Flow::Error(error))
                    }
                    ReturnCode::Return => Err(Flow::Return(Box::new(ReturnFlow {
                        value,
                        code: ReturnCode::Ok,
                        level: 1,
                        error_code: None,
                        error_info: None,
                    }))),
                    ReturnCode::Break => Err(Flow::Break),
                    ReturnCode::Continue => Err(Flow::Continue),
                }
            }
            Flow::Break => Err(Flow::error("invoked \"break\" outside of a loop")),
            Flow::Continue => Err(Flow::error("invoked \"continue\" outside of a loop")),
            Flow::Error(error) => Err(Flow::Error(error)),
        }
    }
}

impl From<String> for Flow {
    fn from(message: String) -> Self {
        Flow::error(message)
    }
}

impl From<ScriptError> for Flow {
    fn from(error: ScriptError) -> Self {
        Flow::Error(error)
    }
}

pub type EvalResult = Result<Obj, Flow>;
