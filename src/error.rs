//! Errors crossing the bridge.

use std::rc::Rc;

use thiserror::Error;

use crate::object::Exception;
use crate::script::ScriptError;

pub type Result<T> = std::result::Result<T, BridgeError>;

/// Everything a bridge operation can fail with.
///
/// User errors (a missing variable, a bad index) are distinguished from
/// internal ones (a broken exception handler, a missing bridge class) by
/// [`BridgeError::is_internal`]; only the latter point at a broken
/// installation.
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    /// A value could not be marshalled into the script runtime.
    #[error("{0}")]
    Conversion(String),

    /// A script value could not be coerced to the requested type.
    #[error("{0}")]
    TypeCoercion(String),

    #[error("{0}")]
    Name(String),

    #[error("{0}")]
    Index(String),

    #[error("{0}")]
    Key(String),

    #[error("{0}")]
    ZeroDivision(String),

    #[error("{0}")]
    Type(String),

    #[error("{0}")]
    Value(String),

    /// An error raised by script code.
    #[error("{0}")]
    Script(ScriptError),

    /// An exception raised by object code, passed through unchanged.
    #[error("{0}")]
    Object(Rc<Exception>),

    #[error("twine internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    pub fn is_internal(&self) -> bool {
        matches!(self, BridgeError::Internal(_))
    }

    /// Short name of the error kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::Conversion(_) => "conversion",
            BridgeError::TypeCoercion(_) => "type-coercion",
            BridgeError::Name(_) => "name",
            BridgeError::Index(_) => "index",
            BridgeError::Key(_) => "key",
            BridgeError::ZeroDivision(_) => "zero-division",
            BridgeError::Type(_) => "type",
            BridgeError::Value(_) => "value",
            BridgeError::Script(_) => "script",
            BridgeError::Object(_) => "object",
            BridgeError::Internal(_) => "internal",
        }
    }
}

impl From<ScriptError> for BridgeError {
    fn from(error: ScriptError) -> Self {
        BridgeError::Script(error)
    }
}

impl From<Exception> for BridgeError {
    fn from(exception: Exception) -> Self {
        BridgeError::Object(Rc::new(exception))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_internal_errors_are_internal() {
        assert!(BridgeError::Internal("no handler".into()).is_internal());
        assert!(!BridgeError::Name("x".into()).is_internal());
        assert!(!BridgeError::Script(ScriptError::new("boom")).is_internal());
    }

    #[test]
    fn messages_pass_through() {
        let error = BridgeError::TypeCoercion("expected integer but got \"abc\"".into());
        assert_eq!(error.to_string(), "expected integer but got \"abc\"");
        assert_eq!(
            BridgeError::Internal("gone".into()).to_string(),
            "twine internal error: gone"
        );
        assert_eq!(BridgeError::from(ScriptError::new("boom")).kind(), "script");
    }
}
