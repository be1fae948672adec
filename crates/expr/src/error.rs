use std::fmt;

use serde::Serialize;

/// The two failure classes of the expression language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Malformed rule text.
    ParseError,
    /// Type or arity mismatch while reducing a call.
    EvalError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::ParseError => write!(f, "parse error"),
            ErrorKind::EvalError => write!(f, "eval error"),
        }
    }
}

/// An expression error. Carried either as the `Err` side of a `Result`
/// or embedded in a tree as [`Value::Error`](crate::Value::Error).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ExprError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ExprError {
    pub fn parse(message: impl Into<String>) -> Self {
        ExprError {
            kind: ErrorKind::ParseError,
            message: message.into(),
        }
    }

    pub fn eval(message: impl Into<String>) -> Self {
        ExprError {
            kind: ErrorKind::EvalError,
            message: message.into(),
        }
    }

    pub fn is_parse_error(&self) -> bool {
        self.kind == ErrorKind::ParseError
    }

    pub fn is_eval_error(&self) -> bool {
        self.kind == ErrorKind::EvalError
    }
}
