//! Evaluation errors.

use crate::value::Value;

/// A failure to evaluate, as opposed to a Java exception the program
/// throws and may catch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("unknown type '{0}'")]
    UnknownType(String),
    #[error("unknown name '{0}'")]
    UnknownName(String),
    #[error("{owner} has no method {name} taking {arity} arguments")]
    UnknownMethod { owner: String, name: String, arity: usize },
    #[error("{owner} has no field '{field}'")]
    UnknownField { owner: String, field: String },
    #[error("{class} has no constructor taking {arity} arguments")]
    UnknownConstructor { class: String, arity: usize },
    #[error("cannot instantiate {0}")]
    NotInstantiable(String),
    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: &'static str, found: String },
    #[error("'{0}' outside of a loop or switch")]
    StrayJump(&'static str),
    #[error("{0} is not supported by the interpreter")]
    Unsupported(String),
    #[error("await() would block forever on a single thread")]
    WouldBlock,
    #[error("uncaught {class}{}", render_message(.message))]
    Uncaught { class: String, message: Option<String> },
}

fn render_message(message: &Option<String>) -> String {
    message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default()
}

pub type EvalResult<T> = Result<T, EvalError>;

/// Abrupt completion: a thrown Java value or an interpreter failure.
#[derive(Debug, Clone)]
pub(crate) enum Unwind {
    Throw(Value),
    Error(EvalError),
}

impl From<EvalError> for Unwind {
    fn from(err: EvalError) -> Self {
        Unwind::Error(err)
    }
}

pub(crate) type Exec<T> = Result<T, Unwind>;

pub(crate) fn mismatch(expected: &'static str, found: &Value) -> Unwind {
    Unwind::Error(EvalError::TypeMismatch {
        expected,
        found: found.kind().to_string(),
    })
}
