//! Error taxonomy for handlers.
//!
//! A [`HandlerError`] aborts one annotation occurrence and leaves the AST
//! untouched. Soft conditions (a member that already exists) are not errors;
//! handlers report them through [`crate::handler::HandlerContext::warn`] and
//! carry on or skip.

use lpg_diagnostics::{messages, Diagnostic, DiagnosticMessage};

/// A malformed annotation member.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnnotationError {
    #[error("member '{member}' must be {expected}")]
    TypeMismatch { member: String, expected: &'static str },
    #[error("member '{member}' has unknown constant '{value}'")]
    UnknownConstant { member: String, value: String },
}

impl AnnotationError {
    pub fn member(&self) -> &str {
        match self {
            AnnotationError::TypeMismatch { member, .. } | AnnotationError::UnknownConstant { member, .. } => {
                member
            }
        }
    }
}

/// A broken invariant inside the transformation layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InternalError {
    #[error("'return default' in {context} has no enclosing method")]
    MissingEnclosingMethod { context: String },
    #[error("{what} index {index} is out of range")]
    IndexOutOfRange { what: &'static str, index: usize },
    #[error("handler invoked on an unsupported target")]
    UnsupportedTarget,
    #[error("state {0} has no case in the state machine")]
    UnknownState(i32),
}

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// Misuse of an annotation, reported from the message catalog.
    #[error("{}", render(.message, .args))]
    Usage {
        message: &'static DiagnosticMessage,
        args: Vec<String>,
    },
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

fn render(message: &DiagnosticMessage, args: &[String]) -> String {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    message.format(&args)
}

impl HandlerError {
    pub fn usage(message: &'static DiagnosticMessage, args: &[&str]) -> Self {
        HandlerError::Usage {
            message,
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Convert into a diagnostic for the annotation `annotation_name`.
    pub fn to_diagnostic(&self, annotation_name: &str) -> Diagnostic {
        match self {
            HandlerError::Usage { message, args } => {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                Diagnostic::new(message, &args)
            }
            HandlerError::Annotation(err) => {
                let detail = err.to_string();
                Diagnostic::new(&messages::INVALID_VALUE_FOR_0_1, &[err.member(), &detail])
            }
            HandlerError::Internal(err) => {
                let detail = err.to_string();
                Diagnostic::new(&messages::INTERNAL_ERROR_WHILE_HANDLING_0_1, &[annotation_name, &detail])
            }
        }
    }
}

pub type HandlerResult<T> = Result<T, HandlerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_error_renders_template() {
        let err = HandlerError::usage(&messages::_0_IS_ONLY_SUPPORTED_ON_A_CLASS, &["Builder"]);
        assert_eq!(err.to_string(), "@Builder is only supported on a class.");
        let diag = err.to_diagnostic("Builder");
        assert_eq!(diag.code, 1001);
        assert!(diag.is_error());
    }

    #[test]
    fn test_internal_error_is_reported_as_error() {
        let err = HandlerError::from(InternalError::UnknownState(7));
        let diag = err.to_diagnostic("Yield");
        assert!(diag.is_error());
        assert!(diag.message_text.contains("state 7"));
    }
}
