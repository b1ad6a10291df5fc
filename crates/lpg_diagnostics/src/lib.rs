//! lpg_diagnostics: Diagnostic messages and error reporting infrastructure.
//!
//! Handler usage errors and soft warnings surface through this crate. Every
//! message lives in the [`messages`] catalog with a stable code, a category
//! and a `{0}`-style template, and is realized into a [`Diagnostic`] that is
//! attributed to the annotation which triggered the handler.

use lpg_core::text::TextSpan;
use std::fmt;

/// Diagnostic category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCategory {
    Warning,
    Error,
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticCategory::Warning => write!(f, "warning"),
            DiagnosticCategory::Error => write!(f, "error"),
        }
    }
}

/// A diagnostic message template with a code and category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticMessage {
    /// The diagnostic code (e.g., 1001, 2201).
    pub code: u32,
    /// The category of this diagnostic.
    pub category: DiagnosticCategory,
    /// The message template string. May contain `{0}`, `{1}`, etc. placeholders.
    pub message: &'static str,
}

impl DiagnosticMessage {
    /// Render the template with positional arguments.
    pub fn format(&self, args: &[&str]) -> String {
        format_message(self.message, args)
    }
}

/// A realized diagnostic with location information and resolved message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The compilation unit where this diagnostic occurred, if any.
    pub file: Option<String>,
    /// The source span of the triggering annotation, if known.
    pub span: Option<TextSpan>,
    pub message_text: String,
    pub code: u32,
    pub category: DiagnosticCategory,
}

impl Diagnostic {
    /// Create a new diagnostic without location info.
    pub fn new(message: &DiagnosticMessage, args: &[&str]) -> Self {
        Self {
            file: None,
            span: None,
            message_text: format_message(message.message, args),
            code: message.code,
            category: message.category,
        }
    }

    /// Attach a file and an optional span after the fact.
    pub fn located(mut self, file: impl Into<String>, span: Option<TextSpan>) -> Self {
        self.file = Some(file.into());
        self.span = span;
        self
    }

    /// Whether this is an error diagnostic.
    pub fn is_error(&self) -> bool {
        self.category == DiagnosticCategory::Error
    }

    pub fn is_warning(&self) -> bool {
        self.category == DiagnosticCategory::Warning
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref file) = self.file {
            write!(f, "{}", file)?;
            if let Some(span) = self.span {
                write!(f, "({})", span.start)?;
            }
            write!(f, ": ")?;
        }
        write!(
            f,
            "{} LPG{}: {}",
            self.category, self.code, self.message_text
        )
    }
}

/// Format a diagnostic message template by replacing `{0}`, `{1}`, etc. with arguments.
pub fn format_message(template: &str, args: &[&str]) -> String {
    let mut result = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{}}}", i), arg);
    }
    result
}

/// A collection of diagnostics accumulated while transforming compilation units.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticCollection {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollection {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_warning()).count()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn extend(&mut self, other: DiagnosticCollection) {
        self.diagnostics.extend(other.diagnostics);
    }

    /// Sort diagnostics by file and position.
    pub fn sort(&mut self) {
        self.diagnostics.sort_by(|a, b| {
            let file_cmp = a.file.cmp(&b.file);
            if file_cmp != std::cmp::Ordering::Equal {
                return file_cmp;
            }
            let a_pos = a.span.map(|s| s.start).unwrap_or(0);
            let b_pos = b.span.map(|s| s.start).unwrap_or(0);
            a_pos.cmp(&b_pos)
        });
    }
}

impl Extend<Diagnostic> for DiagnosticCollection {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.diagnostics.extend(iter);
    }
}

// ============================================================================
// Diagnostic Messages
// ============================================================================

pub mod messages {
    use super::*;

    macro_rules! diag {
        ($code:expr, Error, $msg:expr) => {
            DiagnosticMessage { code: $code, category: DiagnosticCategory::Error, message: $msg }
        };
        ($code:expr, Warning, $msg:expr) => {
            DiagnosticMessage { code: $code, category: DiagnosticCategory::Warning, message: $msg }
        };
    }

    // ========================================================================
    // Annotation placement and values (1000-1099)
    // ========================================================================
    pub const _0_IS_ONLY_SUPPORTED_ON_A_CLASS: DiagnosticMessage = diag!(1001, Error, "@{0} is only supported on a class.");
    pub const _0_IS_ONLY_SUPPORTED_ON_A_CLASS_OR_FIELD: DiagnosticMessage = diag!(1002, Error, "@{0} is only supported on a class or a field.");
    pub const _0_IS_ONLY_SUPPORTED_ON_A_METHOD: DiagnosticMessage = diag!(1003, Error, "@{0} is only supported on a method.");
    pub const _0_IS_ONLY_SUPPORTED_ON_AN_ENUM: DiagnosticMessage = diag!(1004, Error, "@{0} is only supported on a field of an enum.");
    pub const _0_CAN_ONLY_BE_USED_ON_CONCRETE_METHODS: DiagnosticMessage = diag!(1006, Error, "@{0} can only be used on concrete methods.");
    pub const _0_CAN_ONLY_BE_USED_ON_VOID_METHODS: DiagnosticMessage = diag!(1007, Error, "@{0} can only be used on methods returning void.");
    pub const INVALID_VALUE_FOR_0_1: DiagnosticMessage = diag!(1008, Error, "Invalid value for '{0}': {1}.");
    pub const _0_CANNOT_BE_USED_ON_FINAL_FIELD_1: DiagnosticMessage = diag!(1009, Error, "@{0} cannot be used on final field '{1}'.");
    pub const _0_CANNOT_BE_USED_ON_STATIC_FIELD_1: DiagnosticMessage = diag!(1010, Error, "@{0} cannot be used on static field '{1}'.");
    pub const _0_IS_NOT_SUPPORTED_ON_INTERFACES_OR_ANNOTATIONS: DiagnosticMessage = diag!(1011, Error, "@{0} is not supported on interfaces.");

    // ========================================================================
    // Pre-existing members (1100-1199)
    // ========================================================================
    pub const METHOD_0_ALREADY_EXISTS: DiagnosticMessage = diag!(1101, Warning, "Not generating '{0}()': a method with that name already exists.");
    pub const FIELD_0_ALREADY_EXISTS: DiagnosticMessage = diag!(1102, Warning, "Not generating field '{0}': a field with that name already exists.");
    pub const TYPE_0_ALREADY_EXISTS: DiagnosticMessage = diag!(1103, Warning, "Not generating type '{0}': a type with that name already exists.");

    // ========================================================================
    // Builder (2000-2099)
    // ========================================================================
    pub const BUILDER_EXTENSION_REQUIRES_BUILDER: DiagnosticMessage = diag!(2001, Error, "@Builder.Extension requires @Builder on the enclosing type.");
    pub const BUILDER_EXTENSION_0_MUST_BE_PRIVATE_VOID: DiagnosticMessage = diag!(2002, Warning, "@Builder.Extension method '{0}' must be a private, non-static method returning void.");
    pub const BUILDER_EXTENSION_0_ASSIGNS_SOME_REQUIRED_FIELDS_MISSING_1: DiagnosticMessage = diag!(2003, Warning, "@Builder.Extension method '{0}' assigns some but not all required fields; missing: {1}.");
    pub const BUILDER_CANNOT_FORWARD_0: DiagnosticMessage = diag!(2004, Warning, "Cannot forward '{0}': the type declares no zero-argument method with that name.");
    pub const BUILDER_EXCLUDED_FIELD_0_NOT_FOUND: DiagnosticMessage = diag!(2005, Warning, "Excluded field '{0}' does not exist.");

    // ========================================================================
    // Locks and conditions (2100-2199)
    // ========================================================================
    pub const _0_REQUIRES_A_NON_EMPTY_LOCK_NAME: DiagnosticMessage = diag!(2101, Error, "@{0} requires a non-empty lock name.");
    pub const _0_REQUIRES_A_NON_EMPTY_CONDITION_NAME: DiagnosticMessage = diag!(2102, Error, "@{0} requires a non-empty condition name.");
    pub const CONDITION_METHOD_0_NOT_FOUND: DiagnosticMessage = diag!(2103, Error, "Condition method '{0}()' not found.");
    pub const LOCK_FIELD_0_MUST_BE_OF_TYPE_1: DiagnosticMessage = diag!(2104, Error, "Field '{0}' must be of type {1} to be used as a lock.");

    // ========================================================================
    // Generators (2200-2299)
    // ========================================================================
    pub const YIELD_METHOD_0_MUST_RETURN_ITERATOR_OR_ITERABLE: DiagnosticMessage = diag!(2201, Error, "Method '{0}' uses yield() and must return java.util.Iterator or java.lang.Iterable.");
    pub const YIELD_PARAMETER_0_MUST_BE_FINAL: DiagnosticMessage = diag!(2202, Error, "Parameter '{0}' must be final to be used in a generator method.");
    pub const YIELD_CANNOT_RETURN_A_VALUE: DiagnosticMessage = diag!(2203, Error, "Generator methods cannot return a value; use 'return;' to end iteration.");
    pub const YIELD_NOT_ALLOWED_IN_SYNCHRONIZED: DiagnosticMessage = diag!(2204, Error, "yield() cannot be used inside a synchronized block.");
    pub const YIELD_MUST_BE_A_STATEMENT: DiagnosticMessage = diag!(2205, Error, "yield() must be used as a statement.");
    pub const YIELD_NOT_ALLOWED_IN_NESTED_CLASS: DiagnosticMessage = diag!(2206, Error, "yield() cannot be used inside a nested class.");
    pub const YIELD_TAKES_ONE_ARGUMENT: DiagnosticMessage = diag!(2207, Error, "yield() takes exactly one argument.");

    // ========================================================================
    // Other handlers (2300-2399)
    // ========================================================================
    pub const SINGLETON_ENUM_CANNOT_EXTEND_0: DiagnosticMessage = diag!(2301, Error, "@Singleton(style=ENUM) cannot be used on a type that extends '{0}'.");
    pub const LISTENER_TYPE_0_CANNOT_BE_RESOLVED: DiagnosticMessage = diag!(2302, Error, "Listener type '{0}' cannot be resolved.");
    pub const LISTENER_TYPE_0_MUST_BE_AN_INTERFACE: DiagnosticMessage = diag!(2303, Error, "Listener type '{0}' must be an interface.");
    pub const LISTENER_SUPPORT_REQUIRES_A_TYPE: DiagnosticMessage = diag!(2304, Error, "@ListenerSupport requires at least one listener interface.");
    pub const _0_REQUIRES_METHOD_1: DiagnosticMessage = diag!(2305, Error, "@{0} requires the type to declare '{1}'.");
    pub const _0_CAN_ONLY_BE_USED_ON_METHODS_1: DiagnosticMessage = diag!(2306, Error, "@{0} can only be used on methods {1}.");
    pub const _0_REQUIRES_AN_INSTANCE_FIELD: DiagnosticMessage = diag!(2307, Error, "@{0} can only be used on a non-static field.");
    pub const RETHROW_MESSAGE_REFERENCES_UNKNOWN_PARAMETER_0: DiagnosticMessage = diag!(2308, Warning, "'${0}' in the rethrow message is not a parameter of the method.");
    pub const _0_IS_ONLY_SUPPORTED_ON_STATIC_OR_INSTANCE_CLASSES: DiagnosticMessage = diag!(2309, Error, "@{0} cannot be used on a local or anonymous class.");

    // ========================================================================
    // Internal (9000-9099)
    // ========================================================================
    pub const INTERNAL_ERROR_WHILE_HANDLING_0_1: DiagnosticMessage = diag!(9001, Error, "Internal error while handling @{0}: {1}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_message() {
        let msg = format_message("Parameter '{0}' of '{1}'.", &["x", "foo"]);
        assert_eq!(msg, "Parameter 'x' of 'foo'.");
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::new(&messages::CONDITION_METHOD_0_NOT_FOUND, &["isReady"])
            .located("Example.json", Some(TextSpan::new(10, 5)));
        assert_eq!(
            diag.to_string(),
            "Example.json(10): error LPG2103: Condition method 'isReady()' not found."
        );
    }

    #[test]
    fn test_diagnostic_without_location() {
        let diag = Diagnostic::new(&messages::METHOD_0_ALREADY_EXISTS, &["setName"]);
        assert!(diag.file.is_none());
        assert!(diag.span.is_none());
        assert_eq!(diag.code, 1101);
        assert!(diag.is_warning());
        assert!(!diag.is_error());
    }

    #[test]
    fn test_diagnostic_collection() {
        let mut collection = DiagnosticCollection::new();
        assert!(collection.is_empty());

        collection.add(Diagnostic::new(&messages::METHOD_0_ALREADY_EXISTS, &["x"]));
        assert!(!collection.has_errors());
        collection.add(Diagnostic::new(&messages::YIELD_CANNOT_RETURN_A_VALUE, &[]));
        assert!(collection.has_errors());
        assert_eq!(collection.error_count(), 1);
        assert_eq!(collection.warning_count(), 1);
        assert_eq!(collection.diagnostics()[1].code, 2203);
    }

    #[test]
    fn test_diagnostic_collection_sort() {
        let mut collection = DiagnosticCollection::new();
        collection.add(Diagnostic::new(&messages::YIELD_TAKES_ONE_ARGUMENT, &[]).located("b.json", Some(TextSpan::new(10, 1))));
        collection.add(Diagnostic::new(&messages::YIELD_MUST_BE_A_STATEMENT, &[]).located("a.json", Some(TextSpan::new(5, 1))));
        collection.sort();
        assert_eq!(collection.diagnostics()[0].file.as_deref(), Some("a.json"));
        assert_eq!(collection.diagnostics()[1].file.as_deref(), Some("b.json"));
    }
}
