//! The handler contract.

use crate::annotation::AnnotationValues;
use crate::editor::{Rebuilt, TypeEditor};
use crate::error::HandlerResult;
use crate::resolver::TypeResolver;
use lpg_ast::Annotation;
use lpg_core::TextSpan;
use lpg_diagnostics::{Diagnostic, DiagnosticMessage};
use lpg_options::TransformOptions;

/// What a handler reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Annotations with any of these simple names (`Builder`, `ReadLock`, ...).
    Annotation(&'static [&'static str]),
    /// `yield(expr);` statements inside a method body.
    YieldCall,
}

impl Trigger {
    pub fn matches(&self, annotation: &Annotation) -> bool {
        match self {
            Trigger::Annotation(names) => names.iter().any(|n| annotation.is(n)),
            Trigger::YieldCall => false,
        }
    }
}

/// The declaration an occurrence sits on, relative to the edited type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Type,
    Field(usize),
    Method(usize),
}

/// How an occurrence ended.
#[derive(Debug)]
pub enum Outcome {
    Applied(Rebuilt),
    /// Nothing to do; the annotation is still consumed.
    Skipped,
}

/// Everything a handler may consult besides the type it edits.
pub struct HandlerContext<'c> {
    pub options: &'c TransformOptions,
    pub resolver: &'c dyn TypeResolver,
    /// The triggering annotation; `None` for yield calls.
    pub annotation: Option<Annotation>,
    pub file: &'c str,
    pub span: Option<TextSpan>,
    warnings: Vec<Diagnostic>,
}

impl<'c> HandlerContext<'c> {
    pub fn new(
        options: &'c TransformOptions,
        resolver: &'c dyn TypeResolver,
        annotation: Option<Annotation>,
        file: &'c str,
        span: Option<TextSpan>,
    ) -> Self {
        Self {
            options,
            resolver,
            annotation,
            file,
            span,
            warnings: Vec::new(),
        }
    }

    /// Typed access to the triggering annotation's members.
    ///
    /// Yield occurrences have no annotation; their reader sees no members.
    pub fn values(&self) -> Option<AnnotationValues<'_>> {
        self.annotation.as_ref().map(AnnotationValues::new)
    }

    /// The triggering annotation's simple name, e.g. `Builder`.
    pub fn annotation_name(&self) -> &str {
        self.annotation
            .as_ref()
            .map(|a| a.ty.simple_name())
            .unwrap_or("yield")
    }

    /// Report a soft condition at the annotation's position.
    pub fn warn(&mut self, message: &DiagnosticMessage, args: &[&str]) {
        tracing::debug!(code = message.code, "handler warning");
        self.warnings
            .push(Diagnostic::new(message, args).located(self.file, self.span));
    }

    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.warnings)
    }
}

/// One annotation family's transformation.
///
/// A handler validates before it schedules anything; returning an error
/// drops the editor and leaves the type untouched. Success is proven by the
/// [`Rebuilt`] token only [`TypeEditor::rebuild`] can produce.
pub trait Handler: Send + Sync {
    /// Stable name used by `disabledHandlers`.
    fn name(&self) -> &'static str;

    fn trigger(&self) -> Trigger;

    fn handle(&self, ctx: &mut HandlerContext<'_>, editor: TypeEditor<'_>, target: Target) -> HandlerResult<Outcome>;
}
