//! lpg_transformers: Annotation handlers and the dispatcher that runs them.
//!
//! A [`Transformer`] walks each type of a compilation unit, hands every
//! recognized annotation to its [`Handler`] through a [`TypeEditor`], and
//! turns methods that call `yield(...)` into state-machine iterators.
//! Handlers validate first and edit second: a rejected occurrence leaves
//! the type exactly as it was and reports a diagnostic.

pub mod annotation;
pub mod editor;
pub mod error;
pub mod handler;
pub mod handlers;
pub mod lower;
pub mod registry;
pub mod resolver;
pub mod transformer;

pub use annotation::AnnotationValues;
pub use editor::{AnnotationSite, MethodEditor, Rebuilt, TypeEditor};
pub use error::{AnnotationError, HandlerError, HandlerResult, InternalError};
pub use handler::{Handler, HandlerContext, Outcome, Target, Trigger};
pub use registry::HandlerRegistry;
pub use resolver::{BuiltinResolver, ResolvedType, TypeResolver, UnitResolver};
pub use transformer::Transformer;
