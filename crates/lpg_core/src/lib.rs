//! lpg_core: Core utilities shared by the lpg workspace.
//!
//! Provides source spans for attributing diagnostics and the naming helpers
//! that every handler uses to derive Java member names from field names.

pub mod names;
pub mod text;

// Re-export commonly used types
pub use names::UniqueNames;
pub use text::TextSpan;
