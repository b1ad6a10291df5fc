//! lpg_ast: Neutral Java AST for annotation-driven code synthesis.
//!
//! The tree is an owned value tree: every child is owned by exactly one
//! parent, and parent relationships are recovered during traversal through
//! [`path::NodePath`]. Handlers build fragments with the fluent [`factory`]
//! so that construction code reads like the Java it produces.

pub mod factory;
pub mod node;
pub mod path;
pub mod types;
pub mod visit_mut;
pub mod visitor;

// Re-export key types
pub use node::*;
pub use types::*;
