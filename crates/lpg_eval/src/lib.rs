//! lpg_eval: A reference interpreter for transformed Java syntax trees.
//!
//! Handlers are checked by running what they generate. The interpreter
//! executes [`lpg_ast`] compilation units directly on one thread, with just
//! enough of the class library for generated code: collections, locks,
//! exceptions, `String.format` and `System.out`.

mod builtins;
mod classes;
mod error;
mod eval;
mod exec;
mod frame;
mod interpreter;
mod ops;
mod value;

pub use classes::ClassId;
pub use error::{EvalError, EvalResult};
pub use interpreter::Interpreter;
pub use value::{ConditionState, Instance, Key, LockState, ObjRef, Object, Throwable, Value};
