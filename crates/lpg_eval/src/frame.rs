//! Activation records.

use crate::classes::ClassId;
use crate::value::Value;
use lpg_ast::TypeRef;
use rustc_hash::FxHashMap;

/// How a statement completed.
#[derive(Debug, Clone)]
pub(crate) enum Flow {
    Normal,
    Break(Option<String>),
    Continue(Option<String>),
    Return(Value),
}

#[derive(Default)]
pub(crate) struct Scope {
    pub vars: FxHashMap<String, Value>,
    /// Local classes declared in this block.
    pub types: FxHashMap<String, ClassId>,
}

pub(crate) struct Frame {
    /// The class whose code is executing.
    pub class: ClassId,
    pub this: Option<Value>,
    pub returns: TypeRef,
    pub scopes: Vec<Scope>,
}

impl Frame {
    pub fn new(class: ClassId, this: Option<Value>) -> Self {
        Frame {
            class,
            this,
            returns: TypeRef::void(),
            scopes: vec![Scope::default()],
        }
    }

    pub fn returning(mut self, returns: TypeRef) -> Self {
        self.returns = returns;
        self
    }

    pub fn push(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    pub fn declare(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.vars.insert(name.to_string(), value);
        }
    }

    pub fn declare_type(&mut self, name: &str, id: ClassId) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.types.insert(name.to_string(), id);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|s| s.vars.get(name))
    }

    /// Assigns an existing variable; false if none is in scope.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        match self.scopes.iter_mut().rev().find_map(|s| s.vars.get_mut(name)) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn local_type(&self, name: &str) -> Option<ClassId> {
        self.scopes.iter().rev().find_map(|s| s.types.get(name).copied())
    }

    /// Every visible variable, inner declarations shadowing outer ones.
    pub fn snapshot(&self) -> FxHashMap<String, Value> {
        let mut vars = FxHashMap::default();
        for scope in &self.scopes {
            for (name, value) in &scope.vars {
                vars.insert(name.clone(), value.clone());
            }
        }
        vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inner_scopes_shadow_and_unwind() {
        let mut frame = Frame::new(ClassId::for_tests(0), None);
        frame.declare("x", Value::Int(1));
        frame.push();
        frame.declare("x", Value::Int(2));
        assert_eq!(frame.get("x"), Some(&Value::Int(2)));
        assert_eq!(frame.snapshot().get("x"), Some(&Value::Int(2)));
        frame.pop();
        assert_eq!(frame.get("x"), Some(&Value::Int(1)));
        assert!(!frame.set("y", Value::Null));
    }
}
