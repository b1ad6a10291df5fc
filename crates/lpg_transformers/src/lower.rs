//! Lowering of synthesized fragments before they are spliced into a type.
//!
//! Every declaration a handler produces is stamped `SYNTHESIZED` and
//! attributed to the triggering annotation's span, and every
//! `ReturnDefault` is resolved against the return type of its enclosing
//! method.

use crate::error::InternalError;
use lpg_ast::visit_mut::{walk_class_mut, walk_statement_mut, VisitMut};
use lpg_ast::*;
use lpg_core::TextSpan;

struct Lowering {
    span: Option<TextSpan>,
    /// Return types of enclosing bodies; `None` for bodies that cannot return a value.
    returns: Vec<Option<TypeRef>>,
    context: String,
    error: Option<InternalError>,
}

impl Lowering {
    fn new(span: Option<TextSpan>, context: impl Into<String>) -> Self {
        Self {
            span,
            returns: Vec::new(),
            context: context.into(),
            error: None,
        }
    }

    fn finish(self) -> Result<(), InternalError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl VisitMut for Lowering {
    fn visit_class_mut(&mut self, class: &mut ClassDecl) {
        class.data.stamp(self.span);
        for field in &mut class.fields {
            field.data.stamp(self.span);
        }
        for init in &mut class.initializers {
            init.data.stamp(self.span);
        }
        for constant in &mut class.enum_constants {
            constant.data.stamp(self.span);
        }
        walk_class_mut(self, class);
    }

    fn visit_method_mut(&mut self, method: &mut MethodDecl) {
        method.data.stamp(self.span);
        self.returns.push(Some(method.return_type.clone()));
        self.visit_statements_mut(&mut method.statements);
        self.returns.pop();
    }

    fn visit_constructor_mut(&mut self, ctor: &mut ConstructorDecl) {
        ctor.data.stamp(self.span);
        self.returns.push(Some(TypeRef::void()));
        self.visit_statements_mut(&mut ctor.statements);
        self.returns.pop();
    }

    fn visit_initializer_mut(&mut self, init: &mut Initializer) {
        self.returns.push(None);
        self.visit_statements_mut(&mut init.statements);
        self.returns.pop();
    }

    fn visit_statement_mut(&mut self, stmt: &mut Statement) {
        if let Statement::ReturnDefault = stmt {
            match self.returns.last() {
                Some(Some(ty)) if ty.is_void() => *stmt = Statement::Return(None),
                Some(Some(ty)) => *stmt = Statement::Return(Some(ty.default_value())),
                _ => {
                    if self.error.is_none() {
                        self.error = Some(InternalError::MissingEnclosingMethod {
                            context: self.context.clone(),
                        });
                    }
                }
            }
            return;
        }
        walk_statement_mut(self, stmt);
    }
}

pub fn lower_field(field: &mut FieldDecl, span: Option<TextSpan>) -> Result<(), InternalError> {
    let mut lowering = Lowering::new(span, format!("field '{}'", field.name));
    field.data.stamp(span);
    lowering.visit_field_mut(field);
    lowering.finish()
}

pub fn lower_method(method: &mut MethodDecl, span: Option<TextSpan>) -> Result<(), InternalError> {
    let mut lowering = Lowering::new(span, format!("method '{}'", method.name));
    lowering.visit_method_mut(method);
    lowering.finish()
}

pub fn lower_constructor(ctor: &mut ConstructorDecl, span: Option<TextSpan>) -> Result<(), InternalError> {
    let mut lowering = Lowering::new(span, format!("constructor '{}'", ctor.name));
    lowering.visit_constructor_mut(ctor);
    lowering.finish()
}

pub fn lower_initializer(init: &mut Initializer, span: Option<TextSpan>) -> Result<(), InternalError> {
    let mut lowering = Lowering::new(span, "initializer");
    init.data.stamp(span);
    lowering.visit_initializer_mut(init);
    lowering.finish()
}

pub fn lower_class(class: &mut ClassDecl, span: Option<TextSpan>) -> Result<(), InternalError> {
    let mut lowering = Lowering::new(span, format!("type '{}'", class.name));
    lowering.visit_class_mut(class);
    lowering.finish()
}

/// Lower a replacement body for a method returning `return_type`.
pub fn lower_body(
    statements: &mut Vec<Statement>,
    return_type: &TypeRef,
    span: Option<TextSpan>,
) -> Result<(), InternalError> {
    let mut lowering = Lowering::new(span, "method body");
    lowering.returns.push(Some(return_type.clone()));
    lowering.visit_statements_mut(statements);
    lowering.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpg_ast::factory::*;

    #[test]
    fn test_return_default_resolves_per_method() {
        let mut m = method(ty("int"), "f").stmt(return_default()).stmt(
            local(ty("Runnable"), "r").init(
                new_(ty("Runnable")).body(class_decl("").with_method(method(TypeRef::void(), "run").stmt(return_default()))),
            ),
        );
        lower_method(&mut m, Some(TextSpan::new(4, 2))).unwrap();
        assert_eq!(m.statements[0], return_(int(0)));
        assert!(m.data.is_synthesized());
        assert_eq!(m.data.span, Some(TextSpan::new(4, 2)));
        let Statement::LocalDecl(decl) = &m.statements[1] else {
            panic!("expected local");
        };
        let Some(Expression::New(new)) = &decl.init else {
            panic!("expected new");
        };
        let body = new.body.as_ref().unwrap();
        assert_eq!(body.methods[0].statements[0], return_void());
        assert!(body.methods[0].data.is_synthesized());
    }

    #[test]
    fn test_return_default_without_method_is_internal_error() {
        let mut init = static_initializer().stmt(return_default());
        let err = lower_initializer(&mut init, None).unwrap_err();
        assert!(matches!(err, InternalError::MissingEnclosingMethod { .. }));
    }
}
