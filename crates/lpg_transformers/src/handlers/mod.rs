//! Built-in handlers, one module per annotation family.

pub mod bound_setter;
pub mod builder;
pub mod do_privileged;
pub mod entrypoint;
pub mod enum_id;
pub mod fluent_setter;
pub mod functions;
pub mod listener_support;
pub mod lock;
pub mod rethrow;
pub mod singleton;
pub mod swing_invoke;
pub mod yielder;

use crate::annotation::AnnotationValues;
use crate::error::{HandlerError, HandlerResult, InternalError};
use crate::handler::{Handler, HandlerContext, Target};
use lpg_ast::factory::*;
use lpg_ast::visit_mut::{walk_expression_mut, walk_statement_mut, VisitMut};
use lpg_ast::*;
use lpg_diagnostics::{messages, DiagnosticMessage};

/// Every built-in handler, in registration order.
pub fn builtin() -> Vec<Box<dyn Handler>> {
    vec![
        Box::new(builder::BuilderHandler),
        Box::new(builder::ExtensionHandler),
        Box::new(bound_setter::BoundSetterHandler),
        Box::new(fluent_setter::FluentSetterHandler),
        Box::new(lock::ConditionAndLockHandler),
        Box::new(do_privileged::DoPrivilegedHandler),
        Box::new(entrypoint::EntrypointHandler),
        Box::new(enum_id::EnumIdHandler),
        Box::new(listener_support::ListenerSupportHandler),
        Box::new(rethrow::RethrowHandler),
        Box::new(singleton::SingletonHandler),
        Box::new(swing_invoke::SwingInvokeHandler),
        Box::new(functions::FunctionsHandler),
        Box::new(yielder::YieldHandler),
    ]
}

// ============================================================================
// Shared helpers
// ============================================================================

/// The triggering annotation's members.
pub(crate) fn values<'c>(ctx: &'c HandlerContext<'_>) -> HandlerResult<AnnotationValues<'c>> {
    ctx.values().ok_or(HandlerError::Internal(InternalError::UnsupportedTarget))
}

pub(crate) fn usage(ctx: &HandlerContext<'_>, message: &'static DiagnosticMessage) -> HandlerError {
    HandlerError::usage(message, &[ctx.annotation_name()])
}

pub(crate) fn method_target(ctx: &HandlerContext<'_>, target: Target) -> HandlerResult<usize> {
    match target {
        Target::Method(index) => Ok(index),
        _ => Err(usage(ctx, &messages::_0_IS_ONLY_SUPPORTED_ON_A_METHOD)),
    }
}

/// The access level in the annotation's `value` member, or `default`.
pub(crate) fn access_value(values: &AnnotationValues<'_>, default: AccessLevel) -> HandlerResult<AccessLevel> {
    Ok(values.access_level("value")?.unwrap_or(default))
}

/// Fields a type-level setter annotation applies to: instance, non-final,
/// not synthetic, and not carrying their own copy of `annotation`.
pub(crate) fn settable_fields<'f>(class: &'f ClassDecl, annotation: &str) -> Vec<(usize, &'f FieldDecl)> {
    class
        .fields
        .iter()
        .enumerate()
        .filter(|(_, f)| !f.is_static() && !f.is_final() && !f.name.starts_with('$') && !f.has_annotation(annotation))
        .collect()
}

/// Rejects static or final fields for field-level setter annotations.
pub(crate) fn check_settable_field(ctx: &HandlerContext<'_>, field: &FieldDecl) -> HandlerResult<()> {
    if field.is_static() {
        return Err(HandlerError::usage(
            &messages::_0_CANNOT_BE_USED_ON_STATIC_FIELD_1,
            &[ctx.annotation_name(), &field.name],
        ));
    }
    if field.is_final() {
        return Err(HandlerError::usage(
            &messages::_0_CANNOT_BE_USED_ON_FINAL_FIELD_1,
            &[ctx.annotation_name(), &field.name],
        ));
    }
    Ok(())
}

/// Copies of `args` with the `final` modifier set.
pub(crate) fn final_args(args: &[Argument]) -> Vec<Argument> {
    args.iter()
        .cloned()
        .map(|mut arg| {
            arg.modifiers |= Modifiers::FINAL;
            arg
        })
        .collect()
}

/// The argument names as expressions, for forwarding calls.
pub(crate) fn arg_names(args: &[Argument]) -> Vec<Expression> {
    args.iter().map(|a| name(a.name.clone())).collect()
}

/// Rewrites a method body for relocation into an anonymous or local class
/// nested in `outer`: unqualified `this` becomes `Outer.this`. Nested
/// classes inside the body are left alone.
pub(crate) struct QualifyThis<'o> {
    pub outer: &'o str,
}

impl VisitMut for QualifyThis<'_> {
    fn visit_class_mut(&mut self, _class: &mut ClassDecl) {}

    fn visit_expression_mut(&mut self, expr: &mut Expression) {
        if let Expression::This(None) = expr {
            *expr = this_of(self.outer);
            return;
        }
        walk_expression_mut(self, expr);
    }
}

pub(crate) fn qualify_this(statements: &mut Vec<Statement>, outer: &str) {
    QualifyThis { outer }.visit_statements_mut(statements);
}

/// Replaces `return;` with `return value;` outside nested classes.
pub(crate) struct ReturnValue<'v> {
    pub value: &'v Expression,
}

impl VisitMut for ReturnValue<'_> {
    fn visit_class_mut(&mut self, _class: &mut ClassDecl) {}

    fn visit_statement_mut(&mut self, stmt: &mut Statement) {
        if let Statement::Return(None) = stmt {
            *stmt = Statement::Return(Some(self.value.clone()));
            return;
        }
        walk_statement_mut(self, stmt);
    }

    fn visit_expression_mut(&mut self, _expr: &mut Expression) {}
}

pub(crate) fn return_value(statements: &mut Vec<Statement>, value: &Expression) {
    ReturnValue { value }.visit_statements_mut(statements);
}

/// Whether control may fall off the end of `statements`.
pub(crate) fn completes_normally(statements: &[Statement]) -> bool {
    !statements.last().is_some_and(Statement::is_terminal)
}

/// `if (cause instanceof T) throw (T) cause;` for each of `types`.
pub(crate) fn rethrow_chain(cause: &str, types: &[TypeRef]) -> Vec<Statement> {
    types
        .iter()
        .map(|ty| {
            Statement::from(if_(instance_of(name(cause), ty.clone())).then(throw_(cast(ty.clone(), name(cause)))))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpg_ast::factory::*;

    #[test]
    fn test_qualify_this_skips_nested_classes() {
        let mut stmts = vec![
            Statement::from(call("run").on(this())),
            Statement::from(
                local(ty("Object"), "o")
                    .init(new_(ty("Object")).body(class_decl("").with_method(method(ty("Object"), "self").stmt(return_(this()))))),
            ),
        ];
        qualify_this(&mut stmts, "Outer");
        assert_eq!(stmts[0], Statement::from(call("run").on(this_of("Outer"))));
        let Statement::LocalDecl(decl) = &stmts[1] else {
            panic!("expected local");
        };
        let Some(Expression::New(new)) = &decl.init else {
            panic!("expected new");
        };
        assert_eq!(new.body.as_ref().unwrap().methods[0].statements[0], return_(this()));
    }

    #[test]
    fn test_return_value_rewrites_nested_returns() {
        let mut stmts = vec![
            Statement::from(if_(name("done")).then(return_void())),
            Statement::from(assign(name("x"), int(1))),
        ];
        return_value(&mut stmts, &null());
        assert_eq!(stmts[0], Statement::from(if_(name("done")).then(return_(null()))));
        assert!(completes_normally(&stmts));
        assert!(!completes_normally(&[return_(null())]));
    }
}
