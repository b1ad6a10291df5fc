//! `@DoPrivileged`: runs the method body inside
//! `AccessController.doPrivileged`.

use super::{completes_normally, method_target, qualify_this, rethrow_chain, return_value, usage};
use crate::editor::TypeEditor;
use crate::error::HandlerResult;
use crate::handler::{Handler, HandlerContext, Outcome, Target, Trigger};
use lpg_ast::factory::*;
use lpg_ast::*;
use lpg_diagnostics::messages;

const ACTION: &str = "java.security.PrivilegedExceptionAction";
const ACTION_FAILURE: &str = "java.security.PrivilegedActionException";

/// The rewritten body of `decl`, which lives in `owner`.
fn privileged_body(owner: &str, decl: &MethodDecl) -> Vec<Statement> {
    let is_void = decl.return_type.is_void();
    let result = if is_void {
        TypeRef::new("java.lang.Void")
    } else {
        decl.return_type.boxed()
    };

    let mut statements = decl.statements.clone();
    if !decl.is_static() {
        qualify_this(&mut statements, owner);
    }
    if is_void {
        return_value(&mut statements, &null());
        if completes_normally(&statements) {
            statements.push(return_(null()));
        }
    }
    let run = method(result.clone(), "run")
        .public()
        .implementing()
        .with_thrown(TypeRef::new("java.lang.Exception"))
        .stmts(statements);
    let action = new_(TypeRef::new(ACTION).arg(result)).body(class_decl("").make_anonymous().with_method(run));
    let privileged = call("doPrivileged").on(name("java.security.AccessController")).arg(action);

    let mut failure = vec![Statement::from(
        local(TypeRef::new("java.lang.Throwable"), "$cause")
            .final_()
            .init(call("getException").on(name("$ex"))),
    )];
    failure.extend(rethrow_chain("$cause", &decl.thrown));
    failure.push(throw_(new_(TypeRef::new("java.lang.RuntimeException")).arg(name("$cause"))));

    let invoke = if is_void {
        Statement::from(privileged)
    } else {
        return_(privileged)
    };
    vec![Statement::from(
        try_(block().stmt(invoke)).catch_(
            arg(TypeRef::new(ACTION_FAILURE), "$ex").final_(),
            block().stmts(failure),
        ),
    )]
}

pub struct DoPrivilegedHandler;

impl Handler for DoPrivilegedHandler {
    fn name(&self) -> &'static str {
        "DoPrivileged"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Annotation(&["DoPrivileged"])
    }

    fn handle(&self, ctx: &mut HandlerContext<'_>, mut editor: TypeEditor<'_>, target: Target) -> HandlerResult<Outcome> {
        let index = method_target(ctx, target)?;
        let decl = editor.method(index)?;
        if decl.no_body || decl.is_abstract() {
            return Err(usage(ctx, &messages::_0_CAN_ONLY_BE_USED_ON_CONCRETE_METHODS));
        }
        let body = privileged_body(editor.name(), decl);
        let mut method_editor = editor.method_editor(index)?;
        method_editor.make_args_final();
        method_editor.replace_body(body);
        Ok(Outcome::Applied(editor.rebuild()?))
    }
}
