//! `@SwingInvokeLater` and `@SwingInvokeAndWait`: run a void method's body
//! on the AWT event dispatch thread.

use super::{method_target, qualify_this, rethrow_chain, usage};
use crate::editor::TypeEditor;
use crate::error::HandlerResult;
use crate::handler::{Handler, HandlerContext, Outcome, Target, Trigger};
use lpg_ast::factory::*;
use lpg_ast::*;
use lpg_diagnostics::messages;

const EVENT_QUEUE: &str = "java.awt.EventQueue";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Later,
    AndWait,
}

fn dispatch(mode: Mode, runnable: &str) -> Statement {
    let queue = || name(EVENT_QUEUE);
    match mode {
        Mode::Later => call("invokeLater").on(queue()).arg(name(runnable)).into(),
        Mode::AndWait => {
            let mut unwrap = vec![Statement::from(
                local(TypeRef::new("java.lang.Throwable"), "$cause")
                    .final_()
                    .init(call("getCause").on(name("$ex2"))),
            )];
            unwrap.extend(rethrow_chain(
                "$cause",
                &[TypeRef::new("java.lang.RuntimeException"), TypeRef::new("java.lang.Error")],
            ));
            unwrap.push(throw_(new_(TypeRef::new("java.lang.RuntimeException")).arg(name("$cause"))));
            try_(block().stmt(call("invokeAndWait").on(queue()).arg(name(runnable))))
                .catch_(
                    arg(TypeRef::new("java.lang.InterruptedException"), "$ex1").final_(),
                    block().stmt(call("interrupt").on(call("currentThread").on(name("java.lang.Thread")))),
                )
                .catch_(
                    arg(TypeRef::new("java.lang.reflect.InvocationTargetException"), "$ex2").final_(),
                    block().stmts(unwrap),
                )
                .into()
        }
    }
}

fn swing_body(mode: Mode, owner: &str, decl: &MethodDecl) -> Vec<Statement> {
    let runnable = format!("${}Runnable", decl.name);
    let mut statements = decl.statements.clone();
    if !decl.is_static() {
        qualify_this(&mut statements, owner);
    }
    let run = method(TypeRef::void(), "run").public().implementing().stmts(statements);
    let task = new_(TypeRef::new("java.lang.Runnable")).body(class_decl("").make_anonymous().with_method(run));
    vec![
        Statement::from(local(TypeRef::new("java.lang.Runnable"), runnable.clone()).final_().init(task)),
        Statement::from(
            if_(call("isDispatchThread").on(name(EVENT_QUEUE)))
                .then(block().stmt(call("run").on(name(runnable.clone()))))
                .else_(block().stmt(dispatch(mode, &runnable))),
        ),
    ]
}

pub struct SwingInvokeHandler;

impl Handler for SwingInvokeHandler {
    fn name(&self) -> &'static str {
        "SwingInvoke"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Annotation(&["SwingInvokeLater", "SwingInvokeAndWait"])
    }

    fn handle(&self, ctx: &mut HandlerContext<'_>, mut editor: TypeEditor<'_>, target: Target) -> HandlerResult<Outcome> {
        let index = method_target(ctx, target)?;
        let decl = editor.method(index)?;
        if decl.no_body || decl.is_abstract() {
            return Err(usage(ctx, &messages::_0_CAN_ONLY_BE_USED_ON_CONCRETE_METHODS));
        }
        if !decl.return_type.is_void() {
            return Err(usage(ctx, &messages::_0_CAN_ONLY_BE_USED_ON_VOID_METHODS));
        }
        let mode = if ctx.annotation_name() == "SwingInvokeAndWait" {
            Mode::AndWait
        } else {
            Mode::Later
        };
        let body = swing_body(mode, editor.name(), decl);
        let mut method_editor = editor.method_editor(index)?;
        method_editor.make_args_final();
        method_editor.replace_body(body);
        Ok(Outcome::Applied(editor.rebuild()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_thread_runs_inline() {
        let decl = method(TypeRef::void(), "repaint").stmt(call("paint").on(this()));
        let body = swing_body(Mode::Later, "Panel", &decl);
        assert_eq!(body.len(), 2);
        let Statement::If(check) = &body[1] else {
            panic!("expected if");
        };
        assert_eq!(
            *check.then,
            Statement::from(block().stmt(call("run").on(name("$repaintRunnable"))))
        );
    }

    #[test]
    fn test_and_wait_unwraps_invocation_target() {
        let Statement::Try(guard) = dispatch(Mode::AndWait, "$r") else {
            panic!("expected try");
        };
        assert_eq!(guard.catches.len(), 2);
        assert_eq!(guard.catches[1].body.statements.len(), 4);
    }
}
