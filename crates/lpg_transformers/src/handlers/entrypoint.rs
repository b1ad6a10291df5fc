//! `@Application` and `@JvmAgent`: static JVM entry points delegating to an
//! instance method of a fresh object.

use super::usage;
use crate::editor::TypeEditor;
use crate::error::{HandlerError, HandlerResult};
use crate::handler::{Handler, HandlerContext, Outcome, Target, Trigger};
use lpg_ast::factory::*;
use lpg_ast::*;
use lpg_diagnostics::messages;

/// One generated entry point.
struct EntryPoint {
    name: &'static str,
    args: Vec<Argument>,
    /// Arguments of the delegate call.
    forward: Vec<Expression>,
}

/// The delegate an annotation requires and the entry points it yields.
struct Family {
    delegate: &'static str,
    delegate_signature: &'static str,
    arity: usize,
    entry_points: Vec<EntryPoint>,
}

fn application() -> Family {
    Family {
        delegate: "runApp",
        delegate_signature: "runApp(String[])",
        arity: 1,
        entry_points: vec![EntryPoint {
            name: "main",
            args: vec![arg(TypeRef::string().array_of(), "args").final_()],
            forward: vec![name("args")],
        }],
    }
}

fn jvm_agent() -> Family {
    let agent_args = || {
        vec![
            arg(TypeRef::string(), "params").final_(),
            arg(TypeRef::new("java.lang.instrument.Instrumentation"), "instrumentation").final_(),
        ]
    };
    Family {
        delegate: "runAgent",
        delegate_signature: "runAgent(String, Instrumentation, boolean)",
        arity: 3,
        entry_points: [("agentmain", true), ("premain", false)]
            .into_iter()
            .map(|(entry, injected)| EntryPoint {
                name: entry,
                args: agent_args(),
                forward: vec![name("params"), name("instrumentation"), bool_(injected)],
            })
            .collect(),
    }
}

fn entry_method(owner: TypeRef, delegate: &str, entry: EntryPoint) -> MethodDecl {
    method(TypeRef::void(), entry.name)
        .public()
        .static_()
        .with_args(entry.args)
        .with_thrown(TypeRef::new("java.lang.Throwable"))
        .stmt(call(delegate).on(new_(owner)).args(entry.forward))
}

pub struct EntrypointHandler;

impl Handler for EntrypointHandler {
    fn name(&self) -> &'static str {
        "Entrypoint"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Annotation(&["Application", "JvmAgent"])
    }

    fn handle(&self, ctx: &mut HandlerContext<'_>, mut editor: TypeEditor<'_>, target: Target) -> HandlerResult<Outcome> {
        if target != Target::Type || editor.is_interface() || editor.is_enum() {
            return Err(usage(ctx, &messages::_0_IS_ONLY_SUPPORTED_ON_A_CLASS));
        }
        let family = if ctx.annotation_name() == "JvmAgent" {
            jvm_agent()
        } else {
            application()
        };
        let has_delegate = editor
            .methods()
            .iter()
            .any(|m| m.name == family.delegate && m.arity() == family.arity && !m.is_static());
        if !has_delegate {
            return Err(HandlerError::usage(
                &messages::_0_REQUIRES_METHOD_1,
                &[ctx.annotation_name(), family.delegate_signature],
            ));
        }

        let owner = editor.type_ref();
        for entry in family.entry_points {
            if editor.has_method(entry.name, Some(entry.args.len())) {
                ctx.warn(&messages::METHOD_0_ALREADY_EXISTS, &[entry.name]);
                continue;
            }
            editor.inject_method(entry_method(owner.clone(), family.delegate, entry));
        }
        Ok(Outcome::Applied(editor.rebuild()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_entry_points_pass_injection_flag() {
        let family = jvm_agent();
        let names: Vec<_> = family.entry_points.iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["agentmain", "premain"]);
        assert_eq!(family.entry_points[0].forward[2], true_());
        assert_eq!(family.entry_points[1].forward[2], false_());
    }

    #[test]
    fn test_main_delegates_to_new_instance() {
        let mut family = application();
        let main = entry_method(ty("Tool"), family.delegate, family.entry_points.remove(0));
        assert!(main.is_static());
        assert_eq!(
            main.statements[0],
            Statement::from(call("runApp").on(new_(ty("Tool"))).arg(name("args")))
        );
    }
}
