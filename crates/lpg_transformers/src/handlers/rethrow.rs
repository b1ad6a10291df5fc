//! `@Rethrow` and `@Rethrows`: wraps the body in a `try` whose catch
//! clauses rethrow each caught exception wrapped in another type.
//!
//! Messages may reference parameters as `$name`; they are rendered with
//! `String.format` at run time.

use super::{method_target, usage, values};
use crate::annotation::AnnotationValues;
use crate::editor::TypeEditor;
use crate::error::HandlerResult;
use crate::handler::{Handler, HandlerContext, Outcome, Target, Trigger};
use lpg_ast::factory::*;
use lpg_ast::*;
use lpg_diagnostics::messages;
use regex::{Captures, Regex};
use std::sync::OnceLock;

const RUNTIME_EXCEPTION: &str = "java.lang.RuntimeException";

/// One `@Rethrow`.
#[derive(Debug, Clone, PartialEq)]
struct Group {
    /// Caught types; empty means "any checked exception".
    catches: Vec<TypeRef>,
    wrapper: TypeRef,
    message: Option<String>,
}

impl Group {
    fn read(v: &AnnotationValues<'_>) -> HandlerResult<Self> {
        Ok(Group {
            catches: v.classes("value")?,
            wrapper: v.class("as")?.unwrap_or_else(|| TypeRef::new(RUNTIME_EXCEPTION)),
            message: v.string("message")?.filter(|m| !m.is_empty()),
        })
    }
}

/// A format string plus the parameters it references, in order of use.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Message {
    format: String,
    args: Vec<String>,
    unknown: Vec<String>,
}

fn parse_message(text: &str, params: &[&str]) -> Message {
    static PARAM: OnceLock<Regex> = OnceLock::new();
    let re = PARAM.get_or_init(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").expect("valid regex"));

    let mut args = Vec::new();
    let mut unknown = Vec::new();
    let escaped = text.replace('%', "%%");
    let format = re
        .replace_all(&escaped, |caps: &Captures<'_>| {
            let param = &caps[1];
            if params.contains(&param) {
                args.push(param.to_string());
                "%s".to_string()
            } else {
                unknown.push(param.to_string());
                caps[0].to_string()
            }
        })
        .into_owned();
    Message { format, args, unknown }
}

fn wrap(group: &Group, message: Option<&Message>, caught: &str) -> Statement {
    let mut wrapper = new_(group.wrapper.clone());
    if let Some(message) = message {
        let format = call("format")
            .on(name("java.lang.String"))
            .arg(string(message.format.clone()))
            .args(message.args.iter().map(|a| name(a.clone())));
        wrapper = wrapper.arg(format);
    }
    throw_(wrapper.arg(name(caught)))
}

fn rethrow_body(body: Vec<Statement>, groups: &[(Group, Option<Message>)]) -> Vec<Statement> {
    let mut guard = try_(block().stmts(body));
    let mut counter = 0;
    let mut next = || {
        counter += 1;
        format!("$e{}", counter)
    };
    for (group, message) in groups {
        if group.catches.is_empty() {
            let caught = next();
            guard = guard.catch_(
                arg(TypeRef::new(RUNTIME_EXCEPTION), caught.clone()).final_(),
                block().stmt(throw_(name(caught))),
            );
            let caught = next();
            guard = guard.catch_(
                arg(TypeRef::new("java.lang.Exception"), caught.clone()).final_(),
                block().stmt(wrap(group, message.as_ref(), &caught)),
            );
            continue;
        }
        for catch in &group.catches {
            let caught = next();
            guard = guard.catch_(
                arg(catch.clone(), caught.clone()).final_(),
                block().stmt(wrap(group, message.as_ref(), &caught)),
            );
        }
    }
    vec![Statement::from(guard)]
}

pub struct RethrowHandler;

impl Handler for RethrowHandler {
    fn name(&self) -> &'static str {
        "Rethrow"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Annotation(&["Rethrow", "Rethrows"])
    }

    fn handle(&self, ctx: &mut HandlerContext<'_>, mut editor: TypeEditor<'_>, target: Target) -> HandlerResult<Outcome> {
        let index = method_target(ctx, target)?;
        let decl = editor.method(index)?.clone();
        if decl.no_body || decl.is_abstract() {
            return Err(usage(ctx, &messages::_0_CAN_ONLY_BE_USED_ON_CONCRETE_METHODS));
        }

        let v = values(ctx)?;
        let groups = if ctx.annotation_name() == "Rethrows" {
            v.annotations("value")?
                .iter()
                .map(|a| Group::read(&AnnotationValues::new(a)))
                .collect::<HandlerResult<Vec<_>>>()?
        } else {
            vec![Group::read(&v)?]
        };

        let params: Vec<&str> = decl.args.iter().map(|a| a.name.as_str()).collect();
        let mut prepared = Vec::with_capacity(groups.len());
        for group in groups {
            let message = group.message.as_deref().map(|m| parse_message(m, &params));
            if let Some(message) = &message {
                for unknown in &message.unknown {
                    ctx.warn(&messages::RETHROW_MESSAGE_REFERENCES_UNKNOWN_PARAMETER_0, &[unknown]);
                }
            }
            prepared.push((group, message));
        }

        let body = rethrow_body(decl.statements, &prepared);
        editor.method_editor(index)?.replace_body(body);
        Ok(Outcome::Applied(editor.rebuild()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_parameters_become_format_arguments() {
        let message = parse_message("cannot open $path at 100% ($mode, $missing)", &["path", "mode"]);
        assert_eq!(message.format, "cannot open %s at 100%% (%s, $missing)");
        assert_eq!(message.args, vec!["path", "mode"]);
        assert_eq!(message.unknown, vec!["missing"]);
    }

    #[test]
    fn test_empty_group_catches_runtime_then_checked() {
        let group = Group {
            catches: Vec::new(),
            wrapper: ty("java.lang.IllegalStateException"),
            message: None,
        };
        let body = rethrow_body(vec![return_void()], &[(group, None)]);
        let Statement::Try(guard) = &body[0] else {
            panic!("expected try");
        };
        assert_eq!(guard.catches.len(), 2);
        assert_eq!(guard.catches[0].param.ty, ty(RUNTIME_EXCEPTION));
        assert_eq!(guard.catches[0].body.statements[0], throw_(name("$e1")));
        assert_eq!(
            guard.catches[1].body.statements[0],
            throw_(new_(ty("java.lang.IllegalStateException")).arg(name("$e2")))
        );
    }

    #[test]
    fn test_each_caught_type_gets_its_own_clause() {
        let group = Group {
            catches: vec![ty("java.io.IOException"), ty("java.sql.SQLException")],
            wrapper: ty(RUNTIME_EXCEPTION),
            message: None,
        };
        let body = rethrow_body(Vec::new(), &[(group, None)]);
        let Statement::Try(guard) = &body[0] else {
            panic!("expected try");
        };
        let names: Vec<_> = guard.catches.iter().map(|c| c.param.name.as_str()).collect();
        assert_eq!(names, vec!["$e1", "$e2"]);
    }
}
