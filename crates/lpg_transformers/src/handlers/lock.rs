//! `@ReadLock`, `@WriteLock`, `@Await`, `@Signal` and
//! `@AwaitBeforeAndSignalAfter`.
//!
//! All five wrap the method body in `lock(); try { ... } finally { unlock(); }`
//! on a lock field that is created on first use. The condition variants
//! additionally wait for a condition method before the body, or signal a
//! `Condition` field afterwards.

use super::{method_target, usage, values};
use crate::annotation::AnnotationValues;
use crate::editor::TypeEditor;
use crate::error::{HandlerError, HandlerResult};
use crate::handler::{Handler, HandlerContext, Outcome, Target, Trigger};
use lpg_ast::factory::*;
use lpg_ast::*;
use lpg_diagnostics::messages;

const READ_WRITE_LOCK: &str = "java.util.concurrent.locks.ReadWriteLock";
const REENTRANT_READ_WRITE_LOCK: &str = "java.util.concurrent.locks.ReentrantReadWriteLock";
const LOCK: &str = "java.util.concurrent.locks.Lock";
const REENTRANT_LOCK: &str = "java.util.concurrent.locks.ReentrantLock";
const CONDITION: &str = "java.util.concurrent.locks.Condition";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockKind {
    Read,
    Write,
    /// A plain `Lock`, used by the condition annotations.
    Exclusive,
}

impl LockKind {
    fn field_type(self) -> &'static str {
        match self {
            LockKind::Read | LockKind::Write => READ_WRITE_LOCK,
            LockKind::Exclusive => LOCK,
        }
    }

    fn implementation(self) -> &'static str {
        match self {
            LockKind::Read | LockKind::Write => REENTRANT_READ_WRITE_LOCK,
            LockKind::Exclusive => REENTRANT_LOCK,
        }
    }

    fn accepts(self, ty: &TypeRef) -> bool {
        let implementation = self.implementation();
        ty.is_named(simple_name(self.field_type())) || ty.is_named(simple_name(implementation))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AwaitSpec {
    condition: String,
    method: String,
}

/// A parsed lock annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LockPlan {
    kind: LockKind,
    lock: String,
    wait: Option<AwaitSpec>,
    signal: Option<String>,
}

fn non_blank(ctx: &HandlerContext<'_>, value: String, message: &'static lpg_diagnostics::DiagnosticMessage) -> HandlerResult<String> {
    if value.trim().is_empty() {
        return Err(usage(ctx, message));
    }
    Ok(value)
}

fn lock_name(ctx: &HandlerContext<'_>, v: &AnnotationValues<'_>, member: &str, default: &str) -> HandlerResult<String> {
    match v.string(member)? {
        Some(lock) => non_blank(ctx, lock, &messages::_0_REQUIRES_A_NON_EMPTY_LOCK_NAME),
        None => Ok(default.to_string()),
    }
}

fn await_spec(ctx: &HandlerContext<'_>, v: &AnnotationValues<'_>) -> HandlerResult<AwaitSpec> {
    let condition = non_blank(ctx, v.string("value")?.unwrap_or_default(), &messages::_0_REQUIRES_A_NON_EMPTY_CONDITION_NAME)?;
    let method = v.string("conditionMethod")?.unwrap_or_default();
    Ok(AwaitSpec { condition, method })
}

fn signal_spec(ctx: &HandlerContext<'_>, v: &AnnotationValues<'_>) -> HandlerResult<String> {
    non_blank(ctx, v.string("value")?.unwrap_or_default(), &messages::_0_REQUIRES_A_NON_EMPTY_CONDITION_NAME)
}

fn parse(ctx: &HandlerContext<'_>) -> HandlerResult<LockPlan> {
    let v = values(ctx)?;
    let rw_default = ctx.options.read_write_lock_name();
    let lock_default = ctx.options.lock_name();
    let plan = match ctx.annotation_name() {
        "ReadLock" | "WriteLock" => LockPlan {
            kind: if ctx.annotation_name() == "ReadLock" { LockKind::Read } else { LockKind::Write },
            lock: lock_name(ctx, &v, "value", rw_default)?,
            wait: None,
            signal: None,
        },
        "Await" => LockPlan {
            kind: LockKind::Exclusive,
            lock: lock_name(ctx, &v, "lockName", lock_default)?,
            wait: Some(await_spec(ctx, &v)?),
            signal: None,
        },
        "Signal" => LockPlan {
            kind: LockKind::Exclusive,
            lock: lock_name(ctx, &v, "lockName", lock_default)?,
            wait: None,
            signal: Some(signal_spec(ctx, &v)?),
        },
        _ => {
            let wait = v.annotations("await")?;
            let signal = v.annotations("signal")?;
            LockPlan {
                kind: LockKind::Exclusive,
                lock: lock_name(ctx, &v, "lockName", lock_default)?,
                wait: wait
                    .first()
                    .map(|a| await_spec(ctx, &AnnotationValues::new(a)))
                    .transpose()?,
                signal: signal
                    .first()
                    .map(|a| signal_spec(ctx, &AnnotationValues::new(a)))
                    .transpose()?,
            }
        }
    };
    Ok(plan)
}

/// `this.f`, or `Type.f` from a static context.
fn member(owner: &str, is_static: bool, field: &str) -> Expression {
    if is_static {
        field_ref(name(owner), field)
    } else {
        this_field(field)
    }
}

fn wrap_body(plan: &LockPlan, owner: &str, is_static: bool, body: Vec<Statement>) -> Vec<Statement> {
    let lock_field = member(owner, is_static, &plan.lock);
    let lock: Expression = match plan.kind {
        LockKind::Read => call("readLock").on(lock_field).into(),
        LockKind::Write => call("writeLock").on(lock_field).into(),
        LockKind::Exclusive => lock_field,
    };

    let mut guarded = Vec::new();
    if let Some(wait) = &plan.wait {
        let receiver = if is_static { name(owner) } else { this() };
        let wait_loop = while_(
            not(call(wait.method.clone()).on(receiver)),
            call("await").on(member(owner, is_static, &wait.condition)),
        );
        guarded.push(Statement::from(
            try_(block().stmt(wait_loop)).catch_(
                arg(TypeRef::new("java.lang.InterruptedException"), "$ex").final_(),
                block().stmt(throw_(new_(TypeRef::new("java.lang.RuntimeException")).arg(name("$ex")))),
            ),
        ));
    }
    guarded.extend(body);

    let mut release = Vec::new();
    if let Some(signal) = &plan.signal {
        release.push(Statement::from(call("signal").on(member(owner, is_static, signal))));
    }
    release.push(Statement::from(call("unlock").on(lock.clone())));

    vec![
        Statement::from(call("lock").on(lock)),
        Statement::from(try_(block().stmts(guarded)).finally_(block().stmts(release))),
    ]
}

pub struct ConditionAndLockHandler;

impl Handler for ConditionAndLockHandler {
    fn name(&self) -> &'static str {
        "ConditionAndLock"
    }

    fn trigger(&self) -> Trigger {
        Trigger::Annotation(&["ReadLock", "WriteLock", "Await", "Signal", "AwaitBeforeAndSignalAfter"])
    }

    fn handle(&self, ctx: &mut HandlerContext<'_>, mut editor: TypeEditor<'_>, target: Target) -> HandlerResult<Outcome> {
        let index = method_target(ctx, target)?;
        let decl = editor.method(index)?.clone();
        if decl.no_body || decl.is_abstract() {
            return Err(usage(ctx, &messages::_0_CAN_ONLY_BE_USED_ON_CONCRETE_METHODS));
        }
        let plan = parse(ctx)?;
        if let Some(wait) = &plan.wait {
            if !editor.has_method(&wait.method, Some(0)) {
                return Err(HandlerError::usage(&messages::CONDITION_METHOD_0_NOT_FOUND, &[&wait.method]));
            }
        }
        if let Some(existing) = editor.class().field(&plan.lock) {
            if !plan.kind.accepts(&existing.ty) {
                return Err(HandlerError::usage(
                    &messages::LOCK_FIELD_0_MUST_BE_OF_TYPE_1,
                    &[&plan.lock, plan.kind.field_type()],
                ));
            }
        }

        let owner = editor.name().to_string();
        let is_static = decl.is_static();
        if !editor.has_field(&plan.lock) {
            let mut field = field_decl(TypeRef::new(plan.kind.field_type()), plan.lock.clone())
                .private()
                .final_()
                .init(new_(TypeRef::new(plan.kind.implementation())));
            if is_static {
                field = field.static_();
            }
            editor.inject_field(field);
        }
        let conditions = plan.wait.iter().map(|w| &w.condition).chain(plan.signal.iter());
        let mut seen: Vec<&String> = Vec::new();
        for condition in conditions {
            if seen.contains(&condition) || editor.has_field(condition) {
                continue;
            }
            seen.push(condition);
            let mut field = field_decl(TypeRef::new(CONDITION), condition.clone())
                .private()
                .final_()
                .init(call("newCondition").on(member(&owner, is_static, &plan.lock)));
            if is_static {
                field = field.static_();
            }
            editor.inject_field(field);
        }

        tracing::trace!(lock = %plan.lock, kind = ?plan.kind, "wrapping method body");
        let body = wrap_body(&plan, &owner, is_static, decl.statements);
        editor.method_editor(index)?.replace_body(body);
        Ok(Outcome::Applied(editor.rebuild()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_runs_before_unlock() {
        let plan = LockPlan {
            kind: LockKind::Exclusive,
            lock: "$lock".to_string(),
            wait: None,
            signal: Some("notEmpty".to_string()),
        };
        let body = wrap_body(&plan, "Queue", false, vec![return_(int(1))]);
        assert_eq!(body.len(), 2);
        let Statement::Try(guard) = &body[1] else {
            panic!("expected try");
        };
        let release = &guard.finally.as_ref().unwrap().statements;
        assert_eq!(release[0], Statement::from(call("signal").on(this_field("notEmpty"))));
        assert_eq!(release[1], Statement::from(call("unlock").on(this_field("$lock"))));
    }

    #[test]
    fn test_static_read_lock_uses_type_qualified_field() {
        let plan = LockPlan {
            kind: LockKind::Read,
            lock: "$readWriteLock".to_string(),
            wait: None,
            signal: None,
        };
        let body = wrap_body(&plan, "Cache", true, Vec::new());
        assert_eq!(
            body[0],
            Statement::from(call("lock").on(call("readLock").on(field_ref(name("Cache"), "$readWriteLock"))))
        );
    }

    #[test]
    fn test_lock_kind_accepts_implementations() {
        assert!(LockKind::Exclusive.accepts(&ty("ReentrantLock")));
        assert!(LockKind::Read.accepts(&ty("java.util.concurrent.locks.ReadWriteLock")));
        assert!(!LockKind::Write.accepts(&ty("Lock")));
    }
}
