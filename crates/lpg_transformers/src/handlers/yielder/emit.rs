//! Lowering a [`Machine`] into the yielder's `getNext()` and
//! `getErrorHandler()` methods.

use super::compile::{Exits, Machine, Op, Part, Route, StateId, DONE};
use indexmap::IndexMap;
use lpg_ast::factory::*;
use lpg_ast::visit_mut::{walk_statement_mut, VisitMut};
use lpg_ast::*;
use rustc_hash::FxHashMap;

pub(super) const STATE: &str = "$state";
pub(super) const NEXT: &str = "$next";
const LOOP_LABEL: &str = "$yieldLoop";
const CAUGHT: &str = "$e";

pub(super) fn finally_next(region: usize) -> String {
    format!("$finallyNext{}", region)
}

pub(super) fn pending_exception(region: usize) -> String {
    format!("$pendingException{}", region)
}

struct Lowering<'m> {
    machine: &'m Machine,
    numbers: FxHashMap<StateId, i32>,
    /// Set once a jump needs the labeled `continue`.
    labeled: bool,
}

impl Lowering<'_> {
    fn number(&self, id: StateId) -> i32 {
        if id == DONE {
            return -1;
        }
        self.numbers.get(&id).copied().unwrap_or(-1)
    }

    fn set_state(&self, id: StateId) -> Statement {
        assign(name(STATE), int(self.number(id))).into()
    }

    fn route(&mut self, route: &Route, labeled: bool, fall: bool) -> Vec<Statement> {
        let mut out: Vec<Statement> = route
            .next
            .iter()
            .map(|&(region, state)| Statement::from(assign(name(finally_next(region)), int(self.number(state)))))
            .collect();
        out.push(self.set_state(route.to));
        if !fall {
            if labeled {
                self.labeled = true;
                out.push(continue_to(LOOP_LABEL));
            } else {
                out.push(continue_());
            }
        }
        out
    }

    fn ops(&mut self, ops: &[Op], next_case: Option<StateId>) -> Vec<Statement> {
        let mut out = Vec::new();
        for (i, op) in ops.iter().enumerate() {
            let last = i + 1 == ops.len();
            match op {
                Op::Code(stmt) => out.push(stmt.clone()),
                Op::Intact(stmt, exits) => {
                    let mut stmt = stmt.clone();
                    let mut rewrite = RewriteExits {
                        lowering: self,
                        exits,
                        loops: 0,
                        switches: 0,
                        labels: Vec::new(),
                    };
                    rewrite.visit_statement_mut(&mut stmt);
                    out.push(stmt);
                }
                Op::Branch(cond, body) => {
                    let body = self.ops(body, None);
                    out.push(if_(cond.clone()).then(block().stmts(body)).into());
                }
                Op::Jump(route) => {
                    let fall = last && self.machine.fallthrough && next_case == Some(route.to);
                    out.extend(self.route(route, false, fall));
                }
                Op::Yield(value, resume) => {
                    out.push(assign(name(NEXT), value.clone()).into());
                    out.push(self.set_state(*resume));
                    out.push(return_(true_()));
                }
                Op::Dispatch(selector, arms) => {
                    let mut dispatch = switch_(selector.clone());
                    for (label, target) in arms {
                        let jump = self.route(&Route::direct(*target), false, false);
                        let arm = match label {
                            Some(label) => case(label.clone()),
                            None => default_case(),
                        };
                        dispatch = dispatch.case(arm.stmts(jump));
                    }
                    out.push(dispatch.into());
                }
                Op::FinallyExit(region) => {
                    let pending = pending_exception(*region);
                    out.push(
                        if_(ne(name(pending.clone()), null()))
                            .then(
                                block()
                                    .stmt(
                                        local(TypeRef::new("java.lang.Throwable"), "$t")
                                            .final_()
                                            .init(name(pending.clone())),
                                    )
                                    .stmt(assign(name(pending), null()))
                                    .stmt(throw_(name("$t"))),
                            )
                            .into(),
                    );
                    out.push(assign(name(STATE), name(finally_next(*region))).into());
                    out.push(continue_());
                }
            }
        }
        out
    }
}

/// Rewrites the jumps of an intact statement that leave it.
struct RewriteExits<'l, 'm> {
    lowering: &'l mut Lowering<'m>,
    exits: &'l Exits,
    loops: usize,
    switches: usize,
    labels: Vec<String>,
}

impl RewriteExits<'_, '_> {
    fn replacement(&mut self, route: Option<&Route>) -> Option<Statement> {
        let route = route?;
        let labeled = self.loops > 0;
        let stmts = self.lowering.route(route, labeled, false);
        Some(block().stmts(stmts).into())
    }
}

impl VisitMut for RewriteExits<'_, '_> {
    fn visit_class_mut(&mut self, _class: &mut ClassDecl) {}

    fn visit_expression_mut(&mut self, _expr: &mut Expression) {}

    fn visit_statement_mut(&mut self, stmt: &mut Statement) {
        let exits = self.exits;
        let replacement = match stmt {
            Statement::While(_) | Statement::DoWhile(_) | Statement::For(_) | Statement::Foreach(_) => {
                self.loops += 1;
                walk_statement_mut(self, stmt);
                self.loops -= 1;
                return;
            }
            Statement::Switch(_) => {
                self.switches += 1;
                walk_statement_mut(self, stmt);
                self.switches -= 1;
                return;
            }
            Statement::Labeled(n) => {
                self.labels.push(n.label.clone());
                walk_statement_mut(self, stmt);
                self.labels.pop();
                return;
            }
            Statement::Break(None) if self.loops + self.switches == 0 => self.replacement(exits.brk.as_ref()),
            Statement::Continue(None) if self.loops == 0 => self.replacement(exits.cont.as_ref()),
            Statement::Break(Some(label)) if !self.labels.contains(label) => {
                let target = exits.labels.iter().find(|l| l.label == *label).map(|l| &l.brk);
                self.replacement(target)
            }
            Statement::Continue(Some(label)) if !self.labels.contains(label) => {
                let target = exits
                    .labels
                    .iter()
                    .find(|l| l.label == *label)
                    .and_then(|l| l.cont.as_ref());
                self.replacement(target)
            }
            Statement::Return(None) => self.replacement(Some(&exits.ret)),
            _ => {
                walk_statement_mut(self, stmt);
                return;
            }
        };
        if let Some(replacement) = replacement {
            *stmt = replacement;
        }
    }
}

/// The two methods a machine lowers to.
pub(super) struct Lowered {
    pub get_next: MethodDecl,
    pub error_handler: MethodDecl,
}

/// Lowers `machine`, numbering cases from `first`.
pub(super) fn lower(machine: &Machine, first: i32) -> Lowered {
    let numbers = machine
        .layout
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, first + i as i32))
        .collect();
    let mut lowering = Lowering {
        machine,
        numbers,
        labeled: false,
    };

    let mut dispatch = switch_(name(STATE));
    for (i, &id) in machine.layout.iter().enumerate() {
        let next_case = machine.layout.get(i + 1).copied();
        let body = lowering.ops(&machine.states[id].ops, next_case);
        dispatch = dispatch.case(case(int(lowering.number(id))).stmts(body));
    }
    dispatch = dispatch.case(default_case().stmt(return_(false_())));

    let guarded = try_(block().stmt(dispatch)).catch_(
        arg(TypeRef::new("java.lang.Throwable"), CAUGHT).final_(),
        block().stmt(assign(name(STATE), call("getErrorHandler").arg(name(CAUGHT)))),
    );
    let spin = Statement::from(while_(true_(), block().stmt(guarded)));
    let spin = if lowering.labeled {
        labeled(LOOP_LABEL, spin)
    } else {
        spin
    };
    let get_next = method(TypeRef::new("boolean"), "getNext").private().stmt(spin);

    Lowered {
        get_next,
        error_handler: error_handler(&lowering),
    }
}

/// `if ($e instanceof T) { param = (T) $e; return entry; }` for each catch
/// that applies to a state in `context`, then the first finally block.
fn handler_body(lowering: &Lowering<'_>, context: &[(usize, Part)]) -> Vec<Statement> {
    let mut out = Vec::new();
    for &(index, part) in context.iter().rev() {
        let region = &lowering.machine.regions[index];
        if part == Part::Body {
            for catch in &region.catches {
                out.push(Statement::from(
                    if_(instance_of(name(CAUGHT), catch.ty.clone())).then(
                        block()
                            .stmt(assign(name(catch.param.clone()), cast(catch.ty.clone(), name(CAUGHT))))
                            .stmt(return_(int(lowering.number(catch.entry)))),
                    ),
                ));
            }
        }
        if part == Part::Finally {
            continue;
        }
        if let Some(entry) = region.finally {
            out.push(assign(name(pending_exception(index)), name(CAUGHT)).into());
            out.push(return_(int(lowering.number(entry))));
            return out;
        }
    }
    out
}

fn error_handler(lowering: &Lowering<'_>) -> MethodDecl {
    let machine = lowering.machine;
    let mut groups: IndexMap<&[(usize, Part)], Vec<StateId>> = IndexMap::new();
    for &id in &machine.layout {
        let context = machine.states[id].context.as_slice();
        if !context.is_empty() {
            groups.entry(context).or_default().push(id);
        }
    }

    let mut statements = Vec::new();
    {
        let mut dispatch = switch_(name(STATE));
        for (context, ids) in &groups {
            let mut body = handler_body(lowering, context);
            if body.is_empty() {
                continue;
            }
            if !matches!(body.last(), Some(Statement::Return(_))) {
                body.push(break_());
            }
            let Some((&last, rest)) = ids.split_last() else {
                continue;
            };
            for &id in rest {
                dispatch = dispatch.case(case(int(lowering.number(id))));
            }
            dispatch = dispatch.case(case(int(lowering.number(last))).stmts(body));
        }
        if !dispatch.cases.is_empty() {
            statements.push(Statement::from(dispatch));
        }
    }
    statements.push(assign(name(STATE), int(-1)).into());
    statements.push(throw_(
        new_(TypeRef::new("java.util.ConcurrentModificationException")).arg(name(CAUGHT)),
    ));

    method(TypeRef::new("int"), "getErrorHandler")
        .private()
        .with_arg(arg(TypeRef::new("java.lang.Throwable"), CAUGHT).final_())
        .stmts(statements)
}

#[cfg(test)]
mod tests {
    use super::super::compile::Compiler;
    use super::super::optimize::optimize_states;
    use super::*;

    fn yield_(value: Expression) -> Statement {
        call("yield").arg(value).into()
    }

    fn machine(statements: Vec<Statement>, optimize: bool) -> Machine {
        let empty = FxHashMap::default();
        let mut machine = Compiler::new(&empty, &empty).compile_body(statements);
        if optimize {
            optimize_states(&mut machine);
        }
        machine
    }

    fn cases(method: &MethodDecl) -> &[Case] {
        let Statement::While(spin) = &method.statements[0] else {
            panic!("expected unlabeled loop");
        };
        let Statement::Block(body) = &*spin.body else {
            panic!("expected block");
        };
        let Statement::Try(guard) = &body.statements[0] else {
            panic!("expected try");
        };
        let Statement::Switch(dispatch) = &guard.body.statements[0] else {
            panic!("expected switch");
        };
        &dispatch.cases
    }

    #[test]
    fn test_yield_lowering() {
        let lowered = lower(&machine(vec![yield_(int(7))], false), 0);
        let cases = cases(&lowered.get_next);
        assert_eq!(cases.len(), 3);
        assert_eq!(
            cases[0].statements,
            vec![
                Statement::from(assign(name(NEXT), int(7))),
                Statement::from(assign(name(STATE), int(1))),
                return_(true_()),
            ]
        );
        assert_eq!(
            cases[1].statements,
            vec![Statement::from(assign(name(STATE), int(-1))), continue_()]
        );
        assert_eq!(cases[2].label, None);
        assert_eq!(cases[2].statements, vec![return_(false_())]);
    }

    #[test]
    fn test_cases_number_from_first() {
        let lowered = lower(&machine(vec![yield_(int(7))], false), 1);
        assert_eq!(cases(&lowered.get_next)[0].label, Some(int(1)));
    }

    #[test]
    fn test_jump_to_next_case_falls_through_when_optimized() {
        let body = vec![
            Statement::from(if_(name("c")).then(call("f"))),
            Statement::from(while_(name("more"), block().stmt(yield_(int(1))))),
        ];
        let lowered = lower(&machine(body, true), 0);
        let cases = cases(&lowered.get_next);
        assert_eq!(
            cases[0].statements,
            vec![
                Statement::from(if_(name("c")).then(call("f"))),
                Statement::from(assign(name(STATE), int(1))),
            ]
        );
    }

    #[test]
    fn test_break_inside_intact_loop_needs_label() {
        let body = vec![Statement::from(while_(
            true_(),
            block()
                .stmt(yield_(int(1)))
                .stmt(for_(block().stmt(if_(name("stop")).then(return_void()))).cond(name("more"))),
        ))];
        let lowered = lower(&machine(body, false), 0);
        assert!(matches!(&lowered.get_next.statements[0], Statement::Labeled(l) if l.label == LOOP_LABEL));
    }

    #[test]
    fn test_error_handler_dispatches_to_catch() {
        let body = vec![Statement::from(
            try_(block().stmt(yield_(int(1))))
                .catch_(arg(ty("java.io.IOException"), "e"), block().stmt(call("log").arg(name("e")))),
        )];
        let lowered = lower(&machine(body, false), 0);
        let Statement::Switch(dispatch) = &lowered.error_handler.statements[0] else {
            panic!("expected switch");
        };
        let handled = dispatch.cases.last().unwrap();
        let Statement::If(check) = &handled.statements[0] else {
            panic!("expected instanceof check");
        };
        assert_eq!(check.cond, instance_of(name(CAUGHT), ty("java.io.IOException")));
        assert_eq!(handled.statements.last(), Some(&break_()));
        assert_eq!(
            lowered.error_handler.statements.last(),
            Some(&throw_(new_(ty("java.util.ConcurrentModificationException")).arg(name(CAUGHT))))
        );
    }
}
