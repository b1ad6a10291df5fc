//! Generator body to state machine.
//!
//! The body is cut at every `yield` and at every join point of control
//! flow that contains one. Each piece becomes a state: a list of [`Op`]s
//! ending in a transfer to another state. Statements without yields are
//! carried over whole; their `break`, `continue` and `return` are resolved
//! against the enclosing compiled constructs and rewritten when lowered.

use super::lift::Lifted;
use super::validate::{as_yield, contains_yield};
use lpg_ast::factory::*;
use lpg_ast::visitor::{walk_statement, AstVisitor};
use lpg_ast::*;
use rustc_hash::FxHashMap;

pub(super) type StateId = usize;

/// Past the end of the body; lowered as `-1`, which the dispatch switch
/// answers with `return false`.
pub(super) const DONE: StateId = usize::MAX;

/// A transfer to `to`, passing through enclosing `finally` blocks.
///
/// Each `(region, state)` in `next` sets that region's `$finallyNext` so the
/// finally block continues at `state` once it completes.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Route {
    pub next: Vec<(usize, StateId)>,
    pub to: StateId,
}

impl Route {
    pub fn direct(to: StateId) -> Self {
        Route { next: Vec::new(), to }
    }

    fn states_mut(&mut self, f: &mut dyn FnMut(&mut StateId)) {
        for (_, state) in &mut self.next {
            f(state);
        }
        f(&mut self.to);
    }

    fn targets(&self, out: &mut Vec<StateId>) {
        out.extend(self.next.iter().map(|(_, s)| *s));
        out.push(self.to);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct LabelExit {
    pub label: String,
    pub brk: Route,
    pub cont: Option<Route>,
}

/// Where jumps leaving an intact statement go.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Exits {
    pub brk: Option<Route>,
    pub cont: Option<Route>,
    pub labels: Vec<LabelExit>,
    pub ret: Route,
}

impl Exits {
    fn routes_mut(&mut self) -> impl Iterator<Item = &mut Route> {
        self.brk
            .iter_mut()
            .chain(self.cont.iter_mut())
            .chain(self.labels.iter_mut().flat_map(|l| std::iter::once(&mut l.brk).chain(l.cont.iter_mut())))
            .chain(std::iter::once(&mut self.ret))
    }

    fn routes(&self) -> impl Iterator<Item = &Route> {
        self.brk
            .iter()
            .chain(self.cont.iter())
            .chain(self.labels.iter().flat_map(|l| std::iter::once(&l.brk).chain(l.cont.iter())))
            .chain(std::iter::once(&self.ret))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Op {
    /// A statement with no jumps to resolve.
    Code(Statement),
    /// A yield-free statement whose jumps leave it.
    Intact(Statement, Exits),
    /// `if (cond) { ops }`
    Branch(Expression, Vec<Op>),
    Jump(Route),
    /// `$next = value`, resuming at the state.
    Yield(Expression, StateId),
    /// A `switch` whose arms jump to the case states; `None` is `default`.
    Dispatch(Expression, Vec<(Option<Expression>, StateId)>),
    /// End of a finally block: rethrow the pending exception or continue
    /// at the region's `$finallyNext`.
    FinallyExit(usize),
}

impl Op {
    pub fn states_mut(&mut self, f: &mut dyn FnMut(&mut StateId)) {
        match self {
            Op::Code(_) | Op::FinallyExit(_) => {}
            Op::Intact(_, exits) => {
                for route in exits.routes_mut() {
                    route.states_mut(f);
                }
            }
            Op::Branch(_, ops) => {
                for op in ops {
                    op.states_mut(f);
                }
            }
            Op::Jump(route) => route.states_mut(f),
            Op::Yield(_, state) => f(state),
            Op::Dispatch(_, arms) => {
                for (_, state) in arms {
                    f(state);
                }
            }
        }
    }

    pub fn targets(&self, out: &mut Vec<StateId>) {
        match self {
            Op::Code(_) | Op::FinallyExit(_) => {}
            Op::Intact(_, exits) => {
                for route in exits.routes() {
                    route.targets(out);
                }
            }
            Op::Branch(_, ops) => {
                for op in ops {
                    op.targets(out);
                }
            }
            Op::Jump(route) => route.targets(out),
            Op::Yield(_, state) => out.push(*state),
            Op::Dispatch(_, arms) => out.extend(arms.iter().map(|(_, s)| *s)),
        }
    }
}

/// Which part of a try statement a state belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) enum Part {
    Body,
    Catch,
    Finally,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct CatchEntry {
    pub ty: TypeRef,
    /// The lifted catch parameter.
    pub param: String,
    pub entry: StateId,
}

/// A try statement containing yields.
#[derive(Debug, Clone, Default, PartialEq)]
pub(super) struct Region {
    pub catches: Vec<CatchEntry>,
    pub finally: Option<StateId>,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct State {
    pub ops: Vec<Op>,
    /// Enclosing try regions, innermost last.
    pub context: Vec<(usize, Part)>,
}

#[derive(Debug)]
pub(super) struct Machine {
    pub states: Vec<State>,
    /// Case order; the first entry is the initial state.
    pub layout: Vec<StateId>,
    pub regions: Vec<Region>,
    pub lifted: Lifted,
    /// Whether a jump to the next case in `layout` may fall through.
    pub fallthrough: bool,
}

struct Frame {
    label: Option<String>,
    brk: StateId,
    cont: Option<StateId>,
    /// Target of an unlabeled `break`.
    breakable: bool,
    /// `finallies.len()` when the frame was entered.
    depth: usize,
}

pub(super) struct Compiler<'e> {
    states: Vec<State>,
    layout: Vec<StateId>,
    regions: Vec<Region>,
    current: StateId,
    closed: bool,
    context: Vec<(usize, Part)>,
    frames: Vec<Frame>,
    /// Finally blocks a jump must run before leaving, outermost first.
    finallies: Vec<(usize, StateId)>,
    lifted: Lifted,
    loops: usize,
    params: &'e FxHashMap<String, TypeRef>,
    fields: &'e FxHashMap<String, TypeRef>,
}

impl<'e> Compiler<'e> {
    pub fn new(params: &'e FxHashMap<String, TypeRef>, fields: &'e FxHashMap<String, TypeRef>) -> Self {
        let mut compiler = Self {
            states: Vec::new(),
            layout: Vec::new(),
            regions: Vec::new(),
            current: 0,
            closed: false,
            context: Vec::new(),
            frames: Vec::new(),
            finallies: Vec::new(),
            lifted: Lifted::default(),
            loops: 0,
            params,
            fields,
        };
        let start = compiler.new_state();
        compiler.layout.push(start);
        compiler
    }

    pub fn compile_body(mut self, statements: Vec<Statement>) -> Machine {
        self.compile_statements(statements);
        if !self.closed {
            self.terminate(Op::Jump(Route::direct(DONE)));
        }
        Machine {
            states: self.states,
            layout: self.layout,
            regions: self.regions,
            lifted: self.lifted,
            fallthrough: false,
        }
    }

    // ------------------------------------------------------------------
    // State bookkeeping
    // ------------------------------------------------------------------

    fn new_state(&mut self) -> StateId {
        self.states.push(State {
            ops: Vec::new(),
            context: self.context.clone(),
        });
        self.states.len() - 1
    }

    fn emit(&mut self, op: Op) {
        if self.closed {
            // Code after a transfer; unreachable but kept as its own state.
            let dead = self.new_state();
            self.current = dead;
            self.layout.push(dead);
            self.closed = false;
        }
        self.states[self.current].ops.push(op);
    }

    fn terminate(&mut self, op: Op) {
        self.emit(op);
        self.closed = true;
    }

    fn jump(&mut self, to: StateId) {
        if !self.closed {
            self.terminate(Op::Jump(Route::direct(to)));
        }
    }

    fn jump_route(&mut self, route: Route) {
        if !self.closed {
            self.terminate(Op::Jump(route));
        }
    }

    /// Continue in `state`, falling into it if the current state is open.
    fn enter(&mut self, state: StateId) {
        self.jump(state);
        self.current = state;
        self.closed = false;
        self.layout.push(state);
    }

    fn route(&self, to: StateId, depth: usize) -> Route {
        let mut next = Vec::new();
        let mut target = to;
        for &(region, entry) in &self.finallies[depth.min(self.finallies.len())..] {
            next.push((region, target));
            target = entry;
        }
        Route { next, to: target }
    }

    fn exits(&self) -> Exits {
        let brk = self
            .frames
            .iter()
            .rev()
            .find(|f| f.breakable)
            .map(|f| self.route(f.brk, f.depth));
        let cont = self
            .frames
            .iter()
            .rev()
            .find_map(|f| f.cont.map(|c| self.route(c, f.depth)));
        let labels = self
            .frames
            .iter()
            .filter_map(|f| {
                f.label.as_ref().map(|label| LabelExit {
                    label: label.clone(),
                    brk: self.route(f.brk, f.depth),
                    cont: f.cont.map(|c| self.route(c, f.depth)),
                })
            })
            .collect();
        Exits {
            brk,
            cont,
            labels,
            ret: self.route(DONE, 0),
        }
    }

    fn push_frame(&mut self, label: Option<String>, brk: StateId, cont: Option<StateId>, breakable: bool) {
        self.frames.push(Frame {
            label,
            brk,
            cont,
            breakable,
            depth: self.finallies.len(),
        });
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn compile_statements(&mut self, statements: Vec<Statement>) {
        for stmt in statements {
            self.compile(stmt);
        }
    }

    fn compile(&mut self, stmt: Statement) {
        if !contains_yield(&stmt) {
            self.intact(stmt);
            return;
        }
        if let Some(call) = as_yield(&stmt) {
            let value = call.args.first().cloned().unwrap_or_else(null);
            let resume = self.new_state();
            self.terminate(Op::Yield(value, resume));
            self.current = resume;
            self.closed = false;
            self.layout.push(resume);
            return;
        }
        match stmt {
            Statement::Block(b) => self.compile_statements(b.statements),
            Statement::If(n) => self.compile_if(n),
            Statement::Labeled(n) => self.compile_labeled(n.label, *n.body),
            Statement::Try(n) => self.compile_try(n),
            other => self.compile_breakable(other, None),
        }
    }

    /// Loops and switches, optionally labeled.
    fn compile_breakable(&mut self, stmt: Statement, label: Option<String>) {
        match stmt {
            Statement::While(n) => self.compile_while(n, label),
            Statement::DoWhile(n) => self.compile_do(n, label),
            Statement::For(n) => self.compile_for(n, label),
            Statement::Foreach(n) => self.compile_foreach(n, label),
            Statement::Switch(n) => self.compile_switch(n, label),
            // Everything else with a yield is a yield or was handled above.
            other => self.intact(other),
        }
    }

    fn intact(&mut self, stmt: Statement) {
        let terminal = !can_complete(&stmt);
        match stmt {
            Statement::LocalDecl(local) => {
                if let Some(assignment) = self.lifted.declare(local) {
                    self.emit(Op::Code(assignment));
                }
            }
            Statement::Empty => {}
            other if has_jumps(&other) => {
                let exits = self.exits();
                self.emit(Op::Intact(other, exits));
            }
            other => self.emit(Op::Code(other)),
        }
        if terminal {
            self.closed = true;
        }
    }

    fn compile_if(&mut self, n: If) {
        let end = self.new_state();
        let otherwise = n.otherwise.as_ref().map(|_| self.new_state());
        self.emit(Op::Branch(not(n.cond), vec![Op::Jump(Route::direct(otherwise.unwrap_or(end)))]));
        self.compile(*n.then);
        if let (Some(state), Some(body)) = (otherwise, n.otherwise) {
            self.jump(end);
            self.enter(state);
            self.compile(*body);
        }
        self.enter(end);
    }

    fn compile_labeled(&mut self, label: String, body: Statement) {
        match body {
            Statement::While(_)
            | Statement::DoWhile(_)
            | Statement::For(_)
            | Statement::Foreach(_)
            | Statement::Switch(_) => self.compile_breakable(body, Some(label)),
            other => {
                let end = self.new_state();
                self.push_frame(Some(label), end, None, false);
                self.compile(other);
                self.frames.pop();
                self.enter(end);
            }
        }
    }

    fn loop_body(&mut self, body: Statement, label: Option<String>, brk: StateId, cont: StateId) {
        self.push_frame(label, brk, Some(cont), true);
        self.compile(body);
        self.frames.pop();
    }

    fn exit_unless(&mut self, cond: Expression, end: StateId) {
        if !matches!(cond, Expression::Literal(Literal::Bool(true))) {
            self.emit(Op::Branch(not(cond), vec![Op::Jump(Route::direct(end))]));
        }
    }

    fn compile_while(&mut self, n: While, label: Option<String>) {
        let head = self.new_state();
        let end = self.new_state();
        self.enter(head);
        self.exit_unless(n.cond, end);
        self.loop_body(*n.body, label, end, head);
        self.jump(head);
        self.enter_closed(end);
    }

    fn compile_do(&mut self, n: DoWhile, label: Option<String>) {
        let body = self.new_state();
        let check = self.new_state();
        let end = self.new_state();
        self.enter(body);
        self.loop_body(*n.body, label, end, check);
        self.enter(check);
        self.emit(Op::Branch(n.cond, vec![Op::Jump(Route::direct(body))]));
        self.enter(end);
    }

    fn compile_for(&mut self, n: For, label: Option<String>) {
        for init in n.init {
            self.compile(init);
        }
        let head = self.new_state();
        let update = self.new_state();
        let end = self.new_state();
        self.enter(head);
        if let Some(cond) = n.cond {
            self.exit_unless(cond, end);
        }
        self.loop_body(*n.body, label, end, update);
        self.enter(update);
        for expr in n.update {
            self.emit(Op::Code(Statement::Expression(expr)));
        }
        self.jump(head);
        self.enter_closed(end);
    }

    fn compile_foreach(&mut self, n: Foreach, label: Option<String>) {
        self.loops += 1;
        let k = self.loops;
        let var = n.var.name.clone();
        let head = self.new_state();
        let end = self.new_state();
        match self.array_type(&n.iterable) {
            Some(array_ty) => {
                let array = format!("$array{}", k);
                let index = format!("$index{}", k);
                self.lifted.lift(array.clone(), array_ty);
                self.lifted.lift(index.clone(), TypeRef::new("int"));
                self.emit(Op::Code(assign(name(array.clone()), n.iterable).into()));
                self.emit(Op::Code(assign(name(index.clone()), int(0)).into()));
                self.enter(head);
                self.emit(Op::Branch(
                    not(lt(name(index.clone()), field_ref(name(array.clone()), "length"))),
                    vec![Op::Jump(Route::direct(end))],
                ));
                self.emit(Op::Code(assign(name(var.clone()), array_ref(name(array), name(index.clone()))).into()));
                self.emit(Op::Code(post_inc(name(index)).into()));
            }
            None => {
                let iterator = format!("$iterator{}", k);
                let element = TypeRef::extends_wildcard(n.var.ty.boxed());
                self.lifted
                    .lift(iterator.clone(), TypeRef::new("java.util.Iterator").arg(element));
                self.emit(Op::Code(assign(name(iterator.clone()), call("iterator").on(n.iterable)).into()));
                self.enter(head);
                self.emit(Op::Branch(
                    not(call("hasNext").on(name(iterator.clone()))),
                    vec![Op::Jump(Route::direct(end))],
                ));
                self.emit(Op::Code(assign(name(var.clone()), call("next").on(name(iterator))).into()));
            }
        }
        self.lifted.lift(var, n.var.ty);
        self.loop_body(*n.body, label, end, head);
        self.jump(head);
        self.enter_closed(end);
    }

    fn compile_switch(&mut self, n: Switch, label: Option<String>) {
        let end = self.new_state();
        let entries: Vec<StateId> = n.cases.iter().map(|_| self.new_state()).collect();
        let mut arms: Vec<(Option<Expression>, StateId)> = n
            .cases
            .iter()
            .zip(&entries)
            .map(|(case, entry)| (case.label.clone(), *entry))
            .collect();
        if n.cases.iter().all(|c| c.label.is_some()) {
            arms.push((None, end));
        }
        self.terminate(Op::Dispatch(n.selector, arms));
        self.push_frame(label, end, None, true);
        for (case, entry) in n.cases.into_iter().zip(entries) {
            self.enter(entry);
            self.compile_statements(case.statements);
        }
        self.frames.pop();
        self.enter(end);
    }

    fn compile_try(&mut self, n: Try) {
        let end = self.new_state();
        let region = self.regions.len();
        self.regions.push(Region::default());
        let depth = self.finallies.len();

        let finally_entry = n.finally.as_ref().map(|_| {
            self.context.push((region, Part::Finally));
            let entry = self.new_state();
            self.context.pop();
            entry
        });
        if let Some(entry) = finally_entry {
            self.lifted.lift(format!("$finallyNext{}", region), TypeRef::new("int"));
            self.lifted
                .lift(format!("$pendingException{}", region), TypeRef::new("java.lang.Throwable"));
            self.finallies.push((region, entry));
            self.regions[region].finally = Some(entry);
        }

        self.context.push((region, Part::Body));
        let body = self.new_state();
        self.enter(body);
        self.compile_statements(n.body.statements);
        let done = self.route(end, depth);
        self.jump_route(done);
        self.context.pop();

        for catch in n.catches {
            self.lifted.lift(catch.param.name.clone(), catch.param.ty.clone());
            self.context.push((region, Part::Catch));
            let entry = self.new_state();
            self.enter(entry);
            self.regions[region].catches.push(CatchEntry {
                ty: catch.param.ty,
                param: catch.param.name,
                entry,
            });
            self.compile_statements(catch.body.statements);
            let done = self.route(end, depth);
            self.jump_route(done);
            self.context.pop();
        }

        if let (Some(entry), Some(finally)) = (finally_entry, n.finally) {
            self.finallies.pop();
            self.context.push((region, Part::Finally));
            self.enter(entry);
            self.compile_statements(finally.statements);
            if !self.closed {
                self.terminate(Op::FinallyExit(region));
            }
            self.context.pop();
        }
        self.enter(end);
    }

    /// Like [`Self::enter`] for a state only reachable by jumps.
    fn enter_closed(&mut self, state: StateId) {
        self.closed = true;
        self.enter(state);
    }

    /// The declared array type of a foreach source, when known.
    fn array_type(&self, expr: &Expression) -> Option<TypeRef> {
        let ty = match expr {
            Expression::Name(n) => self
                .lifted
                .type_of(n)
                .or_else(|| self.params.get(n))
                .or_else(|| self.fields.get(n))
                .cloned(),
            Expression::FieldRef(f) if matches!(*f.receiver, Expression::This(_)) => self.fields.get(&f.name).cloned(),
            Expression::Cast(c) => Some(c.ty.clone()),
            Expression::NewArray(a) => Some(a.ty.clone().dims(a.ty.dims + a.dims.len() as u32 + a.extra_dims)),
            _ => None,
        }?;
        (ty.dims > 0).then_some(ty)
    }
}

// ============================================================================
// Statement analysis
// ============================================================================

/// `break`, `continue` or `return` outside nested classes.
struct JumpFinder {
    found: bool,
}

impl<'a> AstVisitor<'a> for JumpFinder {
    fn visit_class(&mut self, _class: &'a ClassDecl) {}

    fn visit_statement(&mut self, stmt: &'a Statement) {
        match stmt {
            Statement::Break(_) | Statement::Continue(_) | Statement::Return(_) => self.found = true,
            _ => walk_statement(self, stmt),
        }
    }

    fn visit_expression(&mut self, _expr: &'a Expression) {}
}

fn has_jumps(stmt: &Statement) -> bool {
    let mut finder = JumpFinder { found: false };
    finder.visit_statement(stmt);
    finder.found
}

/// Whether a `break` inside `stmt` leaves the construct labeled `label`, or
/// with no label, the innermost loop or switch.
struct BreakFinder<'l> {
    label: Option<&'l str>,
    nesting: usize,
    found: bool,
}

impl<'a> AstVisitor<'a> for BreakFinder<'_> {
    fn visit_class(&mut self, _class: &'a ClassDecl) {}

    fn visit_statement(&mut self, stmt: &'a Statement) {
        match stmt {
            Statement::Break(None) if self.label.is_none() && self.nesting == 0 => self.found = true,
            Statement::Break(Some(l)) if Some(l.as_str()) == self.label => self.found = true,
            Statement::While(_)
            | Statement::DoWhile(_)
            | Statement::For(_)
            | Statement::Foreach(_)
            | Statement::Switch(_) => {
                self.nesting += 1;
                walk_statement(self, stmt);
                self.nesting -= 1;
            }
            _ => walk_statement(self, stmt),
        }
    }

    fn visit_expression(&mut self, _expr: &'a Expression) {}
}

fn breaks_out(body: &Statement, label: Option<&str>) -> bool {
    let mut finder = BreakFinder {
        label,
        nesting: 0,
        found: false,
    };
    finder.visit_statement(body);
    finder.found
}

fn breaks_out_of_cases(cases: &[Case]) -> bool {
    cases
        .iter()
        .flat_map(|c| &c.statements)
        .any(|s| breaks_out(s, None))
}

fn is_true(expr: &Expression) -> bool {
    matches!(expr, Expression::Literal(Literal::Bool(true)))
}

/// Java's "can complete normally", close enough to keep generated cases
/// free of unreachable statements.
pub(super) fn can_complete(stmt: &Statement) -> bool {
    match stmt {
        Statement::Return(_)
        | Statement::ReturnDefault
        | Statement::Throw(_)
        | Statement::Break(_)
        | Statement::Continue(_) => false,
        Statement::Block(b) => b.statements.iter().all(can_complete),
        Statement::If(n) => match &n.otherwise {
            Some(otherwise) => can_complete(&n.then) || can_complete(otherwise),
            None => true,
        },
        Statement::While(n) => !is_true(&n.cond) || breaks_out(&n.body, None),
        Statement::DoWhile(n) => (can_complete(&n.body) && !is_true(&n.cond)) || breaks_out(&n.body, None),
        Statement::For(n) => n.cond.as_ref().is_some_and(|c| !is_true(c)) || breaks_out(&n.body, None),
        Statement::Labeled(n) => can_complete(&n.body) || breaks_out(&n.body, Some(&n.label)),
        Statement::Switch(n) => {
            let has_default = n.cases.iter().any(|c| c.label.is_none());
            let last_completes = n
                .cases
                .iter()
                .rev()
                .find(|c| !c.statements.is_empty())
                .map_or(true, |c| c.statements.iter().all(can_complete));
            let trailing_label = n.cases.last().is_some_and(|c| c.statements.is_empty());
            !has_default || last_completes || trailing_label || breaks_out_of_cases(&n.cases)
        }
        Statement::Try(n) => {
            let finally_completes = n
                .finally
                .as_ref()
                .map_or(true, |f| f.statements.iter().all(can_complete));
            let any_completes = n.body.statements.iter().all(can_complete)
                || n.catches.iter().any(|c| c.body.statements.iter().all(can_complete));
            finally_completes && any_completes
        }
        Statement::Synchronized(n) => n.body.statements.iter().all(can_complete),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yield_(value: Expression) -> Statement {
        call("yield").arg(value).into()
    }

    fn compile(statements: Vec<Statement>) -> Machine {
        let empty = FxHashMap::default();
        Compiler::new(&empty, &empty).compile_body(statements)
    }

    #[test]
    fn test_each_yield_starts_a_state() {
        let machine = compile(vec![yield_(int(1)), yield_(int(2))]);
        assert_eq!(machine.layout, vec![0, 1, 2]);
        assert_eq!(machine.states[0].ops, vec![Op::Yield(int(1), 1)]);
        assert_eq!(machine.states[1].ops, vec![Op::Yield(int(2), 2)]);
        assert_eq!(machine.states[2].ops, vec![Op::Jump(Route::direct(DONE))]);
    }

    #[test]
    fn test_locals_are_lifted_and_yield_free_loops_stay_intact() {
        let inner = Statement::from(
            while_(lt(name("i"), int(3)), block().stmt(post_inc(name("i")))),
        );
        let machine = compile(vec![
            Statement::from(local(ty("int"), "i").init(int(0))),
            inner.clone(),
            yield_(name("i")),
        ]);
        assert_eq!(machine.lifted.type_of("i"), Some(&ty("int")));
        assert_eq!(
            machine.states[0].ops,
            vec![
                Op::Code(assign(name("i"), int(0)).into()),
                Op::Code(inner),
                Op::Yield(name("i"), 1),
            ]
        );
    }

    #[test]
    fn test_break_in_intact_statement_resolves_to_loop_end() {
        let machine = compile(vec![Statement::from(while_(
            true_(),
            block()
                .stmt(yield_(int(1)))
                .stmt(if_(name("done")).then(break_())),
        ))]);
        let head = machine.layout[1];
        let Some(Op::Intact(_, exits)) = machine
            .states
            .iter()
            .flat_map(|s| &s.ops)
            .find(|op| matches!(op, Op::Intact(..)))
        else {
            panic!("expected an intact statement");
        };
        let end = exits.brk.as_ref().unwrap().to;
        assert_eq!(exits.cont, Some(Route::direct(head)));
        assert_ne!(end, head);
        assert_eq!(machine.states[end].ops, vec![Op::Jump(Route::direct(DONE))]);
    }

    #[test]
    fn test_return_inside_try_finally_routes_through_finally() {
        let machine = compile(vec![Statement::from(
            try_(block().stmt(yield_(int(1))).stmt(return_void()))
                .finally_(block().stmt(call("close"))),
        )]);
        let finally = machine.regions[0].finally.unwrap();
        let exits = machine
            .states
            .iter()
            .flat_map(|s| &s.ops)
            .find_map(|op| match op {
                Op::Intact(_, exits) => Some(exits),
                _ => None,
            })
            .unwrap();
        assert_eq!(exits.ret, Route { next: vec![(0, DONE)], to: finally });
        assert!(machine.states[finally].ops.contains(&Op::FinallyExit(0)));
        assert_eq!(machine.lifted.type_of("$pendingException0"), Some(&ty("java.lang.Throwable")));
    }

    #[test]
    fn test_foreach_over_known_array_indexes() {
        let mut params = FxHashMap::default();
        params.insert("xs".to_string(), ty("int").array_of());
        let fields = FxHashMap::default();
        let machine = Compiler::new(&params, &fields).compile_body(vec![Statement::from(foreach(
            local(ty("int"), "x"),
            name("xs"),
            yield_(name("x")),
        ))]);
        assert_eq!(machine.lifted.type_of("$array1"), Some(&ty("int").array_of()));
        assert_eq!(machine.lifted.type_of("$index1"), Some(&ty("int")));
        assert!(machine.lifted.type_of("$iterator1").is_none());
    }

    #[test]
    fn test_foreach_over_iterable_uses_bounded_iterator() {
        let machine = compile(vec![Statement::from(foreach(
            local(ty("int"), "x"),
            call("values"),
            yield_(name("x")),
        ))]);
        assert_eq!(
            machine.lifted.type_of("$iterator1"),
            Some(&ty("java.util.Iterator").arg(TypeRef::extends_wildcard(ty("Integer"))))
        );
    }

    #[test]
    fn test_can_complete() {
        assert!(!can_complete(&return_void()));
        assert!(can_complete(&Statement::from(if_(name("c")).then(return_void()))));
        assert!(!can_complete(&Statement::from(
            if_(name("c")).then(return_void()).else_(throw_(null()))
        )));
        assert!(!can_complete(&Statement::from(while_(true_(), block()))));
        assert!(can_complete(&Statement::from(while_(true_(), block().stmt(break_())))));
    }
}
