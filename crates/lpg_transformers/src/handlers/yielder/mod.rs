//! `yield(expr);` generators: a method returning `Iterator<T>` or
//! `Iterable<T>` whose body yields becomes a method returning a local
//! state-machine class.
//!
//! The pipeline runs in stages: [`validate`] rejects bodies the machine
//! cannot express, [`lift`] renames locals apart so they can become fields,
//! [`compile`] splits the body into states at every yield, [`optimize`]
//! drops forwarding and dead states, and [`emit`] lowers the machine into
//! the `getNext()` and `getErrorHandler()` methods.

mod compile;
mod emit;
mod lift;
mod optimize;
mod validate;

pub use validate::uses_yield;

use self::compile::{Compiler, Machine};
use self::emit::{Lowered, NEXT, STATE};
use self::validate::Generator;
use super::{method_target, qualify_this};
use crate::editor::TypeEditor;
use crate::error::HandlerResult;
use crate::handler::{Handler, HandlerContext, Outcome, Target, Trigger};
use lpg_ast::factory::*;
use lpg_ast::*;
use lpg_core::names::capitalize;
use rustc_hash::FxHashMap;

const HAS_NEXT: &str = "$hasNext";
const NEXT_DEFINED: &str = "$nextDefined";

/// The yielder class for one generator plus what went into it.
struct Yielder {
    class: ClassDecl,
    states: usize,
    lifted: usize,
}

fn iterator_methods(element: &TypeRef) -> Vec<MethodDecl> {
    let has_next = method(TypeRef::new("boolean"), "hasNext")
        .public()
        .implementing()
        .stmt(
            if_(not(name(NEXT_DEFINED))).then(
                block()
                    .stmt(assign(name(HAS_NEXT), call("getNext")))
                    .stmt(assign(name(NEXT_DEFINED), true_())),
            ),
        )
        .stmt(return_(name(HAS_NEXT)));
    let next = method(element.clone(), "next")
        .public()
        .implementing()
        .stmt(
            if_(not(call("hasNext")))
                .then(block().stmt(throw_(new_(TypeRef::new("java.util.NoSuchElementException"))))),
        )
        .stmt(assign(name(NEXT_DEFINED), false_()))
        .stmt(return_(name(NEXT)));
    let remove = method(TypeRef::void(), "remove")
        .public()
        .implementing()
        .stmt(throw_(new_(TypeRef::new("java.lang.UnsupportedOperationException"))));
    vec![has_next, next, remove]
}

/// `iterator()` hands out the yielder itself the first time and a fresh
/// one afterwards.
fn iterable_method(yielder: &str, element: &TypeRef) -> MethodDecl {
    method(TypeRef::new("java.util.Iterator").arg(element.clone()), "iterator")
        .public()
        .implementing()
        .stmt(
            if_(eq(name(STATE), int(0))).then(
                block()
                    .stmt(assign(name(STATE), int(1)))
                    .stmt(return_(this())),
            ),
        )
        .stmt(return_(call("iterator").on(new_(TypeRef::new(yielder)))))
}

fn build_yielder(
    owner: &str,
    fields: &FxHashMap<String, TypeRef>,
    decl: &MethodDecl,
    shape: &Generator,
    optimize: bool,
) -> Yielder {
    let mut statements = decl.statements.clone();
    if !decl.is_static() {
        qualify_this(&mut statements, owner);
    }
    let mut reserved: Vec<String> = fields.keys().cloned().collect();
    reserved.sort();
    lift::disambiguate(&mut statements, &decl.args, &reserved);

    let params: FxHashMap<String, TypeRef> = decl.args.iter().map(|a| (a.name.clone(), a.ty.clone())).collect();
    let mut machine: Machine = Compiler::new(&params, fields).compile_body(statements);
    if optimize {
        optimize::optimize_states(&mut machine);
    }

    // Iterables keep state 0 for "iterator() not called yet".
    let first = if shape.iterable { 1 } else { 0 };
    let Lowered {
        get_next,
        error_handler,
    } = emit::lower(&machine, first);
    let states = machine.layout.len();
    let lifted = machine.lifted.len();

    let yielder = format!("$Yielder{}", capitalize(&decl.name));
    let element = &shape.element;
    let mut class = class_decl(yielder.clone())
        .make_local()
        .implements(TypeRef::new("java.util.Iterator").arg(element.clone()));
    if shape.iterable {
        class = class.implements(TypeRef::new("java.lang.Iterable").arg(element.clone()));
    }
    for field in machine.lifted.into_fields() {
        class = class.with_field(field);
    }
    class = class
        .with_field(field_decl(TypeRef::new("int"), STATE).private())
        .with_field(field_decl(TypeRef::new("boolean"), HAS_NEXT).private())
        .with_field(field_decl(TypeRef::new("boolean"), NEXT_DEFINED).private())
        .with_field(field_decl(element.clone(), NEXT).private());
    if shape.iterable {
        class = class.with_method(iterable_method(&yielder, element));
    }
    class = class
        .with_methods(iterator_methods(element))
        .with_method(get_next)
        .with_method(error_handler);

    Yielder { class, states, lifted }
}

pub struct YieldHandler;

impl Handler for YieldHandler {
    fn name(&self) -> &'static str {
        "Yield"
    }

    fn trigger(&self) -> Trigger {
        Trigger::YieldCall
    }

    fn handle(&self, ctx: &mut HandlerContext<'_>, mut editor: TypeEditor<'_>, target: Target) -> HandlerResult<Outcome> {
        let index = method_target(ctx, target)?;
        let decl = editor.method(index)?;
        let shape = validate::check(decl)?;
        let fields: FxHashMap<String, TypeRef> = editor
            .fields()
            .map(|f| (f.name().to_string(), f.ty().clone()))
            .collect();
        let yielder = build_yielder(editor.name(), &fields, decl, &shape, ctx.options.optimize_states());
        tracing::debug!(
            method = %decl.name,
            states = yielder.states,
            lifted = yielder.lifted,
            "built yielder"
        );

        let spawn = return_(new_(yielder.class.self_type()));
        let mut method_editor = editor.method_editor(index)?;
        method_editor.replace_body(vec![Statement::from(yielder.class), spawn]);
        Ok(Outcome::Applied(editor.rebuild()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yield_(value: Expression) -> Statement {
        call("yield").arg(value).into()
    }

    fn build(decl: &MethodDecl) -> Yielder {
        let shape = validate::check(decl).unwrap();
        build_yielder("Numbers", &FxHashMap::default(), decl, &shape, true)
    }

    #[test]
    fn test_iterator_yielder_shape() {
        let decl = method(ty("java.util.Iterator").arg(ty("Integer")), "count")
            .stmt(yield_(int(1)))
            .stmt(yield_(int(2)));
        let yielder = build(&decl);
        let class = &yielder.class;
        assert_eq!(class.name, "$YielderCount");
        assert!(class.local);
        assert_eq!(class.interfaces, vec![ty("java.util.Iterator").arg(ty("Integer"))]);
        let methods: Vec<&str> = class.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(methods, ["hasNext", "next", "remove", "getNext", "getErrorHandler"]);
        assert_eq!(class.field(NEXT).map(|f| &f.ty), Some(&ty("Integer")));
        assert!(class.has_field(STATE));
    }

    #[test]
    fn test_iterable_yielder_reserves_state_zero() {
        let decl = method(ty("Iterable").arg(ty("String")), "names").stmt(yield_(string("a")));
        let yielder = build(&decl);
        assert_eq!(yielder.class.interfaces.len(), 2);
        assert_eq!(yielder.class.methods[0].name, "iterator");
        let get_next = yielder.class.method("getNext", Some(0)).unwrap();
        let Statement::While(spin) = &get_next.statements[0] else {
            panic!("expected loop");
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
        assert_eq!(dispatch.cases[0].label, Some(int(1)));
    }

    #[test]
    fn test_locals_become_fields() {
        let decl = method(ty("Iterator").arg(ty("Integer")), "upTo")
            .with_arg(arg(ty("int"), "n").final_())
            .stmt(
                for_(block().stmt(yield_(name("i"))))
                    .init(local(ty("int"), "i").init(int(0)))
                    .cond(lt(name("i"), name("n")))
                    .update(post_inc(name("i"))),
            );
        let yielder = build(&decl);
        assert_eq!(yielder.lifted, 1);
        assert_eq!(yielder.class.field("i").map(|f| &f.ty), Some(&ty("int")));
        assert!(!yielder.class.has_field("n"));
    }

    #[test]
    fn test_outer_this_is_qualified() {
        let decl = method(ty("Iterator").arg(ty("Object")), "selves").stmt(yield_(this()));
        let yielder = build(&decl);
        let get_next = yielder.class.method("getNext", Some(0)).unwrap();
        let printed = format!("{:?}", get_next.statements);
        assert!(printed.contains("Some(\"Numbers\")"));
    }
}
