//! Interpreter integration tests.
//!
//! Each test builds a small program through the factory and runs it.

use lpg_ast::factory::*;
use lpg_ast::*;
use lpg_eval::{EvalError, EvalResult, Interpreter, Value};
use pretty_assertions::assert_eq;

fn run(types: Vec<ClassDecl>) -> Interpreter {
    let unit = types
        .into_iter()
        .fold(CompilationUnit::new("Test.java"), |unit, ty| unit.with_type(ty));
    Interpreter::new(&[unit])
}

fn int_of(value: EvalResult<Value>) -> i32 {
    value.expect("call succeeds").as_int().expect("an int")
}

fn println(value: impl Into<Expression>) -> Statement {
    call("println").on(name("System.out")).arg(value).into()
}

// ============================================================================
// Classes and objects
// ============================================================================

fn counter() -> ClassDecl {
    class_decl("Counter")
        .public()
        .with_field(field_decl(ty("int"), "count").private())
        .with_field(field_decl(ty("int"), "created").private().static_())
        .with_constructor(
            constructor("Counter")
                .public()
                .with_arg(arg(ty("int"), "start"))
                .stmt(assign(this_field("count"), name("start")))
                .stmt(post_inc(name("created"))),
        )
        .with_method(
            method(ty("int"), "increment")
                .public()
                .stmt(compound_assign(BinaryOp::Add, this_field("count"), int(1)))
                .stmt(return_(name("count"))),
        )
        .with_method(
            method(ty("int"), "created")
                .public()
                .static_()
                .stmt(return_(name("created"))),
        )
}

#[test]
fn test_fields_constructors_and_methods() {
    let mut interp = run(vec![counter()]);
    let counter = interp.instantiate("Counter", vec![Value::Int(5)]).unwrap();
    assert_eq!(int_of(interp.call_method(&counter, "increment", vec![])), 6);
    assert_eq!(int_of(interp.call_method(&counter, "increment", vec![])), 7);
    assert_eq!(interp.field(&counter, "count").unwrap().as_int(), Some(7));
    assert_eq!(interp.class_name(&counter), "Counter");
}

#[test]
fn test_static_state_is_shared() {
    let mut interp = run(vec![counter()]);
    interp.instantiate("Counter", vec![Value::Int(0)]).unwrap();
    interp.instantiate("Counter", vec![Value::Int(0)]).unwrap();
    assert_eq!(int_of(interp.call_static("Counter", "created", vec![])), 2);
    assert_eq!(interp.static_field("Counter", "created").unwrap().as_int(), Some(2));
}

#[test]
fn test_static_initializer_runs_after_field_initializers() {
    let decl = class_decl("Config")
        .with_field(field_decl(ty("int"), "limit").static_().init(int(10)))
        .with_initializer(
            static_initializer().stmt(compound_assign(BinaryOp::Add, name("limit"), int(5))),
        );
    let mut interp = run(vec![decl]);
    assert_eq!(interp.static_field("Config", "limit").unwrap().as_int(), Some(15));
}

#[test]
fn test_unknown_constructor_arity() {
    let mut interp = run(vec![counter()]);
    let err = interp.instantiate("Counter", vec![]).unwrap_err();
    assert!(matches!(err, EvalError::UnknownConstructor { arity: 0, .. }), "{err}");
}

#[test]
fn test_virtual_dispatch_and_super_calls() {
    let base = class_decl("Base").with_method(method(TypeRef::string(), "greet").stmt(return_(string("base"))));
    let child = class_decl("Child").extends(ty("Base")).with_method(
        method(TypeRef::string(), "greet").stmt(return_(add(string("child+"), call("greet").on(name("super"))))),
    );
    let caller = class_decl("Caller").with_method(
        method(TypeRef::string(), "run")
            .static_()
            .stmt(local(ty("Base"), "b").init(new_(ty("Child"))))
            .stmt(return_(call("greet").on(name("b")))),
    );
    let mut interp = run(vec![base, child, caller]);
    let result = interp.call_static("Caller", "run", vec![]).unwrap();
    assert_eq!(result.as_str(), Some("child+base"));
}

#[test]
fn test_inner_class_reads_outer_instance() {
    let inner = class_decl("Inner").with_method(
        method(ty("int"), "outerValue").stmt(return_(field_ref(this_of("Outer"), "value"))),
    );
    let outer = class_decl("Outer")
        .with_field(field_decl(ty("int"), "value").init(int(42)))
        .with_member_type(inner)
        .with_method(method(ty("Inner"), "inner").stmt(return_(new_(ty("Inner")))));
    let mut interp = run(vec![outer]);
    let outer = interp.instantiate("Outer", vec![]).unwrap();
    let inner = interp.call_method(&outer, "inner", vec![]).unwrap();
    assert_eq!(int_of(interp.call_method(&inner, "outerValue", vec![])), 42);
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_labeled_break_leaves_outer_loop() {
    // outer: for (i...) for (j...) { if (i == 2 && j == 3) break outer; total++; }
    let inner_body = block()
        .stmt(if_(and(eq(name("i"), int(2)), eq(name("j"), int(3)))).then(break_to("outer")))
        .stmt(post_inc(name("total")));
    let inner = for_(inner_body)
        .init(local(ty("int"), "j").init(int(0)))
        .cond(lt(name("j"), int(10)))
        .update(post_inc(name("j")));
    let outer = for_(inner)
        .init(local(ty("int"), "i").init(int(0)))
        .cond(lt(name("i"), int(10)))
        .update(post_inc(name("i")));
    let decl = class_decl("Loops").with_method(
        method(ty("int"), "run")
            .static_()
            .stmt(local(ty("int"), "total").init(int(0)))
            .stmt(labeled("outer", outer))
            .stmt(return_(name("total"))),
    );
    let mut interp = run(vec![decl]);
    // Row 0 counts ten, row 1 counts ten, row 2 stops at j == 3.
    assert_eq!(int_of(interp.call_static("Loops", "run", vec![])), 23);
}

#[test]
fn test_while_with_continue() {
    let body = block()
        .stmt(post_inc(name("i")))
        .stmt(if_(eq(binary(BinaryOp::Rem, name("i"), int(2)), int(0))).then(continue_()))
        .stmt(compound_assign(BinaryOp::Add, name("sum"), name("i")));
    let decl = class_decl("Odd").with_method(
        method(ty("int"), "sum")
            .static_()
            .stmt(local(ty("int"), "i").init(int(0)))
            .stmt(local(ty("int"), "sum").init(int(0)))
            .stmt(while_(lt(name("i"), int(7)), body))
            .stmt(return_(name("sum"))),
    );
    let mut interp = run(vec![decl]);
    assert_eq!(int_of(interp.call_static("Odd", "sum", vec![])), 1 + 3 + 5 + 7);
}

#[test]
fn test_enum_switch_falls_through_to_break() {
    let color = class_decl("Color")
        .enumeration()
        .with_enum_constant("RED")
        .with_enum_constant("GREEN")
        .with_enum_constant("BLUE");
    let switch = switch_(name("c"))
        .case(case(name("RED")))
        .case(case(name("GREEN")).stmt(return_(string("warm"))))
        .case(default_case().stmt(break_()));
    let palette = class_decl("Palette").with_method(
        method(TypeRef::string(), "describe")
            .static_()
            .with_arg(arg(ty("Color"), "c"))
            .stmt(switch)
            .stmt(return_(string("cold"))),
    );
    let mut interp = run(vec![color, palette]);

    let red = interp.static_field("Color", "RED").unwrap();
    let blue = interp.static_field("Color", "BLUE").unwrap();
    let describe = |interp: &mut Interpreter, c: Value| interp.call_static("Palette", "describe", vec![c]).unwrap();
    assert_eq!(describe(&mut interp, red.clone()).as_str(), Some("warm"));
    assert_eq!(describe(&mut interp, blue).as_str(), Some("cold"));
    assert_eq!(interp.stringify(&red).unwrap(), "RED");
    assert_eq!(int_of(interp.call_method(&red, "ordinal", vec![])), 0);
}

#[test]
fn test_enum_values_in_declaration_order() {
    let decl = class_decl("Size")
        .enumeration()
        .with_enum_constant("SMALL")
        .with_enum_constant("LARGE");
    let mut interp = run(vec![decl]);
    let values = interp.call_static("Size", "values", vec![]).unwrap();
    let names: Vec<String> = interp
        .drain(&values, 10)
        .unwrap()
        .iter()
        .map(|v| interp.stringify(v).unwrap())
        .collect();
    assert_eq!(names, vec!["SMALL", "LARGE"]);
}

// ============================================================================
// Exceptions
// ============================================================================

#[test]
fn test_uncaught_exception_surfaces_class_and_message() {
    let decl = class_decl("Fails").with_method(
        method(TypeRef::void(), "run")
            .static_()
            .stmt(throw_(new_(ty("IllegalStateException")).arg(string("boom")))),
    );
    let mut interp = run(vec![decl]);
    let err = interp.call_static("Fails", "run", vec![]).unwrap_err();
    assert_eq!(
        err,
        EvalError::Uncaught {
            class: "IllegalStateException".to_string(),
            message: Some("boom".to_string()),
        }
    );
}

#[test]
fn test_catch_then_finally() {
    let body = try_(
        block()
            .stmt(compound_assign(BinaryOp::Add, name("log"), string("t")))
            .stmt(throw_(new_(ty("java.io.IOException")).arg(string("x")))),
    )
    .catch_(
        arg(ty("RuntimeException"), "e"),
        block().stmt(compound_assign(BinaryOp::Add, name("log"), string("r"))),
    )
    .catch_(
        arg(ty("IOException"), "e"),
        block().stmt(compound_assign(
            BinaryOp::Add,
            name("log"),
            call("getMessage").on(name("e")),
        )),
    )
    .finally_(block().stmt(compound_assign(BinaryOp::Add, name("log"), string("f"))));
    let decl = class_decl("Flow").with_method(
        method(TypeRef::string(), "run")
            .static_()
            .stmt(local(TypeRef::string(), "log").init(string("")))
            .stmt(body)
            .stmt(return_(name("log"))),
    );
    let mut interp = run(vec![decl]);
    assert_eq!(interp.call_static("Flow", "run", vec![]).unwrap().as_str(), Some("txf"));
}

#[test]
fn test_user_exception_subclass() {
    let error = class_decl("Rejected").extends(ty("RuntimeException")).with_constructor(
        constructor("Rejected")
            .with_arg(arg(TypeRef::string(), "reason"))
            .stmt(call("super").arg(name("reason"))),
    );
    let decl = class_decl("Gate")
        .with_method(
            method(TypeRef::void(), "enter")
                .static_()
                .stmt(throw_(new_(ty("Rejected")).arg(string("closed")))),
        )
        .with_method(
            method(TypeRef::string(), "tryEnter")
                .static_()
                .stmt(
                    try_(block().stmt(call("enter")))
                        .catch_(arg(ty("RuntimeException"), "e"), block().stmt(return_(call("getMessage").on(name("e"))))),
                )
                .stmt(return_(string("entered"))),
        );
    let mut interp = run(vec![error, decl]);
    assert_eq!(interp.call_static("Gate", "tryEnter", vec![]).unwrap().as_str(), Some("closed"));
    let err = interp.call_static("Gate", "enter", vec![]).unwrap_err();
    assert_eq!(
        err,
        EvalError::Uncaught {
            class: "Rejected".to_string(),
            message: Some("closed".to_string()),
        }
    );
}

#[test]
fn test_division_by_zero_throws() {
    let decl = class_decl("Div").with_method(
        method(ty("int"), "run")
            .static_()
            .with_arg(arg(ty("int"), "d"))
            .stmt(return_(binary(BinaryOp::Div, int(1), name("d")))),
    );
    let mut interp = run(vec![decl]);
    let err = interp.call_static("Div", "run", vec![Value::Int(0)]).unwrap_err();
    assert!(matches!(err, EvalError::Uncaught { ref class, .. } if class == "ArithmeticException"), "{err}");
}

#[test]
fn test_verbatim_statements_are_unsupported() {
    let decl = class_decl("Raw").with_method(method(TypeRef::void(), "run").static_().stmt(wrapped_stmt("x();")));
    let mut interp = run(vec![decl]);
    let err = interp.call_static("Raw", "run", vec![]).unwrap_err();
    assert!(matches!(err, EvalError::Unsupported(_)), "{err}");
}

// ============================================================================
// Local and anonymous classes
// ============================================================================

#[test]
fn test_anonymous_class_captures_locals() {
    let run_method = method(TypeRef::void(), "run")
        .public()
        .stmt(compound_assign(BinaryOp::Add, name("total"), name("step")));
    let decl = class_decl("Accumulator")
        .with_field(field_decl(ty("int"), "total"))
        .with_method(
            method(ty("int"), "twice")
                .stmt(local(ty("int"), "step").final_().init(int(5)))
                .stmt(
                    local(ty("Runnable"), "task")
                        .init(new_(ty("Runnable")).body(class_decl("").with_method(run_method))),
                )
                .stmt(call("run").on(name("task")))
                .stmt(call("run").on(name("task")))
                .stmt(return_(name("total"))),
        );
    let mut interp = run(vec![decl]);
    let acc = interp.instantiate("Accumulator", vec![]).unwrap();
    assert_eq!(int_of(interp.call_method(&acc, "twice", vec![])), 10);
}

#[test]
fn test_local_class_iterator_drains() {
    let iterator = class_decl("Steps")
        .make_local()
        .implements(ty("java.util.Iterator").arg(ty("Integer")))
        .with_field(field_decl(ty("int"), "next").init(name("start")))
        .with_method(method(ty("boolean"), "hasNext").public().stmt(return_(lt(name("next"), name("end")))))
        .with_method(
            method(ty("Integer"), "next")
                .public()
                .stmt(return_(post_inc(this_field("next")))),
        );
    let decl = class_decl("Range").with_method(
        method(ty("java.util.Iterator").arg(ty("Integer")), "iterate")
            .static_()
            .with_arg(arg(ty("int"), "start").final_())
            .with_arg(arg(ty("int"), "end").final_())
            .stmt(iterator)
            .stmt(return_(new_(ty("Steps")))),
    );
    let mut interp = run(vec![decl]);
    let it = interp
        .call_static("Range", "iterate", vec![Value::Int(3), Value::Int(6)])
        .unwrap();
    let items: Vec<i32> = interp.drain(&it, 10).unwrap().iter().filter_map(Value::as_int).collect();
    assert_eq!(items, vec![3, 4, 5]);
}

// ============================================================================
// Library support
// ============================================================================

#[test]
fn test_println_and_format() {
    let decl = class_decl("Hello").with_method(
        method(TypeRef::void(), "main")
            .static_()
            .stmt(println(string("hi")))
            .stmt(println(
                call("format").on(name("String")).arg(string("%s=%d")).arg(string("n")).arg(int(3)),
            ))
            .stmt(println(add(string("sum "), add(int(1), int(2))))),
    );
    let mut interp = run(vec![decl]);
    interp.call_static("Hello", "main", vec![]).unwrap();
    assert_eq!(interp.take_output(), "hi\nn=3\nsum 3\n");
    assert_eq!(interp.output(), "");
}

#[test]
fn test_list_and_foreach() {
    let list_ty = ty("java.util.List").arg(ty("Integer"));
    let decl = class_decl("Lists").with_method(
        method(ty("int"), "sum")
            .static_()
            .stmt(local(list_ty, "values").init(new_(ty("java.util.ArrayList").arg(ty("Integer")))))
            .stmt(call("add").on(name("values")).arg(int(4)))
            .stmt(call("add").on(name("values")).arg(int(6)))
            .stmt(local(ty("int"), "sum").init(int(0)))
            .stmt(foreach(
                local(ty("int"), "v"),
                name("values"),
                Statement::from(compound_assign(BinaryOp::Add, name("sum"), name("v"))),
            ))
            .stmt(return_(add(name("sum"), call("size").on(name("values"))))),
    );
    let mut interp = run(vec![decl]);
    assert_eq!(int_of(interp.call_static("Lists", "sum", vec![])), 12);
}

#[test]
fn test_lock_held_counts() {
    let decl = class_decl("Guarded")
        .with_field(
            field_decl(ty("java.util.concurrent.locks.ReentrantLock"), "lock")
                .private()
                .final_()
                .init(new_(ty("java.util.concurrent.locks.ReentrantLock"))),
        )
        .with_field(field_decl(ty("int"), "hits"))
        .with_method(
            method(TypeRef::void(), "hit").stmt(call("lock").on(this_field("lock"))).stmt(
                try_(block().stmt(post_inc(this_field("hits"))))
                    .finally_(block().stmt(call("unlock").on(this_field("lock")))),
            ),
        );
    let mut interp = run(vec![decl]);
    let guarded = interp.instantiate("Guarded", vec![]).unwrap();
    interp.call_method(&guarded, "hit", vec![]).unwrap();
    interp.call_method(&guarded, "hit", vec![]).unwrap();
    let lock = interp.field(&guarded, "lock").unwrap();
    let stats = lock.lock_stats().expect("a lock");
    assert_eq!(stats.held(), 0);
    assert_eq!(interp.field(&guarded, "hits").unwrap().as_int(), Some(2));
}

#[test]
fn test_unlock_without_lock_throws() {
    let decl = class_decl("Sloppy").with_method(
        method(TypeRef::void(), "run")
            .static_()
            .stmt(local(ty("ReentrantLock"), "lock").init(new_(ty("ReentrantLock"))))
            .stmt(call("unlock").on(name("lock"))),
    );
    let mut interp = run(vec![decl]);
    let err = interp.call_static("Sloppy", "run", vec![]).unwrap_err();
    assert!(matches!(err, EvalError::Uncaught { ref class, .. } if class == "IllegalMonitorStateException"), "{err}");
}
