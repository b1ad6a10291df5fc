//! Handler integration tests.
//!
//! Each test transforms a small compilation unit and then runs the result
//! through the interpreter, so the assertions are about what generated code
//! does rather than how it is shaped.

use lpg_ast::factory::*;
use lpg_ast::*;
use lpg_diagnostics::DiagnosticCollection;
use lpg_eval::{EvalError, Interpreter, Value};
use lpg_options::TransformOptions;
use lpg_printer::Printer;
use lpg_transformers::{Transformer, UnitResolver};
use pretty_assertions::assert_eq;

fn transform(types: Vec<ClassDecl>) -> (CompilationUnit, DiagnosticCollection) {
    let mut unit = types
        .into_iter()
        .fold(CompilationUnit::new("Test.java"), |unit, ty| unit.with_type(ty));
    let resolver = UnitResolver::from_units([&unit]);
    let transformer = Transformer::new(TransformOptions::default(), &resolver);
    let diagnostics = transformer.transform_unit(&mut unit);
    (unit, diagnostics)
}

fn load(types: Vec<ClassDecl>) -> Interpreter {
    let (unit, diagnostics) = transform(types);
    assert!(!diagnostics.has_errors(), "{:?}", diagnostics.diagnostics());
    Interpreter::new(&[unit])
}

fn yield_(value: impl Into<Expression>) -> Statement {
    call("yield").arg(value).into()
}

fn ints(values: Vec<Value>) -> Vec<i32> {
    values.iter().filter_map(Value::as_int).collect()
}

// ============================================================================
// Builder
// ============================================================================

fn person(builder: Annotation) -> ClassDecl {
    class_decl("Person")
        .public()
        .with_annotation(builder)
        .with_field(field_decl(ty("int"), "a").private().final_())
        .with_field(field_decl(ty("int"), "b").private().final_())
        .with_field(field_decl(TypeRef::string(), "c").private().init(string("x")))
}

#[test]
fn test_builder_chain_builds_instance() {
    let mut interp = load(vec![person(annotation(ty("Builder")))]);
    let step = interp.call_static("Person", "create", vec![]).unwrap();
    let step = interp.call_method(&step, "a", vec![Value::Int(1)]).unwrap();
    let step = interp.call_method(&step, "b", vec![Value::Int(2)]).unwrap();
    let step = interp.call_method(&step, "c", vec![Value::str("y")]).unwrap();
    let built = interp.call_method(&step, "build", vec![]).unwrap();

    assert_eq!(interp.class_name(&built), "Person");
    assert_eq!(interp.field(&built, "a").unwrap().as_int(), Some(1));
    assert_eq!(interp.field(&built, "b").unwrap().as_int(), Some(2));
    assert_eq!(interp.field(&built, "c").unwrap().as_str(), Some("y"));
}

#[test]
fn test_builder_optional_field_keeps_default() {
    let mut interp = load(vec![person(annotation(ty("Builder")))]);
    let step = interp.call_static("Person", "create", vec![]).unwrap();
    let step = interp.call_method(&step, "a", vec![Value::Int(1)]).unwrap();
    let step = interp.call_method(&step, "b", vec![Value::Int(2)]).unwrap();
    let built = interp.call_method(&step, "build", vec![]).unwrap();
    assert_eq!(interp.field(&built, "c").unwrap().as_str(), Some("x"));
}

#[test]
fn test_builder_reset_restores_defaults() {
    let mut interp = load(vec![person(annotation(ty("Builder")).value("allowReset", true_()))]);
    let step = interp.call_static("Person", "create", vec![]).unwrap();
    let step = interp.call_method(&step, "a", vec![Value::Int(1)]).unwrap();
    let step = interp.call_method(&step, "b", vec![Value::Int(2)]).unwrap();
    let step = interp.call_method(&step, "c", vec![Value::str("y")]).unwrap();
    let step = interp.call_method(&step, "reset", vec![]).unwrap();
    let step = interp.call_method(&step, "a", vec![Value::Int(3)]).unwrap();
    let step = interp.call_method(&step, "b", vec![Value::Int(4)]).unwrap();
    let built = interp.call_method(&step, "build", vec![]).unwrap();

    assert_eq!(interp.field(&built, "a").unwrap().as_int(), Some(3));
    assert_eq!(interp.field(&built, "c").unwrap().as_str(), Some("x"));
}

#[test]
fn test_builder_reset_after_build_gives_fresh_collections() {
    let tags = ty("java.util.List").arg(TypeRef::string());
    let team = class_decl("Team")
        .with_annotation(annotation(ty("Builder")).value("allowReset", true_()))
        .with_field(field_decl(tags, "tags").private().init(new_(ty("java.util.ArrayList").arg(TypeRef::string()))));
    let mut interp = load(vec![team]);

    let builder = interp.call_static("Team", "create", vec![]).unwrap();
    let builder = interp.call_method(&builder, "tag", vec![Value::str("a")]).unwrap();
    let first = interp.call_method(&builder, "build", vec![]).unwrap();
    let builder = interp.call_method(&builder, "reset", vec![]).unwrap();
    let second = interp.call_method(&builder, "build", vec![]).unwrap();

    let size = |interp: &mut Interpreter, team: &Value| {
        let list = interp.field(team, "tags").unwrap();
        interp.call_method(&list, "size", vec![]).unwrap().as_int()
    };
    assert_eq!(size(&mut interp, &first), Some(1));
    assert_eq!(size(&mut interp, &second), Some(0));
}

#[test]
fn test_builder_required_steps_only_expose_next_setter() {
    let (unit, _) = transform(vec![person(annotation(ty("Builder")))]);
    let person = unit.find_type("Person").unwrap();
    let first = person.member_type("ADef").unwrap();
    let names: Vec<&str> = first.methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["a"]);
    let second = person.member_type("BDef").unwrap();
    let names: Vec<&str> = second.methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["b"]);
    assert_eq!(second.methods[0].return_type, ty("OptionalDef"));
}

#[test]
fn test_builder_output_prints() {
    let (unit, _) = transform(vec![person(annotation(ty("Builder")))]);
    let printed = Printer::new().print_unit(&unit);
    assert!(printed.contains("ADef create()"), "{printed}");
    assert!(printed.contains("class $PersonBuilder"), "{printed}");
    assert!(printed.contains("implements ADef, BDef, OptionalDef"), "{printed}");
    assert!(!printed.contains("@Builder"), "{printed}");
}

#[test]
fn test_builder_on_interface_is_rejected() {
    let decl = class_decl("Shape").interface().with_annotation(annotation(ty("Builder")));
    let (unit, diagnostics) = transform(vec![decl]);
    assert!(diagnostics.has_errors());
    let shape = unit.find_type("Shape").unwrap();
    assert!(shape.member_types.is_empty());
    assert!(shape.methods.is_empty());
}

// ============================================================================
// Fluent setters and rethrow
// ============================================================================

#[test]
fn test_fluent_setters_chain() {
    let decl = class_decl("Window")
        .with_annotation(annotation(ty("FluentSetter")))
        .with_field(field_decl(ty("int"), "width").private())
        .with_field(field_decl(ty("int"), "height").private());
    let mut interp = load(vec![decl]);
    let window = interp.instantiate("Window", vec![]).unwrap();
    let same = interp.call_method(&window, "width", vec![Value::Int(640)]).unwrap();
    let same = interp.call_method(&same, "height", vec![Value::Int(480)]).unwrap();
    assert!(same.same(&window));
    assert_eq!(interp.field(&window, "width").unwrap().as_int(), Some(640));
    assert_eq!(interp.field(&window, "height").unwrap().as_int(), Some(480));
}

#[test]
fn test_rethrow_wraps_with_formatted_message() {
    let rethrow = annotation(ty("Rethrow"))
        .value("value", class_lit(ty("java.io.IOException")))
        .value("as", class_lit(ty("IllegalStateException")))
        .value("message", string("cannot open $path"));
    let decl = class_decl("Files").with_method(
        method(TypeRef::void(), "open")
            .static_()
            .with_annotation(rethrow)
            .with_arg(arg(TypeRef::string(), "path"))
            .with_thrown(ty("java.io.IOException"))
            .stmt(throw_(new_(ty("java.io.IOException")).arg(string("disk")))),
    );
    let mut interp = load(vec![decl]);
    let err = interp.call_static("Files", "open", vec![Value::str("a.txt")]).unwrap_err();
    assert_eq!(
        err,
        EvalError::Uncaught {
            class: "IllegalStateException".to_string(),
            message: Some("cannot open a.txt".to_string()),
        }
    );
}

#[test]
fn test_rethrow_lets_unchecked_exceptions_through() {
    let decl = class_decl("Files").with_method(
        method(TypeRef::void(), "check")
            .static_()
            .with_annotation(annotation(ty("Rethrow")))
            .stmt(throw_(new_(ty("IllegalArgumentException")).arg(string("bad")))),
    );
    let mut interp = load(vec![decl]);
    let err = interp.call_static("Files", "check", vec![]).unwrap_err();
    assert!(matches!(err, EvalError::Uncaught { ref class, .. } if class == "IllegalArgumentException"), "{err}");
}

// ============================================================================
// Locks
// ============================================================================

fn account() -> ClassDecl {
    class_decl("Account")
        .with_field(field_decl(ty("int"), "balance").private())
        .with_field(field_decl(ty("boolean"), "open").private())
        .with_method(
            method(TypeRef::void(), "deposit")
                .with_annotation(annotation(ty("WriteLock")))
                .with_arg(arg(ty("int"), "amount"))
                .stmt(compound_assign(BinaryOp::Add, name("balance"), name("amount"))),
        )
        .with_method(
            method(ty("int"), "balance")
                .with_annotation(annotation(ty("ReadLock")))
                .stmt(return_(name("balance"))),
        )
        .with_method(method(ty("boolean"), "isOpen").stmt(return_(name("open"))))
        .with_method(
            method(TypeRef::void(), "open")
                .with_annotation(annotation(ty("Signal")).value("value", string("opened")))
                .stmt(assign(name("open"), true_())),
        )
        .with_method(
            method(TypeRef::void(), "withdraw")
                .with_annotation(
                    annotation(ty("Await"))
                        .value("value", string("opened"))
                        .value("conditionMethod", string("isOpen")),
                )
                .with_arg(arg(ty("int"), "amount"))
                .stmt(compound_assign(BinaryOp::Sub, name("balance"), name("amount"))),
        )
}

#[test]
fn test_read_write_locks_are_released() {
    let mut interp = load(vec![account()]);
    let account = interp.instantiate("Account", vec![]).unwrap();
    interp.call_method(&account, "deposit", vec![Value::Int(5)]).unwrap();
    interp.call_method(&account, "deposit", vec![Value::Int(7)]).unwrap();
    assert_eq!(interp.call_method(&account, "balance", vec![]).unwrap().as_int(), Some(12));

    let rw = interp.field(&account, "$readWriteLock").unwrap();
    let write = interp.call_method(&rw, "writeLock", vec![]).unwrap();
    let read = interp.call_method(&rw, "readLock", vec![]).unwrap();
    let write = write.lock_stats().unwrap();
    let read = read.lock_stats().unwrap();
    assert_eq!((write.acquired, write.held()), (2, 0));
    assert_eq!((read.acquired, read.held()), (1, 0));
}

#[test]
fn test_signal_after_and_await_before() {
    let mut interp = load(vec![account()]);
    let account = interp.instantiate("Account", vec![]).unwrap();
    interp.call_method(&account, "deposit", vec![Value::Int(10)]).unwrap();

    // Nobody else can open the account on a single thread.
    let err = interp.call_method(&account, "withdraw", vec![Value::Int(3)]).unwrap_err();
    assert_eq!(err, EvalError::WouldBlock);
    let lock = interp.field(&account, "$lock").unwrap();
    assert_eq!(lock.lock_stats().unwrap().held(), 0);

    interp.call_method(&account, "open", vec![]).unwrap();
    interp.call_method(&account, "withdraw", vec![Value::Int(3)]).unwrap();
    let opened = interp.field(&account, "opened").unwrap();
    let stats = opened.condition_stats().unwrap();
    assert_eq!(stats.signals, 1);
    assert_eq!(stats.awaits, 1);
    assert_eq!(interp.call_method(&account, "balance", vec![]).unwrap().as_int(), Some(7));
}

#[test]
fn test_write_lock_released_when_body_throws() {
    let vault = class_decl("Vault").with_method(
        method(TypeRef::void(), "explode")
            .with_annotation(annotation(ty("WriteLock")))
            .stmt(throw_(new_(ty("IllegalStateException")).arg(string("boom")))),
    );
    let mut interp = load(vec![vault]);
    let vault = interp.instantiate("Vault", vec![]).unwrap();
    let err = interp.call_method(&vault, "explode", vec![]).unwrap_err();
    assert!(matches!(err, EvalError::Uncaught { ref class, .. } if class == "IllegalStateException"), "{err}");

    let rw = interp.field(&vault, "$readWriteLock").unwrap();
    let write = interp.call_method(&rw, "writeLock", vec![]).unwrap();
    let stats = write.lock_stats().unwrap();
    assert_eq!((stats.acquired, stats.held()), (1, 0));
}

#[test]
fn test_failed_overload_does_not_shadow_the_next() {
    let store = class_decl("Store")
        .with_field(field_decl(ty("int"), "x").private())
        .with_method(
            method(TypeRef::void(), "put")
                .with_annotation(annotation(ty("WriteLock")))
                .without_body(),
        )
        .with_method(
            method(TypeRef::void(), "put")
                .with_annotation(annotation(ty("WriteLock")))
                .with_arg(arg(ty("int"), "v"))
                .stmt(assign(this_field("x"), name("v"))),
        );
    let (unit, diagnostics) = transform(vec![store]);
    assert_eq!(diagnostics.error_count(), 1);

    let store = unit.find_type("Store").unwrap();
    let stub = store.methods.iter().find(|m| m.name == "put" && m.args.is_empty()).unwrap();
    assert_eq!(stub.annotations.len(), 1);
    let concrete = store.methods.iter().find(|m| m.name == "put" && m.args.len() == 1).unwrap();
    assert!(concrete.annotations.is_empty());
    let printed = Printer::new().print_method(concrete);
    assert!(printed.contains("writeLock().lock();"), "{printed}");
}

// ============================================================================
// Singleton
// ============================================================================

fn registry(singleton: Annotation) -> ClassDecl {
    class_decl("Registry")
        .with_annotation(singleton)
        .with_field(field_decl(ty("int"), "hits").private())
        .with_method(
            method(ty("int"), "hit")
                .stmt(compound_assign(BinaryOp::Add, name("hits"), int(1)))
                .stmt(return_(name("hits"))),
        )
}

#[test]
fn test_enum_singleton_identity() {
    let mut interp = load(vec![registry(annotation(ty("Singleton")))]);
    let first = interp.call_static("Registry", "getInstance", vec![]).unwrap();
    let second = interp.call_static("Registry", "getInstance", vec![]).unwrap();
    assert!(first.same(&second));
    interp.call_method(&first, "hit", vec![]).unwrap();
    assert_eq!(interp.call_method(&second, "hit", vec![]).unwrap().as_int(), Some(2));
    assert_eq!(interp.stringify(&first).unwrap(), "INSTANCE");
}

#[test]
fn test_holder_singleton_identity() {
    let singleton = annotation(ty("Singleton")).value("style", name("Singleton.Style.HOLDER"));
    let mut interp = load(vec![registry(singleton)]);
    let first = interp.call_static("Registry", "getInstance", vec![]).unwrap();
    let second = interp.call_static("Registry", "getInstance", vec![]).unwrap();
    assert!(first.same(&second));
    assert_eq!(interp.class_name(&first), "Registry");
}

#[test]
fn test_singleton_leaves_no_public_constructor() {
    let styles = [
        annotation(ty("Singleton")),
        annotation(ty("Singleton")).value("style", name("Singleton.Style.HOLDER")),
    ];
    for singleton in styles {
        let declared = registry(singleton.clone()).with_constructor(constructor("Registry").public());
        let (unit, diagnostics) = transform(vec![declared]);
        assert!(!diagnostics.has_errors(), "{:?}", diagnostics.diagnostics());
        let registry_type = unit.find_type("Registry").unwrap();
        assert_eq!(registry_type.constructors.len(), 1);
        assert_eq!(registry_type.constructors[0].modifiers.access(), AccessLevel::Package);

        let (unit, _) = transform(vec![registry(singleton)]);
        let registry_type = unit.find_type("Registry").unwrap();
        assert_eq!(registry_type.constructors.len(), 1);
        assert_eq!(registry_type.constructors[0].modifiers.access(), AccessLevel::Package);
    }
}

// ============================================================================
// Yield
// ============================================================================

fn numbers() -> ClassDecl {
    let iterator = ty("java.util.Iterator").arg(ty("Integer"));
    let inner = ty("java.util.Map").arg(TypeRef::string()).arg(ty("Integer"));
    let nested = ty("java.util.Map").arg(TypeRef::string()).arg(inner.clone());
    class_decl("Numbers")
        .with_field(field_decl(ty("int"), "base").init(int(10)))
        .with_method(
            method(iterator.clone(), "upTo")
                .with_arg(arg(ty("int"), "n").final_())
                .stmt(
                    for_(block().stmt(yield_(add(name("base"), name("i")))))
                        .init(local(ty("int"), "i").init(int(0)))
                        .cond(lt(name("i"), name("n")))
                        .update(post_inc(name("i"))),
                ),
        )
        .with_method(
            method(iterator.clone(), "evens")
                .static_()
                .with_arg(arg(ty("int"), "limit").final_())
                .stmt(local(ty("int"), "k").init(int(0)))
                .stmt(while_(
                    lt(name("k"), name("limit")),
                    block()
                        .stmt(if_(eq(binary(BinaryOp::Rem, name("k"), int(2)), int(0))).then(yield_(name("k"))))
                        .stmt(post_inc(name("k"))),
                )),
        )
        .with_method(
            method(iterator, "failing")
                .static_()
                .stmt(yield_(int(1)))
                .stmt(throw_(new_(ty("IllegalStateException")).arg(string("bad")))),
        )
        .with_method(
            method(nested.clone(), "sample")
                .static_()
                .stmt(local(nested.clone(), "outer").init(new_(ty("java.util.LinkedHashMap"))))
                .stmt(local(inner.clone(), "first").init(new_(ty("java.util.LinkedHashMap"))))
                .stmt(call("put").on(name("first")).arg(string("a")).arg(int(1)))
                .stmt(call("put").on(name("first")).arg(string("b")).arg(int(2)))
                .stmt(local(inner.clone(), "second").init(new_(ty("java.util.LinkedHashMap"))))
                .stmt(call("put").on(name("second")).arg(string("c")).arg(int(3)))
                .stmt(call("put").on(name("outer")).arg(string("x")).arg(name("first")))
                .stmt(call("put").on(name("outer")).arg(string("y")).arg(name("second")))
                .stmt(return_(name("outer"))),
        )
        .with_method(
            method(ty("java.util.Iterator").arg(ty("Integer")), "flatten")
                .static_()
                .with_arg(arg(nested, "map").final_())
                .stmt(foreach(
                    local(inner.clone(), "values"),
                    call("values").on(name("map")),
                    foreach(local(ty("Integer"), "v"), call("values").on(name("values")), yield_(name("v"))),
                )),
        )
        .with_method(
            method(ty("java.lang.Iterable").arg(TypeRef::string()), "names")
                .static_()
                .stmt(yield_(string("a")))
                .stmt(yield_(string("b"))),
        )
}

#[test]
fn test_yield_in_loop_reads_fields_and_params() {
    let mut interp = load(vec![numbers()]);
    let numbers = interp.instantiate("Numbers", vec![]).unwrap();
    let it = interp.call_method(&numbers, "upTo", vec![Value::Int(3)]).unwrap();
    assert_eq!(ints(interp.drain(&it, 10).unwrap()), vec![10, 11, 12]);
}

#[test]
fn test_conditional_yield() {
    let mut interp = load(vec![numbers()]);
    let it = interp.call_static("Numbers", "evens", vec![Value::Int(7)]).unwrap();
    assert_eq!(ints(interp.drain(&it, 10).unwrap()), vec![0, 2, 4, 6]);
}

#[test]
fn test_has_next_is_idempotent() {
    let mut interp = load(vec![numbers()]);
    let it = interp.call_static("Numbers", "evens", vec![Value::Int(3)]).unwrap();
    for _ in 0..3 {
        assert_eq!(interp.call_method(&it, "hasNext", vec![]).unwrap().as_bool(), Some(true));
    }
    assert_eq!(interp.call_method(&it, "next", vec![]).unwrap().as_int(), Some(0));
    assert_eq!(interp.call_method(&it, "next", vec![]).unwrap().as_int(), Some(2));
    assert_eq!(interp.call_method(&it, "hasNext", vec![]).unwrap().as_bool(), Some(false));
    assert_eq!(interp.call_method(&it, "hasNext", vec![]).unwrap().as_bool(), Some(false));

    let err = interp.call_method(&it, "next", vec![]).unwrap_err();
    assert!(matches!(err, EvalError::Uncaught { ref class, .. } if class == "NoSuchElementException"), "{err}");
}

#[test]
fn test_remove_is_unsupported() {
    let mut interp = load(vec![numbers()]);
    let it = interp.call_static("Numbers", "evens", vec![Value::Int(3)]).unwrap();
    let err = interp.call_method(&it, "remove", vec![]).unwrap_err();
    assert!(matches!(err, EvalError::Uncaught { ref class, .. } if class == "UnsupportedOperationException"), "{err}");
}

#[test]
fn test_generator_failure_is_wrapped() {
    let mut interp = load(vec![numbers()]);
    let it = interp.call_static("Numbers", "failing", vec![]).unwrap();
    assert_eq!(interp.call_method(&it, "next", vec![]).unwrap().as_int(), Some(1));
    let err = interp.call_method(&it, "hasNext", vec![]).unwrap_err();
    assert_eq!(
        err,
        EvalError::Uncaught {
            class: "ConcurrentModificationException".to_string(),
            message: Some("IllegalStateException: bad".to_string()),
        }
    );
}

#[test]
fn test_iterable_hands_out_fresh_iterators() {
    let mut interp = load(vec![numbers()]);
    let names = interp.call_static("Numbers", "names", vec![]).unwrap();
    let collect = |interp: &mut Interpreter| -> Vec<String> {
        let it = interp.call_method(&names, "iterator", vec![]).unwrap();
        interp
            .drain(&it, 10)
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    };
    assert_eq!(collect(&mut interp), vec!["a", "b"]);
    assert_eq!(collect(&mut interp), vec!["a", "b"]);
}

#[test]
fn test_nested_loops_flatten_in_order() {
    let mut interp = load(vec![numbers()]);
    let map = interp.call_static("Numbers", "sample", vec![]).unwrap();
    let it = interp.call_static("Numbers", "flatten", vec![map]).unwrap();
    assert_eq!(ints(interp.drain(&it, 10).unwrap()), vec![1, 2, 3]);
}

fn flow() -> ClassDecl {
    let iterator = || ty("java.util.Iterator").arg(ty("Integer"));
    let illegal_state = || ty("IllegalStateException");
    class_decl("Flow")
        .with_field(field_decl(ty("int"), "closed").static_().init(int(0)))
        .with_method(
            method(iterator(), "guarded")
                .static_()
                .stmt(local(ty("int"), "total").init(int(0)))
                .stmt(
                    try_(block().stmt(yield_(int(1))).stmt(yield_(int(2))))
                        .finally_(block().stmt(assign(name("total"), int(10)))),
                )
                .stmt(yield_(add(name("total"), int(3)))),
        )
        .with_method(
            method(iterator(), "recovered")
                .static_()
                .stmt(local(ty("int"), "code").init(int(0)))
                .stmt(
                    try_(
                        block()
                            .stmt(yield_(int(1)))
                            .stmt(throw_(new_(illegal_state()).arg(string("x")))),
                    )
                    .catch_(arg(illegal_state(), "e"), block().stmt(assign(name("code"), int(2)))),
                )
                .stmt(yield_(name("code")))
                .stmt(yield_(int(3))),
        )
        .with_method(
            method(iterator(), "grid")
                .static_()
                .stmt(labeled(
                    "outer",
                    for_(
                        block().stmt(
                            for_(
                                block()
                                    .stmt(if_(eq(name("j"), int(2))).then(continue_to("outer")))
                                    .stmt(if_(eq(name("i"), int(2))).then(break_to("outer")))
                                    .stmt(yield_(add(binary(BinaryOp::Mul, name("i"), int(10)), name("j")))),
                            )
                            .init(local(ty("int"), "j").init(int(0)))
                            .cond(lt(name("j"), int(3)))
                            .update(post_inc(name("j"))),
                        ),
                    )
                    .init(local(ty("int"), "i").init(int(0)))
                    .cond(lt(name("i"), int(3)))
                    .update(post_inc(name("i"))),
                ))
                .stmt(yield_(int(99))),
        )
        .with_method(
            method(iterator(), "cases")
                .static_()
                .stmt(
                    for_(
                        block().stmt(
                            switch_(name("i"))
                                .case(case(int(0)).stmt(yield_(int(0))))
                                .case(case(int(1)).stmt(yield_(int(1))).stmt(break_()))
                                .case(default_case().stmt(yield_(int(9)))),
                        ),
                    )
                    .init(local(ty("int"), "i").init(int(0)))
                    .cond(lt(name("i"), int(3)))
                    .update(post_inc(name("i"))),
                ),
        )
        .with_method(
            method(iterator(), "stopping")
                .static_()
                .with_arg(arg(ty("boolean"), "stop").final_())
                .stmt(
                    try_(
                        block()
                            .stmt(yield_(int(1)))
                            .stmt(if_(name("stop")).then(return_void()))
                            .stmt(yield_(int(2))),
                    )
                    .finally_(block().stmt(assign(field_ref(name("Flow"), "closed"), int(1)))),
                ),
        )
}

fn drained(method: &str, args: Vec<Value>) -> (Vec<i32>, Interpreter) {
    let mut interp = load(vec![flow()]);
    let it = interp.call_static("Flow", method, args).unwrap();
    let values = ints(interp.drain(&it, 20).unwrap());
    (values, interp)
}

#[test]
fn test_finally_runs_before_code_after_try() {
    let (values, _) = drained("guarded", vec![]);
    assert_eq!(values, vec![1, 2, 13]);
}

#[test]
fn test_caught_exception_resumes_after_try() {
    let (values, _) = drained("recovered", vec![]);
    assert_eq!(values, vec![1, 2, 3]);
}

#[test]
fn test_labeled_jumps_across_nested_loops() {
    let (values, _) = drained("grid", vec![]);
    assert_eq!(values, vec![0, 1, 10, 11, 99]);
}

#[test]
fn test_switch_falls_through_until_break() {
    let (values, _) = drained("cases", vec![]);
    assert_eq!(values, vec![0, 1, 1, 9]);
}

#[test]
fn test_return_inside_try_runs_finally() {
    let (values, mut interp) = drained("stopping", vec![Value::Bool(true)]);
    assert_eq!(values, vec![1]);
    assert_eq!(interp.static_field("Flow", "closed").unwrap().as_int(), Some(1));

    let (values, mut interp) = drained("stopping", vec![Value::Bool(false)]);
    assert_eq!(values, vec![1, 2]);
    assert_eq!(interp.static_field("Flow", "closed").unwrap().as_int(), Some(1));
}
