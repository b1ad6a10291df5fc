//! Benchmark harness for the transformation pipeline.
//!
//! Run with: cargo bench -p lpg_compiler

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lpg_ast::factory::*;
use lpg_ast::{ClassDecl, CompilationUnit, TypeRef};
use lpg_compiler::Program;
use lpg_options::TransformOptions;

/// A builder over `fields` fields, half of them required.
fn builder_class(name: &str, fields: usize) -> ClassDecl {
    (0..fields).fold(
        class_decl(name).public().with_annotation(annotation(ty("Builder"))),
        |class, i| {
            let field = field_decl(ty("int"), format!("f{i}")).private();
            class.with_field(if i % 2 == 0 { field.final_() } else { field.init(int(i as i32)) })
        },
    )
}

/// A yielder that walks a range with a nested loop.
fn yield_class(class: &str) -> ClassDecl {
    let inner = for_(
        block().stmt(call("yield").arg(add(name("i"), name("j")))),
    )
    .init(local(ty("int"), "j").init(int(0)))
    .cond(lt(name("j"), name("i")))
    .update(post_inc(name("j")));
    let outer = for_(block().stmt(inner))
        .init(local(ty("int"), "i").init(int(0)))
        .cond(lt(name("i"), name("n")))
        .update(post_inc(name("i")));
    class_decl(class).with_method(
        method(ty("Iterable").arg(ty("Integer")), "pairs")
            .public()
            .with_arg(arg(ty("int"), "n").final_())
            .stmt(outer),
    )
}

fn program_of(units: usize) -> Vec<CompilationUnit> {
    (0..units)
        .map(|i| {
            CompilationUnit::new(format!("Unit{i}.java"))
                .with_type(builder_class(&format!("Data{i}"), 8))
                .with_type(yield_class(&format!("Gen{i}")))
                .with_type(
                    class_decl(format!("Locked{i}")).with_method(
                        method(TypeRef::void(), "touch")
                            .with_annotation(annotation(ty("WriteLock")))
                            .stmt(return_void()),
                    ),
                )
        })
        .collect()
}

fn bench_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform");
    for units in [1usize, 16, 64] {
        let input = program_of(units);
        group.bench_with_input(BenchmarkId::new("units", units), &input, |b, input| {
            b.iter(|| {
                let mut program = Program::new(vec![], TransformOptions::default());
                for unit in input.iter().cloned() {
                    program.add_unit(unit);
                }
                black_box(program.transform())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_transform);
criterion_main!(benches);
