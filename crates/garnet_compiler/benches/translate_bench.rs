//! Benchmark harness for garnet translation.
//!
//! Uses criterion for reliable benchmarking.
//! Run with: cargo bench -p garnet_compiler

use bumpalo::Bump;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use garnet_ast::NodeRef;
use garnet_compiler::{Compiler, SourceUnit};
use garnet_core::ParseArena;
use garnet_nodebuilder::NodeBuilder;
use garnet_options::TranslatorOptions;
use garnet_printer::Printer;

/// One method per iteration: parameters, a block with a `next`, a rescue,
/// a `case` and an operator assignment.
fn method<'a>(b: &NodeBuilder<'a>, index: usize) -> NodeRef<'a> {
    let block = b.iter(
        b.params(&["item"]),
        Some(b.block(&[
            b.newline(b.if_(b.call(b.lvar("item"), "nil?", &[]), Some(b.next(None)), None)),
            b.newline(b.op_asgn(b.self_ref(), "total", "+", b.lvar("item"))),
        ])),
    );
    let case = b.case(
        Some(b.lvar("mode")),
        vec![
            b.when(b.sym("fast"), Some(b.fixnum(1))),
            b.when(b.sym("slow"), Some(b.fixnum(2))),
        ],
        Some(b.fixnum(0)),
    );
    let body = b.block(&[
        b.newline(b.call_with_block(b.lvar("items"), "each", &[], block)),
        b.newline(b.rescue(Some(b.fcall("flush", &[])), &[(None, None)], None)),
        b.newline(b.local_or_asgn("cache", b.hash(&[]))),
        b.newline(case),
    ]);
    b.defn(&format!("method_{}", index), b.params(&["items", "mode"]), Some(body))
}

fn program<'a>(b: &NodeBuilder<'a>, methods: usize) -> NodeRef<'a> {
    let definitions: Vec<NodeRef<'a>> = (0..methods).map(|i| b.newline(method(b, i))).collect();
    b.class("Pipeline", None, Some(b.block(&definitions)))
}

// ============================================================================
// Single unit
// ============================================================================

fn bench_translate(c: &mut Criterion) {
    let mut group = c.benchmark_group("translate");
    for methods in [1usize, 10, 100] {
        let arena = Bump::new();
        let b = NodeBuilder::new(&arena);
        let root = program(&b, methods);
        let compiler = Compiler::new(TranslatorOptions::default());
        group.bench_with_input(BenchmarkId::from_parameter(methods), &root, |bench, root| {
            bench.iter(|| {
                let unit = SourceUnit::new("pipeline.rb", "", Some(*root));
                black_box(compiler.translate_unit(&unit))
            });
        });
    }
    group.finish();
}

fn bench_print(c: &mut Criterion) {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    let root = program(&b, 10);
    let compiler = Compiler::new(TranslatorOptions::default());
    let compiled = match compiler.translate_unit(&SourceUnit::new("pipeline.rb", "", Some(root))) {
        Ok(compiled) => compiled,
        Err(err) => panic!("benchmark program failed to translate: {}", err.message()),
    };
    c.bench_function("print/10", |bench| {
        bench.iter(|| black_box(Printer::new(compiler.interner()).print_unit(&compiled.root)));
    });
}

// ============================================================================
// Batches
// ============================================================================

fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch");
    group.sample_size(20);
    let arena = ParseArena::new();
    let b = NodeBuilder::in_arena(&arena);
    let names: Vec<String> = (0..32).map(|i| format!("unit_{}.rb", i)).collect();
    let units: Vec<SourceUnit<'_>> = names
        .iter()
        .map(|name| SourceUnit::new(name.clone(), "", Some(program(&b, 10))))
        .collect();
    let compiler = Compiler::new(TranslatorOptions::default());

    group.bench_function("parallel_32", |bench| {
        bench.iter(|| black_box(compiler.translate_all(&units)));
    });
    group.bench_function("sequential_32", |bench| {
        bench.iter(|| {
            for unit in &units {
                black_box(compiler.translate_unit(unit)).ok();
            }
        });
    });
    group.finish();
}

criterion_group!(benches, bench_translate, bench_print, bench_batch);
criterion_main!(benches);
