//! Compiler integration tests.
//!
//! Runs whole units through the compiler: coverage reporting, batch
//! ordering and error collection.

use bumpalo::Bump;
use garnet_compiler::{Compiler, CoverageSink, SourceUnit};
use garnet_nodebuilder::NodeBuilder;
use garnet_options::TranslatorOptions;
use garnet_optree::{OpFlags, OpKind};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingSink {
    calls: Mutex<Vec<(String, Vec<u32>)>>,
}

impl CoverageSink for RecordingSink {
    fn lines_registered(&self, file_name: &str, lines: &[u32]) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((file_name.to_string(), lines.to_vec()));
        }
    }
}

fn coverage_options() -> TranslatorOptions {
    TranslatorOptions {
        coverage: true,
        ..TranslatorOptions::default()
    }
}

// ============================================================================
// Coverage
// ============================================================================

const THREE_LINES: &str = "a = 1\nb = 2\nc = 3\n";

#[test]
fn test_coverage_lines_reported_to_sink() {
    let arena = Bump::new();
    let b = NodeBuilder::with_offset(&arena, 100);
    let root = b.block(&[
        b.newline_at(0, b.lasgn("a", b.fixnum(1))),
        b.newline_at(6, b.lasgn("b", b.fixnum(2))),
        b.newline_at(12, b.lasgn("c", b.fixnum(3))),
    ]);

    let sink = Arc::new(RecordingSink::default());
    let compiler = Compiler::new(coverage_options()).with_coverage_sink(sink.clone());
    let compiled = compiler
        .translate_unit(&SourceUnit::new("lines.rb", THREE_LINES, Some(root)))
        .expect("unit translates");

    assert_eq!(compiled.coverage_lines, vec![1, 2, 3]);
    let calls = sink.calls.lock().expect("sink lock");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], ("lines.rb".to_string(), vec![1, 2, 3]));
}

#[test]
fn test_coverage_lines_deduplicated_in_first_seen_order() {
    let arena = Bump::new();
    let b = NodeBuilder::with_offset(&arena, 100);
    let root = b.block(&[
        b.newline_at(12, b.vcall("third")),
        b.newline_at(0, b.vcall("first")),
        b.newline_at(14, b.vcall("again")),
    ]);
    let compiler = Compiler::new(coverage_options());
    let compiled = compiler
        .translate_unit(&SourceUnit::new("order.rb", THREE_LINES, Some(root)))
        .expect("unit translates");
    assert_eq!(compiled.coverage_lines, vec![3, 1]);
}

#[test]
fn test_coverage_registers_statement_if() {
    let arena = Bump::new();
    let b = NodeBuilder::with_offset(&arena, 100);
    // a = 1
    // if a then 2 end
    let root = b.block(&[
        b.newline_at(0, b.lasgn("a", b.fixnum(1))),
        b.newline_at(6, b.if_(b.lvar("a"), Some(b.fixnum(2)), None)),
    ]);
    let compiler = Compiler::new(coverage_options());
    let compiled = compiler
        .translate_unit(&SourceUnit::new("branch.rb", THREE_LINES, Some(root)))
        .expect("unit translates");

    assert_eq!(compiled.coverage_lines, vec![1, 2]);
    let ifs = compiled.root.body.find_all(|node| matches!(node.kind, OpKind::If { .. }));
    assert_eq!(ifs.len(), 1);
    match &ifs[0].kind {
        OpKind::If { condition, .. } => {
            assert!(condition.is_newline());
            assert!(condition.flags().contains(OpFlags::COVERAGE_LINE));
        }
        _ => unreachable!(),
    }
}

#[test]
fn test_coverage_disabled_skips_sink() {
    let arena = Bump::new();
    let b = NodeBuilder::with_offset(&arena, 100);
    let root = b.newline_at(0, b.lasgn("a", b.fixnum(1)));

    let sink = Arc::new(RecordingSink::default());
    let compiler = Compiler::new(TranslatorOptions::default()).with_coverage_sink(sink.clone());
    let compiled = compiler
        .translate_unit(&SourceUnit::new("quiet.rb", THREE_LINES, Some(root)))
        .expect("unit translates");

    assert!(compiled.coverage_lines.is_empty());
    assert!(sink.calls.lock().expect("sink lock").is_empty());
    // The line start is still marked.
    assert!(compiled.root.body.count(|node| node.is_newline()) >= 1);
}

// ============================================================================
// Batches
// ============================================================================

#[test]
fn test_empty_unit() {
    let compiler = Compiler::new(TranslatorOptions::default());
    let compiled = compiler
        .translate_unit(&SourceUnit::new("empty.rb", "", None))
        .expect("empty unit translates");
    assert_eq!(compiled.root.name, "<main>");
    assert!(compiled.root.locals.is_empty());
    assert_eq!(compiled.root.body.count(|node| matches!(node.kind, OpKind::Nil)), 1);
}

#[test]
fn test_translate_all_preserves_order() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    let names: Vec<String> = (0..16).map(|i| format!("unit_{}.rb", i)).collect();
    let units: Vec<SourceUnit<'_>> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let local = format!("v{}", i);
            SourceUnit::new(name.clone(), "", Some(b.lasgn(&local, b.fixnum(i as i64))))
        })
        .collect();

    let compiler = Compiler::new(TranslatorOptions::default());
    let results = compiler.translate_all(&units);
    assert_eq!(results.len(), units.len());
    for (i, result) in results.iter().enumerate() {
        let compiled = result.as_ref().expect("unit translates");
        assert_eq!(compiled.file_name, names[i]);
        let locals: Vec<&str> = compiled
            .root
            .locals
            .iter()
            .map(|name| compiler.interner().resolve(*name))
            .collect();
        let expected = format!("v{}", i);
        assert_eq!(locals, vec![expected.as_str()]);
    }
}

#[test]
fn test_translate_all_reporting_collects_failures() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    let units = vec![
        SourceUnit::new("good.rb", "", Some(b.fcall("puts", &[b.str("hi")]))),
        SourceUnit::new("bad.rb", "", Some(b.break_(None))),
        SourceUnit::new("also_good.rb", "", Some(b.nil())),
    ];

    let compiler = Compiler::new(TranslatorOptions::default());
    let (compiled, diagnostics) = compiler.translate_all_reporting(&units);

    let files: Vec<&str> = compiled.iter().map(|unit| unit.file_name.as_str()).collect();
    assert_eq!(files, vec!["good.rb", "also_good.rb"]);
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics.has_errors());
    let diagnostic = &diagnostics.diagnostics()[0];
    assert_eq!(diagnostic.file.as_deref(), Some("bad.rb"));
    assert_eq!(diagnostic.code, 1001);
}

#[test]
fn test_shared_interner_names_compare_equal() {
    let compiler = Compiler::new(TranslatorOptions::default());
    let expected = compiler.interner().intern("shared");

    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    let compiled = compiler
        .translate_unit(&SourceUnit::new("shared.rb", "", Some(b.lasgn("shared", b.nil()))))
        .expect("unit translates");
    assert_eq!(compiled.root.locals, vec![expected]);
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_temporaries_are_unique(swaps in 1usize..12, cases in 0usize..6) {
        let arena = Bump::new();
        let b = NodeBuilder::new(&arena);
        let mut statements = Vec::new();
        for _ in 0..swaps {
            let values = b.array(&[b.lvar("y"), b.lvar("x")]);
            statements.push(b.masgn(&[b.lasgn_target("x"), b.lasgn_target("y")], None, &[], Some(values)));
        }
        for i in 0..cases {
            statements.push(b.case(Some(b.vcall("x")), vec![b.when(b.fixnum(i as i64), None)], None));
        }
        let root = b.block(&statements);

        let compiler = Compiler::new(TranslatorOptions::default());
        let compiled = compiler
            .translate_unit(&SourceUnit::new("prop.rb", "", Some(root)))
            .expect("unit translates");

        let temps: Vec<&str> = compiled
            .root
            .locals
            .iter()
            .map(|name| compiler.interner().resolve(*name))
            .filter(|name| name.starts_with('%'))
            .collect();
        let unique: HashSet<&str> = temps.iter().copied().collect();
        prop_assert_eq!(temps.len(), swaps * 2 + cases);
        prop_assert_eq!(unique.len(), temps.len());
    }
}
