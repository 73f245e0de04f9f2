//! Translator integration tests.
//!
//! Builds parse trees with the node builder, translates them as whole
//! programs and checks the shape of the resulting operation trees.

use bumpalo::Bump;
use garnet_ast::NodeRef;
use garnet_core::intern::StringInterner;
use garnet_diagnostics::{ErrorKind, TranslateError};
use garnet_nodebuilder::NodeBuilder;
use garnet_options::TranslatorOptions;
use garnet_optree::{
    BreakId, CoreModule, DefinitionKind, ExecutableUnit, Literal, OpKind, OpNode, ProcKind, ReturnId,
    SplatNilBehavior,
};
use garnet_printer::Printer;
use garnet_translator::{translate_program, UnitContext};

fn try_translate(
    root: NodeRef<'_>,
    options: TranslatorOptions,
) -> (Result<ExecutableUnit, TranslateError>, StringInterner) {
    let interner = StringInterner::new();
    let mut cx = UnitContext::new("test.rb", "", interner.clone(), options);
    let result = translate_program(Some(root), &mut cx);
    (result, interner)
}

/// Helper: translate with default options, panicking on errors.
fn translate(root: NodeRef<'_>) -> (ExecutableUnit, StringInterner) {
    let (result, interner) = try_translate(root, TranslatorOptions::default());
    match result {
        Ok(unit) => (unit, interner),
        Err(err) => panic!("translation failed: {}", err.message()),
    }
}

fn translate_error(root: NodeRef<'_>) -> TranslateError {
    match try_translate(root, TranslatorOptions::default()).0 {
        Ok(_) => panic!("expected a translation error"),
        Err(err) => err,
    }
}

fn dump(root: NodeRef<'_>) -> String {
    let (unit, interner) = translate(root);
    Printer::new(&interner).print_unit(&unit)
}

/// Names of the locals written, in evaluation (pre-)order.
fn local_writes(unit: &ExecutableUnit, interner: &StringInterner) -> Vec<String> {
    unit.body
        .find_all(|node| matches!(node.kind, OpKind::WriteLocal { .. }))
        .into_iter()
        .filter_map(|node| match &node.kind {
            OpKind::WriteLocal { slot, .. } => Some(interner.resolve(slot.name).to_string()),
            _ => None,
        })
        .collect()
}

fn call_count(unit: &ExecutableUnit, interner: &StringInterner, name: &str) -> usize {
    unit.body.count(|node| match &node.kind {
        OpKind::Call(call) => interner.resolve(call.name) == name,
        _ => false,
    })
}

fn local_names(unit: &ExecutableUnit, interner: &StringInterner) -> Vec<String> {
    unit.locals.iter().map(|name| interner.resolve(*name).to_string()).collect()
}

fn block_definitions(unit: &ExecutableUnit) -> Vec<&OpNode> {
    unit.body.find_all(|node| matches!(node.kind, OpKind::BlockDefinition(_)))
}

// ============================================================================
// Multiple Assignment
// ============================================================================

#[test]
fn test_parallel_assignment_goes_through_temporaries() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    let values = b.array(&[b.lvar("b"), b.lvar("a")]);
    let root = b.masgn(&[b.lasgn_target("a"), b.lasgn_target("b")], None, &[], Some(values));

    let (unit, interner) = translate(root);
    assert_eq!(
        local_writes(&unit, &interner),
        vec!["%multi_0", "%multi_1", "a", "b"],
    );

    // `a` is assigned from the first temporary, not from `b` directly.
    let write_a = unit
        .body
        .find_all(|node| matches!(&node.kind, OpKind::WriteLocal { slot, .. } if interner.resolve(slot.name) == "a"));
    assert_eq!(write_a.len(), 1);
    match &write_a[0].kind {
        OpKind::WriteLocal { value, .. } => match &value.kind {
            OpKind::ReadLocal(slot) => assert_eq!(interner.resolve(slot.name), "%multi_0"),
            other => panic!("expected a temporary read, got {:?}", other),
        },
        _ => unreachable!(),
    }
}

#[test]
fn test_multiple_assignment_is_an_assignment_for_defined() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    let root = b.masgn(
        &[b.lasgn_target("x"), b.lasgn_target("y")],
        None,
        &[],
        Some(b.array(&[b.fixnum(1), b.fixnum(2)])),
    );
    let (unit, _) = translate(root);
    let wrappers = unit.body.count(|node| {
        matches!(
            node.kind,
            OpKind::DefinedWrapper {
                definition: DefinitionKind::Assignment,
                ..
            }
        )
    });
    assert_eq!(wrappers, 1);
}

#[test]
fn test_splat_assignment_indexes_coerced_array() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    // a, *r, z = v
    let root = b.masgn(
        &[b.lasgn_target("a")],
        Some(b.lasgn_target("r")),
        &[b.lasgn_target("z")],
        Some(b.vcall("v")),
    );
    let (unit, interner) = translate(root);

    assert_eq!(call_count(&unit, &interner, "v"), 1);
    assert_eq!(
        local_writes(&unit, &interner),
        vec!["%rhs_0", "%array_1", "a", "r", "z"],
    );
    let slices = unit.body.find_all(|node| matches!(node.kind, OpKind::ArraySlice { .. }));
    assert_eq!(slices.len(), 1);
    assert!(matches!(slices[0].kind, OpKind::ArraySlice { from: 1, to: -1, .. }));

    // `z` reads from the end only when the array holds both fixed targets.
    let checks = unit.body.find_all(|node| matches!(node.kind, OpKind::ArrayIsAtLeastAsLargeAs { .. }));
    assert_eq!(checks.len(), 1);
    assert!(matches!(checks[0].kind, OpKind::ArrayIsAtLeastAsLargeAs { size: 2, .. }));
    let indices: Vec<i32> = unit
        .body
        .find_all(|node| matches!(node.kind, OpKind::ArrayIndex { .. }))
        .into_iter()
        .filter_map(|node| match node.kind {
            OpKind::ArrayIndex { index, .. } => Some(index),
            _ => None,
        })
        .collect();
    assert_eq!(indices, vec![0, -1, 1]);
}

#[test]
fn test_rest_only_assignment_splats_value() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    // *r = v
    let root = b.masgn(&[], Some(b.lasgn_target("r")), &[], Some(b.vcall("v")));
    let (unit, interner) = translate(root);

    assert_eq!(local_writes(&unit, &interner), vec!["%rhs_0", "%splat_1", "r"]);
    let casts = unit.body.find_all(|node| matches!(node.kind, OpKind::SplatCast { .. }));
    assert_eq!(casts.len(), 1);
    assert!(matches!(
        casts[0].kind,
        OpKind::SplatCast {
            nil_behavior: SplatNilBehavior::ArrayWithNil,
            use_to_ary: true,
            ..
        }
    ));
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_translation_is_deterministic() {
    let build = |arena: &Bump| -> String {
        let b = NodeBuilder::new(arena);
        let block = b.iter(b.params(&["item"]), Some(b.call(b.lvar("item"), "to_s", &[])));
        let body = b.block(&[
            b.newline(b.lasgn("total", b.fixnum(0))),
            b.newline(b.call_with_block(b.vcall("items"), "each", &[], block)),
            b.newline(b.lvar("total")),
        ]);
        dump(b.defn("summarize", b.params(&["items"]), Some(body)))
    };
    let first = build(&Bump::new());
    let second = build(&Bump::new());
    assert_eq!(first, second);
    assert!(first.contains("unit \"summarize\" method"));
    assert!(first.contains("unit \"block in summarize\" proc"));
}

// ============================================================================
// Blocks, Lambdas and Non-local Exits
// ============================================================================

#[test]
fn test_break_targets_innermost_block() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    let inner = b.iter(b.no_args(), Some(b.break_(None)));
    let middle = b.iter(b.no_args(), Some(b.fcall_with_block("c", &[], inner)));
    let outer = b.iter(b.no_args(), Some(b.fcall_with_block("b", &[], middle)));
    let root = b.fcall_with_block("a", &[], outer);

    let (unit, _) = translate(root);
    let blocks: Vec<(BreakId, u32)> = block_definitions(&unit)
        .into_iter()
        .filter_map(|node| match &node.kind {
            OpKind::BlockDefinition(block) => Some((block.break_id, block.unit.block_depth)),
            _ => None,
        })
        .collect();
    assert_eq!(blocks.len(), 3);
    assert_ne!(blocks[0].0, blocks[1].0);
    assert_ne!(blocks[1].0, blocks[2].0);
    assert_ne!(blocks[0].0, blocks[2].0);

    let innermost = blocks
        .iter()
        .find(|(_, depth)| *depth == 3)
        .map(|(id, _)| *id)
        .expect("a block at depth 3");
    let breaks = unit.body.find_all(|node| matches!(node.kind, OpKind::Break { .. }));
    assert_eq!(breaks.len(), 1);
    match &breaks[0].kind {
        OpKind::Break {
            break_id,
            ignore_marker,
            ..
        } => {
            assert_eq!(*break_id, innermost);
            assert!(!ignore_marker);
        }
        _ => unreachable!(),
    }
}

#[test]
fn test_block_call_catches_its_break() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    let block = b.iter(b.no_args(), Some(b.break_(Some(b.fixnum(1)))));
    let (unit, _) = translate(b.fcall_with_block("loop", &[], block));

    let definition_id = match &block_definitions(&unit)[0].kind {
        OpKind::BlockDefinition(block) => block.break_id,
        _ => unreachable!(),
    };
    let catches = unit.body.find_all(|node| {
        matches!(
            node.kind,
            OpKind::CatchBreak {
                is_while: false,
                ..
            }
        )
    });
    assert_eq!(catches.len(), 1);
    match &catches[0].kind {
        OpKind::CatchBreak { break_id, body, .. } => {
            assert_eq!(*break_id, definition_id);
            assert!(matches!(body.kind, OpKind::FrameOnStack { .. }));
        }
        _ => unreachable!(),
    }
}

#[test]
fn test_return_from_proc_and_lambda() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    let proc_block = b.iter(b.no_args(), Some(b.return_(Some(b.fixnum(1)))));
    let lambda = b.lambda(b.no_args(), Some(b.return_(Some(b.fixnum(2)))));
    let body = b.block(&[b.fcall_with_block("each_thing", &[], proc_block), lambda]);
    let (unit, _) = translate(b.defn("m", b.no_args(), Some(body)));

    let method_id = unit
        .body
        .find_all(|node| matches!(node.kind, OpKind::MethodDefinition { .. }))
        .into_iter()
        .find_map(|node| match &node.kind {
            OpKind::MethodDefinition { unit, .. } => unit.return_id,
            _ => None,
        })
        .expect("a method with a return id");

    let returns: Vec<(ReturnId, bool)> = unit
        .body
        .find_all(|node| matches!(node.kind, OpKind::Return { .. }))
        .into_iter()
        .filter_map(|node| match &node.kind {
            OpKind::Return { return_id, local, .. } => Some((*return_id, *local)),
            _ => None,
        })
        .collect();
    assert_eq!(returns.len(), 2);

    // The proc's return leaves the method through its block frame.
    assert_eq!(returns[0], (method_id, false));
    // The lambda's return is caught by the lambda itself.
    assert_ne!(returns[1].0, method_id);
    assert!(returns[1].1);
    let lambda_unit = block_definitions(&unit)
        .into_iter()
        .find_map(|node| match &node.kind {
            OpKind::BlockDefinition(block) if block.kind == ProcKind::Lambda => Some(&block.unit),
            _ => None,
        })
        .expect("the lambda's definition");
    assert_eq!(lambda_unit.return_id, Some(returns[1].0));
}

#[test]
fn test_top_level_exits_are_syntax_errors() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    let expected = [
        (b.next(None), 1002),
        (b.redo(), 1003),
        (b.retry(), 1004),
        (b.break_(None), 1001),
    ];
    for (node, code) in expected {
        let err = translate_error(node);
        assert_eq!(err.kind(), ErrorKind::ControlFlowSyntax);
        assert_eq!(err.code(), code, "unexpected code for {}", err.message());
    }
}

#[test]
fn test_retry_inside_rescue_clause() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    let root = b.rescue(Some(b.fcall("risky", &[])), &[(None, Some(b.retry()))], None);
    let (unit, _) = translate(root);
    assert_eq!(unit.body.count(|node| matches!(node.kind, OpKind::Retry)), 1);
}

#[test]
fn test_break_inside_while_ignores_marker() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    let root = b.while_(b.true_(), Some(b.break_(None)));
    let (unit, _) = translate(root);
    let breaks = unit.body.find_all(|node| matches!(node.kind, OpKind::Break { .. }));
    assert!(matches!(
        breaks[0].kind,
        OpKind::Break {
            ignore_marker: true,
            ..
        }
    ));
    assert_eq!(
        unit.body.count(|node| matches!(node.kind, OpKind::CatchBreak { is_while: true, .. })),
        1
    );
}

// ============================================================================
// for Loops
// ============================================================================

#[test]
fn test_for_loop_binds_in_enclosing_scope() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    let body = b.lasgn("y", b.lvar("x"));
    let root = b.for_(b.lasgn_target("x"), b.vcall("arr"), Some(body));

    let (unit, interner) = translate(root);
    let locals = local_names(&unit, &interner);
    assert!(locals.contains(&"x".to_string()), "locals: {:?}", locals);
    assert!(locals.contains(&"y".to_string()), "locals: {:?}", locals);

    let blocks = block_definitions(&unit);
    assert_eq!(blocks.len(), 1);
    match &blocks[0].kind {
        OpKind::BlockDefinition(block) => {
            assert!(!block.unit.own_scope);
            assert_eq!(block.unit.arity.required, 1);
            let block_locals = local_names(&block.unit, &interner);
            assert!(!block_locals.contains(&"x".to_string()));
            assert!(!block_locals.contains(&"y".to_string()));
        }
        _ => unreachable!(),
    }
    assert_eq!(call_count(&unit, &interner, "each"), 1);
}

// ============================================================================
// Operator Assignment
// ============================================================================

#[test]
fn test_attribute_op_assign_evaluates_receiver_once() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    let root = b.op_asgn(b.vcall("foo"), "bar", "+", b.fixnum(1));
    let (unit, interner) = translate(root);

    assert_eq!(call_count(&unit, &interner, "foo"), 1);
    assert_eq!(call_count(&unit, &interner, "bar"), 1);
    assert_eq!(call_count(&unit, &interner, "bar="), 1);
    assert_eq!(call_count(&unit, &interner, "+"), 1);
    assert_eq!(local_writes(&unit, &interner), vec!["%opassign_0"]);
}

#[test]
fn test_local_or_assign_shape() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    let (unit, interner) = translate(b.local_or_asgn("x", b.fixnum(5)));

    let wrappers = unit.body.find_all(|node| {
        matches!(
            node.kind,
            OpKind::DefinedWrapper {
                definition: DefinitionKind::Assignment,
                ..
            }
        )
    });
    assert_eq!(wrappers.len(), 1);
    let OpKind::DefinedWrapper { child, .. } = &wrappers[0].kind else {
        unreachable!()
    };
    match &child.kind {
        OpKind::Or { left, right } => {
            assert!(matches!(&left.kind, OpKind::ReadLocal(slot) if interner.resolve(slot.name) == "x"));
            assert!(matches!(&right.kind, OpKind::WriteLocal { slot, .. } if interner.resolve(slot.name) == "x"));
        }
        other => panic!("expected an or, got {:?}", other),
    }
}

#[test]
fn test_element_op_assign_evaluates_index_once() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    let root = b.op_element_asgn(b.vcall("list"), &[b.vcall("key")], "+", b.fixnum(1));
    let (unit, interner) = translate(root);

    assert_eq!(call_count(&unit, &interner, "key"), 1);
    assert_eq!(call_count(&unit, &interner, "[]"), 1);
    assert_eq!(call_count(&unit, &interner, "[]="), 1);
    assert_eq!(
        local_writes(&unit, &interner),
        vec!["%opelementassign_0", "%index_1"],
    );
}

// ============================================================================
// rescue
// ============================================================================

fn rescue_can_omit(options: TranslatorOptions, use_error: bool) -> bool {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    let clause_body = if use_error { Some(b.gvar("$!")) } else { None };
    let root = b.rescue(Some(b.fcall("risky", &[])), &[(None, clause_body)], None);
    let (result, _) = try_translate(root, options);
    let unit = match result {
        Ok(unit) => unit,
        Err(err) => panic!("translation failed: {}", err.message()),
    };
    let tries = unit.body.find_all(|node| matches!(node.kind, OpKind::Try { .. }));
    match &tries[0].kind {
        OpKind::Try {
            can_omit_backtrace, ..
        } => *can_omit_backtrace,
        _ => unreachable!(),
    }
}

#[test]
fn test_bare_rescue_omits_backtrace() {
    assert!(rescue_can_omit(TranslatorOptions::default(), false));
}

#[test]
fn test_rescue_reading_error_keeps_backtrace() {
    assert!(!rescue_can_omit(TranslatorOptions::default(), true));
}

#[test]
fn test_backtrace_omission_disabled() {
    let options = TranslatorOptions {
        backtraces_omit_unused: false,
        ..TranslatorOptions::default()
    };
    assert!(!rescue_can_omit(options, false));
}

#[test]
fn test_multiple_rescue_clauses_keep_backtrace() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    let root = b.rescue(
        Some(b.fcall("risky", &[])),
        &[
            (Some(b.array(&[b.const_("IOError")])), None),
            (None, None),
        ],
        None,
    );
    let (unit, _) = translate(root);
    let tries = unit.body.find_all(|node| matches!(node.kind, OpKind::Try { .. }));
    match &tries[0].kind {
        OpKind::Try {
            rescues,
            can_omit_backtrace,
            ..
        } => {
            assert_eq!(rescues.len(), 2);
            assert!(!can_omit_backtrace);
        }
        _ => unreachable!(),
    }
}

// ============================================================================
// case
// ============================================================================

#[test]
fn test_case_with_subject_tests_each_pattern() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    let root = b.case(
        Some(b.vcall("x")),
        vec![
            b.when(b.fixnum(1), Some(b.sym("one"))),
            b.when(b.fixnum(2), Some(b.sym("two"))),
        ],
        Some(b.sym("other")),
    );
    let (unit, interner) = translate(root);
    assert_eq!(call_count(&unit, &interner, "==="), 2);
    assert_eq!(call_count(&unit, &interner, "x"), 1);
    assert_eq!(local_writes(&unit, &interner), vec!["%case_0"]);
    assert_eq!(unit.body.count(|node| matches!(node.kind, OpKind::IfElse { .. })), 2);
}

#[test]
fn test_case_without_subject_uses_conditions() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    let root = b.case(None, vec![b.when(b.vcall("ready"), Some(b.sym("go")))], None);
    let (unit, interner) = translate(root);
    assert_eq!(call_count(&unit, &interner, "==="), 0);
    assert_eq!(call_count(&unit, &interner, "ready"), 1);
}

#[test]
fn test_case_without_subject_accepts_splat_when() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    // case; when *list then 1; end
    let root = b.case(None, vec![b.when_splat(b.vcall("list"), Some(b.fixnum(1)))], None);
    let (unit, interner) = translate(root);

    assert_eq!(call_count(&unit, &interner, "list"), 1);
    let tests = unit.body.find_all(|node| match &node.kind {
        OpKind::Call(call) => interner.resolve(call.name) == "any_truthy?",
        _ => false,
    });
    assert_eq!(tests.len(), 1);
    let OpKind::Call(call) = &tests[0].kind else { unreachable!() };
    assert!(matches!(
        call.receiver.kind,
        OpKind::Object(Literal::CoreModule(CoreModule::Internal))
    ));
    assert_eq!(call.args.len(), 1);
    assert_eq!(local_writes(&unit, &interner), Vec::<String>::new());
}

// ============================================================================
// Definitions
// ============================================================================

#[test]
fn test_class_body_unit_names() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    let block = b.iter(b.no_args(), Some(b.nil()));
    let body = b.fcall_with_block("configure", &[], block);
    let output = dump(b.class("Widget", None, Some(body)));

    assert!(output.contains("(define-class Widget"), "{}", output);
    assert!(output.contains("unit \"<class:Widget>\" module-body"), "{}", output);
    assert!(output.contains("unit \"block in <class:Widget>\" proc"), "{}", output);
}

#[test]
fn test_nested_block_names() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    let inner = b.iter(b.no_args(), Some(b.nil()));
    let outer = b.iter(b.no_args(), Some(b.fcall_with_block("b", &[], inner)));
    let body = b.fcall_with_block("a", &[], outer);
    let output = dump(b.defn("run", b.no_args(), Some(body)));

    assert!(output.contains("unit \"block in run\" proc"), "{}", output);
    assert!(output.contains("unit \"block (2 levels) in run\" proc"), "{}", output);
}

#[test]
fn test_method_arity_in_header() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    let output = dump(b.defn("pair", b.params(&["left", "right"]), Some(b.lvar("left"))));
    assert!(output.contains("unit \"pair\" method arity=2 locals=[%method_block_arg left right]"), "{}", output);
}

// ============================================================================
// Heredocs
// ============================================================================

#[test]
fn test_heredoc_interpolation_translates_to_interpolated_string() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    let root = b
        .heredoc("<<EOS", "Hello #{name}!\nEOS\n", 0)
        .expect("heredoc scans");
    let (unit, interner) = translate(root);

    let strings = unit.body.find_all(|node| matches!(node.kind, OpKind::InterpolatedString(_)));
    assert_eq!(strings.len(), 1);
    match &strings[0].kind {
        OpKind::InterpolatedString(parts) => assert_eq!(parts.len(), 3),
        _ => unreachable!(),
    }
    assert_eq!(call_count(&unit, &interner, "name"), 1);
}

#[test]
fn test_singleton_class_in_method_uses_dynamic_constant_lookup() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    // def m; class << obj; X; end; end; Y
    let sclass = b.sclass(b.vcall("obj"), Some(b.const_("X")));
    let root = b.block(&[b.defn("m", b.no_args(), Some(sclass)), b.const_("Y")]);
    let (unit, interner) = translate(root);

    let dynamic: Vec<&str> = unit
        .body
        .find_all(|node| matches!(node.kind, OpKind::ReadConstantWithDynamicScope(_)))
        .into_iter()
        .filter_map(|node| match node.kind {
            OpKind::ReadConstantWithDynamicScope(name) => Some(interner.resolve(name)),
            _ => None,
        })
        .collect();
    assert_eq!(dynamic, vec!["X"]);

    // Lookup is lexical again once the singleton body is left.
    let lexical: Vec<&str> = unit
        .body
        .find_all(|node| matches!(node.kind, OpKind::ReadConstantWithLexicalScope { .. }))
        .into_iter()
        .filter_map(|node| match node.kind {
            OpKind::ReadConstantWithLexicalScope { name, .. } => Some(interner.resolve(name)),
            _ => None,
        })
        .collect();
    assert_eq!(lexical, vec!["Y"]);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_block_in_expression_position_is_unsupported() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);
    let err = translate_error(b.iter(b.no_args(), Some(b.nil())));
    assert_eq!(err.kind(), ErrorKind::UnsupportedShape);
    assert_eq!(err.code(), 2001);
    assert_eq!(err.message(), "Unsupported node in expression position: Iter");
}

#[test]
fn test_internal_forms_misused() {
    let arena = Bump::new();
    let b = NodeBuilder::new(&arena);

    let err = translate_error(b.call(b.const_("Garnet"), "privately", &[]));
    assert_eq!(err.kind(), ErrorKind::InternalFormMisuse);
    assert_eq!(err.code(), 1011);

    // test.rb is not under a core path.
    let err = translate_error(b.call(b.const_("GarnetPrimitive"), "object_id", &[]));
    assert_eq!(err.kind(), ErrorKind::InternalFormMisuse);
    assert_eq!(err.code(), 1010);
}
