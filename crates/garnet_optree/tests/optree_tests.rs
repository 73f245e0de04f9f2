use garnet_core::intern::StringInterner;
use garnet_core::text::TextSpan;
use garnet_optree::*;

fn slot(interner: &StringInterner, name: &str, index: u32) -> LocalSlot {
    LocalSlot {
        name: interner.intern(name),
        index,
        depth: 0,
    }
}

// ============================================================================
// Spans
// ============================================================================

#[test]
fn test_span_assigned_once() {
    assert!(!OpNode::nil().has_span());
    let node = OpNode::nil().at(TextSpan::new(3, 4));
    assert!(node.has_span());
    assert_eq!(node.span(), Some(TextSpan::new(3, 4)));
}

#[test]
fn test_same_span_may_be_reassigned() {
    let node = OpNode::nil()
        .at(TextSpan::new(3, 4))
        .at(TextSpan::new(3, 4));
    assert_eq!(node.span(), Some(TextSpan::new(3, 4)));
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "source span assigned twice")]
fn test_different_span_panics_in_debug() {
    let _ = OpNode::nil()
        .at(TextSpan::new(3, 4))
        .at(TextSpan::new(9, 1));
}

#[test]
fn test_ensure_span_keeps_existing() {
    let node = OpNode::nil()
        .at(TextSpan::new(1, 1))
        .ensure_span(TextSpan::new(5, 5));
    assert_eq!(node.span(), Some(TextSpan::new(1, 1)));
    let fresh = OpNode::nil().ensure_span(TextSpan::new(5, 5));
    assert_eq!(fresh.span(), Some(TextSpan::new(5, 5)));
}

#[test]
fn test_encapsulating_span_unions_children() {
    let node = OpNode::new(OpKind::ArrayLiteral(vec![
        OpNode::new(OpKind::Integer(1)).at(TextSpan::new(1, 1)),
        OpNode::new(OpKind::Integer(2)).at(TextSpan::new(8, 2)),
    ]));
    assert_eq!(node.encapsulating_span(), Some(TextSpan::from_bounds(1, 10)));
}

// ============================================================================
// Sequences
// ============================================================================

#[test]
fn test_sequence_of_one_is_unwrapped() {
    let node = OpNode::sequence(vec![OpNode::new(OpKind::Integer(7))]);
    assert_eq!(node.kind, OpKind::Integer(7));
}

#[test]
fn test_empty_sequence_is_nil() {
    assert_eq!(OpNode::sequence(Vec::new()).kind, OpKind::Nil);
}

#[test]
fn test_sequence_flattens_and_drops_pure_statements() {
    let interner = StringInterner::new();
    let x = slot(&interner, "x", 0);
    let inner = OpNode::sequence(vec![
        OpNode::write_local(x, OpNode::new(OpKind::Integer(1))),
        OpNode::nil(),
    ]);
    let node = OpNode::sequence(vec![inner, OpNode::read_local(x)]);
    match node.kind {
        OpKind::Sequence(children) => {
            assert_eq!(children.len(), 2);
            assert!(matches!(children[0].kind, OpKind::WriteLocal { .. }));
            assert!(matches!(children[1].kind, OpKind::ReadLocal(_)));
        }
        other => panic!("expected sequence, got {:?}", other),
    }
}

#[test]
fn test_sequence_keeps_newline_statements() {
    let mut line = OpNode::nil();
    line.mark_newline();
    let node = OpNode::sequence(vec![line, OpNode::new(OpKind::Integer(2))]);
    assert!(matches!(node.kind, OpKind::Sequence(ref c) if c.len() == 2));
}

// ============================================================================
// Traversal
// ============================================================================

#[test]
fn test_walk_reaches_nested_unit_bodies() {
    let interner = StringInterner::new();
    let body = OpNode::write_local(slot(&interner, "a", 0), OpNode::new(OpKind::Integer(1)));
    let unit = ExecutableUnit {
        name: "block in <main>".to_string(),
        kind: UnitKind::Proc,
        arity: Arity::NO_ARGUMENTS,
        locals: vec![interner.intern("a")],
        own_scope: true,
        return_id: None,
        break_id: Some(BreakId(0)),
        block_depth: 1,
        lexical_scope: LexicalScopeId::ROOT,
        needs_declaration_frame: false,
        body,
    };
    let block = OpNode::new(OpKind::BlockDefinition(Box::new(BlockDefinition {
        kind: ProcKind::Proc,
        unit,
        break_id: BreakId(0),
        frame_on_stack_marker: None,
    })));
    let mut call = CallNode {
        receiver: OpNode::self_value(),
        name: interner.intern("each"),
        args: Vec::new(),
        block: None,
        flags: CallFlags::NONE,
    };
    call.block = Some(block);
    let root = OpNode::new(OpKind::Call(Box::new(call)));

    assert_eq!(
        root.count(|n| matches!(n.kind, OpKind::WriteLocal { .. })),
        1
    );
    assert_eq!(root.count(|n| matches!(n.kind, OpKind::SelfValue)), 1);
}

#[test]
fn test_children_of_try_include_every_clause() {
    let node = OpNode::new(OpKind::Try {
        body: OpNode::new(OpKind::Integer(1)).boxed(),
        rescues: vec![
            RescueClause {
                kind: RescueKind::Classes(vec![OpNode::new(OpKind::Integer(2))]),
                body: OpNode::new(OpKind::Integer(3)),
            },
            RescueClause {
                kind: RescueKind::Any,
                body: OpNode::new(OpKind::Integer(4)),
            },
        ],
        else_body: Some(OpNode::new(OpKind::Integer(5)).boxed()),
        can_omit_backtrace: false,
    });
    let values: Vec<i32> = node
        .children()
        .iter()
        .filter_map(|n| match n.kind {
            OpKind::Integer(v) => Some(v),
            _ => None,
        })
        .collect();
    assert_eq!(values, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_definition_kind_strings() {
    assert_eq!(DefinitionKind::Assignment.as_str(), "assignment");
    assert_eq!(DefinitionKind::Expression.as_str(), "expression");
}
