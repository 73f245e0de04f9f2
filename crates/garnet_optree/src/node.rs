//! Operation node definitions.

use crate::ids::{BreakId, LexicalScopeId, LocalSlot, Name, ReturnId};
use crate::literal::Literal;
use crate::unit::{Arity, BlockDefinition, ExecutableUnit};
use bitflags::bitflags;
use garnet_ast::RegexpOptions;
use garnet_core::text::TextSpan;
use std::sync::Arc;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OpFlags: u8 {
        const NONE = 0;
        /// The node starts a new source line: a stepping point.
        const NEWLINE = 1 << 0;
        /// The node's line was registered with the coverage sink.
        const COVERAGE_LINE = 1 << 1;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CallFlags: u8 {
        const NONE = 0;
        /// The last argument is an array to be spread into the call.
        const SPLATTED = 1 << 0;
        /// Private and protected methods may be called.
        const IGNORE_VISIBILITY = 1 << 1;
        /// A bare identifier with no receiver and no arguments.
        const VCALL = 1 << 2;
        /// `&.`: a nil receiver short-circuits to nil.
        const SAFE_NAVIGATION = 1 << 3;
        /// The call is an attribute or index assignment; its value is the
        /// assigned value, not the method's return value.
        const ATTR_ASSIGN = 1 << 4;
    }
}

// ============================================================================
// Core Node Wrapper
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct OpNode {
    pub kind: OpKind,
    span: Option<TextSpan>,
    flags: OpFlags,
}

impl OpNode {
    pub fn new(kind: OpKind) -> Self {
        Self {
            kind,
            span: None,
            flags: OpFlags::NONE,
        }
    }

    /// Attach a source span. A span is assigned once; assigning a different
    /// span to a node that already has one is a translator bug.
    pub fn at(mut self, span: TextSpan) -> Self {
        self.set_span(span);
        self
    }

    pub fn set_span(&mut self, span: TextSpan) {
        debug_assert!(
            self.span.is_none() || self.span == Some(span),
            "source span assigned twice: {:?} then {:?}",
            self.span,
            span
        );
        self.span = Some(span);
    }

    /// Attach a span only if the node has none yet.
    pub fn ensure_span(mut self, span: TextSpan) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    #[inline]
    pub fn span(&self) -> Option<TextSpan> {
        self.span
    }

    #[inline]
    pub fn has_span(&self) -> bool {
        self.span.is_some()
    }

    /// The span of this node, or the union of its children's spans when it
    /// has none of its own.
    pub fn encapsulating_span(&self) -> Option<TextSpan> {
        if self.span.is_some() {
            return self.span;
        }
        self.children()
            .into_iter()
            .filter_map(OpNode::encapsulating_span)
            .reduce(|a, b| a.union(&b))
    }

    #[inline]
    pub fn flags(&self) -> OpFlags {
        self.flags
    }

    #[inline]
    pub fn is_newline(&self) -> bool {
        self.flags.contains(OpFlags::NEWLINE)
    }

    pub fn mark_newline(&mut self) {
        self.flags |= OpFlags::NEWLINE;
    }

    pub fn mark_coverage_line(&mut self) {
        self.flags |= OpFlags::COVERAGE_LINE;
    }

    #[inline]
    pub fn boxed(self) -> Box<OpNode> {
        Box::new(self)
    }

    // -- Convenience constructors --

    pub fn nil() -> Self {
        OpNode::new(OpKind::Nil)
    }

    pub fn boolean(value: bool) -> Self {
        OpNode::new(OpKind::Boolean(value))
    }

    pub fn self_value() -> Self {
        OpNode::new(OpKind::SelfValue)
    }

    pub fn object(literal: Literal) -> Self {
        OpNode::new(OpKind::Object(literal))
    }

    pub fn symbol(name: Name) -> Self {
        OpNode::new(OpKind::Object(Literal::Symbol(name)))
    }

    pub fn frozen_string(value: &str) -> Self {
        OpNode::new(OpKind::Object(Literal::FrozenString(Arc::from(value))))
    }

    pub fn read_local(slot: LocalSlot) -> Self {
        OpNode::new(OpKind::ReadLocal(slot))
    }

    pub fn write_local(slot: LocalSlot, value: OpNode) -> Self {
        OpNode::new(OpKind::WriteLocal {
            slot,
            value: value.boxed(),
        })
    }

    pub fn call(receiver: OpNode, name: Name, args: Vec<OpNode>) -> Self {
        OpNode::new(OpKind::Call(Box::new(CallNode {
            receiver,
            name,
            args,
            block: None,
            flags: CallFlags::NONE,
        })))
    }

    pub fn not(child: OpNode) -> Self {
        OpNode::new(OpKind::Not(child.boxed()))
    }

    pub fn if_else(condition: OpNode, then_body: OpNode, else_body: OpNode) -> Self {
        OpNode::new(OpKind::IfElse {
            condition: condition.boxed(),
            then_body: then_body.boxed(),
            else_body: else_body.boxed(),
        })
    }

    /// Build a sequence yielding the last value. Nested span-less sequences
    /// are flattened and pure values in non-final position are dropped, so
    /// one or zero remaining nodes come back unwrapped.
    pub fn sequence(nodes: Vec<OpNode>) -> Self {
        let mut flat: Vec<OpNode> = Vec::with_capacity(nodes.len());
        for node in nodes {
            let inline = matches!(node.kind, OpKind::Sequence(_))
                && node.span.is_none()
                && node.flags.is_empty();
            if !inline {
                flat.push(node);
            } else if let OpKind::Sequence(children) = node.kind {
                flat.extend(children);
            }
        }
        let last = flat.len().saturating_sub(1);
        let mut kept: Vec<OpNode> = flat
            .into_iter()
            .enumerate()
            .filter(|(i, node)| *i == last || !node.is_droppable_statement())
            .map(|(_, node)| node)
            .collect();
        match kept.len() {
            0 => OpNode::nil(),
            1 => kept.pop().unwrap_or_else(OpNode::nil),
            _ => OpNode::new(OpKind::Sequence(kept)),
        }
    }

    /// Values with no effect whose result is discarded in statement position.
    fn is_droppable_statement(&self) -> bool {
        !self.is_newline()
            && matches!(
                self.kind,
                OpKind::Nil | OpKind::Boolean(_) | OpKind::Integer(_) | OpKind::SelfValue
            )
    }
}

// ============================================================================
// Node Kinds
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum OpKind {
    // -- Literals --
    Nil,
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Float(f64),
    /// A shared read-only pool value.
    Object(Literal),
    /// A fresh mutable string on every evaluation.
    StringLiteral(Arc<str>),
    ArrayLiteral(Vec<OpNode>),
    HashLiteral(Vec<(OpNode, OpNode)>),
    /// Merge of hash parts, for literals containing `**splat` entries.
    ConcatHashLiteral(Vec<OpNode>),
    /// `**value`: coerce with `to_hash`.
    HashCast(Box<OpNode>),
    RangeLiteral {
        begin: Box<OpNode>,
        end: Box<OpNode>,
        exclusive: bool,
    },
    InterpolatedString(Vec<OpNode>),
    /// Coerce an interpolated segment with `to_s`.
    ToS(Box<OpNode>),
    InterpolatedRegexp {
        parts: Vec<OpNode>,
        options: RegexpOptions,
    },
    StringToSymbol(Box<OpNode>),
    /// Evaluate once per call site and cache (`/#{x}/o`).
    Once(Box<OpNode>),

    // -- Arrays and splats --
    SplatCast {
        nil_behavior: SplatNilBehavior,
        use_to_ary: bool,
        copy: bool,
        child: Box<OpNode>,
    },
    ArrayConcat(Vec<OpNode>),
    ArrayAppendOne {
        array: Box<OpNode>,
        value: Box<OpNode>,
    },
    ArrayDup(Box<OpNode>),
    /// Element read; negative indices count from the end.
    ArrayIndex {
        array: Box<OpNode>,
        index: i32,
    },
    /// Elements from `from` up to `to` (exclusive, counted back from the
    /// end when not positive).
    ArraySlice {
        array: Box<OpNode>,
        from: i32,
        to: i32,
    },
    ArrayIsAtLeastAsLargeAs {
        array: Box<OpNode>,
        size: u32,
    },

    // -- Variables --
    SelfValue,
    ReadLocal(LocalSlot),
    WriteLocal {
        slot: LocalSlot,
        value: Box<OpNode>,
    },
    ReadInstanceVariable(Name),
    WriteInstanceVariable {
        name: Name,
        value: Box<OpNode>,
    },
    ReadClassVariable {
        lexical_scope: Box<OpNode>,
        name: Name,
    },
    WriteClassVariable {
        lexical_scope: Box<OpNode>,
        name: Name,
        value: Box<OpNode>,
    },
    ReadGlobal(Name),
    WriteGlobal {
        name: Name,
        value: Box<OpNode>,
    },
    AliasGlobal {
        new_name: Name,
        old_name: Name,
    },
    /// `$1`, `$2`, ...: a group of the last match in `$~`.
    ReadNthMatch(u32),
    /// `Module::Name`
    ReadConstant {
        module: Box<OpNode>,
        name: Name,
    },
    /// An unqualified constant resolved through the static lexical chain.
    ReadConstantWithLexicalScope {
        lexical_scope: LexicalScopeId,
        name: Name,
    },
    /// An unqualified constant resolved through the caller's runtime scope.
    ReadConstantWithDynamicScope(Name),
    WriteConstant {
        module: Box<OpNode>,
        name: Name,
        value: Box<OpNode>,
    },
    /// The current lexical scope, determined at runtime.
    DynamicLexicalScope,
    /// The module of a static lexical scope.
    LexicalScopeModule(LexicalScopeId),
    /// The module of the runtime lexical scope.
    DynamicLexicalScopeModule,
    FlipFlop {
        begin: Box<OpNode>,
        end: Box<OpNode>,
        exclusive: bool,
        state: LocalSlot,
    },
    InitFlipFlopSlot(LocalSlot),

    // -- Calls --
    Call(Box<CallNode>),
    Super(Box<SuperCall>),
    Yield {
        args: Vec<OpNode>,
        splatted: bool,
        /// Reads the method's block, or nil outside a method.
        block: Box<OpNode>,
    },
    /// `&value` in an argument list.
    ToProc(Box<OpNode>),
    InvokePrimitive {
        name: Name,
        args: Vec<OpNode>,
    },
    /// Whether an optional argument was left out (core sources only).
    IsNotProvided(Box<OpNode>),
    /// Run the call with its literal block's frame marker set.
    FrameOnStack {
        marker: LocalSlot,
        child: Box<OpNode>,
    },
    /// Catch breaks carrying `break_id`; the loop or call's value otherwise.
    CatchBreak {
        break_id: BreakId,
        is_while: bool,
        body: Box<OpNode>,
    },
    BlockDefinition(Box<BlockDefinition>),

    // -- Definitions --
    MethodDefinition {
        definee: Box<OpNode>,
        unit: Box<ExecutableUnit>,
    },
    /// Open `module` and run a module body unit with it as self.
    RunModuleBody {
        module: Box<OpNode>,
        unit: Box<ExecutableUnit>,
    },
    DefineClass {
        lexical_parent: Box<OpNode>,
        name: Name,
        superclass: Option<Box<OpNode>>,
    },
    DefineModule {
        lexical_parent: Box<OpNode>,
        name: Name,
    },
    SingletonClass(Box<OpNode>),
    /// Where `def` puts methods in the current frame.
    GetDefaultDefinee,
    RaiseIfFrozen(Box<OpNode>),
    InsideModuleDefinition(Box<OpNode>),
    AliasMethod {
        module: Box<OpNode>,
        new_name: Box<OpNode>,
        old_name: Box<OpNode>,
    },
    UndefMethod {
        module: Box<OpNode>,
        name: Box<OpNode>,
    },

    // -- Control flow --
    Sequence(Vec<OpNode>),
    /// `required` is always evaluated; `value` only when the result is used.
    ElidableResult {
        required: Box<OpNode>,
        value: Box<OpNode>,
    },
    If {
        condition: Box<OpNode>,
        then_body: Box<OpNode>,
    },
    IfElse {
        condition: Box<OpNode>,
        then_body: Box<OpNode>,
        else_body: Box<OpNode>,
    },
    Unless {
        condition: Box<OpNode>,
        then_body: Box<OpNode>,
    },
    And {
        left: Box<OpNode>,
        right: Box<OpNode>,
    },
    Or {
        left: Box<OpNode>,
        right: Box<OpNode>,
    },
    Not(Box<OpNode>),
    IsNil(Box<OpNode>),
    While {
        kind: LoopKind,
        condition: Box<OpNode>,
        body: Box<OpNode>,
    },
    Break {
        break_id: BreakId,
        /// Breaks out of a `while` need no frame-on-stack check.
        ignore_marker: bool,
        value: Box<OpNode>,
    },
    Next(Box<OpNode>),
    Redo,
    Retry,
    Return {
        return_id: ReturnId,
        /// False when the return unwinds through block frames.
        local: bool,
        value: Box<OpNode>,
    },
    Try {
        body: Box<OpNode>,
        rescues: Vec<RescueClause>,
        else_body: Option<Box<OpNode>>,
        can_omit_backtrace: bool,
    },
    /// Converts host-level failures raised by `child` into Ruby exceptions.
    ExceptionTranslating(Box<OpNode>),
    Ensure {
        body: Box<OpNode>,
        ensure: Box<OpNode>,
    },
    CatchReturn {
        return_id: ReturnId,
        body: Box<OpNode>,
    },
    CatchNext(Box<OpNode>),
    /// `defined?(child)`
    Defined(Box<OpNode>),
    /// Reports `definition` for `defined?` while evaluating `child` normally.
    DefinedWrapper {
        definition: DefinitionKind,
        child: Box<OpNode>,
    },
    /// Regexp match that assigns named captures to locals.
    SetNamedVariablesMatch {
        match_call: Box<OpNode>,
        read_match_data: Box<OpNode>,
        setters: Vec<OpNode>,
        nil_setters: Vec<OpNode>,
    },
    /// A position the grammar never produces a value for.
    Dead(&'static str),

    // -- Argument loading --
    CheckArity(Arity),
    ReadPreArgument {
        index: u32,
        missing: MissingArgumentBehavior,
    },
    ReadOptionalArgument {
        index: u32,
        /// Arguments required before this one is considered present.
        minimum: u32,
        default: Box<OpNode>,
    },
    ReadRestArguments {
        start: u32,
        post: u32,
    },
    ReadPostArgument {
        from_end: u32,
        pre: u32,
        optional: u32,
    },
    ReadKeywordArgument {
        name: Name,
        /// `None` for a required keyword.
        default: Option<Box<OpNode>>,
    },
    ReadKeywordRestArguments {
        excluded: Vec<Name>,
    },
    ReadBlockArgument {
        as_proc: bool,
    },
    /// The block's arguments as one value: the single argument, or an
    /// array of all of them.
    SingleBlockArg,
    /// Whether a proc's single array argument should be destructured over
    /// its parameters.
    ShouldDestructure {
        required: u32,
    },
}

// ============================================================================
// Helper Structures
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CallNode {
    pub receiver: OpNode,
    pub name: Name,
    pub args: Vec<OpNode>,
    /// A `BlockDefinition` or a `ToProc`.
    pub block: Option<OpNode>,
    pub flags: CallFlags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuperCall {
    pub args: Vec<OpNode>,
    pub block: Option<OpNode>,
    pub splatted: bool,
    /// Arguments forwarded implicitly by a bare `super`.
    pub implicit: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RescueClause {
    pub kind: RescueKind,
    pub body: OpNode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RescueKind {
    /// Bare `rescue`: matches `StandardError`.
    Any,
    Classes(Vec<OpNode>),
    Splat(OpNode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplatNilBehavior {
    /// `*nil` is nil.
    Nil,
    /// `*nil` is `[]`.
    EmptyArray,
    /// `*nil` is `[nil]`.
    ArrayWithNil,
    /// `*nil` converts through `to_a`.
    Convert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    /// `while cond; body; end`
    TestFirst,
    /// `begin; body; end while cond`
    TestAfter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    Assignment,
    Expression,
    Method,
}

impl DefinitionKind {
    /// The string `defined?` reports.
    pub fn as_str(self) -> &'static str {
        match self {
            DefinitionKind::Assignment => "assignment",
            DefinitionKind::Expression => "expression",
            DefinitionKind::Method => "method",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingArgumentBehavior {
    /// Lambdas and methods check arity up front; a missing argument is a bug.
    Runtime,
    /// Procs fill missing arguments with nil.
    Nil,
}
