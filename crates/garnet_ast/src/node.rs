//! Parse node definitions.
//!
//! One closed enum covers every syntactic form the grammar produces. Forms
//! that only ever appear inside another form (parameter lists, `when`
//! clauses, rescue clauses, hash pairs) are separate structs so the type
//! system keeps them out of expression position.

use crate::types::{NodeFlags, RegexpOptions};
use garnet_core::text::TextSpan;

// ============================================================================
// Core Node Wrapper
// ============================================================================

/// Data common to all parse nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeData {
    pub span: TextSpan,
    pub flags: NodeFlags,
}

impl NodeData {
    pub fn new(span: TextSpan) -> Self {
        Self {
            span,
            flags: NodeFlags::NONE,
        }
    }
}

/// A reference to an arena-allocated node.
pub type NodeRef<'a> = &'a ParseNode<'a>;

/// A list of nodes, allocated in the arena.
pub type NodeList<'a> = &'a [NodeRef<'a>];

#[derive(Debug, Clone)]
pub struct ParseNode<'a> {
    pub data: NodeData,
    pub kind: NodeKind<'a>,
}

impl<'a> ParseNode<'a> {
    pub fn new(span: TextSpan, kind: NodeKind<'a>) -> Self {
        Self {
            data: NodeData::new(span),
            kind,
        }
    }

    #[inline]
    pub fn span(&self) -> TextSpan {
        self.data.span
    }

    /// Whether the node starts a new source line.
    #[inline]
    pub fn is_newline(&self) -> bool {
        self.data.flags.contains(NodeFlags::NEWLINE)
    }
}

// ============================================================================
// Node Kinds
// ============================================================================

#[derive(Debug, Clone)]
pub enum NodeKind<'a> {
    // -- Literals --
    Fixnum(i64),
    /// An integer literal too large for `Fixnum`, as decimal digits with an
    /// optional leading `-`.
    Bignum { digits: &'a str },
    Float(f64),
    /// `3r`, `1/3r`: numerator and denominator are integer literal nodes.
    Rational { numerator: NodeRef<'a>, denominator: NodeRef<'a> },
    /// `2i`: the imaginary part.
    Complex { number: NodeRef<'a> },
    Str { value: &'a str, frozen: bool },
    XStr { value: &'a str },
    DStr { parts: NodeList<'a> },
    DSymbol { parts: NodeList<'a> },
    DXStr { parts: NodeList<'a> },
    DRegexp { parts: NodeList<'a>, options: RegexpOptions },
    /// `#{...}` inside an interpolated literal.
    EvStr { body: Option<NodeRef<'a>> },
    Symbol { name: &'a str },
    Regexp { source: &'a str, options: RegexpOptions },
    True,
    False,
    Nil,
    SelfRef,
    /// `[]`
    ZArray,
    /// `__ENCODING__`
    Encoding { name: &'a str },
    Array { elements: NodeList<'a> },
    Hash { pairs: &'a [HashPair<'a>] },
    /// Range literal, `a..b` or `a...b`. A missing bound is nil.
    Dot { begin: Option<NodeRef<'a>>, end: Option<NodeRef<'a>>, exclusive: bool },
    /// A range literal in condition position: the flip-flop operator.
    Flip { begin: NodeRef<'a>, end: NodeRef<'a>, exclusive: bool },

    // -- Variables --
    /// A local in the current method or top level. `depth` is the parser's
    /// static scope depth and is informational only.
    LocalVar { name: &'a str, depth: u32 },
    /// A local referenced from inside a block.
    DVar { name: &'a str, depth: u32 },
    LocalAsgn { name: &'a str, depth: u32, value: Option<NodeRef<'a>> },
    DAsgn { name: &'a str, depth: u32, value: Option<NodeRef<'a>> },
    InstVar { name: &'a str },
    InstAsgn { name: &'a str, value: Option<NodeRef<'a>> },
    ClassVar { name: &'a str },
    ClassVarAsgn { name: &'a str, value: Option<NodeRef<'a>> },
    GlobalVar { name: &'a str },
    GlobalAsgn { name: &'a str, value: Option<NodeRef<'a>> },
    Const { name: &'a str },
    /// `A::B`
    Colon2 { left: NodeRef<'a>, name: &'a str },
    /// `::B`
    Colon3 { name: &'a str },
    ConstDecl { path: ConstPath<'a>, value: Option<NodeRef<'a>> },
    /// `$1`, `$2`, ...
    NthRef { n: u32 },
    /// `$&`, `` $` ``, `$'`, `$+`
    BackRef { kind: char },

    // -- Calls --
    Call {
        receiver: NodeRef<'a>,
        name: &'a str,
        args: Option<NodeRef<'a>>,
        iter: Option<NodeRef<'a>>,
        /// `&.`
        lazy: bool,
    },
    /// A call with implicit self receiver and an argument list or block.
    FCall { name: &'a str, args: Option<NodeRef<'a>>, iter: Option<NodeRef<'a>> },
    /// A bare identifier that was not a known local.
    VCall { name: &'a str },
    /// `recv.name = value` and `recv[args] = value`; the value is the last
    /// element of `args`.
    AttrAssign {
        receiver: NodeRef<'a>,
        name: &'a str,
        args: Option<NodeRef<'a>>,
        lazy: bool,
    },
    Super { args: Option<NodeRef<'a>>, iter: Option<NodeRef<'a>> },
    /// `super` without parentheses: forwards the method's own arguments.
    ZSuper { iter: Option<NodeRef<'a>> },
    Yield { args: Option<NodeRef<'a>> },
    /// `&expr` in an argument list.
    BlockPass { body: NodeRef<'a> },
    Iter(&'a BlockLiteral<'a>),
    Lambda(&'a BlockLiteral<'a>),
    Splat { value: NodeRef<'a> },
    /// `[*a, *b]` style concatenation: `first` is a list, `second` is splatted.
    ArgsCat { first: NodeRef<'a>, second: NodeRef<'a> },
    /// `[*a, b]`: `second` is a single trailing element.
    ArgsPush { first: NodeRef<'a>, second: NodeRef<'a> },
    /// The value of `return *a` or `a = *b`.
    SValue { value: NodeRef<'a> },
    /// A bare `*` target in multiple assignment.
    Star,
    /// A regexp literal used as a condition: matched against `$_`.
    Match { regexp: NodeRef<'a> },
    /// `regexp_literal =~ value`
    Match2 { receiver: NodeRef<'a>, value: NodeRef<'a> },
    /// `value =~ regexp_literal`
    Match3 { receiver: NodeRef<'a>, value: NodeRef<'a> },
    Defined { expression: NodeRef<'a> },

    // -- Structure --
    Begin { body: Option<NodeRef<'a>> },
    Block { children: NodeList<'a> },
    /// `BEGIN { }`
    PreExe { body: Option<NodeRef<'a>> },
    /// `END { }`
    PostExe { body: Option<NodeRef<'a>> },

    // -- Control flow --
    If {
        condition: NodeRef<'a>,
        then_body: Option<NodeRef<'a>>,
        else_body: Option<NodeRef<'a>>,
    },
    And { first: NodeRef<'a>, second: NodeRef<'a> },
    Or { first: NodeRef<'a>, second: NodeRef<'a> },
    While {
        condition: NodeRef<'a>,
        body: Option<NodeRef<'a>>,
        /// False for `begin ... end while cond`.
        evaluate_at_start: bool,
    },
    Until {
        condition: NodeRef<'a>,
        body: Option<NodeRef<'a>>,
        evaluate_at_start: bool,
    },
    For { var: NodeRef<'a>, iter: NodeRef<'a>, body: Option<NodeRef<'a>> },
    Case {
        subject: Option<NodeRef<'a>>,
        whens: &'a [WhenClause<'a>],
        else_body: Option<NodeRef<'a>>,
    },
    Break { value: Option<NodeRef<'a>> },
    Next { value: Option<NodeRef<'a>> },
    Redo,
    Retry,
    Return { value: Option<NodeRef<'a>> },
    Rescue {
        body: Option<NodeRef<'a>>,
        rescue: Option<&'a RescueClause<'a>>,
        else_body: Option<NodeRef<'a>>,
    },
    Ensure { body: Option<NodeRef<'a>>, ensure: Option<NodeRef<'a>> },

    // -- Operator assignment --
    /// `recv.attribute op= value`
    OpAsgn {
        receiver: NodeRef<'a>,
        attribute: &'a str,
        operator: &'a str,
        value: NodeRef<'a>,
        lazy: bool,
    },
    /// `a &&= b`: `first` reads the target, `second` assigns it.
    OpAsgnAnd { first: NodeRef<'a>, second: NodeRef<'a> },
    /// `a ||= b`: `first` reads the target, `second` assigns it.
    OpAsgnOr { first: NodeRef<'a>, second: NodeRef<'a> },
    /// `recv[args] op= value`
    OpElementAsgn {
        receiver: NodeRef<'a>,
        args: Option<NodeRef<'a>>,
        operator: &'a str,
        value: NodeRef<'a>,
    },
    /// `A::B op= value`; `first` is the constant path.
    OpAsgnConstDecl { first: NodeRef<'a>, operator: &'a str, second: NodeRef<'a> },
    MultipleAsgn(&'a MultipleAsgn<'a>),

    // -- Definitions --
    Defn { name: &'a str, args: &'a ArgsNode<'a>, body: Option<NodeRef<'a>> },
    Defs {
        receiver: NodeRef<'a>,
        name: &'a str,
        args: &'a ArgsNode<'a>,
        body: Option<NodeRef<'a>>,
    },
    Class {
        path: ConstPath<'a>,
        superclass: Option<NodeRef<'a>>,
        body: Option<NodeRef<'a>>,
    },
    Module { path: ConstPath<'a>, body: Option<NodeRef<'a>> },
    /// `class << receiver`
    SClass { receiver: NodeRef<'a>, body: Option<NodeRef<'a>> },
    /// `alias new old`; both names are `Literal`, `Symbol` or `DSymbol`.
    Alias { new_name: NodeRef<'a>, old_name: NodeRef<'a> },
    /// `alias $new $old`
    VAlias { new_name: &'a str, old_name: &'a str },
    Undef { name: NodeRef<'a> },
    /// A bare method name in `alias` or `undef`.
    Literal { name: &'a str },
    /// A parameter name as a multiple-assignment target in a parameter list.
    Argument { name: &'a str },
}

// ============================================================================
// Child-only forms
// ============================================================================

/// The target of a constant declaration or the name of a class or module.
#[derive(Debug, Clone, Copy)]
pub enum ConstPath<'a> {
    /// `A`: defined in the current lexical scope.
    Implicit { name: &'a str },
    /// `Outer::A`
    Scoped { left: NodeRef<'a>, name: &'a str },
    /// `::A`
    TopLevel { name: &'a str },
}

impl<'a> ConstPath<'a> {
    pub fn name(&self) -> &'a str {
        match *self {
            ConstPath::Implicit { name }
            | ConstPath::Scoped { name, .. }
            | ConstPath::TopLevel { name } => name,
        }
    }
}

/// One `key => value` entry. A missing key is a `**splat` entry.
#[derive(Debug, Clone, Copy)]
pub struct HashPair<'a> {
    pub key: Option<NodeRef<'a>>,
    pub value: NodeRef<'a>,
}

/// The body of a `{ |params| ... }` block, `do ... end` block or `-> () {}`.
#[derive(Debug)]
pub struct BlockLiteral<'a> {
    pub span: TextSpan,
    pub args: &'a ArgsNode<'a>,
    pub body: Option<NodeRef<'a>>,
    /// Block-local names the parser's static scope recorded (`|a; b|`).
    pub locals: &'a [&'a str],
}

#[derive(Debug)]
pub struct WhenClause<'a> {
    pub span: TextSpan,
    /// The pattern; for a splat `when *list` the list expression.
    pub expression: NodeRef<'a>,
    pub body: Option<NodeRef<'a>>,
    pub splat: bool,
}

/// One `rescue` clause; clauses form a linked chain in source order.
#[derive(Debug)]
pub struct RescueClause<'a> {
    pub span: TextSpan,
    pub exceptions: Option<NodeRef<'a>>,
    pub body: Option<NodeRef<'a>>,
    pub next: Option<&'a RescueClause<'a>>,
}

impl<'a> RescueClause<'a> {
    /// Iterate this clause and every clause chained after it.
    pub fn iter(&'a self) -> impl Iterator<Item = &'a RescueClause<'a>> {
        std::iter::successors(Some(self), |clause| clause.next)
    }
}

/// `pre, *rest, post = value`. Targets are assignment nodes with no value,
/// nested `MultipleAsgn`, `Splat`-free `Star`, or `AttrAssign`.
#[derive(Debug)]
pub struct MultipleAsgn<'a> {
    pub span: TextSpan,
    pub pre: NodeList<'a>,
    pub rest: Option<NodeRef<'a>>,
    pub post: NodeList<'a>,
    /// Absent when the node is a destructuring target itself.
    pub value: Option<NodeRef<'a>>,
}

/// A method, block or lambda parameter list.
#[derive(Debug, Default)]
pub struct ArgsNode<'a> {
    pub span: TextSpan,
    /// Required leading parameters: `Argument` or destructuring `MultipleAsgn`.
    pub pre: NodeList<'a>,
    /// Optional parameters: `LocalAsgn`/`DAsgn` carrying the default value.
    pub optional: NodeList<'a>,
    pub rest: Option<RestParam<'a>>,
    pub post: NodeList<'a>,
    pub keywords: &'a [KeywordParam<'a>],
    pub keyword_rest: Option<RestParam<'a>>,
    pub block: Option<&'a str>,
}

impl<'a> ArgsNode<'a> {
    pub fn is_empty(&self) -> bool {
        self.pre.is_empty()
            && self.optional.is_empty()
            && self.rest.is_none()
            && self.post.is_empty()
            && self.keywords.is_empty()
            && self.keyword_rest.is_none()
            && self.block.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestParam<'a> {
    Named(&'a str),
    Anonymous,
    /// The trailing comma in `|a,|`: no binding, but the block destructures.
    ExcessComma,
}

#[derive(Debug, Clone, Copy)]
pub struct KeywordParam<'a> {
    pub name: &'a str,
    /// `None` for a required keyword.
    pub default: Option<NodeRef<'a>>,
}
