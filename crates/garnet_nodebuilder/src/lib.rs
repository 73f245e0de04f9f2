//! garnet_nodebuilder: Synthetic parse node construction.
//!
//! Hosts that already hold a parse tree never need this crate. It builds
//! trees directly in a [`Bump`] arena for embedders that synthesize code
//! and for the translator's tests, which have no Ruby parser to hand.
//!
//! Every node gets a distinct one-byte span, so spans still identify
//! nodes. [`NodeBuilder::newline_at`] places a statement at a real source
//! offset when line numbers matter.
//!
//! ```
//! use bumpalo::Bump;
//! use garnet_nodebuilder::NodeBuilder;
//!
//! let arena = Bump::new();
//! let b = NodeBuilder::new(&arena);
//! let call = b.call(b.lvar("a"), "+", &[b.fixnum(1)]);
//! assert_eq!(call.kind.name(), "Call");
//! ```

use bumpalo::Bump;
use garnet_ast::{
    ArgsNode, BlockLiteral, ConstPath, HashPair, KeywordParam, MultipleAsgn, NodeData, NodeFlags, NodeKind,
    NodeList, NodeRef, ParseNode, RegexpOptions, RescueClause, RestParam, WhenClause,
};
use garnet_core::text::TextSpan;
use garnet_core::ParseArena;
use garnet_scanner::{HeredocError, HeredocPart, HeredocTerm, StrFuncFlags};
use std::cell::Cell;

pub struct NodeBuilder<'a> {
    arena: &'a Bump,
    next_offset: Cell<u32>,
}

impl<'a> NodeBuilder<'a> {
    pub fn new(arena: &'a Bump) -> Self {
        Self {
            arena,
            next_offset: Cell::new(0),
        }
    }

    /// Build into a unit's parse arena.
    pub fn in_arena(arena: &'a ParseArena) -> Self {
        Self::new(arena.bump())
    }

    /// Start numbering synthetic spans at `offset`, past any real source
    /// the tree refers to.
    pub fn with_offset(arena: &'a Bump, offset: u32) -> Self {
        Self {
            arena,
            next_offset: Cell::new(offset),
        }
    }

    fn next_span(&self) -> TextSpan {
        let start = self.next_offset.get();
        self.next_offset.set(start + 1);
        TextSpan::new(start, 1)
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    pub fn node(&self, kind: NodeKind<'a>) -> NodeRef<'a> {
        let span = self.next_span();
        self.node_at(span, kind)
    }

    pub fn node_at(&self, span: TextSpan, kind: NodeKind<'a>) -> NodeRef<'a> {
        self.arena.alloc(ParseNode::new(span, kind))
    }

    /// A copy of `node` flagged as starting a source line.
    pub fn newline(&self, node: NodeRef<'a>) -> NodeRef<'a> {
        self.arena.alloc(ParseNode {
            data: NodeData {
                span: node.span(),
                flags: node.data.flags | NodeFlags::NEWLINE,
            },
            kind: node.kind.clone(),
        })
    }

    /// A copy of `node` flagged as a line start and moved to `offset`.
    pub fn newline_at(&self, offset: u32, node: NodeRef<'a>) -> NodeRef<'a> {
        self.arena.alloc(ParseNode {
            data: NodeData {
                span: TextSpan::new(offset, node.span().length.max(1)),
                flags: node.data.flags | NodeFlags::NEWLINE,
            },
            kind: node.kind.clone(),
        })
    }

    pub fn name(&self, s: &str) -> &'a str {
        self.arena.alloc_str(s)
    }

    pub fn list(&self, nodes: &[NodeRef<'a>]) -> NodeList<'a> {
        self.arena.alloc_slice_copy(nodes)
    }

    fn args_list(&self, args: &[NodeRef<'a>]) -> Option<NodeRef<'a>> {
        if args.is_empty() {
            None
        } else {
            Some(self.array(args))
        }
    }

    // ========================================================================
    // Literals
    // ========================================================================

    pub fn fixnum(&self, value: i64) -> NodeRef<'a> {
        self.node(NodeKind::Fixnum(value))
    }

    pub fn bignum(&self, digits: &str) -> NodeRef<'a> {
        self.node(NodeKind::Bignum {
            digits: self.name(digits),
        })
    }

    pub fn float(&self, value: f64) -> NodeRef<'a> {
        self.node(NodeKind::Float(value))
    }

    pub fn str(&self, value: &str) -> NodeRef<'a> {
        self.node(NodeKind::Str {
            value: self.name(value),
            frozen: false,
        })
    }

    pub fn dstr(&self, parts: &[NodeRef<'a>]) -> NodeRef<'a> {
        self.node(NodeKind::DStr { parts: self.list(parts) })
    }

    pub fn evstr(&self, body: NodeRef<'a>) -> NodeRef<'a> {
        self.node(NodeKind::EvStr { body: Some(body) })
    }

    pub fn sym(&self, name: &str) -> NodeRef<'a> {
        self.node(NodeKind::Symbol { name: self.name(name) })
    }

    pub fn dsym(&self, parts: &[NodeRef<'a>]) -> NodeRef<'a> {
        self.node(NodeKind::DSymbol { parts: self.list(parts) })
    }

    pub fn regexp(&self, source: &str, options: RegexpOptions) -> NodeRef<'a> {
        self.node(NodeKind::Regexp {
            source: self.name(source),
            options,
        })
    }

    pub fn dregexp(&self, parts: &[NodeRef<'a>], options: RegexpOptions) -> NodeRef<'a> {
        self.node(NodeKind::DRegexp {
            parts: self.list(parts),
            options,
        })
    }

    pub fn true_(&self) -> NodeRef<'a> {
        self.node(NodeKind::True)
    }

    pub fn false_(&self) -> NodeRef<'a> {
        self.node(NodeKind::False)
    }

    pub fn nil(&self) -> NodeRef<'a> {
        self.node(NodeKind::Nil)
    }

    pub fn self_ref(&self) -> NodeRef<'a> {
        self.node(NodeKind::SelfRef)
    }

    pub fn array(&self, elements: &[NodeRef<'a>]) -> NodeRef<'a> {
        if elements.is_empty() {
            return self.node(NodeKind::ZArray);
        }
        self.node(NodeKind::Array {
            elements: self.list(elements),
        })
    }

    /// A hash literal; a `None` key is a `**splat` entry.
    pub fn hash(&self, pairs: &[(Option<NodeRef<'a>>, NodeRef<'a>)]) -> NodeRef<'a> {
        let pairs = self
            .arena
            .alloc_slice_fill_iter(pairs.iter().map(|&(key, value)| HashPair { key, value }));
        self.node(NodeKind::Hash { pairs })
    }

    pub fn range(&self, begin: Option<NodeRef<'a>>, end: Option<NodeRef<'a>>, exclusive: bool) -> NodeRef<'a> {
        self.node(NodeKind::Dot { begin, end, exclusive })
    }

    pub fn flip(&self, begin: NodeRef<'a>, end: NodeRef<'a>, exclusive: bool) -> NodeRef<'a> {
        self.node(NodeKind::Flip { begin, end, exclusive })
    }

    // ========================================================================
    // Variables
    // ========================================================================

    pub fn lvar(&self, name: &str) -> NodeRef<'a> {
        self.node(NodeKind::LocalVar {
            name: self.name(name),
            depth: 0,
        })
    }

    pub fn lasgn(&self, name: &str, value: NodeRef<'a>) -> NodeRef<'a> {
        self.node(NodeKind::LocalAsgn {
            name: self.name(name),
            depth: 0,
            value: Some(value),
        })
    }

    /// A local assignment without a value: a multiple-assignment target.
    pub fn lasgn_target(&self, name: &str) -> NodeRef<'a> {
        self.node(NodeKind::LocalAsgn {
            name: self.name(name),
            depth: 0,
            value: None,
        })
    }

    pub fn dvar(&self, name: &str, depth: u32) -> NodeRef<'a> {
        self.node(NodeKind::DVar {
            name: self.name(name),
            depth,
        })
    }

    pub fn dasgn(&self, name: &str, depth: u32, value: NodeRef<'a>) -> NodeRef<'a> {
        self.node(NodeKind::DAsgn {
            name: self.name(name),
            depth,
            value: Some(value),
        })
    }

    pub fn ivar(&self, name: &str) -> NodeRef<'a> {
        self.node(NodeKind::InstVar { name: self.name(name) })
    }

    pub fn iasgn(&self, name: &str, value: NodeRef<'a>) -> NodeRef<'a> {
        self.node(NodeKind::InstAsgn {
            name: self.name(name),
            value: Some(value),
        })
    }

    pub fn cvar(&self, name: &str) -> NodeRef<'a> {
        self.node(NodeKind::ClassVar { name: self.name(name) })
    }

    pub fn cvasgn(&self, name: &str, value: NodeRef<'a>) -> NodeRef<'a> {
        self.node(NodeKind::ClassVarAsgn {
            name: self.name(name),
            value: Some(value),
        })
    }

    pub fn gvar(&self, name: &str) -> NodeRef<'a> {
        self.node(NodeKind::GlobalVar { name: self.name(name) })
    }

    pub fn gasgn(&self, name: &str, value: NodeRef<'a>) -> NodeRef<'a> {
        self.node(NodeKind::GlobalAsgn {
            name: self.name(name),
            value: Some(value),
        })
    }

    pub fn const_(&self, name: &str) -> NodeRef<'a> {
        self.node(NodeKind::Const { name: self.name(name) })
    }

    pub fn colon2(&self, left: NodeRef<'a>, name: &str) -> NodeRef<'a> {
        self.node(NodeKind::Colon2 {
            left,
            name: self.name(name),
        })
    }

    pub fn colon3(&self, name: &str) -> NodeRef<'a> {
        self.node(NodeKind::Colon3 { name: self.name(name) })
    }

    /// `A = value` in the current lexical scope.
    pub fn cdecl(&self, name: &str, value: NodeRef<'a>) -> NodeRef<'a> {
        self.node(NodeKind::ConstDecl {
            path: self.const_path(name),
            value: Some(value),
        })
    }

    pub fn const_path(&self, name: &str) -> ConstPath<'a> {
        ConstPath::Implicit { name: self.name(name) }
    }

    pub fn nth_ref(&self, n: u32) -> NodeRef<'a> {
        self.node(NodeKind::NthRef { n })
    }

    // ========================================================================
    // Calls
    // ========================================================================

    pub fn call(&self, receiver: NodeRef<'a>, name: &str, args: &[NodeRef<'a>]) -> NodeRef<'a> {
        self.node(NodeKind::Call {
            receiver,
            name: self.name(name),
            args: self.args_list(args),
            iter: None,
            lazy: false,
        })
    }

    /// `receiver&.name(args)`
    pub fn safe_call(&self, receiver: NodeRef<'a>, name: &str, args: &[NodeRef<'a>]) -> NodeRef<'a> {
        self.node(NodeKind::Call {
            receiver,
            name: self.name(name),
            args: self.args_list(args),
            iter: None,
            lazy: true,
        })
    }

    /// A call with a literal block (`iter`) or a `&block` pass.
    pub fn call_with_block(
        &self,
        receiver: NodeRef<'a>,
        name: &str,
        args: &[NodeRef<'a>],
        block: NodeRef<'a>,
    ) -> NodeRef<'a> {
        self.node(NodeKind::Call {
            receiver,
            name: self.name(name),
            args: self.args_list(args),
            iter: Some(block),
            lazy: false,
        })
    }

    pub fn fcall(&self, name: &str, args: &[NodeRef<'a>]) -> NodeRef<'a> {
        self.node(NodeKind::FCall {
            name: self.name(name),
            args: self.args_list(args),
            iter: None,
        })
    }

    pub fn fcall_with_block(&self, name: &str, args: &[NodeRef<'a>], block: NodeRef<'a>) -> NodeRef<'a> {
        self.node(NodeKind::FCall {
            name: self.name(name),
            args: self.args_list(args),
            iter: Some(block),
        })
    }

    pub fn vcall(&self, name: &str) -> NodeRef<'a> {
        self.node(NodeKind::VCall { name: self.name(name) })
    }

    /// `receiver.name = value` (`name` includes the `=`), or
    /// `receiver[index] = value` with name `[]=`.
    pub fn attr_assign(&self, receiver: NodeRef<'a>, name: &str, args: &[NodeRef<'a>]) -> NodeRef<'a> {
        self.node(NodeKind::AttrAssign {
            receiver,
            name: self.name(name),
            args: self.args_list(args),
            lazy: false,
        })
    }

    pub fn super_(&self, args: &[NodeRef<'a>]) -> NodeRef<'a> {
        self.node(NodeKind::Super {
            args: self.args_list(args),
            iter: None,
        })
    }

    pub fn zsuper(&self) -> NodeRef<'a> {
        self.node(NodeKind::ZSuper { iter: None })
    }

    pub fn yield_(&self, args: &[NodeRef<'a>]) -> NodeRef<'a> {
        self.node(NodeKind::Yield {
            args: self.args_list(args),
        })
    }

    pub fn block_pass(&self, body: NodeRef<'a>) -> NodeRef<'a> {
        self.node(NodeKind::BlockPass { body })
    }

    /// A literal block `{ |args| body }`.
    pub fn iter(&self, args: &'a ArgsNode<'a>, body: Option<NodeRef<'a>>) -> NodeRef<'a> {
        let block = self.block_literal(args, body, &[]);
        self.node(NodeKind::Iter(block))
    }

    /// `-> (args) { body }`
    pub fn lambda(&self, args: &'a ArgsNode<'a>, body: Option<NodeRef<'a>>) -> NodeRef<'a> {
        let block = self.block_literal(args, body, &[]);
        self.node(NodeKind::Lambda(block))
    }

    pub fn block_literal(
        &self,
        args: &'a ArgsNode<'a>,
        body: Option<NodeRef<'a>>,
        locals: &[&str],
    ) -> &'a BlockLiteral<'a> {
        let locals = self.arena.alloc_slice_fill_iter(locals.iter().map(|local| self.name(local)));
        self.arena.alloc(BlockLiteral {
            span: self.next_span(),
            args,
            body,
            locals,
        })
    }

    pub fn splat(&self, value: NodeRef<'a>) -> NodeRef<'a> {
        self.node(NodeKind::Splat { value })
    }

    pub fn args_cat(&self, first: NodeRef<'a>, second: NodeRef<'a>) -> NodeRef<'a> {
        self.node(NodeKind::ArgsCat { first, second })
    }

    pub fn args_push(&self, first: NodeRef<'a>, second: NodeRef<'a>) -> NodeRef<'a> {
        self.node(NodeKind::ArgsPush { first, second })
    }

    pub fn star(&self) -> NodeRef<'a> {
        self.node(NodeKind::Star)
    }

    pub fn match2(&self, regexp: NodeRef<'a>, value: NodeRef<'a>) -> NodeRef<'a> {
        self.node(NodeKind::Match2 {
            receiver: regexp,
            value,
        })
    }

    pub fn defined(&self, expression: NodeRef<'a>) -> NodeRef<'a> {
        self.node(NodeKind::Defined { expression })
    }

    // ========================================================================
    // Structure and control flow
    // ========================================================================

    /// A statement sequence.
    pub fn block(&self, statements: &[NodeRef<'a>]) -> NodeRef<'a> {
        self.node(NodeKind::Block {
            children: self.list(statements),
        })
    }

    pub fn begin(&self, body: Option<NodeRef<'a>>) -> NodeRef<'a> {
        self.node(NodeKind::Begin { body })
    }

    pub fn post_exe(&self, body: Option<NodeRef<'a>>) -> NodeRef<'a> {
        self.node(NodeKind::PostExe { body })
    }

    pub fn if_(
        &self,
        condition: NodeRef<'a>,
        then_body: Option<NodeRef<'a>>,
        else_body: Option<NodeRef<'a>>,
    ) -> NodeRef<'a> {
        self.node(NodeKind::If {
            condition,
            then_body,
            else_body,
        })
    }

    pub fn and(&self, first: NodeRef<'a>, second: NodeRef<'a>) -> NodeRef<'a> {
        self.node(NodeKind::And { first, second })
    }

    pub fn or(&self, first: NodeRef<'a>, second: NodeRef<'a>) -> NodeRef<'a> {
        self.node(NodeKind::Or { first, second })
    }

    pub fn while_(&self, condition: NodeRef<'a>, body: Option<NodeRef<'a>>) -> NodeRef<'a> {
        self.node(NodeKind::While {
            condition,
            body,
            evaluate_at_start: true,
        })
    }

    /// `begin body end while condition`
    pub fn do_while(&self, condition: NodeRef<'a>, body: Option<NodeRef<'a>>) -> NodeRef<'a> {
        self.node(NodeKind::While {
            condition,
            body,
            evaluate_at_start: false,
        })
    }

    pub fn until(&self, condition: NodeRef<'a>, body: Option<NodeRef<'a>>) -> NodeRef<'a> {
        self.node(NodeKind::Until {
            condition,
            body,
            evaluate_at_start: true,
        })
    }

    pub fn for_(&self, var: NodeRef<'a>, iter: NodeRef<'a>, body: Option<NodeRef<'a>>) -> NodeRef<'a> {
        self.node(NodeKind::For { var, iter, body })
    }

    pub fn when(&self, expression: NodeRef<'a>, body: Option<NodeRef<'a>>) -> WhenClause<'a> {
        WhenClause {
            span: self.next_span(),
            expression,
            body,
            splat: false,
        }
    }

    /// `when *list`
    pub fn when_splat(&self, list: NodeRef<'a>, body: Option<NodeRef<'a>>) -> WhenClause<'a> {
        WhenClause {
            span: self.next_span(),
            expression: list,
            body,
            splat: true,
        }
    }

    pub fn case(
        &self,
        subject: Option<NodeRef<'a>>,
        whens: Vec<WhenClause<'a>>,
        else_body: Option<NodeRef<'a>>,
    ) -> NodeRef<'a> {
        let whens = self.arena.alloc_slice_fill_iter(whens);
        self.node(NodeKind::Case {
            subject,
            whens,
            else_body,
        })
    }

    pub fn break_(&self, value: Option<NodeRef<'a>>) -> NodeRef<'a> {
        self.node(NodeKind::Break { value })
    }

    pub fn next(&self, value: Option<NodeRef<'a>>) -> NodeRef<'a> {
        self.node(NodeKind::Next { value })
    }

    pub fn redo(&self) -> NodeRef<'a> {
        self.node(NodeKind::Redo)
    }

    pub fn retry(&self) -> NodeRef<'a> {
        self.node(NodeKind::Retry)
    }

    pub fn return_(&self, value: Option<NodeRef<'a>>) -> NodeRef<'a> {
        self.node(NodeKind::Return { value })
    }

    /// A chain of rescue clauses in source order. Each entry is the
    /// exception list (`None` for a bare `rescue`) and the clause body.
    pub fn rescue_clauses(
        &self,
        clauses: &[(Option<NodeRef<'a>>, Option<NodeRef<'a>>)],
    ) -> Option<&'a RescueClause<'a>> {
        clauses.iter().rev().fold(None, |next, &(exceptions, body)| {
            Some(&*self.arena.alloc(RescueClause {
                span: self.next_span(),
                exceptions,
                body,
                next,
            }))
        })
    }

    pub fn rescue(
        &self,
        body: Option<NodeRef<'a>>,
        clauses: &[(Option<NodeRef<'a>>, Option<NodeRef<'a>>)],
        else_body: Option<NodeRef<'a>>,
    ) -> NodeRef<'a> {
        self.node(NodeKind::Rescue {
            body,
            rescue: self.rescue_clauses(clauses),
            else_body,
        })
    }

    pub fn ensure(&self, body: Option<NodeRef<'a>>, ensure: Option<NodeRef<'a>>) -> NodeRef<'a> {
        self.node(NodeKind::Ensure { body, ensure })
    }

    // ========================================================================
    // Assignment forms
    // ========================================================================

    /// `pre, *rest, post = value`
    pub fn masgn(
        &self,
        pre: &[NodeRef<'a>],
        rest: Option<NodeRef<'a>>,
        post: &[NodeRef<'a>],
        value: Option<NodeRef<'a>>,
    ) -> NodeRef<'a> {
        let masgn = self.arena.alloc(MultipleAsgn {
            span: self.next_span(),
            pre: self.list(pre),
            rest,
            post: self.list(post),
            value,
        });
        self.node(NodeKind::MultipleAsgn(masgn))
    }

    /// `name ||= value` for a local.
    pub fn local_or_asgn(&self, name: &str, value: NodeRef<'a>) -> NodeRef<'a> {
        self.node(NodeKind::OpAsgnOr {
            first: self.lvar(name),
            second: self.lasgn(name, value),
        })
    }

    pub fn op_asgn_or(&self, first: NodeRef<'a>, second: NodeRef<'a>) -> NodeRef<'a> {
        self.node(NodeKind::OpAsgnOr { first, second })
    }

    pub fn op_asgn_and(&self, first: NodeRef<'a>, second: NodeRef<'a>) -> NodeRef<'a> {
        self.node(NodeKind::OpAsgnAnd { first, second })
    }

    /// `receiver.attribute operator= value`
    pub fn op_asgn(&self, receiver: NodeRef<'a>, attribute: &str, operator: &str, value: NodeRef<'a>) -> NodeRef<'a> {
        self.node(NodeKind::OpAsgn {
            receiver,
            attribute: self.name(attribute),
            operator: self.name(operator),
            value,
            lazy: false,
        })
    }

    /// `receiver[args] operator= value`
    pub fn op_element_asgn(
        &self,
        receiver: NodeRef<'a>,
        args: &[NodeRef<'a>],
        operator: &str,
        value: NodeRef<'a>,
    ) -> NodeRef<'a> {
        self.node(NodeKind::OpElementAsgn {
            receiver,
            args: self.args_list(args),
            operator: self.name(operator),
            value,
        })
    }

    // ========================================================================
    // Definitions
    // ========================================================================

    pub fn args(&self, args: ArgsNode<'a>) -> &'a ArgsNode<'a> {
        self.arena.alloc(args)
    }

    pub fn no_args(&self) -> &'a ArgsNode<'a> {
        self.args(ArgsNode::default())
    }

    /// A parameter list of required positional names.
    pub fn params(&self, names: &[&str]) -> &'a ArgsNode<'a> {
        let pre: Vec<NodeRef<'a>> = names.iter().map(|name| self.argument(name)).collect();
        self.args(ArgsNode {
            span: self.next_span(),
            pre: self.list(&pre),
            ..ArgsNode::default()
        })
    }

    pub fn argument(&self, name: &str) -> NodeRef<'a> {
        self.node(NodeKind::Argument { name: self.name(name) })
    }

    /// An optional parameter `name = default`.
    pub fn optional(&self, name: &str, default: NodeRef<'a>) -> NodeRef<'a> {
        self.lasgn(name, default)
    }

    pub fn keywords(&self, keywords: &[(&str, Option<NodeRef<'a>>)]) -> &'a [KeywordParam<'a>] {
        self.arena.alloc_slice_fill_iter(
            keywords
                .iter()
                .map(|&(name, default)| KeywordParam { name: self.name(name), default }),
        )
    }

    pub fn rest(&self, name: &str) -> RestParam<'a> {
        RestParam::Named(self.name(name))
    }

    pub fn defn(&self, name: &str, args: &'a ArgsNode<'a>, body: Option<NodeRef<'a>>) -> NodeRef<'a> {
        self.node(NodeKind::Defn {
            name: self.name(name),
            args,
            body,
        })
    }

    pub fn defs(
        &self,
        receiver: NodeRef<'a>,
        name: &str,
        args: &'a ArgsNode<'a>,
        body: Option<NodeRef<'a>>,
    ) -> NodeRef<'a> {
        self.node(NodeKind::Defs {
            receiver,
            name: self.name(name),
            args,
            body,
        })
    }

    pub fn class(&self, name: &str, superclass: Option<NodeRef<'a>>, body: Option<NodeRef<'a>>) -> NodeRef<'a> {
        self.node(NodeKind::Class {
            path: self.const_path(name),
            superclass,
            body,
        })
    }

    pub fn module(&self, name: &str, body: Option<NodeRef<'a>>) -> NodeRef<'a> {
        self.node(NodeKind::Module {
            path: self.const_path(name),
            body,
        })
    }

    pub fn sclass(&self, receiver: NodeRef<'a>, body: Option<NodeRef<'a>>) -> NodeRef<'a> {
        self.node(NodeKind::SClass { receiver, body })
    }

    pub fn alias(&self, new_name: &str, old_name: &str) -> NodeRef<'a> {
        self.node(NodeKind::Alias {
            new_name: self.literal(new_name),
            old_name: self.literal(old_name),
        })
    }

    pub fn undef(&self, name: &str) -> NodeRef<'a> {
        self.node(NodeKind::Undef {
            name: self.literal(name),
        })
    }

    pub fn literal(&self, name: &str) -> NodeRef<'a> {
        self.node(NodeKind::Literal { name: self.name(name) })
    }

    // ========================================================================
    // Heredocs
    // ========================================================================

    /// Scan a heredoc body and build the string node the parser would.
    ///
    /// `opener` is the `<<~EOS` text and `body_start` the offset of the line
    /// after it. Interpolated code is represented by a method call named by
    /// the code text; interpolated variables by reads of that variable.
    pub fn heredoc(&self, opener: &str, source: &str, body_start: usize) -> Result<NodeRef<'a>, HeredocError> {
        let term = HeredocTerm::from_opener(opener)?;
        let body = term.scan(source, body_start)?;
        let command = term.flags().contains(StrFuncFlags::XSTRING);

        if let Some(text) = body.as_plain_str() {
            let value = self.name(&text);
            let kind = if command {
                NodeKind::XStr { value }
            } else {
                NodeKind::Str { value, frozen: false }
            };
            return Ok(self.node_at(body.body_span, kind));
        }

        let parts: Vec<NodeRef<'a>> = body
            .parts
            .iter()
            .map(|part| match part {
                HeredocPart::Literal(text) => self.str(text),
                HeredocPart::Interpolation(span) => {
                    let code = source[span.to_range()].trim();
                    self.node_at(*span, NodeKind::EvStr {
                        body: Some(self.vcall(code)),
                    })
                }
                HeredocPart::Variable(span) => {
                    let name = &source[span.to_range()];
                    let read = if name.starts_with("@@") {
                        self.cvar(name)
                    } else if name.starts_with('@') {
                        self.ivar(name)
                    } else {
                        self.gvar(name)
                    };
                    self.node_at(*span, NodeKind::EvStr { body: Some(read) })
                }
            })
            .collect();
        let parts = self.list(&parts);
        let kind = if command {
            NodeKind::DXStr { parts }
        } else {
            NodeKind::DStr { parts }
        };
        Ok(self.node_at(body.body_span, kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_are_distinct() {
        let arena = Bump::new();
        let b = NodeBuilder::new(&arena);
        let one = b.fixnum(1);
        let two = b.fixnum(2);
        assert_ne!(one.span(), two.span());
    }

    #[test]
    fn test_build_in_parse_arena() {
        let arena = ParseArena::new();
        let b = NodeBuilder::in_arena(&arena);
        let node = b.lasgn("total", b.fixnum(0));
        assert_eq!(node.kind.name(), "LocalAsgn");
        assert!(arena.allocated_bytes() > 0);
    }

    #[test]
    fn test_newline_copies_kind() {
        let arena = Bump::new();
        let b = NodeBuilder::new(&arena);
        let call = b.fcall("puts", &[b.str("hi")]);
        let stmt = b.newline_at(12, call);
        assert!(stmt.is_newline());
        assert!(!call.is_newline());
        assert_eq!(stmt.span().start, 12);
        assert_eq!(stmt.kind.name(), "FCall");
    }

    #[test]
    fn test_rescue_clauses_keep_source_order() {
        let arena = Bump::new();
        let b = NodeBuilder::new(&arena);
        let first = b.const_("ArgumentError");
        let second = b.const_("TypeError");
        let chain = b
            .rescue_clauses(&[(Some(first), None), (Some(second), None)])
            .unwrap();
        let names: Vec<&str> = chain
            .iter()
            .map(|clause| match clause.exceptions.map(|e| &e.kind) {
                Some(NodeKind::Const { name }) => *name,
                _ => "?",
            })
            .collect();
        assert_eq!(names, vec!["ArgumentError", "TypeError"]);
    }

    #[test]
    fn test_heredoc_with_interpolation() {
        let arena = Bump::new();
        let b = NodeBuilder::with_offset(&arena, 1000);
        let source = "Hello #{name}!\nEOS\n";
        let node = b.heredoc("<<EOS", source, 0).unwrap();
        let NodeKind::DStr { parts } = &node.kind else {
            panic!("expected DStr, got {}", node.kind.name());
        };
        assert_eq!(parts.len(), 3);
        match &parts[1].kind {
            NodeKind::EvStr { body: Some(body) } => {
                assert!(matches!(body.kind, NodeKind::VCall { name: "name" }));
            }
            other => panic!("expected EvStr, got {}", other.name()),
        }
    }

    #[test]
    fn test_plain_heredoc_is_str() {
        let arena = Bump::new();
        let b = NodeBuilder::new(&arena);
        let node = b.heredoc("<<~EOS", "  a\n  b\nEOS\n", 0).unwrap();
        assert!(matches!(node.kind, NodeKind::Str { value: "a\nb\n", .. }));
    }
}
