//! Calls, argument lists, blocks passed to calls, `super` and `yield`.

use crate::definitions::BlockSpec;
use crate::translator::BodyTranslator;
use crate::METHOD_BLOCK_NAME;
use garnet_ast::{ArgsNode, NodeKind, NodeRef};
use garnet_core::text::TextSpan;
use garnet_diagnostics::{messages, TranslateError, TranslateResult};
use garnet_optree::{
    BreakId, CallFlags, CallNode, CoreModule, DefinitionKind, Literal, LocalSlot, OpKind, OpNode,
    ProcKind, SplatNilBehavior, SuperCall,
};

/// Where a call's block comes from.
pub(crate) enum BlockArg<'a, 'n> {
    None,
    /// An `Iter` literal, a `BlockPass`, or any other expression.
    Node(NodeRef<'a>),
    /// A block built by the translator itself.
    Synthetic(BlockSpec<'a, 'n>),
}

impl<'a, 'n> BlockArg<'a, 'n> {
    pub(crate) fn from_iter(iter: Option<NodeRef<'a>>) -> Self {
        match iter {
            Some(node) => BlockArg::Node(node),
            None => BlockArg::None,
        }
    }
}

/// A translated block argument. A literal block also yields the break id
/// and frame marker the call site must wrap itself in.
struct TranslatedBlock {
    value: Option<OpNode>,
    literal: Option<(BreakId, LocalSlot)>,
}

impl<'cx> BodyTranslator<'cx> {
    pub(crate) fn make_call(
        &self,
        receiver: OpNode,
        name: &str,
        args: Vec<OpNode>,
        flags: CallFlags,
    ) -> OpNode {
        OpNode::new(OpKind::Call(Box::new(CallNode {
            receiver,
            name: self.cx.intern(name),
            args,
            block: None,
            flags,
        })))
    }

    // ========================================================================
    // Call forms
    // ========================================================================

    pub(crate) fn translate_call<'a>(
        &mut self,
        receiver: NodeRef<'a>,
        name: &str,
        args: Option<NodeRef<'a>>,
        iter: Option<NodeRef<'a>>,
        lazy: bool,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        if name == "freeze" && args.is_none() && iter.is_none() {
            if let NodeKind::Str { value, .. } = receiver.kind {
                return Ok(OpNode::new(OpKind::DefinedWrapper {
                    definition: DefinitionKind::Method,
                    child: OpNode::frozen_string(value).boxed(),
                })
                .at(span));
            }
        }

        match receiver.kind {
            NodeKind::Const { name: "GarnetPrimitive" } => {
                return self.translate_invoke_primitive(name, args, span);
            }
            NodeKind::Const { name: "Garnet" } => {
                if let Some(op) = self.translate_internal_call(name, iter, span)? {
                    return Ok(op);
                }
            }
            NodeKind::VCall { name: "undefined" } if name == "equal?" && self.cx.is_core() => {
                let value = match args.map(|a| &a.kind) {
                    Some(NodeKind::Array { elements }) if elements.len() == 1 => {
                        self.translate(elements[0])?
                    }
                    _ => {
                        let kind = args.map_or("none", |a| a.kind.name());
                        return Err(TranslateError::argument_shape(
                            &messages::UNKNOWN_ARGUMENT_NODE_0,
                            &[kind],
                            span,
                        ));
                    }
                };
                return Ok(OpNode::new(OpKind::IsNotProvided(value.boxed())).at(span));
            }
            _ => {}
        }

        let receiver = self.translate(receiver)?;
        let flags = if lazy {
            CallFlags::SAFE_NAVIGATION
        } else {
            CallFlags::NONE
        };
        self.translate_call_node(receiver, name, args, BlockArg::from_iter(iter), flags, span)
    }

    /// A call with an implicit self receiver. Private methods are callable.
    pub(crate) fn translate_fcall<'a>(
        &mut self,
        name: &str,
        args: Option<NodeRef<'a>>,
        iter: Option<NodeRef<'a>>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        self.translate_call_node(
            OpNode::self_value(),
            name,
            args,
            BlockArg::from_iter(iter),
            CallFlags::IGNORE_VISIBILITY,
            span,
        )
    }

    pub(crate) fn translate_vcall(&mut self, name: &str, span: TextSpan) -> OpNode {
        if name == "undefined" && self.cx.is_core() {
            return OpNode::object(Literal::NotProvided).at(span);
        }
        let flags = CallFlags::IGNORE_VISIBILITY | CallFlags::VCALL;
        self.make_call(OpNode::self_value(), name, Vec::new(), flags).at(span)
    }

    /// `recv.name = value` and `recv[i] = value`. Private setters are
    /// callable on an explicit `self`.
    pub(crate) fn translate_attr_assign<'a>(
        &mut self,
        receiver: NodeRef<'a>,
        name: &str,
        args: Option<NodeRef<'a>>,
        lazy: bool,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let mut flags = CallFlags::ATTR_ASSIGN;
        if matches!(receiver.kind, NodeKind::SelfRef) {
            flags |= CallFlags::IGNORE_VISIBILITY;
        }
        if lazy {
            flags |= CallFlags::SAFE_NAVIGATION;
        }
        let receiver = self.translate(receiver)?;
        self.translate_call_node(receiver, name, args, BlockArg::None, flags, span)
    }

    /// `GarnetPrimitive.name(args)`: a direct primitive invocation, only in
    /// core sources.
    fn translate_invoke_primitive<'a>(
        &mut self,
        name: &str,
        args: Option<NodeRef<'a>>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        if !self.cx.is_core() {
            return Err(TranslateError::internal_form(
                &messages::_0_IS_ONLY_AVAILABLE_IN_CORE_SOURCES,
                &["GarnetPrimitive"],
                span,
            ));
        }
        let (args, splatted) = self.translate_arguments(args, span)?;
        if splatted {
            return Err(TranslateError::argument_shape(
                &messages::UNKNOWN_ARGUMENT_NODE_0,
                &["Splat"],
                span,
            ));
        }
        Ok(OpNode::new(OpKind::InvokePrimitive {
            name: self.cx.intern(name),
            args,
        })
        .at(span))
    }

    /// Calls on the `Garnet` module the translator expands in place. Other
    /// methods are ordinary calls.
    fn translate_internal_call<'a>(
        &mut self,
        name: &str,
        iter: Option<NodeRef<'a>>,
        span: TextSpan,
    ) -> TranslateResult<Option<OpNode>> {
        match name {
            "privately" => {
                let block = match iter.map(|i| &i.kind) {
                    Some(NodeKind::Iter(block)) => *block,
                    _ => {
                        return Err(TranslateError::internal_form(
                            &messages::_0_EXPECTS_A_BLOCK,
                            &["Garnet.privately"],
                            span,
                        ))
                    }
                };
                let body = self.with_flags(
                    |flags| flags.privately = true,
                    |t| t.translate_or_nil(block.body, span),
                )?;
                Ok(Some(body))
            }
            "single_block_arg" => Ok(Some(OpNode::new(OpKind::SingleBlockArg).at(span))),
            "check_frozen" => Ok(Some(
                OpNode::new(OpKind::RaiseIfFrozen(OpNode::self_value().boxed())).at(span),
            )),
            _ => Ok(None),
        }
    }

    // ========================================================================
    // Arguments
    // ========================================================================

    /// Classify an argument list: a plain list, or one splatted array.
    pub(crate) fn translate_arguments<'a>(
        &mut self,
        args: Option<NodeRef<'a>>,
        span: TextSpan,
    ) -> TranslateResult<(Vec<OpNode>, bool)> {
        let Some(args) = args else {
            return Ok((Vec::new(), false));
        };
        match &args.kind {
            NodeKind::Array { elements } => Ok((self.translate_list(elements)?, false)),
            NodeKind::Splat { .. } | NodeKind::ArgsCat { .. } | NodeKind::ArgsPush { .. } => {
                let mut arguments = vec![self.translate(args)?];
                if let Some(OpKind::SplatCast { copy, .. }) = arguments.last_mut().map(|a| &mut a.kind) {
                    *copy = false;
                }
                Ok((arguments, true))
            }
            other => Err(TranslateError::argument_shape(
                &messages::UNKNOWN_ARGUMENT_NODE_0,
                &[other.name()],
                span.union(&args.span()),
            )),
        }
    }

    /// `[*a, *b]`: the list part followed by the splatted part. Nested
    /// concatenations are flattened.
    pub(crate) fn translate_args_cat<'a>(
        &mut self,
        first: NodeRef<'a>,
        second: NodeRef<'a>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let mut pending = vec![second];
        let mut head = first;
        while let NodeKind::ArgsCat { first, second } = head.kind {
            pending.push(second);
            head = first;
        }
        let mut parts = vec![self.translate(head)?];
        for splatted in pending.into_iter().rev() {
            let value = self.translate(splatted)?;
            parts.push(OpNode::new(OpKind::SplatCast {
                nil_behavior: SplatNilBehavior::Convert,
                use_to_ary: false,
                copy: true,
                child: value.boxed(),
            }));
        }
        Ok(OpNode::new(OpKind::ArrayConcat(parts)).at(span))
    }

    /// `[*a, b]`: a copy of the list with one element appended.
    pub(crate) fn translate_args_push<'a>(
        &mut self,
        first: NodeRef<'a>,
        second: NodeRef<'a>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let array = self.translate(first)?;
        let value = self.translate(second)?;
        Ok(OpNode::new(OpKind::ArrayAppendOne {
            array: OpNode::new(OpKind::ArrayDup(array.boxed())).boxed(),
            value: value.boxed(),
        })
        .at(span))
    }

    // ========================================================================
    // Call assembly
    // ========================================================================

    pub(crate) fn translate_call_node<'a, 'n>(
        &mut self,
        receiver: OpNode,
        name: &str,
        args: Option<NodeRef<'a>>,
        block: BlockArg<'a, 'n>,
        flags: CallFlags,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let (arguments, splatted) = self.translate_arguments(args, span)?;
        self.finish_call(receiver, name, arguments, splatted, block, flags, span)
    }

    /// Build the call node and, for a literal block, the frame marker and
    /// break catch around it.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn finish_call<'a, 'n>(
        &mut self,
        receiver: OpNode,
        name: &str,
        args: Vec<OpNode>,
        splatted: bool,
        block: BlockArg<'a, 'n>,
        mut flags: CallFlags,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        if splatted {
            flags |= CallFlags::SPLATTED;
        }
        if self.flags.privately {
            flags |= CallFlags::IGNORE_VISIBILITY;
        }
        let block = self.translate_block_arg(block)?;
        let call = OpNode::new(OpKind::Call(Box::new(CallNode {
            receiver,
            name: self.cx.intern(name),
            args,
            block: block.value,
            flags,
        })))
        .at(span);
        Ok(wrap_literal_block(call, block.literal))
    }

    fn translate_block_arg<'a, 'n>(&mut self, block: BlockArg<'a, 'n>) -> TranslateResult<TranslatedBlock> {
        let spec = match block {
            BlockArg::None => {
                return Ok(TranslatedBlock {
                    value: None,
                    literal: None,
                })
            }
            BlockArg::Node(node) => match &node.kind {
                NodeKind::Iter(block) => BlockSpec::literal(block),
                NodeKind::BlockPass { body } => {
                    let value = self.translate(body)?;
                    return Ok(TranslatedBlock {
                        value: Some(OpNode::new(OpKind::ToProc(value.boxed())).at(node.span())),
                        literal: None,
                    });
                }
                _ => {
                    return Ok(TranslatedBlock {
                        value: Some(self.translate(node)?),
                        literal: None,
                    })
                }
            },
            BlockArg::Synthetic(spec) => spec,
        };
        let marker = self
            .cx
            .env
            .allocate_local_temp(self.frame, "frame_on_stack_marker");
        let (definition, break_id) =
            self.with_marker(Some(marker), |t| t.translate_block(spec, ProcKind::Proc))?;
        Ok(TranslatedBlock {
            value: Some(definition),
            literal: Some((break_id, marker)),
        })
    }

    // ========================================================================
    // super, yield, END
    // ========================================================================

    pub(crate) fn translate_super<'a>(
        &mut self,
        args: Option<NodeRef<'a>>,
        iter: Option<NodeRef<'a>>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let (args, splatted) = self.translate_arguments(args, span)?;
        let block = self.translate_block_arg(BlockArg::from_iter(iter))?;
        let call = OpNode::new(OpKind::Super(Box::new(SuperCall {
            args,
            block: block.value,
            splatted,
            implicit: false,
        })))
        .at(span);
        Ok(wrap_literal_block(call, block.literal))
    }

    /// `super` without arguments re-reads the enclosing method's parameter
    /// slots and forwards its block unless given a new one. Outside a method
    /// it passes nothing.
    pub(crate) fn translate_zsuper<'a>(
        &mut self,
        iter: Option<NodeRef<'a>>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let method = self.cx.env.method_frame(self.frame);
        let parameters = self.cx.env.frame(method).parameters.clone().unwrap_or_default();

        let mut leading: Vec<OpNode> = Vec::new();
        for name in parameters.pre.iter().chain(parameters.optional.iter()) {
            leading.push(OpNode::read_local(self.resolve_or_declare(*name)));
        }
        let post: Vec<OpNode> = parameters
            .post
            .iter()
            .map(|name| OpNode::read_local(self.resolve_or_declare(*name)))
            .collect();

        let keywords = if parameters.keywords.is_empty() && parameters.keyword_rest.is_none() {
            None
        } else {
            let pairs: Vec<(OpNode, OpNode)> = parameters
                .keywords
                .iter()
                .map(|name| {
                    let value = OpNode::read_local(self.resolve_or_declare(*name));
                    (OpNode::symbol(*name), value)
                })
                .collect();
            let mut hash = OpNode::new(OpKind::HashLiteral(pairs));
            if let Some(rest) = parameters.keyword_rest {
                let rest = OpNode::read_local(self.resolve_or_declare(rest));
                hash = OpNode::new(OpKind::ConcatHashLiteral(vec![
                    hash,
                    OpNode::new(OpKind::HashCast(rest.boxed())),
                ]));
            }
            Some(hash)
        };

        let (args, splatted) = match parameters.rest {
            Some(rest) => {
                let rest = OpNode::read_local(self.resolve_or_declare(rest));
                let mut parts = vec![
                    OpNode::new(OpKind::ArrayLiteral(leading)),
                    OpNode::new(OpKind::SplatCast {
                        nil_behavior: SplatNilBehavior::Convert,
                        use_to_ary: false,
                        copy: false,
                        child: rest.boxed(),
                    }),
                ];
                if !post.is_empty() {
                    parts.push(OpNode::new(OpKind::ArrayLiteral(post)));
                }
                if let Some(keywords) = keywords {
                    parts.push(OpNode::new(OpKind::ArrayLiteral(vec![keywords])));
                }
                (vec![OpNode::new(OpKind::ArrayConcat(parts))], true)
            }
            None => {
                let mut args = leading;
                args.extend(post);
                args.extend(keywords);
                (args, false)
            }
        };

        let block = match iter {
            Some(_) => self.translate_block_arg(BlockArg::from_iter(iter))?,
            None => TranslatedBlock {
                value: self.method_block_read(),
                literal: None,
            },
        };
        let call = OpNode::new(OpKind::Super(Box::new(SuperCall {
            args,
            block: block.value,
            splatted,
            implicit: true,
        })))
        .at(span);
        Ok(wrap_literal_block(call, block.literal))
    }

    /// A read of the enclosing method's block, if there is a method.
    fn method_block_read(&mut self) -> Option<OpNode> {
        let name = self.cx.intern(METHOD_BLOCK_NAME);
        self.cx
            .env
            .resolve_local(self.frame, name)
            .map(OpNode::read_local)
    }

    pub(crate) fn translate_yield<'a>(
        &mut self,
        args: Option<NodeRef<'a>>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let (args, splatted) = match args {
            Some(single)
                if !matches!(
                    single.kind,
                    NodeKind::Array { .. }
                        | NodeKind::Splat { .. }
                        | NodeKind::ArgsCat { .. }
                        | NodeKind::ArgsPush { .. }
                ) =>
            {
                (vec![self.translate(single)?], false)
            }
            _ => self.translate_arguments(args, span)?,
        };
        let block = self.method_block_read().unwrap_or_else(OpNode::nil);
        Ok(OpNode::new(OpKind::Yield {
            args,
            splatted,
            block: block.boxed(),
        })
        .at(span))
    }

    /// `END { body }` registers the body with `at_exit` on the kernel
    /// operations module.
    pub(crate) fn translate_post_exe<'a>(
        &mut self,
        body: Option<NodeRef<'a>>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let no_params = ArgsNode::default();
        let spec = BlockSpec {
            span,
            args: &no_params,
            body,
            locals: &[],
            for_var: None,
        };
        let receiver = OpNode::object(Literal::CoreModule(CoreModule::KernelOperations));
        self.finish_call(
            receiver,
            "at_exit",
            vec![OpNode::boolean(true)],
            false,
            BlockArg::Synthetic(spec),
            CallFlags::IGNORE_VISIBILITY,
            span,
        )
    }
}

/// Wrap a call made with a literal block: the block's frame marker is set
/// while the call runs, and breaks from the block end the call.
fn wrap_literal_block(call: OpNode, literal: Option<(BreakId, LocalSlot)>) -> OpNode {
    match literal {
        Some((break_id, marker)) => {
            let on_stack = OpNode::new(OpKind::FrameOnStack {
                marker,
                child: call.boxed(),
            });
            OpNode::new(OpKind::CatchBreak {
                break_id,
                is_while: false,
                body: on_stack.boxed(),
            })
        }
        None => call,
    }
}
