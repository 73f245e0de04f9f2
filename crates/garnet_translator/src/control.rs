//! Conditionals, loops, `case` and the non-local exits.

use crate::calls::BlockArg;
use crate::definitions::BlockSpec;
use crate::translator::BodyTranslator;
use garnet_ast::{ArgsNode, NodeRef, WhenClause};
use garnet_core::text::TextSpan;
use garnet_diagnostics::{messages, TranslateError, TranslateResult};
use garnet_optree::{CallFlags, CoreModule, Literal, LoopKind, OpKind, OpNode, ReturnId};
use garnet_scope::FrameKind;

impl<'cx> BodyTranslator<'cx> {
    // ========================================================================
    // Conditionals
    // ========================================================================

    /// A line-start `if` marks its condition instead of itself, so the line
    /// is stepped before the branch is chosen.
    pub(crate) fn translate_if<'a>(
        &mut self,
        condition: NodeRef<'a>,
        then_body: Option<NodeRef<'a>>,
        else_body: Option<NodeRef<'a>>,
        span: TextSpan,
        line_start: bool,
    ) -> TranslateResult<OpNode> {
        let mut condition = self.translate(condition)?;
        if line_start {
            condition = self.mark_line_start(condition, span);
        }
        let then_body = then_body.map(|node| self.translate(node)).transpose()?;
        let else_body = else_body.map(|node| self.translate(node)).transpose()?;
        let op = match (then_body, else_body) {
            (Some(then_body), Some(else_body)) => OpNode::if_else(condition, then_body, else_body),
            (Some(then_body), None) => OpNode::new(OpKind::If {
                condition: condition.boxed(),
                then_body: then_body.boxed(),
            }),
            (None, Some(else_body)) => OpNode::new(OpKind::Unless {
                condition: condition.boxed(),
                then_body: else_body.boxed(),
            }),
            (None, None) => return Ok(OpNode::sequence(vec![condition, OpNode::nil()]).ensure_span(span)),
        };
        Ok(op.at(span))
    }

    // ========================================================================
    // Loops
    // ========================================================================

    /// `while`/`until`. The loop catches breaks tagged with its own id, so a
    /// `break` in the body leaves this loop and no enclosing one.
    pub(crate) fn translate_while<'a>(
        &mut self,
        condition: NodeRef<'a>,
        body: Option<NodeRef<'a>>,
        evaluate_at_start: bool,
        is_until: bool,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let mut condition = self.translate(condition)?;
        if is_until {
            condition = OpNode::not(condition);
        }

        let break_id = self.cx.env.allocate_break_id();
        let saved_break = self.cx.env.frame_mut(self.frame).break_id.replace(break_id);
        let body = self.with_flags(
            |flags| flags.while_loop = true,
            |t| t.with_marker(None, |t| t.translate_or_nil(body, span)),
        );
        self.cx.env.frame_mut(self.frame).break_id = saved_break;
        let body = body?;

        let kind = if evaluate_at_start {
            LoopKind::TestFirst
        } else {
            LoopKind::TestAfter
        };
        let loop_node = OpNode::new(OpKind::While {
            kind,
            condition: condition.boxed(),
            body: body.boxed(),
        });
        Ok(OpNode::new(OpKind::CatchBreak {
            break_id,
            is_while: true,
            body: loop_node.boxed(),
        })
        .at(span))
    }

    /// `for var in iter; body; end` is `iter.each { |temp| var = temp; body }`
    /// where the block declares nothing of its own: `var` and every local
    /// assigned in the body belong to the enclosing scope.
    pub(crate) fn translate_for<'a>(
        &mut self,
        var: NodeRef<'a>,
        iter: NodeRef<'a>,
        body: Option<NodeRef<'a>>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let receiver = self.translate(iter)?;
        let no_params = ArgsNode::default();
        let spec = BlockSpec {
            span,
            args: &no_params,
            body,
            locals: &[],
            for_var: Some(var),
        };
        self.with_flags(
            |flags| flags.for_statement = true,
            |t| {
                t.finish_call(
                    receiver,
                    "each",
                    Vec::new(),
                    false,
                    BlockArg::Synthetic(spec),
                    CallFlags::NONE,
                    span,
                )
            },
        )
    }

    // ========================================================================
    // case
    // ========================================================================

    /// `case` becomes a chain of conditionals built from the last `when`
    /// outwards. With a subject, the subject is evaluated once into a
    /// temporary and each pattern is tested with `pattern === subject`.
    pub(crate) fn translate_case<'a>(
        &mut self,
        subject: Option<NodeRef<'a>>,
        whens: &[WhenClause<'a>],
        else_body: Option<NodeRef<'a>>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let Some(subject) = subject else {
            let mut arms = Vec::with_capacity(whens.len());
            for when in whens {
                // `when *list` with no subject is true when any element is.
                let condition = self.translate(when.expression)?;
                let condition = if when.splat {
                    let internal = OpNode::object(Literal::CoreModule(CoreModule::Internal)).at(when.span);
                    self.make_call(internal, "any_truthy?", vec![condition], CallFlags::IGNORE_VISIBILITY)
                        .at(when.span)
                } else {
                    condition
                };
                let body = self.translate_or_nil(when.body, when.span)?;
                arms.push((condition, body));
            }
            let otherwise = self.translate_or_nil(else_body, span)?;
            return Ok(chain_arms(arms, otherwise).ensure_span(span));
        };

        let subject = self.translate(subject)?;
        let temp = self.cx.env.allocate_local_temp(self.frame, "case");

        let mut arms = Vec::with_capacity(whens.len());
        for when in whens {
            let pattern = self.translate(when.expression)?;
            let condition = if when.splat {
                let internal = OpNode::object(Literal::CoreModule(CoreModule::Internal)).at(when.span);
                self.make_call(
                    internal,
                    "when_splat",
                    vec![pattern, OpNode::read_local(temp)],
                    CallFlags::IGNORE_VISIBILITY,
                )
            } else {
                self.make_call(pattern, "===", vec![OpNode::read_local(temp)], CallFlags::IGNORE_VISIBILITY)
            };
            let condition = condition.at(when.span);
            let body = self.translate_or_nil(when.body, when.span)?;
            arms.push((condition, body));
        }
        let otherwise = self.translate_or_nil(else_body, span)?;
        let chain = chain_arms(arms, otherwise);
        Ok(OpNode::sequence(vec![OpNode::write_local(temp, subject), chain]).ensure_span(span))
    }

    // ========================================================================
    // Non-local exits
    // ========================================================================

    fn in_block(&self) -> bool {
        self.cx.env.frame(self.frame).is_block()
    }

    pub(crate) fn translate_break<'a>(&mut self, value: Option<NodeRef<'a>>, span: TextSpan) -> TranslateResult<OpNode> {
        let break_id = match self.cx.env.frame(self.frame).break_id {
            Some(id) if self.in_block() || self.flags.while_loop => id,
            _ => return Err(TranslateError::syntax(&messages::INVALID_BREAK, &[], span)),
        };
        let value = self.translate_or_nil(value, span)?;
        Ok(OpNode::new(OpKind::Break {
            break_id,
            ignore_marker: self.flags.while_loop,
            value: value.boxed(),
        })
        .at(span))
    }

    pub(crate) fn translate_next<'a>(&mut self, value: Option<NodeRef<'a>>, span: TextSpan) -> TranslateResult<OpNode> {
        if !self.in_block() && !self.flags.while_loop {
            return Err(TranslateError::syntax(&messages::INVALID_NEXT, &[], span));
        }
        let value = self.with_flags(
            |flags| flags.next_expression = true,
            |t| t.translate_or_nil(value, span),
        )?;
        Ok(OpNode::new(OpKind::Next(value.boxed())).at(span))
    }

    pub(crate) fn translate_redo(&mut self, span: TextSpan) -> TranslateResult<OpNode> {
        if !self.in_block() && !self.flags.while_loop {
            return Err(TranslateError::syntax(&messages::INVALID_REDO, &[], span));
        }
        Ok(OpNode::new(OpKind::Redo).at(span))
    }

    /// `retry` restarts the body of the rescue it appears in.
    pub(crate) fn translate_retry(&mut self, span: TextSpan) -> TranslateResult<OpNode> {
        if !self.flags.in_rescue && !self.in_block() && !self.flags.while_loop {
            return Err(TranslateError::syntax(&messages::INVALID_RETRY, &[], span));
        }
        Ok(OpNode::new(OpKind::Retry).at(span))
    }

    /// `return` targets the frame's return id: the method's for a proc, the
    /// lambda's own inside a lambda.
    pub(crate) fn translate_return<'a>(&mut self, value: Option<NodeRef<'a>>, span: TextSpan) -> TranslateResult<OpNode> {
        let frame = self.cx.env.frame(self.frame);
        let return_id = frame.return_id.unwrap_or(ReturnId(0));
        let local = frame.kind != FrameKind::Block;
        let value = self.translate_or_nil(value, span)?;
        Ok(OpNode::new(OpKind::Return {
            return_id,
            local,
            value: value.boxed(),
        })
        .at(span))
    }
}

/// Fold `(condition, body)` arms into nested conditionals, last arm
/// innermost.
fn chain_arms(arms: Vec<(OpNode, OpNode)>, otherwise: OpNode) -> OpNode {
    arms.into_iter()
        .rev()
        .fold(otherwise, |else_body, (condition, then_body)| {
            OpNode::if_else(condition, then_body, else_body)
        })
}
