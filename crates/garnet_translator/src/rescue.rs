//! `begin ... rescue ... else ... end`.

use crate::translator::BodyTranslator;
use garnet_ast::{NodeKind, NodeRef, RescueClause};
use garnet_core::text::TextSpan;
use garnet_diagnostics::{messages, TranslateError, TranslateResult};
use garnet_optree::{OpKind, OpNode, RescueClause as OpRescueClause, RescueKind};
use std::collections::VecDeque;

/// One entry of a rescue clause's exception list still to be classified.
enum PendingException<'a> {
    List(NodeRef<'a>),
    /// The second half of `rescue A, *list`: splatted.
    SplatOf(NodeRef<'a>),
    /// The trailing element of `rescue *list, A`.
    ArrayOf(NodeRef<'a>),
}

impl<'cx> BodyTranslator<'cx> {
    pub(crate) fn translate_rescue<'a>(
        &mut self,
        body: Option<NodeRef<'a>>,
        rescue: Option<&'a RescueClause<'a>>,
        else_body: Option<NodeRef<'a>>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let body = self.translate_or_nil(body, span)?;
        let can_omit_backtrace = self.cx.options.backtraces_omit_unused && rescue.is_some_and(rescue_ignores_backtrace);

        let mut rescues = Vec::new();
        for clause in rescue.into_iter().flat_map(RescueClause::iter) {
            match clause.exceptions {
                Some(exceptions) => self.translate_rescue_list(exceptions, clause, span, &mut rescues)?,
                None => {
                    let body = self.translate_clause_body(clause, span)?;
                    rescues.push(OpRescueClause {
                        kind: RescueKind::Any,
                        body,
                    });
                }
            }
        }

        let else_body = else_body.map(|node| self.translate(node)).transpose()?;
        Ok(OpNode::new(OpKind::Try {
            body: OpNode::new(OpKind::ExceptionTranslating(body.boxed())).boxed(),
            rescues,
            else_body: else_body.map(OpNode::boxed),
            can_omit_backtrace,
        })
        .at(span))
    }

    /// Flatten an exception list into clauses. `rescue A, *b, C` arrives as
    /// nested concatenations; each list or splat part becomes its own clause
    /// sharing the same body.
    fn translate_rescue_list<'a>(
        &mut self,
        exceptions: NodeRef<'a>,
        clause: &'a RescueClause<'a>,
        span: TextSpan,
        rescues: &mut Vec<OpRescueClause>,
    ) -> TranslateResult<()> {
        let mut pending = VecDeque::new();
        pending.push_front(PendingException::List(exceptions));

        while let Some(item) = pending.pop_front() {
            let kind = match item {
                PendingException::SplatOf(node) => RescueKind::Splat(self.translate(node)?),
                PendingException::ArrayOf(node) => RescueKind::Classes(vec![self.translate(node)?]),
                PendingException::List(node) => match &node.kind {
                    NodeKind::Array { elements } => RescueKind::Classes(self.translate_list(elements)?),
                    NodeKind::Splat { value } => RescueKind::Splat(self.translate(value)?),
                    NodeKind::ArgsCat { first, second } => {
                        pending.push_front(PendingException::SplatOf(*second));
                        pending.push_front(PendingException::List(*first));
                        continue;
                    }
                    NodeKind::ArgsPush { first, second } => {
                        pending.push_front(PendingException::ArrayOf(*second));
                        pending.push_front(PendingException::List(*first));
                        continue;
                    }
                    other => {
                        return Err(TranslateError::unsupported(
                            &messages::UNSUPPORTED_RESCUE_LIST_0,
                            &[other.name()],
                            node.span(),
                        ))
                    }
                },
            };
            let body = self.translate_clause_body(clause, span)?;
            rescues.push(OpRescueClause { kind, body });
        }
        Ok(())
    }

    fn translate_clause_body<'a>(&mut self, clause: &'a RescueClause<'a>, span: TextSpan) -> TranslateResult<OpNode> {
        self.with_flags(
            |flags| flags.in_rescue = true,
            |t| t.translate_or_nil(clause.body, span),
        )
    }
}

/// A backtrace can be skipped when a single rescue clause cannot observe
/// it: its body is absent or side-effect free, and is not `$!`.
fn rescue_ignores_backtrace(first: &RescueClause<'_>) -> bool {
    if first.next.is_some() {
        return false;
    }
    match first.body {
        None => true,
        Some(body) => body.is_side_effect_free() && !body.is_global_read("$!"),
    }
}
