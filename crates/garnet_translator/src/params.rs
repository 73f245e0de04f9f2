//! Argument loading: the prelude that moves incoming arguments into the
//! parameter slots of a method, block or lambda.

use crate::translator::BodyTranslator;
use crate::METHOD_BLOCK_NAME;
use garnet_ast::{ArgsNode, NodeKind, NodeRef, RestParam};
use garnet_diagnostics::{messages, TranslateError, TranslateResult};
use garnet_optree::{
    Arity, LocalSlot, MissingArgumentBehavior, Name, OpKind, OpNode, SplatNilBehavior, UnitKind,
};
use garnet_scope::MethodParameters;

/// Where positional parameters read their values from.
#[derive(Clone, Copy)]
enum PositionalSource {
    /// The call's arguments.
    Arguments,
    /// Elements of one array argument a proc auto-splats.
    Array(LocalSlot),
}

/// The parameter shape of `args`. `|a,|` has no rest parameter even though
/// it destructures.
pub fn arity_of(args: &ArgsNode<'_>, keyword_names: Vec<Name>, required_keywords: u32) -> Arity {
    Arity {
        required: args.pre.len() as u32,
        optional: args.optional.len() as u32,
        rest: matches!(args.rest, Some(RestParam::Named(_) | RestParam::Anonymous)),
        post: args.post.len() as u32,
        keywords: keyword_names,
        required_keywords,
        keyword_rest: args.keyword_rest.is_some(),
        block: args.block.is_some(),
    }
}

impl<'cx> BodyTranslator<'cx> {
    /// Translate a parameter list into the unit's arity and its prelude.
    /// Methods also record their parameter slots for `super` without
    /// arguments.
    pub(crate) fn translate_parameters<'a>(
        &mut self,
        args: &ArgsNode<'a>,
        kind: UnitKind,
    ) -> TranslateResult<(Arity, Vec<OpNode>)> {
        let mut keywords: Vec<Name> = Vec::with_capacity(args.keywords.len());
        keywords.extend(args.keywords.iter().filter(|k| k.default.is_none()).map(|k| self.cx.intern(k.name)));
        let required_keywords = keywords.len() as u32;
        keywords.extend(args.keywords.iter().filter(|k| k.default.is_some()).map(|k| self.cx.intern(k.name)));
        let arity = arity_of(args, keywords, required_keywords);

        let mut prelude = Vec::new();
        if kind != UnitKind::Proc {
            prelude.push(OpNode::new(OpKind::CheckArity(arity.clone())));
        }
        if kind == UnitKind::Method {
            let name = self.cx.intern(METHOD_BLOCK_NAME);
            let slot = self.cx.env.declare_local(self.frame, name);
            prelude.push(OpNode::write_local(
                slot,
                OpNode::new(OpKind::ReadBlockArgument { as_proc: false }),
            ));
        }

        let mut parameters = MethodParameters::default();
        if kind == UnitKind::Proc && should_consider_destructuring(args) {
            let direct = self.translate_positional(args, kind, PositionalSource::Arguments, &mut parameters)?;
            let array = self.cx.env.allocate_local_temp(self.frame, "destructure");
            let mut spread = vec![OpNode::write_local(
                array,
                OpNode::new(OpKind::SplatCast {
                    nil_behavior: SplatNilBehavior::ArrayWithNil,
                    use_to_ary: true,
                    copy: false,
                    child: OpNode::new(OpKind::ReadPreArgument {
                        index: 0,
                        missing: MissingArgumentBehavior::Nil,
                    })
                    .boxed(),
                }),
            )];
            spread.extend(self.translate_positional(args, kind, PositionalSource::Array(array), &mut MethodParameters::default())?);
            prelude.push(OpNode::if_else(
                OpNode::new(OpKind::ShouldDestructure {
                    required: arity.required_positional(),
                }),
                OpNode::sequence(spread),
                OpNode::sequence(direct),
            ));
        } else {
            let positional = self.translate_positional(args, kind, PositionalSource::Arguments, &mut parameters)?;
            prelude.extend(positional);
        }

        for keyword in args.keywords {
            let name = self.cx.intern(keyword.name);
            let default = keyword.default.map(|d| self.translate(d)).transpose()?;
            let slot = self.cx.env.declare_local(self.frame, name);
            prelude.push(OpNode::write_local(
                slot,
                OpNode::new(OpKind::ReadKeywordArgument {
                    name,
                    default: default.map(OpNode::boxed),
                }),
            ));
            parameters.keywords.push(name);
        }
        if let Some(rest) = args.keyword_rest {
            let excluded = args.keywords.iter().map(|k| self.cx.intern(k.name)).collect();
            let slot = self.rest_slot(rest, "kwrest");
            prelude.push(OpNode::write_local(
                slot,
                OpNode::new(OpKind::ReadKeywordRestArguments { excluded }),
            ));
            parameters.keyword_rest = Some(slot.name);
        }
        if let Some(block) = args.block {
            let name = self.cx.intern(block);
            let slot = self.cx.env.declare_local(self.frame, name);
            prelude.push(OpNode::write_local(
                slot,
                OpNode::new(OpKind::ReadBlockArgument { as_proc: true }),
            ));
            parameters.block = Some(name);
        }

        if kind == UnitKind::Method {
            self.cx.env.frame_mut(self.frame).parameters = Some(parameters);
        }
        Ok((arity, prelude))
    }

    /// Bindings for the leading, optional, rest and trailing parameters.
    fn translate_positional<'a>(
        &mut self,
        args: &ArgsNode<'a>,
        kind: UnitKind,
        source: PositionalSource,
        parameters: &mut MethodParameters,
    ) -> TranslateResult<Vec<OpNode>> {
        let missing = if kind == UnitKind::Proc {
            MissingArgumentBehavior::Nil
        } else {
            MissingArgumentBehavior::Runtime
        };
        let pre = args.pre.len() as u32;
        let optional = args.optional.len() as u32;
        let post = args.post.len() as u32;
        let mut bindings = Vec::new();

        for (index, param) in args.pre.iter().enumerate() {
            let index = index as u32;
            let value = match source {
                PositionalSource::Arguments => OpNode::new(OpKind::ReadPreArgument { index, missing }),
                PositionalSource::Array(array) => array_index(array, index as i32),
            };
            bindings.push(self.bind_parameter(param, value, &mut parameters.pre)?);
        }

        for (offset, param) in args.optional.iter().enumerate() {
            let offset = offset as u32;
            let (name, default) = match &param.kind {
                NodeKind::LocalAsgn { name, value, .. } | NodeKind::DAsgn { name, value, .. } => (*name, *value),
                other => {
                    return Err(TranslateError::argument_shape(
                        &messages::UNKNOWN_ARGUMENT_NODE_0,
                        &[other.name()],
                        param.span(),
                    ))
                }
            };
            let default = match default {
                Some(default) => self.translate(default)?,
                None => OpNode::nil(),
            };
            let index = pre + offset;
            let value = match source {
                PositionalSource::Arguments => OpNode::new(OpKind::ReadOptionalArgument {
                    index,
                    minimum: pre + post + offset + 1,
                    default: default.boxed(),
                }),
                PositionalSource::Array(array) => OpNode::if_else(
                    OpNode::new(OpKind::ArrayIsAtLeastAsLargeAs {
                        array: OpNode::read_local(array).boxed(),
                        size: index + 1,
                    }),
                    array_index(array, index as i32),
                    default,
                ),
            };
            let name = self.cx.intern(name);
            let slot = self.cx.env.declare_local(self.frame, name);
            bindings.push(OpNode::write_local(slot, value).at(param.span()));
            parameters.optional.push(name);
        }

        if let Some(rest) = args.rest.filter(|r| *r != RestParam::ExcessComma) {
            let value = match source {
                PositionalSource::Arguments => OpNode::new(OpKind::ReadRestArguments {
                    start: pre + optional,
                    post,
                }),
                PositionalSource::Array(array) => OpNode::new(OpKind::ArraySlice {
                    array: OpNode::read_local(array).boxed(),
                    from: (pre + optional) as i32,
                    to: -(post as i32),
                }),
            };
            let slot = self.rest_slot(rest, "rest");
            bindings.push(OpNode::write_local(slot, value));
            parameters.rest = Some(slot.name);
        }

        for (n, param) in args.post.iter().enumerate() {
            let n = n as u32;
            let value = match source {
                PositionalSource::Arguments => OpNode::new(OpKind::ReadPostArgument {
                    from_end: post - n,
                    pre,
                    optional,
                }),
                PositionalSource::Array(array) => OpNode::if_else(
                    OpNode::new(OpKind::ArrayIsAtLeastAsLargeAs {
                        array: OpNode::read_local(array).boxed(),
                        size: pre + post,
                    }),
                    array_index(array, -((post - n) as i32)),
                    array_index(array, (pre + n) as i32),
                ),
            };
            bindings.push(self.bind_parameter(param, value, &mut parameters.post)?);
        }

        Ok(bindings)
    }

    /// Bind one required parameter: a plain name, or a destructuring
    /// pattern fed through the multiple-assignment builder.
    fn bind_parameter<'a>(
        &mut self,
        param: NodeRef<'a>,
        value: OpNode,
        names: &mut Vec<Name>,
    ) -> TranslateResult<OpNode> {
        match &param.kind {
            NodeKind::Argument { name } => {
                let name = self.cx.intern(name);
                let slot = self.cx.env.declare_local(self.frame, name);
                names.push(name);
                Ok(OpNode::write_local(slot, value).at(param.span()))
            }
            NodeKind::MultipleAsgn(pattern) => {
                let temp = self.cx.env.allocate_local_temp(self.frame, "destructure");
                names.push(temp.name);
                let destructure = self.translate_masgn(pattern, OpNode::read_local(temp), false)?;
                Ok(OpNode::sequence(vec![OpNode::write_local(temp, value), destructure]))
            }
            _ => self.assign_target(param, value),
        }
    }

    /// The slot of a rest parameter; an anonymous `*` gets a temporary so
    /// `super` can still forward it.
    fn rest_slot(&mut self, rest: RestParam<'_>, prefix: &str) -> LocalSlot {
        match rest {
            RestParam::Named(name) => {
                let name = self.cx.intern(name);
                self.cx.env.declare_local(self.frame, name)
            }
            RestParam::Anonymous | RestParam::ExcessComma => self.cx.env.allocate_local_temp(self.frame, prefix),
        }
    }
}

/// A proc spreads a single array argument over its parameters when it has
/// more than one positional parameter, a rest next to another positional
/// one, or a trailing comma.
fn should_consider_destructuring(args: &ArgsNode<'_>) -> bool {
    let positional = args.pre.len() + args.post.len() + args.optional.len();
    match args.rest {
        Some(RestParam::ExcessComma) => true,
        Some(_) => positional > 0,
        None => positional > 1,
    }
}

fn array_index(array: LocalSlot, index: i32) -> OpNode {
    OpNode::new(OpKind::ArrayIndex {
        array: OpNode::read_local(array).boxed(),
        index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use garnet_ast::ParseNode;
    use garnet_core::text::TextSpan;

    #[test]
    fn test_destructuring_shapes() {
        let a = ParseNode::new(TextSpan::new(0, 1), NodeKind::Argument { name: "a" });
        let b = ParseNode::new(TextSpan::new(2, 1), NodeKind::Argument { name: "b" });
        let one = [&a];
        let two = [&a, &b];

        let single = ArgsNode {
            pre: &one,
            ..ArgsNode::default()
        };
        assert!(!should_consider_destructuring(&single));

        let pair = ArgsNode {
            pre: &two,
            ..ArgsNode::default()
        };
        assert!(should_consider_destructuring(&pair));

        let trailing_comma = ArgsNode {
            pre: &one,
            rest: Some(RestParam::ExcessComma),
            ..ArgsNode::default()
        };
        assert!(should_consider_destructuring(&trailing_comma));
        assert!(!arity_of(&trailing_comma, Vec::new(), 0).rest);

        let only_rest = ArgsNode {
            rest: Some(RestParam::Named("r")),
            ..ArgsNode::default()
        };
        assert!(!should_consider_destructuring(&only_rest));
        assert_eq!(arity_of(&only_rest, Vec::new(), 0).arity_number(), -1);
    }
}
