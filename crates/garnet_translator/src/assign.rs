//! Local variables, assignment targets, multiple assignment and operator
//! assignment.

use crate::calls::BlockArg;
use crate::translator::BodyTranslator;
use garnet_ast::{MultipleAsgn, NodeKind, NodeRef};
use garnet_core::text::TextSpan;
use garnet_diagnostics::{messages, TranslateError, TranslateResult};
use garnet_optree::{
    CallFlags, DefinitionKind, LocalSlot, Name, OpKind, OpNode, SplatNilBehavior,
};

impl<'cx> BodyTranslator<'cx> {
    // ========================================================================
    // Locals
    // ========================================================================

    /// Resolve `name` from the current frame, declaring it here if no
    /// visible frame has it.
    pub(crate) fn resolve_or_declare(&mut self, name: Name) -> LocalSlot {
        match self.cx.env.resolve_local(self.frame, name) {
            Some(slot) => slot,
            None => self.cx.env.declare_local(self.frame, name),
        }
    }

    /// The slot an assignment to `name` writes. Frames that never assign in
    /// a parent declare directly; otherwise an existing visible local wins,
    /// and a new one goes to the nearest frame with its own scope.
    pub(crate) fn local_assignment_slot(&mut self, name: Name) -> LocalSlot {
        let env = &mut self.cx.env;
        if env.frame(self.frame).never_assign_in_parent_scope {
            return env.declare_local(self.frame, name);
        }
        if let Some(slot) = env.resolve_local(self.frame, name) {
            return slot;
        }
        let declare_in = env.nearest_own_scope(self.frame);
        env.declare_local(declare_in, name);
        match env.resolve_local(self.frame, name) {
            Some(slot) => slot,
            None => env.declare_local(self.frame, name),
        }
    }

    /// A read of a local the parser saw declared. Names it never declared
    /// (destructured parameters) are declared on first use.
    pub(crate) fn translate_local_read(&mut self, name: &str, span: TextSpan) -> OpNode {
        let name = self.cx.intern(name);
        OpNode::read_local(self.resolve_or_declare(name)).at(span)
    }

    /// A read from inside a block; an undeclared name is declared `depth`
    /// frames out, where the parser placed it.
    pub(crate) fn translate_dvar_read(&mut self, name: &str, depth: u32, span: TextSpan) -> OpNode {
        let name = self.cx.intern(name);
        let slot = match self.cx.env.resolve_local(self.frame, name) {
            Some(slot) => slot,
            None => {
                let declare_in = self.cx.env.ancestor(self.frame, depth);
                self.cx.env.declare_local(declare_in, name);
                self.resolve_or_declare(name)
            }
        };
        OpNode::read_local(slot).at(span)
    }

    pub(crate) fn translate_local_assignment<'a>(
        &mut self,
        name: &str,
        value: Option<NodeRef<'a>>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let name = self.cx.intern(name);
        let slot = self.local_assignment_slot(name);
        let value = match value {
            Some(value) => self.translate(value)?,
            None => OpNode::new(OpKind::Dead("local variable assignment")),
        };
        Ok(OpNode::write_local(slot, value).at(span))
    }

    // ========================================================================
    // Assignment targets
    // ========================================================================

    /// Assign an already translated `value` to a target node of a multiple
    /// assignment, a `for` variable or a destructured parameter.
    pub(crate) fn assign_target<'a>(&mut self, target: NodeRef<'a>, value: OpNode) -> TranslateResult<OpNode> {
        let span = target.span();
        let op = match &target.kind {
            NodeKind::LocalAsgn { name, .. } | NodeKind::DAsgn { name, .. } => {
                let name = self.cx.intern(name);
                OpNode::write_local(self.local_assignment_slot(name), value).at(span)
            }
            NodeKind::Argument { name } => {
                let name = self.cx.intern(name);
                OpNode::write_local(self.cx.env.declare_local(self.frame, name), value).at(span)
            }
            NodeKind::InstAsgn { name, .. } => OpNode::new(OpKind::WriteInstanceVariable {
                name: self.cx.intern(name),
                value: value.boxed(),
            })
            .at(span),
            NodeKind::ClassVarAsgn { name, .. } => {
                let lexical_scope = self.class_variable_scope("class variable assignment", span);
                OpNode::new(OpKind::WriteClassVariable {
                    lexical_scope: lexical_scope.boxed(),
                    name: self.cx.intern(name),
                    value: value.boxed(),
                })
                .at(span)
            }
            NodeKind::GlobalAsgn { name, .. } => OpNode::new(OpKind::WriteGlobal {
                name: self.cx.intern(name),
                value: value.boxed(),
            })
            .at(span),
            NodeKind::ConstDecl { path, .. } => {
                let module = self.const_path_module(path, span)?;
                OpNode::new(OpKind::WriteConstant {
                    module: module.boxed(),
                    name: self.cx.intern(path.name()),
                    value: value.boxed(),
                })
                .at(span)
            }
            NodeKind::AttrAssign {
                receiver,
                name,
                args,
                lazy,
            } => self.assign_attribute(receiver, name, *args, *lazy, value, span)?,
            NodeKind::MultipleAsgn(masgn) => self.translate_masgn(masgn, value, false)?,
            NodeKind::Splat { value: inner } => self.assign_target(inner, value)?,
            NodeKind::Star => value,
            other => {
                return Err(TranslateError::unsupported(
                    &messages::CANNOT_ASSIGN_TO_0,
                    &[other.name()],
                    span,
                ))
            }
        };
        Ok(op)
    }

    /// `recv.name(args..., value)` as an attribute assignment target.
    fn assign_attribute<'a>(
        &mut self,
        receiver: NodeRef<'a>,
        name: &str,
        args: Option<NodeRef<'a>>,
        lazy: bool,
        value: OpNode,
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
        let (arguments, splatted) = match args.map(|a| &a.kind) {
            None => (vec![value], false),
            Some(NodeKind::Array { elements }) => {
                let mut arguments = self.translate_list(elements)?;
                arguments.push(value);
                (arguments, false)
            }
            Some(NodeKind::Splat { .. } | NodeKind::ArgsCat { .. } | NodeKind::ArgsPush { .. }) => {
                let list = self.translate_or_nil(args, span)?;
                let appended = OpNode::new(OpKind::ArrayAppendOne {
                    array: OpNode::new(OpKind::ArrayDup(list.boxed())).boxed(),
                    value: value.boxed(),
                });
                (vec![appended], true)
            }
            Some(other) => {
                return Err(TranslateError::argument_shape(
                    &messages::UNKNOWN_INDEX_ARGUMENT_NODE_0,
                    &[other.name()],
                    span,
                ))
            }
        };
        self.finish_call(receiver, name, arguments, splatted, BlockArg::None, flags, span)
    }

    // ========================================================================
    // Multiple assignment
    // ========================================================================

    pub(crate) fn translate_multiple_assignment<'a>(&mut self, masgn: &MultipleAsgn<'a>) -> TranslateResult<OpNode> {
        let Some(value) = masgn.value else {
            return Err(TranslateError::unsupported(
                &messages::UNSUPPORTED_MULTIPLE_ASSIGNMENT,
                &[],
                masgn.span,
            ));
        };
        let rhs_is_array = matches!(value.kind, NodeKind::Array { .. });
        let rhs = self.translate(value)?;
        self.translate_masgn(masgn, rhs, rhs_is_array)
    }

    /// Bind the targets of `masgn` from the translated right-hand side.
    /// `rhs_is_array` says the source right-hand side was a list literal.
    pub(crate) fn translate_masgn<'a>(
        &mut self,
        masgn: &MultipleAsgn<'a>,
        rhs: OpNode,
        rhs_is_array: bool,
    ) -> TranslateResult<OpNode> {
        let span = masgn.span;
        let pre = masgn.pre;
        let post = masgn.post;

        let same_arity_literal = !pre.is_empty()
            && masgn.rest.is_none()
            && post.is_empty()
            && matches!(&rhs.kind, OpKind::ArrayLiteral(values) if values.len() == pre.len());

        let result = if same_arity_literal {
            self.masgn_parallel(pre, rhs)?
        } else if !pre.is_empty() {
            self.masgn_indexed(pre, masgn.rest, post, rhs, true)?
        } else if post.is_empty() {
            match masgn.rest {
                Some(rest) if matches!(rest.kind, NodeKind::Star) => rhs,
                Some(rest) if rhs_is_array => self.assign_target(rest, rhs)?,
                Some(rest) => self.masgn_rest_only(rest, rhs)?,
                None => {
                    return Err(TranslateError::unsupported(
                        &messages::UNSUPPORTED_MULTIPLE_ASSIGNMENT,
                        &[],
                        span,
                    ))
                }
            }
        } else if masgn.rest.is_some() {
            self.masgn_indexed(pre, masgn.rest, post, rhs, false)?
        } else {
            return Err(TranslateError::unsupported(
                &messages::UNSUPPORTED_MULTIPLE_ASSIGNMENT,
                &[],
                span,
            ));
        };

        Ok(OpNode::new(OpKind::DefinedWrapper {
            definition: DefinitionKind::Assignment,
            child: result.boxed(),
        })
        .at(span))
    }

    /// `a, b = x, y`: every value goes to a temporary before any target is
    /// written, so `a, b = b, a` swaps.
    fn masgn_parallel<'a>(&mut self, pre: &[NodeRef<'a>], rhs: OpNode) -> TranslateResult<OpNode> {
        let OpKind::ArrayLiteral(values) = rhs.kind else {
            return Ok(rhs);
        };
        let mut statements = Vec::with_capacity(values.len() * 2);
        let mut temps = Vec::with_capacity(values.len());
        for value in values {
            let temp = self.cx.env.allocate_local_temp(self.frame, "multi");
            statements.push(OpNode::write_local(temp, value));
            temps.push(temp);
        }
        for (target, temp) in pre.iter().zip(&temps) {
            statements.push(self.assign_target(target, OpNode::read_local(*temp))?);
        }
        let result = temps.into_iter().map(OpNode::read_local).collect();
        Ok(OpNode::new(OpKind::ElidableResult {
            required: OpNode::sequence(statements).boxed(),
            value: OpNode::new(OpKind::ArrayLiteral(result)).boxed(),
        }))
    }

    /// Positional binding from the right-hand side coerced to an array.
    /// Leading targets index from the front, the rest target takes the
    /// middle slice, and trailing targets index from the back when the
    /// array is long enough and from the front otherwise.
    fn masgn_indexed<'a>(
        &mut self,
        pre: &[NodeRef<'a>],
        rest: Option<NodeRef<'a>>,
        post: &[NodeRef<'a>],
        rhs: OpNode,
        use_to_ary: bool,
    ) -> TranslateResult<OpNode> {
        let rhs_temp = self.cx.env.allocate_local_temp(self.frame, "rhs");
        let array_temp = self.cx.env.allocate_local_temp(self.frame, "array");
        let nil_behavior = if self.flags.next_expression {
            SplatNilBehavior::EmptyArray
        } else {
            SplatNilBehavior::ArrayWithNil
        };
        let splat = OpNode::new(OpKind::SplatCast {
            nil_behavior,
            use_to_ary,
            copy: false,
            child: OpNode::read_local(rhs_temp).boxed(),
        });

        let mut statements = vec![
            OpNode::write_local(rhs_temp, rhs),
            OpNode::write_local(array_temp, splat),
        ];
        let pre_count = pre.len() as i32;
        let post_count = post.len() as i32;
        let read_array = || OpNode::read_local(array_temp);

        for (n, target) in pre.iter().enumerate() {
            let element = OpNode::new(OpKind::ArrayIndex {
                array: read_array().boxed(),
                index: n as i32,
            });
            statements.push(self.assign_target(target, element)?);
        }

        if let Some(rest) = rest {
            let slice = OpNode::new(OpKind::ArraySlice {
                array: read_array().boxed(),
                from: pre_count,
                to: -post_count,
            });
            statements.push(self.assign_target(rest, slice)?);
        }

        for (n, target) in post.iter().enumerate() {
            let n = n as i32;
            let from_end = OpNode::new(OpKind::ArrayIndex {
                array: read_array().boxed(),
                index: -(post_count - n),
            });
            let from_front = OpNode::new(OpKind::ArrayIndex {
                array: read_array().boxed(),
                index: pre_count + n,
            });
            let long_enough = OpNode::new(OpKind::ArrayIsAtLeastAsLargeAs {
                array: read_array().boxed(),
                size: (pre_count + post_count) as u32,
            });
            let element = OpNode::if_else(long_enough, from_end, from_front);
            statements.push(self.assign_target(target, element)?);
        }

        Ok(OpNode::new(OpKind::ElidableResult {
            required: OpNode::sequence(statements).boxed(),
            value: OpNode::read_local(rhs_temp).boxed(),
        }))
    }

    /// `*a = value` with a non-literal value.
    fn masgn_rest_only<'a>(&mut self, rest: NodeRef<'a>, rhs: OpNode) -> TranslateResult<OpNode> {
        let default_behavior = if self.flags.next_expression {
            SplatNilBehavior::EmptyArray
        } else {
            SplatNilBehavior::ArrayWithNil
        };
        let (rhs, nil_behavior) = match rhs.kind {
            OpKind::SplatCast { child, .. } if matches!(child.kind, OpKind::Nil) => {
                (*child, SplatNilBehavior::Convert)
            }
            _ => (rhs, default_behavior),
        };
        let rhs_temp = self.cx.env.allocate_local_temp(self.frame, "rhs");
        let splat_temp = self.cx.env.allocate_local_temp(self.frame, "splat");
        let splat = OpNode::new(OpKind::SplatCast {
            nil_behavior,
            use_to_ary: true,
            copy: false,
            child: OpNode::read_local(rhs_temp).boxed(),
        });
        let statements = vec![
            OpNode::write_local(rhs_temp, rhs),
            OpNode::write_local(splat_temp, splat),
            self.assign_target(rest, OpNode::read_local(splat_temp))?,
        ];
        let value = if nil_behavior == SplatNilBehavior::Convert {
            OpNode::read_local(splat_temp)
        } else {
            OpNode::read_local(rhs_temp)
        };
        Ok(OpNode::new(OpKind::ElidableResult {
            required: OpNode::sequence(statements).boxed(),
            value: value.boxed(),
        }))
    }

    // ========================================================================
    // Operator assignment
    // ========================================================================

    /// `a &&= b`
    pub(crate) fn translate_op_asgn_and<'a>(
        &mut self,
        first: NodeRef<'a>,
        second: NodeRef<'a>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let left = self.translate(first)?;
        let right = self.translate(second)?;
        Ok(assignment(logical(Logical::And, left, right)).at(span))
    }

    /// `a ||= b`. Targets that may be undefined are guarded with
    /// `defined?` so reading them cannot raise.
    pub(crate) fn translate_op_asgn_or<'a>(
        &mut self,
        first: NodeRef<'a>,
        second: NodeRef<'a>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let mut left = self.translate(first)?;
        let right = self.translate(second)?;
        if first.needs_definition_check() && !matches!(first.kind, NodeKind::InstVar { .. }) {
            left = guard_defined(left);
        }
        Ok(assignment(logical(Logical::Or, left, right)).at(span))
    }

    /// `A::B op= value`
    pub(crate) fn translate_op_asgn_const_decl<'a>(
        &mut self,
        first: NodeRef<'a>,
        operator: &str,
        second: NodeRef<'a>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let value_node = match &second.kind {
            NodeKind::ConstDecl { value: Some(value), .. } => *value,
            _ => second,
        };
        let left = self.translate(first)?;
        let value = self.translate(value_node)?;
        Ok(match operator {
            "&&" => {
                let write = constant_write(&left, value, span)?;
                assignment(logical(Logical::And, left, write)).at(span)
            }
            "||" => {
                let write = constant_write(&left, value, span)?;
                assignment(logical(Logical::Or, guard_defined(left), write)).at(span)
            }
            _ => {
                let combined = self.make_call(left.clone(), operator, vec![value], CallFlags::IGNORE_VISIBILITY);
                constant_write(&left, combined, span)?.at(span)
            }
        })
    }

    /// `recv.attr op= value`: the receiver is evaluated once into a
    /// temporary, then read back for both the getter and the setter.
    pub(crate) fn translate_op_asgn<'a>(
        &mut self,
        receiver: NodeRef<'a>,
        attribute: &str,
        operator: &str,
        value: NodeRef<'a>,
        lazy: bool,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let mut flags = CallFlags::NONE;
        if matches!(receiver.kind, NodeKind::SelfRef) {
            flags |= CallFlags::IGNORE_VISIBILITY;
        }
        let receiver = self.translate(receiver)?;
        let value = self.translate(value)?;
        let temp = self.cx.env.allocate_local_temp(self.frame, "opassign");
        let setter = format!("{}=", attribute);
        let read = || OpNode::read_local(temp);

        let getter = self.make_call(read(), attribute, Vec::new(), flags);
        let body = match operator {
            "||" | "&&" => {
                let set = self.make_call(read(), &setter, vec![value], flags | CallFlags::ATTR_ASSIGN);
                assignment(logical(Logical::from_operator(operator), getter, set))
            }
            _ => {
                let combined = self.make_call(getter, operator, vec![value], CallFlags::NONE);
                self.make_call(read(), &setter, vec![combined], flags | CallFlags::ATTR_ASSIGN)
            }
        };
        let body = if lazy {
            OpNode::new(OpKind::If {
                condition: OpNode::not(OpNode::new(OpKind::IsNil(read().boxed()))).boxed(),
                then_body: body.boxed(),
            })
        } else {
            body
        };
        Ok(OpNode::sequence(vec![OpNode::write_local(temp, receiver), body]).ensure_span(span))
    }

    /// `recv[args] op= value`: the receiver and every index argument are
    /// evaluated once, in source order, before the element is read.
    pub(crate) fn translate_op_element_asgn<'a>(
        &mut self,
        receiver: NodeRef<'a>,
        args: Option<NodeRef<'a>>,
        operator: &str,
        value: NodeRef<'a>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let receiver = self.translate(receiver)?;
        let receiver_temp = self.cx.env.allocate_local_temp(self.frame, "opelementassign");
        let mut statements = vec![OpNode::write_local(receiver_temp, receiver)];

        let (index_values, splatted) = self.translate_arguments(args, span)?;
        let mut index_temps = Vec::with_capacity(index_values.len());
        for index in index_values {
            let temp = self.cx.env.allocate_local_temp(self.frame, "index");
            statements.push(OpNode::write_local(temp, index));
            index_temps.push(temp);
        }
        let indices = || -> Vec<OpNode> { index_temps.iter().copied().map(OpNode::read_local).collect() };
        let read = || OpNode::read_local(receiver_temp);
        let splat_flag = if splatted { CallFlags::SPLATTED } else { CallFlags::NONE };

        let value = self.translate(value)?;
        let getter = self.make_call(read(), "[]", indices(), splat_flag);
        let setter_args = |value: OpNode| -> Vec<OpNode> {
            if splatted {
                vec![OpNode::new(OpKind::ArrayAppendOne {
                    array: OpNode::new(OpKind::ArrayDup(OpNode::sequence(indices()).boxed())).boxed(),
                    value: value.boxed(),
                })]
            } else {
                let mut args = indices();
                args.push(value);
                args
            }
        };
        let body = match operator {
            "||" | "&&" => {
                let set = self.make_call(read(), "[]=", setter_args(value), splat_flag | CallFlags::ATTR_ASSIGN);
                assignment(logical(Logical::from_operator(operator), getter, set))
            }
            _ => {
                let combined = self.make_call(getter, operator, vec![value], CallFlags::NONE);
                self.make_call(read(), "[]=", setter_args(combined), splat_flag | CallFlags::ATTR_ASSIGN)
            }
        };
        statements.push(body);
        Ok(OpNode::sequence(statements).ensure_span(span))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn assignment(child: OpNode) -> OpNode {
    OpNode::new(OpKind::DefinedWrapper {
        definition: DefinitionKind::Assignment,
        child: child.boxed(),
    })
}

#[derive(Clone, Copy)]
enum Logical {
    And,
    Or,
}

impl Logical {
    fn from_operator(operator: &str) -> Self {
        if operator == "||" {
            Logical::Or
        } else {
            Logical::And
        }
    }
}

fn logical(kind: Logical, left: OpNode, right: OpNode) -> OpNode {
    let (left, right) = (left.boxed(), right.boxed());
    OpNode::new(match kind {
        Logical::And => OpKind::And { left, right },
        Logical::Or => OpKind::Or { left, right },
    })
}

/// `defined?(target) && target`
fn guard_defined(target: OpNode) -> OpNode {
    let defined = OpNode::new(OpKind::Defined(target.clone().boxed()));
    logical(Logical::And, defined, target)
}

/// Turn a constant read into a write of `value` to the same constant.
fn constant_write(read: &OpNode, value: OpNode, span: TextSpan) -> TranslateResult<OpNode> {
    let (module, name) = match &read.kind {
        OpKind::ReadConstant { module, name } => ((**module).clone(), *name),
        OpKind::ReadConstantWithLexicalScope { lexical_scope, name } => {
            (OpNode::new(OpKind::LexicalScopeModule(*lexical_scope)), *name)
        }
        OpKind::ReadConstantWithDynamicScope(name) => (OpNode::new(OpKind::DynamicLexicalScopeModule), *name),
        _ => {
            return Err(TranslateError::unsupported(
                &messages::CANNOT_ASSIGN_TO_0,
                &["operator assignment target"],
                span,
            ))
        }
    };
    Ok(OpNode::new(OpKind::WriteConstant {
        module: module.boxed(),
        name,
        value: value.boxed(),
    }))
}
