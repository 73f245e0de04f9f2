//! The body translator: dispatch over parse nodes plus the simple forms.
//!
//! One `BodyTranslator` translates one lexical body (script, method, block,
//! module body) into operation nodes. Nested bodies get their own translator
//! over a child frame of the same [`UnitContext`]. The larger desugarings
//! live in sibling modules as further `impl` blocks:
//! - `calls`: calls, arguments, blocks passed to calls, super and yield
//! - `assign`: locals, multiple assignment and operator assignment
//! - `control`: conditionals, loops, case, non-local exits
//! - `rescue`: rescue and ensure
//! - `definitions`: methods, blocks, lambdas, classes and modules
//! - `params`: argument loading preludes
//! - `literals`: strings, numbers, regexps, hashes and ranges

use crate::context::{TranslatorFlags, UnitContext};
use garnet_ast::{ConstPath, NodeKind, NodeRef};
use garnet_core::text::TextSpan;
use garnet_diagnostics::{messages, TranslateError, TranslateResult};
use garnet_optree::{Literal, LocalSlot, OpKind, OpNode};
use garnet_scope::FrameId;
use tracing::info;

pub struct BodyTranslator<'cx> {
    pub(crate) cx: &'cx mut UnitContext,
    /// The frame this body's locals live in.
    pub(crate) frame: FrameId,
    pub(crate) flags: TranslatorFlags,
    /// Markers for the literal blocks being translated, innermost last.
    /// `None` stands for a position where no marker applies (lambdas and
    /// loop bodies).
    pub(crate) frame_on_stack_markers: Vec<Option<LocalSlot>>,
}

impl<'cx> BodyTranslator<'cx> {
    pub fn new(cx: &'cx mut UnitContext, frame: FrameId) -> Self {
        Self {
            cx,
            frame,
            flags: TranslatorFlags::default(),
            frame_on_stack_markers: Vec::new(),
        }
    }

    /// A translator for a nested body over `frame`, with default flags.
    pub(crate) fn child(&mut self, frame: FrameId) -> BodyTranslator<'_> {
        BodyTranslator::new(&mut *self.cx, frame)
    }

    pub fn frame(&self) -> FrameId {
        self.frame
    }

    pub fn flags(&self) -> TranslatorFlags {
        self.flags
    }

    /// Run `f` with the flags changed by `update`, restoring them afterwards
    /// on both the success and the error path.
    pub fn with_flags<T>(
        &mut self,
        update: impl FnOnce(&mut TranslatorFlags),
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let saved = self.flags;
        update(&mut self.flags);
        let result = f(self);
        self.flags = saved;
        result
    }

    /// Run `f` with `marker` on top of the frame-on-stack marker stack.
    pub(crate) fn with_marker<T>(
        &mut self,
        marker: Option<LocalSlot>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        self.frame_on_stack_markers.push(marker);
        let result = f(self);
        self.frame_on_stack_markers.pop();
        result
    }

    pub(crate) fn current_marker(&self) -> Option<LocalSlot> {
        self.frame_on_stack_markers.last().copied().flatten()
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Translate one parse node. Unknown shapes abort the unit.
    pub fn translate<'a>(&mut self, node: NodeRef<'a>) -> TranslateResult<OpNode> {
        let span = node.span();
        let op = match &node.kind {
            // -- Literals --
            NodeKind::Fixnum(value) => self.translate_fixnum(*value, span),
            NodeKind::Bignum { digits } => self.translate_bignum(digits, span)?,
            NodeKind::Float(value) => OpNode::new(OpKind::Float(*value)).at(span),
            NodeKind::Rational {
                numerator,
                denominator,
            } => self.translate_rational(numerator, denominator, span)?,
            NodeKind::Complex { number } => self.translate_complex(number, span)?,
            NodeKind::Str { value, frozen } => self.translate_str(value, *frozen, span),
            NodeKind::XStr { value } => self.translate_xstr(value, span),
            NodeKind::DStr { parts } => self.translate_dstr(parts, span)?,
            NodeKind::DSymbol { parts } => self.translate_dsymbol(parts, span)?,
            NodeKind::DXStr { parts } => self.translate_dxstr(parts, span)?,
            NodeKind::DRegexp { parts, options } => self.translate_dregexp(parts, *options, span)?,
            NodeKind::EvStr { body } => self.translate_evstr(*body, span)?,
            NodeKind::Symbol { name } => OpNode::symbol(self.cx.intern(name)).at(span),
            NodeKind::Regexp { source, options } => self.translate_regexp(source, *options, span),
            NodeKind::True => OpNode::boolean(true).at(span),
            NodeKind::False => OpNode::boolean(false).at(span),
            NodeKind::Nil => OpNode::nil().at(span),
            NodeKind::SelfRef => OpNode::self_value().at(span),
            NodeKind::ZArray => OpNode::new(OpKind::ArrayLiteral(Vec::new())).at(span),
            NodeKind::Encoding { name } => {
                OpNode::object(Literal::Encoding((*name).into())).at(span)
            }
            NodeKind::Array { elements } => {
                let values = self.translate_list(elements)?;
                OpNode::new(OpKind::ArrayLiteral(values)).at(span)
            }
            NodeKind::Hash { pairs } => self.translate_hash(pairs, span)?,
            NodeKind::Dot {
                begin,
                end,
                exclusive,
            } => self.translate_range(*begin, *end, *exclusive, span)?,
            NodeKind::Flip {
                begin,
                end,
                exclusive,
            } => self.translate_flip_flop(begin, end, *exclusive, span)?,
            NodeKind::NthRef { n } => OpNode::new(OpKind::ReadNthMatch(*n)).at(span),
            NodeKind::BackRef { kind } => {
                let name = self.cx.intern(&format!("${}", kind));
                OpNode::new(OpKind::ReadGlobal(name)).at(span)
            }
            NodeKind::Match { regexp } => self.translate_match(regexp, span)?,
            NodeKind::Match2 { receiver, value } => self.translate_match2(receiver, value, span)?,
            NodeKind::Match3 { receiver, value } => {
                let receiver = self.translate(receiver)?;
                let value = self.translate(value)?;
                let name = self.cx.intern("=~");
                OpNode::call(receiver, name, vec![value]).at(span)
            }
            NodeKind::Defined { expression } => {
                let child = self.translate(expression)?;
                OpNode::new(OpKind::Defined(child.boxed())).at(span)
            }

            // -- Variables --
            NodeKind::LocalVar { name, .. } => self.translate_local_read(name, span),
            NodeKind::DVar { name, depth } => self.translate_dvar_read(name, *depth, span),
            NodeKind::LocalAsgn { name, value, .. } | NodeKind::DAsgn { name, value, .. } => {
                self.translate_local_assignment(name, *value, span)?
            }
            NodeKind::InstVar { name } => {
                OpNode::new(OpKind::ReadInstanceVariable(self.cx.intern(name))).at(span)
            }
            NodeKind::InstAsgn { name, value } => {
                let value = self.translate_value_or_dead(*value, "instance variable assignment")?;
                OpNode::new(OpKind::WriteInstanceVariable {
                    name: self.cx.intern(name),
                    value: value.boxed(),
                })
                .at(span)
            }
            NodeKind::ClassVar { name } => {
                let lexical_scope = self.class_variable_scope("class variable", span);
                OpNode::new(OpKind::ReadClassVariable {
                    lexical_scope: lexical_scope.boxed(),
                    name: self.cx.intern(name),
                })
                .at(span)
            }
            NodeKind::ClassVarAsgn { name, value } => {
                let lexical_scope = self.class_variable_scope("class variable assignment", span);
                let value = self.translate_value_or_dead(*value, "class variable assignment")?;
                OpNode::new(OpKind::WriteClassVariable {
                    lexical_scope: lexical_scope.boxed(),
                    name: self.cx.intern(name),
                    value: value.boxed(),
                })
                .at(span)
            }
            NodeKind::GlobalVar { name } => {
                OpNode::new(OpKind::ReadGlobal(self.cx.intern(name))).at(span)
            }
            NodeKind::GlobalAsgn { name, value } => {
                let value = self.translate_value_or_dead(*value, "global variable assignment")?;
                OpNode::new(OpKind::WriteGlobal {
                    name: self.cx.intern(name),
                    value: value.boxed(),
                })
                .at(span)
            }
            NodeKind::Const { name } => self.translate_const(name, span),
            NodeKind::Colon2 { left, name } => {
                let module = self.translate(left)?;
                OpNode::new(OpKind::ReadConstant {
                    module: module.boxed(),
                    name: self.cx.intern(name),
                })
                .at(span)
            }
            NodeKind::Colon3 { name } => OpNode::new(OpKind::ReadConstant {
                module: OpNode::object(Literal::ObjectClass).boxed(),
                name: self.cx.intern(name),
            })
            .at(span),
            NodeKind::ConstDecl { path, value } => {
                let module = self.const_path_module(path, span)?;
                let value = self.translate_value_or_dead(*value, "constant declaration")?;
                OpNode::new(OpKind::WriteConstant {
                    module: module.boxed(),
                    name: self.cx.intern(path.name()),
                    value: value.boxed(),
                })
                .at(span)
            }

            // -- Calls --
            NodeKind::Call {
                receiver,
                name,
                args,
                iter,
                lazy,
            } => self.translate_call(receiver, name, *args, *iter, *lazy, span)?,
            NodeKind::FCall { name, args, iter } => self.translate_fcall(name, *args, *iter, span)?,
            NodeKind::VCall { name } => self.translate_vcall(name, span),
            NodeKind::AttrAssign {
                receiver,
                name,
                args,
                lazy,
            } => self.translate_attr_assign(receiver, name, *args, *lazy, span)?,
            NodeKind::Super { args, iter } => self.translate_super(*args, *iter, span)?,
            NodeKind::ZSuper { iter } => self.translate_zsuper(*iter, span)?,
            NodeKind::Yield { args } => self.translate_yield(*args, span)?,
            NodeKind::BlockPass { body } => {
                let value = self.translate(body)?;
                OpNode::new(OpKind::ToProc(value.boxed())).at(span)
            }
            NodeKind::Lambda(block) => self.translate_lambda(block)?,
            NodeKind::Splat { value } => {
                let value = self.translate(value)?;
                OpNode::new(OpKind::SplatCast {
                    nil_behavior: garnet_optree::SplatNilBehavior::Convert,
                    use_to_ary: false,
                    copy: true,
                    child: value.boxed(),
                })
                .at(span)
            }
            NodeKind::ArgsCat { first, second } => self.translate_args_cat(first, second, span)?,
            NodeKind::ArgsPush { first, second } => self.translate_args_push(first, second, span)?,
            NodeKind::SValue { value } => self.translate(value)?,
            NodeKind::Star => OpNode::nil().at(span),

            // -- Structure --
            NodeKind::Begin { body } => self.translate_or_nil(*body, span)?,
            NodeKind::Block { children } => {
                let statements = self.translate_list(children)?;
                OpNode::sequence(statements).ensure_span(span)
            }
            NodeKind::PreExe { body } => self.translate_or_nil(*body, span)?,
            NodeKind::PostExe { body } => self.translate_post_exe(*body, span)?,

            // -- Control flow --
            NodeKind::If {
                condition,
                then_body,
                else_body,
            } => return self.translate_if(condition, *then_body, *else_body, span, node.is_newline()),
            NodeKind::And { first, second } => {
                let left = self.translate(first)?;
                let right = self.translate(second)?;
                OpNode::new(OpKind::And {
                    left: left.boxed(),
                    right: right.boxed(),
                })
                .at(span)
            }
            NodeKind::Or { first, second } => {
                let left = self.translate(first)?;
                let right = self.translate(second)?;
                OpNode::new(OpKind::Or {
                    left: left.boxed(),
                    right: right.boxed(),
                })
                .at(span)
            }
            NodeKind::While {
                condition,
                body,
                evaluate_at_start,
            } => self.translate_while(condition, *body, *evaluate_at_start, false, span)?,
            NodeKind::Until {
                condition,
                body,
                evaluate_at_start,
            } => self.translate_while(condition, *body, *evaluate_at_start, true, span)?,
            NodeKind::For { var, iter, body } => self.translate_for(var, iter, *body, span)?,
            NodeKind::Case {
                subject,
                whens,
                else_body,
            } => self.translate_case(*subject, whens, *else_body, span)?,
            NodeKind::Break { value } => self.translate_break(*value, span)?,
            NodeKind::Next { value } => self.translate_next(*value, span)?,
            NodeKind::Redo => self.translate_redo(span)?,
            NodeKind::Retry => self.translate_retry(span)?,
            NodeKind::Return { value } => self.translate_return(*value, span)?,
            NodeKind::Rescue {
                body,
                rescue,
                else_body,
            } => self.translate_rescue(*body, *rescue, *else_body, span)?,
            NodeKind::Ensure { body, ensure } => {
                let body = self.translate_or_nil(*body, span)?;
                let ensure = self.translate_or_nil(*ensure, span)?;
                OpNode::new(OpKind::Ensure {
                    body: body.boxed(),
                    ensure: ensure.boxed(),
                })
                .at(span)
            }

            // -- Operator assignment --
            NodeKind::OpAsgn {
                receiver,
                attribute,
                operator,
                value,
                lazy,
            } => self.translate_op_asgn(receiver, attribute, operator, value, *lazy, span)?,
            NodeKind::OpAsgnAnd { first, second } => self.translate_op_asgn_and(first, second, span)?,
            NodeKind::OpAsgnOr { first, second } => self.translate_op_asgn_or(first, second, span)?,
            NodeKind::OpElementAsgn {
                receiver,
                args,
                operator,
                value,
            } => self.translate_op_element_asgn(receiver, *args, operator, value, span)?,
            NodeKind::OpAsgnConstDecl {
                first,
                operator,
                second,
            } => self.translate_op_asgn_const_decl(first, operator, second, span)?,
            NodeKind::MultipleAsgn(masgn) => self.translate_multiple_assignment(masgn)?,

            // -- Definitions --
            NodeKind::Defn { name, args, body } => self.translate_defn(name, args, *body, span)?,
            NodeKind::Defs {
                receiver,
                name,
                args,
                body,
            } => self.translate_defs(receiver, name, args, *body, span)?,
            NodeKind::Class {
                path,
                superclass,
                body,
            } => self.translate_class(path, *superclass, *body, span)?,
            NodeKind::Module { path, body } => self.translate_module(path, *body, span)?,
            NodeKind::SClass { receiver, body } => self.translate_sclass(receiver, *body, span)?,
            NodeKind::Alias { new_name, old_name } => self.translate_alias(new_name, old_name, span)?,
            NodeKind::VAlias { new_name, old_name } => OpNode::new(OpKind::AliasGlobal {
                new_name: self.cx.intern(new_name),
                old_name: self.cx.intern(old_name),
            })
            .at(span),
            NodeKind::Undef { name } => self.translate_undef(name, span)?,

            NodeKind::Iter(_) | NodeKind::Literal { .. } | NodeKind::Argument { .. } => {
                return Err(self.unsupported_node(node));
            }
        };
        Ok(self.add_newline_if_needed(node, op))
    }

    /// Translate `node`, or produce nil carrying `span` when absent.
    pub(crate) fn translate_or_nil<'a>(
        &mut self,
        node: Option<NodeRef<'a>>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        match node {
            Some(node) => self.translate(node),
            None => Ok(OpNode::nil().at(span)),
        }
    }

    pub(crate) fn translate_list<'a>(&mut self, nodes: &[NodeRef<'a>]) -> TranslateResult<Vec<OpNode>> {
        nodes.iter().map(|node| self.translate(node)).collect()
    }

    /// The value of an assignment node; the grammar leaves it out only for
    /// targets of multiple assignment, which never evaluate it.
    fn translate_value_or_dead<'a>(
        &mut self,
        value: Option<NodeRef<'a>>,
        what: &'static str,
    ) -> TranslateResult<OpNode> {
        match value {
            Some(value) => self.translate(value),
            None => Ok(OpNode::new(OpKind::Dead(what))),
        }
    }

    pub(crate) fn unsupported_node<'a>(&self, node: NodeRef<'a>) -> TranslateError {
        TranslateError::unsupported(&messages::UNSUPPORTED_NODE_0, &[node.kind.name()], node.span())
    }

    // ========================================================================
    // Newlines and coverage
    // ========================================================================

    /// Mark `op` as a line start when `node` is one. With coverage enabled
    /// the line is also registered with the unit.
    pub(crate) fn add_newline_if_needed<'a>(&mut self, node: NodeRef<'a>, op: OpNode) -> OpNode {
        if !node.is_newline() {
            return op;
        }
        match op.encapsulating_span() {
            Some(span) => self.mark_line_start(op, span),
            None => op,
        }
    }

    /// Flag `op` as a line start, registering the line of `line_span` for
    /// coverage when enabled.
    pub(crate) fn mark_line_start(&mut self, mut op: OpNode, line_span: TextSpan) -> OpNode {
        op.mark_newline();
        if self.cx.options.coverage {
            op.mark_coverage_line();
            let line = self.cx.line_of(line_span);
            self.cx.register_coverage_line(line);
        }
        op
    }

    // ========================================================================
    // Constants and class variables
    // ========================================================================

    fn translate_const(&mut self, name: &str, span: TextSpan) -> OpNode {
        let name = self.cx.intern(name);
        if self.cx.env.is_dynamic_constant_lookup() {
            self.log_dynamic_lookup("dynamic constant lookup", span);
            OpNode::new(OpKind::ReadConstantWithDynamicScope(name)).at(span)
        } else {
            OpNode::new(OpKind::ReadConstantWithLexicalScope {
                lexical_scope: self.cx.env.current_lexical_scope(),
                name,
            })
            .at(span)
        }
    }

    /// The module a constant path names as the definition target.
    pub(crate) fn const_path_module<'a>(
        &mut self,
        path: &ConstPath<'a>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        Ok(match path {
            ConstPath::Implicit { .. } => {
                if self.cx.env.is_dynamic_constant_lookup() {
                    self.log_dynamic_lookup("dynamic constant definition", span);
                    OpNode::new(OpKind::DynamicLexicalScopeModule)
                } else {
                    OpNode::new(OpKind::LexicalScopeModule(self.cx.env.current_lexical_scope()))
                }
            }
            ConstPath::Scoped { left, .. } => self.translate(left)?,
            ConstPath::TopLevel { .. } => OpNode::object(Literal::ObjectClass),
        })
    }

    /// The lexical scope a class variable access resolves against.
    pub(crate) fn class_variable_scope(&mut self, kind: &str, span: TextSpan) -> OpNode {
        if self.cx.env.is_dynamic_constant_lookup() {
            self.log_dynamic_lookup(kind, span);
            OpNode::new(OpKind::DynamicLexicalScope)
        } else {
            OpNode::object(Literal::LexicalScope(self.cx.env.current_lexical_scope()))
        }
    }

    pub(crate) fn log_dynamic_lookup(&self, what: &str, span: TextSpan) {
        if self.cx.options.log_dynamic_constant_lookup {
            let location = format!("{}:{}", self.cx.file_name, self.cx.line_of(span));
            info!(
                "{}: {}",
                what,
                messages::DYNAMIC_CONSTANT_LOOKUP_AT_0.render(&[&location])
            );
        }
    }
}
