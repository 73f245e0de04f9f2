//! Executable units: the program, methods, blocks, lambdas and module
//! bodies, plus `alias` and `undef`.

use crate::context::UnitContext;
use crate::translator::BodyTranslator;
use garnet_ast::{ArgsNode, BlockLiteral, ConstPath, NodeKind, NodeRef};
use garnet_core::text::TextSpan;
use garnet_diagnostics::{messages, TranslateError, TranslateResult};
use garnet_optree::{
    Arity, BlockDefinition, BreakId, ExecutableUnit, Literal, MissingArgumentBehavior, OpKind, OpNode, ProcKind,
    ReturnId, UnitKind,
};
use garnet_scope::{FrameId, FrameKind};

/// A block to translate: a literal `{ |params| ... }`, or one the
/// translator builds itself for `for` and `END`.
pub(crate) struct BlockSpec<'a, 'n> {
    pub span: TextSpan,
    pub args: &'n ArgsNode<'a>,
    pub body: Option<NodeRef<'a>>,
    /// Block-local names to declare up front.
    pub locals: &'n [&'a str],
    /// The loop variable of a `for`, assigned from the block's only
    /// argument.
    pub for_var: Option<NodeRef<'a>>,
}

impl<'a, 'n> BlockSpec<'a, 'n> {
    pub(crate) fn literal(block: &'n BlockLiteral<'a>) -> Self {
        Self {
            span: block.span,
            args: block.args,
            body: block.body,
            locals: block.locals,
            for_var: None,
        }
    }
}

/// Translate a whole script into its top-level unit.
pub fn translate_program<'a>(root: Option<NodeRef<'a>>, cx: &mut UnitContext) -> TranslateResult<ExecutableUnit> {
    let frame = cx.env.root();
    cx.env.frame_mut(frame).method_name = Some("<main>".to_string());
    let return_id = cx.env.frame(frame).return_id.unwrap_or(ReturnId(0));
    let lexical_scope = cx.env.current_lexical_scope();
    let span = root.map(|node| node.span()).unwrap_or_default();

    let mut translator = BodyTranslator::new(cx, frame);
    let body = translator.translate_or_nil(root, span)?;
    let body = OpNode::new(OpKind::CatchReturn {
        return_id,
        body: body.boxed(),
    });
    let body = translator.with_flip_flop_inits(Vec::new(), body);

    let frame_data = cx.env.frame(frame);
    Ok(ExecutableUnit {
        name: "<main>".to_string(),
        kind: UnitKind::TopLevel,
        arity: Arity::NO_ARGUMENTS,
        locals: frame_data.local_names(),
        own_scope: true,
        return_id: Some(return_id),
        break_id: None,
        block_depth: 0,
        lexical_scope,
        needs_declaration_frame: false,
        body,
    })
}

impl<'cx> BodyTranslator<'cx> {
    /// Prepend the flip-flop slot initialisations and `prelude` to a unit
    /// body.
    fn with_flip_flop_inits(&self, prelude: Vec<OpNode>, body: OpNode) -> OpNode {
        let states = &self.cx.env.frame(self.frame).flip_flop_states;
        if states.is_empty() && prelude.is_empty() {
            return body;
        }
        let mut statements: Vec<OpNode> = states
            .iter()
            .map(|slot| OpNode::new(OpKind::InitFlipFlopSlot(*slot)))
            .collect();
        statements.extend(prelude);
        statements.push(body);
        OpNode::sequence(statements)
    }

    fn unit(&self, frame: FrameId, name: String, kind: UnitKind, arity: Arity, body: OpNode) -> ExecutableUnit {
        let frame = self.cx.env.frame(frame);
        ExecutableUnit {
            name,
            kind,
            arity,
            locals: frame.local_names(),
            own_scope: frame.own_scope,
            return_id: frame.return_id,
            break_id: frame.break_id,
            block_depth: frame.block_depth,
            lexical_scope: self.cx.env.current_lexical_scope(),
            needs_declaration_frame: frame.needs_declaration_frame,
            body,
        }
    }

    // ========================================================================
    // Blocks and lambdas
    // ========================================================================

    pub(crate) fn translate_lambda<'a>(&mut self, block: &BlockLiteral<'a>) -> TranslateResult<OpNode> {
        let (definition, _) = self.with_marker(None, |t| t.translate_block(BlockSpec::literal(block), ProcKind::Lambda))?;
        Ok(definition)
    }

    /// Translate a block or lambda body into a `BlockDefinition`.
    ///
    /// A proc shares the enclosing method's return id, so `return` inside it
    /// leaves the method; a lambda gets its own. Both get a fresh break id
    /// that the call site (for a proc) or the lambda itself catches. A `for`
    /// body has no scope of its own and binds its locals one frame out.
    pub(crate) fn translate_block<'a, 'n>(
        &mut self,
        spec: BlockSpec<'a, 'n>,
        kind: ProcKind,
    ) -> TranslateResult<(OpNode, BreakId)> {
        let is_lambda = kind == ProcKind::Lambda;
        let own_scope = is_lambda || !self.flags.for_statement;
        let return_id = if is_lambda {
            Some(self.cx.env.allocate_return_id())
        } else {
            self.cx.env.frame(self.frame).return_id
        };
        let break_id = self.cx.env.allocate_break_id();

        let frame_kind = if is_lambda { FrameKind::Lambda } else { FrameKind::Block };
        let block_frame = self.cx.env.push_frame(Some(self.frame), frame_kind);
        {
            let frame = self.cx.env.frame_mut(block_frame);
            frame.own_scope = own_scope;
            frame.return_id = return_id;
            frame.break_id = Some(break_id);
        }
        for local in spec.locals {
            let name = self.cx.intern(local);
            self.cx.env.declare_local(block_frame, name);
        }
        let marker = if is_lambda { None } else { self.current_marker() };
        let unit_kind = if is_lambda { UnitKind::Lambda } else { UnitKind::Proc };

        let mut child = self.child(block_frame);
        let (arity, prelude) = match spec.for_var {
            Some(var) => child.translate_for_parameter(var)?,
            None => child.translate_parameters(spec.args, unit_kind)?,
        };
        let body = child.translate_or_nil(spec.body, spec.span)?;
        let mut body = OpNode::new(OpKind::CatchNext(body.boxed()));
        if is_lambda {
            body = OpNode::new(OpKind::CatchBreak {
                break_id,
                is_while: false,
                body: OpNode::new(OpKind::CatchReturn {
                    return_id: return_id.unwrap_or(ReturnId(0)),
                    body: body.boxed(),
                })
                .boxed(),
            });
        }
        let body = child.with_flip_flop_inits(prelude, body);

        let frame = child.cx.env.frame(block_frame);
        let name = block_name(frame.block_depth, frame.method_name.as_deref());
        let unit = child.unit(block_frame, name, unit_kind, arity, body);

        let definition = OpNode::new(OpKind::BlockDefinition(Box::new(BlockDefinition {
            kind,
            unit,
            break_id,
            frame_on_stack_marker: marker,
        })))
        .at(spec.span);
        Ok((definition, break_id))
    }

    /// The single parameter of a `for` body: a temporary read from the
    /// first argument, then assigned to the loop variable.
    fn translate_for_parameter<'a>(&mut self, var: NodeRef<'a>) -> TranslateResult<(Arity, Vec<OpNode>)> {
        let name = self.cx.env.allocate_temp_name("for");
        let temp = self.cx.env.declare_local(self.frame, name);
        let read_argument = OpNode::new(OpKind::ReadPreArgument {
            index: 0,
            missing: MissingArgumentBehavior::Nil,
        });
        let assign = self.assign_target(var, OpNode::read_local(temp))?;
        let arity = Arity {
            required: 1,
            ..Arity::NO_ARGUMENTS
        };
        Ok((arity, vec![OpNode::write_local(temp, read_argument), assign]))
    }

    // ========================================================================
    // Methods
    // ========================================================================

    pub(crate) fn translate_defn<'a>(
        &mut self,
        name: &str,
        args: &ArgsNode<'a>,
        body: Option<NodeRef<'a>>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let definee = OpNode::new(OpKind::RaiseIfFrozen(OpNode::new(OpKind::GetDefaultDefinee).boxed()));
        self.translate_method(definee, name, args, body, span)
    }

    pub(crate) fn translate_defs<'a>(
        &mut self,
        receiver: NodeRef<'a>,
        name: &str,
        args: &ArgsNode<'a>,
        body: Option<NodeRef<'a>>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let object = self.translate(receiver)?;
        let definee = OpNode::new(OpKind::SingletonClass(object.boxed())).at(span);
        self.translate_method(definee, name, args, body, span)
    }

    fn translate_method<'a>(
        &mut self,
        definee: OpNode,
        name: &str,
        args: &ArgsNode<'a>,
        body: Option<NodeRef<'a>>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let return_id = self.cx.env.allocate_return_id();
        let method_frame = self.cx.env.push_frame(Some(self.frame), FrameKind::Method);
        {
            let frame = self.cx.env.frame_mut(method_frame);
            frame.return_id = Some(return_id);
            frame.method_name = Some(name.to_string());
        }

        let mut child = self.child(method_frame);
        let (arity, prelude) = child.translate_parameters(args, UnitKind::Method)?;
        let body = child.translate_or_nil(body, span)?;
        let body = OpNode::new(OpKind::CatchReturn {
            return_id,
            body: body.boxed(),
        });
        let body = child.with_flip_flop_inits(prelude, body);
        let unit = child.unit(method_frame, name.to_string(), UnitKind::Method, arity, body);

        Ok(OpNode::new(OpKind::MethodDefinition {
            definee: definee.boxed(),
            unit: Box::new(unit),
        })
        .at(span))
    }

    // ========================================================================
    // Classes and modules
    // ========================================================================

    pub(crate) fn translate_class<'a>(
        &mut self,
        path: &ConstPath<'a>,
        superclass: Option<NodeRef<'a>>,
        body: Option<NodeRef<'a>>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let lexical_parent = self.const_path_module(path, span)?;
        let superclass = superclass.map(|node| self.translate(node)).transpose()?;
        let definee = OpNode::new(OpKind::DefineClass {
            lexical_parent: lexical_parent.boxed(),
            name: self.cx.intern(path.name()),
            superclass: superclass.map(OpNode::boxed),
        });
        self.open_module(definee, format!("<class:{}>", path.name()), body, span, false)
    }

    pub(crate) fn translate_module<'a>(
        &mut self,
        path: &ConstPath<'a>,
        body: Option<NodeRef<'a>>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let lexical_parent = self.const_path_module(path, span)?;
        let definee = OpNode::new(OpKind::DefineModule {
            lexical_parent: lexical_parent.boxed(),
            name: self.cx.intern(path.name()),
        });
        self.open_module(definee, format!("<module:{}>", path.name()), body, span, false)
    }

    /// `class << receiver`. Opening the singleton class of anything but
    /// `self` in a module body, or of an expression at the top level,
    /// switches constant lookup to dynamic for the body.
    pub(crate) fn translate_sclass<'a>(
        &mut self,
        receiver: NodeRef<'a>,
        body: Option<NodeRef<'a>>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let object = self.translate(receiver)?;
        let definee = OpNode::new(OpKind::SingletonClass(object.boxed())).at(span);

        let was_dynamic = self.cx.env.is_dynamic_constant_lookup();
        if !was_dynamic {
            let frame = self.cx.env.frame(self.frame);
            let stays_static = (frame.is_module_body() && matches!(receiver.kind, NodeKind::SelfRef))
                || frame.kind == FrameKind::TopLevel;
            if !stays_static {
                self.cx.env.set_dynamic_constant_lookup(true);
                self.log_dynamic_lookup("start dynamic constant lookup", span);
            }
        }
        let result = self.open_module(definee, "singleton class".to_string(), body, span, true);
        self.cx.env.set_dynamic_constant_lookup(was_dynamic);
        result
    }

    /// Run `body` as a module body unit with `definee` as self, inside a new
    /// lexical scope. The scope is popped on the error path too.
    fn open_module<'a>(
        &mut self,
        definee: OpNode,
        name: String,
        body: Option<NodeRef<'a>>,
        span: TextSpan,
        singleton: bool,
    ) -> TranslateResult<OpNode> {
        let previous = self.cx.env.push_lexical_scope();
        let result = self.translate_module_body(definee, name, body, span, singleton);
        self.cx.env.pop_lexical_scope(previous);
        result
    }

    fn translate_module_body<'a>(
        &mut self,
        definee: OpNode,
        name: String,
        body: Option<NodeRef<'a>>,
        span: TextSpan,
        singleton: bool,
    ) -> TranslateResult<OpNode> {
        let return_id = if singleton {
            self.cx.env.frame(self.frame).return_id
        } else {
            Some(self.cx.env.allocate_return_id())
        };
        let module_frame = self.cx.env.push_frame(Some(self.frame), FrameKind::ModuleBody);
        {
            let frame = self.cx.env.frame_mut(module_frame);
            frame.return_id = return_id;
            frame.method_name = Some(name.clone());
        }

        let mut child = self.child(module_frame);
        let body = child.translate_or_nil(body, span)?;
        let body = OpNode::new(OpKind::InsideModuleDefinition(body.boxed())).at(span);
        let body = child.with_flip_flop_inits(Vec::new(), body);
        let unit = child.unit(module_frame, name, UnitKind::ModuleBody, Arity::NO_ARGUMENTS, body);

        Ok(OpNode::new(OpKind::RunModuleBody {
            module: definee.boxed(),
            unit: Box::new(unit),
        })
        .at(span))
    }

    // ========================================================================
    // alias and undef
    // ========================================================================

    pub(crate) fn translate_alias<'a>(
        &mut self,
        new_name: NodeRef<'a>,
        old_name: NodeRef<'a>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let old_name = self.method_name_symbol(old_name)?;
        let new_name = self.method_name_symbol(new_name)?;
        Ok(OpNode::new(OpKind::AliasMethod {
            module: default_definee().boxed(),
            new_name: new_name.boxed(),
            old_name: old_name.boxed(),
        })
        .at(span))
    }

    pub(crate) fn translate_undef<'a>(&mut self, name: NodeRef<'a>, span: TextSpan) -> TranslateResult<OpNode> {
        let name = self.method_name_symbol(name)?;
        Ok(OpNode::new(OpKind::UndefMethod {
            module: default_definee().boxed(),
            name: name.boxed(),
        })
        .at(span))
    }

    fn method_name_symbol<'a>(&mut self, node: NodeRef<'a>) -> TranslateResult<OpNode> {
        match &node.kind {
            NodeKind::Literal { name } => Ok(OpNode::object(Literal::Symbol(self.cx.intern(name))).at(node.span())),
            NodeKind::Symbol { .. } | NodeKind::DSymbol { .. } => self.translate(node),
            other => Err(TranslateError::unsupported(
                &messages::UNSUPPORTED_METHOD_NAME_NODE_0,
                &[other.name()],
                node.span(),
            )),
        }
    }
}

fn default_definee() -> OpNode {
    OpNode::new(OpKind::RaiseIfFrozen(OpNode::new(OpKind::GetDefaultDefinee).boxed()))
}

/// `block in foo`, `block (2 levels) in foo`.
pub fn block_name(depth: u32, method_name: Option<&str>) -> String {
    let method_name = method_name.unwrap_or("<main>");
    if depth > 1 {
        format!("block ({} levels) in {}", depth, method_name)
    } else {
        format!("block in {}", method_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_names() {
        assert_eq!(block_name(1, Some("each_pair")), "block in each_pair");
        assert_eq!(block_name(3, Some("<main>")), "block (3 levels) in <main>");
        assert_eq!(block_name(1, None), "block in <main>");
    }
}
