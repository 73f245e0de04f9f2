//! Child enumeration and tree traversal.

use crate::node::{OpKind, OpNode, RescueKind};

impl OpNode {
    /// Direct children in evaluation order. Bodies of nested executable
    /// units count as children.
    pub fn children(&self) -> Vec<&OpNode> {
        use OpKind::*;
        let mut out: Vec<&OpNode> = Vec::new();
        match &self.kind {
            Nil | Boolean(_) | Integer(_) | Long(_) | Float(_) | Object(_) | StringLiteral(_)
            | SelfValue | ReadLocal(_) | ReadInstanceVariable(_) | ReadGlobal(_)
            | AliasGlobal { .. } | ReadNthMatch(_) | ReadConstantWithLexicalScope { .. }
            | ReadConstantWithDynamicScope(_) | DynamicLexicalScope | LexicalScopeModule(_)
            | DynamicLexicalScopeModule | InitFlipFlopSlot(_) | GetDefaultDefinee | Redo
            | Retry | Dead(_) | CheckArity(_) | ReadPreArgument { .. }
            | ReadRestArguments { .. } | ReadPostArgument { .. }
            | ReadKeywordRestArguments { .. } | ReadBlockArgument { .. }
            | ShouldDestructure { .. } | SingleBlockArg => {}

            ArrayLiteral(items) | ConcatHashLiteral(items) | InterpolatedString(items)
            | ArrayConcat(items) | Sequence(items) => out.extend(items.iter()),
            InterpolatedRegexp { parts, .. } => out.extend(parts.iter()),
            HashLiteral(pairs) => {
                for (key, value) in pairs {
                    out.push(key);
                    out.push(value);
                }
            }
            HashCast(child) | ToS(child) | StringToSymbol(child) | Once(child)
            | ArrayDup(child) | ToProc(child) | IsNotProvided(child) | SingletonClass(child)
            | RaiseIfFrozen(child) | InsideModuleDefinition(child) | Not(child)
            | IsNil(child) | Next(child) | ExceptionTranslating(child) | CatchNext(child)
            | Defined(child) => out.push(child),
            SplatCast { child, .. }
            | FrameOnStack { child, .. }
            | DefinedWrapper { child, .. } => out.push(child),
            RangeLiteral { begin, end, .. } | FlipFlop { begin, end, .. } => {
                out.push(begin);
                out.push(end);
            }
            ArrayAppendOne { array, value } => {
                out.push(array);
                out.push(value);
            }
            ArrayIndex { array, .. }
            | ArraySlice { array, .. }
            | ArrayIsAtLeastAsLargeAs { array, .. } => out.push(array),
            WriteLocal { value, .. }
            | WriteInstanceVariable { value, .. }
            | WriteGlobal { value, .. }
            | Break { value, .. }
            | Return { value, .. } => out.push(value),
            ReadClassVariable { lexical_scope, .. } => out.push(lexical_scope),
            WriteClassVariable {
                lexical_scope,
                value,
                ..
            } => {
                out.push(lexical_scope);
                out.push(value);
            }
            ReadConstant { module, .. } => out.push(module),
            WriteConstant { module, value, .. } => {
                out.push(module);
                out.push(value);
            }
            Call(call) => {
                out.push(&call.receiver);
                out.extend(call.args.iter());
                out.extend(call.block.iter());
            }
            Super(call) => {
                out.extend(call.args.iter());
                out.extend(call.block.iter());
            }
            Yield { args, block, .. } => {
                out.extend(args.iter());
                out.push(block);
            }
            InvokePrimitive { args, .. } => out.extend(args.iter()),
            CatchBreak { body, .. } | CatchReturn { body, .. } => out.push(body),
            BlockDefinition(block) => out.push(&block.unit.body),
            MethodDefinition { definee, unit } => {
                out.push(definee);
                out.push(&unit.body);
            }
            RunModuleBody { module, unit } => {
                out.push(module);
                out.push(&unit.body);
            }
            DefineClass {
                lexical_parent,
                superclass,
                ..
            } => {
                out.push(lexical_parent);
                if let Some(superclass) = superclass {
                    out.push(superclass);
                }
            }
            DefineModule { lexical_parent, .. } => out.push(lexical_parent),
            AliasMethod {
                module,
                new_name,
                old_name,
            } => {
                out.push(module);
                out.push(new_name);
                out.push(old_name);
            }
            UndefMethod { module, name } => {
                out.push(module);
                out.push(name);
            }
            ElidableResult { required, value } => {
                out.push(required);
                out.push(value);
            }
            If {
                condition,
                then_body,
            }
            | Unless {
                condition,
                then_body,
            } => {
                out.push(condition);
                out.push(then_body);
            }
            IfElse {
                condition,
                then_body,
                else_body,
            } => {
                out.push(condition);
                out.push(then_body);
                out.push(else_body);
            }
            And { left, right } | Or { left, right } => {
                out.push(left);
                out.push(right);
            }
            While {
                condition, body, ..
            } => {
                out.push(condition);
                out.push(body);
            }
            Try {
                body,
                rescues,
                else_body,
                ..
            } => {
                out.push(body);
                for clause in rescues {
                    match &clause.kind {
                        RescueKind::Any => {}
                        RescueKind::Classes(classes) => out.extend(classes.iter()),
                        RescueKind::Splat(list) => out.push(list),
                    }
                    out.push(&clause.body);
                }
                if let Some(else_body) = else_body {
                    out.push(else_body);
                }
            }
            Ensure { body, ensure } => {
                out.push(body);
                out.push(ensure);
            }
            SetNamedVariablesMatch {
                match_call,
                read_match_data,
                setters,
                nil_setters,
            } => {
                out.push(match_call);
                out.push(read_match_data);
                out.extend(setters.iter());
                out.extend(nil_setters.iter());
            }
            ReadOptionalArgument { default, .. } => out.push(default),
            ReadKeywordArgument { default, .. } => {
                if let Some(default) = default {
                    out.push(default);
                }
            }
        }
        out
    }

    /// Visit this node and all descendants in pre-order.
    pub fn walk<'s>(&'s self, visit: &mut dyn FnMut(&'s OpNode)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// All descendants (including this node) matching `predicate`.
    pub fn find_all(&self, predicate: impl Fn(&OpNode) -> bool) -> Vec<&OpNode> {
        let mut found = Vec::new();
        self.walk(&mut |node| {
            if predicate(node) {
                found.push(node);
            }
        });
        found
    }

    pub fn count(&self, predicate: impl Fn(&OpNode) -> bool) -> usize {
        self.find_all(predicate).len()
    }
}
