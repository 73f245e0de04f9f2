//! garnet_printer: Operation tree to text.
//!
//! Dumps executable units and operation nodes as indented S-expressions.
//! The output depends only on the tree, so two translations of the same
//! parse tree print identically; the translator's tests compare dumps and
//! search them for expected shapes.
//!
//! ```text
//! (unit "<main>" top-level arity=0 locals=[a] return#0
//!   (catch-return return#0
//!     (write-local a@0
//!       (int 1))))
//! ```

use garnet_core::intern::StringInterner;
use garnet_optree::*;

/// Options for the printer.
pub struct PrinterOptions {
    /// Indentation string.
    pub indent_str: String,
    /// Append `@start..end` to nodes that carry a source span.
    pub show_spans: bool,
    /// Append `[nl]`/`[cov]` to nodes flagged as line starts.
    pub show_flags: bool,
}

impl Default for PrinterOptions {
    fn default() -> Self {
        Self {
            indent_str: "  ".to_string(),
            show_spans: false,
            show_flags: false,
        }
    }
}

pub struct Printer<'i> {
    output: String,
    indent_level: u32,
    options: PrinterOptions,
    interner: &'i StringInterner,
}

impl<'i> Printer<'i> {
    pub fn new(interner: &'i StringInterner) -> Self {
        Self::with_options(interner, PrinterOptions::default())
    }

    pub fn with_options(interner: &'i StringInterner, options: PrinterOptions) -> Self {
        Self {
            output: String::with_capacity(4096),
            indent_level: 0,
            options,
            interner,
        }
    }

    fn resolve(&self, name: Name) -> &str {
        self.interner.resolve(name)
    }

    /// Print a whole unit, nested units included.
    pub fn print_unit(&mut self, unit: &ExecutableUnit) -> String {
        self.output.clear();
        self.indent_level = 0;
        self.write_unit(unit);
        self.output.push('\n');
        std::mem::take(&mut self.output)
    }

    pub fn print_node(&mut self, node: &OpNode) -> String {
        self.output.clear();
        self.indent_level = 0;
        self.write_node(node);
        self.output.push('\n');
        std::mem::take(&mut self.output)
    }

    // ========================================================================
    // Units
    // ========================================================================

    fn write_unit(&mut self, unit: &ExecutableUnit) {
        let kind = match unit.kind {
            UnitKind::TopLevel => "top-level",
            UnitKind::Method => "method",
            UnitKind::Proc => "proc",
            UnitKind::Lambda => "lambda",
            UnitKind::ModuleBody => "module-body",
        };
        let mut header = format!("unit {:?} {} arity={}", unit.name, kind, self.arity(&unit.arity));
        let locals: Vec<&str> = unit.locals.iter().map(|name| self.resolve(*name)).collect();
        header.push_str(&format!(" locals=[{}]", locals.join(" ")));
        if !unit.own_scope {
            header.push_str(" shared-scope");
        }
        if let Some(id) = unit.return_id {
            header.push_str(&format!(" {}", id));
        }
        if let Some(id) = unit.break_id {
            header.push_str(&format!(" {}", id));
        }
        if unit.block_depth > 0 {
            header.push_str(&format!(" depth={}", unit.block_depth));
        }
        if unit.needs_declaration_frame {
            header.push_str(" declaration-frame");
        }
        self.open(&header);
        self.child(|p| p.write_node(&unit.body));
        self.close();
    }

    fn arity(&self, arity: &Arity) -> String {
        let mut out = arity.arity_number().to_string();
        if arity.optional > 0 {
            out.push_str(&format!(",opt={}", arity.optional));
        }
        if arity.post > 0 {
            out.push_str(&format!(",post={}", arity.post));
        }
        if !arity.keywords.is_empty() {
            let keywords: Vec<&str> = arity.keywords.iter().map(|name| self.resolve(*name)).collect();
            out.push_str(&format!(",kw={}/{}", keywords.join("|"), arity.required_keywords));
        }
        if arity.keyword_rest {
            out.push_str(",kwrest");
        }
        if arity.block {
            out.push_str(",block");
        }
        out
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    fn write_node(&mut self, node: &OpNode) {
        let mut label = self.label(node);
        if self.options.show_flags {
            if node.flags().contains(OpFlags::NEWLINE) {
                label.push_str(" [nl]");
            }
            if node.flags().contains(OpFlags::COVERAGE_LINE) {
                label.push_str(" [cov]");
            }
        }
        if self.options.show_spans {
            if let Some(span) = node.span() {
                label.push_str(&format!(" @{}..{}", span.start, span.end()));
            }
        }
        self.open(&label);

        match &node.kind {
            OpKind::MethodDefinition { definee, unit } | OpKind::RunModuleBody { module: definee, unit } => {
                self.child(|p| p.write_node(definee));
                self.child(|p| p.write_unit(unit));
            }
            OpKind::BlockDefinition(block) => self.child(|p| p.write_unit(&block.unit)),
            OpKind::Try {
                body,
                rescues,
                else_body,
                ..
            } => {
                self.child(|p| p.write_node(body));
                for clause in rescues {
                    self.child(|p| p.write_rescue(clause));
                }
                if let Some(else_body) = else_body {
                    self.child(|p| {
                        p.open("else");
                        p.child(|p| p.write_node(else_body));
                        p.close();
                    });
                }
            }
            _ => {
                for child in node.children() {
                    self.child(|p| p.write_node(child));
                }
            }
        }
        self.close();
    }

    fn write_rescue(&mut self, clause: &RescueClause) {
        match &clause.kind {
            RescueKind::Any => self.open("rescue any"),
            RescueKind::Classes(classes) => {
                self.open("rescue");
                for class in classes {
                    self.child(|p| p.write_node(class));
                }
            }
            RescueKind::Splat(list) => {
                self.open("rescue splat");
                self.child(|p| p.write_node(list));
            }
        }
        self.child(|p| p.write_node(&clause.body));
        self.close();
    }

    fn slot(&self, slot: LocalSlot) -> String {
        if slot.is_declaration() {
            format!("{}@{}^{}", self.resolve(slot.name), slot.index, slot.depth)
        } else {
            format!("{}@{}", self.resolve(slot.name), slot.index)
        }
    }

    fn literal(&self, literal: &Literal) -> String {
        match literal {
            Literal::Symbol(name) => format!("sym {}", self.resolve(*name)),
            Literal::FrozenString(value) => format!("frozen-str {:?}", value),
            Literal::Bignum(value) => format!("bignum {}", value),
            Literal::Regexp { source, options } => format!("regexp /{}/{}", source, options.to_flag_string()),
            Literal::Encoding(name) => format!("encoding {}", name),
            Literal::ObjectClass => "Object".to_string(),
            Literal::CoreModule(module) => module.name().to_string(),
            Literal::LexicalScope(id) => format!("lexical-scope {}", id.0),
            Literal::NotProvided => "not-provided".to_string(),
        }
    }

    /// The head of a node's S-expression: its name and scalar attributes.
    fn label(&self, node: &OpNode) -> String {
        use OpKind::*;
        match &node.kind {
            Nil => "nil".to_string(),
            Boolean(value) => value.to_string(),
            Integer(value) => format!("int {}", value),
            Long(value) => format!("long {}", value),
            Float(value) => format!("float {:?}", value),
            Object(literal) => self.literal(literal),
            StringLiteral(value) => format!("str {:?}", value),
            ArrayLiteral(_) => "array".to_string(),
            HashLiteral(_) => "hash".to_string(),
            ConcatHashLiteral(_) => "concat-hash".to_string(),
            HashCast(_) => "hash-cast".to_string(),
            RangeLiteral { exclusive, .. } => String::from(if *exclusive { "range ..." } else { "range .." }),
            InterpolatedString(_) => "dstr".to_string(),
            ToS(_) => "to-s".to_string(),
            InterpolatedRegexp { options, .. } => format!("dregexp /{}", options.to_flag_string()),
            StringToSymbol(_) => "to-sym".to_string(),
            Once(_) => "once".to_string(),

            SplatCast {
                nil_behavior,
                use_to_ary,
                copy,
                ..
            } => {
                let mut out = format!("splat {:?}", nil_behavior).to_lowercase();
                if *use_to_ary {
                    out.push_str(" to-ary");
                }
                if *copy {
                    out.push_str(" copy");
                }
                out
            }
            ArrayConcat(_) => "array-concat".to_string(),
            ArrayAppendOne { .. } => "array-append".to_string(),
            ArrayDup(_) => "array-dup".to_string(),
            ArrayIndex { index, .. } => format!("array-index {}", index),
            ArraySlice { from, to, .. } => format!("array-slice {} {}", from, to),
            ArrayIsAtLeastAsLargeAs { size, .. } => format!("array-size>= {}", size),

            SelfValue => "self".to_string(),
            ReadLocal(slot) => format!("read-local {}", self.slot(*slot)),
            WriteLocal { slot, .. } => format!("write-local {}", self.slot(*slot)),
            ReadInstanceVariable(name) => format!("read-ivar {}", self.resolve(*name)),
            WriteInstanceVariable { name, .. } => format!("write-ivar {}", self.resolve(*name)),
            ReadClassVariable { name, .. } => format!("read-cvar {}", self.resolve(*name)),
            WriteClassVariable { name, .. } => format!("write-cvar {}", self.resolve(*name)),
            ReadGlobal(name) => format!("read-global {}", self.resolve(*name)),
            WriteGlobal { name, .. } => format!("write-global {}", self.resolve(*name)),
            AliasGlobal { new_name, old_name } => {
                format!("alias-global {} {}", self.resolve(*new_name), self.resolve(*old_name))
            }
            ReadNthMatch(n) => format!("nth-match {}", n),
            ReadConstant { name, .. } => format!("read-const {}", self.resolve(*name)),
            ReadConstantWithLexicalScope { lexical_scope, name } => {
                format!("read-const-lexical {} scope={}", self.resolve(*name), lexical_scope.0)
            }
            ReadConstantWithDynamicScope(name) => format!("read-const-dynamic {}", self.resolve(*name)),
            WriteConstant { name, .. } => format!("write-const {}", self.resolve(*name)),
            DynamicLexicalScope => "dynamic-lexical-scope".to_string(),
            LexicalScopeModule(id) => format!("lexical-scope-module {}", id.0),
            DynamicLexicalScopeModule => "dynamic-lexical-scope-module".to_string(),
            FlipFlop { exclusive, state, .. } => {
                let dots = if *exclusive { "..." } else { ".." };
                format!("flip-flop {} {}", dots, self.slot(*state))
            }
            InitFlipFlopSlot(slot) => format!("init-flip-flop {}", self.slot(*slot)),

            Call(call) => {
                let mut out = format!("call {}", self.resolve(call.name));
                for (flag, text) in [
                    (CallFlags::SPLATTED, " splatted"),
                    (CallFlags::IGNORE_VISIBILITY, " private"),
                    (CallFlags::VCALL, " vcall"),
                    (CallFlags::SAFE_NAVIGATION, " safe"),
                    (CallFlags::ATTR_ASSIGN, " attr-assign"),
                ] {
                    if call.flags.contains(flag) {
                        out.push_str(text);
                    }
                }
                out
            }
            Super(call) => {
                let mut out = "super".to_string();
                if call.implicit {
                    out.push_str(" implicit");
                }
                if call.splatted {
                    out.push_str(" splatted");
                }
                out
            }
            Yield { splatted, .. } => String::from(if *splatted { "yield splatted" } else { "yield" }),
            ToProc(_) => "to-proc".to_string(),
            InvokePrimitive { name, .. } => format!("primitive {}", self.resolve(*name)),
            IsNotProvided(_) => "is-not-provided".to_string(),
            FrameOnStack { marker, .. } => format!("frame-on-stack {}", self.slot(*marker)),
            CatchBreak { break_id, is_while, .. } => {
                let what = if *is_while { " while" } else { "" };
                format!("catch-break {}{}", break_id, what)
            }
            BlockDefinition(block) => {
                let kind = match block.kind {
                    ProcKind::Proc => "proc",
                    ProcKind::Lambda => "lambda",
                };
                match block.frame_on_stack_marker {
                    Some(marker) => format!("block {} {} marker={}", kind, block.break_id, self.slot(marker)),
                    None => format!("block {} {}", kind, block.break_id),
                }
            }

            MethodDefinition { .. } => "def".to_string(),
            RunModuleBody { .. } => "run-module-body".to_string(),
            DefineClass { name, .. } => format!("define-class {}", self.resolve(*name)),
            DefineModule { name, .. } => format!("define-module {}", self.resolve(*name)),
            SingletonClass(_) => "singleton-class".to_string(),
            GetDefaultDefinee => "default-definee".to_string(),
            RaiseIfFrozen(_) => "raise-if-frozen".to_string(),
            InsideModuleDefinition(_) => "inside-module".to_string(),
            AliasMethod { .. } => "alias-method".to_string(),
            UndefMethod { .. } => "undef-method".to_string(),

            Sequence(_) => "seq".to_string(),
            ElidableResult { .. } => "elidable".to_string(),
            If { .. } => "if".to_string(),
            IfElse { .. } => "if-else".to_string(),
            Unless { .. } => "unless".to_string(),
            And { .. } => "and".to_string(),
            Or { .. } => "or".to_string(),
            Not(_) => "not".to_string(),
            IsNil(_) => "is-nil".to_string(),
            While { kind, .. } => match kind {
                LoopKind::TestFirst => "while".to_string(),
                LoopKind::TestAfter => "do-while".to_string(),
            },
            Break {
                break_id,
                ignore_marker,
                ..
            } => {
                let what = if *ignore_marker { " no-marker" } else { "" };
                format!("break {}{}", break_id, what)
            }
            Next(_) => "next".to_string(),
            Redo => "redo".to_string(),
            Retry => "retry".to_string(),
            Return { return_id, local, .. } => {
                let what = if *local { " local" } else { "" };
                format!("return {}{}", return_id, what)
            }
            Try { can_omit_backtrace, .. } => {
                String::from(if *can_omit_backtrace { "try omit-backtrace" } else { "try" })
            }
            ExceptionTranslating(_) => "exception-translating".to_string(),
            Ensure { .. } => "ensure".to_string(),
            CatchReturn { return_id, .. } => format!("catch-return {}", return_id),
            CatchNext(_) => "catch-next".to_string(),
            Defined(_) => "defined".to_string(),
            DefinedWrapper { definition, .. } => format!("defined-as {}", definition.as_str()),
            SetNamedVariablesMatch { .. } => "named-captures-match".to_string(),
            Dead(what) => format!("dead {:?}", what),

            CheckArity(arity) => format!("check-arity {}", self.arity(arity)),
            ReadPreArgument { index, missing } => match missing {
                MissingArgumentBehavior::Runtime => format!("arg {}", index),
                MissingArgumentBehavior::Nil => format!("arg {} or-nil", index),
            },
            ReadOptionalArgument { index, minimum, .. } => format!("optional-arg {} min={}", index, minimum),
            ReadRestArguments { start, post } => format!("rest-args {} post={}", start, post),
            ReadPostArgument { from_end, pre, optional } => {
                format!("post-arg -{} pre={} opt={}", from_end, pre, optional)
            }
            ReadKeywordArgument { name, default } => {
                let what = if default.is_none() { " required" } else { "" };
                format!("keyword-arg {}{}", self.resolve(*name), what)
            }
            ReadKeywordRestArguments { excluded } => {
                let names: Vec<&str> = excluded.iter().map(|name| self.resolve(*name)).collect();
                format!("keyword-rest excluding=[{}]", names.join(" "))
            }
            ReadBlockArgument { as_proc } => String::from(if *as_proc { "block-arg proc" } else { "block-arg" }),
            SingleBlockArg => "single-block-arg".to_string(),
            ShouldDestructure { required } => format!("should-destructure {}", required),
        }
    }

    // ========================================================================
    // Output
    // ========================================================================

    fn open(&mut self, label: &str) {
        self.output.push('(');
        self.output.push_str(label);
    }

    fn close(&mut self) {
        self.output.push(')');
    }

    /// Write one child on its own line, one level deeper.
    fn child(&mut self, f: impl FnOnce(&mut Self)) {
        self.indent_level += 1;
        self.output.push('\n');
        for _ in 0..self.indent_level {
            self.output.push_str(&self.options.indent_str);
        }
        f(self);
        self.indent_level -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_prints_inline() {
        let interner = StringInterner::new();
        let mut printer = Printer::new(&interner);
        assert_eq!(printer.print_node(&OpNode::nil()), "(nil)\n");
        let sym = OpNode::symbol(interner.intern("each"));
        assert_eq!(printer.print_node(&sym), "(sym each)\n");
    }

    #[test]
    fn test_children_are_indented() {
        let interner = StringInterner::new();
        let slot = LocalSlot {
            name: interner.intern("a"),
            index: 0,
            depth: 1,
        };
        let node = OpNode::write_local(slot, OpNode::new(OpKind::Integer(1)));
        let mut printer = Printer::new(&interner);
        assert_eq!(printer.print_node(&node), "(write-local a@0^1\n  (int 1))\n");
    }

    #[test]
    fn test_spans_and_flags() {
        let interner = StringInterner::new();
        let mut node = OpNode::boolean(true).at(garnet_core::text::TextSpan::new(4, 2));
        node.mark_newline();
        let mut printer = Printer::with_options(
            &interner,
            PrinterOptions {
                show_spans: true,
                show_flags: true,
                ..PrinterOptions::default()
            },
        );
        assert_eq!(printer.print_node(&node), "(true [nl] @4..6)\n");
    }
}
