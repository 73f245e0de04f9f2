//! Per-kind classification tables for parse nodes.

use crate::node::*;

impl<'a> NodeKind<'a> {
    /// The node kind's name, used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Fixnum(_) => "Fixnum",
            NodeKind::Bignum { .. } => "Bignum",
            NodeKind::Float(_) => "Float",
            NodeKind::Rational { .. } => "Rational",
            NodeKind::Complex { .. } => "Complex",
            NodeKind::Str { .. } => "Str",
            NodeKind::XStr { .. } => "XStr",
            NodeKind::DStr { .. } => "DStr",
            NodeKind::DSymbol { .. } => "DSymbol",
            NodeKind::DXStr { .. } => "DXStr",
            NodeKind::DRegexp { .. } => "DRegexp",
            NodeKind::EvStr { .. } => "EvStr",
            NodeKind::Symbol { .. } => "Symbol",
            NodeKind::Regexp { .. } => "Regexp",
            NodeKind::True => "True",
            NodeKind::False => "False",
            NodeKind::Nil => "Nil",
            NodeKind::SelfRef => "Self",
            NodeKind::ZArray => "ZArray",
            NodeKind::Encoding { .. } => "Encoding",
            NodeKind::Array { .. } => "Array",
            NodeKind::Hash { .. } => "Hash",
            NodeKind::Dot { .. } => "Dot",
            NodeKind::Flip { .. } => "Flip",
            NodeKind::LocalVar { .. } => "LocalVar",
            NodeKind::DVar { .. } => "DVar",
            NodeKind::LocalAsgn { .. } => "LocalAsgn",
            NodeKind::DAsgn { .. } => "DAsgn",
            NodeKind::InstVar { .. } => "InstVar",
            NodeKind::InstAsgn { .. } => "InstAsgn",
            NodeKind::ClassVar { .. } => "ClassVar",
            NodeKind::ClassVarAsgn { .. } => "ClassVarAsgn",
            NodeKind::GlobalVar { .. } => "GlobalVar",
            NodeKind::GlobalAsgn { .. } => "GlobalAsgn",
            NodeKind::Const { .. } => "Const",
            NodeKind::Colon2 { .. } => "Colon2",
            NodeKind::Colon3 { .. } => "Colon3",
            NodeKind::ConstDecl { .. } => "ConstDecl",
            NodeKind::NthRef { .. } => "NthRef",
            NodeKind::BackRef { .. } => "BackRef",
            NodeKind::Call { .. } => "Call",
            NodeKind::FCall { .. } => "FCall",
            NodeKind::VCall { .. } => "VCall",
            NodeKind::AttrAssign { .. } => "AttrAssign",
            NodeKind::Super { .. } => "Super",
            NodeKind::ZSuper { .. } => "ZSuper",
            NodeKind::Yield { .. } => "Yield",
            NodeKind::BlockPass { .. } => "BlockPass",
            NodeKind::Iter(_) => "Iter",
            NodeKind::Lambda(_) => "Lambda",
            NodeKind::Splat { .. } => "Splat",
            NodeKind::ArgsCat { .. } => "ArgsCat",
            NodeKind::ArgsPush { .. } => "ArgsPush",
            NodeKind::SValue { .. } => "SValue",
            NodeKind::Star => "Star",
            NodeKind::Match { .. } => "Match",
            NodeKind::Match2 { .. } => "Match2",
            NodeKind::Match3 { .. } => "Match3",
            NodeKind::Defined { .. } => "Defined",
            NodeKind::Begin { .. } => "Begin",
            NodeKind::Block { .. } => "Block",
            NodeKind::PreExe { .. } => "PreExe",
            NodeKind::PostExe { .. } => "PostExe",
            NodeKind::If { .. } => "If",
            NodeKind::And { .. } => "And",
            NodeKind::Or { .. } => "Or",
            NodeKind::While { .. } => "While",
            NodeKind::Until { .. } => "Until",
            NodeKind::For { .. } => "For",
            NodeKind::Case { .. } => "Case",
            NodeKind::Break { .. } => "Break",
            NodeKind::Next { .. } => "Next",
            NodeKind::Redo => "Redo",
            NodeKind::Retry => "Retry",
            NodeKind::Return { .. } => "Return",
            NodeKind::Rescue { .. } => "Rescue",
            NodeKind::Ensure { .. } => "Ensure",
            NodeKind::OpAsgn { .. } => "OpAsgn",
            NodeKind::OpAsgnAnd { .. } => "OpAsgnAnd",
            NodeKind::OpAsgnOr { .. } => "OpAsgnOr",
            NodeKind::OpElementAsgn { .. } => "OpElementAsgn",
            NodeKind::OpAsgnConstDecl { .. } => "OpAsgnConstDecl",
            NodeKind::MultipleAsgn(_) => "MultipleAsgn",
            NodeKind::Defn { .. } => "Defn",
            NodeKind::Defs { .. } => "Defs",
            NodeKind::Class { .. } => "Class",
            NodeKind::Module { .. } => "Module",
            NodeKind::SClass { .. } => "SClass",
            NodeKind::Alias { .. } => "Alias",
            NodeKind::VAlias { .. } => "VAlias",
            NodeKind::Undef { .. } => "Undef",
            NodeKind::Literal { .. } => "Literal",
            NodeKind::Argument { .. } => "Argument",
        }
    }
}

impl<'a> ParseNode<'a> {
    /// Conservative side-effect classification: true only for forms whose
    /// evaluation can neither raise nor mutate state. Many side-effect free
    /// forms are not listed.
    pub fn is_side_effect_free(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Fixnum(_)
                | NodeKind::Bignum { .. }
                | NodeKind::Float(_)
                | NodeKind::Str { .. }
                | NodeKind::Symbol { .. }
                | NodeKind::Regexp { .. }
                | NodeKind::True
                | NodeKind::False
                | NodeKind::Nil
                | NodeKind::SelfRef
                | NodeKind::ZArray
                | NodeKind::LocalVar { .. }
                | NodeKind::DVar { .. }
                | NodeKind::InstVar { .. }
                | NodeKind::GlobalVar { .. }
                | NodeKind::Encoding { .. }
        )
    }

    /// Whether reading this node may raise because the target is undefined,
    /// so `||=` must guard the read with `defined?`.
    pub fn needs_definition_check(&self) -> bool {
        !matches!(
            self.kind,
            NodeKind::LocalVar { .. }
                | NodeKind::DVar { .. }
                | NodeKind::InstVar { .. }
                | NodeKind::SelfRef
                | NodeKind::Nil
                | NodeKind::True
                | NodeKind::False
                | NodeKind::Fixnum(_)
                | NodeKind::Float(_)
                | NodeKind::Str { .. }
                | NodeKind::Symbol { .. }
        )
    }

    /// Whether the node is a read of the global `name`.
    pub fn is_global_read(&self, name: &str) -> bool {
        matches!(self.kind, NodeKind::GlobalVar { name: n } if n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeFlags;
    use garnet_core::text::TextSpan;

    fn node(kind: NodeKind<'static>) -> ParseNode<'static> {
        ParseNode::new(TextSpan::new(0, 1), kind)
    }

    #[test]
    fn test_side_effect_classification() {
        assert!(node(NodeKind::Nil).is_side_effect_free());
        assert!(node(NodeKind::GlobalVar { name: "$!" }).is_side_effect_free());
        assert!(!node(NodeKind::VCall { name: "foo" }).is_side_effect_free());
        assert!(!node(NodeKind::Redo).is_side_effect_free());
    }

    #[test]
    fn test_definition_check() {
        assert!(!node(NodeKind::LocalVar { name: "x", depth: 0 }).needs_definition_check());
        assert!(!node(NodeKind::InstVar { name: "@x" }).needs_definition_check());
        assert!(node(NodeKind::GlobalVar { name: "$x" }).needs_definition_check());
        assert!(node(NodeKind::ClassVar { name: "@@x" }).needs_definition_check());
    }

    #[test]
    fn test_newline_flag_and_name() {
        let mut n = node(NodeKind::Retry);
        assert!(!n.is_newline());
        n.data.flags |= NodeFlags::NEWLINE;
        assert!(n.is_newline());
        assert_eq!(n.kind.name(), "Retry");
        assert!(!n.is_global_read("$!"));
    }
}
