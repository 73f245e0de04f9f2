//! Literal forms: numbers, strings, interpolation, regexps, hashes, ranges.

use crate::translator::BodyTranslator;
use garnet_ast::{HashPair, NodeKind, NodeRef, RegexpOptions};
use garnet_core::text::TextSpan;
use garnet_core::FxHashSet;
use garnet_diagnostics::{messages, TranslateError, TranslateResult};
use garnet_optree::{CallFlags, DefinitionKind, Literal, OpKind, OpNode};
use lazy_static::lazy_static;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use regex::Regex;
use std::sync::Arc;

lazy_static! {
    /// Named groups, `(?<name>...)` and `(?'name'...)`.
    static ref NAMED_GROUP: Regex =
        Regex::new(r"\(\?(?:<([A-Za-z_][A-Za-z0-9_]*)>|'([A-Za-z_][A-Za-z0-9_]*)')").unwrap();
}

/// Names of the named capture groups in a regexp source, first occurrence
/// order, without duplicates. Escaped parentheses are not groups.
pub fn named_captures(source: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    for captures in NAMED_GROUP.captures_iter(source) {
        let Some(group) = captures.get(0) else { continue };
        if is_escaped(source, group.start()) {
            continue;
        }
        if let Some(name) = captures.get(1).or_else(|| captures.get(2)) {
            if seen.insert(name.as_str()) {
                names.push(name.as_str());
            }
        }
    }
    names
}

/// Whether the byte at `index` follows an odd number of backslashes.
fn is_escaped(source: &str, index: usize) -> bool {
    source.as_bytes()[..index]
        .iter()
        .rev()
        .take_while(|&&b| b == b'\\')
        .count()
        % 2
        == 1
}

impl<'cx> BodyTranslator<'cx> {
    // ========================================================================
    // Numbers
    // ========================================================================

    pub(crate) fn translate_fixnum(&self, value: i64, span: TextSpan) -> OpNode {
        match i32::try_from(value) {
            Ok(small) => OpNode::new(OpKind::Integer(small)).at(span),
            Err(_) => OpNode::new(OpKind::Long(value)).at(span),
        }
    }

    pub(crate) fn translate_bignum(&self, digits: &str, span: TextSpan) -> TranslateResult<OpNode> {
        let value: BigInt = digits.parse().map_err(|_| {
            TranslateError::unsupported(&messages::UNSUPPORTED_NODE_0, &["Bignum"], span)
        })?;
        Ok(match value.to_i64() {
            Some(long) => OpNode::new(OpKind::Long(long)).at(span),
            None => OpNode::object(Literal::Bignum(Arc::new(value))).at(span),
        })
    }

    /// `a/br` is `Rational.convert(a, b)` on the top-level constant.
    pub(crate) fn translate_rational<'a>(
        &mut self,
        numerator: NodeRef<'a>,
        denominator: NodeRef<'a>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let numerator = self.translate(numerator)?;
        let denominator = self.translate(denominator)?;
        let receiver = self.read_top_level_constant("Rational");
        Ok(self
            .make_call(receiver, "convert", vec![numerator, denominator], CallFlags::IGNORE_VISIBILITY)
            .at(span))
    }

    /// `bi` is `Complex.convert(0, b)`.
    pub(crate) fn translate_complex<'a>(
        &mut self,
        number: NodeRef<'a>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let number = self.translate(number)?;
        let receiver = self.read_top_level_constant("Complex");
        let zero = OpNode::new(OpKind::Integer(0));
        Ok(self
            .make_call(receiver, "convert", vec![zero, number], CallFlags::IGNORE_VISIBILITY)
            .at(span))
    }

    fn read_top_level_constant(&self, name: &str) -> OpNode {
        OpNode::new(OpKind::ReadConstant {
            module: OpNode::object(Literal::ObjectClass).boxed(),
            name: self.cx.intern(name),
        })
    }

    // ========================================================================
    // Strings and symbols
    // ========================================================================

    pub(crate) fn translate_str(&self, value: &str, frozen: bool, span: TextSpan) -> OpNode {
        if frozen || self.cx.options.frozen_string_literals {
            OpNode::new(OpKind::DefinedWrapper {
                definition: DefinitionKind::Expression,
                child: OpNode::frozen_string(value).boxed(),
            })
            .at(span)
        } else {
            OpNode::new(OpKind::StringLiteral(Arc::from(value))).at(span)
        }
    }

    /// `` `cmd` `` calls the backtick method on self.
    pub(crate) fn translate_xstr(&self, value: &str, span: TextSpan) -> OpNode {
        let command = OpNode::new(OpKind::StringLiteral(Arc::from(value)));
        self.make_call(OpNode::self_value(), "`", vec![command], CallFlags::IGNORE_VISIBILITY)
            .at(span)
    }

    pub(crate) fn translate_dstr<'a>(
        &mut self,
        parts: &[NodeRef<'a>],
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let parts = self.translate_list(parts)?;
        Ok(OpNode::new(OpKind::InterpolatedString(parts)).at(span))
    }

    pub(crate) fn translate_dsymbol<'a>(
        &mut self,
        parts: &[NodeRef<'a>],
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let parts = self.translate_list(parts)?;
        let string = OpNode::new(OpKind::InterpolatedString(parts));
        Ok(OpNode::new(OpKind::StringToSymbol(string.boxed())).at(span))
    }

    pub(crate) fn translate_dxstr<'a>(
        &mut self,
        parts: &[NodeRef<'a>],
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let parts = self.translate_list(parts)?;
        let command = OpNode::new(OpKind::InterpolatedString(parts));
        Ok(self
            .make_call(OpNode::self_value(), "`", vec![command], CallFlags::IGNORE_VISIBILITY)
            .at(span))
    }

    /// One `#{...}` segment, coerced with `to_s`. An empty segment is an
    /// empty string.
    pub(crate) fn translate_evstr<'a>(
        &mut self,
        body: Option<NodeRef<'a>>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        match body {
            None => Ok(OpNode::new(OpKind::StringLiteral(Arc::from(""))).at(span)),
            Some(body) => {
                let value = self.translate(body)?;
                Ok(OpNode::new(OpKind::ToS(value.boxed())).at(span))
            }
        }
    }

    // ========================================================================
    // Regexps
    // ========================================================================

    pub(crate) fn translate_regexp(&self, source: &str, options: RegexpOptions, span: TextSpan) -> OpNode {
        OpNode::object(Literal::Regexp {
            source: Arc::from(source),
            options: options.without_once(),
        })
        .at(span)
    }

    pub(crate) fn translate_dregexp<'a>(
        &mut self,
        parts: &[NodeRef<'a>],
        options: RegexpOptions,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let parts = self.translate_list(parts)?;
        let regexp = OpNode::new(OpKind::InterpolatedRegexp {
            parts,
            options: options.without_once(),
        });
        if options.contains(RegexpOptions::ONCE) {
            Ok(OpNode::new(OpKind::Once(regexp.boxed())).at(span))
        } else {
            Ok(regexp.at(span))
        }
    }

    /// A bare regexp in condition position matches against `$_`.
    pub(crate) fn translate_match<'a>(
        &mut self,
        regexp: NodeRef<'a>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let regexp = self.translate(regexp)?;
        let last_line = OpNode::new(OpKind::ReadGlobal(self.cx.intern("$_")));
        Ok(OpNode::call(regexp, self.cx.intern("=~"), vec![last_line]).at(span))
    }

    /// `/(?<name>..)/ =~ value`: a match that also assigns each named
    /// capture to a local of the same name, or nil when the match fails.
    pub(crate) fn translate_match2<'a>(
        &mut self,
        receiver: NodeRef<'a>,
        value: NodeRef<'a>,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let match_receiver = self.translate(receiver)?;
        let value = self.translate(value)?;
        let match_call = OpNode::call(match_receiver, self.cx.intern("=~"), vec![value]).at(span);

        let NodeKind::Regexp { source, .. } = receiver.kind else {
            return Ok(match_call);
        };
        let names = named_captures(source);
        if names.is_empty() {
            return Ok(match_call);
        }

        let temp = self.cx.env.allocate_local_temp(self.frame, "match_data");
        let declare_in = self.cx.env.nearest_own_scope(self.frame);
        let mut setters = Vec::with_capacity(names.len());
        let mut nil_setters = Vec::with_capacity(names.len());
        for name in names {
            let name = self.cx.intern(name);
            self.cx.env.declare_local(declare_in, name);
            let slot = self.resolve_or_declare(name);
            nil_setters.push(OpNode::write_local(slot, OpNode::nil()));
            let capture = OpNode::call(
                OpNode::read_local(temp),
                self.cx.intern("[]"),
                vec![OpNode::symbol(name)],
            );
            setters.push(OpNode::write_local(slot, capture));
        }
        let read_match_data =
            OpNode::write_local(temp, OpNode::new(OpKind::ReadGlobal(self.cx.intern("$~"))));
        Ok(OpNode::new(OpKind::SetNamedVariablesMatch {
            match_call: match_call.boxed(),
            read_match_data: read_match_data.boxed(),
            setters,
            nil_setters,
        }))
    }

    // ========================================================================
    // Hashes and ranges
    // ========================================================================

    /// A hash literal. `**value` entries split the literal into parts that
    /// are merged left to right.
    pub(crate) fn translate_hash<'a>(
        &mut self,
        pairs: &[HashPair<'a>],
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let mut parts: Vec<OpNode> = Vec::new();
        let mut current: Vec<(OpNode, OpNode)> = Vec::new();
        for pair in pairs {
            match pair.key {
                Some(key) => {
                    let key = self.translate(key)?;
                    let value = self.translate(pair.value)?;
                    current.push((key, value));
                }
                None => {
                    if !current.is_empty() {
                        parts.push(OpNode::new(OpKind::HashLiteral(std::mem::take(&mut current))));
                    }
                    let value = self.translate(pair.value)?;
                    parts.push(OpNode::new(OpKind::HashCast(value.boxed())));
                }
            }
        }
        if !current.is_empty() || parts.is_empty() {
            parts.push(OpNode::new(OpKind::HashLiteral(current)));
        }
        if parts.len() == 1 {
            let single = parts.pop().unwrap_or_else(|| OpNode::new(OpKind::HashLiteral(Vec::new())));
            return Ok(single.at(span));
        }
        Ok(OpNode::new(OpKind::ConcatHashLiteral(parts)).at(span))
    }

    pub(crate) fn translate_range<'a>(
        &mut self,
        begin: Option<NodeRef<'a>>,
        end: Option<NodeRef<'a>>,
        exclusive: bool,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let begin = match begin {
            Some(begin) => self.translate(begin)?,
            None => OpNode::nil(),
        };
        let end = match end {
            Some(end) => self.translate(end)?,
            None => OpNode::nil(),
        };
        Ok(OpNode::new(OpKind::RangeLiteral {
            begin: begin.boxed(),
            end: end.boxed(),
            exclusive,
        })
        .at(span))
    }

    /// A flip-flop keeps its state in a hidden local of the current frame,
    /// initialised when the frame's unit starts.
    pub(crate) fn translate_flip_flop<'a>(
        &mut self,
        begin: NodeRef<'a>,
        end: NodeRef<'a>,
        exclusive: bool,
        span: TextSpan,
    ) -> TranslateResult<OpNode> {
        let begin = self.translate(begin)?;
        let end = self.translate(end)?;
        let state = self.cx.env.allocate_flip_flop_state(self.frame);
        Ok(OpNode::new(OpKind::FlipFlop {
            begin: begin.boxed(),
            end: end.boxed(),
            exclusive,
            state,
        })
        .at(span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_captures() {
        assert_eq!(named_captures(r"(?<year>\d+)-(?<month>\d+)"), vec!["year", "month"]);
        assert_eq!(named_captures(r"(?'a'x)(?<a>y)"), vec!["a"]);
        assert!(named_captures(r"(\d+)").is_empty());
    }

    #[test]
    fn test_escaped_group_is_not_named() {
        assert!(named_captures(r"\(?<x>y)").is_empty());
        assert_eq!(named_captures(r"\\(?<x>y)"), vec!["x"]);
    }
}
