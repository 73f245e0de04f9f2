//! Heredoc terminators.
//!
//! A [`HeredocTerm`] is created when the lexer meets `<<ID`, `<<-ID`,
//! `<<~ID` or a quoted variant, and scans the body that starts on the line
//! after the opener. The body comes back as literal text and interpolation
//! boundaries; the host parser parses the interpolated code itself.

use crate::escape::read_escape;
use garnet_core::text::TextSpan;
use garnet_diagnostics::{messages, Diagnostic};
use unicode_xid::UnicodeXID;

/// Columns a tab advances to when measuring squiggly indentation.
pub const TAB_WIDTH: usize = 8;

bitflags::bitflags! {
    /// String function flags of a heredoc opener.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StrFuncFlags: u8 {
        /// Escapes and interpolation are processed.
        const EXPAND   = 1 << 0;
        /// The terminator may be indented (`<<-` and `<<~`).
        const INDENT   = 1 << 1;
        /// The body is dedented by its least indented line (`<<~`).
        const SQUIGGLY = 1 << 2;
        /// Backtick heredoc: the body is a shell command.
        const XSTRING  = 1 << 3;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeredocPart {
    Literal(String),
    /// `#{...}`: the span of the code between the braces.
    Interpolation(TextSpan),
    /// `#@ivar`, `#@@cvar`, `#$gvar`: the span of the variable including its sigil.
    Variable(TextSpan),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeredocBody {
    /// Body contents with adjacent literal text merged.
    pub parts: Vec<HeredocPart>,
    /// From the first body line up to the start of the terminator line.
    pub body_span: TextSpan,
    /// Offset just past the terminator line, where lexing resumes.
    pub end: usize,
}

impl HeredocBody {
    /// The literal value when the body has no interpolation.
    pub fn as_plain_str(&self) -> Option<String> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                HeredocPart::Literal(text) => out.push_str(text),
                _ => return None,
            }
        }
        Some(out)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HeredocError {
    #[error("can't find string \"{marker}\" anywhere before EOF")]
    Unterminated { marker: String, span: TextSpan },
    #[error("invalid escape sequence: {text}")]
    InvalidEscape { text: String, span: TextSpan },
    #[error("unterminated string interpolation")]
    UnterminatedInterpolation { span: TextSpan },
    #[error("invalid heredoc opener: {0}")]
    InvalidOpener(String),
}

impl HeredocError {
    pub fn to_diagnostic(&self, file: &str) -> Diagnostic {
        match self {
            HeredocError::Unterminated { marker, span } => {
                Diagnostic::new(&messages::CANT_FIND_STRING_0_ANYWHERE_BEFORE_EOF, &[marker])
                    .in_file(file)
                    .at(*span)
            }
            HeredocError::InvalidEscape { text, span } => {
                Diagnostic::new(&messages::INVALID_ESCAPE_0, &[text]).in_file(file).at(*span)
            }
            HeredocError::UnterminatedInterpolation { span } => {
                Diagnostic::new(&messages::UNTERMINATED_INTERPOLATION, &[]).in_file(file).at(*span)
            }
            HeredocError::InvalidOpener(text) => {
                Diagnostic::new(&messages::INVALID_HEREDOC_OPENER_0, &[text]).in_file(file)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeredocTerm {
    marker: String,
    flags: StrFuncFlags,
}

impl HeredocTerm {
    pub fn new(marker: impl Into<String>, flags: StrFuncFlags) -> Self {
        Self {
            marker: marker.into(),
            flags,
        }
    }

    /// Build a terminator from the opener text, e.g. `<<~'EOS'`.
    pub fn from_opener(opener: &str) -> Result<Self, HeredocError> {
        let invalid = || HeredocError::InvalidOpener(opener.to_string());
        let rest = opener.strip_prefix("<<").ok_or_else(invalid)?;
        let (mut flags, rest) = match rest.as_bytes().first() {
            Some(b'~') => (StrFuncFlags::INDENT | StrFuncFlags::SQUIGGLY, &rest[1..]),
            Some(b'-') => (StrFuncFlags::INDENT, &rest[1..]),
            _ => (StrFuncFlags::empty(), rest),
        };
        let marker = match rest.as_bytes().first() {
            Some(&quote @ (b'\'' | b'"' | b'`')) => {
                let inner = rest[1..]
                    .strip_suffix(quote as char)
                    .ok_or_else(invalid)?;
                match quote {
                    b'"' => flags |= StrFuncFlags::EXPAND,
                    b'`' => flags |= StrFuncFlags::EXPAND | StrFuncFlags::XSTRING,
                    _ => {}
                }
                inner
            }
            Some(_) => {
                flags |= StrFuncFlags::EXPAND;
                rest
            }
            None => return Err(invalid()),
        };
        if marker.is_empty() || marker.contains('\n') {
            return Err(invalid());
        }
        Ok(Self::new(marker, flags))
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn flags(&self) -> StrFuncFlags {
        self.flags
    }

    /// Whether `line` (with or without its line terminator) ends the body.
    pub fn is_terminator(&self, line: &str) -> bool {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);
        let line = if self.flags.contains(StrFuncFlags::INDENT) {
            line.trim_start_matches([' ', '\t'])
        } else {
            line
        };
        line == self.marker
    }

    /// Scan the body starting at `body_start` (the first byte after the
    /// opener line's newline).
    pub fn scan(&self, source: &str, body_start: usize) -> Result<HeredocBody, HeredocError> {
        let bytes = source.as_bytes();
        let mut lines: Vec<Vec<HeredocPart>> = Vec::new();
        let mut pos = body_start;

        loop {
            if pos >= bytes.len() {
                return Err(HeredocError::Unterminated {
                    marker: self.marker.clone(),
                    span: TextSpan::from_bounds(body_start as u32, bytes.len() as u32),
                });
            }
            let line_end = memchr::memchr(b'\n', &bytes[pos..])
                .map(|idx| pos + idx + 1)
                .unwrap_or(bytes.len());
            if self.is_terminator(&source[pos..line_end]) {
                let parts = self.finish(lines);
                return Ok(HeredocBody {
                    parts,
                    body_span: TextSpan::from_bounds(body_start as u32, pos as u32),
                    end: line_end,
                });
            }
            if self.flags.contains(StrFuncFlags::EXPAND) {
                let (parts, next) = self.scan_expanding_line(source, pos)?;
                lines.push(parts);
                pos = next;
            } else {
                lines.push(vec![HeredocPart::Literal(source[pos..line_end].to_string())]);
                pos = line_end;
            }
        }
    }

    /// Scan one logical line with escapes and interpolation. An interpolation
    /// may run over several physical lines; the logical line ends at the
    /// first newline outside of one.
    fn scan_expanding_line(
        &self,
        source: &str,
        start: usize,
    ) -> Result<(Vec<HeredocPart>, usize), HeredocError> {
        let bytes = source.as_bytes();
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut i = start;

        while i < bytes.len() {
            match bytes[i] {
                b'\\' => {
                    let continued = matches!(bytes.get(i + 1), Some(b'\n'));
                    i = read_escape(bytes, i, &mut literal).map_err(|err| {
                        HeredocError::InvalidEscape {
                            text: err.text,
                            span: TextSpan::new(i as u32, 2),
                        }
                    })?;
                    if continued {
                        break;
                    }
                }
                b'#' if bytes.get(i + 1) == Some(&b'{') => {
                    let close = find_closing_brace(bytes, i + 2).ok_or(
                        HeredocError::UnterminatedInterpolation {
                            span: TextSpan::from_bounds(i as u32, bytes.len() as u32),
                        },
                    )?;
                    flush(&mut literal, &mut parts);
                    parts.push(HeredocPart::Interpolation(TextSpan::from_bounds(
                        (i + 2) as u32,
                        close as u32,
                    )));
                    i = close + 1;
                }
                b'#' if variable_end(source, i + 1).is_some() => {
                    let end = variable_end(source, i + 1).unwrap_or(i + 1);
                    flush(&mut literal, &mut parts);
                    parts.push(HeredocPart::Variable(TextSpan::from_bounds(
                        (i + 1) as u32,
                        end as u32,
                    )));
                    i = end;
                }
                b'\n' => {
                    literal.push('\n');
                    i += 1;
                    break;
                }
                _ => {
                    let ch = source[i..].chars().next().unwrap_or('\u{fffd}');
                    literal.push(ch);
                    i += ch.len_utf8().max(1);
                }
            }
        }
        flush(&mut literal, &mut parts);
        Ok((parts, i))
    }

    fn finish(&self, lines: Vec<Vec<HeredocPart>>) -> Vec<HeredocPart> {
        let lines = if self.flags.contains(StrFuncFlags::SQUIGGLY) {
            dedent_squiggly(lines)
        } else {
            lines
        };
        let mut out: Vec<HeredocPart> = Vec::new();
        for part in lines.into_iter().flatten() {
            if let HeredocPart::Literal(text) = &part {
                if text.is_empty() {
                    continue;
                }
                if let Some(HeredocPart::Literal(prev)) = out.last_mut() {
                    prev.push_str(text);
                    continue;
                }
            }
            out.push(part);
        }
        out
    }
}

fn flush(literal: &mut String, parts: &mut Vec<HeredocPart>) {
    if !literal.is_empty() {
        parts.push(HeredocPart::Literal(std::mem::take(literal)));
    }
}

/// Index of the `}` closing an interpolation whose code starts at `from`.
fn find_closing_brace(bytes: &[u8], from: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'\\' => i += 1,
            _ => {}
        }
        i += 1;
    }
    None
}

/// End of an interpolated variable whose sigil starts at `sigil`, or `None`
/// when the `#` is literal text.
fn variable_end(source: &str, sigil: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let (name_start, allow_digit) = match bytes.get(sigil)? {
        b'@' if bytes.get(sigil + 1) == Some(&b'@') => (sigil + 2, false),
        b'@' => (sigil + 1, false),
        b'$' => (sigil + 1, true),
        _ => return None,
    };
    let mut chars = source.get(name_start..)?.char_indices();
    let (_, first) = chars.next()?;
    if first.is_ascii_digit() {
        if !allow_digit {
            return None;
        }
        let digits = source[name_start..]
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        return Some(name_start + digits);
    }
    if !(first == '_' || first.is_xid_start()) {
        return None;
    }
    let mut end = name_start + first.len_utf8();
    for (offset, ch) in chars {
        if ch == '_' || ch.is_xid_continue() {
            end = name_start + offset + ch.len_utf8();
        } else {
            break;
        }
    }
    Some(end)
}

/// Indentation width of one squiggly heredoc line, or `None` for a line
/// holding only whitespace. A line that starts with interpolation has
/// indentation zero.
pub fn heredoc_indent_of(line: &[HeredocPart]) -> Option<usize> {
    let Some(HeredocPart::Literal(text)) = line.first() else {
        return if line.is_empty() { None } else { Some(0) };
    };
    let mut col = 0usize;
    for ch in text.chars() {
        match ch {
            ' ' => col += 1,
            '\t' => col = (col / TAB_WIDTH + 1) * TAB_WIDTH,
            '\n' | '\r' => return None,
            _ => return Some(col),
        }
    }
    if line.len() > 1 {
        Some(col)
    } else {
        None
    }
}

/// Remove up to `width` columns of leading whitespace. A tab that would
/// cross the boundary is kept.
fn dedent_line(text: &str, width: usize) -> String {
    let mut col = 0usize;
    let mut cut = 0usize;
    for (idx, ch) in text.char_indices() {
        if col >= width {
            break;
        }
        match ch {
            ' ' => col += 1,
            '\t' => {
                let next = (col / TAB_WIDTH + 1) * TAB_WIDTH;
                if next > width {
                    break;
                }
                col = next;
            }
            _ => break,
        }
        cut = idx + 1;
    }
    text[cut..].to_string()
}

/// Dedent the lines of a squiggly heredoc by the least indentation of any
/// line that has content.
pub fn dedent_squiggly(lines: Vec<Vec<HeredocPart>>) -> Vec<Vec<HeredocPart>> {
    let width = lines
        .iter()
        .filter_map(|line| heredoc_indent_of(line))
        .min()
        .unwrap_or(0);
    if width == 0 {
        return lines;
    }
    lines
        .into_iter()
        .map(|mut line| {
            if let Some(HeredocPart::Literal(text)) = line.first_mut() {
                *text = dedent_line(text, width);
            }
            line
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_opener_flags() {
        let plain = HeredocTerm::from_opener("<<EOS").unwrap();
        assert_eq!(plain.marker(), "EOS");
        assert_eq!(plain.flags(), StrFuncFlags::EXPAND);

        let squiggly = HeredocTerm::from_opener("<<~'SQL'").unwrap();
        assert_eq!(squiggly.marker(), "SQL");
        assert!(squiggly.flags().contains(StrFuncFlags::SQUIGGLY | StrFuncFlags::INDENT));
        assert!(!squiggly.flags().contains(StrFuncFlags::EXPAND));

        let command = HeredocTerm::from_opener("<<-`CMD`").unwrap();
        assert!(command.flags().contains(StrFuncFlags::XSTRING));

        assert!(HeredocTerm::from_opener("<<'EOS").is_err());
        assert!(HeredocTerm::from_opener("<EOS").is_err());
    }

    #[test]
    fn test_terminator_matching() {
        let term = HeredocTerm::new("EOS", StrFuncFlags::EXPAND);
        assert!(term.is_terminator("EOS\n"));
        assert!(term.is_terminator("EOS\r\n"));
        assert!(term.is_terminator("EOS"));
        assert!(!term.is_terminator("  EOS\n"));
        assert!(!term.is_terminator("EOS2\n"));

        let indented = HeredocTerm::new("EOS", StrFuncFlags::INDENT);
        assert!(indented.is_terminator("\t  EOS\n"));
    }

    #[test]
    fn test_indent_of_lines() {
        let line = vec![HeredocPart::Literal("    abc\n".into())];
        assert_eq!(heredoc_indent_of(&line), Some(4));
        let blank = vec![HeredocPart::Literal("   \n".into())];
        assert_eq!(heredoc_indent_of(&blank), None);
        let tabbed = vec![HeredocPart::Literal("\t x\n".into())];
        assert_eq!(heredoc_indent_of(&tabbed), Some(9));
        let interp = vec![
            HeredocPart::Literal("  ".into()),
            HeredocPart::Interpolation(TextSpan::new(0, 1)),
        ];
        assert_eq!(heredoc_indent_of(&interp), Some(2));
    }

    #[test]
    fn test_dedent_keeps_partial_tab() {
        assert_eq!(dedent_line("\tabc", 4), "\tabc");
        assert_eq!(dedent_line("      abc", 4), "  abc");
        assert_eq!(dedent_line("  \n", 4), "\n");
    }
}
