//! Source spans and line maps.
//!
//! Parse nodes carry a byte span into the unit's source buffer; operation
//! nodes carry an optional copy of it. The line map turns spans into the
//! 1-based line numbers used for coverage and backtraces.

use std::fmt;
use std::ops::Range;

/// Byte offset into a unit's source buffer.
pub type TextPos = u32;

/// Start offset plus length, in bytes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct TextSpan {
    pub start: TextPos,
    pub length: TextPos,
}

impl TextSpan {
    #[inline]
    pub const fn new(start: TextPos, length: TextPos) -> Self {
        Self { start, length }
    }

    #[inline]
    pub fn from_bounds(start: TextPos, end: TextPos) -> Self {
        debug_assert!(end >= start, "span ends before it starts");
        Self::new(start, end.saturating_sub(start))
    }

    /// Exclusive end offset.
    #[inline]
    pub fn end(&self) -> TextPos {
        self.start + self.length
    }

    #[inline]
    pub fn to_range(&self) -> Range<usize> {
        self.start as usize..self.end() as usize
    }

    /// Covers both spans and whatever lies between them.
    pub fn union(&self, other: &TextSpan) -> TextSpan {
        TextSpan::from_bounds(self.start.min(other.start), self.end().max(other.end()))
    }
}

impl fmt::Debug for TextSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end())
    }
}

/// Line starts of one source buffer, computed once per unit.
#[derive(Debug, Clone)]
pub struct LineMap {
    starts: Vec<TextPos>,
}

impl LineMap {
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(memchr::memchr_iter(b'\n', source.as_bytes()).map(|nl| nl as TextPos + 1));
        Self { starts }
    }

    /// 1-based line containing `pos`. A newline byte belongs to the line it
    /// ends; offsets past the buffer land on the last line.
    pub fn line_number(&self, pos: TextPos) -> u32 {
        match self.starts.binary_search(&pos) {
            Ok(index) => index as u32 + 1,
            Err(index) => index as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_spans_gap() {
        let a = TextSpan::new(4, 2);
        let b = TextSpan::new(10, 5);
        assert_eq!(a.union(&b), TextSpan::from_bounds(4, 15));
        assert_eq!(b.union(&a), a.union(&b));
        assert_eq!(format!("{:?}", a), "4..6");
    }

    #[test]
    fn test_line_numbers() {
        let map = LineMap::new("x = 1\ny = 2\nputs x");
        assert_eq!(map.line_number(0), 1);
        assert_eq!(map.line_number(5), 1);
        assert_eq!(map.line_number(6), 2);
        assert_eq!(map.line_number(12), 3);
        assert_eq!(map.line_number(400), 3);
    }

    #[test]
    fn test_empty_source_is_one_line() {
        let map = LineMap::new("");
        assert_eq!(map.line_number(0), 1);
    }
}
