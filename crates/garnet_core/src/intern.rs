//! Symbol interning.
//!
//! Method names, variable names and symbol literals are interned so the
//! operation tree can compare them as integers. The interner is the only
//! mutable state shared between concurrently translated units, so it is
//! backed by a thread-safe rodeo.

use lasso::{Spur, ThreadedRodeo};
use std::fmt;
use std::sync::Arc;

/// An interned name.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct InternedString(Spur);

impl fmt::Debug for InternedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:?}", self.0)
    }
}

/// Clones share one table, which is how a host hands a single interner to
/// many translation units.
#[derive(Clone, Default)]
pub struct StringInterner {
    rodeo: Arc<ThreadedRodeo>,
}

impl StringInterner {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn intern(&self, s: &str) -> InternedString {
        InternedString(self.rodeo.get_or_intern(s))
    }

    /// Look up a name without interning it.
    #[inline]
    pub fn get(&self, s: &str) -> Option<InternedString> {
        self.rodeo.get(s).map(InternedString)
    }

    #[inline]
    pub fn resolve(&self, key: InternedString) -> &str {
        self.rodeo.resolve(&key.0)
    }

    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }
}

impl fmt::Debug for StringInterner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StringInterner({} names)", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_names_intern_once() {
        let interner = StringInterner::new();
        let setter = interner.intern("[]=");
        assert_eq!(interner.intern("[]="), setter);
        assert_ne!(interner.intern("[]"), setter);
        assert_eq!(interner.resolve(setter), "[]=");
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn test_get_does_not_intern() {
        let interner = StringInterner::new();
        assert!(interner.get("%multi_0").is_none());
        assert!(interner.is_empty());
    }

    #[test]
    fn test_clones_share_table() {
        let interner = StringInterner::new();
        let other = interner.clone();
        let each = other.intern("each");
        assert_eq!(interner.get("each"), Some(each));
    }
}
