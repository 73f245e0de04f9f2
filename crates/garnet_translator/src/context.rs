//! Per-unit translation state shared by every body translator of the unit.

use garnet_core::intern::StringInterner;
use garnet_core::text::{LineMap, TextSpan};
use garnet_options::TranslatorOptions;
use garnet_optree::Name;
use garnet_scope::ParseEnvironment;
use indexmap::IndexSet;

/// Everything one compilation unit's translation reads and writes besides
/// the tree itself.
///
/// Units never share a context; the interner inside the environment is the
/// only state shared across units, and it is thread-safe.
pub struct UnitContext {
    pub env: ParseEnvironment,
    pub options: TranslatorOptions,
    pub file_name: String,
    line_map: LineMap,
    /// 1-based lines registered for coverage, in first-seen order.
    coverage_lines: IndexSet<u32>,
    in_core: bool,
}

impl UnitContext {
    pub fn new(
        file_name: impl Into<String>,
        source: &str,
        interner: StringInterner,
        options: TranslatorOptions,
    ) -> Self {
        let file_name = file_name.into();
        let in_core = options.is_core_source(&file_name);
        Self {
            env: ParseEnvironment::new(interner),
            options,
            file_name,
            line_map: LineMap::new(source),
            coverage_lines: IndexSet::new(),
            in_core,
        }
    }

    #[inline]
    pub fn interner(&self) -> &StringInterner {
        self.env.interner()
    }

    #[inline]
    pub fn intern(&self, s: &str) -> Name {
        self.env.interner().intern(s)
    }

    #[inline]
    pub fn resolve(&self, name: Name) -> &str {
        self.env.interner().resolve(name)
    }

    /// Whether the unit is a core library source.
    #[inline]
    pub fn is_core(&self) -> bool {
        self.in_core
    }

    /// 1-based line of the start of `span`.
    pub fn line_of(&self, span: TextSpan) -> u32 {
        self.line_map.line_number(span.start)
    }

    /// Register a coverage line. Repeat registrations are ignored.
    pub fn register_coverage_line(&mut self, line: u32) {
        self.coverage_lines.insert(line);
    }

    pub fn coverage_lines(&self) -> Vec<u32> {
        self.coverage_lines.iter().copied().collect()
    }
}

/// Context-sensitive translation modes. Copied into a child translator's
/// defaults, never shared; every change is scoped by
/// [`BodyTranslator::with_flags`](crate::BodyTranslator::with_flags).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslatorFlags {
    /// Inside the body of a `for` loop's synthetic block.
    pub for_statement: bool,
    /// Translating the value of `next`: splatting nil yields `[]`.
    pub next_expression: bool,
    /// Inside a `while`/`until` body: `break`, `next` and `redo` target the
    /// loop.
    pub while_loop: bool,
    /// Privileged call mode: every call ignores visibility.
    pub privately: bool,
    /// Inside a rescue clause body: `retry` is valid.
    pub in_rescue: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coverage_lines_deduplicated() {
        let mut cx = UnitContext::new(
            "a.rb",
            "x = 1\ny = 2\n",
            StringInterner::new(),
            TranslatorOptions::default(),
        );
        cx.register_coverage_line(2);
        cx.register_coverage_line(1);
        cx.register_coverage_line(2);
        assert_eq!(cx.coverage_lines(), vec![2, 1]);
        assert_eq!(cx.line_of(TextSpan::new(6, 1)), 2);
    }

    #[test]
    fn test_core_flag_from_options() {
        let options = TranslatorOptions {
            core_path: Some("core/".to_string()),
            ..TranslatorOptions::default()
        };
        let cx = UnitContext::new("core/kernel.rb", "", StringInterner::new(), options);
        assert!(cx.is_core());
    }
}
