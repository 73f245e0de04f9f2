//! garnet_compiler: Translation orchestration.
//!
//! Takes parsed compilation units, gives each its own translation context
//! and returns their top-level executable units. Units are independent, so
//! a batch is translated in parallel; the string interner is the only
//! state they share.

use garnet_ast::NodeRef;
use garnet_core::intern::StringInterner;
use garnet_diagnostics::{DiagnosticCollection, TranslateError};
use garnet_options::TranslatorOptions;
use garnet_optree::ExecutableUnit;
use garnet_translator::{translate_program, UnitContext};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// One parsed source file.
pub struct SourceUnit<'a> {
    pub file_name: String,
    /// The source text, used for line numbers.
    pub source: &'a str,
    /// The parse tree; `None` for an empty file.
    pub root: Option<NodeRef<'a>>,
}

impl<'a> SourceUnit<'a> {
    pub fn new(file_name: impl Into<String>, source: &'a str, root: Option<NodeRef<'a>>) -> Self {
        Self {
            file_name: file_name.into(),
            source,
            root,
        }
    }
}

#[derive(Debug)]
pub struct CompiledUnit {
    pub file_name: String,
    pub root: ExecutableUnit,
    /// 1-based lines registered for coverage, in first-seen order. Empty
    /// unless coverage is enabled.
    pub coverage_lines: Vec<u32>,
}

/// Receives the coverage lines of each translated unit.
pub trait CoverageSink: Send + Sync {
    fn lines_registered(&self, file_name: &str, lines: &[u32]);
}

pub struct Compiler {
    options: TranslatorOptions,
    interner: StringInterner,
    coverage_sink: Option<Arc<dyn CoverageSink>>,
}

impl Compiler {
    pub fn new(options: TranslatorOptions) -> Self {
        Self::with_interner(options, StringInterner::new())
    }

    /// Share an existing interner, so names in the output compare equal to
    /// names the host already interned.
    pub fn with_interner(options: TranslatorOptions, interner: StringInterner) -> Self {
        Self {
            options,
            interner,
            coverage_sink: None,
        }
    }

    pub fn with_coverage_sink(mut self, sink: Arc<dyn CoverageSink>) -> Self {
        self.coverage_sink = Some(sink);
        self
    }

    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    pub fn options(&self) -> &TranslatorOptions {
        &self.options
    }

    /// Translate one unit. The first error aborts the unit.
    pub fn translate_unit(&self, unit: &SourceUnit<'_>) -> Result<CompiledUnit, TranslateError> {
        let started = Instant::now();
        debug!(file = %unit.file_name, "translating unit");

        let mut cx = UnitContext::new(
            unit.file_name.clone(),
            unit.source,
            self.interner.clone(),
            self.options.clone(),
        );
        let root = translate_program(unit.root, &mut cx)?;
        let coverage_lines = cx.coverage_lines();

        if self.options.coverage {
            if let Some(sink) = &self.coverage_sink {
                sink.lines_registered(&unit.file_name, &coverage_lines);
            }
        }
        debug!(
            file = %unit.file_name,
            locals = root.locals.len(),
            frames = cx.env.frame_count(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "translated unit"
        );
        Ok(CompiledUnit {
            file_name: unit.file_name.clone(),
            root,
            coverage_lines,
        })
    }

    /// Translate a batch of units in parallel. Results come back in input
    /// order.
    pub fn translate_all(&self, units: &[SourceUnit<'_>]) -> Vec<Result<CompiledUnit, TranslateError>> {
        units.par_iter().map(|unit| self.translate_unit(unit)).collect()
    }

    /// Translate a batch, collecting the failures as diagnostics.
    pub fn translate_all_reporting(&self, units: &[SourceUnit<'_>]) -> (Vec<CompiledUnit>, DiagnosticCollection) {
        let mut compiled = Vec::with_capacity(units.len());
        let mut diagnostics = DiagnosticCollection::new();
        for (unit, result) in units.iter().zip(self.translate_all(units)) {
            match result {
                Ok(unit) => compiled.push(unit),
                Err(err) => diagnostics.add(err.to_diagnostic(&unit.file_name)),
            }
        }
        diagnostics.sort();
        (compiled, diagnostics)
    }
}
