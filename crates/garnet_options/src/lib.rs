//! garnet_options: Translator options.
//!
//! Options are plain data with defaults matching the runtime's defaults and
//! can be loaded from a JSON options file.

use serde::{Deserialize, Serialize};

/// Options consulted while translating a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslatorOptions {
    /// Log every switch to dynamic constant lookup and every lookup made
    /// while it is active.
    pub log_dynamic_constant_lookup: bool,
    /// Let `rescue` skip backtrace capture when the handler provably never
    /// looks at the exception.
    pub backtraces_omit_unused: bool,
    /// Mark and register coverage lines.
    pub coverage: bool,
    /// Sources under this path prefix may use core-only forms.
    pub core_path: Option<String>,
    /// Translate plain string literals as frozen.
    pub frozen_string_literals: bool,
}

impl Default for TranslatorOptions {
    fn default() -> Self {
        Self {
            log_dynamic_constant_lookup: false,
            backtraces_omit_unused: true,
            coverage: false,
            core_path: None,
            frozen_string_literals: false,
        }
    }
}

impl TranslatorOptions {
    /// Whether `file_name` is a core library source.
    pub fn is_core_source(&self, file_name: &str) -> bool {
        match &self.core_path {
            Some(prefix) if !prefix.is_empty() => file_name.starts_with(prefix.as_str()),
            _ => false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("cannot read options file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid options: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse options from a JSON string. Missing fields take their defaults.
pub fn parse_options(content: &str) -> Result<TranslatorOptions, OptionsError> {
    Ok(serde_json::from_str(content)?)
}

/// Parse options from a JSON file.
pub fn parse_options_file(path: &str) -> Result<TranslatorOptions, OptionsError> {
    let content = std::fs::read_to_string(path).map_err(|source| OptionsError::Io {
        path: path.to_string(),
        source,
    })?;
    parse_options(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = TranslatorOptions::default();
        assert!(options.backtraces_omit_unused);
        assert!(!options.coverage);
        assert!(!options.log_dynamic_constant_lookup);
    }

    #[test]
    fn test_parse_partial_json() {
        let options = parse_options(r#"{ "coverage": true, "corePath": "core/" }"#).unwrap();
        assert!(options.coverage);
        assert!(options.backtraces_omit_unused);
        assert_eq!(options.core_path.as_deref(), Some("core/"));
    }

    #[test]
    fn test_parse_camel_case_names() {
        let options = parse_options(
            r#"{ "backtracesOmitUnused": false, "frozenStringLiterals": true, "logDynamicConstantLookup": true }"#,
        )
        .unwrap();
        assert!(!options.backtraces_omit_unused);
        assert!(options.frozen_string_literals);
        assert!(options.log_dynamic_constant_lookup);
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(matches!(parse_options("{ coverage"), Err(OptionsError::Json(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = parse_options_file("/nonexistent/garnet-options.json").unwrap_err();
        assert!(matches!(err, OptionsError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/garnet-options.json"));
    }

    #[test]
    fn test_core_source_prefix() {
        let options = TranslatorOptions {
            core_path: Some("resource:/core/".to_string()),
            ..TranslatorOptions::default()
        };
        assert!(options.is_core_source("resource:/core/array.rb"));
        assert!(!options.is_core_source("app/array.rb"));
        assert!(!TranslatorOptions::default().is_core_source("resource:/core/array.rb"));
    }
}
