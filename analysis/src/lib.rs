//! Syntax checking, analyzer invocation, and diagnostic normalization.
//!
//! # Architecture
//!
//! - [`syntax`] - in-memory parse check via tree-sitter (0 or 1 diagnostics)
//! - [`runner`] - scoped temp file + sequential external analyzer processes
//! - [`adapters`] - per-tool JSON schema mapping into [`Diagnostic`]
//! - [`run_checks`] - the merge point producing the ordered record sequence
//!
//! Ordering is producer order: the syntax checker's record first, then each
//! analyzer's records in configured order. No deduplication, no sorting.
//!
//! # Error Handling
//!
//! External failures never propagate out of a check: a missing or broken
//! analyzer becomes a `ConfigError`/`Error` diagnostic in the result
//! sequence, and an empty combined result becomes the explicit
//! `"No errors found"` sentinel record the client distinguishes from an
//! empty list.

pub mod adapters;
pub mod runner;
pub mod syntax;

use std::collections::HashMap;

use serde::Deserialize;
use tandem_types::{Diagnostic, ErrorRecord, Language};

/// Sentinel emitted when a check produces no findings.
pub const NO_ERRORS_FOUND: &str = "No errors found";
/// Sentinel emitted for a language outside the supported set.
pub const UNSUPPORTED_LANGUAGE: &str = "Unsupported language";

/// Default keyword filter for rule-linter diagnostics.
#[must_use]
pub fn default_filter_keywords() -> Vec<String> {
    vec![
        "unused".to_string(),
        "redefined".to_string(),
        "unreachable".to_string(),
    ]
}

/// Which adapter maps an analyzer's stdout into diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolSchema {
    /// `{"diagnostics": [...]}` with LSP ranges and numeric severities.
    Lsp,
    /// Pylint's `--output-format=json` issue array (keyword-filtered).
    Pylint,
    /// The tool already emits `[{line, column, type, message}]`.
    Passthrough,
}

/// One configured external analyzer.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerSpec {
    /// Display name used in failure diagnostics (e.g. "pylint").
    pub name: String,
    /// Executable to invoke; the staged file path is appended as the final
    /// argument.
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub schema: ToolSchema,
}

/// The checkers configured for one language.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LanguageCheckers {
    /// Whether to run the in-process syntax pass first.
    #[serde(default)]
    pub syntax: bool,
    #[serde(default)]
    pub analyzers: Vec<AnalyzerSpec>,
}

/// Registry mapping each supported language to its checkers, plus the shared
/// rule-diagnostic keyword filter.
///
/// Constructed once at startup from configuration and shared read-only by
/// every check request.
#[derive(Debug, Clone)]
pub struct CheckerRegistry {
    languages: HashMap<Language, LanguageCheckers>,
    filter_keywords: Vec<String>,
}

impl CheckerRegistry {
    #[must_use]
    pub fn new(languages: HashMap<Language, LanguageCheckers>, filter_keywords: Vec<String>) -> Self {
        Self {
            languages,
            filter_keywords,
        }
    }

    #[must_use]
    pub fn checkers_for(&self, language: Language) -> Option<&LanguageCheckers> {
        self.languages.get(&language)
    }

    #[must_use]
    pub fn filter_keywords(&self) -> &[String] {
        &self.filter_keywords
    }
}

/// Check `code` and produce the ordered, normalized record sequence.
///
/// `language` is the already-resolved variant; `None` is the unsupported
/// case and short-circuits to the `"Unsupported language"` record. The
/// result is never empty.
pub async fn run_checks(
    registry: &CheckerRegistry,
    code: &str,
    language: Option<Language>,
) -> Vec<ErrorRecord> {
    let Some(language) = language else {
        return vec![ErrorRecord::notice(UNSUPPORTED_LANGUAGE)];
    };
    let Some(checkers) = registry.checkers_for(language) else {
        return vec![ErrorRecord::notice(UNSUPPORTED_LANGUAGE)];
    };

    let mut records: Vec<ErrorRecord> = Vec::new();

    if checkers.syntax {
        if let Some(diag) = syntax::check_syntax(language, code) {
            records.push(diag.into());
        }
    }

    let analyzer_diags: Vec<Diagnostic> = runner::run_analyzers(
        &checkers.analyzers,
        registry.filter_keywords(),
        code,
        language,
    )
    .await;
    records.extend(analyzer_diags.into_iter().map(ErrorRecord::from));

    if records.is_empty() {
        records.push(ErrorRecord::notice(NO_ERRORS_FOUND));
    }
    records
}

#[cfg(test)]
mod tests {
    use super::{
        AnalyzerSpec, CheckerRegistry, LanguageCheckers, NO_ERRORS_FOUND, ToolSchema,
        UNSUPPORTED_LANGUAGE, default_filter_keywords, run_checks,
    };
    use std::collections::HashMap;
    use tandem_types::{DiagnosticKind, Language};

    fn syntax_only_registry() -> CheckerRegistry {
        let mut languages = HashMap::new();
        languages.insert(
            Language::Python,
            LanguageCheckers {
                syntax: true,
                analyzers: Vec::new(),
            },
        );
        CheckerRegistry::new(languages, default_filter_keywords())
    }

    #[tokio::test]
    async fn unsupported_language_short_circuits() {
        let registry = syntax_only_registry();
        let records = run_checks(&registry, "puts 'hello'", None).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message(), UNSUPPORTED_LANGUAGE);
        assert!(records[0].as_diagnostic().is_none());
    }

    #[tokio::test]
    async fn unconfigured_language_is_unsupported() {
        let registry = syntax_only_registry();
        let records = run_checks(&registry, "var x;", Some(Language::Javascript)).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message(), UNSUPPORTED_LANGUAGE);
    }

    #[tokio::test]
    async fn clean_code_yields_no_errors_sentinel() {
        let registry = syntax_only_registry();
        let records = run_checks(&registry, "x = 1\n", Some(Language::Python)).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message(), NO_ERRORS_FOUND);
        assert!(records[0].as_diagnostic().is_none());
    }

    #[tokio::test]
    async fn syntax_error_is_first_record() {
        let registry = syntax_only_registry();
        let records = run_checks(&registry, "def broken(\n", Some(Language::Python)).await;
        let first = records[0].as_diagnostic().expect("positioned diagnostic");
        assert_eq!(first.kind(), DiagnosticKind::SyntaxError);
        assert!(first.line() >= 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn syntax_record_precedes_analyzer_records() {
        let mut languages = HashMap::new();
        languages.insert(
            Language::Python,
            LanguageCheckers {
                syntax: true,
                analyzers: vec![AnalyzerSpec {
                    name: "emitter".to_string(),
                    command: "sh".to_string(),
                    args: vec![
                        "-c".to_string(),
                        r#"printf '[{"line":9,"column":1,"type":"Warning","message":"w"}]'"#
                            .to_string(),
                    ],
                    schema: ToolSchema::Passthrough,
                }],
            },
        );
        let registry = CheckerRegistry::new(languages, default_filter_keywords());

        let records = run_checks(&registry, "def broken(\n", Some(Language::Python)).await;
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].as_diagnostic().unwrap().kind(),
            DiagnosticKind::SyntaxError
        );
        assert_eq!(
            records[1].as_diagnostic().unwrap().kind(),
            DiagnosticKind::Warning
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn analyzer_failure_suppresses_no_errors_sentinel() {
        let mut languages = HashMap::new();
        languages.insert(
            Language::Python,
            LanguageCheckers {
                syntax: true,
                analyzers: vec![AnalyzerSpec {
                    name: "ghost".to_string(),
                    command: "tandem-no-such-analyzer-exe".to_string(),
                    args: Vec::new(),
                    schema: ToolSchema::Lsp,
                }],
            },
        );
        let registry = CheckerRegistry::new(languages, default_filter_keywords());

        let records = run_checks(&registry, "x = 1\n", Some(Language::Python)).await;
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].as_diagnostic().unwrap().kind(),
            DiagnosticKind::ConfigError
        );
    }
}
