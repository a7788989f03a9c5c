//! Core domain types for tandem.
//!
//! This crate contains pure domain types with no IO, no async, and minimal
//! dependencies. Everything here can be used from any layer of the service.

pub mod events;

use serde::{Deserialize, Deserializer, Serialize};

/// A source language the backend knows how to check.
///
/// The wire protocol carries the language as a free-form string; it is
/// resolved to this closed enum at the dispatch boundary. An unrecognized
/// string is the distinct "unsupported language" case, not a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    Javascript,
}

impl Language {
    /// Resolve a client-supplied language string (case-insensitive).
    ///
    /// Returns `None` for anything outside the supported set. Callers
    /// (boundary code) decide the fallback policy.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "python" => Some(Self::Python),
            "javascript" => Some(Self::Javascript),
            _ => None,
        }
    }

    /// Human-readable name, used in model prompts.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Python => "Python",
            Self::Javascript => "JavaScript",
        }
    }

    /// File suffix for the scoped temporary file handed to analyzers.
    #[must_use]
    pub fn file_suffix(self) -> &'static str {
        match self {
            Self::Python => ".py",
            Self::Javascript => ".js",
        }
    }
}

/// Classification of a diagnostic finding.
///
/// Serialized as the wire-level `type` strings the client expects
/// (`"SyntaxError"`, `"Error"`, ...). Deserialization is lenient: unknown
/// labels become [`DiagnosticKind::Other`] so a malformed payload field
/// degrades instead of failing the whole event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum DiagnosticKind {
    SyntaxError,
    Error,
    Warning,
    Info,
    ConfigError,
    #[default]
    Other,
}

impl DiagnosticKind {
    /// Map a tool-reported severity label into the closed kind set.
    ///
    /// Matching is case-insensitive; unknown labels map to `Other`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "syntaxerror" => Self::SyntaxError,
            "error" => Self::Error,
            "warning" => Self::Warning,
            "info" | "information" => Self::Info,
            "configerror" => Self::ConfigError,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::SyntaxError => "SyntaxError",
            Self::Error => "Error",
            Self::Warning => "Warning",
            Self::Info => "Info",
            Self::ConfigError => "ConfigError",
            Self::Other => "Other",
        }
    }
}

impl<'de> Deserialize<'de> for DiagnosticKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        Ok(Self::from_label(&label))
    }
}

/// A single positioned finding describing a code issue.
///
/// Line and column are 1-based on the wire; `0` means the producing tool did
/// not report a position. Fields are private; construction goes through
/// [`Diagnostic::new`] and the adapters, so schema knowledge stays at the
/// boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostic {
    #[serde(default)]
    line: u32,
    #[serde(default)]
    column: u32,
    #[serde(rename = "type", default)]
    kind: DiagnosticKind,
    #[serde(default)]
    message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(line: u32, column: u32, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            kind,
            message: message.into(),
        }
    }

    /// A finding with no position: tool-level failures (`ConfigError`,
    /// wrapped invocation errors) report as line 0, column 0.
    #[must_use]
    pub fn unpositioned(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(0, 0, kind, message)
    }

    /// 1-based line; 0 when the tool reported no position.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// 1-based column; 0 when the tool reported no position.
    #[must_use]
    pub fn column(&self) -> u32 {
        self.column
    }

    #[must_use]
    pub fn kind(&self) -> DiagnosticKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// One entry of a `code_errors` response: either a positioned diagnostic or
/// a bare notice record.
///
/// The notices are the explicit sentinels the client distinguishes from an
/// empty list: `"No errors found"` and `"Unsupported language"`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ErrorRecord {
    Diagnostic(Diagnostic),
    Notice { message: String },
}

impl ErrorRecord {
    #[must_use]
    pub fn notice(message: impl Into<String>) -> Self {
        Self::Notice {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Diagnostic(diag) => diag.message(),
            Self::Notice { message } => message,
        }
    }

    #[must_use]
    pub fn as_diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::Diagnostic(diag) => Some(diag),
            Self::Notice { .. } => None,
        }
    }
}

impl From<Diagnostic> for ErrorRecord {
    fn from(diag: Diagnostic) -> Self {
        Self::Diagnostic(diag)
    }
}

/// Outcome of a fix request against the model endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct FixResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FixResult {
    #[must_use]
    pub fn ok(fix: impl Into<String>) -> Self {
        Self {
            success: true,
            fix: Some(fix.into()),
            error: None,
        }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            fix: None,
            error: Some(error.into()),
        }
    }
}

/// Outcome of a code-generation (autopilot) request.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationResult {
    #[must_use]
    pub fn ok(code: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(code.into()),
            error: None,
        }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            code: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Diagnostic, DiagnosticKind, ErrorRecord, FixResult, Language};

    #[test]
    fn language_parse_is_case_insensitive() {
        assert_eq!(Language::parse("Python"), Some(Language::Python));
        assert_eq!(Language::parse("JAVASCRIPT"), Some(Language::Javascript));
    }

    #[test]
    fn language_parse_rejects_unsupported() {
        assert_eq!(Language::parse("ruby"), None);
        assert_eq!(Language::parse(""), None);
    }

    #[test]
    fn kind_from_label_known_values() {
        assert_eq!(DiagnosticKind::from_label("error"), DiagnosticKind::Error);
        assert_eq!(
            DiagnosticKind::from_label("Warning"),
            DiagnosticKind::Warning
        );
        assert_eq!(
            DiagnosticKind::from_label("SyntaxError"),
            DiagnosticKind::SyntaxError
        );
        assert_eq!(
            DiagnosticKind::from_label("configerror"),
            DiagnosticKind::ConfigError
        );
    }

    #[test]
    fn kind_from_label_unknown_maps_to_other() {
        assert_eq!(
            DiagnosticKind::from_label("JSHintError"),
            DiagnosticKind::Other
        );
        assert_eq!(DiagnosticKind::from_label(""), DiagnosticKind::Other);
    }

    #[test]
    fn diagnostic_serializes_kind_as_type_field() {
        let diag = Diagnostic::new(3, 7, DiagnosticKind::Warning, "unused variable `x`");
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "line": 3,
                "column": 7,
                "type": "Warning",
                "message": "unused variable `x`"
            })
        );
    }

    #[test]
    fn diagnostic_deserializes_with_missing_fields() {
        let diag: Diagnostic = serde_json::from_str(r#"{"message": "boom"}"#).unwrap();
        assert_eq!(diag.line(), 0);
        assert_eq!(diag.column(), 0);
        assert_eq!(diag.kind(), DiagnosticKind::Other);
        assert_eq!(diag.message(), "boom");
    }

    #[test]
    fn diagnostic_deserializes_unknown_kind_leniently() {
        let diag: Diagnostic =
            serde_json::from_str(r#"{"line": 1, "column": 1, "type": "W042", "message": "m"}"#)
                .unwrap();
        assert_eq!(diag.kind(), DiagnosticKind::Other);
    }

    #[test]
    fn notice_serializes_as_bare_message() {
        let record = ErrorRecord::notice("No errors found");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({"message": "No errors found"}));
    }

    #[test]
    fn fix_result_failure_omits_fix_field() {
        let result = FixResult::failure("Failed to fetch fix: timeout");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("fix").is_none());
        assert_eq!(json["error"], "Failed to fetch fix: timeout");
    }
}
