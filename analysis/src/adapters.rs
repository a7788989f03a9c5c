//! Per-tool output adapters.
//!
//! Each external analyzer reports JSON in its own schema; the adapters here
//! are the only place that schema knowledge lives. Everything downstream of
//! this module sees only [`Diagnostic`] values with 1-based positions.

use serde::Deserialize;
use tandem_types::{Diagnostic, DiagnosticKind};

use crate::ToolSchema;

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse an analyzer's stdout into diagnostics.
///
/// `keywords` is the rule-diagnostic filter set; it only applies to schemas
/// that report rule findings (`pylint`). Positions from zero-based tools are
/// converted to 1-based here.
pub fn parse_output(
    schema: ToolSchema,
    stdout: &str,
    keywords: &[String],
) -> Result<Vec<Diagnostic>, AdapterError> {
    match schema {
        ToolSchema::Lsp => parse_lsp(stdout),
        ToolSchema::Pylint => parse_pylint(stdout, keywords),
        ToolSchema::Passthrough => parse_passthrough(stdout),
    }
}

fn matches_keywords(message: &str, keywords: &[String]) -> bool {
    let lower = message.to_lowercase();
    keywords.iter().any(|kw| lower.contains(&kw.to_lowercase()))
}

// ── LSP check output: {"diagnostics": [{range, severity, message}]} ────────

#[derive(Deserialize)]
struct LspReport {
    #[serde(default)]
    diagnostics: Vec<LspDiagnostic>,
}

#[derive(Deserialize)]
struct LspDiagnostic {
    range: LspRange,
    #[serde(default)]
    severity: Option<u64>,
    message: String,
}

#[derive(Deserialize)]
struct LspRange {
    start: LspPosition,
}

#[derive(Deserialize)]
struct LspPosition {
    line: u32,
    character: u32,
}

/// LSP numeric severity → kind. The taxonomy has no Hint, so 3 and 4 both
/// report as Info; out-of-range values report as Other.
fn kind_from_lsp_severity(severity: Option<u64>) -> DiagnosticKind {
    match severity {
        Some(1) => DiagnosticKind::Error,
        Some(2) => DiagnosticKind::Warning,
        Some(3 | 4) => DiagnosticKind::Info,
        _ => DiagnosticKind::Other,
    }
}

fn parse_lsp(stdout: &str) -> Result<Vec<Diagnostic>, AdapterError> {
    let report: LspReport = serde_json::from_str(stdout)?;
    Ok(report
        .diagnostics
        .into_iter()
        .map(|diag| {
            Diagnostic::new(
                diag.range.start.line + 1,
                diag.range.start.character + 1,
                kind_from_lsp_severity(diag.severity),
                diag.message,
            )
        })
        .collect())
}

// ── Pylint JSON output: [{type, line, column, message, message-id}] ────────

#[derive(Deserialize)]
struct PylintIssue {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    line: u32,
    #[serde(default)]
    column: u32,
    message: String,
    #[serde(rename = "message-id", default)]
    message_id: String,
}

fn parse_pylint(stdout: &str, keywords: &[String]) -> Result<Vec<Diagnostic>, AdapterError> {
    let issues: Vec<PylintIssue> = serde_json::from_str(stdout)?;
    Ok(issues
        .into_iter()
        .filter(|issue| matches!(issue.kind.as_str(), "error" | "warning"))
        .filter(|issue| matches_keywords(&issue.message, keywords))
        .map(|issue| {
            let message = if issue.message_id.is_empty() {
                issue.message
            } else {
                format!("{} ({})", issue.message, issue.message_id)
            };
            Diagnostic::new(
                issue.line,
                // pylint lines are 1-based but columns are 0-based.
                issue.column + 1,
                DiagnosticKind::from_label(&issue.kind),
                message,
            )
        })
        .collect())
}

// ── Passthrough: tool already emits [{line, column, type, message}] ────────

fn parse_passthrough(stdout: &str) -> Result<Vec<Diagnostic>, AdapterError> {
    let diagnostics: Vec<Diagnostic> = serde_json::from_str(stdout)?;
    Ok(diagnostics)
}
