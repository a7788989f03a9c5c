//! External analyzer invocation.
//!
//! The source under check is written to a uniquely named scoped temporary
//! file whose lifetime covers all analyzer invocations for one request; the
//! `NamedTempFile` guard deletes it on every exit path. Analyzers run
//! sequentially and independently: a failed invocation becomes a single
//! diagnostic and never aborts the remaining analyzers.

use std::io::Write;
use std::path::Path;

use tandem_types::{Diagnostic, DiagnosticKind, Language};
use tempfile::NamedTempFile;
use tokio::process::Command;

use crate::{AnalyzerSpec, adapters};

/// Run every configured analyzer against `code`, in order.
pub async fn run_analyzers(
    specs: &[AnalyzerSpec],
    keywords: &[String],
    code: &str,
    language: Language,
) -> Vec<Diagnostic> {
    if specs.is_empty() {
        return Vec::new();
    }

    let staged = match stage_source(code, language) {
        Ok(file) => file,
        Err(e) => {
            return vec![Diagnostic::unpositioned(
                DiagnosticKind::Error,
                format!("failed to stage source for analysis: {e}"),
            )];
        }
    };

    run_staged(specs, keywords, staged.path()).await
    // `staged` drops here, removing the temp file.
}

/// Write the source to a scoped temp file with the language's suffix.
pub(crate) fn stage_source(code: &str, language: Language) -> std::io::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("tandem-check-")
        .suffix(language.file_suffix())
        .tempfile()?;
    file.write_all(code.as_bytes())?;
    file.flush()?;
    Ok(file)
}

pub(crate) async fn run_staged(
    specs: &[AnalyzerSpec],
    keywords: &[String],
    path: &Path,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for spec in specs {
        diagnostics.extend(run_one(spec, keywords, path).await);
    }
    diagnostics
}

/// Invoke a single analyzer and shape its outcome into diagnostics.
///
/// Failure policy: missing executable reports `ConfigError`; any other
/// invocation failure (spawn error, non-zero exit with nothing parseable,
/// malformed output) reports exactly one `Error` embedding the underlying
/// message.
async fn run_one(spec: &AnalyzerSpec, keywords: &[String], path: &Path) -> Vec<Diagnostic> {
    tracing::debug!(analyzer = %spec.name, command = %spec.command, path = %path.display(), "running analyzer");

    let output = match Command::new(&spec.command)
        .args(&spec.args)
        .arg(path)
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(analyzer = %spec.name, "analyzer executable not found");
            return vec![Diagnostic::unpositioned(
                DiagnosticKind::ConfigError,
                format!(
                    "analyzer `{}` not found: ensure `{}` is installed and on PATH",
                    spec.name, spec.command
                ),
            )];
        }
        Err(e) => {
            tracing::warn!(analyzer = %spec.name, error = %e, "failed to invoke analyzer");
            return vec![Diagnostic::unpositioned(
                DiagnosticKind::Error,
                format!("failed to invoke analyzer `{}`: {e}", spec.name),
            )];
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    if stdout.trim().is_empty() {
        if output.status.success() {
            return Vec::new();
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        return vec![Diagnostic::unpositioned(
            DiagnosticKind::Error,
            format!(
                "analyzer `{}` exited with {}: {}",
                spec.name,
                output.status,
                stderr.trim()
            ),
        )];
    }

    match adapters::parse_output(spec.schema, &stdout, keywords) {
        Ok(diags) => diags,
        Err(e) => {
            tracing::warn!(analyzer = %spec.name, error = %e, "unparsable analyzer output");
            vec![Diagnostic::unpositioned(
                DiagnosticKind::Error,
                format!("failed to parse `{}` output: {e}", spec.name),
            )]
        }
    }
}
