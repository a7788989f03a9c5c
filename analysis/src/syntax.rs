//! In-memory syntax checking via tree-sitter.
//!
//! Produces at most one diagnostic per check: the first error node in the
//! parse tree, with its 1-based position. Tree-sitter is error-tolerant, so
//! a tree is produced even for broken input; the walk below finds the first
//! ERROR or missing node in document order.

use tandem_types::{Diagnostic, DiagnosticKind, Language};

const MAX_CONTEXT_CHARS: usize = 30;

fn grammar(language: Language) -> Option<tree_sitter::Language> {
    match language {
        Language::Python => Some(tree_sitter_python::LANGUAGE.into()),
        // JavaScript has no in-process grammar; its pipeline relies on the
        // configured analyzers alone.
        Language::Javascript => None,
    }
}

/// Check `code` against the language's grammar.
///
/// Returns `None` on a clean parse or when the language carries no grammar,
/// otherwise exactly one `SyntaxError` diagnostic. A failure to run the
/// parser itself (grammar mismatch) reports with position 0.
#[must_use]
pub fn check_syntax(language: Language, code: &str) -> Option<Diagnostic> {
    let grammar = grammar(language)?;

    let mut parser = tree_sitter::Parser::new();
    if let Err(e) = parser.set_language(&grammar) {
        return Some(Diagnostic::unpositioned(
            DiagnosticKind::ConfigError,
            format!("syntax parser unavailable for {}: {e}", language.display_name()),
        ));
    }

    let Some(tree) = parser.parse(code, None) else {
        return Some(Diagnostic::unpositioned(
            DiagnosticKind::SyntaxError,
            "parser produced no syntax tree".to_string(),
        ));
    };

    let node = first_error_node(tree.root_node())?;
    let start = node.start_position();
    let message = describe_error(node, code);

    Some(Diagnostic::new(
        start.row as u32 + 1,
        start.column as u32 + 1,
        DiagnosticKind::SyntaxError,
        message,
    ))
}

/// First ERROR or missing node in document order.
fn first_error_node(node: tree_sitter::Node<'_>) -> Option<tree_sitter::Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error_node(child) {
            return Some(found);
        }
    }
    None
}

fn describe_error(node: tree_sitter::Node<'_>, source: &str) -> String {
    if node.is_missing() {
        return format!("missing {}", node.kind());
    }

    let context = source
        .get(node.byte_range())
        .map(str::trim)
        .unwrap_or_default();
    if context.is_empty() {
        return "invalid syntax".to_string();
    }

    let snippet: String = context.chars().take(MAX_CONTEXT_CHARS).collect();
    if snippet.len() < context.len() {
        format!("invalid syntax near `{snippet}...`")
    } else {
        format!("invalid syntax near `{snippet}`")
    }
}

#[cfg(test)]
mod tests {
    use super::check_syntax;
    use tandem_types::{DiagnosticKind, Language};

    #[test]
    fn valid_python_produces_no_diagnostic() {
        assert!(check_syntax(Language::Python, "def hello():\n    pass\n").is_none());
    }

    #[test]
    fn empty_source_parses_clean() {
        assert!(check_syntax(Language::Python, "").is_none());
    }

    #[test]
    fn broken_python_reports_syntax_error() {
        let diag = check_syntax(Language::Python, "def broken(\n").expect("diagnostic");
        assert_eq!(diag.kind(), DiagnosticKind::SyntaxError);
        assert!(diag.line() >= 1);
        assert!(diag.column() >= 1);
    }

    #[test]
    fn error_line_is_one_based() {
        // Line 1 is fine; the dangling paren starts on line 2.
        let diag = check_syntax(Language::Python, "x = 1\ny = (\n").expect("diagnostic");
        assert!(diag.line() >= 2);
    }

    #[test]
    fn javascript_has_no_syntax_pass() {
        assert!(check_syntax(Language::Javascript, "function broken( {").is_none());
    }
}
