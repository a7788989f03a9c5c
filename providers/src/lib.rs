//! Chat-completion client for fixes and autopilot code generation.
//!
//! # Architecture
//!
//! [`ChatClient`] talks to one OpenAI-compatible `/chat/completions`
//! endpoint (base URL and model are configuration). Two operations share it:
//!
//! - [`ChatClient::request_fix`] - explanation plus corrected code for one
//!   diagnostic; the raw response text is returned as the fix payload.
//! - [`ChatClient::request_generation`] - code-only completion for an
//!   instruction; a markdown fence wrapper is stripped from the response.
//!
//! # Error Handling
//!
//! Each operation is a single blocking call: no retry, no caching, no
//! timeout beyond the HTTP client's connect timeout. Every failure mode
//! (transport, non-2xx status, malformed response body) is folded into a
//! `{success: false, error}` result at this boundary; nothing propagates to
//! the session handler.

use serde::Deserialize;
use serde_json::json;
use tandem_types::{Diagnostic, FixResult, GenerationResult, Language};

const CONNECT_TIMEOUT_SECS: u64 = 30;
const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Endpoint, credential, and model selection for the chat API.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Base URL, e.g. `https://openrouter.ai/api/v1`.
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, thiserror::Error)]
enum ChatError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("response carried no completion choices")]
    EmptyResponse,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

/// Client handle for the external language-model endpoint.
///
/// Cheap to clone is not needed; one instance lives in the session context
/// and is shared by reference.
pub struct ChatClient {
    http: reqwest::Client,
    config: ChatConfig,
}

impl ChatClient {
    #[must_use]
    pub fn new(config: ChatConfig) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "failed to build HTTP client, using defaults");
                reqwest::Client::new()
            });
        Self { http, config }
    }

    /// Ask for an explanation and corrected code for one diagnostic.
    ///
    /// The raw response text is the fix payload; no post-processing.
    pub async fn request_fix(&self, code: &str, diagnostic: &Diagnostic) -> FixResult {
        let system = "You are an expert code debugger. Analyze the provided code and error, \
                      identify the problem, and suggest a fix. Provide a clear explanation \
                      and the corrected code.";
        let user = format!(
            "**Code**:\n```\n{code}\n```\n**Error**:\nLine {}, Col {}: {} ({})",
            diagnostic.line(),
            diagnostic.column(),
            diagnostic.message(),
            diagnostic.kind().label(),
        );

        match self.complete(system, &user).await {
            Ok(text) => FixResult::ok(text),
            Err(e) => {
                tracing::error!(error = %e, "fix request failed");
                FixResult::failure(format!("Failed to fetch fix: {e}"))
            }
        }
    }

    /// Generate code for an instruction, in the target language.
    ///
    /// An unsupported or absent language falls back to Python, matching the
    /// generation prompt's historical behavior. The response is stripped of
    /// a markdown fence wrapper before being returned.
    pub async fn request_generation(
        &self,
        instruction: &str,
        language: Option<Language>,
        code: &str,
    ) -> GenerationResult {
        let lang = language.map_or("Python", Language::display_name);
        let system = format!(
            "You are an expert {lang} coder. Generate {lang} code based on the user's \
             instruction, considering the existing code for context. Provide only the code \
             without explanations, formatted correctly for {lang}. Ensure the code is \
             concise, integrates seamlessly with the existing code, and follows the \
             instruction exactly."
        );
        let user = format!("**Existing Code**:\n```\n{code}\n```\n**Instruction**: {instruction}");

        match self.complete(&system, &user).await {
            Ok(text) => GenerationResult::ok(strip_code_fence(&text)),
            Err(e) => {
                tracing::error!(error = %e, "generation request failed");
                GenerationResult::failure(format!("Failed to generate code: {e}"))
            }
        }
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, ChatError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = read_capped_error_body(response).await;
            return Err(ChatError::Api { status, body });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(ChatError::EmptyResponse)
    }
}

async fn read_capped_error_body(response: reqwest::Response) -> String {
    match response.bytes().await {
        Ok(bytes) if bytes.len() > MAX_ERROR_BODY_BYTES => {
            let text = String::from_utf8_lossy(&bytes[..MAX_ERROR_BODY_BYTES]);
            format!("{text}...(truncated)")
        }
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    }
}

/// Strip a markdown code-fence wrapper from a model response.
///
/// Removes a leading fence line (with optional language tag) and a trailing
/// fence line, then trims surrounding whitespace. Text that is not fully
/// wrapped is returned trimmed but otherwise untouched.
#[must_use]
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let Some((_tag, body)) = rest.split_once('\n') else {
        return trimmed.to_string();
    };

    let body = body.trim_end();
    let body = body.strip_suffix("```").unwrap_or(body);
    body.trim_matches('\n').trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::{ChatClient, ChatConfig, strip_code_fence};
    use tandem_types::{Diagnostic, DiagnosticKind, Language};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ChatClient {
        ChatClient::new(ChatConfig {
            base_url: server.uri(),
            api_key: "test-key".to_string(),
            model: "test/model".to_string(),
        })
    }

    fn completion_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    mod fence {
        use super::strip_code_fence;

        #[test]
        fn strips_tagged_fence_wrapper() {
            assert_eq!(strip_code_fence("```python\nprint(1)\n```"), "print(1)");
        }

        #[test]
        fn strips_untagged_fence_wrapper() {
            assert_eq!(strip_code_fence("```\nlet x = 1;\n```"), "let x = 1;");
        }

        #[test]
        fn preserves_interior_lines_and_indentation() {
            let input = "```python\ndef f():\n    return 1\n```";
            assert_eq!(strip_code_fence(input), "def f():\n    return 1");
        }

        #[test]
        fn unfenced_text_is_only_trimmed() {
            assert_eq!(strip_code_fence("  print(1)\n"), "print(1)");
        }

        #[test]
        fn missing_trailing_fence_keeps_body() {
            assert_eq!(strip_code_fence("```python\nprint(1)"), "print(1)");
        }

        #[test]
        fn empty_response_stays_empty() {
            assert_eq!(strip_code_fence(""), "");
        }
    }

    #[tokio::test]
    async fn request_fix_returns_raw_response_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion_body("The colon is missing. Fixed:\n\nx = 1")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let diag = Diagnostic::new(1, 1, DiagnosticKind::SyntaxError, "invalid syntax");
        let result = client.request_fix("x 1", &diag).await;

        assert!(result.success);
        assert_eq!(
            result.fix.as_deref(),
            Some("The colon is missing. Fixed:\n\nx = 1")
        );
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn request_generation_strips_fence_from_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion_body("```python\nprint(1)\n```")),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client
            .request_generation("print one", Some(Language::Python), "")
            .await;

        assert!(result.success);
        assert_eq!(result.code.as_deref(), Some("print(1)"));
    }

    #[tokio::test]
    async fn api_error_status_becomes_failure_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let diag = Diagnostic::new(1, 1, DiagnosticKind::Error, "boom");
        let result = client.request_fix("x = 1", &diag).await;

        assert!(!result.success);
        let error = result.error.expect("error message");
        assert!(!error.is_empty());
        assert!(error.contains("500"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_becomes_failure_result() {
        // Bind-then-drop: nothing is listening at this address anymore.
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let client = ChatClient::new(ChatConfig {
            base_url: uri,
            api_key: "test-key".to_string(),
            model: "test/model".to_string(),
        });
        let result = client.request_generation("anything", None, "").await;

        assert!(!result.success);
        assert!(!result.error.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn empty_choices_becomes_failure_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let diag = Diagnostic::new(1, 1, DiagnosticKind::Error, "boom");
        let result = client.request_fix("x = 1", &diag).await;

        assert!(!result.success);
        assert!(result.error.unwrap_or_default().contains("no completion"));
    }
}
