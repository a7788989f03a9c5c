//! Configuration loading and defaults.
//!
//! Configuration comes from a TOML file (default location under the user
//! config dir) with every field defaulted, so an absent file yields a
//! working setup that mirrors the stock tool registry. The chat API key is
//! provisioned through the environment (`TANDEM_API_KEY`), never hardcoded;
//! a key in the config file is a fallback for local setups.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tandem_analysis::{AnalyzerSpec, CheckerRegistry, LanguageCheckers, ToolSchema, default_filter_keywords};
use tandem_providers::ChatConfig;
use tandem_types::Language;

/// Environment variable holding the chat API key.
pub const API_KEY_ENV: &str = "TANDEM_API_KEY";

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:5000";
const DEFAULT_CHAT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_CHAT_MODEL: &str = "deepseek/deepseek-r1:free";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Top-level service configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Keyword filter applied to rule-linter diagnostics.
    pub filter_keywords: Vec<String>,
    pub chat: ChatSettings,
    /// Per-language checker registry, keyed by wire language name.
    pub languages: HashMap<String, LanguageCheckers>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub base_url: String,
    pub model: String,
    /// Fallback key; `TANDEM_API_KEY` takes precedence.
    pub api_key: Option<String>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CHAT_BASE_URL.to_string(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            api_key: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            filter_keywords: default_filter_keywords(),
            chat: ChatSettings::default(),
            languages: default_languages(),
        }
    }
}

/// The stock tool registry: pylsp + pylint for Python, the JSHint wrapper
/// script for JavaScript.
fn default_languages() -> HashMap<String, LanguageCheckers> {
    let mut languages = HashMap::new();
    languages.insert(
        "python".to_string(),
        LanguageCheckers {
            syntax: true,
            analyzers: vec![
                AnalyzerSpec {
                    name: "pylsp".to_string(),
                    command: "python".to_string(),
                    args: vec!["-m".to_string(), "pylsp".to_string(), "--check".to_string()],
                    schema: ToolSchema::Lsp,
                },
                AnalyzerSpec {
                    name: "pylint".to_string(),
                    command: "pylint".to_string(),
                    args: vec!["--output-format=json".to_string()],
                    schema: ToolSchema::Pylint,
                },
            ],
        },
    );
    languages.insert(
        "javascript".to_string(),
        LanguageCheckers {
            syntax: false,
            analyzers: vec![AnalyzerSpec {
                name: "jshint".to_string(),
                command: "node".to_string(),
                args: vec!["scripts/jshint-json.js".to_string()],
                schema: ToolSchema::Passthrough,
            }],
        },
    );
    languages
}

impl ServerConfig {
    /// Load from `path`, or from the default location, or fall back to the
    /// built-in defaults when no file exists.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = toml::from_str(&raw).map_err(|source| ConfigError::Parse { path, source })?;
        Ok(config)
    }

    /// Build the language → checkers registry, skipping (and logging)
    /// config keys outside the supported language set.
    #[must_use]
    pub fn registry(&self) -> CheckerRegistry {
        let mut languages: HashMap<Language, LanguageCheckers> = HashMap::new();
        for (name, checkers) in &self.languages {
            match Language::parse(name) {
                Some(language) => {
                    languages.insert(language, checkers.clone());
                }
                None => {
                    tracing::warn!(language = %name, "ignoring checkers for unsupported language");
                }
            }
        }
        CheckerRegistry::new(languages, self.filter_keywords.clone())
    }

    /// Resolve the chat client configuration, preferring the environment
    /// over the config file for the credential.
    #[must_use]
    pub fn chat_config(&self) -> ChatConfig {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.is_empty())
            .or_else(|| self.chat.api_key.clone())
            .unwrap_or_else(|| {
                tracing::warn!(
                    "no chat API key configured; set {API_KEY_ENV} for fix/autopilot support"
                );
                String::new()
            });
        ChatConfig {
            base_url: self.chat.base_url.clone(),
            api_key,
            model: self.chat.model.clone(),
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tandem").join("config.toml"))
}
