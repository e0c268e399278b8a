//! Configuration loading from ember.toml.

use runtime::{AssistantConfig, DEFAULT_OLLAMA_URL, OllamaBackend};
use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Backend configuration.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Orchestrator settings.
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Enabled tools.
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Backend provider configuration.
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    /// Provider name (currently only "ollama" supported).
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Base URL of the provider.
    #[serde(default = "default_url")]
    pub url: String,

    /// Model to use. Overrides `assistant.model` when set.
    pub model: Option<String>,

    /// How long the provider keeps the model loaded, e.g. "10m".
    pub keep_alive: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            url: default_url(),
            model: None,
            keep_alive: None,
        }
    }
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}

/// Tool selection.
#[derive(Debug, Deserialize)]
pub struct ToolsConfig {
    /// Tools enabled at startup, in order.
    #[serde(default = "default_selected")]
    pub selected: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            selected: default_selected(),
        }
    }
}

fn default_selected() -> Vec<String> {
    ["getTodayDate", "queryRefine", "searchDuckduckgo"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Assistant settings with the backend's model applied.
    pub fn assistant(&self) -> AssistantConfig {
        let mut assistant = self.assistant.clone();
        if let Some(model) = &self.backend.model {
            assistant.model = model.clone();
        }
        assistant
    }

    /// Build the model backend from config.
    pub fn backend(&self, client: reqwest::Client) -> Result<OllamaBackend, ConfigError> {
        match self.backend.provider.as_str() {
            "ollama" => {
                let mut builder = OllamaBackend::builder().url(&self.backend.url).client(client);
                if let Some(keep_alive) = &self.backend.keep_alive {
                    builder = builder.keep_alive(keep_alive);
                }
                Ok(builder.build())
            }
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("unsupported backend provider '{0}': only 'ollama' is available")]
    UnsupportedProvider(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.backend.provider, "ollama");
        assert_eq!(config.backend.url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.tools.selected.len(), 3);
        assert_eq!(config.assistant().model, "qwen2.5:3b");
    }

    #[test]
    fn full_file() {
        let config = Config::parse(
            r#"
            [backend]
            url = "http://gpu-box:11434"
            model = "llama3.2:3b"

            [assistant]
            persona = "You are terse."
            max_tool_iterations = 2

            [assistant.heuristics]
            search_triggers = ["google"]

            [tools]
            selected = ["getTodayDate"]
            "#,
        )
        .unwrap();
        let assistant = config.assistant();
        assert_eq!(assistant.model, "llama3.2:3b");
        assert_eq!(assistant.persona, "You are terse.");
        assert_eq!(assistant.max_tool_iterations, 2);
        assert_eq!(assistant.heuristics.search_triggers, vec!["google"]);
        assert_eq!(assistant.syntax.open_marker, "<tool_call>");
        assert_eq!(config.tools.selected, vec!["getTodayDate"]);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = Config::parse("[backend]\nprovider = \"anthropic\"").unwrap();
        assert!(matches!(
            config.backend(reqwest::Client::new()),
            Err(ConfigError::UnsupportedProvider(p)) if p == "anthropic"
        ));
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        assert!(matches!(
            Config::parse("[backend"),
            Err(ConfigError::Parse(_))
        ));
    }
}
