//! Upstream model gateway, prompt resolution, and the chat relay.
//!
//! This module maps public model identifiers to the network details and
//! request dialect of the provider backing them, resolves per-model system
//! prompts, and bridges inbound chat requests to upstream LLM HTTP APIs.
//!
//! # Overview
//!
//! [`ModelGateway`] is built once from the environment at startup and never
//! mutated afterwards; it is shared by reference across all handlers.
//! [`ChatRelay`] consumes it to serve both the streaming and the
//! non-streaming chat endpoints.
//!
//! # Modules
//!
//! - [`dialect`]: provider request/response shapes ([`Dialect`])
//! - [`framing`]: incremental line framing over upstream byte chunks
//! - [`relay`]: the streaming relay and non-streaming completion
//! - [`error`]: the chat error taxonomy

pub mod dialect;
pub mod error;
pub mod framing;
pub mod relay;

pub use dialect::Dialect;
pub use error::ChatError;
pub use relay::ChatRelay;

use std::collections::BTreeMap;
use std::env;

/// Marker substring identifying an unconfigured placeholder credential.
const PLACEHOLDER_MARKER: &str = "your_";

/// Network details and dialect for one public model identifier.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Public model identifier (`general`, `deepseek`, `anthropic`, ...).
    pub id: String,
    /// Upstream endpoint URL.
    pub endpoint_url: String,
    /// Credential, if configured.
    pub api_key: Option<String>,
    /// Provider-side model name sent in the request body.
    pub model_name: String,
    /// Request/response dialect of the provider.
    pub dialect: Dialect,
}

impl ModelConfig {
    /// The credential, if present and not a placeholder.
    ///
    /// An absent, empty, or `your_`-marked key counts as "not configured".
    #[must_use]
    pub fn configured_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && !k.contains(PLACEHOLDER_MARKER))
    }

    /// Whether a usable credential is present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.configured_key().is_some()
    }
}

/// Immutable mapping from model identifier to upstream configuration.
///
/// Constructed once at process start; concurrent reads need no
/// synchronization.
#[derive(Debug)]
pub struct ModelGateway {
    models: BTreeMap<String, ModelConfig>,
    prompts: PromptSet,
}

impl ModelGateway {
    /// Build a gateway from an explicit model list (used by tests).
    #[must_use]
    pub fn new(models: Vec<ModelConfig>, prompts: PromptSet) -> Self {
        Self {
            models: models.into_iter().map(|m| (m.id.clone(), m)).collect(),
            prompts,
        }
    }

    /// Build the gateway from environment variables.
    ///
    /// The `general`, `creative` and `technical` personas alias the DeepSeek
    /// endpoint; `deepseek`, `openai` and `anthropic` read their own
    /// `*_API_URL` / `*_API_KEY` / `*_MODEL` triples.
    #[must_use]
    pub fn from_env() -> Self {
        let deepseek = |id: &str| ModelConfig {
            id: id.to_string(),
            endpoint_url: env_or("DEEPSEEK_API_URL", "https://api.deepseek.com/chat/completions"),
            api_key: env::var("DEEPSEEK_API_KEY").ok(),
            model_name: env_or("DEEPSEEK_MODEL", "deepseek-chat"),
            dialect: Dialect::OpenAiCompatible,
        };

        let models = vec![
            deepseek("general"),
            deepseek("creative"),
            deepseek("technical"),
            deepseek("deepseek"),
            ModelConfig {
                id: "openai".to_string(),
                endpoint_url: env_or("OPENAI_API_URL", "https://api.openai.com/v1/chat/completions"),
                api_key: env::var("OPENAI_API_KEY").ok(),
                model_name: env_or("OPENAI_MODEL", "gpt-3.5-turbo"),
                dialect: Dialect::OpenAiCompatible,
            },
            ModelConfig {
                id: "anthropic".to_string(),
                endpoint_url: env_or("ANTHROPIC_API_URL", "https://api.anthropic.com/v1/messages"),
                api_key: env::var("ANTHROPIC_API_KEY").ok(),
                model_name: env_or("ANTHROPIC_MODEL", "claude-3-sonnet-20240229"),
                dialect: Dialect::AnthropicMessages,
            },
        ];

        Self::new(models, PromptSet::from_env())
    }

    /// Look up a model. "Unsupported model" is a value, not an error.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ModelConfig> {
        self.models.get(id)
    }

    /// Model ids usable right now: all of them in mock mode, otherwise only
    /// those with a configured credential.
    #[must_use]
    pub fn available_models(&self, mock_mode: bool) -> Vec<String> {
        self.models
            .values()
            .filter(|m| mock_mode || m.is_configured())
            .map(|m| m.id.clone())
            .collect()
    }

    /// The system prompt set.
    #[must_use]
    pub fn prompts(&self) -> &PromptSet {
        &self.prompts
    }
}

/// Per-model system prompts: configured overrides merged over built-in
/// defaults, with the `general` entry as the lookup fallback.
#[derive(Debug, Clone)]
pub struct PromptSet {
    prompts: BTreeMap<String, String>,
}

impl PromptSet {
    /// The built-in defaults, merged under any `*_PROMPT` env overrides.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = [
            (
                "general",
                "You are the portfolio owner's AI assistant, a helpful and \
                 professional engineer. Provide balanced, informative responses \
                 that reflect a background in software engineering and AI \
                 technologies.",
                "GENERAL_PROMPT",
            ),
            (
                "creative",
                "You are the portfolio owner's AI assistant in creative mode, \
                 combining technical expertise with innovative thinking. Be \
                 imaginative and expressive, particularly when discussing \
                 project ideas or technology solutions.",
                "CREATIVE_PROMPT",
            ),
            (
                "technical",
                "You are the portfolio owner's AI assistant, a technical expert \
                 in AI agents, Python, JavaScript, React, and Rust. Provide \
                 clear, practical solutions with code examples when relevant.",
                "TECHNICAL_PROMPT",
            ),
            (
                "deepseek",
                "You are the portfolio owner's AI assistant. Provide thorough, \
                 well-reasoned responses with clear logical steps, drawing on \
                 experience in AI agents and full-stack development.",
                "DEEPSEEK_PROMPT",
            ),
        ];

        let prompts = defaults
            .into_iter()
            .map(|(id, default, var)| {
                let prompt = env::var(var)
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| default.to_string());
                (id.to_string(), prompt)
            })
            .collect();

        Self { prompts }
    }

    /// Build a prompt set from explicit entries (used by tests).
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            prompts: entries.into_iter().collect(),
        }
    }

    /// Resolve the system prompt for a model id. Never fails: an unknown id
    /// falls back to the `general` entry, and an empty set to "".
    #[must_use]
    pub fn resolve(&self, id: &str) -> &str {
        self.prompts
            .get(id)
            .or_else(|| self.prompts.get("general"))
            .map_or("", String::as_str)
    }

    /// Compose the final prompt sent upstream.
    #[must_use]
    pub fn compose(&self, id: &str, user_prompt: &str) -> String {
        format!("{}\n\nUser: {user_prompt}\n\nAssistant:", self.resolve(id))
    }

    /// All (id, prompt) entries, for the models listing.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prompts.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn env_or(var: &str, default: &str) -> String {
    env::var(var)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn config_with_key(key: Option<&str>) -> ModelConfig {
        ModelConfig {
            id: "general".to_string(),
            endpoint_url: "http://localhost/v1/chat/completions".to_string(),
            api_key: key.map(ToString::to_string),
            model_name: "test-model".to_string(),
            dialect: Dialect::OpenAiCompatible,
        }
    }

    #[test]
    fn test_placeholder_credentials_are_not_configured() {
        assert!(!config_with_key(None).is_configured());
        assert!(!config_with_key(Some("")).is_configured());
        assert!(!config_with_key(Some("   ")).is_configured());
        assert!(!config_with_key(Some("your_deepseek_api_key_here")).is_configured());
        assert!(config_with_key(Some("sk-real-key")).is_configured());
    }

    #[test]
    fn test_prompt_fallback_to_general() {
        let prompts = PromptSet::from_entries([
            ("general".to_string(), "be general".to_string()),
            ("technical".to_string(), "be technical".to_string()),
        ]);
        assert_eq!(prompts.resolve("technical"), "be technical");
        assert_eq!(prompts.resolve("openai"), "be general");
    }

    #[test]
    fn test_prompt_composition() {
        let prompts = PromptSet::from_entries([("general".to_string(), "sys".to_string())]);
        assert_eq!(
            prompts.compose("general", "hello"),
            "sys\n\nUser: hello\n\nAssistant:"
        );
    }

    #[test]
    fn test_available_models_filters_unconfigured() {
        let gateway = ModelGateway::new(
            vec![
                config_with_key(Some("sk-real")),
                ModelConfig {
                    id: "openai".to_string(),
                    ..config_with_key(None)
                },
            ],
            PromptSet::from_entries([]),
        );
        assert_eq!(gateway.available_models(false), vec!["general"]);

        let mut all = gateway.available_models(true);
        all.sort();
        assert_eq!(all, vec!["general", "openai"]);
    }

    #[test]
    #[serial]
    fn test_gateway_from_env_overrides() {
        unsafe {
            std::env::set_var("DEEPSEEK_API_URL", "http://127.0.0.1:9/custom");
            std::env::set_var("DEEPSEEK_API_KEY", "sk-test");
            std::env::set_var("GENERAL_PROMPT", "override prompt");
        }

        let gateway = ModelGateway::from_env();
        let general = gateway.get("general").expect("general model");
        assert_eq!(general.endpoint_url, "http://127.0.0.1:9/custom");
        assert!(general.is_configured());
        assert_eq!(
            gateway.get("anthropic").unwrap().dialect,
            Dialect::AnthropicMessages
        );
        assert_eq!(gateway.prompts().resolve("general"), "override prompt");
        assert!(gateway.get("does-not-exist").is_none());

        unsafe {
            std::env::remove_var("DEEPSEEK_API_URL");
            std::env::remove_var("DEEPSEEK_API_KEY");
            std::env::remove_var("GENERAL_PROMPT");
        }
    }
}
