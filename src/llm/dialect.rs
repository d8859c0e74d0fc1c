//! Provider dialects: request/response shapes per upstream API family.
//!
//! Each configured model carries a [`Dialect`] tag; request building and
//! response extraction dispatch on that tag, so adding a third provider shape
//! is a change local to this module.
//!
//! # Dialects
//!
//! - [`Dialect::OpenAiCompatible`]: `/chat/completions`-style APIs (OpenAI,
//!   DeepSeek, and most self-hosted gateways). Bearer-token auth, deltas at
//!   `choices[0].delta.content`, terminated by a `[DONE]` sentinel line.
//! - [`Dialect::AnthropicMessages`]: the Anthropic Messages API. `x-api-key`
//!   plus `anthropic-version` headers, deltas in `content_block_delta`
//!   payloads at `delta.text`.

use serde_json::{Value, json};

/// Anthropic Messages API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Request/response shape and auth convention of an upstream provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// OpenAI-compatible Chat Completions shape.
    OpenAiCompatible,
    /// Anthropic Messages shape.
    AnthropicMessages,
}

impl Dialect {
    /// Build the JSON request body for a single-user-message completion.
    #[must_use]
    pub fn request_body(self, model_name: &str, prompt: &str, stream: bool) -> Value {
        match self {
            Self::OpenAiCompatible => {
                let mut body = json!({
                    "model": model_name,
                    "messages": [{ "role": "user", "content": prompt }],
                    "stream": stream,
                });
                if stream {
                    body["temperature"] = json!(0.7);
                    body["max_tokens"] = json!(2000);
                }
                body
            }
            Self::AnthropicMessages => {
                let mut body = json!({
                    "model": model_name,
                    "max_tokens": 4000,
                    "messages": [{ "role": "user", "content": prompt }],
                });
                if stream {
                    body["stream"] = json!(true);
                }
                body
            }
        }
    }

    /// Attach the dialect's authentication headers to a request.
    #[must_use]
    pub fn apply_auth(self, rb: reqwest::RequestBuilder, api_key: &str) -> reqwest::RequestBuilder {
        match self {
            Self::OpenAiCompatible => rb.bearer_auth(api_key),
            Self::AnthropicMessages => rb
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
        }
    }

    /// Extract the assistant text from a complete (non-streaming) response.
    #[must_use]
    pub fn extract_text(self, body: &Value) -> Option<String> {
        let text = match self {
            Self::OpenAiCompatible => body["choices"][0]["message"]["content"].as_str(),
            Self::AnthropicMessages => body["content"][0]["text"].as_str(),
        };
        text.map(ToString::to_string)
    }

    /// Extract the incremental text delta from one streamed JSON payload.
    ///
    /// Returns `None` for payloads that carry no text (role preludes, stop
    /// events, pings).
    #[must_use]
    pub fn extract_delta(self, payload: &Value) -> Option<String> {
        let text = match self {
            Self::OpenAiCompatible => payload["choices"][0]["delta"]["content"].as_str(),
            Self::AnthropicMessages => {
                if payload["type"].as_str() == Some("content_block_delta") {
                    payload["delta"]["text"].as_str()
                } else {
                    None
                }
            }
        };
        text.map(ToString::to_string)
    }

    /// Whether a `data:` payload is the upstream's own end-of-stream sentinel.
    ///
    /// Distinct from the application-level terminal frame: the sentinel is
    /// swallowed and the relay keeps reading until transport end.
    #[must_use]
    pub fn is_end_sentinel(self, data: &str) -> bool {
        match self {
            Self::OpenAiCompatible => data.contains("[DONE]"),
            Self::AnthropicMessages => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_streaming_body() {
        let body = Dialect::OpenAiCompatible.request_body("deepseek-chat", "hi", true);
        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["stream"], true);
        assert_eq!(body["temperature"], 0.7);
        assert_eq!(body["max_tokens"], 2000);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hi");
    }

    #[test]
    fn test_openai_non_streaming_body_has_no_sampling_params() {
        let body = Dialect::OpenAiCompatible.request_body("gpt-3.5-turbo", "hi", false);
        assert_eq!(body["stream"], false);
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_anthropic_body() {
        let body = Dialect::AnthropicMessages.request_body("claude-3-sonnet-20240229", "hi", false);
        assert_eq!(body["max_tokens"], 4000);
        assert!(body.get("stream").is_none());

        let body = Dialect::AnthropicMessages.request_body("claude-3-sonnet-20240229", "hi", true);
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn test_openai_delta_path() {
        let payload = json!({"choices": [{"delta": {"content": "Hel"}}]});
        assert_eq!(
            Dialect::OpenAiCompatible.extract_delta(&payload),
            Some("Hel".to_string())
        );

        // Role prelude carries no text
        let payload = json!({"choices": [{"delta": {"role": "assistant"}}]});
        assert_eq!(Dialect::OpenAiCompatible.extract_delta(&payload), None);
    }

    #[test]
    fn test_anthropic_delta_path() {
        let payload = json!({"type": "content_block_delta", "delta": {"type": "text_delta", "text": "Hel"}});
        assert_eq!(
            Dialect::AnthropicMessages.extract_delta(&payload),
            Some("Hel".to_string())
        );

        let payload = json!({"type": "message_stop"});
        assert_eq!(Dialect::AnthropicMessages.extract_delta(&payload), None);
    }

    #[test]
    fn test_full_response_extraction() {
        let openai = json!({"choices": [{"message": {"content": "Hello"}}]});
        assert_eq!(
            Dialect::OpenAiCompatible.extract_text(&openai),
            Some("Hello".to_string())
        );

        let anthropic = json!({"content": [{"type": "text", "text": "Hello"}]});
        assert_eq!(
            Dialect::AnthropicMessages.extract_text(&anthropic),
            Some("Hello".to_string())
        );
    }

    #[test]
    fn test_end_sentinel() {
        assert!(Dialect::OpenAiCompatible.is_end_sentinel("[DONE]"));
        assert!(!Dialect::OpenAiCompatible.is_end_sentinel(r#"{"choices":[]}"#));
        assert!(!Dialect::AnthropicMessages.is_end_sentinel("[DONE]"));
    }
}
