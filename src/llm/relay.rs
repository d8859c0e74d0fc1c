//! The chat relay: bridges one inbound chat request to one upstream model
//! call, in streaming or single-shot form.
//!
//! The streaming side accepts a prompt, opens a streaming upstream call, and
//! re-emits the provider's incremental deltas as normalized
//! [`StreamEvent`]s in arrival order — one upstream delta, one outbound
//! event, no coalescing. The non-streaming side awaits the full provider
//! response and returns a single [`ChatReply`].
//!
//! Because the output channel is shared for success and error frames,
//! validation failures on the streaming side are reported in-band as error
//! events rather than HTTP statuses.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use futures::{Stream, StreamExt};
use serde::Serialize;
use uuid::Uuid;

use crate::events::{StreamEvent, iso_timestamp};

use super::error::NOT_CONFIGURED_HINT;
use super::framing::LineFramer;
use super::{ChatError, ModelGateway};

/// Fixed inter-character delay for mock streaming.
const MOCK_CHAR_DELAY: Duration = Duration::from_millis(30);

/// Artificial processing delay for mock non-streaming replies.
const MOCK_REPLY_DELAY: Duration = Duration::from_millis(1000);

/// Reply from the non-streaming chat endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    /// Assistant text.
    pub response: String,
    /// Model id the reply was produced with.
    pub model: String,
    /// ISO-8601 time the reply was assembled.
    pub timestamp: String,
    /// Present (and `true`) only for mock-mode replies.
    #[serde(skip_serializing_if = "is_false")]
    pub mock: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(b: &bool) -> bool {
    !*b
}

/// Bridges chat requests to upstream model APIs.
///
/// Holds only read-only shared state; cloning is cheap and each request owns
/// its buffer, upstream connection and outbound event stream.
#[derive(Clone)]
pub struct ChatRelay {
    http: reqwest::Client,
    gateway: Arc<ModelGateway>,
    mock_mode: bool,
}

impl std::fmt::Debug for ChatRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatRelay")
            .field("mock_mode", &self.mock_mode)
            .finish()
    }
}

impl ChatRelay {
    /// Create a relay over the given gateway.
    #[must_use]
    pub fn new(gateway: Arc<ModelGateway>, mock_mode: bool) -> Self {
        Self {
            http: reqwest::Client::new(),
            gateway,
            mock_mode,
        }
    }

    /// Whether mock mode is enabled.
    #[must_use]
    pub fn mock_mode(&self) -> bool {
        self.mock_mode
    }

    /// The gateway this relay resolves models against.
    #[must_use]
    pub fn gateway(&self) -> &ModelGateway {
        &self.gateway
    }

    /// Serve one non-streaming chat request.
    pub async fn complete(&self, prompt: &str, model_id: &str) -> Result<ChatReply, ChatError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ChatError::EmptyPrompt);
        }

        if self.mock_mode {
            tracing::info!(
                name: "chat.mock.reply",
                model = %model_id,
                "Mock mode: synthesizing reply"
            );
            tokio::time::sleep(MOCK_REPLY_DELAY).await;
            return Ok(ChatReply {
                response: canned_reply(model_id, prompt),
                model: model_id.to_string(),
                timestamp: iso_timestamp(),
                mock: true,
            });
        }

        let model = self
            .gateway
            .get(model_id)
            .ok_or_else(|| ChatError::UnsupportedModel(model_id.to_string()))?
            .clone();
        let key = model
            .configured_key()
            .ok_or_else(|| ChatError::NotConfigured(model_id.to_string()))?;

        let full_prompt = self.gateway.prompts().compose(model_id, prompt);
        tracing::debug!(
            name: "chat.prompt.resolved",
            model = %model_id,
            prompt_length = full_prompt.len(),
            "Resolved system prompt"
        );

        let body = model.dialect.request_body(&model.model_name, &full_prompt, false);
        let request = model
            .dialect
            .apply_auth(self.http.post(&model.endpoint_url).json(&body), key);

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            tracing::error!(
                name: "chat.upstream.error",
                model = %model_id,
                status = %status,
                "Upstream returned error status"
            );
            return Err(ChatError::from_upstream_body(status, &text));
        }

        let payload: serde_json::Value = resp.json().await?;
        let response = model
            .dialect
            .extract_text(&payload)
            .ok_or_else(|| ChatError::UpstreamStatus {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "Failed to get response from AI service".to_string(),
            })?;

        Ok(ChatReply {
            response,
            model: model_id.to_string(),
            timestamp: iso_timestamp(),
            mock: false,
        })
    }

    /// Serve one streaming chat request.
    ///
    /// Always yields a well-formed event sequence: zero or more content
    /// events followed by exactly one terminal event (`done` or `error`).
    #[must_use]
    pub fn stream(
        &self,
        prompt: String,
        model_id: String,
    ) -> Pin<Box<dyn Stream<Item = StreamEvent> + Send>> {
        let relay = self.clone();

        Box::pin(async_stream::stream! {
            let request_id = Uuid::new_v4().to_string();
            let prompt = prompt.trim().to_string();

            tracing::info!(
                name: "chat.stream.request",
                request_id = %request_id,
                model = %model_id,
                prompt_length = prompt.len(),
                "Received streaming chat request"
            );

            if prompt.is_empty() {
                yield StreamEvent::error("Prompt is required");
                return;
            }

            if relay.mock_mode {
                let reply = canned_reply(&model_id, &prompt);
                for ch in reply.chars() {
                    tokio::time::sleep(MOCK_CHAR_DELAY).await;
                    yield StreamEvent::content(ch.to_string());
                }
                yield StreamEvent::done(model_id);
                return;
            }

            let Some(model) = relay.gateway.get(&model_id).cloned() else {
                yield StreamEvent::error(format!("Unsupported model: {model_id}"));
                return;
            };
            let Some(key) = model.configured_key().map(ToString::to_string) else {
                yield StreamEvent::error_with_message(
                    format!("API key for {model_id} is not configured"),
                    NOT_CONFIGURED_HINT,
                );
                return;
            };

            let full_prompt = relay.gateway.prompts().compose(&model_id, &prompt);
            let body = model.dialect.request_body(&model.model_name, &full_prompt, true);
            let request = model
                .dialect
                .apply_auth(relay.http.post(&model.endpoint_url).json(&body), &key);

            let resp = match request.send().await.and_then(reqwest::Response::error_for_status) {
                Ok(r) => r,
                Err(e) => {
                    tracing::error!(
                        name: "chat.stream.dispatch_failed",
                        request_id = %request_id,
                        error = %e,
                        "Upstream dispatch failed"
                    );
                    yield StreamEvent::error_with_details(
                        "Failed to get stream response",
                        e.to_string(),
                    );
                    return;
                }
            };

            let mut framer = LineFramer::new();
            let bytes = resp.bytes_stream();
            futures::pin_mut!(bytes);

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::error!(
                            name: "chat.stream.transport_error",
                            request_id = %request_id,
                            error = %e,
                            "Upstream connection dropped mid-stream"
                        );
                        yield StreamEvent::error_with_details(
                            "Stream connection failed",
                            e.to_string(),
                        );
                        return;
                    }
                };

                for line in framer.push(&chunk) {
                    let line = line.trim();
                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let data = data.trim();
                    if data.is_empty() || model.dialect.is_end_sentinel(data) {
                        continue;
                    }

                    match serde_json::from_str::<serde_json::Value>(data) {
                        Ok(payload) => {
                            if let Some(delta) = model.dialect.extract_delta(&payload) {
                                if !delta.is_empty() {
                                    yield StreamEvent::content(delta);
                                }
                            }
                        }
                        Err(_) => {
                            // Malformed upstream framing must not abort the relay
                            tracing::trace!(
                                name: "chat.stream.malformed_line",
                                request_id = %request_id,
                                "Discarded unparseable upstream line"
                            );
                        }
                    }
                }
            }

            tracing::info!(
                name: "chat.stream.complete",
                request_id = %request_id,
                model = %model_id,
                "Upstream stream complete"
            );
            yield StreamEvent::done(model_id);
        })
    }
}

/// Canned per-model replies for mock mode, keyed by model id with the
/// general reply as fallback.
#[must_use]
pub fn canned_reply(model_id: &str, prompt: &str) -> String {
    match model_id {
        "creative" => format!(
            "🎨 Creative mode response to \"{prompt}\": Let me answer this question in an imaginative way..."
        ),
        "technical" => format!(
            "⚙️ Technical mode response to \"{prompt}\": Analyzing this question from a technical perspective..."
        ),
        "deepseek" => format!(
            "🤔 DeepSeek analysis of \"{prompt}\": Let me answer this with logical reasoning..."
        ),
        _ => format!(
            "This is a general response to \"{prompt}\". Currently using the general assistant mode."
        ),
    }
}
