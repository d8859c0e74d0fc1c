//! Chat error taxonomy.
//!
//! Every failure is scoped to a single request; nothing here is fatal to the
//! process. The non-streaming endpoint converts a [`ChatError`] into an HTTP
//! response directly; the streaming endpoint reports the same conditions as
//! in-band error frames instead.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use thiserror::Error;

/// Remediation hint attached to configuration failures.
pub const NOT_CONFIGURED_HINT: &str =
    "Please set MOCK_MODE=true or configure API keys in the environment";

/// Failure modes of a chat request.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Prompt was empty after trimming. Client input error, never retried.
    #[error("Prompt is required")]
    EmptyPrompt,

    /// Unknown model id. Client input error, never retried.
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    /// Credential missing or a placeholder. Server-side configuration
    /// failure, distinct from upstream failures.
    #[error("API key for {0} is not configured")]
    NotConfigured(String),

    /// The provider answered with a non-success status before or instead of
    /// a usable body.
    #[error("upstream returned {status}: {message}")]
    UpstreamStatus {
        /// The provider's HTTP status, passed through to the client.
        status: StatusCode,
        /// Best-effort message extracted from the provider's error body.
        message: String,
    },

    /// The call to the provider failed at the transport level.
    #[error("Failed to get response from AI service")]
    Upstream(#[from] reqwest::Error),
}

impl ChatError {
    /// Build an [`ChatError::UpstreamStatus`] from a provider error body,
    /// extracting `error.message` when the body is the conventional JSON
    /// error envelope.
    #[must_use]
    pub fn from_upstream_body(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(ToString::to_string))
            .unwrap_or_else(|| "Failed to get response from AI service".to_string());
        Self::UpstreamStatus { status, message }
    }

    /// HTTP status this error maps to on the non-streaming endpoint.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::EmptyPrompt | Self::UnsupportedModel(_) => StatusCode::BAD_REQUEST,
            Self::NotConfigured(_) | Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UpstreamStatus { status, .. } => *status,
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            Self::NotConfigured(_) => json!({
                "error": self.to_string(),
                "message": NOT_CONFIGURED_HINT,
            }),
            Self::UpstreamStatus { message, .. } => json!({ "error": message }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
