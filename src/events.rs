//! Stream event types for the chat relay.
//!
//! This module defines the event union sent to the browser over SSE and the
//! helpers that turn a stream of events into a well-formed `text/event-stream`
//! body.
//!
//! # Event Types
//!
//! A [`StreamEvent`] is one of:
//! - a content delta (`{"content": "...", "done": false}`)
//! - a terminal completion marker (`{"done": true, "model": "...", "timestamp": "..."}`)
//! - a terminal error marker (`{"error": "...", "message"?, "details"?}`)
//!
//! Exactly one terminal event is emitted per request; [`frame_stream`]
//! enforces that discipline centrally.
//!
//! # Example
//!
//! ```rust
//! use portfolio_server::events::{StreamEvent, sse_frame};
//!
//! let frame = sse_frame(&StreamEvent::content("Hello"));
//! assert_eq!(frame, "data: {\"content\":\"Hello\",\"done\":false}\n\n");
//! ```

use chrono::{SecondsFormat, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};

/// One event on the client-facing stream.
///
/// The wire shapes are part of the public API: browser clients split the SSE
/// body on `\n\n` and switch on the presence of `content`, `done` and
/// `error` fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StreamEvent {
    /// Terminal completion marker.
    Done {
        /// Always `true`.
        done: bool,
        /// Model id the reply was produced with.
        model: String,
        /// ISO-8601 wall-clock time the terminal frame was constructed.
        timestamp: String,
    },
    /// Incremental text delta.
    Content {
        /// The text fragment to append.
        content: String,
        /// Always `false`.
        done: bool,
    },
    /// Terminal error marker. No frame follows this one.
    Error {
        /// Error description.
        error: String,
        /// Optional remediation hint for the user.
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        /// Optional underlying cause (transport error text, upstream body).
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
}

impl StreamEvent {
    /// Create a content delta event.
    #[must_use]
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content {
            content: text.into(),
            done: false,
        }
    }

    /// Create the terminal completion event, timestamped now.
    #[must_use]
    pub fn done(model: impl Into<String>) -> Self {
        Self::Done {
            done: true,
            model: model.into(),
            timestamp: iso_timestamp(),
        }
    }

    /// Create a terminal error event.
    #[must_use]
    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
            message: None,
            details: None,
        }
    }

    /// Create a terminal error event with a remediation hint.
    #[must_use]
    pub fn error_with_message(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
            message: Some(message.into()),
            details: None,
        }
    }

    /// Create a terminal error event carrying the underlying cause.
    #[must_use]
    pub fn error_with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
            message: None,
            details: Some(details.into()),
        }
    }

    /// Whether this event ends the stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}

/// ISO-8601 timestamp with millisecond precision (`2026-08-07T12:00:00.000Z`).
#[must_use]
pub fn iso_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Render a [`StreamEvent`] as a single SSE frame.
///
/// Each frame is the literal text `data: ` followed by the JSON-encoded
/// event followed by two newline characters.
#[must_use]
pub fn sse_frame(evt: &StreamEvent) -> String {
    let json = serde_json::to_string(evt).unwrap_or_else(|e| {
        serde_json::json!({ "error": "Failed to encode event", "details": e.to_string() })
            .to_string()
    });
    format!("data: {json}\n\n")
}

/// Adapt an event stream into an SSE body stream.
///
/// Enforces the terminal discipline in one place: the first terminal event
/// ends the output, so at most one terminal frame is ever written and no
/// frame follows it, regardless of what the producer yields afterwards.
pub fn frame_stream<S>(
    events: S,
) -> impl Stream<Item = Result<String, std::convert::Infallible>> + Send
where
    S: Stream<Item = StreamEvent> + Send + 'static,
{
    async_stream::stream! {
        futures::pin_mut!(events);
        while let Some(evt) = futures::StreamExt::next(&mut events).await {
            let terminal = evt.is_terminal();
            yield Ok(sse_frame(&evt));
            if terminal {
                break;
            }
        }
    }
}
