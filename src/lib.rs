//! Portfolio Server
//!
//! A personal-portfolio website backend: serves the built single-page
//! frontend, stores an editable profile document as JSON on disk, and
//! proxies chat prompts to upstream LLM HTTP APIs with optional SSE
//! streaming back to the browser.
//!
//! # Architecture
//!
//! - **Server**: Axum-based HTTP server with SSE streaming
//! - **Chat relay**: dialect-aware bridge to OpenAI-compatible and
//!   Anthropic Messages providers
//! - **Profile store**: single JSON document, last write wins
//! - **SPA serving**: static assets with an index fallback for client routes
//!
//! # Modules
//!
//! - [`llm`]: model gateway, prompt resolution, and the chat relay
//! - [`events`]: client-facing stream events and SSE framing
//! - [`profile`]: profile document storage
//! - [`server`]: router and handlers
//! - [`security`]: admin auth and rate limiting
//! - [`config`]: layered application configuration

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::default_trait_access)]
#![allow(clippy::unused_async)]

pub mod config;
pub mod events;
pub mod llm;
pub mod profile;
pub mod security;
pub mod server;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::llm::{ChatRelay, ModelGateway};
use crate::profile::ProfileStore;
use crate::security::SimpleRateLimiter;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Chat relay for both chat endpoints.
    pub relay: Arc<ChatRelay>,
    /// Upstream model gateway (read-only after startup).
    pub gateway: Arc<ModelGateway>,
    /// Profile document store.
    pub profiles: ProfileStore,
    /// Global rate limiter.
    pub rate_limiter: Arc<SimpleRateLimiter>,
    /// Global configuration.
    pub config: Arc<AppConfig>,
}
