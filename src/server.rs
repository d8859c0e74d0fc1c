use std::path::Path;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{any, get, post, put},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::config::AppConfig;
use crate::events::{frame_stream, iso_timestamp};
use crate::llm::relay::ChatReply;
use crate::llm::{ChatError, ChatRelay, ModelGateway};
use crate::profile::ProfileStore;
use crate::security::{self, SimpleRateLimiter};

/// Start the server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>, gateway: ModelGateway) -> anyhow::Result<()> {
    let gateway = Arc::new(gateway);

    info!(
        name: "gateway.loaded",
        models = gateway.available_models(true).len(),
        mock_mode = config.chat.mock_mode,
        "Model gateway loaded"
    );

    let relay = Arc::new(ChatRelay::new(Arc::clone(&gateway), config.chat.mock_mode));
    let profiles = ProfileStore::new(&config.server.profile_path);
    let rate_limiter = Arc::new(SimpleRateLimiter::new(
        config.resilience.requests_per_second,
        config.resilience.burst_size,
    ));

    let state = AppState {
        relay,
        gateway,
        profiles,
        rate_limiter,
        config: config.clone(),
    };

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        static_dir = %config.server.static_dir,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Build the application router.
///
/// Separated from [`start_server`] so integration tests can drive the full
/// middleware stack without binding a socket.
pub fn build_router(state: AppState) -> Router {
    let static_dir = state.config.server.static_dir.clone();
    let index = Path::new(&static_dir).join("index.html");
    let spa = ServeDir::new(&static_dir).not_found_service(ServeFile::new(index));

    Router::new()
        // AI chat API
        .route("/api/chat", post(api_chat))
        .route("/api/chat/stream", post(api_chat_stream))
        .route("/api/chat/models", get(api_chat_models))
        // Portfolio API
        .route("/api/profile", get(api_get_profile))
        .route(
            "/api/profile",
            put(api_put_profile).route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                security::require_admin,
            )),
        )
        .route("/api/admin/login", post(api_admin_login))
        // Health checks (the bare /health one predates the /api prefix)
        .route("/api/health", get(api_health))
        .route("/health", get(health))
        // Unknown API routes get JSON 404s, not the SPA shell
        .route("/api/{*rest}", any(api_not_found))
        // Everything else is the built frontend, with SPA fallback
        .fallback_service(spa)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            security::rate_limit_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB limit
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat API
// ─────────────────────────────────────────────────────────────────────────────

/// Request body for both chat endpoints.
#[derive(Debug, Deserialize)]
struct ChatRequest {
    /// User prompt.
    #[serde(default)]
    prompt: String,
    /// Model id; the general persona when absent.
    #[serde(default = "default_model")]
    model: String,
}

fn default_model() -> String {
    "general".to_string()
}

/// POST /api/chat - Non-streaming chat.
async fn api_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ChatError> {
    tracing::info!(
        name: "chat.request",
        model = %req.model,
        prompt_length = req.prompt.len(),
        "Received chat request"
    );

    let reply = state.relay.complete(&req.prompt, &req.model).await?;
    Ok(Json(reply))
}

/// POST /api/chat/stream - Streaming chat over SSE.
///
/// The transport is switched into event-stream mode before any validation
/// runs, so validation failures arrive as in-band error frames and the HTTP
/// status stays 200.
async fn api_chat_stream(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    let events = state.relay.stream(req.prompt, req.model);
    let body = Body::from_stream(frame_stream(events));
    build_sse_response(body)
}

/// GET /api/chat/models - Usable models and their system prompts.
async fn api_chat_models(State(state): State<AppState>) -> Json<Value> {
    let mock_mode = state.relay.mock_mode();
    let prompts: serde_json::Map<String, Value> = state
        .gateway
        .prompts()
        .entries()
        .map(|(id, prompt)| (id.to_string(), Value::String(prompt.to_string())))
        .collect();

    Json(json!({
        "models": state.gateway.available_models(mock_mode),
        "prompts": prompts,
        "mockMode": mock_mode,
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Portfolio API
// ─────────────────────────────────────────────────────────────────────────────

/// GET /api/profile - The stored (or default) profile document.
async fn api_get_profile(State(state): State<AppState>) -> Response {
    match state.profiles.get().await {
        Ok(doc) => Json(doc).into_response(),
        Err(e) => {
            tracing::error!(name: "profile.read_failed", error = %e, "Failed to read profile");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to read profile" })),
            )
                .into_response()
        }
    }
}

/// PUT /api/profile - Replace the profile document (admin only).
async fn api_put_profile(State(state): State<AppState>, Json(doc): Json<Value>) -> Response {
    match state.profiles.put(&doc).await {
        Ok(()) => Json(doc).into_response(),
        Err(e) => {
            tracing::error!(name: "profile.write_failed", error = %e, "Failed to save profile");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to save profile" })),
            )
                .into_response()
        }
    }
}

/// Request body for admin login.
#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    password: String,
}

/// Response for a successful admin login.
#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
}

/// POST /api/admin/login - Exchange the admin password for the bearer token.
async fn api_admin_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, Json<Value>)> {
    let configured = state.config.security.admin_password.as_deref();
    if configured.is_some() && configured == Some(req.password.as_str()) {
        info!(name: "admin.login", "Admin login succeeded");
        Ok(Json(LoginResponse {
            token: state.config.security.admin_token.clone(),
        }))
    } else {
        info!(name: "admin.login.rejected", "Admin login rejected");
        Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid password" })),
        ))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Health & fallbacks
// ─────────────────────────────────────────────────────────────────────────────

/// GET /api/health - Service health plus profile-store status.
async fn api_health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "OK",
        "service": "portfolio-server",
        "timestamp": iso_timestamp(),
        "profileFileExists": state.profiles.exists(),
        "environment": environment(),
    }))
}

/// GET /health - Compatibility health check.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "timestamp": iso_timestamp(),
        "environment": environment(),
    }))
}

fn environment() -> String {
    std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string())
}

/// Any unmatched /api path.
async fn api_not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "API endpoint not found" })),
    )
}

/// SSE response headers: no caching, persistent connection, open CORS.
fn build_sse_response(body: Body) -> Response {
    let mut resp = Response::new(body);
    let h = resp.headers_mut();
    h.insert("Content-Type", "text/event-stream".parse().unwrap());
    h.insert("Cache-Control", "no-cache".parse().unwrap());
    h.insert("Connection", "keep-alive".parse().unwrap());
    h.insert("Access-Control-Allow-Origin", "*".parse().unwrap());
    h.insert("X-Accel-Buffering", "no".parse().unwrap());
    resp
}
