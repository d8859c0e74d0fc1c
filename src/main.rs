//! Portfolio Server
//!
//! Entry point: loads configuration and the model gateway, then serves the
//! portfolio SPA, the profile API, and the AI chat relay.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use dotenvy::dotenv;
use portfolio_server::config::AppConfig;
use portfolio_server::llm::ModelGateway;
use portfolio_server::server::start_server;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (M-LOG-STRUCTURED)
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load .env (if present)
    let _ = dotenv();

    let config = match AppConfig::load() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    // The gateway and prompt set are read from the environment once and
    // immutable afterwards.
    let gateway = ModelGateway::from_env();

    start_server(config, gateway).await
}
