//! Application configuration.
//!
//! Settings are layered: built-in defaults, then an optional YAML config
//! file, then `PORTFOLIO__`-prefixed environment variables (e.g.
//! `PORTFOLIO__SERVER__PORT=8000`), then explicit CLI flags. The flat legacy
//! names (`PORT`, `MOCK_MODE`, `ADMIN_TOKEN`, `ADMIN_PASSWORD`, ...) are
//! wired through clap's `env` attributes so existing deployments keep
//! working.
//!
//! The per-model gateway settings (`DEEPSEEK_API_URL`, `OPENAI_API_KEY`,
//! `GENERAL_PROMPT`, ...) are read separately by
//! [`crate::llm::ModelGateway::from_env`] at startup.

use clap::Parser;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Serve canned replies instead of calling upstream providers
    #[arg(long, env = "MOCK_MODE")]
    pub mock_mode: Option<bool>,

    /// Shared bearer token for profile writes
    #[arg(long, env = "ADMIN_TOKEN")]
    pub admin_token: Option<String>,

    /// Admin login password
    #[arg(long, env = "ADMIN_PASSWORD")]
    pub admin_password: Option<String>,

    /// Directory of built frontend assets
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<String>,

    /// Path of the profile JSON document
    #[arg(long, env = "PROFILE_PATH")]
    pub profile_path: Option<String>,

    /// Enable rate limiting
    #[arg(long, env = "RATE_LIMIT_ENABLED")]
    pub rate_limit_enabled: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub chat: ChatConfig,
    pub resilience: ResilienceConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub static_dir: String,
    pub profile_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SecurityConfig {
    /// Login password; login is disabled while unset.
    pub admin_password: Option<String>,
    /// Shared bearer token required by profile writes.
    pub admin_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    pub mock_mode: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResilienceConfig {
    pub rate_limit_enabled: bool,
    pub requests_per_second: f32,
    pub burst_size: f32,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.port", 3001)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.static_dir", "static")?
            .set_default("server.profile_path", "data/profile.json")?
            .set_default("security.admin_token", "your-secret-admin-token")?
            .set_default("chat.mock_mode", false)?
            .set_default("resilience.rate_limit_enabled", true)?
            .set_default("resilience.requests_per_second", 5.0)?
            .set_default("resilience.burst_size", 10.0)?;

        // Optional config file: explicit path wins, ./config.yaml as fallback
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::new(path, FileFormat::Yaml));
        } else {
            builder = builder.add_source(File::new("config", FileFormat::Yaml).required(false));
        }

        // Prefixed environment variables, e.g. PORTFOLIO__SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("PORTFOLIO")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        // CLI flags (and their legacy env names, via clap) take precedence
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(mock) = cli.mock_mode {
            builder = builder.set_override("chat.mock_mode", mock)?;
        }
        if let Some(token) = cli.admin_token {
            builder = builder.set_override("security.admin_token", token)?;
        }
        if let Some(password) = cli.admin_password {
            builder = builder.set_override("security.admin_password", password)?;
        }
        if let Some(dir) = cli.static_dir {
            builder = builder.set_override("server.static_dir", dir)?;
        }
        if let Some(path) = cli.profile_path {
            builder = builder.set_override("server.profile_path", path)?;
        }
        if let Some(rl) = cli.rate_limit_enabled {
            builder = builder.set_override("resilience.rate_limit_enabled", rl)?;
        }

        builder.build()?.try_deserialize()
    }
}
