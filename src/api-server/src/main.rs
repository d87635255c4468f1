//! TodoList API Server
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings (0.0.0.0:8080)
//! TODO_API_JWT_SECRET=dev-secret cargo run
//!
//! # Start on custom host and port
//! cargo run -- --jwt-secret dev-secret --host 127.0.0.1 --port 9090
//!
//! # Enable debug logging
//! RUST_LOG=debug cargo run -- --jwt-secret dev-secret
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Logging filter (default: info)
//! - `TODO_API_HOST`: Server host (default: 0.0.0.0)
//! - `TODO_API_PORT`: Server port (default: 8080)
//! - `TODO_API_REQUEST_TIMEOUT`: Request timeout in seconds (default: 30)
//! - `TODO_API_JWT_SECRET`: HS256 secret for bearer tokens (required)
//! - `TODO_API_AUDIENCE` / `TODO_API_ISSUER`: required `aud` / `iss` claims
//! - `TODO_API_JSON_LOGS`: JSON log output
//! - `TODO_API_NO_SEED`: do not seed sample items into an empty store
//! - `TODO_API_STRICT`: consistent ownership and policy rules for update/delete

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use todolist_api_server::{AppState, AuthConfig, Server, ServerConfig};
use todolist_authz::EngineConfig;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// TodoList API Server
#[derive(Parser, Debug)]
#[command(
    name = "todolist-server",
    version,
    about = "Multi-tenant to-do list REST API with claims-based authorization",
    long_about = None
)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "TODO_API_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short = 'p', long, default_value = "8080", env = "TODO_API_PORT")]
    port: u16,

    /// Request timeout in seconds
    #[arg(long, default_value = "30", env = "TODO_API_REQUEST_TIMEOUT")]
    request_timeout: u64,

    /// HS256 secret used to verify bearer tokens
    #[arg(long, env = "TODO_API_JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    /// Required token audience
    #[arg(long, env = "TODO_API_AUDIENCE")]
    audience: Option<String>,

    /// Required token issuer
    #[arg(long, env = "TODO_API_ISSUER")]
    issuer: Option<String>,

    /// Do not seed sample items into an empty store
    #[arg(long, env = "TODO_API_NO_SEED")]
    no_seed: bool,

    /// Apply the same ownership and policy rules to update and delete as to
    /// the other operations
    #[arg(long, env = "TODO_API_STRICT")]
    strict: bool,

    /// Enable JSON logging format
    #[arg(long, env = "TODO_API_JSON_LOGS")]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info", env = "RUST_LOG")]
    log_level: String,
}

impl Args {
    fn engine_config(&self) -> EngineConfig {
        let base = if self.strict {
            EngineConfig::strict()
        } else {
            EngineConfig::default()
        };

        EngineConfig {
            seed_sample_data: !self.no_seed,
            ..base
        }
    }

    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            request_timeout: Duration::from_secs(self.request_timeout),
        }
    }

    fn auth_config(&self) -> AuthConfig {
        let mut auth = AuthConfig::new(self.jwt_secret.as_bytes());
        if let Some(audience) = &self.audience {
            auth = auth.with_audience(audience);
        }
        if let Some(issuer) = &self.issuer {
            auth = auth.with_issuer(issuer);
        }
        auth
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args);

    info!("Starting TodoList API Server");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    if args.jwt_secret.len() < 32 {
        warn!("JWT secret is shorter than 32 bytes");
    }

    let state = Arc::new(AppState::in_memory(args.engine_config(), args.auth_config()));

    let server = Server::new(args.server_config(), state);

    info!("Health check: http://{}:{}/health", args.host, args.port);
    info!("Press Ctrl+C to shutdown gracefully");

    if let Err(e) = server.run().await {
        error!("Server error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Initialize tracing/logging subsystem
fn init_tracing(args: &Args) {
    let filter = tracing_subscriber::EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| {
        eprintln!("Invalid log filter '{}', using 'info'", args.log_level);
        tracing_subscriber::EnvFilter::new("info")
    });

    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}
