//! # Huddle Server
//!
//! Multi-user chat relay over plain TCP.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings (port 12345, credentials from ./users.txt)
//! huddle
//!
//! # Run with environment variables
//! HUDDLE_PORT=4000 HUDDLE_CREDENTIALS=/etc/huddle/users.txt huddle
//!
//! # Connect
//! nc 127.0.0.1 12345
//! ```
//!
//! A `huddle.toml` in the working directory, `/etc/huddle/` or
//! `~/.config/huddle/` takes precedence over the environment defaults.

mod config;
mod credentials;
mod handlers;
mod metrics;
mod supervisor;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "huddle_server=debug,huddle_core=debug,huddle_transport=info".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::load()?;

    tracing::info!("Starting Huddle server on {}:{}", config.host, config.port);

    // Initialize metrics
    metrics::init_metrics();

    // Start the server
    handlers::run_server(config).await?;

    Ok(())
}
