//! Connection handlers for the Huddle server.
//!
//! This module owns the accept loop, the connection limit and the HTTP
//! health/stats endpoint. Each accepted connection is handed to a
//! [`ConnectionSupervisor`] on its own task.

use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::metrics::{self, ConnectionMetricsGuard};
use crate::supervisor::ConnectionSupervisor;
use anyhow::{Context, Result};
use axum::{extract::State, response::IntoResponse, routing::get, Json};
use huddle_core::{ConnectionId, GroupRegistry, Router, RouterStats, SessionRegistry};
use huddle_protocol::reply;
use huddle_transport::{Connection, TcpConfig, TcpTransport, Transport};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Pause after a failed accept before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Shared server state.
pub struct AppState {
    /// The message router.
    pub router: Router,
    /// Known users.
    pub credentials: Arc<CredentialStore>,
    /// Server configuration.
    pub config: Config,
    /// One permit per open connection.
    connection_limit: Arc<Semaphore>,
}

impl AppState {
    /// Create new app state.
    #[must_use]
    pub fn new(config: Config, credentials: CredentialStore) -> Self {
        let router = Router::new(
            Arc::new(SessionRegistry::new()),
            Arc::new(GroupRegistry::new()),
        );

        Self {
            router,
            credentials: Arc::new(credentials),
            connection_limit: Arc::new(Semaphore::new(config.limits.max_connections)),
            config,
        }
    }
}

/// Run the chat server.
///
/// # Errors
///
/// Returns an error if the credentials cannot be loaded or the listener
/// cannot be bound.
pub async fn run_server(config: Config) -> Result<()> {
    let credentials = CredentialStore::load(&config.credentials)?;
    let state = Arc::new(AppState::new(config.clone(), credentials));

    // Start metrics server if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    if config.http.enabled {
        let addr = config.http_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind HTTP endpoint on {addr}"))?;
        info!("HTTP endpoint listening on {}", addr);

        let app = http_router(Arc::clone(&state));
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("HTTP endpoint failed: {}", e);
            }
        });
    }

    let transport = TcpTransport::new(TcpConfig {
        bind_addr: config.bind_addr()?,
        max_line_length: config.limits.max_line_length,
    })
    .await?;

    info!("Huddle server listening on {}", config.bind_addr()?);

    accept_loop(&transport, state).await;

    Ok(())
}

/// Accept connections forever, spawning a task per connection.
pub async fn accept_loop<T: Transport>(transport: &T, state: Arc<AppState>) {
    loop {
        match transport.accept().await {
            Ok(conn) => {
                tokio::spawn(handle_connection(conn, Arc::clone(&state)));
            }
            Err(e) => {
                warn!(transport = transport.name(), error = %e, "Accept failed");
                metrics::record_error("accept");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}

/// Serve one accepted connection.
async fn handle_connection(mut conn: Box<dyn Connection>, state: Arc<AppState>) {
    let _metrics_guard = ConnectionMetricsGuard::new();

    let Ok(_permit) = Arc::clone(&state.connection_limit).try_acquire_owned() else {
        warn!(peer = ?conn.remote_addr(), "Connection limit reached");
        metrics::record_rejection();
        if let Err(e) = conn.write_line(reply::SERVER_FULL).await {
            debug!(error = %e, "Failed to send server-full notice");
        }
        if let Err(e) = conn.close().await {
            debug!(error = %e, "Failed to close refused connection");
        }
        return;
    };

    let connection_id = ConnectionId::next();
    debug!(connection = %connection_id, peer = ?conn.remote_addr(), "Connection accepted");

    let supervisor = ConnectionSupervisor::new(
        connection_id,
        conn,
        state.router.clone(),
        Arc::clone(&state.credentials),
    );
    if let Err(e) = supervisor.run().await {
        debug!(connection = %connection_id, error = %e, "Connection ended with error");
    }
}

/// Build the health/stats HTTP router.
pub fn http_router(state: Arc<AppState>) -> axum::Router {
    axum::Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .with_state(state)
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Registry counts.
async fn stats_handler(State(state): State<Arc<AppState>>) -> Json<RouterStats> {
    Json(state.router.stats())
}
