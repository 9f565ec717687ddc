//! HTTP API exposed to the browser front end.

use std::num::NonZeroU16;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, SessionManagerLayer};
use tracing::{error, info};

use crate::constants::{DEFAULT_SESSION_TTL_SECS, SESSION_PURGE_INTERVAL_SECS};
use crate::gateway::GatewayClient;

mod api;
mod prelude;
mod session_store;

pub use session_store::FlowStore;

use api::{analyze_handler, generate_handler, health_handler, reset_handler, session_handler};

/// Shared handler state.
#[derive(Clone, Debug)]
pub struct AppState {
    gateway: Arc<GatewayClient>,
    stale_after: i64,
    sessions: FlowStore,
    session_ttl: i64,
}

impl AppState {
    /// Wraps the gateway client; `stale_after` is in seconds.
    pub fn new(gateway: GatewayClient, stale_after: i64) -> Self {
        Self {
            gateway: Arc::new(gateway),
            stale_after,
            sessions: FlowStore::default(),
            session_ttl: DEFAULT_SESSION_TTL_SECS,
        }
    }

    /// Sessions idle for longer than `seconds` are forgotten.
    pub fn with_session_ttl(mut self, seconds: i64) -> Self {
        self.session_ttl = seconds;
        self
    }

    /// The session store backing the router.
    pub fn sessions(&self) -> &FlowStore {
        &self.sessions
    }
}

fn create_router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/api/analyze", post(analyze_handler))
        .route("/api/generate", post(generate_handler))
        .route("/api/session", get(session_handler))
        .route("/api/session/reset", post(reset_handler))
}

/// Router with state, sessions, body limit and request tracing applied.
pub fn build_app(state: AppState, max_body_bytes: usize) -> Router {
    let sessions = SessionManagerLayer::new(state.sessions.clone())
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(time::Duration::seconds(
            state.session_ttl,
        )));
    create_router()
        .with_state(state)
        .layer(sessions)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
}

/// Binds and serves until Ctrl-C.
pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    state: AppState,
    max_body_bytes: usize,
) -> Result<(), anyhow::Error> {
    tokio::spawn(
        state
            .sessions
            .clone()
            .purge_expired(Duration::from_secs(SESSION_PURGE_INTERVAL_SECS)),
    );
    let app = build_app(state, max_body_bytes);

    let addr = format!("{}:{}", listen_addr, port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", err);
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
        return;
    }
    info!("Shutting down");
}
