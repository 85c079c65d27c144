//! Web server module
//!
//! Stateless summary and learning endpoints, plus an optional in-memory
//! session store for callers that prefer the server to hold their state.

pub mod http;
pub mod session;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::learning::PreferenceEngine;

pub use session::{Session, SessionStore};

/// Shared server state
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub engine: Arc<PreferenceEngine>,
    pub sessions: Arc<SessionStore>,
    pub round_timeout: Duration,
}

impl ServerState {
    pub fn new(config: Config, engine: PreferenceEngine) -> Self {
        let round_timeout = Duration::from_secs(config.server.round_timeout_secs);
        Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
            sessions: Arc::new(SessionStore::new()),
            round_timeout,
        }
    }
}

/// Build the application router
pub fn router(state: ServerState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/status", get(http::status_handler))
        .route("/api/summary", post(http::summary_handler))
        .route("/api/preferences", post(http::preferences_handler))
        .route("/api/diff", post(http::diff_handler))
        .route("/api/sessions", post(http::create_session_handler))
        .route(
            "/api/sessions/{id}",
            get(http::get_session_handler).delete(http::delete_session_handler),
        )
        .route("/api/sessions/{id}/summary", post(http::session_summary_handler))
        .route("/api/sessions/{id}/preferences", post(http::session_preferences_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the web server
pub async fn start(host: &str, port: u16) -> Result<()> {
    let config = Config::load()?;
    let engine = crate::agent::engine_from_config(&config)?;
    let model = config.llm.model.clone();
    let threshold = config.learning.default_threshold();
    let state = ServerState::new(config, engine);
    let round_timeout = state.round_timeout;

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid listen address")?;
    let app = router(state);

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("     Preference Learner Server Starting");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("✓ Model: {}", model);
    println!("✓ Promotion threshold: {}", threshold);
    println!("✓ Round timeout: {}s", round_timeout.as_secs());
    println!();
    println!("🚀 Listening on http://{}", addr);
    println!();

    info!("Binding {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
