//! HTTP server for the mobile client
//!
//! Endpoints:
//! - GET  /api/status            - health check, reports ruleset version
//! - POST /api/coach/chat        - one chat round trip
//! - POST /api/coach/session/end - close a session, optional rating
//!
//! CORS is open (`*`, `POST`/`OPTIONS`, `Content-Type` only); the CORS layer
//! answers OPTIONS preflights itself.

mod handlers;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::coach::CoachService;
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub coach: Arc<CoachService>,
}

/// Create the router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/status", get(handlers::status_handler))
        .route("/api/coach/chat", post(handlers::chat_handler))
        .route("/api/coach/session/end", post(handlers::end_session_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP server until shutdown.
pub async fn run(config: &Config, coach: Arc<CoachService>) -> Result<()> {
    let app = create_router(AppState { coach });
    let addr = format!("{}:{}", config.host, config.port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("coach server listening on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
