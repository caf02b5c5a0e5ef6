// src/coordinator/routes.rs
// =============================================================================
// Route table and server lifecycle of the coordinator.
//
// Every request goes through a tracing layer, and CORS is wide open
// (any origin, credentials allowed) since the API is called from browsers.
//
// The server stops gracefully once /down or /exit fires the shared Notify,
// so the acknowledging 200 still reaches the caller.
// =============================================================================

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use super::handlers::{self, AppState};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::identity))
        .route("/exec", post(handlers::exec))
        .route("/page", get(handlers::page))
        .route("/down", get(handlers::shutdown))
        .route("/exit", get(handlers::shutdown))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the API on `port` until a shutdown route is hit
pub async fn serve(port: u16, state: AppState) -> Result<()> {
    let shutdown = state.shutdown.clone();
    let addr = format!("0.0.0.0:{}", port);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Woogle API listening on {}", addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async move {
            shutdown.notified().await;
            info!("shutdown requested, draining connections");
        })
        .await
        .context("HTTP server error")?;

    info!("server stopped");
    Ok(())
}


// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What is a layer?
//    - Middleware wrapping every route (tracing, CORS)
//    - Layers are added to the Router and run around each handler
//
// 2. How do the tests talk to the router without a socket?
//    - A Router is a tower Service
//    - ServiceExt::oneshot sends one request straight into it
//
// 3. What is Notify?
//    - A one-shot wake-up signal between tasks
//    - /down calls notify_one(); the server's shutdown future is waiting on it
// -----------------------------------------------------------------------------
