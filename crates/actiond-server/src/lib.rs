pub mod error;
pub mod routes;
pub mod state;

use anyhow::Context;
use axum::routing::any;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the axum Router with the actions endpoint and middleware.
/// Used by `serve()` and available for integration testing.
///
/// Every method is routed to the handler so that a wrong method gets the
/// endpoint's own 400 rather than axum's 405.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/actions", any(routes::actions::execute_action))
        .route("/v1/actions/{*rest}", any(routes::actions::execute_action))
        .fallback(routes::fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `listen` and serve until the process is stopped.
pub async fn serve(state: AppState, listen: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    serve_on(state, listener).await
}

/// Serve on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(state: AppState, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!("actiond listening on http://{addr}");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
