pub mod handlers;

use axum::routing::{get, post, put, MethodRouter};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub use handlers::{ApiError, ApiState};

/// Maximum accepted size of a single event record.
const MAX_EVENT_BYTES: usize = 1024 * 1024;

/// `POST` only; any other method is a plain 404.
fn log_route() -> MethodRouter<ApiState> {
    post(handlers::handle_log)
        .fallback(handlers::handle_not_found)
        .layer(axum::extract::DefaultBodyLimit::max(MAX_EVENT_BYTES))
}

/// Routes under `/api`, plus `/log` at the root where remote nodes post
/// their records.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/status", get(handlers::handle_status))
        .route("/log", log_route())
        .route(
            "/services",
            get(handlers::handle_services).post(handlers::handle_create_service),
        )
        .route("/select/{service}", get(handlers::handle_select))
        .route("/nodes", post(handlers::handle_register))
        .route(
            "/nodes/{id}",
            get(handlers::handle_node_get).delete(handlers::handle_node_remove),
        )
        .route("/nodes/{id}/link", post(handlers::handle_node_link))
        .route("/nodes/{id}/status", put(handlers::handle_node_status))
        .route("/nodes/{id}/endpoint", put(handlers::handle_node_endpoint))
        .route("/daemon/shutdown", post(handlers::handle_shutdown))
        .with_state(state.clone());

    Router::new()
        .route("/log", log_route())
        .with_state(state)
        .nest("/api", api_routes)
        .layer(cors)
}

/// Serve on an already-bound listener until the shutdown channel fires.
pub async fn serve_on(state: ApiState, listener: TcpListener) -> anyhow::Result<()> {
    let mut shutdown_rx = state.shutdown_tx.subscribe();
    let app = router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await?;
    Ok(())
}

pub async fn serve(state: ApiState, port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!(port, "API listening on 127.0.0.1");
    serve_on(state, listener).await
}
