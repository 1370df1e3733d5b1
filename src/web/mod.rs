use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, http::Method, routing::get};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::dispatch::DispatchService;
use crate::notifications::senders::sms::SmsSender;

pub mod error;
pub mod routes;

pub use error::AppError;

/// Shared state for all handlers. Every client lives here, constructed once
/// at startup.
pub struct AppState {
    pub db_pool: PgPool,
    pub dispatch_service: Arc<DispatchService>,
    pub sms_sender: Arc<SmsSender>,
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn build_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check_handler))
        .nest("/api", routes::notification_routes::create_notification_router())
        .with_state(app_state)
        .layer(cors)
}

pub async fn run_http_server(
    app_state: Arc<AppState>,
    http_addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app_router = build_router(app_state);

    info!(addr = %http_addr, "HTTP server listening");
    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    axum::serve(listener, app_router).await?;
    Ok(())
}
