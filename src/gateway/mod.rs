//! HTTP Gateway
//!
//! The engine's operation surface. Private routes resolve the acting account
//! through the session middleware before any coordinator runs.

pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::session::middleware::session_auth_middleware;
use state::AppState;

/// Start the HTTP gateway server.
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let private_routes = Router::new()
        .route(
            "/transfers/internal",
            post(handlers::transfer::internal_transfer),
        )
        .route(
            "/transfers/external",
            post(handlers::transfer::external_transfer),
        )
        .route(
            "/transfers/external/{attempt_id}",
            get(handlers::transfer::get_external_transfer),
        )
        .route("/balance", get(handlers::account::get_balance))
        .route("/transactions", get(handlers::account::list_transactions))
        .layer(from_fn_with_state(state.clone(), session_auth_middleware));

    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", private_routes)
        .merge(
            SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Gateway listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
