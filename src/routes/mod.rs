//! Router de la aplicación
//!
//! Monta las rutas de sesión y de rutas aéreas bajo `/api`, más `/health` y
//! `/metrics`, con las capas de trazas, CORS, límite de concurrencia y
//! tamaño máximo de body.

pub mod route_routes;
pub mod session_routes;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::cors::cors_layer;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_app_router(state: AppState) -> Router {
    let config = state.config.clone();

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .nest("/api/session", session_routes::create_session_router())
        .nest("/api/routes", route_routes::create_route_router())
        .merge(route_routes::create_dashboard_router())
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(ConcurrencyLimitLayer::new(config.max_concurrent_requests))
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "storage_backend": state.gateway.backend_name(),
        "sessions": state.sessions.session_count().await,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state
        .metrics
        .render()
        .map_err(|e| AppError::Internal(format!("Error exportando métricas: {}", e)))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}
