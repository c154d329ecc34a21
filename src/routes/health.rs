use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::health::{HealthResponse, StorageStatusResponse},
    services::health_service,
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/healthcheck",
    tag = "health",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
/// Return the current health status of the backend and ping the store.
pub async fn healthcheck(State(state): State<SharedState>) -> Json<HealthResponse> {
    let status = health_service::health_status(&state).await;
    Json(status)
}

#[utoipa::path(
    get,
    path = "/api/check-db",
    tag = "health",
    responses((status = 200, description = "Storage diagnostics", body = StorageStatusResponse))
)]
/// Tell whether storage is configured, connected, and what failed otherwise.
pub async fn check_db(State(state): State<SharedState>) -> Json<StorageStatusResponse> {
    Json(health_service::storage_diagnostics(&state).await)
}

/// Configure the health routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/healthcheck", get(healthcheck))
        .route("/api/check-db", get(check_db))
}
