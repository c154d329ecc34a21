use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::auth::{AuthConfigResponse, LoginRequest, LoginResponse},
    error::AppError,
    services::auth_service,
    state::SharedState,
};

pub const SCORER_TOKEN_HEADER: &str = "x-scorer-token";

/// Scorer login, logout and credential diagnostics.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/auth/login", post(login))
        .route(
            "/auth/logout",
            post(logout).route_layer(middleware::from_fn_with_state(state, require_scorer_token)),
        )
        .route("/api/debug-auth", get(debug_auth))
}

/// Exchange the scorer credentials for a token.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Invalid or unconfigured credentials")
    )
)]
pub async fn login(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<LoginRequest>>,
) -> Result<Json<LoginResponse>, AppError> {
    Ok(Json(auth_service::login(&state, payload).await?))
}

/// Revoke the token sent with the request.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    params(("X-Scorer-Token" = String, Header, description = "Token issued by /auth/login")),
    responses((status = 204, description = "Token revoked"))
)]
pub async fn logout(State(state): State<SharedState>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = scorer_token(&headers) {
        auth_service::logout(&state, token);
    }
    StatusCode::NO_CONTENT
}

/// Report which scorer credential variables are set, without their values.
#[utoipa::path(
    get,
    path = "/api/debug-auth",
    tag = "auth",
    responses((status = 200, description = "Credential configuration", body = AuthConfigResponse))
)]
pub async fn debug_auth(State(state): State<SharedState>) -> Json<AuthConfigResponse> {
    Json(auth_service::credentials_status(&state))
}

fn scorer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SCORER_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
}

/// Reject the request unless it carries a live scorer token.
pub async fn require_scorer_token(
    State(state): State<SharedState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let session = auth_service::authorize(&state, scorer_token(req.headers()))?;
    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}
