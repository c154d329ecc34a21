use axum::{Json, Router, extract::State, middleware, routing::post};
use axum_valid::Valid;

use crate::{
    dto::game::{AddScoreRequest, ScoreRecordedResponse},
    error::AppError,
    routes::auth::require_scorer_token,
    services::game_service,
    state::SharedState,
};

/// Score submission for authenticated scorers.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/api/scores", post(add_score))
        .route_layer(middleware::from_fn_with_state(state, require_scorer_token))
}

/// Record a visit for a team.
#[utoipa::path(
    post,
    path = "/api/scores",
    tag = "scores",
    params(("X-Scorer-Token" = String, Header, description = "Token issued by /auth/login")),
    request_body = AddScoreRequest,
    responses(
        (status = 200, description = "Visit recorded", body = ScoreRecordedResponse),
        (status = 400, description = "Score outside 0-180 or not a whole number"),
        (status = 401, description = "Missing or invalid scorer token"),
        (status = 404, description = "Unknown team"),
        (status = 503, description = "Storage not configured or unavailable")
    )
)]
pub async fn add_score(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<AddScoreRequest>>,
) -> Result<Json<ScoreRecordedResponse>, AppError> {
    Ok(Json(game_service::add_score(&state, payload).await?))
}
