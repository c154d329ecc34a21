use axum::{
    Json, Router,
    extract::State,
    middleware,
    routing::{get, post},
};

use crate::{
    dto::game::{ActionResponse, GameSnapshotResponse, TimerActionRequest},
    error::AppError,
    routes::auth::require_scorer_token,
    services::game_service,
    state::SharedState,
};

/// Scoreboard read model and timer commands.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new().route(
        "/api/game",
        get(get_game).merge(
            post(update_game)
                .route_layer(middleware::from_fn_with_state(state, require_scorer_token)),
        ),
    )
}

/// Current scoreboard. Falls back to a default board flagged `degraded` when storage is down.
#[utoipa::path(
    get,
    path = "/api/game",
    tag = "game",
    responses((status = 200, description = "Scoreboard snapshot", body = GameSnapshotResponse))
)]
pub async fn get_game(State(state): State<SharedState>) -> Json<GameSnapshotResponse> {
    Json(game_service::snapshot(&state).await)
}

/// Start or reset the challenge.
#[utoipa::path(
    post,
    path = "/api/game",
    tag = "game",
    params(("X-Scorer-Token" = String, Header, description = "Token issued by /auth/login")),
    request_body = TimerActionRequest,
    responses(
        (status = 200, description = "Action applied", body = ActionResponse),
        (status = 400, description = "Unknown action"),
        (status = 401, description = "Missing or invalid scorer token"),
        (status = 503, description = "Storage not configured or unavailable")
    )
)]
pub async fn update_game(
    State(state): State<SharedState>,
    Json(payload): Json<TimerActionRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        game_service::apply_timer_action(&state, payload).await?,
    ))
}
