use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the dart marathon scoreboard.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::health::check_db,
        crate::routes::game::get_game,
        crate::routes::game::update_game,
        crate::routes::scores::add_score,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::auth::debug_auth,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::StorageStatusResponse,
            crate::dto::game::GameSnapshotResponse,
            crate::dto::game::TeamStatsDto,
            crate::dto::game::TimerPhaseDto,
            crate::dto::game::TimerAction,
            crate::dto::game::TimerActionRequest,
            crate::dto::game::ActionResponse,
            crate::dto::game::AddScoreRequest,
            crate::dto::game::ScoreRecordedResponse,
            crate::dto::auth::LoginRequest,
            crate::dto::auth::LoginResponse,
            crate::dto::auth::AuthConfigResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check and storage diagnostics"),
        (name = "game", description = "Scoreboard and challenge timer"),
        (name = "scores", description = "Visit submission"),
        (name = "auth", description = "Scorer sessions"),
    )
)]
pub struct ApiDoc;
