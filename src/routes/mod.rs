use axum::Router;

use crate::state::SharedState;

pub mod auth;
pub mod docs;
pub mod game;
pub mod health;
pub mod scores;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(auth::router(state.clone()))
        .merge(game::router(state.clone()))
        .merge(scores::router(state.clone()));

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
