use std::time::SystemTime;

use tracing::{info, warn};

use crate::{
    dao::{models::ScoreEntity, storage::StorageError},
    dto::game::{
        ActionResponse, AddScoreRequest, GameSnapshotResponse, ScoreRecordedResponse,
        TimerAction, TimerActionRequest,
    },
    error::ServiceError,
    state::{
        SharedState,
        budget::{self, STARTING_BUDGET},
        game::{GameSession, ScoreEntry, ScoreError},
    },
};

/// Current scoreboard. Never fails: when storage cannot be read the built-in
/// roster is shown at full budget with the timer stopped and `degraded` set.
pub async fn snapshot(state: &SharedState) -> GameSnapshotResponse {
    let now = SystemTime::now();
    match load_session(state).await {
        Ok(session) => GameSnapshotResponse::from_snapshot(session.snapshot(now), false),
        Err(err) => {
            warn!(error = %err, "serving fallback scoreboard");
            let fallback = GameSession::new(state.config().teams().to_vec());
            GameSnapshotResponse::from_snapshot(fallback.snapshot(now), true)
        }
    }
}

/// Validate and record a visit, returning the team's new balance.
pub async fn add_score(
    state: &SharedState,
    request: AddScoreRequest,
) -> Result<ScoreRecordedResponse, ServiceError> {
    let value = request.score.to_visit_score()?;
    let team_id = request.team_id;
    let store = state.require_score_store().await?;

    let recorded = store
        .append_score(ScoreEntity {
            team_id: team_id.clone(),
            value: value.get(),
            recorded_at: SystemTime::now(),
        })
        .await?;
    if !recorded {
        return Err(ScoreError::UnknownTeam(team_id).into());
    }

    let entries = to_entries(store.list_scores(Some(team_id.clone())).await?)?;
    let remaining_points =
        budget::remaining_points(STARTING_BUDGET, &entries.iter().collect::<Vec<_>>());

    info!(team = %team_id, value = value.get(), remaining = remaining_points, "score recorded");
    Ok(ScoreRecordedResponse {
        success: true,
        remaining_points,
    })
}

/// Start the countdown unless it already runs. Returns the effective start.
pub async fn start_timer(state: &SharedState) -> Result<SystemTime, ServiceError> {
    let store = state.require_score_store().await?;
    let now = SystemTime::now();
    let started_at = store.start_timer(now).await?;

    let late_by = now.duration_since(started_at).unwrap_or_default();
    info!(late_by_ms = late_by.as_millis() as u64, "challenge timer start applied");
    Ok(started_at)
}

/// Clear the countdown, the ledger and with it every balance.
pub async fn reset_game(state: &SharedState) -> Result<(), ServiceError> {
    let store = state.require_score_store().await?;
    store.reset_game().await?;
    info!("game reset");
    Ok(())
}

/// Dispatch a `POST /api/game` command.
pub async fn apply_timer_action(
    state: &SharedState,
    request: TimerActionRequest,
) -> Result<ActionResponse, ServiceError> {
    let action = request
        .action
        .parse::<TimerAction>()
        .map_err(ServiceError::InvalidInput)?;

    match action {
        TimerAction::Start => {
            start_timer(state).await?;
        }
        TimerAction::Reset => reset_game(state).await?,
    }

    Ok(ActionResponse::ok())
}

async fn load_session(state: &SharedState) -> Result<GameSession, ServiceError> {
    let store = state.require_score_store().await?;
    let game = store.load_game().await?.ok_or(StorageError::MissingGame)?;
    let entries = to_entries(store.list_scores(None).await?)?;

    Ok(GameSession::restore(
        game.teams.into_iter().map(Into::into).collect(),
        game.started_at,
        entries,
    ))
}

fn to_entries(scores: Vec<ScoreEntity>) -> Result<Vec<ScoreEntry>, StorageError> {
    scores
        .into_iter()
        .map(ScoreEntry::try_from)
        .collect::<Result<_, _>>()
        .map_err(|err| StorageError::Corrupted(err.to_string()))
}
