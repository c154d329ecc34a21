//! In-process [`ScoreStore`] keeping the whole game behind a single mutex.

use std::{sync::Arc, time::SystemTime};

use futures::future::BoxFuture;
use tokio::sync::Mutex;

use crate::{
    dao::{
        models::{GameEntity, ScoreEntity, TeamEntity},
        score_store::ScoreStore,
        storage::{StorageError, StorageResult},
    },
    state::game::{GameSession, ScoreEntry, ScoreError, VisitScore},
};

/// Volatile store for local runs and tests. Data is lost on restart.
#[derive(Clone, Default)]
pub struct MemoryScoreStore {
    session: Arc<Mutex<Option<GameSession>>>,
}

impl MemoryScoreStore {
    /// Create an empty store; call [`ScoreStore::ensure_game`] before use.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScoreStore for MemoryScoreStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn ensure_game(&self, teams: Vec<TeamEntity>) -> BoxFuture<'static, StorageResult<()>> {
        let session = self.session.clone();
        Box::pin(async move {
            let mut guard = session.lock().await;
            if guard.is_none() {
                *guard = Some(GameSession::new(teams.into_iter().map(Into::into).collect()));
            }
            Ok(())
        })
    }

    fn load_game(&self) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let session = self.session.clone();
        Box::pin(async move {
            let guard = session.lock().await;
            Ok(guard.as_ref().map(GameEntity::from))
        })
    }

    fn list_scores(
        &self,
        team_id: Option<String>,
    ) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let session = self.session.clone();
        Box::pin(async move {
            let guard = session.lock().await;
            let game = guard.as_ref().ok_or(StorageError::MissingGame)?;
            let ledger = game.ledger();
            let entries: Vec<&ScoreEntry> = match team_id.as_deref() {
                Some(team_id) => ledger.entries_for(team_id),
                None => ledger.entries().iter().collect(),
            };
            Ok(entries.into_iter().cloned().map(Into::into).collect())
        })
    }

    fn start_timer(&self, now: SystemTime) -> BoxFuture<'static, StorageResult<SystemTime>> {
        let session = self.session.clone();
        Box::pin(async move {
            let mut guard = session.lock().await;
            let game = guard.as_mut().ok_or(StorageError::MissingGame)?;
            Ok(game.start_timer(now))
        })
    }

    fn append_score(&self, score: ScoreEntity) -> BoxFuture<'static, StorageResult<bool>> {
        let session = self.session.clone();
        Box::pin(async move {
            let value = VisitScore::new(i64::from(score.value))
                .map_err(|err| StorageError::Corrupted(err.to_string()))?;
            let mut guard = session.lock().await;
            let game = guard.as_mut().ok_or(StorageError::MissingGame)?;
            match game.add_score(&score.team_id, value, score.recorded_at) {
                Ok(_) => Ok(true),
                Err(ScoreError::UnknownTeam(_)) => Ok(false),
                Err(err) => Err(StorageError::Corrupted(err.to_string())),
            }
        })
    }

    fn reset_game(&self) -> BoxFuture<'static, StorageResult<()>> {
        let session = self.session.clone();
        Box::pin(async move {
            let mut guard = session.lock().await;
            let game = guard.as_mut().ok_or(StorageError::MissingGame)?;
            game.reset();
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
