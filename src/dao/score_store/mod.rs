#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::time::SystemTime;

use futures::future::BoxFuture;

use crate::dao::models::{GameEntity, ScoreEntity, TeamEntity};
use crate::dao::storage::StorageResult;

/// Abstraction over the persistence layer for the marathon game and its score ledger.
///
/// Every write is a single atomic unit at the backend: implementations must not
/// let a concurrent reader observe half of a reset, and appends from concurrent
/// scorers must never overwrite each other.
pub trait ScoreStore: Send + Sync {
    /// Short backend name used in logs and diagnostics.
    fn backend(&self) -> &'static str;
    /// Create the game record with the given roster if it does not exist yet.
    fn ensure_game(&self, teams: Vec<TeamEntity>) -> BoxFuture<'static, StorageResult<()>>;
    /// Point-in-time read of the game record.
    fn load_game(&self) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Ordered read of the current ledger, optionally restricted to one team.
    fn list_scores(
        &self,
        team_id: Option<String>,
    ) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>>;
    /// Set the countdown start to `now` unless already set; returns the effective start.
    fn start_timer(&self, now: SystemTime) -> BoxFuture<'static, StorageResult<SystemTime>>;
    /// Append a visit. Returns `false` without writing when the team is unknown.
    fn append_score(&self, score: ScoreEntity) -> BoxFuture<'static, StorageResult<bool>>;
    /// Clear the countdown and the ledger together.
    fn reset_game(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
