use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Representation of a team stored in persistence and shared across layers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamEntity {
    /// Stable identifier for the team.
    pub id: String,
    /// Display name of the team.
    pub name: String,
}

/// The single game row: countdown start and roster.
///
/// Balances are not stored; they are folded from the score entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// When the countdown was started, if it was.
    pub started_at: Option<SystemTime>,
    /// Participating teams in display order.
    pub teams: Vec<TeamEntity>,
}

/// One persisted visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreEntity {
    /// Team the visit counts for.
    pub team_id: String,
    /// Points scored in the visit.
    pub value: u8,
    /// When the visit was recorded.
    pub recorded_at: SystemTime,
}
