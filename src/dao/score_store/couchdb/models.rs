use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::error::CouchDaoError;
use crate::dao::models::{GameEntity, ScoreEntity, TeamEntity};

pub const GAME_DOC_ID: &str = "game::default";
pub const SCORE_PREFIX: &str = "score::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    #[serde(default)]
    pub value: Option<AllDocsValue>,
    #[serde(default)]
    pub doc: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsValue {
    pub rev: String,
}

#[derive(Debug, Serialize)]
pub struct BulkDocsRequest {
    pub docs: Vec<DeletedDocument>,
}

#[derive(Debug, Serialize)]
pub struct DeletedDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev")]
    pub rev: String,
    #[serde(rename = "_deleted")]
    pub deleted: bool,
}

/// The game document. Every update carries `_rev`, so CouchDB rejects writes
/// based on a stale read with 409.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchGameDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub epoch: u64,
    #[serde(default)]
    pub started_at: Option<SystemTime>,
    pub teams: Vec<CouchTeam>,
    pub updated_at: SystemTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchTeam {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchScoreDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub epoch: u64,
    pub team_id: String,
    pub value: i64,
    pub recorded_at: SystemTime,
}

impl CouchGameDocument {
    pub fn seed(teams: Vec<TeamEntity>) -> Self {
        Self {
            id: GAME_DOC_ID.to_owned(),
            rev: None,
            epoch: 0,
            started_at: None,
            teams: teams
                .into_iter()
                .map(|team| CouchTeam {
                    id: team.id,
                    name: team.name,
                })
                .collect(),
            updated_at: SystemTime::now(),
        }
    }

    pub fn has_team(&self, team_id: &str) -> bool {
        self.teams.iter().any(|team| team.id == team_id)
    }

    pub fn into_entity(self) -> GameEntity {
        GameEntity {
            started_at: self.started_at,
            teams: self
                .teams
                .into_iter()
                .map(|team| TeamEntity {
                    id: team.id,
                    name: team.name,
                })
                .collect(),
        }
    }
}

impl CouchScoreDocument {
    pub fn new(epoch: u64, score: ScoreEntity) -> Self {
        Self {
            id: score_doc_id(epoch, score.recorded_at, Uuid::new_v4()),
            rev: None,
            epoch,
            team_id: score.team_id,
            value: i64::from(score.value),
            recorded_at: score.recorded_at,
        }
    }

    pub fn try_into_entity(self) -> Result<ScoreEntity, CouchDaoError> {
        let value = u8::try_from(self.value)
            .ok()
            .filter(|value| *value <= 180)
            .ok_or_else(|| CouchDaoError::CorruptedScore {
                team_id: self.team_id.clone(),
                value: self.value,
            })?;

        Ok(ScoreEntity {
            team_id: self.team_id,
            value,
            recorded_at: self.recorded_at,
        })
    }
}

/// Key prefix shared by every score of one epoch.
pub fn epoch_prefix(epoch: u64) -> String {
    format!("{SCORE_PREFIX}{epoch:010}::")
}

/// Score ids sort by epoch, then recording time, so `_all_docs` returns the
/// ledger in order without a view.
pub fn score_doc_id(epoch: u64, recorded_at: SystemTime, nonce: Uuid) -> String {
    let nanos = recorded_at
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    format!("{}{nanos:020}::{nonce}", epoch_prefix(epoch))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn score_ids_sort_by_epoch_then_time() {
        let nonce = Uuid::nil();
        let early = SystemTime::UNIX_EPOCH + Duration::from_secs(9);
        let late = SystemTime::UNIX_EPOCH + Duration::from_secs(10);

        let a = score_doc_id(1, early, nonce);
        let b = score_doc_id(1, late, nonce);
        let c = score_doc_id(2, early, nonce);

        assert!(a < b);
        assert!(b < c);
        assert!(a.starts_with(&epoch_prefix(1)));
        assert!(!c.starts_with(&epoch_prefix(1)));
    }

    #[test]
    fn stored_scores_outside_range_are_corrupted() {
        let document = CouchScoreDocument {
            id: "score::x".into(),
            rev: None,
            epoch: 0,
            team_id: "team1".into(),
            value: -3,
            recorded_at: SystemTime::UNIX_EPOCH,
        };

        assert!(matches!(
            document.try_into_entity(),
            Err(CouchDaoError::CorruptedScore { value: -3, .. })
        ));
    }

    #[test]
    fn seeded_game_has_no_start_and_epoch_zero() {
        let game = CouchGameDocument::seed(vec![TeamEntity {
            id: "team1".into(),
            name: "Team 1".into(),
        }]);

        assert_eq!(game.id, GAME_DOC_ID);
        assert_eq!(game.epoch, 0);
        assert!(game.has_team("team1"));
        assert_eq!(game.into_entity().started_at, None);
    }
}
