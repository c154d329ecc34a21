use mongodb::bson::{DateTime, Document, doc, oid::ObjectId};
use serde::{Deserialize, Serialize};

use super::error::MongoDaoError;
use crate::dao::models::{GameEntity, ScoreEntity, TeamEntity};

pub const GAME_ID: &str = "default";

/// The single game document. `epoch` scopes the live ledger: a reset bumps it
/// so older score documents drop out of every read at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub epoch: i64,
    #[serde(default)]
    pub started_at: Option<DateTime>,
    pub teams: Vec<MongoTeamDocument>,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoTeamDocument {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoScoreDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub epoch: i64,
    pub team_id: String,
    pub value: i32,
    pub recorded_at: DateTime,
}

impl MongoGameDocument {
    pub fn has_team(&self, team_id: &str) -> bool {
        self.teams.iter().any(|team| team.id == team_id)
    }
}

impl From<MongoGameDocument> for GameEntity {
    fn from(value: MongoGameDocument) -> Self {
        Self {
            started_at: value.started_at.map(|at| at.to_system_time()),
            teams: value.teams.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<MongoTeamDocument> for TeamEntity {
    fn from(value: MongoTeamDocument) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}

impl MongoScoreDocument {
    pub fn new(epoch: i64, score: ScoreEntity) -> Self {
        Self {
            id: None,
            epoch,
            team_id: score.team_id,
            value: i32::from(score.value),
            recorded_at: DateTime::from_system_time(score.recorded_at),
        }
    }
}

impl TryFrom<MongoScoreDocument> for ScoreEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoScoreDocument) -> Result<Self, Self::Error> {
        let points = u8::try_from(value.value)
            .ok()
            .filter(|points| *points <= 180)
            .ok_or_else(|| MongoDaoError::CorruptedScore {
                team_id: value.team_id.clone(),
                value: value.value,
            })?;

        Ok(Self {
            team_id: value.team_id,
            value: points,
            recorded_at: value.recorded_at.to_system_time(),
        })
    }
}

pub fn team_documents(teams: &[TeamEntity]) -> Vec<Document> {
    teams
        .iter()
        .map(|team| doc! { "id": team.id.as_str(), "name": team.name.as_str() })
        .collect()
}

pub fn game_filter() -> Document {
    doc! { "_id": GAME_ID }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    #[test]
    fn score_document_round_trips_through_entity() {
        let recorded_at = SystemTime::UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        let entity = ScoreEntity {
            team_id: "team1".into(),
            value: 140,
            recorded_at,
        };

        let document = MongoScoreDocument::new(3, entity.clone());
        assert_eq!(document.epoch, 3);
        assert_eq!(document.value, 140);

        let back = ScoreEntity::try_from(document).unwrap();
        assert_eq!(back, entity);
    }

    #[test]
    fn out_of_range_stored_values_are_rejected() {
        let document = MongoScoreDocument {
            id: None,
            epoch: 0,
            team_id: "team2".into(),
            value: 181,
            recorded_at: DateTime::now(),
        };

        assert!(matches!(
            ScoreEntity::try_from(document),
            Err(MongoDaoError::CorruptedScore { value: 181, .. })
        ));
    }

    #[test]
    fn game_document_exposes_started_at_and_roster() {
        let started = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let document = MongoGameDocument {
            id: GAME_ID.into(),
            epoch: 7,
            started_at: Some(DateTime::from_system_time(started)),
            teams: vec![MongoTeamDocument {
                id: "team1".into(),
                name: "Team 1".into(),
            }],
            updated_at: DateTime::now(),
        };

        assert!(document.has_team("team1"));
        assert!(!document.has_team("team2"));

        let entity = GameEntity::from(document);
        assert_eq!(entity.started_at, Some(started));
        assert_eq!(entity.teams[0].name, "Team 1");
    }
}
