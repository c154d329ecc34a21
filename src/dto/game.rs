use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dto::{format_system_time, validation::validate_team_id},
    state::{
        game::{GameSnapshot, ScoreError, TeamSnapshot, VisitScore},
        timer::TimerPhase,
    },
};

/// Countdown phase as exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhaseDto {
    NotStarted,
    Running,
    Expired,
}

impl From<TimerPhase> for TimerPhaseDto {
    fn from(phase: TimerPhase) -> Self {
        match phase {
            TimerPhase::NotStarted => TimerPhaseDto::NotStarted,
            TimerPhase::Running => TimerPhaseDto::Running,
            TimerPhase::Expired => TimerPhaseDto::Expired,
        }
    }
}

/// Scoreboard read model returned by `GET /api/game`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshotResponse {
    /// RFC 3339 start of the countdown, `null` until started.
    pub started_at: Option<String>,
    pub remaining_ms: u64,
    pub is_running: bool,
    pub phase: TimerPhaseDto,
    /// `true` when storage could not be read and this is the fallback board.
    pub degraded: bool,
    pub teams: Vec<TeamStatsDto>,
}

/// One team on the scoreboard.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamStatsDto {
    pub id: String,
    pub name: String,
    pub remaining_points: u32,
    pub three_dart_average: f64,
    /// Latest visits, most recent first.
    #[serde(rename = "last3Scores")]
    pub last3_scores: Vec<u8>,
    #[serde(rename = "count100")]
    pub count100: u32,
    #[serde(rename = "count140")]
    pub count140: u32,
    #[serde(rename = "count180")]
    pub count180: u32,
}

impl GameSnapshotResponse {
    /// Project a domain snapshot, flagging whether it is the degraded fallback.
    pub fn from_snapshot(snapshot: GameSnapshot, degraded: bool) -> Self {
        let timer = snapshot.timer;
        Self {
            started_at: timer.started_at.map(format_system_time),
            remaining_ms: timer.remaining_ms(),
            is_running: timer.is_running(),
            phase: timer.phase.into(),
            degraded,
            teams: snapshot.teams.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<TeamSnapshot> for TeamStatsDto {
    fn from(value: TeamSnapshot) -> Self {
        let stats = value.stats;
        Self {
            id: value.team.id,
            name: value.team.name,
            remaining_points: value.remaining_points,
            three_dart_average: stats.three_dart_average,
            last3_scores: stats.last_three.into_iter().map(VisitScore::get).collect(),
            count100: stats.milestones.ton,
            count140: stats.milestones.ton_forty,
            count180: stats.milestones.maximum,
        }
    }
}

/// Raw visit score as sent by scorer stations: a JSON number or a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScoreInput {
    Number(serde_json::Number),
    Text(String),
}

impl ScoreInput {
    /// Parse into a validated visit. Whole-valued floats such as `60.0` count as
    /// integers; fractions and non-numeric text are rejected.
    pub fn to_visit_score(&self) -> Result<VisitScore, ScoreError> {
        match self {
            ScoreInput::Number(number) => match number.as_i64() {
                Some(value) => VisitScore::new(value),
                None => whole_score(number.as_f64(), &number.to_string()),
            },
            ScoreInput::Text(text) => {
                let trimmed = text.trim();
                match trimmed.parse::<i64>() {
                    Ok(value) => VisitScore::new(value),
                    Err(_) => whole_score(trimmed.parse::<f64>().ok(), text),
                }
            }
        }
    }
}

fn whole_score(value: Option<f64>, raw: &str) -> Result<VisitScore, ScoreError> {
    match value {
        Some(value) if value.fract() == 0.0 => {
            if (0.0..=f64::from(VisitScore::MAX)).contains(&value) {
                VisitScore::new(value as i64)
            } else {
                Err(ScoreError::OutOfRange(raw.to_owned()))
            }
        }
        _ => Err(ScoreError::NotANumber(raw.to_owned())),
    }
}

/// Body of `POST /api/scores`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddScoreRequest {
    #[validate(custom(function = "validate_team_id"))]
    pub team_id: String,
    /// Visit score 0-180, as a number or a numeric string.
    #[schema(value_type = u8)]
    pub score: ScoreInput,
}

/// Answer to a recorded visit.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecordedResponse {
    pub success: bool,
    pub remaining_points: u32,
}

/// Countdown commands accepted by `POST /api/game`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TimerAction {
    Start,
    Reset,
}

impl FromStr for TimerAction {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "start" => Ok(TimerAction::Start),
            "reset" => Ok(TimerAction::Reset),
            other => Err(format!("unknown action `{other}` (expected start or reset)")),
        }
    }
}

/// Body of `POST /api/game`. The action stays a string so unknown values
/// surface as a 400 rather than a body rejection.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TimerActionRequest {
    #[schema(value_type = TimerAction)]
    pub action: String,
}

/// Generic acknowledgement.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub success: bool,
}

impl ActionResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use serde_json::json;

    use super::*;
    use crate::state::game::{GameSession, default_teams};

    fn score(value: serde_json::Value) -> Result<u8, ScoreError> {
        let input: ScoreInput = serde_json::from_value(value).unwrap();
        input.to_visit_score().map(VisitScore::get)
    }

    #[test]
    fn scores_accept_integers_and_numeric_strings() {
        assert_eq!(score(json!(60)), Ok(60));
        assert_eq!(score(json!("140")), Ok(140));
        assert_eq!(score(json!(" 0 ")), Ok(0));
    }

    #[test]
    fn scores_reject_out_of_range_and_garbage() {
        assert_eq!(score(json!(181)), Err(ScoreError::OutOfRange("181".into())));
        assert_eq!(score(json!(-1)), Err(ScoreError::OutOfRange("-1".into())));
        assert!(matches!(score(json!(45.5)), Err(ScoreError::NotANumber(_))));
        assert!(matches!(score(json!("abc")), Err(ScoreError::NotANumber(_))));
        assert!(matches!(score(json!("12.5")), Err(ScoreError::NotANumber(_))));
    }

    #[test]
    fn whole_valued_floats_count_as_integers() {
        assert_eq!(score(json!(60.0)), Ok(60));
        assert_eq!(score(json!(1e2)), Ok(100));
        assert_eq!(score(json!("140.0")), Ok(140));
        assert_eq!(score(json!(181.0)), Err(ScoreError::OutOfRange("181.0".into())));
        assert!(matches!(score(json!("NaN")), Err(ScoreError::NotANumber(_))));
    }

    #[test]
    fn huge_scores_report_the_submitted_value() {
        let err = score(json!(u64::MAX)).unwrap_err();
        assert_eq!(err, ScoreError::OutOfRange(u64::MAX.to_string()));
        assert_eq!(
            err.to_string(),
            "score 18446744073709551615 is outside the accepted range 0-180"
        );
    }

    #[test]
    fn non_scalar_scores_do_not_deserialize() {
        assert!(serde_json::from_value::<ScoreInput>(json!([1])).is_err());
        assert!(serde_json::from_value::<ScoreInput>(json!(null)).is_err());
    }

    #[test]
    fn snapshot_serializes_with_camel_case_keys() {
        let started = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let mut game = GameSession::new(default_teams());
        game.start_timer(started);
        for value in [100, 140, 180] {
            game.add_score("team1", VisitScore::new(value).unwrap(), started)
                .unwrap();
        }

        let response = GameSnapshotResponse::from_snapshot(game.snapshot(started), false);
        let body = serde_json::to_value(&response).unwrap();

        assert_eq!(body["startedAt"], json!("2023-11-14T22:13:20Z"));
        assert_eq!(body["remainingMs"], json!(43_200_000));
        assert_eq!(body["isRunning"], json!(true));
        assert_eq!(body["phase"], json!("running"));
        assert_eq!(body["degraded"], json!(false));

        let team = &body["teams"][0];
        assert_eq!(team["remainingPoints"], json!(99_580));
        assert_eq!(team["threeDartAverage"], json!(140.0));
        assert_eq!(team["last3Scores"], json!([180, 140, 100]));
        assert_eq!(team["count100"], json!(1));
        assert_eq!(team["count140"], json!(1));
        assert_eq!(team["count180"], json!(1));
    }

    #[test]
    fn timer_actions_parse_lowercase() {
        let request: TimerActionRequest =
            serde_json::from_value(json!({ "action": "reset" })).unwrap();
        assert_eq!(request.action.parse::<TimerAction>(), Ok(TimerAction::Reset));
        assert_eq!("start".parse::<TimerAction>(), Ok(TimerAction::Start));
        assert!("pause".parse::<TimerAction>().is_err());
        assert!("START".parse::<TimerAction>().is_err());
    }
}
