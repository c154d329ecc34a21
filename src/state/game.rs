use std::time::SystemTime;

use thiserror::Error;

use crate::{
    dao::models::{GameEntity, ScoreEntity, TeamEntity},
    state::{
        budget::{self, STARTING_BUDGET},
        ledger::ScoreLedger,
        stats::TeamStats,
        timer::{ChallengeTimer, TimerSnapshot},
    },
};

/// Number of teams competing in a marathon.
pub const TEAM_COUNT: usize = 2;

/// Errors raised by the scoring rules before anything is mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    /// The visit is a whole number outside 0-180. Holds the score as submitted.
    #[error("score {0} is outside the accepted range 0-180")]
    OutOfRange(String),
    /// The visit could not be read as an integer at all.
    #[error("score `{0}` is not a whole number")]
    NotANumber(String),
    /// The team id does not reference a team of this game.
    #[error("team `{0}` not found")]
    UnknownTeam(String),
}

/// Score of one three-dart visit, guaranteed to lie in `0..=180`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VisitScore(u8);

impl VisitScore {
    /// Highest score reachable with three darts.
    pub const MAX: u8 = 180;

    /// Validate a raw integer as a visit score.
    pub fn new(value: i64) -> Result<Self, ScoreError> {
        u8::try_from(value)
            .ok()
            .filter(|value| *value <= Self::MAX)
            .map(Self)
            .ok_or_else(|| ScoreError::OutOfRange(value.to_string()))
    }

    /// Raw points of the visit.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for VisitScore {
    type Error = ScoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VisitScore> for u32 {
    fn from(value: VisitScore) -> Self {
        u32::from(value.0)
    }
}

/// A competing team. Teams are fixed for the whole marathon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    /// Stable identifier used by scorers.
    pub id: String,
    /// Display name.
    pub name: String,
}

impl Team {
    /// Build a team from its id and display name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Built-in roster used when no configuration overrides it.
pub fn default_teams() -> Vec<Team> {
    vec![Team::new("team1", "Team 1"), Team::new("team2", "Team 2")]
}

/// One recorded visit. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreEntry {
    /// Team the visit counts for.
    pub team_id: String,
    /// Points scored.
    pub value: VisitScore,
    /// When the visit was recorded.
    pub recorded_at: SystemTime,
}

/// Per-team part of a [`GameSnapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct TeamSnapshot {
    /// Team identity.
    pub team: Team,
    /// Balance left after every recorded visit.
    pub remaining_points: u32,
    /// Derived statistics.
    pub stats: TeamStats,
}

/// Everything the scoreboard shows, computed at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSnapshot {
    /// Countdown state.
    pub timer: TimerSnapshot,
    /// One entry per team, in roster order.
    pub teams: Vec<TeamSnapshot>,
}

/// Aggregate root: one countdown, the fixed roster, and the score ledger.
///
/// Balances and statistics are never cached; they are folded from the ledger
/// whenever they are read.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSession {
    teams: Vec<Team>,
    timer: ChallengeTimer,
    ledger: ScoreLedger,
}

impl GameSession {
    /// A fresh game: timer stopped, empty ledger, every team at the starting budget.
    pub fn new(teams: Vec<Team>) -> Self {
        Self::restore(teams, None, Vec::new())
    }

    /// Rebuild a game from persisted parts. `entries` must be in recording order.
    pub fn restore(
        teams: Vec<Team>,
        started_at: Option<SystemTime>,
        entries: Vec<ScoreEntry>,
    ) -> Self {
        Self {
            teams,
            timer: ChallengeTimer::restore(started_at),
            ledger: ScoreLedger::from_entries(entries),
        }
    }

    /// Roster in display order.
    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    /// Look up a team by id.
    pub fn team(&self, team_id: &str) -> Option<&Team> {
        self.teams.iter().find(|team| team.id == team_id)
    }

    /// The countdown.
    pub fn timer(&self) -> &ChallengeTimer {
        &self.timer
    }

    /// The score ledger.
    pub fn ledger(&self) -> &ScoreLedger {
        &self.ledger
    }

    /// Current balance of a team.
    pub fn remaining_points(&self, team_id: &str) -> Result<u32, ScoreError> {
        self.ensure_team(team_id)?;
        Ok(budget::remaining_points(
            STARTING_BUDGET,
            &self.ledger.entries_for(team_id),
        ))
    }

    /// Record a visit for a team and return its new balance.
    ///
    /// Visits larger than the remaining balance are still recorded in full;
    /// only the displayed balance floors at zero.
    pub fn add_score(
        &mut self,
        team_id: &str,
        value: VisitScore,
        now: SystemTime,
    ) -> Result<u32, ScoreError> {
        self.ensure_team(team_id)?;
        self.ledger.record(team_id, value, now);
        self.remaining_points(team_id)
    }

    /// Start the countdown if it is not started yet. Returns the effective start.
    pub fn start_timer(&mut self, now: SystemTime) -> SystemTime {
        self.timer.start(now);
        self.timer.started_at().unwrap_or(now)
    }

    /// Stop the countdown, clear the ledger and with it restore every balance.
    pub fn reset(&mut self) {
        self.timer.reset();
        self.ledger.clear();
    }

    /// Project the whole game as seen at `now`.
    pub fn snapshot(&self, now: SystemTime) -> GameSnapshot {
        let teams = self
            .teams
            .iter()
            .map(|team| {
                let entries = self.ledger.entries_for(&team.id);
                TeamSnapshot {
                    team: team.clone(),
                    remaining_points: budget::remaining_points(STARTING_BUDGET, &entries),
                    stats: TeamStats::from_entries(&entries),
                }
            })
            .collect();

        GameSnapshot {
            timer: self.timer.snapshot(now),
            teams,
        }
    }

    fn ensure_team(&self, team_id: &str) -> Result<(), ScoreError> {
        match self.team(team_id) {
            Some(_) => Ok(()),
            None => Err(ScoreError::UnknownTeam(team_id.to_owned())),
        }
    }
}

impl From<TeamEntity> for Team {
    fn from(value: TeamEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}

impl From<Team> for TeamEntity {
    fn from(value: Team) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}

impl TryFrom<ScoreEntity> for ScoreEntry {
    type Error = ScoreError;

    fn try_from(value: ScoreEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            team_id: value.team_id,
            value: VisitScore::new(i64::from(value.value))?,
            recorded_at: value.recorded_at,
        })
    }
}

impl From<ScoreEntry> for ScoreEntity {
    fn from(value: ScoreEntry) -> Self {
        Self {
            team_id: value.team_id,
            value: value.value.get(),
            recorded_at: value.recorded_at,
        }
    }
}

impl From<&GameSession> for GameEntity {
    fn from(value: &GameSession) -> Self {
        Self {
            started_at: value.timer.started_at(),
            teams: value.teams.iter().cloned().map(Into::into).collect(),
        }
    }
}
