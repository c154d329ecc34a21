//! Append-only record of visit scores, the source of truth for every team statistic.

use std::time::SystemTime;

use crate::state::game::{ScoreEntry, VisitScore};

/// Ordered, append-only list of score entries for the whole game.
///
/// Append order is the ledger order: it defines rounds and recency for the
/// statistics projections. Entries are never mutated or reordered once recorded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreLedger {
    entries: Vec<ScoreEntry>,
}

impl ScoreLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from entries already persisted in recording order.
    pub fn from_entries(entries: Vec<ScoreEntry>) -> Self {
        Self { entries }
    }

    /// Append a new entry stamped with `recorded_at` and return it.
    ///
    /// The team reference is checked by the owning [`GameSession`](crate::state::game::GameSession);
    /// the value is already range-checked by construction of [`VisitScore`].
    pub fn record(
        &mut self,
        team_id: &str,
        value: VisitScore,
        recorded_at: SystemTime,
    ) -> &ScoreEntry {
        self.entries.push(ScoreEntry {
            team_id: team_id.to_owned(),
            value,
            recorded_at,
        });
        // Just pushed, so the ledger is non-empty.
        &self.entries[self.entries.len() - 1]
    }

    /// Entries recorded for `team_id`, in recording order.
    pub fn entries_for(&self, team_id: &str) -> Vec<&ScoreEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.team_id == team_id)
            .collect()
    }

    /// Every entry in recording order.
    pub fn entries(&self) -> &[ScoreEntry] {
        &self.entries
    }

    /// Number of recorded entries across all teams.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry. Only used by a full game reset.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn score(value: i64) -> VisitScore {
        VisitScore::new(value).unwrap()
    }

    #[test]
    fn record_preserves_append_order_per_team() {
        let mut ledger = ScoreLedger::new();
        let t0 = SystemTime::UNIX_EPOCH;

        ledger.record("team1", score(60), t0);
        ledger.record("team2", score(100), t0 + Duration::from_secs(1));
        ledger.record("team1", score(45), t0 + Duration::from_secs(2));

        let values: Vec<u8> = ledger
            .entries_for("team1")
            .iter()
            .map(|entry| entry.value.get())
            .collect();
        assert_eq!(values, vec![60, 45]);
        assert_eq!(ledger.entries_for("team2").len(), 1);
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn record_returns_the_stored_entry() {
        let mut ledger = ScoreLedger::new();
        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(42);

        let entry = ledger.record("team2", score(180), at).clone();

        assert_eq!(entry.team_id, "team2");
        assert_eq!(entry.value.get(), 180);
        assert_eq!(entry.recorded_at, at);
        assert_eq!(ledger.entries(), &[entry]);
    }

    #[test]
    fn unknown_team_has_no_entries() {
        let mut ledger = ScoreLedger::new();
        ledger.record("team1", score(26), SystemTime::UNIX_EPOCH);
        assert!(ledger.entries_for("nobody").is_empty());
    }

    #[test]
    fn clear_empties_the_ledger() {
        let mut ledger = ScoreLedger::new();
        ledger.record("team1", score(26), SystemTime::UNIX_EPOCH);
        ledger.record("team2", score(41), SystemTime::UNIX_EPOCH);

        ledger.clear();

        assert!(ledger.is_empty());
        assert!(ledger.entries_for("team1").is_empty());
    }
}
