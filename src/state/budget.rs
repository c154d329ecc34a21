//! Remaining point balance per team, projected from the ledger.

use crate::state::game::ScoreEntry;

/// Points each team starts the marathon with.
pub const STARTING_BUDGET: u32 = 100_000;

/// Deduct one visit from a balance. Overshooting visits floor the balance at zero.
pub fn apply(remaining: u32, entry: &ScoreEntry) -> u32 {
    remaining.saturating_sub(u32::from(entry.value))
}

/// Fold a team's ordered entries into its remaining balance.
///
/// Because every value is non-negative this always equals
/// `max(0, starting_budget - sum(values))`.
pub fn remaining_points(starting_budget: u32, entries: &[&ScoreEntry]) -> u32 {
    entries
        .iter()
        .fold(starting_budget, |remaining, entry| apply(remaining, entry))
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::state::game::VisitScore;

    fn entry(value: u8) -> ScoreEntry {
        ScoreEntry {
            team_id: "team1".into(),
            value: VisitScore::new(i64::from(value)).unwrap(),
            recorded_at: SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn apply_subtracts_the_visit() {
        assert_eq!(apply(501, &entry(180)), 321);
    }

    #[test]
    fn apply_floors_at_zero() {
        assert_eq!(apply(10, &entry(180)), 0);
        assert_eq!(apply(0, &entry(0)), 0);
    }

    #[test]
    fn empty_ledger_keeps_the_starting_budget() {
        assert_eq!(remaining_points(STARTING_BUDGET, &[]), STARTING_BUDGET);
    }

    #[test]
    fn fold_matches_closed_form_for_generated_sequences() {
        // Small LCG so the sequences are varied but reproducible.
        let mut seed: u64 = 0x5eed;
        for budget in [0u32, 1, 179, 1_000, STARTING_BUDGET] {
            for len in [0usize, 1, 3, 17, 250] {
                let entries: Vec<ScoreEntry> = (0..len)
                    .map(|_| {
                        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
                        entry(((seed >> 33) % 181) as u8)
                    })
                    .collect();
                let refs: Vec<&ScoreEntry> = entries.iter().collect();
                let sum: i64 = entries.iter().map(|e| i64::from(e.value.get())).sum();
                let expected = (i64::from(budget) - sum).max(0) as u32;

                assert_eq!(remaining_points(budget, &refs), expected);
            }
        }
    }
}
