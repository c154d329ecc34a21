//! Per-team statistics derived on demand from the ordered ledger entries.

use crate::state::game::{ScoreEntry, VisitScore};

/// Number of most recent visits exposed in the history.
pub const HISTORY_LEN: usize = 3;
/// A "ton".
pub const TON: u8 = 100;
/// A "ton-forty".
pub const TON_FORTY: u8 = 140;
/// A "maximum", the best possible visit.
pub const MAXIMUM: u8 = 180;

/// Exact counts of the milestone visits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MilestoneCounts {
    /// Visits worth exactly 100.
    pub ton: u32,
    /// Visits worth exactly 140.
    pub ton_forty: u32,
    /// Visits worth exactly 180.
    pub maximum: u32,
}

/// Statistics computed for a single team.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamStats {
    /// Mean visit score rounded half-up to one decimal place.
    pub three_dart_average: f64,
    /// Up to [`HISTORY_LEN`] latest visits, most recent first.
    pub last_three: Vec<VisitScore>,
    /// Milestone visit counts.
    pub milestones: MilestoneCounts,
}

impl TeamStats {
    /// Compute every statistic from a team's entries in recording order.
    pub fn from_entries(entries: &[&ScoreEntry]) -> Self {
        Self {
            three_dart_average: three_dart_average(entries),
            last_three: last_three(entries),
            milestones: milestone_counts(entries),
        }
    }
}

/// Mean of all visits, rounded half-up at the tenths digit. `0.0` without entries.
///
/// Each entry is already a three-dart visit, so the visit mean is the
/// three-dart average. The rounding is done in integer tenths so values like
/// 45.666.. land on 45.7 without floating point drift.
pub fn three_dart_average(entries: &[&ScoreEntry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }

    let count = entries.len() as u64;
    let sum: u64 = entries.iter().map(|entry| u64::from(entry.value.get())).sum();
    let tenths = (20 * sum + count) / (2 * count);
    tenths as f64 / 10.0
}

/// Latest visits, most recent first, capped at [`HISTORY_LEN`].
pub fn last_three(entries: &[&ScoreEntry]) -> Vec<VisitScore> {
    entries
        .iter()
        .rev()
        .take(HISTORY_LEN)
        .map(|entry| entry.value)
        .collect()
}

/// Count visits equal to 100, 140 and 180.
pub fn milestone_counts(entries: &[&ScoreEntry]) -> MilestoneCounts {
    entries
        .iter()
        .fold(MilestoneCounts::default(), |mut counts, entry| {
            match entry.value.get() {
                TON => counts.ton += 1,
                TON_FORTY => counts.ton_forty += 1,
                MAXIMUM => counts.maximum += 1,
                _ => {}
            }
            counts
        })
}
