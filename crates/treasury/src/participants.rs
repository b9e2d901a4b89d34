//! Participant Performance Records
//!
//! Registered participants carry three sub-scores (0..=1000), task counts
//! and the reward points derived from them. Points decide both eligibility
//! and the participant's weight in the reward pool.

use crate::errors::{Result, TreasuryError};
use lucid_types::{apply_bps, AccountId, Height, BPS_SCALE};
use serde::{Deserialize, Serialize};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Upper bound of each performance sub-score.
pub const MAX_SUB_SCORE: u32 = 1_000;

/// Sub-score given to a freshly registered participant.
pub const NEUTRAL_SUB_SCORE: u32 = 500;

/// Points below which a participant receives nothing from the reward pool.
pub const MIN_PERFORMANCE_SCORE: u128 = 300;

// =============================================================================
// PARTICIPANT RECORD
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub account: AccountId,
    pub scores: [u32; 3],
    pub success_count: u64,
    pub total_count: u64,
    /// Multiplier (basis points) applied at the last update
    pub multiplier: u32,
    pub reward_points: u128,
    pub registered_at: Height,
    /// Height of the last performance update or decay
    pub last_updated: Height,
    pub total_earned: u128,
}

impl Participant {
    /// A new participant with neutral scores and neutral points.
    pub fn neutral(account: AccountId, now: Height) -> Self {
        Self {
            account,
            scores: [NEUTRAL_SUB_SCORE; 3],
            success_count: 0,
            total_count: 0,
            multiplier: BPS_SCALE,
            reward_points: NEUTRAL_SUB_SCORE as u128,
            registered_at: now,
            last_updated: now,
            total_earned: 0,
        }
    }

    pub fn average_score(&self) -> u32 {
        average(&self.scores)
    }

    pub fn is_eligible(&self, min_points: u128) -> bool {
        self.reward_points >= min_points
    }

    /// Whether the record has gone at least `period` heights without an update.
    pub fn is_stale(&self, now: Height, period: Height) -> bool {
        now.saturating_sub(self.last_updated) >= period
    }

    /// Apply the periodic decay to scores and points.
    pub fn decay(&mut self, score_decay_bps: u32, points_decay_bps: u32, now: Height) {
        let keep_scores = BPS_SCALE.saturating_sub(score_decay_bps);
        for score in self.scores.iter_mut() {
            *score = (*score as u64 * keep_scores as u64 / BPS_SCALE as u64) as u32;
        }
        let keep_points = BPS_SCALE.saturating_sub(points_decay_bps);
        self.reward_points = apply_bps(self.reward_points, keep_points);
        self.last_updated = now;
    }
}

/// Check a submitted performance report.
pub fn validate_report(scores: &[u32; 3], success_count: u64, total_count: u64) -> Result<()> {
    for (index, value) in scores.iter().enumerate() {
        if *value > MAX_SUB_SCORE {
            return Err(TreasuryError::InvalidScore {
                index,
                value: *value,
                max: MAX_SUB_SCORE,
            });
        }
    }
    if total_count == 0 || success_count > total_count {
        return Err(TreasuryError::InvalidCounts {
            success: success_count,
            total: total_count,
        });
    }
    Ok(())
}

/// `avg_score * success_rate * multiplier`, with rate and multiplier in basis points.
pub fn reward_points(scores: &[u32; 3], success_count: u64, total_count: u64, multiplier: u32) -> u128 {
    if total_count == 0 {
        return 0;
    }
    let success_bps = success_count as u128 * BPS_SCALE as u128 / total_count as u128;
    let scale = BPS_SCALE as u128;
    average(scores) as u128 * success_bps / scale * multiplier as u128 / scale
}

fn average(scores: &[u32; 3]) -> u32 {
    (scores.iter().map(|score| *score as u64).sum::<u64>() / 3) as u32
}

// =============================================================================
// ELIGIBILITY
// =============================================================================

/// Participants sharing the reward pool and their combined weight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub eligible: Vec<(AccountId, u128)>,
    pub ineligible: Vec<AccountId>,
    pub total_points: u128,
}

/// Split participants by the minimum-points threshold.
pub fn assess_eligibility<'a>(
    participants: impl IntoIterator<Item = &'a Participant>,
    min_points: u128,
) -> EligibilityResult {
    let mut result = EligibilityResult::default();
    for participant in participants {
        if participant.is_eligible(min_points) {
            result
                .eligible
                .push((participant.account, participant.reward_points));
            result.total_points = result
                .total_points
                .saturating_add(participant.reward_points);
        } else {
            result.ineligible.push(participant.account);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucid_types::account_id;

    #[test]
    fn test_points_formula() {
        // average 800, 90% success, 1.5x
        assert_eq!(reward_points(&[700, 800, 900], 9, 10, 15_000), 1_080);
        assert_eq!(reward_points(&[500, 500, 500], 10, 10, 10_000), 500);
        assert_eq!(reward_points(&[1_000, 1_000, 1_000], 0, 10, 40_000), 0);
    }

    #[test]
    fn test_report_validation() {
        assert!(validate_report(&[1_000, 0, 500], 1, 1).is_ok());
        assert!(matches!(
            validate_report(&[1_001, 0, 0], 1, 1),
            Err(TreasuryError::InvalidScore { index: 0, .. })
        ));
        assert!(matches!(
            validate_report(&[1, 1, 1], 2, 1),
            Err(TreasuryError::InvalidCounts { .. })
        ));
        assert!(validate_report(&[1, 1, 1], 0, 0).is_err());
    }

    #[test]
    fn test_decay() {
        let mut participant = Participant::neutral(account_id("node"), 0);
        participant.reward_points = 1_000;
        participant.decay(1_000, 2_000, 50);
        assert_eq!(participant.scores, [450; 3]);
        assert_eq!(participant.reward_points, 800);
        assert_eq!(participant.last_updated, 50);
    }

    #[test]
    fn test_eligibility_split() {
        let mut low = Participant::neutral(account_id("low"), 0);
        low.reward_points = 299;
        let high = Participant::neutral(account_id("high"), 0);
        let result = assess_eligibility([&low, &high], MIN_PERFORMANCE_SCORE);
        assert_eq!(result.eligible, vec![(account_id("high"), 500)]);
        assert_eq!(result.ineligible, vec![account_id("low")]);
        assert_eq!(result.total_points, 500);
    }
}
