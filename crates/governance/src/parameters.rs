use crate::errors::{GovernanceError, Result};
use crate::types::Priority;
use lucid_types::{days, hours, Amount, Height};
use serde::{Deserialize, Serialize};

/// Longest allowed delay between proposing and voting
pub const MAX_VOTING_DELAY: Height = days(30);
/// Shortest allowed voting period
pub const MIN_VOTING_PERIOD: Height = hours(1);
/// Longest allowed voting period
pub const MAX_VOTING_PERIOD: Height = days(30);
/// Highest quorum fraction (50%)
pub const MAX_QUORUM_BPS: u32 = 5_000;
/// Shortest timelock; emergency proposals always use it
pub const MIN_TIMELOCK_DELAY: Height = hours(1);
/// Longest timelock
pub const MAX_TIMELOCK_DELAY: Height = days(30);
/// Most target calls a proposal may carry
pub const MAX_PROPOSAL_CALLS: usize = 10;

/// How long a queued proposal stays executable after its eta, per priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityWindows {
    pub emergency: Height,
    pub critical: Height,
    pub high: Height,
    pub medium: Height,
    pub low: Height,
}

impl Default for PriorityWindows {
    fn default() -> Self {
        Self {
            emergency: hours(1),
            critical: days(1),
            high: days(3),
            medium: days(7),
            low: days(14),
        }
    }
}

impl PriorityWindows {
    pub fn window(&self, priority: Priority) -> Height {
        match priority {
            Priority::Emergency => self.emergency,
            Priority::Critical => self.critical,
            Priority::High => self.high,
            Priority::Medium => self.medium,
            Priority::Low => self.low,
        }
    }
}

/// Governance parameters; changed only by executing a passed proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceParams {
    /// Heights between proposing and the start of voting
    pub voting_delay: Height,
    /// Heights during which votes are accepted
    pub voting_period: Height,
    /// Voting power needed to propose
    #[serde(with = "lucid_types::serde_amount")]
    pub proposal_threshold: Amount,
    /// Quorum as a fraction of total voting supply (basis points)
    pub quorum_bps: u32,
    /// Heights between queueing and the earliest execution
    pub timelock_delay: Height,
    /// Voting period of emergency proposals
    pub emergency_voting_period: Height,
    pub priority_windows: PriorityWindows,
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self {
            voting_delay: days(1),
            voting_period: days(3),
            proposal_threshold: 1_000,
            quorum_bps: 400,
            timelock_delay: days(2),
            emergency_voting_period: hours(1),
            priority_windows: PriorityWindows::default(),
        }
    }
}

impl GovernanceParams {
    pub fn validate(&self) -> Result<()> {
        if self.voting_delay > MAX_VOTING_DELAY {
            return Err(GovernanceError::InvalidParameter(format!(
                "voting_delay {} exceeds {}",
                self.voting_delay, MAX_VOTING_DELAY
            )));
        }
        for (name, period) in [
            ("voting_period", self.voting_period),
            ("emergency_voting_period", self.emergency_voting_period),
        ] {
            if !(MIN_VOTING_PERIOD..=MAX_VOTING_PERIOD).contains(&period) {
                return Err(GovernanceError::InvalidParameter(format!(
                    "{} {} outside [{}, {}]",
                    name, period, MIN_VOTING_PERIOD, MAX_VOTING_PERIOD
                )));
            }
        }
        if self.quorum_bps > MAX_QUORUM_BPS {
            return Err(GovernanceError::InvalidParameter(format!(
                "quorum_bps {} exceeds {}",
                self.quorum_bps, MAX_QUORUM_BPS
            )));
        }
        if !(MIN_TIMELOCK_DELAY..=MAX_TIMELOCK_DELAY).contains(&self.timelock_delay) {
            return Err(GovernanceError::InvalidParameter(format!(
                "timelock_delay {} outside [{}, {}]",
                self.timelock_delay, MIN_TIMELOCK_DELAY, MAX_TIMELOCK_DELAY
            )));
        }
        let windows = self.priority_windows;
        if [
            windows.emergency,
            windows.critical,
            windows.high,
            windows.medium,
            windows.low,
        ]
        .contains(&0)
        {
            return Err(GovernanceError::InvalidParameter(
                "priority windows must be positive".into(),
            ));
        }
        Ok(())
    }
}
