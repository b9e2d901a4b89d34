//! Economic parameters and their validation.
//!
//! Parameters are adjustable by the owner (or the governance execution path).
//! An update is applied only if the whole parameter set validates.

use crate::errors::{EconomicsError, Result};
use lucid_types::{Amount, BPS_SCALE};
use serde::{Deserialize, Serialize};

/// Lowest reward multiplier the engine will ever hand out (0.25x).
pub const REWARD_MULTIPLIER_FLOOR: u32 = 2_500;

/// Highest reward multiplier the engine will ever hand out (4.0x).
pub const REWARD_MULTIPLIER_CEILING: u32 = 40_000;

/// Tunable economic policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomicParams {
    /// Floor of the dynamic burn rate (basis points)
    pub burn_rate_min_bps: u32,
    /// Ceiling of the dynamic burn rate (basis points)
    pub burn_rate_max_bps: u32,
    /// Share of the burn premium driven by market-cap decline (percent)
    pub trend_weight_pct: u32,
    /// Share of the burn premium driven by volume/market-cap turnover (percent)
    pub volume_weight_pct: u32,
    /// Share of the burn premium driven by poor network health (percent)
    pub health_weight_pct: u32,
    /// Participants at which participation counts as neutral
    pub target_participants: u64,
    /// Daily actions at which utility counts as neutral
    pub target_daily_actions: u64,
    /// Staked/circulating ratio at which staking counts as neutral (basis points)
    pub target_staking_ratio_bps: u32,
    /// Price range over the window at which stability counts as neutral (basis points)
    pub target_volatility_bps: u32,
    /// Bounds applied to the composed telemetry factor (basis points)
    pub min_economic_factor_bps: u32,
    pub max_economic_factor_bps: u32,
    /// Staked amount earning one step (100 bps) of stake bonus
    #[serde(with = "lucid_types::serde_amount")]
    pub stake_bonus_unit: Amount,
    /// Maximum stake bonus (basis points)
    pub max_stake_bonus_bps: u32,
    /// Smallest units per whole token, used to value the circulating supply
    #[serde(with = "lucid_types::serde_amount")]
    pub token_unit: Amount,
    /// Number of prices kept for volatility
    pub price_history_window: usize,
}

impl Default for EconomicParams {
    fn default() -> Self {
        Self {
            burn_rate_min_bps: 100,
            burn_rate_max_bps: 1_000,
            trend_weight_pct: 40,
            volume_weight_pct: 30,
            health_weight_pct: 30,
            target_participants: 1_000,
            target_daily_actions: 10_000,
            target_staking_ratio_bps: 3_000,
            target_volatility_bps: 1_000,
            min_economic_factor_bps: 5_000,
            max_economic_factor_bps: 20_000,
            stake_bonus_unit: 10_000,
            max_stake_bonus_bps: 5_000,
            token_unit: 1_000_000_000_000_000_000,
            price_history_window: 24,
        }
    }
}

impl EconomicParams {
    /// Validate the full parameter set.
    pub fn validate(&self) -> Result<()> {
        if self.burn_rate_max_bps < self.burn_rate_min_bps {
            return Err(EconomicsError::InvalidParameter(format!(
                "burn_rate_max_bps {} is below burn_rate_min_bps {}",
                self.burn_rate_max_bps, self.burn_rate_min_bps
            )));
        }
        if self.burn_rate_max_bps > BPS_SCALE {
            return Err(EconomicsError::InvalidParameter(format!(
                "burn_rate_max_bps {} exceeds 10,000 basis points",
                self.burn_rate_max_bps
            )));
        }

        // Check that the premium weights add up to 100%
        let total_weight = self.trend_weight_pct as u64
            + self.volume_weight_pct as u64
            + self.health_weight_pct as u64;
        if total_weight != 100 {
            return Err(EconomicsError::InvalidParameter(format!(
                "burn premium weights must sum to 100%, got {}",
                total_weight
            )));
        }

        if self.target_participants == 0 || self.target_daily_actions == 0 {
            return Err(EconomicsError::InvalidParameter(
                "activity targets must be positive".to_string(),
            ));
        }
        if self.target_staking_ratio_bps == 0 || self.target_staking_ratio_bps > BPS_SCALE {
            return Err(EconomicsError::InvalidParameter(
                "target_staking_ratio_bps must be within (0, 10,000]".to_string(),
            ));
        }
        if self.target_volatility_bps == 0 {
            return Err(EconomicsError::InvalidParameter(
                "target_volatility_bps must be positive".to_string(),
            ));
        }
        if self.min_economic_factor_bps > self.max_economic_factor_bps {
            return Err(EconomicsError::InvalidParameter(
                "min_economic_factor_bps exceeds max_economic_factor_bps".to_string(),
            ));
        }
        if self.stake_bonus_unit == 0 || self.token_unit == 0 {
            return Err(EconomicsError::InvalidParameter(
                "stake_bonus_unit and token_unit must be positive".to_string(),
            ));
        }
        if self.price_history_window == 0 {
            return Err(EconomicsError::InvalidParameter(
                "price_history_window must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Width of the burn premium band.
    pub fn burn_budget_bps(&self) -> u32 {
        self.burn_rate_max_bps.saturating_sub(self.burn_rate_min_bps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_valid() {
        assert!(EconomicParams::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_burn_range_rejected() {
        let params = EconomicParams {
            burn_rate_min_bps: 500,
            burn_rate_max_bps: 400,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(EconomicsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_weights_must_sum_to_hundred() {
        let params = EconomicParams {
            trend_weight_pct: 50,
            volume_weight_pct: 30,
            health_weight_pct: 30,
            ..Default::default()
        };
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("100%"));
    }

    #[test]
    fn test_equal_burn_bounds_allowed() {
        let params = EconomicParams {
            burn_rate_min_bps: 300,
            burn_rate_max_bps: 300,
            ..Default::default()
        };
        assert!(params.validate().is_ok());
        assert_eq!(params.burn_budget_bps(), 0);
    }
}
