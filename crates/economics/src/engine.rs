//! Economic-parameter engine.
//!
//! Holds the latest network and market telemetry, recomputes the four
//! snapshot scores whenever either is refreshed, and derives the burn rate
//! and reward multipliers from them. Every calculation is integer-only.

use crate::errors::{EconomicsError, Result};
use crate::parameters::{EconomicParams, REWARD_MULTIPLIER_CEILING, REWARD_MULTIPLIER_FLOOR};
use crate::types::*;
use lucid_types::{
    clamp_u32, mul_div, ratio_bps, Amount, AuthContext, EventLog, Height, Role, BPS_SCALE,
};
use tracing::{debug, info, warn};

/// Highest accepted performance sub-score.
pub const MAX_SUB_SCORE: u32 = 1_000;

/// Computes burn rate and reward multipliers from externally supplied telemetry.
#[derive(Debug, Clone, Default)]
pub struct EconomicEngine {
    params: EconomicParams,
    metrics: NetworkMetrics,
    market: MarketState,
    snapshot: EconomicSnapshot,
    events: EventLog<EconomicEvent>,
}

impl EconomicEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with validated parameters.
    pub fn with_params(params: EconomicParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            ..Self::default()
        })
    }

    /// Replace the network telemetry and recompute the snapshot.
    pub fn update_network_metrics(
        &mut self,
        auth: &AuthContext,
        metrics: NetworkMetrics,
        now: Height,
    ) -> Result<EconomicSnapshot> {
        if let Err(err) = auth.require_any(&[Role::Owner, Role::Oracle]) {
            warn!(target: "economics", "rejected network metrics update: {}", err);
            return Err(err.into());
        }
        if metrics.uptime_bps > BPS_SCALE {
            return Err(EconomicsError::InvalidMetrics("uptime exceeds 10,000 basis points"));
        }

        let before = self.snapshot;
        self.metrics = metrics.clone();
        self.recompute(now);
        let after = self.snapshot;

        info!(
            target: "economics",
            "network metrics updated at height {}: health {} -> {}, utility {} -> {}, staking {} -> {}",
            now,
            before.network_health_score,
            after.network_health_score,
            before.utility_score,
            after.utility_score,
            before.staking_ratio_score,
            after.staking_ratio_score
        );
        self.events.emit(
            now,
            EconomicEvent::NetworkMetricsUpdated {
                metrics,
                before,
                after,
            },
        );
        Ok(after)
    }

    /// Append a batch of prices and 24h volumes, refresh market cap and
    /// recompute the snapshot.
    pub fn update_market_conditions(
        &mut self,
        auth: &AuthContext,
        prices: &[Amount],
        volumes: &[Amount],
        now: Height,
    ) -> Result<EconomicSnapshot> {
        if let Err(err) = auth.require_any(&[Role::Owner, Role::Oracle]) {
            warn!(target: "economics", "rejected market update: {}", err);
            return Err(err.into());
        }
        let latest_price = match prices.last() {
            Some(price) => *price,
            None => return Err(EconomicsError::InvalidMarketData("price batch is empty")),
        };
        if prices.iter().any(|price| *price == 0) {
            return Err(EconomicsError::InvalidMarketData("prices must be positive"));
        }
        let volume_24h = volumes
            .iter()
            .try_fold(0u128, |acc, volume| acc.checked_add(*volume))
            .ok_or(EconomicsError::InvalidMarketData("volume total overflows"))?;
        let market_cap = mul_div(
            latest_price,
            self.metrics.circulating_supply,
            self.params.token_unit,
        )
        .ok_or(EconomicsError::InvalidMarketData("market cap overflows"))?;

        let before = self.snapshot;
        self.market.previous_market_cap = self.market.market_cap;
        self.market.market_cap = market_cap;
        self.market.volume_24h = volume_24h;
        self.market.updated_at = now;
        self.market.price_history.extend(prices.iter().copied());
        self.trim_price_history();
        self.recompute(now);
        let after = self.snapshot;

        debug!(
            target: "economics",
            "market cap {} -> {}, volatility {} bps",
            self.market.previous_market_cap,
            market_cap,
            self.market.volatility_bps()
        );
        info!(
            target: "economics",
            "market conditions updated at height {}: price {}, stability {} -> {}",
            now,
            latest_price,
            before.market_stability_score,
            after.market_stability_score
        );
        self.events.emit(
            now,
            EconomicEvent::MarketConditionsUpdated {
                latest_price,
                market_cap,
                volume_24h,
                before,
                after,
            },
        );
        Ok(after)
    }

    /// Reward multiplier in basis points for a participant with the given
    /// performance sub-scores (each `0..=1000`) and staked amount.
    ///
    /// Three factors are composed multiplicatively:
    /// - performance: `0.5x` at a zero average, `1.0x` at 500, `1.5x` at 1000
    /// - stake bonus: `+1%` per `stake_bonus_unit`, capped at `max_stake_bonus_bps`
    /// - economy: the product of the four snapshot scores normalised to 100,
    ///   clamped to the configured factor bounds
    pub fn calculate_reward_multiplier(&self, scores: [u32; 3], staked: Amount) -> u32 {
        let sum: u128 = scores
            .iter()
            .map(|score| (*score).min(MAX_SUB_SCORE) as u128)
            .sum();
        let average = sum / 3;
        let performance = 5_000 + average * 10;

        let bonus_steps = staked / self.params.stake_bonus_unit;
        let stake_bonus = BPS_SCALE as u128
            + bonus_steps
                .saturating_mul(100)
                .min(self.params.max_stake_bonus_bps as u128);

        let economy = self.economic_factor_bps() as u128;
        let scale = BPS_SCALE as u128;

        let multiplier = performance * stake_bonus / scale * economy / scale;
        clamp_u32(
            multiplier.min(u32::MAX as u128) as u32,
            REWARD_MULTIPLIER_FLOOR,
            REWARD_MULTIPLIER_CEILING,
        )
    }

    /// Snapshot scores composed into one factor (basis points, 10_000 = neutral).
    pub fn economic_factor_bps(&self) -> u32 {
        let product = self
            .snapshot
            .scores()
            .iter()
            .fold(BPS_SCALE as u128, |acc, score| acc * *score as u128);
        let neutral = NEUTRAL_SCORE as u128;
        let factor = product / (neutral * neutral * neutral * neutral);
        clamp_u32(
            factor.min(u32::MAX as u128) as u32,
            self.params.min_economic_factor_bps,
            self.params.max_economic_factor_bps,
        )
    }

    /// Burn rate in basis points.
    ///
    /// Starts at the configured minimum and spends the band up to the maximum
    /// on three weighted signals: market-cap decline since the previous
    /// update, 24h volume over market cap, and network health below 70.
    pub fn calculate_optimal_burn_rate(&self) -> u32 {
        let decline = self.market.decline_bps() as u128;
        let turnover = self.market.turnover_bps() as u128;
        let health = self.snapshot.network_health_score;
        let health_signal = if health < HEALTH_PREMIUM_THRESHOLD {
            ((HEALTH_PREMIUM_THRESHOLD - health) as u128 * BPS_SCALE as u128)
                / HEALTH_PREMIUM_THRESHOLD as u128
        } else {
            0
        };

        let weighted = self.params.trend_weight_pct as u128 * decline
            + self.params.volume_weight_pct as u128 * turnover
            + self.params.health_weight_pct as u128 * health_signal;
        let premium = self.params.burn_budget_bps() as u128 * weighted / (100 * BPS_SCALE as u128);

        let rate = (self.params.burn_rate_min_bps as u128 + premium).min(u32::MAX as u128) as u32;
        clamp_u32(
            rate,
            self.params.burn_rate_min_bps,
            self.params.burn_rate_max_bps,
        )
    }

    /// Replace the parameter set after validating it as a whole.
    pub fn update_economic_params(
        &mut self,
        auth: &AuthContext,
        params: EconomicParams,
        now: Height,
    ) -> Result<()> {
        if let Err(err) = auth.require_any(&[Role::Owner, Role::Governance]) {
            warn!(target: "economics", "rejected parameter update: {}", err);
            return Err(err.into());
        }
        params.validate()?;

        let old_burn_range = (self.params.burn_rate_min_bps, self.params.burn_rate_max_bps);
        let new_burn_range = (params.burn_rate_min_bps, params.burn_rate_max_bps);
        self.params = params;
        self.trim_price_history();
        self.recompute(now);

        info!(
            target: "economics",
            "economic parameters updated: burn range {:?} -> {:?}",
            old_burn_range,
            new_burn_range
        );
        self.events.emit(
            now,
            EconomicEvent::EconomicParamsUpdated {
                old_burn_range,
                new_burn_range,
            },
        );
        Ok(())
    }

    pub fn snapshot(&self) -> EconomicSnapshot {
        self.snapshot
    }

    pub fn network_metrics(&self) -> &NetworkMetrics {
        &self.metrics
    }

    pub fn market_state(&self) -> &MarketState {
        &self.market
    }

    pub fn params(&self) -> &EconomicParams {
        &self.params
    }

    pub fn events(&self) -> &EventLog<EconomicEvent> {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventLog<EconomicEvent> {
        &mut self.events
    }

    fn trim_price_history(&mut self) {
        while self.market.price_history.len() > self.params.price_history_window {
            self.market.price_history.pop_front();
        }
    }

    fn recompute(&mut self, now: Height) {
        self.snapshot = EconomicSnapshot {
            network_health_score: self.network_health_score(),
            market_stability_score: self.market_stability_score(),
            utility_score: self.utility_score(),
            staking_ratio_score: self.staking_ratio_score(),
            computed_at: now,
        };
    }

    fn network_health_score(&self) -> u32 {
        let participation = scaled_score(
            self.metrics.active_participants as u128,
            self.params.target_participants as u128,
        );
        let score = self.metrics.uptime_bps as u128 * participation as u128 / BPS_SCALE as u128;
        (score as u32).min(MAX_SCORE)
    }

    fn market_stability_score(&self) -> u32 {
        if self.market.price_history.len() < 2 {
            return NEUTRAL_SCORE;
        }
        let volatility = self.market.volatility_bps() as u128 * NEUTRAL_SCORE as u128
            / self.params.target_volatility_bps as u128;
        MAX_SCORE - volatility.min(MAX_SCORE as u128) as u32
    }

    fn utility_score(&self) -> u32 {
        scaled_score(
            self.metrics.daily_actions as u128,
            self.params.target_daily_actions as u128,
        )
    }

    fn staking_ratio_score(&self) -> u32 {
        if self.metrics.circulating_supply == 0 {
            return NEUTRAL_SCORE;
        }
        let ratio = ratio_bps(self.metrics.total_staked, self.metrics.circulating_supply);
        scaled_score(ratio as u128, self.params.target_staking_ratio_bps as u128)
    }
}

/// `value / target` expressed on the 0..=200 score scale.
fn scaled_score(value: u128, target: u128) -> u32 {
    if target == 0 {
        return NEUTRAL_SCORE;
    }
    let score = value.saturating_mul(NEUTRAL_SCORE as u128) / target;
    score.min(MAX_SCORE as u128) as u32
}
