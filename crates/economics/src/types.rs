//! Core types for the economic-parameter engine

use lucid_types::{Amount, Height};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Neutral value of every score.
pub const NEUTRAL_SCORE: u32 = 100;

/// Upper bound of every score.
pub const MAX_SCORE: u32 = 200;

/// Network health below this score adds a burn premium.
pub const HEALTH_PREMIUM_THRESHOLD: u32 = 70;

/// Network telemetry reported by the metrics oracle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    /// Accounts active during the reporting window
    pub active_participants: u64,
    /// Gated actions recorded during the last day
    pub daily_actions: u64,
    /// Availability of the network in basis points (10_000 = 100%)
    pub uptime_bps: u32,
    /// Total amount locked in staking
    pub total_staked: Amount,
    /// Circulating supply of the economy token
    pub circulating_supply: Amount,
}

/// Market conditions derived from the price feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketState {
    /// Recent prices, oldest first (micro-quote per whole token)
    pub price_history: VecDeque<Amount>,
    /// Sum of the last reported 24h volumes (micro-quote)
    pub volume_24h: Amount,
    /// Market cap computed on the latest update (micro-quote)
    pub market_cap: Amount,
    /// Market cap computed on the update before the latest
    pub previous_market_cap: Amount,
    /// Height of the latest update
    pub updated_at: Height,
}

impl MarketState {
    pub fn latest_price(&self) -> Option<Amount> {
        self.price_history.back().copied()
    }

    /// Price range over the window relative to the mean, in basis points.
    pub fn volatility_bps(&self) -> u32 {
        if self.price_history.len() < 2 {
            return 0;
        }
        let max = self.price_history.iter().copied().max().unwrap_or(0);
        let min = self.price_history.iter().copied().min().unwrap_or(0);
        let sum: u128 = self
            .price_history
            .iter()
            .fold(0u128, |acc, price| acc.saturating_add(*price));
        let mean = sum / self.price_history.len() as u128;
        if mean == 0 {
            return 0;
        }
        let range_bps = (max - min).saturating_mul(10_000) / mean;
        range_bps.min(u32::MAX as u128) as u32
    }

    /// Market-cap decline since the previous update, in basis points (0 when flat or rising).
    pub fn decline_bps(&self) -> u32 {
        if self.previous_market_cap == 0 || self.market_cap >= self.previous_market_cap {
            return 0;
        }
        lucid_types::ratio_bps(
            self.previous_market_cap - self.market_cap,
            self.previous_market_cap,
        )
    }

    /// 24h volume relative to market cap, in basis points (capped at 100%).
    pub fn turnover_bps(&self) -> u32 {
        lucid_types::ratio_bps(self.volume_24h, self.market_cap)
    }
}

/// The four telemetry scores, each in `[0, 200]` with 100 = neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomicSnapshot {
    pub network_health_score: u32,
    pub market_stability_score: u32,
    pub utility_score: u32,
    pub staking_ratio_score: u32,
    /// Height at which the scores were recomputed
    pub computed_at: Height,
}

impl Default for EconomicSnapshot {
    fn default() -> Self {
        Self {
            network_health_score: NEUTRAL_SCORE,
            market_stability_score: NEUTRAL_SCORE,
            utility_score: NEUTRAL_SCORE,
            staking_ratio_score: NEUTRAL_SCORE,
            computed_at: 0,
        }
    }
}

impl EconomicSnapshot {
    pub fn scores(&self) -> [u32; 4] {
        [
            self.network_health_score,
            self.market_stability_score,
            self.utility_score,
            self.staking_ratio_score,
        ]
    }
}

/// Events emitted by the economic engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EconomicEvent {
    NetworkMetricsUpdated {
        metrics: NetworkMetrics,
        before: EconomicSnapshot,
        after: EconomicSnapshot,
    },
    MarketConditionsUpdated {
        latest_price: Amount,
        market_cap: Amount,
        volume_24h: Amount,
        before: EconomicSnapshot,
        after: EconomicSnapshot,
    },
    EconomicParamsUpdated {
        old_burn_range: (u32, u32),
        new_burn_range: (u32, u32),
    },
}
