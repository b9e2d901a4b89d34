//! Engine configuration.
//!
//! Layers, lowest precedence first: built-in defaults, an optional TOML
//! file, then `LUCID_*` environment variables with `__` separating nested
//! keys (`LUCID_STAKING__REWARD_RATE=250`).

use anyhow::{Context, Result};
use ::config::{Config, Environment, File};
use lucid_access::{AccessParams, TierConfig};
use lucid_economics::EconomicParams;
use lucid_governance::GovernanceParams;
use lucid_staking::{
    MultiplierBands, StakingParams, DEFAULT_MAX_LOCK, DEFAULT_MAX_STAKE, DEFAULT_MIN_LOCK,
    DEFAULT_MIN_STAKE,
};
use lucid_treasury::{Shares, TreasuryParams, MIN_PERFORMANCE_SCORE};
use lucid_types::{
    asset_id, days, module_account_id, AccountId, Amount, AssetId, Height, HexId,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "LUCID";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub staking: StakingConfig,
    pub access: AccessConfig,
    pub treasury: TreasuryConfig,
    pub governance: GovernanceParams,
    pub economics: EconomicParams,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load defaults, then `path` (which must exist when given), then the
    /// environment, and validate the result.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                anyhow::bail!("configuration file {} not found", path.display());
            }
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: EngineConfig = builder
            .build()
            .context("failed to read configuration sources")?
            .try_deserialize()
            .context("failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document without consulting the environment.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(source).context("failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.staking.validate().context("invalid [staking] section")?;
        self.access
            .params()
            .validate()
            .context("invalid [access] section")?;
        self.treasury
            .params()
            .validate()
            .context("invalid [treasury] section")?;
        self.governance
            .validate()
            .context("invalid [governance] section")?;
        self.economics
            .validate()
            .context("invalid [economics] section")?;
        self.logging.validate().context("invalid [logging] section")?;
        Ok(())
    }
}

/// Main staking pool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakingConfig {
    /// Symbol of the staked and reward asset
    pub asset: String,
    /// Reward units emitted per height across the pool
    #[serde(with = "lucid_types::serde_amount")]
    pub reward_rate: Amount,
    pub min_lock: Height,
    pub max_lock: Height,
    #[serde(with = "lucid_types::serde_amount")]
    pub min_stake: Amount,
    #[serde(with = "lucid_types::serde_amount")]
    pub max_stake: Amount,
    pub bands: MultiplierBands,
    #[serde(with = "lucid_types::serde_amount")]
    pub action_bonus: Amount,
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            asset: "LUCID".to_string(),
            reward_rate: 100,
            min_lock: DEFAULT_MIN_LOCK,
            max_lock: DEFAULT_MAX_LOCK,
            min_stake: DEFAULT_MIN_STAKE,
            max_stake: DEFAULT_MAX_STAKE,
            bands: MultiplierBands::default(),
            action_bonus: 0,
        }
    }
}

impl StakingConfig {
    pub fn asset_id(&self) -> AssetId {
        asset_id(&self.asset)
    }

    pub fn params(&self) -> StakingParams {
        StakingParams {
            min_stake: self.min_stake,
            max_stake: self.max_stake,
            bands: self.bands.clone(),
            action_bonus: self.action_bonus,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.asset.trim().is_empty() {
            anyhow::bail!("asset symbol must not be empty");
        }
        if self.min_lock == 0 || self.min_lock > self.max_lock {
            anyhow::bail!(
                "lock bounds [{}, {}] are invalid",
                self.min_lock,
                self.max_lock
            );
        }
        self.params().validate()?;
        Ok(())
    }
}

/// Access tier ladder and access staking settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Symbol of the token whose holdings decide tiers
    pub asset: String,
    pub base_tier: TierConfig,
    pub tiers: Vec<TierConfig>,
    #[serde(with = "lucid_types::serde_amount")]
    pub staking_reward_rate: Amount,
    pub staking_lock: Height,
}

impl Default for AccessConfig {
    fn default() -> Self {
        let params = AccessParams::default();
        Self {
            asset: "LUCID".to_string(),
            base_tier: params.base_tier,
            tiers: params.tiers,
            staking_reward_rate: params.staking_reward_rate,
            staking_lock: params.staking_lock,
        }
    }
}

impl AccessConfig {
    pub fn asset_id(&self) -> AssetId {
        asset_id(&self.asset)
    }

    pub fn params(&self) -> AccessParams {
        AccessParams {
            base_tier: self.base_tier.clone(),
            tiers: self.tiers.clone(),
            staking_reward_rate: self.staking_reward_rate,
            staking_lock: self.staking_lock,
        }
    }
}

/// Reward distributor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreasuryConfig {
    /// Recipient of the owner share (hex); defaults to a module account
    pub owner_account: Option<HexId>,
    /// Recipient of the treasury share (hex); defaults to a module account
    pub treasury_account: Option<HexId>,
    pub shares: Shares,
    #[serde(with = "lucid_types::serde_amount")]
    pub min_performance_score: u128,
    pub rebalance_period: Height,
    pub score_decay_bps: u32,
    pub points_decay_bps: u32,
}

impl Default for TreasuryConfig {
    fn default() -> Self {
        Self {
            owner_account: None,
            treasury_account: None,
            shares: Shares::default(),
            min_performance_score: MIN_PERFORMANCE_SCORE,
            rebalance_period: days(7),
            score_decay_bps: 1_000,
            points_decay_bps: 2_000,
        }
    }
}

impl TreasuryConfig {
    pub fn params(&self) -> TreasuryParams {
        TreasuryParams {
            shares: self.shares,
            min_performance_score: self.min_performance_score,
            rebalance_period: self.rebalance_period,
            score_decay_bps: self.score_decay_bps,
            points_decay_bps: self.points_decay_bps,
        }
    }

    pub fn owner_account(&self) -> AccountId {
        self.owner_account
            .map(AccountId::from)
            .unwrap_or_else(|| module_account_id("owner-share"))
    }

    pub fn treasury_account(&self) -> AccountId {
        self.treasury_account
            .map(AccountId::from)
            .unwrap_or_else(|| module_account_id("treasury"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<()> {
        if self.level.trim().is_empty() {
            anyhow::bail!("log level must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lucid_types::account_id;
    use std::io::Write;

    #[test]
    fn test_defaults_validate() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.staking.asset_id(), asset_id("LUCID"));
        assert_eq!(config.governance.quorum_bps, 400);
    }

    #[test]
    fn test_toml_sections_override_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [staking]
            asset = "DREAM"
            reward_rate = 250

            [[staking.bands]]
            min_duration = 0
            multiplier = 10000

            [[staking.bands]]
            min_duration = 7200
            multiplier = 20000

            [[access.tiers]]
            name = "Silver"
            required_balance = 1000
            required_staked = 0
            max_actions_per_day = 50
            storage_quota = 1048576
            priority_multiplier = 12000

            [treasury.shares]
            owner_bps = 0
            treasury_bps = 3000
            reward_bps = 7000

            [logging]
            format = "pretty"
            "#,
        )
        .unwrap();

        assert_eq!(config.staking.asset, "DREAM");
        assert_eq!(config.staking.reward_rate, 250);
        assert_eq!(config.staking.bands.multiplier_for(days(1)), 20_000);
        assert_eq!(config.staking.min_lock, DEFAULT_MIN_LOCK);
        assert_eq!(config.access.tiers[0].name, "Silver");
        assert_eq!(config.treasury.shares.treasury_bps, 3_000);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.economics, EconomicParams::default());
    }

    #[test]
    fn test_invalid_sections_rejected() {
        let err = EngineConfig::from_toml_str(
            r#"
            [treasury.shares]
            owner_bps = 5000
            treasury_bps = 5000
            reward_bps = 5000
            "#,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("[treasury]"));

        let err = EngineConfig::from_toml_str(
            r#"
            [governance]
            quorum_bps = 9000
            "#,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("[governance]"));

        assert!(EngineConfig::from_toml_str("[staking]\nmin_lock = 0\n").is_err());
    }

    #[test]
    fn test_recipient_accounts_parse_from_hex() {
        let owner = account_id("alice");
        let source = format!(
            "[treasury]\nowner_account = {}\n",
            serde_json::to_string(&HexId::from(owner)).unwrap()
        );
        let config = EngineConfig::from_toml_str(&source).unwrap();
        assert_eq!(config.treasury.owner_account(), owner);
        assert_eq!(config.treasury.treasury_account(), module_account_id("treasury"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[governance]\nvoting_delay = 600\n\n[economics]\nburn_rate_max_bps = 800").unwrap();

        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.governance.voting_delay, 600);
        assert_eq!(config.economics.burn_rate_max_bps, 800);
        assert_eq!(config.governance.voting_period, days(3));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("lucid.toml");
        let err = EngineConfig::load(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
