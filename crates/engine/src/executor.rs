//! Timelock executor applying governance calls to the engine's components.
//!
//! Each call is `target.function` with JSON arguments. Calls run with the
//! governance capability under the governance module account. Only
//! `ledger.transfer` may carry value, spent from that account.
//!
//! A proposal's calls are staged and take effect together: if any call
//! fails, no component and no balance changes.

use anyhow::{ensure, Context, Result};
use lucid_access::{check_permission_change, AccessTiers, TierConfig};
use lucid_economics::{EconomicEngine, EconomicParams};
use lucid_governance::{ProposalCall, TimelockExecutor};
use lucid_staking::{MultiplierBand, MultiplierBands, StakingPool};
use lucid_treasury::{RewardDistributor, Shares};
use lucid_types::{
    asset_id, module_account_id, short_id, AccountId, Amount, AssetId, AuthContext, Height,
    HexId, Role, TierId, TokenLedger,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Label of the account holding funds governance can spend.
pub const GOVERNANCE_MODULE: &str = "governance";

/// `staking.setRewardRate` arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardRateArgs {
    pub asset: String,
    pub reward_rate: Amount,
}

/// `access.updateTier` arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTierArgs {
    pub tier_id: TierId,
    pub config: TierConfig,
}

/// `access.setTierActive` arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierActiveArgs {
    pub tier_id: TierId,
    pub active: bool,
}

/// `access.grantSpecialAccess` / `access.revokeSpecialAccess` arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialAccessArgs {
    pub account: HexId,
    pub bits: u32,
    pub reason: String,
}

/// `ledger.transfer` arguments; the amount is the call's value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferArgs {
    pub asset: String,
    pub to: HexId,
}

/// A decoded governance call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetCall {
    UpdateEconomicParams(EconomicParams),
    SetRewardRate { asset: AssetId, reward_rate: Amount },
    UpdateMultiplierBands(Vec<MultiplierBand>),
    CreateTier(TierConfig),
    UpdateTier(UpdateTierArgs),
    SetTierActive(TierActiveArgs),
    GrantSpecialAccess(SpecialAccessArgs),
    RevokeSpecialAccess(SpecialAccessArgs),
    UpdateShares(Shares),
    Transfer { asset: AssetId, to: AccountId, amount: Amount },
}

impl TargetCall {
    pub fn decode(call: &ProposalCall) -> Result<Self> {
        let selector = call.selector();
        if selector != "ledger.transfer" {
            ensure!(call.value == 0, "{} cannot carry value", selector);
        }
        let data = call.calldata.as_slice();
        let decoded = match selector.as_str() {
            "economics.updateEconomicParams" => Self::UpdateEconomicParams(parse(data)?),
            "staking.setRewardRate" => {
                let args: RewardRateArgs = parse(data)?;
                Self::SetRewardRate {
                    asset: asset_id(&args.asset),
                    reward_rate: args.reward_rate,
                }
            }
            "staking.updateMultiplierBands" => Self::UpdateMultiplierBands(parse(data)?),
            "access.createTier" => Self::CreateTier(parse(data)?),
            "access.updateTier" => Self::UpdateTier(parse(data)?),
            "access.setTierActive" => Self::SetTierActive(parse(data)?),
            "access.grantSpecialAccess" => Self::GrantSpecialAccess(parse(data)?),
            "access.revokeSpecialAccess" => Self::RevokeSpecialAccess(parse(data)?),
            "treasury.updateShares" => Self::UpdateShares(parse(data)?),
            "ledger.transfer" => {
                let args: TransferArgs = parse(data)?;
                ensure!(call.value > 0, "ledger.transfer needs a positive value");
                Self::Transfer {
                    asset: asset_id(&args.asset),
                    to: args.to.into(),
                    amount: call.value,
                }
            }
            other => anyhow::bail!("unknown call {}", other),
        };
        Ok(decoded)
    }
}

fn parse<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T> {
    serde_json::from_slice(data).context("malformed call arguments")
}

/// Borrowed view of the components a proposal may change.
///
/// Calls are staged on copies of the components and ledger transfers are
/// queued; `commit` swaps the copies in and performs the transfers.
pub struct EngineExecutor<'a> {
    staking: &'a mut StakingPool,
    access: &'a mut AccessTiers,
    treasury: &'a mut RewardDistributor,
    economics: &'a mut EconomicEngine,
    ledger: &'a mut dyn TokenLedger,
    staged: Option<Staged>,
}

/// Component copies and queued transfers of the proposal being executed.
struct Staged {
    staking: StakingPool,
    access: AccessTiers,
    treasury: RewardDistributor,
    economics: EconomicEngine,
    transfers: Vec<(AssetId, AccountId, Amount)>,
}

impl<'a> EngineExecutor<'a> {
    pub fn new(
        staking: &'a mut StakingPool,
        access: &'a mut AccessTiers,
        treasury: &'a mut RewardDistributor,
        economics: &'a mut EconomicEngine,
        ledger: &'a mut dyn TokenLedger,
    ) -> Self {
        Self {
            staking,
            access,
            treasury,
            economics,
            ledger,
            staged: None,
        }
    }

    fn authority() -> AuthContext {
        AuthContext::with_roles(module_account_id(GOVERNANCE_MODULE), &[Role::Governance])
    }

    fn staged(&mut self) -> &mut Staged {
        let (staking, access, treasury, economics) =
            (&*self.staking, &*self.access, &*self.treasury, &*self.economics);
        self.staged.get_or_insert_with(|| Staged {
            staking: staking.clone(),
            access: access.clone(),
            treasury: treasury.clone(),
            economics: economics.clone(),
            transfers: Vec::new(),
        })
    }

    /// Governance funds of `asset` not yet claimed by a queued transfer.
    fn unspent(&self, asset: &AssetId) -> Amount {
        let queued = self
            .staged
            .iter()
            .flat_map(|staged| staged.transfers.iter())
            .filter(|(queued_asset, _, _)| queued_asset == asset)
            .fold(0u128, |acc, (_, _, amount)| acc.saturating_add(*amount));
        self.ledger
            .balance_of(asset, &module_account_id(GOVERNANCE_MODULE))
            .saturating_sub(queued)
    }

    fn check(&self, call: &TargetCall) -> Result<()> {
        match call {
            TargetCall::UpdateEconomicParams(params) => params.validate()?,
            TargetCall::SetRewardRate { asset, .. } => {
                ensure!(
                    self.staking.pool(asset).is_some(),
                    "no staking pool for {}",
                    short_id(asset)
                );
            }
            TargetCall::UpdateMultiplierBands(bands) => {
                MultiplierBands::new(bands.clone())?;
            }
            TargetCall::CreateTier(config) => self.access.check_tier_change(None, config)?,
            TargetCall::UpdateTier(args) => self
                .access
                .check_tier_change(Some(args.tier_id), &args.config)?,
            TargetCall::SetTierActive(args) => {
                ensure!(
                    self.access.tier(args.tier_id).is_some(),
                    "unknown tier {}",
                    args.tier_id
                );
            }
            TargetCall::GrantSpecialAccess(args) | TargetCall::RevokeSpecialAccess(args) => {
                check_permission_change(args.bits, &args.reason)?
            }
            TargetCall::UpdateShares(shares) => shares.validate()?,
            TargetCall::Transfer { asset, amount, .. } => {
                let available = self.unspent(asset);
                ensure!(
                    available >= *amount,
                    "governance holds {} of {} unspent, transfer needs {}",
                    available,
                    short_id(asset),
                    amount
                );
            }
        }
        Ok(())
    }
}

impl TimelockExecutor for EngineExecutor<'_> {
    fn validate_call(&self, call: &ProposalCall) -> Result<()> {
        let decoded = TargetCall::decode(call)?;
        self.check(&decoded)
    }

    fn execute_call(&mut self, call: &ProposalCall, now: Height) -> Result<()> {
        let auth = Self::authority();
        match TargetCall::decode(call)? {
            TargetCall::UpdateEconomicParams(params) => self
                .staged()
                .economics
                .update_economic_params(&auth, params, now)?,
            TargetCall::SetRewardRate { asset, reward_rate } => self
                .staged()
                .staking
                .set_reward_rate(&auth, asset, reward_rate, now)?,
            TargetCall::UpdateMultiplierBands(bands) => self
                .staged()
                .staking
                .update_multiplier_bands(&auth, bands, now)?,
            TargetCall::CreateTier(config) => {
                self.staged().access.create_tier(&auth, config, now)?;
            }
            TargetCall::UpdateTier(args) => self
                .staged()
                .access
                .update_tier(&auth, args.tier_id, args.config, now)?,
            TargetCall::SetTierActive(args) => self
                .staged()
                .access
                .set_tier_active(&auth, args.tier_id, args.active, now)?,
            TargetCall::GrantSpecialAccess(args) => {
                self.staged().access.grant_special_access(
                    &auth,
                    args.account.into(),
                    args.bits,
                    &args.reason,
                    now,
                )?;
            }
            TargetCall::RevokeSpecialAccess(args) => {
                self.staged().access.revoke_special_access(
                    &auth,
                    args.account.into(),
                    args.bits,
                    &args.reason,
                    now,
                )?;
            }
            TargetCall::UpdateShares(shares) => self
                .staged()
                .treasury
                .update_shares(&auth, shares, now)?,
            transfer @ TargetCall::Transfer { .. } => {
                self.check(&transfer)?;
                if let TargetCall::Transfer { asset, to, amount } = transfer {
                    self.staged().transfers.push((asset, to, amount));
                }
            }
        }
        Ok(())
    }

    fn commit(&mut self, _now: Height) -> Result<()> {
        let staged = match self.staged.take() {
            Some(staged) => staged,
            None => return Ok(()),
        };
        let treasury_account = module_account_id(GOVERNANCE_MODULE);

        // every queued transfer is covered before the first one moves
        let mut totals: BTreeMap<AssetId, Amount> = BTreeMap::new();
        for (asset, _, amount) in &staged.transfers {
            let total = totals.entry(*asset).or_default();
            *total = total
                .checked_add(*amount)
                .context("governance transfers overflow")?;
        }
        for (asset, total) in &totals {
            let available = self.ledger.balance_of(asset, &treasury_account);
            ensure!(
                available >= *total,
                "governance holds {} of {}, transfers need {}",
                available,
                short_id(asset),
                total
            );
        }
        for (asset, to, amount) in &staged.transfers {
            self.ledger
                .transfer(asset, &treasury_account, to, *amount)?;
            info!(
                target: "engine",
                "governance transferred {} of {} to {}",
                amount,
                short_id(asset),
                short_id(to)
            );
        }

        *self.staking = staged.staking;
        *self.access = staged.access;
        *self.treasury = staged.treasury;
        *self.economics = staged.economics;
        Ok(())
    }

    fn rollback(&mut self) {
        if self.staged.take().is_some() {
            debug!(target: "engine", "discarded staged governance calls");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_selectors() {
        let call = ProposalCall::json(
            "staking",
            "setRewardRate",
            &RewardRateArgs {
                asset: "LUCID".into(),
                reward_rate: 7,
            },
        )
        .unwrap();
        assert_eq!(
            TargetCall::decode(&call).unwrap(),
            TargetCall::SetRewardRate {
                asset: asset_id("LUCID"),
                reward_rate: 7
            }
        );

        let call = ProposalCall::json("treasury", "updateShares", &Shares::default()).unwrap();
        assert_eq!(
            TargetCall::decode(&call).unwrap(),
            TargetCall::UpdateShares(Shares::default())
        );
    }

    #[test]
    fn test_value_only_on_transfers() {
        let call = ProposalCall::json("treasury", "updateShares", &Shares::default())
            .unwrap()
            .with_value(5);
        assert!(TargetCall::decode(&call).is_err());

        let transfer = TransferArgs {
            asset: "LUCID".into(),
            to: HexId::from(lucid_types::account_id("grantee")),
        };
        let call = ProposalCall::json("ledger", "transfer", &transfer).unwrap();
        assert!(TargetCall::decode(&call).is_err());
        let call = call.with_value(10);
        assert!(matches!(
            TargetCall::decode(&call).unwrap(),
            TargetCall::Transfer { amount: 10, .. }
        ));
    }

    #[test]
    fn test_unknown_and_malformed_calls_rejected() {
        let call = ProposalCall::json("staking", "drain", &()).unwrap();
        assert!(TargetCall::decode(&call).is_err());
        let call = ProposalCall {
            target: "economics".into(),
            function: "updateEconomicParams".into(),
            value: 0,
            calldata: b"not json".to_vec(),
        };
        assert!(TargetCall::decode(&call).is_err());
    }
}
