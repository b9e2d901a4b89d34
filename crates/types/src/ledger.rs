//! Fungible-asset ledger contract consumed from the host.
//!
//! ERC-20 style semantics (`transfer`, `transfer_from`, `balance_of`,
//! `allowance`) keyed by asset. The engine never creates tokens; the only
//! supply change it requests is `burn` from a module custody account.
//!
//! Ledgers also answer balance queries at past heights; governance weighs
//! votes against those rather than against live balances.

use crate::address::{AccountId, AssetId};
use crate::error::{Classify, ErrorKind};
use crate::history::Checkpoints;
use crate::units::{Amount, Height};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Reasons the host ledger refuses an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: Amount, required: Amount },

    #[error("insufficient allowance: approved {approved}, required {required}")]
    InsufficientAllowance { approved: Amount, required: Amount },

    #[error("arithmetic overflow while updating balances")]
    Overflow,
}

impl Classify for LedgerError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Ledger
    }
}

/// Interface for fungible-asset ledger operations.
pub trait TokenLedger: Send + Sync {
    /// Balance of `account` in `asset`.
    fn balance_of(&self, asset: &AssetId, account: &AccountId) -> Amount;

    /// Amount `spender` may move out of `owner`'s balance.
    fn allowance(&self, asset: &AssetId, owner: &AccountId, spender: &AccountId) -> Amount;

    /// Total supply of `asset`.
    fn total_supply(&self, asset: &AssetId) -> Amount;

    /// Balance of `account` at the end of `height`.
    fn balance_at(&self, asset: &AssetId, account: &AccountId, height: Height) -> Amount;

    /// Total supply of `asset` at the end of `height`.
    fn total_supply_at(&self, asset: &AssetId, height: Height) -> Amount;

    /// Current host height. Later changes are recorded at this height or
    /// above; ledgers that track heights themselves can ignore it.
    fn advance_to(&mut self, _height: Height) {}

    /// Set `spender`'s allowance over `owner`'s balance.
    fn approve(
        &mut self,
        asset: &AssetId,
        owner: &AccountId,
        spender: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Move `amount` from `from` to `to`.
    fn transfer(
        &mut self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Move `amount` from `from` to `to`, consuming `spender`'s allowance.
    fn transfer_from(
        &mut self,
        asset: &AssetId,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Destroy `amount` held by `from`, reducing total supply.
    fn burn(&mut self, asset: &AssetId, from: &AccountId, amount: Amount)
        -> Result<(), LedgerError>;
}

// -----------------------------------------------------------------------------
// In-memory implementation (for embedding hosts and testing)
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryLedger {
    height: Height,
    balances: HashMap<(AssetId, AccountId), Checkpoints<Amount>>,
    allowances: HashMap<(AssetId, AccountId, AccountId), Amount>,
    supply: HashMap<AssetId, Checkpoints<Amount>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Height changes are currently recorded at.
    pub fn height(&self) -> Height {
        self.height
    }

    /// Create new units of `asset` for `to` (genesis allocation, faucets, tests).
    pub fn mint(
        &mut self,
        asset: &AssetId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let new_supply = self
            .total_supply(asset)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let new_balance = self
            .balance_of(asset, to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.set_supply(asset, new_supply);
        self.set_balance(asset, to, new_balance);
        Ok(())
    }

    fn set_balance(&mut self, asset: &AssetId, account: &AccountId, amount: Amount) {
        self.balances
            .entry((*asset, *account))
            .or_default()
            .record(self.height, amount);
    }

    fn set_supply(&mut self, asset: &AssetId, amount: Amount) {
        self.supply
            .entry(*asset)
            .or_default()
            .record(self.height, amount);
    }

    fn debit(&mut self, asset: &AssetId, from: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        let available = self.balance_of(asset, from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                available,
                required: amount,
            });
        }
        self.set_balance(asset, from, available - amount);
        Ok(())
    }
}

impl TokenLedger for InMemoryLedger {
    fn balance_of(&self, asset: &AssetId, account: &AccountId) -> Amount {
        self.balances
            .get(&(*asset, *account))
            .and_then(Checkpoints::latest)
            .copied()
            .unwrap_or(0)
    }

    fn allowance(&self, asset: &AssetId, owner: &AccountId, spender: &AccountId) -> Amount {
        self.allowances
            .get(&(*asset, *owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    fn total_supply(&self, asset: &AssetId) -> Amount {
        self.supply
            .get(asset)
            .and_then(Checkpoints::latest)
            .copied()
            .unwrap_or(0)
    }

    fn balance_at(&self, asset: &AssetId, account: &AccountId, height: Height) -> Amount {
        self.balances
            .get(&(*asset, *account))
            .and_then(|history| history.at(height))
            .copied()
            .unwrap_or(0)
    }

    fn total_supply_at(&self, asset: &AssetId, height: Height) -> Amount {
        self.supply
            .get(asset)
            .and_then(|history| history.at(height))
            .copied()
            .unwrap_or(0)
    }

    fn advance_to(&mut self, height: Height) {
        self.height = self.height.max(height);
    }

    fn approve(
        &mut self,
        asset: &AssetId,
        owner: &AccountId,
        spender: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.allowances.insert((*asset, *owner, *spender), amount);
        Ok(())
    }

    fn transfer(
        &mut self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if from == to {
            return if self.balance_of(asset, from) >= amount {
                Ok(())
            } else {
                Err(LedgerError::InsufficientBalance {
                    available: self.balance_of(asset, from),
                    required: amount,
                })
            };
        }
        let receiver = self.balance_of(asset, to);
        let new_receiver = receiver.checked_add(amount).ok_or(LedgerError::Overflow)?;
        self.debit(asset, from, amount)?;
        self.set_balance(asset, to, new_receiver);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        asset: &AssetId,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let approved = self.allowance(asset, from, spender);
        if approved < amount {
            return Err(LedgerError::InsufficientAllowance {
                approved,
                required: amount,
            });
        }
        self.transfer(asset, from, to, amount)?;
        self.allowances
            .insert((*asset, *from, *spender), approved - amount);
        Ok(())
    }

    fn burn(
        &mut self,
        asset: &AssetId,
        from: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.debit(asset, from, amount)?;
        let supply = self.total_supply(asset);
        self.set_supply(asset, supply.saturating_sub(amount));
        Ok(())
    }
}
