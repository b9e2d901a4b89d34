//! Injected authorization context.
//!
//! The host verifies signatures and decides which capabilities the caller
//! holds for a given call; components only check the capability set they are
//! handed. Nothing here is stored between calls.

use crate::address::{short_id, AccountId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Capabilities a caller can present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// Deployment owner: pool creation, distributor configuration, economic params.
    Owner,
    /// The governance execution path (a passed, queued proposal).
    Governance,
    /// Guardian able to pause components and cancel proposals.
    Emergency,
    /// Price/metrics/performance oracle.
    Oracle,
    /// Action-recording collaborator allowed to meter gated actions.
    Recorder,
}

/// Caller identity plus the capabilities granted for this call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub caller: AccountId,
    pub roles: BTreeSet<Role>,
}

/// Raised when the caller lacks a required capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("caller {caller_hex} lacks role {role:?}")]
pub struct MissingRole {
    pub caller_hex: String,
    pub role: Role,
}

impl AuthContext {
    /// Plain account with no special capabilities.
    pub fn user(caller: AccountId) -> Self {
        Self {
            caller,
            roles: BTreeSet::new(),
        }
    }

    /// Account holding the given capabilities.
    pub fn with_roles(caller: AccountId, roles: &[Role]) -> Self {
        Self {
            caller,
            roles: roles.iter().copied().collect(),
        }
    }

    pub fn has(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Require a single capability.
    pub fn require(&self, role: Role) -> Result<(), MissingRole> {
        if self.has(role) {
            Ok(())
        } else {
            Err(MissingRole {
                caller_hex: short_id(&self.caller).to_string(),
                role,
            })
        }
    }

    /// Require at least one of the listed capabilities.
    pub fn require_any(&self, roles: &[Role]) -> Result<(), MissingRole> {
        if roles.iter().any(|role| self.has(*role)) {
            return Ok(());
        }
        Err(MissingRole {
            caller_hex: short_id(&self.caller).to_string(),
            role: roles.first().copied().unwrap_or(Role::Owner),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::account_id;

    #[test]
    fn test_user_has_no_roles() {
        let auth = AuthContext::user(account_id("alice"));
        assert!(auth.require(Role::Owner).is_err());
        assert!(auth.require_any(&[Role::Owner, Role::Governance]).is_err());
    }

    #[test]
    fn test_role_checks() {
        let auth = AuthContext::with_roles(account_id("guardian"), &[Role::Emergency]);
        assert!(auth.require(Role::Emergency).is_ok());
        assert!(auth.require(Role::Owner).is_err());
        assert!(auth.require_any(&[Role::Owner, Role::Emergency]).is_ok());
    }

    #[test]
    fn test_missing_role_message_names_role() {
        let auth = AuthContext::user([7u8; 32]);
        let err = auth.require(Role::Oracle).unwrap_err();
        assert!(err.to_string().contains("Oracle"));
    }
}
