//! Account and asset identifiers.
//!
//! All identifiers are 32 raw bytes. Module-owned custody accounts are derived
//! as `BLAKE3(domain || label)`, so they have no private key and funds can only
//! leave them through the owning component's transitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of raw bytes contained in an identifier.
pub const ID_BYTES: usize = 32;

/// Account identifier (depositor, proposer, participant, module custody).
pub type AccountId = [u8; ID_BYTES];

/// Fungible asset identifier.
pub type AssetId = [u8; ID_BYTES];

const ACCOUNT_DOMAIN: &[u8] = b"LUCID_ACCOUNT";
const ASSET_DOMAIN: &[u8] = b"LUCID_ASSET";
const MODULE_DOMAIN: &[u8] = b"LUCID_MODULE";

fn derive(domain: &[u8], label: &str) -> [u8; ID_BYTES] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(domain);
    hasher.update(label.as_bytes());
    *hasher.finalize().as_bytes()
}

/// Derive a deterministic account identifier from a human readable label.
pub fn account_id(label: &str) -> AccountId {
    derive(ACCOUNT_DOMAIN, label)
}

/// Derive a deterministic asset identifier from its ticker symbol.
pub fn asset_id(symbol: &str) -> AssetId {
    derive(ASSET_DOMAIN, symbol)
}

/// Derive the custody account owned by an engine module.
///
/// `module_account_id("staking")` is the account holding staked principal and
/// the staking reward reserve.
pub fn module_account_id(module: &str) -> AccountId {
    derive(MODULE_DOMAIN, module)
}

/// Short hexadecimal rendering used in logs (first 8 bytes).
pub fn short_id(id: &[u8; ID_BYTES]) -> ShortId<'_> {
    ShortId(id)
}

/// Display helper returned by [`short_id`].
pub struct ShortId<'a>(&'a [u8; ID_BYTES]);

impl fmt::Display for ShortId<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

/// Serde adapter rendering identifiers as hex strings in JSON payloads.
pub mod serde_hex_id {
    use super::ID_BYTES;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(id: &[u8; ID_BYTES], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(id))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; ID_BYTES], D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        let bytes = hex::decode(value.trim_start_matches("0x")).map_err(D::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| D::Error::custom("identifier must be exactly 32 bytes"))
    }
}

/// Identifier wrapper that serialises as hex, for config files and call payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HexId(#[serde(with = "serde_hex_id")] pub [u8; ID_BYTES]);

impl From<[u8; ID_BYTES]> for HexId {
    fn from(value: [u8; ID_BYTES]) -> Self {
        Self(value)
    }
}

impl From<HexId> for [u8; ID_BYTES] {
    fn from(value: HexId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_is_deterministic_and_domain_separated() {
        assert_eq!(account_id("alice"), account_id("alice"));
        assert_ne!(account_id("alice"), account_id("bob"));
        assert_ne!(account_id("staking"), module_account_id("staking"));
        assert_ne!(asset_id("DREAM"), account_id("DREAM"));
    }

    #[test]
    fn test_hex_id_json_roundtrip() {
        let id = HexId(asset_id("SMIND"));
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json.len(), 66);
        let back: HexId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_hex_id_rejects_short_payload() {
        let result: Result<HexId, _> = serde_json::from_str("\"abcd\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_short_id_display() {
        let id = [0xabu8; 32];
        assert_eq!(format!("{}", short_id(&id)), "abababababababab");
    }
}
