//! Canonical units and engine-wide constants.
//!
//! ## Time axis
//! Heights are a monotonically increasing counter supplied by the host with
//! every call. Durations (lock periods, voting periods, timelocks) are
//! expressed in heights; the helpers below convert human durations assuming
//! 12-second heights.
//!
//! ## Fixed point
//! Multipliers and rates are basis points: `10_000 == 1.0x`.

/// Host height (block number).
pub type Height = u64;

/// Raw token amount in the asset's smallest unit.
pub type Amount = u128;

/// Identifier of a staking position.
pub type StakeId = u64;

/// Identifier of an access tier.
pub type TierId = u32;

/// Identifier of a governance proposal.
pub type ProposalId = u64;

/// Basis-point scale (100% == 10_000).
pub const BPS_SCALE: u32 = 10_000;

/// Neutral multiplier (1.0x).
pub const BASE_MULTIPLIER: u32 = 10_000;

/// Upper bound for any duration multiplier (3.0x).
pub const MAX_MULTIPLIER: u32 = 30_000;

/// Fixed-point precision of reward-per-share accumulators.
pub const PRECISION: u128 = 1_000_000_000_000;

/// Heights per hour at 12-second heights.
pub const HEIGHTS_PER_HOUR: Height = 300;

/// Heights per day at 12-second heights.
pub const HEIGHTS_PER_DAY: Height = 24 * HEIGHTS_PER_HOUR;

/// Convert whole hours into heights.
#[inline]
pub const fn hours(n: u64) -> Height {
    n.saturating_mul(HEIGHTS_PER_HOUR)
}

/// Convert whole days into heights.
#[inline]
pub const fn days(n: u64) -> Height {
    n.saturating_mul(HEIGHTS_PER_DAY)
}

/// Day index used to key daily counters.
#[inline]
pub const fn day_index(height: Height) -> u64 {
    height / HEIGHTS_PER_DAY
}

/// Serde adapter for amounts in config files and call payloads.
///
/// TOML has no 128-bit integers, so amounts that fit in a `u64` are written
/// as plain integers and larger ones as decimal strings. Both forms are
/// accepted when reading.
pub mod serde_amount {
    use super::Amount;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(u64),
        Text(String),
    }

    pub fn serialize<S>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match u64::try_from(*amount) {
            Ok(small) => serializer.serialize_u64(small),
            Err(_) => serializer.serialize_str(&amount.to_string()),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Amount, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value as Amount),
            Repr::Text(text) => text
                .trim()
                .replace('_', "")
                .parse()
                .map_err(|_| D::Error::custom(format!("invalid amount {:?}", text))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_helpers() {
        assert_eq!(hours(1), 300);
        assert_eq!(days(1), 7_200);
        assert_eq!(days(30), 216_000);
        assert_eq!(day_index(7_199), 0);
        assert_eq!(day_index(7_200), 1);
    }

    #[test]
    fn test_multiplier_bounds_are_ordered() {
        assert!(BASE_MULTIPLIER <= MAX_MULTIPLIER);
        assert_eq!(BASE_MULTIPLIER, BPS_SCALE);
    }

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Budget {
        #[serde(with = "serde_amount")]
        amount: Amount,
    }

    #[test]
    fn test_amounts_beyond_u64_use_strings() {
        let large = Budget {
            amount: 1_000_000_000_000_000_000_000_000_000,
        };
        let json = serde_json::to_string(&large).unwrap();
        assert_eq!(json, r#"{"amount":"1000000000000000000000000000"}"#);
        assert_eq!(serde_json::from_str::<Budget>(&json).unwrap(), large);

        let small: Budget = serde_json::from_str(r#"{"amount":250}"#).unwrap();
        assert_eq!(small.amount, 250);
        let spaced: Budget = serde_json::from_str(r#"{"amount":"1_000_000"}"#).unwrap();
        assert_eq!(spaced.amount, 1_000_000);
        assert!(serde_json::from_str::<Budget>(r#"{"amount":"ten"}"#).is_err());
    }
}
