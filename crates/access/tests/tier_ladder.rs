use lucid_access::{AccessParams, AccessTiers, TierConfig};
use lucid_staking::{StakingParams, StakingPool};
use lucid_types::{
    account_id, asset_id, days, Amount, AuthContext, InMemoryLedger, Role, TokenLedger,
};
use proptest::prelude::*;

fn tier_config(name: &str, balance: Amount, staked: Amount) -> TierConfig {
    TierConfig {
        name: name.to_string(),
        required_balance: balance,
        required_staked: staked,
        max_actions_per_day: 100,
        storage_quota: 1 << 20,
        priority_multiplier: 10_000,
        special_permissions: 0,
    }
}

fn basic_silver_gold() -> AccessTiers {
    let params = AccessParams {
        base_tier: tier_config("Basic", 0, 0),
        tiers: vec![tier_config("Silver", 1_000, 0), tier_config("Gold", 5_000, 2_000)],
        ..Default::default()
    };
    AccessTiers::new(asset_id("LUCID"), params).unwrap()
}

#[test]
fn gold_requires_stake_from_the_main_pool() {
    let asset = asset_id("LUCID");
    let owner = AuthContext::with_roles(account_id("owner"), &[Role::Owner]);
    let alice = AuthContext::user(account_id("alice"));

    let mut staking = StakingPool::new(StakingParams::default()).unwrap();
    staking
        .create_pool(&owner, asset, 0, days(1), days(730), 0)
        .unwrap();
    let mut ledger = InMemoryLedger::new();
    ledger.mint(&asset, &alice.caller, 6_000 + 2_500).unwrap();
    ledger
        .approve(&asset, &alice.caller, &staking.custody_account(), Amount::MAX)
        .unwrap();

    let first = staking
        .stake(&alice, &mut ledger, asset, 1_000, days(1), 0)
        .unwrap();
    staking
        .stake(&alice, &mut ledger, asset, 1_500, days(1), 0)
        .unwrap();
    assert_eq!(ledger.balance_of(&asset, &alice.caller), 6_000);

    let tiers = basic_silver_gold();
    let gold = tiers.get_user_tier(&alice.caller, &ledger, &staking);
    assert_eq!(tiers.tier(gold).unwrap().name, "Gold");

    // stake drops to 1000: Gold's stake requirement is no longer met
    staking
        .unstake(&alice, &mut ledger, first + 1, days(1))
        .unwrap();
    ledger.burn(&asset, &alice.caller, 1_500).unwrap();
    assert_eq!(staking.total_staked_by(&alice.caller), 1_000);
    let silver = tiers.get_user_tier(&alice.caller, &ledger, &staking);
    assert_eq!(tiers.tier(silver).unwrap().name, "Silver");
}

#[test]
fn example_positions_resolve_expected_tiers() {
    let tiers = basic_silver_gold();
    assert_eq!(tiers.tier(tiers.tier_for(6_000 + 2_500, 2_500)).unwrap().name, "Gold");
    assert_eq!(tiers.tier(tiers.tier_for(6_000 + 1_000, 1_000)).unwrap().name, "Silver");
    assert_eq!(tiers.tier(tiers.tier_for(999, 0)).unwrap().name, "Basic");
}

proptest! {
    #[test]
    fn prop_more_balance_or_stake_never_lowers_tier(
        balance in 0u128..20_000,
        staked in 0u128..20_000,
        extra_balance in 0u128..20_000,
        extra_staked in 0u128..20_000,
    ) {
        let tiers = basic_silver_gold();
        let requirement = |total, staked| {
            tiers.tier(tiers.tier_for(total, staked)).unwrap().required_balance
        };

        let base = requirement(balance + staked, staked);
        let richer = requirement(balance + extra_balance + staked, staked);
        let more_staked = requirement(balance + staked + extra_staked, staked + extra_staked);

        prop_assert!(richer >= base);
        prop_assert!(more_staked >= base);
    }
}
