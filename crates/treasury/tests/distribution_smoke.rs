use lucid_economics::{EconomicEngine, NetworkMetrics};
use lucid_treasury::{RewardDistributor, Shares, TreasuryParams};
use lucid_types::{
    account_id, asset_id, AccountId, AuthContext, InMemoryLedger, Role, TokenLedger,
};
use proptest::prelude::*;
use std::collections::HashMap;

fn owner() -> AuthContext {
    AuthContext::with_roles(account_id("owner"), &[Role::Owner])
}

fn oracle() -> AuthContext {
    AuthContext::with_roles(account_id("oracle"), &[Role::Oracle])
}

#[test]
fn staked_participant_earns_more_per_point_of_performance() {
    let asset = asset_id("LUCID");
    let economics = EconomicEngine::new();
    let mut distributor = RewardDistributor::new(
        TreasuryParams::default(),
        account_id("owner"),
        account_id("treasury"),
    )
    .unwrap();

    let staker = account_id("staker");
    let idle = account_id("idle");
    let mut stakes: HashMap<AccountId, u128> = HashMap::new();
    // 50 bonus units: +50%, the default cap
    stakes.insert(staker, 50 * economics.params().stake_bonus_unit);

    for account in [staker, idle] {
        distributor
            .register_participant(&owner(), account, 0)
            .unwrap();
        distributor
            .update_performance(&oracle(), account, [800, 800, 800], 8, 10, &economics, &stakes, 1)
            .unwrap();
    }
    assert_eq!(distributor.participant(&staker).unwrap().multiplier, 19_500);
    assert_eq!(distributor.participant(&idle).unwrap().multiplier, 13_000);

    let mut ledger = InMemoryLedger::new();
    ledger
        .mint(&asset, &distributor.custody_account(), 5_000_000)
        .unwrap();
    let result = distributor
        .distribute(&mut ledger, &economics, asset, 2)
        .unwrap();

    assert!(ledger.balance_of(&asset, &staker) > ledger.balance_of(&asset, &idle));
    assert_eq!(result.accounted(), 5_000_000);
    assert_eq!(distributor.last_distribution(), Some(&result));
}

#[test]
fn repeated_distributions_accumulate_totals() {
    let asset = asset_id("LUCID");
    let mut economics = EconomicEngine::new();
    economics
        .update_network_metrics(
            &oracle(),
            NetworkMetrics {
                active_participants: 1_000,
                daily_actions: 10_000,
                uptime_bps: 10_000,
                total_staked: 3_000,
                circulating_supply: 10_000,
            },
            1,
        )
        .unwrap();
    let mut distributor = RewardDistributor::new(
        TreasuryParams::default(),
        account_id("owner"),
        account_id("treasury"),
    )
    .unwrap();
    let mut ledger = InMemoryLedger::new();

    for round in 1..=3u64 {
        ledger
            .mint(&asset, &distributor.custody_account(), 100_000)
            .unwrap();
        distributor
            .distribute(&mut ledger, &economics, asset, round * 10)
            .unwrap();
    }
    assert_eq!(distributor.total_burned(), 3_000);
    assert_eq!(distributor.total_distributed(), 297_000);
    assert_eq!(ledger.total_supply(&asset), 297_000);
}

proptest! {
    #[test]
    fn prop_every_unit_is_accounted_for(
        balance in 1u128..1_000_000_000_000,
        owner_bps in 0u32..=5_000,
        treasury_bps in 0u32..=5_000,
        points in proptest::collection::vec((0u32..=1_000, 1u64..=100), 0..8),
    ) {
        let asset = asset_id("LUCID");
        let economics = EconomicEngine::new();
        let params = TreasuryParams {
            shares: Shares {
                owner_bps,
                treasury_bps,
                reward_bps: 10_000 - owner_bps - treasury_bps,
            },
            ..Default::default()
        };
        let mut distributor =
            RewardDistributor::new(params, account_id("owner"), account_id("treasury")).unwrap();
        for (index, (score, total)) in points.iter().enumerate() {
            let account = account_id(&format!("node-{index}"));
            distributor.register_participant(&owner(), account, 0).unwrap();
            distributor
                .update_performance(
                    &oracle(),
                    account,
                    [*score; 3],
                    *total / 2,
                    *total,
                    &economics,
                    &lucid_types::NoStakes,
                    1,
                )
                .unwrap();
        }

        let mut ledger = InMemoryLedger::new();
        ledger.mint(&asset, &distributor.custody_account(), balance).unwrap();
        let result = distributor.distribute(&mut ledger, &economics, asset, 2).unwrap();

        prop_assert_eq!(result.accounted(), balance);
        prop_assert_eq!(ledger.balance_of(&asset, &distributor.custody_account()), 0);
        prop_assert_eq!(ledger.total_supply(&asset), balance - result.burn_amount);
        let paid: u128 = result.payouts.iter().map(|payout| payout.amount).sum();
        prop_assert_eq!(paid, result.reward_amount);
    }
}
