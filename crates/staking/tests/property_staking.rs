use lucid_staking::{StakingParams, StakingPool};
use lucid_types::{
    account_id, asset_id, days, Amount, AuthContext, InMemoryLedger, Role, TokenLedger,
    BASE_MULTIPLIER, MAX_MULTIPLIER,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Stake { who: usize, amount: Amount, days: u64 },
    Unstake { who: usize, nth: usize },
    Compound { who: usize, nth: usize },
    Claim { who: usize, nth: usize },
    Emergency { who: usize, nth: usize },
    Advance(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..3, 100u128..100_000, 1u64..730)
            .prop_map(|(who, amount, days)| Op::Stake { who, amount, days }),
        (0usize..3, 0usize..4).prop_map(|(who, nth)| Op::Unstake { who, nth }),
        (0usize..3, 0usize..4).prop_map(|(who, nth)| Op::Compound { who, nth }),
        (0usize..3, 0usize..4).prop_map(|(who, nth)| Op::Claim { who, nth }),
        (0usize..3, 0usize..4).prop_map(|(who, nth)| Op::Emergency { who, nth }),
        (1u64..20_000).prop_map(Op::Advance),
    ]
}

fn setup() -> (StakingPool, InMemoryLedger, Vec<AuthContext>) {
    let asset = asset_id("LUCID");
    let owner = AuthContext::with_roles(account_id("owner"), &[Role::Owner]);
    let mut pool = StakingPool::new(StakingParams::default()).unwrap();
    let mut ledger = InMemoryLedger::new();
    let users: Vec<AuthContext> = ["alice", "bob", "carol"]
        .iter()
        .map(|name| AuthContext::user(account_id(name)))
        .collect();
    for who in users.iter().chain(std::iter::once(&owner)) {
        ledger.mint(&asset, &who.caller, 1_000_000_000_000).unwrap();
        ledger
            .approve(&asset, &who.caller, &pool.custody_account(), Amount::MAX)
            .unwrap();
    }
    pool.create_pool(&owner, asset, 1_000, days(1), days(730), 0)
        .unwrap();
    pool.fund_rewards(&owner, &mut ledger, asset, 900_000_000_000, 0)
        .unwrap();
    (pool, ledger, users)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_total_staked_matches_active_principals(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let asset = asset_id("LUCID");
        let (mut pool, mut ledger, users) = setup();
        let mut now = 1u64;

        for op in ops {
            match op {
                Op::Stake { who, amount, days: d } => {
                    let _ = pool.stake(&users[who], &mut ledger, asset, amount, days(d), now);
                }
                Op::Unstake { who, nth } => {
                    let id = pool.stakes_of(&users[who].caller).get(nth).map(|s| s.id);
                    if let Some(id) = id {
                        let _ = pool.unstake(&users[who], &mut ledger, id, now);
                    }
                }
                Op::Compound { who, nth } => {
                    let id = pool.stakes_of(&users[who].caller).get(nth).map(|s| s.id);
                    if let Some(id) = id {
                        let _ = pool.compound_rewards(&users[who], id, now);
                    }
                }
                Op::Claim { who, nth } => {
                    let id = pool.stakes_of(&users[who].caller).get(nth).map(|s| s.id);
                    if let Some(id) = id {
                        let _ = pool.claim_rewards(&users[who], &mut ledger, id, now);
                    }
                }
                Op::Emergency { who, nth } => {
                    let id = pool.stakes_of(&users[who].caller).get(nth).map(|s| s.id);
                    if let Some(id) = id {
                        let _ = pool.emergency_withdraw(&users[who], &mut ledger, id, now);
                    }
                }
                Op::Advance(heights) => now += heights,
            }

            let active_sum: Amount = users
                .iter()
                .flat_map(|user| pool.stakes_of(&user.caller))
                .filter(|stake| stake.active)
                .map(|stake| stake.principal)
                .sum();
            let state = pool.pool(&asset).unwrap();
            prop_assert_eq!(active_sum, state.total_staked);

            // custody always covers principal plus the reward reserve
            let custody = ledger.balance_of(&asset, &pool.custody_account());
            prop_assert_eq!(custody, state.total_staked + state.reward_reserve);

            for user in &users {
                for stake in pool.stakes_of(&user.caller) {
                    prop_assert!(stake.multiplier >= BASE_MULTIPLIER);
                    prop_assert!(stake.multiplier <= MAX_MULTIPLIER);
                    prop_assert!(stake.end_height >= stake.start_height);
                }
            }
        }
    }

    #[test]
    fn prop_pending_rewards_non_decreasing(
        amount in 100u128..1_000_000,
        other in 100u128..1_000_000,
        steps in proptest::collection::vec(1u64..5_000, 1..20),
    ) {
        let asset = asset_id("LUCID");
        let (mut pool, mut ledger, users) = setup();
        let id = pool.stake(&users[0], &mut ledger, asset, amount, days(100), 0).unwrap();
        pool.stake(&users[1], &mut ledger, asset, other, days(10), 0).unwrap();

        let mut now = 0u64;
        let mut last = 0u128;
        for step in steps {
            now += step;
            let pending = pool.pending_rewards(id, now).unwrap();
            prop_assert!(pending >= last);
            last = pending;
        }
    }

    #[test]
    fn prop_multiplier_in_bounds_for_valid_durations(d in 1u64..=730) {
        let asset = asset_id("LUCID");
        let (mut pool, mut ledger, users) = setup();
        let id = pool.stake(&users[0], &mut ledger, asset, 1_000, days(d), 0).unwrap();
        let multiplier = pool.stake_info(id).unwrap().multiplier;
        prop_assert!((BASE_MULTIPLIER..=MAX_MULTIPLIER).contains(&multiplier));
    }
}
