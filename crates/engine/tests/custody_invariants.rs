//! Custody accounting under arbitrary stake and unstake sequences.

use lucid_engine::{Engine, EngineConfig};
use lucid_types::{account_id, days, AccountId, AuthContext, InMemoryLedger, TokenLedger};
use proptest::prelude::*;

const ACCOUNTS: [&str; 3] = ["alice", "bob", "carol"];

fn setup() -> (Engine, Vec<AccountId>) {
    let mut engine = Engine::new(EngineConfig::default(), InMemoryLedger::new()).unwrap();
    let asset = engine.staking_asset();
    let custody = engine.staking().custody_account();
    let accounts: Vec<AccountId> = ACCOUNTS.iter().map(|label| account_id(label)).collect();
    let funder = account_id("funder");

    for account in accounts.iter().chain(std::iter::once(&funder)) {
        engine.ledger_mut().mint(&asset, account, 1_000_000).unwrap();
        engine
            .ledger_mut()
            .approve(&asset, account, &custody, 1_000_000)
            .unwrap();
    }
    engine
        .fund_staking_rewards(&AuthContext::user(funder), 500_000, 0)
        .unwrap();
    (engine, accounts)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn custody_holds_principal_plus_reserve(
        ops in prop::collection::vec((0usize..3, 100u128..20_000, 1u64..40, any::<bool>()), 1..24)
    ) {
        let (mut engine, accounts) = setup();
        let asset = engine.staking_asset();
        let custody = engine.staking().custody_account();
        let mut now = 1;

        for (who, amount, lock_days, close) in ops {
            let owner = accounts[who];
            let auth = AuthContext::user(owner);
            let matured = engine
                .staking()
                .stakes_of(&owner)
                .into_iter()
                .find(|stake| stake.active && stake.end_height <= now)
                .map(|stake| stake.id);

            match (close, matured) {
                (true, Some(id)) => {
                    let _ = engine.unstake(&auth, id, now);
                }
                _ => {
                    let _ = engine.stake(&auth, amount, days(lock_days), now);
                }
            }

            let pool = engine.staking().pool(&asset).unwrap().clone();
            let by_owner: u128 = accounts
                .iter()
                .map(|account| engine.staking().total_staked_by(account))
                .sum();
            prop_assert_eq!(by_owner, pool.total_staked);
            prop_assert_eq!(
                engine.ledger().balance_of(&asset, &custody),
                pool.total_staked + pool.reward_reserve
            );

            now += days(3);
        }
    }
}
