//! Emergency pause and the escape hatch around it.

use lucid_engine::{Engine, EngineConfig};
use lucid_governance::{Priority, ProposalCall, ProposalCategory, ProposalState, VoteSupport};
use lucid_treasury::Shares;
use lucid_types::{
    account_id, days, hours, AuthContext, Classify, ErrorKind, InMemoryLedger, Role, TokenLedger,
};

fn engine_with_stake() -> (Engine, u64) {
    let mut engine = Engine::new(EngineConfig::default(), InMemoryLedger::new()).unwrap();
    let asset = engine.staking_asset();
    let alice = account_id("alice");
    let custody = engine.staking().custody_account();
    engine.ledger_mut().mint(&asset, &alice, 20_000).unwrap();
    engine
        .ledger_mut()
        .approve(&asset, &alice, &custody, 10_000)
        .unwrap();
    let id = engine
        .stake(&AuthContext::user(alice), 10_000, days(60), 1)
        .unwrap();
    (engine, id)
}

fn guardian() -> AuthContext {
    AuthContext::with_roles(account_id("guardian"), &[Role::Emergency])
}

#[test]
fn pause_stops_deposits_and_governance_but_not_withdrawal() {
    let (mut engine, stake_id) = engine_with_stake();
    let alice = AuthContext::user(account_id("alice"));

    let err = engine.emergency_pause(&alice, 5).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    engine.emergency_pause(&guardian(), 5).unwrap();
    assert!(engine.staking().is_paused());
    assert!(engine.governance().is_paused());

    let err = engine.stake(&alice, 500, days(2), 6).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
    let call = ProposalCall::json("treasury", "updateShares", &Shares::default()).unwrap();
    let err = engine
        .propose(&alice, vec![call], "during pause", ProposalCategory::General, Priority::Low, 6)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);

    // principal comes back, rewards are forfeited
    let asset = engine.staking_asset();
    let returned = engine.emergency_withdraw(&alice, stake_id, 7).unwrap();
    assert_eq!(returned, 10_000);
    assert_eq!(engine.ledger().balance_of(&asset, &account_id("alice")), 20_000);

    engine.emergency_unpause(&guardian(), 8).unwrap();
    assert!(!engine.staking().is_paused());
    assert!(!engine.governance().is_paused());
}

#[test]
fn emergency_proposal_uses_short_windows() {
    let (mut engine, _) = engine_with_stake();
    let alice = AuthContext::user(account_id("alice"));
    let call = ProposalCall::json(
        "treasury",
        "updateShares",
        &Shares {
            owner_bps: 500,
            treasury_bps: 2_500,
            reward_bps: 7_000,
        },
    )
    .unwrap();
    let id = engine
        .propose_emergency(&guardian(), vec![call], "cut owner share", 100)
        .unwrap();

    assert_eq!(engine.proposal_state(id, 100).unwrap(), ProposalState::Active);
    engine.cast_vote(&alice, id, VoteSupport::For, 100).unwrap();
    let eta = engine.queue(id, 100 + hours(1) + 1).unwrap();
    assert_eq!(eta, 100 + hours(2) + 1);
    engine.execute(id, eta).unwrap();
    assert_eq!(engine.treasury().shares().owner_bps, 500);
}
