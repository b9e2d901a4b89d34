use lucid_governance::{
    Governance, GovernanceParams, Priority, ProposalCall, ProposalCategory, ProposalState,
    TimelockExecutor, VoteSupport, VotingPowerSource,
};
use lucid_types::{account_id, days, AccountId, Amount, AuthContext, Height, BASE_MULTIPLIER};
use proptest::prelude::*;
use std::collections::HashMap;

/// Power book with explicit staking multipliers.
struct Book {
    tokens: HashMap<AccountId, Amount>,
    multipliers: HashMap<AccountId, u32>,
    supply: Amount,
}

impl VotingPowerSource for Book {
    fn token_voting_power(&self, account: &AccountId, _height: Height) -> Amount {
        self.tokens.get(account).copied().unwrap_or(0)
    }

    fn voting_multiplier(&self, account: &AccountId, _height: Height) -> u32 {
        self.multipliers
            .get(account)
            .copied()
            .unwrap_or(BASE_MULTIPLIER)
    }

    fn total_voting_supply(&self, _height: Height) -> Amount {
        self.supply
    }
}

/// Records applied calls. Calls named `fail` are accepted up front and
/// refused when staged.
#[derive(Default)]
struct Recorder {
    staged: Vec<(String, Height)>,
    applied: Vec<(String, Height)>,
}

impl TimelockExecutor for Recorder {
    fn validate_call(&self, call: &ProposalCall) -> anyhow::Result<()> {
        anyhow::ensure!(call.target == "treasury", "unknown target {}", call.target);
        Ok(())
    }

    fn execute_call(&mut self, call: &ProposalCall, now: Height) -> anyhow::Result<()> {
        anyhow::ensure!(call.function != "fail", "{} failed", call.selector());
        self.staged.push((call.selector(), now));
        Ok(())
    }

    fn commit(&mut self, _now: Height) -> anyhow::Result<()> {
        self.applied.append(&mut self.staged);
        Ok(())
    }

    fn rollback(&mut self) {
        self.staged.clear();
    }
}

fn spend_call() -> ProposalCall {
    ProposalCall::json("treasury", "updateShares", &[1_000u32, 2_000, 7_000]).unwrap()
}

#[test]
fn staking_multiplier_outweighs_larger_unstaked_holder() {
    let staker = account_id("staker");
    let holder = account_id("holder");
    let book = Book {
        tokens: HashMap::from([(staker, 10_000), (holder, 20_000)]),
        multipliers: HashMap::from([(staker, 25_000)]),
        supply: 100_000,
    };
    let mut governance = Governance::new(GovernanceParams::default()).unwrap();
    let id = governance
        .propose(
            &AuthContext::user(staker),
            &book,
            vec![spend_call()],
            "rebalance shares",
            ProposalCategory::Treasury,
            Priority::High,
            0,
        )
        .unwrap();

    let start = days(1);
    let weight = governance
        .cast_vote(&AuthContext::user(staker), &book, id, VoteSupport::For, start)
        .unwrap();
    assert_eq!(weight, 25_000);
    governance
        .cast_vote(&AuthContext::user(holder), &book, id, VoteSupport::Against, start)
        .unwrap();

    let closed = days(4) + 1;
    assert_eq!(governance.state(id, closed).unwrap(), ProposalState::Succeeded);
    let eta = governance.queue(id, closed).unwrap();
    let mut recorder = Recorder::default();
    governance.execute(id, &mut recorder, eta).unwrap();
    assert_eq!(
        recorder.applied,
        vec![("treasury.updateShares".to_string(), eta)]
    );
    assert_eq!(
        governance.proposal(id).unwrap().deadline,
        Some(eta + days(3))
    );
}

#[test]
fn failing_call_applies_nothing_and_can_be_retried() {
    let proposer = account_id("proposer");
    let book = Book {
        tokens: HashMap::from([(proposer, 50_000)]),
        multipliers: HashMap::new(),
        supply: 100_000,
    };
    let failing = ProposalCall::json("treasury", "fail", &()).unwrap();
    let mut governance = Governance::new(GovernanceParams::default()).unwrap();
    let id = governance
        .propose(
            &AuthContext::user(proposer),
            &book,
            vec![spend_call(), spend_call(), failing],
            "two spends and a broken call",
            ProposalCategory::Treasury,
            Priority::Low,
            0,
        )
        .unwrap();
    governance
        .cast_vote(&AuthContext::user(proposer), &book, id, VoteSupport::For, days(1))
        .unwrap();
    let eta = governance.queue(id, days(4) + 1).unwrap();

    let mut recorder = Recorder::default();
    for attempt in 0..3 {
        let err = governance.execute(id, &mut recorder, eta + attempt).unwrap_err();
        assert!(err.to_string().contains("call 2 failed"));
        assert!(recorder.applied.is_empty());
        assert!(recorder.staged.is_empty());
        assert_eq!(governance.state(id, eta + attempt).unwrap(), ProposalState::Queued);
    }
}

proptest! {
    #[test]
    fn prop_executed_only_with_majority_and_quorum(
        votes in proptest::collection::vec((1u128..50_000, 0u8..3), 1..12),
        quorum_bps in 0u32..=5_000,
    ) {
        let supply: Amount = 1_000_000;
        let mut tokens = HashMap::new();
        let proposer = account_id("proposer");
        tokens.insert(proposer, 1_000);
        for (index, (amount, _)) in votes.iter().enumerate() {
            tokens.insert(account_id(&format!("voter-{index}")), *amount);
        }
        let book = Book { tokens, multipliers: HashMap::new(), supply };

        let params = GovernanceParams { quorum_bps, ..Default::default() };
        let mut governance = Governance::new(params).unwrap();
        let id = governance
            .propose(
                &AuthContext::user(proposer),
                &book,
                vec![spend_call()],
                "fuzzed",
                ProposalCategory::Treasury,
                Priority::Low,
                0,
            )
            .unwrap();

        let start = days(1);
        let (mut for_votes, mut against_votes) = (0u128, 0u128);
        for (index, (amount, choice)) in votes.iter().enumerate() {
            let support = match choice {
                0 => { for_votes += amount; VoteSupport::For }
                1 => { against_votes += amount; VoteSupport::Against }
                _ => VoteSupport::Abstain,
            };
            let voter = AuthContext::user(account_id(&format!("voter-{index}")));
            governance.cast_vote(&voter, &book, id, support, start).unwrap();
        }

        let closed = days(4) + 1;
        let quorum = supply * quorum_bps as u128 / 10_000;
        let should_pass = for_votes > against_votes && for_votes >= quorum;

        let mut recorder = Recorder::default();
        let outcome = governance
            .queue(id, closed)
            .and_then(|eta| governance.execute(id, &mut recorder, eta).map(|_| eta));
        match outcome {
            Ok(eta) => {
                prop_assert!(should_pass);
                prop_assert_eq!(governance.state(id, eta).unwrap(), ProposalState::Executed);
                prop_assert_eq!(recorder.applied.len(), 1);
            }
            Err(_) => {
                prop_assert!(!should_pass);
                prop_assert_eq!(governance.state(id, closed).unwrap(), ProposalState::Defeated);
                prop_assert!(recorder.applied.is_empty());
            }
        }
    }
}
