//! Propriétés du runtime : atomicité des appels et conservation du ledger

mod integration;

use chrono::Duration;
use climatedao_core::crypto::Address;
use climatedao_core::governance::{treasury_address, VoteChoice};
use climatedao_core::serialization::{Serializable, SerializationFormat};
use climatedao_core::token::{faucet_reserve_address, rewards_pool_address};
use climatedao_core::{BlockContext, Call, ClimateDaoConfig, DaoRuntime};
use integration::{genesis, sample_draft};
use proptest::prelude::*;

const ACTORS: [&str; 4] = ["alice", "bob", "carol", "dave"];

fn actor(index: usize) -> Address {
    Address::system(ACTORS[index % ACTORS.len()])
}

fn owner() -> Address {
    Address::system("owner")
}

fn beneficiary() -> Address {
    Address::system("beneficiary")
}

#[derive(Debug, Clone)]
enum Op {
    Claim(usize),
    Transfer(usize, usize, u64),
    Donate(usize, u64),
    Stake(usize, u64),
    Unstake(usize, u64),
    ClaimRewards(usize),
    Propose(usize, u64),
    Vote(usize, u8),
    OwnerVote,
    Execute(usize),
    Wait(u32),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..4usize).prop_map(Op::Claim),
        (0..4usize, 0..4usize, 0..2_000u64).prop_map(|(a, b, n)| Op::Transfer(a, b, n)),
        (0..4usize, 0..1_500u64).prop_map(|(a, n)| Op::Donate(a, n)),
        (0..4usize, 0..1_500u64).prop_map(|(a, n)| Op::Stake(a, n)),
        (0..4usize, 0..1_500u64).prop_map(|(a, n)| Op::Unstake(a, n)),
        (0..4usize).prop_map(Op::ClaimRewards),
        (0..4usize, 0..5_000u64).prop_map(|(a, n)| Op::Propose(a, n)),
        (0..4usize, 0..4u8).prop_map(|(a, c)| Op::Vote(a, c)),
        Just(Op::OwnerVote),
        (0..4usize).prop_map(Op::Execute),
        (1..30u32).prop_map(Op::Wait),
    ]
}

fn latest_proposal(runtime: &DaoRuntime) -> u64 {
    runtime.dao().proposal_count().max(1) as u64
}

fn to_call(runtime: &DaoRuntime, op: &Op) -> Option<(Address, Call)> {
    let call = match *op {
        Op::Claim(a) => (actor(a), Call::ClaimTokens),
        Op::Transfer(a, b, amount) => (actor(a), Call::Transfer { to: actor(b), amount }),
        Op::Donate(a, amount) => (actor(a), Call::Donate { amount }),
        Op::Stake(a, amount) => (actor(a), Call::Stake { amount }),
        Op::Unstake(a, amount) => (actor(a), Call::Unstake { amount }),
        Op::ClaimRewards(a) => (actor(a), Call::ClaimRewards),
        Op::Propose(a, amount) => (actor(a), Call::CreateProposal(sample_draft(amount, beneficiary()))),
        Op::Vote(a, choice) => (
            actor(a),
            Call::CastVote {
                proposal_id: latest_proposal(runtime),
                choice,
            },
        ),
        Op::OwnerVote => (
            owner(),
            Call::CastVote {
                proposal_id: latest_proposal(runtime),
                choice: VoteChoice::For.into(),
            },
        ),
        Op::Execute(a) => (
            actor(a),
            Call::ExecuteProposal {
                proposal_id: latest_proposal(runtime),
            },
        ),
        Op::Wait(_) => return None,
    };
    Some(call)
}

/// Somme des soldes de toutes les adresses pouvant détenir des tokens
fn accounted(runtime: &DaoRuntime) -> u128 {
    let token = runtime.token();
    let mut holders = vec![
        owner(),
        beneficiary(),
        treasury_address(),
        faucet_reserve_address(),
        rewards_pool_address(),
    ];
    holders.extend((0..ACTORS.len()).map(actor));

    let liquid: u128 = holders.iter().map(|a| u128::from(token.balance_of(a))).sum();
    liquid + u128::from(token.total_staked())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_ledger_conserved_and_reverts_atomic(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut runtime = DaoRuntime::new(&ClimateDaoConfig::default(), owner(), genesis()).unwrap();
        let supply = u128::from(runtime.token().total_supply());
        let mut now = genesis();
        let mut height = 0u64;

        for op in &ops {
            if let Op::Wait(days) = op {
                now = now + Duration::days(i64::from(*days));
                continue;
            }
            let Some((sender, call)) = to_call(&runtime, op) else { continue };

            height += 1;
            let before = runtime.snapshot();
            let receipt = runtime.execute(sender, &call, &BlockContext::new(height, now));

            if !receipt.is_success() {
                prop_assert_eq!(&runtime.snapshot(), &before);
            }
            prop_assert!(runtime.token().validate_integrity().is_ok());
            prop_assert_eq!(accounted(&runtime), supply);
        }
    }

    #[test]
    fn prop_tally_outcome_deterministic(
        weights in prop::collection::vec((1..5_000u64, 0..3u8), 1..12),
    ) {
        let mut runtime = DaoRuntime::new(&ClimateDaoConfig::default(), owner(), genesis()).unwrap();
        let mut height = 0u64;
        let mut block = |now| {
            height += 1;
            BlockContext::new(height, now)
        };

        runtime.execute(owner(), &Call::Donate { amount: 10_000 }, &block(genesis()));
        runtime.execute(owner(), &Call::CreateProposal(sample_draft(1_000, beneficiary())), &block(genesis()));

        let (mut votes_for, mut votes_against, mut participation) = (0u64, 0u64, 0u64);
        for (index, (weight, choice)) in weights.iter().enumerate() {
            let voter = Address::system(&format!("voter-{index}"));
            runtime.execute(owner(), &Call::Transfer { to: voter, amount: *weight }, &block(genesis()));
            let receipt = runtime.execute(voter, &Call::CastVote { proposal_id: 1, choice: *choice }, &block(genesis()));
            prop_assert!(receipt.is_success());

            participation += weight;
            match choice {
                0 => votes_against += weight,
                1 => votes_for += weight,
                _ => {}
            }
        }

        let end = genesis() + Duration::days(7);
        runtime.execute(owner(), &Call::FinalizeProposal { proposal_id: 1 }, &block(end));
        let status = runtime.dao().get_proposal(1).map(|p| p.status);

        let expected = if votes_for > votes_against && participation >= 10_000 {
            climatedao_core::ProposalStatus::Passed
        } else {
            climatedao_core::ProposalStatus::Rejected
        };
        prop_assert_eq!(status, Some(expected));
    }
}

#[test]
fn test_reverted_call_leaves_snapshot_bytes_identical() {
    let mut runtime = DaoRuntime::new(&ClimateDaoConfig::default(), owner(), genesis()).unwrap();
    let block = BlockContext::new(1, genesis());
    runtime.execute(owner(), &Call::Donate { amount: 1_000 }, &block);

    let before = runtime.snapshot().to_bytes(SerializationFormat::Bincode).unwrap();
    let receipt = runtime.execute(
        actor(0),
        &Call::ExecuteProposal { proposal_id: 42 },
        &BlockContext::new(2, genesis()),
    );
    assert!(!receipt.is_success());

    let after = runtime.snapshot().to_bytes(SerializationFormat::Bincode).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_staking_rewards_linear_in_time() {
    let mut runtime = DaoRuntime::new(&ClimateDaoConfig::default(), owner(), genesis()).unwrap();
    let alice = actor(0);
    runtime.execute(owner(), &Call::Transfer { to: alice, amount: 100_000 }, &BlockContext::new(1, genesis()));
    runtime.execute(alice, &Call::Stake { amount: 100_000 }, &BlockContext::new(2, genesis()));

    let half_year = genesis() + Duration::seconds(365 * 24 * 3600 / 2);
    let full_year = genesis() + Duration::seconds(365 * 24 * 3600);
    assert_eq!(runtime.token().pending_rewards(&alice, half_year), 5_000);
    assert_eq!(runtime.token().pending_rewards(&alice, full_year), 10_000);
    assert_eq!(runtime.token().voting_power(&alice), 100_000);

    let receipt = runtime.execute(alice, &Call::ClaimRewards, &BlockContext::new(3, full_year));
    assert_eq!(receipt.outcome, Some(climatedao_core::CallOutcome::RewardsClaimed(10_000)));
    assert_eq!(runtime.token().balance_of(&alice), 10_000);
    assert_eq!(runtime.token().staked_of(&alice), 100_000);
}
