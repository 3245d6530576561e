//! Adversarial inputs against the pipeline and the claim protocol.
//!
//! Attack vectors tested:
//! - Replaying a claim, or an old root, after rotation
//! - Redirecting a payout to another beneficiary
//! - Borrowing another participant's proof
//! - Presenting an internal node as a leaf
//! - Malformed or foreign event histories
//! - Funding exhaustion mid-batch

use drip_accrual::AccrualCalculator;
use drip_claims::{ClaimRequest, SharedDistributor};
use drip_core::error::{ClaimError, DataIntegrityError};
use drip_core::merkle::{leaf_hash, node_hash, MerkleTree};
use drip_core::traits::TokenPool;
use drip_core::types::*;
use drip_distributor::{run, Distribution, MemoryEventSource, RunConfig};
use drip_tests::helpers::*;

fn four_way() -> Distribution {
    Distribution::build(&ledger_of(&[(1, 100), (2, 200), (3, 300), (4, 400)])).unwrap()
}

#[test]
fn replayed_claim_pays_nothing() {
    let dist = four_way();
    let mut d = distributor_with(&dist, 10_000);
    assert_eq!(claim_published(&mut d, &dist, &pid(3)), Ok(300));
    for _ in 0..5 {
        assert_eq!(
            claim_published(&mut d, &dist, &pid(3)),
            Err(ClaimError::NothingToClaim)
        );
    }
    assert_eq!(d.pool().balance_of(&addr(3)), 300);
}

#[test]
fn republishing_same_totals_pays_nothing() {
    let dist = four_way();
    let mut d = distributor_with(&dist, 10_000);
    claim_published(&mut d, &dist, &pid(1)).unwrap();

    // Same ledger, fresh root object: the claimed amount persists.
    let again = four_way();
    d.set_root(&OWNER, again.merkle_root).unwrap();
    assert_eq!(
        claim_published(&mut d, &again, &pid(1)),
        Err(ClaimError::NothingToClaim)
    );
}

#[test]
fn redirected_beneficiary_is_rejected() {
    let dist = four_way();
    let mut d = distributor_with(&dist, 10_000);
    let claim = dist.claim(&pid(2)).unwrap();
    assert_eq!(
        d.claim(&pid(2), &addr(0x66), claim.amount, &dist.merkle_root, &claim.proof),
        Err(ClaimError::InvalidProof)
    );
    assert_eq!(d.pool().balance_of(&addr(0x66)), 0);
}

#[test]
fn borrowed_proof_is_rejected() {
    let dist = four_way();
    let mut d = distributor_with(&dist, 10_000);
    let other = dist.claim(&pid(4)).unwrap();
    assert_eq!(
        d.claim(&pid(1), &addr(1), 400, &dist.merkle_root, &other.proof),
        Err(ClaimError::InvalidProof)
    );
}

#[test]
fn internal_node_is_not_a_leaf() {
    // With leaves [a, b, c, d], node(a, b) with proof [node(c, d)] reaches
    // the root; no claim tuple can hash to that node because leaf and node
    // hashes use different prefixes.
    let leaves: Vec<Hash256> = (1..=4u8).map(|s| leaf_hash(&pid(s), &addr(s), 1)).collect();
    let tree = MerkleTree::from_leaf_hashes(&leaves);
    let sorted = tree.leaves();
    let left = node_hash(&sorted[0], &sorted[1]);
    let right = node_hash(&sorted[2], &sorted[3]);
    assert_eq!(node_hash(&left, &right), tree.root());

    // Reinterpreting the node's 32 bytes as the head of a leaf preimage.
    let mut participant = ParticipantId::ZERO;
    participant.0.copy_from_slice(&left.0[..20]);
    let mut beneficiary = Address::ZERO;
    beneficiary.0[..12].copy_from_slice(&left.0[20..]);
    assert!(!Distribution::verify(&tree.root(), &participant, &beneficiary, 0, &[right]));
}

#[test]
fn stale_root_claim_after_rotation() {
    let first = four_way();
    let second =
        Distribution::build(&ledger_of(&[(1, 150), (2, 200), (3, 300), (4, 400)])).unwrap();
    let mut d = distributor_with(&first, 10_000);
    d.set_root(&OWNER, second.merkle_root).unwrap();
    assert_eq!(
        claim_published(&mut d, &first, &pid(1)),
        Err(ClaimError::StaleRoot)
    );
    assert_eq!(claim_published(&mut d, &second, &pid(1)), Ok(150));
}

#[test]
fn outsider_cannot_rotate_root() {
    let dist = four_way();
    let mut d = distributor_with(&dist, 10_000);
    assert_eq!(
        d.set_root(&addr(1), Hash256([0xAB; 32])),
        Err(ClaimError::Unauthorized)
    );
    assert_eq!(d.current_root(), Some(dist.merkle_root));
}

#[test]
fn funding_exhaustion_mid_batch() {
    let dist = four_way();
    let mut d = distributor_with(&dist, 450);
    let requests: Vec<ClaimRequest> = (1..=4u8).filter_map(|s| request(&dist, &pid(s))).collect();
    let results = d.batch_claim(&dist.merkle_root, &requests);
    assert_eq!(results[0], Ok(100));
    assert_eq!(results[1], Ok(200));
    assert_eq!(
        results[2],
        Err(ClaimError::InsufficientFunding {
            requested: 300,
            available: 150
        })
    );
    // 400 exceeds what is left as well.
    assert!(results[3].is_err());
    assert_eq!(d.cumulative_claimed(&pid(3)), 0);
    assert_eq!(d.pool().available(), 150);
}

#[test]
fn shared_handle_serializes_double_spend_race() {
    let dist = four_way();
    let shared = SharedDistributor::new(distributor_with(&dist, 10_000));
    let handles: Vec<_> = (0..6)
        .map(|_| {
            let s = shared.clone();
            let r = request(&dist, &pid(4)).unwrap();
            let root = dist.merkle_root;
            std::thread::spawn(move || {
                s.claim(&r.participant, &r.beneficiary, r.cumulative_amount, &root, &r.proof)
            })
        })
        .collect();
    let paid: u128 = handles
        .into_iter()
        .filter_map(|h| h.join().unwrap().ok())
        .sum();
    assert_eq!(paid, 400);
}

#[test]
fn shuffled_history_is_rejected_not_sorted() {
    let events = vec![stake(1, 0, 100, T0 + 20), stake(1, 100, 200, T0 + 10)];
    let err = AccrualCalculator::new(Basis::Timestamp)
        .accrue(&pid(1), &events, Interval::new(T0, T0 + 100), None)
        .unwrap_err();
    assert_eq!(err, DataIntegrityError::OutOfOrder { index: 1 });
}

#[test]
fn foreign_event_is_rejected() {
    let events = vec![stake(1, 0, 100, T0), stake(2, 100, 200, T0 + 10)];
    let err = AccrualCalculator::new(Basis::Timestamp)
        .accrue(&pid(1), &events, Interval::new(T0, T0 + 100), None)
        .unwrap_err();
    assert_eq!(
        err,
        DataIntegrityError::ForeignEvent {
            index: 1,
            found: pid(2)
        }
    );
}

#[test]
fn gapped_history_flags_only_that_participant() {
    // Participant 1's second event does not continue from the first.
    let source = MemoryEventSource::new(vec![
        stake(1, 0, 100, T0),
        stake(1, 150, 200, T0 + 10),
        stake(2, 0, 10_000, T0),
    ]);
    let config = RunConfig {
        programs: vec![yearly_program("staking", TrackedQuantity::Stake, T0, 100_000)],
        ..RunConfig::default()
    };
    let report = run(&config, &CumulativeLedger::new(), &source, &oracle_for(&[1, 2])).unwrap();
    assert_eq!(report.flagged.len(), 1);
    assert_eq!(report.flagged[0].participant, pid(1));
    assert!(report.ledger.get(&pid(1)).is_none());
    assert_eq!(report.ledger.amount_of(&pid(2)), 1000);
}

#[test]
fn gapped_history_forfeits_every_program() {
    // Stake history breaks; the authorization history alone would pay 1000.
    let source = MemoryEventSource::new(vec![
        stake(1, 0, 100, T0),
        stake(1, 150, 200, T0 + 10),
        authorization(1, 0, 10_000, T0),
        stake(2, 0, 10_000, T0),
    ]);
    let config = RunConfig {
        programs: vec![
            yearly_program("stake", TrackedQuantity::Stake, T0, 100_000),
            yearly_program("auth", TrackedQuantity::Authorization, T0, 100_000),
        ],
        ..RunConfig::default()
    };
    let prior = ledger_of(&[(1, 500)]);
    let report = run(&config, &prior, &source, &oracle_for(&[1, 2])).unwrap();

    assert_eq!(report.flagged.len(), 1);
    assert_eq!(report.flagged[0].program, "stake");
    assert_eq!(report.ledger.amount_of(&pid(1)), 500);
    assert_eq!(report.distribution.claims[&pid(1)].amount, 500);
    assert_eq!(report.ledger.amount_of(&pid(2)), 1000);
}

#[test]
fn huge_amounts_do_not_overflow_leaves() {
    let dist = Distribution::build(&ledger_of(&[(1, u128::MAX / 2), (2, u128::MAX / 2)])).unwrap();
    assert!(dist.verify_claim(&pid(1)));
    let overflow = Distribution::build(&ledger_of(&[(1, u128::MAX), (2, 1)]));
    assert!(overflow.is_err());
}
