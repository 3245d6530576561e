//! Shared test helpers for E2E and integration tests.

use drip_accrual::{ProgramKind, RewardProgram};
use drip_claims::{AllowancePool, ClaimRequest, CumulativeDistributor};
use drip_core::types::*;
use drip_distributor::{Distribution, MemoryOracle};

/// One reward year in seconds.
pub const YEAR: u64 = 31_536_000;

/// Start of the first accounting period used across the suite.
pub const T0: u64 = 1_700_000_000;

/// Owner of every test distributor.
pub const OWNER: Address = Address([0xEE; 20]);

pub fn pid(seed: u8) -> ParticipantId {
    ParticipantId([seed; 20])
}

/// Beneficiary paired with `pid(seed)` unless a test overrides it.
pub fn addr(seed: u8) -> Address {
    Address([seed; 20])
}

/// Stake change with identical block and time positions.
pub fn stake(seed: u8, from: u128, to: u128, t: u64) -> ChangeEvent {
    ChangeEvent {
        participant: pid(seed),
        from_amount: from,
        to_amount: to,
        block_number: t,
        timestamp: t,
        kind: if to >= from {
            EventKind::StakeIncreased
        } else {
            EventKind::StakeDecreased
        },
    }
}

/// Authorization change with identical block and time positions.
pub fn authorization(seed: u8, from: u128, to: u128, t: u64) -> ChangeEvent {
    ChangeEvent {
        kind: if to >= from {
            EventKind::AuthorizationIncreased
        } else {
            EventKind::AuthorizationDecreased
        },
        ..stake(seed, from, to, t)
    }
}

/// Weighted timestamp-basis program over `[start, start + YEAR)`.
pub fn yearly_program(
    id: &str,
    tracks: TrackedQuantity,
    start: u64,
    rate_ppm: u64,
) -> RewardProgram {
    RewardProgram {
        id: id.to_string(),
        kind: ProgramKind::Weighted,
        tracks,
        basis: Basis::Timestamp,
        interval: Interval::new(start, start + YEAR),
        period_secs: None,
        rate_ppm,
        cap: None,
        predicates: vec![],
    }
}

/// Oracle mapping each seed's participant to `addr(seed)`.
pub fn oracle_for(seeds: &[u8]) -> MemoryOracle {
    let mut oracle = MemoryOracle::new();
    for &s in seeds {
        oracle.set_beneficiary(pid(s), addr(s));
    }
    oracle
}

/// Claim tuple for `participant` exactly as published.
pub fn request(distribution: &Distribution, participant: &ParticipantId) -> Option<ClaimRequest> {
    distribution.claim(participant).map(|c| ClaimRequest {
        participant: *participant,
        beneficiary: c.beneficiary,
        cumulative_amount: c.amount,
        proof: c.proof.clone(),
    })
}

/// Distributor funded with `allowance`, with `distribution`'s root set.
pub fn distributor_with(
    distribution: &Distribution,
    allowance: u128,
) -> CumulativeDistributor<AllowancePool> {
    let mut d = CumulativeDistributor::new(OWNER, AllowancePool::new(allowance));
    d.set_root(&OWNER, distribution.merkle_root)
        .expect("owner sets root");
    d
}

/// Submit the published claim for `participant` against `d`'s current root.
pub fn claim_published(
    d: &mut CumulativeDistributor<AllowancePool>,
    distribution: &Distribution,
    participant: &ParticipantId,
) -> Result<u128, drip_core::error::ClaimError> {
    let r = request(distribution, participant).ok_or(drip_core::error::ClaimError::InvalidProof)?;
    d.claim(
        &r.participant,
        &r.beneficiary,
        r.cumulative_amount,
        &distribution.merkle_root,
        &r.proof,
    )
}

/// Ledger from `(seed, amount)` rows with `addr(seed)` beneficiaries.
pub fn ledger_of(rows: &[(u8, u128)]) -> CumulativeLedger {
    rows.iter()
        .map(|&(s, amount)| {
            (
                pid(s),
                LedgerEntry {
                    beneficiary: addr(s),
                    cumulative_amount: amount,
                },
            )
        })
        .collect()
}
