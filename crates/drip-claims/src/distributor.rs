//! Cumulative claim state machine.
//!
//! Checks run in a fixed order and the first failure is returned:
//!
//! 1. root is the current root (`StaleRoot`, or `NoRoot` before any publish)
//! 2. the proof recomputes the root (`InvalidProof`)
//! 3. the cumulative amount exceeds what was claimed (`NothingToClaim`)
//! 4. the pool transfers the difference (`InsufficientFunding`)
//!
//! State changes only after the transfer succeeds.

use std::collections::BTreeMap;

use drip_core::error::{ClaimError, DripError};
use drip_core::merkle::{leaf_hash, verify_proof};
use drip_core::traits::TokenPool;
use drip_core::types::{Address, Hash256, ParticipantId};
use tracing::{debug, info};

/// Entry in the distributor's append-only event log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DistributorEvent {
    RootUpdated {
        previous: Option<Hash256>,
        root: Hash256,
    },
    Claimed {
        participant: ParticipantId,
        beneficiary: Address,
        /// Amount transferred by this claim.
        amount: u128,
        /// `cumulative_claimed` after this claim.
        cumulative: u128,
    },
}

/// One claim tuple as submitted by a caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimRequest {
    pub participant: ParticipantId,
    pub beneficiary: Address,
    pub cumulative_amount: u128,
    pub proof: Vec<Hash256>,
}

/// Persistent part of the distributor state.
#[derive(Clone, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct ClaimState {
    pub owner: Address,
    pub current_root: Option<Hash256>,
    pub claimed: BTreeMap<ParticipantId, u128>,
}

impl ClaimState {
    pub fn encode(&self) -> Result<Vec<u8>, DripError> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| DripError::Serialization(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DripError> {
        let (state, _): (Self, usize) =
            bincode::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| DripError::Serialization(e.to_string()))?;
        Ok(state)
    }
}

/// Single-writer cumulative distributor over a [`TokenPool`].
#[derive(Debug)]
pub struct CumulativeDistributor<P: TokenPool> {
    state: ClaimState,
    events: Vec<DistributorEvent>,
    pool: P,
}

impl<P: TokenPool> CumulativeDistributor<P> {
    /// A distributor with no root set.
    pub fn new(owner: Address, pool: P) -> Self {
        Self::restore(
            ClaimState {
                owner,
                ..ClaimState::default()
            },
            pool,
        )
    }

    /// Resume from a persisted state. The event log starts empty.
    pub fn restore(state: ClaimState, pool: P) -> Self {
        Self {
            state,
            events: Vec::new(),
            pool,
        }
    }

    pub fn owner(&self) -> &Address {
        &self.state.owner
    }

    pub fn current_root(&self) -> Option<Hash256> {
        self.state.current_root
    }

    pub fn cumulative_claimed(&self, participant: &ParticipantId) -> u128 {
        self.state.claimed.get(participant).copied().unwrap_or(0)
    }

    pub fn events(&self) -> &[DistributorEvent] {
        &self.events
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut P {
        &mut self.pool
    }

    pub fn state(&self) -> &ClaimState {
        &self.state
    }

    /// Publish a new root. Only the owner may call this.
    ///
    /// The new root replaces the current one unconditionally; claimed
    /// amounts are untouched.
    pub fn set_root(&mut self, caller: &Address, root: Hash256) -> Result<(), ClaimError> {
        if *caller != self.state.owner {
            return Err(ClaimError::Unauthorized);
        }
        let previous = self.state.current_root.replace(root);
        info!(root = %root, "merkle root updated");
        self.events.push(DistributorEvent::RootUpdated { previous, root });
        Ok(())
    }

    /// Read-only check that the tuple is committed under the current root.
    pub fn verify(
        &self,
        participant: &ParticipantId,
        beneficiary: &Address,
        cumulative_amount: u128,
        root: &Hash256,
        proof: &[Hash256],
    ) -> bool {
        self.state.current_root.as_ref() == Some(root)
            && verify_proof(leaf_hash(participant, beneficiary, cumulative_amount), proof, root)
    }

    /// Claim up to `cumulative_amount` for `participant`, paying the
    /// difference to `beneficiary`. Returns the amount transferred.
    pub fn claim(
        &mut self,
        participant: &ParticipantId,
        beneficiary: &Address,
        cumulative_amount: u128,
        root: &Hash256,
        proof: &[Hash256],
    ) -> Result<u128, ClaimError> {
        match self.state.current_root {
            None => return Err(ClaimError::NoRoot),
            Some(current) if current != *root => return Err(ClaimError::StaleRoot),
            Some(_) => {}
        }
        if !verify_proof(leaf_hash(participant, beneficiary, cumulative_amount), proof, root) {
            return Err(ClaimError::InvalidProof);
        }
        let claimed = self.cumulative_claimed(participant);
        if cumulative_amount <= claimed {
            return Err(ClaimError::NothingToClaim);
        }
        let amount = cumulative_amount - claimed;

        self.pool.transfer(beneficiary, amount)?;
        self.state.claimed.insert(*participant, cumulative_amount);

        info!(participant = %participant, beneficiary = %beneficiary, amount = %amount, "claimed");
        self.events.push(DistributorEvent::Claimed {
            participant: *participant,
            beneficiary: *beneficiary,
            amount,
            cumulative: cumulative_amount,
        });
        Ok(amount)
    }

    /// Apply each request independently against `root`.
    ///
    /// A failure affects only its own entry; earlier successes stand.
    pub fn batch_claim(
        &mut self,
        root: &Hash256,
        requests: &[ClaimRequest],
    ) -> Vec<Result<u128, ClaimError>> {
        let results: Vec<Result<u128, ClaimError>> = requests
            .iter()
            .map(|r| {
                self.claim(
                    &r.participant,
                    &r.beneficiary,
                    r.cumulative_amount,
                    root,
                    &r.proof,
                )
            })
            .collect();
        debug!(
            requests = requests.len(),
            succeeded = results.iter().filter(|r| r.is_ok()).count(),
            "batch claim"
        );
        results
    }
}
