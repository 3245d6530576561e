//! Thread-safe handle serializing every call through one lock.

use std::sync::Arc;

use drip_core::error::ClaimError;
use drip_core::traits::TokenPool;
use drip_core::types::{Address, Hash256, ParticipantId};
use parking_lot::Mutex;

use crate::distributor::{ClaimRequest, ClaimState, CumulativeDistributor};

/// Cloneable handle to a [`CumulativeDistributor`].
///
/// Concurrent callers observe claims in some total order, which is what the
/// single-writer contract relies on.
pub struct SharedDistributor<P: TokenPool> {
    inner: Arc<Mutex<CumulativeDistributor<P>>>,
}

impl<P: TokenPool> Clone for SharedDistributor<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: TokenPool> SharedDistributor<P> {
    pub fn new(distributor: CumulativeDistributor<P>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(distributor)),
        }
    }

    pub fn set_root(&self, caller: &Address, root: Hash256) -> Result<(), ClaimError> {
        self.inner.lock().set_root(caller, root)
    }

    pub fn claim(
        &self,
        participant: &ParticipantId,
        beneficiary: &Address,
        cumulative_amount: u128,
        root: &Hash256,
        proof: &[Hash256],
    ) -> Result<u128, ClaimError> {
        self.inner
            .lock()
            .claim(participant, beneficiary, cumulative_amount, root, proof)
    }

    /// The whole batch runs under one lock acquisition.
    pub fn batch_claim(
        &self,
        root: &Hash256,
        requests: &[ClaimRequest],
    ) -> Vec<Result<u128, ClaimError>> {
        self.inner.lock().batch_claim(root, requests)
    }

    pub fn cumulative_claimed(&self, participant: &ParticipantId) -> u128 {
        self.inner.lock().cumulative_claimed(participant)
    }

    pub fn current_root(&self) -> Option<Hash256> {
        self.inner.lock().current_root()
    }

    pub fn snapshot(&self) -> ClaimState {
        self.inner.lock().state().clone()
    }

    /// Run `f` with exclusive access.
    pub fn with<R>(&self, f: impl FnOnce(&mut CumulativeDistributor<P>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
