//! # drip-claims
//! Mirror of the on-chain cumulative distributor.
//!
//! A participant's `cumulative_claimed` only grows, and survives every root
//! rotation. A claim pays the difference between the proven cumulative
//! amount and what was already claimed, so republishing totals never pays
//! twice.

pub mod distributor;
pub mod pool;
pub mod shared;

pub use distributor::{ClaimRequest, ClaimState, CumulativeDistributor, DistributorEvent};
pub use pool::AllowancePool;
pub use shared::SharedDistributor;
