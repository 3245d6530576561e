//! # drip-distributor
//! Turns per-program reward entries into a cumulative ledger and a published
//! Merkle distribution.
//!
//! - [`combiner`] — prior ledger + this run's streams → new ledger
//! - [`distribution`] — ledger → root, total and per-participant proofs
//! - [`source`] — in-memory [`EventSource`](drip_core::traits::EventSource)
//!   and [`EligibilityOracle`](drip_core::traits::EligibilityOracle)
//! - [`pipeline`] — one complete run from configuration to report

pub mod combiner;
pub mod distribution;
pub mod pipeline;
pub mod source;

pub use combiner::combine;
pub use distribution::{Claim, Distribution};
pub use pipeline::{run, FlaggedParticipant, ProgramSummary, RunConfig, RunReport};
pub use source::{MemoryEventSource, MemoryOracle};
