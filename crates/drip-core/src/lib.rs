//! # drip-core
//! Foundation types, the versioned Merkle leaf schema, and the trait
//! interfaces shared by the Drip reward pipeline and claim state machine.

pub mod constants;
pub mod error;
pub mod merkle;
pub mod traits;
pub mod types;
