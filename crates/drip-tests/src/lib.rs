//! Cross-crate test suite for Drip.
//!
//! Drives the full pipeline (events → ledger → distribution → claims) and
//! attacks the claim protocol with malformed and replayed inputs.

pub mod helpers;
