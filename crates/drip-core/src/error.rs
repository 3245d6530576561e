//! Error types for the Drip pipeline and claim protocol.
use thiserror::Error;

use crate::types::ParticipantId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseIdError {
    #[error("invalid length: expected {expected} hex digits, got {got}")] InvalidLength { expected: usize, got: usize },
    #[error("invalid hex: {0}")] InvalidHex(String),
}

/// Bad or incomplete event data for one participant. The participant is
/// excluded from the run and flagged; it never silently accrues zero.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataIntegrityError {
    #[error("events out of order at index {index}")] OutOfOrder { index: usize },
    #[error("event at index {index} belongs to {found}")] ForeignEvent { index: usize, found: ParticipantId },
    #[error("discontinuity at index {index}: expected from {expected}, got {got}")] Discontinuity { index: usize, expected: u128, got: u128 },
    #[error("missing history: first event starts from {from}")] MissingHistory { from: u128 },
    #[error("empty accrual interval")] EmptyInterval,
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewardError {
    #[error("accrual failed for {participant}: {source}")] Accrual { participant: ParticipantId, source: DataIntegrityError },
    #[error("no beneficiary known for {0}")] MissingBeneficiary(ParticipantId),
    #[error("reward overflow for {0}")] Overflow(ParticipantId),
    #[error("invalid program {id}: {reason}")] InvalidProgram { id: String, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CombineError {
    #[error("cumulative amount overflow for {0}")] Overflow(ParticipantId),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DistributionError {
    #[error("total amount overflow")] TotalOverflow,
    #[error("unsupported leaf schema version {0}")] UnsupportedSchema(u8),
    #[error("regression for {participant}: new {new} < floor {floor}")] Regression { participant: ParticipantId, new: u128, floor: u128 },
}

/// Claim rejection reasons. Display strings are the on-chain revert reasons.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimError {
    #[error("Merkle root was updated")] StaleRoot,
    #[error("Invalid proof")] InvalidProof,
    #[error("Nothing to claim")] NothingToClaim,
    #[error("Transfer amount exceeds allowance")] InsufficientFunding { requested: u128, available: u128 },
    #[error("Merkle root not set")] NoRoot,
    #[error("Caller is not the owner")] Unauthorized,
    #[error("Arithmetic overflow")] ArithmeticOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("unknown cursor: {0}")] UnknownCursor(String),
    #[error("source unavailable: {0}")] Unavailable(String),
}

#[derive(Error, Debug)]
pub enum DripError {
    #[error(transparent)] DataIntegrity(#[from] DataIntegrityError),
    #[error(transparent)] Reward(#[from] RewardError),
    #[error(transparent)] Combine(#[from] CombineError),
    #[error(transparent)] Distribution(#[from] DistributionError),
    #[error(transparent)] Claim(#[from] ClaimError),
    #[error(transparent)] Source(#[from] SourceError),
    #[error(transparent)] ParseId(#[from] ParseIdError),
    #[error("serialization: {0}")] Serialization(String),
}
