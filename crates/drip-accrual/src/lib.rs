//! # drip-accrual — reward computation for one run.
//!
//! All calculations use integer arithmetic only for determinism.
//!
//! - **Weighted accrual**: time-weighted average of stake or authorization
//!   over a half-open interval, with sort-or-reject input validation.
//! - **Reward streams**: annualised rate applied to the accrued (or
//!   point-in-time) value, gated by eligibility predicates.
//! - **Penalties**: infraction-count factors and an exclusion set, applied
//!   before combination.

pub mod accrual;
pub mod fixed;
pub mod penalty;
pub mod stream;

pub use accrual::{validate_history, value_at, AccrualCalculator};
pub use fixed::mul_div_floor;
pub use penalty::{penalized_amount, PenaltyFilter};
pub use stream::{
    annualized_reward, ProgramKind, RewardProgram, StreamCalculator, StreamOutcome, StreamResult,
};
