//! Weighted accrual: time-weighted average of a tracked quantity.
//!
//! The interval `[start, end)` is split at every contained event. The
//! sub-interval ending at an event is valued at that event's `from_amount`;
//! the trailing sub-interval is valued at the last contained event's
//! `to_amount`. Each sub-interval contributes
//! `floor(value * duration * ACCRUAL_PRECISION / total)` and the sum is divided
//! by `ACCRUAL_PRECISION` once at the end, so the rounding loss is at most one
//! unit per sub-interval.
//!
//! An eligibility start inside the interval clips every sub-interval to the
//! part at or after it. The total duration stays the full interval, so late
//! eligibility reduces the average rather than rescaling it.

use drip_core::constants::ACCRUAL_PRECISION;
use drip_core::error::DataIntegrityError;
use drip_core::types::{AccruedBalance, Basis, ChangeEvent, Interval, ParticipantId};
use tracing::trace;

use crate::fixed::mul_ratio_scaled_floor;

/// Check that a participant's history is usable.
///
/// Every event must belong to `participant`, block numbers and timestamps
/// must both be non-decreasing, and each event must start where the
/// previous one ended.
pub fn validate_history(
    participant: &ParticipantId,
    events: &[ChangeEvent],
) -> Result<(), DataIntegrityError> {
    for (index, event) in events.iter().enumerate() {
        if event.participant != *participant {
            return Err(DataIntegrityError::ForeignEvent {
                index,
                found: event.participant,
            });
        }
        if index == 0 {
            continue;
        }
        let prev = &events[index - 1];
        if event.block_number < prev.block_number || event.timestamp < prev.timestamp {
            return Err(DataIntegrityError::OutOfOrder { index });
        }
        if event.from_amount != prev.to_amount {
            return Err(DataIntegrityError::Discontinuity {
                index,
                expected: prev.to_amount,
                got: event.from_amount,
            });
        }
    }
    Ok(())
}

/// Value of the tracked quantity at instant `at`, after every event at or
/// before it. Zero when no such event exists.
pub fn value_at(
    participant: &ParticipantId,
    events: &[ChangeEvent],
    basis: Basis,
    at: u64,
) -> Result<u128, DataIntegrityError> {
    validate_history(participant, events)?;
    let seen = events.partition_point(|e| e.position(basis) <= at);
    Ok(events[..seen].last().map_or(0, |e| e.to_amount))
}

/// Time-weighted average calculator for one accounting clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccrualCalculator {
    basis: Basis,
}

impl AccrualCalculator {
    pub fn new(basis: Basis) -> Self {
        Self { basis }
    }

    pub fn basis(&self) -> Basis {
        self.basis
    }

    /// Weighted average of the participant's quantity over `interval`.
    ///
    /// `events` is the participant's full history for one tracked quantity.
    /// Events at or after `interval.end` are ignored. `eligible_from` clips
    /// accrual to start no earlier than that position.
    pub fn accrue(
        &self,
        participant: &ParticipantId,
        events: &[ChangeEvent],
        interval: Interval,
        eligible_from: Option<u64>,
    ) -> Result<AccruedBalance, DataIntegrityError> {
        if interval.is_empty() {
            return Err(DataIntegrityError::EmptyInterval);
        }
        validate_history(participant, events)?;

        let basis = self.basis;
        let split = events.partition_point(|e| e.position(basis) < interval.start);
        let (preceding, rest) = events.split_at(split);
        let inside = rest.partition_point(|e| e.position(basis) < interval.end);
        let contained = &rest[..inside];

        let leading = preceding.last().map_or(0, |e| e.to_amount);
        if preceding.is_empty() {
            if let Some(first) = contained.first() {
                if first.from_amount != 0 {
                    return Err(DataIntegrityError::MissingHistory {
                        from: first.from_amount,
                    });
                }
            }
        }

        let gate = eligible_from.map_or(interval.start, |g| g.max(interval.start));
        let total = interval.duration();

        let mut weighted: u128 = 0;
        let mut segment_start = interval.start;
        for event in contained {
            let position = event.position(basis);
            let contribution =
                segment_value(event.from_amount, segment_start, position, gate, total)?;
            weighted = weighted
                .checked_add(contribution)
                .ok_or(DataIntegrityError::ArithmeticOverflow)?;
            segment_start = position;
        }
        let trailing = contained.last().map_or(leading, |e| e.to_amount);
        weighted = weighted
            .checked_add(segment_value(trailing, segment_start, interval.end, gate, total)?)
            .ok_or(DataIntegrityError::ArithmeticOverflow)?;

        let weighted_average = weighted / ACCRUAL_PRECISION;
        trace!(
            participant = %participant,
            segments = contained.len() + 1,
            weighted_average,
            "accrued"
        );

        Ok(AccruedBalance {
            participant: *participant,
            weighted_average,
        })
    }
}

/// `value * duration / total` for the part of `[from, to)` at or after
/// `gate`, in `ACCRUAL_PRECISION` units.
fn segment_value(
    value: u128,
    from: u64,
    to: u64,
    gate: u64,
    total: u64,
) -> Result<u128, DataIntegrityError> {
    let effective = to.saturating_sub(from.max(gate));
    if effective == 0 || value == 0 {
        return Ok(0);
    }
    mul_ratio_scaled_floor(value, effective, total, ACCRUAL_PRECISION)
        .ok_or(DataIntegrityError::ArithmeticOverflow)
}
