//! Reward stream calculators: one program, one run.
//!
//! `amount = floor(min(value, cap) * rate_ppm * period_secs / (SECONDS_PER_YEAR * RATE_PRECISION))`
//!
//! `value` is the weighted average from [`AccrualCalculator`] for
//! [`ProgramKind::Weighted`] programs, or the point-in-time value at the end
//! of the interval for [`ProgramKind::InstantBonus`] programs. Predicates are
//! ANDed; any false predicate gives a deterministic zero reward.

use std::collections::BTreeMap;

use drip_core::constants::{RATE_PRECISION, SECONDS_PER_YEAR};
use drip_core::error::RewardError;
use drip_core::traits::EligibilityOracle;
use drip_core::types::{
    decimal_opt, Basis, ChangeEvent, Interval, ParticipantId, RewardEntry, TrackedQuantity,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::accrual::{value_at, AccrualCalculator};
use crate::fixed::mul_div_floor;

/// How a program reads the tracked quantity.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProgramKind {
    /// Time-weighted average over the interval.
    #[default]
    Weighted,
    /// Value at the interval end, gated by predicates at that instant.
    InstantBonus,
}

/// Parameters of one reward program for one run.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RewardProgram {
    pub id: String,
    #[serde(default)]
    pub kind: ProgramKind,
    pub tracks: TrackedQuantity,
    #[serde(default)]
    pub basis: Basis,
    pub interval: Interval,
    /// Accrual length in seconds. Required for block-based intervals;
    /// defaults to the interval length for timestamp-based ones.
    #[serde(default)]
    pub period_secs: Option<u64>,
    /// Annual rate in parts per million.
    pub rate_ppm: u64,
    #[serde(default, with = "decimal_opt")]
    pub cap: Option<u128>,
    /// Eligibility predicate ids, all of which must hold.
    #[serde(default)]
    pub predicates: Vec<String>,
}

impl RewardProgram {
    /// Seconds the rate is applied over.
    pub fn period_secs(&self) -> Result<u64, RewardError> {
        match (self.period_secs, self.basis) {
            (Some(secs), _) => Ok(secs),
            (None, Basis::Timestamp) => Ok(self.interval.duration()),
            (None, Basis::Block) => Err(RewardError::InvalidProgram {
                id: self.id.clone(),
                reason: "period_secs is required for block-based intervals".into(),
            }),
        }
    }

    /// Reject configurations that cannot produce a meaningful reward.
    pub fn validate(&self) -> Result<(), RewardError> {
        let invalid = |reason: &str| RewardError::InvalidProgram {
            id: self.id.clone(),
            reason: reason.to_string(),
        };
        if self.id.is_empty() {
            return Err(invalid("empty program id"));
        }
        if self.interval.is_empty() {
            return Err(invalid("empty interval"));
        }
        self.period_secs()?;
        Ok(())
    }
}

/// Annualised reward for a value over `period_secs`.
///
/// Returns `None` on overflow.
pub fn annualized_reward(
    value: u128,
    cap: Option<u128>,
    rate_ppm: u64,
    period_secs: u64,
) -> Option<u128> {
    let capped = cap.map_or(value, |c| value.min(c));
    let per_year = capped.checked_mul(u128::from(rate_ppm))?;
    mul_div_floor(per_year, u128::from(period_secs), SECONDS_PER_YEAR * RATE_PRECISION)
}

/// Outcome for one participant in one program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamOutcome {
    Rewarded(RewardEntry),
    /// A predicate did not hold. Carries a zero-amount entry so the
    /// beneficiary still reaches the combiner.
    Ineligible(RewardEntry),
}

impl StreamOutcome {
    pub fn entry(&self) -> &RewardEntry {
        match self {
            Self::Rewarded(entry) | Self::Ineligible(entry) => entry,
        }
    }
}

/// Result of running one program over every participant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamResult {
    pub program: String,
    /// One entry per computed participant, in participant order. Ineligible
    /// participants appear with a zero amount.
    pub entries: Vec<RewardEntry>,
    /// Participants whose predicates did not all hold.
    pub ineligible: Vec<ParticipantId>,
    /// Participants excluded because their data or configuration was unusable.
    pub flagged: BTreeMap<ParticipantId, RewardError>,
}

impl StreamResult {
    /// Sum of entry amounts, saturating.
    pub fn total(&self) -> u128 {
        self.entries
            .iter()
            .fold(0u128, |acc, e| acc.saturating_add(e.amount))
    }
}

/// Applies one [`RewardProgram`] to a set of participant histories.
#[derive(Debug, Clone)]
pub struct StreamCalculator {
    program: RewardProgram,
    calculator: AccrualCalculator,
}

impl StreamCalculator {
    pub fn new(program: RewardProgram) -> Result<Self, RewardError> {
        program.validate()?;
        let calculator = AccrualCalculator::new(program.basis);
        Ok(Self { program, calculator })
    }

    pub fn program(&self) -> &RewardProgram {
        &self.program
    }

    /// Compute this program's entries.
    ///
    /// `histories` holds every participant's events of any kind; only events
    /// moving the program's tracked quantity are used. Participants with no
    /// such events are skipped.
    pub fn compute(
        &self,
        histories: &BTreeMap<ParticipantId, Vec<ChangeEvent>>,
        oracle: &dyn EligibilityOracle,
    ) -> StreamResult {
        let mut result = StreamResult {
            program: self.program.id.clone(),
            ..StreamResult::default()
        };

        for (participant, events) in histories {
            let tracked: Vec<ChangeEvent> = events
                .iter()
                .filter(|e| e.kind.tracked() == self.program.tracks)
                .cloned()
                .collect();
            if tracked.is_empty() {
                continue;
            }

            match self.compute_participant(participant, &tracked, oracle) {
                Ok(StreamOutcome::Rewarded(entry)) => result.entries.push(entry),
                Ok(StreamOutcome::Ineligible(entry)) => {
                    debug!(
                        program = %self.program.id,
                        participant = %participant,
                        "eligibility unmet"
                    );
                    result.ineligible.push(*participant);
                    result.entries.push(entry);
                }
                Err(e) => {
                    warn!(
                        program = %self.program.id,
                        participant = %participant,
                        error = %e,
                        "participant flagged"
                    );
                    result.flagged.insert(*participant, e);
                }
            }
        }

        info!(
            program = %self.program.id,
            entries = result.entries.len(),
            ineligible = result.ineligible.len(),
            flagged = result.flagged.len(),
            total = %result.total(),
            "stream computed"
        );
        result
    }

    /// Reward for one participant from its tracked-quantity events.
    pub fn compute_participant(
        &self,
        participant: &ParticipantId,
        events: &[ChangeEvent],
        oracle: &dyn EligibilityOracle,
    ) -> Result<StreamOutcome, RewardError> {
        let program = &self.program;
        let beneficiary = oracle
            .beneficiary(participant)
            .ok_or(RewardError::MissingBeneficiary(*participant))?;
        if !oracle.all_hold(participant, &program.predicates) {
            return Ok(StreamOutcome::Ineligible(RewardEntry::new(
                *participant,
                beneficiary,
                0,
            )));
        }

        let accrual_err = |source| RewardError::Accrual {
            participant: *participant,
            source,
        };
        let value = match program.kind {
            ProgramKind::Weighted => {
                let gate = oracle.eligible_from(participant, &program.id);
                self.calculator
                    .accrue(participant, events, program.interval, gate)
                    .map_err(accrual_err)?
                    .weighted_average
            }
            ProgramKind::InstantBonus => {
                value_at(participant, events, program.basis, snapshot_instant(program.interval))
                    .map_err(accrual_err)?
            }
        };

        let amount = annualized_reward(value, program.cap, program.rate_ppm, program.period_secs()?)
            .ok_or(RewardError::Overflow(*participant))?;
        debug!(program = %program.id, participant = %participant, value, amount, "reward");
        Ok(StreamOutcome::Rewarded(RewardEntry::new(
            *participant,
            beneficiary,
            amount,
        )))
    }
}

/// The instant an instant-bonus program reads: the last position inside the interval.
fn snapshot_instant(interval: Interval) -> u64 {
    interval.end.saturating_sub(1)
}
