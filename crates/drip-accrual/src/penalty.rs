//! Penalty and exclusion filter.
//!
//! Pure computation over externally supplied facts. The filter always derives
//! `amount` from `base_amount`, so applying it twice with the same facts gives
//! the same entry.

use std::collections::BTreeSet;

use drip_core::constants::penalty_factor;
use drip_core::traits::EligibilityOracle;
use drip_core::types::{ParticipantId, RewardEntry};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Penalised amount
// ---------------------------------------------------------------------------

/// Scale `amount` by the infraction penalty factor, flooring.
///
/// # Examples
///
/// ```
/// use drip_accrual::penalty::penalized_amount;
///
/// assert_eq!(penalized_amount(900, 0), 900);
/// assert_eq!(penalized_amount(900, 1), 900);
/// assert_eq!(penalized_amount(900, 2), 600);
/// assert_eq!(penalized_amount(900, 3), 300);
/// assert_eq!(penalized_amount(900, 4), 0);
/// ```
pub fn penalized_amount(amount: u128, infractions: u32) -> u128 {
    let (num, den) = penalty_factor(infractions);
    // num <= den, so amount / den * num never overflows.
    amount / den * num + amount % den * num / den
}

// ---------------------------------------------------------------------------
// PenaltyFilter
// ---------------------------------------------------------------------------

/// Applies infraction penalties and the explicit exclusion set.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PenaltyFilter {
    /// Participants whose rewards are zeroed unconditionally.
    #[serde(default)]
    excluded: BTreeSet<ParticipantId>,
}

impl PenaltyFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_excluded<I: IntoIterator<Item = ParticipantId>>(excluded: I) -> Self {
        Self {
            excluded: excluded.into_iter().collect(),
        }
    }

    pub fn is_excluded(&self, participant: &ParticipantId) -> bool {
        self.excluded.contains(participant)
    }

    /// Penalised copy of `entry` for `infractions` recorded infractions.
    pub fn apply(&self, entry: &RewardEntry, infractions: u32) -> RewardEntry {
        let amount = if self.is_excluded(&entry.participant) {
            0
        } else {
            penalized_amount(entry.base_amount, infractions)
        };
        RewardEntry {
            amount,
            ..entry.clone()
        }
    }

    /// Apply the filter to every entry of one program, reading infraction
    /// counts from `oracle`.
    pub fn apply_all(
        &self,
        program: &str,
        entries: &[RewardEntry],
        oracle: &dyn EligibilityOracle,
    ) -> Vec<RewardEntry> {
        entries
            .iter()
            .map(|entry| {
                let infractions = oracle.infraction_count(&entry.participant, program);
                match infractions {
                    0 => {}
                    1 => warn!(
                        program,
                        participant = %entry.participant,
                        "single infraction, no penalty"
                    ),
                    n => warn!(
                        program,
                        participant = %entry.participant,
                        infractions = n,
                        "penalty applied"
                    ),
                }
                let filtered = self.apply(entry, infractions);
                if filtered.amount != entry.base_amount {
                    debug!(
                        program,
                        participant = %entry.participant,
                        base = %entry.base_amount,
                        amount = %filtered.amount,
                        "entry reduced"
                    );
                }
                filtered
            })
            .collect()
    }
}
