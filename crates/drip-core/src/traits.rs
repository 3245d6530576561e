//! Trait interfaces between the pipeline and its collaborators.
//!
//! - [`EventSource`] — paginated change-event feed (indexer adapters implement)
//! - [`EligibilityOracle`] — boolean and countable eligibility facts
//! - [`TokenPool`] — the transfer primitive behind claims (drip-claims implements)

use std::collections::BTreeMap;

use crate::error::{ClaimError, SourceError};
use crate::types::{Address, ChangeEvent, ParticipantId};

/// One page of change events, plus the cursor for the next page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventPage {
    pub events: Vec<ChangeEvent>,
    /// `None` when this is the last page.
    pub next_cursor: Option<String>,
}

/// Paginated source of change events.
///
/// Pages arrive in the source's order. Grouping preserves that order per
/// participant; the accrual calculator enforces ordering itself.
pub trait EventSource: Send + Sync {
    /// Fetch the page at `cursor`, or the first page when `cursor` is `None`.
    fn fetch_page(&self, cursor: Option<&str>) -> Result<EventPage, SourceError>;

    /// Drain every page and group events by participant.
    ///
    /// Default implementation follows `next_cursor` until exhausted.
    fn collect_events(&self) -> Result<BTreeMap<ParticipantId, Vec<ChangeEvent>>, SourceError> {
        let mut grouped: BTreeMap<ParticipantId, Vec<ChangeEvent>> = BTreeMap::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.fetch_page(cursor.as_deref())?;
            for event in page.events {
                grouped.entry(event.participant).or_default().push(event);
            }
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(grouped)
    }
}

/// Externally computed eligibility facts.
///
/// The reward calculators only combine these; they never derive them.
pub trait EligibilityOracle: Send + Sync {
    /// Whether `predicate` holds for the participant.
    fn predicate(&self, participant: &ParticipantId, predicate: &str) -> bool;

    /// Number of recorded infractions for the participant within `program`.
    fn infraction_count(&self, participant: &ParticipantId, program: &str) -> u32;

    /// Position from which the participant is eligible in `program`
    /// (for example its first confirmation). `None` means eligible throughout.
    fn eligible_from(&self, participant: &ParticipantId, program: &str) -> Option<u64>;

    /// Current beneficiary address for the participant.
    fn beneficiary(&self, participant: &ParticipantId) -> Option<Address>;

    /// Whether every predicate in `predicates` holds.
    ///
    /// Default implementation: logical AND over [`predicate`](Self::predicate).
    fn all_hold(&self, participant: &ParticipantId, predicates: &[String]) -> bool {
        predicates.iter().all(|p| self.predicate(participant, p))
    }
}

/// Transfer primitive used by the claim state machine.
///
/// A transfer either moves the full amount or fails without effect.
pub trait TokenPool {
    /// Move `amount` to `to`.
    fn transfer(&mut self, to: &Address, amount: u128) -> Result<(), ClaimError>;

    /// Amount still available for transfers.
    fn available(&self) -> u128;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventKind;
    use std::collections::{HashMap, HashSet};

    // ------------------------------------------------------------------
    // Mock: EventSource with fixed-size pages
    // ------------------------------------------------------------------

    struct PagedSource {
        events: Vec<ChangeEvent>,
        page_size: usize,
    }

    impl EventSource for PagedSource {
        fn fetch_page(&self, cursor: Option<&str>) -> Result<EventPage, SourceError> {
            let start: usize = match cursor {
                None => 0,
                Some(c) => c
                    .parse()
                    .map_err(|_| SourceError::UnknownCursor(c.to_string()))?,
            };
            let end = (start + self.page_size).min(self.events.len());
            Ok(EventPage {
                events: self.events[start..end].to_vec(),
                next_cursor: (end < self.events.len()).then(|| end.to_string()),
            })
        }
    }

    fn ev(seed: u8, from: u128, to: u128, t: u64) -> ChangeEvent {
        ChangeEvent {
            participant: ParticipantId([seed; 20]),
            from_amount: from,
            to_amount: to,
            block_number: t,
            timestamp: t,
            kind: EventKind::StakeIncreased,
        }
    }

    #[test]
    fn collect_events_drains_all_pages() {
        let source = PagedSource {
            events: vec![
                ev(1, 0, 10, 1),
                ev(2, 0, 20, 2),
                ev(1, 10, 15, 3),
                ev(3, 0, 5, 4),
                ev(2, 20, 25, 5),
            ],
            page_size: 2,
        };
        let grouped = source.collect_events().unwrap();
        assert_eq!(grouped.len(), 3);
        assert_eq!(grouped[&ParticipantId([1; 20])].len(), 2);
        assert_eq!(grouped[&ParticipantId([2; 20])][1].to_amount, 25);
    }

    #[test]
    fn collect_events_preserves_source_order() {
        let source = PagedSource {
            events: vec![ev(1, 10, 15, 9), ev(1, 0, 10, 1)],
            page_size: 1,
        };
        let grouped = source.collect_events().unwrap();
        let times: Vec<u64> = grouped[&ParticipantId([1; 20])]
            .iter()
            .map(|e| e.timestamp)
            .collect();
        assert_eq!(times, vec![9, 1]);
    }

    #[test]
    fn bad_cursor_surfaces_error() {
        let source = PagedSource {
            events: vec![],
            page_size: 1,
        };
        assert_eq!(
            source.fetch_page(Some("nope")),
            Err(SourceError::UnknownCursor("nope".into()))
        );
    }

    // ------------------------------------------------------------------
    // Mock: EligibilityOracle
    // ------------------------------------------------------------------

    struct MockOracle {
        facts: HashSet<(ParticipantId, String)>,
        infractions: HashMap<ParticipantId, u32>,
    }

    impl EligibilityOracle for MockOracle {
        fn predicate(&self, participant: &ParticipantId, predicate: &str) -> bool {
            self.facts.contains(&(*participant, predicate.to_string()))
        }

        fn infraction_count(&self, participant: &ParticipantId, _program: &str) -> u32 {
            self.infractions.get(participant).copied().unwrap_or(0)
        }

        fn eligible_from(&self, _participant: &ParticipantId, _program: &str) -> Option<u64> {
            None
        }

        fn beneficiary(&self, participant: &ParticipantId) -> Option<Address> {
            Some(Address(participant.0))
        }
    }

    #[test]
    fn all_hold_is_logical_and() {
        let p = ParticipantId([1; 20]);
        let oracle = MockOracle {
            facts: [(p, "uptime".to_string()), (p, "version".to_string())]
                .into_iter()
                .collect(),
            infractions: HashMap::new(),
        };
        assert!(oracle.all_hold(&p, &["uptime".into(), "version".into()]));
        assert!(!oracle.all_hold(&p, &["uptime".into(), "ready".into()]));
        assert!(oracle.all_hold(&p, &[]));
        assert_eq!(oracle.infraction_count(&p, "any"), 0);
    }

    #[test]
    fn oracle_is_object_safe() {
        let oracle = MockOracle {
            facts: HashSet::new(),
            infractions: HashMap::new(),
        };
        let dyn_oracle: &dyn EligibilityOracle = &oracle;
        assert!(!dyn_oracle.predicate(&ParticipantId::ZERO, "x"));
    }
}
