//! In-memory event source and eligibility oracle.
//!
//! Both deserialize from JSON so a run can be driven from files exported by
//! an indexer.

use std::collections::{BTreeMap, BTreeSet};

use drip_core::error::SourceError;
use drip_core::traits::{EligibilityOracle, EventPage, EventSource};
use drip_core::types::{Address, ChangeEvent, ParticipantId};
use serde::{Deserialize, Serialize};

fn default_page_size() -> usize {
    1_000
}

/// Fixed list of events served in pages. Cursors are decimal offsets.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEventSource {
    events: Vec<ChangeEvent>,
    #[serde(default = "default_page_size")]
    page_size: usize,
}

impl MemoryEventSource {
    pub fn new(events: Vec<ChangeEvent>) -> Self {
        Self {
            events,
            page_size: default_page_size(),
        }
    }

    /// Page size is clamped to at least one event.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSource for MemoryEventSource {
    fn fetch_page(&self, cursor: Option<&str>) -> Result<EventPage, SourceError> {
        let start = match cursor {
            None => 0,
            Some(c) => c
                .parse::<usize>()
                .ok()
                .filter(|&offset| offset <= self.events.len())
                .ok_or_else(|| SourceError::UnknownCursor(c.to_string()))?,
        };
        let end = start.saturating_add(self.page_size.max(1)).min(self.events.len());
        Ok(EventPage {
            events: self.events[start..end].to_vec(),
            next_cursor: (end < self.events.len()).then(|| end.to_string()),
        })
    }
}

/// Eligibility facts held in maps.
///
/// Program-scoped facts (infractions, eligibility start) are keyed by program
/// id first. Anything absent means: predicate false, zero infractions,
/// eligible throughout, no beneficiary.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryOracle {
    #[serde(default)]
    pub beneficiaries: BTreeMap<ParticipantId, Address>,
    #[serde(default)]
    pub predicates: BTreeMap<ParticipantId, BTreeSet<String>>,
    #[serde(default)]
    pub infractions: BTreeMap<String, BTreeMap<ParticipantId, u32>>,
    #[serde(default)]
    pub eligible_from: BTreeMap<String, BTreeMap<ParticipantId, u64>>,
}

impl MemoryOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_beneficiary(&mut self, participant: ParticipantId, beneficiary: Address) {
        self.beneficiaries.insert(participant, beneficiary);
    }

    pub fn grant(&mut self, participant: ParticipantId, predicate: &str) {
        self.predicates
            .entry(participant)
            .or_default()
            .insert(predicate.to_string());
    }

    pub fn set_infractions(&mut self, program: &str, participant: ParticipantId, count: u32) {
        self.infractions
            .entry(program.to_string())
            .or_default()
            .insert(participant, count);
    }

    pub fn set_eligible_from(&mut self, program: &str, participant: ParticipantId, position: u64) {
        self.eligible_from
            .entry(program.to_string())
            .or_default()
            .insert(participant, position);
    }
}

impl EligibilityOracle for MemoryOracle {
    fn predicate(&self, participant: &ParticipantId, predicate: &str) -> bool {
        self.predicates
            .get(participant)
            .is_some_and(|set| set.contains(predicate))
    }

    fn infraction_count(&self, participant: &ParticipantId, program: &str) -> u32 {
        self.infractions
            .get(program)
            .and_then(|m| m.get(participant))
            .copied()
            .unwrap_or(0)
    }

    fn eligible_from(&self, participant: &ParticipantId, program: &str) -> Option<u64> {
        self.eligible_from
            .get(program)
            .and_then(|m| m.get(participant))
            .copied()
    }

    fn beneficiary(&self, participant: &ParticipantId) -> Option<Address> {
        self.beneficiaries.get(participant).copied()
    }
}
