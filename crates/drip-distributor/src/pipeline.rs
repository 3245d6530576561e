//! One reward run: events → streams → penalties → ledger → distribution.
//!
//! The run is a pure function of its inputs. A participant whose data is
//! unusable in any program is flagged and left out of the whole run: none of
//! their programs pay, and their prior ledger row carries over unchanged.
//! Every other participant continues.

use std::collections::BTreeSet;

use drip_accrual::{PenaltyFilter, RewardProgram, StreamCalculator};
use drip_core::error::{DistributionError, DripError, RewardError};
use drip_core::merkle::schema_version;
use drip_core::traits::{EligibilityOracle, EventSource};
use drip_core::types::{decimal, CumulativeLedger, ParticipantId, RewardEntry};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::combiner::combine;
use crate::distribution::Distribution;

fn default_leaf_schema() -> u8 {
    schema_version()
}

/// Everything a run needs besides its data.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    /// Leaf schema the published root must be verifiable under.
    #[serde(default = "default_leaf_schema")]
    pub leaf_schema: u8,
    #[serde(default)]
    pub penalties: PenaltyFilter,
    /// Programs in priority order. Later programs win beneficiary conflicts.
    #[serde(default)]
    pub programs: Vec<RewardProgram>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            leaf_schema: default_leaf_schema(),
            penalties: PenaltyFilter::default(),
            programs: Vec::new(),
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), DripError> {
        if self.leaf_schema != schema_version() {
            return Err(DistributionError::UnsupportedSchema(self.leaf_schema).into());
        }
        let mut seen = BTreeSet::new();
        for program in &self.programs {
            program.validate()?;
            if !seen.insert(program.id.as_str()) {
                return Err(RewardError::InvalidProgram {
                    id: program.id.clone(),
                    reason: "duplicate program id".into(),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// A participant left out of one program.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FlaggedParticipant {
    pub program: String,
    pub participant: ParticipantId,
    pub reason: String,
}

/// Per-program outcome of a run.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ProgramSummary {
    pub program: String,
    pub entries: usize,
    pub ineligible: usize,
    pub flagged: usize,
    /// Sum of amounts after penalties.
    #[serde(with = "decimal")]
    pub total: u128,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    pub ledger: CumulativeLedger,
    pub distribution: Distribution,
    pub programs: Vec<ProgramSummary>,
    pub flagged: Vec<FlaggedParticipant>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.flagged.is_empty()
    }
}

/// Execute one run on top of `prior`.
pub fn run(
    config: &RunConfig,
    prior: &CumulativeLedger,
    source: &dyn EventSource,
    oracle: &dyn EligibilityOracle,
) -> Result<RunReport, DripError> {
    config.validate()?;
    let histories = source.collect_events()?;
    info!(
        programs = config.programs.len(),
        participants = histories.len(),
        prior = prior.len(),
        "run started"
    );

    let mut results = Vec::with_capacity(config.programs.len());
    for program in &config.programs {
        let calculator = StreamCalculator::new(program.clone())?;
        results.push(calculator.compute(&histories, oracle));
    }

    let excluded: BTreeSet<ParticipantId> = results
        .iter()
        .flat_map(|r| r.flagged.keys().copied())
        .collect();

    let mut streams: Vec<Vec<RewardEntry>> = Vec::with_capacity(results.len());
    let mut programs = Vec::with_capacity(results.len());
    let mut flagged = Vec::new();

    for (program, result) in config.programs.iter().zip(results) {
        let kept: Vec<RewardEntry> = result
            .entries
            .into_iter()
            .filter(|e| !excluded.contains(&e.participant))
            .collect();
        let entries = config.penalties.apply_all(&program.id, &kept, oracle);

        let total = entries
            .iter()
            .try_fold(0u128, |acc, e| acc.checked_add(e.amount))
            .ok_or(DistributionError::TotalOverflow)?;
        programs.push(ProgramSummary {
            program: program.id.clone(),
            entries: entries.len(),
            ineligible: result.ineligible.len(),
            flagged: result.flagged.len(),
            total,
        });
        flagged.extend(result.flagged.into_iter().map(|(participant, err)| FlaggedParticipant {
            program: program.id.clone(),
            participant,
            reason: err.to_string(),
        }));
        streams.push(entries);
    }

    let ledger = combine(prior, &streams)?;
    let distribution = Distribution::build(&ledger)?;

    if !excluded.is_empty() {
        warn!(
            flagged = flagged.len(),
            excluded = excluded.len(),
            "participants excluded from run"
        );
    }
    info!(
        root = %distribution.merkle_root,
        total = %distribution.total_amount,
        participants = ledger.len(),
        "run complete"
    );

    Ok(RunReport {
        ledger,
        distribution,
        programs,
        flagged,
    })
}
