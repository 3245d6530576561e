//! Subcommand implementations.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use drip_core::merkle::schema_version;
use drip_core::types::{decimal, ParticipantId};
use drip_distributor::{run, Distribution, MemoryEventSource, MemoryOracle};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::settings::load_run_config;
use crate::{BuildArgs, InspectArgs, VerifyArgs};

/// Observed on-chain claimed amount, accepted as a decimal string or integer.
#[derive(Deserialize)]
struct Claimed(#[serde(with = "decimal")] u128);

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}

fn read_claimed(path: &Path) -> Result<BTreeMap<ParticipantId, u128>> {
    let raw: BTreeMap<ParticipantId, Claimed> = read_json(path)?;
    Ok(raw.into_iter().map(|(p, Claimed(amount))| (p, amount)).collect())
}

fn parse_participant(text: &str) -> Result<ParticipantId> {
    text.parse()
        .with_context(|| format!("Invalid participant id: {text}"))
}

/// Run one reward period and write the distribution.
pub fn build(args: &BuildArgs) -> Result<()> {
    let config = load_run_config(&args.config)?;
    let source: MemoryEventSource = read_json(&args.events)?;
    let oracle: MemoryOracle = read_json(&args.oracle)?;
    let prior: Option<Distribution> = args.prior.as_deref().map(read_json).transpose()?;
    let claimed = match &args.claimed {
        Some(path) => read_claimed(path)?,
        None => BTreeMap::new(),
    };
    let prior_ledger = prior.as_ref().map(Distribution::to_ledger).unwrap_or_default();

    let report = run(&config, &prior_ledger, &source, &oracle).context("Reward run failed")?;
    report
        .distribution
        .check_supersedes(prior.as_ref(), &claimed)
        .context("New distribution would pay less than already owed")?;

    write_json(&args.out, &report.distribution)?;
    if let Some(path) = &args.report {
        write_json(path, &report)?;
    }
    info!(out = %args.out.display(), "distribution written");

    println!("Merkle root:  {}", report.distribution.merkle_root);
    println!("Total amount: {}", report.distribution.total_amount);
    println!("Claims:       {}", report.distribution.claims.len());
    for summary in &report.programs {
        println!(
            "  {:<16} entries={} ineligible={} flagged={} total={}",
            summary.program, summary.entries, summary.ineligible, summary.flagged, summary.total
        );
    }
    for flagged in &report.flagged {
        println!("  FLAGGED {} in {}: {}", flagged.participant, flagged.program, flagged.reason);
    }
    Ok(())
}

/// Check proofs and re-derive the root and total from the listed claims.
pub fn verify(args: &VerifyArgs) -> Result<()> {
    let distribution: Distribution = read_json(&args.distribution)?;

    let participants: Vec<ParticipantId> = match &args.participant {
        Some(text) => vec![parse_participant(text)?],
        None => distribution.claims.keys().copied().collect(),
    };
    let failed: Vec<&ParticipantId> = participants
        .iter()
        .filter(|p| !distribution.verify_claim(p))
        .collect();
    if let Some(first) = failed.first() {
        bail!(
            "{} of {} claims failed verification (first: {})",
            failed.len(),
            participants.len(),
            first
        );
    }

    let rebuilt = Distribution::build(&distribution.to_ledger())?;
    if rebuilt.merkle_root != distribution.merkle_root {
        bail!(
            "Root mismatch: published {}, rebuilt {}",
            distribution.merkle_root,
            rebuilt.merkle_root
        );
    }
    if rebuilt.total_amount != distribution.total_amount {
        bail!(
            "Total mismatch: published {}, sum of claims {}",
            distribution.total_amount,
            rebuilt.total_amount
        );
    }

    println!(
        "OK: {} claim(s) verified against {}",
        participants.len(),
        distribution.merkle_root
    );
    Ok(())
}

/// Print a summary, or one participant's claim.
pub fn inspect(args: &InspectArgs) -> Result<()> {
    let distribution: Distribution = read_json(&args.distribution)?;

    match &args.participant {
        Some(text) => {
            let participant = parse_participant(text)?;
            let Some(claim) = distribution.claim(&participant) else {
                bail!("No claim for {participant}");
            };
            println!("Participant: {participant}");
            println!("Beneficiary: {}", claim.beneficiary);
            println!("Cumulative:  {}", claim.amount);
            println!("Proof ({}):", claim.proof.len());
            for sibling in &claim.proof {
                println!("  {sibling}");
            }
        }
        None => {
            println!("Leaf schema:  v{}", schema_version());
            println!("Merkle root:  {}", distribution.merkle_root);
            println!("Total amount: {}", distribution.total_amount);
            println!("Claims:       {}", distribution.claims.len());
        }
    }
    Ok(())
}
