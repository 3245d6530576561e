//! Drip command-line front end.
//!
//! Runs a reward period from exported event and eligibility files, writes the
//! distribution artifact, and checks or inspects published distributions.

mod commands;
mod settings;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

/// Periodic staking rewards with cumulative Merkle distributions.
#[derive(Parser, Debug)]
#[command(name = "drip", version, about = "Build, verify and inspect Drip reward distributions")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one reward period and write the new distribution.
    Build(BuildArgs),
    /// Check every proof in a distribution against its root.
    Verify(VerifyArgs),
    /// Print a distribution summary or one participant's claim.
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Run configuration (TOML). `DRIP__*` environment variables override it.
    #[arg(short, long)]
    pub config: PathBuf,

    /// Change events (JSON, `MemoryEventSource` format).
    #[arg(short, long)]
    pub events: PathBuf,

    /// Eligibility facts (JSON, `MemoryOracle` format).
    #[arg(long)]
    pub oracle: PathBuf,

    /// Previously published distribution. Its amounts are the prior ledger.
    #[arg(long)]
    pub prior: Option<PathBuf>,

    /// Observed on-chain cumulative claimed amounts (JSON object).
    #[arg(long)]
    pub claimed: Option<PathBuf>,

    /// Output path for the distribution.
    #[arg(short, long)]
    pub out: PathBuf,

    /// Optional output path for the full run report.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Distribution to check.
    #[arg(short, long)]
    pub distribution: PathBuf,

    /// Only check this participant.
    #[arg(short, long)]
    pub participant: Option<String>,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Distribution to read.
    #[arg(short, long)]
    pub distribution: PathBuf,

    /// Show this participant's claim.
    #[arg(short, long)]
    pub participant: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    match cli.command {
        Commands::Build(args) => commands::build(&args),
        Commands::Verify(args) => commands::verify(&args),
        Commands::Inspect(args) => commands::inspect(&args),
    }
}

/// Initialize the tracing subscriber with the given level and format.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_build_with_globals_after_subcommand() {
        let cli = Cli::try_parse_from([
            "drip", "build", "-c", "drip.toml", "-e", "events.json", "--oracle", "oracle.json",
            "-o", "out.json", "--log-format", "json",
        ])
        .unwrap();
        assert_eq!(cli.log_format, "json");
        match cli.command {
            Commands::Build(args) => {
                assert_eq!(args.config, PathBuf::from("drip.toml"));
                assert!(args.prior.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn build_requires_output() {
        let args = ["drip", "build", "-c", "a", "-e", "b", "--oracle", "c"];
        assert!(Cli::try_parse_from(args).is_err());
    }
}
