#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for crime hotspot detection.
//!
//! Settings come from `hotspots.toml` (or the file named by `--config` /
//! `CRIME_HOTSPOTS_CONFIG`), with flags taking precedence. Without a
//! subcommand an interactive menu guides the run.
//!
//! Uses `indicatif-log-bridge` (via [`crime_hotspot_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod commands;
mod config;
mod interactive;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use crime_hotspot_analytics_models::RiskTier;

use crate::commands::Operation;
use crate::config::HotspotConfig;

#[derive(Parser)]
#[command(name = "crime_hotspots", about = "Crime hotspot detection tool")]
struct Cli {
    /// Path to a TOML config file (default: `hotspots.toml` if present)
    #[arg(long, global = true, env = "CRIME_HOTSPOTS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Input and output locations shared by every subcommand.
#[derive(Args)]
struct IoArgs {
    /// Incident CSV to analyze
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Directory the artifacts are written to
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Seed for initialization and sampling
    #[arg(long)]
    seed: Option<u64>,
    /// Cluster raw degrees instead of z-scored coordinates
    #[arg(long)]
    no_standardize: bool,
}

impl IoArgs {
    fn apply(self, config: &mut HotspotConfig) {
        if let Some(input) = self.input {
            config.input.path = input;
        }
        if self.output.is_some() {
            config.output.dir = self.output;
        }
        if let Some(seed) = self.seed {
            config.clustering.seed = seed;
        }
        if self.no_standardize {
            config.clustering.standardize = false;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster incidents, rank hotspots, assign risk tiers, and write all
    /// artifacts
    Run {
        #[command(flatten)]
        io: IoArgs,
        /// Number of clusters
        #[arg(short)]
        k: Option<usize>,
        /// Maximum clustering iterations
        #[arg(long)]
        max_iterations: Option<usize>,
        /// Also sweep candidate k values and write elbow/silhouette files
        #[arg(long)]
        select_k: bool,
        /// Locations kept per cluster
        #[arg(long)]
        top_n: Option<usize>,
        /// Rows kept in the tier-filtered town breakdown
        #[arg(long)]
        tier_top_n: Option<usize>,
        /// Tier for the tier-filtered town breakdown (e.g., "high", "medium")
        #[arg(long)]
        target_tier: Option<RiskTier>,
        /// Fail instead of warning when every cluster lands in one tier
        #[arg(long)]
        strict_tiers: bool,
    },
    /// Sweep candidate k values and write elbow/silhouette diagnostics
    SelectK {
        #[command(flatten)]
        io: IoArgs,
        /// Smallest candidate k
        #[arg(long)]
        k_min: Option<usize>,
        /// Largest candidate k
        #[arg(long)]
        k_max: Option<usize>,
        /// Number of incidents sampled for silhouette scoring
        #[arg(long)]
        sample_size: Option<usize>,
    },
    /// Count incidents over time, by location, by crime type, and by
    /// severity
    Trends {
        #[command(flatten)]
        io: IoArgs,
    },
}

impl Commands {
    /// Applies the flags on top of `config` and returns the operation to
    /// run.
    fn apply(self, config: &mut HotspotConfig) -> Operation {
        match self {
            Self::Run {
                io,
                k,
                max_iterations,
                select_k,
                top_n,
                tier_top_n,
                target_tier,
                strict_tiers,
            } => {
                io.apply(config);
                if let Some(k) = k {
                    config.clustering.k = k;
                }
                if let Some(max_iterations) = max_iterations {
                    config.clustering.max_iterations = max_iterations;
                }
                if select_k {
                    config.selection.enabled = true;
                }
                if let Some(n) = top_n {
                    config.report.top_n_per_cluster = n;
                }
                if let Some(n) = tier_top_n {
                    config.report.top_n_per_tier = n;
                }
                if let Some(tier) = target_tier {
                    config.risk.target_tier = tier;
                }
                if strict_tiers {
                    config.risk.strict = true;
                }
                Operation::Hotspots
            }
            Self::SelectK {
                io,
                k_min,
                k_max,
                sample_size,
            } => {
                io.apply(config);
                if let Some(k_min) = k_min {
                    config.selection.k_min = k_min;
                }
                if let Some(k_max) = k_max {
                    config.selection.k_max = k_max;
                }
                if let Some(sample_size) = sample_size {
                    config.selection.sample_size = sample_size;
                }
                Operation::SelectK
            }
            Self::Trends { io } => {
                io.apply(config);
                Operation::Trends
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = crime_hotspot_cli_utils::init_logger();
    let cli = Cli::parse();

    let mut config = HotspotConfig::load(cli.config.as_deref())?;

    let Some(command) = cli.command else {
        return interactive::run(config, &multi);
    };

    let operation = command.apply(&mut config);
    let written = operation.run(&config, &multi)?;

    for path in &written {
        println!("{}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("crime_hotspots").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn run_flags_override_config() {
        let cli = parse(&[
            "run",
            "-k",
            "3",
            "--target-tier",
            "medium",
            "--select-k",
            "--top-n",
            "5",
            "--strict-tiers",
            "--seed",
            "7",
            "--input",
            "in.csv",
            "--output",
            "out",
            "--no-standardize",
        ]);

        let mut config = HotspotConfig::default();
        let operation = cli.command.unwrap().apply(&mut config);

        assert_eq!(operation, Operation::Hotspots);
        assert_eq!(config.clustering.k, 3);
        assert_eq!(config.clustering.seed, 7);
        assert!(!config.clustering.standardize);
        assert_eq!(config.risk.target_tier, RiskTier::Medium);
        assert!(config.risk.strict);
        assert!(config.selection.enabled);
        assert_eq!(config.report.top_n_per_cluster, 5);
        assert_eq!(config.report.top_n_per_tier, 10);
        assert_eq!(config.input.path, PathBuf::from("in.csv"));
        assert_eq!(config.output_dir(), PathBuf::from("out"));
    }

    #[test]
    fn absent_flags_keep_loaded_values() {
        let mut config = HotspotConfig::default();
        config.clustering.k = 6;
        config.risk.target_tier = RiskTier::Low;

        let operation = parse(&["run"]).command.unwrap().apply(&mut config);

        assert_eq!(operation, Operation::Hotspots);
        assert_eq!(config.clustering.k, 6);
        assert_eq!(config.risk.target_tier, RiskTier::Low);
        assert!(config.clustering.standardize);
    }

    #[test]
    fn select_k_flags_override_sweep() {
        let mut config = HotspotConfig::default();
        let operation = parse(&["select-k", "--k-min", "2", "--k-max", "6", "--sample-size", "500"])
            .command
            .unwrap()
            .apply(&mut config);

        assert_eq!(operation, Operation::SelectK);
        assert_eq!(config.selection.k_min, 2);
        assert_eq!(config.selection.k_max, 6);
        assert_eq!(config.selection.sample_size, 500);
    }

    #[test]
    fn trends_and_bare_invocation_parse() {
        let mut config = HotspotConfig::default();
        let operation = parse(&["trends", "-i", "x.csv"]).command.unwrap().apply(&mut config);
        assert_eq!(operation, Operation::Trends);
        assert_eq!(config.input.path, PathBuf::from("x.csv"));

        assert!(parse(&[]).command.is_none());
    }

    #[test]
    fn unknown_tier_is_rejected() {
        assert!(
            Cli::try_parse_from(["crime_hotspots", "run", "--target-tier", "extreme"]).is_err()
        );
    }
}
