//! Interactive menu shown when no subcommand is given.
//!
//! Prompts for the operation and its main parameters, pre-filled from the
//! loaded config, then runs the same code as the subcommands.

use std::path::PathBuf;

use crime_hotspot_analytics_models::RiskTier;
use crime_hotspot_cli_utils::MultiProgress;
use dialoguer::{Confirm, Input, Select};

use crate::commands::Operation;
use crate::config::HotspotConfig;

/// Runs the interactive menu.
///
/// # Errors
///
/// Returns an error if user input or the chosen operation fails.
pub fn run(
    mut config: HotspotConfig,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let labels: Vec<&str> = Operation::ALL.iter().map(|op| op.label()).collect();
    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;
    let operation = Operation::ALL[idx];

    let input: String = Input::new()
        .with_prompt("Incident CSV")
        .default(config.input.path.display().to_string())
        .interact_text()?;
    config.input.path = PathBuf::from(input.trim());

    match operation {
        Operation::Hotspots => prompt_hotspots(&mut config)?,
        Operation::SelectK => prompt_selection(&mut config)?,
        Operation::Trends => {}
    }

    let written = operation.run(&config, multi)?;

    println!("Wrote {} files to {}", written.len(), config.output_dir().display());

    Ok(())
}

fn prompt_hotspots(config: &mut HotspotConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.clustering.k = Input::new()
        .with_prompt("Number of clusters (k)")
        .default(config.clustering.k)
        .interact_text()?;

    let tiers = RiskTier::all();
    let labels: Vec<&str> = tiers.iter().map(|tier| tier.label()).collect();
    let default_tier = tiers
        .iter()
        .position(|tier| *tier == config.risk.target_tier)
        .unwrap_or(0);
    let idx = Select::new()
        .with_prompt("Risk tier to list towns for")
        .items(&labels)
        .default(default_tier)
        .interact()?;
    config.risk.target_tier = tiers[idx];

    config.selection.enabled = Confirm::new()
        .with_prompt("Also sweep candidate k values?")
        .default(config.selection.enabled)
        .interact()?;

    Ok(())
}

fn prompt_selection(config: &mut HotspotConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.selection.k_min = Input::new()
        .with_prompt("Smallest k")
        .default(config.selection.k_min)
        .interact_text()?;
    config.selection.k_max = Input::new()
        .with_prompt("Largest k")
        .default(config.selection.k_max)
        .interact_text()?;
    Ok(())
}
