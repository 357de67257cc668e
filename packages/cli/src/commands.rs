//! The three top-level operations, shared by the subcommands and the
//! interactive menu.
//!
//! Each one loads the input completely, computes everything in memory,
//! renders every artifact, and only then writes to the output directory.

use std::path::PathBuf;
use std::time::Instant;

use crime_hotspot_analytics::features::FeatureMatrix;
use crime_hotspot_analytics::pipeline::run_pipeline;
use crime_hotspot_analytics::selection::{select_k, suggest_k};
use crime_hotspot_analytics::trends::build_trend_report;
use crime_hotspot_cli_utils::{IndicatifProgress, MultiProgress};
use crime_hotspot_generate::{render, write_artifacts};
use crime_hotspot_source::IncidentTable;
use crime_hotspot_source::csv_file::load_incidents;

use crate::config::HotspotConfig;

/// An operation selectable from the command line or the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Full hotspot pipeline.
    Hotspots,
    /// Elbow and silhouette sweep.
    SelectK,
    /// Temporal and location distributions.
    Trends,
}

impl Operation {
    /// Every operation, in menu order.
    pub const ALL: [Self; 3] = [Self::Hotspots, Self::SelectK, Self::Trends];

    /// Menu label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hotspots => "Detect hotspots",
            Self::SelectK => "Select k (elbow/silhouette)",
            Self::Trends => "Crime trends and distributions",
        }
    }

    /// Runs the operation and returns the written paths.
    ///
    /// # Errors
    ///
    /// Propagates the error of the underlying operation.
    pub fn run(
        self,
        config: &HotspotConfig,
        multi: &MultiProgress,
    ) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
        match self {
            Self::Hotspots => hotspots(config, multi),
            Self::SelectK => selection(config, multi),
            Self::Trends => trends(config, multi),
        }
    }
}

fn load(
    config: &HotspotConfig,
    multi: &MultiProgress,
) -> Result<IncidentTable, Box<dyn std::error::Error>> {
    let message = format!("Loading {}", config.input.path.display());
    let progress = IndicatifProgress::load_bar(multi, &message);
    let table = load_incidents(&config.input.path, &config.columns, progress.as_ref())?;
    Ok(table)
}

/// Full pipeline: cluster, rank, tier, break down, and write every
/// artifact. Returns the written paths.
///
/// # Errors
///
/// Returns an error if loading, any pipeline stage, rendering, or writing
/// fails. Nothing is written unless every stage succeeded.
pub fn hotspots(
    config: &HotspotConfig,
    multi: &MultiProgress,
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let table = load(config, multi)?;

    let progress = IndicatifProgress::stages_bar(multi, "Detecting hotspots");
    let report = run_pipeline(&table, &config.hotspot_params(), progress.as_ref())?;

    if report.degenerate_tiers {
        log::warn!("Every cluster has the same share; all were tiered High");
    }
    for cluster in &report.clusters {
        log::info!(
            "#{} cluster {}: {} incidents ({:.2}%), {}",
            cluster.rank,
            cluster.summary.cluster_id,
            cluster.summary.incident_count,
            cluster.summary.incident_percentage(),
            cluster.risk_level.label()
        );
    }

    let artifacts = render::hotspot_artifacts(&table, &report)?;
    let written = write_artifacts(&config.output_dir(), &artifacts)?;

    log::info!("Hotspot run finished in {:.1}s", start.elapsed().as_secs_f64());
    Ok(written)
}

/// Elbow and silhouette sweep only.
///
/// # Errors
///
/// Returns an error if loading, the sweep, rendering, or writing fails.
pub fn selection(
    config: &HotspotConfig,
    multi: &MultiProgress,
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let table = load(config, multi)?;
    let features = FeatureMatrix::from_incidents(table.incidents(), config.clustering.standardize);

    let progress = IndicatifProgress::sweep_bar(multi, "Sweeping candidate k");
    let report = select_k(&features, &config.selection_params(), progress.as_ref())?;

    for point in &report.elbow {
        log::info!("k={:>2} inertia={:.4}", point.k, point.inertia);
    }
    for point in &report.silhouette {
        log::info!("k={:>2} silhouette={:.4}", point.k, point.silhouette_score);
    }
    match suggest_k(&report) {
        Some(k) => println!("Suggested k (highest silhouette): {k}"),
        None => println!("No silhouette scores computed; no k suggested"),
    }

    let artifacts = render::selection_artifacts(&report)?;
    Ok(write_artifacts(&config.output_dir(), &artifacts)?)
}

/// Temporal trend and location distribution counts.
///
/// # Errors
///
/// Returns an error if loading, rendering, or writing fails.
pub fn trends(
    config: &HotspotConfig,
    multi: &MultiProgress,
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let table = load(config, multi)?;
    let report = build_trend_report(table.incidents());

    for series in &report.series {
        if let Some(top) = series.buckets.iter().max_by_key(|b| b.incident_count) {
            log::info!(
                "{}: busiest is {} ({} incidents)",
                series.granularity,
                top.label,
                top.incident_count
            );
        }
    }

    let artifacts = render::trend_artifacts(&report)?;
    Ok(write_artifacts(&config.output_dir(), &artifacts)?)
}
