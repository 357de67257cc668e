//! End-to-end hotspot pipeline.

use crime_hotspot_analytics_models::{HotspotReport, LocationLevel, QuantileBreakpoints, RiskTier};
use crime_hotspot_source::progress::{NullProgress, ProgressCallback};
use crime_hotspot_source_models::IncidentTable;

use crate::HotspotError;
use crate::features::{FeatureMatrix, Point};
use crate::kmeans::{self, DEFAULT_MAX_ITERATIONS, KMeansParams};
use crate::ranking::rank_clusters;
use crate::report::{attach_risk, location_breakdown, top_for_tier, top_per_cluster};
use crate::risk::{self, assess};
use crate::selection::{self, SelectionParams};

/// Number of pipeline stages reported through the progress callback.
const STAGES: u64 = 5;

/// Parameters for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct HotspotParams {
    /// Cluster count. Always explicit; the k sweep never overrides it.
    pub k: usize,
    /// Seed for initialization and sampling.
    pub seed: u64,
    /// Iteration cap for the clustering loop.
    pub max_iterations: usize,
    /// Whether to z-score coordinates before clustering.
    pub standardize: bool,
    /// Quantile positions for risk thresholds.
    pub breakpoints: QuantileBreakpoints,
    /// Locations kept per cluster in the breakdowns.
    pub top_n_per_cluster: usize,
    /// Rows kept in the tier-filtered town breakdown.
    pub top_n_per_tier: usize,
    /// Tier the tier-filtered breakdown is computed for.
    pub target_tier: RiskTier,
    /// Fail with [`HotspotError::DegenerateQuantiles`] instead of flagging
    /// collapsed tiers.
    pub strict_tiers: bool,
    /// K sweep to run alongside the pipeline, if any.
    pub selection: Option<SelectionParams>,
}

impl Default for HotspotParams {
    fn default() -> Self {
        Self {
            k: 4,
            seed: 42,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            standardize: true,
            breakpoints: QuantileBreakpoints::default(),
            top_n_per_cluster: 3,
            top_n_per_tier: 10,
            target_tier: RiskTier::High,
            strict_tiers: false,
            selection: None,
        }
    }
}

/// Runs features, optional k sweep, clustering, ranking, risk tiers, and
/// breakdowns over a loaded table.
///
/// # Errors
///
/// * [`HotspotError::EmptyInput`] if the table has no incidents.
/// * [`HotspotError::InvalidClusterCount`] if `k` is outside `[1, N]`.
/// * [`HotspotError::InvalidQuantiles`] for unordered breakpoints.
/// * [`HotspotError::DegenerateQuantiles`] when `strict_tiers` is set and
///   the tiers collapsed.
///
/// A failing k sweep is logged and left out of the report.
pub fn run_pipeline(
    table: &IncidentTable,
    params: &HotspotParams,
    progress: &dyn ProgressCallback,
) -> Result<HotspotReport, HotspotError> {
    if table.is_empty() {
        return Err(HotspotError::EmptyInput {
            stage: "hotspot pipeline",
        });
    }
    risk::validate_breakpoints(&params.breakpoints)?;
    for (name, value) in [
        ("top_n_per_cluster", params.top_n_per_cluster),
        ("top_n_per_tier", params.top_n_per_tier),
    ] {
        if value == 0 {
            return Err(HotspotError::InvalidParameter {
                name,
                message: "must be at least 1".to_string(),
            });
        }
    }

    log::info!(
        "Running hotspot pipeline: {} incidents, k={}, seed={}",
        table.len(),
        params.k,
        params.seed
    );
    progress.set_total(STAGES);

    progress.set_message("Preparing features".to_string());
    let features = FeatureMatrix::from_incidents(table.incidents(), params.standardize);
    progress.inc(1);

    let selection = params.selection.as_ref().and_then(|selection_params| {
        progress.set_message("Sweeping candidate k".to_string());
        match selection::select_k(&features, selection_params, &NullProgress) {
            Ok(report) => {
                selection::log_suggestion(&report);
                Some(report)
            }
            Err(e) => {
                log::warn!("K selection failed, continuing without diagnostics: {e}");
                None
            }
        }
    });
    progress.inc(1);

    progress.set_message(format!("Clustering into {} groups", params.k));
    let model = kmeans::fit(
        features.points(),
        &KMeansParams::new(params.k, params.seed).with_max_iterations(params.max_iterations),
    )?;
    log::info!(
        "Clustering finished after {} iterations (converged: {}, inertia: {})",
        model.iterations(),
        model.converged(),
        model.inertia()
    );
    progress.inc(1);

    progress.set_message("Ranking hotspots".to_string());
    let centroids: Vec<Point> = model
        .centroids()
        .iter()
        .map(|&c| features.to_coordinates(c))
        .collect();
    let summaries = rank_clusters(model.assignment(), &centroids)?;
    let assessment = assess(&summaries, &params.breakpoints)?;
    if params.strict_tiers {
        assessment.ensure_distinct()?;
    }
    progress.inc(1);

    progress.set_message("Breaking down locations".to_string());
    let incidents = table.incidents();
    let towns = location_breakdown(incidents, model.assignment(), LocationLevel::Town)?;
    let subdivisions =
        location_breakdown(incidents, model.assignment(), LocationLevel::Subdivision)?;

    let top_towns = attach_risk(&top_per_cluster(&towns, params.top_n_per_cluster), &assessment);
    let top_subdivisions = attach_risk(
        &top_per_cluster(&subdivisions, params.top_n_per_cluster),
        &assessment,
    );
    let target_tier_towns = top_for_tier(
        &attach_risk(&towns, &assessment),
        params.target_tier,
        params.top_n_per_tier,
    );
    progress.inc(1);

    log::info!(
        "{} clusters ranked, {} {} towns",
        assessment.clusters.len(),
        target_tier_towns.len(),
        params.target_tier.label()
    );
    progress.finish(format!("Ranked {} hotspots", assessment.clusters.len()));

    let empty_clusters = model.empty_clusters();
    let iterations = model.iterations();
    let converged = model.converged();
    let inertia = model.inertia();

    Ok(HotspotReport {
        incident_count: table.len(),
        k: params.k,
        seed: params.seed,
        iterations,
        converged,
        inertia,
        empty_clusters,
        assignment: model.into_assignment(),
        clusters: assessment.clusters,
        thresholds: assessment.thresholds,
        degenerate_tiers: assessment.degenerate,
        top_towns,
        top_subdivisions,
        target_tier: params.target_tier,
        target_tier_towns,
        selection,
    })
}

#[cfg(test)]
mod tests {
    use crime_hotspot_source_models::Incident;

    use super::*;

    fn incident(i: u32, lat: f64, lon: f64, town: &str) -> Incident {
        Incident {
            id: i.to_string(),
            latitude: lat,
            longitude: lon,
            town: town.to_string(),
            subdivision: format!("{town} {}", i % 2),
            crime_type: None,
            severity: None,
            occurred_at: None,
        }
    }

    /// Two well-separated groups: 30 incidents near Saddar, 10 near Korangi.
    fn two_hotspots() -> IncidentTable {
        let mut incidents = Vec::new();
        for i in 0..30u32 {
            let jitter = f64::from(i) * 0.0001;
            let town = if i % 3 == 0 { "Garden" } else { "Saddar" };
            incidents.push(incident(i, 24.86 + jitter, 67.01 + jitter, town));
        }
        for i in 30..40u32 {
            let jitter = f64::from(i) * 0.0001;
            incidents.push(incident(i, 24.83 + jitter, 67.13 - jitter, "Korangi"));
        }
        IncidentTable::from_incidents(incidents)
    }

    #[test]
    fn separates_and_ranks_hotspots() {
        let params = HotspotParams {
            k: 2,
            ..HotspotParams::default()
        };
        let report = run_pipeline(&two_hotspots(), &params, &NullProgress).unwrap();

        assert_eq!(report.assignment.len(), 40);
        assert_eq!(report.clusters.len(), 2);
        assert_eq!(report.clusters[0].summary.incident_count, 30);
        assert_eq!(report.clusters[0].risk_level, RiskTier::High);
        assert_eq!(report.clusters[1].risk_level, RiskTier::VeryLow);
        assert!((report.clusters[0].summary.centroid_latitude - 24.86).abs() < 0.01);

        let largest = report.clusters[0].summary.cluster_id;
        let towns: Vec<&str> = report
            .top_towns
            .iter()
            .filter(|r| r.breakdown.cluster_id == largest)
            .map(|r| r.breakdown.location_name.as_str())
            .collect();
        assert_eq!(towns, vec!["Saddar", "Garden"]);

        assert_eq!(report.target_tier_towns.len(), 2);
        assert!(
            report
                .target_tier_towns
                .iter()
                .all(|r| r.risk_level == Some(RiskTier::High))
        );
    }

    #[test]
    fn reruns_are_identical() {
        let params = HotspotParams {
            k: 3,
            selection: Some(SelectionParams {
                k_max: 4,
                sample_size: 20,
                ..SelectionParams::default()
            }),
            ..HotspotParams::default()
        };
        let table = two_hotspots();
        let a = run_pipeline(&table, &params, &NullProgress).unwrap();
        let b = run_pipeline(&table, &params, &NullProgress).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.assignment, b.assignment);
        assert!(a.selection.is_some());
    }

    #[test]
    fn empty_table_fails_before_clustering() {
        assert!(matches!(
            run_pipeline(
                &IncidentTable::default(),
                &HotspotParams::default(),
                &NullProgress
            ),
            Err(HotspotError::EmptyInput { .. })
        ));
    }

    #[test]
    fn k_larger_than_table_is_rejected() {
        let params = HotspotParams {
            k: 41,
            ..HotspotParams::default()
        };
        assert!(matches!(
            run_pipeline(&two_hotspots(), &params, &NullProgress),
            Err(HotspotError::InvalidClusterCount { k: 41, points: 40 })
        ));
    }

    #[test]
    fn zero_top_n_is_rejected() {
        for params in [
            HotspotParams {
                top_n_per_cluster: 0,
                ..HotspotParams::default()
            },
            HotspotParams {
                top_n_per_tier: 0,
                ..HotspotParams::default()
            },
        ] {
            let err = run_pipeline(&two_hotspots(), &params, &NullProgress).unwrap_err();
            assert!(
                matches!(err, HotspotError::InvalidParameter { name, .. } if name.starts_with("top_n")),
                "{err}"
            );
        }
    }

    #[test]
    fn collapsed_tiers_flag_or_fail() {
        let table = IncidentTable::from_incidents(vec![
            incident(0, 24.0, 67.0, "A"),
            incident(1, 25.0, 67.0, "B"),
            incident(2, 24.0, 68.0, "C"),
            incident(3, 25.0, 68.0, "D"),
        ]);
        let params = HotspotParams {
            k: 4,
            ..HotspotParams::default()
        };

        let report = run_pipeline(&table, &params, &NullProgress).unwrap();
        assert!(report.degenerate_tiers);
        assert!(report.clusters.iter().all(|c| c.risk_level == RiskTier::High));

        let strict = HotspotParams {
            strict_tiers: true,
            ..params
        };
        assert!(matches!(
            run_pipeline(&table, &strict, &NullProgress),
            Err(HotspotError::DegenerateQuantiles { .. })
        ));
    }
}
