//! In-memory rendering of pipeline results.
//!
//! Every function here is pure: the same inputs always render to the same
//! bytes.

use crime_hotspot_analytics_models::{
    ClusterAssignment, HotspotReport, KSelectionReport, RiskTier, TieredBreakdown, TrendReport,
};
use crime_hotspot_source_models::IncidentTable;
use serde::Serialize;

use crate::{Artifact, GenerateError};

/// Input table with an appended cluster column.
pub const CLUSTERED_INCIDENTS_FILE: &str = "clustered_incidents.csv";
/// Ranked clusters with risk tiers.
pub const CLUSTER_SUMMARY_FILE: &str = "cluster_summary.csv";
/// Top towns within each cluster.
pub const TOP_TOWNS_FILE: &str = "top_towns_per_cluster.csv";
/// Top subdivisions within each cluster.
pub const TOP_SUBDIVISIONS_FILE: &str = "top_subdivisions_per_cluster.csv";
/// Elbow diagnostics.
pub const ELBOW_FILE: &str = "elbow.csv";
/// Silhouette diagnostics.
pub const SILHOUETTE_FILE: &str = "silhouette.csv";
/// Full structured hotspot result.
pub const HOTSPOT_REPORT_FILE: &str = "hotspot_report.json";
/// Standalone k sweep result.
pub const K_SELECTION_FILE: &str = "k_selection.json";
/// Full structured trend result.
pub const TRENDS_FILE: &str = "trends.json";

/// Name of the cluster column appended to the clustered dataset.
pub const CLUSTER_COLUMN: &str = "cluster";

/// File name of the tier-filtered town breakdown, e.g.
/// `high_risk_towns.csv`.
#[must_use]
pub fn tier_towns_file(tier: RiskTier) -> String {
    format!("{}_risk_towns.csv", tier.as_ref().to_lowercase())
}

/// File name of a trend series, e.g. `crime_by_day_of_week.csv`.
#[must_use]
pub fn trend_file(granularity: impl AsRef<str>) -> String {
    format!("crime_by_{}.csv", granularity.as_ref())
}

fn csv_artifact(
    file_name: &str,
    write: impl FnOnce(&mut csv::Writer<Vec<u8>>) -> Result<(), csv::Error>,
) -> Result<Artifact, GenerateError> {
    let wrap = |source| GenerateError::Csv {
        artifact: file_name.to_string(),
        source,
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    write(&mut writer).map_err(wrap)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| wrap(csv::Error::from(e.into_error())))?;

    Ok(Artifact::new(file_name, bytes))
}

fn json_artifact(file_name: &str, value: &impl Serialize) -> Result<Artifact, GenerateError> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|source| GenerateError::Json {
        artifact: file_name.to_string(),
        source,
    })?;
    bytes.push(b'\n');
    Ok(Artifact::new(file_name, bytes))
}

fn tier_label(tier: Option<RiskTier>) -> &'static str {
    tier.map_or("", RiskTier::label)
}

/// Every input column, unchanged, plus the cluster id of each row.
///
/// # Errors
///
/// * [`GenerateError::Mismatch`] if the assignment does not cover every row.
/// * [`GenerateError::Csv`] if a record cannot be written.
pub fn clustered_incidents(
    table: &IncidentTable,
    assignment: &ClusterAssignment,
) -> Result<Artifact, GenerateError> {
    if assignment.len() != table.len() {
        return Err(GenerateError::Mismatch {
            artifact: CLUSTERED_INCIDENTS_FILE.to_string(),
            message: format!("{} labels for {} rows", assignment.len(), table.len()),
        });
    }
    if table
        .headers()
        .iter()
        .any(|h| h.trim().eq_ignore_ascii_case(CLUSTER_COLUMN))
    {
        log::warn!("Input already has a '{CLUSTER_COLUMN}' column; appending another");
    }

    csv_artifact(CLUSTERED_INCIDENTS_FILE, |w| {
        w.write_record(
            table
                .headers()
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(CLUSTER_COLUMN)),
        )?;
        for (row, cluster) in table.rows().iter().zip(assignment.labels()) {
            let cluster = cluster.to_string();
            w.write_record(
                row.iter()
                    .map(String::as_str)
                    .chain(std::iter::once(cluster.as_str())),
            )?;
        }
        Ok(())
    })
}

/// Ranked clusters: `cluster, latitude, longitude, crime_count,
/// crime_percentage, risk_level`.
///
/// # Errors
///
/// Returns [`GenerateError::Csv`] if a record cannot be written.
pub fn cluster_summary(report: &HotspotReport) -> Result<Artifact, GenerateError> {
    csv_artifact(CLUSTER_SUMMARY_FILE, |w| {
        w.write_record([
            "cluster",
            "latitude",
            "longitude",
            "crime_count",
            "crime_percentage",
            "risk_level",
        ])?;
        for cluster in &report.clusters {
            let s = &cluster.summary;
            w.write_record([
                s.cluster_id.to_string(),
                s.centroid_latitude.to_string(),
                s.centroid_longitude.to_string(),
                s.incident_count.to_string(),
                s.incident_percentage().to_string(),
                cluster.risk_level.label().to_string(),
            ])?;
        }
        Ok(())
    })
}

/// Breakdown rows: `cluster, <location_column>, crime_count, risk_level`.
///
/// # Errors
///
/// Returns [`GenerateError::Csv`] if a record cannot be written.
pub fn breakdown(
    file_name: &str,
    location_column: &str,
    rows: &[TieredBreakdown],
) -> Result<Artifact, GenerateError> {
    csv_artifact(file_name, |w| {
        w.write_record(["cluster", location_column, "crime_count", "risk_level"])?;
        for row in rows {
            w.write_record([
                row.breakdown.cluster_id.to_string().as_str(),
                row.breakdown.location_name.as_str(),
                row.breakdown.incident_count.to_string().as_str(),
                tier_label(row.risk_level),
            ])?;
        }
        Ok(())
    })
}

/// `elbow.csv` and `silhouette.csv`.
///
/// # Errors
///
/// Returns [`GenerateError::Csv`] if a record cannot be written.
pub fn selection(report: &KSelectionReport) -> Result<Vec<Artifact>, GenerateError> {
    let elbow = csv_artifact(ELBOW_FILE, |w| {
        w.write_record(["k", "inertia"])?;
        for point in &report.elbow {
            w.write_record([point.k.to_string(), point.inertia.to_string()])?;
        }
        Ok(())
    })?;
    let silhouette = csv_artifact(SILHOUETTE_FILE, |w| {
        w.write_record(["k", "silhouette_score"])?;
        for point in &report.silhouette {
            w.write_record([point.k.to_string(), point.silhouette_score.to_string()])?;
        }
        Ok(())
    })?;
    Ok(vec![elbow, silhouette])
}

/// The complete artifact set for one pipeline run.
///
/// # Errors
///
/// Propagates any rendering error; nothing is returned partially.
pub fn hotspot_artifacts(
    table: &IncidentTable,
    report: &HotspotReport,
) -> Result<Vec<Artifact>, GenerateError> {
    let mut artifacts = vec![
        clustered_incidents(table, &report.assignment)?,
        cluster_summary(report)?,
        breakdown(TOP_TOWNS_FILE, "town_name", &report.top_towns)?,
        breakdown(
            TOP_SUBDIVISIONS_FILE,
            "subdivision_name",
            &report.top_subdivisions,
        )?,
        breakdown(
            &tier_towns_file(report.target_tier),
            "town_name",
            &report.target_tier_towns,
        )?,
    ];
    if let Some(diagnostics) = &report.selection {
        artifacts.extend(selection(diagnostics)?);
    }
    artifacts.push(json_artifact(HOTSPOT_REPORT_FILE, report)?);

    log::debug!("Rendered {} hotspot artifacts", artifacts.len());
    Ok(artifacts)
}

/// Diagnostics-only artifacts for a standalone k sweep, including the
/// sweep itself as JSON.
///
/// # Errors
///
/// Propagates any rendering error.
pub fn selection_artifacts(report: &KSelectionReport) -> Result<Vec<Artifact>, GenerateError> {
    let mut artifacts = selection(report)?;
    artifacts.push(json_artifact(K_SELECTION_FILE, report)?);
    Ok(artifacts)
}

/// `trends.json` plus one `crime_by_<granularity>.csv` per series.
///
/// # Errors
///
/// Propagates any rendering error.
pub fn trend_artifacts(report: &TrendReport) -> Result<Vec<Artifact>, GenerateError> {
    let mut artifacts = Vec::with_capacity(report.series.len() + 1);
    for series in &report.series {
        artifacts.push(csv_artifact(&trend_file(series.granularity), |w| {
            w.write_record(["key", "label", "crime_count"])?;
            for bucket in &series.buckets {
                w.write_record([
                    bucket.key.as_str(),
                    bucket.label.as_str(),
                    bucket.incident_count.to_string().as_str(),
                ])?;
            }
            Ok(())
        })?);
    }
    artifacts.push(json_artifact(TRENDS_FILE, report)?);
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use crime_hotspot_analytics_models::{
        ClusterSummary, ElbowPoint, LocationBreakdown, RankedCluster, RiskThresholds,
        SilhouettePoint, TrendBucket, TrendGranularity, TrendSeries,
    };
    use crime_hotspot_source_models::Incident;

    use super::*;

    fn table() -> IncidentTable {
        IncidentTable::new(
            vec!["ID".to_string(), "LATITUDE".to_string(), "NOTE".to_string()],
            vec![
                vec!["1".to_string(), "24.9".to_string(), "a, b".to_string()],
                vec!["2".to_string(), "24.8".to_string(), String::new()],
            ],
            vec![
                Incident {
                    id: "1".to_string(),
                    latitude: 24.9,
                    longitude: 67.0,
                    town: "Saddar".to_string(),
                    subdivision: "Garden".to_string(),
                    crime_type: None,
                    severity: None,
                    occurred_at: None,
                },
                Incident {
                    id: "2".to_string(),
                    latitude: 24.8,
                    longitude: 67.1,
                    town: "Lyari".to_string(),
                    subdivision: "Kalri".to_string(),
                    crime_type: None,
                    severity: None,
                    occurred_at: None,
                },
            ],
        )
    }

    fn tiered(
        cluster_id: usize,
        name: &str,
        count: u64,
        tier: Option<RiskTier>,
    ) -> TieredBreakdown {
        TieredBreakdown {
            breakdown: LocationBreakdown {
                cluster_id,
                location_name: name.to_string(),
                incident_count: count,
            },
            risk_level: tier,
        }
    }

    fn report() -> HotspotReport {
        HotspotReport {
            incident_count: 2,
            k: 2,
            seed: 42,
            iterations: 1,
            converged: true,
            inertia: 0.0,
            empty_clusters: Vec::new(),
            assignment: ClusterAssignment::new(2, vec![1, 0]),
            clusters: vec![RankedCluster {
                rank: 1,
                summary: ClusterSummary {
                    cluster_id: 1,
                    centroid_latitude: 24.9,
                    centroid_longitude: 67.0,
                    incident_count: 1,
                    incident_share: 0.5,
                },
                risk_level: RiskTier::VeryLow,
            }],
            thresholds: RiskThresholds {
                q1: 0.5,
                q2: 0.5,
                q3: 0.5,
            },
            degenerate_tiers: true,
            top_towns: vec![tiered(1, "Saddar", 1, Some(RiskTier::VeryLow))],
            top_subdivisions: vec![tiered(0, "Kalri", 1, None)],
            target_tier: RiskTier::High,
            target_tier_towns: Vec::new(),
            selection: Some(KSelectionReport {
                elbow: vec![ElbowPoint { k: 1, inertia: 2.5 }],
                silhouette: vec![SilhouettePoint {
                    k: 2,
                    silhouette_score: 0.75,
                }],
                sample_size: 2,
            }),
        }
    }

    fn text(artifact: &Artifact) -> &str {
        std::str::from_utf8(&artifact.bytes).unwrap()
    }

    #[test]
    fn clustered_dataset_echoes_input_columns() {
        let assignment = ClusterAssignment::new(2, vec![1, 0]);
        let artifact = clustered_incidents(&table(), &assignment).unwrap();
        assert_eq!(
            text(&artifact),
            "ID,LATITUDE,NOTE,cluster\n1,24.9,\"a, b\",1\n2,24.8,,0\n"
        );
    }

    #[test]
    fn clustered_dataset_needs_every_label() {
        assert!(matches!(
            clustered_incidents(&table(), &ClusterAssignment::new(2, vec![1])),
            Err(GenerateError::Mismatch { .. })
        ));
    }

    #[test]
    fn summary_uses_percentages_and_labels() {
        let artifact = cluster_summary(&report()).unwrap();
        assert_eq!(
            text(&artifact),
            "cluster,latitude,longitude,crime_count,crime_percentage,risk_level\n\
             1,24.9,67,1,50,Very Low\n"
        );
    }

    #[test]
    fn untiered_rows_render_empty_level() {
        let artifact = breakdown(
            TOP_SUBDIVISIONS_FILE,
            "subdivision_name",
            &report().top_subdivisions,
        )
        .unwrap();
        assert_eq!(
            text(&artifact),
            "cluster,subdivision_name,crime_count,risk_level\n0,Kalri,1,\n"
        );
    }

    #[test]
    fn full_set_names_and_reruns_match() {
        let a = hotspot_artifacts(&table(), &report()).unwrap();
        let b = hotspot_artifacts(&table(), &report()).unwrap();
        assert_eq!(a, b);

        let names: Vec<&str> = a.iter().map(|x| x.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                CLUSTERED_INCIDENTS_FILE,
                CLUSTER_SUMMARY_FILE,
                TOP_TOWNS_FILE,
                TOP_SUBDIVISIONS_FILE,
                "high_risk_towns.csv",
                ELBOW_FILE,
                SILHOUETTE_FILE,
                HOTSPOT_REPORT_FILE,
            ]
        );

        let json: serde_json::Value =
            serde_json::from_slice(&a.last().unwrap().bytes).unwrap();
        assert_eq!(json["clusters"][0]["riskLevel"], "VERY_LOW");
        assert!(json.get("assignment").is_none());
    }

    #[test]
    fn trend_files_follow_granularity_names() {
        let report = TrendReport {
            incident_count: 1,
            undated_count: 0,
            series: vec![TrendSeries {
                granularity: TrendGranularity::DayOfWeek,
                buckets: vec![TrendBucket {
                    key: "0".to_string(),
                    label: "Monday".to_string(),
                    incident_count: 1,
                }],
            }],
        };
        let artifacts = trend_artifacts(&report).unwrap();
        assert_eq!(artifacts[0].file_name, "crime_by_day_of_week.csv");
        assert_eq!(text(&artifacts[0]), "key,label,crime_count\n0,Monday,1\n");
        assert_eq!(artifacts[1].file_name, TRENDS_FILE);
        assert_eq!(
            trend_file(TrendGranularity::YearMonthSeverity),
            "crime_by_year_month_severity.csv"
        );
        assert_eq!(trend_file(TrendGranularity::Town), "crime_by_town.csv");
    }

    #[test]
    fn tier_file_names() {
        assert_eq!(tier_towns_file(RiskTier::High), "high_risk_towns.csv");
        assert_eq!(tier_towns_file(RiskTier::VeryLow), "very_low_risk_towns.csv");
    }
}
