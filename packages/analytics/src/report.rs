//! Location breakdowns: which towns and subdivisions make up each cluster.

use std::collections::BTreeMap;

use crime_hotspot_analytics_models::{
    ClusterAssignment, LocationBreakdown, LocationLevel, RiskTier, TieredBreakdown,
};
use crime_hotspot_source_models::Incident;

use crate::HotspotError;
use crate::risk::RiskAssessment;

fn location_name(incident: &Incident, level: LocationLevel) -> &str {
    match level {
        LocationLevel::Town => &incident.town,
        LocationLevel::Subdivision => &incident.subdivision,
    }
}

/// Counts incidents per (cluster, location) pair.
///
/// Only pairs with at least one incident appear. Output is ordered by
/// ascending cluster id, then descending count, then ascending name.
///
/// # Errors
///
/// Returns [`HotspotError::InvalidParameter`] if the assignment is not
/// index-aligned with `incidents`.
pub fn location_breakdown(
    incidents: &[Incident],
    assignment: &ClusterAssignment,
    level: LocationLevel,
) -> Result<Vec<LocationBreakdown>, HotspotError> {
    if incidents.len() != assignment.len() {
        return Err(HotspotError::InvalidParameter {
            name: "assignment",
            message: format!(
                "{} labels for {} incidents",
                assignment.len(),
                incidents.len()
            ),
        });
    }

    let mut counts: BTreeMap<(usize, &str), u64> = BTreeMap::new();
    for (incident, &cluster_id) in incidents.iter().zip(assignment.labels()) {
        *counts
            .entry((cluster_id, location_name(incident, level)))
            .or_default() += 1;
    }

    log::debug!("{} {level} breakdown rows", counts.len());

    let mut rows: Vec<LocationBreakdown> = counts
        .into_iter()
        .map(|((cluster_id, name), incident_count)| LocationBreakdown {
            cluster_id,
            location_name: name.to_string(),
            incident_count,
        })
        .collect();

    // BTreeMap order already gives cluster then name; a stable sort on
    // count within each cluster keeps names ascending among ties.
    rows.sort_by(|a, b| {
        a.cluster_id
            .cmp(&b.cluster_id)
            .then(b.incident_count.cmp(&a.incident_count))
    });

    Ok(rows)
}

/// Keeps the `n` largest locations within each cluster.
///
/// Within a cluster, rows are ordered by descending count with ties broken
/// by ascending location name. Clusters with fewer than `n` locations keep
/// all of them.
#[must_use]
pub fn top_per_cluster(rows: &[LocationBreakdown], n: usize) -> Vec<LocationBreakdown> {
    let mut by_cluster: BTreeMap<usize, Vec<&LocationBreakdown>> = BTreeMap::new();
    for row in rows {
        by_cluster.entry(row.cluster_id).or_default().push(row);
    }

    by_cluster
        .into_values()
        .flat_map(|mut group| {
            group.sort_by(|a, b| {
                b.incident_count
                    .cmp(&a.incident_count)
                    .then_with(|| a.location_name.cmp(&b.location_name))
            });
            group.into_iter().take(n).cloned()
        })
        .collect()
}

/// Joins each row with its cluster's risk tier.
///
/// Rows whose cluster has no tier are kept with `risk_level: None`.
#[must_use]
pub fn attach_risk(rows: &[LocationBreakdown], risk: &RiskAssessment) -> Vec<TieredBreakdown> {
    rows.iter()
        .map(|row| TieredBreakdown {
            breakdown: row.clone(),
            risk_level: risk.tier_of(row.cluster_id),
        })
        .collect()
}

/// Global top `n` rows among clusters of the given tier.
///
/// Ordered by descending count, then ascending cluster id, then ascending
/// location name.
#[must_use]
pub fn top_for_tier(rows: &[TieredBreakdown], tier: RiskTier, n: usize) -> Vec<TieredBreakdown> {
    let mut matching: Vec<&TieredBreakdown> = rows
        .iter()
        .filter(|row| row.risk_level == Some(tier))
        .collect();

    matching.sort_by(|a, b| {
        b.breakdown
            .incident_count
            .cmp(&a.breakdown.incident_count)
            .then(a.breakdown.cluster_id.cmp(&b.breakdown.cluster_id))
            .then_with(|| a.breakdown.location_name.cmp(&b.breakdown.location_name))
    });

    matching.into_iter().take(n).cloned().collect()
}

#[cfg(test)]
mod tests {
    use crime_hotspot_analytics_models::{ClusterSummary, RankedCluster, RiskThresholds};

    use super::*;

    fn incident(town: &str, subdivision: &str) -> Incident {
        Incident {
            id: String::new(),
            latitude: 0.0,
            longitude: 0.0,
            town: town.to_string(),
            subdivision: subdivision.to_string(),
            crime_type: None,
            severity: None,
            occurred_at: None,
        }
    }

    fn row(cluster_id: usize, name: &str, incident_count: u64) -> LocationBreakdown {
        LocationBreakdown {
            cluster_id,
            location_name: name.to_string(),
            incident_count,
        }
    }

    fn assessment(tiers: &[(usize, RiskTier)]) -> RiskAssessment {
        RiskAssessment {
            thresholds: RiskThresholds {
                q1: 0.0,
                q2: 0.0,
                q3: 0.0,
            },
            clusters: tiers
                .iter()
                .enumerate()
                .map(|(i, &(cluster_id, risk_level))| RankedCluster {
                    rank: i + 1,
                    summary: ClusterSummary {
                        cluster_id,
                        centroid_latitude: 0.0,
                        centroid_longitude: 0.0,
                        incident_count: 1,
                        incident_share: 0.5,
                    },
                    risk_level,
                })
                .collect(),
            degenerate: false,
        }
    }

    #[test]
    fn breakdown_counts_sum_to_cluster_sizes() {
        let incidents = vec![
            incident("Saddar", "Garden"),
            incident("Saddar", "Garden"),
            incident("Saddar", "Civil Lines"),
            incident("Lyari", "Kalri"),
            incident("Lyari", "Kalri"),
        ];
        let assignment = ClusterAssignment::new(2, vec![0, 0, 1, 1, 0]);
        let towns = location_breakdown(&incidents, &assignment, LocationLevel::Town).unwrap();

        assert_eq!(
            towns,
            vec![
                row(0, "Saddar", 2),
                row(0, "Lyari", 1),
                row(1, "Lyari", 1),
                row(1, "Saddar", 1),
            ]
        );

        let counts = assignment.counts();
        for (cluster_id, &size) in counts.iter().enumerate() {
            let total: u64 = towns
                .iter()
                .filter(|r| r.cluster_id == cluster_id)
                .map(|r| r.incident_count)
                .sum();
            assert_eq!(total, size);
        }

        let subdivisions =
            location_breakdown(&incidents, &assignment, LocationLevel::Subdivision).unwrap();
        assert_eq!(subdivisions[0], row(0, "Garden", 2));
    }

    #[test]
    fn misaligned_assignment_is_rejected() {
        let assignment = ClusterAssignment::new(1, vec![0]);
        assert!(matches!(
            location_breakdown(&[], &assignment, LocationLevel::Town),
            Err(HotspotError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn ties_break_by_name() {
        let rows = vec![row(0, "C", 2), row(0, "B", 5), row(0, "A", 5)];
        let top = top_per_cluster(&rows, 2);
        let names: Vec<&str> = top.iter().map(|r| r.location_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn small_clusters_keep_everything() {
        let rows = vec![row(0, "A", 3), row(1, "B", 1), row(1, "C", 4)];
        let top = top_per_cluster(&rows, 3);
        assert_eq!(top, vec![row(0, "A", 3), row(1, "C", 4), row(1, "B", 1)]);
    }

    #[test]
    fn untiered_clusters_are_kept() {
        let rows = vec![row(0, "A", 3), row(1, "B", 2)];
        let tiered = attach_risk(&rows, &assessment(&[(0, RiskTier::High)]));
        assert_eq!(tiered.len(), 2);
        assert_eq!(tiered[0].risk_level, Some(RiskTier::High));
        assert_eq!(tiered[1].risk_level, None);
    }

    #[test]
    fn tier_filter_ranks_across_clusters() {
        let rows = vec![
            row(0, "A", 3),
            row(0, "B", 9),
            row(1, "C", 9),
            row(2, "D", 20),
        ];
        let tiered = attach_risk(
            &rows,
            &assessment(&[
                (2, RiskTier::Low),
                (0, RiskTier::High),
                (1, RiskTier::High),
            ]),
        );
        let top = top_for_tier(&tiered, RiskTier::High, 2);
        let names: Vec<&str> = top
            .iter()
            .map(|r| r.breakdown.location_name.as_str())
            .collect();
        assert_eq!(names, vec!["B", "C"]);

        assert!(top_for_tier(&tiered, RiskTier::VeryLow, 10).is_empty());
    }
}
