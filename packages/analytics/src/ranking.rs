//! Hotspot ranking.
//!
//! Turns a cluster assignment plus the engine's centroids into per-cluster
//! summaries, largest incident share first.

use crime_hotspot_analytics_models::{ClusterAssignment, ClusterSummary};

use crate::HotspotError;
use crate::features::Point;

/// Builds one [`ClusterSummary`] per non-empty cluster, ordered by
/// descending incident count with ties broken by ascending cluster id.
///
/// `centroids` are taken as given (already in `[latitude, longitude]`
/// degrees), never recomputed from the points. Clusters the engine left
/// empty are skipped.
///
/// # Errors
///
/// * [`HotspotError::EmptyInput`] if the assignment has no points.
/// * [`HotspotError::InvalidParameter`] if the number of centroids differs
///   from the assignment's k.
#[allow(clippy::cast_precision_loss)]
pub fn rank_clusters(
    assignment: &ClusterAssignment,
    centroids: &[Point],
) -> Result<Vec<ClusterSummary>, HotspotError> {
    if assignment.is_empty() {
        return Err(HotspotError::EmptyInput { stage: "ranking" });
    }
    if centroids.len() != assignment.k() {
        return Err(HotspotError::InvalidParameter {
            name: "centroids",
            message: format!(
                "expected {} centroids, got {}",
                assignment.k(),
                centroids.len()
            ),
        });
    }

    let total = assignment.len() as f64;

    let mut summaries: Vec<ClusterSummary> = assignment
        .counts()
        .into_iter()
        .zip(centroids)
        .enumerate()
        .filter_map(|(cluster_id, (incident_count, centroid))| {
            if incident_count == 0 {
                log::warn!("Cluster {cluster_id} is empty and excluded from ranking");
                return None;
            }
            Some(ClusterSummary {
                cluster_id,
                centroid_latitude: centroid[0],
                centroid_longitude: centroid[1],
                incident_count,
                incident_share: incident_count as f64 / total,
            })
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.incident_count
            .cmp(&a.incident_count)
            .then(a.cluster_id.cmp(&b.cluster_id))
    });

    log::info!(
        "Ranked {} clusters over {} incidents",
        summaries.len(),
        assignment.len()
    );

    Ok(summaries)
}
