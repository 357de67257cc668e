#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types for the hotspot detection pipeline.
//!
//! These are plain data: the pipeline in `crime_hotspot_analytics` produces
//! them and renderers (CSV/JSON writers, charts) consume them. Nothing here
//! performs computation beyond trivial accessors.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Ordinal risk tier assigned to a cluster from its incident share.
///
/// Variants are declared lowest first so the derived ordering matches risk.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum RiskTier {
    /// Share below the lower quantile.
    VeryLow,
    /// Share in `[q1, q2)`.
    Low,
    /// Share in `[q2, q3)`.
    Medium,
    /// Share at or above the upper quantile.
    High,
}

impl RiskTier {
    /// Human-readable tier name used in reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::VeryLow => "Very Low",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    /// Returns all variants of this enum, lowest risk first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::VeryLow, Self::Low, Self::Medium, Self::High]
    }
}

/// Cluster id for every incident, index-aligned with the incident table.
///
/// Ids are dense in `0..k`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAssignment {
    k: usize,
    labels: Vec<usize>,
}

impl ClusterAssignment {
    /// Wraps per-point labels produced for `k` clusters.
    ///
    /// # Panics
    ///
    /// Panics if any label is `>= k`.
    #[must_use]
    pub fn new(k: usize, labels: Vec<usize>) -> Self {
        assert!(
            labels.iter().all(|&label| label < k),
            "cluster labels must be in 0..{k}"
        );
        Self { k, labels }
    }

    /// Number of clusters the assignment was produced for.
    #[must_use]
    pub const fn k(&self) -> usize {
        self.k
    }

    /// Per-point cluster ids.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Cluster id of the point at `index`.
    #[must_use]
    pub fn cluster_of(&self, index: usize) -> Option<usize> {
        self.labels.get(index).copied()
    }

    /// Number of assigned points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether no points are assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of points in each cluster, indexed by cluster id.
    #[must_use]
    pub fn counts(&self) -> Vec<u64> {
        let mut counts = vec![0u64; self.k];
        for &label in &self.labels {
            counts[label] += 1;
        }
        counts
    }
}

/// Per-cluster hotspot statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSummary {
    /// Cluster id in `0..k`.
    pub cluster_id: usize,
    /// Centroid latitude (degrees).
    pub centroid_latitude: f64,
    /// Centroid longitude (degrees).
    pub centroid_longitude: f64,
    /// Number of incidents assigned to the cluster.
    pub incident_count: u64,
    /// `incident_count / total`, in `[0, 1]`.
    pub incident_share: f64,
}

impl ClusterSummary {
    /// Share expressed as a percentage.
    #[must_use]
    pub fn incident_percentage(&self) -> f64 {
        self.incident_share * 100.0
    }
}

/// Quantile positions used to derive risk thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct QuantileBreakpoints {
    /// Lower breakpoint (`q1`).
    pub lower: f64,
    /// Middle breakpoint (`q2`).
    pub middle: f64,
    /// Upper breakpoint (`q3`).
    pub upper: f64,
}

impl Default for QuantileBreakpoints {
    fn default() -> Self {
        Self {
            lower: 0.25,
            middle: 0.5,
            upper: 0.75,
        }
    }
}

/// Share thresholds computed from the cluster summaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskThresholds {
    /// Lower threshold.
    pub q1: f64,
    /// Middle threshold.
    pub q2: f64,
    /// Upper threshold.
    pub q3: f64,
}

impl RiskThresholds {
    /// Whether all thresholds coincide, collapsing every cluster into one
    /// tier.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_collapsed(&self) -> bool {
        self.q1 == self.q2 && self.q2 == self.q3
    }
}

/// A cluster summary with its risk tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCluster {
    /// Rank position, 1 = largest share.
    pub rank: usize,
    /// Cluster statistics.
    #[serde(flatten)]
    pub summary: ClusterSummary,
    /// Tier derived from the share thresholds.
    pub risk_level: RiskTier,
}

/// Location granularity for breakdowns.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LocationLevel {
    /// Town (district).
    Town,
    /// Subdivision within a town.
    Subdivision,
}

/// Incident count for one (cluster, location) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationBreakdown {
    /// Cluster id.
    pub cluster_id: usize,
    /// Town or subdivision name, depending on the breakdown level.
    pub location_name: String,
    /// Incidents of this cluster in this location.
    pub incident_count: u64,
}

/// A [`LocationBreakdown`] joined with its cluster's risk tier.
///
/// `risk_level` is `None` when the cluster has no computed tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TieredBreakdown {
    /// The underlying breakdown row.
    #[serde(flatten)]
    pub breakdown: LocationBreakdown,
    /// Joined risk tier.
    pub risk_level: Option<RiskTier>,
}

/// Inertia for one candidate cluster count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElbowPoint {
    /// Candidate cluster count.
    pub k: usize,
    /// Sum of squared distances to assigned centroids.
    pub inertia: f64,
}

/// Silhouette score for one candidate cluster count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SilhouettePoint {
    /// Candidate cluster count.
    pub k: usize,
    /// Mean silhouette coefficient over the sample, in `[-1, 1]`.
    pub silhouette_score: f64,
}

/// Diagnostic output of a k sweep. Advisory only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KSelectionReport {
    /// Inertia per k, ascending k.
    pub elbow: Vec<ElbowPoint>,
    /// Silhouette per k (k >= 2 only), ascending k.
    pub silhouette: Vec<SilhouettePoint>,
    /// Number of points the silhouette scores were computed on.
    pub sample_size: usize,
}

impl KSelectionReport {
    /// Candidate k with the highest silhouette score, smaller k on ties.
    #[must_use]
    pub fn best_silhouette_k(&self) -> Option<usize> {
        self.silhouette
            .iter()
            .fold(None::<SilhouettePoint>, |best, point| match best {
                Some(b) if b.silhouette_score >= point.silhouette_score => Some(b),
                _ => Some(*point),
            })
            .map(|p| p.k)
    }
}

/// Complete result of one hotspot pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotReport {
    /// Number of incidents clustered.
    pub incident_count: usize,
    /// Requested cluster count.
    pub k: usize,
    /// Seed used for centroid initialization.
    pub seed: u64,
    /// Lloyd iterations performed.
    pub iterations: usize,
    /// Whether assignments stabilized before the iteration cap.
    pub converged: bool,
    /// Final within-cluster sum of squares (feature space).
    pub inertia: f64,
    /// Clusters that ended with no incidents and were excluded from ranking.
    pub empty_clusters: Vec<usize>,
    /// Per-incident cluster ids. Not serialized; persisted through the
    /// clustered dataset artifact instead.
    #[serde(skip)]
    pub assignment: ClusterAssignment,
    /// Clusters ordered by incident share, largest first.
    pub clusters: Vec<RankedCluster>,
    /// Share thresholds used for tiering.
    pub thresholds: RiskThresholds,
    /// Whether the thresholds collapsed into a single value.
    pub degenerate_tiers: bool,
    /// Top towns within each cluster.
    pub top_towns: Vec<TieredBreakdown>,
    /// Top subdivisions within each cluster.
    pub top_subdivisions: Vec<TieredBreakdown>,
    /// Tier the tier-filtered breakdown was computed for.
    pub target_tier: RiskTier,
    /// Global top towns among clusters of the target tier.
    pub target_tier_towns: Vec<TieredBreakdown>,
    /// K sweep diagnostics, when requested.
    pub selection: Option<KSelectionReport>,
}

/// Grouping key for trend and distribution counts.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrendGranularity {
    /// Monday through Sunday.
    DayOfWeek,
    /// Calendar month, 1-12, across all years.
    Month,
    /// Calendar year.
    Year,
    /// Year and month pairs.
    YearMonth,
    /// Evening peak hours versus the rest of the day.
    PeakHour,
    /// Crime type label.
    CrimeType,
    /// Town name.
    Town,
    /// Subdivision name, busiest first and capped.
    Subdivision,
    /// Severity label.
    Severity,
    /// Year and month pairs split by severity label.
    YearMonthSeverity,
}

impl TrendGranularity {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::DayOfWeek,
            Self::Month,
            Self::Year,
            Self::YearMonth,
            Self::PeakHour,
            Self::CrimeType,
            Self::Town,
            Self::Subdivision,
            Self::Severity,
            Self::YearMonthSeverity,
        ]
    }
}

/// Incident count for one trend bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendBucket {
    /// Sortable bucket key (e.g. `"0"`, `"2024-03"`).
    pub key: String,
    /// Display label (e.g. `"Monday"`).
    pub label: String,
    /// Incidents in the bucket.
    pub incident_count: u64,
}

/// Counts for one granularity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSeries {
    /// Grouping used.
    pub granularity: TrendGranularity,
    /// Buckets in presentation order.
    pub buckets: Vec<TrendBucket>,
}

/// Trend and distribution report across every granularity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendReport {
    /// Incidents considered.
    pub incident_count: u64,
    /// Incidents without a timestamp, skipped from temporal series.
    pub undated_count: u64,
    /// One series per granularity.
    pub series: Vec<TrendSeries>,
}
