//! Quantile-based risk tiers.
//!
//! Thresholds are quantiles of the per-cluster incident shares (not of raw
//! incidents), interpolated linearly between closest ranks. Tiers use
//! half-open intervals closed on the lower bound:
//!
//! | share            | tier      |
//! |------------------|-----------|
//! | `>= q3`          | `High`    |
//! | `[q2, q3)`       | `Medium`  |
//! | `[q1, q2)`       | `Low`     |
//! | `< q1`           | `VeryLow` |
//!
//! When every cluster has the same share the three thresholds coincide and
//! every cluster lands in `High`. That is the expected outcome of the rule;
//! the assessment flags it as degenerate so callers can tell.

use crime_hotspot_analytics_models::{
    ClusterSummary, QuantileBreakpoints, RankedCluster, RiskThresholds, RiskTier,
};

use crate::HotspotError;

/// Linear-interpolated quantile of an ascending slice.
///
/// # Panics
///
/// Panics if `sorted` is empty.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    assert!(!sorted.is_empty(), "quantile of an empty sequence");
    let pos = (sorted.len() - 1) as f64 * q;
    let lower = pos.floor() as usize;
    let frac = pos - pos.floor();
    if frac == 0.0 || lower + 1 >= sorted.len() {
        return sorted[lower.min(sorted.len() - 1)];
    }
    (sorted[lower + 1] - sorted[lower]).mul_add(frac, sorted[lower])
}

/// Validates quantile breakpoints.
///
/// # Errors
///
/// Returns [`HotspotError::InvalidQuantiles`] unless
/// `0 <= lower <= middle <= upper <= 1`.
pub fn validate_breakpoints(breakpoints: &QuantileBreakpoints) -> Result<(), HotspotError> {
    let QuantileBreakpoints {
        lower,
        middle,
        upper,
    } = *breakpoints;
    let ordered = (0.0..=1.0).contains(&lower)
        && (0.0..=1.0).contains(&upper)
        && lower <= middle
        && middle <= upper;
    if ordered {
        Ok(())
    } else {
        Err(HotspotError::InvalidQuantiles {
            lower,
            middle,
            upper,
        })
    }
}

/// Computes share thresholds over the given shares.
///
/// # Errors
///
/// * [`HotspotError::EmptyInput`] if `shares` is empty.
/// * [`HotspotError::InvalidQuantiles`] for unordered breakpoints.
pub fn thresholds(
    shares: &[f64],
    breakpoints: &QuantileBreakpoints,
) -> Result<RiskThresholds, HotspotError> {
    validate_breakpoints(breakpoints)?;
    if shares.is_empty() {
        return Err(HotspotError::EmptyInput {
            stage: "risk classification",
        });
    }

    let mut sorted = shares.to_vec();
    sorted.sort_by(f64::total_cmp);

    Ok(RiskThresholds {
        q1: quantile(&sorted, breakpoints.lower),
        q2: quantile(&sorted, breakpoints.middle),
        q3: quantile(&sorted, breakpoints.upper),
    })
}

/// Maps a share to its tier.
#[must_use]
pub fn classify(share: f64, thresholds: &RiskThresholds) -> RiskTier {
    if share >= thresholds.q3 {
        RiskTier::High
    } else if share >= thresholds.q2 {
        RiskTier::Medium
    } else if share >= thresholds.q1 {
        RiskTier::Low
    } else {
        RiskTier::VeryLow
    }
}

/// Tiered clusters plus the thresholds that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    /// Thresholds computed from the cluster shares.
    pub thresholds: RiskThresholds,
    /// Clusters in rank order with their tiers.
    pub clusters: Vec<RankedCluster>,
    /// Whether all thresholds coincide.
    pub degenerate: bool,
}

impl RiskAssessment {
    /// Turns a degenerate assessment into an error.
    ///
    /// # Errors
    ///
    /// Returns [`HotspotError::DegenerateQuantiles`] when all thresholds
    /// coincide.
    pub const fn ensure_distinct(&self) -> Result<(), HotspotError> {
        if self.degenerate {
            Err(HotspotError::DegenerateQuantiles {
                threshold: self.thresholds.q3,
            })
        } else {
            Ok(())
        }
    }

    /// Tier of a cluster, if it was assessed.
    #[must_use]
    pub fn tier_of(&self, cluster_id: usize) -> Option<RiskTier> {
        self.clusters
            .iter()
            .find(|c| c.summary.cluster_id == cluster_id)
            .map(|c| c.risk_level)
    }
}

/// Assigns a tier to every cluster summary.
///
/// Output is ordered by descending share, ties by ascending cluster id,
/// with `rank` starting at 1.
///
/// # Errors
///
/// See [`thresholds`].
pub fn assess(
    summaries: &[ClusterSummary],
    breakpoints: &QuantileBreakpoints,
) -> Result<RiskAssessment, HotspotError> {
    let shares: Vec<f64> = summaries.iter().map(|s| s.incident_share).collect();
    let thresholds = thresholds(&shares, breakpoints)?;
    let degenerate = thresholds.is_collapsed();

    if degenerate {
        log::warn!(
            "All {} clusters share the same incident share ({}): risk tiers collapsed",
            summaries.len(),
            thresholds.q3
        );
    }

    let mut ordered: Vec<&ClusterSummary> = summaries.iter().collect();
    ordered.sort_by(|a, b| {
        b.incident_share
            .total_cmp(&a.incident_share)
            .then(a.cluster_id.cmp(&b.cluster_id))
    });

    let clusters = ordered
        .into_iter()
        .enumerate()
        .map(|(i, summary)| RankedCluster {
            rank: i + 1,
            summary: summary.clone(),
            risk_level: classify(summary.incident_share, &thresholds),
        })
        .collect();

    Ok(RiskAssessment {
        thresholds,
        clusters,
        degenerate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summaries(shares: &[f64]) -> Vec<ClusterSummary> {
        shares
            .iter()
            .enumerate()
            .map(|(cluster_id, &incident_share)| ClusterSummary {
                cluster_id,
                centroid_latitude: 0.0,
                centroid_longitude: 0.0,
                incident_count: 0,
                incident_share,
            })
            .collect()
    }

    fn tiers_by_cluster(assessment: &RiskAssessment, n: usize) -> Vec<RiskTier> {
        (0..n).map(|id| assessment.tier_of(id).unwrap()).collect()
    }

    #[test]
    fn four_cluster_thresholds_and_tiers() {
        let assessment = assess(
            &summaries(&[0.10, 0.15, 0.30, 0.45]),
            &QuantileBreakpoints::default(),
        )
        .unwrap();

        let t = assessment.thresholds;
        assert!((t.q1 - 0.1375).abs() < 1e-12);
        assert!((t.q2 - 0.225).abs() < 1e-12);
        assert!((t.q3 - 0.3375).abs() < 1e-12);
        assert_eq!(
            tiers_by_cluster(&assessment, 4),
            vec![
                RiskTier::VeryLow,
                RiskTier::Low,
                RiskTier::Medium,
                RiskTier::High
            ]
        );
        assert!(!assessment.degenerate);
    }

    #[test]
    fn boundaries_are_closed_below() {
        // Five shares put q1/q2/q3 exactly on the 2nd/3rd/4th values.
        let assessment = assess(
            &summaries(&[0.10, 0.15, 0.20, 0.25, 0.30]),
            &QuantileBreakpoints::default(),
        )
        .unwrap();

        assert_eq!(
            tiers_by_cluster(&assessment, 5),
            vec![
                RiskTier::VeryLow,
                RiskTier::Low,
                RiskTier::Medium,
                RiskTier::High,
                RiskTier::High
            ]
        );
    }

    #[test]
    fn share_equal_to_q3_is_high() {
        let t = RiskThresholds {
            q1: 0.1,
            q2: 0.2,
            q3: 0.3,
        };
        assert_eq!(classify(0.3, &t), RiskTier::High);
        assert_eq!(classify(0.2, &t), RiskTier::Medium);
        assert_eq!(classify(0.1, &t), RiskTier::Low);
        assert_eq!(classify(0.099, &t), RiskTier::VeryLow);
    }

    #[test]
    fn equal_shares_collapse_to_high() {
        let assessment = assess(
            &summaries(&[0.25, 0.25, 0.25, 0.25]),
            &QuantileBreakpoints::default(),
        )
        .unwrap();

        assert!(assessment.degenerate);
        assert!(
            assessment
                .clusters
                .iter()
                .all(|c| c.risk_level == RiskTier::High)
        );
        assert!(matches!(
            assessment.ensure_distinct(),
            Err(HotspotError::DegenerateQuantiles { .. })
        ));
    }

    #[test]
    fn ranks_follow_share_then_cluster_id() {
        let assessment = assess(
            &summaries(&[0.2, 0.4, 0.2, 0.2]),
            &QuantileBreakpoints::default(),
        )
        .unwrap();
        let order: Vec<(usize, usize)> = assessment
            .clusters
            .iter()
            .map(|c| (c.rank, c.summary.cluster_id))
            .collect();
        assert_eq!(order, vec![(1, 1), (2, 0), (3, 2), (4, 3)]);
    }

    #[test]
    fn classification_is_repeatable() {
        let input = summaries(&[0.05, 0.6, 0.2, 0.15]);
        let a = assess(&input, &QuantileBreakpoints::default()).unwrap();
        let b = assess(&input, &QuantileBreakpoints::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn custom_breakpoints_shift_tiers() {
        let breakpoints = QuantileBreakpoints {
            lower: 0.0,
            middle: 0.0,
            upper: 1.0,
        };
        let assessment = assess(&summaries(&[0.1, 0.3, 0.6]), &breakpoints).unwrap();
        assert_eq!(
            tiers_by_cluster(&assessment, 3),
            vec![RiskTier::Medium, RiskTier::Medium, RiskTier::High]
        );
    }

    #[test]
    fn rejects_unordered_breakpoints() {
        let breakpoints = QuantileBreakpoints {
            lower: 0.6,
            middle: 0.5,
            upper: 0.9,
        };
        assert!(matches!(
            thresholds(&[0.5, 0.5], &breakpoints),
            Err(HotspotError::InvalidQuantiles { .. })
        ));
    }

    #[test]
    fn no_clusters_is_empty_input() {
        assert!(matches!(
            assess(&[], &QuantileBreakpoints::default()),
            Err(HotspotError::EmptyInput { .. })
        ));
    }

    #[test]
    fn quantile_interpolates_linearly() {
        let sorted = [1.0, 2.0, 4.0];
        assert!((quantile(&sorted, 0.0) - 1.0).abs() < f64::EPSILON);
        assert!((quantile(&sorted, 0.75) - 3.0).abs() < f64::EPSILON);
        assert!((quantile(&sorted, 1.0) - 4.0).abs() < f64::EPSILON);
        assert!((quantile(&[7.0], 0.3) - 7.0).abs() < f64::EPSILON);
    }
}
