//! Diagnostic sweep over candidate cluster counts.
//!
//! For each k the sweep records the inertia of a full fit (elbow curve) and,
//! for k >= 2, the mean silhouette coefficient of a fit on a seeded sample.
//! Nothing here picks k for the pipeline; the report is advisory. Problems
//! with the sweep parameters shrink the sweep instead of failing it.

use crime_hotspot_analytics_models::{ElbowPoint, KSelectionReport, SilhouettePoint};
use crime_hotspot_source::progress::ProgressCallback;

use crate::HotspotError;
use crate::features::{FeatureMatrix, Point, squared_distance};
use crate::kmeans::{self, DEFAULT_MAX_ITERATIONS, KMeansParams};

/// Default silhouette sample size.
pub const DEFAULT_SAMPLE_SIZE: usize = 3000;

/// Parameters for a k sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionParams {
    /// Smallest candidate k (clamped to at least 1).
    pub k_min: usize,
    /// Largest candidate k.
    pub k_max: usize,
    /// Points drawn for silhouette scoring.
    pub sample_size: usize,
    /// Seed for both the sample draw and every fit.
    pub seed: u64,
    /// Iteration cap for every fit.
    pub max_iterations: usize,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self {
            k_min: 1,
            k_max: 10,
            sample_size: DEFAULT_SAMPLE_SIZE,
            seed: 42,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Runs the elbow and silhouette sweep.
///
/// # Errors
///
/// Returns [`HotspotError::EmptyInput`] if `features` is empty. Fit errors
/// for individual k values cannot occur because k is clamped to the data.
pub fn select_k(
    features: &FeatureMatrix,
    params: &SelectionParams,
    progress: &dyn ProgressCallback,
) -> Result<KSelectionReport, HotspotError> {
    let n = features.len();
    if n == 0 {
        return Err(HotspotError::EmptyInput {
            stage: "k selection",
        });
    }

    let k_min = params.k_min.max(1);
    if k_min > params.k_max {
        log::warn!(
            "Empty k range [{}, {}]: skipping k selection",
            params.k_min,
            params.k_max
        );
    }

    let elbow_max = params.k_max.min(n);
    if elbow_max < params.k_max {
        log::warn!("Elbow sweep capped at k={elbow_max}: only {n} incidents");
    }

    let sample_size = if params.sample_size == 0 || params.sample_size > n {
        log::warn!(
            "Silhouette sample size {} unusable for {n} incidents, using {n}",
            params.sample_size
        );
        n
    } else {
        params.sample_size
    };
    let sample = features.sample(sample_size, params.seed);

    // Silhouette needs at least one point outside every cluster.
    let silhouette_min = k_min.max(2);
    let silhouette_max = params.k_max.min(sample.len().saturating_sub(1));

    let elbow_steps = (elbow_max + 1).saturating_sub(k_min);
    let silhouette_steps = (silhouette_max + 1).saturating_sub(silhouette_min);
    progress.set_total((elbow_steps + silhouette_steps) as u64);
    progress.set_message("Sweeping candidate k".to_string());

    let mut elbow = Vec::new();
    for k in k_min..=elbow_max {
        let model = kmeans::fit(features.points(), &fit_params(k, params))?;
        log::debug!("k={k}: inertia={}", model.inertia());
        elbow.push(ElbowPoint {
            k,
            inertia: model.inertia(),
        });
        progress.inc(1);
    }

    let mut silhouette = Vec::new();
    for k in silhouette_min..=silhouette_max {
        let model = kmeans::fit(sample.points(), &fit_params(k, params))?;
        if let Some(score) = silhouette_score(sample.points(), model.assignment().labels(), k) {
            log::debug!("k={k}: silhouette={score}");
            silhouette.push(SilhouettePoint {
                k,
                silhouette_score: score,
            });
        } else {
            log::warn!("k={k}: silhouette undefined (fewer than two non-empty clusters)");
        }
        progress.inc(1);
    }

    progress.finish(format!(
        "Swept {} elbow and {} silhouette candidates",
        elbow.len(),
        silhouette.len()
    ));

    Ok(KSelectionReport {
        elbow,
        silhouette,
        sample_size: sample.len(),
    })
}

/// Candidate k with the best silhouette score, for display only. The
/// pipeline never uses it.
#[must_use]
pub fn suggest_k(report: &KSelectionReport) -> Option<usize> {
    report.best_silhouette_k()
}

/// Logs [`suggest_k`] next to the swept range.
pub fn log_suggestion(report: &KSelectionReport) {
    match suggest_k(report) {
        Some(k) => log::info!(
            "Highest silhouette score at k={k} (swept {} candidates)",
            report.silhouette.len()
        ),
        None => log::info!("No silhouette scores computed; no k suggested"),
    }
}

const fn fit_params(k: usize, params: &SelectionParams) -> KMeansParams {
    KMeansParams::new(k, params.seed).with_max_iterations(params.max_iterations)
}

/// Mean silhouette coefficient of a labeling.
///
/// For each point, `a` is the mean distance to the other members of its
/// cluster and `b` the smallest mean distance to any other non-empty
/// cluster; its coefficient is `(b - a) / max(a, b)`, and 0 for members of
/// singleton clusters. Returns `None` unless there are at least two
/// non-empty clusters and fewer clusters than points.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn silhouette_score(points: &[Point], labels: &[usize], k: usize) -> Option<f64> {
    let n = points.len();
    if n != labels.len() || n < 2 {
        return None;
    }

    let mut sizes = vec![0usize; k];
    for &label in labels {
        sizes[label] += 1;
    }
    let non_empty = sizes.iter().filter(|&&s| s > 0).count();
    if non_empty < 2 || non_empty >= n {
        return None;
    }

    let mut total = 0.0;
    let mut sums = vec![0.0f64; k];

    for (i, p) in points.iter().enumerate() {
        let own = labels[i];
        if sizes[own] == 1 {
            continue;
        }

        sums.iter_mut().for_each(|s| *s = 0.0);
        for (j, q) in points.iter().enumerate() {
            if i != j {
                sums[labels[j]] += squared_distance(p, q).sqrt();
            }
        }

        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = sums
            .iter()
            .zip(&sizes)
            .enumerate()
            .filter(|&(c, (_, &size))| c != own && size > 0)
            .map(|(_, (&sum, &size))| sum / size as f64)
            .fold(f64::INFINITY, f64::min);

        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }

    Some(total / n as f64)
}
