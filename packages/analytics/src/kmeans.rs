//! Lloyd-style k-means over 2-D feature vectors.
//!
//! Centroids are initialized with k-means++ from a [`StdRng`] seeded with
//! [`KMeansParams::seed`], then refined by alternating nearest-centroid
//! assignment and mean recomputation until the assignment stops changing or
//! the iteration cap is hit. Everything runs on one thread in a fixed order,
//! so identical input and seed reproduce identical centroids bit for bit.
//!
//! Empty clusters: before each mean recomputation, every cluster left
//! without points is re-seeded (lowest id first) with the point farthest
//! from its current centroid, drawn only from clusters that hold more than
//! one point. When every candidate sits exactly on its centroid (fewer
//! distinct locations than k) the cluster stays empty and is reported by
//! [`KMeansModel::empty_clusters`].

use crime_hotspot_analytics_models::ClusterAssignment;
use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng as _};

use crate::HotspotError;
use crate::features::{Point, squared_distance};

/// Iteration cap used when none is configured.
pub const DEFAULT_MAX_ITERATIONS: usize = 300;

/// Parameters for a single k-means fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KMeansParams {
    /// Number of clusters.
    pub k: usize,
    /// Seed for centroid initialization.
    pub seed: u64,
    /// Maximum number of assign/update rounds.
    pub max_iterations: usize,
}

impl KMeansParams {
    /// Creates parameters with the default iteration cap.
    #[must_use]
    pub const fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            seed,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Overrides the iteration cap.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// A fitted partition.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansModel {
    centroids: Vec<Point>,
    assignment: ClusterAssignment,
    inertia: f64,
    iterations: usize,
    converged: bool,
}

impl KMeansModel {
    /// Centroids in clustering space, indexed by cluster id.
    #[must_use]
    pub fn centroids(&self) -> &[Point] {
        &self.centroids
    }

    /// Cluster id per input point.
    #[must_use]
    pub const fn assignment(&self) -> &ClusterAssignment {
        &self.assignment
    }

    /// Consumes the model, returning the assignment.
    #[must_use]
    pub fn into_assignment(self) -> ClusterAssignment {
        self.assignment
    }

    /// Sum of squared distances from each point to its centroid.
    #[must_use]
    pub const fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Assign/update rounds performed.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// Whether the assignment stabilized before the cap.
    #[must_use]
    pub const fn converged(&self) -> bool {
        self.converged
    }

    /// Cluster ids that ended with no points.
    #[must_use]
    pub fn empty_clusters(&self) -> Vec<usize> {
        self.assignment
            .counts()
            .iter()
            .enumerate()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| id)
            .collect()
    }
}

/// Fits k-means to `points`.
///
/// # Errors
///
/// * [`HotspotError::EmptyInput`] if `points` is empty.
/// * [`HotspotError::InvalidClusterCount`] if `k` is zero or exceeds the
///   number of points.
/// * [`HotspotError::InvalidParameter`] if `max_iterations` is zero.
pub fn fit(points: &[Point], params: &KMeansParams) -> Result<KMeansModel, HotspotError> {
    let n = points.len();
    if n == 0 {
        return Err(HotspotError::EmptyInput {
            stage: "clustering",
        });
    }
    if params.k == 0 || params.k > n {
        return Err(HotspotError::InvalidClusterCount {
            k: params.k,
            points: n,
        });
    }
    if params.max_iterations == 0 {
        return Err(HotspotError::InvalidParameter {
            name: "max_iterations",
            message: "must be at least 1".to_string(),
        });
    }

    let k = params.k;
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut centroids = init_plus_plus(points, k, &mut rng);
    let mut labels = assign(points, &centroids);

    let mut iterations = 0;
    let mut converged = false;

    while iterations < params.max_iterations {
        iterations += 1;

        reseed_empty(points, &mut labels, &centroids, k);
        centroids = recompute(points, &labels, &centroids);

        let next = assign(points, &centroids);
        if next == labels {
            converged = true;
            break;
        }
        labels = next;
    }

    if converged {
        log::debug!("k-means (k={k}) converged after {iterations} iterations");
    } else {
        log::debug!("k-means (k={k}) hit the iteration cap ({iterations})");
    }

    let inertia = points
        .iter()
        .zip(&labels)
        .map(|(p, &label)| squared_distance(p, &centroids[label]))
        .sum();

    let model = KMeansModel {
        centroids,
        assignment: ClusterAssignment::new(k, labels),
        inertia,
        iterations,
        converged,
    };

    let empty = model.empty_clusters();
    if !empty.is_empty() {
        log::warn!("k-means (k={k}) left clusters {empty:?} empty: fewer distinct locations than k");
    }

    Ok(model)
}

/// k-means++ seeding: the first centroid is uniform, each next one is drawn
/// with probability proportional to its squared distance from the nearest
/// chosen centroid.
fn init_plus_plus(points: &[Point], k: usize, rng: &mut StdRng) -> Vec<Point> {
    let n = points.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..n)]);

    let mut closest: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = closest.iter().sum();

        let chosen = if total > 0.0 {
            let target = rng.r#gen::<f64>() * total;
            let mut acc = 0.0;
            let mut chosen = closest.iter().rposition(|&d| d > 0.0).unwrap_or(0);
            for (i, &d) in closest.iter().enumerate() {
                acc += d;
                if acc > target {
                    chosen = i;
                    break;
                }
            }
            chosen
        } else {
            // Every point coincides with a chosen centroid.
            0
        };

        let centroid = points[chosen];
        for (dist, p) in closest.iter_mut().zip(points) {
            *dist = dist.min(squared_distance(p, &centroid));
        }
        centroids.push(centroid);
    }

    centroids
}

/// Nearest-centroid assignment. Ties go to the lowest cluster id.
fn assign(points: &[Point], centroids: &[Point]) -> Vec<usize> {
    points
        .iter()
        .map(|p| {
            let mut best = 0;
            let mut best_dist = f64::INFINITY;
            for (j, c) in centroids.iter().enumerate() {
                let d = squared_distance(p, c);
                if d < best_dist {
                    best_dist = d;
                    best = j;
                }
            }
            best
        })
        .collect()
}

fn cluster_counts(labels: &[usize], k: usize) -> Vec<usize> {
    let mut counts = vec![0; k];
    for &label in labels {
        counts[label] += 1;
    }
    counts
}

/// Moves one point into each empty cluster. `centroids` are the centroids
/// the current labels were assigned against.
fn reseed_empty(points: &[Point], labels: &mut [usize], centroids: &[Point], k: usize) {
    let mut counts = cluster_counts(labels, k);

    for empty in 0..k {
        if counts[empty] > 0 {
            continue;
        }

        let mut farthest: Option<(usize, f64)> = None;
        for (i, p) in points.iter().enumerate() {
            let label = labels[i];
            if counts[label] < 2 {
                continue;
            }
            let d = squared_distance(p, &centroids[label]);
            if d > 0.0 && farthest.is_none_or(|(_, best)| d > best) {
                farthest = Some((i, d));
            }
        }

        if let Some((i, _)) = farthest {
            log::debug!("Re-seeding empty cluster {empty} with point {i}");
            counts[labels[i]] -= 1;
            labels[i] = empty;
            counts[empty] = 1;
        }
    }
}

/// Mean of each cluster's points. Clusters without points keep their
/// previous centroid.
#[allow(clippy::cast_precision_loss)]
fn recompute(points: &[Point], labels: &[usize], previous: &[Point]) -> Vec<Point> {
    let k = previous.len();
    let mut sums = vec![[0.0f64; 2]; k];
    let mut counts = vec![0usize; k];

    for (p, &label) in points.iter().zip(labels) {
        sums[label][0] += p[0];
        sums[label][1] += p[1];
        counts[label] += 1;
    }

    sums.into_iter()
        .zip(counts)
        .zip(previous)
        .map(|((sum, count), prev)| {
            if count == 0 {
                *prev
            } else {
                let n = count as f64;
                [sum[0] / n, sum[1] / n]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn blobs() -> Vec<Point> {
        let centers = [[0.0, 0.0], [10.0, 10.0], [-10.0, 10.0]];
        let offsets = [[0.1, 0.0], [-0.1, 0.0], [0.0, 0.1], [0.0, -0.1], [0.05, 0.05]];
        centers
            .iter()
            .flat_map(|c| offsets.iter().map(move |o| [c[0] + o[0], c[1] + o[1]]))
            .collect()
    }

    #[test]
    fn assigns_every_point_to_a_valid_cluster() {
        let points = blobs();
        for k in 1..=points.len() {
            let model = fit(&points, &KMeansParams::new(k, 7)).unwrap();
            assert_eq!(model.assignment().len(), points.len());
            assert!(model.assignment().labels().iter().all(|&l| l < k));
            let distinct: BTreeSet<usize> =
                model.assignment().labels().iter().copied().collect();
            assert_eq!(distinct.len(), k, "k={k} should use every cluster");
        }
    }

    #[test]
    fn separates_well_spaced_blobs() {
        let points = blobs();
        let model = fit(&points, &KMeansParams::new(3, 42)).unwrap();
        let labels = model.assignment().labels();
        for blob in labels.chunks(5) {
            assert!(blob.iter().all(|&l| l == blob[0]));
        }
        let firsts: BTreeSet<usize> = labels.chunks(5).map(|b| b[0]).collect();
        assert_eq!(firsts.len(), 3);
        assert!(model.converged());
    }

    #[test]
    fn identical_seed_is_bit_for_bit_reproducible() {
        let points = blobs();
        let a = fit(&points, &KMeansParams::new(4, 99)).unwrap();
        let b = fit(&points, &KMeansParams::new(4, 99)).unwrap();
        assert_eq!(a.assignment(), b.assignment());
        for (ca, cb) in a.centroids().iter().zip(b.centroids()) {
            assert_eq!(ca[0].to_bits(), cb[0].to_bits());
            assert_eq!(ca[1].to_bits(), cb[1].to_bits());
        }
        assert_eq!(a.inertia().to_bits(), b.inertia().to_bits());
    }

    #[test]
    fn inertia_is_non_increasing_for_nested_blobs() {
        let points = blobs();
        let one = fit(&points, &KMeansParams::new(1, 1)).unwrap().inertia();
        let three = fit(&points, &KMeansParams::new(3, 1)).unwrap().inertia();
        assert!(three < one);
    }

    #[test]
    fn single_cluster_centroid_is_the_mean() {
        let points = vec![[0.0, 0.0], [2.0, 0.0], [4.0, 6.0]];
        let model = fit(&points, &KMeansParams::new(1, 3)).unwrap();
        assert_eq!(model.centroids(), &[[2.0, 2.0]]);
        assert!((model.inertia() - (8.0 + 4.0 + 20.0)).abs() < 1e-9);
    }

    #[test]
    fn k_equal_to_n_gives_singletons() {
        let points = vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let model = fit(&points, &KMeansParams::new(3, 5)).unwrap();
        assert!(model.inertia().abs() < f64::EPSILON);
        assert!(model.empty_clusters().is_empty());
    }

    #[test]
    fn duplicate_locations_leave_degenerate_clusters_empty() {
        let points = vec![[1.0, 1.0]; 4];
        let model = fit(&points, &KMeansParams::new(2, 11)).unwrap();
        assert_eq!(model.assignment().len(), 4);
        assert_eq!(model.empty_clusters(), vec![1]);
    }

    #[test]
    fn rejects_invalid_cluster_counts() {
        let points = vec![[0.0, 0.0], [1.0, 1.0]];
        assert!(matches!(
            fit(&points, &KMeansParams::new(0, 1)),
            Err(HotspotError::InvalidClusterCount { k: 0, points: 2 })
        ));
        assert!(matches!(
            fit(&points, &KMeansParams::new(3, 1)),
            Err(HotspotError::InvalidClusterCount { k: 3, points: 2 })
        ));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(
            fit(&[], &KMeansParams::new(1, 1)),
            Err(HotspotError::EmptyInput { .. })
        ));
    }

    #[test]
    fn reseeds_empty_cluster_from_farthest_point() {
        let points = vec![[0.0, 0.0], [1.0, 0.0], [9.0, 0.0]];
        let centroids = vec![[0.0, 0.0], [100.0, 0.0]];
        let mut labels = vec![0, 0, 0];
        reseed_empty(&points, &mut labels, &centroids, 2);
        assert_eq!(labels, vec![0, 0, 1]);
    }
}
