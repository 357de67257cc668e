//! Feature preparation for spatial clustering.
//!
//! Incidents are projected onto `[latitude, longitude]`. When
//! standardization is enabled each axis is z-scored with the population
//! standard deviation, and the fitted [`Standardizer`] is kept so that
//! centroids can be reported back in degrees.

use crime_hotspot_source_models::Incident;
use rand::SeedableRng as _;
use rand::rngs::StdRng;

/// A 2-D feature vector: `[latitude, longitude]` (possibly standardized).
pub type Point = [f64; 2];

/// Squared Euclidean distance between two points.
#[inline]
#[must_use]
pub fn squared_distance(a: &Point, b: &Point) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx.mul_add(dx, dy * dy)
}

/// Per-axis z-score transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Standardizer {
    mean: Point,
    scale: Point,
}

impl Standardizer {
    /// Fits means and population standard deviations. Axes with zero
    /// variance keep a unit scale so the transform stays invertible.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(points: &[Point]) -> Self {
        if points.is_empty() {
            return Self {
                mean: [0.0, 0.0],
                scale: [1.0, 1.0],
            };
        }

        let n = points.len() as f64;
        let mut mean = [0.0, 0.0];
        for p in points {
            mean[0] += p[0];
            mean[1] += p[1];
        }
        mean[0] /= n;
        mean[1] /= n;

        let mut var = [0.0, 0.0];
        for p in points {
            var[0] += (p[0] - mean[0]).powi(2);
            var[1] += (p[1] - mean[1]).powi(2);
        }

        let scale = var.map(|v| {
            let std = (v / n).sqrt();
            if std > 0.0 { std } else { 1.0 }
        });

        Self { mean, scale }
    }

    /// Maps a raw point into standardized space.
    #[must_use]
    pub fn transform(&self, p: Point) -> Point {
        [
            (p[0] - self.mean[0]) / self.scale[0],
            (p[1] - self.mean[1]) / self.scale[1],
        ]
    }

    /// Maps a standardized point back to raw coordinates.
    #[must_use]
    pub fn inverse(&self, p: Point) -> Point {
        [
            p[0].mul_add(self.scale[0], self.mean[0]),
            p[1].mul_add(self.scale[1], self.mean[1]),
        ]
    }
}

/// Clustering input: one feature vector per incident, index-aligned with
/// the incident table.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    points: Vec<Point>,
    standardizer: Option<Standardizer>,
}

impl FeatureMatrix {
    /// Projects incidents onto `[latitude, longitude]`.
    #[must_use]
    pub fn from_incidents(incidents: &[Incident], standardize: bool) -> Self {
        let raw: Vec<Point> = incidents
            .iter()
            .map(|i| [i.latitude, i.longitude])
            .collect();
        Self::from_points(raw, standardize)
    }

    /// Builds a matrix from raw coordinates.
    #[must_use]
    pub fn from_points(raw: Vec<Point>, standardize: bool) -> Self {
        if standardize {
            let standardizer = Standardizer::fit(&raw);
            let points = raw.into_iter().map(|p| standardizer.transform(p)).collect();
            Self {
                points,
                standardizer: Some(standardizer),
            }
        } else {
            Self {
                points: raw,
                standardizer: None,
            }
        }
    }

    /// Feature vectors in clustering space.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of feature vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the matrix is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the features were standardized.
    #[must_use]
    pub const fn is_standardized(&self) -> bool {
        self.standardizer.is_some()
    }

    /// Maps a point from clustering space back to `[latitude, longitude]`.
    #[must_use]
    pub fn to_coordinates(&self, p: Point) -> Point {
        self.standardizer.map_or(p, |s| s.inverse(p))
    }

    /// Draws a reproducible sample of `size` rows without replacement.
    ///
    /// Sampled rows keep their original relative order. A `size` at or
    /// above [`Self::len`] returns the full matrix.
    #[must_use]
    pub fn sample(&self, size: usize, seed: u64) -> Self {
        if size >= self.points.len() {
            return self.clone();
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut indices = rand::seq::index::sample(&mut rng, self.points.len(), size).into_vec();
        indices.sort_unstable();

        Self {
            points: indices.into_iter().map(|i| self.points[i]).collect(),
            standardizer: self.standardizer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardized_axes_have_zero_mean_unit_variance() {
        let matrix =
            FeatureMatrix::from_points(vec![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]], true);
        let pts = matrix.points();
        let mean_lat: f64 = pts.iter().map(|p| p[0]).sum::<f64>() / 3.0;
        let var_lat: f64 = pts.iter().map(|p| p[0].powi(2)).sum::<f64>() / 3.0;
        assert!(mean_lat.abs() < 1e-12);
        assert!((var_lat - 1.0).abs() < 1e-12);
    }

    #[test]
    fn inverse_restores_degrees() {
        let matrix = FeatureMatrix::from_points(vec![[24.8, 67.0], [24.9, 67.2]], true);
        let back = matrix.to_coordinates(matrix.points()[1]);
        assert!((back[0] - 24.9).abs() < 1e-9);
        assert!((back[1] - 67.2).abs() < 1e-9);
    }

    #[test]
    fn constant_axis_keeps_unit_scale() {
        let matrix = FeatureMatrix::from_points(vec![[5.0, 1.0], [5.0, 2.0]], true);
        assert!(matrix.points().iter().all(|p| p[0].abs() < f64::EPSILON));
        let back = matrix.to_coordinates(matrix.points()[0]);
        assert!((back[0] - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn raw_features_pass_through() {
        let matrix = FeatureMatrix::from_points(vec![[1.5, 2.5]], false);
        assert!(!matrix.is_standardized());
        assert_eq!(matrix.points(), &[[1.5, 2.5]]);
        assert_eq!(matrix.to_coordinates([1.5, 2.5]), [1.5, 2.5]);
    }

    #[test]
    fn sampling_is_reproducible() {
        let raw: Vec<Point> = (0..100).map(|i| [f64::from(i), 0.0]).collect();
        let matrix = FeatureMatrix::from_points(raw, false);
        let a = matrix.sample(10, 42);
        let b = matrix.sample(10, 42);
        assert_eq!(a, b);
        assert_eq!(a.len(), 10);
        assert!(a.points().windows(2).all(|w| w[0][0] < w[1][0]));
    }

    #[test]
    fn oversized_sample_returns_everything() {
        let matrix = FeatureMatrix::from_points(vec![[0.0, 0.0], [1.0, 1.0]], false);
        assert_eq!(matrix.sample(50, 1).len(), 2);
    }
}
