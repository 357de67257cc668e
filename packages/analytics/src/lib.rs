#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hotspot detection over crime incident coordinates.
//!
//! The pipeline runs strictly in order, each stage consuming the complete
//! output of the previous one:
//!
//! 1. [`features`] projects incidents onto `[latitude, longitude]`,
//!    optionally standardized.
//! 2. [`selection`] sweeps candidate cluster counts for elbow and
//!    silhouette diagnostics (advisory, never picks k).
//! 3. [`kmeans`] partitions the points into k clusters.
//! 4. [`ranking`] turns the partition into per-cluster summaries ordered by
//!    incident share.
//! 5. [`risk`] buckets the summaries into quantile-based risk tiers.
//! 6. [`report`] joins clusters back to town and subdivision names.
//!
//! [`pipeline::run_pipeline`] wires the stages together. [`trends`] is an
//! independent temporal aggregation over the same incidents.

pub mod features;
pub mod kmeans;
pub mod pipeline;
pub mod ranking;
pub mod report;
pub mod risk;
pub mod selection;
pub mod trends;

use thiserror::Error;

/// Errors that can occur while running the hotspot pipeline.
#[derive(Debug, Error)]
pub enum HotspotError {
    /// Requested cluster count is outside `[1, N]`.
    #[error("Invalid cluster count {k}: must be between 1 and {points}")]
    InvalidClusterCount {
        /// Requested cluster count.
        k: usize,
        /// Number of points available.
        points: usize,
    },

    /// A stage received zero incidents.
    #[error("No incidents available for {stage}")]
    EmptyInput {
        /// Stage that received the empty input.
        stage: &'static str,
    },

    /// Every cluster has the same share, so all tiers collapsed into one.
    #[error("Risk quantiles collapsed: every threshold equals {threshold}")]
    DegenerateQuantiles {
        /// The single threshold value.
        threshold: f64,
    },

    /// Quantile breakpoints are not ordered within `[0, 1]`.
    #[error("Invalid quantile breakpoints ({lower}, {middle}, {upper}): expected 0 <= lower <= middle <= upper <= 1")]
    InvalidQuantiles {
        /// Lower breakpoint.
        lower: f64,
        /// Middle breakpoint.
        middle: f64,
        /// Upper breakpoint.
        upper: f64,
    },

    /// A pipeline parameter is out of range or inputs are inconsistent.
    #[error("Invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Description of what went wrong.
        message: String,
    },
}
