//! TOML run configuration.
//!
//! Every section and field is optional; a missing file means all defaults.
//! Command-line flags are applied on top of the loaded values.
//!
//! ```toml
//! [input]
//! path = "data/karachi_crime.csv"
//!
//! [columns]
//! latitude = "LAT"
//!
//! [clustering]
//! k = 5
//!
//! [risk]
//! upper = 0.8
//! target_tier = "MEDIUM"
//! ```

use std::path::{Path, PathBuf};

use crime_hotspot_analytics::kmeans::DEFAULT_MAX_ITERATIONS;
use crime_hotspot_analytics::pipeline::HotspotParams;
use crime_hotspot_analytics::selection::{DEFAULT_SAMPLE_SIZE, SelectionParams};
use crime_hotspot_analytics_models::{QuantileBreakpoints, RiskTier};
use crime_hotspot_source::ColumnMapping;
use serde::{Deserialize, Serialize};

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "hotspots.toml";

/// Errors that can occur while loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Config file path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`HotspotConfig`].
    #[error("Invalid config {path}: {source}")]
    Toml {
        /// Config file path.
        path: String,
        /// Underlying parse error.
        source: toml::de::Error,
    },
}

/// `[input]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Incident CSV to analyze.
    pub path: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/crime_incidents.csv"),
        }
    }
}

/// `[clustering]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Number of clusters.
    pub k: usize,
    /// Seed for initialization and sampling.
    pub seed: u64,
    /// Iteration cap.
    pub max_iterations: usize,
    /// Whether to z-score coordinates before clustering.
    pub standardize: bool,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        let defaults = HotspotParams::default();
        Self {
            k: defaults.k,
            seed: defaults.seed,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            standardize: defaults.standardize,
        }
    }
}

/// `[selection]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Whether `run` also sweeps candidate k values.
    pub enabled: bool,
    /// Smallest candidate k.
    pub k_min: usize,
    /// Largest candidate k.
    pub k_max: usize,
    /// Silhouette sample size.
    pub sample_size: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        let defaults = SelectionParams::default();
        Self {
            enabled: false,
            k_min: defaults.k_min,
            k_max: defaults.k_max,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

/// `[risk]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Quantile positions of the tier thresholds.
    #[serde(flatten)]
    pub breakpoints: QuantileBreakpoints,
    /// Tier used for the tier-filtered town breakdown.
    pub target_tier: RiskTier,
    /// Abort when every threshold collapses to one value.
    pub strict: bool,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            breakpoints: QuantileBreakpoints::default(),
            target_tier: RiskTier::High,
            strict: false,
        }
    }
}

/// `[report]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Locations kept per cluster.
    pub top_n_per_cluster: usize,
    /// Rows kept in the tier-filtered breakdown.
    pub top_n_per_tier: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let defaults = HotspotParams::default();
        Self {
            top_n_per_cluster: defaults.top_n_per_cluster,
            top_n_per_tier: defaults.top_n_per_tier,
        }
    }
}

/// `[output]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Artifact directory. Defaults to `data/generated` under the
    /// workspace root.
    pub dir: Option<PathBuf>,
}

/// Complete run configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotspotConfig {
    /// Input file.
    pub input: InputConfig,
    /// Header names of the input columns.
    pub columns: ColumnMapping,
    /// Clustering parameters.
    pub clustering: ClusteringConfig,
    /// K sweep parameters.
    pub selection: SelectionConfig,
    /// Risk tier parameters.
    pub risk: RiskConfig,
    /// Breakdown sizes.
    pub report: ReportConfig,
    /// Output location.
    pub output: OutputConfig,
}

impl HotspotConfig {
    /// Parses a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the text is not a valid config.
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::de::from_str(text).map_err(|source| ConfigError::Toml {
            path: origin.display().to_string(),
            source,
        })
    }

    /// Loads the config from `path`, or from [`DEFAULT_CONFIG_FILE`] when
    /// no path is given.
    ///
    /// An explicitly given file must exist. A missing default file yields
    /// the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = path.map_or_else(
            || (Path::new(DEFAULT_CONFIG_FILE), false),
            |p| (p, true),
        );

        match std::fs::read_to_string(path) {
            Ok(text) => {
                log::info!("Loaded config from {}", path.display());
                Self::from_toml(&text, path)
            }
            Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No {DEFAULT_CONFIG_FILE} found, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Output directory, falling back to the generator's default.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.output
            .dir
            .clone()
            .unwrap_or_else(crime_hotspot_generate::output_dir)
    }

    /// K sweep parameters.
    #[must_use]
    pub const fn selection_params(&self) -> SelectionParams {
        SelectionParams {
            k_min: self.selection.k_min,
            k_max: self.selection.k_max,
            sample_size: self.selection.sample_size,
            seed: self.clustering.seed,
            max_iterations: self.clustering.max_iterations,
        }
    }

    /// Pipeline parameters.
    #[must_use]
    pub fn hotspot_params(&self) -> HotspotParams {
        HotspotParams {
            k: self.clustering.k,
            seed: self.clustering.seed,
            max_iterations: self.clustering.max_iterations,
            standardize: self.clustering.standardize,
            breakpoints: self.risk.breakpoints,
            top_n_per_cluster: self.report.top_n_per_cluster,
            top_n_per_tier: self.report.top_n_per_tier,
            target_tier: self.risk.target_tier,
            strict_tiers: self.risk.strict,
            selection: self
                .selection
                .enabled
                .then(|| self.selection_params()),
        }
    }
}
