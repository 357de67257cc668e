#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for the crime hotspot toolchain.
//!
//! [`init_logger`] installs `pretty_env_logger` behind
//! `indicatif-log-bridge`, so `log::info!` lines are printed above the
//! progress bars instead of tearing them. [`IndicatifProgress`] renders the
//! loader's and pipeline's [`ProgressCallback`] updates as bars added to the
//! returned [`MultiProgress`].

use std::sync::Arc;
use std::time::Duration;

use crime_hotspot_source::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

const SPINNER_TICK: Duration = Duration::from_millis(100);

/// Which stage of a run a bar tracks. Each kind has its own color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarKind {
    /// Reading incident rows; length unknown until the end.
    Load,
    /// Pipeline stages; length known up front.
    Stages,
    /// Candidate k sweep; length known once the sweep starts.
    Sweep,
}

impl BarKind {
    const fn color(self) -> &'static str {
        match self {
            Self::Load => "cyan",
            Self::Stages => "green",
            Self::Sweep => "yellow",
        }
    }

    fn spinner_template(self) -> String {
        format!("{{spinner:.{}}} {{msg}}", self.color())
    }

    fn bar_template(self) -> String {
        match self {
            Self::Stages => format!(
                "{{msg}} {{wide_bar:.{}/dim}} {{pos}}/{{len}} [{{elapsed_precise}}]",
                self.color()
            ),
            Self::Load | Self::Sweep => format!(
                "  {{msg}} {{wide_bar:.{}/dim}} {{pos}}/{{len}} {{percent}}% [{{eta}}]",
                self.color()
            ),
        }
    }

    fn spinner_style(self) -> ProgressStyle {
        ProgressStyle::with_template(&self.spinner_template())
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn bar_style(self) -> ProgressStyle {
        ProgressStyle::with_template(&self.bar_template())
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-")
    }
}

/// An `indicatif` [`ProgressBar`] that implements [`ProgressCallback`].
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Style to switch to once `set_total()` provides a known length.
    bar_style: ProgressStyle,
}

impl IndicatifProgress {
    /// Adds a bar of the given kind to `multi`.
    ///
    /// With `total: None` the bar starts as a spinner and becomes a full
    /// bar once [`ProgressCallback::set_total()`] is called.
    #[must_use]
    pub fn new(
        multi: &MultiProgress,
        kind: BarKind,
        message: &str,
        total: Option<u64>,
    ) -> Arc<dyn ProgressCallback> {
        let bar_style = kind.bar_style();
        let bar = if let Some(total) = total {
            let bar = multi.add(ProgressBar::new(total));
            bar.set_style(bar_style.clone());
            bar
        } else {
            let bar = multi.add(ProgressBar::new_spinner());
            bar.enable_steady_tick(SPINNER_TICK);
            bar.set_style(kind.spinner_style());
            bar
        };
        bar.set_message(message.to_string());

        Arc::new(Self { bar, bar_style })
    }

    /// Spinner for reading an incident file.
    #[must_use]
    pub fn load_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        Self::new(multi, BarKind::Load, message, None)
    }

    /// Bar for the fixed sequence of pipeline stages.
    #[must_use]
    pub fn stages_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        Self::new(multi, BarKind::Stages, message, None)
    }

    /// Bar for a candidate k sweep.
    #[must_use]
    pub fn sweep_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        Self::new(multi, BarKind::Sweep, message, None)
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.disable_steady_tick();
        self.bar.set_style(self.bar_style.clone());
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge` so that
/// `log::info!` and friends are suspended while progress bars redraw.
///
/// The level comes from `RUST_LOG`. Returns the [`MultiProgress`] that all
/// progress bars must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // Already set when called twice (e.g., in tests).
    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();

    log::set_max_level(level);

    multi
}
