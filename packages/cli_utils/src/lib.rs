#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the DIME binaries.
//!
//! [`init_logger`] installs `pretty_env_logger` behind
//! `indicatif-log-bridge`, so `log::info!` lines are printed above the
//! enrichment progress bar instead of tearing through it.
//! [`IndicatifProgress`] renders the pipeline's [`ProgressCallback`].

use std::sync::Arc;
use std::time::Duration;

use dime_source::progress::ProgressCallback;
use dime_source_models::DatasetDefinition;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// An `indicatif` [`ProgressBar`] that renders an enrichment run.
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Style to switch to once `set_total()` provides a known length.
    bar_style: ProgressStyle,
}

impl IndicatifProgress {
    /// Creates the per-record bar for one dataset.
    ///
    /// Starts as a spinner while the gazetteer and facilities are fetched
    /// and turns into a bar prefixed with the dataset id once
    /// [`ProgressCallback::set_total()`] is called. The orchestrator's
    /// messages (`<name> | <Kind>: <Zone>`) appear after the ETA.
    #[must_use]
    pub fn new(multi: &MultiProgress, dataset: &DatasetDefinition) -> Self {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix(dataset.id().to_string());
        bar.set_message(format!(
            "Fetching gazetteer and facilities for {}...",
            dataset.municipality
        ));

        let bar_style = ProgressStyle::with_template(
            "{prefix:.bold} {wide_bar:.cyan/dim} {pos}/{len} [{eta}] {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Self { bar, bar_style }
    }

    /// Same as [`IndicatifProgress::new`], shared as a [`ProgressCallback`].
    #[must_use]
    pub fn records_bar(
        multi: &MultiProgress,
        dataset: &DatasetDefinition,
    ) -> Arc<dyn ProgressCallback> {
        Arc::new(Self::new(multi, dataset))
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
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

/// Initializes the global logger wrapped in `indicatif-log-bridge`.
///
/// Returns the [`MultiProgress`] that all progress bars must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // Already set when called twice (tests).
    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();

    log::set_max_level(level);

    multi
}
