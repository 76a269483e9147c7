#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident analytics engine for stray animal reports.
//!
//! Turns a snapshot of geotagged, timestamped incident records into
//! ranked spatial hotspots, a six-month incident forecast, a greedy
//! resource allocation plan and portfolio-level recommendations.
//!
//! Every entry point is a pure function over its arguments. None of them
//! perform I/O, none of them return errors: malformed input produces an
//! empty or degenerate result, and an unexpected panic inside a component
//! is logged and converted into that same empty result.

pub mod aggregate;
pub mod allocation;
pub mod config;
pub mod forecast;
pub mod hotspots;
pub mod report;
pub mod strategy;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;

use thiserror::Error;

pub use aggregate::monthly_series;
pub use allocation::{allocate_resources, allocate_step, allocate_with_remainder};
pub use config::AnalyticsConfig;
pub use forecast::{
    ConfidenceHeuristic, VarianceDecay, analyze_trend, forecast, forecast_with,
};
pub use hotspots::detect_hotspots;
pub use report::build_report;
pub use strategy::generate_strategic_recommendations;

/// Errors that can occur while loading analytics configuration.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration TOML could not be parsed.
    #[error("Invalid config TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration parsed but holds unusable values.
    #[error("Invalid config: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },
}

/// Runs one component, converting a panic into `fallback`.
///
/// Inputs are only borrowed immutably and results are built fresh, so a
/// panic can't leave anything half-updated behind.
pub(crate) fn guard_or<T>(component: &str, fallback: T, f: impl FnOnce() -> T) -> T {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        log::error!("{component} failed, returning empty result: {detail}");
        fallback
    })
}

/// [`guard_or`] with the type's default as the fallback.
pub(crate) fn guarded<T: Default>(component: &str, f: impl FnOnce() -> T) -> T {
    guard_or(component, T::default(), f)
}
