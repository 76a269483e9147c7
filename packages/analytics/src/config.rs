//! Engine configuration loaded from TOML.
//!
//! The defaults live in `config/default.toml` and are embedded at compile
//! time. Deployments override them with a file of the same layout; any
//! section or key left out falls back to the embedded value.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stray_watch_analytics_models::{
    DEFAULT_EPS_DEGREES, DEFAULT_MIN_POINTS, HotspotParams, ResourcePool,
};

use crate::AnalyticsError;

const DEFAULT_CONFIG_TOML: &str = include_str!("../config/default.toml");

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyticsConfig {
    /// Clustering settings.
    #[serde(default)]
    pub hotspots: HotspotConfig,
    /// Resource pool available to the allocator and recommender.
    #[serde(default)]
    pub pool: ResourcePool,
}

/// Clustering settings, see [`HotspotParams`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HotspotConfig {
    /// Minimum records within the radius (seed included).
    #[serde(default = "default_min_points")]
    pub min_points: usize,
    /// Radius in decimal degrees.
    #[serde(default = "default_eps")]
    pub eps: f64,
    /// Radius in metres, replacing `eps` when set.
    #[serde(default)]
    pub max_distance_m: Option<f64>,
}

const fn default_min_points() -> usize {
    DEFAULT_MIN_POINTS
}

const fn default_eps() -> f64 {
    DEFAULT_EPS_DEGREES
}

impl Default for HotspotConfig {
    fn default() -> Self {
        Self {
            min_points: DEFAULT_MIN_POINTS,
            eps: DEFAULT_EPS_DEGREES,
            max_distance_m: None,
        }
    }
}

impl HotspotConfig {
    /// Builds detection parameters measured against `reference_time`.
    #[must_use]
    pub const fn to_params(&self, reference_time: DateTime<Utc>) -> HotspotParams {
        HotspotParams {
            min_points: self.min_points,
            eps: self.eps,
            max_distance_m: self.max_distance_m,
            reference_time,
        }
    }
}

impl AnalyticsConfig {
    /// Returns the embedded default configuration.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed. It is a compile-time
    /// constant, so a failure here is a development error caught by the
    /// tests below.
    #[must_use]
    pub fn default_config() -> Self {
        Self::from_toml_str(DEFAULT_CONFIG_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded default config: {e}"))
    }

    /// Parses and validates a configuration document.
    ///
    /// The document is layered over the embedded defaults key by key, so
    /// a file that sets only `pool.volunteers` keeps every other default.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Toml`] if the document doesn't parse or
    /// names unknown keys, and [`AnalyticsError::Config`] if it holds
    /// unusable values.
    pub fn from_toml_str(s: &str) -> Result<Self, AnalyticsError> {
        let mut merged: toml::Table = toml::from_str(DEFAULT_CONFIG_TOML)?;
        merge_tables(&mut merged, toml::from_str(s)?);
        let config: Self = toml::Value::Table(merged).try_into()?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Io`] if the file can't be read, otherwise
    /// the same errors as [`Self::from_toml_str`].
    pub fn from_path(path: &Path) -> Result<Self, AnalyticsError> {
        let contents = std::fs::read_to_string(path).map_err(|source| AnalyticsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        log::debug!("Loaded analytics config from {}", path.display());
        Ok(config)
    }

    /// Checks that every value is usable by the engine.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Config`] describing the first bad value.
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        let invalid = |message: String| Err(AnalyticsError::Config { message });

        if !(self.hotspots.eps.is_finite() && self.hotspots.eps > 0.0) {
            return invalid(format!(
                "hotspots.eps must be a positive number, got {}",
                self.hotspots.eps
            ));
        }
        if let Some(distance) = self.hotspots.max_distance_m
            && !(distance.is_finite() && distance > 0.0)
        {
            return invalid(format!(
                "hotspots.max_distance_m must be a positive number, got {distance}"
            ));
        }
        if self.hotspots.min_points == 0 {
            return invalid("hotspots.min_points must be at least 1".to_string());
        }
        if !(self.pool.budget.is_finite() && self.pool.budget >= 0.0) {
            return invalid(format!(
                "pool.budget must be a non-negative number, got {}",
                self.pool.budget
            ));
        }
        Ok(())
    }
}

/// Copies every key of `overrides` into `base`, descending into tables
/// that exist on both sides.
fn merge_tables(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        match value {
            toml::Value::Table(section)
                if matches!(base.get(&key), Some(toml::Value::Table(_))) =>
            {
                if let Some(toml::Value::Table(base_section)) = base.get_mut(&key) {
                    merge_tables(base_section, section);
                }
            }
            value => {
                base.insert(key, value);
            }
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self::default_config()
    }
}
