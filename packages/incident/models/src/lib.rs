#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident record types and the animal condition taxonomy.
//!
//! The reporting portal stores several kinds of incident (pending,
//! approved and rejected abuse reports, lost and found pet posts) in
//! separate collections. The analytics engine consumes them as one flat
//! list of [`IncidentRecord`]s, merged with [`merge_sources`].
//!
//! Decoding is lenient: coordinates and timestamps that are missing or
//! malformed decode to `None`, and a condition that isn't a known label
//! decodes to [`AnimalCondition::Other`], instead of failing the whole
//! record, so a single bad post never hides the rest of the dataset.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Reported condition of the animal involved in an incident.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case", from = "Option<String>")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AnimalCondition {
    /// Deliberate harm by a person
    Abuse,
    /// Animals fighting, organized or otherwise
    Fighting,
    /// Visibly injured
    Injured,
    /// Visibly ill
    Sick,
    /// No visible problem
    Healthy,
    /// Anything the portal doesn't classify
    #[default]
    Other,
}

impl AnimalCondition {
    /// Whether this condition counts toward a hotspot's severity.
    #[must_use]
    pub const fn is_severe(self) -> bool {
        matches!(self, Self::Abuse | Self::Fighting)
    }
}

impl From<Option<String>> for AnimalCondition {
    fn from(value: Option<String>) -> Self {
        value
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or_default()
    }
}

/// The portal collection an incident record was read from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IncidentCategory {
    /// Abuse report awaiting moderation
    PendingReport,
    /// Abuse report confirmed by a moderator
    ApprovedReport,
    /// Abuse report rejected by a moderator
    RejectedReport,
    /// Owner looking for a missing pet
    LostPet,
    /// Someone holding a pet they found
    FoundPet,
}

impl IncidentCategory {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::PendingReport,
            Self::ApprovedReport,
            Self::RejectedReport,
            Self::LostPet,
            Self::FoundPet,
        ]
    }
}

/// One geotagged, timestamped incident as exported by the portal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    /// Latitude (WGS84). `None` when missing or not a number.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    /// Longitude (WGS84). `None` when missing or not a number.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
    /// Reported animal condition.
    #[serde(default, deserialize_with = "lenient_condition")]
    pub condition: AnimalCondition,
    /// Raw creation timestamp (ISO 8601).
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: Option<String>,
    /// Kind of animal (e.g. "dog", "cat").
    #[serde(default, deserialize_with = "lenient_string")]
    pub animal_type: Option<String>,
    /// Moderation or case status as stored by the portal.
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    /// Collection this record came from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<IncidentCategory>,
}

impl IncidentRecord {
    /// Returns `(latitude, longitude)` when both are present, finite and
    /// inside the valid WGS84 range.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = self.latitude?;
        let lng = self.longitude?;
        if !lat.is_finite() || !lng.is_finite() {
            return None;
        }
        if lat.abs() > 90.0 || lng.abs() > 180.0 {
            return None;
        }
        Some((lat, lng))
    }

    /// Parses [`Self::created_at`] into a UTC timestamp.
    #[must_use]
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }

    /// Whether the reported condition is severity-triggering.
    #[must_use]
    pub const fn is_severe(&self) -> bool {
        self.condition.is_severe()
    }
}

/// Flattens per-collection record lists into one list, stamping each
/// record with the collection it came from.
#[must_use]
pub fn merge_sources(sources: &[(IncidentCategory, Vec<IncidentRecord>)]) -> Vec<IncidentRecord> {
    sources
        .iter()
        .flat_map(|(category, records)| {
            records.iter().map(move |record| IncidentRecord {
                category: Some(*category),
                ..record.clone()
            })
        })
        .collect()
}

/// Parses an ISO 8601 timestamp into UTC.
///
/// Accepts RFC 3339 with an offset (`2024-01-15T14:30:00.000Z`), naive
/// date-times with or without fractional seconds (interpreted as UTC),
/// and bare dates (midnight UTC).
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

fn lenient_condition<'de, D>(deserializer: D) -> Result<AnimalCondition, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => AnimalCondition::from(Some(s)),
        _ => AnimalCondition::Other,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        _ => None,
    })
}
