#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types for the incident analytics engine.
//!
//! Everything here is plain data that the dashboard, map layers and
//! exports consume verbatim, so every type serializes to `camelCase`
//! JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stray_watch_incident_models::IncidentRecord;
use strum_macros::{AsRefStr, Display, EnumString};

/// Default minimum neighbor count (including the seed) for a hotspot.
pub const DEFAULT_MIN_POINTS: usize = 2;

/// Default clustering radius in decimal degrees (about 1 km).
pub const DEFAULT_EPS_DEGREES: f64 = 0.01;

/// Metres per decimal degree of latitude, used to turn `eps` into a
/// great-circle radius.
pub const METRES_PER_DEGREE: f64 = 111_320.0;

/// Number of periods produced by every forecast.
pub const FORECAST_HORIZON: usize = 6;

/// A WGS84 position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

/// Parameters for hotspot detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotParams {
    /// Minimum records within the radius (seed included) to form a cluster.
    pub min_points: usize,
    /// Clustering radius in decimal degrees.
    pub eps: f64,
    /// Explicit radius in metres. Overrides `eps` when set.
    pub max_distance_m: Option<f64>,
    /// Point in time that record ages are measured against.
    pub reference_time: DateTime<Utc>,
}

impl HotspotParams {
    /// Great-circle neighbor radius in metres.
    #[must_use]
    pub fn radius_m(&self) -> f64 {
        self.max_distance_m
            .unwrap_or(self.eps * METRES_PER_DEGREE)
    }
}

impl Default for HotspotParams {
    fn default() -> Self {
        Self {
            min_points: DEFAULT_MIN_POINTS,
            eps: DEFAULT_EPS_DEGREES,
            max_distance_m: None,
            reference_time: Utc::now(),
        }
    }
}

/// A density cluster of incident records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    /// Rank-ordered identifier, starting at 1 for the highest priority.
    pub id: u32,
    /// Arithmetic mean of the member coordinates.
    pub center: GeoPoint,
    /// Number of member records.
    pub size: usize,
    /// Fraction of members reported as abuse or fighting.
    pub severity: f64,
    /// 1.0 for brand-new activity, falling to 0.0 at 30 days average age.
    pub recency: f64,
    /// Raw composite of size, severity and recency. Unbounded above
    /// because size enters unnormalized; see [`Hotspot::risk_factor`].
    pub risk: f64,
    /// Bounded ranking score in `[0, 1]`.
    pub priority: f64,
    /// The member records.
    pub markers: Vec<IncidentRecord>,
}

impl Hotspot {
    /// `risk` clamped to `[0, 1]`. Every score derived from risk uses
    /// this instead of the raw value.
    #[must_use]
    pub fn risk_factor(&self) -> f64 {
        self.risk.clamp(0.0, 1.0)
    }
}

/// One month of a count series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    /// Period label (e.g. "2025-01"). Empty when the caller didn't label it.
    #[serde(default)]
    pub period: String,
    /// Incident count for the period.
    pub value: f64,
}

impl SeriesPoint {
    /// An unlabeled point.
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Self {
            period: String::new(),
            value,
        }
    }
}

/// Trend label attached to forecasts and trend summaries.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrendLabel {
    /// Counts are growing.
    Increasing,
    /// Counts are shrinking.
    Decreasing,
    /// No meaningful change.
    Stable,
}

/// Sign of a fitted slope.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrendDirection {
    /// Positive slope.
    Up,
    /// Negative slope.
    Down,
    /// Zero slope.
    Flat,
}

/// One predicted future period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    /// Three-letter month label (e.g. "Jan").
    pub month: String,
    /// Predicted incident count.
    pub predicted: u64,
    /// Heuristic confidence, 0-100.
    pub confidence: u8,
    /// Trend of the fitted line.
    pub trend: TrendLabel,
}

/// Direction and fit quality of a historical series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSummary {
    /// Trend classification.
    pub trend: TrendLabel,
    /// OLS slope in incidents per month.
    pub slope: f64,
    /// R² as a percentage, 0-100.
    pub confidence: u8,
    /// Sign of the slope.
    pub direction: TrendDirection,
    /// Number of points the fit used.
    pub sample_size: usize,
    /// `true` when the series was too short to fit.
    pub insufficient_data: bool,
}

impl TrendSummary {
    /// The degenerate summary returned for series that are too short.
    #[must_use]
    pub const fn insufficient(sample_size: usize) -> Self {
        Self {
            trend: TrendLabel::Stable,
            slope: 0.0,
            confidence: 0,
            direction: TrendDirection::Flat,
            sample_size,
            insufficient_data: true,
        }
    }
}

impl Default for TrendSummary {
    fn default() -> Self {
        Self::insufficient(0)
    }
}

/// Finite counts of responders and supplies available to a campaign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResourcePool {
    /// Volunteers available for field work.
    pub volunteers: u32,
    /// Budget in whole currency units.
    pub budget: f64,
    /// Vehicles available for transport.
    pub vehicles: u32,
    /// Equipment kits (traps, crates, medical kits).
    pub equipment: u32,
}

impl ResourcePool {
    /// Whether this pool holds at least `other` of every resource.
    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        self.volunteers >= other.volunteers
            && self.budget >= other.budget
            && self.vehicles >= other.vehicles
            && self.equipment >= other.equipment
    }

    /// Removes `granted` from this pool, never going below zero.
    #[must_use]
    pub fn saturating_sub(self, granted: &Self) -> Self {
        Self {
            volunteers: self.volunteers.saturating_sub(granted.volunteers),
            budget: (self.budget - granted.budget).max(0.0),
            vehicles: self.vehicles.saturating_sub(granted.vehicles),
            equipment: self.equipment.saturating_sub(granted.equipment),
        }
    }

    /// Adds `other` to this pool.
    #[must_use]
    pub fn saturating_add(self, other: &Self) -> Self {
        Self {
            volunteers: self.volunteers.saturating_add(other.volunteers),
            budget: self.budget + other.budget,
            vehicles: self.vehicles.saturating_add(other.vehicles),
            equipment: self.equipment.saturating_add(other.equipment),
        }
    }
}

/// Ranking tier derived from a priority score.
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
pub enum PriorityLevel {
    /// Needs action now.
    Critical,
    /// Needs action soon.
    High,
    /// Plan for it.
    Medium,
    /// Keep an eye on it.
    Low,
}

impl PriorityLevel {
    /// Tiers a `[0, 1]` priority score: above 0.8 is critical, above 0.6
    /// high, above 0.4 medium.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score > 0.8 {
            Self::Critical
        } else if score > 0.6 {
            Self::High
        } else if score > 0.4 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Expected effect of an allocation on the hotspot.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum ExpectedImpact {
    /// Likely to resolve the hotspot.
    High,
    /// Likely to reduce incidents noticeably.
    Medium,
    /// Unlikely to change much on its own.
    Low,
}

/// Benefit-to-cost rating of an allocation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum CostBenefit {
    /// Ratio above 3.
    Excellent,
    /// Ratio above 2.
    Good,
    /// Ratio above 1.
    Fair,
    /// Ratio of 1 or less.
    Poor,
}

/// One step of a hotspot's action plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedAction {
    /// Short action name.
    pub action: String,
    /// Urgency of this step.
    pub priority: PriorityLevel,
    /// What the step involves.
    pub description: String,
    /// When it should happen.
    pub timeframe: String,
    /// What it needs, as a human-readable hint.
    pub resources: String,
}

/// The response plan for a single hotspot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAllocation {
    /// Identifier of the hotspot this plan is for.
    pub hotspot_id: u32,
    /// Center of the hotspot.
    pub zone: GeoPoint,
    /// Hotspot priority score.
    pub priority: f64,
    /// Tier of `priority`.
    pub priority_level: PriorityLevel,
    /// Ordered action plan.
    pub recommended_actions: Vec<RecommendedAction>,
    /// Resources actually granted from the pool.
    pub resource_allocation: ResourcePool,
    /// Expected effect of the plan.
    pub expected_impact: ExpectedImpact,
    /// When results should be visible.
    pub timeline: String,
    /// Benefit-to-cost rating.
    pub cost_benefit: CostBenefit,
    /// Estimated chance of success, always within `[0.1, 0.95]`.
    pub success_probability: f64,
    /// Set when the pool couldn't cover the full requirement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Kind of portfolio-level recommendation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecommendationType {
    /// Shift resources toward critical zones.
    ResourceReallocation,
    /// Recruit more volunteers.
    VolunteerRecruitment,
    /// Raise more money.
    Funding,
    /// Switch to emergency response procedures.
    EmergencyProtocol,
    /// Organize response by zone.
    ZoneManagement,
}

/// A portfolio-level recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategicRecommendation {
    /// Which rule produced this recommendation.
    #[serde(rename = "type")]
    pub kind: RecommendationType,
    /// Urgency.
    pub priority: PriorityLevel,
    /// What to do.
    pub recommendation: String,
    /// Why.
    pub rationale: String,
    /// By when.
    pub timeframe: String,
}

/// Aggregate counts behind the strategic recommendations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategicSummary {
    /// Number of hotspots considered.
    pub total_hotspots: usize,
    /// Hotspots with priority above 0.8.
    pub critical_hotspots: usize,
    /// Hotspots with priority above 0.6.
    pub high_priority_hotspots: usize,
    /// Sum of hotspot sizes.
    pub total_incidents: usize,
    /// Mean hotspot severity, 0 when there are no hotspots.
    pub avg_severity: f64,
    /// Volunteers in the pool.
    pub available_volunteers: u32,
    /// Budget in the pool.
    pub available_budget: f64,
    /// Incident load as a percentage of volunteer capacity (5 incidents
    /// per volunteer). `None` when there are no volunteers.
    pub resource_utilization: Option<u32>,
}

/// Recommendations plus the summary they were derived from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategicReport {
    /// Recommendations in rule order.
    pub recommendations: Vec<StrategicRecommendation>,
    /// Aggregate counts.
    pub summary: StrategicSummary,
}

/// Everything a dashboard refresh needs, computed from one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    /// The reference time the report was computed against.
    pub generated_at: DateTime<Utc>,
    /// Records supplied.
    pub total_records: usize,
    /// Records with usable coordinates.
    pub geolocated_records: usize,
    /// Ranked hotspots.
    pub hotspots: Vec<Hotspot>,
    /// One plan per hotspot, in priority order.
    pub allocations: Vec<ResourceAllocation>,
    /// Pool left after the allocation pass.
    pub remaining_pool: ResourcePool,
    /// Portfolio-level recommendations.
    pub strategy: StrategicReport,
    /// Monthly counts for the reference year.
    pub monthly: Vec<SeriesPoint>,
    /// Six-month forecast.
    pub forecast: Vec<ForecastPoint>,
    /// Trend of the monthly series.
    pub trend: TrendSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_level_thresholds() {
        assert_eq!(PriorityLevel::from_score(0.95), PriorityLevel::Critical);
        assert_eq!(PriorityLevel::from_score(0.8), PriorityLevel::High);
        assert_eq!(PriorityLevel::from_score(0.61), PriorityLevel::High);
        assert_eq!(PriorityLevel::from_score(0.5), PriorityLevel::Medium);
        assert_eq!(PriorityLevel::from_score(0.4), PriorityLevel::Low);
        assert_eq!(PriorityLevel::from_score(0.0), PriorityLevel::Low);
    }

    #[test]
    fn pool_covers_and_subtracts() {
        let pool = ResourcePool {
            volunteers: 10,
            budget: 5000.0,
            vehicles: 2,
            equipment: 3,
        };
        let need = ResourcePool {
            volunteers: 4,
            budget: 2000.0,
            vehicles: 1,
            equipment: 3,
        };
        assert!(pool.covers(&need));

        let left = pool.saturating_sub(&need);
        assert_eq!(left.volunteers, 6);
        assert!((left.budget - 3000.0).abs() < f64::EPSILON);
        assert_eq!(left.vehicles, 1);
        assert_eq!(left.equipment, 0);
        assert!(!left.covers(&need));
    }

    #[test]
    fn pool_never_goes_negative() {
        let pool = ResourcePool {
            volunteers: 1,
            budget: 100.0,
            vehicles: 0,
            equipment: 0,
        };
        let left = pool.saturating_sub(&ResourcePool {
            volunteers: 5,
            budget: 500.0,
            vehicles: 1,
            equipment: 1,
        });
        assert_eq!(left, ResourcePool::default());
    }

    #[test]
    fn risk_factor_is_clamped() {
        let hotspot = Hotspot {
            id: 1,
            center: GeoPoint::default(),
            size: 30,
            severity: 0.5,
            recency: 1.0,
            risk: 9.45,
            priority: 0.9,
            markers: vec![],
        };
        assert!((hotspot.risk_factor() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn radius_prefers_explicit_distance() {
        let params = HotspotParams::default();
        assert!((params.radius_m() - 1113.2).abs() < 1e-6);

        let params = HotspotParams {
            max_distance_m: Some(250.0),
            ..HotspotParams::default()
        };
        assert!((params.radius_m() - 250.0).abs() < f64::EPSILON);
    }

    #[test]
    fn serializes_camel_case_labels() {
        let rec = StrategicRecommendation {
            kind: RecommendationType::ZoneManagement,
            priority: PriorityLevel::Medium,
            recommendation: "r".to_string(),
            rationale: "w".to_string(),
            timeframe: "t".to_string(),
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["type"], "zone_management");
        assert_eq!(json["priority"], "Medium");

        let summary = TrendSummary::insufficient(2);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["trend"], "stable");
        assert_eq!(json["direction"], "flat");
        assert_eq!(json["insufficientData"], true);
    }
}
