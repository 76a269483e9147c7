//! Portfolio-level recommendations across all hotspots.
//!
//! Looks at the whole hotspot list against the original pool (not the
//! remainder left by the allocator) and fires independent threshold
//! rules. Any number of rules may fire at once.

use stray_watch_analytics_models::{
    Hotspot, PriorityLevel, RecommendationType, ResourcePool, StrategicRecommendation,
    StrategicReport, StrategicSummary,
};

/// Incidents one volunteer can handle.
const INCIDENTS_PER_VOLUNTEER: usize = 5;

/// Estimated response cost per incident.
const COST_PER_INCIDENT: f64 = 500.0;

/// Share of resources to move to critical zones.
const CRITICAL_REALLOCATION_SHARE: u32 = 70;

/// Produces recommendations and the summary they were derived from.
#[must_use]
pub fn generate_strategic_recommendations(
    hotspots: &[Hotspot],
    pool: ResourcePool,
) -> StrategicReport {
    crate::guarded("Strategic recommendations", || {
        let summary = summarize(hotspots, pool);
        let recommendations = recommend(&summary);

        log::debug!(
            "{} strategic recommendations for {} hotspots ({} critical)",
            recommendations.len(),
            summary.total_hotspots,
            summary.critical_hotspots,
        );

        StrategicReport {
            recommendations,
            summary,
        }
    })
}

#[allow(clippy::cast_precision_loss)]
fn summarize(hotspots: &[Hotspot], pool: ResourcePool) -> StrategicSummary {
    let total_hotspots = hotspots.len();
    let critical_hotspots = hotspots.iter().filter(|h| h.priority > 0.8).count();
    let high_priority_hotspots = hotspots.iter().filter(|h| h.priority > 0.6).count();
    let total_incidents: usize = hotspots.iter().map(|h| h.size).sum();
    let avg_severity = if hotspots.is_empty() {
        0.0
    } else {
        hotspots.iter().map(|h| h.severity).sum::<f64>() / total_hotspots as f64
    };

    StrategicSummary {
        total_hotspots,
        critical_hotspots,
        high_priority_hotspots,
        total_incidents,
        avg_severity,
        available_volunteers: pool.volunteers,
        available_budget: pool.budget,
        resource_utilization: utilization(total_incidents, pool.volunteers),
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn utilization(total_incidents: usize, volunteers: u32) -> Option<u32> {
    if volunteers == 0 {
        return None;
    }
    let capacity = f64::from(volunteers) * INCIDENTS_PER_VOLUNTEER as f64;
    Some((total_incidents as f64 / capacity * 100.0).round() as u32)
}

#[allow(clippy::cast_precision_loss)]
fn recommend(summary: &StrategicSummary) -> Vec<StrategicRecommendation> {
    let mut recommendations = Vec::new();

    if summary.critical_hotspots > 0 {
        recommendations.push(StrategicRecommendation {
            kind: RecommendationType::ResourceReallocation,
            priority: PriorityLevel::Critical,
            recommendation: format!(
                "Reallocate {CRITICAL_REALLOCATION_SHARE}% of available resources to the {} critical zone(s)",
                summary.critical_hotspots
            ),
            rationale: format!(
                "{} hotspot(s) have priority above 0.8 and need an immediate response",
                summary.critical_hotspots
            ),
            timeframe: "Immediate".to_string(),
        });
    }

    let required_staff = summary.total_incidents.div_ceil(INCIDENTS_PER_VOLUNTEER);
    let available_staff = summary.available_volunteers as usize;
    if required_staff > available_staff {
        let shortfall = required_staff - available_staff;
        recommendations.push(StrategicRecommendation {
            kind: RecommendationType::VolunteerRecruitment,
            priority: PriorityLevel::High,
            recommendation: format!("Recruit {shortfall} additional volunteer(s)"),
            rationale: format!(
                "{} incidents need about {required_staff} volunteers, {available_staff} are available",
                summary.total_incidents
            ),
            timeframe: "2-4 weeks".to_string(),
        });
    }

    let estimated_budget = summary.total_incidents as f64 * COST_PER_INCIDENT;
    if estimated_budget > summary.available_budget {
        let shortfall = estimated_budget - summary.available_budget;
        recommendations.push(StrategicRecommendation {
            kind: RecommendationType::Funding,
            priority: PriorityLevel::High,
            recommendation: format!("Seek {shortfall:.0} in additional funding"),
            rationale: format!(
                "Estimated response cost is {estimated_budget:.0} against an available budget of {:.0}",
                summary.available_budget
            ),
            timeframe: "1-2 months".to_string(),
        });
    }

    if summary.avg_severity > 0.7 {
        recommendations.push(StrategicRecommendation {
            kind: RecommendationType::EmergencyProtocol,
            priority: PriorityLevel::High,
            recommendation: "Adopt an emergency response protocol for abuse and fighting reports"
                .to_string(),
            rationale: format!(
                "Average hotspot severity is {:.0}%",
                summary.avg_severity * 100.0
            ),
            timeframe: "1 week".to_string(),
        });
    }

    if summary.total_hotspots > 10 {
        recommendations.push(StrategicRecommendation {
            kind: RecommendationType::ZoneManagement,
            priority: PriorityLevel::Medium,
            recommendation: "Implement a zone-based management system with a coordinator per zone"
                .to_string(),
            rationale: format!(
                "{} active hotspots are too many to coordinate centrally",
                summary.total_hotspots
            ),
            timeframe: "2-3 weeks".to_string(),
        });
    }

    recommendations
}
