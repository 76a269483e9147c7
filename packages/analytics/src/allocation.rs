//! Greedy resource allocation across ranked hotspots.
//!
//! Hotspots are served strictly in descending priority. The remaining
//! pool is an explicit value folded through [`allocate_step`]: each step
//! takes the pool left by the previous one and returns what is left after
//! its own grant. Nothing is shared between calls, so concurrent runs
//! never see each other's partially spent pool.
//!
//! There is no search and no backtracking. A hotspot the pool can fully
//! cover gets exactly what it needs; one it can't gets a minimal grant
//! and a monitoring-only plan.

use stray_watch_analytics_models::{
    CostBenefit, ExpectedImpact, Hotspot, PriorityLevel, RecommendedAction, ResourceAllocation,
    ResourcePool,
};

const LIMITED_RESOURCES_NOTE: &str = "Limited resources available";

/// Success probability reported for hotspots that only got the minimal
/// grant.
const LIMITED_SUCCESS_PROBABILITY: f64 = 0.3;

/// Estimated value, in budget units, of resolving one incident.
const BENEFIT_PER_INCIDENT: f64 = 1000.0;

/// Allocates `pool` across `hotspots` and returns one plan per hotspot in
/// priority order.
#[must_use]
pub fn allocate_resources(hotspots: &[Hotspot], pool: ResourcePool) -> Vec<ResourceAllocation> {
    allocate_with_remainder(hotspots, pool).1
}

/// Like [`allocate_resources`], also returning the pool left over after
/// every hotspot has been served.
#[must_use]
pub fn allocate_with_remainder(
    hotspots: &[Hotspot],
    pool: ResourcePool,
) -> (ResourcePool, Vec<ResourceAllocation>) {
    crate::guard_or("Resource allocation", (pool, Vec::new()), || {
        let mut ordered: Vec<&Hotspot> = hotspots.iter().collect();
        ordered.sort_by(|a, b| b.priority.total_cmp(&a.priority));

        let (remaining, allocations) = ordered.into_iter().fold(
            (pool, Vec::with_capacity(hotspots.len())),
            |(pool, mut allocations), hotspot| {
                let (remaining, allocation) = allocate_step(pool, hotspot);
                allocations.push(allocation);
                (remaining, allocations)
            },
        );

        log::debug!(
            "Allocated resources to {} hotspots, {remaining:?} left",
            allocations.len()
        );

        (remaining, allocations)
    })
}

/// One step of the allocation fold: serves `hotspot` from `pool` and
/// returns the pool that remains along with the plan.
#[must_use]
pub fn allocate_step(pool: ResourcePool, hotspot: &Hotspot) -> (ResourcePool, ResourceAllocation) {
    let required = required_resources(hotspot);

    if pool.covers(&required) {
        let allocation = full_allocation(hotspot, required);
        (pool.saturating_sub(&required), allocation)
    } else {
        let granted = minimal_grant(&pool);
        log::warn!(
            "Hotspot {} needs {required:?} but only {pool:?} remains, granting {granted:?}",
            hotspot.id
        );
        let allocation = limited_allocation(hotspot, granted, &required);
        (pool.saturating_sub(&granted), allocation)
    }
}

/// What a hotspot needs for a full response.
///
/// Base counts scale with cluster size within fixed bounds, then grow by
/// up to 50% with severity. Budget also grows by up to 30% with risk.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn required_resources(hotspot: &Hotspot) -> ResourcePool {
    let size = hotspot.size as f64;
    let severity_scale = 0.5f64.mul_add(hotspot.severity.clamp(0.0, 1.0), 1.0);
    let risk_scale = 0.3f64.mul_add(hotspot.risk_factor(), 1.0);

    let volunteers = (size / 3.0).ceil().clamp(2.0, 8.0);
    let budget = (size * 500.0).clamp(1000.0, 10_000.0);
    let vehicles = (size / 10.0).ceil().clamp(0.0, 2.0);
    let equipment = (size / 5.0).ceil().clamp(0.0, 3.0);

    ResourcePool {
        volunteers: to_count(volunteers * severity_scale),
        budget: (budget * severity_scale * risk_scale).round(),
        vehicles: to_count(vehicles * severity_scale),
        equipment: to_count(equipment * severity_scale),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_count(value: f64) -> u32 {
    value.round().clamp(0.0, f64::from(u32::MAX)) as u32
}

fn minimal_grant(pool: &ResourcePool) -> ResourcePool {
    ResourcePool {
        volunteers: pool.volunteers.min(1),
        budget: pool.budget.clamp(0.0, 1000.0),
        vehicles: 0,
        equipment: pool.equipment.min(1),
    }
}

fn full_allocation(hotspot: &Hotspot, granted: ResourcePool) -> ResourceAllocation {
    // Full grants match the requirement exactly.
    let adequacy = 1.0;
    let risk_term = f64::midpoint(hotspot.severity.clamp(0.0, 1.0), hotspot.risk_factor());
    let success_probability = (adequacy * (1.0 - risk_term)).clamp(0.1, 0.95);

    ResourceAllocation {
        hotspot_id: hotspot.id,
        zone: hotspot.center,
        priority: hotspot.priority,
        priority_level: PriorityLevel::from_score(hotspot.priority),
        recommended_actions: action_plan(hotspot),
        expected_impact: expected_impact(adequacy, hotspot.priority),
        timeline: timeline(hotspot).to_string(),
        cost_benefit: cost_benefit(hotspot.size, granted.budget),
        resource_allocation: granted,
        success_probability,
        note: None,
    }
}

fn limited_allocation(
    hotspot: &Hotspot,
    granted: ResourcePool,
    required: &ResourcePool,
) -> ResourceAllocation {
    let adequacy = resource_adequacy(&granted, required);

    ResourceAllocation {
        hotspot_id: hotspot.id,
        zone: hotspot.center,
        priority: hotspot.priority,
        priority_level: PriorityLevel::from_score(hotspot.priority),
        recommended_actions: limited_action_plan(),
        expected_impact: expected_impact(adequacy, hotspot.priority),
        timeline: timeline(hotspot).to_string(),
        cost_benefit: cost_benefit(hotspot.size, granted.budget),
        resource_allocation: granted,
        success_probability: LIMITED_SUCCESS_PROBABILITY,
        note: Some(LIMITED_RESOURCES_NOTE.to_string()),
    }
}

/// Mean fraction of each requirement that was granted, in `[0, 1]`. A
/// resource that isn't required counts as fully covered.
fn resource_adequacy(granted: &ResourcePool, required: &ResourcePool) -> f64 {
    let ratio = |granted: f64, required: f64| {
        if required <= 0.0 {
            1.0
        } else {
            (granted / required).clamp(0.0, 1.0)
        }
    };

    let total = ratio(f64::from(granted.volunteers), f64::from(required.volunteers))
        + ratio(granted.budget, required.budget)
        + ratio(f64::from(granted.vehicles), f64::from(required.vehicles))
        + ratio(f64::from(granted.equipment), f64::from(required.equipment));
    total / 4.0
}

fn expected_impact(adequacy: f64, hotspot_score: f64) -> ExpectedImpact {
    let score = adequacy * hotspot_score.clamp(0.0, 1.0);
    if score > 0.7 {
        ExpectedImpact::High
    } else if score > 0.4 {
        ExpectedImpact::Medium
    } else {
        ExpectedImpact::Low
    }
}

fn timeline(hotspot: &Hotspot) -> &'static str {
    if hotspot.severity > 0.8 {
        "Immediate (24-48 hours)"
    } else if hotspot.severity > 0.6 || hotspot.size > 10 {
        "Short-term (1-2 weeks)"
    } else if hotspot.size > 5 {
        "Medium-term (2-4 weeks)"
    } else {
        "Long-term (1-3 months)"
    }
}

#[allow(clippy::cast_precision_loss)]
fn cost_benefit(size: usize, budget: f64) -> CostBenefit {
    if budget <= 0.0 {
        return CostBenefit::Excellent;
    }
    let ratio = size as f64 * BENEFIT_PER_INCIDENT / budget;
    if ratio > 3.0 {
        CostBenefit::Excellent
    } else if ratio > 2.0 {
        CostBenefit::Good
    } else if ratio > 1.0 {
        CostBenefit::Fair
    } else {
        CostBenefit::Poor
    }
}

fn action(
    name: &str,
    priority: PriorityLevel,
    description: &str,
    timeframe: &str,
    resources: &str,
) -> RecommendedAction {
    RecommendedAction {
        action: name.to_string(),
        priority,
        description: description.to_string(),
        timeframe: timeframe.to_string(),
        resources: resources.to_string(),
    }
}

/// Tiered plan: escalations that the hotspot qualifies for, then the
/// standing awareness and monitoring steps.
fn action_plan(hotspot: &Hotspot) -> Vec<RecommendedAction> {
    let mut actions = Vec::new();

    if hotspot.severity > 0.8 {
        actions.push(action(
            "Emergency Response",
            PriorityLevel::Critical,
            "Dispatch a rescue team to remove animals from danger and document abuse for the authorities",
            "Within 24 hours",
            "Rescue team, transport vehicle, veterinary kit",
        ));
    }
    if hotspot.severity > 0.6 {
        actions.push(action(
            "Intensive Patrol",
            PriorityLevel::High,
            "Run daily volunteer patrols in the zone to deter abuse and animal fighting",
            "1-2 weeks",
            "Patrol volunteers, radios",
        ));
    }
    if hotspot.size > 15 {
        actions.push(action(
            "Mass Sterilization Campaign",
            PriorityLevel::High,
            "Organize a trap-neuter-return drive to bring the stray population down",
            "2-4 weeks",
            "Veterinarians, traps, procedure budget",
        ));
    }
    if hotspot.size > 10 {
        actions.push(action(
            "Temporary Shelter Setup",
            PriorityLevel::Medium,
            "Set up temporary shelter for rescued and at-risk animals",
            "1-2 weeks",
            "Shelter space, crates, food and water",
        ));
    }

    actions.push(action(
        "Community Awareness",
        PriorityLevel::Medium,
        "Hold information drives on animal welfare and how to file reports",
        "Ongoing",
        "Volunteers, printed materials",
    ));
    actions.push(action(
        "Regular Monitoring",
        PriorityLevel::Low,
        "Review new reports from the zone weekly and track progress",
        "Ongoing",
        "Volunteer coordinator",
    ));

    actions
}

fn limited_action_plan() -> Vec<RecommendedAction> {
    vec![
        action(
            "Basic Monitoring",
            PriorityLevel::Medium,
            "Keep watch on reports from the zone until more resources free up",
            "Ongoing",
            "1 volunteer",
        ),
        action(
            "Community Outreach",
            PriorityLevel::Low,
            "Ask residents to report sightings and incidents through the portal",
            "Ongoing",
            "Volunteer time",
        ),
    ]
}
