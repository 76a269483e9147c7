//! Density-based hotspot detection.
//!
//! A single DBSCAN-style pass over the records that have usable
//! coordinates. Neighbors are found by great-circle distance, clusters
//! grow breadth-first through points that meet the density criterion, and
//! each surviving cluster is scored for severity, recency, risk and
//! priority.
//!
//! The neighbor search compares every pair of points, so cost grows with
//! the square of the geolocated record count.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use geo::{Distance, Haversine, Point};
use stray_watch_analytics_models::{GeoPoint, Hotspot, HotspotParams};
use stray_watch_incident_models::IncidentRecord;

/// Average member age, in days, at which recency reaches zero.
const RECENCY_WINDOW_DAYS: f64 = 30.0;

/// Clusters at or below this risk are dropped.
const MIN_RISK: f64 = 0.1;

/// Cluster size at which the size term of priority saturates.
const PRIORITY_SIZE_CAP: f64 = 20.0;

/// Detects hotspots and returns them sorted by descending priority, with
/// ids assigned in that order starting at 1.
///
/// Records with missing or invalid coordinates are ignored. Returns an
/// empty list when nothing clusters.
#[must_use]
pub fn detect_hotspots(records: &[IncidentRecord], params: &HotspotParams) -> Vec<Hotspot> {
    crate::guarded("Hotspot detection", || detect(records, params))
}

fn detect(records: &[IncidentRecord], params: &HotspotParams) -> Vec<Hotspot> {
    // (index into `records`, position)
    let points: Vec<(usize, Point<f64>)> = records
        .iter()
        .enumerate()
        .filter_map(|(idx, record)| {
            record
                .coordinates()
                .map(|(lat, lng)| (idx, Point::new(lng, lat)))
        })
        .collect();

    if points.is_empty() {
        log::debug!(
            "No geolocated records among {} supplied, skipping hotspot detection",
            records.len()
        );
        return Vec::new();
    }

    let radius_m = params.radius_m();
    if !(radius_m.is_finite() && radius_m >= 0.0) {
        log::warn!("Unusable clustering radius {radius_m} m, skipping hotspot detection");
        return Vec::new();
    }
    let min_points = params.min_points.max(1);

    let clusters = density_clusters(&points, radius_m, min_points);

    let mut hotspots: Vec<Hotspot> = clusters
        .iter()
        .filter(|members| members.len() >= min_points)
        .map(|members| {
            let markers: Vec<&IncidentRecord> =
                members.iter().map(|&p| &records[points[p].0]).collect();
            score_cluster(&markers, params.reference_time)
        })
        .filter(|hotspot| hotspot.risk > MIN_RISK)
        .collect();

    hotspots.sort_by(|a, b| b.priority.total_cmp(&a.priority));
    for (rank, hotspot) in hotspots.iter_mut().enumerate() {
        hotspot.id = u32::try_from(rank + 1).unwrap_or(u32::MAX);
    }

    log::debug!(
        "Detected {} hotspots from {} geolocated records (radius {radius_m:.0} m, min points {min_points})",
        hotspots.len(),
        points.len(),
    );

    hotspots
}

/// Groups points into density clusters. Returns each cluster as a list of
/// indices into `points`, in discovery order.
///
/// A point's neighborhood includes the point itself. A point belongs to
/// at most one cluster: the first one that reaches it.
fn density_clusters(
    points: &[(usize, Point<f64>)],
    radius_m: f64,
    min_points: usize,
) -> Vec<Vec<usize>> {
    let n = points.len();

    let neighbors: Vec<Vec<usize>> = (0..n)
        .map(|i| {
            (0..n)
                .filter(|&j| i == j || Haversine.distance(points[i].1, points[j].1) <= radius_m)
                .collect()
        })
        .collect();

    let mut assigned = vec![false; n];
    let mut visited = vec![false; n];
    let mut clusters = Vec::new();

    for seed in 0..n {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;

        if neighbors[seed].len() < min_points {
            // Noise for now; a later cluster may still absorb it as a
            // border point.
            continue;
        }

        let mut members = vec![seed];
        assigned[seed] = true;

        let mut queue: VecDeque<usize> = neighbors[seed]
            .iter()
            .copied()
            .filter(|&j| j != seed)
            .collect();

        while let Some(j) = queue.pop_front() {
            if !assigned[j] {
                assigned[j] = true;
                members.push(j);
            }

            if visited[j] {
                continue;
            }
            visited[j] = true;

            if neighbors[j].len() >= min_points {
                queue.extend(neighbors[j].iter().copied().filter(|&k| !assigned[k]));
            }
        }

        clusters.push(members);
    }

    clusters
}

#[allow(clippy::cast_precision_loss)]
fn score_cluster(markers: &[&IncidentRecord], reference_time: DateTime<Utc>) -> Hotspot {
    let size = markers.len();
    let count = size as f64;

    let (lat_sum, lng_sum) = markers
        .iter()
        .filter_map(|record| record.coordinates())
        .fold((0.0, 0.0), |(lat, lng), (a, b)| (lat + a, lng + b));

    let severe = markers.iter().filter(|record| record.is_severe()).count();
    let severity = severe as f64 / count;

    let recency = recency_score(markers, reference_time);
    let risk = 0.3f64.mul_add(count, 0.5f64.mul_add(severity, 0.2 * recency));
    let size_term = (count / PRIORITY_SIZE_CAP).min(1.0);
    let priority = 0.4f64.mul_add(
        severity,
        0.3f64.mul_add(size_term, 0.3 * risk.clamp(0.0, 1.0)),
    );

    Hotspot {
        id: 0,
        center: GeoPoint {
            latitude: lat_sum / count,
            longitude: lng_sum / count,
        },
        size,
        severity,
        recency,
        risk,
        priority,
        markers: markers.iter().map(|&record| record.clone()).collect(),
    }
}

/// `1 - average age / 30 days`, floored at zero. Members without a usable
/// timestamp are left out of the average, and a cluster with none scores
/// zero. Timestamps after `reference_time` count as age zero.
#[allow(clippy::cast_precision_loss)]
fn recency_score(markers: &[&IncidentRecord], reference_time: DateTime<Utc>) -> f64 {
    let ages: Vec<f64> = markers
        .iter()
        .filter_map(|record| record.created_at_utc())
        .map(|created| {
            let seconds = (reference_time - created).num_seconds().max(0);
            seconds as f64 / 86_400.0
        })
        .collect();

    if ages.is_empty() {
        return 0.0;
    }

    let average_age = ages.iter().sum::<f64>() / ages.len() as f64;
    (1.0 - average_age / RECENCY_WINDOW_DAYS).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone as _};
    use stray_watch_incident_models::AnimalCondition;

    use super::*;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn params() -> HotspotParams {
        HotspotParams {
            reference_time: reference(),
            ..HotspotParams::default()
        }
    }

    fn record(lat: f64, lng: f64, condition: AnimalCondition, days_old: i64) -> IncidentRecord {
        IncidentRecord {
            latitude: Some(lat),
            longitude: Some(lng),
            condition,
            created_at: Some((reference() - Duration::days(days_old)).to_rfc3339()),
            ..IncidentRecord::default()
        }
    }

    fn abuse_cluster() -> Vec<IncidentRecord> {
        vec![
            record(14.0583, 121.1656, AnimalCondition::Abuse, 1),
            record(14.0590, 121.1660, AnimalCondition::Abuse, 2),
            record(14.0578, 121.1650, AnimalCondition::Abuse, 3),
        ]
    }

    #[test]
    fn empty_input_has_no_hotspots() {
        assert!(detect_hotspots(&[], &params()).is_empty());
    }

    #[test]
    fn single_record_is_below_min_points() {
        let records = vec![record(14.0583, 121.1656, AnimalCondition::Abuse, 0)];
        assert!(detect_hotspots(&records, &params()).is_empty());
    }

    #[test]
    fn invalid_coordinates_are_ignored() {
        let records = vec![
            IncidentRecord {
                latitude: None,
                longitude: Some(121.1656),
                ..IncidentRecord::default()
            },
            IncidentRecord {
                latitude: Some(f64::NAN),
                longitude: Some(121.1656),
                ..IncidentRecord::default()
            },
        ];
        assert!(detect_hotspots(&records, &params()).is_empty());
    }

    #[test]
    fn three_nearby_abuse_reports_form_one_hotspot() {
        let hotspots = detect_hotspots(&abuse_cluster(), &params());
        assert_eq!(hotspots.len(), 1);

        let hotspot = &hotspots[0];
        assert_eq!(hotspot.id, 1);
        assert_eq!(hotspot.size, 3);
        assert!((hotspot.severity - 1.0).abs() < f64::EPSILON);
        assert_eq!(hotspot.markers.len(), 3);
        assert!((hotspot.center.latitude - 14.0583667).abs() < 1e-6);
        assert!((hotspot.center.longitude - 121.1655333).abs() < 1e-6);

        // Average age 2 days.
        assert!((hotspot.recency - (1.0 - 2.0 / 30.0)).abs() < 1e-9);
        let expected_risk = 0.3 * 3.0 + 0.5 + 0.2 * hotspot.recency;
        assert!((hotspot.risk - expected_risk).abs() < 1e-9);
        // Risk exceeds 1, so its priority term saturates.
        let expected_priority = 0.4 + 0.3 * (3.0 / 20.0) + 0.3;
        assert!((hotspot.priority - expected_priority).abs() < 1e-9);
    }

    #[test]
    fn severity_is_fraction_of_severe_reports() {
        let mut records = abuse_cluster();
        records[1].condition = AnimalCondition::Healthy;
        records.push(record(14.0585, 121.1652, AnimalCondition::Fighting, 0));

        let hotspots = detect_hotspots(&records, &params());
        assert_eq!(hotspots.len(), 1);
        assert_eq!(hotspots[0].size, 4);
        assert!((hotspots[0].severity - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn separate_areas_are_ranked_by_priority() {
        let mut records = vec![
            record(14.2000, 121.3000, AnimalCondition::Healthy, 5),
            record(14.2004, 121.3003, AnimalCondition::Other, 5),
            record(14.2002, 121.2998, AnimalCondition::Sick, 5),
            record(14.2001, 121.3001, AnimalCondition::Injured, 5),
        ];
        records.extend(abuse_cluster());

        let hotspots = detect_hotspots(&records, &params());
        assert_eq!(hotspots.len(), 2);
        assert_eq!(hotspots[0].size, 3);
        assert_eq!(hotspots[1].size, 4);
        assert_eq!(hotspots[0].id, 1);
        assert_eq!(hotspots[1].id, 2);

        for pair in hotspots.windows(2) {
            assert!(pair[0].priority >= pair[1].priority);
        }
    }

    #[test]
    fn hotspots_respect_invariants() {
        let mut records = abuse_cluster();
        for i in 0..12 {
            let offset = f64::from(i) * 0.0004;
            records.push(record(
                14.3 + offset,
                121.4,
                AnimalCondition::Other,
                i64::from(i) * 4,
            ));
        }
        records.push(record(10.0, 120.0, AnimalCondition::Abuse, 0));

        let params = HotspotParams {
            min_points: 3,
            ..params()
        };
        let hotspots = detect_hotspots(&records, &params);
        assert!(!hotspots.is_empty());
        for hotspot in &hotspots {
            assert!(hotspot.size >= 3);
            assert!((0.0..=1.0).contains(&hotspot.severity));
            assert!((0.0..=1.0).contains(&hotspot.recency));
            assert!(hotspot.risk > MIN_RISK);
            assert!((0.0..=1.0).contains(&hotspot.priority));
        }
    }

    #[test]
    fn duplicate_coordinates_are_counted_separately() {
        let records = vec![
            record(14.0583, 121.1656, AnimalCondition::Abuse, 0),
            record(14.0583, 121.1656, AnimalCondition::Abuse, 0),
        ];
        let hotspots = detect_hotspots(&records, &params());
        assert_eq!(hotspots.len(), 1);
        assert_eq!(hotspots[0].size, 2);
    }

    #[test]
    fn chains_through_core_points() {
        // Each point is ~330 m from the next; the ends are ~1.3 km apart.
        let records: Vec<IncidentRecord> = (0..5)
            .map(|i| record(14.0 + f64::from(i) * 0.003, 121.0, AnimalCondition::Other, 0))
            .collect();
        let params = HotspotParams {
            max_distance_m: Some(400.0),
            ..params()
        };
        let hotspots = detect_hotspots(&records, &params);
        assert_eq!(hotspots.len(), 1);
        assert_eq!(hotspots[0].size, 5);
    }

    #[test]
    fn explicit_distance_overrides_eps() {
        let records = vec![
            record(14.0000, 121.0, AnimalCondition::Abuse, 0),
            record(14.0050, 121.0, AnimalCondition::Abuse, 0),
        ];
        assert_eq!(detect_hotspots(&records, &params()).len(), 1);

        let tight = HotspotParams {
            max_distance_m: Some(100.0),
            ..params()
        };
        assert!(detect_hotspots(&records, &tight).is_empty());
    }

    #[test]
    fn stale_or_undated_reports_have_zero_recency() {
        let mut records = vec![
            record(14.0583, 121.1656, AnimalCondition::Other, 45),
            record(14.0584, 121.1657, AnimalCondition::Other, 60),
        ];
        let hotspots = detect_hotspots(&records, &params());
        assert!(hotspots[0].recency.abs() < f64::EPSILON);

        for r in &mut records {
            r.created_at = None;
        }
        let hotspots = detect_hotspots(&records, &params());
        assert!(hotspots[0].recency.abs() < f64::EPSILON);
    }

    #[test]
    fn zero_min_points_is_treated_as_one() {
        let records = vec![record(14.0583, 121.1656, AnimalCondition::Abuse, 0)];
        let params = HotspotParams {
            min_points: 0,
            ..params()
        };
        let hotspots = detect_hotspots(&records, &params);
        assert_eq!(hotspots.len(), 1);
        assert_eq!(hotspots[0].size, 1);
    }
}
