//! One-call pipeline for dashboard refreshes.

use chrono::{DateTime, Datelike as _, Month, Utc};
use stray_watch_analytics_models::AnalyticsReport;
use stray_watch_incident_models::IncidentRecord;

use crate::{
    AnalyticsConfig, allocate_with_remainder, analyze_trend, detect_hotspots, forecast,
    generate_strategic_recommendations, monthly_series,
};

/// Runs every component over one snapshot of records.
///
/// Hotspots feed both the allocator and the recommender; the recommender
/// sees the configured pool, not the allocator's remainder. The forecast
/// and trend use the reference year's monthly counts up to and including
/// the reference month, so months that haven't happened yet don't drag
/// the fitted line toward zero.
#[must_use]
pub fn build_report(
    records: &[IncidentRecord],
    config: &AnalyticsConfig,
    reference_time: DateTime<Utc>,
) -> AnalyticsReport {
    let params = config.hotspots.to_params(reference_time);
    let geolocated_records = records
        .iter()
        .filter(|record| record.coordinates().is_some())
        .count();

    let hotspots = detect_hotspots(records, &params);
    let (remaining_pool, allocations) = allocate_with_remainder(&hotspots, config.pool);
    let strategy = generate_strategic_recommendations(&hotspots, config.pool);

    let monthly = monthly_series(records, reference_time.year());
    let elapsed = (reference_time.month() as usize).min(monthly.len());
    let history = &monthly[..elapsed];
    let current_month = Month::try_from(u8::try_from(reference_time.month()).unwrap_or(1))
        .unwrap_or(Month::January);
    let forecast = forecast(history, current_month);
    let trend = analyze_trend(history);

    log::info!(
        "Analyzed {} records ({geolocated_records} geolocated): {} hotspots, {} recommendations, trend {}",
        records.len(),
        hotspots.len(),
        strategy.recommendations.len(),
        trend.trend,
    );

    AnalyticsReport {
        generated_at: reference_time,
        total_records: records.len(),
        geolocated_records,
        hotspots,
        allocations,
        remaining_pool,
        strategy,
        monthly,
        forecast,
        trend,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone as _};
    use stray_watch_analytics_models::{FORECAST_HORIZON, ResourcePool, TrendLabel};
    use stray_watch_incident_models::AnimalCondition;

    use super::*;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 20, 0, 0, 0).unwrap()
    }

    fn report_records() -> Vec<IncidentRecord> {
        let mut records = Vec::new();
        // One more report each month, January through June.
        for month in 1..=6u32 {
            for i in 0..month {
                let created = Utc.with_ymd_and_hms(2024, month, 1 + i, 9, 0, 0).unwrap();
                records.push(IncidentRecord {
                    latitude: Some(14.0583 + f64::from(i) * 0.0001),
                    longitude: Some(121.1656),
                    condition: if i % 2 == 0 {
                        AnimalCondition::Abuse
                    } else {
                        AnimalCondition::Healthy
                    },
                    created_at: Some(created.to_rfc3339()),
                    ..IncidentRecord::default()
                });
            }
        }
        records.push(IncidentRecord {
            created_at: Some((reference() - Duration::days(1)).to_rfc3339()),
            ..IncidentRecord::default()
        });
        records
    }

    #[test]
    fn full_pipeline() {
        let records = report_records();
        let config = AnalyticsConfig::default_config();
        let report = build_report(&records, &config, reference());

        assert_eq!(report.total_records, 22);
        assert_eq!(report.geolocated_records, 21);
        assert_eq!(report.hotspots.len(), 1);
        assert_eq!(report.hotspots[0].size, 21);
        assert_eq!(report.allocations.len(), 1);
        assert!(config.pool.covers(&report.remaining_pool));

        assert_eq!(report.monthly.len(), 12);
        assert!((report.monthly[5].value - 7.0).abs() < f64::EPSILON);
        assert_eq!(report.forecast.len(), FORECAST_HORIZON);
        assert_eq!(report.forecast[0].month, "Jul");
        assert_eq!(report.trend.trend, TrendLabel::Increasing);
        assert_eq!(report.trend.sample_size, 6);
    }

    #[test]
    fn empty_snapshot_is_degenerate_not_an_error() {
        let config = AnalyticsConfig {
            pool: ResourcePool::default(),
            ..AnalyticsConfig::default_config()
        };
        let report = build_report(&[], &config, reference());
        assert!(report.hotspots.is_empty());
        assert!(report.allocations.is_empty());
        assert!(report.strategy.recommendations.is_empty());
        assert_eq!(report.strategy.summary.resource_utilization, None);
        // Six zero months still fit a flat line.
        assert!(report.forecast.iter().all(|p| p.predicted == 0));
        assert_eq!(report.trend.confidence, 0);
    }

    #[test]
    fn report_serializes_for_the_dashboard() {
        let report = build_report(
            &report_records(),
            &AnalyticsConfig::default_config(),
            reference(),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["hotspots"][0]["markers"].is_array());
        assert!(json["allocations"][0]["resourceAllocation"]["volunteers"].is_number());
        assert!(json["strategy"]["summary"]["totalHotspots"].is_number());
        assert_eq!(json["forecast"].as_array().map(Vec::len), Some(6));
    }
}
