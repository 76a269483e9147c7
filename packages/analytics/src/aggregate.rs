//! Monthly incident counts for the forecaster.
//!
//! Buckets are calendar months in UTC regardless of where the engine
//! runs, so two deployments given the same records produce the same
//! series.

use chrono::Datelike as _;
use stray_watch_analytics_models::SeriesPoint;
use stray_watch_incident_models::IncidentRecord;

/// Counts records per calendar month of `year`.
///
/// Always returns twelve points, January first, labeled `YYYY-MM`, with
/// zero for months that had no records. Records without a parseable
/// `createdAt` are skipped.
#[must_use]
pub fn monthly_series(records: &[IncidentRecord], year: i32) -> Vec<SeriesPoint> {
    crate::guarded("Monthly aggregation", || {
        let mut counts = [0u32; 12];
        let mut undated = 0usize;

        for record in records {
            match record.created_at_utc() {
                Some(created) if created.year() == year => {
                    counts[created.month0() as usize] += 1;
                }
                Some(_) => {}
                None => undated += 1,
            }
        }

        if undated > 0 {
            log::debug!("Skipped {undated} records without a usable timestamp");
        }

        counts
            .iter()
            .zip(1..=12)
            .map(|(&count, month)| SeriesPoint {
                period: format!("{year:04}-{month:02}"),
                value: f64::from(count),
            })
            .collect()
    })
}
