//! Linear trend forecasting over monthly incident counts.
//!
//! Both [`forecast`] and [`analyze_trend`] fit an ordinary least squares
//! line to `(month index, count)`. The forecast extrapolates that line
//! [`FORECAST_HORIZON`] months ahead; the trend summary reports how well
//! the line explains the history.

use chrono::Month;
use stray_watch_analytics_models::{
    FORECAST_HORIZON, ForecastPoint, SeriesPoint, TrendDirection, TrendLabel, TrendSummary,
};

/// Slope magnitude below which [`analyze_trend`] calls a series stable.
const TREND_SLOPE_THRESHOLD: f64 = 0.1;

/// Scores how much a forecast step can be trusted, in `[0, 1]`.
pub trait ConfidenceHeuristic {
    /// Confidence for the forecast `step` (0-based) given the historical
    /// `values`.
    fn confidence(&self, values: &[f64], step: usize) -> f64;
}

/// Variance-based confidence that loses ten points per step.
///
/// The baseline is `max(0.3, 1 - variance / 100)`; step `i` subtracts
/// `0.1 * i` from it, never dropping below 0.1. This is a rough
/// heuristic, not a prediction interval.
#[derive(Debug, Clone, Copy, Default)]
pub struct VarianceDecay;

impl ConfidenceHeuristic for VarianceDecay {
    #[allow(clippy::cast_precision_loss)]
    fn confidence(&self, values: &[f64], step: usize) -> f64 {
        let baseline = (1.0 - population_variance(values) / 100.0).max(0.3);
        0.1f64.mul_add(-(step as f64), baseline).clamp(0.1, 1.0)
    }
}

/// Forecasts the next six months with the default [`VarianceDecay`]
/// confidence.
///
/// `current_month` is the month the series ends in; the first forecast
/// point is labeled with the month after it. Returns an empty list when
/// the series has fewer than two points.
#[must_use]
pub fn forecast(series: &[SeriesPoint], current_month: Month) -> Vec<ForecastPoint> {
    forecast_with(series, current_month, &VarianceDecay)
}

/// [`forecast`] with a caller-supplied confidence heuristic.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn forecast_with<H: ConfidenceHeuristic + ?Sized>(
    series: &[SeriesPoint],
    current_month: Month,
    heuristic: &H,
) -> Vec<ForecastPoint> {
    crate::guarded("Forecast", || {
        let values = clean_values(series);
        let Some(fit) = LinearFit::from_values(&values) else {
            log::debug!("Forecast needs at least 2 points, got {}", values.len());
            return Vec::new();
        };

        let trend = label_for_slope(fit.slope, 0.0);
        let n = values.len();
        let mut month = current_month;

        (0..FORECAST_HORIZON)
            .map(|step| {
                month = month.succ();
                let predicted = fit.predict((n + step) as f64).max(0.0).round();
                let confidence = heuristic.confidence(&values, step).clamp(0.0, 1.0);

                ForecastPoint {
                    month: month_label(month),
                    predicted: predicted as u64,
                    confidence: (confidence * 100.0).round() as u8,
                    trend,
                }
            })
            .collect()
    })
}

/// Summarizes the direction and fit quality of a historical series.
///
/// Needs at least three points; shorter series get
/// [`TrendSummary::insufficient`]. A flat series (zero total variance)
/// reports zero confidence.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn analyze_trend(series: &[SeriesPoint]) -> TrendSummary {
    crate::guarded("Trend analysis", || {
        let values = clean_values(series);
        if values.len() < 3 {
            return TrendSummary::insufficient(values.len());
        }
        let Some(fit) = LinearFit::from_values(&values) else {
            return TrendSummary::insufficient(values.len());
        };

        let r_squared = fit.r_squared(&values);

        TrendSummary {
            trend: label_for_slope(fit.slope, TREND_SLOPE_THRESHOLD),
            slope: fit.slope,
            confidence: (r_squared * 100.0).round() as u8,
            direction: direction_for_slope(fit.slope),
            sample_size: values.len(),
            insufficient_data: false,
        }
    })
}

/// An OLS line `y = slope * x + intercept` with `x` the point index.
#[derive(Debug, Clone, Copy)]
struct LinearFit {
    slope: f64,
    intercept: f64,
}

impl LinearFit {
    #[allow(clippy::cast_precision_loss)]
    fn from_values(values: &[f64]) -> Option<Self> {
        if values.len() < 2 {
            return None;
        }
        let n = values.len() as f64;
        let (sum_x, sum_y, sum_xy, sum_xx) = values.iter().enumerate().fold(
            (0.0, 0.0, 0.0, 0.0),
            |(sx, sy, sxy, sxx), (i, &y)| {
                let x = i as f64;
                (sx + x, sy + y, x.mul_add(y, sxy), x.mul_add(x, sxx))
            },
        );

        let denominator = n.mul_add(sum_xx, -(sum_x * sum_x));
        if denominator.abs() < f64::EPSILON {
            return None;
        }
        let slope = n.mul_add(sum_xy, -(sum_x * sum_y)) / denominator;
        let intercept = slope.mul_add(-sum_x, sum_y) / n;

        (slope.is_finite() && intercept.is_finite()).then_some(Self { slope, intercept })
    }

    fn predict(self, x: f64) -> f64 {
        self.slope.mul_add(x, self.intercept)
    }

    /// Coefficient of determination against the series mean, in `[0, 1]`.
    /// Zero when the series has no variance to explain.
    #[allow(clippy::cast_precision_loss)]
    fn r_squared(self, values: &[f64]) -> f64 {
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let (ss_res, ss_tot) =
            values
                .iter()
                .enumerate()
                .fold((0.0, 0.0), |(res, tot), (i, &y)| {
                    let residual = y - self.predict(i as f64);
                    let deviation = y - mean;
                    (
                        residual.mul_add(residual, res),
                        deviation.mul_add(deviation, tot),
                    )
                });

        if ss_tot <= f64::EPSILON {
            return 0.0;
        }
        let r_squared = 1.0 - ss_res / ss_tot;
        if r_squared.is_finite() {
            r_squared.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Series values with non-finite entries replaced by zero.
fn clean_values(series: &[SeriesPoint]) -> Vec<f64> {
    series
        .iter()
        .map(|point| {
            if point.value.is_finite() {
                point.value
            } else {
                0.0
            }
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

fn label_for_slope(slope: f64, threshold: f64) -> TrendLabel {
    if slope > threshold {
        TrendLabel::Increasing
    } else if slope < -threshold {
        TrendLabel::Decreasing
    } else {
        TrendLabel::Stable
    }
}

fn direction_for_slope(slope: f64) -> TrendDirection {
    if slope > 0.0 {
        TrendDirection::Up
    } else if slope < 0.0 {
        TrendDirection::Down
    } else {
        TrendDirection::Flat
    }
}

fn month_label(month: Month) -> String {
    month.name().chars().take(3).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> Vec<SeriesPoint> {
        values.iter().copied().map(SeriesPoint::new).collect()
    }

    #[test]
    fn forecast_needs_two_points() {
        assert!(forecast(&[], Month::January).is_empty());
        assert!(forecast(&series(&[1.0]), Month::January).is_empty());
    }

    #[test]
    fn forecast_has_six_non_negative_points() {
        let points = forecast(&series(&[30.0, 20.0, 10.0, 5.0]), Month::April);
        assert_eq!(points.len(), FORECAST_HORIZON);
        assert!(points.iter().all(|p| p.trend == TrendLabel::Decreasing));
        // Line drops below zero quickly and is floored.
        assert_eq!(points.last().map(|p| p.predicted), Some(0));
    }

    #[test]
    fn forecast_extrapolates_the_line() {
        let points = forecast(&series(&[2.0, 4.0, 6.0, 8.0]), Month::April);
        let predicted: Vec<u64> = points.iter().map(|p| p.predicted).collect();
        assert_eq!(predicted, vec![10, 12, 14, 16, 18, 20]);
        assert!(points.iter().all(|p| p.trend == TrendLabel::Increasing));
    }

    #[test]
    fn forecast_labels_wrap_around_the_year() {
        let points = forecast(&series(&[1.0, 1.0, 1.0]), Month::October);
        let labels: Vec<&str> = points.iter().map(|p| p.month.as_str()).collect();
        assert_eq!(labels, vec!["Nov", "Dec", "Jan", "Feb", "Mar", "Apr"]);
        assert!(points.iter().all(|p| p.trend == TrendLabel::Stable));
    }

    #[test]
    fn forecast_confidence_decays() {
        // Variance 1.25 keeps the baseline near 0.99.
        let points = forecast(&series(&[1.0, 2.0, 3.0, 4.0]), Month::January);
        let confidence: Vec<u8> = points.iter().map(|p| p.confidence).collect();
        assert_eq!(confidence, vec![99, 89, 79, 69, 59, 49]);
    }

    #[test]
    fn noisy_series_uses_confidence_floor() {
        let points = forecast(&series(&[0.0, 100.0, 0.0, 100.0]), Month::January);
        // Variance 2500 pins the baseline at 0.3, so the floor is hit by
        // the third step.
        let confidence: Vec<u8> = points.iter().map(|p| p.confidence).collect();
        assert_eq!(confidence, vec![30, 20, 10, 10, 10, 10]);
    }

    #[test]
    fn custom_heuristic_is_used() {
        struct Fixed;
        impl ConfidenceHeuristic for Fixed {
            fn confidence(&self, _values: &[f64], _step: usize) -> f64 {
                0.42
            }
        }
        let points = forecast_with(&series(&[1.0, 2.0]), Month::June, &Fixed);
        assert!(points.iter().all(|p| p.confidence == 42));
    }

    #[test]
    fn non_finite_values_are_zeroed() {
        let points = forecast(&series(&[f64::NAN, f64::INFINITY, 0.0]), Month::March);
        assert_eq!(points.len(), FORECAST_HORIZON);
        assert!(points.iter().all(|p| p.predicted == 0));
    }

    #[test]
    fn perfect_linear_increase() {
        let summary = analyze_trend(&series(&[5.0, 10.0, 15.0, 20.0]));
        assert_eq!(summary.trend, TrendLabel::Increasing);
        assert_eq!(summary.confidence, 100);
        assert_eq!(summary.direction, TrendDirection::Up);
        assert!((summary.slope - 5.0).abs() < 1e-9);
        assert_eq!(summary.sample_size, 4);
        assert!(!summary.insufficient_data);
    }

    #[test]
    fn decreasing_trend() {
        let summary = analyze_trend(&series(&[20.0, 14.0, 11.0, 3.0]));
        assert_eq!(summary.trend, TrendLabel::Decreasing);
        assert_eq!(summary.direction, TrendDirection::Down);
        assert!(summary.confidence > 90);
    }

    #[test]
    fn short_series_is_insufficient() {
        let summary = analyze_trend(&series(&[1.0, 2.0]));
        assert!(summary.insufficient_data);
        assert_eq!(summary.confidence, 0);
        assert_eq!(summary.trend, TrendLabel::Stable);
        assert_eq!(summary.direction, TrendDirection::Flat);
        assert_eq!(summary.sample_size, 2);
    }

    #[test]
    fn flat_series_has_zero_confidence() {
        let summary = analyze_trend(&series(&[7.0, 7.0, 7.0, 7.0]));
        assert_eq!(summary.trend, TrendLabel::Stable);
        assert_eq!(summary.direction, TrendDirection::Flat);
        assert_eq!(summary.confidence, 0);
        assert!(summary.slope.abs() < f64::EPSILON);
    }

    #[test]
    fn small_slope_is_stable_but_has_direction() {
        let summary = analyze_trend(&series(&[10.0, 10.05, 10.1, 10.15]));
        assert_eq!(summary.trend, TrendLabel::Stable);
        assert_eq!(summary.direction, TrendDirection::Up);
    }
}
