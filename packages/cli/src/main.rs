#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI for running the incident analytics engine over a records export.
//!
//! ```text
//! stray_watch_cli hotspots <records.json> [--min-points 2] [--eps 0.01]
//! stray_watch_cli forecast <records.json> [--year 2024] [--through 6]
//! stray_watch_cli allocate <records.json> [--volunteers 20] [--budget 50000]
//! stray_watch_cli recommend <records.json> [--volunteers 20] [--budget 50000]
//! stray_watch_cli report <records.json>
//! ```
//!
//! Every subcommand accepts `--config <file.toml>` and `--now <rfc3339>`
//! and prints pretty JSON to stdout. Logging goes to stderr and is
//! controlled with `RUST_LOG`.

mod records;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike as _, Month, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use stray_watch_analytics::{
    AnalyticsConfig, allocate_with_remainder, analyze_trend, build_report, config::HotspotConfig,
    detect_hotspots, forecast, generate_strategic_recommendations, monthly_series,
};
use stray_watch_analytics_models::{
    ForecastPoint, ResourceAllocation, ResourcePool, SeriesPoint, TrendSummary,
};
use stray_watch_incident_models::parse_timestamp;

#[derive(Parser)]
#[command(
    name = "stray_watch_cli",
    about = "Hotspots, forecasts and resource plans for stray animal incident reports"
)]
struct Cli {
    /// Engine configuration (TOML). Embedded defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Reference time for recency and forecasting (RFC 3339). Defaults to now
    #[arg(long, global = true)]
    now: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect and rank spatial hotspots
    Hotspots {
        /// Records export (JSON array, or object keyed by collection)
        records: PathBuf,
        #[command(flatten)]
        clustering: ClusteringArgs,
    },
    /// Aggregate monthly counts and forecast the next six months
    Forecast {
        /// Records export (JSON array, or object keyed by collection)
        records: PathBuf,
        /// Year to aggregate. Defaults to the reference year
        #[arg(long)]
        year: Option<i32>,
        /// Last month (1-12) of history to fit. Defaults to the reference
        /// month for the reference year and December otherwise
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=12))]
        through: Option<u8>,
    },
    /// Allocate the resource pool across detected hotspots
    Allocate {
        /// Records export (JSON array, or object keyed by collection)
        records: PathBuf,
        #[command(flatten)]
        clustering: ClusteringArgs,
        #[command(flatten)]
        pool: PoolArgs,
    },
    /// Produce portfolio-level recommendations
    Recommend {
        /// Records export (JSON array, or object keyed by collection)
        records: PathBuf,
        #[command(flatten)]
        clustering: ClusteringArgs,
        #[command(flatten)]
        pool: PoolArgs,
    },
    /// Run every component and print the combined report
    Report {
        /// Records export (JSON array, or object keyed by collection)
        records: PathBuf,
        #[command(flatten)]
        clustering: ClusteringArgs,
        #[command(flatten)]
        pool: PoolArgs,
    },
}

/// Overrides for the `[hotspots]` config section.
#[derive(Args)]
struct ClusteringArgs {
    /// Minimum records within the radius to form a cluster
    #[arg(long)]
    min_points: Option<usize>,
    /// Clustering radius in decimal degrees
    #[arg(long)]
    eps: Option<f64>,
    /// Clustering radius in metres (takes precedence over --eps)
    #[arg(long)]
    max_distance_m: Option<f64>,
}

impl ClusteringArgs {
    fn apply(&self, config: &mut HotspotConfig) {
        if let Some(min_points) = self.min_points {
            config.min_points = min_points;
        }
        if let Some(eps) = self.eps {
            config.eps = eps;
        }
        if self.max_distance_m.is_some() {
            config.max_distance_m = self.max_distance_m;
        }
    }
}

/// Overrides for the `[pool]` config section.
#[derive(Args)]
struct PoolArgs {
    /// Available volunteers
    #[arg(long)]
    volunteers: Option<u32>,
    /// Available budget
    #[arg(long)]
    budget: Option<f64>,
    /// Available vehicles
    #[arg(long)]
    vehicles: Option<u32>,
    /// Available equipment kits
    #[arg(long)]
    equipment: Option<u32>,
}

impl PoolArgs {
    fn apply(&self, pool: &mut ResourcePool) {
        if let Some(volunteers) = self.volunteers {
            pool.volunteers = volunteers;
        }
        if let Some(budget) = self.budget {
            pool.budget = budget;
        }
        if let Some(vehicles) = self.vehicles {
            pool.vehicles = vehicles;
        }
        if let Some(equipment) = self.equipment {
            pool.equipment = equipment;
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ForecastOutput {
    monthly: Vec<SeriesPoint>,
    forecast: Vec<ForecastPoint>,
    trend: TrendSummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AllocationOutput {
    allocations: Vec<ResourceAllocation>,
    remaining_pool: ResourcePool,
}

fn load_config(path: Option<&Path>) -> Result<AnalyticsConfig, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(path) => AnalyticsConfig::from_path(path)?,
        None => AnalyticsConfig::default_config(),
    })
}

fn reference_time(now: Option<&str>) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    match now {
        Some(raw) => parse_timestamp(raw)
            .ok_or_else(|| format!("Invalid --now timestamp: {raw}").into()),
        None => Ok(Utc::now()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    let now = reference_time(cli.now.as_deref())?;

    match cli.command {
        Commands::Hotspots {
            records,
            clustering,
        } => {
            clustering.apply(&mut config.hotspots);
            config.validate()?;
            let records = records::load_records(&records)?;
            let hotspots = detect_hotspots(&records, &config.hotspots.to_params(now));
            print_json(&hotspots)?;
        }
        Commands::Forecast {
            records,
            year,
            through,
        } => {
            let year = year.unwrap_or_else(|| now.year());
            let through = through.unwrap_or(if year == now.year() {
                u8::try_from(now.month()).unwrap_or(12)
            } else {
                12
            });
            let current_month =
                Month::try_from(through).map_err(|_| format!("Invalid month: {through}"))?;

            let records = records::load_records(&records)?;
            let monthly = monthly_series(&records, year);
            let history = &monthly[..usize::from(through).min(monthly.len())];
            let output = ForecastOutput {
                forecast: forecast(history, current_month),
                trend: analyze_trend(history),
                monthly,
            };
            print_json(&output)?;
        }
        Commands::Allocate {
            records,
            clustering,
            pool,
        } => {
            clustering.apply(&mut config.hotspots);
            pool.apply(&mut config.pool);
            config.validate()?;
            let records = records::load_records(&records)?;
            let hotspots = detect_hotspots(&records, &config.hotspots.to_params(now));
            let (remaining_pool, allocations) = allocate_with_remainder(&hotspots, config.pool);
            print_json(&AllocationOutput {
                allocations,
                remaining_pool,
            })?;
        }
        Commands::Recommend {
            records,
            clustering,
            pool,
        } => {
            clustering.apply(&mut config.hotspots);
            pool.apply(&mut config.pool);
            config.validate()?;
            let records = records::load_records(&records)?;
            let hotspots = detect_hotspots(&records, &config.hotspots.to_params(now));
            print_json(&generate_strategic_recommendations(&hotspots, config.pool))?;
        }
        Commands::Report {
            records,
            clustering,
            pool,
        } => {
            clustering.apply(&mut config.hotspots);
            pool.apply(&mut config.pool);
            config.validate()?;
            let records = records::load_records(&records)?;
            print_json(&build_report(&records, &config, now))?;
        }
    }

    Ok(())
}
