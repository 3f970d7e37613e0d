mod file_config;

pub use file_config::{AggregationConfig, FileConfig, PotentialConfig, StrengthConfig};

use crate::strength::{ConstantPotentialModel, MetricsSourcePolicy, TimeRange};
use anyhow::{anyhow, bail, Result};
use chrono::FixedOffset;
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_path: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub utc_offset: FixedOffset,

    // Feature configs (with defaults)
    pub aggregation: AggregationSettings,
    pub strength: StrengthSettings,
    pub potential: PotentialSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow!("db_path must be specified via --db-path or in config file")
            })?;

        // The database file may be created, its directory must exist
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                bail!("Database directory does not exist: {:?}", parent);
            }
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let utc_offset_minutes = file.utc_offset_minutes.unwrap_or(cli.utc_offset_minutes);
        let utc_offset = FixedOffset::east_opt(utc_offset_minutes * 60)
            .ok_or_else(|| anyhow!("Invalid utc_offset_minutes: {}", utc_offset_minutes))?;

        let agg_file = file.aggregation.unwrap_or_default();
        let agg_defaults = AggregationSettings::default();
        let aggregation = AggregationSettings {
            worker_threads: agg_file
                .worker_threads
                .unwrap_or(agg_defaults.worker_threads)
                .max(1),
            interval_hours: agg_file
                .interval_hours
                .unwrap_or(agg_defaults.interval_hours),
        };

        let strength_file = file.strength.unwrap_or_default();
        let strength_defaults = StrengthSettings::default();
        let time_ranges = match strength_file.time_ranges {
            Some(names) => names
                .iter()
                .map(|name| name.parse::<TimeRange>())
                .collect::<Result<Vec<_>, _>>()?,
            None => strength_defaults.time_ranges.clone(),
        };
        let aggregated_min_days = strength_file
            .aggregated_min_days
            .unwrap_or(DEFAULT_AGGREGATED_MIN_DAYS);
        let metrics_source = match strength_file.metrics_source {
            Some(name) => MetricsSourcePolicy::from_name(&name, aggregated_min_days)?,
            None => MetricsSourcePolicy::Auto {
                aggregated_min_days,
            },
        };
        let strength = StrengthSettings {
            worker_threads: strength_file
                .worker_threads
                .unwrap_or(strength_defaults.worker_threads)
                .max(1),
            interval_hours: strength_file
                .interval_hours
                .unwrap_or(strength_defaults.interval_hours),
            time_ranges,
            metrics_source,
            top_default_limit: strength_file
                .top_default_limit
                .unwrap_or(strength_defaults.top_default_limit),
        };

        let potential_file = file.potential.unwrap_or_default();
        let potential = PotentialSettings {
            genre_fit: potential_file
                .genre_fit
                .unwrap_or(ConstantPotentialModel::DEFAULT_GENRE_FIT),
            market_position: potential_file
                .market_position
                .unwrap_or(ConstantPotentialModel::DEFAULT_MARKET_POSITION),
            demographic_appeal: potential_file
                .demographic_appeal
                .unwrap_or(ConstantPotentialModel::DEFAULT_DEMOGRAPHIC_APPEAL),
        };

        Ok(Self {
            db_path,
            port,
            metrics_port,
            utc_offset,
            aggregation,
            strength,
            potential,
        })
    }
}

const DEFAULT_AGGREGATED_MIN_DAYS: u32 = 30;

#[derive(Debug, Clone)]
pub struct AggregationSettings {
    pub worker_threads: usize,
    pub interval_hours: u64,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            worker_threads: 4,
            interval_hours: 24,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StrengthSettings {
    pub worker_threads: usize,
    pub interval_hours: u64,
    pub time_ranges: Vec<TimeRange>,
    pub metrics_source: MetricsSourcePolicy,
    pub top_default_limit: usize,
}

impl Default for StrengthSettings {
    fn default() -> Self {
        Self {
            worker_threads: 4,
            interval_hours: 24,
            time_ranges: vec![
                TimeRange::SevenDays,
                TimeRange::ThirtyDays,
                TimeRange::NinetyDays,
                TimeRange::OneYear,
            ],
            metrics_source: MetricsSourcePolicy::Auto {
                aggregated_min_days: DEFAULT_AGGREGATED_MIN_DAYS,
            },
            top_default_limit: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PotentialSettings {
    pub genre_fit: f64,
    pub market_position: f64,
    pub demographic_appeal: f64,
}

impl PotentialSettings {
    pub fn model(&self) -> ConstantPotentialModel {
        ConstantPotentialModel::new(self.genre_fit, self.market_position, self.demographic_appeal)
    }
}
