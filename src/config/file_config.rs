use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_path: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    /// Offset of the local day used for daily buckets, in minutes east of UTC
    pub utc_offset_minutes: Option<i32>,

    // Feature configs
    pub aggregation: Option<AggregationConfig>,
    pub strength: Option<StrengthConfig>,
    pub potential: Option<PotentialConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct AggregationConfig {
    pub worker_threads: Option<usize>,
    pub interval_hours: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct StrengthConfig {
    pub worker_threads: Option<usize>,
    pub interval_hours: Option<u64>,
    /// Ranges the background job scores, e.g. ["7d", "30d"]
    pub time_ranges: Option<Vec<String>>,
    /// "raw", "aggregated" or "auto"
    pub metrics_source: Option<String>,
    pub aggregated_min_days: Option<u32>,
    pub top_default_limit: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PotentialConfig {
    pub genre_fit: Option<f64>,
    pub market_position: Option<f64>,
    pub demographic_appeal: Option<f64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config: FileConfig = toml::from_str(
            r#"
            db_path = "/data/analytics.db"
            port = 3100
            utc_offset_minutes = 60

            [aggregation]
            worker_threads = 8

            [strength]
            time_ranges = ["7d", "1y"]
            metrics_source = "auto"
            aggregated_min_days = 60

            [potential]
            genre_fit = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.db_path.as_deref(), Some("/data/analytics.db"));
        assert_eq!(config.port, Some(3100));
        assert_eq!(config.metrics_port, None);
        assert_eq!(config.utc_offset_minutes, Some(60));
        assert_eq!(config.aggregation.unwrap().worker_threads, Some(8));
        let strength = config.strength.unwrap();
        assert_eq!(
            strength.time_ranges,
            Some(vec!["7d".to_string(), "1y".to_string()])
        );
        assert_eq!(strength.aggregated_min_days, Some(60));
        assert_eq!(config.potential.unwrap().genre_fit, Some(0.5));
    }

    #[test]
    fn test_parse_empty_config() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert!(config.db_path.is_none());
        assert!(config.strength.is_none());
    }
}
