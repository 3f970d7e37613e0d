use crate::strength::TimeRange;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub metrics_port: u16,
    /// Range used by the top-artists endpoint when none is given
    pub default_time_range: TimeRange,
    pub top_default_limit: usize,
    pub top_max_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3002,
            metrics_port: 9092,
            default_time_range: TimeRange::SevenDays,
            top_default_limit: 10,
            top_max_limit: 100,
        }
    }
}
