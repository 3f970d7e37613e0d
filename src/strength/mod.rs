//! Artist strength scoring.
//!
//! Four sub-scores in [0, 100] (engagement, growth, quality, potential) are
//! computed from an artist's engagement over a [`TimeRange`] and combined
//! into a weighted overall score.

mod calculator;
mod metrics;
mod metrics_source;
mod potential;
pub mod scoring;
mod time_range;

pub use calculator::{ArtistStrengthCalculator, BatchReport, ScoreBreakdown, StrengthScore};
pub use metrics::{BaseMetrics, DerivedMetrics};
pub use metrics_source::{
    AggregatedMetricsSource, MetricsSource, MetricsSourcePolicy, RawEventMetricsSource,
    WindowMetrics,
};
pub use potential::{ConstantPotentialModel, PotentialInputs, PotentialModel};
pub use time_range::TimeRange;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrengthError {
    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),

    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("Invalid metrics source: {0}")]
    InvalidMetricsSource(String),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("Batch was cancelled")]
    Cancelled,
}
