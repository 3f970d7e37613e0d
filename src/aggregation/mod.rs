//! Multi-tier rollup of raw engagement events into per-track stats.
//!
//! Raw events fold into daily rows, daily rows into weekly rows, weekly into
//! monthly and monthly into yearly. Every tier is an idempotent upsert keyed
//! by `(track_id, period)`, so any period can be recomputed at will.

mod daily;
mod orchestrator;
pub mod period;
mod rollup;

pub use daily::fold_daily_rows;
pub use orchestrator::StatsAggregator;
pub use rollup::{fold_rollup_rows, weighted_average};

use crate::analytics_store::Granularity;
use chrono::NaiveDate;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid range: {from} is after {to}")]
    InvalidRange { from: NaiveDate, to: NaiveDate },

    #[error("Aggregation for {date} failed: {source}")]
    DateFailed {
        date: NaiveDate,
        #[source]
        source: Box<AggregationError>,
    },

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("Aggregation was cancelled")]
    Cancelled,
}

/// Outcome of one aggregator run.
#[derive(Debug, Clone, Serialize)]
pub struct AggregationReport {
    pub granularity: Granularity,
    /// First day of the aggregated period
    pub period_start: NaiveDate,
    pub tracks_processed: usize,
    pub rows_written: usize,
    #[serde(serialize_with = "serialize_duration_ms")]
    pub duration: Duration,
}

fn serialize_duration_ms<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}
