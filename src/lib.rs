//! Pezzottify Analytics Library
//!
//! Rolls raw engagement events into per-track stats and scores artists from
//! them. The binary wires these modules into a CLI and a long-running server.

pub mod aggregation;
pub mod analytics_store;
pub mod background_jobs;
pub mod config;
pub mod server;
pub mod sqlite_persistence;
pub mod strength;

// Re-export commonly used types for convenience
pub use aggregation::{AggregationError, AggregationReport, StatsAggregator};
pub use analytics_store::{AnalyticsStore, SqliteAnalyticsStore};
pub use strength::{ArtistStrengthCalculator, StrengthError, TimeRange};
