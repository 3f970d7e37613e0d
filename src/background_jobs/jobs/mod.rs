//! Specific background job implementations.

pub mod artist_strength;
pub mod stats_aggregation;

pub use artist_strength::ArtistStrengthJob;
pub use stats_aggregation::StatsAggregationJob;
