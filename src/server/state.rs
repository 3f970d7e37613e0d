use axum::extract::FromRef;

use crate::aggregation::StatsAggregator;
use crate::strength::ArtistStrengthCalculator;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedAggregator = Arc<StatsAggregator>;
pub type GuardedCalculator = Arc<ArtistStrengthCalculator>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub aggregator: GuardedAggregator,
    pub calculator: GuardedCalculator,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        aggregator: GuardedAggregator,
        calculator: GuardedCalculator,
    ) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            aggregator,
            calculator,
        }
    }
}

impl FromRef<ServerState> for GuardedAggregator {
    fn from_ref(input: &ServerState) -> Self {
        input.aggregator.clone()
    }
}

impl FromRef<ServerState> for GuardedCalculator {
    fn from_ref(input: &ServerState) -> Self {
        input.calculator.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
