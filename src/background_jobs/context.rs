use crate::aggregation::StatsAggregator;
use crate::strength::ArtistStrengthCalculator;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Context provided to jobs during execution.
///
/// Contains the analytics services and a cancellation token for graceful
/// shutdown handling.
#[derive(Clone)]
pub struct JobContext {
    /// Token to check for cancellation/shutdown requests.
    pub cancellation_token: CancellationToken,

    pub aggregator: Arc<StatsAggregator>,

    pub calculator: Arc<ArtistStrengthCalculator>,
}

impl JobContext {
    pub fn new(
        cancellation_token: CancellationToken,
        aggregator: Arc<StatsAggregator>,
        calculator: Arc<ArtistStrengthCalculator>,
    ) -> Self {
        Self {
            cancellation_token,
            aggregator,
            calculator,
        }
    }

    /// Same services, different cancellation token.
    pub fn with_cancellation_token(&self, cancellation_token: CancellationToken) -> Self {
        Self {
            cancellation_token,
            aggregator: Arc::clone(&self.aggregator),
            calculator: Arc::clone(&self.calculator),
        }
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }
}
