//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own seeded database.

use super::constants::*;
use super::fixtures::create_test_store;
use chrono::FixedOffset;
use pezzottify_analytics::analytics_store::SqliteAnalyticsStore;
use pezzottify_analytics::server::{make_app, ServerConfig, ServerState};
use pezzottify_analytics::strength::{ConstantPotentialModel, MetricsSourcePolicy};
use pezzottify_analytics::{ArtistStrengthCalculator, StatsAggregator};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with an isolated database
///
/// When dropped, the server gracefully shuts down and the database is removed.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Store for direct database access in tests
    pub store: Arc<SqliteAnalyticsStore>,

    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if the database cannot be seeded or the server does not
    /// become ready within the timeout.
    pub async fn spawn() -> Self {
        let (temp_db_dir, _db_path, store) =
            create_test_store().expect("Failed to create test database");
        let store = Arc::new(store);
        let offset = FixedOffset::east_opt(0).expect("Invalid offset");

        let aggregator = Arc::new(
            StatsAggregator::new(store.clone(), store.clone(), 2, offset)
                .expect("Failed to create aggregator"),
        );
        let calculator = Arc::new(
            ArtistStrengthCalculator::from_store(
                store.clone(),
                MetricsSourcePolicy::Raw,
                Arc::new(ConstantPotentialModel::default()),
                2,
                offset,
            )
            .expect("Failed to create calculator"),
        );

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            ..ServerConfig::default()
        };
        let app = make_app(ServerState::new(config, aggregator, calculator));

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            store,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };
        server.wait_for_ready().await;
        server
    }

    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);
        let url = format!("{}/v1/analytics/artists/top", self.base_url);

        while start.elapsed() < timeout {
            if client.get(&url).send().await.is_ok() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        panic!("Server did not become ready within {:?}", timeout);
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
