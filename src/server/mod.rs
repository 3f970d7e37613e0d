mod analytics_routes;
pub mod config;
pub mod metrics;
mod requests_logging;
pub mod server;
pub mod state;

pub use analytics_routes::{ApiError, ErrorResponse};
pub use config::ServerConfig;
pub use server::{make_app, run_metrics_server, run_server};
pub use state::ServerState;
