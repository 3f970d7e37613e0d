use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pezzottify_analytics::aggregation::period::parse_date;
use pezzottify_analytics::background_jobs::jobs::{ArtistStrengthJob, StatsAggregationJob};
use pezzottify_analytics::background_jobs::{JobContext, JobScheduler};
use pezzottify_analytics::config::{AppConfig, CliConfig, FileConfig};
use pezzottify_analytics::server::{metrics, run_metrics_server, run_server, ServerConfig, ServerState};
use pezzottify_analytics::{
    ArtistStrengthCalculator, SqliteAnalyticsStore, StatsAggregator, TimeRange,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
#[command(name = "pezzottify-analytics", about = "Engagement rollups and artist strength scores")]
struct CliArgs {
    /// Path to a TOML config file. Values in it override the flags below.
    #[clap(long, global = true, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite analytics database file.
    #[clap(long, global = true, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, global = true, default_value_t = 3002)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, global = true, default_value_t = 9092)]
    pub metrics_port: u16,

    /// Offset of the local day in minutes east of UTC.
    #[clap(long, global = true, default_value_t = 0, allow_hyphen_values = true)]
    pub utc_offset_minutes: i32,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the daily aggregation for a date, plus the rollups it closes.
    Aggregate {
        /// YYYY-MM-DD or YYYYMMDD
        #[clap(long)]
        date: String,
    },
    /// Run aggregations for every date in an inclusive range.
    Backfill {
        #[clap(long)]
        from: String,
        #[clap(long)]
        to: String,
    },
    /// Compute and store one artist's strength score.
    Score {
        #[clap(long)]
        artist: String,
        #[clap(long, default_value = "7d")]
        time_range: String,
    },
    /// Score every active artist.
    Batch {
        #[clap(long, default_value = "7d")]
        time_range: String,
    },
    /// Print the best stored scores.
    Top {
        #[clap(long, default_value = "7d")]
        time_range: String,
        #[clap(long)]
        limit: Option<usize>,
    },
    /// Serve the HTTP API and run the background jobs.
    Serve,
}

struct Services {
    aggregator: Arc<StatsAggregator>,
    calculator: Arc<ArtistStrengthCalculator>,
}

fn build_services(app_config: &AppConfig) -> Result<Services> {
    let store = Arc::new(SqliteAnalyticsStore::new(&app_config.db_path)?);
    let aggregator = StatsAggregator::new(
        store.clone(),
        store.clone(),
        app_config.aggregation.worker_threads,
        app_config.utc_offset,
    )?;
    let calculator = ArtistStrengthCalculator::from_store(
        store,
        app_config.strength.metrics_source,
        Arc::new(app_config.potential.model()),
        app_config.strength.worker_threads,
        app_config.utc_offset,
    )?;
    Ok(Services {
        aggregator: Arc::new(aggregator),
        calculator: Arc::new(calculator),
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let cli_config = CliConfig {
        db_path: cli_args.db_path.clone(),
        port: cli_args.port,
        metrics_port: cli_args.metrics_port,
        utc_offset_minutes: cli_args.utc_offset_minutes,
    };
    let app_config = AppConfig::resolve(&cli_config, file_config)?;

    metrics::init_metrics();
    let services = build_services(&app_config)?;

    match cli_args.command {
        Command::Aggregate { date } => {
            let date = parse_date(&date)?;
            let reports = services.aggregator.run_all_aggregations(date)?;
            print_json(&reports)
        }
        Command::Backfill { from, to } => {
            let reports = services
                .aggregator
                .backfill(parse_date(&from)?, parse_date(&to)?)?;
            print_json(&reports)
        }
        Command::Score { artist, time_range } => {
            let time_range: TimeRange = time_range.parse()?;
            let score = services
                .calculator
                .calculate_artist_strength_score(&artist, time_range)?;
            print_json(&score)
        }
        Command::Batch { time_range } => {
            let time_range: TimeRange = time_range.parse()?;
            let report = services.calculator.batch_calculate_scores(time_range)?;
            print_json(&report)
        }
        Command::Top { time_range, limit } => {
            let time_range: TimeRange = time_range.parse()?;
            let limit = limit.unwrap_or(app_config.strength.top_default_limit);
            let artists = services.calculator.get_top_artists(time_range, limit)?;
            print_json(&artists)
        }
        Command::Serve => serve(app_config, services).await,
    }
}

async fn serve(app_config: AppConfig, services: Services) -> Result<()> {
    let shutdown_token = CancellationToken::new();

    let job_context = JobContext::new(
        shutdown_token.child_token(),
        services.aggregator.clone(),
        services.calculator.clone(),
    );
    let mut scheduler = JobScheduler::new(shutdown_token.clone(), job_context);
    scheduler.register_job(Arc::new(StatsAggregationJob::from_settings(
        &app_config.aggregation,
    )));
    scheduler.register_job(Arc::new(ArtistStrengthJob::from_settings(
        &app_config.strength,
    )));
    let scheduler_handle = tokio::spawn(async move { scheduler.run().await });

    let server_config = ServerConfig {
        port: app_config.port,
        metrics_port: app_config.metrics_port,
        top_default_limit: app_config.strength.top_default_limit,
        ..ServerConfig::default()
    };
    let state = ServerState::new(server_config, services.aggregator, services.calculator);

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Shutdown signal received");
        signal_token.cancel();
    });

    let metrics_server = run_metrics_server(state.config.metrics_port, shutdown_token.clone());
    let api_server = run_server(state, shutdown_token.clone());
    let result = tokio::try_join!(api_server, metrics_server);

    // A server error also stops the scheduler
    shutdown_token.cancel();
    if let Err(e) = scheduler_handle.await {
        error!("Scheduler task failed: {}", e);
    }
    result.map(|_| ())
}
