//! Analytics HTTP routes.
//!
//! Every handler delegates to the synchronous services on the blocking pool.

use super::state::{GuardedAggregator, GuardedCalculator, ServerState};
use super::ServerConfig;
use crate::aggregation::period::parse_date;
use crate::aggregation::{AggregationError, AggregationReport};
use crate::analytics_store::RankedArtist;
use crate::strength::{BatchReport, StrengthError, StrengthScore, TimeRange};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Errors surfaced by the analytics routes.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => {
                error!("Analytics request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

impl From<StrengthError> for ApiError {
    fn from(e: StrengthError) -> Self {
        match e {
            StrengthError::InvalidTimeRange(_) | StrengthError::InvalidMetricsSource(_) => {
                ApiError::BadRequest(e.to_string())
            }
            StrengthError::Cancelled => ApiError::Unavailable(e.to_string()),
            StrengthError::Store(_) | StrengthError::WorkerPool(_) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<AggregationError> for ApiError {
    fn from(e: AggregationError) -> Self {
        match e {
            AggregationError::InvalidDate(_) | AggregationError::InvalidRange { .. } => {
                ApiError::BadRequest(e.to_string())
            }
            AggregationError::Cancelled => ApiError::Unavailable(e.to_string()),
            _ => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("Blocking task failed: {}", e))
    }
}

fn parse_time_range(value: Option<&str>, default: TimeRange) -> Result<TimeRange, ApiError> {
    match value {
        Some(value) => Ok(value.parse::<TimeRange>()?),
        None => Ok(default),
    }
}

// =============================================================================
// Artists
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct TopArtistsQuery {
    pub time_range: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TopArtistsResponse {
    pub time_range: TimeRange,
    pub artists: Vec<RankedArtist>,
}

/// GET /artists/top
async fn get_top_artists(
    State(calculator): State<GuardedCalculator>,
    State(config): State<ServerConfig>,
    Query(query): Query<TopArtistsQuery>,
) -> Result<Json<TopArtistsResponse>, ApiError> {
    let time_range = parse_time_range(query.time_range.as_deref(), config.default_time_range)?;
    let limit = query
        .limit
        .unwrap_or(config.top_default_limit)
        .min(config.top_max_limit);

    let artists =
        tokio::task::spawn_blocking(move || calculator.get_top_artists(time_range, limit))
            .await??;
    Ok(Json(TopArtistsResponse {
        time_range,
        artists,
    }))
}

#[derive(Debug, Deserialize)]
pub struct StrengthQuery {
    pub time_range: Option<String>,
}

/// GET /artists/{id}/strength
async fn get_artist_strength(
    State(calculator): State<GuardedCalculator>,
    State(config): State<ServerConfig>,
    Path(artist_id): Path<String>,
    Query(query): Query<StrengthQuery>,
) -> Result<Json<StrengthScore>, ApiError> {
    let time_range = parse_time_range(query.time_range.as_deref(), config.default_time_range)?;
    let score = tokio::task::spawn_blocking(move || {
        calculator.calculate_artist_strength_score(&artist_id, time_range)
    })
    .await??;
    Ok(Json(score))
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub time_range: String,
}

/// POST /artists/strength/batch
async fn post_strength_batch(
    State(calculator): State<GuardedCalculator>,
    Json(body): Json<BatchRequest>,
) -> Result<Json<BatchReport>, ApiError> {
    let time_range: TimeRange = body.time_range.parse()?;
    let report =
        tokio::task::spawn_blocking(move || calculator.batch_calculate_scores(time_range))
            .await??;
    if !report.failed.is_empty() {
        warn!(
            "Strength batch {} requested over HTTP had {} failures",
            time_range,
            report.failed.len()
        );
    }
    Ok(Json(report))
}

// =============================================================================
// Aggregations
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RunAggregationsRequest {
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct AggregationsResponse {
    pub reports: Vec<AggregationReport>,
}

/// POST /aggregations/run
async fn post_run_aggregations(
    State(aggregator): State<GuardedAggregator>,
    Json(body): Json<RunAggregationsRequest>,
) -> Result<Json<AggregationsResponse>, ApiError> {
    let date = parse_date(&body.date)?;
    let reports =
        tokio::task::spawn_blocking(move || aggregator.run_all_aggregations(date)).await??;
    Ok(Json(AggregationsResponse { reports }))
}

#[derive(Debug, Deserialize)]
pub struct BackfillRequest {
    pub from: String,
    pub to: String,
}

/// POST /aggregations/backfill
async fn post_backfill(
    State(aggregator): State<GuardedAggregator>,
    Json(body): Json<BackfillRequest>,
) -> Result<Json<AggregationsResponse>, ApiError> {
    let from = parse_date(&body.from)?;
    let to = parse_date(&body.to)?;
    let reports = tokio::task::spawn_blocking(move || aggregator.backfill(from, to)).await??;
    Ok(Json(AggregationsResponse { reports }))
}

pub fn make_analytics_routes(state: ServerState) -> Router {
    Router::new()
        .route("/artists/top", get(get_top_artists))
        .route("/artists/{id}/strength", get(get_artist_strength))
        .route("/artists/strength/batch", post(post_strength_batch))
        .route("/aggregations/run", post(post_run_aggregations))
        .route("/aggregations/backfill", post(post_backfill))
        .with_state(state)
}
