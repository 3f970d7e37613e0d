//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per analytics endpoint.

use super::constants::*;
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/analytics{}", self.base_url, path)
    }

    // ========================================================================
    // Artists
    // ========================================================================

    /// GET /v1/analytics/artists/top
    pub async fn get_top_artists(&self, time_range: &str, limit: usize) -> Response {
        let limit = limit.to_string();
        self.client
            .get(self.url("/artists/top"))
            .query(&[("time_range", time_range), ("limit", limit.as_str())])
            .send()
            .await
            .expect("Top artists request failed")
    }

    /// GET /v1/analytics/artists/{id}/strength
    pub async fn get_artist_strength(&self, artist_id: &str, time_range: &str) -> Response {
        self.client
            .get(self.url(&format!("/artists/{}/strength", artist_id)))
            .query(&[("time_range", time_range)])
            .send()
            .await
            .expect("Artist strength request failed")
    }

    /// POST /v1/analytics/artists/strength/batch
    pub async fn post_strength_batch(&self, time_range: &str) -> Response {
        self.client
            .post(self.url("/artists/strength/batch"))
            .json(&json!({ "time_range": time_range }))
            .send()
            .await
            .expect("Strength batch request failed")
    }

    // ========================================================================
    // Aggregations
    // ========================================================================

    /// POST /v1/analytics/aggregations/run
    pub async fn post_run_aggregations(&self, date: &str) -> Response {
        self.client
            .post(self.url("/aggregations/run"))
            .json(&json!({ "date": date }))
            .send()
            .await
            .expect("Run aggregations request failed")
    }

    /// POST /v1/analytics/aggregations/backfill
    pub async fn post_backfill(&self, from: &str, to: &str) -> Response {
        self.client
            .post(self.url("/aggregations/backfill"))
            .json(&json!({ "from": from, "to": to }))
            .send()
            .await
            .expect("Backfill request failed")
    }
}
