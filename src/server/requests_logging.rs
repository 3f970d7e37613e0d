//! Request logging and HTTP metrics middleware

use crate::server::metrics::record_http_request;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{Request, Response},
    middleware::Next,
};
use std::time::Instant;
use tracing::{info, warn};

pub async fn log_requests(request: Request<Body>, next: Next) -> Response<Body> {
    let start = Instant::now();
    let method = request.method().to_string();
    let uri = request.uri().to_string();
    // Route templates keep the path label cardinality bounded
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    info!(">>> {} {}", method, uri);
    let response = next.run(request).await;
    let elapsed = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        warn!("<<< {} {} {} ({:?})", method, uri, status.as_u16(), elapsed);
    } else {
        info!("<<< {} {} {} ({:?})", method, uri, status.as_u16(), elapsed);
    }
    record_http_request(&method, &path, status.as_u16(), elapsed);

    response
}
