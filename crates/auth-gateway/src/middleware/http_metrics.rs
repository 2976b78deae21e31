//! HTTP metrics middleware for capturing all request/response metrics.
//!
//! Applied as the outermost layer so it sees every response, including
//! framework-level errors that occur before handlers run (404, 405, 400
//! from malformed bodies, and so on).

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics::{record_http_request, track_in_flight};

/// Middleware that records HTTP request metrics for all responses.
///
/// Captures the request method, the path (normalized before labeling to
/// keep metric cardinality bounded), the response status and the request
/// duration, plus an in-flight request gauge.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let _in_flight = track_in_flight();

    let response = next.run(request).await;

    let duration = start.elapsed();
    record_http_request(&method, &path, response.status().as_u16(), duration);

    response
}
