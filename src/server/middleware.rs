use std::time::Instant;

use axum::body::Body;
use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;

pub const RESPONSE_TIME_HEADER: &str = "x-response-time";

/// Stamp every response with how long the handler took.
pub async fn response_time(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let mut response = next.run(request).await;
    let elapsed = start.elapsed();

    if let Ok(value) = HeaderValue::from_str(&format!("{elapsed:?}")) {
        response.headers_mut().insert(RESPONSE_TIME_HEADER, value);
    }

    let status = response.status();
    if status.is_server_error() {
        tracing::error!("[http] {method} {path} -> {status} in {elapsed:?}");
    } else {
        crate::debug_event!("http", "request", "{method} {path} -> {status} in {elapsed:?}");
    }
    response
}
