use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use lazy_static::lazy_static;
use prometheus::{
    Counter, Histogram, IntCounterVec, register_counter, register_histogram,
    register_int_counter_vec,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("storefront_requests_total", "Total number of requests").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "storefront_request_latency_seconds",
        "Request latency in seconds"
    )
    .unwrap();
    pub static ref RATE_LIMITED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "storefront_rate_limited_total",
        "Requests rejected by the rate limiter",
        &["class"]
    )
    .unwrap();
    pub static ref WISHLIST_OPERATIONS: IntCounterVec = register_int_counter_vec!(
        "storefront_wishlist_operations_total",
        "Wishlist operations by outcome",
        &["operation", "outcome"]
    )
    .unwrap();
}

// count + time every request
pub async fn track_requests(request: Request, next: Next) -> Response {
    REQUEST_TOTAL.inc();
    let start = Instant::now();
    let response = next.run(request).await;
    REQUEST_LATENCY.observe(start.elapsed().as_secs_f64());
    response
}
