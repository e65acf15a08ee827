use std::sync::Arc;

use crate::rate_limit::{CounterStore, RateLimitConfig, RateLimiter};
use crate::store::Store;

// app's shared state
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub rate_limiter: RateLimiter,
    pub trust_proxy_headers: bool, // take client ip from X-Forwarded-For / X-Real-IP
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        counters: Arc<dyn CounterStore>,
        rate_limits: RateLimitConfig,
        trust_proxy_headers: bool,
    ) -> Self {
        Self {
            store,
            rate_limiter: RateLimiter::new(counters, rate_limits),
            trust_proxy_headers,
        }
    }
}
