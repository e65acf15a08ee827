// per-ip rate limiting, one bucket per "<class>|<client ip>"
// the hit is recorded before the handler runs

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::metrics::RATE_LIMITED_TOTAL;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimiterClass {
    Auth,
    Products,
    Wishlist,
    Api,
    Default,
}

impl LimiterClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimiterClass::Auth => "auth",
            LimiterClass::Products => "products",
            LimiterClass::Wishlist => "wishlist",
            LimiterClass::Api => "api",
            LimiterClass::Default => "default",
        }
    }

    pub fn deny_message(&self) -> &'static str {
        match self {
            LimiterClass::Auth => "Too many authentication attempts. Please try again later.",
            LimiterClass::Wishlist => "Too many wishlist operations. Please slow down.",
            _ => "Too many requests. Please try again later.",
        }
    }
}

impl fmt::Display for LimiterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Unknown names fall back to the default policy
impl FromStr for LimiterClass {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "auth" => LimiterClass::Auth,
            "products" => LimiterClass::Products,
            "wishlist" => LimiterClass::Wishlist,
            "api" => LimiterClass::Api,
            _ => LimiterClass::Default,
        })
    }
}

/// Attempts allowed per window. The window is configured in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub max_attempts: u32,
    pub decay_minutes: u64,
}

impl Limit {
    pub const fn per_minute(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            decay_minutes: 1,
        }
    }

    pub fn decay(&self) -> Duration {
        Duration::from_secs(self.decay_minutes * 60)
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub auth: Limit,
    pub products: Limit,
    pub wishlist: Limit,
    pub api: Limit,
    pub default: Limit,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            auth: Limit::per_minute(5),
            products: Limit::per_minute(20),
            wishlist: Limit::per_minute(30),
            api: Limit::per_minute(30),
            default: Limit::per_minute(25),
        }
    }
}

impl RateLimitConfig {
    pub fn limit_for(&self, class: LimiterClass) -> Limit {
        match class {
            LimiterClass::Auth => self.auth,
            LimiterClass::Products => self.products,
            LimiterClass::Wishlist => self.wishlist,
            LimiterClass::Api => self.api,
            LimiterClass::Default => self.default,
        }
    }
}

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("counter store unavailable: {0}")]
    Unavailable(String),
}

/// Shared hit counter with per-key expiry.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Hits recorded in the live window, 0 when there is none.
    async fn attempts(&self, key: &str) -> Result<u32, CounterError>;

    /// Atomically add one hit, opening a window of `decay` if none is live.
    /// Returns the count after the increment.
    async fn hit(&self, key: &str, decay: Duration) -> Result<u32, CounterError>;

    /// Seconds until the live window closes, 0 when there is none.
    async fn available_in(&self, key: &str) -> Result<u64, CounterError>;
}

// Rate limit entry - one window for one key
struct Bucket {
    hits: u32,
    expires_at: Instant,
}

impl Bucket {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Process-local counter store.
#[derive(Default)]
pub struct MemoryCounterStore {
    buckets: DashMap<String, Bucket>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn attempts(&self, key: &str) -> Result<u32, CounterError> {
        let now = Instant::now();
        Ok(self
            .buckets
            .get(key)
            .filter(|b| b.is_live(now))
            .map_or(0, |b| b.hits))
    }

    async fn hit(&self, key: &str, decay: Duration) -> Result<u32, CounterError> {
        let now = Instant::now();

        // the entry guard holds the shard lock, so read-modify-write is atomic
        let mut bucket = self.buckets.entry(key.to_string()).or_insert(Bucket {
            hits: 0,
            expires_at: now + decay,
        });

        // window expired..? start a new one
        if !bucket.is_live(now) {
            bucket.hits = 0;
            bucket.expires_at = now + decay;
        }

        bucket.hits = bucket.hits.saturating_add(1);
        Ok(bucket.hits)
    }

    async fn available_in(&self, key: &str) -> Result<u64, CounterError> {
        let now = Instant::now();
        Ok(self
            .buckets
            .get(key)
            .filter(|b| b.is_live(now))
            .map_or(0, |b| {
                // round up so clients never retry a fraction too early
                let left = b.expires_at - now;
                left.as_secs() + u64::from(left.subsec_nanos() > 0)
            }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow { limit: u32, remaining: u32 },
    Deny { limit: u32, retry_after: u64 },
}

pub fn bucket_key(class: LimiterClass, client: &str) -> String {
    format!("{}|{}", class.as_str(), client)
}

pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// Check and charge one attempt for `client` under `class`.
    pub async fn check(&self, class: LimiterClass, client: &str) -> Result<Decision, CounterError> {
        let limit = self.config.limit_for(class);
        let max = limit.max_attempts;
        let key = bucket_key(class, client);

        if self.store.attempts(&key).await? >= max {
            return self.deny(&key, max).await;
        }

        let count = self.store.hit(&key, limit.decay()).await?;
        // lost a race with concurrent requests from the same client; the hit
        // stays counted but cannot outlive the window
        if count > max {
            return self.deny(&key, max).await;
        }

        Ok(Decision::Allow {
            limit: max,
            remaining: max.saturating_sub(count),
        })
    }

    /// Attempts left in the live window, floored at 0.
    pub async fn remaining(&self, class: LimiterClass, client: &str) -> Result<u32, CounterError> {
        let max = self.config.limit_for(class).max_attempts;
        let used = self.store.attempts(&bucket_key(class, client)).await?;
        Ok(max.saturating_sub(used))
    }

    async fn deny(&self, key: &str, limit: u32) -> Result<Decision, CounterError> {
        let retry_after = self.store.available_in(key).await?.max(1);
        Ok(Decision::Deny { limit, retry_after })
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish()
    }
}

/// Client identifier (IP address) for rate limiting.
///
/// Forwarding headers are honoured only when the deployment sits behind a
/// proxy that sets them.
pub fn client_ip(peer: Option<SocketAddr>, headers: &HeaderMap, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        if let Some(forwarded) = headers.get("x-forwarded-for")
            && let Ok(value) = forwarded.to_str()
            && let Some(ip) = value.split(',').next().map(str::trim)
            && !ip.is_empty()
        {
            return ip.to_string();
        }

        if let Some(real_ip) = headers.get("x-real-ip")
            && let Ok(value) = real_ip.to_str()
        {
            return value.trim().to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware state: which policy a route group runs under.
#[derive(Clone)]
pub struct Throttle {
    state: Arc<AppState>,
    class: LimiterClass,
}

impl Throttle {
    pub fn new(state: Arc<AppState>, class: LimiterClass) -> Self {
        Self { state, class }
    }
}

pub async fn throttle(State(throttle): State<Throttle>, request: Request, next: Next) -> Response {
    let Throttle { state, class } = throttle;
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_ip(peer, request.headers(), state.trust_proxy_headers);
    let limiter = &state.rate_limiter;

    let (limit, charged) = match limiter.check(class, &client).await {
        Ok(Decision::Allow { limit, remaining }) => (limit, remaining),
        Ok(Decision::Deny { limit, retry_after }) => {
            RATE_LIMITED_TOTAL.with_label_values(&[class.as_str()]).inc();
            debug!(class = %class, client = %client, retry_after, "rate limit exceeded");
            return AppError::RateLimited {
                class,
                limit,
                retry_after,
            }
            .into_response();
        }
        Err(e) => {
            // counter store down: let traffic through
            warn!(error = %e, class = %class, "rate limit check failed, allowing request");
            return next.run(request).await;
        }
    };

    let mut response = next.run(request).await;

    let remaining = limiter.remaining(class, &client).await.unwrap_or(charged);
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(config: RateLimitConfig) -> RateLimiter {
        RateLimiter::new(Arc::new(MemoryCounterStore::new()), config)
    }

    #[test]
    fn default_config() {
        let config = RateLimitConfig::default();
        assert_eq!(config.limit_for(LimiterClass::Auth).max_attempts, 5);
        assert_eq!(config.limit_for(LimiterClass::Products).max_attempts, 20);
        assert_eq!(config.limit_for(LimiterClass::Wishlist).max_attempts, 30);
        assert_eq!(config.limit_for(LimiterClass::Api).max_attempts, 30);
        assert_eq!(config.limit_for(LimiterClass::Default).max_attempts, 25);
        assert_eq!(config.auth.decay(), Duration::from_secs(60));
    }

    #[test]
    fn class_names() {
        assert_eq!("wishlist".parse::<LimiterClass>().unwrap(), LimiterClass::Wishlist);
        assert_eq!("search".parse::<LimiterClass>().unwrap(), LimiterClass::Default);
        assert_eq!(bucket_key(LimiterClass::Auth, "10.0.0.1"), "auth|10.0.0.1");
    }

    #[tokio::test(start_paused = true)]
    async fn denies_the_request_after_max_attempts() {
        let limiter = limiter(RateLimitConfig::default());

        for expected_remaining in (0..5).rev() {
            let decision = limiter.check(LimiterClass::Auth, "1.2.3.4").await.unwrap();
            assert_eq!(
                decision,
                Decision::Allow {
                    limit: 5,
                    remaining: expected_remaining
                }
            );
        }

        let decision = limiter.check(LimiterClass::Auth, "1.2.3.4").await.unwrap();
        assert_eq!(
            decision,
            Decision::Deny {
                limit: 5,
                retry_after: 60
            }
        );
        assert_eq!(limiter.remaining(LimiterClass::Auth, "1.2.3.4").await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn denied_requests_do_not_extend_the_window() {
        let limiter = limiter(RateLimitConfig::default());
        for _ in 0..5 {
            limiter.check(LimiterClass::Auth, "ip").await.unwrap();
        }
        tokio::time::advance(Duration::from_secs(45)).await;
        for _ in 0..3 {
            assert!(matches!(
                limiter.check(LimiterClass::Auth, "ip").await.unwrap(),
                Decision::Deny { retry_after: 15, .. }
            ));
        }
        tokio::time::advance(Duration::from_secs(15)).await;
        assert!(matches!(
            limiter.check(LimiterClass::Auth, "ip").await.unwrap(),
            Decision::Allow { remaining: 4, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn buckets_are_per_class_and_client() {
        let limiter = limiter(RateLimitConfig {
            auth: Limit::per_minute(1),
            ..Default::default()
        });
        assert!(matches!(limiter.check(LimiterClass::Auth, "a").await.unwrap(), Decision::Allow { .. }));
        assert!(matches!(limiter.check(LimiterClass::Auth, "a").await.unwrap(), Decision::Deny { .. }));
        assert!(matches!(limiter.check(LimiterClass::Auth, "b").await.unwrap(), Decision::Allow { .. }));
        assert!(matches!(limiter.check(LimiterClass::Products, "a").await.unwrap(), Decision::Allow { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn decay_is_configured_in_minutes() {
        let limiter = limiter(RateLimitConfig {
            wishlist: Limit {
                max_attempts: 1,
                decay_minutes: 2,
            },
            ..Default::default()
        });
        limiter.check(LimiterClass::Wishlist, "c").await.unwrap();
        assert_eq!(
            limiter.check(LimiterClass::Wishlist, "c").await.unwrap(),
            Decision::Deny {
                limit: 1,
                retry_after: 120
            }
        );
        tokio::time::advance(Duration::from_secs(119)).await;
        assert!(matches!(limiter.check(LimiterClass::Wishlist, "c").await.unwrap(), Decision::Deny { .. }));
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(matches!(limiter.check(LimiterClass::Wishlist, "c").await.unwrap(), Decision::Allow { .. }));
    }

    #[tokio::test]
    async fn concurrent_hits_never_exceed_the_limit() {
        let limiter = Arc::new(limiter(RateLimitConfig {
            api: Limit::per_minute(10),
            ..Default::default()
        }));
        let mut tasks = Vec::new();
        for _ in 0..50 {
            let limiter = Arc::clone(&limiter);
            tasks.push(tokio::spawn(async move {
                limiter.check(LimiterClass::Api, "same").await.unwrap()
            }));
        }
        let mut allowed = 0;
        for task in tasks {
            if matches!(task.await.unwrap(), Decision::Allow { .. }) {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 10);
    }

    struct Unreachable;

    #[async_trait]
    impl CounterStore for Unreachable {
        async fn attempts(&self, _key: &str) -> Result<u32, CounterError> {
            Err(CounterError::Unavailable("refused".into()))
        }

        async fn hit(&self, _key: &str, _decay: Duration) -> Result<u32, CounterError> {
            Err(CounterError::Unavailable("refused".into()))
        }

        async fn available_in(&self, _key: &str) -> Result<u64, CounterError> {
            Err(CounterError::Unavailable("refused".into()))
        }
    }

    #[tokio::test]
    async fn store_errors_surface_to_the_caller() {
        let limiter = RateLimiter::new(Arc::new(Unreachable), RateLimitConfig::default());
        assert!(limiter.check(LimiterClass::Products, "ip").await.is_err());
        assert!(limiter.remaining(LimiterClass::Products, "ip").await.is_err());
    }

    #[test]
    fn client_ip_ignores_forwarding_headers_unless_trusted() {
        let peer: SocketAddr = "192.168.1.9:5555".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());

        assert_eq!(client_ip(Some(peer), &headers, false), "192.168.1.9");
        assert_eq!(client_ip(Some(peer), &headers, true), "203.0.113.7");
        assert_eq!(client_ip(None, &HeaderMap::new(), true), "unknown");

        let mut real = HeaderMap::new();
        real.insert("x-real-ip", "198.51.100.2".parse().unwrap());
        assert_eq!(client_ip(Some(peer), &real, true), "198.51.100.2");
    }
}
