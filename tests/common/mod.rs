// real router over an in-memory store, driven with oneshot

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use storefront_api::models::{NewProduct, Price, RegisterRequest};
use storefront_api::services::auth;
use storefront_api::{AppState, CounterStore, MemoryCounterStore, MemoryStore, RateLimitConfig, Store, router};

pub struct TestApp {
    router: Router,
    pub store: Arc<MemoryStore>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn header_u64(&self, name: &str) -> u64 {
        self.header(name)
            .unwrap_or_else(|| panic!("missing header {name}"))
            .parse()
            .unwrap()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::default(), false)
    }

    pub fn with_config(rate_limits: RateLimitConfig, trust_proxy_headers: bool) -> Self {
        Self::build(Arc::new(MemoryCounterStore::new()), rate_limits, trust_proxy_headers)
    }

    /// Swap in a different counter backend.
    pub fn with_counters(counters: Arc<dyn CounterStore>) -> Self {
        Self::build(counters, RateLimitConfig::default(), false)
    }

    fn build(counters: Arc<dyn CounterStore>, rate_limits: RateLimitConfig, trust_proxy_headers: bool) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = Arc::new(AppState::new(
            Arc::clone(&store) as Arc<dyn Store>,
            counters,
            rate_limits,
            trust_proxy_headers,
        ));
        Self {
            router: router(state),
            store,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::ACCEPT, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Register a user and mint a token without going through the
    /// (rate limited) HTTP auth routes.
    pub async fn user_token(&self, email: &str) -> String {
        let profile = auth::register(
            self.store.as_ref(),
            RegisterRequest {
                name: Some(email.split('@').next().unwrap_or(email).to_string()),
                email: Some(email.to_string()),
                password: Some("password123".to_string()),
                password_confirmation: Some("password123".to_string()),
            },
        )
        .await
        .unwrap();
        auth::issue_token(self.store.as_ref(), profile.id).await.unwrap()
    }

    /// Insert a product directly into the store and return its id.
    pub async fn product(&self, name: &str) -> i64 {
        self.store
            .create_product(NewProduct {
                name: name.to_string(),
                description: format!("{name} description"),
                price: Price::from_decimal(19.99),
                stock: 5,
            })
            .await
            .unwrap()
            .id
            .0
    }
}
