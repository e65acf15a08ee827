use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{delete, get, post};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::extract::require_auth;
use crate::handlers::{
    add_to_wishlist, clear_wishlist, create_product, current_user, delete_product, get_product,
    health_handler, list_products, list_wishlist, login, logout, metrics_handler, register,
    remove_from_wishlist, update_product,
};
use crate::metrics::track_requests;
use crate::rate_limit::{LimiterClass, Throttle, throttle};
use crate::state::AppState;

/// Build the full application router.
pub fn router(state: Arc<AppState>) -> Router {
    // login/register, throttled per ip
    let auth = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .layer(middleware::from_fn_with_state(
            Throttle::new(Arc::clone(&state), LimiterClass::Auth),
            throttle,
        ));

    // token holders only, no limiter
    let session = Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/user", get(current_user));

    // reads are public; writes check the token inside the limiter
    let products = Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .layer(middleware::from_fn_with_state(
            Throttle::new(Arc::clone(&state), LimiterClass::Products),
            throttle,
        ));

    // auth runs first (outer layer), then the limiter
    let wishlist = Router::new()
        .route(
            "/wishlist",
            get(list_wishlist).post(add_to_wishlist).delete(clear_wishlist),
        )
        .route("/wishlist/{product_id}", delete(remove_from_wishlist))
        .layer(middleware::from_fn_with_state(
            Throttle::new(Arc::clone(&state), LimiterClass::Wishlist),
            throttle,
        ))
        .layer(middleware::from_fn_with_state(Arc::clone(&state), require_auth));

    let api = Router::new()
        .merge(auth)
        .merge(session)
        .merge(products)
        .merge(wishlist);

    Router::new()
        .nest("/api", api)
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .method_not_allowed_fallback(|| async { AppError::MethodNotAllowed })
        .fallback(|| async { AppError::NotFound("Endpoint not found".to_string()) })
        .layer(middleware::from_fn(track_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
