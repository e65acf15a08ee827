use std::sync::Arc;

use axum::extract::{OriginalUri, State};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::extract::{AuthUser, PathParam, QueryParams, ValidatedJson};
use crate::models::{AddToWishlistRequest, ListQuery, Product, ProductId};
use crate::response::ApiResponse;
use crate::services::wishlist::{self, RemoveOutcome, WishlistItem};
use crate::state::AppState;

pub async fn list_wishlist(
    State(state): State<Arc<AppState>>,
    AuthUser(session): AuthUser,
    OriginalUri(uri): OriginalUri,
    QueryParams(query): QueryParams<ListQuery>,
) -> AppResult<ApiResponse<Vec<Product>>> {
    let page = wishlist::list(state.store.as_ref(), session.user_id, query.page_request()).await?;
    Ok(ApiResponse::page(page, uri.path(), "Wishlists retrieved successfully"))
}

// 201 when the row was created, 200 when it was already there
pub async fn add_to_wishlist(
    State(state): State<Arc<AppState>>,
    AuthUser(session): AuthUser,
    ValidatedJson(payload): ValidatedJson<AddToWishlistRequest>,
) -> AppResult<ApiResponse<WishlistItem>> {
    let product_id = payload
        .product_id
        .map(ProductId)
        .ok_or_else(|| AppError::required("product_id"))?;

    let outcome = wishlist::add_product(state.store.as_ref(), session.user_id, product_id).await?;
    let response = if outcome.created() {
        ApiResponse::created(outcome.into_item(), "Product added to wishlist successfully")
    } else {
        ApiResponse::ok(outcome.into_item(), "Product is already in your wishlist")
    };
    Ok(response)
}

// a miss is 400, not 404
pub async fn remove_from_wishlist(
    State(state): State<Arc<AppState>>,
    AuthUser(session): AuthUser,
    PathParam(product_id): PathParam<i64>,
) -> AppResult<ApiResponse<Option<()>>> {
    match wishlist::remove_product(state.store.as_ref(), session.user_id, ProductId(product_id)).await? {
        RemoveOutcome::Removed => Ok(ApiResponse::ok(None, "Product removed from wishlist successfully")),
        RemoveOutcome::NotFound => Err(AppError::BadRequest(
            "Product not found in your wishlist".to_string(),
        )),
    }
}

pub async fn clear_wishlist(
    State(state): State<Arc<AppState>>,
    AuthUser(session): AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let removed = wishlist::clear(state.store.as_ref(), session.user_id).await?;
    Ok(ApiResponse::ok(json!({ "items_removed": removed }), "Wishlist cleared successfully"))
}
