use std::sync::Arc;

use axum::extract::{OriginalUri, State};

use crate::error::AppResult;
use crate::extract::{AuthUser, PathParam, QueryParams, ValidatedJson};
use crate::models::{CreateProductRequest, ListQuery, Product, ProductId, UpdateProductRequest};
use crate::response::ApiResponse;
use crate::services::products;
use crate::state::AppState;

pub async fn list_products(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    QueryParams(query): QueryParams<ListQuery>,
) -> AppResult<ApiResponse<Vec<Product>>> {
    let page = products::list(state.store.as_ref(), &query.filter(), query.page_request()).await?;
    Ok(ApiResponse::page(page, uri.path(), "Products retrieved successfully"))
}

pub async fn get_product(
    State(state): State<Arc<AppState>>,
    PathParam(id): PathParam<i64>,
) -> AppResult<ApiResponse<Product>> {
    let product = products::get(state.store.as_ref(), ProductId(id)).await?;
    Ok(ApiResponse::ok(product, format!("Product with Id {id} retrieved successfully")))
}

pub async fn create_product(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateProductRequest>,
) -> AppResult<ApiResponse<Product>> {
    let product = products::create(state.store.as_ref(), payload).await?;
    Ok(ApiResponse::created(product, "Product created successfully"))
}

pub async fn update_product(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    PathParam(id): PathParam<i64>,
    ValidatedJson(payload): ValidatedJson<UpdateProductRequest>,
) -> AppResult<ApiResponse<Product>> {
    let product = products::update(state.store.as_ref(), ProductId(id), payload).await?;
    Ok(ApiResponse::ok(product, "Product updated successfully"))
}

pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    PathParam(id): PathParam<i64>,
) -> AppResult<ApiResponse<Option<()>>> {
    products::delete(state.store.as_ref(), ProductId(id)).await?;
    Ok(ApiResponse::ok(None, "Product deleted successfully"))
}
