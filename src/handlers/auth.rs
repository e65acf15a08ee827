use std::sync::Arc;

use axum::extract::State;
use serde_json::{Value, json};

use crate::error::AppResult;
use crate::extract::{AuthUser, ValidatedJson};
use crate::models::{LoginRequest, RegisterRequest, UserProfile};
use crate::response::ApiResponse;
use crate::services::auth::{self, LoginResponse};
use crate::state::AppState;

pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<ApiResponse<UserProfile>> {
    let user = auth::register(state.store.as_ref(), payload).await?;
    Ok(ApiResponse::created(user, "User registered successfully"))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<ApiResponse<LoginResponse>> {
    let login = auth::login(state.store.as_ref(), payload).await?;
    Ok(ApiResponse::ok(login, "Login successful"))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    AuthUser(session): AuthUser,
) -> AppResult<ApiResponse<Option<()>>> {
    auth::logout(state.store.as_ref(), session).await?;
    Ok(ApiResponse::ok(None, "Logged out successfully"))
}

pub async fn current_user(
    State(state): State<Arc<AppState>>,
    AuthUser(session): AuthUser,
) -> AppResult<ApiResponse<Value>> {
    let user = auth::current_user(state.store.as_ref(), session).await?;
    Ok(ApiResponse::ok(json!({ "user": user }), "Process successful"))
}
