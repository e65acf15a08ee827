pub mod auth;
pub mod products;
pub mod wishlist;

use crate::error::{AppError, AppResult};

// unwrap a validated-required payload field
fn required<T>(value: Option<T>, field: &str) -> AppResult<T> {
    value.ok_or_else(|| AppError::required(field))
}
