// add/remove/clear are safe to repeat; every call is scoped to the session's user

use serde::Serialize;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::metrics::WISHLIST_OPERATIONS;
use crate::models::{Page, PageRequest, Product, ProductId, UserId, WishlistEntry, WishlistId};
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Serialize)]
pub struct WishlistItem {
    pub wishlist_id: WishlistId,
    pub product: Product,
}

#[derive(Debug, Clone)]
pub enum AddOutcome {
    Created(WishlistItem),
    AlreadyExists(WishlistItem),
}

impl AddOutcome {
    pub fn created(&self) -> bool {
        matches!(self, AddOutcome::Created(_))
    }

    pub fn item(&self) -> &WishlistItem {
        match self {
            AddOutcome::Created(item) | AddOutcome::AlreadyExists(item) => item,
        }
    }

    pub fn into_item(self) -> WishlistItem {
        match self {
            AddOutcome::Created(item) | AddOutcome::AlreadyExists(item) => item,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}

const ADD_FAILED: &str = "Failed to add product to wishlist";

fn unknown_product() -> AppError {
    AppError::invalid("product_id", "The selected product id is invalid.")
}

fn record(operation: &str, outcome: &str) {
    WISHLIST_OPERATIONS.with_label_values(&[operation, outcome]).inc();
}

pub async fn list(store: &dyn Store, user_id: UserId, page: Option<PageRequest>) -> AppResult<Page<Product>> {
    store
        .wishlist_products(user_id, page)
        .await
        .map_err(|e| AppError::internal("Failed to retrieve products", e))
}

/// Add `product_id` to the user's wishlist, or report that it is already there.
///
/// Two concurrent adds may both miss the lookup; the store's unique
/// constraint lets one insert win and the loser re-reads the winner's row.
pub async fn add_product(store: &dyn Store, user_id: UserId, product_id: ProductId) -> AppResult<AddOutcome> {
    let product = store
        .find_product(product_id)
        .await
        .map_err(|e| AppError::internal(ADD_FAILED, e))?
        .ok_or_else(unknown_product)?;

    let existing = store
        .find_wishlist_entry(user_id, product_id)
        .await
        .map_err(|e| AppError::internal(ADD_FAILED, e))?;
    if let Some(entry) = existing {
        record("add", "already_exists");
        return Ok(AddOutcome::AlreadyExists(item(entry, product)));
    }

    match store.insert_wishlist_entry(user_id, product_id).await {
        Ok(entry) => {
            record("add", "created");
            debug!(user_id = %user_id, product_id = %product_id, "added to wishlist");
            Ok(AddOutcome::Created(item(entry, product)))
        }
        Err(StoreError::UniqueViolation(_)) => {
            let entry = store
                .find_wishlist_entry(user_id, product_id)
                .await
                .map_err(|e| AppError::internal(ADD_FAILED, e))?
                .ok_or_else(|| {
                    // conflicted, then vanished: a concurrent remove got in between
                    AppError::internal(ADD_FAILED, StoreError::Unavailable("wishlist row disappeared".into()))
                })?;
            record("add", "already_exists");
            Ok(AddOutcome::AlreadyExists(item(entry, product)))
        }
        // product deleted between lookup and insert
        Err(StoreError::ForeignKeyViolation(_)) => Err(unknown_product()),
        Err(e) => Err(AppError::internal(ADD_FAILED, e)),
    }
}

pub async fn remove_product(store: &dyn Store, user_id: UserId, product_id: ProductId) -> AppResult<RemoveOutcome> {
    let removed = store
        .delete_wishlist_entry(user_id, product_id)
        .await
        .map_err(|e| AppError::internal("Failed to remove product from wishlist", e))?;

    let outcome = if removed {
        RemoveOutcome::Removed
    } else {
        RemoveOutcome::NotFound
    };
    record("remove", if removed { "removed" } else { "not_found" });
    Ok(outcome)
}

/// Returns how many rows were deleted; zero is a normal result.
pub async fn clear(store: &dyn Store, user_id: UserId) -> AppResult<u64> {
    let removed = store
        .clear_wishlist(user_id)
        .await
        .map_err(|e| AppError::internal("Failed to clear wishlist", e))?;
    record("clear", "cleared");
    debug!(user_id = %user_id, removed, "wishlist cleared");
    Ok(removed)
}

fn item(entry: WishlistEntry, product: Product) -> WishlistItem {
    WishlistItem {
        wishlist_id: entry.id,
        product,
    }
}
