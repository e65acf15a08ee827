// storage owns uniqueness (email, user+product) and the cascading deletes

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    AccessToken, NewProduct, NewUser, Page, PageRequest, Product, ProductChanges, ProductFilter,
    ProductId, TokenId, User, UserId, WishlistEntry,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated on {0}")]
    UniqueViolation(&'static str),

    #[error("foreign key violated on {0}")]
    ForeignKeyViolation(&'static str),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// Removes the user along with their tokens and wishlist rows.
    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError>;

    async fn create_token(&self, user_id: UserId, secret_hash: String) -> Result<AccessToken, StoreError>;
    async fn find_token(&self, id: TokenId) -> Result<Option<AccessToken>, StoreError>;
    async fn delete_token(&self, id: TokenId) -> Result<bool, StoreError>;
    async fn delete_user_tokens(&self, user_id: UserId) -> Result<u64, StoreError>;

    async fn list_products(
        &self,
        filter: &ProductFilter,
        page: Option<PageRequest>,
    ) -> Result<Page<Product>, StoreError>;
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;
    async fn create_product(&self, product: NewProduct) -> Result<Product, StoreError>;
    async fn update_product(&self, id: ProductId, changes: ProductChanges) -> Result<Option<Product>, StoreError>;
    /// Removes the product along with every wishlist row pointing at it.
    async fn delete_product(&self, id: ProductId) -> Result<bool, StoreError>;

    async fn find_wishlist_entry(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<WishlistEntry>, StoreError>;
    /// Fails with [`StoreError::UniqueViolation`] when the pair already exists.
    async fn insert_wishlist_entry(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<WishlistEntry, StoreError>;
    async fn delete_wishlist_entry(&self, user_id: UserId, product_id: ProductId) -> Result<bool, StoreError>;
    async fn clear_wishlist(&self, user_id: UserId) -> Result<u64, StoreError>;
    async fn wishlist_products(
        &self,
        user_id: UserId,
        page: Option<PageRequest>,
    ) -> Result<Page<Product>, StoreError>;
}
