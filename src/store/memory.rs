use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::{Store, StoreError};
use crate::models::{
    AccessToken, NewProduct, NewUser, Page, PageRequest, Product, ProductChanges, ProductFilter,
    ProductId, TokenId, User, UserId, WishlistEntry, WishlistId,
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    tokens: BTreeMap<TokenId, AccessToken>,
    products: BTreeMap<ProductId, Product>,
    wishlists: BTreeMap<WishlistId, WishlistEntry>,
    // unique (user_id, product_id)
    wishlist_index: HashMap<(UserId, ProductId), WishlistId>,
    sequences: Sequences,
}

// per-table auto increment
#[derive(Default)]
struct Sequences {
    users: i64,
    tokens: i64,
    products: i64,
    wishlists: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

impl Tables {
    fn remove_wishlist_rows(&mut self, keep: impl Fn(&WishlistEntry) -> bool) -> u64 {
        let before = self.wishlists.len();
        self.wishlists.retain(|_, entry| keep(entry));
        self.wishlist_index
            .retain(|_, id| self.wishlists.contains_key(id));
        (before - self.wishlists.len()) as u64
    }
}

/// In-process store. All tables sit behind one lock so each call is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut t = self.tables.write();
        if t.users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(StoreError::UniqueViolation("users.email"));
        }
        let id = UserId(next(&mut t.sequences.users));
        let row = User {
            id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        t.users.insert(id, row.clone());
        Ok(row)
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let t = self.tables.read();
        Ok(t.users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        let mut t = self.tables.write();
        if t.users.remove(&id).is_none() {
            return Ok(false);
        }
        t.tokens.retain(|_, token| token.user_id != id);
        t.remove_wishlist_rows(|entry| entry.user_id != id);
        Ok(true)
    }

    async fn create_token(&self, user_id: UserId, secret_hash: String) -> Result<AccessToken, StoreError> {
        let mut t = self.tables.write();
        if !t.users.contains_key(&user_id) {
            return Err(StoreError::ForeignKeyViolation("tokens.user_id"));
        }
        let id = TokenId(next(&mut t.sequences.tokens));
        let token = AccessToken {
            id,
            user_id,
            secret_hash,
        };
        t.tokens.insert(id, token.clone());
        Ok(token)
    }

    async fn find_token(&self, id: TokenId) -> Result<Option<AccessToken>, StoreError> {
        Ok(self.tables.read().tokens.get(&id).cloned())
    }

    async fn delete_token(&self, id: TokenId) -> Result<bool, StoreError> {
        Ok(self.tables.write().tokens.remove(&id).is_some())
    }

    async fn delete_user_tokens(&self, user_id: UserId) -> Result<u64, StoreError> {
        let mut t = self.tables.write();
        let before = t.tokens.len();
        t.tokens.retain(|_, token| token.user_id != user_id);
        Ok((before - t.tokens.len()) as u64)
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
        page: Option<PageRequest>,
    ) -> Result<Page<Product>, StoreError> {
        let t = self.tables.read();
        let matching = t
            .products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        Ok(Page::slice(matching, page))
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.tables.read().products.get(&id).cloned())
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let mut t = self.tables.write();
        let id = ProductId(next(&mut t.sequences.products));
        let now = Utc::now();
        let row = Product {
            id,
            name: product.name,
            description: product.description,
            price: product.price,
            stock: product.stock,
            created_at: now,
            updated_at: now,
        };
        t.products.insert(id, row.clone());
        Ok(row)
    }

    async fn update_product(&self, id: ProductId, changes: ProductChanges) -> Result<Option<Product>, StoreError> {
        let mut t = self.tables.write();
        let Some(row) = t.products.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            row.name = name;
        }
        if let Some(description) = changes.description {
            row.description = description;
        }
        if let Some(price) = changes.price {
            row.price = price;
        }
        if let Some(stock) = changes.stock {
            row.stock = stock;
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, StoreError> {
        let mut t = self.tables.write();
        if t.products.remove(&id).is_none() {
            return Ok(false);
        }
        t.remove_wishlist_rows(|entry| entry.product_id != id);
        Ok(true)
    }

    async fn find_wishlist_entry(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<WishlistEntry>, StoreError> {
        let t = self.tables.read();
        Ok(t.wishlist_index
            .get(&(user_id, product_id))
            .and_then(|id| t.wishlists.get(id))
            .cloned())
    }

    async fn insert_wishlist_entry(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<WishlistEntry, StoreError> {
        let mut t = self.tables.write();
        if t.wishlist_index.contains_key(&(user_id, product_id)) {
            return Err(StoreError::UniqueViolation("wishlists.user_id_product_id"));
        }
        if !t.users.contains_key(&user_id) {
            return Err(StoreError::ForeignKeyViolation("wishlists.user_id"));
        }
        if !t.products.contains_key(&product_id) {
            return Err(StoreError::ForeignKeyViolation("wishlists.product_id"));
        }
        let id = WishlistId(next(&mut t.sequences.wishlists));
        let entry = WishlistEntry {
            id,
            user_id,
            product_id,
            created_at: Utc::now(),
        };
        t.wishlists.insert(id, entry.clone());
        t.wishlist_index.insert((user_id, product_id), id);
        Ok(entry)
    }

    async fn delete_wishlist_entry(&self, user_id: UserId, product_id: ProductId) -> Result<bool, StoreError> {
        let mut t = self.tables.write();
        match t.wishlist_index.remove(&(user_id, product_id)) {
            Some(id) => {
                t.wishlists.remove(&id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn clear_wishlist(&self, user_id: UserId) -> Result<u64, StoreError> {
        Ok(self
            .tables
            .write()
            .remove_wishlist_rows(|entry| entry.user_id != user_id))
    }

    async fn wishlist_products(
        &self,
        user_id: UserId,
        page: Option<PageRequest>,
    ) -> Result<Page<Product>, StoreError> {
        let t = self.tables.read();
        // ids are monotonic, so BTreeMap order is insertion order
        let products = t
            .wishlists
            .values()
            .filter(|entry| entry.user_id == user_id)
            .filter_map(|entry| t.products.get(&entry.product_id).cloned())
            .collect();
        Ok(Page::slice(products, page))
    }
}
