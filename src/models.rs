use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use validator::Validate;

// Row identifiers. Kept distinct so a product id can never be passed where
// a user id is expected.
macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_type!(UserId);
id_type!(ProductId);
id_type!(WishlistId);
id_type!(TokenId);

// Money in cents, rendered with two decimals ("19.99")
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(i64);

impl Price {
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn from_decimal(value: f64) -> Self {
        Self((value * 100.0).round() as i64)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

// What the API exposes of a user. The password hash never leaves the store.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

// Stored half of a bearer token: only the digest of the secret is kept.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub id: TokenId,
    pub user_id: UserId,
    pub secret_hash: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub stock: i64,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub stock: i64,
}

// Partial update; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub stock: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub name: Option<String>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(name) = &self.name
            && !product.name.to_lowercase().contains(&name.to_lowercase())
        {
            return false;
        }
        if let Some(min) = self.min_price
            && product.price < min
        {
            return false;
        }
        if let Some(max) = self.max_price
            && product.price > max
        {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct WishlistEntry {
    pub id: WishlistId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub created_at: DateTime<Utc>,
}

// Pagination request (1-based page)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    pub fn new(page: Option<u64>, per_page: u64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.max(1),
        }
    }

    // page comes straight from the query string; past the end is just empty
    pub fn offset(&self) -> usize {
        (self.page - 1)
            .checked_mul(self.per_page)
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(usize::MAX)
    }
}

// One page of rows. `request` is `None` when the caller asked for everything.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub request: Option<PageRequest>,
}

impl<T> Page<T> {
    pub fn slice(all: Vec<T>, request: Option<PageRequest>) -> Self {
        let total = all.len() as u64;
        let items = match request {
            Some(req) => all
                .into_iter()
                .skip(req.offset())
                .take(usize::try_from(req.per_page).unwrap_or(usize::MAX))
                .collect(),
            None => all,
        };
        Self {
            items,
            total,
            request,
        }
    }

    pub fn last_page(&self) -> u64 {
        match self.request {
            Some(req) => self.total.div_ceil(req.per_page).max(1),
            None => 1,
        }
    }
}

// ---- request payloads ----

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        required(message = "The name field is required."),
        length(min = 1, max = 255, message = "The name field must be between 1 and 255 characters.")
    )]
    pub name: Option<String>,

    #[validate(
        required(message = "The email field is required."),
        email(message = "The email field must be a valid email address.")
    )]
    pub email: Option<String>,

    #[validate(
        required(message = "The password field is required."),
        length(min = 8, message = "The password field must be at least 8 characters.")
    )]
    pub password: Option<String>,

    #[serde(default)]
    pub password_confirmation: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(
        required(message = "The email field is required."),
        email(message = "The email field must be a valid email address.")
    )]
    pub email: Option<String>,

    #[validate(
        required(message = "The password field is required."),
        length(min = 1, message = "The password field is required.")
    )]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(
        required(message = "The name field is required."),
        length(min = 1, max = 255, message = "The name field must be between 1 and 255 characters.")
    )]
    pub name: Option<String>,

    #[validate(
        required(message = "The description field is required."),
        length(min = 1, message = "The description field is required.")
    )]
    pub description: Option<String>,

    #[validate(
        required(message = "The price field is required."),
        range(min = 0.0, message = "The price field must be at least 0.")
    )]
    pub price: Option<f64>,

    #[validate(
        required(message = "The stock field is required."),
        range(min = 0, message = "The stock field must be at least 0.")
    )]
    pub stock: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255, message = "The name field must be between 1 and 255 characters."))]
    pub name: Option<String>,

    #[validate(length(min = 1, message = "The description field is required."))]
    pub description: Option<String>,

    #[validate(range(min = 0.0, message = "The price field must be at least 0."))]
    pub price: Option<f64>,

    #[validate(range(min = 0, message = "The stock field must be at least 0."))]
    pub stock: Option<i64>,
}

impl From<UpdateProductRequest> for ProductChanges {
    fn from(req: UpdateProductRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            price: req.price.map(Price::from_decimal),
            stock: req.stock,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddToWishlistRequest {
    #[validate(required(message = "The product id field is required."))]
    pub product_id: Option<i64>,
}

// Query string shared by the list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub name: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    #[serde(rename = "perPage")]
    pub per_page: Option<u64>,
    pub page: Option<u64>,
}

impl ListQuery {
    pub fn page_request(&self) -> Option<PageRequest> {
        self.per_page.map(|per_page| PageRequest::new(self.page, per_page))
    }

    pub fn filter(&self) -> ProductFilter {
        ProductFilter {
            name: self.name.clone().filter(|n| !n.is_empty()),
            min_price: self.min_price.map(Price::from_decimal),
            max_price: self.max_price.map(Price::from_decimal),
        }
    }
}
