mod auth;
mod health;
mod metrics;
mod products;
mod wishlist;

pub use auth::{current_user, login, logout, register};
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use products::{create_product, delete_product, get_product, list_products, update_product};
pub use wishlist::{add_to_wishlist, clear_wishlist, list_wishlist, remove_from_wishlist};
