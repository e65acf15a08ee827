use clap::Parser;

use crate::rate_limit::{Limit, RateLimitConfig};

// CLI argument structure; every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "storefront-api")]
#[command(about = "JSON API for users, products and wishlists")]
pub struct Args {
    // Address to bind
    #[arg(long, env = "STOREFRONT_HOST", default_value = "0.0.0.0")]
    pub host: String,

    // Port to run the server on
    #[arg(short, long, env = "STOREFRONT_PORT", default_value_t = 8080)]
    pub port: u16,

    // Max requests per window for login/register
    #[arg(long, env = "STOREFRONT_AUTH_RATE_LIMIT", default_value_t = 5)]
    pub auth_rate_limit: u32,

    // Max requests per window for the product catalog
    #[arg(long, env = "STOREFRONT_PRODUCTS_RATE_LIMIT", default_value_t = 20)]
    pub products_rate_limit: u32,

    // Max requests per window for wishlist operations
    #[arg(long, env = "STOREFRONT_WISHLIST_RATE_LIMIT", default_value_t = 30)]
    pub wishlist_rate_limit: u32,

    // Max requests per window for the generic api class
    #[arg(long, env = "STOREFRONT_API_RATE_LIMIT", default_value_t = 30)]
    pub api_rate_limit: u32,

    // Max requests per window for any other class
    #[arg(long, env = "STOREFRONT_DEFAULT_RATE_LIMIT", default_value_t = 25)]
    pub default_rate_limit: u32,

    // Rate limit window in minutes
    #[arg(long, env = "STOREFRONT_RATE_DECAY_MINUTES", default_value_t = 1)]
    pub rate_decay_minutes: u64,

    // Use X-Forwarded-For / X-Real-IP as the client address (behind a proxy only)
    #[arg(long, env = "STOREFRONT_TRUST_PROXY_HEADERS")]
    pub trust_proxy_headers: bool,
}

impl Args {
    pub fn rate_limit_config(&self) -> RateLimitConfig {
        let limit = |max_attempts| Limit {
            max_attempts,
            decay_minutes: self.rate_decay_minutes,
        };
        RateLimitConfig {
            auth: limit(self.auth_rate_limit),
            products: limit(self.products_rate_limit),
            wishlist: limit(self.wishlist_rate_limit),
            api: limit(self.api_rate_limit),
            default: limit(self.default_rate_limit),
        }
    }
}
