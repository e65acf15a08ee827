pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

pub use config::Args;
pub use error::{AppError, AppResult};
pub use rate_limit::{CounterStore, MemoryCounterStore, RateLimitConfig};
pub use routes::router;
pub use state::AppState;
pub use store::{MemoryStore, Store};
