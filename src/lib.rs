//! Admission-controlled HTTP dispatch: per-client token-bucket rate
//! limiting in front of a liveness-aware, failover-capable backend pool.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod rate_limiter;
pub mod store;

pub use dispatch::Dispatcher;
pub use error::Error;
pub use health::HealthChecker;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
pub use load_balancer::{Backend, BackendPool};
pub use rate_limiter::RateLimiter;
