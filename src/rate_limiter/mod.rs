//! Rate limiting subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → limiter.rs (map lookup under read lock)
//!     → bucket.rs (refill by elapsed monotonic time, take one token)
//!     → allowed / denied
//!
//! Background (1s period):
//!     limiter.rs refill pass → bucket.available() for every client
//! ```

pub mod bucket;
pub mod limiter;

pub use bucket::TokenBucket;
pub use limiter::RateLimiter;
