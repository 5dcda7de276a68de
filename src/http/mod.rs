//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! GET /?client_id=x
//!     → handlers.rs (admission check)
//!     → rate limiter (take one token) → 429 on denial
//!     → dispatcher (select, forward, retry/failover) → backend response
//!
//! POST/PUT /clients, DELETE /clients/{client_id}
//!     → handlers.rs → rate limiter admin path → durable store
//! ```

pub mod handlers;
pub mod server;

pub use server::{AppState, HttpServer};
