//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Admitted request
//!     → pool.rs (advance cursor, scan for live backend)
//!     → backend.rs (liveness flag, probe address)
//!     → Return backend or "none live"
//! ```
//!
//! # Design Decisions
//! - One flat pool, round-robin only; liveness-aware cursor skip-ahead
//! - Dead backends excluded from selection, revived by the health checker
//! - Structural mutation is copy-on-write so selection never locks

pub mod backend;
pub mod pool;

pub use backend::Backend;
pub use pool::BackendPool;
