//! Persisted client-quota store.
//!
//! # Data Flow
//! ```text
//! Startup:  sql.rs connect + migrate → load_all → rate limiter buckets
//! Admin op: durable write (insert/update/delete) → in-memory bucket mutation
//! ```
//!
//! # Design Decisions
//! - `ClientStore` is a real substitution seam: the SQL store backs
//!   production, an in-memory store backs tests without a database
//! - Each operation is a single fail-fast query; there is no transaction
//!   spanning the durable write and the in-memory mirror

pub mod entity;
pub mod memory;
pub mod sql;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub use memory::MemoryClientStore;
pub use sql::SqlClientStore;

/// Administrative representation of one client's quota.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub client_id: String,
    pub capacity: u32,
    pub rate_per_sec: f64,
}

/// Durable storage for client quotas.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Fetch every persisted client. Used at startup to build the bucket set.
    async fn load_all(&self) -> Result<Vec<ClientConfig>, Error>;

    /// Persist a new client. A duplicate key is a store-layer failure.
    async fn insert(&self, config: &ClientConfig) -> Result<(), Error>;

    /// Persist new quota values, creating the row when absent.
    async fn update(&self, config: &ClientConfig) -> Result<(), Error>;

    /// Remove a client. Deleting an unknown client succeeds.
    async fn delete(&self, client_id: &str) -> Result<(), Error>;
}
