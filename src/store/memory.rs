//! In-memory client store for tests and local runs without a database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Error;
use crate::store::{ClientConfig, ClientStore};

/// Map-backed stand-in for the SQL store.
#[derive(Debug, Default)]
pub struct MemoryClientStore {
    rows: Mutex<HashMap<String, ClientConfig>>,
}

impl MemoryClientStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a client, for test setup.
    pub fn with_clients(clients: Vec<ClientConfig>) -> Self {
        let rows = clients
            .into_iter()
            .map(|c| (c.client_id.clone(), c))
            .collect();
        Self {
            rows: Mutex::new(rows),
        }
    }
}

#[async_trait]
impl ClientStore for MemoryClientStore {
    async fn load_all(&self) -> Result<Vec<ClientConfig>, Error> {
        let rows = self.rows.lock().expect("store mutex poisoned");
        Ok(rows.values().cloned().collect())
    }

    async fn insert(&self, config: &ClientConfig) -> Result<(), Error> {
        let mut rows = self.rows.lock().expect("store mutex poisoned");
        if rows.contains_key(&config.client_id) {
            return Err(Error::Conflict(config.client_id.clone()));
        }
        rows.insert(config.client_id.clone(), config.clone());
        Ok(())
    }

    async fn update(&self, config: &ClientConfig) -> Result<(), Error> {
        let mut rows = self.rows.lock().expect("store mutex poisoned");
        rows.insert(config.client_id.clone(), config.clone());
        Ok(())
    }

    async fn delete(&self, client_id: &str) -> Result<(), Error> {
        let mut rows = self.rows.lock().expect("store mutex poisoned");
        rows.remove(client_id);
        Ok(())
    }
}
