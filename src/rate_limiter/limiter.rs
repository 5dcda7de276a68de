//! Client-keyed admission control.
//!
//! # Responsibilities
//! - Own the client → bucket map (hot reads, cold writes)
//! - Answer the single admission question: `allow(client_id)`
//! - Keep bucket state fresh with a periodic background refill pass
//! - Apply administrative mutations durable-store-first
//!
//! # Design Decisions
//! - `allow` clones the bucket `Arc` out of the read lock before taking a
//!   token, so concurrent admission checks never serialize on the map
//! - The durable write happens before the in-memory mutation; on store
//!   failure the mirror is untouched and the error surfaces (best-effort
//!   consistency, not atomicity)
//! - Unknown client IDs deny rather than error (fail closed)

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;

use crate::error::Error;
use crate::rate_limiter::bucket::TokenBucket;
use crate::store::{ClientConfig, ClientStore};

/// Period of the background refill pass. The pass only bounds staleness of
/// token counts for idle clients; admission itself always refills lazily.
pub const REFILL_INTERVAL: Duration = Duration::from_secs(1);

/// A refill rate must be a non-negative finite number: a negative rate
/// would drain buckets below zero instead of replenishing them.
fn validate_quota(config: &ClientConfig) -> Result<(), Error> {
    if !config.rate_per_sec.is_finite() || config.rate_per_sec < 0.0 {
        return Err(Error::BadRequest(format!(
            "rate_per_sec must be a non-negative number, got {}",
            config.rate_per_sec
        )));
    }
    Ok(())
}

/// Per-client token-bucket rate limiter backed by a durable store.
pub struct RateLimiter {
    buckets: RwLock<HashMap<String, Arc<TokenBucket>>>,
    store: Arc<dyn ClientStore>,
    shutdown: broadcast::Sender<()>,
}

impl RateLimiter {
    /// Build the limiter, loading every persisted client into a fresh
    /// bucket. A load failure is fatal: callers must not serve admission
    /// checks without the configured quota set.
    pub async fn new(store: Arc<dyn ClientStore>) -> Result<Self, Error> {
        let clients = store.load_all().await?;
        let buckets = clients
            .into_iter()
            .map(|c| {
                tracing::debug!(client_id = %c.client_id, "Loaded client from store");
                (
                    c.client_id.clone(),
                    Arc::new(TokenBucket::new(c.capacity, c.rate_per_sec)),
                )
            })
            .collect();
        let (shutdown, _) = broadcast::channel(1);

        Ok(Self {
            buckets: RwLock::new(buckets),
            store,
            shutdown,
        })
    }

    /// Spawn the periodic refill loop. It exits when `stop` is called.
    pub fn spawn_refill(self: &Arc<Self>) -> JoinHandle<()> {
        let limiter = self.clone();
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            let mut ticker = time::interval(REFILL_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => limiter.refill_all(),
                    _ = shutdown.recv() => {
                        tracing::info!("Refill loop received shutdown signal, exiting");
                        break;
                    }
                }
            }
        })
    }

    /// Signal the refill loop to terminate. Non-blocking and idempotent:
    /// sending on the broadcast channel never waits, and a second call
    /// after the loop has exited is a no-op.
    pub fn stop(&self) {
        let _ = self.shutdown.send(());
    }

    /// Admission check: consume one token for the client, if it has one.
    pub fn allow(&self, client_id: &str) -> bool {
        let bucket = {
            let buckets = self.buckets.read().expect("bucket map lock poisoned");
            buckets.get(client_id).cloned()
        };
        match bucket {
            Some(bucket) => bucket.take(1.0),
            None => false,
        }
    }

    /// Touch every bucket so idle clients' token counts stay current.
    fn refill_all(&self) {
        let buckets = self.buckets.read().expect("bucket map lock poisoned");
        for bucket in buckets.values() {
            bucket.available();
        }
    }

    /// Create a client: persist the row, then install its bucket.
    pub async fn add_client(&self, config: ClientConfig) -> Result<(), Error> {
        validate_quota(&config)?;
        {
            let buckets = self.buckets.read().expect("bucket map lock poisoned");
            if buckets.contains_key(&config.client_id) {
                return Err(Error::Conflict(config.client_id.clone()));
            }
        }

        self.store.insert(&config).await?;

        let mut buckets = self.buckets.write().expect("bucket map lock poisoned");
        buckets.insert(
            config.client_id.clone(),
            Arc::new(TokenBucket::new(config.capacity, config.rate_per_sec)),
        );
        tracing::info!(client_id = %config.client_id, "Client added");
        Ok(())
    }

    /// Update quota values: persist first, then mutate (or create) the
    /// bucket. Takes effect on the very next `allow` for that client.
    pub async fn update_client(&self, config: ClientConfig) -> Result<(), Error> {
        validate_quota(&config)?;
        self.store.update(&config).await?;

        let mut buckets = self.buckets.write().expect("bucket map lock poisoned");
        match buckets.get(&config.client_id) {
            Some(bucket) => {
                bucket.set_capacity(config.capacity);
                bucket.set_rate(config.rate_per_sec);
            }
            None => {
                buckets.insert(
                    config.client_id.clone(),
                    Arc::new(TokenBucket::new(config.capacity, config.rate_per_sec)),
                );
            }
        }
        tracing::info!(client_id = %config.client_id, "Client updated");
        Ok(())
    }

    /// Remove a client and its bucket. Unknown clients succeed uniformly.
    pub async fn delete_client(&self, client_id: &str) -> Result<(), Error> {
        self.store.delete(client_id).await?;

        let mut buckets = self.buckets.write().expect("bucket map lock poisoned");
        buckets.remove(client_id);
        tracing::info!(client_id = %client_id, "Client deleted");
        Ok(())
    }

    #[cfg(test)]
    fn bucket_count(&self) -> usize {
        self.buckets.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryClientStore;

    fn config(id: &str, capacity: u32, rate: f64) -> ClientConfig {
        ClientConfig {
            client_id: id.to_string(),
            capacity,
            rate_per_sec: rate,
        }
    }

    async fn limiter_with(clients: Vec<ClientConfig>) -> RateLimiter {
        let store = Arc::new(MemoryClientStore::with_clients(clients));
        RateLimiter::new(store).await.unwrap()
    }

    #[tokio::test]
    async fn loads_persisted_clients_at_startup() {
        let limiter = limiter_with(vec![config("a", 1, 1.0), config("b", 1, 1.0)]).await;
        assert_eq!(limiter.bucket_count(), 2);
        assert!(limiter.allow("a"));
        assert!(limiter.allow("b"));
    }

    #[tokio::test]
    async fn unknown_client_always_denied() {
        let limiter = limiter_with(vec![]).await;
        assert!(!limiter.allow("nobody"));
    }

    #[tokio::test]
    async fn burst_then_deny_then_recover() {
        // capacity=5, rate=1/s: five immediate calls pass, the sixth fails,
        // and one more passes after a second of refill.
        let limiter = limiter_with(vec![config("tenant", 5, 1.0)]).await;

        for _ in 0..5 {
            assert!(limiter.allow("tenant"));
        }
        assert!(!limiter.allow("tenant"));

        tokio::time::sleep(Duration::from_millis(1050)).await;
        assert!(limiter.allow("tenant"));
    }

    #[tokio::test]
    async fn add_duplicate_client_conflicts() {
        let limiter = limiter_with(vec![config("dup", 1, 1.0)]).await;
        let err = limiter.add_client(config("dup", 2, 2.0)).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn negative_rate_is_rejected_on_create_and_update() {
        let limiter = limiter_with(vec![config("tenant", 5, 1.0)]).await;

        let err = limiter.add_client(config("bad", 5, -100.0)).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        assert!(!limiter.allow("bad"));

        let err = limiter
            .update_client(config("tenant", 5, f64::NAN))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        // The existing bucket is untouched by the rejected update.
        assert!(limiter.allow("tenant"));
    }

    #[tokio::test]
    async fn update_takes_effect_on_next_allow() {
        let limiter = limiter_with(vec![config("tenant", 1, 0.0)]).await;
        assert!(limiter.allow("tenant"));
        assert!(!limiter.allow("tenant"));

        // Raising the rate lets the very next call refill and pass.
        limiter.update_client(config("tenant", 5, 1000.0)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(limiter.allow("tenant"));
    }

    #[tokio::test]
    async fn update_of_unknown_client_creates_bucket() {
        let limiter = limiter_with(vec![]).await;
        limiter.update_client(config("fresh", 2, 1.0)).await.unwrap();
        assert!(limiter.allow("fresh"));
    }

    #[tokio::test]
    async fn delete_removes_bucket_and_unknown_delete_succeeds() {
        let limiter = limiter_with(vec![config("gone", 5, 1.0)]).await;
        limiter.delete_client("gone").await.unwrap();
        assert!(!limiter.allow("gone"));

        limiter.delete_client("never-existed").await.unwrap();
    }

    #[tokio::test]
    async fn stop_is_nonblocking_and_idempotent() {
        let limiter = Arc::new(limiter_with(vec![]).await);
        let handle = limiter.spawn_refill();

        limiter.stop();
        handle.await.unwrap();
        // Loop has exited; a second stop must not block or panic.
        limiter.stop();
    }
}
