//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream server
//! - Track liveness (last known reachability)
//!
//! Liveness is written by the health checker and by the dispatcher when a
//! backend fails persistently; it is read on every selection. A plain
//! `AtomicBool` keeps those paths lock-free.

use std::sync::atomic::{AtomicBool, Ordering};
use url::Url;

/// A single upstream server.
#[derive(Debug)]
pub struct Backend {
    /// Base URL requests are forwarded to.
    pub url: Url,
    /// Last known reachability of this backend.
    alive: AtomicBool,
}

impl Backend {
    /// Create a backend, initially considered alive.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            alive: AtomicBool::new(true),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::Release);
    }

    /// Host:port string used for reachability probes.
    pub fn probe_addr(&self) -> Option<String> {
        let host = self.url.host_str()?;
        let port = self.url.port_or_known_default()?;
        Some(format!("{}:{}", host, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_backend_starts_alive() {
        let b = Backend::new("http://127.0.0.1:8080".parse().unwrap());
        assert!(b.is_alive());
        b.set_alive(false);
        assert!(!b.is_alive());
    }

    #[test]
    fn probe_addr_uses_known_default_port() {
        let b = Backend::new("http://example.com".parse().unwrap());
        assert_eq!(b.probe_addr().unwrap(), "example.com:80");

        let b = Backend::new("http://10.0.0.1:9000".parse().unwrap());
        assert_eq!(b.probe_addr().unwrap(), "10.0.0.1:9000");
    }
}
