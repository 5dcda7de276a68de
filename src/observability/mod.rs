//! Observability subsystem.
//!
//! Structured logging lives with the code that emits it (`tracing` macros
//! throughout); this module carries the metrics recorders and the
//! Prometheus exposition endpoint.

pub mod metrics;
