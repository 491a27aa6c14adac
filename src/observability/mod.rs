//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//! ```
//!
//! # Design Decisions
//! - Errors the server cannot return (handshake failures, panics, accept
//!   retries) are reported as `error`/`warn` events
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
