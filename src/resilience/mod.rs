//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Listener::accept fails
//!     → listener.rs decides: temporary or permanent
//!     → temporary: backoff.rs (sleep, doubling up to the cap)
//!     → successful accept resets the delay
//!
//! Connection or handler panics
//!     → panic.rs hook records the backtrace at the panic site
//!     → caught at the task boundary as a PanicReport
//!     → logged with the remote address, connection closed
//! ```

pub mod backoff;
pub mod panic;

pub use backoff::AcceptBackoff;
pub use panic::PanicReport;
