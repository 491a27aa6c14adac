//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, keep-alive, error classification)
//!     → logging.rs (optional I/O tracing)
//!     → connection.rs (handshake, state machine, channel dispatch)
//!     → Hand off to session handlers
//!
//! Connection States (state.rs):
//!     New → Handshake → Active → Closed
//! ```
//!
//! # Design Decisions
//! - One task per connection, never blocking the accept loop
//! - Each connection reports every transition to the state hook
//! - Panics stop at the connection boundary

pub mod connection;
pub mod listener;
pub mod logging;
pub mod state;

pub use connection::{ConnInfo, ConnectionId, SESSION_CHANNEL_TYPE};
pub use listener::{is_temporary, KeepAliveListener, Listener, DEFAULT_KEEPALIVE};
pub use state::ConnState;
