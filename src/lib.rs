//! An http-server-like framework for multiplexed remote-session servers.
//!
//! Register a [`Handler`], add host keys, and call
//! [`Server::listen_and_serve`]. A [`Transport`] implementation performs the
//! key exchange, encryption, authentication and stream multiplexing; this
//! crate runs the accept loop, the per-connection state machine, and the
//! dispatch of `"session"` channels to the handler.
//!
//! # Architecture Overview
//!
//! ```text
//!   TCP client
//!   ──────────▶ net::listener ──▶ server (accept loop, backoff)
//!                                    │ spawn per connection
//!                                    ▼
//!                              net::connection ──▶ Transport::handshake
//!                                    │
//!               ┌────────────────────┼──────────────────────┐
//!               ▼                    ▼                      ▼
//!       global requests      channel offers          state hook
//!       (relay, discard)     "session" only          New→…→Closed
//!                                    │ spawn per session
//!                                    ▼
//!                     handler::dispatch → Handler::serve
//!                     (SessionChannel + Requests, context
//!                      cancelled when serve returns)
//! ```

// Core subsystems
pub mod handler;
pub mod net;
pub mod server;
pub mod session;
pub mod transport;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod observability;
pub mod resilience;

pub use config::ServerConfig;
pub use error::{HandshakeError, KeyError, ServerError};
pub use handler::{handler_fn, DefaultHandler, Handler};
pub use net::{ConnInfo, ConnState};
pub use server::Server;
pub use session::{Request, Requests, SessionChannel, SessionContext};
pub use transport::{HandshakeConfig, Permissions, Transport};
