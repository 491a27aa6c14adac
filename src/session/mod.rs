//! Per-session types handed to handlers.
//!
//! # Data Flow
//! ```text
//! transport channel stream + IncomingRequest stream
//!     → channel.rs (SessionChannel: stream + SessionContext)
//!     → relay.rs   (IncomingRequest → Request pump)
//!     → Handler::serve(permissions, channel, requests)
//! ```

pub mod channel;
pub mod relay;
pub mod request;

pub use channel::{SessionChannel, SessionContext};
pub use request::{Request, Requests};
