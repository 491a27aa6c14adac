//! Connection lifecycle states.

use std::fmt;

/// The state of a client connection, as reported to the state-change hook.
///
/// ```text
/// New → Handshake → Active → Closed
///  └───────┴──────────┴──────→ Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConnState {
    /// Just accepted. Every connection starts here.
    New,
    /// The transport handshake is running.
    Handshake,
    /// Authenticated; channels are being served.
    Active,
    /// The raw connection has been closed. Terminal.
    Closed,
}

impl ConnState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnState::New => "new",
            ConnState::Handshake => "handshake",
            ConnState::Active => "active",
            ConnState::Closed => "closed",
        }
    }

    /// Whether moving from `self` to `next` respects the lifecycle order.
    pub fn can_transition_to(&self, next: ConnState) -> bool {
        *self != ConnState::Closed && (next > *self)
    }
}

impl fmt::Display for ConnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
