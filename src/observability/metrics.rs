//! Metrics collection.
//!
//! # Metrics
//! - `easyssh_connections_accepted_total` (counter): sockets accepted
//! - `easyssh_accept_errors_total` (counter): accept failures by `kind`
//! - `easyssh_connection_state_total` (counter): transitions by `state`
//! - `easyssh_sessions_active` (gauge): handlers currently running
//! - `easyssh_channels_rejected_total` (counter): non-session channel offers
//! - `easyssh_connection_panics_total` (counter): contained panics
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; the embedding application picks
//!   the exporter
//! - Low-overhead metric updates (atomic operations)

use metrics::{describe_counter, describe_gauge};

pub const CONNECTIONS_ACCEPTED: &str = "easyssh_connections_accepted_total";
pub const ACCEPT_ERRORS: &str = "easyssh_accept_errors_total";

/// Register descriptions for every metric with the installed recorder.
pub fn describe() {
    describe_counter!(CONNECTIONS_ACCEPTED, "Raw connections accepted by the listener");
    describe_counter!(ACCEPT_ERRORS, "Listener accept failures");
    describe_counter!("easyssh_connection_state_total", "Connection state transitions");
    describe_gauge!("easyssh_sessions_active", "Session handlers currently running");
    describe_counter!("easyssh_channels_rejected_total", "Channel offers rejected for their type");
    describe_counter!("easyssh_connection_panics_total", "Panics contained at the connection boundary");
}

/// Record a failed accept.
pub fn record_accept_error(temporary: bool) {
    let kind = if temporary { "temporary" } else { "permanent" };
    metrics::counter!(ACCEPT_ERRORS, "kind" => kind).increment(1);
}

/// Record a successful accept.
pub fn record_accept() {
    metrics::counter!(CONNECTIONS_ACCEPTED).increment(1);
}
