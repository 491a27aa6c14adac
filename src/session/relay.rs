//! Channel-to-channel forwarding pumps.
//!
//! # Responsibilities
//! - Pipe one message stream into another, reshaping each item
//! - Drain streams nobody is interested in
//!
//! # Design Decisions
//! - One task per direction; order is preserved within a stream
//! - A pump stops as soon as either end goes away

use tokio::sync::mpsc;

/// Capacity of channels created by [`pipe`].
pub const RELAY_CAPACITY: usize = 16;

/// Forward every item of `rx` through `transform` onto a new channel.
///
/// Spawns one task that lives until `rx` is exhausted or the returned
/// receiver is dropped.
pub fn pipe<T, U, F>(mut rx: mpsc::Receiver<T>, transform: F) -> mpsc::Receiver<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: Fn(T) -> U + Send + 'static,
{
    let (tx, out) = mpsc::channel(RELAY_CAPACITY);
    tokio::spawn(async move {
        while let Some(item) = rx.recv().await {
            if tx.send(transform(item)).await.is_err() {
                break;
            }
        }
    });
    out
}

/// Drop every item of `rx` until the sender side closes.
pub async fn discard<T>(mut rx: mpsc::Receiver<T>) {
    let mut count: u64 = 0;
    while let Some(item) = rx.recv().await {
        drop(item);
        count += 1;
    }
    tracing::trace!(discarded = count, "Discard relay finished");
}
