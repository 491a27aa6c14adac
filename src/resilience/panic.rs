//! Panic capture for connection and handler tasks.
//!
//! A process-wide panic hook records the backtrace of the panicking thread
//! before it unwinds. Whoever catches the panic on that thread then turns
//! it into a [`PanicReport`] carrying the original stack.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::fmt;
use std::sync::Once;

/// Upper bound on the backtrace text kept for a panic.
pub const MAX_BACKTRACE_BYTES: usize = 64 << 10;

thread_local! {
    static LAST_BACKTRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static INSTALL_HOOK: Once = Once::new();

/// Chain a backtrace-recording hook in front of the current panic hook.
///
/// Idempotent; the previous hook still runs for every panic.
pub fn install_hook() {
    INSTALL_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let backtrace = truncate(Backtrace::force_capture().to_string(), MAX_BACKTRACE_BYTES);
            LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(backtrace));
            previous(info);
        }));
    });
}

/// Take the backtrace recorded for the latest panic on this thread.
fn take_backtrace() -> Option<String> {
    LAST_BACKTRACE.with(|slot| slot.borrow_mut().take())
}

/// A caught panic: its message and the stack at the panic site.
#[derive(Debug, Clone)]
pub struct PanicReport {
    pub message: String,
    pub backtrace: String,
}

impl PanicReport {
    /// Build a report from a payload caught on the panicking thread.
    ///
    /// Payloads that already are reports (re-raised across a task boundary)
    /// are passed through unchanged.
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        match payload.downcast::<PanicReport>() {
            Ok(report) => *report,
            Err(payload) => Self {
                message: panic_message(payload.as_ref()).to_string(),
                backtrace: take_backtrace().unwrap_or_else(|| "backtrace unavailable".to_string()),
            },
        }
    }
}

impl fmt::Display for PanicReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}

fn truncate(mut s: String, max: usize) -> String {
    if s.len() > max {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
    s
}
