//! Cancellation and deadline token accepted by every storage operation.
//!
//! # Responsibility
//! - Let callers abort in-flight statements by flag or deadline.
//! - Derive child tokens whose cancellation does not leak to the parent.
//!
//! # Invariants
//! - A done context short-circuits operations before any statement runs.
//! - Cancelling a parent cancels every child derived from it.

use rusqlite::Connection;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// SQLite VM instructions between two cancellation polls.
const PROGRESS_POLL_OPS: i32 = 1_000;

/// Why a context is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Cancelled,
    DeadlineExceeded,
}

impl Display for CancelReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => f.write_str("context cancelled"),
            Self::DeadlineExceeded => f.write_str("context deadline exceeded"),
        }
    }
}

/// Cloneable cancellation token with an optional deadline.
///
/// Clones share the same cancel flag. Children created with
/// [`Context::with_timeout`] or [`Context::with_deadline`] observe the
/// parent's flag but own a separate one for [`Context::cancel`].
#[derive(Debug, Clone)]
pub struct Context {
    flags: Vec<Arc<AtomicBool>>,
    deadline: Option<Instant>,
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// Root context: never cancelled unless [`Context::cancel`] is called.
    pub fn background() -> Self {
        Self {
            flags: vec![Arc::new(AtomicBool::new(false))],
            deadline: None,
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derives a child that is done at `deadline` or when the parent is done,
    /// whichever comes first.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        };
        let mut flags = self.flags.clone();
        flags.push(Arc::new(AtomicBool::new(false)));
        Self {
            flags,
            deadline: Some(deadline),
        }
    }

    /// Cancels this context and every child derived from it.
    pub fn cancel(&self) {
        if let Some(own) = self.flags.last() {
            own.store(true, Ordering::SeqCst);
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn err(&self) -> Option<CancelReason> {
        if self.flags.iter().any(|flag| flag.load(Ordering::SeqCst)) {
            return Some(CancelReason::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }
}

/// Aborts statements on `conn` once `ctx` is done; uninstalled on drop.
pub(crate) struct InterruptGuard<'conn> {
    conn: &'conn Connection,
}

impl<'conn> InterruptGuard<'conn> {
    pub(crate) fn install(conn: &'conn Connection, ctx: &Context) -> Self {
        let watched = ctx.clone();
        conn.progress_handler(PROGRESS_POLL_OPS, Some(move || watched.is_done()));
        Self { conn }
    }
}

impl Drop for InterruptGuard<'_> {
    fn drop(&mut self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
    }
}

#[cfg(test)]
mod tests {
    use super::{CancelReason, Context};
    use std::time::{Duration, Instant};

    #[test]
    fn background_is_not_done_until_cancelled() {
        let ctx = Context::background();
        assert!(ctx.err().is_none());

        let clone = ctx.clone();
        clone.cancel();
        assert_eq!(ctx.err(), Some(CancelReason::Cancelled));
    }

    #[test]
    fn parent_cancellation_reaches_children_but_not_the_reverse() {
        let parent = Context::background();
        let child = parent.with_timeout(Duration::from_secs(60));

        child.cancel();
        assert!(child.is_done());
        assert!(!parent.is_done());

        let sibling = parent.with_timeout(Duration::from_secs(60));
        parent.cancel();
        assert_eq!(sibling.err(), Some(CancelReason::Cancelled));
    }

    #[test]
    fn elapsed_deadline_reports_deadline_exceeded() {
        let ctx = Context::background().with_deadline(Instant::now() - Duration::from_millis(1));
        assert_eq!(ctx.err(), Some(CancelReason::DeadlineExceeded));
    }

    #[test]
    fn child_keeps_the_earlier_deadline() {
        let parent = Context::background().with_timeout(Duration::from_millis(10));
        let child = parent.with_timeout(Duration::from_secs(3600));
        assert_eq!(child.deadline(), parent.deadline());
    }
}
