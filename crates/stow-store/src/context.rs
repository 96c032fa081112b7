//! Cancellation and deadline propagation.
//!
//! Every store operation takes a [`Context`]. The store never creates its
//! own timeouts; it checks the context before touching the engine and
//! interrupts a running statement once the context is done.
//!
//! Contexts form a tree: a child created with [`Context::with_timeout`] or
//! [`Context::child`] is done when it or any ancestor is cancelled, and its
//! deadline is never later than its parent's.
//!
//! ```rust
//! use std::time::Duration;
//! use stow_store::Context;
//!
//! let root = Context::background();
//! let call = root.with_timeout(Duration::from_secs(5));
//! assert!(!call.is_done());
//!
//! root.cancel();
//! assert!(call.is_done());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{StoreError, StoreResult};

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
    parent: Option<Context>,
}

/// A cloneable cancellation token with an optional deadline.
///
/// Clones share state: cancelling any clone cancels them all.
#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// Returns a root context with no deadline.
    pub fn background() -> Self {
        Self::new(None, None)
    }

    fn new(deadline: Option<Instant>, parent: Option<Context>) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                deadline,
                parent,
            }),
        }
    }

    /// Creates a child context that can be cancelled independently.
    pub fn child(&self) -> Self {
        Self::new(self.inner.deadline, Some(self.clone()))
    }

    /// Creates a child context that expires at `deadline`.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.inner.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        Self::new(Some(deadline), Some(self.clone()))
    }

    /// Creates a child context that expires after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Cancels this context and every context derived from it.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    /// Returns the effective deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Returns true once the context is cancelled or past its deadline.
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Returns why the context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<StoreError> {
        let mut current = Some(self);
        while let Some(ctx) = current {
            if ctx.inner.cancelled.load(Ordering::Acquire) {
                return Some(StoreError::Cancelled);
            }
            current = ctx.inner.parent.as_ref();
        }
        match self.inner.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(StoreError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Fails with the context's error if it is done.
    pub fn check(&self) -> StoreResult<()> {
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_is_live() {
        let ctx = Context::background();
        assert!(!ctx.is_done());
        assert!(ctx.deadline().is_none());
        assert!(ctx.check().is_ok());
    }

    #[test]
    fn test_cancel() {
        let ctx = Context::background();
        let clone = ctx.clone();
        clone.cancel();
        assert!(matches!(ctx.check(), Err(StoreError::Cancelled)));
    }

    #[test]
    fn test_cancel_propagates_to_children_only() {
        let parent = Context::background();
        let child = parent.child();
        let grandchild = child.with_timeout(Duration::from_secs(60));

        child.cancel();
        assert!(!parent.is_done());
        assert!(matches!(grandchild.err(), Some(StoreError::Cancelled)));
    }

    #[test]
    fn test_deadline_exceeded() {
        let ctx = Context::background().with_timeout(Duration::ZERO);
        assert!(matches!(ctx.err(), Some(StoreError::DeadlineExceeded)));
    }

    #[test]
    fn test_child_deadline_capped_by_parent() {
        let parent = Context::background().with_timeout(Duration::from_secs(1));
        let child = parent.with_timeout(Duration::from_secs(3600));
        assert_eq!(child.deadline(), parent.deadline());
    }

    #[test]
    fn test_cancellation_wins_over_deadline() {
        let ctx = Context::background().with_timeout(Duration::ZERO);
        ctx.cancel();
        assert!(matches!(ctx.err(), Some(StoreError::Cancelled)));
    }
}
