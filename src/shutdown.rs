//! Cooperative shutdown signalling shared by a [`crate::session::Session`]'s
//! background tasks (mux pump, stderr drainer, RPC/HTTP servers).
//!
//! The teacher crate models this with a `broadcast::Receiver<()>` plus an
//! `is_shutdown` bool, since it only ever needs to notify a fixed set of
//! tasks spawned once at startup. This transport instead needs tasks spawned
//! *after* shutdown has already been decided on (a server loop that checks
//! the token on each iteration of its accept loop), so it uses
//! `tokio_util::sync::CancellationToken`, which can be cloned and awaited an
//! arbitrary number of times from an arbitrary number of tasks, before or
//! after the triggering call to `cancel()`.

use tokio_util::sync::CancellationToken;

/// A cancellation token, clonable and shareable across the tasks that make
/// up one [`crate::session::Session`].
#[derive(Debug, Clone)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// A child token: cancelling it alone doesn't affect `self`, but
    /// cancelling `self` cancels it too. Gives each background task its own
    /// handle without letting one task's local cleanup reach back and
    /// cancel its siblings.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once shutdown has been triggered on this token or a parent.
    pub async fn recv(&self) {
        self.token.cancelled().await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recv_resolves_after_cancel() {
        let shutdown = Shutdown::new();
        let waiter = shutdown.clone();
        let handle = tokio::spawn(async move {
            waiter.recv().await;
        });
        assert!(!shutdown.is_shutdown());
        shutdown.cancel();
        handle.await.unwrap();
        assert!(shutdown.is_shutdown());
    }

    #[tokio::test]
    async fn child_is_cancelled_by_parent() {
        let parent = Shutdown::new();
        let child = parent.child();
        parent.cancel();
        assert!(child.is_shutdown());
    }

    #[tokio::test]
    async fn cancelling_child_does_not_cancel_parent() {
        let parent = Shutdown::new();
        let child = parent.child();
        child.cancel();
        assert!(!parent.is_shutdown());
    }
}
