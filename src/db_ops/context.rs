//! Dispatch-completion tracking.
//!
//! A caller that needs to know its writes are durable registers the
//! dispatch's action id here and awaits the returned receiver. The queue
//! processor reports the set of action ids still queued after each
//! drain; ids that were pending and are no longer queued have committed
//! and their waiters resolve. A failed commit rejects the waiters
//! explicitly while the entry stays queued for retry.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::action::ActionID;

#[derive(Default)]
struct PendingState {
    /// Action ids seen queued but not yet resolved
    pending: HashSet<ActionID>,
    /// Waiters per action id; an id may have several
    waiters: HashMap<ActionID, Vec<oneshot::Sender<Result<()>>>>,
}

/// Registry of in-flight dispatches awaiting persistence.
#[derive(Default)]
pub struct OpsContext {
    state: Mutex<PendingState>,
}

impl OpsContext {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dispatch for completion tracking and get a receiver
    /// that resolves once its batch commits (or rejects if the commit
    /// fails).
    pub fn register(&self, action_id: &ActionID) -> oneshot::Receiver<Result<()>> {
        let (sender, receiver) = oneshot::channel();
        let mut state = self.state.lock();
        state.pending.insert(action_id.clone());
        state.waiters.entry(action_id.clone()).or_default().push(sender);
        receiver
    }

    /// Await a registered dispatch.
    pub async fn wait(receiver: oneshot::Receiver<Result<()>>) -> Result<()> {
        receiver.await.map_err(|_| Error::DispatchDropped)?
    }

    /// Report the action ids still queued after a drain. Every pending id
    /// absent from `still_queued` has committed; its waiters resolve.
    pub fn observe_queue(&self, still_queued: &HashSet<ActionID>) {
        let mut state = self.state.lock();
        let completed: Vec<ActionID> = state
            .pending
            .iter()
            .filter(|action_id| !still_queued.contains(*action_id))
            .cloned()
            .collect();
        for action_id in completed {
            state.pending.remove(&action_id);
            if let Some(waiters) = state.waiters.remove(&action_id) {
                debug!(%action_id, "dispatch committed");
                for waiter in waiters {
                    let _ = waiter.send(Ok(()));
                }
            }
        }
    }

    /// Reject the waiters for a batch whose commit failed. The batch
    /// itself stays queued; only the callers are told.
    pub fn reject(&self, action_id: &ActionID, reason: &str) {
        let mut state = self.state.lock();
        state.pending.remove(action_id);
        if let Some(waiters) = state.waiters.remove(action_id) {
            for waiter in waiters {
                let _ = waiter.send(Err(Error::CommitAborted(reason.to_string())));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_waiter_resolves_when_action_leaves_the_queue() {
        let context = OpsContext::new();
        let receiver = context.register(&"a1".to_string());

        // First tick: still queued, nothing resolves.
        context.observe_queue(&HashSet::from(["a1".to_string()]));
        // Second tick: gone from the queue, the waiter resolves.
        context.observe_queue(&HashSet::new());

        assert!(OpsContext::wait(receiver).await.is_ok());
    }

    #[tokio::test]
    async fn test_rejected_commit_fails_the_waiter() {
        let context = OpsContext::new();
        let receiver = context.register(&"a1".to_string());
        context.reject(&"a1".to_string(), "disk full");

        let err = OpsContext::wait(receiver).await.unwrap_err();
        assert!(matches!(err, Error::CommitAborted(reason) if reason == "disk full"));
    }

    #[tokio::test]
    async fn test_multiple_waiters_on_one_action_all_resolve() {
        let context = OpsContext::new();
        let first = context.register(&"a1".to_string());
        let second = context.register(&"a1".to_string());
        context.observe_queue(&HashSet::new());

        assert!(OpsContext::wait(first).await.is_ok());
        assert!(OpsContext::wait(second).await.is_ok());
    }

    #[tokio::test]
    async fn test_dropped_context_fails_waiters_with_dispatch_dropped() {
        let context = OpsContext::new();
        let receiver = context.register(&"a1".to_string());
        drop(context);

        let err = OpsContext::wait(receiver).await.unwrap_err();
        assert!(matches!(err, Error::DispatchDropped));
    }
}
