//! Action lock.
//!
//! At most one on-chain action is in flight at a time. A request made while
//! the lock is held is dropped, not queued. Holding an [ActionGuard] is
//! holding the lock; dropping it releases the lock even if the action failed
//! or its task was cancelled.

use sabirth_types::Sense;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// The on-chain action holding the lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    StartSession,
    Submit(Sense),
    Exit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockState {
    Idle,
    InFlight(ActionKind),
}

#[derive(Debug)]
struct Inner {
    state: LockState,
    acquired: u64,
    released: u64,
}

#[derive(Clone, Debug)]
pub struct ActionLock {
    inner: Arc<Mutex<Inner>>,
}

impl Default for ActionLock {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionLock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: LockState::Idle,
                acquired: 0,
                released: 0,
            })),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the lock for `kind`, or `None` if another action holds it.
    pub fn try_acquire(&self, kind: ActionKind) -> Option<ActionGuard> {
        let mut inner = self.inner();
        if let LockState::InFlight(holder) = inner.state {
            debug!(?kind, ?holder, "action dropped: lock held");
            return None;
        }
        inner.state = LockState::InFlight(kind);
        inner.acquired += 1;
        Some(ActionGuard {
            lock: self.clone(),
            kind,
        })
    }

    pub fn state(&self) -> LockState {
        self.inner().state
    }

    pub fn is_held(&self) -> bool {
        self.state() != LockState::Idle
    }

    /// `(acquired, released)` counts since creation.
    pub fn transitions(&self) -> (u64, u64) {
        let inner = self.inner();
        (inner.acquired, inner.released)
    }
}

/// Proof of holding the [ActionLock].
#[derive(Debug)]
pub struct ActionGuard {
    lock: ActionLock,
    kind: ActionKind,
}

impl ActionGuard {
    pub fn kind(&self) -> ActionKind {
        self.kind
    }
}

impl Drop for ActionGuard {
    fn drop(&mut self) {
        let mut inner = self.lock.inner();
        inner.state = LockState::Idle;
        inner.released += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_request_is_dropped() {
        let lock = ActionLock::new();
        let guard = lock.try_acquire(ActionKind::Exit).unwrap();
        assert_eq!(guard.kind(), ActionKind::Exit);
        assert_eq!(lock.state(), LockState::InFlight(ActionKind::Exit));
        assert!(lock.try_acquire(ActionKind::StartSession).is_none());
        assert_eq!(lock.transitions(), (1, 0));

        drop(guard);
        assert!(!lock.is_held());
        assert_eq!(lock.transitions(), (1, 1));

        let again = lock.try_acquire(ActionKind::Submit(Sense::Touch));
        assert!(again.is_some());
        assert_eq!(lock.transitions(), (2, 1));
    }

    #[test]
    fn test_clones_share_state() {
        let lock = ActionLock::new();
        let other = lock.clone();
        let _guard = other.try_acquire(ActionKind::StartSession).unwrap();
        assert!(lock.is_held());
        assert!(lock.try_acquire(ActionKind::Exit).is_none());
    }

    #[tokio::test]
    async fn test_released_when_task_panics() {
        let lock = ActionLock::new();
        let task_lock = lock.clone();
        let result = tokio::spawn(async move {
            let _guard = task_lock.try_acquire(ActionKind::Exit).unwrap();
            panic!("action failed");
        })
        .await;
        assert!(result.is_err());
        assert!(!lock.is_held());
        assert_eq!(lock.transitions(), (1, 1));
    }
}
