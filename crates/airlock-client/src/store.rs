//! The central store.
//!
//! Every state transition goes through [`Store::dispatch`], which applies
//! the reducer under the channel's write lock. Transitions are therefore
//! applied one at a time, in the order their dispatches arrive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::reducer::{reduce, RootAction};
use crate::state::RootState;

#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    tx: watch::Sender<Arc<RootState>>,
    closed: AtomicBool,
}

impl Store {
    pub fn new(initial: RootState) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self {
            inner: Arc::new(StoreInner {
                tx,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// The latest published snapshot.
    pub fn state(&self) -> Arc<RootState> {
        self.inner.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<RootState>> {
        self.inner.tx.subscribe()
    }

    /// Apply `action` and publish the resulting snapshot.
    ///
    /// Returns the new version, or [`ClientError::Closed`] once the store
    /// has been closed.
    pub fn dispatch(&self, action: RootAction) -> Result<u64> {
        let name = action.name();
        let closed = &self.inner.closed;
        let mut version = None;

        self.inner.tx.send_if_modified(|state| {
            if closed.load(Ordering::Acquire) {
                return false;
            }
            let next = reduce(state, action);
            version = Some(next.version);
            *state = Arc::new(next);
            true
        });

        match version {
            Some(version) => {
                debug!(action = name, version, "Dispatched");
                Ok(version)
            }
            None => {
                debug!(action = name, "Dropped action on closed store");
                Err(ClientError::Closed)
            }
        }
    }

    /// Refuse all further dispatches. Returns `true` for the call that
    /// actually closed the store.
    pub fn close(&self) -> bool {
        let closed = &self.inner.closed;
        let mut first = false;
        // Taking the write lock orders this after any dispatch in progress.
        self.inner.tx.send_if_modified(|_| {
            first = !closed.swap(true, Ordering::AcqRel);
            false
        });
        first
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}
