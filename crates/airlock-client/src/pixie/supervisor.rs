use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::{ErrorSink, PixieTree};
use crate::state::RootState;
use crate::store::Store;

/// Runs a [`PixieTree`] against every snapshot the store publishes.
pub struct Supervisor {
    store: Store,
    shutdown: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<PixieTree>>>,
}

impl Supervisor {
    /// Start evaluating `tree`, beginning with the current snapshot.
    pub fn spawn(tree: PixieTree, store: Store, errors: ErrorSink) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_tree(tree, store.clone(), errors, shutdown_rx));
        Self {
            store,
            shutdown,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Stop the tree and destroy every pixie. Safe to call repeatedly.
    ///
    /// The store is closed first, so background work finishing during
    /// teardown cannot dispatch into it.
    pub async fn close(&self) {
        let Some(handle) = self.handle.lock().await.take() else {
            return;
        };

        self.store.close();
        let _ = self.shutdown.send(true);

        match handle.await {
            Ok(mut tree) => {
                tree.destroy();
                info!("Pixie tree closed");
            }
            // A panicking pixie takes the tree with it; dropping the
            // tree's task sets already aborted their work.
            Err(e) => error!(error = %e, "Pixie tree task failed"),
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.store.close();
        if let Ok(mut handle) = self.handle.try_lock() {
            if let Some(handle) = handle.take() {
                handle.abort();
            }
        }
    }
}

async fn run_tree(
    mut tree: PixieTree,
    store: Store,
    errors: ErrorSink,
    mut shutdown: watch::Receiver<bool>,
) -> PixieTree {
    let mut rx = store.subscribe();
    loop {
        let state: Arc<RootState> = rx.borrow_and_update().clone();
        if store.is_closed() || *shutdown.borrow() {
            break;
        }
        debug!(version = state.version, "Evaluating pixie tree");
        tree.evaluate(&state, &store, &errors);

        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use crate::error::ClientError;
    use crate::pixie::tests::{watches_paused, Probe};
    use crate::reducer::RootAction;

    async fn wait_for(mut done: impl FnMut() -> bool) {
        for _ in 0..100 {
            if done() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_supervisor_follows_store() {
        let probe = Probe::new("probe", watches_paused);
        let updates = probe.updates.clone();
        let store = Store::new(RootState::default());
        let supervisor = Supervisor::spawn(
            PixieTree::new(vec![Box::new(probe)]),
            store.clone(),
            ErrorSink::new(),
        );

        wait_for(|| updates.load(Ordering::SeqCst) == 1).await;
        store.dispatch(RootAction::Paused(true)).unwrap();
        wait_for(|| updates.load(Ordering::SeqCst) == 2).await;

        supervisor.close().await;
    }

    #[tokio::test]
    async fn test_close_twice_releases_once() {
        let probe = Probe::new("probe", watches_paused);
        let updates = probe.updates.clone();
        let releases = probe.releases.clone();
        let store = Store::new(RootState::default());
        let supervisor = Supervisor::spawn(
            PixieTree::new(vec![Box::new(probe)]),
            store.clone(),
            ErrorSink::new(),
        );
        wait_for(|| updates.load(Ordering::SeqCst) == 1).await;

        supervisor.close().await;
        supervisor.close().await;
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        assert!(matches!(
            store.dispatch(RootAction::Paused(true)),
            Err(ClientError::Closed)
        ));
    }
}
