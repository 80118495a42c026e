//! Externally visible objects and the core event bus.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, watch};

pub const EVENT_OBJECT_CHANGED: &str = "object-changed";
pub const EVENT_RATES_UPDATED: &str = "rates-updated";
pub const EVENT_COMPONENT_ERROR: &str = "component-error";

/// A slot holding the object a pixie exposes to the host.
///
/// Observers learn about replacement (`set`) and in-place change
/// (`notify_changed`) through the same subscription.
pub struct Output<T> {
    tx: Arc<watch::Sender<Option<Arc<T>>>>,
}

impl<T> Clone for Output<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> Default for Output<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Output<T> {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn set(&self, value: T) {
        self.tx.send_replace(Some(Arc::new(value)));
    }

    /// Wake observers without replacing the object.
    pub fn notify_changed(&self) {
        self.tx.send_modify(|_| {});
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<T>>> {
        self.tx.subscribe()
    }

    /// Resolve once an object has been published.
    pub async fn wait(&self) -> Option<Arc<T>> {
        let mut rx = self.subscribe();
        let value = rx.wait_for(Option::is_some).await.ok()?;
        value.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum CoreEvent {
    /// An output object changed in place.
    #[serde(rename_all = "camelCase")]
    ObjectChanged { object: String },

    #[serde(rename_all = "camelCase")]
    RatesUpdated { pair_count: usize },

    #[serde(rename_all = "camelCase")]
    ComponentError { path: String, message: String },
}

impl CoreEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ObjectChanged { .. } => EVENT_OBJECT_CHANGED,
            Self::RatesUpdated { .. } => EVENT_RATES_UPDATED,
            Self::ComponentError { .. } => EVENT_COMPONENT_ERROR,
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: CoreEvent) {
        let name = event.name();
        if self.tx.send(event).is_err() {
            tracing::trace!(event = name, "No event subscribers");
        }
    }
}
