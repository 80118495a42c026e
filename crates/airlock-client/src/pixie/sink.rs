use tokio::sync::mpsc;
use tracing::error;

use crate::error::ComponentError;
use crate::events::{CoreEvent, EventBus};

/// Where pixie failures go.
///
/// Every report is logged. It is also forwarded to the host's error
/// channel and published on the event bus when those are attached.
#[derive(Clone, Default)]
pub struct ErrorSink {
    scope: String,
    tx: Option<mpsc::UnboundedSender<ComponentError>>,
    events: Option<EventBus>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, tx: mpsc::UnboundedSender<ComponentError>) -> Self {
        self.tx = Some(tx);
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// A sink whose reports are nested under `name`.
    pub fn child(&self, name: &str) -> Self {
        Self {
            scope: self.path(name),
            ..self.clone()
        }
    }

    pub fn path(&self, name: &str) -> String {
        if self.scope.is_empty() {
            name.to_string()
        } else {
            format!("{}/{name}", self.scope)
        }
    }

    pub fn report(&self, name: &str, err: anyhow::Error) {
        let path = self.path(name);
        error!(pixie = %path, error = %format!("{err:#}"), "Pixie failed");

        if let Some(events) = &self.events {
            events.emit(CoreEvent::ComponentError {
                path: path.clone(),
                message: format!("{err:#}"),
            });
        }
        if let Some(tx) = &self.tx {
            // The host may have stopped listening.
            let _ = tx.send(ComponentError { path, error: err });
        }
    }
}
