//! Starting and stopping a core context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::info;

use airlock_store::{Database, Disk, SqliteDisk, StashLoader};

use crate::config::CoreConfig;
use crate::error::{ClientError, ComponentError, Result};
use crate::events::{CoreEvent, EventBus, Output};
use crate::pixie::{ErrorSink, PixieTree, Supervisor};
use crate::pixies::context::{context_pixie, ContextApi};
use crate::pixies::exchange::{load_rate_hints, ExchangePixie};
use crate::plugins::{PluginRegistry, RatePlugin};
use crate::reducer::RootAction;
use crate::state::RootState;
use crate::store::Store;

const EVENT_CAPACITY: usize = 64;
const API_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ContextOptions {
    pub config: CoreConfig,
    pub disk: Arc<dyn Disk>,
    pub plugins: PluginRegistry,
    /// Receives every pixie failure, in addition to the log.
    pub on_error: Option<mpsc::UnboundedSender<ComponentError>>,
}

impl ContextOptions {
    pub fn new(config: CoreConfig, disk: Arc<dyn Disk>) -> Self {
        Self {
            config,
            disk,
            plugins: PluginRegistry::new(),
            on_error: None,
        }
    }

    pub fn with_rate_plugin(mut self, plugin: Arc<dyn RatePlugin>) -> Self {
        self.plugins.register(plugin);
        self
    }

    pub fn with_error_channel(mut self, tx: mpsc::UnboundedSender<ComponentError>) -> Self {
        self.on_error = Some(tx);
        self
    }
}

/// The SQLite-backed disk at the configured (or platform) data directory.
pub fn open_default_disk(config: &CoreConfig) -> Result<Arc<dyn Disk>> {
    let db = match &config.data_dir {
        Some(dir) => Database::open_in_dir(dir)?,
        None => Database::new()?,
    };
    Ok(Arc::new(SqliteDisk::new(db)))
}

/// A running core.
pub struct CoreContext {
    store: Store,
    supervisor: Supervisor,
    api: Output<ContextApi>,
    events: EventBus,
    closed: AtomicBool,
}

/// Load what the disk holds, start the pixie tree, and wait for the api.
pub async fn make_context(options: ContextOptions) -> Result<CoreContext> {
    let ContextOptions {
        config,
        disk,
        plugins,
        on_error,
    } = options;

    let loader = StashLoader::new(config.max_login_depth);
    let stashes = loader.load_stashes(disk.as_ref());
    let hints = load_rate_hints(disk.as_ref());
    info!(
        app_id = %config.app_id,
        stashes = stashes.len(),
        rate_hints = hints.len(),
        plugins = plugins.len(),
        "Creating context"
    );

    let store = Store::new(RootState::default());
    store.dispatch(RootAction::Init { stashes, hints })?;

    let events = EventBus::new(EVENT_CAPACITY);
    let mut errors = ErrorSink::new().with_events(events.clone());
    if let Some(tx) = on_error {
        errors = errors.with_channel(tx);
    }

    let api = Output::new();
    let tree = PixieTree::new(vec![
        Box::new(context_pixie(
            config.app_id.clone(),
            disk.clone(),
            loader,
            api.clone(),
            events.clone(),
        )),
        Box::new(ExchangePixie::new(
            disk,
            plugins,
            events.clone(),
            config.rate_interval,
            config.default_fiat.clone(),
        )),
    ]);
    let supervisor = Supervisor::spawn(tree, store.clone(), errors);

    let context = CoreContext {
        store,
        supervisor,
        api,
        events,
        closed: AtomicBool::new(false),
    };

    match tokio::time::timeout(API_TIMEOUT, context.api.wait()).await {
        Ok(Some(_)) => Ok(context),
        _ => {
            context.close().await;
            Err(ClientError::ApiUnavailable)
        }
    }
}

impl CoreContext {
    pub fn api(&self) -> Result<Arc<ContextApi>> {
        if self.is_closed() {
            return Err(ClientError::Closed);
        }
        self.api.get().ok_or(ClientError::ApiUnavailable)
    }

    /// The api slot, for observers that want change notifications.
    pub fn api_output(&self) -> &Output<ContextApi> {
        &self.api
    }

    pub fn state(&self) -> Arc<RootState> {
        self.store.state()
    }

    pub fn events(&self) -> broadcast::Receiver<CoreEvent> {
        self.events.subscribe()
    }

    /// Stop all background work. Safe to call repeatedly.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.supervisor.close().await;
        info!("Context closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
