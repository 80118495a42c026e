//! The exchange pixie: keeps exchange rates fresh.
//!
//! While the context is not paused, a follower task polls every rate
//! plugin, folds whatever came back into the store, and sleeps a fixed
//! interval before the next round, whatever the outcome. A plugin failing
//! is reported and otherwise ignored.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use airlock_shared::constants::RATE_HINT_CACHE_FILE;
use airlock_store::cleaners::{as_array, FieldPath};
use airlock_store::Disk;

use crate::events::{CoreEvent, EventBus};
use crate::pixie::{ErrorSink, Flow, Pixie, PixieInput, TaskSet};
use crate::plugins::{ExchangeRate, PluginRegistry};
use crate::reducer::RootAction;
use crate::state::{ExchangePair, RateHint, RootState};
use crate::store::Store;

/// Cached rate hints from `disk`, or none if the cache is missing or bad.
pub fn load_rate_hints(disk: &dyn Disk) -> Vec<RateHint> {
    let text = match disk.get_text(RATE_HINT_CACHE_FILE) {
        Ok(Some(text)) => text,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(error = %e, "Failed to read rate hint cache");
            return Vec::new();
        }
    };

    let value: Value = match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Rate hint cache is not JSON, ignoring");
            return Vec::new();
        }
    };

    match as_array(&value, &FieldPath::root(), RateHint::clean) {
        Ok(hints) => hints,
        Err(e) => {
            warn!(error = %e, "Rate hint cache is malformed, ignoring");
            Vec::new()
        }
    }
}

pub fn save_rate_hints(disk: &dyn Disk, hints: &[RateHint]) -> airlock_store::Result<()> {
    let text = serde_json::to_string(hints)?;
    disk.set_text(RATE_HINT_CACHE_FILE, &text)
}

/// Everything worth asking the plugins about: the cached hints, plus each
/// watched currency against the default fiat.
pub fn gather_hints(state: &RootState, default_fiat: &str) -> Vec<RateHint> {
    let mut hints: BTreeSet<RateHint> = (*state.exchange.hints).clone();
    hints.extend(
        state
            .currencies
            .iter()
            .filter(|code| code.as_str() != default_fiat)
            .map(|code| RateHint::new(code.as_str(), default_fiat)),
    );
    hints.into_iter().collect()
}

pub struct ExchangePixie {
    disk: Arc<dyn Disk>,
    plugins: PluginRegistry,
    events: EventBus,
    interval: Duration,
    default_fiat: String,
    tasks: TaskSet,
}

impl ExchangePixie {
    pub fn new(
        disk: Arc<dyn Disk>,
        plugins: PluginRegistry,
        events: EventBus,
        interval: Duration,
        default_fiat: impl Into<String>,
    ) -> Self {
        Self {
            disk,
            plugins,
            events,
            interval,
            default_fiat: default_fiat.into(),
            tasks: TaskSet::new(),
        }
    }
}

impl Pixie for ExchangePixie {
    fn name(&self) -> &str {
        "exchange"
    }

    fn should_update(&self, prev: &RootState, next: &RootState) -> bool {
        prev.paused != next.paused
    }

    fn update(&mut self, input: &PixieInput<'_>) -> anyhow::Result<Flow> {
        if input.state.paused {
            if self.tasks.abort_all() > 0 {
                info!("Rate follower paused");
            }
            return Ok(Flow::Continue);
        }

        if self.tasks.is_empty() {
            let follower = RateFollower {
                store: input.store.clone(),
                errors: input.errors.clone(),
                plugins: self.plugins.clone(),
                disk: self.disk.clone(),
                events: self.events.clone(),
                interval: self.interval,
                default_fiat: self.default_fiat.clone(),
            };
            self.tasks.spawn(follower.run());
            info!(
                plugins = self.plugins.len(),
                interval_secs = self.interval.as_secs(),
                "Rate follower started"
            );
        }
        Ok(Flow::Continue)
    }

    fn destroy(&mut self) {
        self.tasks.abort_all();
    }
}

struct RateFollower {
    store: Store,
    errors: ErrorSink,
    plugins: PluginRegistry,
    disk: Arc<dyn Disk>,
    events: EventBus,
    interval: Duration,
    default_fiat: String,
}

impl RateFollower {
    async fn run(self) {
        while !self.store.is_closed() {
            self.fetch_once().await;
            tokio::time::sleep(self.interval).await;
        }
        debug!("Rate follower stopped");
    }

    async fn fetch_once(&self) {
        let hints = gather_hints(&self.store.state(), &self.default_fiat);
        if hints.is_empty() || self.plugins.is_empty() {
            return;
        }

        let fetches = self.plugins.rate_plugins().map(|plugin| {
            let hints = &hints;
            async move { (plugin.plugin_id().to_string(), plugin.fetch_rates(hints).await) }
        });
        let results = join_all(fetches).await;

        let now = Utc::now();
        let mut pairs = Vec::new();
        for (plugin_id, result) in results {
            match result {
                Ok(rates) => pairs.extend(
                    rates
                        .into_iter()
                        .filter(ExchangeRate::is_usable)
                        .map(|rate| ExchangePair {
                            from_currency: rate.from_currency,
                            to_currency: rate.to_currency,
                            rate: rate.rate,
                            source: plugin_id.clone(),
                            timestamp: now,
                        }),
                ),
                Err(err) => self.errors.report(&plugin_id, err),
            }
        }

        if pairs.is_empty() {
            debug!(hints = hints.len(), "No exchange rates this round");
            return;
        }

        let pair_count = pairs.len();
        let dispatched = self.store.dispatch(RootAction::ExchangePairsFetched {
            pairs,
            hints: hints.clone(),
            fetched_at: now,
        });
        if dispatched.is_err() {
            // Closed while the plugins were working.
            return;
        }

        debug!(pairs = pair_count, "Exchange rates updated");
        self.events.emit(CoreEvent::RatesUpdated { pair_count });
        if let Err(e) = save_rate_hints(self.disk.as_ref(), &hints) {
            warn!(error = %e, "Failed to save rate hint cache");
        }
    }
}
