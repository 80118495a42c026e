//! Exchange-rate plugins.
//!
//! The core ships no rate sources of its own. Hosts register plugins, each
//! of which answers for whatever subset of the requested pairs it knows.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::state::RateHint;

/// One rate as reported by a plugin: one `from_currency` buys `rate`
/// units of `to_currency`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRate {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: f64,
}

impl ExchangeRate {
    pub fn new(from: impl Into<String>, to: impl Into<String>, rate: f64) -> Self {
        Self {
            from_currency: from.into(),
            to_currency: to.into(),
            rate,
        }
    }

    pub fn is_usable(&self) -> bool {
        self.rate.is_finite() && self.rate > 0.0
    }
}

#[async_trait]
pub trait RatePlugin: Send + Sync {
    fn plugin_id(&self) -> &str;

    /// Rates for as many of `hints` as this source covers.
    async fn fetch_rates(&self, hints: &[RateHint]) -> anyhow::Result<Vec<ExchangeRate>>;
}

/// Rate plugins by id.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    rate: BTreeMap<String, Arc<dyn RatePlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plugin, replacing any earlier one with the same id.
    pub fn register(&mut self, plugin: Arc<dyn RatePlugin>) {
        let id = plugin.plugin_id().to_string();
        if self.rate.insert(id.clone(), plugin).is_some() {
            tracing::warn!(plugin = %id, "Replaced rate plugin");
        }
    }

    pub fn with(mut self, plugin: Arc<dyn RatePlugin>) -> Self {
        self.register(plugin);
        self
    }

    pub fn get(&self, plugin_id: &str) -> Option<&Arc<dyn RatePlugin>> {
        self.rate.get(plugin_id)
    }

    pub fn rate_plugins(&self) -> impl Iterator<Item = &Arc<dyn RatePlugin>> {
        self.rate.values()
    }

    pub fn len(&self) -> usize {
        self.rate.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rate.is_empty()
    }
}
