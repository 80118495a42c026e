//! The root state snapshot.
//!
//! A [`RootState`] is never mutated once published. Each slice a pixie may
//! watch sits behind an `Arc`, so the reducer can carry untouched slices
//! into the next version and watchers can detect change with a pointer
//! comparison before falling back to equality.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use airlock_shared::LoginId;
use airlock_store::cleaners::{as_string, Clean, FieldPath, ObjectReader};
use airlock_store::LoginRecord;

#[derive(Debug, Clone, Default)]
pub struct RootState {
    /// Bumped by every dispatched action.
    pub version: u64,
    /// Locally saved login trees, by root login id.
    pub stashes: Arc<BTreeMap<LoginId, Arc<LoginRecord>>>,
    pub exchange: ExchangeState,
    /// Currency codes the host wants rates for.
    pub currencies: Arc<BTreeSet<String>>,
    /// Background network activity is suspended while set.
    pub paused: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExchangeState {
    /// Pairs worth asking plugins about, persisted between runs.
    pub hints: Arc<BTreeSet<RateHint>>,
    pub pairs: Arc<Vec<ExchangePair>>,
    pub last_fetch: Option<DateTime<Utc>>,
}

/// `true` unless both sides are the same allocation or compare equal.
pub fn slice_changed<T: PartialEq + ?Sized>(prev: &Arc<T>, next: &Arc<T>) -> bool {
    !Arc::ptr_eq(prev, next) && **prev != **next
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateHint {
    pub from_currency: String,
    pub to_currency: String,
}

impl RateHint {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from_currency: from.into(),
            to_currency: to.into(),
        }
    }

    pub fn clean(value: &Value, path: &FieldPath) -> Clean<Self> {
        let obj = ObjectReader::new(value, path)?;
        Ok(Self {
            from_currency: obj.required("fromCurrency", as_string)?,
            to_currency: obj.required("toCurrency", as_string)?,
        })
    }
}

/// One rate reported by one plugin.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangePair {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: f64,
    /// Plugin that reported the rate.
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

impl ExchangePair {
    fn key(&self) -> (&str, &str, &str) {
        (&self.source, &self.from_currency, &self.to_currency)
    }
}

impl ExchangeState {
    /// Fold freshly fetched pairs into the known set.
    ///
    /// A fetched pair replaces the older one from the same source for the
    /// same currencies; pairs a plugin did not report this round are kept.
    pub fn merge_pairs(&self, fetched: &[ExchangePair]) -> Vec<ExchangePair> {
        let fresh: HashSet<(&str, &str, &str)> = fetched.iter().map(ExchangePair::key).collect();
        self.pairs
            .iter()
            .filter(|pair| !fresh.contains(&pair.key()))
            .chain(fetched.iter())
            .cloned()
            .collect()
    }

    /// Convert one unit of `from` into `to`, chaining pairs if needed.
    ///
    /// Every pair is usable in both directions. The route with the fewest
    /// hops wins, and newer pairs are preferred among equal routes.
    pub fn rate(&self, from: &str, to: &str) -> Option<f64> {
        if from == to {
            return Some(1.0);
        }

        let mut pairs: Vec<&ExchangePair> = self.pairs.iter().collect();
        pairs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let mut edges: BTreeMap<&str, Vec<(&str, f64)>> = BTreeMap::new();
        for pair in pairs {
            if !pair.rate.is_finite() || pair.rate <= 0.0 {
                continue;
            }
            let (a, b) = (pair.from_currency.as_str(), pair.to_currency.as_str());
            edges.entry(a).or_default().push((b, pair.rate));
            edges.entry(b).or_default().push((a, 1.0 / pair.rate));
        }

        let mut seen = HashSet::from([from]);
        let mut queue = VecDeque::from([(from, 1.0)]);
        while let Some((currency, product)) = queue.pop_front() {
            for &(next, rate) in edges.get(currency).into_iter().flatten() {
                if next == to {
                    return Some(product * rate);
                }
                if seen.insert(next) {
                    queue.push_back((next, product * rate));
                }
            }
        }
        None
    }
}
