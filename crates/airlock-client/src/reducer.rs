//! State transitions.
//!
//! [`reduce`] is pure: it reads the current snapshot and returns the next
//! one, sharing every slice the action does not touch.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use airlock_shared::LoginId;
use airlock_store::LoginRecord;

use crate::state::{ExchangePair, ExchangeState, RateHint, RootState};

#[derive(Debug, Clone)]
pub enum RootAction {
    /// Seed the state with what was found on disk.
    Init {
        stashes: Vec<LoginRecord>,
        hints: Vec<RateHint>,
    },
    LoginStashSaved(LoginRecord),
    LoginStashDeleted(LoginId),
    ExchangePairsFetched {
        pairs: Vec<ExchangePair>,
        hints: Vec<RateHint>,
        fetched_at: DateTime<Utc>,
    },
    CurrencyWatched(String),
    CurrencyUnwatched(String),
    Paused(bool),
}

impl RootAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::LoginStashSaved(_) => "login-stash-saved",
            Self::LoginStashDeleted(_) => "login-stash-deleted",
            Self::ExchangePairsFetched { .. } => "exchange-pairs-fetched",
            Self::CurrencyWatched(_) => "currency-watched",
            Self::CurrencyUnwatched(_) => "currency-unwatched",
            Self::Paused(_) => "paused",
        }
    }
}

pub fn reduce(state: &RootState, action: RootAction) -> RootState {
    let mut next = state.clone();
    next.version = state.version + 1;

    match action {
        RootAction::Init { stashes, hints } => {
            next.stashes = Arc::new(
                stashes
                    .into_iter()
                    .map(|login| (login.login_id, Arc::new(login)))
                    .collect(),
            );
            next.exchange.hints = Arc::new(hints.into_iter().collect());
        }

        RootAction::LoginStashSaved(mut login) => {
            login.relink_parents();
            Arc::make_mut(&mut next.stashes).insert(login.login_id, Arc::new(login));
        }

        RootAction::LoginStashDeleted(login_id) => {
            if state.stashes.contains_key(&login_id) {
                Arc::make_mut(&mut next.stashes).remove(&login_id);
            }
        }

        RootAction::ExchangePairsFetched {
            pairs,
            hints,
            fetched_at,
        } => {
            let merged = state.exchange.merge_pairs(&pairs);
            let mut all_hints = (*state.exchange.hints).clone();
            all_hints.extend(hints);
            next.exchange = ExchangeState {
                hints: if all_hints == *state.exchange.hints {
                    state.exchange.hints.clone()
                } else {
                    Arc::new(all_hints)
                },
                pairs: Arc::new(merged),
                last_fetch: Some(fetched_at),
            };
        }

        RootAction::CurrencyWatched(code) => {
            if !state.currencies.contains(&code) {
                Arc::make_mut(&mut next.currencies).insert(code);
            }
        }

        RootAction::CurrencyUnwatched(code) => {
            if state.currencies.contains(&code) {
                Arc::make_mut(&mut next.currencies).remove(&code);
            }
        }

        RootAction::Paused(paused) => next.paused = paused,
    }

    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::slice_changed;

    fn login(tag: u8) -> LoginRecord {
        LoginRecord::new("", LoginId([tag; 32]))
    }

    #[test]
    fn test_version_increments() {
        let state = RootState::default();
        let next = reduce(&state, RootAction::Paused(true));
        assert_eq!(next.version, 1);
        assert!(next.paused);
        assert_eq!(reduce(&next, RootAction::Paused(false)).version, 2);
    }

    #[test]
    fn test_untouched_slices_are_shared() {
        let state = reduce(
            &RootState::default(),
            RootAction::Init {
                stashes: vec![login(1)],
                hints: vec![RateHint::new("BTC", "iso:USD")],
            },
        );
        let next = reduce(&state, RootAction::CurrencyWatched("ETH".into()));

        assert!(Arc::ptr_eq(&state.stashes, &next.stashes));
        assert!(Arc::ptr_eq(&state.exchange.pairs, &next.exchange.pairs));
        assert!(slice_changed(&state.currencies, &next.currencies));
    }

    #[test]
    fn test_repeated_watch_keeps_slice() {
        let state = reduce(&RootState::default(), RootAction::CurrencyWatched("ETH".into()));
        let next = reduce(&state, RootAction::CurrencyWatched("ETH".into()));
        assert!(Arc::ptr_eq(&state.currencies, &next.currencies));

        let next = reduce(&next, RootAction::CurrencyUnwatched("ETH".into()));
        assert!(next.currencies.is_empty());
    }

    #[test]
    fn test_save_and_delete_stash() {
        let mut child_parent = login(1);
        child_parent.children.push(login(2));

        let state = reduce(&RootState::default(), RootAction::LoginStashSaved(child_parent));
        let saved = &state.stashes[&LoginId([1; 32])];
        assert_eq!(saved.children[0].parent_id, Some(LoginId([1; 32])));

        let missing = reduce(&state, RootAction::LoginStashDeleted(LoginId([9; 32])));
        assert!(Arc::ptr_eq(&state.stashes, &missing.stashes));

        let deleted = reduce(&state, RootAction::LoginStashDeleted(LoginId([1; 32])));
        assert!(deleted.stashes.is_empty());
    }

    #[test]
    fn test_pairs_fetched_merges() {
        let now = Utc::now();
        let pair = |source: &str, rate| ExchangePair {
            from_currency: "BTC".into(),
            to_currency: "iso:USD".into(),
            rate,
            source: source.into(),
            timestamp: now,
        };
        let hint = RateHint::new("BTC", "iso:USD");

        let state = reduce(
            &RootState::default(),
            RootAction::ExchangePairsFetched {
                pairs: vec![pair("a", 1.0), pair("b", 2.0)],
                hints: vec![hint.clone()],
                fetched_at: now,
            },
        );
        let next = reduce(
            &state,
            RootAction::ExchangePairsFetched {
                pairs: vec![pair("a", 3.0)],
                hints: vec![hint],
                fetched_at: now,
            },
        );

        assert_eq!(next.exchange.pairs.len(), 2);
        assert_eq!(next.exchange.last_fetch, Some(now));
        assert!(Arc::ptr_eq(&state.exchange.hints, &next.exchange.hints));
    }
}
