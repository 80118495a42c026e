//! The context pixie and the api it exposes to hosts.
//!
//! Two leaves: `api` builds the [`ContextApi`] once and stops updating;
//! `watcher` tells observers the api's data changed whenever the stashes
//! or the known exchange pairs do.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use airlock_shared::LoginId;
use airlock_store::stash::{delete_stash, save_stash};
use airlock_store::{Disk, LoginRecord, StashLoader, StoreError};

use crate::error::{ClientError, Result};
use crate::events::{CoreEvent, EventBus, Output};
use crate::pixie::{Combined, Flow, Pixie, PixieInput};
use crate::reducer::RootAction;
use crate::state::{slice_changed, RootState};
use crate::store::Store;

/// Summary of one locally saved login, as shown on a login screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalUser {
    pub login_id: LoginId,
    /// The login for this context's app has a PIN set up.
    pub pin_login_enabled: bool,
    pub recovery2_enabled: bool,
    pub otp_enabled: bool,
    pub pending_vouchers: usize,
}

/// What hosts use to work with a running context.
pub struct ContextApi {
    app_id: String,
    store: Store,
    disk: Arc<dyn Disk>,
    loader: StashLoader,
}

impl ContextApi {
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn local_users(&self) -> Vec<LocalUser> {
        let state = self.store.state();
        let now = Utc::now();
        state
            .stashes
            .values()
            .map(|root| LocalUser {
                login_id: root.login_id,
                pin_login_enabled: root
                    .find_by_app_id(&self.app_id)
                    .is_some_and(LoginRecord::has_pin2),
                recovery2_enabled: root.has_recovery2(),
                otp_enabled: root.has_otp(),
                pending_vouchers: root.pending_vouchers(now).len(),
            })
            .collect()
    }

    pub fn login_stash(&self, login_id: &LoginId) -> Option<Arc<LoginRecord>> {
        self.store.state().stashes.get(login_id).cloned()
    }

    /// Units of `to` bought by one unit of `from`, from the latest rates.
    pub fn exchange_rate(&self, from: &str, to: &str) -> Option<f64> {
        self.store.state().exchange.rate(from, to)
    }

    /// Persist a login tree and publish it.
    pub fn save_login_stash(&self, login: LoginRecord) -> Result<()> {
        if self.store.is_closed() {
            return Err(ClientError::Closed);
        }
        let depth = login.depth();
        if depth > self.loader.max_depth() {
            return Err(StoreError::TooDeep {
                depth,
                max: self.loader.max_depth(),
            }
            .into());
        }

        save_stash(self.disk.as_ref(), &login)?;
        info!(login = %login.login_id.short(), "Saved login stash");
        self.store.dispatch(RootAction::LoginStashSaved(login))?;
        Ok(())
    }

    /// Validate an untrusted stash document, then save it.
    pub fn import_login_stash(&self, text: &str) -> Result<LoginId> {
        let login = self.loader.load_login_tree(text)?;
        let login_id = login.login_id;
        self.save_login_stash(login)?;
        Ok(login_id)
    }

    pub fn delete_login_stash(&self, login_id: &LoginId) -> Result<()> {
        if self.store.is_closed() {
            return Err(ClientError::Closed);
        }
        if !self.store.state().stashes.contains_key(login_id) {
            return Err(ClientError::UnknownLogin(login_id.short()));
        }

        delete_stash(self.disk.as_ref(), login_id)?;
        info!(login = %login_id.short(), "Deleted login stash");
        self.store.dispatch(RootAction::LoginStashDeleted(*login_id))?;
        Ok(())
    }

    /// Ask for `currency_code` to be priced on the next rate fetch.
    pub fn watch_currency(&self, currency_code: &str) -> Result<()> {
        self.store
            .dispatch(RootAction::CurrencyWatched(currency_code.to_string()))?;
        Ok(())
    }

    pub fn unwatch_currency(&self, currency_code: &str) -> Result<()> {
        self.store
            .dispatch(RootAction::CurrencyUnwatched(currency_code.to_string()))?;
        Ok(())
    }

    /// Suspend or resume background network work.
    pub fn set_paused(&self, paused: bool) -> Result<()> {
        self.store.dispatch(RootAction::Paused(paused))?;
        Ok(())
    }
}

struct ApiPixie {
    app_id: String,
    disk: Arc<dyn Disk>,
    loader: StashLoader,
    output: Output<ContextApi>,
}

impl Pixie for ApiPixie {
    fn name(&self) -> &str {
        "api"
    }

    fn should_update(&self, _prev: &RootState, _next: &RootState) -> bool {
        false
    }

    fn update(&mut self, input: &PixieInput<'_>) -> anyhow::Result<Flow> {
        self.output.set(ContextApi {
            app_id: self.app_id.clone(),
            store: input.store.clone(),
            disk: self.disk.clone(),
            loader: self.loader,
        });
        debug!(app_id = %self.app_id, "Context api published");
        Ok(Flow::StopUpdates)
    }
}

struct WatcherPixie {
    output: Output<ContextApi>,
    events: EventBus,
}

impl Pixie for WatcherPixie {
    fn name(&self) -> &str {
        "watcher"
    }

    fn should_update(&self, prev: &RootState, next: &RootState) -> bool {
        slice_changed(&prev.stashes, &next.stashes)
            || slice_changed(&prev.exchange.pairs, &next.exchange.pairs)
    }

    fn update(&mut self, input: &PixieInput<'_>) -> anyhow::Result<Flow> {
        // The first snapshot is what the api was built from.
        if input.prev.is_some() {
            self.output.notify_changed();
            self.events.emit(CoreEvent::ObjectChanged {
                object: "context".to_string(),
            });
        }
        Ok(Flow::Continue)
    }
}

pub fn context_pixie(
    app_id: impl Into<String>,
    disk: Arc<dyn Disk>,
    loader: StashLoader,
    output: Output<ContextApi>,
    events: EventBus,
) -> Combined {
    Combined::new(
        "context",
        vec![
            Box::new(ApiPixie {
                app_id: app_id.into(),
                disk,
                loader,
                output: output.clone(),
            }),
            Box::new(WatcherPixie { output, events }),
        ],
    )
}
