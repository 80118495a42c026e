//! # airlock-client
//!
//! The running core: a versioned root state behind a [`store::Store`], and a
//! tree of supervised background components ("pixies") that rebuild
//! themselves when the slice of state they watch changes.
//!
//! Hosts call [`make_context`] with an injected [`airlock_store::Disk`] and
//! a set of rate plugins, then talk to the returned [`CoreContext`].

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod pixie;
pub mod pixies;
pub mod plugins;
pub mod reducer;
pub mod state;
pub mod store;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::CoreConfig;
pub use context::{make_context, ContextOptions, CoreContext};
pub use error::{ClientError, ComponentError, Result};
pub use events::{CoreEvent, EventBus, Output};
pub use pixies::context::ContextApi;
pub use plugins::{ExchangeRate, PluginRegistry, RatePlugin};

/// Install a `fmt` subscriber honouring `RUST_LOG`.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("airlock_client=debug,airlock_store=info,airlock_shared=info,warn")
    });

    let installed = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("Starting {} core", airlock_shared::constants::APP_NAME);
    }
}
