use thiserror::Error;

use airlock_store::StoreError;

/// Errors surfaced to hosts of the core.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The context (and its store) has been closed.
    #[error("Context is closed")]
    Closed,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The context api was not published while starting up.
    #[error("Context api unavailable")]
    ApiUnavailable,

    #[error("Unknown login: {0}")]
    UnknownLogin(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// A failure inside one pixie, tagged with its place in the tree.
#[derive(Error, Debug)]
#[error("Pixie `{path}` failed: {error:#}")]
pub struct ComponentError {
    /// Slash-separated pixie names, e.g. `context/watcher`.
    pub path: String,
    pub error: anyhow::Error,
}
