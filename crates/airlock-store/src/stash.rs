//! Loading and saving login stashes.
//!
//! A stash is one login tree persisted as JSON at `logins/<hex id>.json`.
//! The loader bounds nesting depth before handing a document to the
//! recursive validator, and never returns a partial tree.

use serde_json::Value;
use tracing::{debug, info, warn};

use airlock_shared::constants::{LOGINS_DIR, MAX_LOGIN_DEPTH};
use airlock_shared::LoginId;

use crate::disk::Disk;
use crate::error::{Result, StoreError};
use crate::models::LoginRecord;
use crate::tree::value_depth;

#[derive(Debug, Clone, Copy)]
pub struct StashLoader {
    max_depth: usize,
}

impl Default for StashLoader {
    fn default() -> Self {
        Self::new(MAX_LOGIN_DEPTH)
    }
}

impl StashLoader {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn load_login_tree(&self, text: &str) -> Result<LoginRecord> {
        let value: Value = serde_json::from_str(text)?;
        self.load_login_value(&value)
    }

    pub fn load_login_value(&self, value: &Value) -> Result<LoginRecord> {
        let depth = value_depth(value);
        if depth > self.max_depth {
            return Err(StoreError::TooDeep {
                depth,
                max: self.max_depth,
            });
        }
        Ok(LoginRecord::clean(value)?)
    }

    /// Every stash on `disk` that loads cleanly.
    ///
    /// Unreadable or invalid files are logged and skipped; a broken disk
    /// yields an empty list rather than an error.
    pub fn load_stashes(&self, disk: &dyn Disk) -> Vec<LoginRecord> {
        let paths = match disk.list(LOGINS_DIR) {
            Ok(paths) => paths,
            Err(e) => {
                warn!(error = %e, "Failed to list login stashes");
                return Vec::new();
            }
        };

        let mut stashes = Vec::with_capacity(paths.len());
        for path in paths.iter().filter(|p| p.ends_with(".json")) {
            let text = match disk.get_text(path) {
                Ok(Some(text)) => text,
                Ok(None) => continue,
                Err(e) => {
                    warn!(path = %path, error = %e, "Failed to read login stash");
                    continue;
                }
            };

            match self.load_login_tree(&text) {
                Ok(login) => {
                    debug!(path = %path, login = %login.login_id.short(), "Loaded login stash");
                    stashes.push(login);
                }
                Err(e) => warn!(path = %path, error = %e, "Skipping invalid login stash"),
            }
        }

        info!(count = stashes.len(), "Loaded login stashes");
        stashes
    }
}

pub fn stash_path(login_id: &LoginId) -> String {
    format!("{LOGINS_DIR}/{}.json", login_id.to_hex())
}

pub fn save_stash(disk: &dyn Disk, login: &LoginRecord) -> Result<()> {
    let text = serde_json::to_string(login)?;
    disk.set_text(&stash_path(&login.login_id), &text)?;
    debug!(login = %login.login_id.short(), "Saved login stash");
    Ok(())
}

pub fn delete_stash(disk: &dyn Disk, login_id: &LoginId) -> Result<bool> {
    disk.delete(&stash_path(login_id))
}
