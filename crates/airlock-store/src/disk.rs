//! The disk capability injected into the core.
//!
//! The core never opens files on its own: whatever embeds it hands over a
//! [`Disk`]. Paths are slash-separated and relative (`logins/<id>.json`).

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::database::Database;
use crate::error::{Result, StoreError};

pub trait Disk: Send + Sync {
    /// Text stored at `path`, or `None` if there is no such file.
    fn get_text(&self, path: &str) -> Result<Option<String>>;

    fn set_text(&self, path: &str, text: &str) -> Result<()>;

    /// Every path under the directory `dir`, sorted.
    fn list(&self, dir: &str) -> Result<Vec<String>>;

    /// Returns `true` if a file was removed.
    fn delete(&self, path: &str) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryDisk {
    files: Mutex<BTreeMap<String, String>>,
}

impl MemoryDisk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a disk with fixture files.
    pub fn with_files<I, P, T>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, T)>,
        P: Into<String>,
        T: Into<String>,
    {
        let files = files
            .into_iter()
            .map(|(path, text)| (path.into(), text.into()))
            .collect();
        Self {
            files: Mutex::new(files),
        }
    }
}

impl Disk for MemoryDisk {
    fn get_text(&self, path: &str) -> Result<Option<String>> {
        let files = self.files.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(files.get(path).cloned())
    }

    fn set_text(&self, path: &str, text: &str) -> Result<()> {
        let mut files = self.files.lock().map_err(|_| StoreError::LockPoisoned)?;
        files.insert(path.to_string(), text.to_string());
        Ok(())
    }

    fn list(&self, dir: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        let files = self.files.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(files
            .keys()
            .filter(|path| path.starts_with(&prefix))
            .cloned()
            .collect())
    }

    fn delete(&self, path: &str) -> Result<bool> {
        let mut files = self.files.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(files.remove(path).is_some())
    }
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

/// [`Disk`] backed by the `files` table of a [`Database`].
pub struct SqliteDisk {
    db: Mutex<Database>,
}

impl SqliteDisk {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn with_db<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> Result<T> {
        let db = self.db.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&db)
    }
}

impl Disk for SqliteDisk {
    fn get_text(&self, path: &str) -> Result<Option<String>> {
        self.with_db(|db| db.get_file(path))
    }

    fn set_text(&self, path: &str, text: &str) -> Result<()> {
        self.with_db(|db| db.put_file(path, text))
    }

    fn list(&self, dir: &str) -> Result<Vec<String>> {
        self.with_db(|db| db.list_files(dir))
    }

    fn delete(&self, path: &str) -> Result<bool> {
        self.with_db(|db| db.delete_file(path))
    }
}
