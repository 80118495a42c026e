//! Schema migrations.
//!
//! `PRAGMA user_version` records the last applied step. Each pending step
//! runs in its own transaction together with the version bump, so a failed
//! step leaves the schema at the previous version.

pub mod v001_initial;

use rusqlite::Connection;

use crate::error::{Result, StoreError};

type Step = fn(&Connection) -> rusqlite::Result<()>;

/// Applied in order; the version after each step is its index plus one.
const STEPS: &[(&str, Step)] = &[("v001_initial", v001_initial::up)];

pub fn current_version() -> u32 {
    STEPS.len() as u32
}

/// Bring the schema behind `conn` up to [`current_version`].
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let applied: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    let target = current_version();

    if applied > target {
        return Err(StoreError::Migration(format!(
            "database schema v{applied} is newer than supported v{target}"
        )));
    }

    for (version, (name, step)) in (1u32..).zip(STEPS).skip(applied as usize) {
        tracing::info!(migration = name, version, "applying migration");
        let tx = conn.transaction()?;
        step(&tx).map_err(|e| StoreError::Migration(format!("{name}: {e}")))?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
    }

    Ok(())
}
