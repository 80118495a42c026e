//! v001 -- Initial schema creation.
//!
//! Creates the `files` table backing the [`Disk`](crate::Disk) capability:
//! one row per path, holding the file's full text.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    path         TEXT PRIMARY KEY NOT NULL,   -- slash-separated, e.g. logins/<hex>.json
    text         TEXT NOT NULL,
    modified_at  TEXT NOT NULL                -- ISO-8601 / RFC-3339
);
"#;

/// Apply the v001 schema.
pub fn up(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(UP_SQL)
}
