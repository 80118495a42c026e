use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    pub fn put_file(&self, path: &str, text: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO files (path, text, modified_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(path) DO UPDATE SET text = excluded.text, modified_at = excluded.modified_at",
            params![path, text, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn get_file(&self, path: &str) -> Result<Option<String>> {
        let text = self
            .conn()
            .query_row(
                "SELECT text FROM files WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()?;
        Ok(text)
    }

    pub fn file_modified_at(&self, path: &str) -> Result<DateTime<Utc>> {
        let stamp: String = self
            .conn()
            .query_row(
                "SELECT modified_at FROM files WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })?;
        Ok(DateTime::parse_from_rfc3339(&stamp)?.with_timezone(&Utc))
    }

    /// Paths directly or indirectly under `dir`, sorted.
    pub fn list_files(&self, dir: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        let mut stmt = self.conn().prepare(
            "SELECT path FROM files
             WHERE substr(path, 1, length(?1)) = ?1
             ORDER BY path ASC",
        )?;
        let rows = stmt.query_map(params![prefix], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<String>, _>>()
            .map_err(StoreError::Sqlite)
    }

    pub fn delete_file(&self, path: &str) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM files WHERE path = ?1", params![path])?;
        Ok(affected > 0)
    }
}
