// SQLite persistence for observed selections and key-value draft state.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::draft::pick::Selection;

/// SQLite-backed store used to recover a draft after the host restarts.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Key used in the draft_state table to store the active draft ID.
    const DRAFT_ID_KEY: &'static str = "current_draft_id";

    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS draft_selections (
                pick_number  INTEGER NOT NULL,
                draft_id     TEXT NOT NULL,
                entry_id     TEXT NOT NULL,
                candidate_id TEXT NOT NULL,
                timestamp    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (pick_number, draft_id)
            );

            CREATE INDEX IF NOT EXISTS idx_draft_selections_draft_id
                ON draft_selections(draft_id);

            CREATE TABLE IF NOT EXISTS draft_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock).
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Record one filled selection. Re-recording a pick is a no-op; returns
    /// whether a row was written. Unfilled selections are not stored.
    pub fn record_selection(&self, selection: &Selection, draft_id: &str) -> Result<bool> {
        let Some(candidate_id) = selection.candidate_id.as_deref() else {
            return Ok(false);
        };
        let conn = self.conn();
        let changed = conn
            .execute(
                "INSERT OR IGNORE INTO draft_selections
                    (pick_number, draft_id, entry_id, candidate_id)
                 VALUES (?1, ?2, ?3, ?4)",
                params![selection.pick_number, draft_id, selection.entry_id, candidate_id],
            )
            .context("failed to record selection")?;
        Ok(changed > 0)
    }

    /// Record many selections in one transaction. Returns how many were new.
    pub fn record_selections<'a>(
        &self,
        selections: impl IntoIterator<Item = &'a Selection>,
        draft_id: &str,
    ) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        let mut written = 0;
        for selection in selections {
            let Some(candidate_id) = selection.candidate_id.as_deref() else {
                continue;
            };
            written += tx
                .execute(
                    "INSERT OR IGNORE INTO draft_selections
                        (pick_number, draft_id, entry_id, candidate_id)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![selection.pick_number, draft_id, selection.entry_id, candidate_id],
                )
                .context("failed to record selection in batch")?;
        }
        tx.commit().context("failed to commit selections")?;
        Ok(written)
    }

    /// Load selections for `draft_id`, ordered by pick number.
    pub fn load_selections(&self, draft_id: &str) -> Result<Vec<Selection>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT pick_number, entry_id, candidate_id
                 FROM draft_selections WHERE draft_id = ?1 ORDER BY pick_number",
            )
            .context("failed to prepare load_selections query")?;

        let selections = stmt
            .query_map(params![draft_id], |row| {
                Ok(Selection {
                    pick_number: row.get(0)?,
                    entry_id: row.get(1)?,
                    candidate_id: Some(row.get(2)?),
                })
            })
            .context("failed to query selections")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map selection rows")?;

        Ok(selections)
    }

    /// Returns `true` if at least one selection has been recorded for
    /// `draft_id`.
    pub fn has_draft_in_progress(&self, draft_id: &str) -> Result<bool> {
        let conn = self.conn();
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM draft_selections WHERE draft_id = ?1)",
                params![draft_id],
                |row| row.get(0),
            )
            .context("failed to check draft_selections existence")?;
        Ok(exists)
    }

    pub fn selection_count(&self, draft_id: &str) -> Result<usize> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM draft_selections WHERE draft_id = ?1",
                params![draft_id],
                |row| row.get(0),
            )
            .context("failed to count selections")?;
        Ok(count as usize)
    }

    /// Persist a JSON value under `key`, replacing any previous value.
    pub fn save_state(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.conn();
        let json_str =
            serde_json::to_string(value).context("failed to serialize state value")?;
        conn.execute(
            "INSERT OR REPLACE INTO draft_state (key, value) VALUES (?1, ?2)",
            params![key, json_str],
        )
        .context("failed to save state")?;
        Ok(())
    }

    /// Load a JSON value saved under `key`. Returns `None` if absent.
    pub fn load_state(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT value FROM draft_state WHERE key = ?1")
            .context("failed to prepare load_state query")?;

        let mut rows = stmt
            .query_map(params![key], |row| row.get::<_, String>(0))
            .context("failed to query draft state")?;

        match rows.next() {
            Some(row_result) => {
                let json_str = row_result.context("failed to read state row")?;
                let value = serde_json::from_str(&json_str)
                    .context("failed to deserialize state value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// The draft the store was last used for.
    pub fn get_draft_id(&self) -> Result<Option<String>> {
        let value = self.load_state(Self::DRAFT_ID_KEY)?;
        Ok(value.and_then(|v| v.as_str().map(str::to_string)))
    }

    pub fn set_draft_id(&self, draft_id: &str) -> Result<()> {
        self.save_state(
            Self::DRAFT_ID_KEY,
            &serde_json::Value::String(draft_id.to_string()),
        )
    }

    /// Delete all selections and state. Runs in one transaction.
    pub fn clear_draft(&self) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        tx.execute("DELETE FROM draft_selections", [])
            .context("failed to delete selections")?;
        tx.execute("DELETE FROM draft_state", [])
            .context("failed to delete draft state")?;
        tx.commit().context("failed to commit clear_draft")?;
        Ok(())
    }
}
