//! SQLite-backed reminder store.
//!
//! One key-value row per base id in `reminder_groups`; the value is the
//! group's line-record encoding. Every write runs inside a transaction so
//! callers never observe partial state, and the database survives process
//! restarts and device reboot.

use std::collections::HashMap;
use std::path::Path;

use chime_core::ids::BaseId;
use chime_core::model::StoredReminder;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::{ReminderStore, Result, records};

/// Durable store over a single SQLite connection.
///
/// Writes are serialized behind an in-process mutex; SQLite's journal makes
/// each transaction atomic across crashes.
pub struct SqliteReminderStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteReminderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteReminderStore").finish_non_exhaustive()
    }
}

impl SqliteReminderStore {
    /// Open (creating if needed) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory store. Contents die with the value; tests only.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             CREATE TABLE IF NOT EXISTS reminder_groups (
                 base_id TEXT PRIMARY KEY,
                 records TEXT NOT NULL
             );",
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

impl ReminderStore for SqliteReminderStore {
    fn write(&self, base_id: &BaseId, reminders: &[StoredReminder]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        if reminders.is_empty() {
            let _ = tx.execute(
                "DELETE FROM reminder_groups WHERE base_id = ?1",
                params![base_id.as_str()],
            )?;
        } else {
            let encoded = records::encode(reminders)?;
            let _ = tx.execute(
                "INSERT OR REPLACE INTO reminder_groups (base_id, records) VALUES (?1, ?2)",
                params![base_id.as_str(), encoded],
            )?;
        }
        tx.commit()?;
        debug!(base_id = %base_id, count = reminders.len(), "wrote reminder group");
        Ok(())
    }

    fn read(&self, base_id: &BaseId) -> Result<Vec<StoredReminder>> {
        let conn = self.conn.lock();
        let raw: Option<String> = conn
            .query_row(
                "SELECT records FROM reminder_groups WHERE base_id = ?1",
                params![base_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.map(|r| records::decode(base_id, &r)).unwrap_or_default())
    }

    fn read_all(&self) -> Result<HashMap<BaseId, Vec<StoredReminder>>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT base_id, records FROM reminder_groups")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut out = HashMap::new();
        for row in rows {
            let (base_id, raw) = row?;
            let base_id = BaseId::from(base_id);
            let group = records::decode(&base_id, &raw);
            let _ = out.insert(base_id, group);
        }
        Ok(out)
    }

    fn remove(&self, base_id: &BaseId) -> Result<()> {
        let conn = self.conn.lock();
        let _ = conn.execute(
            "DELETE FROM reminder_groups WHERE base_id = ?1",
            params![base_id.as_str()],
        )?;
        Ok(())
    }
}
