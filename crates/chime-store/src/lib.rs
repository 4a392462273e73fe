//! # chime-store
//!
//! Durable persistence of scheduled-reminder snapshots, keyed by owner base
//! id. The store is the source of truth for *what should be armed*: the OS
//! alarm facility can silently lose state (process death, reboot), so every
//! scheduling decision is mirrored here and replayed from here.
//!
//! Contract:
//!
//! - [`ReminderStore::write`] replaces the whole group for a base id
//!   atomically; an empty slice is equivalent to [`ReminderStore::remove`]
//! - [`ReminderStore::read_all`] enumerates every group without an external
//!   index, for global reconciliation
//! - malformed persisted records are dropped, never propagated
//!
//! Implementations: [`SqliteReminderStore`] (durable) and
//! [`MemoryReminderStore`] (tests, demos, offline data sources).

#![deny(unsafe_code)]

use std::collections::HashMap;

use chime_core::ids::BaseId;
use chime_core::model::StoredReminder;

mod memory;
mod records;
mod sqlite;

pub use memory::MemoryReminderStore;
pub use sqlite::SqliteReminderStore;

/// Store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying SQLite failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A group could not be serialized for writing.
    #[error("failed to encode reminder group: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Durable key-value persistence of scheduled-reminder snapshots.
///
/// One group per base id; each `write` replaces the group wholesale and is
/// atomic from the caller's point of view. Callers are expected to serialize
/// writes per base id (last write wins otherwise).
pub trait ReminderStore: Send + Sync {
    /// Replace the persisted group for `base_id` with exactly `reminders`.
    ///
    /// An empty slice removes the group.
    fn write(&self, base_id: &BaseId, reminders: &[StoredReminder]) -> Result<()>;

    /// The current group for `base_id`, empty if none.
    fn read(&self, base_id: &BaseId) -> Result<Vec<StoredReminder>>;

    /// Every tracked group.
    fn read_all(&self) -> Result<HashMap<BaseId, Vec<StoredReminder>>>;

    /// Delete the group for `base_id` entirely. No-op if absent.
    fn remove(&self, base_id: &BaseId) -> Result<()>;
}
