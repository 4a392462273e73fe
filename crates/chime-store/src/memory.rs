//! In-memory reminder store for tests, demos, and offline data sources.

use std::collections::HashMap;

use chime_core::ids::BaseId;
use chime_core::model::StoredReminder;
use parking_lot::Mutex;

use crate::{ReminderStore, Result};

/// Store backed by a mutex-guarded map. Same contract as the durable store,
/// minus durability.
#[derive(Debug, Default)]
pub struct MemoryReminderStore {
    groups: Mutex<HashMap<BaseId, Vec<StoredReminder>>>,
}

impl MemoryReminderStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReminderStore for MemoryReminderStore {
    fn write(&self, base_id: &BaseId, reminders: &[StoredReminder]) -> Result<()> {
        let mut groups = self.groups.lock();
        if reminders.is_empty() {
            let _ = groups.remove(base_id);
        } else {
            let _ = groups.insert(base_id.clone(), reminders.to_vec());
        }
        Ok(())
    }

    fn read(&self, base_id: &BaseId) -> Result<Vec<StoredReminder>> {
        Ok(self.groups.lock().get(base_id).cloned().unwrap_or_default())
    }

    fn read_all(&self) -> Result<HashMap<BaseId, Vec<StoredReminder>>> {
        Ok(self.groups.lock().clone())
    }

    fn remove(&self, base_id: &BaseId) -> Result<()> {
        let _ = self.groups.lock().remove(base_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chime_core::ids::InstanceId;
    use chime_core::model::{Reminder, ReminderPayload};
    use chrono::NaiveDateTime;

    fn stored(base: &BaseId) -> StoredReminder {
        StoredReminder {
            id: InstanceId::indexed(base, 0),
            trigger_at: NaiveDateTime::parse_from_str("2099-01-01T08:50:00", "%Y-%m-%dT%H:%M:%S")
                .unwrap(),
            reminder: Reminder::new(10),
            payload: ReminderPayload {
                title: "t".to_string(),
                message: "m".to_string(),
                deep_link: "chime://event/b".to_string(),
                allow_snooze: false,
                task_id: None,
                base_id: base.clone(),
                snooze_minutes: 10,
            },
        }
    }

    #[test]
    fn empty_write_is_remove() {
        let store = MemoryReminderStore::new();
        let base = BaseId::from("event-b".to_string());
        store.write(&base, &[stored(&base)]).unwrap();
        assert_eq!(store.read_all().unwrap().len(), 1);
        store.write(&base, &[]).unwrap();
        assert!(store.read_all().unwrap().is_empty());
    }
}
