//! Boot replay.
//!
//! OS-level alarms do not survive a reboot; the store does. On the
//! boot-completed signal the host re-arms every persisted snapshot directly,
//! bypassing recomputation from the owner — the snapshot is the source of
//! truth at this point, since the owner's reminder list may have changed
//! while the device was down. True reconciliation against the owners happens
//! later, once the data layer is up and the synchronizer runs.
//!
//! Past-due snapshots are re-armed too: the scheduler clamps them to fire
//! immediately, surfacing reminders missed during downtime instead of
//! silently eating them.

use std::sync::Arc;

use chime_scheduler::ReminderScheduler;
use chime_store::ReminderStore;
use tracing::{info, warn};

/// Replays the store into a fresh scheduler after a reboot.
pub struct BootRescheduler {
    scheduler: Arc<dyn ReminderScheduler>,
    store: Arc<dyn ReminderStore>,
}

impl std::fmt::Debug for BootRescheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootRescheduler").finish_non_exhaustive()
    }
}

impl BootRescheduler {
    /// Rescheduler over the given scheduler and store.
    #[must_use]
    pub fn new(scheduler: Arc<dyn ReminderScheduler>, store: Arc<dyn ReminderStore>) -> Self {
        Self { scheduler, store }
    }

    /// Re-arm every persisted reminder snapshot. Returns the number armed.
    ///
    /// Reads but does not modify store contents.
    pub async fn reschedule_all(&self) -> usize {
        let groups = match self.store.read_all() {
            Ok(groups) => groups,
            Err(e) => {
                warn!(error = %e, "failed to read store for boot replay");
                return 0;
            }
        };

        let mut armed = 0usize;
        for (base_id, group) in &groups {
            for entry in group {
                match self
                    .scheduler
                    .schedule_reminder(&entry.id, entry.trigger_at, &entry.reminder, &entry.payload)
                    .await
                {
                    Ok(()) => armed += 1,
                    Err(e) => {
                        warn!(base_id = %base_id, id = %entry.id, error = %e, "boot re-arm failed");
                    }
                }
            }
        }
        info!(groups = groups.len(), armed, "boot replay complete");
        armed
    }
}
