//! Store synchronizer.
//!
//! Keeps armed reminders consistent with the authoritative task/event
//! collections without every write path having to remember the orchestrator:
//! the loop observes both snapshot streams, and on every combined change
//! (deduplicated by content against the previous combined input) runs one
//! reconciliation pass.
//!
//! Pass ordering is ensure-then-prune: every live owner is (re)scheduled
//! before any stale group is purged, so a benign update never leaves a
//! reminder transiently absent.

use std::collections::HashSet;
use std::sync::Arc;

use chime_core::ids::BaseId;
use chime_core::model::{CalendarEvent, Task};
use chime_store::ReminderStore;
use metrics::counter;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::ReminderOrchestrator;

/// Reactive reconciliation loop over the live task/event streams.
pub struct ReminderSynchronizer {
    orchestrator: Arc<ReminderOrchestrator>,
    store: Arc<dyn ReminderStore>,
}

impl std::fmt::Debug for ReminderSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderSynchronizer").finish_non_exhaustive()
    }
}

impl ReminderSynchronizer {
    /// Synchronizer over the given orchestrator and its store.
    #[must_use]
    pub fn new(orchestrator: Arc<ReminderOrchestrator>, store: Arc<dyn ReminderStore>) -> Self {
        Self {
            orchestrator,
            store,
        }
    }

    /// Run until cancelled or both upstream senders are gone.
    ///
    /// The current snapshots are reconciled immediately on entry, then on
    /// every combined change whose content differs from the previous pass
    /// input.
    pub async fn run(
        &self,
        mut tasks: watch::Receiver<Vec<Task>>,
        mut events: watch::Receiver<Vec<CalendarEvent>>,
        cancel: CancellationToken,
    ) {
        let mut last: Option<(Vec<Task>, Vec<CalendarEvent>)> = None;
        loop {
            let snapshot = (
                tasks.borrow_and_update().clone(),
                events.borrow_and_update().clone(),
            );
            if last.as_ref() == Some(&snapshot) {
                debug!("combined snapshot unchanged; skipping pass");
            } else {
                self.run_pass(&snapshot.0, &snapshot.1).await;
                last = Some(snapshot);
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                changed = tasks.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = events.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        debug!("synchronizer loop stopped");
    }

    /// One reconciliation pass over explicit snapshots.
    ///
    /// Ensure-before-prune: schedule/correct every live owner first, then
    /// purge store groups whose base id reported no active instance.
    pub async fn run_pass(&self, tasks: &[Task], events: &[CalendarEvent]) {
        let mut active: HashSet<BaseId> = HashSet::new();

        for task in tasks {
            if self.orchestrator.ensure_scheduled_for_task(task).await {
                let _ = active.insert(task.base_id());
            }
        }
        for event in events {
            if self.orchestrator.ensure_scheduled_for_event(event).await {
                let _ = active.insert(event.base_id());
            }
        }

        match self.store.read_all() {
            Ok(all) => {
                for base_id in all.keys() {
                    // Only prune groups this core owns; a foreign prefix is
                    // left alone.
                    if base_id.owner_kind().is_some() && !active.contains(base_id) {
                        self.orchestrator.cancel_by_base_id(base_id).await;
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to enumerate store groups; skipping prune");
            }
        }

        counter!("sync_passes_total").increment(1);
        debug!(
            tasks = tasks.len(),
            events = events.len(),
            active = active.len(),
            "reconciliation pass complete"
        );
    }
}
