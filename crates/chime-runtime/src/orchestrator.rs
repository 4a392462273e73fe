//! Reminder orchestrator.
//!
//! Single authority for which reminder instances exist. For an owner with
//! base id `B` and reminder list index `i`, the instance id is `"<B>-<i>"`;
//! a snoozed follow-up appends `"-snoozed"`. Every scheduling decision is
//! mirrored into the store so boot replay and reconciliation can work from
//! durable state.
//!
//! Error policy: scheduler and store failures are logged and swallowed here.
//! Saving a task must succeed even when arming its reminders does not; the
//! synchronizer's next pass retries naturally.

use std::collections::HashSet;
use std::sync::Arc;

use chime_core::clock::Clock;
use chime_core::ids::{BaseId, InstanceId};
use chime_core::model::{
    CalendarEvent, DEFAULT_SNOOZE_MINUTES, Reminder, ReminderPayload, StoredReminder, Task,
};
use chime_scheduler::ReminderScheduler;
use chime_store::ReminderStore;
use chrono::Duration;
use metrics::counter;
use tracing::{debug, warn};

/// Core scheduling/cancellation logic over the scheduler and store
/// capabilities.
pub struct ReminderOrchestrator {
    scheduler: Arc<dyn ReminderScheduler>,
    store: Arc<dyn ReminderStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ReminderOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderOrchestrator").finish_non_exhaustive()
    }
}

impl ReminderOrchestrator {
    /// Orchestrator over the given capabilities.
    #[must_use]
    pub fn new(
        scheduler: Arc<dyn ReminderScheduler>,
        store: Arc<dyn ReminderStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            scheduler,
            store,
            clock,
        }
    }

    /// The scheduler this orchestrator arms reminders through.
    #[must_use]
    pub fn scheduler(&self) -> &Arc<dyn ReminderScheduler> {
        &self.scheduler
    }

    /// The clock this orchestrator evaluates "now" with.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // ─────────────────────────────────────────────────────────────────────
    // Scheduling
    // ─────────────────────────────────────────────────────────────────────

    /// Schedule all future reminder instances for a task.
    ///
    /// Returns the number of instances armed. Reminders whose trigger has
    /// already passed are skipped entirely. Completed tasks schedule nothing.
    pub async fn schedule_for_task(&self, task: &Task) -> usize {
        let plan = self.plan_for_task(task);
        self.arm_plan(&task.base_id(), plan).await
    }

    /// Schedule all future reminder instances for a calendar event.
    ///
    /// Event payloads never allow snoozing, regardless of the per-reminder
    /// flag: events model fixed appointments, not actionable to-dos.
    pub async fn schedule_for_event(&self, event: &CalendarEvent) -> usize {
        let plan = self.plan_for_event(event);
        self.arm_plan(&event.base_id(), plan).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Cancellation
    // ─────────────────────────────────────────────────────────────────────

    /// Cancel every instance id derivable from the task's current reminder
    /// list, armed or not, and drop its store group.
    pub async fn cancel_for_task(&self, task: &Task) {
        self.cancel_indexed(&task.base_id(), task.reminders.len())
            .await;
    }

    /// Cancel every instance id derivable from the event's current reminder
    /// list, armed or not, and drop its store group.
    pub async fn cancel_for_event(&self, event: &CalendarEvent) {
        self.cancel_indexed(&event.base_id(), event.reminders.len())
            .await;
    }

    /// Cancel via the store's record of which instance ids were last armed.
    ///
    /// Used when the caller no longer has the owner object (post-deletion,
    /// notification actions). Also cancels the snoozed derivative of each
    /// recorded id; cancelling an id that was never armed is a no-op by
    /// contract.
    pub async fn cancel_by_base_id(&self, base_id: &BaseId) {
        let stored = match self.store.read(base_id) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(base_id = %base_id, error = %e, "failed to read group for cancellation");
                Vec::new()
            }
        };
        for entry in &stored {
            self.cancel_instance(&entry.id).await;
            self.cancel_instance(&entry.id.snoozed()).await;
        }
        if let Err(e) = self.store.remove(base_id) {
            warn!(base_id = %base_id, error = %e, "failed to remove group from store");
        }
        debug!(base_id = %base_id, cancelled = stored.len(), "cancelled by base id");
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reconciliation
    // ─────────────────────────────────────────────────────────────────────

    /// Idempotently re-derive the correct instance set for the task's current
    /// state: cancel stale instances, (re)schedule current ones.
    ///
    /// Returns whether at least one instance ended up active, so callers can
    /// track which base ids are still live for later pruning.
    pub async fn ensure_scheduled_for_task(&self, task: &Task) -> bool {
        let base_id = task.base_id();
        if task.completed {
            self.cancel_by_base_id(&base_id).await;
            return false;
        }
        let plan = self.plan_for_task(task);
        self.reconcile(&base_id, plan).await
    }

    /// Idempotently re-derive the correct instance set for the event's
    /// current state. See [`Self::ensure_scheduled_for_task`].
    pub async fn ensure_scheduled_for_event(&self, event: &CalendarEvent) -> bool {
        let plan = self.plan_for_event(event);
        self.reconcile(&event.base_id(), plan).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    fn plan_for_task(&self, task: &Task) -> Vec<StoredReminder> {
        if task.completed {
            return Vec::new();
        }
        let base_id = task.base_id();
        self.plan_instances(&base_id, task.due_at, &task.reminders, |reminder| {
            ReminderPayload {
                title: task.title.clone(),
                message: due_message(reminder.minutes_before),
                deep_link: task.deep_link(),
                // Tasks allow snoozing; the per-reminder flag decides.
                allow_snooze: reminder.allow_snooze,
                task_id: Some(task.id.clone()),
                base_id: base_id.clone(),
                snooze_minutes: DEFAULT_SNOOZE_MINUTES,
            }
        })
    }

    fn plan_for_event(&self, event: &CalendarEvent) -> Vec<StoredReminder> {
        let base_id = event.base_id();
        self.plan_instances(&base_id, event.start_at, &event.reminders, |reminder| {
            ReminderPayload {
                title: event.title.clone(),
                message: start_message(reminder.minutes_before),
                deep_link: event.deep_link(),
                allow_snooze: false,
                task_id: None,
                base_id: base_id.clone(),
                snooze_minutes: DEFAULT_SNOOZE_MINUTES,
            }
        })
    }

    /// Compute the instances whose trigger is strictly in the future, in
    /// ascending index order.
    fn plan_instances(
        &self,
        base_id: &BaseId,
        target: chrono::NaiveDateTime,
        reminders: &[Reminder],
        build_payload: impl Fn(&Reminder) -> ReminderPayload,
    ) -> Vec<StoredReminder> {
        let now = self.clock.now();
        let mut plan = Vec::new();
        for (index, reminder) in reminders.iter().enumerate() {
            let trigger_at = target - Duration::minutes(i64::from(reminder.minutes_before));
            if trigger_at <= now {
                debug!(
                    base_id = %base_id,
                    index,
                    trigger_at = %trigger_at,
                    "skipping past-due reminder"
                );
                continue;
            }
            plan.push(StoredReminder {
                id: InstanceId::indexed(base_id, index),
                trigger_at,
                reminder: *reminder,
                payload: build_payload(reminder),
            });
        }
        plan
    }

    /// Arm every planned instance, then mirror the armed set into the store.
    ///
    /// An instance whose arm fails is left out of the store — it is simply
    /// inactive until the next synchronizer pass retries.
    async fn arm_plan(&self, base_id: &BaseId, plan: Vec<StoredReminder>) -> usize {
        let mut armed = Vec::with_capacity(plan.len());
        for instance in plan {
            match self
                .scheduler
                .schedule_reminder(
                    &instance.id,
                    instance.trigger_at,
                    &instance.reminder,
                    &instance.payload,
                )
                .await
            {
                Ok(()) => armed.push(instance),
                Err(e) => {
                    warn!(id = %instance.id, error = %e, "failed to arm reminder");
                }
            }
        }
        counter!("reminders_scheduled_total").increment(armed.len() as u64);
        if let Err(e) = self.store.write(base_id, &armed) {
            warn!(base_id = %base_id, error = %e, "failed to persist reminder group");
        }
        armed.len()
    }

    /// Cancel stale stored instances, then arm the new plan.
    ///
    /// Stale-first ordering keeps a still-wanted instance armed throughout
    /// (re-arming replaces in place; it never passes through a cancelled
    /// state).
    async fn reconcile(&self, base_id: &BaseId, plan: Vec<StoredReminder>) -> bool {
        let planned: HashSet<&InstanceId> = plan.iter().map(|p| &p.id).collect();
        match self.store.read(base_id) {
            Ok(stored) => {
                for entry in stored {
                    if !planned.contains(&entry.id) {
                        self.cancel_instance(&entry.id).await;
                        self.cancel_instance(&entry.id.snoozed()).await;
                    }
                }
            }
            Err(e) => {
                warn!(base_id = %base_id, error = %e, "failed to read group for reconciliation");
            }
        }
        self.arm_plan(base_id, plan).await > 0
    }

    async fn cancel_indexed(&self, base_id: &BaseId, count: usize) {
        // Unconditional over the current reminder count: cancelling an index
        // that was never armed is a no-op by scheduler contract.
        for index in 0..count {
            let id = InstanceId::indexed(base_id, index);
            self.cancel_instance(&id).await;
            self.cancel_instance(&id.snoozed()).await;
        }
        if let Err(e) = self.store.remove(base_id) {
            warn!(base_id = %base_id, error = %e, "failed to remove group from store");
        }
    }

    async fn cancel_instance(&self, id: &InstanceId) {
        if let Err(e) = self.scheduler.cancel_reminder(id).await {
            warn!(id = %id, error = %e, "failed to cancel reminder");
        } else {
            counter!("reminders_cancelled_total").increment(1);
        }
    }
}

fn due_message(minutes_before: u32) -> String {
    if minutes_before == 0 {
        "Due now".to_string()
    } else {
        format!("Due in {minutes_before} minutes")
    }
}

fn start_message(minutes_before: u32) -> String {
    if minutes_before == 0 {
        "Starting now".to_string()
    } else {
        format!("Starts in {minutes_before} minutes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{dt, event_with, fixture, task_with};
    use chime_core::model::Reminder;

    #[tokio::test]
    async fn schedules_only_future_triggers_with_exact_times() {
        // now = 08:00, due = 09:00, reminders [10min, 60min(no-snooze)]
        let (orchestrator, scheduler, store) = fixture("2099-01-01T08:00:00");
        let task = task_with(
            "k",
            "2099-01-01T09:00:00",
            vec![Reminder::new(10), Reminder::new(60).without_snooze()],
        );

        let armed = orchestrator.schedule_for_task(&task).await;
        assert_eq!(armed, 1); // the 60min trigger (08:00) is not strictly future

        let entries = scheduler.armed_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0.as_str(), "task-k-0");
        assert_eq!(entries[0].1, dt("2099-01-01T08:50:00"));

        let group = store.read(&task.base_id()).unwrap();
        assert_eq!(group.len(), 1);
        assert_eq!(group[0].trigger_at, dt("2099-01-01T08:50:00"));
    }

    #[tokio::test]
    async fn two_future_reminders_both_schedule() {
        // now well before due: both instances land, ascending index order.
        let (orchestrator, scheduler, _store) = fixture("2099-01-01T00:00:00");
        let task = task_with(
            "k",
            "2099-01-01T09:00:00",
            vec![Reminder::new(10), Reminder::new(60).without_snooze()],
        );

        assert_eq!(orchestrator.schedule_for_task(&task).await, 2);
        let calls = scheduler.schedule_order();
        assert_eq!(calls, vec!["task-k-0", "task-k-1"]);

        let entries = scheduler.armed_entries();
        let sixty = entries.iter().find(|e| e.0.as_str() == "task-k-1").unwrap();
        assert_eq!(sixty.1, dt("2099-01-01T08:00:00"));
        assert!(!sixty.2.allow_snooze);
        assert_eq!(sixty.2.message, "Due in 60 minutes");
        let ten = entries.iter().find(|e| e.0.as_str() == "task-k-0").unwrap();
        assert!(ten.2.allow_snooze);
        assert_eq!(ten.2.deep_link, "chime://task/k");
        assert_eq!(ten.2.task_id.as_ref().unwrap().as_str(), "k");
    }

    #[tokio::test]
    async fn near_due_task_skips_larger_offset() {
        // due 30 minutes from now, reminders [60min, 5min]: only 5min lands.
        let (orchestrator, scheduler, _store) = fixture("2099-01-01T08:30:00");
        let task = task_with(
            "k",
            "2099-01-01T09:00:00",
            vec![Reminder::new(60), Reminder::new(5)],
        );

        assert_eq!(orchestrator.schedule_for_task(&task).await, 1);
        let entries = scheduler.armed_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0.as_str(), "task-k-1");
        assert_eq!(entries[0].1, dt("2099-01-01T08:55:00"));
    }

    #[tokio::test]
    async fn event_payload_never_allows_snooze() {
        let (orchestrator, scheduler, _store) = fixture("2099-01-01T00:00:00");
        let event = event_with("e", "2099-06-15T14:00:00", vec![Reminder::new(30)]);

        assert_eq!(orchestrator.schedule_for_event(&event).await, 1);
        let entries = scheduler.armed_entries();
        assert_eq!(entries[0].0.as_str(), "event-e-0");
        assert_eq!(entries[0].1, dt("2099-06-15T13:30:00"));
        assert!(!entries[0].2.allow_snooze);
        assert!(entries[0].2.task_id.is_none());
        assert_eq!(entries[0].2.message, "Starts in 30 minutes");
        assert_eq!(entries[0].2.deep_link, "chime://event/e");
    }

    #[tokio::test]
    async fn completed_task_schedules_nothing() {
        let (orchestrator, scheduler, store) = fixture("2099-01-01T00:00:00");
        let mut task = task_with("k", "2099-01-01T09:00:00", vec![Reminder::new(10)]);
        task.completed = true;

        assert_eq!(orchestrator.schedule_for_task(&task).await, 0);
        assert!(scheduler.armed_entries().is_empty());
        assert!(store.read_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_minute_reminder_renders_now() {
        let (orchestrator, scheduler, _store) = fixture("2099-01-01T08:00:00");
        let task = task_with("k", "2099-01-01T09:00:00", vec![Reminder::new(0)]);

        assert_eq!(orchestrator.schedule_for_task(&task).await, 1);
        assert_eq!(scheduler.armed_entries()[0].2.message, "Due now");
    }

    #[tokio::test]
    async fn cancel_for_task_clears_scheduler_and_store() {
        let (orchestrator, scheduler, store) = fixture("2099-01-01T00:00:00");
        let task = task_with(
            "k",
            "2099-01-01T09:00:00",
            vec![Reminder::new(10), Reminder::new(60)],
        );
        let _ = orchestrator.schedule_for_task(&task).await;
        assert_eq!(scheduler.armed_entries().len(), 2);

        orchestrator.cancel_for_task(&task).await;
        assert!(scheduler.armed_entries().is_empty());
        assert!(store.read_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancel_by_base_id_uses_stored_ids() {
        let (orchestrator, scheduler, store) = fixture("2099-01-01T00:00:00");
        let task = task_with("k", "2099-01-01T09:00:00", vec![Reminder::new(10)]);
        let base_id = task.base_id();
        let _ = orchestrator.schedule_for_task(&task).await;

        // Caller no longer has the task object.
        orchestrator.cancel_by_base_id(&base_id).await;
        assert!(scheduler.armed_entries().is_empty());
        assert!(store.read(&base_id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn ensure_is_idempotent() {
        let (orchestrator, scheduler, _store) = fixture("2099-01-01T00:00:00");
        let task = task_with(
            "k",
            "2099-01-01T09:00:00",
            vec![Reminder::new(10), Reminder::new(60)],
        );

        assert!(orchestrator.ensure_scheduled_for_task(&task).await);
        let first = scheduler.armed_entries();
        let cancels_before = scheduler.cancel_count();

        assert!(orchestrator.ensure_scheduled_for_task(&task).await);
        assert_eq!(scheduler.armed_entries(), first);
        // No spurious cancels on an unchanged owner.
        assert_eq!(scheduler.cancel_count(), cancels_before);
    }

    #[tokio::test]
    async fn ensure_cancels_stale_instances_on_shrink() {
        let (orchestrator, scheduler, store) = fixture("2099-01-01T00:00:00");
        let task = task_with(
            "k",
            "2099-01-01T09:00:00",
            vec![Reminder::new(10), Reminder::new(60)],
        );
        assert!(orchestrator.ensure_scheduled_for_task(&task).await);
        assert_eq!(scheduler.armed_entries().len(), 2);

        let shrunk = task_with("k", "2099-01-01T09:00:00", vec![Reminder::new(10)]);
        assert!(orchestrator.ensure_scheduled_for_task(&shrunk).await);
        let entries = scheduler.armed_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0.as_str(), "task-k-0");
        assert_eq!(store.read(&shrunk.base_id()).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ensure_on_completed_task_purges_and_reports_inactive() {
        let (orchestrator, scheduler, store) = fixture("2099-01-01T00:00:00");
        let task = task_with("k", "2099-01-01T09:00:00", vec![Reminder::new(10)]);
        let _ = orchestrator.schedule_for_task(&task).await;

        let mut completed = task.clone();
        completed.completed = true;
        assert!(!orchestrator.ensure_scheduled_for_task(&completed).await);
        assert!(scheduler.armed_entries().is_empty());
        assert!(store.read_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ensure_reports_inactive_when_all_triggers_passed() {
        let (orchestrator, _scheduler, store) = fixture("2099-01-01T08:55:00");
        let task = task_with("k", "2099-01-01T09:00:00", vec![Reminder::new(60)]);
        assert!(!orchestrator.ensure_scheduled_for_task(&task).await);
        assert!(store.read_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_arm_is_excluded_from_store() {
        let (orchestrator, scheduler, store) = fixture("2099-01-01T00:00:00");
        let task = task_with(
            "k",
            "2099-01-01T09:00:00",
            vec![Reminder::new(10), Reminder::new(60)],
        );
        scheduler.fail_next_schedule_for("task-k-0");

        // Does not abort the owner's pass; the other instance still arms.
        assert_eq!(orchestrator.schedule_for_task(&task).await, 1);
        let group = store.read(&task.base_id()).unwrap();
        assert_eq!(group.len(), 1);
        assert_eq!(group[0].id.as_str(), "task-k-1");
    }

    #[test]
    fn message_rendering() {
        assert_eq!(due_message(0), "Due now");
        assert_eq!(due_message(5), "Due in 5 minutes");
        assert_eq!(start_message(0), "Starting now");
        assert_eq!(start_message(30), "Starts in 30 minutes");
    }
}
