//! Shared test doubles: recording scheduler/sink and model builders.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chime_core::clock::FixedClock;
use chime_core::ids::{InstanceId, TaskId};
use chime_core::model::{CalendarEvent, Reminder, ReminderPayload, Task};
use chime_scheduler::{
    NotificationSink, ReminderScheduler, Result as SchedResult, SchedulerError,
};
use chime_store::MemoryReminderStore;
use chrono::NaiveDateTime;
use parking_lot::Mutex;

use crate::ReminderOrchestrator;

pub(crate) fn dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
}

pub(crate) fn task_with(id: &str, due: &str, reminders: Vec<Reminder>) -> Task {
    Task {
        id: TaskId::from(id),
        title: format!("Task {id}"),
        due_at: dt(due),
        reminders,
        completed: false,
    }
}

pub(crate) fn event_with(id: &str, start: &str, reminders: Vec<Reminder>) -> CalendarEvent {
    CalendarEvent {
        id: chime_core::ids::EventId::from(id),
        title: format!("Event {id}"),
        start_at: dt(start),
        reminders,
    }
}

/// In-memory scheduler double that records every call.
#[derive(Default)]
pub(crate) struct RecordingScheduler {
    armed: Mutex<HashMap<InstanceId, (NaiveDateTime, ReminderPayload)>>,
    schedule_log: Mutex<Vec<InstanceId>>,
    cancel_log: Mutex<Vec<InstanceId>>,
    fail_once: Mutex<HashSet<String>>,
}

impl RecordingScheduler {
    /// Currently armed entries, sorted by instance id.
    pub(crate) fn armed_entries(&self) -> Vec<(InstanceId, NaiveDateTime, ReminderPayload)> {
        let mut out: Vec<_> = self
            .armed
            .lock()
            .iter()
            .map(|(id, (at, payload))| (id.clone(), *at, payload.clone()))
            .collect();
        out.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        out
    }

    /// Ids in the order schedule calls were made.
    pub(crate) fn schedule_order(&self) -> Vec<String> {
        self.schedule_log
            .lock()
            .iter()
            .map(|id| id.as_str().to_string())
            .collect()
    }

    pub(crate) fn cancel_count(&self) -> usize {
        self.cancel_log.lock().len()
    }

    /// Make the next schedule call for this id fail once.
    pub(crate) fn fail_next_schedule_for(&self, id: &str) {
        let _ = self.fail_once.lock().insert(id.to_string());
    }
}

#[async_trait]
impl ReminderScheduler for RecordingScheduler {
    async fn schedule_reminder(
        &self,
        id: &InstanceId,
        trigger_at: NaiveDateTime,
        _reminder: &Reminder,
        payload: &ReminderPayload,
    ) -> SchedResult<()> {
        if self.fail_once.lock().remove(id.as_str()) {
            return Err(SchedulerError::PlatformRefused("test refusal".to_string()));
        }
        self.schedule_log.lock().push(id.clone());
        let _ = self
            .armed
            .lock()
            .insert(id.clone(), (trigger_at, payload.clone()));
        Ok(())
    }

    async fn cancel_reminder(&self, id: &InstanceId) -> SchedResult<()> {
        self.cancel_log.lock().push(id.clone());
        let _ = self.armed.lock().remove(id);
        Ok(())
    }
}

/// Notification sink double that records deliveries and dismissals.
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub(crate) delivered: Mutex<Vec<(InstanceId, ReminderPayload)>>,
    pub(crate) dismissed: Mutex<Vec<InstanceId>>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, id: &InstanceId, payload: &ReminderPayload) -> SchedResult<()> {
        self.delivered.lock().push((id.clone(), payload.clone()));
        Ok(())
    }

    async fn dismiss(&self, id: &InstanceId) -> SchedResult<()> {
        self.dismissed.lock().push(id.clone());
        Ok(())
    }
}

/// Sink whose dismiss never resolves; for timeout-bounding tests.
#[derive(Default)]
pub(crate) struct HangingSink;

#[async_trait]
impl NotificationSink for HangingSink {
    async fn deliver(&self, _id: &InstanceId, _payload: &ReminderPayload) -> SchedResult<()> {
        std::future::pending().await
    }

    async fn dismiss(&self, _id: &InstanceId) -> SchedResult<()> {
        std::future::pending().await
    }
}

/// Orchestrator over recording scheduler + memory store + fixed clock.
pub(crate) fn fixture(
    now: &str,
) -> (
    ReminderOrchestrator,
    Arc<RecordingScheduler>,
    Arc<MemoryReminderStore>,
) {
    let scheduler = Arc::new(RecordingScheduler::default());
    let store = Arc::new(MemoryReminderStore::new());
    let clock = Arc::new(FixedClock::new(dt(now)));
    let orchestrator = ReminderOrchestrator::new(
        Arc::clone(&scheduler) as _,
        Arc::clone(&store) as _,
        clock,
    );
    (orchestrator, scheduler, store)
}
