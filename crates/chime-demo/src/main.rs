//! End-to-end demo: schedule a reminder, let it fire, complete the task,
//! then replay the store into a fresh scheduler the way a boot would.
//!
//! Run with `RUST_LOG=chime=debug` for the full decision trail.

use std::sync::Arc;
use std::time::Duration;

use chime_core::clock::{Clock, SystemClock};
use chime_core::ids::{InstanceId, TaskId};
use chime_core::model::{CalendarEvent, Reminder, Task};
use chime_runtime::{
    BootRescheduler, EventDataSource, MemoryDataSource, ReminderAction, ReminderActionHandler,
    ReminderOrchestrator, ReminderSynchronizer, TaskDataSource,
};
use chime_scheduler::{LoggingSink, TokioScheduler};
use chime_store::{MemoryReminderStore, ReminderStore};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() {
    chime_core::logging::init();

    let clock: Arc<SystemClock> = Arc::new(SystemClock::utc());
    let store = Arc::new(MemoryReminderStore::new());
    let sink = Arc::new(LoggingSink);
    let scheduler = Arc::new(TokioScheduler::new(
        Arc::clone(&clock) as _,
        Arc::clone(&sink) as _,
    ));
    let orchestrator = Arc::new(ReminderOrchestrator::new(
        Arc::clone(&scheduler) as _,
        Arc::clone(&store) as Arc<dyn ReminderStore>,
        Arc::clone(&clock) as _,
    ));
    let source = Arc::new(MemoryDataSource::new());

    // Reactive reconciliation over the live collections.
    let synchronizer = Arc::new(ReminderSynchronizer::new(
        Arc::clone(&orchestrator),
        Arc::clone(&store) as Arc<dyn ReminderStore>,
    ));
    let cancel = CancellationToken::new();
    let sync_handle = {
        let synchronizer = Arc::clone(&synchronizer);
        let tasks = source.subscribe_tasks();
        let events = source.subscribe_events();
        let cancel = cancel.clone();
        tokio::spawn(async move { synchronizer.run(tasks, events, cancel).await })
    };

    // A task due 61 seconds out with a one-minute reminder: fires in ~1s.
    let task = Task {
        id: TaskId::generate(),
        title: "Submit expense report".to_string(),
        due_at: clock.now() + chrono::Duration::seconds(61),
        reminders: vec![Reminder::new(1)],
        completed: false,
    };
    let base_id = task.base_id();
    info!(task = %task.id, "creating task; the synchronizer will arm its reminder");
    source.upsert_task(task.clone());

    tokio::time::sleep(Duration::from_secs(2)).await;

    let handler = ReminderActionHandler::new(
        Arc::clone(&source) as _,
        Arc::clone(&orchestrator),
        Arc::clone(&sink) as _,
    );

    // The user taps "snooze" on the fired notification; a follow-up is armed
    // ten minutes out under the derived `-snoozed` id.
    if let Ok(group) = store.read(&base_id) {
        if let Some(entry) = group.first() {
            let snoozed = handler
                .handle(ReminderAction::Snooze {
                    instance_id: entry.id.clone(),
                    payload: entry.payload.clone(),
                })
                .await;
            info!(snoozed_in_time = snoozed, "snooze action handled");
        }
    }

    // Then "complete": marks the task done and cancels everything under the
    // base id, the snoozed follow-up included.
    let done = handler
        .handle(ReminderAction::Complete {
            instance_id: InstanceId::indexed(&base_id, 0),
            base_id: base_id.clone(),
            task_id: Some(task.id.clone()),
        })
        .await;
    info!(completed_in_time = done, "complete action handled");

    // An event tomorrow keeps a group in the store...
    let event = CalendarEvent {
        id: chime_core::ids::EventId::generate(),
        title: "Design review".to_string(),
        start_at: clock.now() + chrono::Duration::days(1),
        reminders: vec![Reminder::new(30)],
    };
    source.upsert_event(event);
    tokio::time::sleep(Duration::from_millis(200)).await;

    // ...which a boot replay re-arms into a fresh scheduler.
    let fresh_scheduler = Arc::new(TokioScheduler::new(
        Arc::clone(&clock) as _,
        Arc::clone(&sink) as _,
    ));
    let boot = BootRescheduler::new(
        Arc::clone(&fresh_scheduler) as _,
        Arc::clone(&store) as Arc<dyn ReminderStore>,
    );
    let rearmed = boot.reschedule_all().await;
    info!(rearmed, "boot replay finished");

    cancel.cancel();
    let _ = sync_handle.await;
}
