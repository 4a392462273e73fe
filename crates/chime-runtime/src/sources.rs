//! Task/event data-source seams.
//!
//! The persistence/UI layers own the authoritative collections; the reminder
//! core only consumes push-based full-snapshot subscriptions and performs the
//! narrow mutations action handling needs. `tokio::sync::watch` carries the
//! "current full list" semantics: late subscribers see the latest snapshot
//! immediately.

use chime_core::ids::{EventId, TaskId};
use chime_core::model::{CalendarEvent, Task};
use tokio::sync::watch;

/// Source of the live task collection.
pub trait TaskDataSource: Send + Sync {
    /// Subscribe to full task snapshots.
    fn subscribe_tasks(&self) -> watch::Receiver<Vec<Task>>;

    /// Insert or replace a task by id.
    fn upsert_task(&self, task: Task);

    /// Delete a task. Returns whether it existed.
    fn delete_task(&self, id: &TaskId) -> bool;

    /// Set a task's completion status. Returns whether it existed.
    fn set_task_completed(&self, id: &TaskId, completed: bool) -> bool;

    /// Look up a task by id.
    fn task(&self, id: &TaskId) -> Option<Task>;
}

/// Source of the live calendar-event collection.
pub trait EventDataSource: Send + Sync {
    /// Subscribe to full event snapshots.
    fn subscribe_events(&self) -> watch::Receiver<Vec<CalendarEvent>>;

    /// Insert or replace an event by id.
    fn upsert_event(&self, event: CalendarEvent);

    /// Delete an event. Returns whether it existed.
    fn delete_event(&self, id: &EventId) -> bool;
}

/// In-memory data source backing both collections; demos and tests.
///
/// State lives inside the watch channels themselves, so every mutation
/// publishes a fresh snapshot to subscribers.
#[derive(Debug)]
pub struct MemoryDataSource {
    tasks: watch::Sender<Vec<Task>>,
    events: watch::Sender<Vec<CalendarEvent>>,
}

impl Default for MemoryDataSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDataSource {
    /// Empty data source.
    #[must_use]
    pub fn new() -> Self {
        let (tasks, _) = watch::channel(Vec::new());
        let (events, _) = watch::channel(Vec::new());
        Self { tasks, events }
    }
}

impl TaskDataSource for MemoryDataSource {
    fn subscribe_tasks(&self) -> watch::Receiver<Vec<Task>> {
        self.tasks.subscribe()
    }

    fn upsert_task(&self, task: Task) {
        self.tasks.send_modify(|tasks| {
            if let Some(existing) = tasks.iter_mut().find(|t| t.id == task.id) {
                *existing = task;
            } else {
                tasks.push(task);
            }
        });
    }

    fn delete_task(&self, id: &TaskId) -> bool {
        let mut found = false;
        self.tasks.send_modify(|tasks| {
            let before = tasks.len();
            tasks.retain(|t| &t.id != id);
            found = tasks.len() != before;
        });
        found
    }

    fn set_task_completed(&self, id: &TaskId, completed: bool) -> bool {
        let mut found = false;
        self.tasks.send_modify(|tasks| {
            if let Some(task) = tasks.iter_mut().find(|t| &t.id == id) {
                task.completed = completed;
                found = true;
            }
        });
        found
    }

    fn task(&self, id: &TaskId) -> Option<Task> {
        self.tasks.borrow().iter().find(|t| &t.id == id).cloned()
    }
}

impl EventDataSource for MemoryDataSource {
    fn subscribe_events(&self) -> watch::Receiver<Vec<CalendarEvent>> {
        self.events.subscribe()
    }

    fn upsert_event(&self, event: CalendarEvent) {
        self.events.send_modify(|events| {
            if let Some(existing) = events.iter_mut().find(|e| e.id == event.id) {
                *existing = event;
            } else {
                events.push(event);
            }
        });
    }

    fn delete_event(&self, id: &EventId) -> bool {
        let mut found = false;
        self.events.send_modify(|events| {
            let before = events.len();
            events.retain(|e| &e.id != id);
            found = events.len() != before;
        });
        found
    }
}
