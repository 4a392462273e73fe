//! Domain model for reminders and their owners.
//!
//! All serializable types use `camelCase` for wire compatibility with the
//! mobile clients. Timestamps are naive local datetimes; the zone they are
//! interpreted in is owned by the [`crate::clock::Clock`] configuration, not
//! by the individual value.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::ids::{BaseId, EventId, InstanceId, TaskId};

/// Default snooze follow-up delay in minutes.
pub const DEFAULT_SNOOZE_MINUTES: u32 = 10;

/// A reminder offset attached to a task or event.
///
/// Immutable value; an owner carries a list of these and each list index maps
/// to one potential scheduled instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    /// How many minutes before the owner's due/start time to fire.
    pub minutes_before: u32,
    /// Whether the user may snooze this reminder when it fires.
    pub allow_snooze: bool,
}

impl Reminder {
    /// A reminder firing `minutes_before` minutes early, snoozable.
    #[must_use]
    pub fn new(minutes_before: u32) -> Self {
        Self {
            minutes_before,
            allow_snooze: true,
        }
    }

    /// Disable snoozing on this reminder.
    #[must_use]
    pub fn without_snooze(mut self) -> Self {
        self.allow_snooze = false;
        self
    }
}

/// Notification content for one scheduled reminder instance.
///
/// Built fresh each time an instance is (re)scheduled; persisted only as part
/// of a [`StoredReminder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderPayload {
    /// Notification title (the owner's title).
    pub title: String,
    /// Human-readable body embedding the reminder offset.
    pub message: String,
    /// Stable URI referencing the owner by kind and id.
    pub deep_link: String,
    /// Whether the fired notification offers a snooze action.
    pub allow_snooze: bool,
    /// Owning task, when the owner is a task. Drives the "complete" action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    /// Owner group identifier.
    pub base_id: BaseId,
    /// Snooze follow-up delay in minutes.
    #[serde(default = "default_snooze_minutes")]
    pub snooze_minutes: u32,
}

fn default_snooze_minutes() -> u32 {
    DEFAULT_SNOOZE_MINUTES
}

/// Durable snapshot of one active scheduled reminder instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReminder {
    /// Instance id this snapshot was armed under.
    pub id: InstanceId,
    /// Absolute local fire time.
    pub trigger_at: NaiveDateTime,
    /// The reminder offset that produced this instance.
    pub reminder: Reminder,
    /// The notification content armed with it.
    pub payload: ReminderPayload,
}

/// A to-do item with a due time and reminder offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Task identifier.
    pub id: TaskId,
    /// User-visible title.
    pub title: String,
    /// Due time, naive local.
    pub due_at: NaiveDateTime,
    /// Reminder offsets; list index is part of each instance id.
    #[serde(default)]
    pub reminders: Vec<Reminder>,
    /// Whether the task is done. Completed tasks schedule nothing.
    #[serde(default)]
    pub completed: bool,
}

impl Task {
    /// The base id grouping this task's reminder instances.
    #[must_use]
    pub fn base_id(&self) -> BaseId {
        BaseId::for_task(&self.id)
    }

    /// Deep link opening this task in the app.
    #[must_use]
    pub fn deep_link(&self) -> String {
        format!("chime://task/{}", self.id)
    }
}

/// A fixed calendar appointment with a start time and reminder offsets.
///
/// Events are not actionable to-dos: their reminders categorically disallow
/// snoozing regardless of the per-reminder flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    /// Event identifier.
    pub id: EventId,
    /// User-visible title.
    pub title: String,
    /// Start time, naive local.
    pub start_at: NaiveDateTime,
    /// Reminder offsets; list index is part of each instance id.
    #[serde(default)]
    pub reminders: Vec<Reminder>,
}

impl CalendarEvent {
    /// The base id grouping this event's reminder instances.
    #[must_use]
    pub fn base_id(&self) -> BaseId {
        BaseId::for_event(&self.id)
    }

    /// Deep link opening this event in the app.
    #[must_use]
    pub fn deep_link(&self) -> String {
        format!("chime://event/{}", self.id)
    }
}
