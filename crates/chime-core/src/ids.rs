//! Branded identifier newtypes.
//!
//! The identifier scheme is shared with the mobile clients and must stay
//! stable:
//!
//! - base id: `"task-<uuid>"` or `"event-<uuid>"` — groups every reminder
//!   instance belonging to one owner
//! - instance id: `"<baseId>-<index>"` for the reminder at that list index
//! - snoozed instance id: `"<instanceId>-snoozed"` — derived, never collides
//!   with an index-based id because `"snoozed"` does not parse as an index

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix of task base ids.
pub const TASK_PREFIX: &str = "task-";
/// Prefix of calendar-event base ids.
pub const EVENT_PREFIX: &str = "event-";
/// Suffix appended to an instance id when a snoozed copy is scheduled.
pub const SNOOZE_SUFFIX: &str = "-snoozed";

/// Identifier of a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

/// Identifier of a calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

macro_rules! owner_id {
    ($ty:ident) => {
        impl $ty {
            /// Generate a fresh random id.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// The raw string form.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $ty {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $ty {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

owner_id!(TaskId);
owner_id!(EventId);

/// Kind of reminder owner a base id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    /// A to-do item with a due time.
    Task,
    /// A fixed calendar appointment.
    Event,
}

impl OwnerKind {
    /// The base-id prefix for this kind.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Task => TASK_PREFIX,
            Self::Event => EVENT_PREFIX,
        }
    }
}

/// Stable identifier grouping all reminder instances of one task or event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaseId(String);

impl BaseId {
    /// Base id for a task owner.
    #[must_use]
    pub fn for_task(id: &TaskId) -> Self {
        Self(format!("{TASK_PREFIX}{id}"))
    }

    /// Base id for a calendar-event owner.
    #[must_use]
    pub fn for_event(id: &EventId) -> Self {
        Self(format!("{EVENT_PREFIX}{id}"))
    }

    /// The owner kind encoded in the prefix, if recognized.
    ///
    /// Unrecognized prefixes occur only if a foreign writer shares the store;
    /// such groups are left alone by reconciliation.
    #[must_use]
    pub fn owner_kind(&self) -> Option<OwnerKind> {
        if self.0.starts_with(TASK_PREFIX) {
            Some(OwnerKind::Task)
        } else if self.0.starts_with(EVENT_PREFIX) {
            Some(OwnerKind::Event)
        } else {
            None
        }
    }

    /// The raw string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for BaseId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for BaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one concrete scheduled reminder instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    /// Instance id for the reminder at `index` in the owner's reminder list.
    #[must_use]
    pub fn indexed(base: &BaseId, index: usize) -> Self {
        Self(format!("{base}-{index}"))
    }

    /// Derive the id of the snoozed follow-up to this instance.
    #[must_use]
    pub fn snoozed(&self) -> Self {
        Self(format!("{}{SNOOZE_SUFFIX}", self.0))
    }

    /// Whether this id is a snoozed derivative.
    #[must_use]
    pub fn is_snoozed(&self) -> bool {
        self.0.ends_with(SNOOZE_SUFFIX)
    }

    /// The raw string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for InstanceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
