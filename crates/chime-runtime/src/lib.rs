//! # chime-runtime
//!
//! The decision-making layer of the reminder core:
//!
//! - [`ReminderOrchestrator`] — single authority translating "this task/event
//!   wants reminders" into concrete scheduled instances, and the inverse
//! - [`ReminderSynchronizer`] — reactive loop reconciling armed state against
//!   the live task/event collections
//! - [`BootRescheduler`] — replays the store into a fresh scheduler after a
//!   reboot (OS alarms do not survive one)
//! - [`ReminderActionHandler`] — handles complete/snooze interactions with a
//!   fired notification
//!
//! Failures inside this layer are recovered locally: scheduling problems are
//! logged and the affected instance stays inactive until the next
//! synchronizer pass, but the flow that triggered the work (saving a task,
//! tapping a notification) never observes a crash.

#![deny(unsafe_code)]

mod actions;
mod boot;
mod orchestrator;
mod sources;
mod sync;

#[cfg(test)]
mod testutil;

pub use actions::{ReminderAction, ReminderActionHandler};
pub use boot::BootRescheduler;
pub use orchestrator::ReminderOrchestrator;
pub use sources::{EventDataSource, MemoryDataSource, TaskDataSource};
pub use sync::ReminderSynchronizer;
