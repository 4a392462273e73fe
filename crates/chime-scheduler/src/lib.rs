//! # chime-scheduler
//!
//! The scheduler capability: arm a one-shot timer for an absolute local time
//! under a string instance id, replacing any prior arming under that id, and
//! cancel by id as a no-op when nothing is armed.
//!
//! The scheduler owns no durable state. Whatever it holds can silently vanish
//! (process death, reboot); the store in `chime-store` is the source of truth
//! for what *should* be armed, and the runtime replays it.
//!
//! Implementations:
//!
//! - [`NoopScheduler`] — performs nothing; for demo/offline data sources
//! - [`TokioScheduler`] — tokio timers plus a deferred fallback delivery in
//!   case the primary timer is delayed, both coalescing per id
//!
//! Delivery goes through a [`NotificationSink`], the seam to the platform
//! notification facility.

#![deny(unsafe_code)]

use async_trait::async_trait;
use chime_core::ids::InstanceId;
use chime_core::model::{Reminder, ReminderPayload};
use chrono::NaiveDateTime;
use tracing::debug;

mod tokio_scheduler;

pub use tokio_scheduler::TokioScheduler;

/// Scheduler errors.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The platform refused to arm or deliver (permission revoked, etc.).
    #[error("platform refused: {0}")]
    PlatformRefused(String),
}

/// Result alias for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// One-shot timer facility keyed by instance id.
#[async_trait]
pub trait ReminderScheduler: Send + Sync {
    /// Arm a one-shot timer for `trigger_at` that surfaces `payload` when it
    /// fires.
    ///
    /// Scheduling an id that is already armed replaces the prior arming; no
    /// duplicate fires. The fired notification offers a "complete" action
    /// when `payload.task_id` is present and a "snooze" action when
    /// `payload.allow_snooze` is set.
    async fn schedule_reminder(
        &self,
        id: &InstanceId,
        trigger_at: NaiveDateTime,
        reminder: &Reminder,
        payload: &ReminderPayload,
    ) -> Result<()>;

    /// Disarm the timer (and any fallback delivery) under `id`.
    ///
    /// Safe to call when nothing is armed.
    async fn cancel_reminder(&self, id: &InstanceId) -> Result<()>;
}

/// Seam to the platform notification facility.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Surface `payload` to the user for the given instance.
    async fn deliver(&self, id: &InstanceId, payload: &ReminderPayload) -> Result<()>;

    /// Remove the currently displayed notification for `id`, if any.
    async fn dismiss(&self, id: &InstanceId) -> Result<()>;
}

/// Scheduler that performs neither scheduling nor cancellation.
///
/// Used with demo/offline data sources where no notification infrastructure
/// exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopScheduler;

#[async_trait]
impl ReminderScheduler for NoopScheduler {
    async fn schedule_reminder(
        &self,
        id: &InstanceId,
        trigger_at: NaiveDateTime,
        _reminder: &Reminder,
        _payload: &ReminderPayload,
    ) -> Result<()> {
        debug!(id = %id, trigger_at = %trigger_at, "noop scheduler: skipping arm");
        Ok(())
    }

    async fn cancel_reminder(&self, id: &InstanceId) -> Result<()> {
        debug!(id = %id, "noop scheduler: skipping cancel");
        Ok(())
    }
}

/// Sink that logs deliveries instead of showing notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSink;

#[async_trait]
impl NotificationSink for LoggingSink {
    async fn deliver(&self, id: &InstanceId, payload: &ReminderPayload) -> Result<()> {
        tracing::info!(
            id = %id,
            title = %payload.title,
            message = %payload.message,
            deep_link = %payload.deep_link,
            complete_action = payload.task_id.is_some(),
            snooze_action = payload.allow_snooze,
            "reminder fired"
        );
        Ok(())
    }

    async fn dismiss(&self, id: &InstanceId) -> Result<()> {
        tracing::info!(id = %id, "notification dismissed");
        Ok(())
    }
}
