//! Notification action handling.
//!
//! The platform delivers COMPLETE/SNOOZE taps to a freshly constructed
//! handler with no retained state, and reclaims the host process once the
//! pending work signals completion. The handler is therefore stateless over
//! injected capabilities, and every `handle` call is bounded: the work runs
//! as a detached task owning a completion guard that signals on every exit
//! path (including panics), and the caller waits at most the configured
//! timeout for that signal.

use std::sync::Arc;
use std::time::Duration;

use chime_core::ids::{BaseId, InstanceId, TaskId};
use chime_core::model::{Reminder, ReminderPayload};
use chime_scheduler::NotificationSink;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::sources::TaskDataSource;
use crate::ReminderOrchestrator;

/// How long `handle` waits for the pending work to signal completion.
const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(8);

/// A user interaction with a fired reminder notification.
#[derive(Debug, Clone)]
pub enum ReminderAction {
    /// "Mark done": complete the owning task (if any) and cancel its
    /// remaining reminders.
    Complete {
        /// The fired instance.
        instance_id: InstanceId,
        /// Owner group to cancel.
        base_id: BaseId,
        /// Owning task, when the owner is a task.
        task_id: Option<TaskId>,
    },
    /// "Remind me later": re-arm one follow-up shortly from now.
    Snooze {
        /// The fired instance.
        instance_id: InstanceId,
        /// The payload the instance fired with; carried to the follow-up.
        payload: ReminderPayload,
    },
}

/// Stateless handler for notification actions.
#[derive(Clone)]
pub struct ReminderActionHandler {
    tasks: Arc<dyn TaskDataSource>,
    orchestrator: Arc<ReminderOrchestrator>,
    sink: Arc<dyn NotificationSink>,
    timeout: Duration,
}

impl std::fmt::Debug for ReminderActionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderActionHandler")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Sends the completion signal on drop, so every exit path — success,
/// early return, panic unwind — releases the waiting caller.
struct CompletionGuard(Option<oneshot::Sender<()>>);

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
        }
    }
}

impl ReminderActionHandler {
    /// Handler with the default pending-work timeout.
    #[must_use]
    pub fn new(
        tasks: Arc<dyn TaskDataSource>,
        orchestrator: Arc<ReminderOrchestrator>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self::with_timeout(tasks, orchestrator, sink, DEFAULT_ACTION_TIMEOUT)
    }

    /// Handler with an explicit pending-work timeout.
    #[must_use]
    pub fn with_timeout(
        tasks: Arc<dyn TaskDataSource>,
        orchestrator: Arc<ReminderOrchestrator>,
        sink: Arc<dyn NotificationSink>,
        timeout: Duration,
    ) -> Self {
        Self {
            tasks,
            orchestrator,
            sink,
            timeout,
        }
    }

    /// Process an action.
    ///
    /// Returns whether the work signaled completion within the timeout. On
    /// timeout the detached work keeps running, but the caller is released so
    /// the host is never held indefinitely.
    pub async fn handle(&self, action: ReminderAction) -> bool {
        let (done_tx, done_rx) = oneshot::channel();
        let this = self.clone();
        let _worker = tokio::spawn(async move {
            let _guard = CompletionGuard(Some(done_tx));
            this.run(action).await;
        });

        match tokio::time::timeout(self.timeout, done_rx).await {
            Ok(_) => true,
            Err(_) => {
                warn!("reminder action did not complete within the pending window");
                false
            }
        }
    }

    async fn run(&self, action: ReminderAction) {
        match action {
            ReminderAction::Complete {
                instance_id,
                base_id,
                task_id,
            } => self.complete(&instance_id, &base_id, task_id.as_ref()).await,
            ReminderAction::Snooze {
                instance_id,
                payload,
            } => self.snooze(&instance_id, &payload).await,
        }
    }

    async fn complete(
        &self,
        instance_id: &InstanceId,
        base_id: &BaseId,
        task_id: Option<&TaskId>,
    ) {
        if let Some(task_id) = task_id {
            // Task may have been deleted before the tap was processed; the
            // owner-specific step is then a soft no-op.
            if !self.tasks.set_task_completed(task_id, true) {
                debug!(task_id = %task_id, "task missing at completion; skipping status change");
            }
        }
        self.orchestrator.cancel_by_base_id(base_id).await;
        self.dismiss(instance_id).await;
    }

    async fn snooze(&self, instance_id: &InstanceId, payload: &ReminderPayload) {
        if payload.allow_snooze {
            let snooze_id = instance_id.snoozed();
            let trigger_at = self.orchestrator.clock().now()
                + chrono::Duration::minutes(i64::from(payload.snooze_minutes));
            let reminder = Reminder {
                minutes_before: payload.snooze_minutes,
                allow_snooze: payload.allow_snooze,
            };
            if let Err(e) = self
                .orchestrator
                .scheduler()
                .schedule_reminder(&snooze_id, trigger_at, &reminder, payload)
                .await
            {
                warn!(id = %snooze_id, error = %e, "failed to arm snoozed follow-up");
            } else {
                debug!(id = %snooze_id, trigger_at = %trigger_at, "snoozed");
            }
        } else {
            debug!(id = %instance_id, "snooze disallowed; dismissing only");
        }
        self.dismiss(instance_id).await;
    }

    async fn dismiss(&self, instance_id: &InstanceId) {
        if let Err(e) = self.sink.dismiss(instance_id).await {
            warn!(id = %instance_id, error = %e, "failed to dismiss notification");
        }
    }
}
