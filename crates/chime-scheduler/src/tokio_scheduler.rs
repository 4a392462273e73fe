//! Tokio timer-backed scheduler.
//!
//! Each armed id owns two spawned tasks: the primary timer at the trigger
//! time and a deferred fallback at `trigger + fallback_slack`. The fallback
//! models the platform's deferred-work path: if the primary delivery is
//! delayed or lost, the fallback still surfaces the notification, and a
//! shared delivered flag guarantees at most one delivery per arming.
//!
//! Past-due triggers clamp to a zero delay and fire immediately (late
//! "missed reminder" delivery), which is what the boot replay path relies on.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chime_core::clock::Clock;
use chime_core::ids::InstanceId;
use chime_core::model::{Reminder, ReminderPayload};
use chrono::NaiveDateTime;
use dashmap::DashMap;
use metrics::counter;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{NotificationSink, ReminderScheduler, Result};

/// Default slack between the primary timer and the fallback delivery.
const DEFAULT_FALLBACK_SLACK: Duration = Duration::from_secs(60);

struct Armed {
    primary: JoinHandle<()>,
    fallback: JoinHandle<()>,
    delivered: Arc<AtomicBool>,
}

impl Armed {
    fn abort(&self) {
        self.primary.abort();
        self.fallback.abort();
    }
}

/// Scheduler arming tokio one-shot timers, one primary + one fallback per id.
pub struct TokioScheduler {
    clock: Arc<dyn Clock>,
    sink: Arc<dyn NotificationSink>,
    fallback_slack: Duration,
    armed: Arc<DashMap<InstanceId, Armed>>,
}

impl std::fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioScheduler")
            .field("fallback_slack", &self.fallback_slack)
            .field("armed", &self.armed.len())
            .finish_non_exhaustive()
    }
}

impl TokioScheduler {
    /// Scheduler with the default fallback slack.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, sink: Arc<dyn NotificationSink>) -> Self {
        Self::with_fallback_slack(clock, sink, DEFAULT_FALLBACK_SLACK)
    }

    /// Scheduler with an explicit fallback slack.
    #[must_use]
    pub fn with_fallback_slack(
        clock: Arc<dyn Clock>,
        sink: Arc<dyn NotificationSink>,
        fallback_slack: Duration,
    ) -> Self {
        Self {
            clock,
            sink,
            fallback_slack,
            armed: Arc::new(DashMap::new()),
        }
    }

    /// Number of currently armed ids.
    #[must_use]
    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }

    fn spawn_delivery(
        &self,
        id: &InstanceId,
        payload: &ReminderPayload,
        delay: Duration,
        delivered: Arc<AtomicBool>,
        is_fallback: bool,
    ) -> JoinHandle<()> {
        let id = id.clone();
        let payload = payload.clone();
        let sink = Arc::clone(&self.sink);
        let armed = Arc::clone(&self.armed);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !delivered.swap(true, Ordering::SeqCst) {
                if let Err(e) = sink.deliver(&id, &payload).await {
                    warn!(id = %id, error = %e, is_fallback, "notification delivery failed");
                } else {
                    counter!("reminders_delivered_total").increment(1);
                }
            }
            if is_fallback {
                // Only reap our own registration — a re-schedule may have
                // replaced the entry under this id in the meantime.
                let _ = armed.remove_if(&id, |_, a| Arc::ptr_eq(&a.delivered, &delivered));
            }
        })
    }
}

#[async_trait]
impl ReminderScheduler for TokioScheduler {
    async fn schedule_reminder(
        &self,
        id: &InstanceId,
        trigger_at: NaiveDateTime,
        reminder: &Reminder,
        payload: &ReminderPayload,
    ) -> Result<()> {
        // Past-due triggers clamp to zero and fire immediately.
        let delay = (trigger_at - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);

        if let Some((_, prev)) = self.armed.remove(id) {
            prev.abort();
            debug!(id = %id, "replacing prior arming");
        }

        let delivered = Arc::new(AtomicBool::new(false));
        let primary = self.spawn_delivery(id, payload, delay, Arc::clone(&delivered), false);
        let fallback = self.spawn_delivery(
            id,
            payload,
            delay + self.fallback_slack,
            Arc::clone(&delivered),
            true,
        );
        let _ = self.armed.insert(
            id.clone(),
            Armed {
                primary,
                fallback,
                delivered,
            },
        );

        counter!("reminders_armed_total").increment(1);
        debug!(
            id = %id,
            trigger_at = %trigger_at,
            delay_secs = delay.as_secs(),
            minutes_before = reminder.minutes_before,
            "armed reminder"
        );
        Ok(())
    }

    async fn cancel_reminder(&self, id: &InstanceId) -> Result<()> {
        if let Some((_, armed)) = self.armed.remove(id) {
            armed.abort();
            counter!("reminders_disarmed_total").increment(1);
            debug!(id = %id, "disarmed reminder");
        }
        Ok(())
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for entry in self.armed.iter() {
            entry.value().abort();
        }
    }
}
