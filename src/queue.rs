use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::models::{
    notification::{ChannelPayload, EmailPayload, NotificationRequest, Priority, WhatsappPayload},
    retry::RetryConfig,
    status::{NotificationState, NotificationStatus},
};
use crate::transports::Transport;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StateCounts {
    pub queued: usize,
    pub processing: usize,
    pub sent: usize,
    pub failed: usize,
    pub retry_scheduled: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    pub total: usize,
    pub queued: usize,
    pub processing: bool,
    pub statuses: StateCounts,
}

struct QueueState {
    pending: VecDeque<NotificationRequest>,
    statuses: HashMap<String, NotificationStatus>,

    /// Single-drain guard: true while a processor task is running.
    processing: bool,
}

impl QueueState {
    fn counts_by_state(&self) -> StateCounts {
        let mut counts = StateCounts::default();
        for status in self.statuses.values() {
            match status.state {
                NotificationState::Queued => counts.queued += 1,
                NotificationState::Processing => counts.processing += 1,
                NotificationState::Sent => counts.sent += 1,
                NotificationState::Failed => counts.failed += 1,
                NotificationState::RetryScheduled => counts.retry_scheduled += 1,
            }
        }
        counts
    }

    /// Insert ahead of every strictly-lower-priority item. Equal priority
    /// keeps insertion order, so each tier stays FIFO.
    fn insert_by_priority(&mut self, request: NotificationRequest) {
        let position = self
            .pending
            .iter()
            .position(|pending| pending.priority < request.priority)
            .unwrap_or(self.pending.len());

        self.pending.insert(position, request);
    }
}

struct QueueInner {
    state: Mutex<QueueState>,
    email: Arc<dyn Transport<EmailPayload>>,
    whatsapp: Arc<dyn Transport<WhatsappPayload>>,
    retry: RetryConfig,
}

/// In-memory delivery queue drained by a single cooperative processor task.
///
/// Enqueue operations return an id immediately; delivery outcome is only
/// observable by polling `get_status`. Transport failures never propagate to
/// enqueue callers.
#[derive(Clone)]
pub struct NotificationQueue {
    inner: Arc<QueueInner>,
}

impl NotificationQueue {
    pub fn new(
        email: Arc<dyn Transport<EmailPayload>>,
        whatsapp: Arc<dyn Transport<WhatsappPayload>>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState {
                    pending: VecDeque::new(),
                    statuses: HashMap::new(),
                    processing: false,
                }),
                email,
                whatsapp,
                retry,
            }),
        }
    }

    /// Appends the request to the back of the pending list and returns its id.
    pub async fn enqueue(&self, channel: ChannelPayload, priority: Priority) -> String {
        self.submit(channel, priority, false).await
    }

    /// Inserts the request ahead of all lower-priority pending items.
    pub async fn enqueue_priority(&self, channel: ChannelPayload, priority: Priority) -> String {
        self.submit(channel, priority, true).await
    }

    /// Enqueues every item independently; no atomicity across the batch.
    /// High and urgent items take the priority-insertion path.
    pub async fn send_bulk(
        &self,
        items: Vec<(ChannelPayload, Option<Priority>)>,
        default_priority: Priority,
    ) -> Vec<String> {
        let mut ids = Vec::with_capacity(items.len());

        for (channel, priority) in items {
            let priority = priority.unwrap_or(default_priority);
            let id = if priority >= Priority::High {
                self.enqueue_priority(channel, priority).await
            } else {
                self.enqueue(channel, priority).await
            };
            ids.push(id);
        }

        ids
    }

    pub async fn get_status(&self, id: &str) -> Option<NotificationStatus> {
        let state = self.inner.state.lock().await;
        state.statuses.get(id).cloned()
    }

    pub async fn get_queue_stats(&self) -> QueueStats {
        let state = self.inner.state.lock().await;
        QueueStats {
            total: state.statuses.len(),
            queued: state.pending.len(),
            processing: state.processing,
            statuses: state.counts_by_state(),
        }
    }

    /// Idempotent kick: starts the processor task unless one is already
    /// draining.
    pub async fn process_queue(&self) {
        let mut state = self.inner.state.lock().await;
        Self::kick_locked(&mut state, &self.inner);
    }

    /// Resolves once no request is in a non-terminal state and the processor
    /// is parked. Pending retry timers count as in-flight work.
    pub async fn wait_until_idle(&self) {
        loop {
            {
                let state = self.inner.state.lock().await;
                let counts = state.counts_by_state();
                let in_flight = counts.queued + counts.processing + counts.retry_scheduled;
                if in_flight == 0 && !state.processing {
                    return;
                }
            }
            sleep(Duration::from_millis(10)).await;
        }
    }

    /// Retention housekeeping: drops terminal statuses completed before the
    /// retention window. Returns the number of purged entries.
    pub async fn purge_completed(&self, retention: Duration) -> usize {
        let cutoff = chrono::Utc::now()
            - chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::zero());

        let mut state = self.inner.state.lock().await;
        let before = state.statuses.len();

        state.statuses.retain(|_, status| {
            !(status.state.is_terminal()
                && status.completed_at.is_some_and(|completed| completed < cutoff))
        });

        let purged = before - state.statuses.len();
        if purged > 0 {
            info!(purged, "Purged completed notification statuses");
        }
        purged
    }

    async fn submit(&self, channel: ChannelPayload, priority: Priority, front: bool) -> String {
        let request = NotificationRequest::new(channel, priority);
        let id = request.id.clone();

        let mut state = self.inner.state.lock().await;
        state.statuses.insert(
            id.clone(),
            NotificationStatus::queued(id.clone(), request.created_at),
        );

        info!(
            notification_id = %id,
            channel = request.channel.channel_name(),
            priority = ?priority,
            "Notification enqueued"
        );

        if front {
            state.insert_by_priority(request);
        } else {
            state.pending.push_back(request);
        }

        Self::kick_locked(&mut state, &self.inner);

        id
    }

    fn kick_locked(state: &mut QueueState, inner: &Arc<QueueInner>) {
        if state.processing {
            return;
        }
        state.processing = true;

        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            Self::drain(inner).await;
        });
    }

    /// The single processor loop: pops the pending head, dispatches, records
    /// the outcome, and schedules retries. Exactly one drain runs at a time.
    async fn drain(inner: Arc<QueueInner>) {
        loop {
            let request = {
                let mut state = inner.state.lock().await;

                let Some(request) = state.pending.pop_front() else {
                    state.processing = false;
                    return;
                };

                match state.statuses.get_mut(&request.id) {
                    Some(status) => {
                        status.state = NotificationState::Processing;
                        status.attempts += 1;
                        status.last_attempt_at = Some(chrono::Utc::now());
                    }
                    None => {
                        warn!(notification_id = %request.id, "Pending request has no status record, dropping");
                        continue;
                    }
                }

                request
            };

            // Transport dispatch happens outside the lock so status reads
            // stay responsive during slow sends.
            let result = match &request.channel {
                ChannelPayload::Email(payload) => inner.email.send(payload).await,
                ChannelPayload::Whatsapp(payload) => inner.whatsapp.send(payload).await,
            };

            let mut state = inner.state.lock().await;
            let Some(status) = state.statuses.get_mut(&request.id) else {
                continue;
            };

            match result {
                Ok(ack) => {
                    status.state = NotificationState::Sent;
                    status.completed_at = Some(chrono::Utc::now());
                    status.error = None;

                    info!(
                        notification_id = %request.id,
                        channel = request.channel.channel_name(),
                        attempts = status.attempts,
                        provider_id = %ack.provider_id,
                        "Notification delivered"
                    );
                }
                Err(error) => {
                    let attempts = status.attempts;

                    if attempts < inner.retry.max_attempts {
                        status.state = NotificationState::RetryScheduled;
                        status.error = Some(error.to_string());

                        let delay = inner.retry.delay_for(attempts);

                        debug!(
                            notification_id = %request.id,
                            attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %error,
                            "Delivery failed, retry scheduled"
                        );

                        let retry_inner = Arc::clone(&inner);
                        tokio::spawn(async move {
                            sleep(delay).await;

                            let mut state = retry_inner.state.lock().await;
                            state.insert_by_priority(request);
                            Self::kick_locked(&mut state, &retry_inner);
                        });
                    } else {
                        status.state = NotificationState::Failed;
                        status.completed_at = Some(chrono::Utc::now());
                        status.error = Some(error.to_string());

                        warn!(
                            notification_id = %request.id,
                            channel = request.channel.channel_name(),
                            attempts,
                            error = %error,
                            "Notification failed after exhausting retries"
                        );
                    }
                }
            }
        }
    }
}
