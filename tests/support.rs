use std::collections::HashMap;
use std::sync::{
    Arc,
    atomic::{AtomicI32, AtomicU32, Ordering},
};
use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use notification_service::{
    models::{
        notification::{ChannelPayload, EmailPayload, WhatsappPayload},
        retry::RetryConfig,
        status::NotificationStatus,
    },
    queue::NotificationQueue,
    transports::{DeliveryAck, Transport},
};
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;

/// Transport stub that records dispatch order and timing. Fails the first
/// `fail_first` sends, or every send when constructed as always-failing.
pub struct StubTransport {
    calls: Mutex<Vec<String>>,
    times: Mutex<Vec<Instant>>,
    fail_remaining: AtomicI32,
}

impl StubTransport {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self::with_failures(0))
    }

    pub fn failing_first(failures: i32) -> Arc<Self> {
        Arc::new(Self::with_failures(failures))
    }

    pub fn always_failing() -> Arc<Self> {
        Arc::new(Self::with_failures(-1))
    }

    fn with_failures(failures: i32) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            times: Mutex::new(Vec::new()),
            fail_remaining: AtomicI32::new(failures),
        }
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    pub async fn times(&self) -> Vec<Instant> {
        self.times.lock().await.clone()
    }

    async fn record(&self, to: &str) -> Result<DeliveryAck, Error> {
        let call_number = {
            let mut calls = self.calls.lock().await;
            calls.push(to.to_string());
            calls.len()
        };
        self.times.lock().await.push(Instant::now());

        let remaining = self.fail_remaining.load(Ordering::SeqCst);
        if remaining != 0 {
            if remaining > 0 {
                self.fail_remaining.fetch_sub(1, Ordering::SeqCst);
            }
            return Err(anyhow!("Simulated transport failure"));
        }

        Ok(DeliveryAck {
            provider_id: format!("stub_{}", call_number),
        })
    }
}

#[async_trait]
impl Transport<EmailPayload> for StubTransport {
    async fn send(&self, payload: &EmailPayload) -> Result<DeliveryAck, Error> {
        self.record(&payload.to).await
    }
}

#[async_trait]
impl Transport<WhatsappPayload> for StubTransport {
    async fn send(&self, payload: &WhatsappPayload) -> Result<DeliveryAck, Error> {
        self.record(&payload.to).await
    }
}

/// Transport stub whose sends block until the test releases the gate,
/// counting how many dispatches have started.
pub struct GatedTransport {
    pub dispatches: AtomicU32,
    gate: Semaphore,
}

impl GatedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            dispatches: AtomicU32::new(0),
            gate: Semaphore::new(0),
        })
    }

    pub fn release(&self, sends: usize) {
        self.gate.add_permits(sends);
    }

    async fn held_send(&self) -> Result<DeliveryAck, Error> {
        self.dispatches.fetch_add(1, Ordering::SeqCst);
        let permit = self.gate.acquire().await.map_err(|_| anyhow!("Gate closed"))?;
        permit.forget();

        Ok(DeliveryAck {
            provider_id: "gated".to_string(),
        })
    }
}

#[async_trait]
impl Transport<EmailPayload> for GatedTransport {
    async fn send(&self, _payload: &EmailPayload) -> Result<DeliveryAck, Error> {
        self.held_send().await
    }
}

#[async_trait]
impl Transport<WhatsappPayload> for GatedTransport {
    async fn send(&self, _payload: &WhatsappPayload) -> Result<DeliveryAck, Error> {
        self.held_send().await
    }
}

pub fn stub_queue(stub: &Arc<StubTransport>, retry: RetryConfig) -> NotificationQueue {
    let email: Arc<dyn Transport<EmailPayload>> = stub.clone();
    let whatsapp: Arc<dyn Transport<WhatsappPayload>> = stub.clone();
    NotificationQueue::new(email, whatsapp, retry)
}

pub fn gated_queue(gated: &Arc<GatedTransport>, retry: RetryConfig) -> NotificationQueue {
    let email: Arc<dyn Transport<EmailPayload>> = gated.clone();
    let whatsapp: Arc<dyn Transport<WhatsappPayload>> = gated.clone();
    NotificationQueue::new(email, whatsapp, retry)
}

/// Short real-time delays for tests that run against an unpaused clock.
pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        delays_ms: vec![10, 20, 30],
    }
}

pub fn email_payload(to: &str) -> ChannelPayload {
    ChannelPayload::Email(EmailPayload {
        to: to.to_string(),
        subject: "Hi".to_string(),
        template: "welcomeEmail".to_string(),
        data: HashMap::from([("name".to_string(), serde_json::json!("A"))]),
    })
}

pub fn whatsapp_payload(to: &str) -> ChannelPayload {
    ChannelPayload::Whatsapp(WhatsappPayload {
        to: to.to_string(),
        message: "Your site visit is confirmed".to_string(),
        message_type: "text".to_string(),
    })
}

pub async fn wait_for_terminal(queue: &NotificationQueue, id: &str) -> NotificationStatus {
    tokio::time::timeout(Duration::from_secs(300), async {
        loop {
            if let Some(status) = queue.get_status(id).await
                && status.state.is_terminal()
            {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("notification did not reach a terminal state in time")
}
