use std::fmt::{Display, Formatter, Result};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationState {
    Queued,
    Processing,
    Sent,
    Failed,
    RetryScheduled,
}

impl NotificationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NotificationState::Sent | NotificationState::Failed)
    }
}

impl Display for NotificationState {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            NotificationState::Queued => write!(f, "queued"),
            NotificationState::Processing => write!(f, "processing"),
            NotificationState::Sent => write!(f, "sent"),
            NotificationState::Failed => write!(f, "failed"),
            NotificationState::RetryScheduled => write!(f, "retry_scheduled"),
        }
    }
}

/// Delivery status paired one-to-one with a `NotificationRequest`. Created at
/// enqueue time and mutated only by the queue processor until it reaches a
/// terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationStatus {
    pub id: String,

    #[serde(rename = "status")]
    pub state: NotificationState,

    pub attempts: u32,

    pub created_at: DateTime<Utc>,

    #[serde(rename = "lastAttempt")]
    pub last_attempt_at: Option<DateTime<Utc>>,

    pub completed_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NotificationStatus {
    pub fn queued(id: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            state: NotificationState::Queued,
            attempts: 0,
            created_at,
            last_attempt_at: None,
            completed_at: None,
            error: None,
        }
    }
}
