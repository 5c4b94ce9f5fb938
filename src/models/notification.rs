use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::{Rng, distr::Alphanumeric};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailPayload {
    pub to: String,
    pub subject: String,
    pub template: String,

    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

fn default_message_type() -> String {
    "text".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsappPayload {
    pub to: String,
    pub message: String,

    #[serde(rename = "type", default = "default_message_type")]
    pub message_type: String,
}

/// Closed set of delivery channels. Adding a channel means adding a variant
/// and a transport implementation, checked at compile time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "lowercase")]
pub enum ChannelPayload {
    Email(EmailPayload),
    Whatsapp(WhatsappPayload),
}

impl ChannelPayload {
    pub fn channel_name(&self) -> &'static str {
        match self {
            ChannelPayload::Email(_) => "email",
            ChannelPayload::Whatsapp(_) => "whatsapp",
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            ChannelPayload::Email(payload) => &payload.to,
            ChannelPayload::Whatsapp(payload) => &payload.to,
        }
    }
}

/// Immutable after creation; its paired `NotificationStatus` carries all
/// mutable delivery state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub id: String,
    #[serde(flatten)]
    pub channel: ChannelPayload,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

impl NotificationRequest {
    pub fn new(channel: ChannelPayload, priority: Priority) -> Self {
        Self {
            id: generate_notification_id(),
            channel,
            priority,
            created_at: Utc::now(),
        }
    }
}

pub fn generate_notification_id() -> String {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();

    format!("notif_{}_{}", Utc::now().timestamp_millis(), suffix)
}
