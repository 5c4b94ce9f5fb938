use serde::Serialize;

use crate::models::status::NotificationStatus;
use crate::queue::QueueStats;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueResponse {
    pub success: bool,
    pub notification_id: String,
    pub status: &'static str,
}

impl EnqueueResponse {
    pub fn queued(notification_id: String) -> Self {
        Self {
            success: true,
            notification_id,
            status: "queued",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEnqueueResponse {
    pub success: bool,
    pub notification_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub status: NotificationStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: QueueStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            message: message.into(),
        }
    }
}
