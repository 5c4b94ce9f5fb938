use std::sync::Arc;
use std::time::Duration;

use anyhow::{Error, Result};
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{
    config::Config,
    models::{
        notification::{ChannelPayload, EmailPayload, Priority, WhatsappPayload},
        response::{BulkEnqueueResponse, EnqueueResponse, ErrorResponse, StatsResponse, StatusResponse},
        validation::{validate_email, validate_phone},
    },
    queue::{NotificationQueue, QueueStats},
};

pub struct AppState {
    queue: NotificationQueue,
}

#[derive(Debug, Deserialize)]
struct EmailNotificationRequest {
    #[serde(flatten)]
    payload: EmailPayload,

    #[serde(default)]
    priority: Priority,
}

#[derive(Debug, Deserialize)]
struct WhatsappNotificationRequest {
    #[serde(flatten)]
    payload: WhatsappPayload,

    #[serde(default)]
    priority: Priority,
}

#[derive(Debug, Deserialize)]
struct BulkNotificationItem {
    #[serde(flatten)]
    channel: ChannelPayload,

    priority: Option<Priority>,
}

#[derive(Debug, Deserialize)]
struct BulkNotificationRequest {
    notifications: Vec<BulkNotificationItem>,

    #[serde(default)]
    priority: Priority,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
    queue: QueueStats,
}

pub fn build_router(queue: NotificationQueue) -> Router {
    let state = Arc::new(AppState { queue });

    Router::new()
        .route("/api/notifications/email", post(send_email))
        .route("/api/notifications/whatsapp", post(send_whatsapp))
        .route("/api/notifications/bulk", post(send_bulk))
        .route("/api/notifications/status/{id}", get(notification_status))
        .route("/api/notifications/queue/stats", get(queue_stats))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_api_server(config: &Config, queue: NotificationQueue) -> Result<(), Error> {
    let app = build_router(queue.clone());

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = TcpListener::bind(&addr).await?;

    info!(address = %addr, "Notification API server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped, draining in-flight notifications");

    if tokio::time::timeout(Duration::from_secs(90), queue.wait_until_idle())
        .await
        .is_err()
    {
        warn!("Shutdown drain timed out with notifications still in flight");
    }

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

async fn send_email(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EmailNotificationRequest>,
) -> Response {
    if let Err(e) = validate_email(&request.payload.to) {
        return validation_error(e);
    }

    let id = submit(
        &state.queue,
        ChannelPayload::Email(request.payload),
        request.priority,
    )
    .await;

    (StatusCode::ACCEPTED, Json(EnqueueResponse::queued(id))).into_response()
}

async fn send_whatsapp(
    State(state): State<Arc<AppState>>,
    Json(request): Json<WhatsappNotificationRequest>,
) -> Response {
    if let Err(e) = validate_phone(&request.payload.to) {
        return validation_error(e);
    }

    let id = submit(
        &state.queue,
        ChannelPayload::Whatsapp(request.payload),
        request.priority,
    )
    .await;

    (StatusCode::ACCEPTED, Json(EnqueueResponse::queued(id))).into_response()
}

async fn send_bulk(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BulkNotificationRequest>,
) -> Response {
    let mut items = Vec::with_capacity(request.notifications.len());

    for item in request.notifications {
        let validated = match &item.channel {
            ChannelPayload::Email(payload) => validate_email(&payload.to),
            ChannelPayload::Whatsapp(payload) => validate_phone(&payload.to),
        };

        if let Err(e) = validated {
            return validation_error(e);
        }

        items.push((item.channel, item.priority));
    }

    let ids = state.queue.send_bulk(items, request.priority).await;

    (
        StatusCode::ACCEPTED,
        Json(BulkEnqueueResponse {
            success: true,
            notification_ids: ids,
        }),
    )
        .into_response()
}

async fn notification_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.queue.get_status(&id).await {
        Some(status) => (
            StatusCode::OK,
            Json(StatusResponse {
                success: true,
                status,
            }),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
                "Notification not found",
                format!("No notification with id '{}'", id),
            )),
        )
            .into_response(),
    }
}

async fn queue_stats(State(state): State<Arc<AppState>>) -> Response {
    let stats = state.queue.get_queue_stats().await;

    (
        StatusCode::OK,
        Json(StatsResponse {
            success: true,
            stats,
        }),
    )
        .into_response()
}

async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let health = HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        queue: state.queue.get_queue_stats().await,
    };

    (StatusCode::OK, Json(health)).into_response()
}

async fn submit(queue: &NotificationQueue, channel: ChannelPayload, priority: Priority) -> String {
    if priority >= Priority::High {
        queue.enqueue_priority(channel, priority).await
    } else {
        queue.enqueue(channel, priority).await
    }
}

fn validation_error(error: Error) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(error.to_string(), "Validation failed")),
    )
        .into_response()
}
