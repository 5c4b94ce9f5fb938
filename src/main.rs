use std::sync::Arc;
use std::time::Duration;

use anyhow::{Error, Result};
use notification_service::{
    api::run_api_server,
    config::Config,
    queue::NotificationQueue,
    transports::{email::EmailTransport, whatsapp::WhatsappTransport},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load()?;

    let email = Arc::new(EmailTransport::new(&config)?);
    let whatsapp = Arc::new(WhatsappTransport::new(&config)?);
    let queue = NotificationQueue::new(email, whatsapp, config.retry_config());

    let retention = Duration::from_secs(config.status_retention_secs);
    let purge_queue = queue.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3_600));
        interval.tick().await;
        loop {
            interval.tick().await;
            purge_queue.purge_completed(retention).await;
        }
    });

    run_api_server(&config, queue).await
}
