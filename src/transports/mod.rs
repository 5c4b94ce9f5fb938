pub mod email;
pub mod whatsapp;

use anyhow::{Error, Result};
use async_trait::async_trait;

/// Provider acknowledgement for a successful send.
#[derive(Debug, Clone)]
pub struct DeliveryAck {
    pub provider_id: String,
}

/// Capability interface implemented once per delivery channel. The queue
/// holds one trait object per channel and dispatches on the payload variant.
#[async_trait]
pub trait Transport<P>: Send + Sync {
    async fn send(&self, payload: &P) -> Result<DeliveryAck, Error>;
}
