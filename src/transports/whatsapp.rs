use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    config::Config,
    models::notification::WhatsappPayload,
    transports::{DeliveryAck, Transport},
};

#[derive(Debug, Serialize)]
struct ProviderTextBody<'a> {
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct ProviderMessageRequest<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    message_type: &'a str,
    text: ProviderTextBody<'a>,
}

pub struct WhatsappTransport {
    http_client: Client,
    api_url: String,
    api_key: String,
    simulate: bool,
}

impl WhatsappTransport {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|_| anyhow!("Failed to create HTTP client"))?;

        info!(
            simulate = config.simulate_delivery,
            "WhatsApp transport initialized"
        );

        Ok(Self {
            http_client,
            api_url: config.whatsapp_api_url.clone(),
            api_key: config.whatsapp_api_key.clone(),
            simulate: config.simulate_delivery,
        })
    }
}

#[async_trait]
impl Transport<WhatsappPayload> for WhatsappTransport {
    async fn send(&self, payload: &WhatsappPayload) -> Result<DeliveryAck, Error> {
        let recipient = normalize_phone(&payload.to)?;

        debug!(to = %recipient, message_type = %payload.message_type, "Dispatching WhatsApp message");

        if self.simulate {
            info!(to = %recipient, "Simulated WhatsApp delivery");
            return Ok(DeliveryAck {
                provider_id: format!("sim_whatsapp_{}", Utc::now().timestamp_millis()),
            });
        }

        let request = ProviderMessageRequest {
            messaging_product: "whatsapp",
            to: &recipient,
            message_type: &payload.message_type,
            text: ProviderTextBody {
                body: &payload.message,
            },
        };

        let url = format!("{}/messages", self.api_url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if response.status().is_success() {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let provider_id = body["messages"][0]["id"]
                .as_str()
                .unwrap_or("unknown")
                .to_string();

            info!(to = %recipient, provider_id = %provider_id, "WhatsApp message sent");

            Ok(DeliveryAck { provider_id })
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            Err(anyhow!(
                "WhatsApp provider returned {}: {}",
                status,
                error_text
            ))
        }
    }
}

/// Normalizes a phone number to `+<country><number>`. Ten-digit numbers are
/// assumed to be Indian mobiles and get a 91 prefix.
pub fn normalize_phone(number: &str) -> Result<String, Error> {
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();

    if digits.len() < 10 {
        return Err(anyhow!("Phone number too short: '{}'", number));
    }

    if digits.len() > 15 {
        return Err(anyhow!("Phone number too long: '{}'", number));
    }

    if digits.len() == 10 {
        Ok(format!("+91{}", digits))
    } else {
        Ok(format!("+{}", digits))
    }
}
