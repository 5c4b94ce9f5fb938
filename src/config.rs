use anyhow::{Error, Result, anyhow};
use dotenvy::dotenv;
use serde::Deserialize;

use crate::models::retry::RetryConfig;

fn default_server_port() -> u16 {
    8080
}

fn default_simulate_delivery() -> bool {
    true
}

fn default_max_delivery_attempts() -> u32 {
    3
}

fn default_retry_delays_ms() -> Vec<u64> {
    vec![5_000, 15_000, 60_000]
}

fn default_status_retention_secs() -> u64 {
    86_400
}

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    #[serde(default = "default_server_port")]
    pub server_port: u16,

    #[serde(default)]
    pub email_api_url: String,
    #[serde(default)]
    pub email_api_key: String,
    #[serde(default)]
    pub email_from: String,

    #[serde(default)]
    pub whatsapp_api_url: String,
    #[serde(default)]
    pub whatsapp_api_key: String,

    /// When true, transports log and succeed instead of calling providers.
    #[serde(default = "default_simulate_delivery")]
    pub simulate_delivery: bool,

    #[serde(default = "default_max_delivery_attempts")]
    pub max_delivery_attempts: u32,

    #[serde(default = "default_retry_delays_ms")]
    pub retry_delays_ms: Vec<u64>,

    #[serde(default = "default_status_retention_secs")]
    pub status_retention_secs: u64,
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let config = envy::from_env::<Self>()
            .map_err(|_| anyhow!("Invalid or missing environmental variable"))?;

        if !config.simulate_delivery
            && (config.email_api_url.is_empty() || config.whatsapp_api_url.is_empty())
        {
            return Err(anyhow!(
                "Provider URLs are required when simulate_delivery is disabled"
            ));
        }

        Ok(config)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_delivery_attempts,
            delays_ms: self.retry_delays_ms.clone(),
        }
    }
}
