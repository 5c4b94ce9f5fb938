use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    models::notification::EmailPayload,
    transports::{DeliveryAck, Transport},
};

struct EmailTemplate {
    subject: &'static str,
    body: &'static str,
}

#[derive(Debug, Serialize)]
struct ProviderEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

pub struct EmailTransport {
    http_client: Client,
    api_url: String,
    api_key: String,
    from_address: String,
    simulate: bool,
    templates: HashMap<&'static str, EmailTemplate>,
}

impl EmailTransport {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|_| anyhow!("Failed to create HTTP client"))?;

        info!(
            from = %config.email_from,
            simulate = config.simulate_delivery,
            "Email transport initialized"
        );

        Ok(Self {
            http_client,
            api_url: config.email_api_url.clone(),
            api_key: config.email_api_key.clone(),
            from_address: config.email_from.clone(),
            simulate: config.simulate_delivery,
            templates: builtin_templates(),
        })
    }

    fn render(&self, payload: &EmailPayload) -> Result<(String, String), Error> {
        let template = self
            .templates
            .get(payload.template.as_str())
            .ok_or_else(|| anyhow!("Unknown email template '{}'", payload.template))?;

        let subject = if payload.subject.is_empty() {
            replace_variables(template.subject, &payload.data)?
        } else {
            replace_variables(&payload.subject, &payload.data)?
        };
        let body = replace_variables(template.body, &payload.data)?;

        debug!(
            template = %payload.template,
            variable_count = payload.data.len(),
            "Email template rendered"
        );

        Ok((subject, body))
    }
}

#[async_trait]
impl Transport<EmailPayload> for EmailTransport {
    async fn send(&self, payload: &EmailPayload) -> Result<DeliveryAck, Error> {
        let (subject, body) = self.render(payload)?;

        if self.simulate {
            info!(
                to = %payload.to,
                subject = %subject,
                "Simulated email delivery"
            );
            return Ok(DeliveryAck {
                provider_id: format!("sim_email_{}", Utc::now().timestamp_millis()),
            });
        }

        let request = ProviderEmailRequest {
            from: &self.from_address,
            to: &payload.to,
            subject: &subject,
            html: &body,
        };

        let response = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if response.status().is_success() {
            let provider_id = response
                .headers()
                .get("x-message-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string();

            info!(to = %payload.to, provider_id = %provider_id, "Email sent");

            Ok(DeliveryAck { provider_id })
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            Err(anyhow!("Email provider returned {}: {}", status, error_text))
        }
    }
}

fn replace_variables(
    template: &str,
    variables: &HashMap<String, serde_json::Value>,
) -> Result<String, Error> {
    let mut result = template.to_string();

    for (key, value) in variables {
        let placeholder = format!("{{{{{}}}}}", key);

        let replacement = match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Null => String::new(),
            _ => {
                return Err(anyhow!("Unsupported variable type for key '{}'", key));
            }
        };

        result = result.replace(&placeholder, &replacement);
    }

    if result.contains("{{") && result.contains("}}") {
        let start = result.find("{{").unwrap();
        let end = result[start..].find("}}").unwrap() + start + 2;
        let missing_var = &result[start..end];

        warn!(
            missing_variable = %missing_var,
            "Email template contains unreplaced variable"
        );

        return Err(anyhow!("Missing variable in template: {}", missing_var));
    }

    Ok(result)
}

fn builtin_templates() -> HashMap<&'static str, EmailTemplate> {
    HashMap::from([
        (
            "inquiryNotification",
            EmailTemplate {
                subject: "New property inquiry from {{name}}",
                body: "<h2>New Inquiry</h2>\
                       <p><strong>Name:</strong> {{name}}</p>\
                       <p><strong>Email:</strong> {{email}}</p>\
                       <p><strong>Phone:</strong> {{phone}}</p>\
                       <p><strong>Property:</strong> {{propertyTitle}}</p>\
                       <p><strong>Message:</strong> {{message}}</p>",
            },
        ),
        (
            "inquiryConfirmation",
            EmailTemplate {
                subject: "We received your inquiry",
                body: "<p>Hi {{name}},</p>\
                       <p>Thank you for your interest in {{propertyTitle}}. \
                       Our team will get back to you within one business day.</p>\
                       <p>Gentle Space Realty</p>",
            },
        ),
        (
            "welcomeEmail",
            EmailTemplate {
                subject: "Welcome to Gentle Space Realty",
                body: "<p>Hi {{name}},</p>\
                       <p>Welcome aboard. Browse our latest office space listings \
                       and reach out any time.</p>\
                       <p>Gentle Space Realty</p>",
            },
        ),
    ])
}
