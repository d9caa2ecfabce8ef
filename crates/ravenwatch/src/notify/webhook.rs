//! Microsoft Teams delivery through an incoming webhook.
//!
//! Alerts are rendered as an Adaptive Card: a title, a fact set with device,
//! status, check type and time, the message colored by status and an
//! optional subtle details block.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{AlertKind, AlertRequest, AlertSink, DeliveryError};

/// HTTP request timeout for a single delivery attempt
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const CARD_TITLE: &str = "Network Monitor Alert";

pub struct TeamsWebhook {
    client: reqwest::Client,
}

impl TeamsWebhook {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client })
    }

    /// Adaptive Card message for one alert
    pub fn card(alert: &AlertRequest) -> Value {
        let color = match alert.kind {
            AlertKind::Down => "Attention",
            AlertKind::Up => "Good",
            AlertKind::Test => "Accent",
        };
        let check_type =
            alert.check_type.map_or_else(|| "-".to_string(), |t| t.as_str().to_uppercase());

        let mut body = vec![
            json!({
                "type": "TextBlock",
                "text": CARD_TITLE,
                "weight": "Bolder",
                "size": "Large"
            }),
            json!({
                "type": "FactSet",
                "facts": [
                    { "title": "Device:", "value": alert.device },
                    { "title": "Status:", "value": alert.kind.label() },
                    { "title": "Check type:", "value": check_type },
                    { "title": "Time:", "value": alert.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string() }
                ]
            }),
            json!({
                "type": "TextBlock",
                "text": alert.message,
                "wrap": true,
                "weight": "Bolder",
                "color": color
            }),
        ];

        if let Some(details) = &alert.details {
            body.push(json!({
                "type": "TextBlock",
                "text": details,
                "wrap": true,
                "isSubtle": true
            }));
        }

        json!({
            "type": "message",
            "attachments": [{
                "contentType": "application/vnd.microsoft.card.adaptive",
                "content": {
                    "$schema": "http://adaptivecards.io/schemas/adaptive-card.json",
                    "type": "AdaptiveCard",
                    "version": "1.4",
                    "body": body
                }
            }]
        })
    }
}

#[async_trait]
impl AlertSink for TeamsWebhook {
    async fn send(&self, webhook_url: &str, alert: &AlertRequest) -> Result<(), DeliveryError> {
        let response = self.client.post(webhook_url).json(&Self::card(alert)).send().await?;

        if !response.status().is_success() {
            return Err(DeliveryError::HttpStatus(response.status().as_u16()));
        }

        tracing::info!(device = %alert.device, status = alert.kind.label(), "Teams notification sent");
        Ok(())
    }
}
