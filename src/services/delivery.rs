use crate::models::EmailPayload;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when handing a payload to the mail provider
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Mail provider answered {0}, expected 202 Accepted")]
    NotAccepted(StatusCode),
}

/// Sends participant emails and operator alerts
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(&self, payload: &EmailPayload) -> Result<(), DeliveryError>;

    async fn alert(&self, note: &str) -> Result<(), DeliveryError>;
}

/// Sender identity and template for outgoing mail
#[derive(Debug, Clone)]
pub struct SendGridTemplate {
    pub from_email: String,
    pub template_id: String,
    pub support_contact: String,
    pub alert_email: String,
}

/// SendGrid v3 mail client using dynamic templates
pub struct SendGridSink {
    base_url: String,
    api_key: String,
    template: SendGridTemplate,
    client: Client,
}

impl SendGridSink {
    pub fn new(
        base_url: String,
        api_key: String,
        template: SendGridTemplate,
        timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            template,
            client,
        })
    }

    fn send_url(&self) -> String {
        format!("{}/v3/mail/send", self.base_url.trim_end_matches('/'))
    }

    async fn post(&self, body: serde_json::Value) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(self.send_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Mail provider answered {}", status);

        if status != StatusCode::ACCEPTED {
            return Err(DeliveryError::NotAccepted(status));
        }
        Ok(())
    }
}

#[async_trait]
impl DeliverySink for SendGridSink {
    async fn deliver(&self, payload: &EmailPayload) -> Result<(), DeliveryError> {
        let body = json!({
            "from": { "email": self.template.from_email },
            "personalizations": [{
                "to": [{ "email": payload.participant_email }],
                "dynamic_template_data": {
                    "name": payload.participant_name,
                    "support_info": self.template.support_contact,
                    "study": payload.study_descriptors,
                },
            }],
            "template_id": self.template.template_id,
        });

        self.post(body).await
    }

    async fn alert(&self, note: &str) -> Result<(), DeliveryError> {
        let body = json!({
            "from": { "email": self.template.from_email },
            "personalizations": [{ "to": [{ "email": self.template.alert_email }] }],
            "subject": "Result Email Error",
            "content": [{
                "type": "text/html",
                "value": format!("<p>Issue with Result Email code has occurred. {} Please check logs.</p>", note),
            }],
        });

        self.post(body).await
    }
}

/// A successfully delivered payload, as recorded for audit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub sample_id: String,
    pub email_sent: DateTime<Utc>,
}

/// Outcome of delivering a batch of payloads
#[derive(Debug, Clone, Default)]
pub struct DeliveryReport {
    pub attempted: usize,
    pub sent: Vec<AuditEntry>,
    pub failed: Vec<String>,
}

impl DeliveryReport {
    pub fn is_complete(&self) -> bool {
        self.sent.len() == self.attempted
    }

    /// Operator-facing description of a short delivery
    pub fn shortfall_note(&self) -> String {
        format!(
            "{} emails were supposed to be sent. {} were sent.",
            self.attempted,
            self.sent.len()
        )
    }
}

/// Deliver every payload; individual failures are logged and counted
pub async fn deliver_all(sink: &dyn DeliverySink, payloads: &[EmailPayload]) -> DeliveryReport {
    let mut report = DeliveryReport {
        attempted: payloads.len(),
        ..Default::default()
    };

    for payload in payloads {
        match sink.deliver(payload).await {
            Ok(()) => {
                tracing::info!("Sent study email for sample {}", payload.sample_id);
                report.sent.push(AuditEntry {
                    sample_id: payload.sample_id.clone(),
                    email_sent: Utc::now(),
                });
            }
            Err(e) => {
                tracing::error!("Failed to send email for sample {}: {}", payload.sample_id, e);
                report.failed.push(payload.sample_id.clone());
            }
        }
    }

    report
}
