//! Welcome notification delivery.
//!
//! Supports three modes:
//! 1. POST to a webhook URL (for DIY email delivery)
//! 2. Send via Resend API (when an API key is configured)
//! 3. Disabled (no email sent, log only)
//!
//! Sends are attempted once. A failed welcome is reported to the caller, which
//! logs it; the buyer's entitlement is already committed by then.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// First-purchase welcome for a new buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WelcomeMessage {
    pub to_email: String,
    pub full_name: String,
}

impl WelcomeMessage {
    pub fn subject(&self) -> String {
        "Welcome aboard!".to_string()
    }

    pub fn text(&self) -> String {
        format!(
            "Hi {},\n\nThanks for your purchase. Your course is now available in your account.\n\nHappy learning!",
            self.display_name()
        )
    }

    fn display_name(&self) -> &str {
        let name = self.full_name.trim();
        if name.is_empty() { "there" } else { name }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailSendResult {
    /// Email was sent via Resend
    Sent,
    /// Data was POSTed to the configured webhook URL
    WebhookCalled,
    /// Email delivery is disabled
    Disabled,
}

/// Notification dispatcher used by the reconciler.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_welcome(&self, message: &WelcomeMessage) -> Result<EmailSendResult>;
}

#[derive(Debug, Clone)]
enum Delivery {
    Webhook { url: String },
    Resend { api_key: String },
    Disabled,
}

/// Payload POSTed when a webhook URL is configured.
#[derive(Debug, Serialize)]
pub struct WelcomeWebhookPayload<'a> {
    pub event: &'static str,
    pub email: &'a str,
    pub full_name: &'a str,
    pub subject: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
struct ResendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ResendEmailResponse {
    #[allow(dead_code)]
    id: String,
}

#[derive(Clone)]
pub struct EmailService {
    delivery: Delivery,
    from_email: String,
    http_client: Client,
}

impl EmailService {
    /// Resolution order: webhook URL, then Resend API key, otherwise disabled.
    pub fn new(
        resend_api_key: Option<String>,
        webhook_url: Option<String>,
        from_email: String,
        timeout: Duration,
    ) -> Result<Self> {
        let delivery = match (webhook_url, resend_api_key) {
            (Some(url), _) => Delivery::Webhook { url },
            (None, Some(api_key)) => Delivery::Resend { api_key },
            (None, None) => Delivery::Disabled,
        };

        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            delivery,
            from_email,
            http_client,
        })
    }

    /// An email service that only logs. Used when nothing is configured.
    pub fn disabled() -> Self {
        Self {
            delivery: Delivery::Disabled,
            from_email: String::new(),
            http_client: Client::new(),
        }
    }

    pub fn mode(&self) -> &'static str {
        match self.delivery {
            Delivery::Webhook { .. } => "webhook",
            Delivery::Resend { .. } => "resend",
            Delivery::Disabled => "disabled",
        }
    }

    async fn send_via_resend(&self, api_key: &str, message: &WelcomeMessage) -> Result<()> {
        let request = ResendEmailRequest {
            from: &self.from_email,
            to: vec![message.to_email.as_str()],
            subject: message.subject(),
            text: message.text(),
        };

        let response = self
            .http_client
            .post(RESEND_API_URL)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Notification(format!("Resend request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Notification(format!(
                "Resend API error: {} - {}",
                status, body
            )));
        }

        let _: ResendEmailResponse = response
            .json()
            .await
            .map_err(|e| AppError::Notification(format!("Resend response error: {}", e)))?;
        Ok(())
    }

    async fn call_webhook(&self, url: &str, message: &WelcomeMessage) -> Result<()> {
        let payload = WelcomeWebhookPayload {
            event: "welcome",
            email: &message.to_email,
            full_name: &message.full_name,
            subject: message.subject(),
            text: message.text(),
        };

        let response = self
            .http_client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Notification(format!("Email webhook failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Notification(format!(
                "Email webhook returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for EmailService {
    async fn send_welcome(&self, message: &WelcomeMessage) -> Result<EmailSendResult> {
        match &self.delivery {
            Delivery::Disabled => {
                tracing::info!(
                    to = %message.to_email,
                    "Email disabled, skipping welcome email"
                );
                Ok(EmailSendResult::Disabled)
            }
            Delivery::Webhook { url } => {
                self.call_webhook(url, message).await?;
                tracing::info!(to = %message.to_email, "Welcome posted to email webhook");
                Ok(EmailSendResult::WebhookCalled)
            }
            Delivery::Resend { api_key } => {
                self.send_via_resend(api_key, message).await?;
                tracing::info!(to = %message.to_email, "Welcome email sent via Resend");
                Ok(EmailSendResult::Sent)
            }
        }
    }
}
