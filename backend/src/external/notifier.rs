//! Alert delivery by email and push notification
//!
//! Both channels are plain HTTP APIs. A channel whose endpoint is not
//! configured is skipped. Delivery never fails the caller: problems are
//! logged and reported back as warnings.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

use crate::config::NotificationsConfig;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned status {0}")]
    Status(u16),
}

#[derive(Clone)]
struct EmailChannel {
    endpoint: String,
    api_key: String,
    from: String,
}

#[derive(Clone)]
struct PushChannel {
    endpoint: String,
    server_key: String,
}

/// Email request body
#[derive(Serialize)]
struct EmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// FCM HTTP request body
#[derive(Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    notification: PushNotification<'a>,
}

#[derive(Serialize)]
struct PushNotification<'a> {
    title: &'a str,
    body: &'a str,
}

/// Who to tell about an alert and what to say
#[derive(Debug, Clone)]
pub struct AlertNotice<'a> {
    pub email: &'a str,
    pub push_token: Option<&'a str>,
    pub farm_name: &'a str,
    pub message: &'a str,
}

/// Outcome of delivering one alert
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub email_sent: bool,
    pub push_sent: bool,
    pub warnings: Vec<String>,
}

/// Email and push sender
#[derive(Clone)]
pub struct Notifier {
    client: Client,
    email: Option<EmailChannel>,
    push: Option<PushChannel>,
}

impl Notifier {
    pub fn new(config: &NotificationsConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let email = (!config.email_endpoint.is_empty()).then(|| EmailChannel {
            endpoint: config.email_endpoint.clone(),
            api_key: config.email_api_key.clone(),
            from: config.from_email.clone(),
        });
        let push = (!config.push_endpoint.is_empty()).then(|| PushChannel {
            endpoint: config.push_endpoint.clone(),
            server_key: config.push_server_key.clone(),
        });

        if email.is_none() {
            tracing::info!("Email endpoint not configured, alert emails disabled");
        }
        if push.is_none() {
            tracing::info!("Push endpoint not configured, push notifications disabled");
        }

        Ok(Self { client, email, push })
    }

    /// Send an email; `Ok(false)` when email is not configured
    pub async fn send_email(&self, to: &str, subject: &str, text: &str) -> Result<bool, NotifyError> {
        let Some(channel) = &self.email else {
            return Ok(false);
        };

        let response = self
            .client
            .post(&channel.endpoint)
            .bearer_auth(&channel.api_key)
            .json(&EmailRequest {
                from: &channel.from,
                to,
                subject,
                text,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status().as_u16()));
        }
        Ok(true)
    }

    /// Send a push notification; `Ok(false)` when push is not configured
    pub async fn send_push(&self, token: &str, title: &str, body: &str) -> Result<bool, NotifyError> {
        let Some(channel) = &self.push else {
            return Ok(false);
        };

        let response = self
            .client
            .post(&channel.endpoint)
            .header("Authorization", format!("key={}", channel.server_key))
            .json(&PushRequest {
                to: token,
                notification: PushNotification { title, body },
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status().as_u16()));
        }
        Ok(true)
    }

    /// Email the farm owner and, when they have a device token, push to it
    pub async fn notify_alert(&self, notice: &AlertNotice<'_>) -> DeliveryReport {
        let subject = format!("Weather Alert for {}", notice.farm_name);
        let mut report = DeliveryReport::default();

        match self.send_email(notice.email, &subject, notice.message).await {
            Ok(sent) => report.email_sent = sent,
            Err(e) => {
                tracing::warn!("Alert email to {} failed: {}", notice.email, e);
                report.warnings.push(format!("Alert email could not be sent: {}", e));
            }
        }

        if let Some(token) = notice.push_token.filter(|t| !t.is_empty()) {
            match self.send_push(token, &subject, notice.message).await {
                Ok(sent) => report.push_sent = sent,
                Err(e) => {
                    tracing::warn!("Alert push notification failed: {}", e);
                    report
                        .warnings
                        .push(format!("Push notification could not be sent: {}", e));
                }
            }
        }

        report
    }
}
