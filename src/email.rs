//! Outbound mail. The workflow only sees the [`Notifier`] trait; delivery is best-effort and
//! runs detached from the request that triggered it.

use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use tracing::{error, info};

use crate::config::EmailSettings;
use crate::errors::AppError;

pub trait Notifier: Send + Sync {
    fn send<'a>(
        &'a self,
        recipient: &'a str,
        subject: &'a str,
        body: &'a str,
    ) -> BoxFuture<'a, Result<(), AppError>>;
}

pub type SharedNotifier = Arc<dyn Notifier>;

#[derive(Clone, Debug)]
pub struct EmailClient {
    http_client: Client,
    base_url: String,
    sender: String,
    authorization_token: Secret<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Contact<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailRequest<'a> {
    sender: Contact<'a>,
    to: Vec<Contact<'a>>,
    subject: &'a str,
    text_content: &'a str,
}

impl EmailClient {
    pub fn new(settings: &EmailSettings) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http_client,
            base_url: settings.base_url.clone(),
            sender: settings.sender.clone(),
            authorization_token: settings.token.clone(),
        })
    }

    #[tracing::instrument(name = "send_email", skip(self, body), fields(recipient = %recipient, subject = %subject))]
    pub async fn send_email(&self, recipient: &str, subject: &str, body: &str) -> Result<(), AppError> {
        let url = format!("{}/v3/smtp/email", self.base_url);

        let request_body = SendEmailRequest {
            sender: Contact {
                email: &self.sender,
                name: Some("GospelTube"),
            },
            to: vec![Contact {
                email: recipient,
                name: None,
            }],
            subject,
            text_content: body,
        };

        let response = self
            .http_client
            .post(&url)
            .header("api-key", self.authorization_token.expose_secret())
            .header("Accept", "application/json")
            .json(&request_body)
            .send()
            .await?;

        response.error_for_status()?;
        info!("Email accepted by mail API");
        Ok(())
    }
}

impl Notifier for EmailClient {
    fn send<'a>(
        &'a self,
        recipient: &'a str,
        subject: &'a str,
        body: &'a str,
    ) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(self.send_email(recipient, subject, body))
    }
}

/// Used when no mail API is configured: messages are only logged.
#[derive(Clone, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send<'a>(
        &'a self,
        recipient: &'a str,
        subject: &'a str,
        _body: &'a str,
    ) -> BoxFuture<'a, Result<(), AppError>> {
        Box::pin(async move {
            info!(recipient = %recipient, subject = %subject, "Mail delivery disabled, message dropped");
            Ok(())
        })
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Sends every message on a detached task. Failures are logged per recipient and never
/// reach the caller.
pub fn dispatch(notifier: SharedNotifier, messages: Vec<Message>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        for message in messages {
            if let Err(err) = notifier
                .send(&message.recipient, &message.subject, &message.body)
                .await
            {
                error!(
                    recipient = %message.recipient,
                    subject = %message.subject,
                    error = %err,
                    "Notification email failed"
                );
            }
        }
    })
}
