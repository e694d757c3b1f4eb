use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use shared::domain::Contact;
use thiserror::Error;
use tracing::info;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntroEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl IntroEmail {
    pub fn for_contact(from: &str, contact: &Contact, company_name: Option<&str>) -> Self {
        let subject = match company_name {
            Some(company) => format!("Introduction for {} ({company})", contact.name),
            None => format!("Introduction for {}", contact.name),
        };
        let company_line = match company_name {
            Some(company) => format!(" and the {company} team"),
            None => String::new(),
        };
        let body = format!(
            "Hello {},\n\nWe would like to introduce ourselves to you{company_line} and find a time to talk.\n\nBest regards,\n{from}\n",
            contact.name
        );
        Self {
            from: from.to_string(),
            to: contact.email.clone(),
            subject,
            body,
        }
    }
}

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("relay rejected the message with status {0}")]
    Rejected(u16),
    #[error("relay unreachable: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn deliver(&self, email: &IntroEmail) -> Result<(), MailerError>;
}

/// Records intros in the log instead of sending them.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn deliver(&self, email: &IntroEmail) -> Result<(), MailerError> {
        info!(to = %email.to, subject = %email.subject, "intro email recorded");
        Ok(())
    }
}

/// Hands intros to an HTTP mail relay as JSON.
pub struct WebhookMailer {
    http: Client,
    url: Url,
}

impl WebhookMailer {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, MailerError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MailerError::Transport(e.to_string()))?;
        Ok(Self { http, url })
    }
}

#[async_trait]
impl Mailer for WebhookMailer {
    async fn deliver(&self, email: &IntroEmail) -> Result<(), MailerError> {
        let response = self
            .http
            .post(self.url.clone())
            .json(email)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MailerError::Transport("request timed out".to_string())
                } else {
                    MailerError::Transport(e.without_url().to_string())
                }
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(MailerError::Rejected(status.as_u16()));
        }
        info!(to = %email.to, relay = %self.url, "intro email handed to relay");
        Ok(())
    }
}
