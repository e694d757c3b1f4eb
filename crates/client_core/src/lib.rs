use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use shared::{
    domain::{ContactId, ContactView},
    error::ErrorBody,
    protocol::{ListContactsResponse, SendIntroResponse},
};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub mod dashboard;
pub mod slot;

pub use dashboard::{Dashboard, DashboardView, LoadPhase, Notice, SendOutcome};
pub use slot::{SendSlot, SlotGuard};

/// Shown when a send fails without a reason from the backend.
pub const GENERIC_SEND_FAILURE: &str = "Error sending email";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Error status with an `{"error": ..}` body.
    #[error("server answered {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("server answered {status} with an unexpected body: {body}")]
    UnexpectedBody { status: StatusCode, body: String },
    #[error("send rejected: {0}")]
    Rejected(String),
    #[error("server url cannot carry a path: {0}")]
    BadServerUrl(String),
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// The reason the backend gave for refusing a send, if it gave one.
    pub fn backend_reason(&self) -> Option<&str> {
        match self {
            ClientError::Rejected(reason) => Some(reason),
            ClientError::Status { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Remote operations the dashboard relies on.
#[async_trait]
pub trait ContactsBackend: Send + Sync {
    async fn fetch_contacts(&self) -> Result<Vec<ContactView>, ClientError>;
    async fn send_intro(&self, contact_id: &ContactId) -> Result<(), ClientError>;
}

/// HTTP client for the contact service.
#[derive(Clone)]
pub struct DashboardClient {
    http: Client,
    base_url: Url,
}

impl DashboardClient {
    /// Every request made through the client gives up after `timeout`.
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = Url::parse(server_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::BadServerUrl(server_url.to_string()));
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::BadServerUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn fetch_contacts(&self) -> Result<Vec<ContactView>, ClientError> {
        let url = self.endpoint(&["api", "contacts"])?;
        let response = self.http.get(url).send().await?;
        let response = ensure_success(response).await?;
        let envelope: ListContactsResponse = response.json().await?;
        debug!(count = envelope.count, "fetched contacts");
        Ok(envelope.into_views())
    }

    pub async fn send_intro(&self, contact_id: &ContactId) -> Result<(), ClientError> {
        let url = self.endpoint(&["api", "contacts", contact_id.as_str(), "send-intro"])?;
        let response = self.http.post(url).send().await?;
        let status = response.status();
        let raw = response.text().await?;

        match serde_json::from_str::<SendIntroResponse>(&raw) {
            Ok(body) if body.success && status.is_success() => Ok(()),
            Ok(body) => Err(ClientError::Rejected(
                body.error.unwrap_or_else(|| GENERIC_SEND_FAILURE.to_string()),
            )),
            Err(_) if status.is_success() => Ok(()),
            Err(_) => Err(status_error(status, &raw)),
        }
    }
}

#[async_trait]
impl ContactsBackend for DashboardClient {
    async fn fetch_contacts(&self) -> Result<Vec<ContactView>, ClientError> {
        DashboardClient::fetch_contacts(self).await
    }

    async fn send_intro(&self, contact_id: &ContactId) -> Result<(), ClientError> {
        DashboardClient::send_intro(self, contact_id).await
    }
}

async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let raw = response.text().await.unwrap_or_default();
    Err(status_error(status, &raw))
}

fn status_error(status: StatusCode, raw: &str) -> ClientError {
    match serde_json::from_str::<ErrorBody>(raw) {
        Ok(body) => ClientError::Status {
            status,
            message: body.error,
        },
        Err(_) => ClientError::UnexpectedBody {
            status,
            body: raw.trim().to_string(),
        },
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
