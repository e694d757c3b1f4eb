use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use shared::{
    domain::{ContactId, ContactView},
    error::{ApiError, ErrorCode},
};
use storage::ContactStore;
use tracing::{error, info};

pub mod aggregate;
pub mod gateway;
pub mod mailer;

use aggregate::{aggregate, CompanyResolver};
use gateway::{ContactGateway, GatewayError};
use mailer::{IntroEmail, Mailer};

#[derive(Clone)]
pub struct ApiContext {
    pub gateway: ContactGateway,
    pub mailer: Arc<dyn Mailer>,
    pub mailer_timeout: Duration,
    pub sender_address: String,
}

impl ApiContext {
    pub fn new(
        store: Arc<dyn ContactStore>,
        store_timeout: Duration,
        mailer: Arc<dyn Mailer>,
        mailer_timeout: Duration,
        sender_address: impl Into<String>,
    ) -> Self {
        Self {
            gateway: ContactGateway::new(store, store_timeout),
            mailer,
            mailer_timeout,
            sender_address: sender_address.into(),
        }
    }
}

/// Lists contacts and joins each one with its company name.
pub async fn list_contacts(ctx: &ApiContext) -> Result<Vec<ContactView>, ApiError> {
    let contacts = ctx.gateway.list_contacts().await.map_err(fetch_failed)?;
    Ok(aggregate(contacts, &ctx.gateway).await)
}

/// Delivers the intro email for one contact and records it as sent.
///
/// Returns the timestamp written to the store.
pub async fn send_intro(ctx: &ApiContext, contact_id: &ContactId) -> Result<DateTime<Utc>, ApiError> {
    let store = ctx.gateway.store();
    let contact = tokio::time::timeout(ctx.gateway.timeout(), store.contact_by_id(contact_id))
        .await
        .map_err(|_| {
            error!(%contact_id, "contact lookup timed out before send");
            ApiError::new(ErrorCode::Internal, "contact lookup timed out")
        })?
        .map_err(|err| {
            error!(%contact_id, error = %format!("{err:#}"), "contact lookup failed before send");
            internal(err)
        })?
        .ok_or_else(|| ApiError::new(ErrorCode::NotFound, format!("no contact {contact_id}")))?;

    if contact.intro_sent {
        return Err(ApiError::new(
            ErrorCode::AlreadySent,
            format!("contact {contact_id} already has an intro"),
        ));
    }

    let company_name = match contact.company_ref() {
        Some(key) => ctx.gateway.company_name(key).await,
        None => None,
    };
    let email = IntroEmail::for_contact(&ctx.sender_address, &contact, company_name.as_deref());

    match tokio::time::timeout(ctx.mailer_timeout, ctx.mailer.deliver(&email)).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            error!(%contact_id, error = %err, "intro delivery failed");
            return Err(ApiError::new(ErrorCode::SendFailed, err.to_string()));
        }
        Err(_) => {
            error!(%contact_id, "intro delivery timed out");
            return Err(ApiError::new(ErrorCode::SendFailed, "mail delivery timed out"));
        }
    }

    let sent_at = Utc::now();
    let updated = tokio::time::timeout(ctx.gateway.timeout(), store.mark_intro_sent(contact_id, sent_at))
        .await
        .map_err(|_| {
            error!(%contact_id, "intro delivered but recording it as sent timed out");
            ApiError::new(ErrorCode::Internal, "recording the send timed out")
        })?
        .map_err(|err| {
            error!(
                %contact_id,
                error = %format!("{err:#}"),
                "intro delivered but the sent flag could not be recorded"
            );
            internal(err)
        })?;
    if !updated {
        return Err(ApiError::new(
            ErrorCode::NotFound,
            format!("contact {contact_id} disappeared during send"),
        ));
    }

    info!(%contact_id, %sent_at, "intro email sent");
    Ok(sent_at)
}

fn fetch_failed(err: GatewayError) -> ApiError {
    ApiError::new(ErrorCode::FetchFailed, err.to_string())
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, format!("{err:#}"))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
