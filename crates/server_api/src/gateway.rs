//! Reads contacts and their companies out of the contact store.
//!
//! The primary listing is all-or-nothing. Company lookups are best effort:
//! any failure is logged and the company is reported as absent.

use std::{sync::Arc, time::Duration};

use shared::domain::{Company, CompanyKey, Contact};
use storage::{ContactStore, CONTACT_LIST_CAP};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("contact listing failed: {0}")]
    Fetch(String),
    #[error("contact listing timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Clone)]
pub struct ContactGateway {
    store: Arc<dyn ContactStore>,
    timeout: Duration,
}

impl ContactGateway {
    pub fn new(store: Arc<dyn ContactStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub fn store(&self) -> &Arc<dyn ContactStore> {
        &self.store
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// At most [`CONTACT_LIST_CAP`] contacts, by display name ascending.
    pub async fn list_contacts(&self) -> Result<Vec<Contact>, GatewayError> {
        let listed = tokio::time::timeout(self.timeout, self.store.list_contacts(CONTACT_LIST_CAP))
            .await;
        let mut contacts = match listed {
            Ok(Ok(contacts)) => contacts,
            Ok(Err(err)) => {
                error!(error = %format!("{err:#}"), "contact store listing failed");
                return Err(GatewayError::Fetch(format!("{err:#}")));
            }
            Err(_) => {
                error!(timeout_ms = self.timeout.as_millis() as u64, "contact store listing timed out");
                return Err(GatewayError::Timeout(self.timeout));
            }
        };

        // Stable, so equal names keep the store's insertion order.
        contacts.sort_by(|a, b| a.name.cmp(&b.name));
        contacts.truncate(CONTACT_LIST_CAP as usize);
        Ok(contacts)
    }

    pub async fn resolve_company(&self, key: &CompanyKey) -> Option<Company> {
        match tokio::time::timeout(self.timeout, self.store.company_by_key(key)).await {
            Ok(Ok(Some(company))) => Some(company),
            Ok(Ok(None)) => {
                warn!(rut_empresa = %key, "contact references a missing company");
                None
            }
            Ok(Err(err)) => {
                warn!(rut_empresa = %key, error = %format!("{err:#}"), "company lookup failed");
                None
            }
            Err(_) => {
                warn!(
                    rut_empresa = %key,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "company lookup timed out"
                );
                None
            }
        }
    }
}
