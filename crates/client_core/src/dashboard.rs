//! Client-side state of the dashboard and the send coordinator.
//!
//! The contact list is only ever replaced wholesale by a refresh. A
//! successful send never edits rows locally; it triggers a refresh so the
//! sent flag and timestamp come from the backend.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use shared::domain::{ContactId, ContactView};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::{slot::SendSlot, ClientError, ContactsBackend, GENERIC_SEND_FAILURE};

/// Shown when the contact list cannot be loaded.
pub const FETCH_FAILURE: &str = "Error fetching contacts";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// No refresh has completed yet.
    Loading,
    Ready,
    /// The first refresh failed; there is nothing to show.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    IntroSent { contact_id: ContactId },
    SendFailed { contact_id: ContactId, message: String },
    SendBusy { in_flight: ContactId },
    FetchFailed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// Another send holds the slot; nothing was requested.
    Busy { in_flight: ContactId },
    Failed { message: String },
}

/// What the presentation layer reads to draw one frame.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub phase: LoadPhase,
    pub contacts: Arc<Vec<ContactView>>,
    pub sending: Option<ContactId>,
    pub notice: Option<Notice>,
}

struct DashboardState {
    phase: LoadPhase,
    contacts: Arc<Vec<ContactView>>,
    notice: Option<Notice>,
    applied_refresh: u64,
}

pub struct Dashboard<B> {
    backend: B,
    slot: SendSlot,
    state: RwLock<DashboardState>,
    refresh_seq: AtomicU64,
}

impl<B: ContactsBackend> Dashboard<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            slot: SendSlot::new(),
            state: RwLock::new(DashboardState {
                phase: LoadPhase::Loading,
                contacts: Arc::new(Vec::new()),
                notice: None,
                applied_refresh: 0,
            }),
            refresh_seq: AtomicU64::new(0),
        }
    }

    pub fn slot(&self) -> &SendSlot {
        &self.slot
    }

    pub async fn view(&self) -> DashboardView {
        let state = self.state.read().await;
        DashboardView {
            phase: state.phase,
            contacts: state.contacts.clone(),
            sending: self.slot.current(),
            notice: state.notice.clone(),
        }
    }

    /// Replaces the contact list with a fresh copy from the backend.
    ///
    /// On failure the previous list stays in place. When refreshes overlap,
    /// a result (or failure) older than one already applied is discarded.
    pub async fn refresh(&self) -> Result<usize, ClientError> {
        let ticket = self.refresh_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let fetched = self.backend.fetch_contacts().await;

        let mut state = self.state.write().await;
        match fetched {
            Ok(contacts) => {
                let count = contacts.len();
                if ticket > state.applied_refresh {
                    state.applied_refresh = ticket;
                    state.contacts = Arc::new(contacts);
                    state.phase = LoadPhase::Ready;
                    if matches!(state.notice, Some(Notice::FetchFailed { .. })) {
                        state.notice = None;
                    }
                } else {
                    info!(ticket, "discarding stale contact refresh");
                }
                Ok(count)
            }
            Err(err) => {
                warn!(ticket, error = %err, "contact refresh failed");
                if ticket > state.applied_refresh {
                    if state.phase == LoadPhase::Loading {
                        state.phase = LoadPhase::Failed;
                    }
                    state.notice = Some(Notice::FetchFailed {
                        message: FETCH_FAILURE.to_string(),
                    });
                }
                Err(err)
            }
        }
    }

    /// Sends the intro for one contact if no other send is in flight.
    pub async fn send_intro(&self, contact_id: &ContactId) -> SendOutcome {
        let guard = match self.slot.try_claim(contact_id.clone()) {
            Ok(guard) => guard,
            Err(in_flight) => {
                info!(%contact_id, %in_flight, "send ignored while another is in flight");
                self.state.write().await.notice = Some(Notice::SendBusy {
                    in_flight: in_flight.clone(),
                });
                return SendOutcome::Busy { in_flight };
            }
        };

        let result = self.backend.send_intro(contact_id).await;
        drop(guard);

        match result {
            Ok(()) => {
                info!(%contact_id, "intro sent");
                self.state.write().await.notice = Some(Notice::IntroSent {
                    contact_id: contact_id.clone(),
                });
                // A failed refresh replaces the notice with its own.
                let _ = self.refresh().await;
                SendOutcome::Sent
            }
            Err(err) => {
                warn!(%contact_id, error = %err, "intro send failed");
                let message = err
                    .backend_reason()
                    .map(str::to_string)
                    .unwrap_or_else(|| GENERIC_SEND_FAILURE.to_string());
                self.state.write().await.notice = Some(Notice::SendFailed {
                    contact_id: contact_id.clone(),
                    message: message.clone(),
                });
                SendOutcome::Failed { message }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/dashboard_tests.rs"]
mod tests;
