//! The single "currently sending" marker shared by every send action.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shared::domain::ContactId;

#[derive(Clone, Default)]
pub struct SendSlot {
    current: Arc<Mutex<Option<ContactId>>>,
}

impl SendSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<ContactId>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> Option<ContactId> {
        self.lock().clone()
    }

    pub fn is_sending(&self, contact_id: &ContactId) -> bool {
        self.lock().as_ref() == Some(contact_id)
    }

    /// Claims the slot for `contact_id`, or returns the id already holding it.
    pub fn try_claim(&self, contact_id: ContactId) -> Result<SlotGuard, ContactId> {
        let mut current = self.lock();
        if let Some(holder) = current.as_ref() {
            return Err(holder.clone());
        }
        *current = Some(contact_id.clone());
        Ok(SlotGuard {
            slot: self.clone(),
            contact_id,
        })
    }
}

/// Frees the slot when dropped.
pub struct SlotGuard {
    slot: SendSlot,
    contact_id: ContactId,
}

impl SlotGuard {
    pub fn contact_id(&self) -> &ContactId {
        &self.contact_id
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let mut current = self.slot.lock();
        if current.as_ref() == Some(&self.contact_id) {
            *current = None;
        }
    }
}
