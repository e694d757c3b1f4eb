use serde::{Deserialize, Serialize};

use crate::domain::{Contact, ContactView};

pub const CONTACTS_ROUTE: &str = "/api/contacts";
pub const SEND_INTRO_ROUTE: &str = "/api/contacts/:contact_id/send-intro";

/// One entry of the list envelope.
///
/// `razon_social` is omitted for contacts without a company reference and
/// is `null` when the reference could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    #[serde(flatten)]
    pub contact: Contact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub razon_social: Option<Option<String>>,
}

impl From<ContactView> for ContactRecord {
    fn from(view: ContactView) -> Self {
        let razon_social = view
            .contact
            .company_ref()
            .is_some()
            .then_some(view.company_name);
        Self {
            contact: view.contact,
            razon_social,
        }
    }
}

impl From<ContactRecord> for ContactView {
    fn from(record: ContactRecord) -> Self {
        ContactView::new(record.contact, record.razon_social.flatten())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListContactsResponse {
    pub success: bool,
    pub contacts: Vec<ContactRecord>,
    pub count: usize,
}

impl ListContactsResponse {
    pub fn from_views(views: Vec<ContactView>) -> Self {
        let contacts: Vec<ContactRecord> = views.into_iter().map(ContactRecord::from).collect();
        Self {
            success: true,
            count: contacts.len(),
            contacts,
        }
    }

    pub fn into_views(self) -> Vec<ContactView> {
        self.contacts.into_iter().map(ContactView::from).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendIntroResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendIntroResponse {
    pub fn sent() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}
