use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! key_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

key_newtype!(ContactId);
key_newtype!(CompanyKey);

impl ContactId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// A person row from the contact store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    #[serde(rename = "nombre_contacto")]
    pub name: String,
    #[serde(rename = "email_contacto")]
    pub email: String,
    #[serde(rename = "email_sent", default)]
    pub intro_sent: bool,
    #[serde(rename = "email_sent_at", default)]
    pub intro_sent_at: Option<DateTime<Utc>>,
    #[serde(rename = "rut_empresa", default)]
    pub company: Option<CompanyKey>,
}

impl Contact {
    /// The company reference worth resolving. An empty `rut_empresa` is
    /// kept as stored but counts as no reference.
    pub fn company_ref(&self) -> Option<&CompanyKey> {
        self.company.as_ref().filter(|key| !key.as_str().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    #[serde(rename = "rut_empresa")]
    pub key: CompanyKey,
    #[serde(rename = "razon_social")]
    pub name: String,
}

/// Where a contact stands with respect to its introductory email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntroStatus {
    Pending,
    Sent { at: Option<DateTime<Utc>> },
}

/// A contact joined with the display name of its company.
///
/// `company_name` is `None` both when the contact has no company reference
/// and when the lookup failed or found nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactView {
    pub contact: Contact,
    pub company_name: Option<String>,
}

impl ContactView {
    pub fn new(contact: Contact, company_name: Option<String>) -> Self {
        Self {
            contact,
            company_name,
        }
    }

    pub fn id(&self) -> &ContactId {
        &self.contact.id
    }

    pub fn intro_status(&self) -> IntroStatus {
        if self.contact.intro_sent {
            IntroStatus::Sent {
                at: self.contact.intro_sent_at,
            }
        } else {
            IntroStatus::Pending
        }
    }
}
