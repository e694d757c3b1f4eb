use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use futures::future::join_all;
use shared::domain::{CompanyKey, Contact, ContactView};

use crate::gateway::ContactGateway;

/// Looks up a company's display name. Failures are reported as `None`.
#[async_trait]
pub trait CompanyResolver: Send + Sync {
    async fn company_name(&self, key: &CompanyKey) -> Option<String>;
}

#[async_trait]
impl CompanyResolver for ContactGateway {
    async fn company_name(&self, key: &CompanyKey) -> Option<String> {
        self.resolve_company(key)
            .await
            .map(|company| company.name)
            .filter(|name| !name.is_empty())
    }
}

/// Joins each contact with its company name, keeping the input order.
///
/// Every distinct company key is looked up once and all lookups run
/// concurrently. Contacts without a company reference never trigger a
/// lookup. A company with an empty name counts as unresolved.
pub async fn aggregate<R>(contacts: Vec<Contact>, resolver: &R) -> Vec<ContactView>
where
    R: CompanyResolver + ?Sized,
{
    let keys: Vec<CompanyKey> = {
        let mut seen = HashSet::new();
        contacts
            .iter()
            .filter_map(Contact::company_ref)
            .filter(|key| seen.insert(*key))
            .cloned()
            .collect()
    };

    let names = join_all(keys.iter().map(|key| resolver.company_name(key))).await;
    let names: HashMap<CompanyKey, Option<String>> = keys.into_iter().zip(names).collect();

    contacts
        .into_iter()
        .map(|contact| {
            let company_name = contact
                .company_ref()
                .and_then(|key| names.get(key).cloned().flatten());
            ContactView::new(contact, company_name)
        })
        .collect()
}
