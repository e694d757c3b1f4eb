use super::*;
use crate::{
    aggregate::CompanyResolver,
    mailer::{LogMailer, MailerError},
};
use anyhow::anyhow;
use async_trait::async_trait;
use shared::domain::{Company, CompanyKey, Contact};
use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicUsize, Ordering},
};
use storage::{NewContact, Storage};
use tokio::sync::Mutex;

const TIMEOUT: Duration = Duration::from_millis(200);

fn contact(id: &str, name: &str, company: Option<&str>) -> Contact {
    Contact {
        id: ContactId::from(id),
        name: name.to_string(),
        email: format!("{}@x.com", name.to_lowercase()),
        intro_sent: false,
        intro_sent_at: None,
        company: company.map(CompanyKey::from),
    }
}

#[derive(Default)]
struct FakeStore {
    contacts: Vec<Contact>,
    companies: HashMap<CompanyKey, String>,
    failing_companies: HashSet<CompanyKey>,
    slow_companies: HashSet<CompanyKey>,
    fail_listing: bool,
    slow_listing: bool,
    company_lookups: AtomicUsize,
}

#[async_trait]
impl ContactStore for FakeStore {
    async fn list_contacts(&self, limit: u32) -> anyhow::Result<Vec<Contact>> {
        if self.slow_listing {
            tokio::time::sleep(Duration::from_secs(10)).await;
        }
        if self.fail_listing {
            return Err(anyhow!("connection reset by peer"));
        }
        Ok(self.contacts.iter().take(limit as usize).cloned().collect())
    }

    async fn company_by_key(&self, key: &CompanyKey) -> anyhow::Result<Option<Company>> {
        self.company_lookups.fetch_add(1, Ordering::SeqCst);
        if self.slow_companies.contains(key) {
            tokio::time::sleep(Duration::from_secs(10)).await;
        }
        if self.failing_companies.contains(key) {
            return Err(anyhow!("lookup failed for {key}"));
        }
        Ok(self.companies.get(key).map(|name| Company {
            key: key.clone(),
            name: name.clone(),
        }))
    }

    async fn contact_by_id(&self, contact_id: &ContactId) -> anyhow::Result<Option<Contact>> {
        Ok(self.contacts.iter().find(|c| &c.id == contact_id).cloned())
    }

    async fn mark_intro_sent(
        &self,
        _contact_id: &ContactId,
        _sent_at: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        Err(anyhow!("read-only fake"))
    }
}

/// Resolver whose answers arrive in reverse order of the keys' names.
struct StaggeredResolver {
    calls: Mutex<Vec<CompanyKey>>,
}

#[async_trait]
impl CompanyResolver for StaggeredResolver {
    async fn company_name(&self, key: &CompanyKey) -> Option<String> {
        self.calls.lock().await.push(key.clone());
        let delay = match key.as_str() {
            "a" => 60,
            "b" => 30,
            _ => 0,
        };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Some(format!("Company {}", key.as_str().to_uppercase()))
    }
}

struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn deliver(&self, _email: &IntroEmail) -> Result<(), MailerError> {
        Err(MailerError::Rejected(503))
    }
}

struct StalledMailer;

#[async_trait]
impl Mailer for StalledMailer {
    async fn deliver(&self, _email: &IntroEmail) -> Result<(), MailerError> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(())
    }
}

fn context(store: Arc<dyn ContactStore>, mailer: Arc<dyn Mailer>) -> ApiContext {
    ApiContext::new(store, TIMEOUT, mailer, TIMEOUT, "team@example.com")
}

async fn seeded_storage() -> (Storage, ContactId, ContactId) {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let key = CompanyKey::from("76.000.000-1");
    storage.upsert_company(&key, "Acme SpA").await.expect("company");
    let ana = ContactId::from("1");
    storage
        .insert_contact_with_id(
            &ana,
            NewContact {
                name: "Ana",
                email: "a@x.com",
                company: None,
            },
        )
        .await
        .expect("ana");
    let bruno = storage
        .create_contact(NewContact {
            name: "Bruno",
            email: "b@x.com",
            company: Some(&key),
        })
        .await
        .expect("bruno");
    (storage, ana, bruno)
}

#[tokio::test]
async fn contact_without_company_is_never_resolved() {
    let store = Arc::new(FakeStore {
        contacts: vec![contact("1", "Ana", None)],
        ..FakeStore::default()
    });
    let ctx = context(store.clone(), Arc::new(LogMailer));

    let views = list_contacts(&ctx).await.expect("list");
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].company_name, None);
    assert_eq!(store.company_lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_company_lookup_only_blanks_that_contact() {
    let mut companies = HashMap::new();
    companies.insert(CompanyKey::from("ok"), "Acme SpA".to_string());
    let store = Arc::new(FakeStore {
        contacts: vec![
            contact("1", "Ana", Some("broken")),
            contact("2", "Bruno", Some("ok")),
            contact("3", "Carla", Some("slow")),
            contact("4", "Diego", Some("gone")),
        ],
        companies,
        failing_companies: HashSet::from([CompanyKey::from("broken")]),
        slow_companies: HashSet::from([CompanyKey::from("slow")]),
        ..FakeStore::default()
    });
    let ctx = context(store, Arc::new(LogMailer));

    let views = list_contacts(&ctx).await.expect("list must survive enrichment failures");
    let names: Vec<Option<&str>> = views.iter().map(|v| v.company_name.as_deref()).collect();
    assert_eq!(names, vec![None, Some("Acme SpA"), None, None]);
    let ids: Vec<&str> = views.iter().map(|v| v.id().as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4"]);
}

#[tokio::test]
async fn listing_failure_is_fatal() {
    let store = Arc::new(FakeStore {
        contacts: vec![contact("1", "Ana", None)],
        fail_listing: true,
        ..FakeStore::default()
    });
    let ctx = context(store, Arc::new(LogMailer));

    let err = list_contacts(&ctx).await.expect_err("should fail");
    assert_eq!(err.code, ErrorCode::FetchFailed);
}

#[tokio::test]
async fn listing_timeout_is_a_fetch_failure() {
    let store = Arc::new(FakeStore {
        slow_listing: true,
        ..FakeStore::default()
    });
    let ctx = context(store, Arc::new(LogMailer));

    let err = list_contacts(&ctx).await.expect_err("should time out");
    assert_eq!(err.code, ErrorCode::FetchFailed);
}

#[tokio::test]
async fn gateway_sorts_and_caps_whatever_the_store_returns() {
    let mut contacts: Vec<Contact> = (0..120)
        .rev()
        .map(|i| contact(&i.to_string(), &format!("Name {i:03}"), None))
        .collect();
    contacts.push(contact("dup", "Name 000", None));
    let store = Arc::new(FakeStore {
        contacts,
        ..FakeStore::default()
    });
    let gateway = ContactGateway::new(store, TIMEOUT);

    let listed = gateway.list_contacts().await.expect("list");
    assert!(listed.len() <= 100);
    assert!(listed.windows(2).all(|w| w[0].name <= w[1].name));
}

#[tokio::test]
async fn aggregation_keeps_input_order_not_completion_order() {
    let resolver = StaggeredResolver {
        calls: Mutex::new(Vec::new()),
    };
    let contacts = vec![
        contact("1", "Ana", Some("a")),
        contact("2", "Bruno", Some("b")),
        contact("3", "Carla", Some("c")),
        contact("4", "Diego", Some("a")),
        contact("5", "Elena", None),
    ];

    let views = aggregate(contacts, &resolver).await;
    let joined: Vec<(&str, Option<&str>)> = views
        .iter()
        .map(|v| (v.id().as_str(), v.company_name.as_deref()))
        .collect();
    assert_eq!(
        joined,
        vec![
            ("1", Some("Company A")),
            ("2", Some("Company B")),
            ("3", Some("Company C")),
            ("4", Some("Company A")),
            ("5", None),
        ]
    );
    assert_eq!(resolver.calls.lock().await.len(), 3, "shared keys are looked up once");
}

#[tokio::test]
async fn refreshing_unchanged_data_is_idempotent() {
    let (storage, _, _) = seeded_storage().await;
    let ctx = context(Arc::new(storage), Arc::new(LogMailer));

    let first = list_contacts(&ctx).await.expect("first");
    let second = list_contacts(&ctx).await.expect("second");
    assert_eq!(first, second);
    assert_eq!(first[1].company_name.as_deref(), Some("Acme SpA"));
}

#[tokio::test]
async fn send_intro_marks_contact_sent_in_store() {
    let (storage, ana, _) = seeded_storage().await;
    let ctx = context(Arc::new(storage), Arc::new(LogMailer));

    let sent_at = send_intro(&ctx, &ana).await.expect("send");

    let views = list_contacts(&ctx).await.expect("list");
    let row = views.iter().find(|v| v.id() == &ana).expect("ana");
    assert!(row.contact.intro_sent);
    assert_eq!(row.contact.intro_sent_at, Some(sent_at));
}

#[tokio::test]
async fn second_send_is_rejected() {
    let (storage, ana, _) = seeded_storage().await;
    let ctx = context(Arc::new(storage), Arc::new(LogMailer));

    send_intro(&ctx, &ana).await.expect("first send");
    let err = send_intro(&ctx, &ana).await.expect_err("second send");
    assert_eq!(err.code, ErrorCode::AlreadySent);
}

#[tokio::test]
async fn unknown_contact_is_not_found() {
    let (storage, _, _) = seeded_storage().await;
    let ctx = context(Arc::new(storage), Arc::new(LogMailer));

    let err = send_intro(&ctx, &ContactId::from("nobody"))
        .await
        .expect_err("missing");
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn mailer_failure_leaves_contact_unsent() {
    let (storage, _, bruno) = seeded_storage().await;
    let ctx = context(Arc::new(storage.clone()), Arc::new(FailingMailer));

    let err = send_intro(&ctx, &bruno).await.expect_err("mailer fails");
    assert_eq!(err.code, ErrorCode::SendFailed);
    assert!(err.client_message().contains("503"));

    let stored = storage
        .contact_by_id(&bruno)
        .await
        .expect("load")
        .expect("present");
    assert!(!stored.intro_sent);
}

#[tokio::test]
async fn mailer_timeout_is_a_send_failure() {
    let (storage, ana, _) = seeded_storage().await;
    let ctx = context(Arc::new(storage), Arc::new(StalledMailer));

    let err = send_intro(&ctx, &ana).await.expect_err("timed out");
    assert_eq!(err.code, ErrorCode::SendFailed);
}
