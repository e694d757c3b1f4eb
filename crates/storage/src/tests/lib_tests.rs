use super::*;
use chrono::TimeZone;

async fn seed(storage: &Storage, name: &str, company: Option<&CompanyKey>) -> ContactId {
    storage
        .create_contact(NewContact {
            name,
            email: &format!("{}@example.com", name.to_lowercase()),
            company,
        })
        .await
        .expect("contact")
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("intro_dashboard_storage_test_{suffix}"));
    let db_path = temp_root.join("nested").join("contacts.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    std::fs::remove_dir_all(temp_root).expect("cleanup");
}

#[tokio::test]
async fn lists_contacts_by_name_with_insertion_order_ties() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let carla = seed(&storage, "Carla", None).await;
    let first_ana = seed(&storage, "Ana", None).await;
    let bruno = seed(&storage, "Bruno", None).await;
    let second_ana = seed(&storage, "Ana", None).await;

    let ids: Vec<ContactId> = storage
        .list_contacts(CONTACT_LIST_CAP)
        .await
        .expect("list")
        .into_iter()
        .map(|contact| contact.id)
        .collect();
    assert_eq!(ids, vec![first_ana, second_ana, bruno, carla]);
}

#[tokio::test]
async fn listing_never_exceeds_the_cap() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    for i in 0..(CONTACT_LIST_CAP + 5) {
        seed(&storage, &format!("Contact {i:03}"), None).await;
    }

    let contacts = storage.list_contacts(500).await.expect("list");
    assert_eq!(contacts.len(), CONTACT_LIST_CAP as usize);
    assert!(contacts.windows(2).all(|w| w[0].name <= w[1].name));

    let few = storage.list_contacts(3).await.expect("list");
    assert_eq!(few.len(), 3);
}

#[tokio::test]
async fn resolves_companies_by_key() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let key = CompanyKey::from("76.123.456-7");
    storage.upsert_company(&key, "Acme SpA").await.expect("company");
    storage
        .upsert_company(&key, "Acme Chile SpA")
        .await
        .expect("rename");

    let company = storage
        .company_by_key(&key)
        .await
        .expect("lookup")
        .expect("present");
    assert_eq!(company.name, "Acme Chile SpA");

    let missing = storage
        .company_by_key(&CompanyKey::from("missing"))
        .await
        .expect("lookup");
    assert!(missing.is_none());
}

#[tokio::test]
async fn marks_and_resets_intro_sent() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let key = CompanyKey::from("k-1");
    let ana = seed(&storage, "Ana", Some(&key)).await;

    let fresh = storage
        .contact_by_id(&ana)
        .await
        .expect("load")
        .expect("present");
    assert!(!fresh.intro_sent);
    assert_eq!(fresh.intro_sent_at, None);
    assert_eq!(fresh.company, Some(key));

    let sent_at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
    assert!(storage.mark_intro_sent(&ana, sent_at).await.expect("mark"));
    let sent = storage
        .contact_by_id(&ana)
        .await
        .expect("load")
        .expect("present");
    assert!(sent.intro_sent);
    assert_eq!(sent.intro_sent_at, Some(sent_at));

    assert_eq!(storage.reset_intro_sent(Some(&ana)).await.expect("reset"), 1);
    let reset = storage
        .contact_by_id(&ana)
        .await
        .expect("load")
        .expect("present");
    assert!(!reset.intro_sent);
    assert_eq!(reset.intro_sent_at, None);
}

#[tokio::test]
async fn marking_unknown_contact_reports_false() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let updated = storage
        .mark_intro_sent(&ContactId::from("nobody"), Utc::now())
        .await
        .expect("mark");
    assert!(!updated);
}

#[tokio::test]
async fn keeps_caller_supplied_ids() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let id = ContactId::from("1");
    storage
        .insert_contact_with_id(
            &id,
            NewContact {
                name: "Ana",
                email: "a@x.com",
                company: None,
            },
        )
        .await
        .expect("insert");

    let contact = storage
        .contact_by_id(&id)
        .await
        .expect("load")
        .expect("present");
    assert_eq!(contact.email, "a@x.com");
    assert!(storage
        .insert_contact_with_id(
            &id,
            NewContact {
                name: "Ana",
                email: "a@x.com",
                company: None,
            },
        )
        .await
        .is_err());
}

#[tokio::test]
async fn blank_company_reference_is_kept_as_stored() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let blank = CompanyKey::from("");
    let contact_id = seed(&storage, "Ana", Some(&blank)).await;

    let contact = storage
        .contact_by_id(&contact_id)
        .await
        .expect("load")
        .expect("present");
    assert_eq!(contact.company, Some(blank));
    assert_eq!(contact.company_ref(), None);
}
