use super::{load_settings_from, normalize_database_url, prepare_database_url, Settings};

use std::{
    collections::HashMap,
    env, fs,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_apply_without_file_or_env() {
    let settings = load_settings_from(None, env_from(&[]));
    let defaults = Settings::default();
    assert_eq!(settings.server_bind, defaults.server_bind);
    assert_eq!(settings.store_timeout(), Duration::from_secs(5));
    assert!(settings.mailer_webhook_url.is_none());
}

#[test]
fn env_overrides_file_and_app_prefix_wins() {
    let file = r#"
        bind_addr = "0.0.0.0:7000"
        database_url = "sqlite://./file.db"
        store_timeout_ms = "750"
    "#;
    let settings = load_settings_from(
        Some(file),
        env_from(&[
            ("SERVER_BIND", "0.0.0.0:8000"),
            ("APP__BIND_ADDR", "0.0.0.0:9000"),
            ("APP__MAILER_WEBHOOK_URL", "http://relay.local/send"),
        ]),
    );
    assert_eq!(settings.server_bind, "0.0.0.0:9000");
    assert_eq!(settings.database_url, "sqlite://./file.db");
    assert_eq!(settings.store_timeout_ms, 750);
    assert_eq!(
        settings.mailer_webhook_url.as_deref(),
        Some("http://relay.local/send")
    );
}

#[test]
fn unparsable_timeouts_keep_previous_value() {
    let settings = load_settings_from(None, env_from(&[("APP__STORE_TIMEOUT_MS", "soon")]));
    assert_eq!(settings.store_timeout_ms, Settings::default().store_timeout_ms);
}

#[test]
fn blank_webhook_url_disables_relay() {
    let settings = load_settings_from(None, env_from(&[("APP__MAILER_WEBHOOK_URL", "  ")]));
    assert!(settings.mailer_webhook_url.is_none());
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
    assert_eq!(
        normalize_database_url("sqlite:data\\test.db"),
        "sqlite://data/test.db"
    );
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
}

#[test]
fn creates_parent_dir_for_sqlite_file() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();

    let temp_root = env::temp_dir().join(format!("intro_dashboard_server_test_{suffix}"));
    let db_path = temp_root.join("data").join("contacts.db");

    prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare db url");
    assert!(temp_root.join("data").exists());

    fs::remove_dir_all(temp_root).expect("cleanup");
}
