//! Settings files as the command reads them.

use std::collections::HashMap;
use std::io::Write;

use yrc_canteen_cli::config::{
    load_settings_file, Overrides, Settings, MISSING_CREDENTIALS, PASSWORD_ENV, USERNAME_ENV,
};

// ── helpers ──

fn settings_file(json: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

// ── loading ──

#[test]
fn test_file_feeds_retriever_inputs() {
    let file = settings_file(
        r#"{
            "username": "from-file",
            "password": "secret",
            "update_rate": 20,
            "profile": "legacy",
            "base_url": "http://127.0.0.1:9000",
            "timeout_secs": 7
        }"#,
    );
    let overrides = Overrides {
        username: Some("s12345".into()),
        ..Overrides::default()
    };

    let parsed = load_settings_file(file.path(), true).unwrap();
    let settings = Settings::resolve(overrides, env_of(&[]), parsed).unwrap();
    let credentials = settings.credentials().unwrap();
    assert_eq!(credentials.username, "s12345");
    assert_eq!(credentials.password, "secret");
    assert_eq!(settings.schedule().interval_minutes, 20);
    assert_eq!(settings.client_options().timeout.as_secs(), 7);

    let profile = settings.portal_profile().unwrap();
    assert_eq!(profile.cookie_name, "laravel_session");
    assert_eq!(profile.base_url, "http://127.0.0.1:9000");
}

#[test]
fn test_env_sits_between_flags_and_file() {
    let file = settings_file(r#"{"username": "from-file", "password": "file-pass"}"#);
    let parsed = load_settings_file(file.path(), true).unwrap();
    let env = env_of(&[(USERNAME_ENV, "from-env"), (PASSWORD_ENV, "env-pass")]);
    let overrides = Overrides {
        password: Some("flag-pass".into()),
        ..Overrides::default()
    };

    let settings = Settings::resolve(overrides, env, parsed).unwrap();
    assert_eq!(settings.username, "from-env");
    assert_eq!(settings.password, "flag-pass");
}

#[test]
fn test_unknown_fields_are_ignored() {
    let file = settings_file(r#"{"username": "a", "password": "b", "theme": "dark"}"#);
    let parsed = load_settings_file(file.path(), true).unwrap();
    let settings = Settings::resolve(Overrides::default(), env_of(&[]), parsed).unwrap();
    assert_eq!(settings.username, "a");
    assert_eq!(settings.profile, "current");
}

#[test]
fn test_malformed_file_ends_at_missing_credentials() {
    let file = settings_file(r#"{"username": "a", "password": "#);
    let parsed = load_settings_file(file.path(), true).unwrap();
    let settings = Settings::resolve(Overrides::default(), env_of(&[]), parsed).unwrap();
    assert_eq!(
        settings.credentials().unwrap_err().to_string(),
        MISSING_CREDENTIALS
    );
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_settings_file(&dir.path().join("nope.json"), true).unwrap_err();
    assert!(err.to_string().contains("settings file not found"));
}
