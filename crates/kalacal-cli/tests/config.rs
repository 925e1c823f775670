use std::collections::HashMap;
use std::time::Duration;

use kalacal_cli::config::{
    api_settings, apply_env_overrides, config_info, load_catalog, load_config_from, migrate,
    save_config_to, KalacalConfig,
};
use kalacal_core::Catalog;
use kalacal_xai::BodyConvention;
use serde_json::json;

#[test]
fn legacy_app_settings_migrate_to_v1() {
    let legacy = json!({
        "baseURL": "https://kalacal.example.org",
        "apiKey": "abcd1234efgh5678",
        "timeout": 60000
    });

    let migrated = migrate(legacy, 0).unwrap();
    assert_eq!(migrated["config_version"], 1);
    assert_eq!(migrated["base_url"], "https://kalacal.example.org");
    assert_eq!(migrated["api_key"], "abcd1234efgh5678");
    assert_eq!(migrated["timeout_secs"], 60);
    assert!(migrated.get("baseURL").is_none());
    assert!(migrated.get("created_at").is_some());

    let config: KalacalConfig = serde_json::from_value(migrated).unwrap();
    assert_eq!(config.body_convention, BodyConvention::TopLevel);
    assert_eq!(config.predict_path, "/api/xai/resultado/");
}

#[test]
fn empty_legacy_object_gets_defaults() {
    let migrated = migrate(json!({}), 0).unwrap();
    let config: KalacalConfig = serde_json::from_value(migrated).unwrap();
    assert_eq!(config.base_url, "http://localhost:8080");
    assert_eq!(config.timeout_secs, 60);
    assert!(config.api_key.is_none());
}

#[test]
fn newer_config_versions_are_rejected() {
    let err = migrate(json!({"config_version": 9}), 9).unwrap_err();
    assert!(err.to_string().contains("newer than this build supports"));
}

#[test]
fn oversized_config_version_on_disk_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"config_version": 4294967297, "base_url": "http://x", "created_at": "2026-01-01T00:00:00Z"}"#,
    )
    .unwrap();

    let err = load_config_from(&path).unwrap_err();
    assert!(err.to_string().contains("newer than this build supports"));
}

#[test]
fn migrate_rejects_non_objects() {
    assert!(migrate(json!([1, 2]), 0).is_err());
}

#[test]
fn save_then_load_preserves_the_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = KalacalConfig::default();
    config.base_url = "https://api.example.org".to_string();
    config.api_key = Some("secret-key-0001".to_string());
    config.body_convention = BodyConvention::Namespaced;

    let path = save_config_to(dir.path(), &config).unwrap();
    assert_eq!(path, dir.path().join("config.json"));
    assert!(!dir.path().join("config.json.tmp").exists());

    let loaded = load_config_from(&path).unwrap();
    assert_eq!(loaded.config_version, 1);
    assert_eq!(loaded.base_url, "https://api.example.org");
    assert_eq!(loaded.api_key.as_deref(), Some("secret-key-0001"));
    assert_eq!(loaded.body_convention, BodyConvention::Namespaced);
    assert_eq!(loaded.created_at, config.created_at);
}

#[cfg(unix)]
#[test]
fn saved_config_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = save_config_to(dir.path(), &KalacalConfig::default()).unwrap();
    let mode = std::fs::metadata(path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn legacy_file_on_disk_loads_through_migration() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"baseURL": "http://10.0.2.2:8000", "timeout": 1500}"#).unwrap();

    let config = load_config_from(&path).unwrap();
    assert_eq!(config.base_url, "http://10.0.2.2:8000");
    assert_eq!(config.timeout_secs, 2);
}

#[test]
fn environment_overrides_win() {
    let vars: HashMap<&str, &str> = [
        ("KALACAL_API_URL", "https://override.example.org"),
        ("KALACAL_TOKEN", "jwt-token"),
    ]
    .into_iter()
    .collect();

    let mut config = KalacalConfig::default();
    config.api_key = Some("from-file".to_string());
    apply_env_overrides(&mut config, |key| vars.get(key).map(|v| v.to_string()));

    assert_eq!(config.base_url, "https://override.example.org");
    assert_eq!(config.api_key.as_deref(), Some("from-file"));
    assert_eq!(config.bearer_token.as_deref(), Some("jwt-token"));
}

#[test]
fn config_info_redacts_secrets() {
    let mut config = KalacalConfig::default();
    config.api_key = Some("abcd1234efgh5678".to_string());
    config.bearer_token = Some("token".to_string());

    let info = config_info(&config);
    assert_eq!(info.api_key_hint.as_deref(), Some("abcd...5678"));
    assert!(info.has_bearer_token);
    assert_eq!(info.catalog, "built-in");

    config.api_key = Some("short".to_string());
    assert_eq!(config_info(&config).api_key_hint.as_deref(), Some("****"));
}

#[test]
fn api_settings_follow_the_config() {
    let mut config = KalacalConfig::default();
    config.timeout_secs = 5;
    config.bearer_token = Some("t".to_string());

    let settings = api_settings(&config);
    assert_eq!(settings.timeout, Duration::from_secs(5));
    assert_eq!(settings.bearer_token.as_deref(), Some("t"));
    assert_eq!(settings.url(&settings.health_path), "http://localhost:8080/api/xai/teste/");
}

#[test]
fn catalog_defaults_to_built_in_and_loads_from_file() {
    let config = KalacalConfig::default();
    assert_eq!(load_catalog(&config).unwrap(), Catalog::kala_cal());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.json");
    std::fs::write(&path, serde_json::to_string(&Catalog::kala_cal()).unwrap()).unwrap();

    let mut config = KalacalConfig::default();
    config.catalog_path = Some(path);
    let catalog = load_catalog(&config).unwrap();
    assert_eq!(catalog.list_models().len(), 4);
}

#[test]
fn invalid_catalog_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.json");
    std::fs::write(
        &path,
        r#"{"fields": [], "models": [{"id": "x", "name": "X", "description": "", "error_rate": 1.0, "features": ["peso"]}], "auto_required": []}"#,
    )
    .unwrap();

    let mut config = KalacalConfig::default();
    config.catalog_path = Some(path);
    assert!(load_catalog(&config).is_err());
}
