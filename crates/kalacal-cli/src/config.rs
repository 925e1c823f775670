use std::path::{Path, PathBuf};
use std::time::Duration;

use kalacal_api::http::{DEFAULT_HEALTH_PATH, DEFAULT_PREDICT_PATH};
use kalacal_api::ApiSettings;
use kalacal_core::Catalog;
use kalacal_xai::BodyConvention;
use serde::{Deserialize, Serialize};

/// Current config version. Bump this when adding fields or changing shape.
/// Each bump requires a corresponding entry in [`migrate`].
const CURRENT_VERSION: u32 = 1;

const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KalacalConfig {
    /// Schema version. Missing or 0 = pre-versioned config.
    #[serde(default)]
    pub config_version: u32,
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Access token issued by the auth service. Refreshing it is not our job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub body_convention: BodyConvention,
    #[serde(default = "default_health_path")]
    pub health_path: String,
    #[serde(default = "default_predict_path")]
    pub predict_path: String,
    /// Alternate model catalog (JSON). The built-in Kala-Cal catalog otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,
    pub created_at: jiff::Timestamp,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_health_path() -> String {
    DEFAULT_HEALTH_PATH.to_string()
}

fn default_predict_path() -> String {
    DEFAULT_PREDICT_PATH.to_string()
}

impl Default for KalacalConfig {
    fn default() -> Self {
        Self {
            config_version: CURRENT_VERSION,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            bearer_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            body_convention: BodyConvention::default(),
            health_path: default_health_path(),
            predict_path: default_predict_path(),
            catalog_path: None,
            created_at: jiff::Timestamp::now(),
        }
    }
}

/// Redacted config info safe to print.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigInfo {
    pub base_url: String,
    pub api_key_hint: Option<String>,
    pub has_bearer_token: bool,
    pub timeout_secs: u64,
    pub body_convention: BodyConvention,
    pub catalog: String,
    pub created_at: String,
}

pub fn config_dir() -> eyre::Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| eyre::eyre!("no config directory found"))?;
    Ok(base.join("kalacal"))
}

pub fn config_path() -> eyre::Result<PathBuf> {
    Ok(config_dir()?.join("config.json"))
}

/// Load from `path` (or the default location), falling back to defaults when
/// no file exists, then apply environment overrides.
pub fn resolve_config(path: Option<&Path>) -> eyre::Result<KalacalConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_path()?,
    };

    let mut config = if path.exists() {
        load_config_from(&path)?
    } else {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        KalacalConfig::default()
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

pub fn load_config_from(path: &Path) -> eyre::Result<KalacalConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("failed to read config at {}: {e}", path.display()))?;

    // Parse as raw JSON so we can run migrations before deserializing.
    let json: serde_json::Value = serde_json::from_str(&contents)?;
    let on_disk_version = json
        .get("config_version")
        .and_then(|v| v.as_u64())
        .map_or(0, |v| u32::try_from(v).unwrap_or(u32::MAX));

    let migrated = migrate(json, on_disk_version)?;
    let config: KalacalConfig = serde_json::from_value(migrated)?;
    Ok(config)
}

/// Run sequential migrations from `from_version` up to [`CURRENT_VERSION`].
///
/// Each migration is a pure transform on the raw JSON value.
pub fn migrate(mut json: serde_json::Value, from_version: u32) -> eyre::Result<serde_json::Value> {
    if from_version > CURRENT_VERSION {
        return Err(eyre::eyre!(
            "config_version {from_version} is newer than this build supports ({CURRENT_VERSION}). \
             Please update kalacal."
        ));
    }

    // v0 → v1: the mobile app's settings shape (`baseURL`, `apiKey`,
    // `timeout` in milliseconds) becomes snake_case with seconds.
    if from_version < 1 {
        let obj = json
            .as_object_mut()
            .ok_or_else(|| eyre::eyre!("config is not a JSON object"))?;

        if let Some(url) = obj.remove("baseURL") {
            obj.entry("base_url").or_insert(url);
        }
        if let Some(key) = obj.remove("apiKey") {
            obj.entry("api_key").or_insert(key);
        }
        if let Some(ms) = obj.remove("timeout").and_then(|v| v.as_u64()) {
            obj.entry("timeout_secs")
                .or_insert(serde_json::Value::from(ms.div_ceil(1000)));
        }
        obj.entry("base_url")
            .or_insert(serde_json::Value::String(DEFAULT_BASE_URL.to_string()));
        obj.entry("created_at")
            .or_insert(serde_json::Value::String(jiff::Timestamp::now().to_string()));
        obj.insert(
            "config_version".to_string(),
            serde_json::Value::Number(1.into()),
        );
        tracing::info!("migrated config v0 → v1 (renamed legacy keys)");
    }

    // Future migrations go here:
    // if from_version < 2 { ... }

    Ok(json)
}

pub fn save_config(config: &KalacalConfig) -> eyre::Result<PathBuf> {
    let dir = config_dir()?;
    save_config_to(&dir, config)
}

/// Write `config.json` into `dir` atomically.
pub fn save_config_to(dir: &Path, config: &KalacalConfig) -> eyre::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    // Always write the current version, regardless of what was loaded.
    let mut stamped = config.clone();
    stamped.config_version = CURRENT_VERSION;

    let path = dir.join("config.json");
    let json = serde_json::to_string_pretty(&stamped)?;

    // Write to a temp file then rename for atomicity
    let tmp_path = dir.join("config.json.tmp");
    std::fs::write(&tmp_path, json.as_bytes())?;

    // The file may hold an API key and token.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp_path, &path)?;

    tracing::info!(path = %path.display(), "config saved");
    Ok(path)
}

/// `KALACAL_API_URL`, `KALACAL_API_KEY` and `KALACAL_TOKEN` win over the file.
pub fn apply_env_overrides(config: &mut KalacalConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(url) = var("KALACAL_API_URL") {
        config.base_url = url;
    }
    if let Some(key) = var("KALACAL_API_KEY") {
        config.api_key = Some(key);
    }
    if let Some(token) = var("KALACAL_TOKEN") {
        config.bearer_token = Some(token);
    }
}

pub fn api_settings(config: &KalacalConfig) -> ApiSettings {
    ApiSettings {
        base_url: config.base_url.clone(),
        api_key: config.api_key.clone(),
        bearer_token: config.bearer_token.clone(),
        timeout: Duration::from_secs(config.timeout_secs),
        health_path: config.health_path.clone(),
        predict_path: config.predict_path.clone(),
    }
}

pub fn load_catalog(config: &KalacalConfig) -> eyre::Result<Catalog> {
    let Some(path) = &config.catalog_path else {
        return Ok(Catalog::kala_cal());
    };
    let contents = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("failed to read catalog at {}: {e}", path.display()))?;
    let catalog = Catalog::from_json(&contents)?;
    tracing::info!(
        path = %path.display(),
        models = catalog.list_models().len(),
        "loaded model catalog"
    );
    Ok(catalog)
}

pub fn config_info(config: &KalacalConfig) -> ConfigInfo {
    ConfigInfo {
        base_url: config.base_url.clone(),
        api_key_hint: config.api_key.as_deref().map(redact_key),
        has_bearer_token: config.bearer_token.is_some(),
        timeout_secs: config.timeout_secs,
        body_convention: config.body_convention,
        catalog: config
            .catalog_path
            .as_ref()
            .map_or_else(|| "built-in".to_string(), |p| p.display().to_string()),
        created_at: config.created_at.to_string(),
    }
}

fn redact_key(key: &str) -> String {
    if key.chars().count() <= 8 {
        return "****".to_string();
    }
    let chars: Vec<char> = key.chars().collect();
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}...{suffix}")
}
