//! `ureq`-backed [`PredictionService`].
//!
//! ureq is blocking, so each call runs on tokio's blocking pool. The agent is
//! built once with a global timeout; SHAP generation on the server routinely
//! takes tens of seconds, hence the 60 second default.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::service::{BoxFuture, PredictionService};
use crate::wire::{HealthResponse, PredictResponse};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_HEALTH_PATH: &str = "/api/xai/teste/";
pub const DEFAULT_PREDICT_PATH: &str = "/api/xai/resultado/";

/// Where and how to reach the prediction service.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Access token obtained elsewhere; sent as `Authorization: Bearer`.
    pub bearer_token: Option<String>,
    pub timeout: Duration,
    pub health_path: String,
    pub predict_path: String,
}

impl ApiSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            bearer_token: None,
            timeout: DEFAULT_TIMEOUT,
            health_path: DEFAULT_HEALTH_PATH.to_string(),
            predict_path: DEFAULT_PREDICT_PATH.to_string(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

pub struct HttpPredictionService {
    agent: ureq::Agent,
    settings: ApiSettings,
}

impl HttpPredictionService {
    pub fn new(settings: ApiSettings) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(settings.timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            settings,
        }
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }
}

impl PredictionService for HttpPredictionService {
    fn health(&self) -> BoxFuture<'_, Result<HealthResponse, ApiError>> {
        let agent = self.agent.clone();
        let url = self.settings.url(&self.settings.health_path);
        let api_key = self.settings.api_key.clone();

        Box::pin(async move {
            run_blocking(move || {
                let mut request = agent.get(&url);
                // The probe is public: API key only, never the user's token.
                if let Some(key) = &api_key {
                    request = request.header("X-API-Key", key);
                }
                read_json(request.call())
            })
            .await
        })
    }

    fn predict(&self, body: serde_json::Value) -> BoxFuture<'_, Result<PredictResponse, ApiError>> {
        let agent = self.agent.clone();
        let url = self.settings.url(&self.settings.predict_path);
        let api_key = self.settings.api_key.clone();
        let bearer = self.settings.bearer_token.clone();

        Box::pin(async move {
            let payload = serde_json::to_string(&body).map_err(|e| ApiError::Internal(e.to_string()))?;
            info!(url = %url, bytes = payload.len(), "sending prediction request");

            run_blocking(move || {
                let mut request = agent.post(&url).header("Content-Type", "application/json");
                if let Some(key) = &api_key {
                    request = request.header("X-API-Key", key);
                }
                if let Some(token) = &bearer {
                    request = request.header("Authorization", &format!("Bearer {token}"));
                }
                read_json(request.send(payload.as_str()))
            })
            .await
        })
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("request task failed: {e}")))?
}

fn read_json<T: DeserializeOwned>(
    result: Result<ureq::http::Response<ureq::Body>, ureq::Error>,
) -> Result<T, ApiError> {
    let mut response = result.map_err(classify_transport)?;
    let status = response.status().as_u16();

    if !(200..300).contains(&status) {
        // An unreadable error body still leaves the status.
        let detail = match response.body_mut().read_to_string() {
            Ok(text) => error_detail(&text),
            Err(e) => {
                debug!(status, error = %e, "could not read error body");
                None
            }
        };
        debug!(status, detail = ?detail, "prediction service returned an error status");
        return Err(ApiError::Status { status, detail });
    }

    let text = response
        .body_mut()
        .read_to_string()
        .map_err(classify_transport)?;
    serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
}

fn classify_transport(err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::Timeout(_) => ApiError::Timeout,
        ureq::Error::Io(e) if e.kind() == std::io::ErrorKind::TimedOut => ApiError::Timeout,
        ureq::Error::StatusCode(status) => ApiError::Status {
            status,
            detail: None,
        },
        other => ApiError::Connection(other.to_string()),
    }
}

/// Pull a human-readable reason out of an error body (`detail` or `message`).
pub fn error_detail(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    ["detail", "message"].iter().find_map(|key| match json.get(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    })
}
