use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Body of a successful prediction response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    #[serde(rename = "valor_predito")]
    pub predicted_value: f64,
    #[serde(rename = "erro_modelo")]
    pub model_error: f64,
    #[serde(rename = "imagem_base64")]
    pub chart: ChartImage,
    #[serde(rename = "variaveis", default)]
    pub variables: Vec<String>,
    #[serde(rename = "abordagem", default, skip_serializing_if = "Option::is_none")]
    pub approach: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_features: Option<u32>,
}

/// The SHAP chart as sent by the server, usually a `data:image/png;base64,` URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartImage(String);

impl ChartImage {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// MIME type from the data URI header; bare base64 is assumed PNG.
    pub fn mime_type(&self) -> &str {
        self.0
            .strip_prefix("data:")
            .and_then(|rest| rest.split([';', ',']).next())
            .filter(|mime| !mime.is_empty())
            .unwrap_or("image/png")
    }

    /// Decode the image bytes.
    pub fn decode(&self) -> Result<Vec<u8>, ApiError> {
        let payload = match self.0.strip_prefix("data:") {
            Some(rest) => {
                let (header, data) = rest
                    .split_once(',')
                    .ok_or_else(|| ApiError::InvalidChart("data URI has no payload".to_string()))?;
                if !header.ends_with(";base64") {
                    return Err(ApiError::InvalidChart(format!(
                        "unsupported data URI encoding: {header}"
                    )));
                }
                data
            }
            None => self.0.as_str(),
        };

        STANDARD
            .decode(payload.trim())
            .map_err(|e| ApiError::InvalidChart(e.to_string()))
    }
}
