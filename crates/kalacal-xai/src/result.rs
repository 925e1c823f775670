use kalacal_api::{ChartImage, PredictResponse};
use kalacal_core::{ModelDescriptor, ResolvedModel};
use serde::Serialize;

/// A successful explanation, tagged with the model it ran against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplanationResult {
    pub predicted_value: f64,
    pub model_error: f64,
    pub chart: ChartImage,
    pub variables: Vec<String>,
    pub approach: Option<String>,
    pub total_features: Option<u32>,
    pub model: ResolvedModel,
    /// Catalog entry for explicit requests; `None` when auto-detected.
    pub model_info: Option<ModelDescriptor>,
    pub received_at: jiff::Timestamp,
}

impl ExplanationResult {
    pub fn from_response(
        response: PredictResponse,
        model: ResolvedModel,
        model_info: Option<ModelDescriptor>,
    ) -> Self {
        Self {
            predicted_value: response.predicted_value,
            model_error: response.model_error,
            chart: response.chart,
            variables: response.variables,
            approach: response.approach,
            total_features: response.total_features,
            model,
            model_info,
            received_at: jiff::Timestamp::now(),
        }
    }

    /// Prediction and error margin as shown on the result card.
    pub fn summary(&self) -> String {
        format!("{:.2} ±{:.1}%", self.predicted_value, self.model_error)
    }
}
