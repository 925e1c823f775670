use std::future::Future;
use std::pin::Pin;

use crate::error::ApiError;
use crate::wire::{HealthResponse, PredictResponse};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The remote prediction collaborator.
pub trait PredictionService: Send + Sync {
    /// Liveness probe.
    fn health(&self) -> BoxFuture<'_, Result<HealthResponse, ApiError>>;

    /// Send one prediction request. `body` is the complete JSON document.
    fn predict(&self, body: serde_json::Value) -> BoxFuture<'_, Result<PredictResponse, ApiError>>;
}

/// True only when the probe answers with status `ok`.
pub async fn is_healthy(service: &dyn PredictionService) -> bool {
    match service.health().await {
        Ok(health) => health.status == "ok",
        Err(e) => {
            tracing::warn!(error = %e, "explainability service unavailable");
            false
        }
    }
}
