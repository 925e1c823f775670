//! Explanation request life cycle.
//!
//! ```text
//! Idle ──generate──▶ Submitting ──▶ Succeeded
//!  ▲                    ▲       └─▶ Failed
//!  └──────clear─────────┴── retry / switch / generate
//! ```
//!
//! Every submission takes the next generation number. When a response comes
//! back its generation is compared with the session's current one; a
//! mismatch means a newer submission (or a clear) happened meanwhile, and the
//! response is handed back to its caller without touching session state.

use std::sync::Arc;

use kalacal_api::PredictionService;
use kalacal_core::{Catalog, PatientInput, ResolvedModel, Validator};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ErrorKind, RequestError};
use crate::payload::{build_payload, BodyConvention};
use crate::result::ExplanationResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum ExplanationState {
    Idle,
    Submitting { model: ResolvedModel },
    Succeeded(ExplanationResult),
    Failed(RequestError),
}

impl ExplanationState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Submitting { .. })
    }

    pub fn result(&self) -> Option<&ExplanationResult> {
        match self {
            Self::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&RequestError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// The input and model of the most recent submission, kept for retry.
#[derive(Debug, Clone)]
struct Submission {
    input: PatientInput,
    model: Option<String>,
}

struct Inner {
    state: ExplanationState,
    last: Option<Submission>,
    generation: u64,
    consecutive_internal_errors: u32,
}

/// One screen's explanation workflow.
pub struct ExplanationSession {
    catalog: Arc<Catalog>,
    service: Arc<dyn PredictionService>,
    convention: BodyConvention,
    inner: Mutex<Inner>,
}

impl ExplanationSession {
    pub fn new(catalog: Arc<Catalog>, service: Arc<dyn PredictionService>) -> Self {
        Self {
            catalog,
            service,
            convention: BodyConvention::default(),
            inner: Mutex::new(Inner {
                state: ExplanationState::Idle,
                last: None,
                generation: 0,
                consecutive_internal_errors: 0,
            }),
        }
    }

    pub fn with_convention(mut self, convention: BodyConvention) -> Self {
        self.convention = convention;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Validate, send and record one explanation request.
    ///
    /// With `model_key` the input is checked against that model and only its
    /// features are sent. Without it the server picks the model and only the
    /// catalog's base fields are required.
    pub async fn generate_explanation(
        &self,
        input: PatientInput,
        model_key: Option<&str>,
    ) -> Result<ExplanationResult, RequestError> {
        let resolved = model_key.map_or(ResolvedModel::AutoDetected, |k| ResolvedModel::Explicit(k.to_string()));

        let generation = {
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            inner.state = ExplanationState::Submitting {
                model: resolved.clone(),
            };
            inner.last = Some(Submission {
                input: input.clone(),
                model: model_key.map(str::to_string),
            });
            inner.generation
        };

        info!(model = %resolved, generation, "generating explanation");
        let outcome = self.submit(&input, model_key, resolved).await;
        self.finish(generation, outcome).await
    }

    /// Resend the last submission. `None` if nothing has been submitted
    /// since the session was created or cleared.
    pub async fn retry_explanation(&self) -> Option<Result<ExplanationResult, RequestError>> {
        let last = self.inner.lock().await.last.clone()?;
        info!(model = ?last.model, "retrying explanation");
        Some(self.generate_explanation(last.input, last.model.as_deref()).await)
    }

    /// Resend the last input against a different model. `None` when there is
    /// no stored input or `model_key` is already the current model.
    pub async fn switch_model(&self, model_key: &str) -> Option<Result<ExplanationResult, RequestError>> {
        let last = self.inner.lock().await.last.clone()?;
        if last.model.as_deref() == Some(model_key) {
            return None;
        }
        Some(self.generate_explanation(last.input, Some(model_key)).await)
    }

    /// Back to `Idle`, dropping the result, error and stored input.
    pub async fn clear_explanation(&self) {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        inner.state = ExplanationState::Idle;
        inner.last = None;
        inner.consecutive_internal_errors = 0;
        debug!(generation = inner.generation, "explanation cleared");
    }

    pub async fn state(&self) -> ExplanationState {
        self.inner.lock().await.state.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.inner.lock().await.state.is_loading()
    }

    pub async fn last_input(&self) -> Option<PatientInput> {
        self.inner.lock().await.last.as_ref().map(|s| s.input.clone())
    }

    /// Model of the last submission; `AutoDetected` when none was named.
    pub async fn current_model(&self) -> Option<ResolvedModel> {
        self.inner.lock().await.last.as_ref().map(|s| match &s.model {
            Some(id) => ResolvedModel::Explicit(id.clone()),
            None => ResolvedModel::AutoDetected,
        })
    }

    async fn submit(
        &self,
        input: &PatientInput,
        model_key: Option<&str>,
        resolved: ResolvedModel,
    ) -> Result<ExplanationResult, RequestError> {
        let validator = Validator::new(&self.catalog);
        let checked = match model_key {
            Some(key) => validator.check_model(input, key),
            None => validator.check_auto(input),
        };
        let validated = checked.map_err(|e| RequestError::from_input(e, model_key, input))?;

        let model_info = model_key.and_then(|key| self.catalog.get_model(key).ok()).cloned();
        let body = build_payload(&validated, self.convention);
        debug!(payload = %body, "prediction payload");

        match self.service.predict(body).await {
            Ok(response) => Ok(ExplanationResult::from_response(response, resolved, model_info)),
            Err(e) => Err(RequestError::from_api(&e, model_info.as_ref(), input)),
        }
    }

    async fn finish(
        &self,
        generation: u64,
        outcome: Result<ExplanationResult, RequestError>,
    ) -> Result<ExplanationResult, RequestError> {
        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            debug!(
                generation,
                current = inner.generation,
                "discarding response from superseded request"
            );
            return outcome;
        }

        match outcome {
            Ok(result) => {
                inner.consecutive_internal_errors = 0;
                info!(
                    model = %result.model,
                    predicted = result.predicted_value,
                    "explanation ready"
                );
                inner.state = ExplanationState::Succeeded(result.clone());
                Ok(result)
            }
            Err(mut err) => {
                if err.kind == ErrorKind::Server && err.status == Some(500) {
                    inner.consecutive_internal_errors += 1;
                    if inner.consecutive_internal_errors > 1 {
                        err.persistent = true;
                        err.message = format!(
                            "{} (failed {} times in a row)",
                            err.message, inner.consecutive_internal_errors
                        );
                    }
                } else {
                    inner.consecutive_internal_errors = 0;
                }
                warn!(kind = ?err.kind, status = ?err.status, message = %err.message, "explanation failed");
                inner.state = ExplanationState::Failed(err.clone());
                Err(err)
            }
        }
    }
}
