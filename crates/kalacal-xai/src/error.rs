use kalacal_api::ApiError;
use kalacal_core::{InputError, ModelDescriptor, PatientInput, ValidationResult};
use serde::Serialize;
use thiserror::Error;

/// Where a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Rejected locally before any network traffic.
    Validation,
    /// Unknown model key; a caller or configuration bug.
    ModelNotFound,
    /// No response: refused, dropped or timed out.
    Network,
    /// The service answered with an error status.
    Server,
    Unknown,
}

impl ErrorKind {
    /// Banner title shown above the message.
    pub fn title(self) -> &'static str {
        match self {
            Self::Validation | Self::ModelNotFound => "Dados Inválidos",
            Self::Network => "Problema de Conexão",
            Self::Server => "Erro do Servidor",
            Self::Unknown => "Erro Inesperado",
        }
    }

    /// Whether resending the same input can succeed.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Server | Self::Unknown)
    }
}

/// A failed explanation request, ready to render.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{message}")]
pub struct RequestError {
    pub kind: ErrorKind,
    pub message: String,
    /// Model key the request was made for; `None` in auto-detection mode.
    pub model: Option<String>,
    /// The submitted input.
    pub data: Option<PatientInput>,
    /// HTTP status, for `Server` errors.
    pub status: Option<u16>,
    /// Per-field messages, for `Validation` errors.
    pub field_errors: ValidationResult,
    /// Set once the same server failure has repeated.
    pub persistent: bool,
}

impl RequestError {
    fn new(kind: ErrorKind, message: String, model: Option<&str>, data: &PatientInput) -> Self {
        Self {
            kind,
            message,
            model: model.map(str::to_string),
            data: Some(data.clone()),
            status: None,
            field_errors: ValidationResult::default(),
            persistent: false,
        }
    }

    pub(crate) fn from_input(err: InputError, model: Option<&str>, data: &PatientInput) -> Self {
        match err {
            InputError::ModelNotFound(id) => {
                Self::new(ErrorKind::ModelNotFound, format!("Model \"{id}\" not found"), model, data)
            }
            InputError::Invalid(errors) => {
                let message = match model {
                    Some(id) => format!("Required fields for {id}: {errors}"),
                    None => format!("Invalid patient data: {errors}"),
                };
                Self {
                    field_errors: errors,
                    ..Self::new(ErrorKind::Validation, message, model, data)
                }
            }
        }
    }

    pub(crate) fn from_api(err: &ApiError, model: Option<&ModelDescriptor>, data: &PatientInput) -> Self {
        let model_id = model.map(|m| m.id.as_str());
        let for_model = model.map(|m| format!(" for model {}", m.name)).unwrap_or_default();

        let (kind, message) = match err {
            ApiError::Timeout => (
                ErrorKind::Network,
                "Timeout: check your connection and try again".to_string(),
            ),
            ApiError::Connection(_) => (
                ErrorKind::Network,
                "Connection error. Check your internet connection.".to_string(),
            ),
            ApiError::Status { status, detail } => {
                let message = match status {
                    400 => format!(
                        "Invalid data{for_model}: {}",
                        detail.as_deref().unwrap_or("check the fields")
                    ),
                    401 => "Session expired. Log in again.".to_string(),
                    403 => "Invalid API key or access denied".to_string(),
                    404 => "Explainability endpoint not found".to_string(),
                    500 => {
                        let while_model = model
                            .map(|m| format!(" while processing model {}", m.name))
                            .unwrap_or_default();
                        format!("Internal failure{while_model}")
                    }
                    504 => "Timeout: SHAP generation exceeded the 60 second limit, try again".to_string(),
                    other => format!(
                        "Error {other}: {}",
                        detail.as_deref().unwrap_or("unknown error")
                    ),
                };
                (ErrorKind::Server, message)
            }
            ApiError::Decode(_) | ApiError::InvalidChart(_) | ApiError::Internal(_) => {
                tracing::error!(error = %err, "unexpected failure generating explanation");
                (
                    ErrorKind::Unknown,
                    "Unexpected error generating the explanation".to_string(),
                )
            }
        };

        Self {
            status: err.status(),
            ..Self::new(kind, message, model_id, data)
        }
    }
}
