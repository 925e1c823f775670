use thiserror::Error;

use crate::validate::ValidationResult;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("unknown field '{field}' referenced by {owner}")]
    UnknownField { owner: String, field: String },

    #[error("duplicate model id: {0}")]
    DuplicateModel(String),

    #[error("duplicate field: {0}")]
    DuplicateField(String),

    #[error("invalid assignment '{0}': expected name=value")]
    InvalidAssignment(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Why a patient input cannot be submitted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("model \"{0}\" not found")]
    ModelNotFound(String),

    #[error("invalid patient data: {0}")]
    Invalid(ValidationResult),
}
