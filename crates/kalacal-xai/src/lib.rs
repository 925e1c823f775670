//! kalacal-xai
//!
//! Orchestrates SHAP explanation requests: validates patient input against
//! the catalog, builds the request body, calls the prediction service and
//! tracks the request life cycle for the UI.
//!
//! Public API:
//! - `ExplanationSession::generate_explanation()`: validate → payload → predict
//! - `ExplanationSession::retry_explanation()`: resend the last submission
//! - `ExplanationSession::switch_model()`: resend the last input to another model
//! - `ExplanationSession::clear_explanation()`: back to idle
//! - `build_payload()`: the request body, for either body convention

pub mod error;
pub mod payload;
pub mod result;
pub mod session;

pub use crate::error::{ErrorKind, RequestError};
pub use crate::payload::{build_payload, BodyConvention, NAMESPACE_KEY};
pub use crate::result::ExplanationResult;
pub use crate::session::{ExplanationSession, ExplanationState};
