//! kalacal-api
//!
//! Client for the remote Kala-Cal prediction service: the liveness probe and
//! the SHAP explanation endpoint. The service itself is opaque; this crate
//! only moves JSON over HTTP and classifies failures.

pub mod error;
pub mod http;
pub mod service;
pub mod wire;

pub use error::ApiError;
pub use http::{ApiSettings, HttpPredictionService};
pub use service::{is_healthy, BoxFuture, PredictionService};
pub use wire::{ChartImage, HealthResponse, PredictResponse};
