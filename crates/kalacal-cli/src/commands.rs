use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use kalacal_api::{is_healthy, HttpPredictionService, PredictionService};
use kalacal_core::{Catalog, PatientInput, Validator};
use kalacal_xai::{ErrorKind, ExplanationResult, ExplanationSession, RequestError};

use crate::config::{api_settings, KalacalConfig};

pub fn render_models(catalog: &Catalog) -> String {
    let mut out = String::new();
    for model in catalog.list_models() {
        let marker = if model.recommended { " (recommended)" } else { "" };
        let _ = writeln!(out, "{}  {}{marker}", model.id, model.name);
        let _ = writeln!(out, "    {}", model.description);
        let _ = writeln!(out, "    error: {:.1}%  features: {}", model.error_rate, model.features.join(", "));
    }
    out
}

pub fn render_fields(catalog: &Catalog) -> String {
    let mut out = String::new();
    for field in catalog.fields() {
        let bounds = match (field.min, field.max) {
            (Some(min), Some(max)) => format!(" [{min}, {max}]"),
            _ => String::new(),
        };
        let required = if field.required { "required" } else { "optional" };
        let _ = writeln!(out, "{}  {} ({required}){bounds}", field.name, field.label);
        if !field.helper.is_empty() {
            let _ = writeln!(out, "    {}", field.helper);
        }
    }
    out
}

/// Patient values next to their labels, in catalog order.
pub fn render_input(catalog: &Catalog, input: &PatientInput) -> String {
    let mut out = String::new();
    for field in catalog.fields() {
        let shown = field.display(input.get(&field.name));
        if !shown.is_empty() {
            let _ = writeln!(out, "{}: {shown}", field.label);
        }
    }
    out
}

/// Outcome of a local check. `Ok` carries the success line.
pub fn render_validation(
    catalog: &Catalog,
    input: &PatientInput,
    model: Option<&str>,
) -> Result<String, String> {
    let validator = Validator::new(catalog);
    let checked = match model {
        Some(id) => validator.check_model(input, id),
        None => validator.check_auto(input),
    };
    match checked {
        Ok(validated) => Ok(format!(
            "valid for {} ({} fields)",
            validated.model(),
            validated.len()
        )),
        Err(kalacal_core::InputError::ModelNotFound(id)) => Err(format!("unknown model: {id}")),
        Err(kalacal_core::InputError::Invalid(errors)) => {
            let mut out = String::new();
            for (field, message) in errors.iter() {
                let _ = writeln!(out, "{field}: {message}");
            }
            Err(out)
        }
    }
}

pub fn render_result(result: &ExplanationResult) -> String {
    let mut out = String::new();
    let model = result
        .model_info
        .as_ref()
        .map_or_else(|| result.model.to_string(), |m| m.name.clone());
    let _ = writeln!(out, "model: {model}");
    let _ = writeln!(out, "prediction: {}", result.summary());
    if let Some(approach) = &result.approach {
        let _ = writeln!(out, "approach: {approach}");
    }
    if !result.variables.is_empty() {
        let _ = writeln!(out, "variables: {}", result.variables.join(", "));
    }
    if let Some(total) = result.total_features {
        let _ = writeln!(out, "features used: {total}");
    }
    out
}

/// Error banner. Validation failures also list models the input already
/// satisfies.
pub fn render_error(catalog: &Catalog, err: &RequestError) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}: {}", err.kind.title(), err.message);
    for (field, message) in err.field_errors.iter() {
        let _ = writeln!(out, "  {field}: {message}");
    }

    if err.kind == ErrorKind::Validation
        && let Some(data) = &err.data
    {
        let suggestions: Vec<&str> = catalog
            .suggest_models(data)
            .into_iter()
            .map(|m| m.id.as_str())
            .collect();
        if !suggestions.is_empty() {
            let _ = writeln!(out, "models that accept this input: {}", suggestions.join(", "));
        }
    }
    if err.kind.is_retryable() {
        let _ = writeln!(out, "this request can be retried");
    }
    out
}

pub async fn run_health(config: &KalacalConfig) -> bool {
    let service = HttpPredictionService::new(api_settings(config));
    is_healthy(&service).await
}

/// Run one explanation. `Ok(false)` once a failed request's banner has been
/// printed; `Err` only for local failures such as writing the chart.
pub async fn run_explain(
    config: &KalacalConfig,
    catalog: Catalog,
    input: PatientInput,
    model: Option<&str>,
    chart_path: Option<&Path>,
) -> eyre::Result<bool> {
    let service: Arc<dyn PredictionService> = Arc::new(HttpPredictionService::new(api_settings(config)));
    let session = ExplanationSession::new(Arc::new(catalog), service).with_convention(config.body_convention);

    print!("{}", render_input(session.catalog(), &input));
    match session.generate_explanation(input, model).await {
        Ok(result) => {
            print!("{}", render_result(&result));
            if let Some(path) = chart_path {
                let bytes = result.chart.decode()?;
                std::fs::write(path, &bytes)?;
                tracing::info!(
                    path = %path.display(),
                    bytes = bytes.len(),
                    mime = result.chart.mime_type(),
                    "chart written"
                );
            }
            Ok(true)
        }
        Err(err) => {
            eprint!("{}", render_error(session.catalog(), &err));
            Ok(false)
        }
    }
}
