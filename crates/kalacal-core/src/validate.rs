//! Pre-flight checks on patient input.
//!
//! Every check here is pure: the same input against the same catalog always
//! produces the same [`ValidationResult`]. A successful check yields a
//! [`ValidatedInput`], which is the only thing a request payload can be built
//! from.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, ModelDescriptor, ResolvedModel};
use crate::error::InputError;
use crate::fields::{FieldDescriptor, FieldKind};
use crate::input::{PatientInput, PatientValue};

/// Field name → human-readable error. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationResult(BTreeMap<String, String>);

impl ValidationResult {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn record(&mut self, field: &str, message: String) {
        self.0.entry(field.to_string()).or_insert(message);
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.0.values().map(String::as_str).collect();
        f.write_str(&joined.join(", "))
    }
}

/// Patient input that passed validation, with values coerced to their
/// field types and restricted to what will be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedInput {
    model: ResolvedModel,
    values: Vec<(String, PatientValue)>,
}

impl ValidatedInput {
    pub fn model(&self) -> &ResolvedModel {
        &self.model
    }

    /// Coerced values in catalog (auto mode) or feature (explicit mode) order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &PatientValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, name: &str) -> Option<&PatientValue> {
        self.values.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub struct Validator<'a> {
    catalog: &'a Catalog,
}

impl<'a> Validator<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Check `input` against an explicit list of required fields.
    ///
    /// Every listed field must be present and well-typed. Catalog range rules
    /// apply to any field present in the input, listed or not.
    pub fn validate<S: AsRef<str>>(&self, input: &PatientInput, required: &[S]) -> ValidationResult {
        let mut errors = ValidationResult::default();

        for name in required {
            let name = name.as_ref();
            match self.catalog.field(name) {
                Some(field) => {
                    if let Some(message) = check_field(field, input.get(name), true) {
                        errors.record(name, message);
                    }
                }
                None => errors.record(name, format!("{name} is not a known field")),
            }
        }

        self.apply_rules(input, &mut errors);
        errors
    }

    pub fn validate_for_model(&self, input: &PatientInput, model: &ModelDescriptor) -> ValidationResult {
        self.validate(input, &model.features)
    }

    /// Check `input` for auto-detection: the catalog's base fields are
    /// required, every other catalog field is checked only when present.
    pub fn validate_auto(&self, input: &PatientInput) -> ValidationResult {
        let mut errors = self.validate(input, self.catalog.auto_required());

        for field in self.catalog.fields() {
            if errors.contains(&field.name) {
                continue;
            }
            if let Some(message) = check_field(field, input.get(&field.name), false) {
                errors.record(&field.name, message);
            }
        }
        errors
    }

    /// Resolve `model_id` and validate against its features.
    pub fn check_model(&self, input: &PatientInput, model_id: &str) -> Result<ValidatedInput, InputError> {
        let model = self
            .catalog
            .get_model(model_id)
            .map_err(|_| InputError::ModelNotFound(model_id.to_string()))?;

        let errors = self.validate_for_model(input, model);
        if !errors.is_empty() {
            tracing::debug!(model = model_id, errors = errors.len(), "patient input rejected");
            return Err(InputError::Invalid(errors));
        }

        let values = model
            .features
            .iter()
            .filter_map(|name| self.coerced(input, name))
            .collect();

        Ok(ValidatedInput {
            model: ResolvedModel::Explicit(model.id.clone()),
            values,
        })
    }

    /// Validate for auto-detection. Unknown keys are not carried forward.
    pub fn check_auto(&self, input: &PatientInput) -> Result<ValidatedInput, InputError> {
        let errors = self.validate_auto(input);
        if !errors.is_empty() {
            tracing::debug!(errors = errors.len(), "patient input rejected");
            return Err(InputError::Invalid(errors));
        }

        let values = self
            .catalog
            .fields()
            .iter()
            .filter_map(|field| self.coerced(input, &field.name))
            .collect();

        Ok(ValidatedInput {
            model: ResolvedModel::AutoDetected,
            values,
        })
    }

    fn coerced(&self, input: &PatientInput, name: &str) -> Option<(String, PatientValue)> {
        let field = self.catalog.field(name)?;
        let value = input.present(name)?;
        field.coerce(value).map(|v| (name.to_string(), v))
    }

    fn apply_rules(&self, input: &PatientInput, errors: &mut ValidationResult) {
        for rule in self.catalog.rules() {
            if errors.contains(&rule.field) {
                continue;
            }
            let Some(value) = input.present(&rule.field).and_then(PatientValue::as_number) else {
                continue;
            };
            if !rule.accepts(value) {
                errors.record(&rule.field, rule.message.clone());
            }
        }
    }
}

fn check_field(field: &FieldDescriptor, value: Option<&PatientValue>, required: bool) -> Option<String> {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return required.then(|| format!("{} is required", field.label));
    };

    match field.kind {
        FieldKind::Number => match value.as_number() {
            None => Some(format!("{} must be a valid number", field.label)),
            Some(n) if !field.in_bounds(n) => Some(field.bounds_message()),
            Some(_) => None,
        },
        FieldKind::Boolean => value
            .as_bool()
            .is_none()
            .then(|| format!("{} must be true or false", field.label)),
        FieldKind::Text => None,
    }
}
