use serde::{Deserialize, Serialize};

use crate::input::PatientValue;

/// The semantic type a form field collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Number,
    Boolean,
    #[serde(rename = "string")]
    Text,
}

/// One clinical input field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub helper: String,
}

impl FieldDescriptor {
    /// Inclusive bounds check. Missing bounds are open.
    pub fn in_bounds(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }

    /// Message for a value outside the declared bounds.
    pub fn bounds_message(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("{} must be between {min} and {max}", self.label),
            (Some(min), None) => format!("{} must be at least {min}", self.label),
            (None, Some(max)) => format!("{} must be at most {max}", self.label),
            (None, None) => format!("{} is out of range", self.label),
        }
    }

    /// Convert a raw value into the field's semantic type.
    ///
    /// Returns `None` when the value cannot be represented (numeric text that
    /// does not parse, a non-boolean for a boolean field).
    pub fn coerce(&self, value: &PatientValue) -> Option<PatientValue> {
        match self.kind {
            FieldKind::Number => value.as_number().map(PatientValue::Number),
            FieldKind::Boolean => value.as_bool().map(PatientValue::Bool),
            FieldKind::Text => Some(value.clone()),
        }
    }

    /// Render a value for display next to its label.
    pub fn display(&self, value: Option<&PatientValue>) -> String {
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            return String::new();
        };
        match self.kind {
            FieldKind::Boolean => {
                let truthy = match value {
                    PatientValue::Bool(b) => *b,
                    PatientValue::Number(n) => *n != 0.0,
                    PatientValue::Text(_) => true,
                };
                let label = if truthy { "Sim" } else { "Não" };
                label.to_string()
            }
            FieldKind::Number => match value.as_number() {
                Some(n) if self.step.is_some_and(|step| step < 1.0) => format!("{n:.1}"),
                Some(n) => n.to_string(),
                None => text_of(value),
            },
            FieldKind::Text => text_of(value),
        }
    }
}

fn text_of(value: &PatientValue) -> String {
    match value {
        PatientValue::Bool(b) => b.to_string(),
        PatientValue::Number(n) => n.to_string(),
        PatientValue::Text(s) => s.clone(),
    }
}

/// The Kala-Cal visceral leishmaniasis field table.
pub fn kala_cal_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor {
            name: "Idademeses".to_string(),
            label: "Idade (meses)".to_string(),
            kind: FieldKind::Number,
            min: Some(0.0),
            max: Some(1200.0),
            step: Some(1.0),
            required: true,
            placeholder: Some("Ex: 240 (20 anos)".to_string()),
            helper: "Idade do paciente em meses".to_string(),
        },
        boolean("edema", "Edema", true, "Presença de edema no paciente"),
        FieldDescriptor {
            name: "peso".to_string(),
            label: "Peso (kg)".to_string(),
            kind: FieldKind::Number,
            min: Some(0.1),
            max: Some(200.0),
            step: Some(0.1),
            required: true,
            placeholder: Some("Ex: 65.5".to_string()),
            helper: "Peso do paciente em quilogramas".to_string(),
        },
        boolean("aids", "AIDS", true, "Paciente portador de AIDS"),
        FieldDescriptor {
            name: "plaque".to_string(),
            label: "Plaque".to_string(),
            kind: FieldKind::Number,
            min: Some(0.0),
            max: Some(100.0),
            step: Some(0.1),
            required: false,
            placeholder: Some("Ex: 4.5".to_string()),
            helper: "Valor da medição de plaque".to_string(),
        },
    ]
}

fn boolean(name: &str, label: &str, required: bool, helper: &str) -> FieldDescriptor {
    FieldDescriptor {
        name: name.to_string(),
        label: label.to_string(),
        kind: FieldKind::Boolean,
        min: None,
        max: None,
        step: None,
        required,
        placeholder: None,
        helper: helper.to_string(),
    }
}
