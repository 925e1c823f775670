use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CatalogError;
use crate::fields::{kala_cal_fields, FieldDescriptor};
use crate::input::PatientInput;

/// Marker used in place of a model id when the server picks the model.
pub const AUTO_DETECTED: &str = "auto-detected";

/// A named predictive configuration and the fields it consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    /// RMSE reported for the model, in percentage points.
    pub error_rate: f64,
    pub features: Vec<String>,
    #[serde(default)]
    pub recommended: bool,
}

impl ModelDescriptor {
    pub fn requires(&self, field: &str) -> bool {
        self.features.iter().any(|f| f == field)
    }

    /// Features with no usable value in `input`, in declaration order.
    pub fn missing_fields<'a>(&'a self, input: &PatientInput) -> Vec<&'a str> {
        self.features
            .iter()
            .filter(|f| !input.is_present(f))
            .map(String::as_str)
            .collect()
    }

    pub fn is_satisfied_by(&self, input: &PatientInput) -> bool {
        self.features.iter().all(|f| input.is_present(f))
    }
}

/// A business range that applies to a field whenever it is present, on top
/// of the field's declared bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeRule {
    pub field: String,
    pub min: f64,
    pub max: f64,
    /// When set, `min` itself is rejected.
    #[serde(default)]
    pub exclusive_min: bool,
    pub message: String,
}

impl RangeRule {
    pub fn accepts(&self, value: f64) -> bool {
        let above_min = if self.exclusive_min {
            value > self.min
        } else {
            value >= self.min
        };
        above_min && value <= self.max
    }
}

/// Which model a request ran against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolvedModel {
    Explicit(String),
    AutoDetected,
}

impl ResolvedModel {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Explicit(id) => id,
            Self::AutoDetected => AUTO_DETECTED,
        }
    }

    pub fn model_id(&self) -> Option<&str> {
        match self {
            Self::Explicit(id) => Some(id),
            Self::AutoDetected => None,
        }
    }
}

impl fmt::Display for ResolvedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ResolvedModel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResolvedModel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(if raw == AUTO_DETECTED {
            Self::AutoDetected
        } else {
            Self::Explicit(raw)
        })
    }
}

/// Field table, model list and auto-detection rules, fixed for the life of
/// the process. Built once and handed to the validator and orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CatalogDef")]
pub struct Catalog {
    fields: Vec<FieldDescriptor>,
    models: Vec<ModelDescriptor>,
    auto_required: Vec<String>,
    rules: Vec<RangeRule>,
}

#[derive(Deserialize)]
struct CatalogDef {
    fields: Vec<FieldDescriptor>,
    models: Vec<ModelDescriptor>,
    auto_required: Vec<String>,
    #[serde(default)]
    rules: Vec<RangeRule>,
}

impl TryFrom<CatalogDef> for Catalog {
    type Error = CatalogError;

    fn try_from(def: CatalogDef) -> Result<Self, Self::Error> {
        Catalog::new(def.fields, def.models, def.auto_required, def.rules)
    }
}

impl Catalog {
    /// Build a catalog, checking that every model feature, base field and
    /// rule refers to a declared field and that names are unique.
    pub fn new(
        fields: Vec<FieldDescriptor>,
        models: Vec<ModelDescriptor>,
        auto_required: Vec<String>,
        rules: Vec<RangeRule>,
    ) -> Result<Self, CatalogError> {
        let mut names = HashSet::new();
        for field in &fields {
            if !names.insert(field.name.as_str()) {
                return Err(CatalogError::DuplicateField(field.name.clone()));
            }
        }

        let mut ids = HashSet::new();
        for model in &models {
            if !ids.insert(model.id.as_str()) {
                return Err(CatalogError::DuplicateModel(model.id.clone()));
            }
            if let Some(field) = model.features.iter().find(|f| !names.contains(f.as_str())) {
                return Err(CatalogError::UnknownField {
                    owner: format!("model '{}'", model.id),
                    field: field.clone(),
                });
            }
        }

        if let Some(field) = auto_required.iter().find(|f| !names.contains(f.as_str())) {
            return Err(CatalogError::UnknownField {
                owner: "auto-detection base fields".to_string(),
                field: field.clone(),
            });
        }

        if let Some(rule) = rules.iter().find(|r| !names.contains(r.field.as_str())) {
            return Err(CatalogError::UnknownField {
                owner: "range rule".to_string(),
                field: rule.field.clone(),
            });
        }

        Ok(Self {
            fields,
            models,
            auto_required,
            rules,
        })
    }

    /// The built-in Kala-Cal catalog: four models over five fields.
    pub fn kala_cal() -> Self {
        Self {
            fields: kala_cal_fields(),
            models: vec![
                model(
                    "aids",
                    "AIDS",
                    "Modelo especializado em predições relacionadas a AIDS",
                    18.0,
                    &["Idademeses", "edema", "peso", "aids"],
                ),
                model(
                    "clinicas",
                    "Clínicas",
                    "Modelo básico com variáveis clínicas essenciais",
                    19.8,
                    &["Idademeses", "edema", "peso"],
                ),
                ModelDescriptor {
                    recommended: true,
                    ..model(
                        "completa",
                        "Completa",
                        "Modelo mais abrangente com todas as variáveis",
                        16.7,
                        &["Idademeses", "edema", "peso", "aids", "plaque"],
                    )
                },
                model(
                    "plaque",
                    "Plaque",
                    "Modelo especializado em análise de plaque",
                    18.7,
                    &["Idademeses", "edema", "peso", "plaque"],
                ),
            ],
            auto_required: vec!["Idademeses".to_string(), "peso".to_string()],
            rules: vec![
                RangeRule {
                    field: "Idademeses".to_string(),
                    min: 0.0,
                    max: 1200.0,
                    exclusive_min: false,
                    message: "Idade must be between 0 and 1200 months".to_string(),
                },
                RangeRule {
                    field: "peso".to_string(),
                    min: 0.0,
                    max: 200.0,
                    exclusive_min: true,
                    message: "Peso must be between 0.1 and 200 kg".to_string(),
                },
                RangeRule {
                    field: "plaque".to_string(),
                    min: 0.0,
                    max: 100.0,
                    exclusive_min: false,
                    message: "Plaque must be between 0 and 100".to_string(),
                },
            ],
        }
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Models in catalog order.
    pub fn list_models(&self) -> &[ModelDescriptor] {
        &self.models
    }

    pub fn get_model(&self, id: &str) -> Result<&ModelDescriptor, CatalogError> {
        self.models
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| CatalogError::ModelNotFound(id.to_string()))
    }

    pub fn model_exists(&self, id: &str) -> bool {
        self.models.iter().any(|m| m.id == id)
    }

    pub fn recommended_model(&self) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.recommended)
    }

    /// Models whose features are all present in `input`.
    pub fn suggest_models(&self, input: &PatientInput) -> Vec<&ModelDescriptor> {
        self.models
            .iter()
            .filter(|m| m.is_satisfied_by(input))
            .collect()
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields that must be present when the server picks the model.
    pub fn auto_required(&self) -> &[String] {
        &self.auto_required
    }

    pub fn rules(&self) -> &[RangeRule] {
        &self.rules
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::kala_cal()
    }
}

fn model(id: &str, name: &str, description: &str, error_rate: f64, features: &[&str]) -> ModelDescriptor {
    ModelDescriptor {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        error_rate,
        features: features.iter().map(|f| f.to_string()).collect(),
        recommended: false,
    }
}
