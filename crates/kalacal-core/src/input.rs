use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CatalogError;

/// A single raw value as entered on a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatientValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl PatientValue {
    /// Parse free text the way a form field would hand it over:
    /// `true`/`false` become booleans, numeric text becomes a number.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        match trimmed {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => match trimmed.parse::<f64>() {
                Ok(n) if n.is_finite() => Self::Number(n),
                _ => Self::Text(text.to_string()),
            },
        }
    }

    /// Blank text counts as "not provided".
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().is_empty())
    }

    /// Numeric coercion. Booleans and non-finite values are not numbers.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<bool> for PatientValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for PatientValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for PatientValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for PatientValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PatientValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Field name → raw value for one submission.
///
/// JSON `null` entries are dropped on deserialization, so a null field reads
/// as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PatientInput(BTreeMap<String, PatientValue>);

impl<'de> Deserialize<'de> for PatientInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Option<PatientValue>>::deserialize(deserializer)?;
        Ok(Self(
            raw.into_iter()
                .filter_map(|(name, value)| Some((name, value?)))
                .collect(),
        ))
    }
}

impl PatientInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<PatientValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PatientValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<PatientValue> {
        self.0.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&PatientValue> {
        self.0.get(name)
    }

    /// The value for `name`, unless it is missing or blank.
    pub fn present(&self, name: &str) -> Option<&PatientValue> {
        self.0.get(name).filter(|v| !v.is_empty())
    }

    pub fn is_present(&self, name: &str) -> bool {
        self.present(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PatientValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Split a `name=value` assignment, e.g. `peso=65.5`.
    pub fn parse_assignment(text: &str) -> Result<(String, PatientValue), CatalogError> {
        match text.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                Ok((name.trim().to_string(), PatientValue::parse(value)))
            }
            _ => Err(CatalogError::InvalidAssignment(text.to_string())),
        }
    }

    pub fn from_assignments<I, S>(assignments: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut input = Self::new();
        for assignment in assignments {
            let (name, value) = Self::parse_assignment(assignment.as_ref())?;
            input.insert(name, value);
        }
        Ok(input)
    }
}

impl<K: Into<String>, V: Into<PatientValue>> FromIterator<(K, V)> for PatientInput {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
