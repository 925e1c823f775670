use kalacal_core::{PatientValue, ValidatedInput};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key the legacy convention nests patient fields under.
pub const NAMESPACE_KEY: &str = "pacienteDados";

/// Shape of the prediction request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyConvention {
    /// Fields at the top level; the server can auto-detect the model.
    #[default]
    TopLevel,
    /// Fields wrapped under [`NAMESPACE_KEY`].
    Namespaced,
}

/// Build the request body from validated input.
///
/// Booleans go out as 0/1, integral numbers as JSON integers.
pub fn build_payload(input: &ValidatedInput, convention: BodyConvention) -> Value {
    let fields: Map<String, Value> = input
        .values()
        .map(|(name, value)| (name.to_string(), wire_value(value)))
        .collect();

    match convention {
        BodyConvention::TopLevel => Value::Object(fields),
        BodyConvention::Namespaced => {
            let mut wrapper = Map::new();
            wrapper.insert(NAMESPACE_KEY.to_string(), Value::Object(fields));
            Value::Object(wrapper)
        }
    }
}

pub fn wire_value(value: &PatientValue) -> Value {
    match value {
        PatientValue::Bool(b) => Value::from(u8::from(*b)),
        PatientValue::Number(n) => number(*n),
        PatientValue::Text(s) => Value::String(s.clone()),
    }
}

fn number(n: f64) -> Value {
    // Integers only within the range f64 represents exactly.
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}
