use serde::{Deserialize, Serialize};

/// A user-entered numeric field. Form fields arrive either as numbers or as
/// raw text, and both are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Number(f64),
    Text(String),
}

impl InputValue {
    /// The finite numeric value of this field, or `None` for blank or
    /// unparsable text.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            InputValue::Number(n) => *n,
            InputValue::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for InputValue {
    fn from(value: f64) -> Self {
        InputValue::Number(value)
    }
}

impl From<&str> for InputValue {
    fn from(value: &str) -> Self {
        InputValue::Text(value.to_string())
    }
}

/// Reads a field, substituting `fallback` when it is missing, unparsable or zero.
pub fn coerce(input: Option<&InputValue>, fallback: f64) -> f64 {
    match input.and_then(InputValue::as_number) {
        Some(v) if v != 0.0 => v,
        _ => fallback,
    }
}
