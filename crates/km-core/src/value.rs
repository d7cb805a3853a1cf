//! Value, Quantity and Facet: the smallest pieces of the knowledge model.

use serde::{Deserialize, Serialize};

/// An amount paired with its unit, e.g. `(4.0, "kg")`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub amount: f64,
    pub units: String,
}

/// A tagged union over the primitive knowledge values.
///
/// Untagged so the wire representation is a plain JSON string, number,
/// boolean, or quantity object, matching the `Value` shape in spec.md §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Number(f64),
    Boolean(bool),
    Quantity(Quantity),
}

impl Value {
    /// Renders the value as a display string, used when indexing
    /// `facet.value` as a property-index key (see `km-index::property`).
    pub fn as_display_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Quantity(q) => format!("{} {}", q.amount, q.units),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// A name/value property of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facet {
    pub name: String,
    pub value: Value,
}
