//! Evaluated cell values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of an in-band evaluation error.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum FormulaError {
    /// A formula names a position outside the grid.
    Ref,
    /// A referenced text cell does not hold a number.
    Value,
    /// Division by zero or a non-finite result.
    Arithm,
}

impl FormulaError {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormulaError::Ref => "#REF!",
            FormulaError::Value => "#VALUE!",
            FormulaError::Arithm => "#ARITHM!",
        }
    }
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value a cell evaluates to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    Number(f64),
    Text(String),
    Error(FormulaError),
}

impl Value {
    pub fn empty() -> Value {
        Value::Text(String::new())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<FormulaError> for Value {
    fn from(e: FormulaError) -> Self {
        Value::Error(e)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Text(s) => f.write_str(s),
            Value::Error(e) => f.write_str(e.as_str()),
        }
    }
}

/// Format a number for display (shortest representation that round-trips).
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        // Avoid printing "-0".
        "0".to_string()
    } else {
        n.to_string()
    }
}
