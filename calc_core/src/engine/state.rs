//! Calculator state snapshot and the in-state error labels.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::operators::BinaryOperator;
use crate::numeric;

/// Text shown in place of a value while an error is set.
pub const ERROR_DISPLAY: &str = "Error";

/// Initial display value.
pub const ZERO: &str = "0";

/// Arithmetic failure recorded in the calculator state.
///
/// Serialized as its short user-facing label.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineError {
    /// Division (or remainder) by zero
    #[error("Div by Zero")]
    #[serde(rename = "Div by Zero")]
    DivideByZero,

    /// Domain error or a non-finite result
    #[error("Invalid Op")]
    #[serde(rename = "Invalid Op")]
    InvalidOperation,
}

impl EngineError {
    /// Short label shown on the display
    pub fn label(&self) -> &'static str {
        match self {
            EngineError::DivideByZero => "Div by Zero",
            EngineError::InvalidOperation => "Invalid Op",
        }
    }
}

/// Complete calculator state.
///
/// Snapshots are never mutated in place by the engine: every operation
/// returns a new value, so a caller simply re-reads the state it gets back.
///
/// Invariants:
/// - `operator.is_some() == previous_value.is_some()`
/// - `error.is_some()` implies `display_value == "Error"`
///
/// ## JSON Example
///
/// ```json
/// {
///   "display_value": "3",
///   "previous_value": "7",
///   "operator": "+",
///   "expression": "7 + ",
///   "error": null,
///   "is_radians": true,
///   "awaiting_operand": false
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatorState {
    /// Current entry or result, as text
    pub display_value: String,

    /// Left operand captured when an operator was pressed
    pub previous_value: Option<String>,

    /// Pending binary operator
    pub operator: Option<BinaryOperator>,

    /// Human-readable trace of the session
    pub expression: String,

    /// Set exactly when the last operation failed
    pub error: Option<EngineError>,

    /// Angle unit for trigonometric functions
    pub is_radians: bool,

    /// An operator was just armed and no operand key has arrived yet
    #[serde(default)]
    pub awaiting_operand: bool,
}

impl CalculatorState {
    /// Fresh state: display "0", nothing pending, radians.
    pub fn new() -> Self {
        CalculatorState {
            display_value: ZERO.to_string(),
            previous_value: None,
            operator: None,
            expression: String::new(),
            error: None,
            is_radians: true,
            awaiting_operand: false,
        }
    }

    /// Whether a binary operation is waiting for its right operand.
    pub fn has_pending_operation(&self) -> bool {
        self.operator.is_some() && self.previous_value.is_some()
    }

    /// Whether the last operation failed.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Text for the main display line.
    ///
    /// Shows the error label while an error is set; long values switch to
    /// exponential form.
    pub fn display_text(&self) -> String {
        match self.error {
            Some(err) => err.label().to_string(),
            None => numeric::display_text(&self.display_value),
        }
    }

    /// "Rad" or "Deg", as shown on the angle-mode key.
    pub fn angle_mode_label(&self) -> &'static str {
        if self.is_radians {
            "Rad"
        } else {
            "Deg"
        }
    }

    /// Numeric value of the display. Text that does not parse yields NaN,
    /// which every operation turns into an `InvalidOperation`.
    pub fn display_number(&self) -> f64 {
        parse_operand(&self.display_value)
    }

    /// Copy of this state in the error condition.
    pub(crate) fn with_error(&self, error: EngineError) -> Self {
        CalculatorState {
            display_value: ERROR_DISPLAY.to_string(),
            error: Some(error),
            awaiting_operand: false,
            ..self.clone()
        }
    }
}

impl Default for CalculatorState {
    fn default() -> Self {
        CalculatorState::new()
    }
}

/// Parse stored operand text.
pub(crate) fn parse_operand(text: &str) -> f64 {
    text.trim().parse().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = CalculatorState::new();
        assert_eq!(state.display_value, "0");
        assert!(state.previous_value.is_none());
        assert!(state.operator.is_none());
        assert!(state.expression.is_empty());
        assert!(state.error.is_none());
        assert!(state.is_radians);
        assert_eq!(state.angle_mode_label(), "Rad");
    }

    #[test]
    fn test_error_display() {
        let state = CalculatorState::new().with_error(EngineError::DivideByZero);
        assert_eq!(state.display_value, "Error");
        assert_eq!(state.display_text(), "Div by Zero");
    }

    #[test]
    fn test_error_serializes_as_label() {
        let state = CalculatorState::new().with_error(EngineError::InvalidOperation);
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"error\":\"Invalid Op\""));
    }

    #[test]
    fn test_parse_operand() {
        assert_eq!(parse_operand("7."), 7.0);
        assert_eq!(parse_operand("-0.5"), -0.5);
        assert!(parse_operand("Error").is_nan());
    }
}
