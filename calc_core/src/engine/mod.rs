//! # Evaluation Engine
//!
//! A keystroke-driven calculator with immediate-execution semantics: a
//! pending operator is resolved as soon as the next operator arrives, left
//! to right, with no precedence (`2 + 3 × 4` is `20`).
//!
//! Every operation is a pure transition `(&CalculatorState, input) ->
//! CalculatorState`. The [`Engine`] itself only carries the mode it was
//! built for, so the same transitions can be driven from a UI, the CLI, or a
//! test harness.
//!
//! ## Example
//!
//! ```rust
//! use calc_core::engine::{CalculatorMode, CalculatorState, Engine, KeyInput};
//!
//! let engine = Engine::new(CalculatorMode::Standard);
//! let state = engine.evaluate(
//!     &CalculatorState::new(),
//!     KeyInput::parse_sequence(&["7", "+", "3", "="]).unwrap(),
//! );
//!
//! assert_eq!(state.display_value, "10");
//! assert!(state.expression.contains("7 + 3 = 10"));
//! ```
//!
//! ## Error Recovery
//!
//! While an error is set, only digits, clears and the angle toggle have an
//! effect. A digit starts a brand-new entry.

pub mod operators;
pub mod state;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::numeric::format_number;

pub use operators::{BinaryOperator, ScientificFunction};
pub use state::{CalculatorState, EngineError};

use state::{parse_operand, ZERO};

/// Maximum characters of a keystroke-built entry.
pub const MAX_ENTRY_LEN: usize = 15;

/// Which keypad the engine serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CalculatorMode {
    #[default]
    Standard,
    Scientific,
}

/// A single key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "key", content = "value")]
pub enum KeyInput {
    Digit(char),
    Decimal,
    Operator(BinaryOperator),
    Equals,
    SignChange,
    Backspace,
    ClearAll,
    ClearEntry,
    Scientific(ScientificFunction),
    ToggleAngleMode,
}

impl KeyInput {
    /// Parse a list of tokens, expanding numbers into one press per
    /// character (`"12.5"` becomes `1`, `2`, `.`, `5`).
    pub fn parse_sequence<S: AsRef<str>>(tokens: &[S]) -> CalcResult<Vec<KeyInput>> {
        let mut keys = Vec::new();
        for token in tokens {
            let token = token.as_ref().trim();
            if token.is_empty() {
                continue;
            }
            if token.len() > 1 && token.chars().all(|c| c.is_ascii_digit() || c == '.') {
                keys.extend(token.chars().map(|c| {
                    if c == '.' {
                        KeyInput::Decimal
                    } else {
                        KeyInput::Digit(c)
                    }
                }));
            } else {
                keys.push(token.parse()?);
            }
        }
        Ok(keys)
    }
}

impl FromStr for KeyInput {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        let mut chars = token.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_ascii_digit() {
                return Ok(KeyInput::Digit(c));
            }
        }

        match token.to_lowercase().as_str() {
            "." => return Ok(KeyInput::Decimal),
            "=" => return Ok(KeyInput::Equals),
            "±" | "+/-" | "neg" => return Ok(KeyInput::SignChange),
            "⌫" | "bs" | "back" => return Ok(KeyInput::Backspace),
            "ac" | "c" => return Ok(KeyInput::ClearAll),
            "ce" => return Ok(KeyInput::ClearEntry),
            "rad" | "deg" | "mode" => return Ok(KeyInput::ToggleAngleMode),
            _ => {}
        }

        if let Ok(op) = token.parse::<BinaryOperator>() {
            return Ok(KeyInput::Operator(op));
        }
        if let Ok(func) = token.to_lowercase().parse::<ScientificFunction>() {
            return Ok(KeyInput::Scientific(func));
        }

        Err(CalcError::invalid_input("key", token, "Unrecognized key"))
    }
}

/// The calculator's transition functions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Engine {
    mode: CalculatorMode,
}

impl Engine {
    pub fn new(mode: CalculatorMode) -> Self {
        Engine { mode }
    }

    pub fn mode(&self) -> CalculatorMode {
        self.mode
    }

    /// Apply one key press.
    pub fn apply(&self, state: &CalculatorState, input: KeyInput) -> CalculatorState {
        match input {
            KeyInput::Digit(d) => self.digit(state, d),
            KeyInput::Decimal => self.decimal(state),
            KeyInput::Operator(op) => self.operator(state, op),
            KeyInput::Equals => self.equals(state),
            KeyInput::SignChange => self.sign_change(state),
            KeyInput::Backspace => self.backspace(state),
            KeyInput::ClearAll => self.clear_all(state),
            KeyInput::ClearEntry => self.clear_entry(state),
            KeyInput::Scientific(func) => self.scientific(state, func),
            KeyInput::ToggleAngleMode => self.toggle_angle_mode(state),
        }
    }

    /// Apply a sequence of key presses, returning the final state.
    pub fn evaluate<I>(&self, state: &CalculatorState, inputs: I) -> CalculatorState
    where
        I: IntoIterator<Item = KeyInput>,
    {
        inputs
            .into_iter()
            .fold(state.clone(), |current, input| self.apply(&current, input))
    }

    /// Enter a digit.
    ///
    /// Replaces a `"0"` display or an awaited operand, appends otherwise.
    /// After an error, starts a fresh entry. Non-digit characters are ignored.
    pub fn digit(&self, state: &CalculatorState, digit: char) -> CalculatorState {
        if !digit.is_ascii_digit() {
            return state.clone();
        }
        let d = digit.to_string();

        if state.is_error() {
            return CalculatorState {
                display_value: d.clone(),
                expression: d,
                is_radians: state.is_radians,
                ..CalculatorState::new()
            };
        }

        let entry = if state.display_value == ZERO || state.awaiting_operand {
            d
        } else {
            format!("{}{}", state.display_value, d)
        };

        let mut next = state.clone();
        next.display_value = truncate_entry(&entry);
        next.awaiting_operand = false;
        if !state.has_pending_operation() {
            next.expression = next.display_value.clone();
        }
        next
    }

    /// Enter a decimal point. No-op if the entry already has one.
    pub fn decimal(&self, state: &CalculatorState) -> CalculatorState {
        if state.is_error() {
            return state.clone();
        }

        let entry = if state.awaiting_operand {
            format!("{}.", ZERO)
        } else if state.display_value.contains('.') {
            return state.clone();
        } else {
            format!("{}.", state.display_value)
        };

        let mut next = state.clone();
        next.display_value = truncate_entry(&entry);
        next.awaiting_operand = false;
        if !state.has_pending_operation() {
            next.expression = next.display_value.clone();
        }
        next
    }

    /// Arm a binary operator, first resolving a pending one if a new
    /// operand has been entered since.
    pub fn operator(&self, state: &CalculatorState, op: BinaryOperator) -> CalculatorState {
        if state.is_error() {
            return state.clone();
        }

        let mut next = state.clone();
        next.operator = Some(op);
        next.awaiting_operand = true;

        match (&state.previous_value, state.operator) {
            (Some(previous), Some(pending)) if !state.awaiting_operand => {
                let lhs = parse_operand(previous);
                let rhs = state.display_number();
                match pending.apply(lhs, rhs) {
                    Ok(result) => {
                        let text = format_number(result);
                        next.expression = format!("{}{} {} ", state.expression, state.display_value, op);
                        next.display_value = text.clone();
                        next.previous_value = Some(text);
                    }
                    Err(err) => return state.with_error(err),
                }
            }
            _ => {
                next.expression = format!("{} {} ", state.display_value, op);
                next.previous_value = Some(state.display_value.clone());
            }
        }
        next
    }

    /// Resolve the pending operation. No-op without one.
    pub fn equals(&self, state: &CalculatorState) -> CalculatorState {
        if state.is_error() {
            return state.clone();
        }

        let (previous, pending) = match (&state.previous_value, state.operator) {
            (Some(previous), Some(pending)) => (previous, pending),
            _ => return state.clone(),
        };

        match pending.apply(parse_operand(previous), state.display_number()) {
            Ok(result) => {
                let text = format_number(result);
                CalculatorState {
                    expression: format!("{}{} = {}", state.expression, state.display_value, text),
                    display_value: text,
                    previous_value: None,
                    operator: None,
                    error: None,
                    awaiting_operand: false,
                    ..state.clone()
                }
            }
            Err(err) => state.with_error(err),
        }
    }

    /// Negate the display value.
    pub fn sign_change(&self, state: &CalculatorState) -> CalculatorState {
        if state.is_error() {
            return state.clone();
        }
        let negated = state.display_number() * -1.0;
        if negated.is_nan() {
            return state.clone();
        }

        let mut next = state.clone();
        next.display_value = format_number(negated);
        next.awaiting_operand = false;
        if !state.has_pending_operation() {
            next.expression = next.display_value.clone();
        }
        next
    }

    /// Remove the last character, collapsing to `"0"` when nothing (or only
    /// a minus sign) would remain.
    pub fn backspace(&self, state: &CalculatorState) -> CalculatorState {
        if state.is_error() {
            return state.clone();
        }

        let display = &state.display_value;
        let len = display.chars().count();
        let remaining = if len <= 1 || (display.starts_with('-') && len == 2) {
            ZERO.to_string()
        } else {
            let mut trimmed = display.clone();
            trimmed.pop();
            trimmed
        };

        let mut next = state.clone();
        next.display_value = remaining;
        next.awaiting_operand = false;
        if !state.has_pending_operation() {
            next.expression = next.display_value.clone();
        }
        next
    }

    /// Reset everything, including the angle mode.
    pub fn clear_all(&self, _state: &CalculatorState) -> CalculatorState {
        CalculatorState::new()
    }

    /// Clear the current entry and any error, keeping the pending operation.
    pub fn clear_entry(&self, state: &CalculatorState) -> CalculatorState {
        CalculatorState {
            display_value: ZERO.to_string(),
            error: None,
            awaiting_operand: false,
            ..state.clone()
        }
    }

    /// Apply a unary function to the display value.
    ///
    /// The result finalizes the entry: any pending operator is discarded.
    pub fn scientific(&self, state: &CalculatorState, func: ScientificFunction) -> CalculatorState {
        if state.is_error() {
            return state.clone();
        }

        let value = state.display_number();
        let result = func.evaluate(value, state.is_radians);
        let label = func.expression_label(value);

        if !result.is_finite() {
            let mut failed = state.with_error(EngineError::InvalidOperation);
            failed.expression = append_trace(&state.expression, &format!("{} = Error", label));
            return failed;
        }

        let text = format_number(result);
        CalculatorState {
            expression: append_trace(&state.expression, &format!("{} = {}", label, text)),
            display_value: text,
            previous_value: None,
            operator: None,
            awaiting_operand: false,
            ..state.clone()
        }
    }

    /// Flip between radians and degrees. Standard-mode engines ignore it.
    pub fn toggle_angle_mode(&self, state: &CalculatorState) -> CalculatorState {
        match self.mode {
            CalculatorMode::Scientific => CalculatorState {
                is_radians: !state.is_radians,
                ..state.clone()
            },
            CalculatorMode::Standard => state.clone(),
        }
    }
}

/// Cap an entry at [`MAX_ENTRY_LEN`] characters.
fn truncate_entry(entry: &str) -> String {
    entry.chars().take(MAX_ENTRY_LEN).collect()
}

fn append_trace(expression: &str, step: &str) -> String {
    if expression.is_empty() {
        step.to_string()
    } else {
        format!("{} {}", expression, step)
    }
}
