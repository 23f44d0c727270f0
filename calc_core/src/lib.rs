//! # calc_core - FluxCalc Calculation Engine
//!
//! `calc_core` holds everything FluxCalc computes: the keypad calculator, the
//! unit converter and the currency converter, plus the two collaborators the
//! currency screen depends on (an exchange-rate service and an AI assistant).
//! All state is JSON-serializable so a front end can persist or inspect it.
//!
//! ## Design Philosophy
//!
//! - **Pure transitions**: every input returns a new state, nothing is mutated
//! - **JSON-First**: all state types implement Serialize/Deserialize
//! - **Rich Errors**: structured error types, not just strings
//! - **Replaceable collaborators**: the rate service sits behind a trait
//!
//! ## Quick Start
//!
//! ```rust
//! use calc_core::engine::{CalculatorMode, CalculatorState, Engine, KeyInput};
//!
//! let engine = Engine::new(CalculatorMode::Standard);
//! let keys = KeyInput::parse_sequence(&["12", "+", "30", "="]).unwrap();
//! let state = engine.evaluate(&CalculatorState::new(), keys);
//!
//! assert_eq!(state.display_value, "42");
//! assert_eq!(state.expression, "12 + 30 = 42");
//! ```
//!
//! ## Modules
//!
//! - [`engine`] - Calculator state machine (standard and scientific keypads)
//! - [`units`] - Unit categories and the unit converter
//! - [`currency`] - Currency converter and the exchange-rate client
//! - [`ai`] - Gemini-backed currency question answering
//! - [`numeric`] - Rounding and number formatting shared by the above
//! - [`config`] - Collaborator settings from the environment
//! - [`errors`] - Structured error types

pub mod ai;
pub mod config;
pub mod currency;
pub mod engine;
pub mod errors;
pub mod numeric;
pub mod units;

// Re-export commonly used types at crate root for convenience
pub use ai::GeminiClient;
pub use config::AppConfig;
pub use currency::{CurrencyConverter, HttpRateSource, RateSource};
pub use engine::{CalculatorMode, CalculatorState, Engine, KeyInput};
pub use errors::{CalcError, CalcResult};
pub use units::UnitConverter;
