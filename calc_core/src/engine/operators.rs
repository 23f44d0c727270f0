//! Binary operators and scientific functions.
//!
//! Both accept their on-key symbol (`×`, `÷`, `√`, `x²`) as well as a plain
//! ASCII spelling so they can be typed from a terminal.

use std::f64::consts::{E, PI};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::state::EngineError;
use crate::errors::CalcError;
use crate::numeric::{format_number, round_result};

/// Factorials above this saturate to infinity.
pub const FACTORIAL_LIMIT: f64 = 1e100;

/// A binary operator, applied immediately (no precedence).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "×")]
    Multiply,
    #[serde(rename = "÷")]
    Divide,
    #[serde(rename = "^")]
    Power,
    #[serde(rename = "%")]
    Remainder,
}

impl BinaryOperator {
    pub const ALL: [BinaryOperator; 6] = [
        BinaryOperator::Add,
        BinaryOperator::Subtract,
        BinaryOperator::Multiply,
        BinaryOperator::Divide,
        BinaryOperator::Power,
        BinaryOperator::Remainder,
    ];

    /// Key symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "×",
            BinaryOperator::Divide => "÷",
            BinaryOperator::Power => "^",
            BinaryOperator::Remainder => "%",
        }
    }

    /// Apply the operator and round to result precision.
    ///
    /// A zero divisor for `÷` or `%` is `DivideByZero`; any other
    /// non-finite result is `InvalidOperation`.
    pub fn apply(&self, lhs: f64, rhs: f64) -> Result<f64, EngineError> {
        let raw = match self {
            BinaryOperator::Add => lhs + rhs,
            BinaryOperator::Subtract => lhs - rhs,
            BinaryOperator::Multiply => lhs * rhs,
            BinaryOperator::Divide => {
                if rhs == 0.0 {
                    return Err(EngineError::DivideByZero);
                }
                lhs / rhs
            }
            BinaryOperator::Power => lhs.powf(rhs),
            BinaryOperator::Remainder => {
                if rhs == 0.0 {
                    return Err(EngineError::DivideByZero);
                }
                lhs % rhs
            }
        };

        let rounded = round_result(raw);
        if rounded.is_finite() {
            Ok(rounded)
        } else {
            Err(EngineError::InvalidOperation)
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for BinaryOperator {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "+" => Ok(BinaryOperator::Add),
            "-" | "−" => Ok(BinaryOperator::Subtract),
            "×" | "*" | "x" => Ok(BinaryOperator::Multiply),
            "÷" | "/" => Ok(BinaryOperator::Divide),
            "^" | "xʸ" | "pow" => Ok(BinaryOperator::Power),
            "%" | "mod" => Ok(BinaryOperator::Remainder),
            other => Err(CalcError::invalid_input("operator", other, "Unknown operator")),
        }
    }
}

/// A unary scientific function (or constant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScientificFunction {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Ln,
    Log,
    Sqrt,
    Square,
    Cube,
    Reciprocal,
    Pi,
    E,
    Factorial,
}

impl ScientificFunction {
    pub const ALL: [ScientificFunction; 15] = [
        ScientificFunction::Sin,
        ScientificFunction::Cos,
        ScientificFunction::Tan,
        ScientificFunction::Asin,
        ScientificFunction::Acos,
        ScientificFunction::Atan,
        ScientificFunction::Ln,
        ScientificFunction::Log,
        ScientificFunction::Sqrt,
        ScientificFunction::Square,
        ScientificFunction::Cube,
        ScientificFunction::Reciprocal,
        ScientificFunction::Pi,
        ScientificFunction::E,
        ScientificFunction::Factorial,
    ];

    /// Key symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            ScientificFunction::Sin => "sin",
            ScientificFunction::Cos => "cos",
            ScientificFunction::Tan => "tan",
            ScientificFunction::Asin => "asin",
            ScientificFunction::Acos => "acos",
            ScientificFunction::Atan => "atan",
            ScientificFunction::Ln => "ln",
            ScientificFunction::Log => "log",
            ScientificFunction::Sqrt => "√",
            ScientificFunction::Square => "x²",
            ScientificFunction::Cube => "x³",
            ScientificFunction::Reciprocal => "1/x",
            ScientificFunction::Pi => "π",
            ScientificFunction::E => "e",
            ScientificFunction::Factorial => "!",
        }
    }

    /// Evaluate at `value`, rounded to result precision.
    ///
    /// Trig inputs are read in the given angle mode and inverse-trig outputs
    /// are returned in it. Domain violations return NaN; the caller treats
    /// any non-finite result as an error.
    pub fn evaluate(&self, value: f64, is_radians: bool) -> f64 {
        let to_radians = |v: f64| if is_radians { v } else { v * PI / 180.0 };
        let from_radians = |v: f64| if is_radians { v } else { v * 180.0 / PI };

        let raw = match self {
            ScientificFunction::Sin => to_radians(value).sin(),
            ScientificFunction::Cos => to_radians(value).cos(),
            ScientificFunction::Tan => to_radians(value).tan(),
            ScientificFunction::Asin => from_radians(value.asin()),
            ScientificFunction::Acos => from_radians(value.acos()),
            ScientificFunction::Atan => from_radians(value.atan()),
            ScientificFunction::Ln => {
                if value > 0.0 {
                    value.ln()
                } else {
                    f64::NAN
                }
            }
            ScientificFunction::Log => {
                if value > 0.0 {
                    value.log10()
                } else {
                    f64::NAN
                }
            }
            ScientificFunction::Sqrt => {
                if value >= 0.0 {
                    value.sqrt()
                } else {
                    f64::NAN
                }
            }
            ScientificFunction::Square => value * value,
            ScientificFunction::Cube => value * value * value,
            ScientificFunction::Reciprocal => {
                if value != 0.0 {
                    1.0 / value
                } else {
                    f64::NAN
                }
            }
            ScientificFunction::Pi => PI,
            ScientificFunction::E => E,
            ScientificFunction::Factorial => factorial(value),
        };

        round_result(raw)
    }

    /// Expression-trace label for an application to `value`,
    /// e.g. `sin(90)`, `sqr(3)`, `fact(5)`.
    pub fn expression_label(&self, value: f64) -> String {
        let v = format_number(value);
        match self {
            ScientificFunction::Square => format!("sqr({})", v),
            ScientificFunction::Cube => format!("cube({})", v),
            ScientificFunction::Reciprocal => format!("1/({})", v),
            ScientificFunction::Factorial => format!("fact({})", v),
            ScientificFunction::Pi => "π".to_string(),
            ScientificFunction::E => "e".to_string(),
            other => format!("{}({})", other.symbol(), v),
        }
    }
}

impl fmt::Display for ScientificFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for ScientificFunction {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "sin" => Ok(ScientificFunction::Sin),
            "cos" => Ok(ScientificFunction::Cos),
            "tan" => Ok(ScientificFunction::Tan),
            "asin" => Ok(ScientificFunction::Asin),
            "acos" => Ok(ScientificFunction::Acos),
            "atan" => Ok(ScientificFunction::Atan),
            "ln" => Ok(ScientificFunction::Ln),
            "log" => Ok(ScientificFunction::Log),
            "√" | "sqrt" => Ok(ScientificFunction::Sqrt),
            "x²" | "sq" | "sqr" => Ok(ScientificFunction::Square),
            "x³" | "cube" => Ok(ScientificFunction::Cube),
            "1/x" | "inv" => Ok(ScientificFunction::Reciprocal),
            "π" | "pi" => Ok(ScientificFunction::Pi),
            "e" => Ok(ScientificFunction::E),
            "!" | "x!" | "fact" => Ok(ScientificFunction::Factorial),
            other => Err(CalcError::invalid_input("function", other, "Unknown scientific function")),
        }
    }
}

/// n! for non-negative integers; NaN otherwise, infinity past the limit.
fn factorial(n: f64) -> f64 {
    if n < 0.0 || n.fract() != 0.0 {
        return f64::NAN;
    }
    let mut fact = 1.0_f64;
    let mut i = 2.0;
    while i <= n {
        fact *= i;
        if fact > FACTORIAL_LIMIT {
            return f64::INFINITY;
        }
        i += 1.0;
    }
    fact
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_apply() {
        assert_eq!(BinaryOperator::Add.apply(0.1, 0.2), Ok(0.3));
        assert_eq!(BinaryOperator::Subtract.apply(7.0, 10.0), Ok(-3.0));
        assert_eq!(BinaryOperator::Multiply.apply(1.1, 3.0), Ok(3.3));
        assert_eq!(BinaryOperator::Divide.apply(1.0, 3.0), Ok(0.3333333333));
        assert_eq!(BinaryOperator::Power.apply(2.0, 10.0), Ok(1024.0));
        assert_eq!(BinaryOperator::Remainder.apply(-7.0, 3.0), Ok(-1.0));
    }

    #[test]
    fn test_divide_by_zero() {
        assert_eq!(BinaryOperator::Divide.apply(5.0, 0.0), Err(EngineError::DivideByZero));
        assert_eq!(BinaryOperator::Remainder.apply(5.0, 0.0), Err(EngineError::DivideByZero));
    }

    #[test]
    fn test_overflow_is_invalid() {
        assert_eq!(BinaryOperator::Power.apply(10.0, 400.0), Err(EngineError::InvalidOperation));
        assert_eq!(BinaryOperator::Power.apply(-8.0, 0.5), Err(EngineError::InvalidOperation));
    }

    #[test]
    fn test_operator_parsing() {
        assert_eq!("×".parse::<BinaryOperator>().unwrap(), BinaryOperator::Multiply);
        assert_eq!("*".parse::<BinaryOperator>().unwrap(), BinaryOperator::Multiply);
        assert_eq!("/".parse::<BinaryOperator>().unwrap(), BinaryOperator::Divide);
        assert!("&".parse::<BinaryOperator>().is_err());
        for op in BinaryOperator::ALL {
            assert_eq!(op.symbol().parse::<BinaryOperator>().unwrap(), op);
        }
    }

    #[test]
    fn test_function_symbols_parse_back() {
        for func in ScientificFunction::ALL {
            assert_eq!(func.symbol().parse::<ScientificFunction>().unwrap(), func);
        }
    }

    #[test]
    fn test_trig_in_degrees() {
        assert_eq!(ScientificFunction::Sin.evaluate(90.0, false), 1.0);
        assert_eq!(ScientificFunction::Cos.evaluate(0.0, false), 1.0);
        assert_eq!(ScientificFunction::Asin.evaluate(1.0, false), 90.0);
        assert_eq!(ScientificFunction::Atan.evaluate(1.0, false), 45.0);
    }

    #[test]
    fn test_trig_in_radians() {
        assert_eq!(ScientificFunction::Sin.evaluate(0.0, true), 0.0);
        assert_eq!(ScientificFunction::Asin.evaluate(1.0, true), 1.570796327);
        assert!(ScientificFunction::Acos.evaluate(2.0, true).is_nan());
    }

    #[test]
    fn test_domain_guards() {
        assert!(ScientificFunction::Ln.evaluate(0.0, true).is_nan());
        assert!(ScientificFunction::Log.evaluate(-1.0, true).is_nan());
        assert!(ScientificFunction::Sqrt.evaluate(-4.0, true).is_nan());
        assert_eq!(ScientificFunction::Sqrt.evaluate(0.0, true), 0.0);
        assert!(ScientificFunction::Reciprocal.evaluate(0.0, true).is_nan());
        assert_eq!(ScientificFunction::Log.evaluate(1000.0, true), 3.0);
    }

    #[test]
    fn test_factorial() {
        assert_eq!(ScientificFunction::Factorial.evaluate(5.0, true), 120.0);
        assert_eq!(ScientificFunction::Factorial.evaluate(0.0, true), 1.0);
        assert!(ScientificFunction::Factorial.evaluate(-1.0, true).is_nan());
        assert!(ScientificFunction::Factorial.evaluate(2.5, true).is_nan());
        assert!(ScientificFunction::Factorial.evaluate(80.0, true).is_infinite());
    }

    #[test]
    fn test_constants_are_rounded() {
        assert_eq!(ScientificFunction::Pi.evaluate(0.0, true), 3.141592654);
        assert_eq!(ScientificFunction::E.evaluate(0.0, true), 2.718281828);
    }

    #[test]
    fn test_expression_labels() {
        assert_eq!(ScientificFunction::Sin.expression_label(90.0), "sin(90)");
        assert_eq!(ScientificFunction::Square.expression_label(3.0), "sqr(3)");
        assert_eq!(ScientificFunction::Reciprocal.expression_label(4.0), "1/(4)");
        assert_eq!(ScientificFunction::Pi.expression_label(12.0), "π");
    }
}
