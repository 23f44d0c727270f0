//! # Numeric Precision and Formatting
//!
//! Every value the calculator stores is text. These helpers decide how a
//! computed `f64` becomes that text and how the text is shown:
//!
//! - [`round_significant`] trims binary floating-point noise (10 digits)
//! - [`format_number`] produces the canonical stored text
//! - [`display_text`] shortens very long values for a display line
//! - [`format_grouped`] renders converter output with thousands separators
//!
//! ## Example
//!
//! ```rust
//! use calc_core::numeric::{format_grouped, format_number, round_significant};
//!
//! let sum = round_significant(0.1 + 0.2, 10);
//! assert_eq!(format_number(sum), "0.3");
//! assert_eq!(format_grouped(1609.34, 0, 5), "1,609.34");
//! ```

/// Significant digits kept for every arithmetic and scientific result.
pub const RESULT_PRECISION: usize = 10;

/// Display values longer than this are shown in exponential form.
pub const MAX_DISPLAY_LEN: usize = 20;

/// Fractional digits used by the exponential display form.
pub const EXPONENTIAL_DIGITS: usize = 5;

/// Round `value` to `digits` significant decimal digits.
///
/// Non-finite values and zero pass through unchanged.
pub fn round_significant(value: f64, digits: usize) -> f64 {
    if !value.is_finite() || value == 0.0 || digits == 0 {
        return value;
    }
    let formatted = format!("{:.*e}", digits - 1, value);
    formatted.parse().unwrap_or(value)
}

/// Round to the calculator's result precision.
pub fn round_result(value: f64) -> f64 {
    round_significant(value, RESULT_PRECISION)
}

/// Canonical text for a number.
///
/// Uses the shortest decimal form that round-trips. Magnitudes at or above
/// 1e21 or below 1e-6 switch to exponential form with an explicit exponent
/// sign (`1e+21`, `1.5e-7`). Negative zero prints as `0`.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let magnitude = value.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        with_exponent_sign(format!("{:e}", value))
    } else {
        format!("{}", value)
    }
}

/// Text shown on the display line for a stored value.
///
/// Values longer than [`MAX_DISPLAY_LEN`] characters are rendered in
/// exponential form with [`EXPONENTIAL_DIGITS`] fractional digits. Text that
/// does not parse as a number is returned as-is.
pub fn display_text(value: &str) -> String {
    if value.chars().count() <= MAX_DISPLAY_LEN {
        return value.to_string();
    }
    match value.parse::<f64>() {
        Ok(number) if number.is_finite() => {
            with_exponent_sign(format!("{:.*e}", EXPONENTIAL_DIGITS, number))
        }
        _ => value.to_string(),
    }
}

/// Format with comma thousands separators and between `min_fraction` and
/// `max_fraction` fractional digits (trailing zeros trimmed down to the
/// minimum).
pub fn format_grouped(value: f64, min_fraction: usize, max_fraction: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let max_fraction = max_fraction.max(min_fraction);

    let fixed = format!("{:.*}", max_fraction, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (fixed.as_str(), ""),
    };

    let mut fraction = frac_part.to_string();
    while fraction.len() > min_fraction && fraction.ends_with('0') {
        fraction.pop();
    }

    let is_zero = int_part.chars().all(|c| c == '0') && fraction.chars().all(|c| c == '0');
    let mut result = String::new();
    if value.is_sign_negative() && !is_zero {
        result.push('-');
    }
    result.push_str(&group_thousands(int_part));
    if !fraction.is_empty() {
        result.push('.');
        result.push_str(&fraction);
    }
    result
}

/// Insert a comma every three digits, counting from the right.
fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped.chars().rev().collect()
}

/// Rust prints `1e21`; the display convention is `1e+21`.
fn with_exponent_sign(formatted: String) -> String {
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => formatted,
    }
}
