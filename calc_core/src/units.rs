//! # Unit Conversion
//!
//! A static catalog of unit categories plus the conversion function.
//!
//! Every unit carries a `factor`: multiply by it to reach the category's base
//! unit. Temperature is the exception; its units form an affine map to and
//! from Celsius (`value * factor + offset`).
//!
//! ## Categories
//!
//! | Category | Base unit | Units |
//! |----------|-----------|-------|
//! | length | meter | km, cm, mm, mile, yard, foot, inch |
//! | mass | kilogram | g, mg, pound, ounce |
//! | temperature | celsius | fahrenheit, kelvin |
//! | volume | liter | mL, m³, US gallon, US quart |
//!
//! ## Example
//!
//! ```rust
//! use calc_core::units::{convert, convert_display};
//!
//! let meters = convert("length", "mile", "meter", 1.0).unwrap();
//! assert!((meters - 1609.34).abs() < 1e-9);
//!
//! assert_eq!(convert_display("temperature", "celsius", "fahrenheit", "100"), "212");
//! assert_eq!(convert_display("length", "mile", "meter", "abc"), "");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{CalcError, CalcResult};
use crate::numeric::format_grouped;

/// Category id that uses affine conversion
pub const TEMPERATURE: &str = "temperature";

/// Fractional digits shown by the unit converter.
pub const MIN_FRACTION_DIGITS: usize = 0;
pub const MAX_FRACTION_DIGITS: usize = 5;

/// A unit within a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Stable identifier (e.g., "mile")
    pub id: String,
    /// Display name (e.g., "Mile (mi)")
    pub name: String,
    /// Multiply by this to reach the base unit (temperature: scale vs Celsius)
    pub factor: f64,
    /// Temperature only: additive offset vs Celsius
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
    /// Whether this is the category's base unit
    #[serde(default)]
    pub base_unit: bool,
}

impl Unit {
    fn new(id: &str, name: &str, factor: f64) -> Self {
        Unit {
            id: id.to_string(),
            name: name.to_string(),
            factor,
            offset: None,
            base_unit: false,
        }
    }

    fn base(id: &str, name: &str) -> Self {
        Unit {
            base_unit: true,
            ..Unit::new(id, name, 1.0)
        }
    }

    fn with_offset(mut self, offset: f64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Offset, treating a missing one as zero
    pub fn offset_or_zero(&self) -> f64 {
        self.offset.unwrap_or(0.0)
    }
}

/// A group of mutually convertible units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitCategory {
    pub id: String,
    pub name: String,
    pub units: Vec<Unit>,
    pub base_unit_id: String,
}

impl UnitCategory {
    /// Look up a unit by id.
    pub fn unit(&self, unit_id: &str) -> CalcResult<&Unit> {
        self.units
            .iter()
            .find(|u| u.id == unit_id)
            .ok_or_else(|| CalcError::unit_not_found(&self.id, unit_id))
    }

    /// The category's base unit.
    pub fn base_unit(&self) -> CalcResult<&Unit> {
        self.unit(&self.base_unit_id)
    }

    pub fn is_temperature(&self) -> bool {
        self.id == TEMPERATURE
    }
}

/// The unit catalog, built once on first use.
pub static UNIT_CATEGORIES: Lazy<Vec<UnitCategory>> = Lazy::new(|| {
    vec![
        UnitCategory {
            id: "length".to_string(),
            name: "Length".to_string(),
            base_unit_id: "meter".to_string(),
            units: vec![
                Unit::base("meter", "Meter (m)"),
                Unit::new("kilometer", "Kilometer (km)", 1000.0),
                Unit::new("centimeter", "Centimeter (cm)", 0.01),
                Unit::new("millimeter", "Millimeter (mm)", 0.001),
                Unit::new("mile", "Mile (mi)", 1609.34),
                Unit::new("yard", "Yard (yd)", 0.9144),
                Unit::new("foot", "Foot (ft)", 0.3048),
                Unit::new("inch", "Inch (in)", 0.0254),
            ],
        },
        UnitCategory {
            id: "mass".to_string(),
            name: "Mass".to_string(),
            base_unit_id: "kilogram".to_string(),
            units: vec![
                Unit::base("kilogram", "Kilogram (kg)"),
                Unit::new("gram", "Gram (g)", 0.001),
                Unit::new("milligram", "Milligram (mg)", 0.000001),
                Unit::new("pound", "Pound (lb)", 0.453592),
                Unit::new("ounce", "Ounce (oz)", 0.0283495),
            ],
        },
        UnitCategory {
            id: TEMPERATURE.to_string(),
            name: "Temperature".to_string(),
            base_unit_id: "celsius".to_string(),
            units: vec![
                Unit::base("celsius", "Celsius (°C)").with_offset(0.0),
                // F = C * 1.8 + 32
                Unit::new("fahrenheit", "Fahrenheit (°F)", 1.8).with_offset(32.0),
                // K = C + 273.15
                Unit::new("kelvin", "Kelvin (K)", 1.0).with_offset(273.15),
            ],
        },
        UnitCategory {
            id: "volume".to_string(),
            name: "Volume".to_string(),
            base_unit_id: "liter".to_string(),
            units: vec![
                Unit::base("liter", "Liter (L)"),
                Unit::new("milliliter", "Milliliter (mL)", 0.001),
                Unit::new("cubicmeter", "Cubic Meter (m³)", 1000.0),
                Unit::new("gallon", "Gallon (US gal)", 3.78541),
                Unit::new("quart", "Quart (US qt)", 0.946353),
            ],
        },
    ]
});

/// Accepted converter input: optional minus, digits, at most one point.
static NUMERIC_INPUT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d*\.?\d*$").expect("valid regex"));

/// All categories, in display order.
pub fn categories() -> &'static [UnitCategory] {
    &UNIT_CATEGORIES
}

/// Look up a category by id.
pub fn find_category(category_id: &str) -> CalcResult<&'static UnitCategory> {
    UNIT_CATEGORIES
        .iter()
        .find(|c| c.id == category_id)
        .ok_or_else(|| CalcError::category_not_found(category_id))
}

/// Convert `value` between two units of a category.
///
/// Temperature goes through Celsius with the affine maps; everything else is
/// `value * from.factor / to.factor`.
pub fn convert(category_id: &str, from_id: &str, to_id: &str, value: f64) -> CalcResult<f64> {
    let category = find_category(category_id)?;
    let from = category.unit(from_id)?;
    let to = category.unit(to_id)?;

    if category.is_temperature() {
        let celsius = temperature_to_celsius(from, value);
        Ok(temperature_from_celsius(to, celsius))
    } else {
        Ok(value * from.factor / to.factor)
    }
}

/// Convert text input and format it for display.
///
/// Returns an empty string when the input is not a number or a unit is
/// missing.
pub fn convert_display(category_id: &str, from_id: &str, to_id: &str, input: &str) -> String {
    let value = match input.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => return String::new(),
    };

    match convert(category_id, from_id, to_id, value) {
        Ok(result) => format_grouped(result, MIN_FRACTION_DIGITS, MAX_FRACTION_DIGITS),
        Err(err) => {
            debug!("unit conversion skipped: {}", err);
            String::new()
        }
    }
}

/// Inverse affine map: unit -> Celsius.
fn temperature_to_celsius(unit: &Unit, value: f64) -> f64 {
    if unit.base_unit {
        value
    } else {
        (value - unit.offset_or_zero()) / unit.factor
    }
}

/// Forward affine map: Celsius -> unit.
fn temperature_from_celsius(unit: &Unit, celsius: f64) -> f64 {
    if unit.base_unit {
        celsius
    } else {
        celsius * unit.factor + unit.offset_or_zero()
    }
}

/// Whether `text` is acceptable (possibly partial) numeric input, such as
/// `""`, `"-"`, `"12."`.
pub fn is_numeric_input(text: &str) -> bool {
    NUMERIC_INPUT.is_match(text)
}

// ============================================================================
// Converter Session
// ============================================================================

/// State of an interactive unit converter.
///
/// Like the calculator, every transition returns a new state with the output
/// already recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitConverter {
    pub category_id: String,
    pub from_unit_id: String,
    pub to_unit_id: String,
    pub input_value: String,
    pub output_value: String,
}

impl UnitConverter {
    /// First category, its first two units, input "1".
    pub fn new() -> Self {
        let category = &UNIT_CATEGORIES[0];
        Self::for_category(category)
    }

    fn for_category(category: &UnitCategory) -> Self {
        let from = &category.units[0];
        let to = category.units.get(1).unwrap_or(from);
        UnitConverter {
            category_id: category.id.clone(),
            from_unit_id: from.id.clone(),
            to_unit_id: to.id.clone(),
            input_value: "1".to_string(),
            output_value: String::new(),
        }
        .recomputed()
    }

    /// Units available in the selected category.
    pub fn units(&self) -> &'static [Unit] {
        find_category(&self.category_id)
            .map(|c| c.units.as_slice())
            .unwrap_or(&[])
    }

    /// Switch category, resetting units and input. Unknown ids are ignored.
    pub fn select_category(&self, category_id: &str) -> Self {
        match find_category(category_id) {
            Ok(category) => Self::for_category(category),
            Err(_) => self.clone(),
        }
    }

    /// Choose the source unit. Unknown ids are ignored.
    pub fn set_from_unit(&self, unit_id: &str) -> Self {
        if !self.has_unit(unit_id) {
            return self.clone();
        }
        UnitConverter {
            from_unit_id: unit_id.to_string(),
            ..self.clone()
        }
        .recomputed()
    }

    /// Choose the target unit. Unknown ids are ignored.
    pub fn set_to_unit(&self, unit_id: &str) -> Self {
        if !self.has_unit(unit_id) {
            return self.clone();
        }
        UnitConverter {
            to_unit_id: unit_id.to_string(),
            ..self.clone()
        }
        .recomputed()
    }

    /// Replace the input text; rejected unless it looks numeric.
    pub fn set_input(&self, text: &str) -> Self {
        if !is_numeric_input(text) {
            return self.clone();
        }
        UnitConverter {
            input_value: text.to_string(),
            ..self.clone()
        }
        .recomputed()
    }

    /// Swap units; the previous output becomes the new input.
    pub fn swap(&self) -> Self {
        UnitConverter {
            from_unit_id: self.to_unit_id.clone(),
            to_unit_id: self.from_unit_id.clone(),
            // formatted output may carry separators
            input_value: self.output_value.replace(',', ""),
            output_value: self.input_value.clone(),
            ..self.clone()
        }
        .recomputed()
    }

    fn has_unit(&self, unit_id: &str) -> bool {
        self.units().iter().any(|u| u.id == unit_id)
    }

    fn recomputed(mut self) -> Self {
        self.output_value = convert_display(&self.category_id, &self.from_unit_id, &self.to_unit_id, &self.input_value);
        self
    }
}

impl Default for UnitConverter {
    fn default() -> Self {
        UnitConverter::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-5,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_catalog_integrity() {
        for category in categories() {
            let base = category.base_unit().unwrap();
            assert!(base.base_unit);
            assert_eq!(base.factor, 1.0);
            assert_eq!(category.units.iter().filter(|u| u.base_unit).count(), 1);
        }
    }

    #[test]
    fn test_mile_to_meter() {
        assert_close(convert("length", "mile", "meter", 1.0).unwrap(), 1609.34);
        assert_eq!(convert_display("length", "mile", "meter", "1"), "1,609.34");
    }

    #[test]
    fn test_linear_conversions() {
        assert_close(convert("length", "kilometer", "meter", 2.5).unwrap(), 2500.0);
        assert_close(convert("length", "foot", "inch", 1.0).unwrap(), 12.0);
        assert_close(convert("mass", "kilogram", "gram", 1.0).unwrap(), 1000.0);
        assert_close(convert("volume", "cubicmeter", "liter", 1.0).unwrap(), 1000.0);
    }

    #[test]
    fn test_temperature() {
        assert_close(convert("temperature", "celsius", "fahrenheit", 100.0).unwrap(), 212.0);
        assert_close(convert("temperature", "fahrenheit", "celsius", 32.0).unwrap(), 0.0);
        assert_close(convert("temperature", "celsius", "kelvin", 0.0).unwrap(), 273.15);
        assert_close(convert("temperature", "kelvin", "fahrenheit", 0.0).unwrap(), -459.67);
        assert_close(convert("temperature", "fahrenheit", "fahrenheit", -40.0).unwrap(), -40.0);
    }

    #[test]
    fn test_round_trips() {
        for category in categories() {
            for a in &category.units {
                for b in &category.units {
                    for v in [-40.0, 0.0, 1.0, 100.0, 12345.678] {
                        let there = convert(&category.id, &a.id, &b.id, v).unwrap();
                        let back = convert(&category.id, &b.id, &a.id, there).unwrap();
                        assert!(
                            (back - v).abs() < 1e-5 * v.abs().max(1.0),
                            "{} {} -> {} -> back gave {}",
                            category.id, a.id, b.id, back
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_missing_units() {
        assert_eq!(
            convert("length", "furlong", "meter", 1.0).unwrap_err().error_code(),
            "UNIT_NOT_FOUND"
        );
        assert_eq!(
            convert("speed", "kmh", "mph", 1.0).unwrap_err().error_code(),
            "CATEGORY_NOT_FOUND"
        );
        assert_eq!(convert_display("length", "furlong", "meter", "1"), "");
        assert_eq!(convert_display("length", "mile", "meter", "-"), "");
        assert_eq!(convert_display("length", "mile", "meter", ""), "");
    }

    #[test]
    fn test_numeric_input_filter() {
        for ok in ["", "-", "12", "-3.5", "0.", ".5"] {
            assert!(is_numeric_input(ok), "{ok} should be accepted");
        }
        for bad in ["abc", "1.2.3", "--1", "1e5", "1,000"] {
            assert!(!is_numeric_input(bad), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_converter_defaults() {
        let conv = UnitConverter::new();
        assert_eq!(conv.category_id, "length");
        assert_eq!(conv.from_unit_id, "meter");
        assert_eq!(conv.to_unit_id, "kilometer");
        assert_eq!(conv.input_value, "1");
        assert_eq!(conv.output_value, "0.001");
    }

    #[test]
    fn test_converter_category_change_resets() {
        let conv = UnitConverter::new().set_input("5").select_category("temperature");
        assert_eq!(conv.from_unit_id, "celsius");
        assert_eq!(conv.to_unit_id, "fahrenheit");
        assert_eq!(conv.input_value, "1");
        assert_eq!(conv.output_value, "33.8");

        let unchanged = conv.select_category("speed");
        assert_eq!(unchanged, conv);
    }

    #[test]
    fn test_converter_rejects_bad_input() {
        let conv = UnitConverter::new().set_input("12");
        assert_eq!(conv.set_input("12a"), conv);
        assert_eq!(conv.set_input("-").output_value, "");
    }

    #[test]
    fn test_converter_swap() {
        let conv = UnitConverter::new()
            .set_from_unit("mile")
            .set_to_unit("meter")
            .set_input("2");
        assert_eq!(conv.output_value, "3,218.68");

        let swapped = conv.swap();
        assert_eq!(swapped.from_unit_id, "meter");
        assert_eq!(swapped.to_unit_id, "mile");
        assert_eq!(swapped.input_value, "3218.68");
        assert_eq!(swapped.output_value, "2");
    }

    #[test]
    fn test_converter_ignores_foreign_units() {
        let conv = UnitConverter::new();
        assert_eq!(conv.set_from_unit("kelvin"), conv);
    }
}
