//! Numbers with an optional CSS unit.

use crate::units;

/// A Sass number. `as_slash` remembers the operands of a `12px/1.5` literal
/// so it prints as written until used in arithmetic.
#[derive(Debug, Clone)]
pub struct SassNumber {
    pub value: f64,
    pub unit: Option<String>,
    pub as_slash: Option<Box<(SassNumber, SassNumber)>>,
}

impl SassNumber {
    pub fn new(value: f64, unit: Option<String>) -> Self {
        let unit = unit.filter(|u| !u.is_empty());
        Self {
            value,
            unit,
            as_slash: None,
        }
    }

    pub fn unitless(value: f64) -> Self {
        Self::new(value, None)
    }

    pub fn with_unit(value: f64, unit: &str) -> Self {
        Self::new(value, Some(unit.to_string()))
    }

    /// The unit, or `""` when unitless.
    pub fn unit_str(&self) -> &str {
        self.unit.as_deref().unwrap_or("")
    }

    pub fn is_unitless(&self) -> bool {
        self.unit.is_none()
    }

    /// Same number without the slash origin.
    pub fn without_slash(&self) -> Self {
        Self {
            value: self.value,
            unit: self.unit.clone(),
            as_slash: None,
        }
    }

    /// A copy carrying `value` with this number's unit.
    pub fn with_value(&self, value: f64) -> Self {
        Self::new(value, self.unit.clone())
    }

    /// This number's value expressed in `unit`, if the units convert.
    pub fn value_in(&self, unit: &str) -> Option<f64> {
        match &self.unit {
            None => Some(self.value),
            Some(own) => units::conversion_factor(own, unit).map(|f| self.value * f),
        }
    }

    /// Whether `self` and `other` can take part in unit-preserving
    /// arithmetic together.
    pub fn is_comparable_to(&self, other: &SassNumber) -> bool {
        match (&self.unit, &other.unit) {
            (None, _) | (_, None) => true,
            (Some(a), Some(b)) => units::compatible(a, b),
        }
    }

    /// Integer value if the number is whole (within rounding tolerance).
    pub fn as_integer(&self) -> Option<i64> {
        let rounded = self.value.round();
        ((self.value - rounded).abs() < 1e-10).then_some(rounded as i64)
    }
}

/// Format a number for CSS: at most 10 decimals, trailing zeros trimmed,
/// negative zero printed as `0`.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let rounded = (value * 1e10).round() / 1e10;
    if rounded == 0.0 {
        return "0".to_string();
    }
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        return format!("{rounded:.0}");
    }
    let text = format!("{rounded:.10}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_trims_decimals() {
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(10.0), "10");
        assert_eq!(format_number(1.0 / 3.0), "0.3333333333");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
    }

    #[test]
    fn test_negative_zero_prints_zero() {
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(-0.00000000001), "0");
    }

    #[test]
    fn test_value_in_converts() {
        let inch = SassNumber::with_unit(1.0, "in");
        assert_eq!(inch.value_in("px"), Some(96.0));
        assert_eq!(inch.value_in("deg"), None);
        assert_eq!(SassNumber::unitless(3.0).value_in("px"), Some(3.0));
    }

    #[test]
    fn test_empty_unit_is_unitless() {
        assert!(SassNumber::new(1.0, Some(String::new())).is_unitless());
    }
}
