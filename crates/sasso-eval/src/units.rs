//! CSS unit conversion table.

use std::f64::consts::PI;

/// Units grouped by dimension, with their size in the group's base unit.
const CONVERSIONS: &[(&str, &[(&str, f64)])] = &[
    (
        "length",
        &[
            ("px", 1.0),
            ("in", 96.0),
            ("cm", 96.0 / 2.54),
            ("mm", 96.0 / 25.4),
            ("q", 96.0 / 101.6),
            ("pt", 4.0 / 3.0),
            ("pc", 16.0),
        ],
    ),
    (
        "angle",
        &[
            ("deg", 1.0),
            ("grad", 0.9),
            ("rad", 180.0 / PI),
            ("turn", 360.0),
        ],
    ),
    ("time", &[("ms", 1.0), ("s", 1000.0)]),
    ("frequency", &[("hz", 1.0), ("khz", 1000.0)]),
    (
        "resolution",
        &[("dppx", 1.0), ("dpi", 1.0 / 96.0), ("dpcm", 2.54 / 96.0)],
    ),
];

fn lookup(unit: &str) -> Option<(&'static str, f64)> {
    let unit = unit.to_ascii_lowercase();
    CONVERSIONS.iter().find_map(|(dimension, units)| {
        units
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, size)| (*dimension, *size))
    })
}

/// Factor that converts a value in `from` into `to`, if the units are
/// identical or share a dimension.
pub fn conversion_factor(from: &str, to: &str) -> Option<f64> {
    if from.eq_ignore_ascii_case(to) {
        return Some(1.0);
    }
    let (from_dim, from_size) = lookup(from)?;
    let (to_dim, to_size) = lookup(to)?;
    (from_dim == to_dim).then_some(from_size / to_size)
}

/// Whether two units can be converted into each other.
pub fn compatible(a: &str, b: &str) -> bool {
    conversion_factor(a, b).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inch_to_px() {
        assert_eq!(conversion_factor("in", "px"), Some(96.0));
    }

    #[test]
    fn test_same_unit_is_identity() {
        assert_eq!(conversion_factor("em", "em"), Some(1.0));
    }

    #[test]
    fn test_cross_dimension_is_none() {
        assert_eq!(conversion_factor("px", "deg"), None);
        assert_eq!(conversion_factor("em", "px"), None);
    }

    #[test]
    fn test_turn_to_deg() {
        let factor = conversion_factor("turn", "deg").unwrap_or_default();
        assert!((factor - 360.0).abs() < 1e-9);
    }
}
