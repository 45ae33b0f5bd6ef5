//! Unit vocabulary and numeric unit conversion.
//!
//! The export dialect uses a closed unit vocabulary (`cGy`, `Gy`, `%`, `cc`,
//! `cm`). Conversions are driven by a fixed `(from, to) -> factor` table;
//! percent factors are parametrized by a per-plan reference value (prescribed
//! dose for the dose family, structure volume for the volume family).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{DvhError, Result};

/// A measurement unit from the export's closed vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Unit {
    /// Centigray (`cGy`), the plan's default dose unit.
    #[serde(rename = "cGy")]
    CentiGray,
    /// Gray (`Gy`).
    #[serde(rename = "Gy")]
    Gray,
    /// Percent (`%`), relative to a reference dose or volume.
    #[serde(rename = "%")]
    Percent,
    /// Cubic centimeter (`cc`).
    #[serde(rename = "cc")]
    CubicCentimeter,
    /// Centimeter (`cm`).
    #[serde(rename = "cm")]
    Centimeter,
}

/// Unit families. `Percent` belongs to both dose and volume; which family
/// applies is decided by the other side of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitFamily {
    Dose,
    Volume,
    Distance,
    Relative,
}

impl Unit {
    /// Returns the unit string as it appears in the export.
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::CentiGray => "cGy",
            Unit::Gray => "Gy",
            Unit::Percent => "%",
            Unit::CubicCentimeter => "cc",
            Unit::Centimeter => "cm",
        }
    }

    pub fn family(&self) -> UnitFamily {
        match self {
            Unit::CentiGray | Unit::Gray => UnitFamily::Dose,
            Unit::CubicCentimeter => UnitFamily::Volume,
            Unit::Centimeter => UnitFamily::Distance,
            Unit::Percent => UnitFamily::Relative,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Unit {
    type Err = String;

    /// Parse a unit string from the export (case-insensitive).
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed == "%" {
            return Ok(Unit::Percent);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "cgy" => Ok(Unit::CentiGray),
            "gy" => Ok(Unit::Gray),
            "cc" | "cm3" => Ok(Unit::CubicCentimeter),
            "cm" => Ok(Unit::Centimeter),
            _ => Err(format!("Unknown unit: {s}")),
        }
    }
}

fn require_dose(reference_dose: Option<f64>) -> Result<f64> {
    match reference_dose {
        Some(dose) if dose > 0.0 => Ok(dose),
        _ => Err(DvhError::MissingReference {
            unit: Unit::Percent,
        }),
    }
}

fn require_volume(reference_volume: Option<f64>) -> Result<f64> {
    match reference_volume {
        Some(volume) if volume > 0.0 => Ok(volume),
        _ => Err(DvhError::MissingReference {
            unit: Unit::Percent,
        }),
    }
}

/// Converts `value` from one unit to another.
///
/// `reference_dose` is the prescribed dose in `cGy`; `reference_volume` is the
/// structure volume in `cc`. Either is required only when the conversion
/// crosses into or out of the percent unit of its family. A pair with no
/// table entry yields [`DvhError::UnknownUnits`]; a percent conversion
/// without its reference yields [`DvhError::MissingReference`] rather than
/// defaulting the factor to 1.0.
pub fn convert(
    value: f64,
    from: Unit,
    to: Unit,
    reference_dose: Option<f64>,
    reference_volume: Option<f64>,
) -> Result<f64> {
    let factor = match (from, to) {
        (a, b) if a == b => 1.0,
        (Unit::Gray, Unit::CentiGray) => 100.0,
        (Unit::CentiGray, Unit::Gray) => 0.01,
        (Unit::Percent, Unit::CentiGray) => require_dose(reference_dose)? / 100.0,
        (Unit::CentiGray, Unit::Percent) => 100.0 / require_dose(reference_dose)?,
        (Unit::Percent, Unit::Gray) => require_dose(reference_dose)? / 10_000.0,
        (Unit::Gray, Unit::Percent) => 10_000.0 / require_dose(reference_dose)?,
        (Unit::Percent, Unit::CubicCentimeter) => require_volume(reference_volume)? / 100.0,
        (Unit::CubicCentimeter, Unit::Percent) => 100.0 / require_volume(reference_volume)?,
        (from, to) => return Err(DvhError::UnknownUnits { from, to }),
    };
    Ok(value * factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dose_units_convert_both_ways() {
        assert_eq!(convert(60.0, Unit::Gray, Unit::CentiGray, None, None).unwrap(), 6000.0);
        assert_eq!(convert(6000.0, Unit::CentiGray, Unit::Gray, None, None).unwrap(), 60.0);
    }

    #[test]
    fn percent_dose_uses_reference() {
        let cgy = convert(50.0, Unit::Percent, Unit::CentiGray, Some(6000.0), None).unwrap();
        assert_eq!(cgy, 3000.0);
        let pct = convert(3000.0, Unit::CentiGray, Unit::Percent, Some(6000.0), None).unwrap();
        assert_eq!(pct, 50.0);
    }

    #[test]
    fn percent_volume_uses_reference() {
        let cc = convert(10.0, Unit::Percent, Unit::CubicCentimeter, None, Some(45.3)).unwrap();
        assert!((cc - 4.53).abs() < 1e-9);
    }

    #[test]
    fn missing_reference_is_an_error() {
        let err = convert(50.0, Unit::Percent, Unit::CentiGray, None, None).unwrap_err();
        assert!(matches!(err, DvhError::MissingReference { .. }));
        let err = convert(10.0, Unit::CubicCentimeter, Unit::Percent, None, None).unwrap_err();
        assert!(matches!(err, DvhError::MissingReference { .. }));
    }

    #[test]
    fn cross_family_pairs_are_unknown() {
        let err = convert(1.0, Unit::Gray, Unit::CubicCentimeter, None, None).unwrap_err();
        assert!(matches!(err, DvhError::UnknownUnits { .. }));
        let err = convert(1.0, Unit::Centimeter, Unit::CubicCentimeter, None, None).unwrap_err();
        assert!(matches!(err, DvhError::UnknownUnits { .. }));
    }

    #[test]
    fn unit_strings_round_trip() {
        for unit in [
            Unit::CentiGray,
            Unit::Gray,
            Unit::Percent,
            Unit::CubicCentimeter,
            Unit::Centimeter,
        ] {
            assert_eq!(unit.as_str().parse::<Unit>().unwrap(), unit);
        }
    }
}
