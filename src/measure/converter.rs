//! Unit conversion functions
//!
//! Normalizes quantities to milligrams / milliliters and back. Unknown units
//! are always an error; nothing falls back to a default unit.

use super::units::{MassUnit, VolumeUnit};
use crate::error::{Dimension, WeighingError, WeighingResult};

/// Convert a mass in the given unit to milligrams
pub fn normalize_mass(amount: f64, unit: &str) -> WeighingResult<f64> {
    let unit: MassUnit = unit.parse()?;
    Ok(unit.to_mg(amount))
}

/// Convert a volume in the given unit to milliliters
pub fn normalize_volume(amount: f64, unit: &str) -> WeighingResult<f64> {
    let unit: VolumeUnit = unit.parse()?;
    Ok(unit.to_ml(amount))
}

/// Convert a canonical amount back into `target_unit` for display.
///
/// The dimension is taken from the target unit: mass units interpret
/// `amount` as milligrams, volume units as milliliters.
pub fn denormalize(amount: f64, target_unit: &str) -> WeighingResult<f64> {
    if let Some(unit) = MassUnit::parse(target_unit) {
        return Ok(unit.from_mg(amount));
    }
    if let Some(unit) = VolumeUnit::parse(target_unit) {
        return Ok(unit.from_ml(amount));
    }
    Err(WeighingError::UnrecognizedUnit {
        unit: target_unit.to_string(),
        dimension: guess_dimension(target_unit),
    })
}

/// Best-effort dimension for an unrecognized unit, used only for messages
fn guess_dimension(unit: &str) -> Dimension {
    let lower = unit.trim().to_lowercase();
    if lower.ends_with('l') || lower.contains("lit") {
        Dimension::Volume
    } else {
        Dimension::Mass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn test_normalize_mass() {
        assert_eq!(normalize_mass(12.5, "mg").unwrap(), 12.5);
        assert_eq!(normalize_mass(1000.0, "µg").unwrap(), 1.0);
        assert_eq!(normalize_mass(0.25, "g").unwrap(), 250.0);
    }

    #[test]
    fn test_normalize_volume() {
        assert_eq!(normalize_volume(10.0, "mL").unwrap(), 10.0);
        assert_eq!(normalize_volume(1.0, "L").unwrap(), 1000.0);
        assert_eq!(normalize_volume(500.0, "µL").unwrap(), 0.5);
    }

    #[test]
    fn test_unrecognized_units_never_default() {
        assert!(matches!(
            normalize_mass(1.0, "oz"),
            Err(WeighingError::UnrecognizedUnit { dimension: Dimension::Mass, .. })
        ));
        assert!(matches!(
            normalize_volume(1.0, "tbsp"),
            Err(WeighingError::UnrecognizedUnit { dimension: Dimension::Volume, .. })
        ));
        // A volume unit is not a mass unit
        assert!(normalize_mass(1.0, "mL").is_err());
        assert!(denormalize(1.0, "gallon").is_err());
    }

    #[test]
    fn test_mass_round_trip() {
        for unit in MassUnit::ALL {
            for amount in [0.0, 0.001, 1.0, 12.5, 987.654321, 1.0e6] {
                let mg = normalize_mass(amount, unit.symbol()).unwrap();
                let back = denormalize(mg, unit.symbol()).unwrap();
                assert!(
                    (back - amount).abs() <= TOLERANCE * amount.max(1.0),
                    "{} {} came back as {}",
                    amount,
                    unit,
                    back
                );
            }
        }
    }

    #[test]
    fn test_volume_round_trip() {
        for unit in VolumeUnit::ALL {
            for amount in [0.0, 0.005, 1.0, 10.0, 250.75, 5.0e4] {
                let ml = normalize_volume(amount, unit.symbol()).unwrap();
                let back = denormalize(ml, unit.symbol()).unwrap();
                assert!((back - amount).abs() <= TOLERANCE * amount.max(1.0));
            }
        }
    }
}
