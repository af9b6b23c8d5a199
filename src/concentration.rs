//! Concentration calculation
//!
//! Concentration is always derived from normalized quantities (mg, mL). The
//! canonical unit is mg/mL; other display units rescale the mass component.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Dimension, WeighingError, WeighingResult};
use crate::measure::{format_fixed, MassUnit};

/// Decimal places shown for a concentration on labels
pub const DISPLAY_DECIMALS: usize = 3;

/// Display unit for a concentration: a mass unit per milliliter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConcentrationUnit {
    pub mass: MassUnit,
}

impl ConcentrationUnit {
    pub const MG_PER_ML: ConcentrationUnit = ConcentrationUnit {
        mass: MassUnit::Milligram,
    };

    pub fn symbol(&self) -> &'static str {
        match self.mass {
            MassUnit::Microgram => "µg/mL",
            MassUnit::Milligram => "mg/mL",
            MassUnit::Gram => "g/mL",
        }
    }

    /// Recognize "<mass>/<volume>" where volume is mL or L.
    ///
    /// Per-liter spellings map onto the equivalent per-milliliter unit
    /// (g/L is mg/mL, mg/L is µg/mL).
    pub fn parse(unit: &str) -> Option<Self> {
        let (mass, volume) = unit.trim().split_once('/')?;
        let mass = MassUnit::parse(mass)?;
        match volume.trim().to_lowercase().as_str() {
            "ml" => Some(Self { mass }),
            "l" => match mass {
                MassUnit::Gram => Some(Self { mass: MassUnit::Milligram }),
                MassUnit::Milligram => Some(Self { mass: MassUnit::Microgram }),
                MassUnit::Microgram => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for ConcentrationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for ConcentrationUnit {
    type Err = WeighingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConcentrationUnit::parse(s).ok_or_else(|| WeighingError::UnrecognizedUnit {
            unit: s.to_string(),
            dimension: Dimension::Concentration,
        })
    }
}

impl Serialize for ConcentrationUnit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

impl<'de> Deserialize<'de> for ConcentrationUnit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A computed concentration, kept at full precision
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Concentration {
    /// Value in `unit`, unrounded
    pub value: f64,
    pub unit: ConcentrationUnit,
}

impl Concentration {
    /// Canonical mg/mL value, whatever the display unit
    pub fn mg_per_ml(&self) -> f64 {
        self.unit.mass.to_mg(self.value)
    }

    /// Rescale into another display unit
    pub fn in_unit(&self, unit: ConcentrationUnit) -> Self {
        Self {
            value: unit.mass.from_mg(self.mg_per_ml()),
            unit,
        }
    }

    /// Rounded string for labels, e.g. "1.250 mg/mL"
    pub fn display(&self) -> String {
        format!("{} {}", format_fixed(self.value, DISPLAY_DECIMALS), self.unit)
    }
}

/// Compute mass / volume in mg/mL from normalized inputs
pub fn compute(mass_mg: f64, volume_ml: f64) -> WeighingResult<Concentration> {
    compute_in(mass_mg, volume_ml, ConcentrationUnit::MG_PER_ML)
}

/// Compute mass / volume and express it in `unit`
pub fn compute_in(
    mass_mg: f64,
    volume_ml: f64,
    unit: ConcentrationUnit,
) -> WeighingResult<Concentration> {
    if !mass_mg.is_finite() || mass_mg < 0.0 {
        return Err(WeighingError::InvalidQuantity {
            field: "mass_mg",
            value: mass_mg,
        });
    }
    if volume_ml == 0.0 || !volume_ml.is_finite() {
        return Err(WeighingError::DivisionByZero { volume_ml });
    }
    if volume_ml < 0.0 {
        return Err(WeighingError::InvalidQuantity {
            field: "volume_ml",
            value: volume_ml,
        });
    }

    let mg_per_ml = mass_mg / volume_ml;
    tracing::debug!(mass_mg, volume_ml, mg_per_ml, "computed concentration");

    Ok(Concentration {
        value: unit.mass.from_mg(mg_per_ml),
        unit,
    })
}
