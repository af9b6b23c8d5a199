//! Unit types and conversion constants
//!
//! Only the laboratory units a balance and a volumetric flask produce are
//! recognized. Canonical storage units are milligrams and milliliters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Dimension, WeighingError};

// ============================================================================
// Scale Factors (powers of ten relative to the canonical unit)
// ============================================================================

/// Micrograms per milligram
pub const UG_PER_MG: f64 = 1000.0;
/// Milligrams per gram
pub const MG_PER_G: f64 = 1000.0;
/// Microliters per milliliter
pub const UL_PER_ML: f64 = 1000.0;
/// Milliliters per liter
pub const ML_PER_L: f64 = 1000.0;

/// Mass unit accepted for weighed amounts and stock levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MassUnit {
    Microgram,
    #[default]
    Milligram,
    Gram,
}

/// Volume unit accepted for prepared volumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VolumeUnit {
    Microliter,
    #[default]
    Milliliter,
    Liter,
}

impl MassUnit {
    pub const ALL: [MassUnit; 3] = [MassUnit::Microgram, MassUnit::Milligram, MassUnit::Gram];

    /// Display symbol, as printed on labels
    pub fn symbol(&self) -> &'static str {
        match self {
            MassUnit::Microgram => "µg",
            MassUnit::Milligram => "mg",
            MassUnit::Gram => "g",
        }
    }

    /// Recognize a unit string (case-insensitive, both micro signs accepted)
    pub fn parse(unit: &str) -> Option<Self> {
        match unit.trim().to_lowercase().as_str() {
            "µg" | "μg" | "ug" | "mcg" | "microgram" | "micrograms" => Some(MassUnit::Microgram),
            "mg" | "milligram" | "milligrams" => Some(MassUnit::Milligram),
            "g" | "gram" | "grams" => Some(MassUnit::Gram),
            _ => None,
        }
    }

    /// Convert an amount in this unit to milligrams
    pub fn to_mg(&self, amount: f64) -> f64 {
        match self {
            MassUnit::Microgram => amount / UG_PER_MG,
            MassUnit::Milligram => amount,
            MassUnit::Gram => amount * MG_PER_G,
        }
    }

    /// Convert an amount in milligrams to this unit
    pub fn from_mg(&self, amount_mg: f64) -> f64 {
        match self {
            MassUnit::Microgram => amount_mg * UG_PER_MG,
            MassUnit::Milligram => amount_mg,
            MassUnit::Gram => amount_mg / MG_PER_G,
        }
    }
}

impl VolumeUnit {
    pub const ALL: [VolumeUnit; 3] = [
        VolumeUnit::Microliter,
        VolumeUnit::Milliliter,
        VolumeUnit::Liter,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            VolumeUnit::Microliter => "µL",
            VolumeUnit::Milliliter => "mL",
            VolumeUnit::Liter => "L",
        }
    }

    pub fn parse(unit: &str) -> Option<Self> {
        match unit.trim().to_lowercase().as_str() {
            "µl" | "μl" | "ul" | "microliter" | "microliters" | "microlitre" | "microlitres" => {
                Some(VolumeUnit::Microliter)
            }
            "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => {
                Some(VolumeUnit::Milliliter)
            }
            "l" | "liter" | "liters" | "litre" | "litres" => Some(VolumeUnit::Liter),
            _ => None,
        }
    }

    /// Convert an amount in this unit to milliliters
    pub fn to_ml(&self, amount: f64) -> f64 {
        match self {
            VolumeUnit::Microliter => amount / UL_PER_ML,
            VolumeUnit::Milliliter => amount,
            VolumeUnit::Liter => amount * ML_PER_L,
        }
    }

    /// Convert an amount in milliliters to this unit
    pub fn from_ml(&self, amount_ml: f64) -> f64 {
        match self {
            VolumeUnit::Microliter => amount_ml * UL_PER_ML,
            VolumeUnit::Milliliter => amount_ml,
            VolumeUnit::Liter => amount_ml / ML_PER_L,
        }
    }
}

impl fmt::Display for MassUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for VolumeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for MassUnit {
    type Err = WeighingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MassUnit::parse(s).ok_or_else(|| WeighingError::UnrecognizedUnit {
            unit: s.to_string(),
            dimension: Dimension::Mass,
        })
    }
}

impl FromStr for VolumeUnit {
    type Err = WeighingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VolumeUnit::parse(s).ok_or_else(|| WeighingError::UnrecognizedUnit {
            unit: s.to_string(),
            dimension: Dimension::Volume,
        })
    }
}

// Units travel as their symbols ("mg", "mL") in JSON and in the database.

impl Serialize for MassUnit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

impl<'de> Deserialize<'de> for MassUnit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for VolumeUnit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

impl<'de> Deserialize<'de> for VolumeUnit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
