//! Measurement module
//!
//! Mass/volume units, normalization to canonical units, and display formatting.

pub mod converter;
pub mod format;
pub mod units;

pub use converter::{denormalize, normalize_mass, normalize_volume};
pub use format::{format_fixed, format_percent, parse_numeric};
pub use units::{MassUnit, VolumeUnit};
