//! Runtime configuration
//!
//! Everything is read from `WEIGHLAB_*` environment variables with defaults
//! that match the standard label stock.

use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::concentration::ConcentrationUnit;
use crate::label::encoder::MATRIX_VERSION_LIMIT;
use crate::label::EncoderSettings;

pub const ENV_DATABASE_PATH: &str = "WEIGHLAB_DATABASE_PATH";
pub const ENV_MATRIX_MAX_VERSION: &str = "WEIGHLAB_MATRIX_MAX_VERSION";
pub const ENV_LINEAR_MAX_CHARS: &str = "WEIGHLAB_LINEAR_MAX_CHARS";
pub const ENV_MODULE_PX: &str = "WEIGHLAB_MODULE_PX";
pub const ENV_BAR_PX: &str = "WEIGHLAB_BAR_PX";
pub const ENV_BAR_HEIGHT_PX: &str = "WEIGHLAB_BAR_HEIGHT_PX";
pub const ENV_CONCENTRATION_UNIT: &str = "WEIGHLAB_CONCENTRATION_UNIT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}' ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub encoder: EncoderSettings,
    pub concentration_unit: ConcentrationUnit,
}

impl Config {
    /// Build configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = EncoderSettings::default();

        let database_path = lookup(ENV_DATABASE_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path);

        let matrix_max_version: i16 =
            parse_var(&lookup, ENV_MATRIX_MAX_VERSION, defaults.matrix_max_version)?;
        if !(1..=MATRIX_VERSION_LIMIT).contains(&matrix_max_version) {
            return Err(ConfigError::Invalid {
                var: ENV_MATRIX_MAX_VERSION,
                value: matrix_max_version.to_string(),
                reason: format!("must be between 1 and {}", MATRIX_VERSION_LIMIT),
            });
        }

        let encoder = EncoderSettings {
            matrix_max_version,
            module_px: positive(parse_var(&lookup, ENV_MODULE_PX, defaults.module_px)?, ENV_MODULE_PX)?,
            linear_max_chars: positive(
                parse_var(&lookup, ENV_LINEAR_MAX_CHARS, defaults.linear_max_chars)?,
                ENV_LINEAR_MAX_CHARS,
            )?,
            bar_px: positive(parse_var(&lookup, ENV_BAR_PX, defaults.bar_px)?, ENV_BAR_PX)?,
            bar_height_px: positive(
                parse_var(&lookup, ENV_BAR_HEIGHT_PX, defaults.bar_height_px)?,
                ENV_BAR_HEIGHT_PX,
            )?,
            ..defaults
        };

        let concentration_unit =
            parse_var(&lookup, ENV_CONCENTRATION_UNIT, ConcentrationUnit::MG_PER_ML)?;

        Ok(Self {
            database_path,
            encoder,
            concentration_unit,
        })
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn positive<T>(value: T, var: &'static str) -> Result<T, ConfigError>
where
    T: PartialOrd + Default + ToString,
{
    if value > T::default() {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        })
    }
}

/// `<project>/data/weighlab.db`, found relative to the running binary
pub fn default_database_path() -> PathBuf {
    let mut path = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    // Go up from target/release or target/debug to project root
    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(parent) = path.parent() {
            if let Some(grandparent) = parent.parent() {
                path = grandparent.to_path_buf();
            }
        }
    }

    path.push("data");
    path.push("weighlab.db");
    path
}
