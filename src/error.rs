//! Error taxonomy for the weighing pipeline
//!
//! Every failure a weighing submission can hit is a variant here, carrying
//! enough context (offending field, compound id) to render a user-facing message.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::db::DbError;

/// Physical dimension a unit belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Mass,
    Volume,
    Concentration,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Mass => f.write_str("mass"),
            Dimension::Volume => f.write_str("volume"),
            Dimension::Concentration => f.write_str("concentration"),
        }
    }
}

/// Machine-readable encoding used on a label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbology {
    /// Two-dimensional matrix code (QR)
    Matrix,
    /// One-dimensional linear barcode (Code 128)
    Linear,
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbology::Matrix => f.write_str("QR matrix code"),
            Symbology::Linear => f.write_str("Code 128 barcode"),
        }
    }
}

/// Post-debit step of a weighing transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Mint,
    Encode,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Mint => f.write_str("label minting"),
            Stage::Encode => f.write_str("label encoding"),
            Stage::Persist => f.write_str("record persistence"),
        }
    }
}

#[derive(Debug, Error)]
pub enum WeighingError {
    #[error("Unrecognized {dimension} unit: '{unit}'")]
    UnrecognizedUnit { unit: String, dimension: Dimension },

    #[error("Invalid quantity for {field}: {value} (must be finite and non-negative)")]
    InvalidQuantity { field: &'static str, value: f64 },

    #[error("Cannot compute concentration: prepared volume is {volume_ml} mL")]
    DivisionByZero { volume_ml: f64 },

    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Invalid CAS registry number: '{cas_number}'")]
    InvalidCasNumber { cas_number: String },

    #[error("Compound not found: {compound_id}")]
    CompoundNotFound { compound_id: i64 },

    #[error(
        "Insufficient stock for compound {compound_id}: requested {requested_mg} mg, available {available_mg} mg"
    )]
    InsufficientStock {
        compound_id: i64,
        requested_mg: f64,
        available_mg: f64,
    },

    #[error("Payload of {length} characters exceeds {symbology} capacity of {capacity}")]
    PayloadTooLong {
        symbology: Symbology,
        length: usize,
        capacity: usize,
    },

    #[error("Payload cannot be represented as a {symbology}: {reason}")]
    UnencodablePayload { symbology: Symbology, reason: String },

    #[error("Weighing for compound {compound_id} aborted during {stage}; stock unchanged: {source}")]
    TransactionAborted {
        compound_id: i64,
        stage: Stage,
        #[source]
        source: Box<WeighingError>,
    },

    #[error(transparent)]
    Database(#[from] DbError),
}

impl WeighingError {
    /// Short machine-readable kind, used in tool responses
    pub fn kind(&self) -> &'static str {
        match self {
            WeighingError::UnrecognizedUnit { .. } => "unrecognized_unit",
            WeighingError::InvalidQuantity { .. } => "invalid_quantity",
            WeighingError::DivisionByZero { .. } => "division_by_zero",
            WeighingError::MissingField { .. } => "missing_field",
            WeighingError::InvalidCasNumber { .. } => "invalid_cas_number",
            WeighingError::CompoundNotFound { .. } => "compound_not_found",
            WeighingError::InsufficientStock { .. } => "insufficient_stock",
            WeighingError::PayloadTooLong { .. } => "payload_too_long",
            WeighingError::UnencodablePayload { .. } => "unencodable_payload",
            WeighingError::TransactionAborted { .. } => "transaction_aborted",
            WeighingError::Database(_) => "database",
        }
    }

    /// Wrap a failure that happened after the debit was staged; the debit is
    /// rolled back with it
    pub fn aborted(compound_id: i64, stage: Stage, source: WeighingError) -> Self {
        WeighingError::TransactionAborted {
            compound_id,
            stage,
            source: Box::new(source),
        }
    }
}

impl From<rusqlite::Error> for WeighingError {
    fn from(e: rusqlite::Error) -> Self {
        WeighingError::Database(DbError::Sqlite(e))
    }
}

pub type WeighingResult<T> = Result<T, WeighingError>;
