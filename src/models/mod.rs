//! Data models
//!
//! Rust structs representing database entities.

mod compound;
mod label;
mod stock_movement;
mod weighing_record;

use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::Row;

pub use compound::{is_below_critical, is_valid_cas, Compound, CompoundCreate};
pub use label::{Label, PAYLOAD_SEPARATOR};
pub use stock_movement::{MovementKind, StockMovement, StockMovementCreate};
pub use weighing_record::{persist_weighing, WeighingRecord, WeighingRecordCreate};

/// Read a text column and parse it into a typed value (units, kinds)
pub(crate) fn parse_column<T>(row: &Row, column: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(column)?;
    raw.parse().map_err(|e| {
        let index = row.as_ref().column_index(column).unwrap_or(0);
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e))
    })
}
