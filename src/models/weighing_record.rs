//! Weighing Record model
//!
//! The "usage" entry created by every committed weighing. Records are
//! append-only: there is no update or delete.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use super::{parse_column, Label};
use crate::concentration::ConcentrationUnit;
use crate::db::{DbError, DbResult};
use crate::measure::MassUnit;

/// A persisted weighing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeighingRecord {
    pub id: i64,
    pub compound_id: i64,
    /// Weighed mass, normalized to mg
    pub mass_mg: f64,
    /// Prepared volume, normalized to mL
    pub volume_ml: f64,
    /// Concentration in `concentration_unit`, full precision
    pub concentration: f64,
    pub concentration_unit: ConcentrationUnit,
    /// Stock left after this weighing, in `remaining_stock_unit`
    pub remaining_stock: f64,
    pub remaining_stock_unit: MassUnit,
    pub below_critical: bool,
    pub solvent: String,
    pub prepared_by: String,
    pub recorded_at: String,
    pub label_code: String,
}

/// A fully-formed weighing ready to be stored
#[derive(Debug, Clone, Serialize)]
pub struct WeighingRecordCreate {
    pub compound_id: i64,
    pub mass_mg: f64,
    pub volume_ml: f64,
    pub concentration: f64,
    pub concentration_unit: ConcentrationUnit,
    pub remaining_stock: f64,
    pub remaining_stock_unit: MassUnit,
    pub below_critical: bool,
    pub solvent: String,
    pub prepared_by: String,
    pub recorded_at: DateTime<Utc>,
    pub label_code: String,
}

impl WeighingRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            compound_id: row.get("compound_id")?,
            mass_mg: row.get("mass_mg")?,
            volume_ml: row.get("volume_ml")?,
            concentration: row.get("concentration")?,
            concentration_unit: parse_column(row, "concentration_unit")?,
            remaining_stock: row.get("remaining_stock")?,
            remaining_stock_unit: parse_column(row, "remaining_stock_unit")?,
            below_critical: row.get("below_critical")?,
            solvent: row.get("solvent")?,
            prepared_by: row.get("prepared_by")?,
            recorded_at: row.get("recorded_at")?,
            label_code: row.get("label_code")?,
        })
    }

    pub fn create(conn: &Connection, data: &WeighingRecordCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO weighing_records (
                compound_id, mass_mg, volume_ml, concentration, concentration_unit,
                remaining_stock, remaining_stock_unit, below_critical, solvent,
                prepared_by, recorded_at, label_code
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                data.compound_id,
                data.mass_mg,
                data.volume_ml,
                data.concentration,
                data.concentration_unit.symbol(),
                data.remaining_stock,
                data.remaining_stock_unit.symbol(),
                data.below_critical,
                data.solvent,
                data.prepared_by,
                data.recorded_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                data.label_code,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM weighing_records WHERE id = ?1")?;

        match stmt.query_row([id], Self::from_row) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_by_label_code(conn: &Connection, label_code: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM weighing_records WHERE label_code = ?1")?;

        match stmt.query_row([label_code], Self::from_row) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Weighings for a compound, newest first
    pub fn list_for_compound(conn: &Connection, compound_id: i64, limit: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM weighing_records
            WHERE compound_id = ?1
            ORDER BY id DESC
            LIMIT ?2
            "#,
        )?;

        let records = stmt
            .query_map(params![compound_id, limit], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    pub fn count(conn: &Connection) -> DbResult<i64> {
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM weighing_records", [], |row| row.get(0))?;
        Ok(count)
    }
}

/// Store a weighing record and its label together.
///
/// Callers run this inside a transaction so both rows land or neither does.
pub fn persist_weighing(
    conn: &Connection,
    record: &WeighingRecordCreate,
    label: &Label,
) -> DbResult<WeighingRecord> {
    let stored = WeighingRecord::create(conn, record)?;
    Label::create(conn, label, stored.id)?;
    Ok(stored)
}
