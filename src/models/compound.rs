//! Compound model
//!
//! A catalog entry with its live stock. Stock and critical levels are stored in
//! milligrams; the unit columns only choose how they are displayed.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use super::parse_column;
use crate::db::{DbError, DbResult};
use crate::error::{WeighingError, WeighingResult};
use crate::measure::MassUnit;

/// A compound with stock information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Compound {
    pub id: i64,
    pub name: String,
    pub cas_number: String,
    /// Default solvent for stock solutions
    pub solvent: String,
    pub stock_mg: f64,
    pub stock_unit: MassUnit,
    pub critical_mg: f64,
    pub critical_unit: MassUnit,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a new compound
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompoundCreate {
    pub name: String,
    pub cas_number: String,
    #[serde(default)]
    pub solvent: String,
    pub stock_value: f64,
    pub stock_unit: String,
    #[serde(default)]
    pub critical_value: f64,
    #[serde(default = "default_unit")]
    pub critical_unit: String,
}

fn default_unit() -> String {
    MassUnit::Milligram.symbol().to_string()
}

impl Compound {
    /// Create a Compound from a database row
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            cas_number: row.get("cas_number")?,
            solvent: row.get("solvent")?,
            stock_mg: row.get("stock_mg")?,
            stock_unit: parse_column(row, "stock_unit")?,
            critical_mg: row.get("critical_mg")?,
            critical_unit: parse_column(row, "critical_unit")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Current stock expressed in the compound's stock unit
    pub fn stock_value(&self) -> f64 {
        self.stock_unit.from_mg(self.stock_mg)
    }

    /// Critical threshold expressed in the compound's critical unit
    pub fn critical_value(&self) -> f64 {
        self.critical_unit.from_mg(self.critical_mg)
    }

    pub fn is_below_critical(&self) -> bool {
        is_below_critical(self.stock_mg, self.critical_mg)
    }

    /// Insert a new compound, normalizing stock and critical levels to mg
    pub fn create(conn: &Connection, data: &CompoundCreate) -> WeighingResult<Self> {
        let name = data.name.trim();
        if name.is_empty() {
            return Err(WeighingError::MissingField { field: "name" });
        }
        let cas_number = data.cas_number.trim();
        if !is_valid_cas(cas_number) {
            return Err(WeighingError::InvalidCasNumber {
                cas_number: data.cas_number.clone(),
            });
        }

        let stock_unit: MassUnit = data.stock_unit.parse()?;
        let critical_unit: MassUnit = data.critical_unit.parse()?;
        for (field, value) in [
            ("stock_value", data.stock_value),
            ("critical_value", data.critical_value),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(WeighingError::InvalidQuantity { field, value });
            }
        }

        conn.execute(
            r#"
            INSERT INTO compounds (
                name, cas_number, solvent, stock_mg, stock_unit, critical_mg, critical_unit
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                name,
                cas_number,
                data.solvent.trim(),
                stock_unit.to_mg(data.stock_value),
                stock_unit.symbol(),
                critical_unit.to_mg(data.critical_value),
                critical_unit.symbol(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        let compound = Self::get_by_id(conn, id)?
            .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))?;
        Ok(compound)
    }

    /// Get a compound by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM compounds WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(compound) => Ok(Some(compound)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List compounds ordered by name
    pub fn list(conn: &Connection, limit: i64, offset: i64) -> DbResult<Vec<Self>> {
        let mut stmt =
            conn.prepare("SELECT * FROM compounds ORDER BY name ASC LIMIT ?1 OFFSET ?2")?;

        let items = stmt
            .query_map(params![limit, offset], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// Compounds whose stock is below their critical level
    pub fn list_below_critical(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM compounds WHERE stock_mg < critical_mg ORDER BY name ASC",
        )?;

        let items = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    pub fn count(conn: &Connection) -> DbResult<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM compounds", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Overwrite the stored stock. Only the stock ledger calls this.
    pub(crate) fn set_stock_mg(conn: &Connection, id: i64, stock_mg: f64) -> DbResult<()> {
        conn.execute(
            "UPDATE compounds SET stock_mg = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![stock_mg, id],
        )?;
        Ok(())
    }
}

/// Stock is low once it drops strictly under the critical level
pub fn is_below_critical(stock_mg: f64, critical_mg: f64) -> bool {
    stock_mg < critical_mg
}

/// Validate a CAS registry number ("7732-18-5"), including its check digit
pub fn is_valid_cas(cas: &str) -> bool {
    let parts: Vec<&str> = cas.split('-').collect();
    let [first, second, check] = parts[..] else {
        return false;
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !(2..=7).contains(&first.len())
        || second.len() != 2
        || check.len() != 1
        || !all_digits(first)
        || !all_digits(second)
        || !all_digits(check)
    {
        return false;
    }

    let sum: u32 = first
        .bytes()
        .chain(second.bytes())
        .rev()
        .enumerate()
        .map(|(i, b)| (i as u32 + 1) * u32::from(b - b'0'))
        .sum();
    let expected = u32::from(check.as_bytes()[0] - b'0');
    sum % 10 == expected
}
