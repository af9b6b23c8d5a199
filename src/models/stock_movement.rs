//! Stock Movement model
//!
//! Append-only audit trail of ledger changes: weighing debits and restock
//! credits.

use std::fmt;
use std::str::FromStr;

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use super::parse_column;
use crate::db::DbResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Debit,
    Credit,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Debit => "debit",
            MovementKind::Credit => "credit",
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMovementKind(String);

impl fmt::Display for UnknownMovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown movement kind '{}'", self.0)
    }
}

impl std::error::Error for UnknownMovementKind {}

impl FromStr for MovementKind {
    type Err = UnknownMovementKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debit" => Ok(MovementKind::Debit),
            "credit" => Ok(MovementKind::Credit),
            other => Err(UnknownMovementKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: i64,
    pub compound_id: i64,
    pub kind: MovementKind,
    pub amount_mg: f64,
    pub stock_before_mg: f64,
    pub stock_after_mg: f64,
    pub reason: String,
    pub created_at: String,
}

/// Data for recording a movement
#[derive(Debug, Clone)]
pub struct StockMovementCreate<'a> {
    pub compound_id: i64,
    pub kind: MovementKind,
    pub amount_mg: f64,
    pub stock_before_mg: f64,
    pub stock_after_mg: f64,
    pub reason: &'a str,
}

impl StockMovement {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            compound_id: row.get("compound_id")?,
            kind: parse_column(row, "kind")?,
            amount_mg: row.get("amount_mg")?,
            stock_before_mg: row.get("stock_before_mg")?,
            stock_after_mg: row.get("stock_after_mg")?,
            reason: row.get("reason")?,
            created_at: row.get("created_at")?,
        })
    }

    pub fn record(conn: &Connection, data: &StockMovementCreate<'_>) -> DbResult<i64> {
        conn.execute(
            r#"
            INSERT INTO stock_movements (
                compound_id, kind, amount_mg, stock_before_mg, stock_after_mg, reason
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                data.compound_id,
                data.kind.as_str(),
                data.amount_mg,
                data.stock_before_mg,
                data.stock_after_mg,
                data.reason,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Most recent movements for a compound, newest first
    pub fn list_for_compound(conn: &Connection, compound_id: i64, limit: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM stock_movements
            WHERE compound_id = ?1
            ORDER BY id DESC
            LIMIT ?2
            "#,
        )?;

        let items = stmt
            .query_map(params![compound_id, limit], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }
}
