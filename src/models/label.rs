//! Label model
//!
//! Human-readable label content plus the unique label code. One label per
//! weighing record; labels are never mutated.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;

/// Field separator of the descriptive payload
pub const PAYLOAD_SEPARATOR: char = '|';

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub label_code: String,
    /// Global sequence number the code was minted from
    pub sequence: u64,
    pub compound_name: String,
    pub cas_number: String,
    /// Display string, e.g. "1.250 mg/mL"
    pub concentration: String,
    /// Preparation date, ISO "YYYY-MM-DD"
    pub date: String,
    pub prepared_by: String,
}

impl Label {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let sequence: i64 = row.get("sequence")?;
        Ok(Self {
            label_code: row.get("label_code")?,
            sequence: sequence as u64,
            compound_name: row.get("compound_name")?,
            cas_number: row.get("cas_number")?,
            concentration: row.get("concentration")?,
            date: row.get("date")?,
            prepared_by: row.get("prepared_by")?,
        })
    }

    /// Full descriptive string for a matrix code: code|name|CAS|concentration|date
    pub fn descriptive_payload(&self) -> String {
        [
            self.label_code.as_str(),
            self.compound_name.as_str(),
            self.cas_number.as_str(),
            self.concentration.as_str(),
            self.date.as_str(),
        ]
        .join(&PAYLOAD_SEPARATOR.to_string())
    }

    pub fn create(conn: &Connection, label: &Label, weighing_record_id: i64) -> DbResult<()> {
        conn.execute(
            r#"
            INSERT INTO labels (
                label_code, sequence, weighing_record_id, compound_name,
                cas_number, concentration, date, prepared_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                label.label_code,
                label.sequence as i64,
                weighing_record_id,
                label.compound_name,
                label.cas_number,
                label.concentration,
                label.date,
                label.prepared_by,
            ],
        )?;
        Ok(())
    }

    pub fn get_by_code(conn: &Connection, label_code: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM labels WHERE label_code = ?1")?;
        Ok(stmt.query_row([label_code], Self::from_row).optional()?)
    }

    pub fn count(conn: &Connection) -> DbResult<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM labels", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Highest sequence ever handed out, from the reservation mark and stored labels
    pub fn last_sequence(conn: &Connection) -> DbResult<u64> {
        let last: i64 = conn.query_row(
            r#"
            SELECT MAX(
                (SELECT last_value FROM label_sequence WHERE id = 1),
                COALESCE((SELECT MAX(sequence) FROM labels), 0)
            )
            "#,
            [],
            |row| row.get(0),
        )?;
        Ok(last.max(0) as u64)
    }

    /// Move the sequence reservation mark forward to `sequence`
    pub fn reserve_sequence(conn: &Connection, sequence: u64) -> DbResult<()> {
        conn.execute(
            "UPDATE label_sequence SET last_value = MAX(last_value, ?1) WHERE id = 1",
            [sequence as i64],
        )?;
        Ok(())
    }
}
