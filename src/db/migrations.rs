//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
    }

    Ok(())
}

/// Migration v1: Initial schema
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- COMPOUNDS
        -- Catalog entries with live stock, stored canonically in mg
        -- ============================================
        CREATE TABLE compounds (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            cas_number TEXT NOT NULL,
            solvent TEXT NOT NULL DEFAULT '',
            stock_mg REAL NOT NULL CHECK(stock_mg >= 0),
            stock_unit TEXT NOT NULL DEFAULT 'mg',      -- display unit for stock
            critical_mg REAL NOT NULL DEFAULT 0 CHECK(critical_mg >= 0),
            critical_unit TEXT NOT NULL DEFAULT 'mg',

            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_compounds_name ON compounds(name);
        CREATE INDEX idx_compounds_cas ON compounds(cas_number);

        -- ============================================
        -- STOCK MOVEMENTS
        -- Append-only audit of every ledger change
        -- ============================================
        CREATE TABLE stock_movements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            compound_id INTEGER NOT NULL REFERENCES compounds(id) ON DELETE CASCADE,
            kind TEXT NOT NULL CHECK(kind IN ('debit', 'credit')),
            amount_mg REAL NOT NULL CHECK(amount_mg >= 0),
            stock_before_mg REAL NOT NULL,
            stock_after_mg REAL NOT NULL,
            reason TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX idx_stock_movements_compound ON stock_movements(compound_id);

        -- ============================================
        -- WEIGHING RECORDS
        -- One row per committed weighing ("usage")
        -- ============================================
        CREATE TABLE weighing_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            compound_id INTEGER NOT NULL REFERENCES compounds(id) ON DELETE RESTRICT,
            mass_mg REAL NOT NULL,
            volume_ml REAL NOT NULL,
            concentration REAL NOT NULL,
            concentration_unit TEXT NOT NULL,
            remaining_stock REAL NOT NULL,
            remaining_stock_unit TEXT NOT NULL,
            below_critical INTEGER NOT NULL DEFAULT 0,   -- boolean
            solvent TEXT NOT NULL,
            prepared_by TEXT NOT NULL,
            recorded_at TEXT NOT NULL,
            label_code TEXT NOT NULL UNIQUE
        );

        CREATE INDEX idx_weighing_records_compound ON weighing_records(compound_id);

        -- ============================================
        -- LABELS
        -- One per weighing record, never mutated
        -- ============================================
        CREATE TABLE labels (
            label_code TEXT PRIMARY KEY,
            sequence INTEGER NOT NULL UNIQUE,
            weighing_record_id INTEGER NOT NULL UNIQUE REFERENCES weighing_records(id) ON DELETE RESTRICT,
            compound_name TEXT NOT NULL,
            cas_number TEXT NOT NULL,
            concentration TEXT NOT NULL,                 -- display string
            date TEXT NOT NULL,                          -- ISO date: "2026-10-19"
            prepared_by TEXT NOT NULL
        );

        -- ============================================
        -- LABEL SEQUENCE
        -- High-water mark of minted sequence numbers (single row)
        -- ============================================
        CREATE TABLE label_sequence (
            id INTEGER PRIMARY KEY CHECK(id = 1),
            last_value INTEGER NOT NULL
        );

        INSERT INTO label_sequence (id, last_value) VALUES (1, 0);
        "#,
    )?;

    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}
