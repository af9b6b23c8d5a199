//! Stock ledger
//!
//! The single writer of compound stock. Every change runs under a lock keyed
//! by compound id and inside one SQLite transaction, and leaves a row in the
//! stock movement audit trail. `debit_with` lets a caller add its own writes
//! to the debit's transaction so they commit or roll back together.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use rusqlite::{Connection, Transaction};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::error::{WeighingError, WeighingResult};
use crate::measure::normalize_mass;
use crate::models::{is_below_critical, Compound, MovementKind, StockMovement, StockMovementCreate};

/// Floating-point slack allowed when a debit empties the stock exactly
pub const STOCK_TOLERANCE_MG: f64 = 1e-9;

/// Reason recorded on debits issued by a weighing
pub const WEIGHING_REASON: &str = "weighing";

/// Map of per-key mutexes.
///
/// Holders of different keys never wait on each other; holders of the same
/// key run one at a time, in the order they acquired the lock.
///
/// Entries are never removed. Keys are compound ids, so the map is bounded by
/// the size of the compound catalog.
#[derive(Default)]
pub struct KeyedLocks {
    locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`
    pub fn with_lock<T>(&self, key: i64, f: impl FnOnce() -> T) -> T {
        // Clone the Arc out so the shard guard is released before blocking
        let lock = self.locks.entry(key).or_default().clone();
        let _guard = lock.lock();
        f()
    }

    /// Number of keys that have ever been locked
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Result of a committed stock change
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StockChange {
    pub compound_id: i64,
    pub kind: MovementKind,
    pub amount_mg: f64,
    pub stock_before_mg: f64,
    pub remaining_mg: f64,
    pub critical_mg: f64,
    /// Advisory only; the ledger takes no action on it
    pub below_critical: bool,
    pub movement_id: i64,
}

/// Authority for live compound stock
pub struct StockLedger {
    database: Database,
    locks: KeyedLocks,
}

impl StockLedger {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            locks: KeyedLocks::new(),
        }
    }

    /// Debit `amount` expressed in `unit`, normalizing it to mg first
    pub fn debit_in(&self, compound_id: i64, amount: f64, unit: &str) -> WeighingResult<StockChange> {
        let amount_mg = normalize_mass(amount, unit)?;
        self.debit(compound_id, amount_mg)
    }

    /// Remove `amount_mg` from a compound's stock.
    ///
    /// All-or-nothing: a debit that would leave negative stock fails with
    /// `InsufficientStock` and changes nothing.
    pub fn debit(&self, compound_id: i64, amount_mg: f64) -> WeighingResult<StockChange> {
        self.debit_with(compound_id, amount_mg, |_, _| Ok(()))
            .map(|(change, ())| change)
    }

    /// Debit `amount_mg`, then run `then` inside the same transaction while
    /// the compound's lock is held.
    ///
    /// Nothing commits unless `then` succeeds. On error the debit and every
    /// write `then` made are rolled back, and other debits of the compound
    /// never observe the intermediate stock.
    pub fn debit_with<T>(
        &self,
        compound_id: i64,
        amount_mg: f64,
        then: impl FnOnce(&Transaction<'_>, &StockChange) -> WeighingResult<T>,
    ) -> WeighingResult<(StockChange, T)> {
        check_amount(amount_mg)?;

        let (change, value) = self.locks.with_lock(compound_id, || {
            self.database.with_transaction(|tx| {
                let change = debit_stock(tx, compound_id, amount_mg)?;
                let value = then(tx, &change)?;
                Ok::<_, WeighingError>((change, value))
            })
        })?;

        info!(
            compound_id,
            amount_mg,
            remaining_mg = change.remaining_mg,
            "Stock debited"
        );
        if change.below_critical {
            warn!(
                compound_id,
                remaining_mg = change.remaining_mg,
                critical_mg = change.critical_mg,
                "Stock below critical level"
            );
        }

        Ok((change, value))
    }

    /// Credit `amount` expressed in `unit`, normalizing it to mg first
    pub fn credit_in(
        &self,
        compound_id: i64,
        amount: f64,
        unit: &str,
        reason: &str,
    ) -> WeighingResult<StockChange> {
        let amount_mg = normalize_mass(amount, unit)?;
        self.credit(compound_id, amount_mg, reason)
    }

    /// Return `amount_mg` to a compound's stock, e.g. a restock or a correction
    pub fn credit(&self, compound_id: i64, amount_mg: f64, reason: &str) -> WeighingResult<StockChange> {
        check_amount(amount_mg)?;

        let change = self.locks.with_lock(compound_id, || {
            self.database.with_transaction(|tx| {
                let compound = Compound::get_by_id(tx, compound_id)?
                    .ok_or(WeighingError::CompoundNotFound { compound_id })?;
                let remaining_mg = compound.stock_mg + amount_mg;
                apply(tx, &compound, MovementKind::Credit, amount_mg, remaining_mg, reason)
            })
        })?;

        info!(
            compound_id,
            amount_mg,
            remaining_mg = change.remaining_mg,
            reason,
            "Stock credited"
        );
        Ok(change)
    }

    /// Current stock in mg
    pub fn stock_mg(&self, compound_id: i64) -> WeighingResult<f64> {
        let compound = self
            .database
            .with_conn(|conn| Compound::get_by_id(conn, compound_id))?
            .ok_or(WeighingError::CompoundNotFound { compound_id })?;
        Ok(compound.stock_mg)
    }
}

fn check_amount(amount_mg: f64) -> WeighingResult<()> {
    if !amount_mg.is_finite() || amount_mg < 0.0 {
        return Err(WeighingError::InvalidQuantity {
            field: "amount_mg",
            value: amount_mg,
        });
    }
    Ok(())
}

fn debit_stock(conn: &Connection, compound_id: i64, amount_mg: f64) -> WeighingResult<StockChange> {
    let compound = Compound::get_by_id(conn, compound_id)?
        .ok_or(WeighingError::CompoundNotFound { compound_id })?;

    let remaining_mg = compound.stock_mg - amount_mg;
    if remaining_mg < -STOCK_TOLERANCE_MG {
        return Err(WeighingError::InsufficientStock {
            compound_id,
            requested_mg: amount_mg,
            available_mg: compound.stock_mg,
        });
    }
    let remaining_mg = remaining_mg.max(0.0);

    apply(conn, &compound, MovementKind::Debit, amount_mg, remaining_mg, WEIGHING_REASON)
}

fn apply(
    conn: &Connection,
    compound: &Compound,
    kind: MovementKind,
    amount_mg: f64,
    remaining_mg: f64,
    reason: &str,
) -> WeighingResult<StockChange> {
    Compound::set_stock_mg(conn, compound.id, remaining_mg)?;
    let movement_id = StockMovement::record(
        conn,
        &StockMovementCreate {
            compound_id: compound.id,
            kind,
            amount_mg,
            stock_before_mg: compound.stock_mg,
            stock_after_mg: remaining_mg,
            reason,
        },
    )?;
    debug!(compound_id = compound.id, %kind, movement_id, "Recorded stock movement");

    Ok(StockChange {
        compound_id: compound.id,
        kind,
        amount_mg,
        stock_before_mg: compound.stock_mg,
        remaining_mg,
        critical_mg: compound.critical_mg,
        below_critical: is_below_critical(remaining_mg, compound.critical_mg),
        movement_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompoundCreate, Label};
    use tempfile::TempDir;

    fn setup() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::open_migrated(dir.path().join("ledger.db")).unwrap();
        (dir, database)
    }

    fn add_compound(database: &Database, name: &str, stock_mg: f64, critical_mg: f64) -> i64 {
        database
            .with_conn(|conn| {
                Ok(Compound::create(
                    conn,
                    &CompoundCreate {
                        name: name.to_string(),
                        cas_number: "58-08-2".to_string(),
                        solvent: String::new(),
                        stock_value: stock_mg,
                        stock_unit: "mg".to_string(),
                        critical_value: critical_mg,
                        critical_unit: "mg".to_string(),
                    },
                )
                .unwrap())
            })
            .unwrap()
            .id
    }

    fn movements(database: &Database, compound_id: i64) -> Vec<StockMovement> {
        database
            .with_conn(|conn| StockMovement::list_for_compound(conn, compound_id, 100))
            .unwrap()
    }

    #[test]
    fn test_debit_updates_stock() {
        let (_dir, database) = setup();
        let id = add_compound(&database, "Caffeine", 500.0, 50.0);
        let ledger = StockLedger::new(database.clone());

        let change = ledger.debit(id, 12.5).unwrap();
        assert_eq!(change.remaining_mg, 487.5);
        assert!(!change.below_critical);
        assert_eq!(ledger.stock_mg(id).unwrap(), 487.5);

        let trail = movements(&database, id);
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].kind, MovementKind::Debit);
        assert_eq!(trail[0].stock_before_mg, 500.0);
        assert_eq!(trail[0].stock_after_mg, 487.5);
    }

    #[test]
    fn test_debit_in_normalizes() {
        let (_dir, database) = setup();
        let id = add_compound(&database, "Caffeine", 500.0, 0.0);
        let ledger = StockLedger::new(database);

        let change = ledger.debit_in(id, 0.1, "g").unwrap();
        assert!((change.remaining_mg - 400.0).abs() < 1e-9);
        assert!(matches!(
            ledger.debit_in(id, 1.0, "oz"),
            Err(WeighingError::UnrecognizedUnit { .. })
        ));
    }

    #[test]
    fn test_insufficient_stock_leaves_stock_unchanged() {
        let (_dir, database) = setup();
        let id = add_compound(&database, "Caffeine", 5.0, 0.0);
        let ledger = StockLedger::new(database.clone());

        let err = ledger.debit(id, 12.5).unwrap_err();
        assert!(matches!(
            err,
            WeighingError::InsufficientStock { requested_mg, available_mg, .. }
                if requested_mg == 12.5 && available_mg == 5.0
        ));
        assert_eq!(ledger.stock_mg(id).unwrap(), 5.0);
        assert!(movements(&database, id).is_empty());
    }

    #[test]
    fn test_debit_exact_stock_reaches_zero() {
        let (_dir, database) = setup();
        let id = add_compound(&database, "Caffeine", 0.3, 0.1);
        let ledger = StockLedger::new(database);

        ledger.debit(id, 0.1).unwrap();
        let change = ledger.debit(id, 0.2).unwrap();
        assert_eq!(change.remaining_mg, 0.0);
        assert!(change.below_critical);
    }

    #[test]
    fn test_unknown_compound_and_bad_amount() {
        let (_dir, database) = setup();
        let ledger = StockLedger::new(database);

        assert!(matches!(
            ledger.debit(42, 1.0),
            Err(WeighingError::CompoundNotFound { compound_id: 42 })
        ));
        assert!(matches!(
            ledger.debit(42, -1.0),
            Err(WeighingError::InvalidQuantity { .. })
        ));
        assert!(matches!(
            ledger.debit(42, f64::NAN),
            Err(WeighingError::InvalidQuantity { .. })
        ));
    }

    #[test]
    fn test_credit_restores_stock() {
        let (_dir, database) = setup();
        let id = add_compound(&database, "Caffeine", 100.0, 0.0);
        let ledger = StockLedger::new(database.clone());

        ledger.debit(id, 40.0).unwrap();
        let change = ledger.credit(id, 40.0, "restock").unwrap();
        assert_eq!(change.remaining_mg, 100.0);
        assert_eq!(change.kind, MovementKind::Credit);

        let trail = movements(&database, id);
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0].reason, "restock");
    }

    #[test]
    fn test_debit_with_commits_together() {
        let (_dir, database) = setup();
        let id = add_compound(&database, "Caffeine", 100.0, 0.0);
        let ledger = StockLedger::new(database.clone());

        let (change, sequence) = ledger
            .debit_with(id, 25.0, |tx, change| {
                assert_eq!(change.remaining_mg, 75.0);
                Label::reserve_sequence(tx, 3)?;
                Ok(3)
            })
            .unwrap();
        assert_eq!(change.remaining_mg, 75.0);
        assert_eq!(sequence, 3);
        assert_eq!(ledger.stock_mg(id).unwrap(), 75.0);
        assert_eq!(database.with_conn(Label::last_sequence).unwrap(), 3);
    }

    #[test]
    fn test_debit_with_failure_rolls_back() {
        let (_dir, database) = setup();
        let id = add_compound(&database, "Caffeine", 100.0, 0.0);
        let ledger = StockLedger::new(database.clone());

        let err = ledger
            .debit_with(id, 25.0, |tx, _| -> WeighingResult<()> {
                Label::reserve_sequence(tx, 9)?;
                Err(WeighingError::MissingField { field: "label" })
            })
            .unwrap_err();
        assert!(matches!(err, WeighingError::MissingField { field: "label" }));
        assert_eq!(ledger.stock_mg(id).unwrap(), 100.0);
        assert!(movements(&database, id).is_empty());
        assert_eq!(database.with_conn(Label::last_sequence).unwrap(), 0);

        // The lock was released with the rolled-back transaction
        assert_eq!(ledger.debit(id, 100.0).unwrap().remaining_mg, 0.0);
    }

    #[test]
    fn test_concurrent_debits_never_overdraw() {
        let (_dir, database) = setup();
        let id = add_compound(&database, "Caffeine", 100.0, 0.0);
        let ledger = StockLedger::new(database.clone());

        let successes: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|_| s.spawn(|| ledger.debit(id, 10.0).is_ok()))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });

        assert_eq!(successes, 10);
        assert_eq!(ledger.stock_mg(id).unwrap(), 0.0);
        assert_eq!(movements(&database, id).len(), 10);
    }

    #[test]
    fn test_compounds_are_independent() {
        let (_dir, database) = setup();
        let a = add_compound(&database, "Caffeine", 50.0, 0.0);
        let b = add_compound(&database, "Acetone", 50.0, 0.0);
        let ledger = StockLedger::new(database);

        std::thread::scope(|s| {
            for _ in 0..5 {
                s.spawn(|| ledger.debit(a, 10.0).unwrap());
                s.spawn(|| ledger.debit(b, 5.0).unwrap());
            }
        });

        assert_eq!(ledger.stock_mg(a).unwrap(), 0.0);
        assert_eq!(ledger.stock_mg(b).unwrap(), 25.0);
    }

    #[test]
    fn test_keyed_locks_track_keys() {
        let locks = KeyedLocks::new();
        assert!(locks.is_empty());
        assert_eq!(locks.with_lock(1, || 7), 7);
        locks.with_lock(2, || ());
        locks.with_lock(1, || ());
        assert_eq!(locks.len(), 2);
    }
}
