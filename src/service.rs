//! Weighing orchestration
//!
//! A submission moves through `Validated → Normalized → Computed → Debited →
//! Labeled → Completed`. Everything before the debit is side-effect free.
//! The debit, the label sequence reservation and the record + label rows are
//! written in one SQLite transaction under the compound's ledger lock, so a
//! rejected weighing never leaves a stock change, a record or a label behind.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use rusqlite::Transaction;
use tracing::{debug, info, warn};

use crate::concentration::{self, Concentration, ConcentrationUnit};
use crate::config::Config;
use crate::db::Database;
use crate::error::{Stage, WeighingError, WeighingResult};
use crate::label::{EncodedLabel, EncoderSettings, LabelCodeGenerator, LabelEncoder};
use crate::ledger::{StockChange, StockLedger};
use crate::measure::{normalize_mass, normalize_volume};
use crate::models::{persist_weighing, Compound, Label, WeighingRecord, WeighingRecordCreate};

/// Lifecycle of one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeighingState {
    Validated,
    Normalized,
    Computed,
    Debited,
    Labeled,
    Completed,
    Rejected,
}

impl fmt::Display for WeighingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WeighingState::Validated => "validated",
            WeighingState::Normalized => "normalized",
            WeighingState::Computed => "computed",
            WeighingState::Debited => "debited",
            WeighingState::Labeled => "labeled",
            WeighingState::Completed => "completed",
            WeighingState::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// One weighing submission as entered on the bench
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeighingRequest {
    pub compound_id: i64,
    pub weighed_amount: f64,
    pub weighed_unit: String,
    pub prepared_volume: f64,
    pub volume_unit: String,
    /// Falls back to the compound's default solvent when absent or blank
    #[serde(default)]
    pub solvent: Option<String>,
    pub prepared_by: String,
    /// Display unit for the concentration; the service default when absent
    #[serde(default)]
    pub concentration_unit: Option<String>,
}

/// Everything a committed weighing produced
#[derive(Debug, Clone)]
pub struct WeighingOutcome {
    pub record: WeighingRecord,
    pub label: Label,
    pub encoded: EncodedLabel,
    pub below_critical: bool,
}

/// Inputs after normalization and computation, before any side effect
struct Prepared {
    mass_mg: f64,
    volume_ml: f64,
    concentration: Concentration,
}

pub struct WeighingService {
    database: Database,
    ledger: StockLedger,
    codes: LabelCodeGenerator,
    encoder: LabelEncoder,
    default_unit: ConcentrationUnit,
}

impl WeighingService {
    /// Create the service, resuming the label sequence from the database
    pub fn new(
        database: Database,
        encoder: EncoderSettings,
        default_unit: ConcentrationUnit,
    ) -> WeighingResult<Self> {
        let last_issued = database.with_conn(Label::last_sequence)?;
        info!(last_issued, "Label sequence resumed");

        Ok(Self {
            ledger: StockLedger::new(database.clone()),
            codes: LabelCodeGenerator::resume(last_issued),
            encoder: LabelEncoder::new(encoder),
            default_unit,
            database,
        })
    }

    pub fn from_config(database: Database, config: &Config) -> WeighingResult<Self> {
        Self::new(database, config.encoder, config.concentration_unit)
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn ledger(&self) -> &StockLedger {
        &self.ledger
    }

    pub fn encoder(&self) -> &LabelEncoder {
        &self.encoder
    }

    pub fn last_issued_sequence(&self) -> u64 {
        self.codes.last_issued()
    }

    /// Submit a weighing stamped with the current time
    pub fn submit(&self, request: &WeighingRequest) -> WeighingResult<WeighingOutcome> {
        self.submit_at(request, Utc::now())
    }

    /// Submit a weighing stamped with `now`
    pub fn submit_at(
        &self,
        request: &WeighingRequest,
        now: DateTime<Utc>,
    ) -> WeighingResult<WeighingOutcome> {
        let result = self.run(request, now);
        if let Err(e) = &result {
            warn!(
                compound_id = request.compound_id,
                state = %WeighingState::Rejected,
                kind = e.kind(),
                error = %e,
                "Weighing rejected"
            );
        }
        result
    }

    fn run(&self, request: &WeighingRequest, now: DateTime<Utc>) -> WeighingResult<WeighingOutcome> {
        let compound_id = request.compound_id;

        validate(request)?;
        debug!(compound_id, state = %WeighingState::Validated, "Weighing request accepted");

        let prepared = self.prepare(request)?;

        let compound = self
            .database
            .with_conn(|conn| Compound::get_by_id(conn, compound_id))?
            .ok_or(WeighingError::CompoundNotFound { compound_id })?;

        let mut minted = None;
        let result = self.ledger.debit_with(compound_id, prepared.mass_mg, |tx, change| {
            debug!(
                compound_id,
                state = %WeighingState::Debited,
                remaining_mg = change.remaining_mg,
                "Stock reserved for weighing"
            );
            self.record(tx, request, &compound, &prepared, change, now, &mut minted)
        });

        match result {
            Ok((change, outcome)) => {
                info!(
                    compound_id,
                    state = %WeighingState::Completed,
                    label_code = %outcome.label.label_code,
                    concentration = %outcome.label.concentration,
                    remaining_mg = change.remaining_mg,
                    "Weighing recorded"
                );
                Ok(outcome)
            }
            Err(e) => {
                let Some(sequence) = minted else {
                    return Err(e);
                };
                self.retire_sequence(sequence);
                match e {
                    // Only the commit can still fail with a bare database error
                    WeighingError::Database(db) => {
                        Err(WeighingError::aborted(compound_id, Stage::Persist, db.into()))
                    }
                    e => Err(e),
                }
            }
        }
    }

    fn prepare(&self, request: &WeighingRequest) -> WeighingResult<Prepared> {
        let mass_mg = normalize_mass(request.weighed_amount, &request.weighed_unit)?;
        let volume_ml = normalize_volume(request.prepared_volume, &request.volume_unit)?;
        let unit = match request.concentration_unit.as_deref().map(str::trim) {
            Some(unit) if !unit.is_empty() => unit.parse()?,
            _ => self.default_unit,
        };
        debug!(
            compound_id = request.compound_id,
            state = %WeighingState::Normalized,
            mass_mg,
            volume_ml,
            "Quantities normalized"
        );

        let concentration = concentration::compute_in(mass_mg, volume_ml, unit)?;
        debug!(
            compound_id = request.compound_id,
            state = %WeighingState::Computed,
            concentration = concentration.value,
            unit = %concentration.unit,
            "Concentration computed"
        );

        Ok(Prepared {
            mass_mg,
            volume_ml,
            concentration,
        })
    }

    /// Post-debit steps, run inside the debit's transaction. Errors are
    /// `TransactionAborted` tagged with the stage that failed.
    #[allow(clippy::too_many_arguments)]
    fn record(
        &self,
        tx: &Transaction<'_>,
        request: &WeighingRequest,
        compound: &Compound,
        prepared: &Prepared,
        change: &StockChange,
        now: DateTime<Utc>,
        minted: &mut Option<u64>,
    ) -> WeighingResult<WeighingOutcome> {
        let aborted = |stage: Stage, e: WeighingError| WeighingError::aborted(compound.id, stage, e);

        let code = self
            .codes
            .mint_with(compound.id, now, |sequence| Label::reserve_sequence(tx, sequence))
            .map_err(|e| aborted(Stage::Mint, e.into()))?;
        *minted = Some(code.sequence());

        let prepared_by = request.prepared_by.trim().to_string();
        let label = Label {
            label_code: code.as_str().to_string(),
            sequence: code.sequence(),
            compound_name: compound.name.clone(),
            cas_number: compound.cas_number.clone(),
            concentration: prepared.concentration.display(),
            date: now.date_naive().format("%Y-%m-%d").to_string(),
            prepared_by: prepared_by.clone(),
        };
        debug!(
            compound_id = compound.id,
            state = %WeighingState::Labeled,
            label_code = %code,
            "Label composed"
        );

        let encoded = self
            .encoder
            .encode(&label.label_code)
            .map_err(|e| aborted(Stage::Encode, e))?;

        let solvent = match request.solvent.as_deref().map(str::trim) {
            Some(solvent) if !solvent.is_empty() => solvent.to_string(),
            _ => compound.solvent.clone(),
        };
        let record = WeighingRecordCreate {
            compound_id: compound.id,
            mass_mg: prepared.mass_mg,
            volume_ml: prepared.volume_ml,
            concentration: prepared.concentration.value,
            concentration_unit: prepared.concentration.unit,
            remaining_stock: compound.stock_unit.from_mg(change.remaining_mg),
            remaining_stock_unit: compound.stock_unit,
            below_critical: change.below_critical,
            solvent,
            prepared_by,
            recorded_at: now,
            label_code: label.label_code.clone(),
        };

        let record = persist_weighing(tx, &record, &label)
            .map_err(|e| aborted(Stage::Persist, e.into()))?;

        Ok(WeighingOutcome {
            record,
            label,
            encoded,
            below_critical: change.below_critical,
        })
    }

    /// Mark a sequence consumed by a rolled-back weighing so it is not
    /// handed out again after a restart.
    fn retire_sequence(&self, sequence: u64) {
        if let Err(e) = self
            .database
            .with_conn(|conn| Label::reserve_sequence(conn, sequence))
        {
            warn!(sequence, error = %e, "Could not record retired label sequence");
        }
    }
}

fn validate(request: &WeighingRequest) -> WeighingResult<()> {
    if request.prepared_by.trim().is_empty() {
        return Err(WeighingError::MissingField {
            field: "prepared_by",
        });
    }
    if !request.weighed_amount.is_finite() || request.weighed_amount < 0.0 {
        return Err(WeighingError::InvalidQuantity {
            field: "weighed_amount",
            value: request.weighed_amount,
        });
    }
    // Zero and non-finite volumes are reported as DivisionByZero by the calculator
    if request.prepared_volume < 0.0 && request.prepared_volume.is_finite() {
        return Err(WeighingError::InvalidQuantity {
            field: "prepared_volume",
            value: request.prepared_volume,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompoundCreate, MovementKind, StockMovement};
    use chrono::TimeZone;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::open_migrated(dir.path().join("weighlab.db")).unwrap();
        (dir, database)
    }

    fn service(database: &Database) -> WeighingService {
        WeighingService::new(
            database.clone(),
            EncoderSettings::default(),
            ConcentrationUnit::MG_PER_ML,
        )
        .unwrap()
    }

    fn add_compound(database: &Database, stock: f64, unit: &str, critical_mg: f64) -> Compound {
        database
            .with_conn(|conn| {
                Ok(Compound::create(
                    conn,
                    &CompoundCreate {
                        name: "Caffeine".to_string(),
                        cas_number: "58-08-2".to_string(),
                        solvent: "Methanol".to_string(),
                        stock_value: stock,
                        stock_unit: unit.to_string(),
                        critical_value: critical_mg,
                        critical_unit: "mg".to_string(),
                    },
                )
                .unwrap())
            })
            .unwrap()
    }

    fn request(compound_id: i64, amount: f64, unit: &str, volume: f64, volume_unit: &str) -> WeighingRequest {
        WeighingRequest {
            compound_id,
            weighed_amount: amount,
            weighed_unit: unit.to_string(),
            prepared_volume: volume,
            volume_unit: volume_unit.to_string(),
            solvent: None,
            prepared_by: "jdoe".to_string(),
            concentration_unit: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 14, 5, 0).unwrap()
    }

    fn counts(database: &Database) -> (i64, i64) {
        database
            .with_conn(|conn| Ok((WeighingRecord::count(conn)?, Label::count(conn)?)))
            .unwrap()
    }

    #[test]
    fn test_weighing_end_to_end() {
        let (_dir, database) = setup();
        let compound = add_compound(&database, 500.0, "mg", 50.0);
        let service = service(&database);

        let outcome = service
            .submit_at(&request(compound.id, 12.5, "mg", 10.0, "mL"), now())
            .unwrap();

        assert_eq!(outcome.record.concentration, 1.25);
        assert_eq!(outcome.record.concentration_unit, ConcentrationUnit::MG_PER_ML);
        assert_eq!(outcome.record.remaining_stock, 487.5);
        assert_eq!(outcome.record.remaining_stock_unit, compound.stock_unit);
        assert!(!outcome.below_critical);
        assert_eq!(outcome.record.solvent, "Methanol");
        assert_eq!(outcome.label.concentration, "1.250 mg/mL");
        assert_eq!(outcome.label.date, "2026-10-19");
        assert_eq!(outcome.label.label_code, "L261019-00000001");
        assert_eq!(outcome.record.label_code, outcome.label.label_code);
        assert!(outcome.encoded.matrix_png.starts_with(b"\x89PNG"));
        assert_eq!(service.ledger().stock_mg(compound.id).unwrap(), 487.5);

        let second = service
            .submit_at(&request(compound.id, 1.0, "mg", 1.0, "mL"), now())
            .unwrap();
        assert_ne!(second.label.label_code, outcome.label.label_code);
        assert_eq!(counts(&database), (2, 2));
    }

    #[test]
    fn test_insufficient_stock_creates_nothing() {
        let (_dir, database) = setup();
        let compound = add_compound(&database, 5.0, "mg", 0.0);
        let service = service(&database);

        let err = service
            .submit_at(&request(compound.id, 12.5, "mg", 10.0, "mL"), now())
            .unwrap_err();
        assert!(matches!(err, WeighingError::InsufficientStock { .. }));
        assert_eq!(service.ledger().stock_mg(compound.id).unwrap(), 5.0);
        assert_eq!(counts(&database), (0, 0));
        assert_eq!(service.last_issued_sequence(), 0);
    }

    #[test]
    fn test_micrograms_into_liters() {
        let (_dir, database) = setup();
        let compound = add_compound(&database, 1.0, "g", 0.0);
        let service = service(&database);

        let outcome = service
            .submit_at(&request(compound.id, 1000.0, "µg", 1.0, "L"), now())
            .unwrap();
        assert_eq!(outcome.record.mass_mg, 1.0);
        assert_eq!(outcome.record.volume_ml, 1000.0);
        assert!((outcome.record.concentration - 0.001).abs() < 1e-15);
        assert_eq!(outcome.label.concentration, "0.001 mg/mL");
        // Remaining stock is reported in the compound's stock unit
        assert!((outcome.record.remaining_stock - 0.999).abs() < 1e-12);
    }

    #[test]
    fn test_requested_concentration_unit_and_solvent() {
        let (_dir, database) = setup();
        let compound = add_compound(&database, 500.0, "mg", 0.0);
        let service = service(&database);

        let mut req = request(compound.id, 12.5, "mg", 10.0, "mL");
        req.concentration_unit = Some("µg/mL".to_string());
        req.solvent = Some("DMSO".to_string());
        let outcome = service.submit_at(&req, now()).unwrap();
        assert!((outcome.record.concentration - 1250.0).abs() < 1e-9);
        assert_eq!(outcome.label.concentration, "1250.000 µg/mL");
        assert_eq!(outcome.record.solvent, "DMSO");
    }

    #[test]
    fn test_below_critical_is_reported() {
        let (_dir, database) = setup();
        let compound = add_compound(&database, 60.0, "mg", 50.0);
        let service = service(&database);

        let outcome = service
            .submit_at(&request(compound.id, 12.5, "mg", 10.0, "mL"), now())
            .unwrap();
        assert!(outcome.below_critical);
        assert!(outcome.record.below_critical);
    }

    #[test]
    fn test_rejections_before_debit() {
        let (_dir, database) = setup();
        let compound = add_compound(&database, 500.0, "mg", 0.0);
        let service = service(&database);

        let mut req = request(compound.id, 12.5, "mg", 10.0, "mL");
        req.prepared_by = "  ".to_string();
        assert!(matches!(
            service.submit_at(&req, now()),
            Err(WeighingError::MissingField { field: "prepared_by" })
        ));

        let cases = [
            (request(compound.id, 12.5, "oz", 10.0, "mL"), "unrecognized_unit"),
            (request(compound.id, 12.5, "mg", 10.0, "gal"), "unrecognized_unit"),
            (request(compound.id, -1.0, "mg", 10.0, "mL"), "invalid_quantity"),
            (request(compound.id, 12.5, "mg", -10.0, "mL"), "invalid_quantity"),
            (request(compound.id, 12.5, "mg", 0.0, "mL"), "division_by_zero"),
            (request(compound.id + 1, 12.5, "mg", 10.0, "mL"), "compound_not_found"),
        ];
        for (req, kind) in cases {
            assert_eq!(service.submit_at(&req, now()).unwrap_err().kind(), kind);
        }

        assert_eq!(service.ledger().stock_mg(compound.id).unwrap(), 500.0);
        assert_eq!(counts(&database), (0, 0));
    }

    fn install(database: &Database, sql: &str) {
        database
            .with_conn(|conn| {
                conn.execute_batch(sql)?;
                Ok(())
            })
            .unwrap();
    }

    fn trail(database: &Database, compound_id: i64) -> Vec<StockMovement> {
        database
            .with_conn(|conn| StockMovement::list_for_compound(conn, compound_id, 100))
            .unwrap()
    }

    #[test]
    fn test_encode_failure_rolls_back_debit() {
        let (_dir, database) = setup();
        let compound = add_compound(&database, 500.0, "mg", 0.0);
        let service = WeighingService::new(
            database.clone(),
            EncoderSettings {
                linear_max_chars: 8,
                ..EncoderSettings::default()
            },
            ConcentrationUnit::MG_PER_ML,
        )
        .unwrap();

        let err = service
            .submit_at(&request(compound.id, 12.5, "mg", 10.0, "mL"), now())
            .unwrap_err();
        assert!(matches!(
            &err,
            WeighingError::TransactionAborted { stage: Stage::Encode, source, .. }
                if matches!(**source, WeighingError::PayloadTooLong { .. })
        ));
        assert_eq!(service.ledger().stock_mg(compound.id).unwrap(), 500.0);
        assert_eq!(counts(&database), (0, 0));
        assert!(trail(&database, compound.id).is_empty());

        // The consumed sequence is retired, also across a restart
        assert_eq!(service.last_issued_sequence(), 1);
        let restarted = self::service(&database);
        assert_eq!(restarted.last_issued_sequence(), 1);
        let outcome = restarted
            .submit_at(&request(compound.id, 12.5, "mg", 10.0, "mL"), now())
            .unwrap();
        assert_eq!(outcome.label.label_code, "L261019-00000002");
    }

    #[test]
    fn test_persist_failure_leaves_no_record_or_label() {
        let (_dir, database) = setup();
        let compound = add_compound(&database, 500.0, "mg", 0.0);
        let service = service(&database);

        // The record insert succeeds, the label insert after it fails, and
        // so would any credit written to the audit trail
        install(
            &database,
            "CREATE TRIGGER fail_label BEFORE INSERT ON labels
             BEGIN SELECT RAISE(ABORT, 'label store down'); END;
             CREATE TRIGGER fail_credit BEFORE INSERT ON stock_movements
             WHEN NEW.kind = 'credit'
             BEGIN SELECT RAISE(ABORT, 'audit store down'); END;",
        );

        let err = service
            .submit_at(&request(compound.id, 12.5, "mg", 10.0, "mL"), now())
            .unwrap_err();
        assert!(matches!(
            &err,
            WeighingError::TransactionAborted { stage: Stage::Persist, source, .. }
                if matches!(**source, WeighingError::Database(_))
        ));
        assert!(err.to_string().contains("stock unchanged"));
        assert_eq!(service.ledger().stock_mg(compound.id).unwrap(), 500.0);
        assert_eq!(counts(&database), (0, 0));
        assert!(trail(&database, compound.id).is_empty());

        install(&database, "DROP TRIGGER fail_label;");
        let outcome = service
            .submit_at(&request(compound.id, 12.5, "mg", 10.0, "mL"), now())
            .unwrap();
        assert_eq!(outcome.label.sequence, 2);
        assert_eq!(outcome.record.remaining_stock, 487.5);
        assert_eq!(counts(&database), (1, 1));
    }

    #[test]
    fn test_mint_failure_rolls_back_debit() {
        let (_dir, database) = setup();
        let compound = add_compound(&database, 500.0, "mg", 0.0);
        let service = service(&database);

        install(
            &database,
            "CREATE TRIGGER fail_sequence BEFORE UPDATE ON label_sequence
             BEGIN SELECT RAISE(ABORT, 'sequence store down'); END;",
        );

        let err = service
            .submit_at(&request(compound.id, 12.5, "mg", 10.0, "mL"), now())
            .unwrap_err();
        assert!(matches!(
            err,
            WeighingError::TransactionAborted { stage: Stage::Mint, .. }
        ));
        assert_eq!(service.ledger().stock_mg(compound.id).unwrap(), 500.0);
        assert_eq!(counts(&database), (0, 0));
        assert!(trail(&database, compound.id).is_empty());
        assert_eq!(service.last_issued_sequence(), 0);

        install(&database, "DROP TRIGGER fail_sequence;");
        let outcome = service
            .submit_at(&request(compound.id, 12.5, "mg", 10.0, "mL"), now())
            .unwrap();
        assert_eq!(outcome.label.sequence, 1);
    }

    #[test]
    fn test_failed_weighing_does_not_hide_stock() {
        let (_dir, database) = setup();
        let service = service(&database);
        install(
            &database,
            "CREATE TRIGGER fail_broken BEFORE INSERT ON weighing_records
             WHEN NEW.prepared_by = 'broken'
             BEGIN SELECT RAISE(ABORT, 'persist down'); END;",
        );

        for _ in 0..10 {
            let compound = add_compound(&database, 10.0, "mg", 0.0);
            let mut failing = request(compound.id, 10.0, "mg", 5.0, "mL");
            failing.prepared_by = "broken".to_string();
            let healthy = request(compound.id, 10.0, "mg", 5.0, "mL");

            let (failed, committed) = std::thread::scope(|s| {
                let a = s.spawn(|| service.submit_at(&failing, now()));
                let b = s.spawn(|| service.submit_at(&healthy, now()));
                (a.join().unwrap(), b.join().unwrap())
            });

            let committed = committed.unwrap();
            assert_eq!(committed.record.remaining_stock, 0.0);
            assert!(matches!(
                failed,
                Err(WeighingError::TransactionAborted { stage: Stage::Persist, .. })
                    | Err(WeighingError::InsufficientStock { .. })
            ));
            assert_eq!(service.ledger().stock_mg(compound.id).unwrap(), 0.0);

            let movements = trail(&database, compound.id);
            assert_eq!(movements.len(), 1);
            assert_eq!(movements[0].kind, MovementKind::Debit);
        }
        assert_eq!(counts(&database), (10, 10));
    }

    #[test]
    fn test_sequence_resumes_after_restart() {
        let (_dir, database) = setup();
        let compound = add_compound(&database, 500.0, "mg", 0.0);

        let first = service(&database)
            .submit_at(&request(compound.id, 1.0, "mg", 1.0, "mL"), now())
            .unwrap();
        let restarted = service(&database);
        assert_eq!(restarted.last_issued_sequence(), 1);
        let second = restarted
            .submit_at(&request(compound.id, 1.0, "mg", 1.0, "mL"), now())
            .unwrap();
        assert_eq!(first.label.sequence + 1, second.label.sequence);
    }

    #[test]
    fn test_concurrent_submissions() {
        let (_dir, database) = setup();
        let compound = add_compound(&database, 100.0, "mg", 0.0);
        let service = service(&database);

        let outcomes: Vec<WeighingResult<WeighingOutcome>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..12)
                .map(|_| {
                    s.spawn(|| service.submit_at(&request(compound.id, 10.0, "mg", 5.0, "mL"), now()))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let codes: HashSet<String> = outcomes
            .iter()
            .filter_map(|o| o.as_ref().ok())
            .map(|o| o.label.label_code.clone())
            .collect();
        assert_eq!(codes.len(), 10);
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| matches!(o, Err(WeighingError::InsufficientStock { .. })))
                .count(),
            2
        );
        assert_eq!(service.ledger().stock_mg(compound.id).unwrap(), 0.0);
        assert_eq!(counts(&database), (10, 10));
    }
}
