//! Weighing MCP Tools
//!
//! Submit weighings and browse the usage history.

use serde::Serialize;

use crate::db::Database;
use crate::error::{Stage, WeighingError};
use crate::measure::format_fixed;
use crate::models::WeighingRecord;
use crate::service::{WeighingRequest, WeighingService};

use super::labels::LabelView;

/// Decimal places for remaining stock
const STOCK_DECIMALS: usize = 2;

/// A weighing record as shown to the user
#[derive(Debug, Serialize)]
pub struct UsageView {
    pub weighing_id: i64,
    pub compound_id: i64,
    pub mass_mg: f64,
    pub volume_ml: f64,
    pub concentration: f64,
    pub concentration_unit: String,
    pub remaining_stock: f64,
    pub remaining_stock_unit: String,
    /// Remaining stock rounded for display, e.g. "487.50 mg"
    pub remaining_stock_display: String,
    pub below_critical: bool,
    pub solvent: String,
    pub prepared_by: String,
    pub recorded_at: String,
    pub label_code: String,
}

impl From<&WeighingRecord> for UsageView {
    fn from(record: &WeighingRecord) -> Self {
        Self {
            weighing_id: record.id,
            compound_id: record.compound_id,
            mass_mg: record.mass_mg,
            volume_ml: record.volume_ml,
            concentration: record.concentration,
            concentration_unit: record.concentration_unit.symbol().to_string(),
            remaining_stock: record.remaining_stock,
            remaining_stock_unit: record.remaining_stock_unit.symbol().to_string(),
            remaining_stock_display: format!(
                "{} {}",
                format_fixed(record.remaining_stock, STOCK_DECIMALS),
                record.remaining_stock_unit
            ),
            below_critical: record.below_critical,
            solvent: record.solvent.clone(),
            prepared_by: record.prepared_by.clone(),
            recorded_at: record.recorded_at.clone(),
            label_code: record.label_code.clone(),
        }
    }
}

/// Response for a committed weigh_compound
#[derive(Debug, Serialize)]
pub struct WeighCompoundResponse {
    pub success: bool,
    pub usage: UsageView,
    pub label: LabelView,
    pub below_critical: bool,
}

/// Response for a rejected weigh_compound
#[derive(Debug, Serialize)]
pub struct WeighingRejection {
    pub success: bool,
    pub error: String,
    pub kind: &'static str,
    pub compound_id: i64,
    /// Post-debit step that failed; the debit was rolled back with it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
}

impl WeighingRejection {
    fn new(compound_id: i64, error: &WeighingError) -> Self {
        let stage = match error {
            WeighingError::TransactionAborted { stage, .. } => Some(*stage),
            _ => None,
        };
        Self {
            success: false,
            error: error.to_string(),
            kind: error.kind(),
            compound_id,
            stage,
        }
    }
}

/// Run one weighing through the service
pub fn weigh_compound(
    service: &WeighingService,
    request: &WeighingRequest,
) -> Result<WeighCompoundResponse, WeighingRejection> {
    let outcome = service
        .submit(request)
        .map_err(|e| WeighingRejection::new(request.compound_id, &e))?;

    Ok(WeighCompoundResponse {
        success: true,
        usage: UsageView::from(&outcome.record),
        label: LabelView::new(
            &outcome.label,
            &outcome.encoded.matrix_png,
            &outcome.encoded.linear_png,
        ),
        below_critical: outcome.below_critical,
    })
}

/// Response for list_weighings
#[derive(Debug, Serialize)]
pub struct ListWeighingsResponse {
    pub compound_id: i64,
    pub weighings: Vec<UsageView>,
    pub total: usize,
}

/// Weighings for one compound, newest first
pub fn list_weighings(
    db: &Database,
    compound_id: i64,
    limit: Option<i64>,
) -> Result<ListWeighingsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let records = WeighingRecord::list_for_compound(&conn, compound_id, limit.unwrap_or(50))
        .map_err(|e| format!("Failed to list weighings: {}", e))?;

    let weighings: Vec<UsageView> = records.iter().map(UsageView::from).collect();
    let total = weighings.len();

    Ok(ListWeighingsResponse {
        compound_id,
        weighings,
        total,
    })
}
