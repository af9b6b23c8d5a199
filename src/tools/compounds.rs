//! Compound MCP Tools
//!
//! Read access to the compound catalog and its stock audit trail.

use serde::Serialize;
use serde_json::{json, Value};

use crate::db::Database;
use crate::ledger::{StockChange, StockLedger};
use crate::measure::{format_fixed, format_percent};
use crate::models::{Compound, StockMovement};

const STOCK_DECIMALS: usize = 2;

/// Reason recorded when a restock gives none
pub const DEFAULT_RESTOCK_REASON: &str = "restock";

/// Compound summary for listing
#[derive(Debug, Serialize)]
pub struct CompoundSummary {
    pub id: i64,
    pub name: String,
    pub cas_number: String,
    pub solvent: String,
    pub stock: f64,
    pub stock_unit: String,
    /// e.g. "487.50 mg"
    pub stock_display: String,
    pub critical: f64,
    pub critical_unit: String,
    /// Stock as a share of the critical level, e.g. "975%"; "-" without a critical level
    pub stock_vs_critical: String,
    pub below_critical: bool,
}

impl From<&Compound> for CompoundSummary {
    fn from(compound: &Compound) -> Self {
        let stock = compound.stock_value();
        Self {
            id: compound.id,
            name: compound.name.clone(),
            cas_number: compound.cas_number.clone(),
            solvent: compound.solvent.clone(),
            stock,
            stock_unit: compound.stock_unit.symbol().to_string(),
            stock_display: format!(
                "{} {}",
                format_fixed(stock, STOCK_DECIMALS),
                compound.stock_unit
            ),
            critical: compound.critical_value(),
            critical_unit: compound.critical_unit.symbol().to_string(),
            stock_vs_critical: format_percent(compound.stock_mg / compound.critical_mg * 100.0, 0),
            below_critical: compound.is_below_critical(),
        }
    }
}

/// Response for list_compounds
#[derive(Debug, Serialize)]
pub struct ListCompoundsResponse {
    pub compounds: Vec<CompoundSummary>,
    pub total: i64,
}

/// Response for get_compound
#[derive(Debug, Serialize)]
pub struct CompoundDetail {
    #[serde(flatten)]
    pub compound: CompoundSummary,
    pub stock_mg: f64,
    pub critical_mg: f64,
    pub created_at: String,
    pub updated_at: String,
    pub recent_movements: Vec<StockMovement>,
}

/// Response for list_stock_movements
#[derive(Debug, Serialize)]
pub struct ListStockMovementsResponse {
    pub compound_id: i64,
    pub movements: Vec<StockMovement>,
    pub total: usize,
}

/// Response for restock_compound
#[derive(Debug, Serialize)]
pub struct RestockResponse {
    pub success: bool,
    #[serde(flatten)]
    pub change: StockChange,
    /// e.g. "512.50 mg"
    pub stock_display: String,
}

/// List compounds, optionally only those below their critical level
pub fn list_compounds(
    db: &Database,
    below_critical_only: bool,
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<ListCompoundsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let compounds = if below_critical_only {
        Compound::list_below_critical(&conn)
    } else {
        Compound::list(&conn, limit.unwrap_or(100), offset.unwrap_or(0))
    }
    .map_err(|e| format!("Failed to list compounds: {}", e))?;

    let total = if below_critical_only {
        compounds.len() as i64
    } else {
        Compound::count(&conn).map_err(|e| format!("Failed to count compounds: {}", e))?
    };

    Ok(ListCompoundsResponse {
        compounds: compounds.iter().map(CompoundSummary::from).collect(),
        total,
    })
}

/// Error body returned when no compound has `id`
pub fn compound_not_found(id: i64) -> Value {
    json!({ "error": "Compound not found", "id": id })
}

/// Get a compound with its most recent stock movements
pub fn get_compound(db: &Database, id: i64) -> Result<Option<CompoundDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let compound = Compound::get_by_id(&conn, id)
        .map_err(|e| format!("Failed to get compound: {}", e))?;

    match compound {
        Some(c) => {
            let recent_movements = StockMovement::list_for_compound(&conn, id, 10)
                .map_err(|e| format!("Failed to get stock movements: {}", e))?;

            Ok(Some(CompoundDetail {
                compound: CompoundSummary::from(&c),
                stock_mg: c.stock_mg,
                critical_mg: c.critical_mg,
                created_at: c.created_at,
                updated_at: c.updated_at,
                recent_movements,
            }))
        }
        None => Ok(None),
    }
}

/// Stock audit trail for a compound, newest first
pub fn list_stock_movements(
    db: &Database,
    compound_id: i64,
    limit: Option<i64>,
) -> Result<ListStockMovementsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let movements = StockMovement::list_for_compound(&conn, compound_id, limit.unwrap_or(50))
        .map_err(|e| format!("Failed to list stock movements: {}", e))?;
    let total = movements.len();

    Ok(ListStockMovementsResponse {
        compound_id,
        movements,
        total,
    })
}

/// Add stock to a compound through the ledger
pub fn restock_compound(
    ledger: &StockLedger,
    compound_id: i64,
    amount: f64,
    unit: &str,
    reason: Option<&str>,
) -> Result<RestockResponse, String> {
    let reason = reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_RESTOCK_REASON);
    let change = ledger
        .credit_in(compound_id, amount, unit, reason)
        .map_err(|e| e.to_string())?;

    Ok(RestockResponse {
        success: true,
        stock_display: format!("{} mg", format_fixed(change.remaining_mg, STOCK_DECIMALS)),
        change,
    })
}
