//! WeighLab MCP Server Implementation
//!
//! Implements the MCP server with all WeighLab tools.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::service::{WeighingRequest, WeighingService};
use crate::tools::status::StatusTracker;
use crate::tools::{compounds, labels, weighing};

/// WeighLab MCP Service
#[derive(Clone)]
pub struct WeighLabService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    weighing: Arc<WeighingService>,
    tool_router: ToolRouter<WeighLabService>,
}

impl WeighLabService {
    pub fn new(database_path: PathBuf, weighing: WeighingService) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(database_path))),
            weighing: Arc::new(weighing),
            tool_router: Self::tool_router(),
        }
    }
}

// ============================================================================
// Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct WeighCompoundParams {
    /// Compound ID
    pub compound_id: i64,
    /// Weighed amount
    pub weighed_amount: f64,
    /// Unit of the weighed amount: µg, mg or g
    pub weighed_unit: String,
    /// Prepared solvent volume
    pub prepared_volume: f64,
    /// Unit of the prepared volume: µL, mL or L
    pub volume_unit: String,
    /// Solvent used (defaults to the compound's solvent)
    pub solvent: Option<String>,
    /// Person who prepared the solution
    pub prepared_by: String,
    /// Concentration display unit: µg/mL, mg/mL or g/mL (g/L and mg/L accepted)
    pub concentration_unit: Option<String>,
}

impl From<WeighCompoundParams> for WeighingRequest {
    fn from(p: WeighCompoundParams) -> Self {
        Self {
            compound_id: p.compound_id,
            weighed_amount: p.weighed_amount,
            weighed_unit: p.weighed_unit,
            prepared_volume: p.prepared_volume,
            volume_unit: p.volume_unit,
            solvent: p.solvent,
            prepared_by: p.prepared_by,
            concentration_unit: p.concentration_unit,
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListCompoundsParams {
    /// Only compounds whose stock is below their critical level
    pub below_critical_only: Option<bool>,
    /// Maximum number of compounds to return
    pub limit: Option<i64>,
    /// Number of compounds to skip
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetCompoundParams {
    /// Compound ID
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CompoundHistoryParams {
    /// Compound ID
    pub compound_id: i64,
    /// Maximum number of entries to return
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RestockCompoundParams {
    /// Compound ID
    pub compound_id: i64,
    /// Amount added to stock
    pub amount: f64,
    /// Unit of the amount: µg, mg or g
    pub unit: String,
    /// Reason recorded in the stock audit trail (default "restock")
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetLabelParams {
    /// Label code, e.g. L261019-00000042
    pub label_code: String,
    /// Encode the full description (code|name|CAS|concentration|date) in the QR code
    pub descriptive: Option<bool>,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl WeighLabService {
    // --- Status ---

    #[tool(description = "Get the current status of the WeighLab service including build info, database status, labels issued, and process information")]
    async fn weighlab_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status(self.weighing.database(), self.weighing.last_issued_sequence());
        let json = serde_json::to_string_pretty(&status)
            .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    // --- Weighing ---

    #[tool(description = "Record a weighing: computes the concentration, debits the compound's stock, and issues a label with a QR code and a Code 128 barcode. Rejected weighings change nothing.")]
    async fn weigh_compound(&self, Parameters(p): Parameters<WeighCompoundParams>) -> Result<CallToolResult, McpError> {
        let service = Arc::clone(&self.weighing);
        let request = WeighingRequest::from(p);
        // Runs to completion even if the request is cancelled
        let result = tokio::task::spawn_blocking(move || weighing::weigh_compound(&service, &request))
            .await
            .map_err(|e| McpError::internal_error(format!("Weighing task failed: {}", e), None))?;
        let json = match result {
            Ok(response) => serde_json::to_string_pretty(&response),
            Err(rejection) => serde_json::to_string_pretty(&rejection),
        }.map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "List weighings recorded for a compound, newest first")]
    fn list_weighings(&self, Parameters(p): Parameters<CompoundHistoryParams>) -> Result<CallToolResult, McpError> {
        let result = weighing::list_weighings(self.weighing.database(), p.compound_id, p.limit)
            .map_err(|e| McpError::internal_error(e, None))?;
        let json = serde_json::to_string_pretty(&result).map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    // --- Compounds ---

    #[tool(description = "List compounds with their stock and critical levels")]
    fn list_compounds(&self, Parameters(p): Parameters<ListCompoundsParams>) -> Result<CallToolResult, McpError> {
        let result = compounds::list_compounds(
            self.weighing.database(),
            p.below_critical_only.unwrap_or(false),
            p.limit,
            p.offset,
        )
        .map_err(|e| McpError::internal_error(e, None))?;
        let json = serde_json::to_string_pretty(&result).map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Get a compound with its stock, critical level, and recent stock movements")]
    fn get_compound(&self, Parameters(p): Parameters<GetCompoundParams>) -> Result<CallToolResult, McpError> {
        let result = compounds::get_compound(self.weighing.database(), p.id).map_err(|e| McpError::internal_error(e, None))?;
        let json = match result {
            Some(compound) => serde_json::to_string_pretty(&compound),
            None => serde_json::to_string_pretty(&compounds::compound_not_found(p.id)),
        }.map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Add stock to a compound and record the credit in its audit trail")]
    fn restock_compound(&self, Parameters(p): Parameters<RestockCompoundParams>) -> Result<CallToolResult, McpError> {
        let result = compounds::restock_compound(
            self.weighing.ledger(),
            p.compound_id,
            p.amount,
            &p.unit,
            p.reason.as_deref(),
        )
        .map_err(|e| McpError::internal_error(e, None))?;
        let json = serde_json::to_string_pretty(&result).map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "List the stock audit trail (weighing debits and restock credits) for a compound, newest first")]
    fn list_stock_movements(&self, Parameters(p): Parameters<CompoundHistoryParams>) -> Result<CallToolResult, McpError> {
        let result = compounds::list_stock_movements(self.weighing.database(), p.compound_id, p.limit)
            .map_err(|e| McpError::internal_error(e, None))?;
        let json = serde_json::to_string_pretty(&result).map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    // --- Labels ---

    #[tool(description = "Get an issued label by code and regenerate its QR code and barcode images")]
    fn get_label(&self, Parameters(p): Parameters<GetLabelParams>) -> Result<CallToolResult, McpError> {
        let result = labels::get_label(
            self.weighing.database(),
            self.weighing.encoder(),
            &p.label_code,
            p.descriptive.unwrap_or(false),
        )
        .map_err(|e| McpError::internal_error(e, None))?;
        let json = match result {
            Some(label) => serde_json::to_string_pretty(&label),
            None => serde_json::to_string_pretty(&labels::label_not_found(&p.label_code)),
        }.map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for WeighLabService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "weighlab".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Weighing Lab".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Weighing Lab - compound weighing, stock tracking, and label generation. \
                 Weighing: weigh_compound (mass in µg/mg/g, volume in µL/mL/L), list_weighings. \
                 Compounds: list_compounds, get_compound, list_stock_movements. \
                 Labels: get_label (regenerates QR code and barcode from the label code). \
                 Status: weighlab_status."
                    .into(),
            ),
        }
    }
}
