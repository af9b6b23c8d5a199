//! Label MCP Tools
//!
//! Look up issued labels and re-render their machine-readable images.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use serde_json::{json, Value};

use crate::db::Database;
use crate::label::{LabelCode, LabelEncoder};
use crate::models::{Label, WeighingRecord};

use super::weighing::UsageView;

/// PNG bytes as an inline `data:` URI
pub fn png_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(png))
}

/// Label text plus both encodings
#[derive(Debug, Serialize)]
pub struct LabelView {
    pub label_code: String,
    pub compound_name: String,
    pub cas_number: String,
    pub concentration: String,
    pub date: String,
    pub prepared_by: String,
    /// QR matrix code, PNG data URI
    pub qr_code: String,
    /// Code 128 barcode, PNG data URI
    pub barcode: String,
}

impl LabelView {
    pub fn new(label: &Label, matrix_png: &[u8], linear_png: &[u8]) -> Self {
        Self {
            label_code: label.label_code.clone(),
            compound_name: label.compound_name.clone(),
            cas_number: label.cas_number.clone(),
            concentration: label.concentration.clone(),
            date: label.date.clone(),
            prepared_by: label.prepared_by.clone(),
            qr_code: png_data_uri(matrix_png),
            barcode: png_data_uri(linear_png),
        }
    }
}

/// Response for get_label
#[derive(Debug, Serialize)]
pub struct LabelDetail {
    #[serde(flatten)]
    pub label: LabelView,
    /// What the QR code carries
    pub matrix_payload: String,
    pub usage: Option<UsageView>,
}

/// Error body returned when no label has `label_code`
pub fn label_not_found(label_code: &str) -> Value {
    json!({ "error": "Label not found", "label_code": label_code })
}

/// Get a stored label and regenerate its images.
///
/// With `descriptive` the QR code carries `code|name|CAS|concentration|date`;
/// the barcode always carries the label code alone.
pub fn get_label(
    db: &Database,
    encoder: &LabelEncoder,
    label_code: &str,
    descriptive: bool,
) -> Result<Option<LabelDetail>, String> {
    let label_code = label_code.trim();
    if LabelCode::parse(label_code).is_none() {
        return Err(format!("Invalid label code: '{}'", label_code));
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let label = match Label::get_by_code(&conn, label_code)
        .map_err(|e| format!("Failed to get label: {}", e))?
    {
        Some(label) => label,
        None => return Ok(None),
    };
    let record = WeighingRecord::get_by_label_code(&conn, &label.label_code)
        .map_err(|e| format!("Failed to get weighing record: {}", e))?;

    let matrix_payload = if descriptive {
        label.descriptive_payload()
    } else {
        label.label_code.clone()
    };
    let matrix_png = encoder
        .encode_matrix(&matrix_payload)
        .map_err(|e| e.to_string())?;
    let linear_png = encoder
        .encode_linear(&label.label_code)
        .map_err(|e| e.to_string())?;

    Ok(Some(LabelDetail {
        label: LabelView::new(&label, &matrix_png, &linear_png),
        matrix_payload,
        usage: record.as_ref().map(UsageView::from),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concentration::ConcentrationUnit;
    use crate::label::EncoderSettings;
    use crate::models::{Compound, CompoundCreate};
    use crate::service::{WeighingRequest, WeighingService};

    #[test]
    fn test_get_label_regenerates_images() {
        let dir = tempfile::tempdir().unwrap();
        let database = crate::db::Database::open_migrated(dir.path().join("labels.db")).unwrap();
        let compound = database
            .with_conn(|conn| {
                Ok(Compound::create(
                    conn,
                    &CompoundCreate {
                        name: "Caffeine".to_string(),
                        cas_number: "58-08-2".to_string(),
                        solvent: "Water".to_string(),
                        stock_value: 500.0,
                        stock_unit: "mg".to_string(),
                        critical_value: 50.0,
                        critical_unit: "mg".to_string(),
                    },
                )
                .unwrap())
            })
            .unwrap();
        let service = WeighingService::new(
            database.clone(),
            EncoderSettings::default(),
            ConcentrationUnit::MG_PER_ML,
        )
        .unwrap();
        let outcome = service
            .submit(&WeighingRequest {
                compound_id: compound.id,
                weighed_amount: 12.5,
                weighed_unit: "mg".to_string(),
                prepared_volume: 10.0,
                volume_unit: "mL".to_string(),
                solvent: None,
                prepared_by: "jdoe".to_string(),
                concentration_unit: None,
            })
            .unwrap();

        let detail = get_label(&database, service.encoder(), &outcome.label.label_code, false)
            .unwrap()
            .unwrap();
        assert_eq!(detail.label.qr_code, png_data_uri(&outcome.encoded.matrix_png));
        assert_eq!(detail.label.barcode, png_data_uri(&outcome.encoded.linear_png));
        assert_eq!(detail.usage.as_ref().map(|u| u.concentration), Some(1.25));

        let descriptive = get_label(&database, service.encoder(), &outcome.label.label_code, true)
            .unwrap()
            .unwrap();
        assert!(descriptive.matrix_payload.contains("|Caffeine|58-08-2|1.250 mg/mL|"));
        assert_ne!(descriptive.label.qr_code, detail.label.qr_code);
        assert_eq!(descriptive.label.barcode, detail.label.barcode);

        assert!(get_label(&database, service.encoder(), "L261019-99999999", false)
            .unwrap()
            .is_none());
        assert!(get_label(&database, service.encoder(), "not-a-code", false).is_err());
    }

    #[test]
    fn test_label_not_found_is_valid_json() {
        let body = label_not_found("L\"26\\1019");
        let text = serde_json::to_string(&body).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["error"], "Label not found");
        assert_eq!(parsed["label_code"], "L\"26\\1019");
    }

    #[test]
    fn test_png_data_uri() {
        assert_eq!(png_data_uri(b"abc"), "data:image/png;base64,YWJj");
    }
}
