//! Reading measurement reports and vendor quotes through the extractor
//!
//! Both helpers return an error rather than guessing; the caller falls back to
//! manual entry.

use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::core::buildings::VendorQuoteItem;
use crate::core::category::Unit;
use crate::core::measurements::{Complexity, Measurements};
use crate::extract::{
    extract_with_timeout, parse_json_response, Attachment, ExtractError, ExtractionRequest,
    TextExtractor,
};

const MEASUREMENT_PROMPT: &str = "You are reading a roof measurement report. \
Return only a JSON object with these fields: total_squares (number, 1 square = 100 sq ft), \
predominant_pitch (string like \"6/12\"), ridge_length, hip_length, valley_length, eave_length, \
rake_length (feet), penetrations, skylights, chimneys (integers), complexity \
(\"simple\", \"moderate\" or \"complex\"). Omit fields the report does not state.";

const VENDOR_QUOTE_PROMPT: &str = "You are reading a supplier quotation for roofing materials. \
Return only a JSON object: {\"vendor\": string, \"items\": [{\"name\": string, \"quantity\": number, \
\"unit\": string, \"unit_price\": number}]}. Use the quoted unit price, not the extended total.";

fn measurement_schema() -> Value {
    let length = json!({ "type": "number", "minimum": 0 });
    let count = json!({ "type": "integer", "minimum": 0 });
    json!({
        "type": "object",
        "required": ["total_squares"],
        "properties": {
            "total_squares": { "type": "number", "minimum": 0 },
            "predominant_pitch": { "type": "string", "pattern": "^\\s*\\d+(\\.\\d+)?\\s*/\\s*12\\s*$" },
            "ridge_length": length,
            "hip_length": length,
            "valley_length": length,
            "eave_length": length,
            "rake_length": length,
            "penetrations": count,
            "skylights": count,
            "chimneys": count,
            "complexity": { "enum": ["simple", "moderate", "complex"] }
        }
    })
}

fn vendor_quote_schema() -> Value {
    json!({
        "type": "object",
        "required": ["items"],
        "properties": {
            "vendor": { "type": "string" },
            "items": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["name", "quantity", "unit_price"],
                    "properties": {
                        "name": { "type": "string", "minLength": 1 },
                        "quantity": { "type": "number", "minimum": 0 },
                        "unit": { "type": "string" },
                        "unit_price": { "type": "number", "minimum": 0 }
                    }
                }
            }
        }
    })
}

#[derive(Deserialize)]
struct ExtractedMeasurements {
    total_squares: f64,
    predominant_pitch: Option<String>,
    ridge_length: Option<f64>,
    hip_length: Option<f64>,
    valley_length: Option<f64>,
    eave_length: Option<f64>,
    rake_length: Option<f64>,
    penetrations: Option<u32>,
    skylights: Option<u32>,
    chimneys: Option<u32>,
    complexity: Option<Complexity>,
}

#[derive(Deserialize)]
struct ExtractedQuote {
    vendor: Option<String>,
    items: Vec<ExtractedQuoteLine>,
}

#[derive(Deserialize)]
struct ExtractedQuoteLine {
    name: String,
    quantity: f64,
    unit: Option<String>,
    unit_price: f64,
}

/// Read a measurement report into `Measurements`
pub async fn extract_measurements(
    extractor: &dyn TextExtractor,
    document: Attachment,
    max_tokens: u32,
    timeout: Duration,
) -> Result<Measurements, ExtractError> {
    let request = ExtractionRequest::new(MEASUREMENT_PROMPT)
        .with_attachment(document)
        .with_max_tokens(max_tokens);
    let text = extract_with_timeout(extractor, request, timeout).await?;
    let raw: ExtractedMeasurements = parse_json_response(&text, &measurement_schema())?;

    let defaults = Measurements::default();
    let measurements = Measurements {
        total_squares: raw.total_squares,
        predominant_pitch: raw
            .predominant_pitch
            .map(|p| p.replace(' ', ""))
            .unwrap_or(defaults.predominant_pitch),
        ridge_length: raw.ridge_length.unwrap_or(0.0),
        hip_length: raw.hip_length.unwrap_or(0.0),
        valley_length: raw.valley_length.unwrap_or(0.0),
        eave_length: raw.eave_length.unwrap_or(0.0),
        rake_length: raw.rake_length.unwrap_or(0.0),
        penetrations: raw.penetrations.unwrap_or(0),
        skylights: raw.skylights.unwrap_or(0),
        chimneys: raw.chimneys.unwrap_or(0),
        complexity: raw.complexity.unwrap_or_default(),
        slope_breakdown: None,
    };
    measurements.validate().map_err(|e| ExtractError::Schema {
        errors: vec![e.to_string()],
    })?;
    Ok(measurements)
}

/// Read a supplier quotation into job-level vendor items
pub async fn extract_vendor_quote(
    extractor: &dyn TextExtractor,
    document: Attachment,
    max_tokens: u32,
    timeout: Duration,
) -> Result<Vec<VendorQuoteItem>, ExtractError> {
    let request = ExtractionRequest::new(VENDOR_QUOTE_PROMPT)
        .with_attachment(document)
        .with_max_tokens(max_tokens);
    let text = extract_with_timeout(extractor, request, timeout).await?;
    let raw: ExtractedQuote = parse_json_response(&text, &vendor_quote_schema())?;

    let items = raw
        .items
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            let unit = line
                .unit
                .as_deref()
                .and_then(|u| u.parse::<Unit>().ok())
                .unwrap_or_default();
            VendorQuoteItem {
                id: format!("vq-{}", i + 1),
                name: line.name.trim().to_string(),
                unit,
                quantity: line.quantity,
                unit_price: line.unit_price,
                vendor: raw.vendor.clone(),
            }
        })
        .collect();
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::testing::ScriptedExtractor;

    fn report() -> Attachment {
        Attachment {
            media_type: "application/pdf".to_string(),
            data: b"%PDF".to_vec(),
            file_name: Some("report.pdf".to_string()),
        }
    }

    #[tokio::test]
    async fn test_measurements_from_fenced_reply() {
        let extractor = ScriptedExtractor::replying(
            "```json\n{\"total_squares\": 32.5, \"predominant_pitch\": \"8 / 12\", \"eave_length\": 140, \"skylights\": 2}\n```",
        );
        let m = extract_measurements(&extractor, report(), 1024, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(m.total_squares, 32.5);
        assert_eq!(m.predominant_pitch, "8/12");
        assert_eq!(m.eave_length, 140.0);
        assert_eq!(m.skylights, 2);
        assert_eq!(m.complexity, Complexity::Moderate);
    }

    #[tokio::test]
    async fn test_negative_length_fails_schema() {
        let extractor =
            ScriptedExtractor::replying("{\"total_squares\": 20, \"valley_length\": -4}");
        let result = extract_measurements(&extractor, report(), 1024, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ExtractError::Schema { .. })));
    }

    #[tokio::test]
    async fn test_vendor_quote_items() {
        let extractor = ScriptedExtractor::replying(
            r#"{"vendor": "Schafer Metal Roofing", "items": [
                {"name": "24ga Standing Seam Panel", "quantity": 42, "unit": "each", "unit_price": 118.5},
                {"name": "Eave Trim", "quantity": 12, "unit_price": 36}
            ]}"#,
        );
        let items = extract_vendor_quote(&extractor, report(), 2048, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "vq-1");
        assert_eq!(items[0].vendor.as_deref(), Some("Schafer Metal Roofing"));
        assert_eq!(items[1].unit, Unit::Each);
        assert_eq!(items[1].unit_price, 36.0);
    }

    #[tokio::test]
    async fn test_service_failure_propagates() {
        let extractor = ScriptedExtractor::failing();
        let result = extract_vendor_quote(&extractor, report(), 2048, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ExtractError::Unavailable(_))));
    }
}
