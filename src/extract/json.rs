//! Defensive parsing of model replies

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::extract::ExtractError;

/// Remove a surrounding markdown code fence (```json ... ```), if any
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Isolate the outermost JSON object or array in free text
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(close)?;
    if start < end {
        Some(&text[start..=end])
    } else {
        None
    }
}

/// Parse, schema-validate and deserialize a model reply
pub fn parse_json_response<T: DeserializeOwned>(
    text: &str,
    schema: &Value,
) -> Result<T, ExtractError> {
    let body = extract_json(strip_code_fences(text)).ok_or_else(|| {
        ExtractError::InvalidResponse {
            reason: "no JSON value in response".to_string(),
        }
    })?;

    let value: Value = serde_json::from_str(body).map_err(|e| ExtractError::InvalidResponse {
        reason: format!("malformed JSON: {}", e),
    })?;

    let validator =
        jsonschema::validator_for(schema).map_err(|e| ExtractError::InvalidResponse {
            reason: format!("invalid schema: {}", e),
        })?;
    let errors: Vec<String> = validator
        .iter_errors(&value)
        .map(|e| e.to_string())
        .collect();
    if !errors.is_empty() {
        return Err(ExtractError::Schema { errors });
    }

    serde_json::from_value(value).map_err(|e| ExtractError::InvalidResponse {
        reason: format!("unexpected shape: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reply {
        ids: Vec<u32>,
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "required": ["ids"],
            "properties": {
                "ids": { "type": "array", "items": { "type": "integer", "minimum": 0 } }
            }
        })
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n[1]\n```\n"), "[1]");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_extract_json_from_prose() {
        let text = "Here you go: {\"ids\": [1, 2]} Hope that helps!";
        assert_eq!(extract_json(text), Some("{\"ids\": [1, 2]}"));
        assert_eq!(extract_json("no json here"), None);
    }

    #[test]
    fn test_parse_valid_reply() {
        let reply: Reply =
            parse_json_response("```json\n{\"ids\": [0, 3]}\n```", &schema()).unwrap();
        assert_eq!(reply, Reply { ids: vec![0, 3] });
    }

    #[test]
    fn test_schema_violation_rejected() {
        let result: Result<Reply, _> = parse_json_response("{\"ids\": [\"x\"]}", &schema());
        assert!(matches!(result, Err(ExtractError::Schema { .. })));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let result: Result<Reply, _> = parse_json_response("{\"ids\": [1,}", &schema());
        assert!(matches!(result, Err(ExtractError::InvalidResponse { .. })));
    }
}
