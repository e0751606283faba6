//! Model-assisted additions on top of the deterministic selection
//!
//! The extractor may only add catalog ids. Unknown ids, items reserved for a
//! different roof system and duplicates are dropped. Any failure leaves the
//! deterministic selection untouched.

use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::core::catalog::Catalog;
use crate::extract::{
    extract_with_timeout, parse_json_response, ExtractError, ExtractionRequest, TextExtractor,
};
use crate::rules::select::reserved_for_other_roof;
use crate::rules::{AutoSelection, AutoSelectionContext, SuggestedItem};

const ASSIST_RULE: &str = "Suggested from job description";

#[derive(Deserialize)]
struct AssistReply {
    item_ids: Vec<String>,
}

fn build_prompt(ctx: &AutoSelectionContext, catalog: &Catalog, base: &AutoSelection) -> String {
    let mut prompt = String::from(
        "You help a roofing estimator choose catalog items. Given the job description and the \
items already selected, list any additional catalog item ids the job clearly needs. \
Return only JSON: {\"item_ids\": [\"id\", ...]}. Use ids from the catalog below exactly; \
return an empty list if nothing else is needed.\n\n",
    );
    prompt.push_str(&format!("Job description: {}\n", ctx.job_description));
    prompt.push_str(&format!("Roof system: {}\n", base.roof_system));
    prompt.push_str(&format!("Already selected: {}\n\nCatalog:\n", base.item_ids().join(", ")));
    for item in catalog.items() {
        prompt.push_str(&format!("- {}: {} ({})\n", item.id, item.name, item.category));
    }
    prompt
}

async fn suggested_ids(
    extractor: &dyn TextExtractor,
    prompt: String,
    max_tokens: u32,
    timeout: Duration,
) -> Result<Vec<String>, ExtractError> {
    let schema = json!({
        "type": "object",
        "required": ["item_ids"],
        "properties": {
            "item_ids": { "type": "array", "items": { "type": "string" } }
        }
    });
    let request = ExtractionRequest::new(prompt).with_max_tokens(max_tokens);
    let text = extract_with_timeout(extractor, request, timeout).await?;
    let reply: AssistReply = parse_json_response(&text, &schema)?;
    Ok(reply.item_ids)
}

/// Extend `base` with extractor suggestions, or return it unchanged on failure
pub async fn assist_selection(
    extractor: &dyn TextExtractor,
    ctx: &AutoSelectionContext,
    catalog: &Catalog,
    base: AutoSelection,
    max_tokens: u32,
    timeout: Duration,
) -> AutoSelection {
    let prompt = build_prompt(ctx, catalog, &base);
    let ids = match suggested_ids(extractor, prompt, max_tokens, timeout).await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::warn!(
                extractor = extractor.name(),
                error = %e,
                "selection assist failed, keeping rule-based selection"
            );
            return base;
        }
    };

    let mut selection = base;
    for id in ids {
        let Some(item) = catalog.get(id.trim()) else {
            tracing::warn!(item_id = %id, "dropping suggested id not in catalog");
            continue;
        };
        if reserved_for_other_roof(item, selection.roof_system) {
            tracing::warn!(
                item_id = %item.id,
                roof = %selection.roof_system,
                "dropping suggestion reserved for another roof system"
            );
            continue;
        }
        selection.push(SuggestedItem {
            item_id: item.id.clone(),
            name: item.name.clone(),
            quantity: 1.0,
            rule: ASSIST_RULE.to_string(),
        });
    }
    selection
}
