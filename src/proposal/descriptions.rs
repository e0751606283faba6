//! Bulk generation of client-facing item descriptions
//!
//! One extractor call per item, strictly in input order. Progress is reported
//! after each item and the cancel flag is checked before starting the next
//! one; a failed item is logged and skipped.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::core::catalog::PriceItem;
use crate::extract::{extract_with_timeout, ExtractError, ExtractionRequest, TextExtractor};

/// Longest description kept, in characters
pub const MAX_DESCRIPTION_CHARS: usize = 300;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedDescription {
    pub item_id: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptionFailure {
    pub item_id: String,
    pub error: String,
}

/// Outcome of a bulk run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkDescriptions {
    pub generated: Vec<GeneratedDescription>,
    pub failed: Vec<DescriptionFailure>,
    /// True when the run stopped early at the caller's request
    pub cancelled: bool,
}

impl BulkDescriptions {
    pub fn get(&self, item_id: &str) -> Option<&str> {
        self.generated
            .iter()
            .find(|g| g.item_id == item_id)
            .map(|g| g.description.as_str())
    }
}

fn prompt_for(item: &PriceItem) -> String {
    format!(
        "Write one sentence describing this roofing item for a homeowner's proposal. \
Be specific and plain; no pricing, no quotation marks.\nItem: {}\nCategory: {}\nSold per: {}",
        item.name,
        item.category.label(),
        item.unit
    )
}

/// Tidy a model reply into a single description line
fn clean(reply: &str) -> Option<String> {
    let text = reply
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())?
        .trim_matches(|c| c == '"' || c == '\'')
        .trim();
    if text.is_empty() {
        return None;
    }
    Some(text.chars().take(MAX_DESCRIPTION_CHARS).collect())
}

async fn describe_one(
    extractor: &dyn TextExtractor,
    item: &PriceItem,
    timeout: Duration,
) -> Result<String, ExtractError> {
    let request = ExtractionRequest::new(prompt_for(item)).with_max_tokens(200);
    let reply = extract_with_timeout(extractor, request, timeout).await?;
    clean(&reply).ok_or_else(|| ExtractError::InvalidResponse {
        reason: "empty description".to_string(),
    })
}

/// Generate descriptions for `items` one at a time
pub async fn generate_descriptions<F>(
    extractor: &dyn TextExtractor,
    items: &[PriceItem],
    timeout: Duration,
    cancel: &AtomicBool,
    mut progress: F,
) -> BulkDescriptions
where
    F: FnMut(usize, usize),
{
    let total = items.len();
    let mut outcome = BulkDescriptions::default();

    for (index, item) in items.iter().enumerate() {
        if cancel.load(Ordering::SeqCst) {
            tracing::info!(done = index, total, "description run cancelled");
            outcome.cancelled = true;
            break;
        }
        match describe_one(extractor, item, timeout).await {
            Ok(description) => outcome.generated.push(GeneratedDescription {
                item_id: item.id.clone(),
                description,
            }),
            Err(e) => {
                tracing::warn!(item = %item.id, error = %e, "description failed, continuing");
                outcome.failed.push(DescriptionFailure {
                    item_id: item.id.clone(),
                    error: e.to_string(),
                });
            }
        }
        progress(index + 1, total);
    }

    outcome
}

/// Write generated descriptions onto matching items
///
/// Returns how many items changed.
pub fn apply_descriptions<'a>(
    items: impl IntoIterator<Item = &'a mut PriceItem>,
    results: &BulkDescriptions,
) -> usize {
    let mut changed = 0;
    for item in items {
        if let Some(text) = results.get(&item.id) {
            item.proposal_description = Some(text.to_string());
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::category::{Category, Unit};
    use crate::extract::testing::ScriptedExtractor;

    fn items() -> Vec<PriceItem> {
        ["Drip Edge", "Ridge Vent", "Snow Guards"]
            .iter()
            .map(|n| {
                let id = n.to_lowercase().replace(' ', "-");
                PriceItem::new(id, *n, Unit::Each, 10.0, Category::Materials)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_sequential_with_progress() {
        let extractor = ScriptedExtractor::new(vec![
            Ok("\"Protects the roof edge.\"".to_string()),
            Ok("Exhausts attic heat along the ridge.".to_string()),
            Ok("Holds snow in place over entries.\n".to_string()),
        ]);
        let cancel = AtomicBool::new(false);
        let mut ticks = Vec::new();
        let result = generate_descriptions(
            &extractor,
            &items(),
            Duration::from_secs(1),
            &cancel,
            |current, total| ticks.push((current, total)),
        )
        .await;

        assert_eq!(ticks, vec![(1, 3), (2, 3), (3, 3)]);
        assert_eq!(result.generated.len(), 3);
        assert_eq!(result.get("drip-edge"), Some("Protects the roof edge."));
        let prompts = extractor.prompts.lock().unwrap();
        assert!(prompts[0].contains("Item: Drip Edge"));
        assert!(prompts[2].contains("Item: Snow Guards"));
    }

    #[tokio::test]
    async fn test_failure_skips_only_that_item() {
        let extractor = ScriptedExtractor::new(vec![
            Ok("First.".to_string()),
            Err(ExtractError::Failed("rate limited".to_string())),
            Ok("Third.".to_string()),
        ]);
        let cancel = AtomicBool::new(false);
        let result =
            generate_descriptions(&extractor, &items(), Duration::from_secs(1), &cancel, |_, _| {})
                .await;
        assert_eq!(result.generated.len(), 2);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].item_id, "ridge-vent");
        assert!(!result.cancelled);
    }

    #[tokio::test]
    async fn test_cancel_between_items() {
        let extractor = ScriptedExtractor::new(vec![
            Ok("First.".to_string()),
            Ok("Second.".to_string()),
            Ok("Third.".to_string()),
        ]);
        let cancel = AtomicBool::new(false);
        let result = generate_descriptions(
            &extractor,
            &items(),
            Duration::from_secs(1),
            &cancel,
            |current, _| {
                if current == 1 {
                    cancel.store(true, Ordering::SeqCst);
                }
            },
        )
        .await;
        assert!(result.cancelled);
        assert_eq!(result.generated.len(), 1);
        assert_eq!(extractor.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_reply_counts_as_failure() {
        let extractor = ScriptedExtractor::replying("  \n ");
        let cancel = AtomicBool::new(false);
        let all = items();
        let one = &all[..1];
        let result =
            generate_descriptions(&extractor, one, Duration::from_secs(1), &cancel, |_, _| {})
                .await;
        assert_eq!(result.failed.len(), 1);
    }

    #[test]
    fn test_apply_descriptions() {
        let mut items = items();
        let results = BulkDescriptions {
            generated: vec![GeneratedDescription {
                item_id: "ridge-vent".to_string(),
                description: "Vents the attic.".to_string(),
            }],
            ..Default::default()
        };
        assert_eq!(apply_descriptions(items.iter_mut(), &results), 1);
        assert_eq!(items[1].proposal_description.as_deref(), Some("Vents the attic."));
        assert!(items[0].proposal_description.is_none());
    }
}
