//! Model-assisted proposal grouping
//!
//! Items are sent to the extractor by integer index only. The reply is checked
//! so that every index lands in exactly one group and locked items keep their
//! own line; anything the model dropped gets a line of its own. Failure of
//! any kind falls back to identity grouping.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;

use crate::core::line_item::LineItem;
use crate::extract::{
    extract_with_timeout, parse_json_response, ExtractError, ExtractionRequest, TextExtractor,
};
use crate::proposal::kits::{KitPolicy, ProposalLine};

/// How a proposal ended up grouped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupingSource {
    /// Groups came from the extractor (after verification)
    Model,
    /// Keyword kit rules
    Kits,
    /// Every item on its own line
    Identity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizedProposal {
    pub source: GroupingSource,
    pub lines: Vec<ProposalLine>,
    /// Indices the reply omitted and that were restored as their own line
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub restored: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct GroupReply {
    groups: Vec<ReplyGroup>,
}

#[derive(Debug, Deserialize)]
struct ReplyGroup {
    name: String,
    #[serde(default)]
    description: Option<String>,
    item_ids: Vec<usize>,
}

fn reply_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "required": ["groups"],
        "properties": {
            "groups": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["name", "item_ids"],
                    "properties": {
                        "name": { "type": "string", "minLength": 1 },
                        "description": { "type": "string" },
                        "item_ids": {
                            "type": "array",
                            "minItems": 1,
                            "items": { "type": "integer", "minimum": 0 }
                        }
                    }
                }
            }
        }
    })
}

fn build_prompt(items: &[LineItem], locked: &[bool]) -> String {
    let mut prompt = String::from(
        "Group these roofing proposal items for a customer-facing proposal. \
Combine small related items into clearly named groups. Every id must appear in exactly \
one group. Items marked LOCKED must each be alone in their own group, named exactly as \
given. Return only JSON: {\"groups\": [{\"name\": string, \"description\": string, \
\"item_ids\": [integer]}]}.\n\nItems:\n",
    );
    for (index, (item, locked)) in items.iter().zip(locked).enumerate() {
        prompt.push_str(&format!(
            "{}: {} - ${:.2}{}\n",
            index,
            item.name(),
            item.total,
            if *locked { " [LOCKED]" } else { "" }
        ));
    }
    prompt
}

/// Every item as its own line, in input order
pub fn identity_grouping(items: &[LineItem]) -> OrganizedProposal {
    OrganizedProposal {
        source: GroupingSource::Identity,
        lines: items.iter().map(ProposalLine::single).collect(),
        restored: Vec::new(),
    }
}

/// Turn a parsed reply into verified lines
fn reconcile(items: &[LineItem], locked: &[bool], reply: GroupReply) -> OrganizedProposal {
    let mut seen: HashSet<usize> = HashSet::new();
    let mut lines = Vec::new();

    for group in reply.groups {
        let group_size = group.item_ids.len();
        let mut members: Vec<usize> = Vec::new();
        for &id in &group.item_ids {
            if id >= items.len() {
                tracing::warn!(id, group = %group.name, "reply referenced an unknown item id");
                continue;
            }
            if !seen.insert(id) {
                tracing::warn!(id, group = %group.name, "item placed in more than one group");
                continue;
            }
            if locked[id] {
                // Locked items always keep their own line and name
                if group_size > 1 || group.name != items[id].name() {
                    tracing::warn!(id, group = %group.name, "locked item kept on its own line");
                }
                lines.push(ProposalLine::single(&items[id]));
                continue;
            }
            members.push(id);
        }

        match members.as_slice() {
            [] => {}
            [only] if group.name == items[*only].name() => {
                lines.push(ProposalLine::single(&items[*only]));
            }
            _ => {
                let refs: Vec<&LineItem> = members.iter().map(|&i| &items[i]).collect();
                lines.push(ProposalLine::group(&group.name, group.description.clone(), &refs));
            }
        }
    }

    let restored: Vec<usize> = (0..items.len()).filter(|i| !seen.contains(i)).collect();
    for &id in &restored {
        tracing::warn!(
            id,
            item = %items[id].name(),
            "reply omitted an item, restoring it as its own line"
        );
        lines.push(ProposalLine::single(&items[id]));
    }

    OrganizedProposal {
        source: GroupingSource::Model,
        lines,
        restored,
    }
}

async fn request_groups(
    extractor: &dyn TextExtractor,
    prompt: String,
    max_tokens: u32,
    timeout: Duration,
) -> Result<GroupReply, ExtractError> {
    let request = ExtractionRequest::new(prompt).with_max_tokens(max_tokens);
    let text = extract_with_timeout(extractor, request, timeout).await?;
    parse_json_response(&text, &reply_schema())
}

/// Ask the extractor to group items, verifying the reply
///
/// Items the policy treats as standalone are locked.
pub async fn organize_proposal(
    extractor: &dyn TextExtractor,
    items: &[LineItem],
    policy: &KitPolicy,
    max_tokens: u32,
    timeout: Duration,
) -> OrganizedProposal {
    if items.is_empty() {
        return identity_grouping(items);
    }
    let locked: Vec<bool> = items.iter().map(|i| policy.is_standalone(i)).collect();
    let prompt = build_prompt(items, &locked);

    match request_groups(extractor, prompt, max_tokens, timeout).await {
        Ok(reply) => reconcile(items, &locked, reply),
        Err(e) => {
            tracing::warn!(
                extractor = extractor.name(),
                error = %e,
                "proposal organization failed, using one line per item"
            );
            identity_grouping(items)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::PriceItem;
    use crate::core::category::{Category, Unit};
    use crate::extract::testing::{ScriptedExtractor, StalledExtractor};

    const MAX_TOKENS: u32 = 2048;

    fn line(name: &str, category: Category, total: f64) -> LineItem {
        LineItem::new(
            PriceItem::new(name.to_lowercase(), name, Unit::Each, total, category),
            1.0,
        )
    }

    fn items() -> Vec<LineItem> {
        vec![
            line("Brava Field Tile", Category::Materials, 3935.75),
            line("Drip Edge", Category::Materials, 171.0),
            line("W-Valley Flashing", Category::Materials, 64.0),
            line("Geocel Sealant", Category::Consumables, 69.0),
            line("Roofing Labor", Category::Labor, 9750.0),
        ]
    }

    async fn organize(reply: &str) -> OrganizedProposal {
        let extractor = ScriptedExtractor::replying(reply);
        organize_proposal(
            &extractor,
            &items(),
            &KitPolicy::proposal(),
            MAX_TOKENS,
            Duration::from_secs(1),
        )
        .await
    }

    fn total(proposal: &OrganizedProposal) -> f64 {
        proposal.lines.iter().map(|l| l.total).sum()
    }

    #[tokio::test]
    async fn test_valid_reply_is_used() {
        let proposal = organize(
            r#"{"groups": [
                {"name": "Brava Field Tile", "item_ids": [0]},
                {"name": "Flashing Package", "description": "All flashings", "item_ids": [1, 2, 3]},
                {"name": "Roofing Labor", "item_ids": [4]}
            ]}"#,
        )
        .await;
        assert_eq!(proposal.source, GroupingSource::Model);
        assert_eq!(proposal.lines.len(), 3);
        let package = &proposal.lines[1];
        assert_eq!(package.name, "Flashing Package");
        assert_eq!(package.members.len(), 3);
        assert!((package.total - 304.0).abs() < 1e-9);
        assert!(proposal.restored.is_empty());
    }

    #[tokio::test]
    async fn test_omitted_ids_are_restored() {
        let proposal = organize(
            r#"{"groups": [{"name": "Flashing", "item_ids": [1, 2]}, {"name": "Brava Field Tile", "item_ids": [0]}]}"#,
        )
        .await;
        assert_eq!(proposal.restored, vec![3, 4]);
        assert!(proposal.lines.iter().any(|l| l.name == "Roofing Labor"));
        assert!((total(&proposal) - 13989.75).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_duplicates_and_unknown_ids_are_ignored() {
        let proposal = organize(
            r#"{"groups": [
                {"name": "Misc", "item_ids": [1, 2, 9]},
                {"name": "More", "item_ids": [2, 3]}
            ]}"#,
        )
        .await;
        assert!((total(&proposal) - 13989.75).abs() < 1e-6);
        let misc = proposal.lines.iter().find(|l| l.name == "Misc").unwrap();
        assert_eq!(misc.members, vec!["Drip Edge", "W-Valley Flashing"]);
    }

    #[tokio::test]
    async fn test_locked_items_keep_their_own_line() {
        let proposal = organize(
            r#"{"groups": [{"name": "Everything", "item_ids": [0, 1, 2, 3, 4]}]}"#,
        )
        .await;
        let tile = proposal
            .lines
            .iter()
            .find(|l| l.name == "Brava Field Tile")
            .unwrap();
        assert!(!tile.is_kit());
        assert!(proposal.lines.iter().any(|l| l.name == "Roofing Labor" && !l.is_kit()));
        let everything = proposal.lines.iter().find(|l| l.name == "Everything").unwrap();
        assert_eq!(everything.members.len(), 3);
    }

    #[tokio::test]
    async fn test_unparsable_reply_falls_back_to_identity() {
        let proposal = organize("Sure! Here are some nice groups for you.").await;
        assert_eq!(proposal.source, GroupingSource::Identity);
        assert_eq!(proposal.lines.len(), 5);
        assert_eq!(proposal.lines[0].name, "Brava Field Tile");
    }

    #[tokio::test]
    async fn test_timeout_falls_back_to_identity() {
        let proposal = organize_proposal(
            &StalledExtractor,
            &items(),
            &KitPolicy::proposal(),
            MAX_TOKENS,
            Duration::from_millis(20),
        )
        .await;
        assert_eq!(proposal.source, GroupingSource::Identity);
        assert_eq!(proposal.lines.len(), 5);
    }

    #[tokio::test]
    async fn test_prompt_uses_indices_and_marks_locked() {
        let extractor = ScriptedExtractor::failing();
        organize_proposal(
            &extractor,
            &items(),
            &KitPolicy::proposal(),
            MAX_TOKENS,
            Duration::from_secs(1),
        )
        .await;
        let prompts = extractor.prompts.lock().unwrap();
        assert!(prompts[0].contains("0: Brava Field Tile - $3935.75 [LOCKED]"));
        assert!(prompts[0].contains("1: Drip Edge - $171.00\n"));
    }

    #[tokio::test]
    async fn test_configured_max_tokens_reach_extractor() {
        let extractor = ScriptedExtractor::failing();
        organize_proposal(
            &extractor,
            &items(),
            &KitPolicy::proposal(),
            512,
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(*extractor.max_tokens.lock().unwrap(), vec![512]);
    }
}
