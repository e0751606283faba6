//! Auto-selection rule engine
//!
//! Given a job's description, vendor quotes and measurements, proposes which
//! catalog items to pre-select and how many of each. Detection picks the roof
//! system first; selection rules then fire additively against it.

pub mod assist;
pub mod detect;
pub mod select;

use serde::Serialize;

use crate::core::buildings::{Job, JobRules, RoofSystem, Selection, VendorQuoteItem};
use crate::core::catalog::Catalog;
use crate::core::measurements::Measurements;

pub use assist::assist_selection;
pub use detect::{detect_roof_system, Detection, DETECTION_RULES};
pub use select::{SelectionRule, SELECTION_RULES};

/// Inputs to one auto-selection run
#[derive(Debug, Clone, Default)]
pub struct AutoSelectionContext {
    pub job_description: String,
    pub vendor_items: Vec<VendorQuoteItem>,
    /// Items already chosen (labor crews drive some fee rules)
    pub selected_item_ids: Vec<String>,
    pub measurements: Measurements,
    /// Skip detection and use this roof system
    pub roof_system: Option<RoofSystem>,
}

/// One proposed catalog item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestedItem {
    pub item_id: String,
    pub name: String,
    pub quantity: f64,
    /// Description of the rule that selected it
    pub rule: String,
}

/// Result of auto-selection with its audit trail
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoSelection {
    pub roof_system: RoofSystem,
    pub items: Vec<SuggestedItem>,
    /// Every rule that fired, in evaluation order
    pub applied_rules: Vec<String>,
}

impl AutoSelection {
    pub fn contains(&self, item_id: &str) -> bool {
        self.items.iter().any(|s| s.item_id == item_id)
    }

    pub fn item_ids(&self) -> Vec<&str> {
        self.items.iter().map(|s| s.item_id.as_str()).collect()
    }

    pub fn to_selections(&self) -> Vec<Selection> {
        self.items
            .iter()
            .map(|s| Selection::new(s.item_id.clone(), s.quantity))
            .collect()
    }

    /// Add an item unless its id is already present
    fn push(&mut self, item: SuggestedItem) -> bool {
        if self.contains(&item.item_id) {
            return false;
        }
        self.applied_rules.push(format!("{}: {}", item.rule, item.name));
        self.items.push(item);
        true
    }
}

/// Run detection and every selection rule against the catalog
pub fn auto_select(ctx: &AutoSelectionContext, catalog: &Catalog) -> AutoSelection {
    let (roof, reason) = match ctx.roof_system.filter(|r| *r != RoofSystem::Unselected) {
        Some(roof) => (roof, format!("Roof system {}: set on the building", roof)),
        None => {
            let detection = detect_roof_system(ctx);
            (detection.roof_system, detection.reason)
        }
    };

    let mut selection = AutoSelection {
        roof_system: roof,
        items: Vec::new(),
        applied_rules: vec![reason],
    };

    for rule in SELECTION_RULES {
        if !rule.when.holds(roof, ctx, catalog) {
            continue;
        }
        let Some(item) = rule.matcher.first_match(catalog) else {
            tracing::debug!(rule = rule.description, "no catalog item matched");
            continue;
        };
        let suggested = SuggestedItem {
            item_id: item.id.clone(),
            name: item.name.clone(),
            quantity: rule.quantity.quantity(item, &ctx.measurements),
            rule: rule.description.to_string(),
        };
        if selection.push(suggested) {
            tracing::debug!(
                rule = rule.description,
                group = %rule.group,
                item = %item.id,
                "rule fired"
            );
        }
    }

    selection
}

/// Auto-select every building in the job that has no selections yet
///
/// The job's labor item (or the configured one) counts as selected for fee
/// rules. Returns the audit for each building that was filled in.
pub fn apply_to_job(
    job: &mut Job,
    catalog: &Catalog,
    rules: &JobRules,
) -> Vec<(String, AutoSelection)> {
    let selected_item_ids: Vec<String> = job
        .labor_item_id
        .as_ref()
        .or(rules.labor_item_id.as_ref())
        .into_iter()
        .cloned()
        .collect();
    let mut audits = Vec::new();

    for building in job.buildings.iter_mut().filter(|b| b.selections.is_empty()) {
        let ctx = AutoSelectionContext {
            job_description: job.description.clone(),
            vendor_items: job.vendor_items.clone(),
            selected_item_ids: selected_item_ids.clone(),
            measurements: building.measurements.clone(),
            roof_system: Some(building.roof_system),
        };
        let selection = auto_select(&ctx, catalog);
        building.selections = selection.to_selections();
        if building.roof_system == RoofSystem::Unselected {
            building.roof_system = selection.roof_system;
        }
        tracing::info!(
            building = %building.name,
            roof = %selection.roof_system,
            items = selection.items.len(),
            "auto-selected items"
        );
        audits.push((building.name.clone(), selection));
    }

    audits
}
