//! Buildings and jobs - combining several measured structures into one estimate
//!
//! Each building is measured and selected independently; the job shares one
//! financial cascade. Vendor quotes, labor and rule-driven equipment are
//! job-level and never multiplied per building.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::core::cascade::{CascadeError, FinancialOverrides, FinancialSettings};
use crate::core::catalog::{Catalog, PriceItem};
use crate::core::category::{Category, Unit};
use crate::core::estimate::{BuildingSubtotal, CustomerInfo, Estimate, EstimateInput};
use crate::core::line_item::LineItem;
use crate::core::measurements::{MeasurementError, Measurements};

/// Roof system installed on a building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[derive(Default)]
pub enum RoofSystem {
    #[default]
    Unselected,
    /// Brava synthetic tile
    Brava,
    /// DaVinci synthetic shake
    Davinci,
    PresidentialAsphalt,
    Asphalt,
    Metal,
    /// Any other non-metal system
    NonMetal,
}

impl RoofSystem {
    pub fn is_metal(&self) -> bool {
        matches!(self, RoofSystem::Metal)
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, RoofSystem::Brava | RoofSystem::Davinci)
    }
}

impl std::fmt::Display for RoofSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoofSystem::Unselected => write!(f, "unselected"),
            RoofSystem::Brava => write!(f, "brava"),
            RoofSystem::Davinci => write!(f, "davinci"),
            RoofSystem::PresidentialAsphalt => write!(f, "presidential-asphalt"),
            RoofSystem::Asphalt => write!(f, "asphalt"),
            RoofSystem::Metal => write!(f, "metal"),
            RoofSystem::NonMetal => write!(f, "non-metal"),
        }
    }
}

impl std::str::FromStr for RoofSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unselected" | "" => Ok(RoofSystem::Unselected),
            "brava" => Ok(RoofSystem::Brava),
            "davinci" => Ok(RoofSystem::Davinci),
            "presidential-asphalt" | "presidential" => Ok(RoofSystem::PresidentialAsphalt),
            "asphalt" => Ok(RoofSystem::Asphalt),
            "metal" => Ok(RoofSystem::Metal),
            "non-metal" => Ok(RoofSystem::NonMetal),
            _ => Err(format!(
                "Invalid roof system: {}. Use brava, davinci, presidential-asphalt, asphalt, metal, or non-metal",
                s
            )),
        }
    }
}

/// A catalog item chosen at a quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub item_id: String,
    pub quantity: f64,
}

impl Selection {
    pub fn new(item_id: impl Into<String>, quantity: f64) -> Self {
        Self {
            item_id: item_id.into(),
            quantity,
        }
    }
}

/// One physical structure on the job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub roof_system: RoofSystem,
    #[serde(default)]
    pub measurements: Measurements,
    #[serde(default)]
    pub selections: Vec<Selection>,
}

/// A priced item from a vendor quote, shared by the whole job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorQuoteItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub unit: Unit,
    pub quantity: f64,
    pub unit_price: f64,
    /// Vendor that quoted the item (e.g. a panel fabricator)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
}

impl VendorQuoteItem {
    fn to_line_item(&self) -> LineItem {
        LineItem::new(
            PriceItem::new(
                self.id.clone(),
                self.name.clone(),
                self.unit,
                self.unit_price,
                Category::VendorQuote,
            ),
            self.quantity,
        )
    }
}

/// How an equipment item's job quantity is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EquipmentRuleType {
    /// Fixed count for the whole job
    PerJob,
    /// One unit per N squares of total roof area, rounded up
    #[serde(rename = "per-n-squares")]
    PerNSquares,
}

/// Static rule deriving an equipment quantity from job size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRule {
    /// Exact catalog name (case-insensitive)
    pub item_name: String,
    pub rule_type: EquipmentRuleType,
    #[serde(default = "default_rule_qty")]
    pub default_qty: f64,
    /// N for `per-n-squares`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub squares_per_unit: Option<f64>,
}

fn default_rule_qty() -> f64 {
    1.0
}

/// Squares per unit when a `per-n-squares` rule leaves N unset
pub const DEFAULT_SQUARES_PER_UNIT: f64 = 60.0;

impl EquipmentRule {
    pub fn per_job(item_name: impl Into<String>, qty: f64) -> Self {
        Self {
            item_name: item_name.into(),
            rule_type: EquipmentRuleType::PerJob,
            default_qty: qty,
            squares_per_unit: None,
        }
    }

    pub fn per_squares(item_name: impl Into<String>, squares_per_unit: f64) -> Self {
        Self {
            item_name: item_name.into(),
            rule_type: EquipmentRuleType::PerNSquares,
            default_qty: 1.0,
            squares_per_unit: Some(squares_per_unit),
        }
    }

    /// Job quantity for the given total area
    ///
    /// A selected item always gets at least `default_qty`.
    pub fn quantity_for(&self, total_squares: f64) -> f64 {
        match self.rule_type {
            EquipmentRuleType::PerJob => self.default_qty,
            EquipmentRuleType::PerNSquares => {
                let per = self
                    .squares_per_unit
                    .filter(|n| *n > 0.0)
                    .unwrap_or(DEFAULT_SQUARES_PER_UNIT);
                (total_squares / per).ceil().max(1.0) * self.default_qty
            }
        }
    }

    fn matches(&self, item: &PriceItem) -> bool {
        item.name.trim().eq_ignore_ascii_case(self.item_name.trim())
    }
}

/// The default equipment rules
pub fn default_equipment_rules() -> Vec<EquipmentRule> {
    vec![
        EquipmentRule::per_squares("Debris Haulaway & Landfill", 30.0),
        EquipmentRule::per_job("Porta Potty", 1.0),
        EquipmentRule::per_squares("Material Lift Rental", DEFAULT_SQUARES_PER_UNIT),
    ]
}

/// Job-level pricing rules applied while combining buildings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobRules {
    /// Catalog id priced per square of total job area
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labor_item_id: Option<String>,
    pub equipment_rules: Vec<EquipmentRule>,
}

/// A job file: customer, buildings and job-level quotes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Job {
    pub customer: CustomerInfo,
    pub buildings: Vec<Building>,
    pub vendor_items: Vec<VendorQuoteItem>,
    /// Add-on items offered separately
    pub optional_selections: Vec<Selection>,
    /// Overrides the configured labor item
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labor_item_id: Option<String>,
    /// Per-field overrides of the configured financial settings
    #[serde(skip_serializing_if = "FinancialOverrides::is_empty")]
    pub financial: FinancialOverrides,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intro_letter: Option<String>,
    /// Free-text scope used by auto-selection
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Errors from combining a job's buildings
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job has no buildings")]
    NoBuildings,

    #[error("Building '{building}' selects unknown catalog item '{item_id}'")]
    UnknownItem { building: String, item_id: String },

    #[error("Labor item '{0}' is not in the catalog")]
    UnknownLaborItem(String),

    #[error("Building '{building}': {source}")]
    Measurement {
        building: String,
        #[source]
        source: MeasurementError,
    },

    #[error(transparent)]
    Cascade(#[from] CascadeError),
}

/// Job-level line items and measurements ready for the cascade
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinedJob {
    pub line_items: Vec<LineItem>,
    pub optional_items: Vec<LineItem>,
    pub measurements: Measurements,
    pub building_subtotals: Vec<BuildingSubtotal>,
}

/// Insertion-ordered quantity accumulator keyed by catalog id
#[derive(Default)]
struct QuantityLedger<'a> {
    order: Vec<&'a PriceItem>,
    quantities: HashMap<&'a str, f64>,
}

impl<'a> QuantityLedger<'a> {
    fn add(&mut self, item: &'a PriceItem, quantity: f64) {
        match self.quantities.get_mut(item.id.as_str()) {
            Some(q) => *q += quantity,
            None => {
                self.order.push(item);
                self.quantities.insert(item.id.as_str(), quantity);
            }
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.quantities.contains_key(id)
    }

    fn into_lines(self) -> Vec<LineItem> {
        self.order
            .into_iter()
            .map(|item| LineItem::new(item.clone(), self.quantities[item.id.as_str()]))
            .collect()
    }
}

/// Merge every building's selections into one set of job-level line items
pub fn combine_buildings(
    job: &Job,
    catalog: &Catalog,
    rules: &JobRules,
) -> Result<CombinedJob, JobError> {
    if job.buildings.is_empty() {
        return Err(JobError::NoBuildings);
    }

    for building in &job.buildings {
        building
            .measurements
            .validate()
            .map_err(|source| JobError::Measurement {
                building: building.name.clone(),
                source,
            })?;
    }

    let measurements = Measurements::combine(job.buildings.iter().map(|b| &b.measurements));
    let total_squares = measurements.total_squares;

    let labor_id = job.labor_item_id.as_ref().or(rules.labor_item_id.as_ref());
    let labor_item = match labor_id {
        Some(id) => Some(
            catalog
                .get(id)
                .ok_or_else(|| JobError::UnknownLaborItem(id.clone()))?,
        ),
        None => None,
    };

    let mut summed = QuantityLedger::default();
    let mut vendor = QuantityLedger::default();
    let mut equipment: Vec<(&PriceItem, &EquipmentRule)> = Vec::new();
    let mut subtotals = Vec::with_capacity(job.buildings.len());

    for building in &job.buildings {
        let mut materials_total = 0.0;
        let mut item_count = 0;

        for selection in &building.selections {
            if selection.quantity <= 0.0 || !selection.quantity.is_finite() {
                continue;
            }
            let item = catalog
                .get(&selection.item_id)
                .ok_or_else(|| JobError::UnknownItem {
                    building: building.name.clone(),
                    item_id: selection.item_id.clone(),
                })?;
            item_count += 1;

            if item.category == Category::VendorQuote {
                // Counted once per job, with the first reference's quantity
                if !vendor.contains(&item.id)
                    && !job.vendor_items.iter().any(|v| v.id == item.id)
                {
                    vendor.add(item, selection.quantity);
                }
                continue;
            }
            if labor_item.is_some_and(|labor| labor.id == item.id) {
                continue;
            }
            if item.category == Category::Equipment {
                if let Some(rule) = rules.equipment_rules.iter().find(|r| r.matches(item)) {
                    if !equipment.iter().any(|(e, _)| e.id == item.id) {
                        equipment.push((item, rule));
                    }
                    continue;
                }
            }
            if item.category == Category::Materials {
                materials_total += selection.quantity * item.price;
            }
            summed.add(item, selection.quantity);
        }

        subtotals.push(BuildingSubtotal {
            name: building.name.clone(),
            roof_system: building.roof_system.to_string(),
            materials_total,
            item_count,
        });
    }

    let mut line_items = summed.into_lines();

    line_items.extend(job.vendor_items.iter().map(VendorQuoteItem::to_line_item));
    line_items.extend(vendor.into_lines());

    if let Some(labor) = labor_item {
        if total_squares > 0.0 {
            line_items.push(LineItem::new(labor.clone(), total_squares));
        }
    }

    for (item, rule) in equipment {
        let quantity = rule.quantity_for(total_squares);
        tracing::debug!(item = %item.name, quantity, "equipment quantity from job rule");
        line_items.push(LineItem::new(item.clone(), quantity));
    }

    let mut optional_items = Vec::new();
    for selection in &job.optional_selections {
        if selection.quantity <= 0.0 {
            continue;
        }
        let item = catalog
            .get(&selection.item_id)
            .ok_or_else(|| JobError::UnknownItem {
                building: "optional items".to_string(),
                item_id: selection.item_id.clone(),
            })?;
        optional_items.push(LineItem::new(item.clone(), selection.quantity).optional());
    }

    Ok(CombinedJob {
        line_items,
        optional_items,
        measurements,
        building_subtotals: subtotals,
    })
}

/// Combine a job's buildings and run the financial cascade
///
/// Fields set in the job's `financial` block win over `settings`; the rest
/// keep their configured values.
pub fn compute_estimate(
    job: &Job,
    catalog: &Catalog,
    rules: &JobRules,
    settings: &FinancialSettings,
) -> Result<Estimate, JobError> {
    let combined = combine_buildings(job, catalog, rules)?;
    let settings = job.financial.apply(*settings);
    let input = EstimateInput {
        line_items: combined.line_items,
        optional_items: combined.optional_items,
        measurements: combined.measurements,
        customer_info: job.customer.clone(),
        intro_letter: job.intro_letter.clone(),
        building_subtotals: combined.building_subtotals,
    };
    Ok(Estimate::build(input, &settings)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            PriceItem::new("tile", "Brava Field Tile", Unit::Bundle, 43.25, Category::Materials),
            PriceItem::new("labor", "Roofing Labor", Unit::Square, 325.0, Category::Labor),
            PriceItem::new(
                "dumpster",
                "Debris Haulaway & Landfill",
                Unit::Each,
                650.0,
                Category::Equipment,
            ),
            PriceItem::new("permit", "Building Permit", Unit::FlatFee, 350.0, Category::Equipment),
            PriceItem::new("panels", "Standing Seam Panels", Unit::Each, 4_000.0, Category::VendorQuote),
        ])
        .unwrap()
    }

    fn building(name: &str, squares: f64, selections: Vec<Selection>) -> Building {
        Building {
            id: name.to_lowercase(),
            name: name.to_string(),
            roof_system: RoofSystem::Brava,
            measurements: Measurements::with_squares(squares),
            selections,
        }
    }

    fn rules() -> JobRules {
        JobRules {
            labor_item_id: Some("labor".to_string()),
            equipment_rules: vec![EquipmentRule::per_squares("Debris Haulaway & Landfill", 60.0)],
        }
    }

    #[test]
    fn test_two_buildings_share_one_labor_line() {
        let job = Job {
            buildings: vec![
                building("House", 10.0, vec![Selection::new("tile", 30.0)]),
                building("Garage", 10.0, vec![Selection::new("tile", 30.0)]),
            ],
            ..Default::default()
        };
        let combined = combine_buildings(&job, &catalog(), &rules()).unwrap();
        assert_eq!(combined.measurements.total_squares, 20.0);

        let labor: Vec<_> = combined
            .line_items
            .iter()
            .filter(|l| l.category() == Category::Labor)
            .collect();
        assert_eq!(labor.len(), 1);
        assert_eq!(labor[0].quantity, 20.0);

        let tile = combined.line_items.iter().find(|l| l.id() == "tile").unwrap();
        assert_eq!(tile.quantity, 60.0);
    }

    #[test]
    fn test_vendor_item_counted_once() {
        let job = Job {
            buildings: vec![
                building("A", 10.0, vec![Selection::new("panels", 1.0)]),
                building("B", 10.0, vec![Selection::new("panels", 1.0)]),
                building("C", 10.0, vec![Selection::new("panels", 3.0)]),
            ],
            ..Default::default()
        };
        let combined = combine_buildings(&job, &catalog(), &JobRules::default()).unwrap();
        let panels: Vec<_> = combined
            .line_items
            .iter()
            .filter(|l| l.id() == "panels")
            .collect();
        assert_eq!(panels.len(), 1);
        assert_eq!(panels[0].quantity, 1.0);
    }

    #[test]
    fn test_job_vendor_items_take_precedence() {
        let job = Job {
            buildings: vec![building("A", 10.0, vec![Selection::new("panels", 5.0)])],
            vendor_items: vec![VendorQuoteItem {
                id: "panels".to_string(),
                name: "Standing Seam Panels".to_string(),
                unit: Unit::Each,
                quantity: 2.0,
                unit_price: 3_900.0,
                vendor: Some("Schafer".to_string()),
            }],
            ..Default::default()
        };
        let combined = combine_buildings(&job, &catalog(), &JobRules::default()).unwrap();
        let panels: Vec<_> = combined
            .line_items
            .iter()
            .filter(|l| l.id() == "panels")
            .collect();
        assert_eq!(panels.len(), 1);
        assert_eq!(panels[0].total, 7_800.0);
    }

    #[test]
    fn test_equipment_rule_uses_summed_squares() {
        let job = Job {
            buildings: vec![
                building("A", 40.0, vec![Selection::new("dumpster", 1.0)]),
                building("B", 35.0, vec![Selection::new("dumpster", 1.0)]),
            ],
            ..Default::default()
        };
        let combined = combine_buildings(&job, &catalog(), &rules()).unwrap();
        let dumpster = combined
            .line_items
            .iter()
            .find(|l| l.id() == "dumpster")
            .unwrap();
        assert_eq!(dumpster.quantity, 2.0);
    }

    #[test]
    fn test_equipment_without_rule_is_summed() {
        let job = Job {
            buildings: vec![
                building("A", 10.0, vec![Selection::new("permit", 1.0)]),
                building("B", 10.0, vec![Selection::new("permit", 1.0)]),
            ],
            ..Default::default()
        };
        let combined = combine_buildings(&job, &catalog(), &rules()).unwrap();
        let permit = combined.line_items.iter().find(|l| l.id() == "permit").unwrap();
        assert_eq!(permit.quantity, 2.0);
    }

    #[test]
    fn test_non_positive_quantities_skipped() {
        let job = Job {
            buildings: vec![building(
                "A",
                10.0,
                vec![Selection::new("tile", 0.0), Selection::new("permit", -1.0)],
            )],
            ..Default::default()
        };
        let combined = combine_buildings(&job, &catalog(), &JobRules::default()).unwrap();
        assert!(combined.line_items.is_empty());
        assert_eq!(combined.building_subtotals[0].item_count, 0);
    }

    #[test]
    fn test_building_subtotals() {
        let job = Job {
            buildings: vec![
                building("House", 20.0, vec![Selection::new("tile", 28.0)]),
                building("Shed", 2.0, vec![Selection::new("permit", 1.0)]),
            ],
            ..Default::default()
        };
        let combined = combine_buildings(&job, &catalog(), &rules()).unwrap();
        assert_eq!(combined.building_subtotals.len(), 2);
        assert_eq!(combined.building_subtotals[0].materials_total, 1211.0);
        assert_eq!(combined.building_subtotals[0].roof_system, "brava");
        assert_eq!(combined.building_subtotals[1].materials_total, 0.0);
        assert_eq!(combined.building_subtotals[1].item_count, 1);
    }

    #[test]
    fn test_unknown_item_is_an_error() {
        let job = Job {
            buildings: vec![building("A", 10.0, vec![Selection::new("ghost", 1.0)])],
            ..Default::default()
        };
        assert!(matches!(
            combine_buildings(&job, &catalog(), &JobRules::default()),
            Err(JobError::UnknownItem { item_id, .. }) if item_id == "ghost"
        ));
    }

    #[test]
    fn test_no_buildings_is_an_error() {
        assert!(matches!(
            combine_buildings(&Job::default(), &catalog(), &JobRules::default()),
            Err(JobError::NoBuildings)
        ));
    }

    #[test]
    fn test_compute_estimate_uses_job_financial_override() {
        let job = Job {
            buildings: vec![building("A", 10.0, vec![Selection::new("tile", 28.0)])],
            financial: FinancialOverrides {
                margin_percent: Some(30.0),
                ..Default::default()
            },
            ..Default::default()
        };
        let estimate =
            compute_estimate(&job, &catalog(), &rules(), &FinancialSettings::default()).unwrap();
        assert_eq!(estimate.margin_percent, 30.0);
        assert_eq!(estimate.building_subtotals.len(), 1);
    }

    #[test]
    fn test_partial_job_financial_keeps_configured_margin() {
        let job: Job = serde_yml::from_str(
            "\
buildings:
  - id: a
    name: A
    measurements:
      total_squares: 10
    selections:
      - item_id: tile
        quantity: 28
financial:
  sales_tax_percent: 8
",
        )
        .unwrap();
        let configured = FinancialSettings {
            margin_percent: 30.0,
            ..Default::default()
        };
        let estimate = compute_estimate(&job, &catalog(), &rules(), &configured).unwrap();
        assert_eq!(estimate.margin_percent, 30.0);
        assert_eq!(estimate.sales_tax_percent, 8.0);
        assert_eq!(estimate.office_cost_percent, 10.0);
    }

    #[test]
    fn test_equipment_rule_quantities() {
        let rule = EquipmentRule::per_squares("Lift", 60.0);
        assert_eq!(rule.quantity_for(20.0), 1.0);
        assert_eq!(rule.quantity_for(60.0), 1.0);
        assert_eq!(rule.quantity_for(61.0), 2.0);
        assert_eq!(rule.quantity_for(0.0), 1.0);
        assert_eq!(EquipmentRule::per_job("Porta Potty", 2.0).quantity_for(500.0), 2.0);
    }
}
