//! Estimate - the reconciled output of a cost-and-price computation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::aggregate::{aggregate, CategoryTotals};
use crate::core::cascade::{self, CascadeError, FinancialSettings};
use crate::core::catalog::PriceItem;
use crate::core::category::{Category, Unit};
use crate::core::line_item::LineItem;
use crate::core::measurements::Measurements;

/// Id of the synthesized sundries line
pub const SUNDRIES_ITEM_ID: &str = "consumables-hardware";

/// Display name of the synthesized sundries line
pub const SUNDRIES_ITEM_NAME: &str = "Consumables & Hardware";

/// Customer details carried on the estimate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerInfo {
    pub name: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Itemized per-building figures retained for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingSubtotal {
    pub name: String,
    pub roof_system: String,
    pub materials_total: f64,
    pub item_count: usize,
}

/// The reconciled estimate
///
/// Built only through [`Estimate::build`] / [`Estimate::recompute`] so that
/// `totals[cat] == sum(by_category[cat].total)` and
/// `final_price == sell_price + sales_tax_amount` always hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub id: String,

    /// Selected items, excluding the synthesized sundries line
    pub line_items: Vec<LineItem>,

    /// Add-on items priced separately from the base estimate
    #[serde(default)]
    pub optional_items: Vec<LineItem>,

    /// Line items per category key, including the sundries line
    pub by_category: BTreeMap<String, Vec<LineItem>>,

    /// Sum of each `by_category` bucket
    pub totals: BTreeMap<String, f64>,

    pub base_cost: f64,
    pub office_cost_percent: f64,
    pub office_allocation: f64,
    pub total_cost: f64,
    pub margin_percent: f64,
    pub waste_percent: f64,
    pub waste_allowance: f64,
    pub sundries_percent: f64,
    pub sundries_amount: f64,
    pub sell_price: f64,
    pub sales_tax_percent: f64,
    pub sales_tax_amount: f64,
    pub final_price: f64,
    pub gross_profit: f64,
    pub profit_margin: f64,

    /// Job-level measurements (combined across buildings)
    #[serde(default)]
    pub measurements: Measurements,

    #[serde(default)]
    pub customer_info: CustomerInfo,

    /// Free-text introduction shown ahead of the line items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro_letter: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub building_subtotals: Vec<BuildingSubtotal>,

    pub generated_at: DateTime<Utc>,
}

/// Everything except the computed figures
#[derive(Debug, Clone, Default)]
pub struct EstimateInput {
    pub line_items: Vec<LineItem>,
    pub optional_items: Vec<LineItem>,
    pub measurements: Measurements,
    pub customer_info: CustomerInfo,
    pub intro_letter: Option<String>,
    pub building_subtotals: Vec<BuildingSubtotal>,
}

impl EstimateInput {
    pub fn new(line_items: Vec<LineItem>) -> Self {
        Self {
            line_items,
            ..Default::default()
        }
    }
}

/// The sundries line for a computed amount
pub fn sundries_line(amount: f64) -> LineItem {
    let mut item = PriceItem::new(
        SUNDRIES_ITEM_ID,
        SUNDRIES_ITEM_NAME,
        Unit::FlatFee,
        amount,
        Category::Consumables,
    );
    item.proposal_description =
        Some("Fasteners, sealants and installation hardware".to_string());
    LineItem::new(item, 1.0)
}

impl Estimate {
    /// Aggregate the input's line items and run the financial cascade
    pub fn build(input: EstimateInput, settings: &FinancialSettings) -> Result<Self, CascadeError> {
        Self::assemble(
            ulid::Ulid::new().to_string(),
            Utc::now(),
            input,
            settings,
        )
    }

    /// Re-derive buckets, totals and the cascade from `line_items`
    ///
    /// Returns a new value; `self` is left untouched so a caller can keep the
    /// prior estimate if persisting the new one fails.
    pub fn recompute(&self, settings: &FinancialSettings) -> Result<Self, CascadeError> {
        let input = EstimateInput {
            line_items: self.line_items.clone(),
            optional_items: self.optional_items.clone(),
            measurements: self.measurements.clone(),
            customer_info: self.customer_info.clone(),
            intro_letter: self.intro_letter.clone(),
            building_subtotals: self.building_subtotals.clone(),
        };
        Self::assemble(self.id.clone(), self.generated_at, input, settings)
    }

    /// The percentages this estimate was computed with
    pub fn settings(&self) -> FinancialSettings {
        FinancialSettings {
            waste_percent: self.waste_percent,
            sundries_percent: self.sundries_percent,
            office_percent: self.office_cost_percent,
            margin_percent: self.margin_percent,
            sales_tax_percent: self.sales_tax_percent,
        }
    }

    /// Total for one category (0 when absent)
    pub fn total(&self, category: Category) -> f64 {
        self.totals.get(category.as_str()).copied().unwrap_or(0.0)
    }

    /// The synthesized sundries line, if one was emitted
    pub fn sundries_line(&self) -> Option<&LineItem> {
        self.by_category
            .get(Category::Consumables.as_str())?
            .iter()
            .find(|l| l.id() == SUNDRIES_ITEM_ID)
    }

    /// Line items in one category, including the sundries line
    pub fn items_in(&self, category: Category) -> &[LineItem] {
        self.by_category
            .get(category.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn assemble(
        id: String,
        generated_at: DateTime<Utc>,
        input: EstimateInput,
        settings: &FinancialSettings,
    ) -> Result<Self, CascadeError> {
        let line_items: Vec<LineItem> = input
            .line_items
            .into_iter()
            .filter(|l| l.id() != SUNDRIES_ITEM_ID)
            .collect();

        let totals = CategoryTotals::from_items(&line_items);
        let result = cascade::calculate(&totals, settings)?;

        let mut bucketed = line_items.clone();
        if result.sundries_amount > 0.0 {
            bucketed.push(sundries_line(result.sundries_amount));
        }
        let buckets = aggregate(&bucketed);

        tracing::debug!(
            items = line_items.len(),
            total_cost = result.total_cost,
            final_price = result.final_price,
            "estimate computed"
        );

        Ok(Self {
            id,
            line_items,
            optional_items: input.optional_items,
            by_category: buckets.by_category,
            totals: buckets.totals,
            base_cost: result.base_cost,
            office_cost_percent: settings.office_percent,
            office_allocation: result.office_allocation,
            total_cost: result.total_cost,
            margin_percent: settings.margin_percent,
            waste_percent: settings.waste_percent,
            waste_allowance: result.waste_allowance,
            sundries_percent: settings.sundries_percent,
            sundries_amount: result.sundries_amount,
            sell_price: result.sell_price,
            sales_tax_percent: settings.sales_tax_percent,
            sales_tax_amount: result.sales_tax_amount,
            final_price: result.final_price,
            gross_profit: result.gross_profit,
            profit_margin: result.profit_margin,
            measurements: input.measurements,
            customer_info: input.customer_info,
            intro_letter: input.intro_letter,
            building_subtotals: input.building_subtotals,
            generated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, category: Category, qty: f64, price: f64) -> LineItem {
        LineItem::new(PriceItem::new(id, id, Unit::Each, price, category), qty)
    }

    fn sample() -> EstimateInput {
        EstimateInput::new(vec![
            line("tile", Category::Materials, 28.0, 43.25),
            line("labor", Category::Labor, 20.0, 325.0),
            line("quote", Category::VendorQuote, 1.0, 789.0),
        ])
    }

    #[test]
    fn test_build_emits_sundries_line() {
        let estimate = Estimate::build(sample(), &FinancialSettings::default()).unwrap();
        let sundries = estimate.sundries_line().unwrap();
        assert!((sundries.total - 200.0).abs() < 1e-9);
        assert_eq!(sundries.quantity, 1.0);
        assert_eq!(estimate.line_items.len(), 3);
        assert!((estimate.total(Category::Consumables) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_totals_match_buckets() {
        let estimate = Estimate::build(sample(), &FinancialSettings::default()).unwrap();
        for (key, lines) in &estimate.by_category {
            let sum: f64 = lines.iter().map(|l| l.total).sum();
            assert!((estimate.totals[key] - sum).abs() < 1e-9);
        }
        assert!(
            (estimate.final_price - (estimate.sell_price + estimate.sales_tax_amount)).abs()
                < 1e-9
        );
    }

    #[test]
    fn test_recompute_does_not_accumulate_sundries() {
        let settings = FinancialSettings::default();
        let first = Estimate::build(sample(), &settings).unwrap();
        let second = first.recompute(&settings).unwrap();
        let third = second.recompute(&settings).unwrap();
        assert_eq!(first, second);
        assert_eq!(second, third);
    }

    #[test]
    fn test_recompute_with_new_margin_keeps_original() {
        let first = Estimate::build(sample(), &FinancialSettings::default()).unwrap();
        let higher = first
            .recompute(&FinancialSettings {
                margin_percent: 50.0,
                ..Default::default()
            })
            .unwrap();
        assert!(higher.sell_price > first.sell_price);
        assert_eq!(first.margin_percent, 40.0);
        assert_eq!(higher.id, first.id);
    }

    #[test]
    fn test_sundries_line_in_input_is_replaced() {
        let mut input = sample();
        input.line_items.push(sundries_line(9_999.0));
        let estimate = Estimate::build(input, &FinancialSettings::default()).unwrap();
        assert_eq!(estimate.line_items.len(), 3);
        assert!((estimate.sundries_amount - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_margin_produces_no_estimate() {
        let settings = FinancialSettings {
            margin_percent: 120.0,
            ..Default::default()
        };
        assert!(Estimate::build(sample(), &settings).is_err());
    }

    #[test]
    fn test_json_snapshot_roundtrip() {
        let estimate = Estimate::build(sample(), &FinancialSettings::default()).unwrap();
        let json = serde_json::to_string(&estimate).unwrap();
        let parsed: Estimate = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, estimate.id);
        assert_eq!(parsed.line_items.len(), estimate.line_items.len());
        assert!((parsed.final_price - estimate.final_price).abs() < 1e-6);
        assert_eq!(parsed.settings(), FinancialSettings::default());
    }
}
