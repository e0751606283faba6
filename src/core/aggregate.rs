//! Category aggregation - partition line items into subtotal buckets

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::category::Category;
use crate::core::line_item::LineItem;

/// Line items grouped by category key, with per-bucket totals
///
/// Every category key is present, even when its bucket is empty, so the two
/// maps always have the same key set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryBuckets {
    pub by_category: BTreeMap<String, Vec<LineItem>>,
    pub totals: BTreeMap<String, f64>,
}

/// Sum line items into the fixed category buckets
pub fn aggregate(items: &[LineItem]) -> CategoryBuckets {
    let mut by_category: BTreeMap<String, Vec<LineItem>> = Category::ALL
        .iter()
        .map(|c| (c.as_str().to_string(), Vec::new()))
        .collect();

    for item in items {
        by_category
            .entry(item.category().as_str().to_string())
            .or_default()
            .push(item.clone());
    }

    let totals = by_category
        .iter()
        .map(|(key, lines)| (key.clone(), lines.iter().map(|l| l.total).sum()))
        .collect();

    CategoryBuckets {
        by_category,
        totals,
    }
}

/// Category totals as named fields, the input to the financial cascade
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryTotals {
    pub materials: f64,
    pub consumables: f64,
    pub labor: f64,
    pub equipment: f64,
    pub accessories: f64,
    pub vendor_quote: f64,
}

impl CategoryTotals {
    /// Sum line item totals per category
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a LineItem>) -> Self {
        let mut totals = Self::default();
        for item in items {
            *totals.get_mut(item.category()) += item.total;
        }
        totals
    }

    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Materials => self.materials,
            Category::Consumables => self.consumables,
            Category::Labor => self.labor,
            Category::Equipment => self.equipment,
            Category::Accessories => self.accessories,
            Category::VendorQuote => self.vendor_quote,
        }
    }

    fn get_mut(&mut self, category: Category) -> &mut f64 {
        match category {
            Category::Materials => &mut self.materials,
            Category::Consumables => &mut self.consumables,
            Category::Labor => &mut self.labor,
            Category::Equipment => &mut self.equipment,
            Category::Accessories => &mut self.accessories,
            Category::VendorQuote => &mut self.vendor_quote,
        }
    }

    /// Sum of every category
    pub fn sum(&self) -> f64 {
        Category::ALL.iter().map(|c| self.get(*c)).sum()
    }
}
