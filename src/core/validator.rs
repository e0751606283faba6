//! Estimate validator - independent re-derivation of every stored figure
//!
//! Reports problems; never corrects them and never fails.

use serde::Serialize;

use crate::core::aggregate::CategoryTotals;
use crate::core::cascade;
use crate::core::category::Category;
use crate::core::estimate::{Estimate, SUNDRIES_ITEM_ID};
use crate::core::line_item::{format_money, LineItem, MONEY_TOLERANCE};

/// Margins outside this band draw a warning
pub const SANE_MARGIN: std::ops::RangeInclusive<f64> = 25.0..=60.0;

/// Outcome of validating an estimate
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

fn differs(stored: f64, expected: f64) -> bool {
    !stored.is_finite() || (stored - expected).abs() > MONEY_TOLERANCE
}

fn check_line(report: &mut ValidationReport, line: &LineItem, context: &str) {
    if !line.is_consistent() {
        report.error(format!(
            "{} '{}': total {} does not match quantity {} x price {} = {}",
            context,
            line.name(),
            format_money(line.total),
            line.quantity,
            format_money(line.price()),
            format_money(line.expected_total())
        ));
    }
    if line.total < 0.0 {
        report.error(format!(
            "{} '{}' has a negative total ({})",
            context,
            line.name(),
            format_money(line.total)
        ));
    }
}

/// Validate every stored total against its inputs
pub fn validate_estimate(estimate: &Estimate) -> ValidationReport {
    let mut report = ValidationReport::default();

    for line in &estimate.line_items {
        check_line(&mut report, line, "Line item");
    }
    for line in &estimate.optional_items {
        check_line(&mut report, line, "Optional item");
    }

    // Buckets and their totals
    for (key, lines) in &estimate.by_category {
        let known = key.parse::<Category>().ok();
        if known.is_none() {
            report.error(format!("Unknown category '{}'", key));
        }
        for line in lines {
            if known.is_some_and(|c| c != line.category()) {
                report.error(format!(
                    "'{}' ({}) is filed under '{}'",
                    line.name(),
                    line.category(),
                    key
                ));
            }
            if line.id() == SUNDRIES_ITEM_ID {
                check_line(&mut report, line, "Sundries line");
            }
        }
        let sum: f64 = lines.iter().map(|l| l.total).sum();
        match estimate.totals.get(key) {
            Some(stored) if differs(*stored, sum) => report.error(format!(
                "Category '{}' total {} does not match its items ({})",
                key,
                format_money(*stored),
                format_money(sum)
            )),
            Some(_) => {}
            None if lines.is_empty() => {}
            None => report.error(format!("Category '{}' has items but no total", key)),
        }
    }
    for key in estimate.totals.keys() {
        if !estimate.by_category.contains_key(key) {
            report.error(format!("Total for '{}' has no matching category bucket", key));
        }
    }

    // Every selected line is bucketed exactly once
    let bucketed: Vec<&LineItem> = estimate
        .by_category
        .values()
        .flatten()
        .filter(|l| l.id() != SUNDRIES_ITEM_ID)
        .collect();
    if bucketed.len() != estimate.line_items.len() {
        report.error(format!(
            "{} line items but {} bucketed items",
            estimate.line_items.len(),
            bucketed.len()
        ));
    }
    if estimate.line_items.iter().any(|l| l.id() == SUNDRIES_ITEM_ID) {
        report.error("Sundries line appears in line items; it must only be bucketed");
    }

    // Cascade
    let settings = estimate.settings();
    let totals = CategoryTotals::from_items(&estimate.line_items);
    match cascade::calculate(&totals, &settings) {
        Ok(expected) => {
            let figures = [
                ("Waste allowance", estimate.waste_allowance, expected.waste_allowance),
                ("Sundries amount", estimate.sundries_amount, expected.sundries_amount),
                ("Base cost", estimate.base_cost, expected.base_cost),
                ("Office allocation", estimate.office_allocation, expected.office_allocation),
                ("Total cost", estimate.total_cost, expected.total_cost),
                ("Sell price", estimate.sell_price, expected.sell_price),
                ("Sales tax", estimate.sales_tax_amount, expected.sales_tax_amount),
                ("Final price", estimate.final_price, expected.final_price),
                ("Gross profit", estimate.gross_profit, expected.gross_profit),
            ];
            for (label, stored, wanted) in figures {
                if differs(stored, wanted) {
                    report.error(format!(
                        "{} is {} but recomputes to {}",
                        label,
                        format_money(stored),
                        format_money(wanted)
                    ));
                }
            }
            let consumables_key = Category::Consumables.as_str();
            let sundries_in_bucket: f64 = estimate
                .items_in(Category::Consumables)
                .iter()
                .filter(|l| l.id() == SUNDRIES_ITEM_ID)
                .map(|l| l.total)
                .sum();
            if differs(sundries_in_bucket, expected.sundries_amount) {
                report.error(format!(
                    "Sundries line in '{}' is {} but the cascade gives {}",
                    consumables_key,
                    format_money(sundries_in_bucket),
                    format_money(expected.sundries_amount)
                ));
            }
        }
        Err(e) => report.error(e.to_string()),
    }

    if differs(
        estimate.final_price,
        estimate.sell_price + estimate.sales_tax_amount,
    ) {
        report.error(format!(
            "Final price {} is not sell price plus tax ({})",
            format_money(estimate.final_price),
            format_money(estimate.sell_price + estimate.sales_tax_amount)
        ));
    }

    if !SANE_MARGIN.contains(&estimate.margin_percent) {
        report.warning(format!(
            "Margin of {}% is outside the usual {}-{}% range",
            estimate.margin_percent,
            SANE_MARGIN.start(),
            SANE_MARGIN.end()
        ));
    }
    if estimate.line_items.is_empty() {
        report.warning("Estimate has no line items");
    }

    report.is_valid = report.errors.is_empty();
    report
}
