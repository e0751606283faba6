//! Financial cascade - category totals to cost, sell price and final price
//!
//! The steps run in a fixed order, each consuming the previous result:
//! waste and sundries on the materials base, office allocation on base cost,
//! margin on sell price (division, not markup), then sales tax.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::aggregate::CategoryTotals;

/// Percentages driving the cascade, as plain numbers (40 means 40%)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialSettings {
    pub waste_percent: f64,
    pub sundries_percent: f64,
    pub office_percent: f64,
    pub margin_percent: f64,
    pub sales_tax_percent: f64,
}

impl Default for FinancialSettings {
    fn default() -> Self {
        Self {
            waste_percent: 10.0,
            sundries_percent: 10.0,
            office_percent: 10.0,
            margin_percent: 40.0,
            sales_tax_percent: 10.0,
        }
    }
}

/// Parameters that make the cascade undefined
#[derive(Debug, Error, PartialEq)]
pub enum CascadeError {
    #[error("Margin must be below 100% (got {0}%); sell price would be undefined")]
    MarginTooHigh(f64),

    #[error("{name} must be a finite, non-negative percentage (got {value})")]
    InvalidPercent { name: &'static str, value: f64 },
}

impl FinancialSettings {
    /// Reject settings the cascade cannot evaluate
    pub fn validate(&self) -> Result<(), CascadeError> {
        let fields = [
            ("waste_percent", self.waste_percent),
            ("sundries_percent", self.sundries_percent),
            ("office_percent", self.office_percent),
            ("margin_percent", self.margin_percent),
            ("sales_tax_percent", self.sales_tax_percent),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(CascadeError::InvalidPercent { name, value });
            }
        }
        if self.margin_percent >= 100.0 {
            return Err(CascadeError::MarginTooHigh(self.margin_percent));
        }
        Ok(())
    }
}

/// Partial settings laid over a base; unset fields keep the base value
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waste_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sundries_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub office_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales_tax_percent: Option<f64>,
}

impl FinancialOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, base: FinancialSettings) -> FinancialSettings {
        FinancialSettings {
            waste_percent: self.waste_percent.unwrap_or(base.waste_percent),
            sundries_percent: self.sundries_percent.unwrap_or(base.sundries_percent),
            office_percent: self.office_percent.unwrap_or(base.office_percent),
            margin_percent: self.margin_percent.unwrap_or(base.margin_percent),
            sales_tax_percent: self.sales_tax_percent.unwrap_or(base.sales_tax_percent),
        }
    }

    /// Stack `later` on top; its set fields win
    pub fn then(self, later: &FinancialOverrides) -> Self {
        Self {
            waste_percent: later.waste_percent.or(self.waste_percent),
            sundries_percent: later.sundries_percent.or(self.sundries_percent),
            office_percent: later.office_percent.or(self.office_percent),
            margin_percent: later.margin_percent.or(self.margin_percent),
            sales_tax_percent: later.sales_tax_percent.or(self.sales_tax_percent),
        }
    }
}

/// Every intermediate figure of one cascade evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CascadeResult {
    pub materials_base: f64,
    pub waste_allowance: f64,
    pub sundries_amount: f64,
    pub raw_cost: f64,
    pub base_cost: f64,
    pub office_allocation: f64,
    pub total_cost: f64,
    pub sell_price: f64,
    pub sales_tax_amount: f64,
    pub final_price: f64,
    pub gross_profit: f64,
    pub profit_margin: f64,
}

/// Run the cascade over category totals
///
/// `totals.consumables` holds consumable lines that were selected or
/// imported; the computed sundries amount is separate and must not already
/// be included there.
pub fn calculate(
    totals: &CategoryTotals,
    settings: &FinancialSettings,
) -> Result<CascadeResult, CascadeError> {
    settings.validate()?;

    let materials_base = totals.materials + totals.vendor_quote;
    let waste_allowance = materials_base * settings.waste_percent / 100.0;
    let sundries_amount = materials_base * settings.sundries_percent / 100.0;

    let raw_cost = totals.materials
        + totals.labor
        + totals.equipment
        + totals.accessories
        + totals.vendor_quote
        + totals.consumables;
    let base_cost = raw_cost + waste_allowance + sundries_amount;

    let office_allocation = base_cost * settings.office_percent / 100.0;
    let total_cost = base_cost + office_allocation;

    let sell_price = total_cost / (1.0 - settings.margin_percent / 100.0);

    let sales_tax_amount = sell_price * settings.sales_tax_percent / 100.0;
    let final_price = sell_price + sales_tax_amount;

    let gross_profit = sell_price - total_cost;
    let profit_margin = if sell_price == 0.0 {
        0.0
    } else {
        gross_profit / sell_price * 100.0
    };

    Ok(CascadeResult {
        materials_base,
        waste_allowance,
        sundries_amount,
        raw_cost,
        base_cost,
        office_allocation,
        total_cost,
        sell_price,
        sales_tax_amount,
        final_price,
        gross_profit,
        profit_margin,
    })
}
