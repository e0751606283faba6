//! Line items - catalog items priced and quantified within an estimate

use serde::{Deserialize, Serialize};

use crate::core::catalog::PriceItem;
use crate::core::category::{Category, Unit};

/// Tolerance used wherever stored and recomputed money values are compared
pub const MONEY_TOLERANCE: f64 = 0.01;

/// Round a dollar amount to whole cents
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format a dollar amount as `$12,345.67`
pub fn format_money(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let dollars = (cents / 100).to_string();
    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, ch) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

/// A priced, quantified entry in an estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// The catalog item this line was created from
    #[serde(flatten)]
    pub item: PriceItem,

    /// Quantity before manual overrides
    pub base_quantity: f64,

    /// Quantity used for pricing (may be manually overridden)
    pub quantity: f64,

    /// quantity x price
    pub total: f64,

    /// Quantity added on top of `base_quantity` for waste
    #[serde(default)]
    pub waste_added: f64,

    /// Shown to the client as an add-on rather than part of the base price
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_optional: bool,
}

impl LineItem {
    /// Select a catalog item at the given quantity
    pub fn new(item: PriceItem, quantity: f64) -> Self {
        let total = quantity * item.price;
        Self {
            item,
            base_quantity: quantity,
            quantity,
            total,
            waste_added: 0.0,
            is_optional: false,
        }
    }

    /// Build a line from an explicit total (e.g. an imported row)
    ///
    /// The stored total is kept as given; the validator reports any
    /// disagreement with quantity x price.
    pub fn with_total(item: PriceItem, quantity: f64, total: f64) -> Self {
        Self {
            item,
            base_quantity: quantity,
            quantity,
            total,
            waste_added: 0.0,
            is_optional: false,
        }
    }

    /// Mark the line as optional
    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    pub fn id(&self) -> &str {
        &self.item.id
    }

    pub fn name(&self) -> &str {
        &self.item.name
    }

    pub fn category(&self) -> Category {
        self.item.category
    }

    pub fn unit(&self) -> Unit {
        self.item.unit
    }

    pub fn price(&self) -> f64 {
        self.item.price
    }

    /// quantity x price, independent of the stored total
    pub fn expected_total(&self) -> f64 {
        self.quantity * self.item.price
    }

    /// Whether the stored total agrees with quantity x price
    pub fn is_consistent(&self) -> bool {
        (self.total - self.expected_total()).abs() <= MONEY_TOLERANCE
    }

    /// Manually override the priced quantity and recompute the total
    pub fn set_quantity(&mut self, quantity: f64) {
        self.quantity = quantity;
        self.total = self.expected_total();
    }

    /// Add waste on top of the base quantity and recompute the total
    pub fn apply_waste(&mut self, waste_quantity: f64) {
        self.waste_added = waste_quantity;
        self.quantity = self.base_quantity + waste_quantity;
        self.total = self.expected_total();
    }
}
