//! Threshold-and-keyword grouping of low-value items into named kits

use serde::Serialize;

use crate::core::category::{Category, Unit};
use crate::core::estimate::Estimate;
use crate::core::line_item::LineItem;

/// A named bundle of low-value items
#[derive(Debug, Clone, Copy)]
pub struct KitDefinition {
    pub label: &'static str,
    pub description: &'static str,
    /// Any keyword places an item in this kit; empty matches everything
    pub keywords: &'static [&'static str],
}

impl KitDefinition {
    fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.keywords.is_empty() || self.keywords.iter().any(|kw| name.contains(kw))
    }
}

/// Kits in assignment order; the last one catches everything
pub const KITS: &[KitDefinition] = &[
    KitDefinition {
        label: "Panel System",
        description: "Metal panels with matching trim and closures",
        keywords: &["panel", "standing seam", "coil stock", "trim", "closure"],
    },
    KitDefinition {
        label: "Flashing Kit",
        description: "Drip edge, valley, step and penetration flashings",
        keywords: &["flashing", "drip edge", "valley", "boot", "counter"],
    },
    KitDefinition {
        label: "Fasteners & Hardware",
        description: "Nails, screws, clips and installation hardware",
        keywords: &["nail", "screw", "fastener", "clip", "hardware", "staple"],
    },
    KitDefinition {
        label: "Sealants & Accessories",
        description: "Sealants, roof cement, vents and finishing accessories",
        keywords: &["sealant", "caulk", "cement", "tape", "vent", "guard", "primer"],
    },
    KitDefinition {
        label: "Additional Materials",
        description: "Miscellaneous installation materials",
        keywords: &[],
    },
];

/// When an item stays on its own line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KitPolicy {
    /// Items costing more than this are never grouped
    pub standalone_threshold: f64,
    /// Name keywords that always stay standalone
    pub standalone_keywords: &'static [&'static str],
}

const MAIN_PRODUCTS: &[&str] = &["field tile", "shake", "shingle", "underlayment", "ice & water"];

impl KitPolicy {
    /// Grouping used on printed proposals
    pub fn proposal() -> Self {
        Self {
            standalone_threshold: 1000.0,
            standalone_keywords: MAIN_PRODUCTS,
        }
    }

    /// Simpler grouping used for on-screen display
    pub fn display() -> Self {
        Self {
            standalone_threshold: 1500.0,
            standalone_keywords: MAIN_PRODUCTS,
        }
    }

    pub fn is_standalone(&self, item: &LineItem) -> bool {
        item.is_optional
            || matches!(item.category(), Category::Labor | Category::Equipment)
            || item.total > self.standalone_threshold
            || self
                .standalone_keywords
                .iter()
                .any(|kw| item.item.name_contains(kw))
    }
}

impl Default for KitPolicy {
    fn default() -> Self {
        Self::proposal()
    }
}

/// One client-facing proposal line: a single item or a kit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProposalLine {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: Category,
    pub quantity: f64,
    pub unit: Unit,
    pub total: f64,
    /// Names of grouped items; empty for a single item
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_optional: bool,
}

impl ProposalLine {
    pub fn single(item: &LineItem) -> Self {
        Self {
            name: item.name().to_string(),
            description: item.item.proposal_description.clone(),
            category: item.category(),
            quantity: item.quantity,
            unit: item.unit(),
            total: item.total,
            members: Vec::new(),
            is_optional: item.is_optional,
        }
    }

    /// A synthetic line summing its members
    pub fn group(name: &str, description: Option<String>, members: &[&LineItem]) -> Self {
        let category = members
            .first()
            .map(|m| m.category())
            .unwrap_or(Category::Materials);
        Self {
            name: name.to_string(),
            description,
            category,
            quantity: 1.0,
            unit: Unit::FlatFee,
            total: members.iter().map(|m| m.total).sum(),
            members: members.iter().map(|m| m.name().to_string()).collect(),
            is_optional: members.iter().all(|m| m.is_optional) && !members.is_empty(),
        }
    }

    pub fn is_kit(&self) -> bool {
        !self.members.is_empty()
    }
}

/// The items a proposal presents: line items, the sundries line, then add-ons
pub fn proposal_items(estimate: &Estimate) -> Vec<LineItem> {
    estimate
        .line_items
        .iter()
        .chain(estimate.sundries_line())
        .chain(estimate.optional_items.iter())
        .cloned()
        .collect()
}

/// Group items into kits, sorted by descending total
pub fn group_into_kits(items: &[LineItem], policy: &KitPolicy) -> Vec<ProposalLine> {
    let mut lines = Vec::new();
    let mut buckets: Vec<Vec<&LineItem>> = vec![Vec::new(); KITS.len()];

    for item in items {
        if policy.is_standalone(item) {
            lines.push(ProposalLine::single(item));
            continue;
        }
        if let Some(kit) = KITS.iter().position(|k| k.matches(item.name())) {
            buckets[kit].push(item);
        }
    }

    for (kit, members) in KITS.iter().zip(&buckets) {
        if members.is_empty() {
            continue;
        }
        tracing::debug!(kit = kit.label, members = members.len(), "kit assembled");
        lines.push(ProposalLine::group(
            kit.label,
            Some(kit.description.to_string()),
            members,
        ));
    }

    lines.sort_by(|a, b| b.total.total_cmp(&a.total));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::PriceItem;

    fn line(name: &str, category: Category, qty: f64, price: f64) -> LineItem {
        LineItem::new(
            PriceItem::new(name.to_lowercase(), name, Unit::Each, price, category),
            qty,
        )
    }

    fn sample() -> Vec<LineItem> {
        vec![
            line("Brava Field Tile", Category::Materials, 91.0, 43.25),
            line("Drip Edge", Category::Materials, 18.0, 9.5),
            line("W-Valley Flashing", Category::Materials, 2.0, 32.0),
            line("Coil Roofing Nails", Category::Consumables, 2.0, 48.0),
            line("Geocel Sealant", Category::Consumables, 6.0, 11.5),
            line("Snow Guards", Category::Accessories, 20.0, 14.0),
            line("Starter Strip", Category::Materials, 2.0, 45.0),
            line("Roofing Labor", Category::Labor, 30.0, 325.0),
            line("Porta Potty", Category::Equipment, 1.0, 185.0),
        ]
    }

    #[test]
    fn test_standalone_rules() {
        let policy = KitPolicy::proposal();
        assert!(policy.is_standalone(&line("Big Panel", Category::Materials, 1.0, 1000.01)));
        assert!(!policy.is_standalone(&line("Big Panel", Category::Materials, 1.0, 1000.0)));
        assert!(policy.is_standalone(&line("Synthetic Underlayment", Category::Materials, 1.0, 95.0)));
        assert!(policy.is_standalone(&line("Porta Potty", Category::Equipment, 1.0, 185.0)));
        assert!(policy.is_standalone(&line("Snow Guards", Category::Accessories, 1.0, 14.0).optional()));
    }

    #[test]
    fn test_display_threshold_is_higher() {
        let item = line("Copper Valley", Category::Materials, 1.0, 1200.0);
        assert!(KitPolicy::proposal().is_standalone(&item));
        assert!(!KitPolicy::display().is_standalone(&item));
    }

    #[test]
    fn test_items_land_in_first_matching_kit() {
        let lines = group_into_kits(&sample(), &KitPolicy::proposal());
        let kit = |label: &str| lines.iter().find(|l| l.name == label);

        let flashing = kit("Flashing Kit").unwrap();
        assert_eq!(flashing.members, vec!["Drip Edge", "W-Valley Flashing"]);
        assert!((flashing.total - (171.0 + 64.0)).abs() < 1e-9);

        let fasteners = kit("Fasteners & Hardware").unwrap();
        assert_eq!(fasteners.members, vec!["Coil Roofing Nails"]);

        let sealants = kit("Sealants & Accessories").unwrap();
        assert_eq!(sealants.members, vec!["Geocel Sealant", "Snow Guards"]);

        let extra = kit("Additional Materials").unwrap();
        assert_eq!(extra.members, vec!["Starter Strip"]);

        assert!(kit("Panel System").is_none());
    }

    #[test]
    fn test_every_item_appears_once() {
        let items = sample();
        let lines = group_into_kits(&items, &KitPolicy::proposal());
        let mut names: Vec<String> = lines
            .iter()
            .flat_map(|l| {
                if l.is_kit() {
                    l.members.clone()
                } else {
                    vec![l.name.clone()]
                }
            })
            .collect();
        names.sort();
        let mut expected: Vec<String> = items.iter().map(|i| i.name().to_string()).collect();
        expected.sort();
        assert_eq!(names, expected);

        let grouped: f64 = lines.iter().map(|l| l.total).sum();
        let flat: f64 = items.iter().map(|i| i.total).sum();
        assert!((grouped - flat).abs() < 1e-6);
    }

    #[test]
    fn test_sorted_descending() {
        let lines = group_into_kits(&sample(), &KitPolicy::proposal());
        assert_eq!(lines[0].name, "Roofing Labor");
        assert!(lines.windows(2).all(|w| w[0].total >= w[1].total));
    }

    #[test]
    fn test_empty_input() {
        assert!(group_into_kits(&[], &KitPolicy::proposal()).is_empty());
    }
}
