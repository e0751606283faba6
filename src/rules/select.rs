//! Declarative item-selection rules
//!
//! Each rule names a condition on the job, a keyword matcher against catalog
//! item names and a quantity basis. Rules fire additively in table order;
//! within a rule the first matching catalog item wins.

use crate::core::buildings::RoofSystem;
use crate::core::catalog::{Catalog, PriceItem};
use crate::core::category::Category;
use crate::core::measurements::{Edge, Measurements};
use crate::rules::AutoSelectionContext;

/// Counted roof features
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    Skylights,
    Chimneys,
    Penetrations,
}

impl Count {
    pub fn of(&self, m: &Measurements) -> u32 {
        match self {
            Count::Skylights => m.skylights,
            Count::Chimneys => m.chimneys,
            Count::Penetrations => m.penetrations,
        }
    }
}

/// When a rule applies
#[derive(Debug, Clone, Copy)]
pub enum Condition {
    Always,
    /// Detected roof system is one of these
    RoofIs(&'static [RoofSystem]),
    Metal,
    NotMetal,
    /// A selected labor item's name contains one of these keywords
    LaborSelected(&'static [&'static str]),
    /// Job description contains one of these keywords
    DescriptionMentions(&'static [&'static str]),
    /// The measured count is non-zero
    Has(Count),
    /// The measured edge length is non-zero
    HasEdge(Edge),
}

impl Condition {
    pub fn holds(&self, roof: RoofSystem, ctx: &AutoSelectionContext, catalog: &Catalog) -> bool {
        match self {
            Condition::Always => true,
            Condition::RoofIs(systems) => systems.contains(&roof),
            Condition::Metal => roof.is_metal(),
            Condition::NotMetal => !roof.is_metal(),
            Condition::LaborSelected(keywords) => ctx
                .selected_item_ids
                .iter()
                .filter_map(|id| catalog.get(id))
                .filter(|item| item.category == Category::Labor)
                .any(|item| keywords.iter().any(|kw| item.name_contains(kw))),
            Condition::DescriptionMentions(keywords) => {
                let description = ctx.job_description.to_lowercase();
                keywords.iter().any(|kw| description.contains(kw))
            }
            Condition::Has(count) => count.of(&ctx.measurements) > 0,
            Condition::HasEdge(edge) => ctx.measurements.length(*edge) > 0.0,
        }
    }

    /// True when the condition depends only on the roof system and rejects it
    pub fn excludes_roof(&self, roof: RoofSystem) -> bool {
        match self {
            Condition::RoofIs(systems) => !systems.contains(&roof),
            Condition::Metal => !roof.is_metal(),
            Condition::NotMetal => roof.is_metal(),
            _ => false,
        }
    }
}

/// Case-insensitive keyword match against an item name
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    pub all_of: &'static [&'static str],
    pub none_of: &'static [&'static str],
}

impl Matcher {
    pub fn matches(&self, item: &PriceItem) -> bool {
        self.all_of.iter().all(|kw| item.name_contains(kw))
            && !self.none_of.iter().any(|kw| item.name_contains(kw))
    }

    pub fn first_match<'a>(&self, catalog: &'a Catalog) -> Option<&'a PriceItem> {
        catalog.items().iter().find(|item| self.matches(item))
    }
}

/// How a rule sizes the item it selects
#[derive(Debug, Clone, Copy)]
pub enum QuantityBasis {
    Fixed(f64),
    /// The roof area in squares
    Squares,
    /// Roof area divided by the item's area coverage
    AreaCoverage,
    /// Summed edge lengths divided by the item's linear coverage
    EdgeCoverage(&'static [Edge]),
    /// One unit per counted feature
    PerCount(Count),
}

fn covered(amount: f64, item: &PriceItem, unit: &str) -> f64 {
    let per_unit = item
        .coverage
        .filter(|c| *c > 0.0)
        .filter(|_| item.coverage_unit.as_deref().map_or(true, |u| u == unit));
    match per_unit {
        Some(coverage) => (amount / coverage).ceil(),
        None => amount.ceil(),
    }
}

impl QuantityBasis {
    /// Suggested quantity, never below one unit
    pub fn quantity(&self, item: &PriceItem, m: &Measurements) -> f64 {
        let raw = match self {
            QuantityBasis::Fixed(n) => *n,
            QuantityBasis::Squares => m.total_squares,
            QuantityBasis::AreaCoverage => covered(m.total_squares, item, "square"),
            QuantityBasis::EdgeCoverage(edges) => {
                let feet: f64 = edges.iter().map(|e| m.length(*e)).sum();
                covered(feet, item, "linear-foot")
            }
            QuantityBasis::PerCount(count) => count.of(m) as f64,
        };
        raw.max(1.0)
    }
}

/// Rule families, used for audit output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleGroup {
    RoofProduct,
    Underlayment,
    Flashing,
    Fasteners,
    Accessories,
    Labor,
    Equipment,
}

impl std::fmt::Display for RuleGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleGroup::RoofProduct => write!(f, "roof product"),
            RuleGroup::Underlayment => write!(f, "underlayment"),
            RuleGroup::Flashing => write!(f, "flashing"),
            RuleGroup::Fasteners => write!(f, "fasteners"),
            RuleGroup::Accessories => write!(f, "accessories"),
            RuleGroup::Labor => write!(f, "labor"),
            RuleGroup::Equipment => write!(f, "equipment"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SelectionRule {
    pub description: &'static str,
    pub group: RuleGroup,
    pub when: Condition,
    pub matcher: Matcher,
    pub quantity: QuantityBasis,
}

const SYNTHETIC: &[RoofSystem] = &[RoofSystem::Brava, RoofSystem::Davinci];
const SHINGLE: &[RoofSystem] = &[RoofSystem::Asphalt, RoofSystem::PresidentialAsphalt];
const NAILED: &[RoofSystem] = &[
    RoofSystem::Asphalt,
    RoofSystem::PresidentialAsphalt,
    RoofSystem::NonMetal,
];
const ROOF_EDGES: &[Edge] = &[Edge::Eave, Edge::Rake];

/// Selection rules in evaluation order
pub const SELECTION_RULES: &[SelectionRule] = &[
    // Roof products
    SelectionRule {
        description: "Brava field tile for a Brava roof",
        group: RuleGroup::RoofProduct,
        when: Condition::RoofIs(&[RoofSystem::Brava]),
        matcher: Matcher { all_of: &["brava"], none_of: &["ridge"] },
        quantity: QuantityBasis::AreaCoverage,
    },
    SelectionRule {
        description: "Brava hip and ridge for a Brava roof",
        group: RuleGroup::RoofProduct,
        when: Condition::RoofIs(&[RoofSystem::Brava]),
        matcher: Matcher { all_of: &["brava", "ridge"], none_of: &[] },
        quantity: QuantityBasis::EdgeCoverage(&[Edge::Ridge, Edge::Hip]),
    },
    SelectionRule {
        description: "DaVinci shake for a DaVinci roof",
        group: RuleGroup::RoofProduct,
        when: Condition::RoofIs(&[RoofSystem::Davinci]),
        matcher: Matcher { all_of: &["davinci"], none_of: &["ridge"] },
        quantity: QuantityBasis::AreaCoverage,
    },
    SelectionRule {
        description: "DaVinci hip and ridge for a DaVinci roof",
        group: RuleGroup::RoofProduct,
        when: Condition::RoofIs(&[RoofSystem::Davinci]),
        matcher: Matcher { all_of: &["davinci", "ridge"], none_of: &[] },
        quantity: QuantityBasis::EdgeCoverage(&[Edge::Ridge, Edge::Hip]),
    },
    SelectionRule {
        description: "Presidential shingles for a Presidential roof",
        group: RuleGroup::RoofProduct,
        when: Condition::RoofIs(&[RoofSystem::PresidentialAsphalt]),
        matcher: Matcher { all_of: &["presidential"], none_of: &[] },
        quantity: QuantityBasis::AreaCoverage,
    },
    SelectionRule {
        description: "Asphalt shingles for an asphalt roof",
        group: RuleGroup::RoofProduct,
        when: Condition::RoofIs(&[RoofSystem::Asphalt]),
        matcher: Matcher { all_of: &["asphalt", "shingle"], none_of: &["presidential"] },
        quantity: QuantityBasis::AreaCoverage,
    },
    SelectionRule {
        description: "Starter strip for a shingle roof",
        group: RuleGroup::RoofProduct,
        when: Condition::RoofIs(SHINGLE),
        matcher: Matcher { all_of: &["starter"], none_of: &[] },
        quantity: QuantityBasis::EdgeCoverage(ROOF_EDGES),
    },
    // Underlayment
    SelectionRule {
        description: "Ice and water barrier at eaves and valleys",
        group: RuleGroup::Underlayment,
        when: Condition::Always,
        matcher: Matcher { all_of: &["ice", "water"], none_of: &[] },
        quantity: QuantityBasis::EdgeCoverage(&[Edge::Eave, Edge::Valley]),
    },
    SelectionRule {
        description: "High temperature underlayment under metal",
        group: RuleGroup::Underlayment,
        when: Condition::Metal,
        matcher: Matcher { all_of: &["high temp"], none_of: &[] },
        quantity: QuantityBasis::AreaCoverage,
    },
    SelectionRule {
        description: "Synthetic underlayment under a non-metal roof",
        group: RuleGroup::Underlayment,
        when: Condition::NotMetal,
        matcher: Matcher { all_of: &["underlayment"], none_of: &["high temp"] },
        quantity: QuantityBasis::AreaCoverage,
    },
    // Flashing
    SelectionRule {
        description: "Drip edge along eaves and rakes",
        group: RuleGroup::Flashing,
        when: Condition::Always,
        matcher: Matcher { all_of: &["drip edge"], none_of: &[] },
        quantity: QuantityBasis::EdgeCoverage(ROOF_EDGES),
    },
    SelectionRule {
        description: "Valley flashing where valleys are measured",
        group: RuleGroup::Flashing,
        when: Condition::HasEdge(Edge::Valley),
        matcher: Matcher { all_of: &["valley"], none_of: &[] },
        quantity: QuantityBasis::EdgeCoverage(&[Edge::Valley]),
    },
    SelectionRule {
        description: "Pipe boot per penetration",
        group: RuleGroup::Flashing,
        when: Condition::Has(Count::Penetrations),
        matcher: Matcher { all_of: &["pipe boot"], none_of: &[] },
        quantity: QuantityBasis::PerCount(Count::Penetrations),
    },
    // Fasteners
    SelectionRule {
        description: "Ring shank nails for a synthetic roof",
        group: RuleGroup::Fasteners,
        when: Condition::RoofIs(SYNTHETIC),
        matcher: Matcher { all_of: &["ring shank"], none_of: &[] },
        quantity: QuantityBasis::AreaCoverage,
    },
    SelectionRule {
        description: "Standard roofing nails for a shingle or non-metal roof",
        group: RuleGroup::Fasteners,
        when: Condition::RoofIs(NAILED),
        matcher: Matcher { all_of: &["nail"], none_of: &["ring shank"] },
        quantity: QuantityBasis::AreaCoverage,
    },
    SelectionRule {
        description: "Screws for a metal roof",
        group: RuleGroup::Fasteners,
        when: Condition::Metal,
        matcher: Matcher { all_of: &["screw"], none_of: &[] },
        quantity: QuantityBasis::AreaCoverage,
    },
    // Accessories
    SelectionRule {
        description: "Skylight flashing kit per skylight",
        group: RuleGroup::Accessories,
        when: Condition::Has(Count::Skylights),
        matcher: Matcher { all_of: &["skylight"], none_of: &[] },
        quantity: QuantityBasis::PerCount(Count::Skylights),
    },
    SelectionRule {
        description: "Chimney flashing kit per chimney",
        group: RuleGroup::Accessories,
        when: Condition::Has(Count::Chimneys),
        matcher: Matcher { all_of: &["chimney"], none_of: &[] },
        quantity: QuantityBasis::PerCount(Count::Chimneys),
    },
    // Labor
    SelectionRule {
        description: "Tear-off labor when the job calls for a tear-off",
        group: RuleGroup::Labor,
        when: Condition::DescriptionMentions(&["tear off", "tear-off", "tearoff"]),
        matcher: Matcher { all_of: &["tear"], none_of: &[] },
        quantity: QuantityBasis::Squares,
    },
    // Equipment and fees
    SelectionRule {
        description: "Debris haulaway on every job",
        group: RuleGroup::Equipment,
        when: Condition::Always,
        matcher: Matcher { all_of: &["debris"], none_of: &[] },
        quantity: QuantityBasis::Fixed(1.0),
    },
    SelectionRule {
        description: "Porta potty on every job",
        group: RuleGroup::Equipment,
        when: Condition::Always,
        matcher: Matcher { all_of: &["porta"], none_of: &[] },
        quantity: QuantityBasis::Fixed(1.0),
    },
    SelectionRule {
        description: "Overnight charge for traveling crews",
        group: RuleGroup::Equipment,
        when: Condition::LaborSelected(&["hugo", "alfredo"]),
        matcher: Matcher { all_of: &["overnight"], none_of: &[] },
        quantity: QuantityBasis::Fixed(1.0),
    },
];

/// True if some roof-dependent rule reserves this item for another roof system
pub fn reserved_for_other_roof(item: &PriceItem, roof: RoofSystem) -> bool {
    SELECTION_RULES
        .iter()
        .any(|rule| rule.when.excludes_roof(roof) && rule.matcher.matches(item))
}
