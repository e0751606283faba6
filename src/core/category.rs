//! Category and unit vocabularies shared by catalog items and line items

use serde::{Deserialize, Serialize};

/// Cost category used for subtotaling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[derive(Default)]
pub enum Category {
    #[default]
    Materials,
    Consumables,
    Labor,
    Equipment,
    Accessories,
    VendorQuote,
}

impl Category {
    /// All categories in subtotal order
    pub const ALL: [Category; 6] = [
        Category::Materials,
        Category::Consumables,
        Category::Labor,
        Category::Equipment,
        Category::Accessories,
        Category::VendorQuote,
    ];

    /// Canonical key used in `by_category` / `totals` maps
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Materials => "materials",
            Category::Consumables => "consumables",
            Category::Labor => "labor",
            Category::Equipment => "equipment",
            Category::Accessories => "accessories",
            Category::VendorQuote => "vendor-quote",
        }
    }

    /// Human-readable heading
    pub fn label(&self) -> &'static str {
        match self {
            Category::Materials => "Materials",
            Category::Consumables => "Consumables & Hardware",
            Category::Labor => "Labor",
            Category::Equipment => "Equipment & Fees",
            Category::Accessories => "Accessories",
            Category::VendorQuote => "Vendor Quote",
        }
    }

    /// Lenient mapping used by the CSV importer
    ///
    /// Recognizes singular/plural forms and the vendor aliases; anything else
    /// returns `None` so the caller can decide on a default.
    pub fn from_alias(s: &str) -> Option<Self> {
        let key = s.trim().to_lowercase();
        let category = match key.as_str() {
            "material" | "materials" => Category::Materials,
            "consumable" | "consumables" | "sundries" | "sundry" | "hardware" => {
                Category::Consumables
            }
            "labor" | "labour" => Category::Labor,
            "equipment" | "fees" | "fee" => Category::Equipment,
            "accessory" | "accessories" => Category::Accessories,
            "vendor" | "vendor-quote" | "vendor quote" | "vendorquote" | "vendor_quote"
            | "schafer" => Category::VendorQuote,
            _ => return None,
        };
        Some(category)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    /// Strict parse - only canonical keys are accepted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| {
                format!(
                    "Unknown category: {}. Use materials, consumables, labor, equipment, accessories, or vendor-quote",
                    s
                )
            })
    }
}

/// Unit of measure for catalog pricing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[derive(Default)]
pub enum Unit {
    Square,
    SquareFoot,
    Bundle,
    Roll,
    LinearFoot,
    #[default]
    Each,
    Pail,
    Box,
    Tube,
    Sheet,
    FlatFee,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Square => "square",
            Unit::SquareFoot => "square-foot",
            Unit::Bundle => "bundle",
            Unit::Roll => "roll",
            Unit::LinearFoot => "linear-foot",
            Unit::Each => "each",
            Unit::Pail => "pail",
            Unit::Box => "box",
            Unit::Tube => "tube",
            Unit::Sheet => "sheet",
            Unit::FlatFee => "flat-fee",
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace(['_', '.'], "");
        let unit = match key.as_str() {
            "square" | "squares" | "sq" | "sqs" => Unit::Square,
            "square-foot" | "square foot" | "square feet" | "sq ft" | "sqft" | "sf" => Unit::SquareFoot,
            "bundle" | "bundles" | "bdl" | "bd" => Unit::Bundle,
            "roll" | "rolls" | "rl" => Unit::Roll,
            "linear-foot" | "linear foot" | "linear feet" | "lf" | "ft" => Unit::LinearFoot,
            "each" | "ea" | "pc" | "piece" | "pieces" => Unit::Each,
            "pail" | "pails" => Unit::Pail,
            "box" | "boxes" | "bx" => Unit::Box,
            "tube" | "tubes" => Unit::Tube,
            "sheet" | "sheets" => Unit::Sheet,
            "flat-fee" | "flat fee" | "flat" | "fee" | "ls" | "lump sum" => Unit::FlatFee,
            _ => return Err(format!("Unknown unit: {}", s)),
        };
        Ok(unit)
    }
}
