//! Price catalog - the items an estimator can select into a job

use rust_embed::Embed;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::core::category::{Category, Unit};

#[derive(Embed)]
#[folder = "catalog/"]
struct EmbeddedCatalogs;

/// File name of the catalog shipped with the binary
pub const BUILTIN_CATALOG: &str = "default.yaml";

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceItem {
    /// Stable identifier referenced by selections and saved estimates
    pub id: String,

    /// Display name (rules match against this, case-insensitively)
    pub name: String,

    /// Unit the price is quoted in
    #[serde(default)]
    pub unit: Unit,

    /// Unit cost
    pub price: f64,

    /// Area or length one unit covers, for coverage-priced items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<f64>,

    /// Unit of `coverage` (e.g. "square", "linear-foot")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_unit: Option<String>,

    /// Subtotal bucket
    #[serde(default)]
    pub category: Category,

    /// Client-facing wording used on proposals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal_description: Option<String>,
}

impl PriceItem {
    /// Create a catalog item with no coverage data
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        unit: Unit,
        price: f64,
        category: Category,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit,
            price,
            coverage: None,
            coverage_unit: None,
            category,
            proposal_description: None,
        }
    }

    /// Set coverage per unit
    pub fn with_coverage(mut self, coverage: f64, coverage_unit: impl Into<String>) -> Self {
        self.coverage = Some(coverage);
        self.coverage_unit = Some(coverage_unit.into());
        self
    }

    /// Case-insensitive substring match against the item name
    pub fn name_contains(&self, keyword: &str) -> bool {
        self.name.to_lowercase().contains(&keyword.to_lowercase())
    }
}

/// Errors raised while loading or checking a catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog '{name}' is not embedded in this build")]
    NotEmbedded { name: String },

    #[error("Failed to parse catalog {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    #[error("Duplicate catalog id: {0}")]
    DuplicateId(String),

    #[error("Catalog item '{id}' has a negative price ({price})")]
    NegativePrice { id: String, price: f64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct CatalogFile {
    #[serde(default)]
    items: Vec<PriceItem>,
}

/// Ordered collection of catalog items
///
/// Order matters: keyword rules take the first matching item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    items: Vec<PriceItem>,
}

impl Catalog {
    /// Build a catalog, checking ids are unique and prices non-negative
    pub fn new(items: Vec<PriceItem>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for item in &items {
            if !seen.insert(item.id.as_str()) {
                return Err(CatalogError::DuplicateId(item.id.clone()));
            }
            if item.price < 0.0 || !item.price.is_finite() {
                return Err(CatalogError::NegativePrice {
                    id: item.id.clone(),
                    price: item.price,
                });
            }
        }
        Ok(Self { items })
    }

    /// Load the catalog embedded in the binary
    pub fn builtin() -> Result<Self, CatalogError> {
        let file = EmbeddedCatalogs::get(BUILTIN_CATALOG).ok_or_else(|| {
            CatalogError::NotEmbedded {
                name: BUILTIN_CATALOG.to_string(),
            }
        })?;
        let content = String::from_utf8_lossy(&file.data);
        Self::from_yaml(&content, BUILTIN_CATALOG)
    }

    /// Parse a catalog from YAML text (`items:` list)
    pub fn from_yaml(content: &str, source_name: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            serde_yml::from_str(content).map_err(|e| CatalogError::Parse {
                source_name: source_name.to_string(),
                message: e.to_string(),
            })?;
        Self::new(file.items)
    }

    /// Load a catalog file from disk
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content, &path.display().to_string())
    }

    /// Serialize back to the YAML file layout
    pub fn to_yaml(&self) -> Result<String, CatalogError> {
        let file = CatalogFile {
            items: self.items.clone(),
        };
        serde_yml::to_string(&file).map_err(|e| CatalogError::Parse {
            source_name: "catalog".to_string(),
            message: e.to_string(),
        })
    }

    pub fn items(&self) -> &[PriceItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up an item by id
    pub fn get(&self, id: &str) -> Option<&PriceItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Look up an item by exact name, ignoring case
    pub fn find_by_name(&self, name: &str) -> Option<&PriceItem> {
        let wanted = name.trim().to_lowercase();
        self.items
            .iter()
            .find(|item| item.name.to_lowercase() == wanted)
    }

    /// Items in the given category, in catalog order
    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &PriceItem> {
        self.items.iter().filter(move |item| item.category == category)
    }
}
