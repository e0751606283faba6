//! Core module - estimate data types and the pure calculators

pub mod aggregate;
pub mod buildings;
pub mod cascade;
pub mod catalog;
pub mod category;
pub mod config;
pub mod estimate;
pub mod line_item;
pub mod measurements;
pub mod store;
pub mod validator;

pub use aggregate::{aggregate, CategoryBuckets, CategoryTotals};
pub use buildings::{
    combine_buildings, compute_estimate, Building, Job, JobError, JobRules, RoofSystem, Selection,
    VendorQuoteItem,
};
pub use cascade::{CascadeError, CascadeResult, FinancialOverrides, FinancialSettings};
pub use catalog::{Catalog, CatalogError, PriceItem};
pub use category::{Category, Unit};
pub use config::{Config, ConfigError};
pub use estimate::{CustomerInfo, Estimate, EstimateInput};
pub use line_item::{format_money, round_cents, LineItem};
pub use measurements::{Edge, MeasurementError, Measurements};
pub use store::{CatalogStore, FileCatalogStore, StoreError};
pub use validator::{validate_estimate, ValidationReport};
