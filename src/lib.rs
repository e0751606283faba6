//! Ridgeline: reconciled roofing estimates from plain-text catalogs and jobs
//!
//! The `core` layer holds the data model and the pure calculators (category
//! aggregation, the financial cascade, multi-building combination and the
//! validator). `rules` proposes catalog selections, `proposal` regroups an
//! estimate for the customer, and `interchange` moves estimates in and out of
//! CSV sheets. `extract` is the seam to the external text-extraction service.

pub mod cli;
pub mod core;
pub mod extract;
pub mod interchange;
pub mod logging;
pub mod proposal;
pub mod rules;
