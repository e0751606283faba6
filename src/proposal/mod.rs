//! Client-facing proposal output
//!
//! Regroups an estimate's line items for presentation (deterministic kits or
//! model-assisted groups), generates item descriptions, and renders the text
//! proposal.

pub mod descriptions;
pub mod kits;
pub mod organize;
pub mod render;

pub use descriptions::{apply_descriptions, generate_descriptions, BulkDescriptions};
pub use kits::{group_into_kits, proposal_items, KitDefinition, KitPolicy, ProposalLine, KITS};
pub use organize::{identity_grouping, organize_proposal, GroupingSource, OrganizedProposal};
pub use render::{ProposalRenderer, RenderError};
