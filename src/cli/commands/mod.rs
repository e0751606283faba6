//! CLI command implementations

pub mod catalog;
pub mod completions;
pub mod config;
pub mod describe;
pub mod export;
pub mod extract;
pub mod import;
pub mod kits;
pub mod proposal;
pub mod quote;
pub mod select;
pub mod template;
pub mod validate;
