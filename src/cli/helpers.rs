//! Shared helper functions for CLI commands
//!
//! Loading configuration, catalogs and estimate files, and the small
//! formatting helpers the list outputs use.

use miette::{miette, IntoDiagnostic, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::args::FinancialArgs;
use crate::cli::GlobalOpts;
use crate::core::cascade::FinancialSettings;
use crate::core::catalog::{Catalog, PriceItem};
use crate::core::config::Config;
use crate::core::estimate::Estimate;
use crate::core::store::{CatalogStore, FileCatalogStore};
use crate::extract::CommandExtractor;

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Run a future to completion on a fresh runtime
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    Ok(runtime.block_on(future))
}

pub fn load_config(global: &GlobalOpts) -> Result<Config> {
    Config::load(global.config.as_deref()).map_err(|e| miette!("{}", e))
}

/// Configured financial settings with command-line overrides applied
pub fn financial_settings(config: &Config, args: &FinancialArgs) -> Result<FinancialSettings> {
    let settings = args.apply(config.financial);
    settings.validate().map_err(|e| miette!("{}", e))?;
    Ok(settings)
}

/// Directory holding per-user catalog files
pub fn store_dir(config: &Config) -> Result<PathBuf> {
    config
        .store_dir
        .clone()
        .or_else(Config::default_store_dir)
        .ok_or_else(|| miette!("No catalog store directory. Set one with: ridge config set store_dir <dir>"))
}

/// Items stored for `user`
pub fn user_items(config: &Config, user: &str) -> Result<Vec<PriceItem>> {
    let store = FileCatalogStore::new(store_dir(config)?);
    block_on(store.load_items(user))?.map_err(|e| miette!("{}", e))
}

/// The base catalog (file or built-in) with the user's stored items merged in
///
/// A stored item replaces the base item with the same id; new ids are
/// appended in stored order.
pub fn load_catalog(global: &GlobalOpts, config: &Config) -> Result<Catalog> {
    let base = match global.catalog.as_ref().or(config.catalog.as_ref()) {
        Some(path) => Catalog::load(path).map_err(|e| miette!("{}", e))?,
        None => Catalog::builtin().map_err(|e| miette!("{}", e))?,
    };
    let Some(user) = global.user.as_deref() else {
        return Ok(base);
    };

    let mut items = base.items().to_vec();
    for stored in user_items(config, user)? {
        match items.iter_mut().find(|item| item.id == stored.id) {
            Some(existing) => *existing = stored,
            None => items.push(stored),
        }
    }
    Catalog::new(items).map_err(|e| miette!("{}", e))
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Read an estimate snapshot (JSON, or YAML by extension)
pub fn read_estimate(path: &Path) -> Result<Estimate> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| miette!("Failed to read {}: {}", path.display(), e))?;
    if is_yaml(path) {
        serde_yml::from_str(&content)
            .map_err(|e| miette!("Invalid estimate {}: {}", path.display(), e))
    } else {
        serde_json::from_str(&content)
            .map_err(|e| miette!("Invalid estimate {}: {}", path.display(), e))
    }
}

/// Write an estimate snapshot (JSON, or YAML by extension)
pub fn write_estimate(path: &Path, estimate: &Estimate) -> Result<()> {
    let content = if is_yaml(path) {
        serde_yml::to_string(estimate).into_diagnostic()?
    } else {
        serde_json::to_string_pretty(estimate).into_diagnostic()?
    };
    std::fs::write(path, content)
        .map_err(|e| miette!("Failed to write {}: {}", path.display(), e))
}

/// The configured extraction command
pub fn extractor(config: &Config) -> Result<CommandExtractor> {
    config
        .extractor
        .command
        .as_deref()
        .map(CommandExtractor::new)
        .ok_or_else(|| {
            miette!("No extractor configured. Set one with: ridge config set extractor.command '<command>'")
        })
}

pub fn extractor_timeout(config: &Config) -> Duration {
    Duration::from_secs(config.extractor.timeout_secs)
}
