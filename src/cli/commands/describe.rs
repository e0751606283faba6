//! `ridge describe` command - generate client-facing item descriptions
//!
//! Items are described one at a time; Ctrl-C stops the run after the item in
//! flight and keeps what was generated so far.

use console::style;
use miette::{miette, Result};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cli::helpers::{
    block_on, extractor, extractor_timeout, load_config, read_estimate, store_dir, truncate_str,
    write_estimate,
};
use crate::cli::output::{effective_format, print_structured};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::catalog::PriceItem;
use crate::core::store::{CatalogStore, FileCatalogStore};
use crate::proposal::{apply_descriptions, generate_descriptions};

#[derive(clap::Args, Debug)]
pub struct DescribeArgs {
    /// Estimate snapshot (JSON or YAML)
    pub estimate: PathBuf,

    /// Regenerate items that already have a description
    #[arg(long)]
    pub all: bool,

    /// Save the descriptions into the estimate file
    #[arg(long)]
    pub write: bool,

    /// Also save the described items to the user's catalog (needs --user)
    #[arg(long)]
    pub store: bool,
}

pub fn run(args: DescribeArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let user = match (args.store, global.user.as_deref()) {
        (true, None) => return Err(miette!("--store needs a user (--user or RIDGE_USER)")),
        (_, user) => user,
    };
    let mut estimate = read_estimate(&args.estimate)?;

    let mut seen = HashSet::new();
    let targets: Vec<PriceItem> = estimate
        .line_items
        .iter()
        .chain(estimate.optional_items.iter())
        .map(|line| &line.item)
        .filter(|item| {
            args.all
                || item
                    .proposal_description
                    .as_deref()
                    .map_or(true, |d| d.trim().is_empty())
        })
        .filter(|item| seen.insert(item.id.clone()))
        .cloned()
        .collect();

    if targets.is_empty() {
        println!(
            "Every item already has a description. Use {} to regenerate.",
            style("--all").yellow()
        );
        return Ok(());
    }

    let extractor = extractor(&config)?;
    let timeout = extractor_timeout(&config);
    let cancel = Arc::new(AtomicBool::new(false));

    let results = block_on(async {
        let flag = Arc::clone(&cancel);
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                flag.store(true, Ordering::SeqCst);
            }
        });
        let results = generate_descriptions(&extractor, &targets, timeout, &cancel, |current, total| {
            eprintln!(
                "{} [{}/{}] {}",
                style("→").blue(),
                current,
                total,
                truncate_str(&targets[current - 1].name, 50)
            );
        })
        .await;
        watcher.abort();
        results
    })?;

    let changed = apply_descriptions(
        estimate
            .line_items
            .iter_mut()
            .chain(estimate.optional_items.iter_mut())
            .map(|line| &mut line.item),
        &results,
    );
    // Rebuild the buckets so they carry the new descriptions
    estimate = estimate
        .recompute(&estimate.settings())
        .map_err(|e| miette!("{}", e))?;

    match effective_format(global.format) {
        format @ (OutputFormat::Json | OutputFormat::Yaml) => print_structured(&results, format)?,
        _ => {
            for generated in &results.generated {
                println!("{} {}", style(&generated.item_id).cyan(), generated.description);
            }
            for failure in &results.failed {
                println!("{} {} - {}", style("✗").red(), failure.item_id, failure.error);
            }
            if results.cancelled {
                println!(
                    "{} Cancelled after {} of {} items",
                    style("!").yellow(),
                    results.generated.len() + results.failed.len(),
                    targets.len()
                );
            }
        }
    }

    if args.write && changed > 0 {
        write_estimate(&args.estimate, &estimate)?;
        eprintln!(
            "{} Updated {} line(s) in {}",
            style("✓").green(),
            changed,
            style(args.estimate.display()).cyan()
        );
    }

    if let (true, Some(user)) = (args.store, user) {
        let mut described = targets;
        apply_descriptions(described.iter_mut(), &results);
        described.retain(|item| results.get(&item.id).is_some());
        let store = FileCatalogStore::new(store_dir(&config)?);
        let count = described.len();
        block_on(store.bulk_upsert(user, described))?.map_err(|e| miette!("{}", e))?;
        eprintln!("{} Saved {} description(s) for {}", style("✓").green(), count, user);
    }
    Ok(())
}
