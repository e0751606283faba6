//! `ridge quote` command - compute an estimate from a job file

use console::style;
use miette::{miette, Result};
use std::path::{Path, PathBuf};

use crate::cli::helpers::{
    block_on, extractor, extractor_timeout, load_catalog, load_config, write_estimate,
};
use crate::cli::output::{effective_format, print_estimate};
use crate::cli::{FinancialArgs, GlobalOpts, OutputFormat};
use crate::core::buildings::{compute_estimate, Job};
use crate::core::catalog::Catalog;
use crate::core::config::Config;
use crate::rules::{apply_to_job, assist_selection, AutoSelection, AutoSelectionContext};

#[derive(clap::Args, Debug)]
pub struct QuoteArgs {
    /// Job file (YAML)
    pub job: PathBuf,

    /// Auto-select items for buildings that have no selections
    #[arg(long)]
    pub auto_select: bool,

    /// Also ask the extractor for items the rules missed (implies --auto-select)
    #[arg(long)]
    pub assist: bool,

    /// Save the estimate snapshot (JSON, or YAML by extension)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub financial: FinancialArgs,
}

pub fn read_job(path: &Path) -> Result<Job> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| miette!("Failed to read {}: {}", path.display(), e))?;
    serde_yml::from_str(&content).map_err(|e| miette!("Invalid job file {}: {}", path.display(), e))
}

/// Fill empty buildings from the rules, optionally extended by the extractor
pub fn auto_select_job(
    job: &mut Job,
    catalog: &Catalog,
    config: &Config,
    assist: bool,
) -> Result<Vec<(String, AutoSelection)>> {
    let audits = apply_to_job(job, catalog, &config.job);
    if !assist || audits.is_empty() {
        return Ok(audits);
    }

    let extractor = extractor(config)?;
    let timeout = extractor_timeout(config);
    let max_tokens = config.extractor.max_tokens;
    let labor: Vec<String> = job
        .labor_item_id
        .iter()
        .chain(config.job.labor_item_id.iter())
        .take(1)
        .cloned()
        .collect();

    let mut assisted = Vec::with_capacity(audits.len());
    for (name, selection) in audits {
        let Some(building) = job.buildings.iter_mut().find(|b| b.name == name) else {
            assisted.push((name, selection));
            continue;
        };
        let ctx = AutoSelectionContext {
            job_description: job.description.clone(),
            vendor_items: job.vendor_items.clone(),
            selected_item_ids: labor.clone(),
            measurements: building.measurements.clone(),
            roof_system: Some(building.roof_system),
        };
        let extended = block_on(assist_selection(
            &extractor, &ctx, catalog, selection, max_tokens, timeout,
        ))?;
        building.selections = extended.to_selections();
        assisted.push((name, extended));
    }
    Ok(assisted)
}

pub fn print_audits(audits: &[(String, AutoSelection)]) {
    for (building, selection) in audits {
        println!(
            "{} {} ({} items)",
            style("Auto-selected").bold(),
            style(building).cyan(),
            selection.items.len()
        );
        for rule in &selection.applied_rules {
            println!("  {} {}", style("•").dim(), rule);
        }
        println!();
    }
}

pub fn run(args: QuoteArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let catalog = load_catalog(global, &config)?;

    // Configuration, then the job's own block, then flags
    let mut job = read_job(&args.job)?;
    job.financial = job.financial.then(&args.financial.overrides());
    let settings = config.financial;
    job.financial
        .apply(settings)
        .validate()
        .map_err(|e| miette!("{}", e))?;

    let audits = if args.auto_select || args.assist {
        auto_select_job(&mut job, &catalog, &config, args.assist)?
    } else {
        Vec::new()
    };

    let estimate = compute_estimate(&job, &catalog, &config.job, &settings)
        .map_err(|e| miette!("{}", e))?;

    if let Some(path) = &args.output {
        write_estimate(path, &estimate)?;
        tracing::info!(path = %path.display(), "saved estimate");
    }

    let format = effective_format(global.format);
    if format == OutputFormat::Table {
        print_audits(&audits);
    }
    print_estimate(&estimate, format)?;

    if let Some(path) = &args.output {
        if format == OutputFormat::Table {
            println!();
            println!("{} Saved to {}", style("✓").green(), style(path.display()).cyan());
        }
    }
    Ok(())
}
