//! `ridge proposal` command - render the customer proposal

use console::style;
use miette::{miette, IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::commands::kits::{organize, GroupingArgs};
use crate::cli::helpers::{load_config, read_estimate};
use crate::cli::GlobalOpts;
use crate::proposal::ProposalRenderer;

#[derive(clap::Args, Debug)]
pub struct ProposalArgs {
    /// Estimate snapshot (JSON or YAML)
    pub estimate: PathBuf,

    #[command(flatten)]
    pub grouping: GroupingArgs,

    /// Write to this file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(args: ProposalArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let estimate = read_estimate(&args.estimate)?;
    let organized = organize(&estimate, &args.grouping, &config)?;

    let renderer = ProposalRenderer::new().map_err(|e| miette!("{}", e))?;
    let text = renderer
        .render(&estimate, &organized.lines)
        .map_err(|e| miette!("{}", e))?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, text).into_diagnostic()?;
            eprintln!("{} Proposal written to {}", style("✓").green(), style(path.display()).cyan());
        }
        None => print!("{}", text),
    }
    Ok(())
}
