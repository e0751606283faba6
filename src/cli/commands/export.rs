//! `ridge export` command - write an estimate's items as a CSV sheet

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::read_estimate;
use crate::cli::GlobalOpts;
use crate::interchange::export_csv;

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Estimate snapshot (JSON or YAML)
    pub estimate: PathBuf,

    /// Write to this file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(args: ExportArgs, _global: &GlobalOpts) -> Result<()> {
    let estimate = read_estimate(&args.estimate)?;
    let csv = export_csv(&estimate).into_diagnostic()?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, csv).into_diagnostic()?;
            eprintln!(
                "{} Exported {} items to {}",
                style("✓").green(),
                estimate.line_items.len() + estimate.optional_items.len(),
                style(path.display()).cyan()
            );
        }
        None => print!("{}", csv),
    }
    Ok(())
}
