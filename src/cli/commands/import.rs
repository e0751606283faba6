//! `ridge import` command - build an estimate from a CSV sheet

use console::style;
use miette::{Report, Result};
use std::path::PathBuf;

use crate::cli::helpers::{financial_settings, load_catalog, load_config, write_estimate};
use crate::cli::output::{effective_format, print_estimate};
use crate::cli::{FinancialArgs, GlobalOpts, OutputFormat};
use crate::interchange::import_csv_file;

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// CSV sheet to import
    pub file: PathBuf,

    /// Save the estimate snapshot (JSON, or YAML by extension)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub financial: FinancialArgs,
}

pub fn run(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let catalog = load_catalog(global, &config)?;
    let settings = financial_settings(&config, &args.financial)?;

    let estimate = import_csv_file(&args.file, Some(&catalog), &settings).map_err(Report::new)?;

    if let Some(path) = &args.output {
        write_estimate(path, &estimate)?;
    }

    let format = effective_format(global.format);
    print_estimate(&estimate, format)?;
    if let Some(path) = &args.output {
        if format == OutputFormat::Table {
            println!();
            println!("{} Saved to {}", style("✓").green(), style(path.display()).cyan());
        }
    }
    Ok(())
}
