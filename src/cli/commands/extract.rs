//! `ridge extract` command - read measurement reports and vendor quotes
//!
//! Output is YAML ready to paste into a job file. A failed or unverifiable
//! reply is reported as an error; nothing is guessed.

use clap::Subcommand;
use miette::{miette, IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::{block_on, extractor, extractor_timeout, load_config};
use crate::cli::output::print_structured;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::extract::{extract_measurements, extract_vendor_quote, Attachment};

#[derive(Subcommand, Debug)]
pub enum ExtractCommands {
    /// Read roof measurements from an aerial measurement report
    Measurements(DocumentArgs),

    /// Read line items from a supplier quotation
    Quote(DocumentArgs),
}

#[derive(clap::Args, Debug)]
pub struct DocumentArgs {
    /// Report or quotation (PDF or image)
    pub file: PathBuf,
}

pub fn run(cmd: ExtractCommands, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let extractor = extractor(&config)?;
    let timeout = extractor_timeout(&config);
    let max_tokens = config.extractor.max_tokens;
    let format = match global.format {
        OutputFormat::Json => OutputFormat::Json,
        _ => OutputFormat::Yaml,
    };

    match cmd {
        ExtractCommands::Measurements(args) => {
            let document = Attachment::from_path(&args.file).into_diagnostic()?;
            let measurements =
                block_on(extract_measurements(&extractor, document, max_tokens, timeout))?
                    .map_err(|e| miette!("{}", e))?;
            print_structured(&measurements, format)
        }
        ExtractCommands::Quote(args) => {
            let document = Attachment::from_path(&args.file).into_diagnostic()?;
            let items = block_on(extract_vendor_quote(&extractor, document, max_tokens, timeout))?
                .map_err(|e| miette!("{}", e))?;
            print_structured(&items, format)
        }
    }
}
