//! `ridge template` command - print an example CSV sheet

use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::interchange::{template_csv, template_header};

#[derive(clap::Args, Debug)]
pub struct TemplateArgs {
    /// Header row only
    #[arg(long)]
    pub blank: bool,

    /// Write to this file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(args: TemplateArgs) -> Result<()> {
    let sheet = if args.blank {
        format!("{}\n", template_header())
    } else {
        template_csv()
    };
    match args.output {
        Some(path) => std::fs::write(path, sheet).into_diagnostic(),
        None => {
            print!("{}", sheet);
            Ok(())
        }
    }
}
