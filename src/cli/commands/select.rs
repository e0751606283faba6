//! `ridge select` command - propose catalog items for a job's buildings

use console::style;
use miette::{miette, IntoDiagnostic, Result};
use serde::Serialize;
use std::path::PathBuf;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::cli::commands::quote::{auto_select_job, read_job};
use crate::cli::helpers::{load_catalog, load_config};
use crate::cli::output::{effective_format, print_csv, print_structured};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::rules::AutoSelection;

#[derive(clap::Args, Debug)]
pub struct SelectArgs {
    /// Job file (YAML)
    pub job: PathBuf,

    /// Also ask the extractor for items the rules missed
    #[arg(long)]
    pub assist: bool,

    /// Re-select buildings that already have selections
    #[arg(long)]
    pub replace: bool,

    /// Write the selections back into the job file
    #[arg(long)]
    pub write: bool,
}

#[derive(Serialize)]
struct BuildingSelection<'a> {
    building: &'a str,
    #[serde(flatten)]
    selection: &'a AutoSelection,
}

#[derive(Tabled)]
struct SuggestionRow {
    #[tabled(rename = "Item")]
    item_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Qty")]
    quantity: f64,
    #[tabled(rename = "Rule")]
    rule: String,
}

pub fn run(args: SelectArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let catalog = load_catalog(global, &config)?;
    let mut job = read_job(&args.job)?;

    if args.replace {
        for building in &mut job.buildings {
            building.selections.clear();
        }
    }
    if job.buildings.is_empty() {
        return Err(miette!("Job has no buildings"));
    }

    let audits = auto_select_job(&mut job, &catalog, &config, args.assist)?;

    match effective_format(global.format) {
        format @ (OutputFormat::Json | OutputFormat::Yaml) => {
            let out: Vec<BuildingSelection> = audits
                .iter()
                .map(|(building, selection)| BuildingSelection {
                    building,
                    selection,
                })
                .collect();
            print_structured(&out, format)?;
        }
        OutputFormat::Csv => {
            print_csv(
                &["building", "item_id", "quantity", "rule"],
                audits.iter().flat_map(|(building, selection)| {
                    selection.items.iter().map(move |item| {
                        [
                            building.clone(),
                            item.item_id.clone(),
                            item.quantity.to_string(),
                            item.rule.clone(),
                        ]
                    })
                }),
            )?;
        }
        _ => {
            if audits.is_empty() {
                println!(
                    "Every building already has selections. Use {} to re-select.",
                    style("--replace").yellow()
                );
            }
            for (building, selection) in &audits {
                println!(
                    "{} {} - {}",
                    style("Building").bold(),
                    style(building).cyan(),
                    style(selection.roof_system).yellow()
                );
                let rows: Vec<SuggestionRow> = selection
                    .items
                    .iter()
                    .map(|s| SuggestionRow {
                        item_id: s.item_id.clone(),
                        name: s.name.clone(),
                        quantity: s.quantity,
                        rule: s.rule.clone(),
                    })
                    .collect();
                println!("{}", Table::new(rows).with(Style::sharp()));
                println!();
            }
        }
    }

    if args.write && !audits.is_empty() {
        let content = serde_yml::to_string(&job).into_diagnostic()?;
        std::fs::write(&args.job, content).into_diagnostic()?;
        eprintln!(
            "{} Wrote selections for {} building(s) to {}",
            style("✓").green(),
            audits.len(),
            style(args.job.display()).cyan()
        );
    }
    Ok(())
}
