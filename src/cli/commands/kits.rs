//! `ridge kits` command - group an estimate's items for presentation

use console::style;
use miette::Result;
use std::path::PathBuf;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Style};
use tabled::{Table, Tabled};

use crate::cli::helpers::{
    block_on, extractor, extractor_timeout, load_config, read_estimate, truncate_str,
};
use crate::cli::output::{effective_format, print_csv, print_structured};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::config::Config;
use crate::core::estimate::Estimate;
use crate::core::line_item::format_money;
use crate::proposal::{
    group_into_kits, identity_grouping, organize_proposal, proposal_items, GroupingSource,
    KitPolicy, OrganizedProposal,
};

#[derive(clap::Args, Debug, Clone)]
pub struct GroupingArgs {
    /// Let the extractor propose the groups (falls back to one line per item)
    #[arg(long)]
    pub llm: bool,

    /// Use the on-screen threshold instead of the proposal one
    #[arg(long)]
    pub display: bool,

    /// One line per item, no grouping
    #[arg(long, conflicts_with_all = ["llm", "display"])]
    pub ungrouped: bool,
}

#[derive(clap::Args, Debug)]
pub struct KitsArgs {
    /// Estimate snapshot (JSON or YAML)
    pub estimate: PathBuf,

    #[command(flatten)]
    pub grouping: GroupingArgs,
}

/// Organize an estimate's items the way the flags ask
pub fn organize(estimate: &Estimate, args: &GroupingArgs, config: &Config) -> Result<OrganizedProposal> {
    let items = proposal_items(estimate);
    let policy = if args.display {
        KitPolicy::display()
    } else {
        KitPolicy::proposal()
    };

    if args.ungrouped {
        return Ok(identity_grouping(&items));
    }
    if args.llm {
        let extractor = extractor(config)?;
        let timeout = extractor_timeout(config);
        let max_tokens = config.extractor.max_tokens;
        return block_on(organize_proposal(
            &extractor, &items, &policy, max_tokens, timeout,
        ));
    }
    Ok(OrganizedProposal {
        source: GroupingSource::Kits,
        lines: group_into_kits(&items, &policy),
        restored: Vec::new(),
    })
}

#[derive(Tabled)]
struct KitRow {
    #[tabled(rename = "Line")]
    name: String,
    #[tabled(rename = "Items")]
    count: usize,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "Includes")]
    members: String,
}

pub fn run(args: KitsArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let estimate = read_estimate(&args.estimate)?;
    let organized = organize(&estimate, &args.grouping, &config)?;

    match effective_format(global.format) {
        format @ (OutputFormat::Json | OutputFormat::Yaml) => print_structured(&organized, format)?,
        OutputFormat::Csv => {
            print_csv(
                &["name", "quantity", "unit", "total", "optional", "members"],
                organized.lines.iter().map(|line| {
                    [
                        line.name.clone(),
                        line.quantity.to_string(),
                        line.unit.to_string(),
                        format!("{:.2}", line.total),
                        line.is_optional.to_string(),
                        line.members.join("; "),
                    ]
                }),
            )?;
        }
        _ => {
            let rows: Vec<KitRow> = organized
                .lines
                .iter()
                .map(|line| KitRow {
                    name: if line.is_optional {
                        format!("{} (optional)", line.name)
                    } else {
                        line.name.clone()
                    },
                    count: line.members.len().max(1),
                    total: format_money(line.total),
                    members: truncate_str(&line.members.join(", "), 60),
                })
                .collect();
            println!(
                "{}",
                Table::new(rows)
                    .with(Style::sharp())
                    .modify(Columns::new(1..3), Alignment::right())
            );
            let kits = organized.lines.iter().filter(|l| l.is_kit()).count();
            println!(
                "{} lines, {} kits",
                style(organized.lines.len()).cyan(),
                style(kits).cyan()
            );
            if !organized.restored.is_empty() {
                println!(
                    "{} {} item(s) left out of the suggested groups were restored",
                    style("!").yellow(),
                    organized.restored.len()
                );
            }
        }
    }
    Ok(())
}
