//! Command-line arguments

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    catalog::CatalogCommands, completions::CompletionsArgs, config::ConfigCommands,
    describe::DescribeArgs, export::ExportArgs, extract::ExtractCommands, import::ImportArgs,
    kits::KitsArgs, proposal::ProposalArgs, quote::QuoteArgs, select::SelectArgs,
    template::TemplateArgs, validate::ValidateArgs,
};
use crate::core::cascade::{FinancialOverrides, FinancialSettings};

#[derive(Parser, Debug)]
#[command(name = "ridge")]
#[command(author, version, about = "Reconciled roofing estimates from plain-text jobs, catalogs and CSV sheets")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(clap::Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Config file used instead of ./ridge.yaml
    #[arg(long, global = true, env = "RIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Catalog file used instead of the built-in catalog
    #[arg(long, global = true, env = "RIDGE_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Merge this user's stored catalog items over the base catalog
    #[arg(long, global = true, env = "RIDGE_USER")]
    pub user: Option<String>,

    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value_t = OutputFormat::Auto)]
    pub format: OutputFormat,

    /// More log output (-v info, -vv debug)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table for list output, summary otherwise
    Auto,
    Table,
    Json,
    Yaml,
    Csv,
}

/// Financial overrides; unset values come from configuration
#[derive(clap::Args, Debug, Clone, Default)]
pub struct FinancialArgs {
    /// Waste allowance on materials, percent
    #[arg(long, env = "RIDGE_WASTE_PERCENT")]
    pub waste: Option<f64>,

    /// Sundries on materials, percent
    #[arg(long, env = "RIDGE_SUNDRIES_PERCENT")]
    pub sundries: Option<f64>,

    /// Office overhead on base cost, percent
    #[arg(long, env = "RIDGE_OFFICE_PERCENT")]
    pub office: Option<f64>,

    /// Gross margin on sell price, percent (below 100)
    #[arg(long, env = "RIDGE_MARGIN_PERCENT")]
    pub margin: Option<f64>,

    /// Sales tax on sell price, percent
    #[arg(long, env = "RIDGE_SALES_TAX_PERCENT")]
    pub tax: Option<f64>,
}

impl FinancialArgs {
    pub fn overrides(&self) -> FinancialOverrides {
        FinancialOverrides {
            waste_percent: self.waste,
            sundries_percent: self.sundries,
            office_percent: self.office,
            margin_percent: self.margin,
            sales_tax_percent: self.tax,
        }
    }

    /// Apply the overrides given on the command line
    pub fn apply(&self, base: FinancialSettings) -> FinancialSettings {
        self.overrides().apply(base)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute an estimate from a job file
    Quote(QuoteArgs),

    /// Build an estimate from a CSV sheet
    Import(ImportArgs),

    /// Write an estimate's items as a CSV sheet
    Export(ExportArgs),

    /// Print an example CSV sheet
    Template(TemplateArgs),

    /// Re-derive an estimate's totals and report mismatches
    Validate(ValidateArgs),

    /// Propose catalog items for a job's buildings
    Select(SelectArgs),

    /// Group an estimate's items into kits for presentation
    Kits(KitsArgs),

    /// Generate client-facing item descriptions
    Describe(DescribeArgs),

    /// Render the customer proposal
    Proposal(ProposalArgs),

    /// Read measurement reports and vendor quotes
    #[command(subcommand)]
    Extract(ExtractCommands),

    /// Inspect and manage catalog items
    #[command(subcommand)]
    Catalog(CatalogCommands),

    /// Show or change configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_financial_overrides() {
        let args = FinancialArgs {
            margin: Some(50.0),
            ..Default::default()
        };
        let settings = args.apply(FinancialSettings::default());
        assert_eq!(settings.margin_percent, 50.0);
        assert_eq!(settings.waste_percent, 10.0);
    }
}
