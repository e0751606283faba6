//! `ridge validate` command - check an estimate's stored figures

use console::style;
use miette::{bail, Result};
use std::path::PathBuf;

use crate::cli::helpers::read_estimate;
use crate::cli::output::{effective_format, print_structured};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::validator::validate_estimate;

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Estimate snapshots to validate (JSON or YAML)
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Strict mode - warnings become errors
    #[arg(long)]
    pub strict: bool,

    /// Show summary only, don't show individual problems
    #[arg(long)]
    pub summary: bool,
}

/// Validation statistics
#[derive(Default)]
struct ValidationStats {
    files_checked: usize,
    files_passed: usize,
    files_failed: usize,
    total_errors: usize,
    total_warnings: usize,
}

pub fn run(args: ValidateArgs, global: &GlobalOpts) -> Result<()> {
    let format = effective_format(global.format);
    let mut stats = ValidationStats::default();
    let mut reports = Vec::new();

    for path in &args.paths {
        stats.files_checked += 1;
        let estimate = match read_estimate(path) {
            Ok(estimate) => estimate,
            Err(e) => {
                stats.files_failed += 1;
                stats.total_errors += 1;
                if format == OutputFormat::Table && !args.summary {
                    println!("{} {} - {}", style("✗").red(), path.display(), e);
                }
                continue;
            }
        };

        let report = validate_estimate(&estimate);
        stats.total_errors += report.errors.len();
        stats.total_warnings += report.warnings.len();
        let passed = report.is_valid && !(args.strict && !report.warnings.is_empty());
        if passed {
            stats.files_passed += 1;
        } else {
            stats.files_failed += 1;
        }

        if format == OutputFormat::Table && !args.summary {
            if passed {
                println!("{} {}", style("✓").green(), path.display());
            } else {
                println!(
                    "{} {} - {} error(s)",
                    style("✗").red(),
                    path.display(),
                    report.errors.len()
                );
            }
            for error in &report.errors {
                println!("    {} {}", style("error:").red(), error);
            }
            for warning in &report.warnings {
                println!("    {} {}", style("warning:").yellow(), warning);
            }
        }
        reports.push(serde_json::json!({
            "path": path.display().to_string(),
            "is_valid": report.is_valid,
            "errors": report.errors,
            "warnings": report.warnings,
        }));
    }

    match format {
        OutputFormat::Json | OutputFormat::Yaml => print_structured(&reports, format)?,
        _ => {
            println!();
            println!("{}", style("─".repeat(60)).dim());
            println!("{}", style("Validation Summary").bold());
            println!("{}", style("─".repeat(60)).dim());
            println!("  Files checked:  {}", style(stats.files_checked).cyan());
            println!("  Files passed:   {}", style(stats.files_passed).green());
            println!("  Files failed:   {}", style(stats.files_failed).red());
            println!("  Total errors:   {}", style(stats.total_errors).red());
            if stats.total_warnings > 0 {
                println!("  Total warnings: {}", style(stats.total_warnings).yellow());
            }
        }
    }

    if stats.files_failed > 0 {
        bail!("{} of {} estimate(s) failed validation", stats.files_failed, stats.files_checked);
    }
    Ok(())
}
