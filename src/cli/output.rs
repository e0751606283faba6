//! Output formatting utilities

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Style};
use tabled::{Table, Tabled};

use crate::cli::OutputFormat;
use crate::core::estimate::Estimate;
use crate::core::line_item::{format_money, LineItem};
use crate::interchange::export_csv;

/// Determine the effective output format based on context
pub fn effective_format(format: OutputFormat) -> OutputFormat {
    match format {
        OutputFormat::Auto => OutputFormat::Table,
        other => other,
    }
}

/// Print a value as JSON or YAML
pub fn print_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(value).into_diagnostic()?),
        _ => println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?),
    }
    Ok(())
}

/// Write a header and rows as CSV
pub fn write_csv<W, I, R, S>(out: W, header: &[&str], rows: I) -> Result<()>
where
    W: std::io::Write,
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(header).into_diagnostic()?;
    for row in rows {
        writer.write_record(row).into_diagnostic()?;
    }
    writer.flush().into_diagnostic()
}

/// Print a header and rows as CSV on stdout
pub fn print_csv<I, R, S>(header: &[&str], rows: I) -> Result<()>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    write_csv(std::io::stdout().lock(), header, rows)
}

#[derive(Tabled)]
struct LineRow {
    #[tabled(rename = "Item")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Qty")]
    quantity: String,
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Total")]
    total: String,
}

impl From<&LineItem> for LineRow {
    fn from(line: &LineItem) -> Self {
        Self {
            name: line.name().to_string(),
            category: line.category().label().to_string(),
            quantity: format!("{}", (line.quantity * 100.0).round() / 100.0),
            unit: line.unit().to_string(),
            price: format_money(line.price()),
            total: format_money(line.total),
        }
    }
}

/// Line items as a table, numeric columns right-aligned
pub fn line_table<'a>(lines: impl IntoIterator<Item = &'a LineItem>) -> String {
    let rows: Vec<LineRow> = lines.into_iter().map(LineRow::from).collect();
    Table::new(rows)
        .with(Style::sharp())
        .modify(Columns::new(2..), Alignment::right())
        .to_string()
}

fn summary_line(label: &str, value: f64) {
    println!("  {:<22} {:>14}", label, format_money(value));
}

/// The human-readable estimate: items by category, then the cascade
pub fn print_estimate_summary(estimate: &Estimate) {
    if !estimate.customer_info.name.is_empty() {
        println!(
            "{} {}",
            style("Estimate for").bold(),
            style(&estimate.customer_info.name).cyan()
        );
        if !estimate.customer_info.address.is_empty() {
            println!("  {}", estimate.customer_info.address);
        }
        println!();
    }

    let bucketed: Vec<&LineItem> = estimate.by_category.values().flatten().collect();
    if bucketed.is_empty() {
        println!("{}", style("No line items").dim());
    } else {
        println!("{}", line_table(bucketed));
    }

    if !estimate.building_subtotals.is_empty() {
        println!();
        println!("{}", style("Buildings").bold());
        for building in &estimate.building_subtotals {
            println!(
                "  {:<22} {:<18} {:>3} items  materials {}",
                building.name,
                building.roof_system,
                building.item_count,
                format_money(building.materials_total)
            );
        }
    }

    println!();
    println!("{}", style("─".repeat(40)).dim());
    for category in crate::core::category::Category::ALL {
        let total = estimate.total(category);
        if total != 0.0 {
            summary_line(category.label(), total);
        }
    }
    summary_line(&format!("Waste ({}%)", estimate.waste_percent), estimate.waste_allowance);
    summary_line("Base cost", estimate.base_cost);
    summary_line(
        &format!("Office ({}%)", estimate.office_cost_percent),
        estimate.office_allocation,
    );
    summary_line("Total cost", estimate.total_cost);
    summary_line(
        &format!("Sell price ({}% margin)", estimate.margin_percent),
        estimate.sell_price,
    );
    summary_line(
        &format!("Sales tax ({}%)", estimate.sales_tax_percent),
        estimate.sales_tax_amount,
    );
    println!("{}", style("─".repeat(40)).dim());
    println!(
        "  {:<22} {:>14}",
        style("Final price").bold(),
        style(format_money(estimate.final_price)).green().bold()
    );
    println!(
        "  {:<22} {:>14}",
        "Gross profit",
        format!("{} ({:.1}%)", format_money(estimate.gross_profit), estimate.profit_margin)
    );

    if !estimate.optional_items.is_empty() {
        println!();
        println!("{}", style("Optional add-ons").bold());
        println!("{}", line_table(&estimate.optional_items));
    }
}

/// Print an estimate in the requested format
pub fn print_estimate(estimate: &Estimate, format: OutputFormat) -> Result<()> {
    match effective_format(format) {
        OutputFormat::Json | OutputFormat::Yaml => print_structured(estimate, format),
        OutputFormat::Csv => {
            print!("{}", export_csv(estimate).into_diagnostic()?);
            Ok(())
        }
        OutputFormat::Table | OutputFormat::Auto => {
            print_estimate_summary(estimate);
            Ok(())
        }
    }
}
