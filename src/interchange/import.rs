//! CSV sheet import
//!
//! The sheet carries line items only. The cascade is always re-derived from
//! the parsed items, so any totals or percentages elsewhere in the file are
//! ignored. Every row problem is collected and reported together; no partial
//! estimate is returned.

use csv::{ReaderBuilder, StringRecord, Trim};
use miette::Diagnostic;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

use crate::core::cascade::{CascadeError, FinancialSettings};
use crate::core::catalog::{Catalog, PriceItem};
use crate::core::category::{Category, Unit};
use crate::core::estimate::{CustomerInfo, Estimate, EstimateInput, SUNDRIES_ITEM_NAME};
use crate::core::line_item::LineItem;
use crate::interchange::columns::{
    is_optional_note, is_skipped, normalize_name, Column, INTRO_CATEGORY,
};

#[derive(Debug, Error, Diagnostic)]
pub enum CsvImportError {
    #[error("CSV file is empty")]
    #[diagnostic(
        code(ridge::csv::empty),
        help("Run `ridge template` for a sheet with the expected header row")
    )]
    Empty,

    #[error("CSV is missing required columns: {}", missing.join(", "))]
    #[diagnostic(
        code(ridge::csv::columns),
        help("The header needs an Item (or Description) column, Quantity, and Unit Price or Total")
    )]
    MissingColumns { missing: Vec<String> },

    #[error("CSV has a header row but no item rows")]
    #[diagnostic(code(ridge::csv::no_rows))]
    NoRows,

    #[error("{} problem(s) in CSV:\n  {}", errors.len(), errors.join("\n  "))]
    #[diagnostic(
        code(ridge::csv::rows),
        help("Fix the listed rows; nothing was imported")
    )]
    InvalidRows { errors: Vec<String> },

    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Cascade(#[from] CascadeError),
}

/// Parsed sheet contents before the cascade runs
#[derive(Debug, Clone, Default)]
pub struct ParsedSheet {
    pub input: EstimateInput,
    /// Names of rows dropped by the skip list
    pub skipped: Vec<String>,
}

fn parse_number(raw: &str, row: usize, column: Column) -> Result<Option<f64>, String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    if cleaned.is_empty() {
        return Ok(None);
    }
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(format!(
            "row {}: {} '{}' is not a number",
            row,
            column.header(),
            raw
        )),
    }
}

/// Lowercase, dash-separated identifier for an item name
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

fn unique_id(base: String, used: &mut HashSet<String>) -> String {
    let base = if base.is_empty() { "item".to_string() } else { base };
    let mut id = base.clone();
    let mut n = 2;
    while !used.insert(id.clone()) {
        id = format!("{}-{}", base, n);
        n += 1;
    }
    id
}

struct Row<'a> {
    record: &'a StringRecord,
    columns: &'a HashMap<Column, usize>,
}

impl Row<'_> {
    fn get(&self, column: Column) -> &str {
        self.columns
            .get(&column)
            .and_then(|&i| self.record.get(i))
            .unwrap_or("")
    }
}

fn normalize_category(raw: &str, row: usize) -> Category {
    if raw.is_empty() {
        return Category::Materials;
    }
    Category::from_alias(raw).unwrap_or_else(|| {
        tracing::warn!(row, category = raw, "unrecognized category, using materials");
        Category::Materials
    })
}

/// Parse sheet text into estimate input
pub fn parse_sheet(content: &str, catalog: Option<&Catalog>) -> Result<ParsedSheet, CsvImportError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvImportError::Empty);
    }

    let mut columns: HashMap<Column, usize> = HashMap::new();
    for (i, header) in headers.iter().enumerate() {
        match Column::from_header(header) {
            Some(column) => {
                columns.entry(column).or_insert(i);
            }
            None if !header.is_empty() => {
                tracing::debug!(header, "ignoring unrecognized column");
            }
            None => {}
        }
    }

    let mut missing = Vec::new();
    if !columns.contains_key(&Column::Item) && !columns.contains_key(&Column::Description) {
        missing.push("Item".to_string());
    }
    if !columns.contains_key(&Column::Quantity) {
        missing.push("Quantity".to_string());
    }
    if !columns.contains_key(&Column::UnitPrice) && !columns.contains_key(&Column::Total) {
        missing.push("Unit Price or Total".to_string());
    }
    if !missing.is_empty() {
        return Err(CsvImportError::MissingColumns { missing });
    }

    let records: Vec<StringRecord> = reader.records().collect::<Result<_, _>>()?;

    let mut sheet = ParsedSheet::default();
    let mut customer = CustomerInfo::default();
    let mut intro: Vec<String> = Vec::new();
    let mut errors: Vec<String> = Vec::new();
    let mut used_ids: HashSet<String> = HashSet::new();
    let mut data_rows = 0;

    for (index, record) in records.iter().enumerate() {
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        data_rows += 1;
        // Header is line 1
        let row_no = index + 2;
        let row = Row {
            record,
            columns: &columns,
        };

        if customer.name.is_empty() {
            customer.name = row.get(Column::Name).to_string();
        }
        if customer.address.is_empty() {
            customer.address = row.get(Column::Address).to_string();
        }

        let category_raw = row.get(Column::Category);
        if category_raw.eq_ignore_ascii_case(INTRO_CATEGORY) {
            let text = [Column::Description, Column::Item, Column::Notes]
                .iter()
                .map(|c| row.get(*c))
                .find(|t| !t.is_empty());
            if let Some(text) = text {
                intro.push(text.to_string());
            }
            continue;
        }

        let item_cell = row.get(Column::Item);
        let description_cell = row.get(Column::Description);
        let (raw_name, description) = if item_cell.is_empty() {
            (description_cell, None)
        } else {
            (item_cell, Some(description_cell).filter(|d| !d.is_empty()))
        };

        let quantity_cell = row.get(Column::Quantity);
        let price_cell = row.get(Column::UnitPrice);
        let total_cell = row.get(Column::Total);

        if raw_name.is_empty() {
            if quantity_cell.is_empty() && price_cell.is_empty() && total_cell.is_empty() {
                // Customer-only row
                continue;
            }
            errors.push(format!("row {}: missing item name", row_no));
            continue;
        }

        if is_skipped(raw_name) {
            tracing::info!(row = row_no, item = raw_name, "dropping superseded item");
            sheet.skipped.push(raw_name.to_string());
            continue;
        }
        let name = normalize_name(raw_name);
        if name.eq_ignore_ascii_case(SUNDRIES_ITEM_NAME) {
            tracing::warn!(row = row_no, "ignoring sundries row, it is recomputed");
            continue;
        }

        let quantity = parse_number(quantity_cell, row_no, Column::Quantity);
        let price = parse_number(price_cell, row_no, Column::UnitPrice);
        let total = parse_number(total_cell, row_no, Column::Total);
        let (quantity, price, total) = match (quantity, price, total) {
            (Ok(q), Ok(p), Ok(t)) => (q.unwrap_or(1.0), p, t),
            (q, p, t) => {
                errors.extend([q.err(), p.err(), t.err()].into_iter().flatten());
                continue;
            }
        };

        let (price, total) = match (price, total) {
            (Some(p), Some(t)) => (p, t),
            (Some(p), None) => (p, quantity * p),
            (None, Some(t)) if quantity != 0.0 => (t / quantity, t),
            (None, Some(_)) => {
                errors.push(format!(
                    "row {}: cannot derive a unit price for '{}' with zero quantity",
                    row_no, name
                ));
                continue;
            }
            (None, None) => {
                errors.push(format!(
                    "row {}: '{}' needs a unit price or a total",
                    row_no, name
                ));
                continue;
            }
        };

        let category = normalize_category(category_raw, row_no);
        let known = catalog.and_then(|c| c.find_by_name(name));

        let unit_cell = row.get(Column::Unit);
        let unit = if unit_cell.is_empty() {
            known.map(|k| k.unit).unwrap_or_default()
        } else {
            unit_cell.parse::<Unit>().unwrap_or_else(|e| {
                tracing::warn!(row = row_no, "{}, using each", e);
                Unit::Each
            })
        };

        let id = match known {
            Some(k) => k.id.clone(),
            None => unique_id(slugify(name), &mut used_ids),
        };

        let mut item = PriceItem::new(id, name, unit, price, category);
        if let Some(k) = known {
            item.coverage = k.coverage;
            item.coverage_unit = k.coverage_unit.clone();
            item.proposal_description = k.proposal_description.clone();
        }
        if let Some(d) = description {
            item.proposal_description = Some(d.to_string());
        }

        let line = LineItem::with_total(item, quantity, total);
        if is_optional_note(row.get(Column::Notes)) {
            sheet.input.optional_items.push(line.optional());
        } else {
            sheet.input.line_items.push(line);
        }
    }

    if data_rows == 0 {
        return Err(CsvImportError::NoRows);
    }
    if !errors.is_empty() {
        return Err(CsvImportError::InvalidRows { errors });
    }
    if sheet.input.line_items.is_empty() && sheet.input.optional_items.is_empty() {
        return Err(CsvImportError::NoRows);
    }

    sheet.input.customer_info = customer;
    if !intro.is_empty() {
        sheet.input.intro_letter = Some(intro.join("\n\n"));
    }
    Ok(sheet)
}

/// Import sheet text and run the cascade with `settings`
pub fn import_csv(
    content: &str,
    catalog: Option<&Catalog>,
    settings: &FinancialSettings,
) -> Result<Estimate, CsvImportError> {
    let sheet = parse_sheet(content, catalog)?;
    tracing::info!(
        items = sheet.input.line_items.len(),
        optional = sheet.input.optional_items.len(),
        skipped = sheet.skipped.len(),
        "imported CSV sheet"
    );
    Ok(Estimate::build(sheet.input, settings)?)
}

/// Import a sheet from disk
pub fn import_csv_file(
    path: &Path,
    catalog: Option<&Catalog>,
    settings: &FinancialSettings,
) -> Result<Estimate, CsvImportError> {
    let content = std::fs::read_to_string(path).map_err(|source| CsvImportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    import_csv(&content, catalog, settings)
}
