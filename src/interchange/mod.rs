//! CSV interchange - a flat sheet of line items in and out of an estimate

pub mod columns;
pub mod export;
pub mod import;

pub use columns::{template_header, Column};
pub use export::{export_csv, template_csv};
pub use import::{import_csv, import_csv_file, parse_sheet, CsvImportError, ParsedSheet};
