//! Column names, aliases and the fixed value maps used by the CSV sheet

/// Canonical interchange columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Name,
    Address,
    Item,
    Description,
    Quantity,
    Unit,
    UnitPrice,
    Total,
    Category,
    Notes,
}

impl Column {
    /// Columns in template order
    pub const ALL: [Column; 10] = [
        Column::Name,
        Column::Address,
        Column::Item,
        Column::Description,
        Column::Quantity,
        Column::Unit,
        Column::UnitPrice,
        Column::Total,
        Column::Category,
        Column::Notes,
    ];

    /// Header text written on export
    pub fn header(&self) -> &'static str {
        match self {
            Column::Name => "Name",
            Column::Address => "Address",
            Column::Item => "Item",
            Column::Description => "Description",
            Column::Quantity => "Quantity",
            Column::Unit => "Unit",
            Column::UnitPrice => "Unit Price",
            Column::Total => "Total",
            Column::Category => "Category",
            Column::Notes => "Notes",
        }
    }

    /// Recognize a header cell, ignoring case, spacing and punctuation
    pub fn from_header(header: &str) -> Option<Self> {
        let key: String = header
            .trim()
            .trim_start_matches('\u{feff}')
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "name" | "building" | "customer" | "customername" | "client" | "clientname" => {
                Some(Column::Name)
            }
            "address" | "property" | "jobaddress" | "siteaddress" => Some(Column::Address),
            "item" | "itemname" | "product" | "material" => Some(Column::Item),
            "description" | "desc" | "itemdescription" => Some(Column::Description),
            "quantity" | "qty" | "count" => Some(Column::Quantity),
            "unit" | "units" | "uom" => Some(Column::Unit),
            "unitprice" | "price" | "unitcost" | "cost" | "rate" | "priceeach" => {
                Some(Column::UnitPrice)
            }
            "total" | "amount" | "linetotal" | "extended" | "extendedprice" => Some(Column::Total),
            "category" | "cat" | "type" | "section" => Some(Column::Category),
            "notes" | "note" | "optional" | "comments" | "memo" => Some(Column::Notes),
            _ => None,
        }
    }
}

/// Header row of the exported sheet
pub fn template_header() -> String {
    Column::ALL
        .iter()
        .map(|c| c.header())
        .collect::<Vec<_>>()
        .join(",")
}

/// Category value that marks a row as intro-letter text
pub const INTRO_CATEGORY: &str = "intro";

/// Note markers that route a row to the optional add-ons
pub const OPTIONAL_MARKERS: &[&str] = &["optional", "add-on", "addon", "alternate"];

/// Cell values of an `Optional` flag column that mark a row optional
pub const OPTIONAL_FLAGS: &[&str] = &["yes", "y", "x", "true", "1"];

/// Legacy item names and their current catalog names
pub const NAME_MAP: &[(&str, &str)] = &[
    ("Landfill Charge", "Debris Haulaway & Landfill"),
    ("Dump Fee", "Debris Haulaway & Landfill"),
    ("Ice and Water Shield", "Ice & Water Shield"),
    ("Grace Ice & Water", "Ice & Water Shield"),
];

/// Superseded items dropped on import
pub const SKIPPED_ITEMS: &[&str] = &["Rolloff", "Rolloff Dumpster", "Roll-Off Container"];

/// Current display name for an imported item name
pub fn normalize_name(name: &str) -> &str {
    let trimmed = name.trim();
    NAME_MAP
        .iter()
        .find(|(legacy, _)| legacy.eq_ignore_ascii_case(trimmed))
        .map(|(_, current)| *current)
        .unwrap_or(trimmed)
}

pub fn is_skipped(name: &str) -> bool {
    let trimmed = name.trim();
    SKIPPED_ITEMS.iter().any(|s| s.eq_ignore_ascii_case(trimmed))
}

pub fn is_optional_note(notes: &str) -> bool {
    let notes = notes.trim().to_lowercase();
    OPTIONAL_FLAGS.contains(&notes.as_str()) || OPTIONAL_MARKERS.iter().any(|m| notes.contains(m))
}
