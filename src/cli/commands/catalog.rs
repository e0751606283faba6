//! `ridge catalog` command - inspect the catalog and manage stored items

use clap::Subcommand;
use console::style;
use miette::{miette, Result};
use std::path::PathBuf;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Style};
use tabled::{Table, Tabled};

use crate::cli::helpers::{
    block_on, load_catalog, load_config, store_dir, truncate_str, user_items,
};
use crate::cli::output::{effective_format, print_csv, print_structured};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::catalog::{Catalog, PriceItem};
use crate::core::category::{Category, Unit};
use crate::core::line_item::format_money;
use crate::core::store::{CatalogStore, FileCatalogStore};

#[derive(Subcommand, Debug)]
pub enum CatalogCommands {
    /// List catalog items
    List(ListArgs),

    /// Add or replace an item in the user's catalog
    Add(AddArgs),

    /// Remove an item from the user's catalog
    Rm(RmArgs),

    /// Load items from a catalog YAML file into the user's catalog
    Import(ImportArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only this category (materials, labor, vendor, ...)
    #[arg(long, short = 'c', value_parser = parse_category)]
    pub category: Option<Category>,

    /// Only items whose name contains this text
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Only the user's stored items
    #[arg(long)]
    pub stored: bool,

    /// Show count only
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Item id (lowercase, dash-separated)
    pub id: String,

    #[arg(long, short = 'n')]
    pub name: String,

    #[arg(long, short = 'p')]
    pub price: f64,

    #[arg(long, short = 'u', default_value = "each")]
    pub unit: Unit,

    #[arg(long, short = 'c', default_value = "materials", value_parser = parse_category)]
    pub category: Category,

    /// Area or length one unit covers
    #[arg(long, requires = "coverage_unit")]
    pub coverage: Option<f64>,

    /// Unit of --coverage (square, linear-foot)
    #[arg(long)]
    pub coverage_unit: Option<String>,

    /// Client-facing description
    #[arg(long, short = 'd')]
    pub description: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct RmArgs {
    /// Item id
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// Catalog YAML file (`items:` list)
    pub file: PathBuf,
}

fn parse_category(s: &str) -> Result<Category, String> {
    Category::from_alias(s).ok_or_else(|| {
        format!(
            "Invalid category: {}. Use materials, consumables, labor, equipment, accessories, or vendor-quote",
            s
        )
    })
}

fn require_user(global: &GlobalOpts) -> Result<&str> {
    global
        .user
        .as_deref()
        .ok_or_else(|| miette!("This command needs a user. Pass --user <name> or set RIDGE_USER"))
}

/// Run the catalog command
pub fn run(cmd: CatalogCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CatalogCommands::List(args) => run_list(args, global),
        CatalogCommands::Add(args) => run_add(args, global),
        CatalogCommands::Rm(args) => run_rm(args, global),
        CatalogCommands::Import(args) => run_import(args, global),
    }
}

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Price")]
    price: String,
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let items: Vec<PriceItem> = if args.stored {
        user_items(&config, require_user(global)?)?
    } else {
        load_catalog(global, &config)?.items().to_vec()
    };

    let items: Vec<PriceItem> = items
        .into_iter()
        .filter(|item| args.category.map_or(true, |c| item.category == c))
        .filter(|item| {
            args.search
                .as_deref()
                .map_or(true, |needle| item.name_contains(needle))
        })
        .collect();

    if args.count {
        println!("{}", items.len());
        return Ok(());
    }
    if items.is_empty() {
        println!("No matching catalog items.");
        return Ok(());
    }

    match effective_format(global.format) {
        format @ (OutputFormat::Json | OutputFormat::Yaml) => print_structured(&items, format)?,
        OutputFormat::Csv => {
            print_csv(
                &["id", "name", "category", "unit", "price"],
                items.iter().map(|item| {
                    [
                        item.id.clone(),
                        item.name.clone(),
                        item.category.to_string(),
                        item.unit.to_string(),
                        item.price.to_string(),
                    ]
                }),
            )?;
        }
        _ => {
            let rows: Vec<ItemRow> = items
                .iter()
                .map(|item| ItemRow {
                    id: item.id.clone(),
                    name: truncate_str(&item.name, 40),
                    category: item.category.label().to_string(),
                    unit: item.unit.to_string(),
                    price: format_money(item.price),
                })
                .collect();
            println!(
                "{}",
                Table::new(rows)
                    .with(Style::sharp())
                    .modify(Columns::last(), Alignment::right())
            );
            println!("{} items", style(items.len()).cyan());
        }
    }
    Ok(())
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let user = require_user(global)?;
    let config = load_config(global)?;

    let mut item = PriceItem::new(args.id, args.name, args.unit, args.price, args.category);
    if let (Some(coverage), Some(unit)) = (args.coverage, args.coverage_unit) {
        item = item.with_coverage(coverage, unit);
    }
    item.proposal_description = args.description;
    // Same checks as a catalog file
    Catalog::new(vec![item.clone()]).map_err(|e| miette!("{}", e))?;

    let store = FileCatalogStore::new(store_dir(&config)?);
    let id = item.id.clone();
    block_on(store.upsert_item(user, item))?.map_err(|e| miette!("{}", e))?;
    println!("{} Saved {} for {}", style("✓").green(), style(id).cyan(), user);
    Ok(())
}

fn run_rm(args: RmArgs, global: &GlobalOpts) -> Result<()> {
    let user = require_user(global)?;
    let config = load_config(global)?;
    let store = FileCatalogStore::new(store_dir(&config)?);
    block_on(store.delete_item(user, &args.id))?.map_err(|e| miette!("{}", e))?;
    println!("{} Removed {} for {}", style("✓").green(), style(&args.id).cyan(), user);
    Ok(())
}

fn run_import(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let user = require_user(global)?;
    let config = load_config(global)?;
    let catalog = Catalog::load(&args.file).map_err(|e| miette!("{}", e))?;
    let total = catalog.len();

    let store = FileCatalogStore::new(store_dir(&config)?);
    let added = block_on(store.bulk_upsert(user, catalog.items().to_vec()))?
        .map_err(|e| miette!("{}", e))?;
    println!(
        "{} Imported {} items for {} ({} new, {} updated)",
        style("✓").green(),
        total,
        user,
        added,
        total - added
    );
    Ok(())
}
