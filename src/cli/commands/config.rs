//! `ridge config` command - show or change configuration

use clap::Subcommand;
use console::style;
use miette::{miette, Result};
use std::path::PathBuf;

use crate::cli::helpers::load_config;
use crate::cli::output::print_structured;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::config::{Config, PROJECT_CONFIG_FILE};

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Set a value, e.g. `financial.margin_percent 38`
    Set(SetArgs),

    /// Print the config file locations
    Path,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Dotted key
    pub key: String,

    pub value: String,

    /// Write ./ridge.yaml instead of the user config file
    #[arg(long)]
    pub project: bool,
}

pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let config = load_config(global)?;
            let format = match global.format {
                OutputFormat::Json => OutputFormat::Json,
                _ => OutputFormat::Yaml,
            };
            print_structured(&config, format)
        }
        ConfigCommands::Set(args) => run_set(args, global),
        ConfigCommands::Path => {
            match Config::user_config_path() {
                Some(path) => println!("user:    {}", path.display()),
                None => println!("user:    {}", style("(unavailable)").dim()),
            }
            let project = global
                .config
                .clone()
                .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
            println!("project: {}", project.display());
            Ok(())
        }
    }
}

fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    let path = if args.project {
        global
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE))
    } else {
        Config::user_config_path()
            .ok_or_else(|| miette!("Could not determine a user configuration directory"))?
    };

    Config::set_in_file(&path, &args.key, &args.value).map_err(|e| miette!("{}", e))?;
    println!(
        "{} Set {} = {} in {}",
        style("✓").green(),
        style(&args.key).cyan(),
        args.value,
        path.display()
    );
    Ok(())
}
