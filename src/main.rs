use clap::Parser;
use miette::Result;
use ridge::cli::{commands, Cli, Commands};

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    ridge::logging::init(cli.global.verbose, cli.global.quiet);
    let global = &cli.global;

    match cli.command {
        Commands::Quote(args) => commands::quote::run(args, global),
        Commands::Import(args) => commands::import::run(args, global),
        Commands::Export(args) => commands::export::run(args, global),
        Commands::Template(args) => commands::template::run(args),
        Commands::Validate(args) => commands::validate::run(args, global),
        Commands::Select(args) => commands::select::run(args, global),
        Commands::Kits(args) => commands::kits::run(args, global),
        Commands::Describe(args) => commands::describe::run(args, global),
        Commands::Proposal(args) => commands::proposal::run(args, global),
        Commands::Extract(cmd) => commands::extract::run(cmd, global),
        Commands::Catalog(cmd) => commands::catalog::run(cmd, global),
        Commands::Config(cmd) => commands::config::run(cmd, global),
        Commands::Completions(args) => commands::completions::run(args),
    }
}
