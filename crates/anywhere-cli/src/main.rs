use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::process::ExitCode;

mod commands;
mod context;
mod output;

use commands::admin::{run_config, run_doctor};
use commands::browse::run_browse;
use commands::catalog::{run_categories, run_games, run_portals};
use commands::lookup::{run_classify, run_open, run_suggest};
use context::CliContext;

#[derive(Parser)]
#[command(name = "anywhere")]
#[command(about = "Terminal client for the AccessAnywhere proxy", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging to stderr.
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    /// Override `backend.base_url` for this invocation.
    #[arg(long = "backend-url", global = true)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive address bar with suggestions (default).
    Browse(DispatchArgs),
    /// Show how an input would be classified and routed.
    Classify(ClassifyArgs),
    /// Open an address or run a search through the proxy, then exit.
    Open(OpenArgs),
    /// Fetch search suggestions for a query.
    Suggest(SuggestArgs),
    /// List games from the catalog, or change it.
    Games(GamesArgs),
    /// List game categories with counts.
    Categories,
    /// Print the URLs of the pre-built portals.
    Portals,
    /// Check that the backend answers.
    Doctor,
    Config {
        #[command(subcommand)]
        command: ConfigCmd,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct DispatchArgs {
    /// Use the enhanced proxy for addresses.
    #[arg(long)]
    enhanced: bool,
    /// Let the backend route every input (`/smart-proxy`).
    #[arg(long, conflicts_with = "direct")]
    smart: bool,
    /// Route addresses to the direct proxy endpoints.
    #[arg(long)]
    direct: bool,
}

#[derive(Args, Debug, Clone)]
struct ClassifyArgs {
    text: String,
    #[command(flatten)]
    dispatch: DispatchArgs,
}

#[derive(Args, Debug, Clone)]
struct OpenArgs {
    input: String,
    #[command(flatten)]
    dispatch: DispatchArgs,
}

#[derive(Args, Debug, Clone)]
struct SuggestArgs {
    text: String,
}

#[derive(Args, Debug, Clone)]
#[command(args_conflicts_with_subcommands = true)]
struct GamesArgs {
    /// Only list games in this category.
    #[arg(long)]
    category: Option<String>,
    #[command(subcommand)]
    command: Option<GamesCmd>,
}

#[derive(Subcommand, Debug, Clone)]
enum GamesCmd {
    /// Replace the catalog with the backend's default games.
    Init,
    /// Add a game to the catalog.
    Add(AddGameArgs),
    /// Remove a game by id.
    Remove { id: String },
}

#[derive(Args, Debug, Clone)]
struct AddGameArgs {
    title: String,
    #[arg(long)]
    url: String,
    #[arg(long)]
    category: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long)]
    thumbnail: Option<String>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum ConfigCmd {
    /// Print the effective configuration.
    Show,
    /// Print where configuration layers are read from.
    Path,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;
    let ctx = CliContext::load(&cwd, cli.json, cli.verbose, cli.backend_url.as_deref())?;

    match cli.command.unwrap_or(Commands::Browse(DispatchArgs::default())) {
        Commands::Browse(args) => run_browse(&ctx, &args),
        Commands::Classify(args) => run_classify(&ctx, &args),
        Commands::Open(args) => run_open(&ctx, &args),
        Commands::Suggest(args) => run_suggest(&ctx, &args),
        Commands::Games(args) => run_games(&ctx, &args),
        Commands::Categories => run_categories(&ctx),
        Commands::Portals => run_portals(&ctx),
        Commands::Doctor => run_doctor(&ctx),
        Commands::Config { command } => run_config(&ctx, command),
    }
}
