use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{
    api_client, ActionCommand, AnalyticsCommand, ConfigCommand, CreateCommand, DeleteCommand,
    LinesCommand, ListCommand, MaterialsCommand, OtkCommand, ProductionCommand, ShowCommand,
    UpdateCommand, UsersCommand,
};
use config::Config;

#[derive(Parser)]
#[command(name = "opsboard")]
#[command(version)]
#[command(about = "Command-line client for the manufacturing operations dashboard", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log requests and list view activity to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List a collection
    List(ListCommand),

    /// Show one record
    Show(ShowCommand),

    /// Create a record
    Create(CreateCommand),

    /// Update a record
    Update(UpdateCommand),

    /// Delete a record
    Delete(DeleteCommand),

    /// Run a named action on a record
    Action(ActionCommand),

    /// Production planning
    Production(ProductionCommand),

    /// Quality control (OTK)
    Otk(OtkCommand),

    /// Production line shifts
    Lines(LinesCommand),

    /// Material and chemistry stock
    Materials(MaterialsCommand),

    /// User administration
    Users(UsersCommand),

    /// Sales and stock analytics
    Analytics(AnalyticsCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Load configuration
    let config = Config::load(cli.config)?;

    let Some(command) = cli.command else {
        println!("Use --help to see available commands");
        return Ok(());
    };

    if let Commands::Config(cmd) = &command {
        return cmd.run(&config);
    }

    let client = api_client(&config);
    match command {
        Commands::List(cmd) => cmd.run(&client, &config).await?,
        Commands::Show(cmd) => cmd.run(&client).await?,
        Commands::Create(cmd) => cmd.run(&client).await?,
        Commands::Update(cmd) => cmd.run(&client).await?,
        Commands::Delete(cmd) => cmd.run(&client).await?,
        Commands::Action(cmd) => cmd.run(&client).await?,
        Commands::Production(cmd) => cmd.run(&client, &config).await?,
        Commands::Otk(cmd) => cmd.run(&client).await?,
        Commands::Lines(cmd) => cmd.run(&client).await?,
        Commands::Materials(cmd) => cmd.run(&client).await?,
        Commands::Users(cmd) => cmd.run(&client).await?,
        Commands::Analytics(cmd) => cmd.run(&client).await?,
        Commands::Config(_) => {}
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "opsboard=debug,opsboard_core=debug"
    } else {
        "opsboard=warn,opsboard_core=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
