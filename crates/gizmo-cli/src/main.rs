use clap::{Parser, Subcommand};
use gizmo_core::{Config, CoreError};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "gizmo-cli", version, about = "Gizmo token economy CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Token balance and ad offers
    Tokens {
        #[command(subcommand)]
        action: commands::tokens::TokensAction,
    },
    /// Feature toggles
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Simulate an active browsing session
    Browse(commands::browse::BrowseArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing(config_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(&config.logging.filter);

    let result = match cli.command {
        Commands::Tokens { action } => commands::tokens::run(action, &config).await,
        Commands::Settings { action } => commands::settings::run(action, &config).await,
        Commands::Browse(args) => commands::browse::run(args, &config).await,
        Commands::Config { action } => commands::config::run(action, config),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        let code = match e.downcast_ref::<CoreError>() {
            Some(CoreError::Spend(_)) => 2,
            _ => 1,
        };
        std::process::exit(code);
    }
}
