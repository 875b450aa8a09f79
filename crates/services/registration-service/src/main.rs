//! Registration Service - HTTP server for staged user signup.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use registration_service_lib::MigrateAction;

#[derive(Parser)]
#[command(name = "registration-service")]
#[command(about = "Email-verified user registration service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        #[arg(long, env = "REGISTRATION_SERVICE_HOST", default_value = "0.0.0.0")]
        host: String,
        #[arg(long, env = "REGISTRATION_SERVICE_PORT", default_value = "8080")]
        port: u16,
        /// Log sweep details and default to debug level
        #[arg(long, env = "VERBOSE_LOGGING")]
        verbose: bool,
    },
    /// Database migration commands
    Migrate {
        #[command(subcommand)]
        action: MigrateCommands,
    },
}

#[derive(Subcommand)]
enum MigrateCommands {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset database and run all migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Serve { verbose: true, .. });
    let default_filter = if verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Serve {
            host,
            port,
            verbose,
        } => {
            registration_service_lib::run_embedded(&host, port, verbose).await?;
        }
        Commands::Migrate { action } => {
            let migrate_action = match action {
                MigrateCommands::Up => MigrateAction::Up,
                MigrateCommands::Down => MigrateAction::Down,
                MigrateCommands::Status => MigrateAction::Status,
                MigrateCommands::Fresh => MigrateAction::Fresh,
            };
            registration_service_lib::run_migrations(migrate_action).await?;
        }
    }

    Ok(())
}
