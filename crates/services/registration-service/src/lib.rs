//! Registration Service Library
//!
//! Staged user registration confirmed by an emailed verification code,
//! served over HTTP. Confirmed users go to Postgres when `DATABASE_URL` is
//! set and to an in-memory directory otherwise.

pub mod client;
pub mod clock;
pub mod code;
pub mod config;
pub mod extractors;
pub mod handlers;
pub mod infra;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info};

use crate::client::{InMemoryUserDirectory, LogNotifier, UserDirectory};
use crate::clock::SystemClock;
use crate::code::RandomCodeGenerator;
use crate::config::RegistrationServiceConfig;
use crate::infra::Database;
use crate::repository::UserStore;
use crate::routes::create_router;
use crate::service::{ExpirySweeper, Registrar};
use crate::state::AppState;
use crate::store::PendingRegistrationStore;

/// Run the registration service with configuration from the environment.
pub async fn run_embedded(
    host: &str,
    port: u16,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = RegistrationServiceConfig::from_env();
    config.service.host = host.to_string();
    config.service.port = port;
    config.registration.verbose_logging |= verbose;

    run_server_with_config(config).await
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(action: MigrateAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = RegistrationServiceConfig::from_env();
    let database = config
        .database
        .ok_or("DATABASE_URL must be set to run migrations")?;
    let db = Database::connect_without_migrations(&database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

/// Run the HTTP server and the expiry sweeper until ctrl-c.
pub async fn run_server_with_config(
    config: RegistrationServiceConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(config = ?config, "Starting registration service");

    let (users, database): (Arc<dyn UserDirectory>, Option<Database>) = match &config.database {
        Some(db_config) => {
            let db = Database::connect(db_config).await?;
            (Arc::new(UserStore::new(db.get_connection())), Some(db))
        }
        None => {
            info!("DATABASE_URL not set, keeping confirmed users in memory");
            (Arc::new(InMemoryUserDirectory::new()), None)
        }
    };

    let store = Arc::new(PendingRegistrationStore::new(Arc::new(SystemClock)));
    let notifier = Arc::new(LogNotifier::new(
        config.mail_from.clone(),
        config.registration.pending_expiry_minutes,
    ));

    let registrar = Arc::new(Registrar::new(
        store.clone(),
        users,
        notifier,
        Arc::new(RandomCodeGenerator),
        config.registration.clone(),
    ));

    let sweeper = ExpirySweeper::new(store, &config.registration).start();

    let app = create_router(AppState::new(registrar, database));

    let addr: SocketAddr = config.service.addr().parse()?;
    info!("Registration service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    sweeper.shutdown().await;
    served?;

    info!("Registration service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
