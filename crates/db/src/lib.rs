//! Schema migrations and `SeaORM` entities.
//!
//! This crate provides:
//! - The migration engine ([`migrator`]): registry, record table, manager and
//!   scaffold generator
//! - The application's own migrations ([`migration`])
//! - `SeaORM` entity definitions ([`entities`])

pub mod entities;
pub mod migration;
pub mod migrator;

pub use migrator::{
    ManagerOptions, MigrationError, MigrationManager, MigrationResult, MigrationTrait, Registry,
    SchemaManager,
};

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use strata_shared::DatabaseConfig;

/// Establishes a pooled connection sized by `config`.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10));
    Database::connect(options).await
}

/// Builds a manager over the application's own migrations.
///
/// # Errors
///
/// Returns [`MigrationError::Registry`] if the generated registry is invalid.
pub fn application_manager(
    db: DatabaseConnection,
    options: ManagerOptions,
) -> MigrationResult<MigrationManager> {
    let registry = migration::registry()?;
    Ok(MigrationManager::with_options(db, registry, options))
}
