//! Shared configuration for Strata.
//!
//! This crate provides the configuration consumed by the migration engine and
//! the `migrator` binary:
//! - Database connection settings
//! - Migration and scaffold paths
//! - Migration execution policy

pub mod config;

pub use config::{AppConfig, DatabaseConfig, MigrationConfig, OrphanPolicy};
