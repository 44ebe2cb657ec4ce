//! Application migrations.
//!
//! Generated by `migrator create` from the `m*.rs` files in this directory;
//! edits are overwritten. Migrations register in file-name order.

mod m20260108_000001_create_users_table;
mod m20260108_000002_create_sessions_table;

use crate::migrator::{Registry, RegistryError};

/// Builds the registry of application migrations.
///
/// # Errors
///
/// Returns an error if two migrations share a name.
pub fn registry() -> Result<Registry, RegistryError> {
    Registry::builder()
        .register(m20260108_000001_create_users_table::Migration)
        .register(m20260108_000002_create_sessions_table::Migration)
        .build()
}
