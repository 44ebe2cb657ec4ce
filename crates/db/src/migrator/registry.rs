//! Ordered collection of known migrations.

use std::collections::HashSet;
use std::fmt;

use sea_orm_migration::{MigrationName, MigrationTrait};

use super::error::RegistryError;

/// Migrations known to this process, in registration order.
///
/// The order is the execution order for Run and its reverse for Rollback.
/// There is no dependency graph: later migrations may rely on the schema left
/// by earlier ones.
#[derive(Default)]
pub struct Registry {
    migrations: Vec<Box<dyn MigrationTrait>>,
}

impl Registry {
    /// Starts an empty builder.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Number of registered migrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Iterates in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &(dyn MigrationTrait + 'static)> {
        self.migrations.iter().map(AsRef::as_ref)
    }

    /// Looks a migration up by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&(dyn MigrationTrait + 'static)> {
        self.iter().find(|migration| migration.name() == name)
    }

    /// Returns `true` if a migration with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.iter().map(MigrationName::name).collect()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("migrations", &self.names())
            .finish()
    }
}

/// Builds a [`Registry`] one migration at a time.
#[derive(Default)]
pub struct RegistryBuilder {
    migrations: Vec<Box<dyn MigrationTrait>>,
}

impl RegistryBuilder {
    /// Appends a migration.
    #[must_use]
    pub fn register<M>(self, migration: M) -> Self
    where
        M: MigrationTrait + 'static,
    {
        self.register_boxed(Box::new(migration))
    }

    /// Appends an already boxed migration.
    #[must_use]
    pub fn register_boxed(mut self, migration: Box<dyn MigrationTrait>) -> Self {
        self.migrations.push(migration);
        self
    }

    /// Validates names and freezes the order.
    ///
    /// # Errors
    ///
    /// Returns an error if a name is empty or registered twice.
    pub fn build(self) -> Result<Registry, RegistryError> {
        let mut seen = HashSet::new();
        let mut previous: Option<&str> = None;

        for migration in &self.migrations {
            let name = migration.name();
            if name.is_empty() {
                return Err(RegistryError::EmptyName);
            }
            if !seen.insert(name) {
                return Err(RegistryError::DuplicateName(name.to_string()));
            }
            if let Some(prev) = previous
                && name < prev
            {
                tracing::warn!(
                    migration = %name,
                    previous = %prev,
                    "migration registered out of name order; registration order is kept"
                );
            }
            previous = Some(name);
        }

        Ok(Registry {
            migrations: self.migrations,
        })
    }
}
