//! Migration engine error types.

use std::fmt;
use std::path::PathBuf;

use sea_orm::DbErr;
use thiserror::Error;

/// Result type alias using `MigrationError`.
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Which half of a migration was executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Applying the change.
    Up,
    /// Reversing the change.
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => f.write_str("up"),
            Self::Down => f.write_str("down"),
        }
    }
}

/// Errors raised by the migration manager and record store.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The bookkeeping table could not be created.
    #[error("failed to ensure migration table: {0}")]
    Bootstrap(#[source] DbErr),

    /// A migration body failed.
    #[error("migration {name} failed while running {direction}: {source}")]
    Execution {
        /// Name of the failing migration.
        name: String,
        /// Which half was running.
        direction: Direction,
        /// Error reported by the store.
        #[source]
        source: DbErr,
    },

    /// An explicit rollback target has no records.
    #[error("no migrations found for batch {0}")]
    BatchNotFound(i32),

    /// Nothing has been applied.
    #[error("no migrations to rollback")]
    NothingToRollback,

    /// A record for this name already exists.
    #[error("migration {0} has already been recorded")]
    AlreadyRecorded(String),

    /// A record has no registered migration and the policy forbids cleanup.
    #[error("no registered migration matches recorded migration {0}")]
    OrphanedRecord(String),

    /// The registry could not be built.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Any other store failure.
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

/// Errors raised while building a registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Two migrations share a name.
    #[error("migration {0} is registered more than once")]
    DuplicateName(String),

    /// A migration reported an empty name.
    #[error("migration names must not be empty")]
    EmptyName,
}

/// Errors raised by the scaffold generator.
#[derive(Debug, Error)]
pub enum ScaffoldError {
    /// The label cannot be turned into a module name.
    #[error("invalid migration name {0:?}: use letters, digits, spaces, '-' or '_'")]
    InvalidName(String),

    /// The target file is already present.
    #[error("{} already exists", .0.display())]
    AlreadyExists(PathBuf),

    /// A directory or file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        /// Path being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A template failed to render.
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    /// The entity manifest could not be read or written.
    #[error("entity manifest error: {0}")]
    Manifest(String),
}

impl ScaffoldError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            MigrationError::BatchNotFound(5).to_string(),
            "no migrations found for batch 5"
        );
        assert_eq!(
            MigrationError::NothingToRollback.to_string(),
            "no migrations to rollback"
        );
        assert_eq!(
            MigrationError::Execution {
                name: "m20260101_000000_init".into(),
                direction: Direction::Down,
                source: DbErr::Custom("boom".into()),
            }
            .to_string(),
            "migration m20260101_000000_init failed while running down: Custom Error: boom"
        );
        assert_eq!(
            MigrationError::from(RegistryError::DuplicateName("a".into())).to_string(),
            "migration a is registered more than once"
        );
    }
}
