//! Migration engine.
//!
//! Migrations are `sea-orm-migration` definitions ([`MigrationTrait`]) that
//! receive its [`SchemaManager`]. On top of that this module keeps its own
//! bookkeeping so applied migrations are grouped into batches:
//!
//! - [`Registry`]: the ordered set of migrations known to the process
//! - [`RecordStore`]: bookkeeping in the `schema_migrations` table
//! - [`MigrationManager`]: run, rollback, rollback-all and status
//! - [`Scaffolder`]: generates new migration and entity files
//!
//! A single process is assumed to operate on a database at a time. There is
//! no locking; the unique constraint on the record name is the only guard
//! against two concurrent runs.

pub mod error;
pub mod manager;
pub mod record;
pub mod registry;
pub mod scaffold;

pub use error::{Direction, MigrationError, MigrationResult, RegistryError, ScaffoldError};
pub use manager::{ManagerOptions, MigrationManager, RollbackReport, RunReport, StatusReport};
pub use record::{MigrationRecord, RecordStore};
pub use registry::{Registry, RegistryBuilder};
pub use scaffold::{ScaffoldOutcome, ScaffoldPaths, Scaffolder};
pub use sea_orm_migration::{MigrationName, MigrationTrait, SchemaManager};
