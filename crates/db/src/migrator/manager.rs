//! Run, rollback and status orchestration.
//!
//! Every operation first makes sure the bookkeeping table exists, then walks
//! migrations strictly one at a time. Outside strict mode each step commits on
//! its own: a failure stops the walk but keeps whatever already succeeded, and
//! the operator fixes the failing migration and runs again.

use std::collections::HashSet;

use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use sea_orm_migration::{MigrationName, SchemaManager};
use strata_shared::{MigrationConfig, OrphanPolicy};
use tracing::{debug, info, warn};

use super::error::{Direction, MigrationError, MigrationResult};
use super::record::{MigrationRecord, RecordStore};
use super::registry::Registry;

/// Execution policy for a manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagerOptions {
    /// Wrap each Run or Rollback call in a single transaction.
    pub strict: bool,
    /// Handling of records with no registered migration.
    pub orphan_policy: OrphanPolicy,
}

impl From<&MigrationConfig> for ManagerOptions {
    fn from(config: &MigrationConfig) -> Self {
        Self {
            strict: config.strict,
            orphan_policy: config.orphan_policy,
        }
    }
}

/// Outcome of [`MigrationManager::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Batch number the applied migrations were recorded under.
    pub batch: i32,
    /// Migrations applied by this call, in order.
    pub applied: Vec<String>,
    /// Migrations skipped because they were already applied.
    pub skipped: usize,
}

impl RunReport {
    /// Number of migrations applied.
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }
}

/// Outcome of [`MigrationManager::rollback`] and
/// [`MigrationManager::rollback_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackReport {
    /// Batches touched, newest first.
    pub batches: Vec<i32>,
    /// Migrations whose `down` ran, in the order they ran.
    pub rolled_back: Vec<String>,
    /// Records deleted without a `down` because nothing registered matched.
    pub orphaned: Vec<String>,
}

impl RollbackReport {
    /// Number of migrations rolled back.
    pub fn rolled_back_count(&self) -> usize {
        self.rolled_back.len()
    }
}

/// Outcome of [`MigrationManager::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Applied migrations in chronological order.
    pub applied: Vec<MigrationRecord>,
    /// Number of registered migrations.
    pub registered: usize,
    /// Registered migrations without a record, in registration order.
    pub pending: Vec<String>,
    /// Records without a registered migration.
    pub orphaned: Vec<String>,
}

impl StatusReport {
    /// Number of applied migrations.
    pub fn total(&self) -> usize {
        self.applied.len()
    }

    /// Registry size minus record count, floored at zero.
    ///
    /// Matches `pending.len()` whenever there are no orphaned records.
    pub fn pending_count(&self) -> usize {
        self.registered.saturating_sub(self.applied.len())
    }
}

/// Applies and reverts registered migrations against one database.
pub struct MigrationManager {
    db: DatabaseConnection,
    registry: Registry,
    options: ManagerOptions,
}

impl MigrationManager {
    /// Creates a manager with default options.
    #[must_use]
    pub fn new(db: DatabaseConnection, registry: Registry) -> Self {
        Self::with_options(db, registry, ManagerOptions::default())
    }

    /// Creates a manager with explicit options.
    #[must_use]
    pub fn with_options(db: DatabaseConnection, registry: Registry, options: ManagerOptions) -> Self {
        Self {
            db,
            registry,
            options,
        }
    }

    /// Returns the registry this manager works from.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Applies every registered migration that has no record, as one new batch.
    ///
    /// # Errors
    ///
    /// Fails if the bookkeeping table cannot be ensured or a migration's `up`
    /// fails. Outside strict mode, migrations applied before the failure stay
    /// applied and recorded.
    pub async fn run(&self) -> MigrationResult<RunReport> {
        if self.options.strict {
            let txn = self.db.begin().await?;
            let report = self.apply_pending(&SchemaManager::new(&txn)).await?;
            txn.commit().await?;
            Ok(report)
        } else {
            self.apply_pending(&SchemaManager::new(&self.db)).await
        }
    }

    /// Reverts one batch. `None` or a non-positive batch means the latest.
    ///
    /// # Errors
    ///
    /// Fails with [`MigrationError::BatchNotFound`] for an explicit batch
    /// without records, [`MigrationError::NothingToRollback`] when nothing is
    /// applied, or when a `down` fails.
    pub async fn rollback(&self, batch: Option<i32>) -> MigrationResult<RollbackReport> {
        if self.options.strict {
            let txn = self.db.begin().await?;
            let report = self.revert_batch(&SchemaManager::new(&txn), batch).await?;
            txn.commit().await?;
            Ok(report)
        } else {
            self.revert_batch(&SchemaManager::new(&self.db), batch).await
        }
    }

    /// Reverts every applied migration, newest batch first.
    ///
    /// # Errors
    ///
    /// Fails with [`MigrationError::NothingToRollback`] when nothing is
    /// applied, or when a `down` fails.
    pub async fn rollback_all(&self) -> MigrationResult<RollbackReport> {
        if self.options.strict {
            let txn = self.db.begin().await?;
            let report = self.revert_everything(&SchemaManager::new(&txn)).await?;
            txn.commit().await?;
            Ok(report)
        } else {
            self.revert_everything(&SchemaManager::new(&self.db)).await
        }
    }

    /// Reports applied, pending and orphaned migrations without changing any.
    ///
    /// # Errors
    ///
    /// Fails only if the bookkeeping table cannot be ensured or read.
    pub async fn status(&self) -> MigrationResult<StatusReport> {
        let records = RecordStore::new(&self.db);
        records.ensure_table().await?;

        let applied = records.all_records().await?;
        let applied_names: HashSet<&str> = applied.iter().map(|r| r.name.as_str()).collect();

        let pending = self
            .registry
            .names()
            .into_iter()
            .filter(|name| !applied_names.contains(name))
            .map(str::to_string)
            .collect();
        let orphaned = applied
            .iter()
            .filter(|record| !self.registry.contains(&record.name))
            .map(|record| record.name.clone())
            .collect();

        Ok(StatusReport {
            applied,
            registered: self.registry.len(),
            pending,
            orphaned,
        })
    }

    async fn apply_pending(&self, schema: &SchemaManager<'_>) -> MigrationResult<RunReport> {
        let records = RecordStore::new(schema.get_connection());
        records.ensure_table().await?;

        let batch = records.last_batch().await? + 1;
        let mut applied = Vec::new();
        let mut skipped = 0;

        for migration in self.registry.iter() {
            let name = migration.name();
            if records.has_run(name).await? {
                debug!(migration = %name, "already applied, skipping");
                skipped += 1;
                continue;
            }

            info!(migration = %name, batch, "applying migration");
            migration
                .up(schema)
                .await
                .map_err(|source| MigrationError::Execution {
                    name: name.to_string(),
                    direction: Direction::Up,
                    source,
                })?;
            records.insert(name, batch).await?;
            applied.push(name.to_string());
        }

        if applied.is_empty() {
            info!("nothing to migrate");
        } else {
            info!(batch, count = applied.len(), "migrations applied");
        }

        Ok(RunReport {
            batch,
            applied,
            skipped,
        })
    }

    async fn revert_batch(
        &self,
        schema: &SchemaManager<'_>,
        batch: Option<i32>,
    ) -> MigrationResult<RollbackReport> {
        let records = RecordStore::new(schema.get_connection());
        records.ensure_table().await?;

        let target = match batch.filter(|b| *b > 0) {
            Some(explicit) => explicit,
            None => match records.last_batch().await? {
                0 => return Err(MigrationError::NothingToRollback),
                latest => latest,
            },
        };

        let mut batch_records = records.records_for_batch(target).await?;
        if batch_records.is_empty() {
            return Err(MigrationError::BatchNotFound(target));
        }
        batch_records.sort_by(|a, b| b.id.cmp(&a.id));

        info!(batch = target, count = batch_records.len(), "rolling back batch");
        self.revert_records(schema, &records, batch_records).await
    }

    async fn revert_everything(&self, schema: &SchemaManager<'_>) -> MigrationResult<RollbackReport> {
        let records = RecordStore::new(schema.get_connection());
        records.ensure_table().await?;

        let mut all = records.all_records().await?;
        if all.is_empty() {
            return Err(MigrationError::NothingToRollback);
        }
        sort_newest_first(&mut all);

        info!(count = all.len(), "rolling back all migrations");
        self.revert_records(schema, &records, all).await
    }

    /// Runs `down` for each record in the given order, deleting its record.
    async fn revert_records<C>(
        &self,
        schema: &SchemaManager<'_>,
        records: &RecordStore<'_, C>,
        ordered: Vec<MigrationRecord>,
    ) -> MigrationResult<RollbackReport>
    where
        C: ConnectionTrait,
    {
        let mut report = RollbackReport::default();

        for record in ordered {
            if report.batches.last() != Some(&record.batch) {
                report.batches.push(record.batch);
            }

            let Some(migration) = self.registry.find(&record.name) else {
                if self.options.orphan_policy == OrphanPolicy::Fail {
                    return Err(MigrationError::OrphanedRecord(record.name));
                }
                warn!(
                    migration = %record.name,
                    batch = record.batch,
                    "no registered migration matches this record; deleting the record without running down"
                );
                records.delete_by_name(&record.name).await?;
                report.orphaned.push(record.name);
                continue;
            };

            info!(migration = %record.name, batch = record.batch, "rolling back migration");
            migration
                .down(schema)
                .await
                .map_err(|source| MigrationError::Execution {
                    name: record.name.clone(),
                    direction: Direction::Down,
                    source,
                })?;
            records.delete_by_name(&record.name).await?;
            report.rolled_back.push(record.name);
        }

        Ok(report)
    }
}

/// Orders records for a full rollback: highest batch first, and within a
/// batch the most recently applied first.
pub(crate) fn sort_newest_first(records: &mut [MigrationRecord]) {
    records.sort_by(|a, b| b.batch.cmp(&a.batch).then_with(|| b.id.cmp(&a.id)));
}
