//! Bookkeeping of applied migrations.
//!
//! One row per applied migration lives in `schema_migrations`. A row exists
//! for a name exactly while that migration is applied; rows are inserted by
//! Run, deleted by Rollback and never updated.

use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, QueryOrder, Schema, Set, SqlErr};

use super::error::{MigrationError, MigrationResult};

/// `SeaORM` Entity for the `schema_migrations` table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "schema_migrations")]
pub struct Model {
    /// Assigned by the store; orders records within a batch.
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Migration name.
    #[sea_orm(unique)]
    pub name: String,
    /// Batch the migration was applied in.
    #[sea_orm(indexed)]
    pub batch: i32,
    /// When the migration was applied.
    pub created_at: DateTimeUtc,
}

/// Relations of the bookkeeping table (none).
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// A persisted migration record.
pub type MigrationRecord = Model;

/// Queries against `schema_migrations` on a given connection.
pub struct RecordStore<'c, C> {
    db: &'c C,
}

impl<'c, C> RecordStore<'c, C>
where
    C: ConnectionTrait,
{
    /// Binds the store to a connection or transaction.
    pub const fn new(db: &'c C) -> Self {
        Self { db }
    }

    /// Creates the table and its batch index if they are missing.
    pub async fn ensure_table(&self) -> MigrationResult<()> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);

        let mut table = schema.create_table_from_entity(Entity);
        table.if_not_exists();
        self.db
            .execute(backend.build(&table))
            .await
            .map_err(MigrationError::Bootstrap)?;

        for mut index in schema.create_index_from_entity(Entity) {
            index.if_not_exists();
            self.db
                .execute(backend.build(&index))
                .await
                .map_err(MigrationError::Bootstrap)?;
        }

        Ok(())
    }

    /// Highest batch number recorded, or 0 when nothing is applied.
    pub async fn last_batch(&self) -> MigrationResult<i32> {
        let latest = Entity::find()
            .order_by_desc(Column::Batch)
            .one(self.db)
            .await?;
        Ok(latest.map_or(0, |record| record.batch))
    }

    /// Records of one batch in application order.
    pub async fn records_for_batch(&self, batch: i32) -> MigrationResult<Vec<Model>> {
        Ok(Entity::find()
            .filter(Column::Batch.eq(batch))
            .order_by_asc(Column::Id)
            .all(self.db)
            .await?)
    }

    /// Every record in chronological order: by batch, then by id.
    pub async fn all_records(&self) -> MigrationResult<Vec<Model>> {
        Ok(Entity::find()
            .order_by_asc(Column::Batch)
            .order_by_asc(Column::Id)
            .all(self.db)
            .await?)
    }

    /// Returns `true` if a record exists for this name.
    pub async fn has_run(&self, name: &str) -> MigrationResult<bool> {
        let record = Entity::find()
            .filter(Column::Name.eq(name))
            .one(self.db)
            .await?;
        Ok(record.is_some())
    }

    /// Records a migration as applied in `batch`.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::AlreadyRecorded`] if the name already has a
    /// record, including when a concurrent writer wins the unique constraint.
    pub async fn insert(&self, name: &str, batch: i32) -> MigrationResult<Model> {
        if self.has_run(name).await? {
            return Err(MigrationError::AlreadyRecorded(name.to_string()));
        }

        let record = ActiveModel {
            name: Set(name.to_string()),
            batch: Set(batch),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        record.insert(self.db).await.map_err(|err| match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                MigrationError::AlreadyRecorded(name.to_string())
            }
            _ => MigrationError::Database(err),
        })
    }

    /// Removes the record for a name. Returns `false` if there was none.
    pub async fn delete_by_name(&self, name: &str) -> MigrationResult<bool> {
        let result = Entity::delete_many()
            .filter(Column::Name.eq(name))
            .exec(self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
