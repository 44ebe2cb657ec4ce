//! Sessions table for refresh token management.
//!
//! Rows cascade away with their user.

use sea_orm::Schema;
use sea_orm_migration::prelude::*;

use crate::entities::session;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());
        manager
            .create_table(schema.create_table_from_entity(session::Entity))
            .await?;

        // Index for a user's sessions
        for index in schema.create_index_from_entity(session::Entity) {
            manager.create_index(index).await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(session::Entity).if_exists().to_owned())
            .await
    }
}
