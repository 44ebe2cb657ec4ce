//! Tera templates for scaffolded source files.

use serde::Serialize;
use tera::{Context, Tera};

use crate::migrator::error::ScaffoldError;

use super::manifest::EntityEntry;

const MIGRATION_STUB: &str = r#"//! {{ label }} migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, _manager: &SchemaManager) -> Result<(), DbErr> {
        Ok(())
    }

    async fn down(&self, _manager: &SchemaManager) -> Result<(), DbErr> {
        Ok(())
    }
}
"#;

const CREATE_TABLE_MIGRATION: &str = r#"//! Creates the `{{ table }}` table from the `{{ entity }}` entity.

use sea_orm::Schema;
use sea_orm_migration::prelude::*;

use crate::entities::{{ module }};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());
        manager
            .create_table(schema.create_table_from_entity({{ module }}::Entity))
            .await?;
        for index in schema.create_index_from_entity({{ module }}::Entity) {
            manager.create_index(index).await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table({{ module }}::Entity).if_exists().to_owned())
            .await
    }
}
"#;

const ENTITY: &str = r#"//! `SeaORM` Entity for {{ table }} table.

use sea_orm::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "{{ table }}")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if insert && self.created_at.is_not_set() {
            self.created_at = Set(chrono::Utc::now());
        }
        Ok(self)
    }
}
"#;

const MIGRATIONS_MOD: &str = r#"//! Application migrations.
//!
//! Generated by `migrator create` from the `m*.rs` files in this directory;
//! edits are overwritten. Migrations register in file-name order.

{% for module in modules -%}
mod {{ module }};
{% endfor %}
use crate::migrator::{Registry, RegistryError};

/// Builds the registry of application migrations.
///
/// # Errors
///
/// Returns an error if two migrations share a name.
pub fn registry() -> Result<Registry, RegistryError> {
    Registry::builder()
{%- for module in modules %}
        .register({{ module }}::Migration)
{%- endfor %}
        .build()
}
"#;

const ENTITIES_MOD: &str = r#"//! `SeaORM` entities.
//!
//! Generated by `migrator create` from `entities.toml`; edits are overwritten.

pub mod prelude;
{% for entity in entities %}
pub mod {{ entity.module }};
{%- endfor %}
"#;

const ENTITIES_PRELUDE: &str = r#"//! Re-exports of every entity type.
//!
//! Generated by `migrator create` from `entities.toml`; edits are overwritten.
{% for entity in entities %}
pub use super::{{ entity.module }}::Entity as {{ entity.name }};
{%- endfor %}
"#;

/// Values for the create-table migration and entity templates.
#[derive(Debug, Serialize)]
pub struct TableContext<'a> {
    /// Table name.
    pub table: &'a str,
    /// Entity module name.
    pub module: &'a str,
    /// Entity type name.
    pub entity: &'a str,
}

/// Renders scaffold templates.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Registers the built-in templates.
    pub fn new() -> Result<Self, ScaffoldError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("migration_stub.rs", MIGRATION_STUB),
            ("create_table_migration.rs", CREATE_TABLE_MIGRATION),
            ("entity.rs", ENTITY),
            ("migrations_mod.rs", MIGRATIONS_MOD),
            ("entities_mod.rs", ENTITIES_MOD),
            ("entities_prelude.rs", ENTITIES_PRELUDE),
        ])?;
        Ok(Self { tera })
    }

    /// Migration with empty bodies. Its name comes from the file it is
    /// written to.
    pub fn migration_stub(&self, label: &str) -> Result<String, ScaffoldError> {
        let mut context = Context::new();
        context.insert("label", label);
        self.render("migration_stub.rs", &context)
    }

    /// Migration that creates and drops an entity's table.
    pub fn create_table_migration(&self, table: &TableContext<'_>) -> Result<String, ScaffoldError> {
        self.render("create_table_migration.rs", &Context::from_serialize(table)?)
    }

    /// Entity module with an id, a creation timestamp and its insert hook.
    pub fn entity(&self, table: &TableContext<'_>) -> Result<String, ScaffoldError> {
        self.render("entity.rs", &Context::from_serialize(table)?)
    }

    /// The migrations `mod.rs`, registering `modules` in the given order.
    pub fn migrations_mod(&self, modules: &[String]) -> Result<String, ScaffoldError> {
        let mut context = Context::new();
        context.insert("modules", modules);
        self.render("migrations_mod.rs", &context)
    }

    /// The entities `mod.rs`.
    pub fn entities_mod(&self, entities: &[EntityEntry]) -> Result<String, ScaffoldError> {
        let mut context = Context::new();
        context.insert("entities", entities);
        self.render("entities_mod.rs", &context)
    }

    /// The entities `prelude.rs`.
    pub fn entities_prelude(&self, entities: &[EntityEntry]) -> Result<String, ScaffoldError> {
        let mut context = Context::new();
        context.insert("entities", entities);
        self.render("entities_prelude.rs", &context)
    }

    fn render(&self, template: &str, context: &Context) -> Result<String, ScaffoldError> {
        Ok(self.tera.render(template, context)?)
    }
}
