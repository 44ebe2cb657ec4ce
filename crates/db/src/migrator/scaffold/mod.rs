//! Scaffold generator behind `migrator create`.
//!
//! Writes a new migration module and, for `create_<table>_table` names, a
//! matching entity module. The new migration is wired in by regenerating the
//! migrations `mod.rs` from a sorted scan of the directory; it takes effect
//! the next time the binary is built and started, never in the current
//! process.

pub mod manifest;
pub mod naming;
pub mod templates;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use strata_shared::MigrationConfig;
use tracing::{info, warn};

use self::manifest::{EntityEntry, EntityManifest};
use self::templates::{TableContext, TemplateEngine};
use super::error::ScaffoldError;

/// Where scaffolded files go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaffoldPaths {
    /// Directory of migration modules.
    pub migrations_dir: PathBuf,
    /// Directory of entity modules.
    pub entities_dir: PathBuf,
    /// Entity manifest file.
    pub entity_manifest: PathBuf,
}

impl From<&MigrationConfig> for ScaffoldPaths {
    fn from(config: &MigrationConfig) -> Self {
        Self {
            migrations_dir: config.migrations_dir.clone(),
            entities_dir: config.entities_dir.clone(),
            entity_manifest: config.entity_manifest.clone(),
        }
    }
}

/// Files produced by one `create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaffoldOutcome {
    /// Name of the new migration.
    pub name: String,
    /// Path of the new migration module.
    pub migration_file: PathBuf,
    /// Path of the new entity module, if one was generated.
    pub entity_file: Option<PathBuf>,
    /// Non-fatal problems while updating the entity manifest.
    pub warnings: Vec<String>,
}

/// Generates migration and entity source files.
pub struct Scaffolder {
    paths: ScaffoldPaths,
    engine: TemplateEngine,
}

impl Scaffolder {
    /// Creates a scaffolder writing under `paths`.
    pub fn new(paths: ScaffoldPaths) -> Result<Self, ScaffoldError> {
        Ok(Self {
            paths,
            engine: TemplateEngine::new()?,
        })
    }

    /// Scaffolds a migration stamped with the current time.
    ///
    /// # Errors
    ///
    /// Fails on an unusable label, an existing target file, or a failed
    /// directory or file write.
    pub fn create(&self, label: &str) -> Result<ScaffoldOutcome, ScaffoldError> {
        self.create_at(label, Utc::now())
    }

    /// Scaffolds a migration stamped with `at`.
    ///
    /// Every file is rendered before anything is written. If a required write
    /// fails, files created by this call are removed again.
    ///
    /// # Errors
    ///
    /// See [`Scaffolder::create`].
    pub fn create_at(&self, label: &str, at: DateTime<Utc>) -> Result<ScaffoldOutcome, ScaffoldError> {
        let slug = naming::slugify(label)?;
        let name = naming::migration_name(&slug, at);

        let migrations_dir = &self.paths.migrations_dir;
        let migration_file = migrations_dir.join(format!("{name}.rs"));
        if migration_file.exists() {
            return Err(ScaffoldError::AlreadyExists(migration_file));
        }

        let mut warnings = Vec::new();
        let (migration_source, entity) = match naming::created_table(&slug) {
            Some(table) => {
                let module = naming::singular(table);
                let entity = naming::pascal_case(&module);
                let context = TableContext {
                    table,
                    module: &module,
                    entity: &entity,
                };
                (
                    self.engine.create_table_migration(&context)?,
                    self.plan_entity(&context)?,
                )
            }
            None => (self.engine.migration_stub(label.trim())?, None),
        };

        let mut modules = if migrations_dir.exists() {
            migration_modules(migrations_dir)?
        } else {
            Vec::new()
        };
        modules.push(name.clone());
        modules.sort();
        let registry_source = self.engine.migrations_mod(&modules)?;

        let listing = entity.as_ref().and_then(|plan| {
            self.render_listing(plan.entry.clone())
                .inspect_err(|err| {
                    warn!(entity = %plan.entry.name, error = %err, "entity was not added to the manifest; add it by hand");
                    warnings.push(err.to_string());
                })
                .ok()
        });

        let mut created = Vec::new();
        let written = self.write_required(
            entity.as_ref(),
            (migration_file.as_path(), migration_source.as_str()),
            &registry_source,
            &mut created,
        );
        if let Err(err) = written {
            for path in &created {
                let _ = fs::remove_file(path);
            }
            return Err(err);
        }
        info!(migration = %name, path = %migration_file.display(), "created migration");

        if let Some(listing) = listing
            && let Err(err) = self.write_listing(&listing)
        {
            warn!(error = %err, "entity module list was not updated; add the entity by hand");
            warnings.push(err.to_string());
        }

        Ok(ScaffoldOutcome {
            name,
            migration_file,
            entity_file: entity.map(|plan| plan.path),
            warnings,
        })
    }

    /// Regenerates the migrations `mod.rs` from the `m*.rs` files on disk, in
    /// name order. Returns the registered module names.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be read or `mod.rs` cannot be written.
    pub fn sync_registry(&self) -> Result<Vec<String>, ScaffoldError> {
        let dir = &self.paths.migrations_dir;
        let modules = migration_modules(dir)?;
        let source = self.engine.migrations_mod(&modules)?;
        write_file(&dir.join("mod.rs"), &source)?;
        Ok(modules)
    }

    /// Renders the entity module unless its file already exists.
    fn plan_entity(&self, context: &TableContext<'_>) -> Result<Option<EntityPlan>, ScaffoldError> {
        let path = self.paths.entities_dir.join(format!("{}.rs", context.module));
        if path.exists() {
            info!(entity = %context.entity, path = %path.display(), "entity already exists, reusing it");
            return Ok(None);
        }

        Ok(Some(EntityPlan {
            source: self.engine.entity(context)?,
            entry: EntityEntry {
                name: context.entity.to_string(),
                module: context.module.to_string(),
                table: context.table.to_string(),
            },
            path,
        }))
    }

    /// Loads the manifest with `entry` added and renders the entity module
    /// list from it.
    fn render_listing(&self, entry: EntityEntry) -> Result<EntityListing, ScaffoldError> {
        let mut manifest = EntityManifest::load(&self.paths.entity_manifest)?;
        let changed = manifest.add(entry);
        Ok(EntityListing {
            module: self.engine.entities_mod(&manifest.entities)?,
            prelude: self.engine.entities_prelude(&manifest.entities)?,
            manifest: changed.then_some(manifest),
        })
    }

    /// Writes the entity file, the migration and the registry, recording each
    /// newly created file in `created`.
    fn write_required(
        &self,
        entity: Option<&EntityPlan>,
        (migration_file, migration_source): (&Path, &str),
        registry_source: &str,
        created: &mut Vec<PathBuf>,
    ) -> Result<(), ScaffoldError> {
        if let Some(plan) = entity {
            let dir = &self.paths.entities_dir;
            fs::create_dir_all(dir).map_err(|e| ScaffoldError::io(dir, e))?;
            write_file(&plan.path, &plan.source)?;
            created.push(plan.path.clone());
            info!(entity = %plan.entry.name, path = %plan.path.display(), "created entity");
        }

        let dir = &self.paths.migrations_dir;
        fs::create_dir_all(dir).map_err(|e| ScaffoldError::io(dir, e))?;
        write_file(migration_file, migration_source)?;
        created.push(migration_file.to_path_buf());

        write_file(&dir.join("mod.rs"), registry_source)
    }

    fn write_listing(&self, listing: &EntityListing) -> Result<(), ScaffoldError> {
        if let Some(manifest) = &listing.manifest {
            manifest.save(&self.paths.entity_manifest)?;
        }
        let dir = &self.paths.entities_dir;
        write_file(&dir.join("mod.rs"), &listing.module)?;
        write_file(&dir.join("prelude.rs"), &listing.prelude)
    }
}

/// A rendered entity module waiting to be written.
struct EntityPlan {
    path: PathBuf,
    source: String,
    entry: EntityEntry,
}

/// Rendered entity `mod.rs` and `prelude.rs`, plus the manifest when it
/// changed.
struct EntityListing {
    manifest: Option<EntityManifest>,
    module: String,
    prelude: String,
}

/// Lists migration module names in `dir`, sorted.
fn migration_modules(dir: &Path) -> Result<Vec<String>, ScaffoldError> {
    let entries = fs::read_dir(dir).map_err(|e| ScaffoldError::io(dir, e))?;

    let mut modules = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| ScaffoldError::io(dir, e))?.path();
        if path.extension().is_none_or(|ext| ext != "rs") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let is_module = stem.starts_with('m')
            && stem != "mod"
            && stem
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if is_module {
            modules.push(stem.to_string());
        }
    }

    modules.sort();
    Ok(modules)
}

fn write_file(path: &Path, contents: &str) -> Result<(), ScaffoldError> {
    fs::write(path, contents).map_err(|e| ScaffoldError::io(path, e))
}
