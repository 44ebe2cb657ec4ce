//! Entity manifest.
//!
//! `entities.toml` lists every entity module the crate exposes. The entity
//! `mod.rs` and `prelude.rs` are rendered from it, so adding an entity never
//! requires editing Rust source by hand.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::migrator::error::ScaffoldError;

/// One entity module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityEntry {
    /// Type name used in the prelude, e.g. `Order`.
    pub name: String,
    /// Module name, e.g. `order`.
    pub module: String,
    /// Backing table, e.g. `orders`.
    pub table: String,
}

/// The full manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityManifest {
    /// Entities, kept sorted by module.
    #[serde(default, rename = "entity")]
    pub entities: Vec<EntityEntry>,
}

impl EntityManifest {
    /// Reads a manifest. A missing file is an empty manifest.
    pub fn load(path: &Path) -> Result<Self, ScaffoldError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|e| ScaffoldError::io(path, e))?;
        toml::from_str(&raw)
            .map_err(|e| ScaffoldError::Manifest(format!("{}: {e}", path.display())))
    }

    /// Writes the manifest, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), ScaffoldError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ScaffoldError::io(parent, e))?;
        }
        let raw = toml::to_string_pretty(self)
            .map_err(|e| ScaffoldError::Manifest(format!("{}: {e}", path.display())))?;
        fs::write(path, raw).map_err(|e| ScaffoldError::io(path, e))
    }

    /// Returns `true` if an entity with this module is listed.
    pub fn contains(&self, module: &str) -> bool {
        self.entities.iter().any(|entry| entry.module == module)
    }

    /// Adds an entity unless its module is already listed. Returns whether it
    /// was added.
    pub fn add(&mut self, entry: EntityEntry) -> bool {
        if self.contains(&entry.module) {
            return false;
        }
        self.entities.push(entry);
        self.entities.sort_by(|a, b| a.module.cmp(&b.module));
        true
    }
}
