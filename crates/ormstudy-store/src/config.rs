//! Persistence unit configuration
//!
//! A persistence unit names the database a factory talks to and the
//! per-connection settings applied to every session. It is usually loaded
//! from YAML:
//!
//! ```yaml
//! name: ormstudy
//! database:
//!   kind: file
//!   path: ./ormstudy.db
//! show_sql: true
//! foreign_keys: true
//! ```

#![allow(clippy::result_large_err)]

use crate::errors::{io_error, ConfigError, Result};
use ormstudy_core_types::FactoryId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where a persistence unit keeps its data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DatabaseLocation {
    /// Private shared-cache memory database, dropped with the factory
    #[default]
    Memory,
    /// SQLite file that outlives the factory
    File { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PersistenceUnit {
    pub name: String,
    pub database: DatabaseLocation,
    /// Log every statement at debug level
    pub show_sql: bool,
    /// Enforce foreign keys on every session connection
    pub foreign_keys: bool,
}

impl Default for PersistenceUnit {
    fn default() -> Self {
        Self {
            name: "ormstudy".to_string(),
            database: DatabaseLocation::Memory,
            show_sql: false,
            foreign_keys: true,
        }
    }
}

impl PersistenceUnit {
    /// In-memory unit with default settings
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.database = DatabaseLocation::File { path: path.into() };
        self
    }

    pub fn with_show_sql(mut self, show_sql: bool) -> Self {
        self.show_sql = show_sql;
        self
    }

    /// Load and validate a unit from a YAML file
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, `Configuration` if it does not parse
    /// or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| io_error("load_config", e))?;
        Self::from_yaml_str(&text)
    }

    /// Parse and validate a unit from YAML text
    ///
    /// # Errors
    ///
    /// `Configuration` if the text does not parse or fails validation.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let unit: PersistenceUnit = serde_yaml::from_str(text).map_err(ConfigError::from)?;
        unit.validate()?;
        Ok(unit)
    }

    /// # Errors
    ///
    /// `Configuration` for an empty name or an empty file path.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName.into());
        }
        if let DatabaseLocation::File { path } = &self.database {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::EmptyPath.into());
            }
        }
        Ok(())
    }

    pub fn is_memory(&self) -> bool {
        matches!(self.database, DatabaseLocation::Memory)
    }

    /// Shared-cache URI naming this unit's private memory database
    pub(crate) fn memory_uri(&self, factory: &FactoryId) -> String {
        let name: String = self
            .name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("file:{}-{}?mode=memory&cache=shared", name, factory)
    }
}
