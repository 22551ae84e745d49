//! Configuration documents.
//!
//! Three JSON documents live in the config directory:
//! - `query-mappings.json` - allowed query types and their basic document lists
//! - `context-combinations.json` - the combination catalog
//! - `server.json` - storage, cache and feature settings
//!
//! The directory is `VISHKAR_CONFIG_DIR`, else `./config`, else the
//! platform config directory.

mod catalog;
mod mappings;
mod settings;

pub use catalog::*;
pub use mappings::*;
pub use settings::*;

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};

use serde::de::DeserializeOwned;
use thiserror::Error;

pub const QUERY_MAPPINGS_FILE: &str = "query-mappings.json";
pub const COMBINATIONS_FILE: &str = "context-combinations.json";
pub const SERVER_SETTINGS_FILE: &str = "server.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// A previous load failed; the failure sticks until the loader is reset.
    #[error("Configuration unavailable: {0}")]
    Unavailable(String),
}

/// Everything loaded from the config directory.
#[derive(Debug, Clone)]
pub struct ConfigBundle {
    pub mappings: Arc<QueryMappings>,
    pub catalog: Arc<CombinationCatalog>,
    pub settings: Arc<ServerSettings>,
    pub dir: PathBuf,
}

impl ConfigBundle {
    /// Content root with relative paths resolved against the config directory.
    pub fn content_root(&self) -> PathBuf {
        let root = Path::new(&self.settings.content_root);
        if root.is_absolute() {
            root.to_path_buf()
        } else {
            self.dir.join(root)
        }
    }
}

/// Loads the config directory on first use and caches the outcome until
/// [`reset`]. A failed load is cached too, so every caller sees the same
/// failure until the files are fixed and the loader is reset.
///
/// [`reset`]: ConfigLoader::reset
#[derive(Debug)]
pub struct ConfigLoader {
    dir: PathBuf,
    apply_env: bool,
    loaded: RwLock<Option<Result<ConfigBundle, String>>>,
}

impl ConfigLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            apply_env: false,
            loaded: RwLock::new(None),
        }
    }

    /// Loader for the process: resolves the directory and applies `VISHKAR_*`
    /// overrides to the server settings.
    pub fn from_env() -> Self {
        Self {
            dir: default_config_dir(),
            apply_env: true,
            loaded: RwLock::new(None),
        }
    }

    /// Process-wide loader shared by [`Services::shared`](crate::services::Services::shared).
    pub fn global() -> Arc<ConfigLoader> {
        static GLOBAL: OnceLock<Arc<ConfigLoader>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(ConfigLoader::from_env()))
            .clone()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load(&self) -> Result<ConfigBundle, ConfigError> {
        if let Some(outcome) = self.loaded.read().expect("config lock poisoned").as_ref() {
            return outcome.clone().map_err(ConfigError::Unavailable);
        }

        let mut slot = self.loaded.write().expect("config lock poisoned");
        if let Some(outcome) = slot.as_ref() {
            return outcome.clone().map_err(ConfigError::Unavailable);
        }

        match self.read_bundle() {
            Ok(bundle) => {
                tracing::info!(
                    "Loaded configuration from {} ({} combinations, {} query types)",
                    self.dir.display(),
                    bundle.catalog.combinations.len(),
                    bundle.mappings.allowed_query_types.len()
                );
                *slot = Some(Ok(bundle.clone()));
                Ok(bundle)
            }
            Err(e) => {
                tracing::error!("Configuration load failed: {}", e);
                *slot = Some(Err(e.to_string()));
                Err(e)
            }
        }
    }

    /// Drop the cached documents so the next [`load`](Self::load) re-reads them.
    pub fn reset(&self) {
        *self.loaded.write().expect("config lock poisoned") = None;
    }

    fn read_bundle(&self) -> Result<ConfigBundle, ConfigError> {
        let mappings: QueryMappings = read_json(&self.dir.join(QUERY_MAPPINGS_FILE))?;
        let catalog: CombinationCatalog = read_json(&self.dir.join(COMBINATIONS_FILE))?;
        catalog.validate()?;

        let settings_path = self.dir.join(SERVER_SETTINGS_FILE);
        let mut settings: ServerSettings = if settings_path.exists() {
            read_json(&settings_path)?
        } else {
            tracing::warn!(
                "{} not found, using default server settings",
                settings_path.display()
            );
            ServerSettings::default()
        };
        if self.apply_env {
            settings.apply_env();
        }

        for query_type in mappings.mappings.keys() {
            if !mappings.is_allowed(query_type) {
                tracing::warn!("Query type '{}' has a mapping but is not allowed", query_type);
            }
        }

        Ok(ConfigBundle {
            mappings: Arc::new(mappings),
            catalog: Arc::new(catalog),
            settings: Arc::new(settings),
            dir: self.dir.clone(),
        })
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn default_config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("VISHKAR_CONFIG_DIR") {
        return PathBuf::from(dir);
    }

    let local = PathBuf::from("config");
    if local.is_dir() {
        return local;
    }

    directories::ProjectDirs::from("", "", "vishkar")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or(local)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPPINGS: &str = r#"{
        "mappings": { "story": { "contexts": ["agile"], "templates": ["story"], "description": "Stories" } },
        "allowedQueryTypes": ["story"]
    }"#;

    const CATALOG: &str = r#"{
        "defaultCombination": "story-default",
        "combinations": [
            { "id": "story-default", "name": "Story", "queryType": "story", "baseContexts": ["agile"] }
        ]
    }"#;

    fn write_config(dir: &Path, catalog: &str) {
        std::fs::write(dir.join(QUERY_MAPPINGS_FILE), MAPPINGS).unwrap();
        std::fs::write(dir.join(COMBINATIONS_FILE), catalog).unwrap();
    }

    #[test]
    fn loads_and_caches_until_reset() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), CATALOG);

        let loader = ConfigLoader::new(dir.path());
        let first = loader.load().unwrap();
        assert_eq!(first.catalog.combinations.len(), 1);
        assert_eq!(first.settings.storage_mode, StorageMode::Local);

        // Broken on disk, but the cached copy is still served.
        std::fs::write(dir.path().join(COMBINATIONS_FILE), "{").unwrap();
        assert!(loader.load().is_ok());

        loader.reset();
        assert!(matches!(loader.load(), Err(ConfigError::Parse { .. })));

        // Fixing the file is not enough: the failure sticks until reset.
        write_config(dir.path(), CATALOG);
        assert!(matches!(loader.load(), Err(ConfigError::Unavailable(_))));

        loader.reset();
        assert!(loader.load().is_ok());
    }

    #[test]
    fn missing_documents_are_read_errors() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::new(dir.path());
        assert!(matches!(loader.load(), Err(ConfigError::Read { .. })));
    }

    #[test]
    fn relative_content_root_resolves_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), CATALOG);
        let bundle = ConfigLoader::new(dir.path()).load().unwrap();
        assert_eq!(bundle.content_root(), dir.path().join("../content"));
    }
}
