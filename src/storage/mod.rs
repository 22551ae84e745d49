//! Content storage.
//!
//! Documents live in a key/value store of UTF-8 text. Keys are
//! `/`-separated relative paths such as `contexts/security.md`. Two backends
//! exist: [`LocalStore`] over a directory and [`RemoteStore`] over an HTTP
//! object store. [`CachedStore`] adds read-through caching to either.

mod cached;
mod local;
mod remote;

pub use cached::CachedStore;
pub use local::LocalStore;
pub use remote::RemoteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid key '{0}': keys must be relative and must not contain '..'")]
    InvalidKey(String),

    #[error("I/O error on '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Size and modification time of a stored document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub key: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    async fn read(&self, key: &str) -> StorageResult<String>;

    async fn write(&self, key: &str, content: &str) -> StorageResult<()>;

    /// Keys beginning with `prefix`, sorted.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    async fn delete(&self, key: &str) -> StorageResult<()>;

    async fn metadata(&self, key: &str) -> StorageResult<ObjectMetadata>;
}

/// Reject absolute keys, backslashes and parent-directory segments.
pub fn validate_key(key: &str) -> StorageResult<()> {
    let invalid = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.contains(':')
        || key.split('/').any(|segment| segment == "..");

    if invalid {
        Err(StorageError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

/// Join key segments with `/`, dropping empty segments and stray slashes.
pub fn join_key(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
