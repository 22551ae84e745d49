use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{validate_key, ContentStore, ObjectMetadata, StorageError, StorageResult};

/// Content store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |p, seg| p.join(seg)))
    }

    fn io_error(key: &str, source: std::io::Error) -> StorageError {
        if source.kind() == ErrorKind::NotFound {
            StorageError::NotFound(key.to_string())
        } else {
            StorageError::Io {
                key: key.to_string(),
                source,
            }
        }
    }
}

#[async_trait]
impl ContentStore for LocalStore {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.path_for(key)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }

    async fn read(&self, key: &str) -> StorageResult<String> {
        let path = self.path_for(key)?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Self::io_error(key, e))
    }

    async fn write(&self, key: &str, content: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::io_error(key, e))?;
        }
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| Self::io_error(key, e))
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        // Walk from the deepest directory the prefix names, then filter.
        let dir_part = match prefix.rfind('/') {
            Some(idx) => &prefix[..idx],
            None => "",
        };
        let start = if dir_part.is_empty() {
            self.root.clone()
        } else {
            self.path_for(dir_part)?
        };

        let mut keys = Vec::new();
        let mut pending = vec![start];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(Self::io_error(prefix, e)),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| Self::io_error(prefix, e))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| Self::io_error(prefix, e))?;

                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    let Ok(relative) = path.strip_prefix(&self.root) else {
                        continue;
                    };
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    if key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| Self::io_error(key, e))
    }

    async fn metadata(&self, key: &str) -> StorageResult<ObjectMetadata> {
        let path = self.path_for(key)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| Self::io_error(key, e))?;
        if !meta.is_file() {
            return Err(StorageError::NotFound(key.to_string()));
        }

        Ok(ObjectMetadata {
            key: key.to_string(),
            size: meta.len(),
            last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, LocalStore) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = LocalStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn write_then_read() {
        let (_dir, store) = setup();
        store
            .write("contexts/security.md", "# Security")
            .await
            .unwrap();

        assert!(store.exists("contexts/security.md").await.unwrap());
        assert_eq!(
            store.read("contexts/security.md").await.unwrap(),
            "# Security"
        );
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let (_dir, store) = setup();
        assert!(!store.exists("nope.md").await.unwrap());
        assert!(store.read("nope.md").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn list_filters_by_prefix_recursively() {
        let (_dir, store) = setup();
        store.write("agents/a.md", "a").await.unwrap();
        store.write("agents/nested/b.md", "b").await.unwrap();
        store.write("contexts/c.md", "c").await.unwrap();

        let keys = store.list("agents/").await.unwrap();
        assert_eq!(keys, vec!["agents/a.md", "agents/nested/b.md"]);

        let partial = store.list("agents/n").await.unwrap();
        assert_eq!(partial, vec!["agents/nested/b.md"]);

        assert!(store.list("missing/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_and_metadata() {
        let (_dir, store) = setup();
        store.write("t.md", "12345").await.unwrap();

        let meta = store.metadata("t.md").await.unwrap();
        assert_eq!(meta.size, 5);
        assert!(meta.last_modified.is_some());

        store.delete("t.md").await.unwrap();
        assert!(!store.exists("t.md").await.unwrap());
        assert!(store.delete("t.md").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn rejects_traversal() {
        let (_dir, store) = setup();
        assert!(matches!(
            store.read("../outside.md").await,
            Err(StorageError::InvalidKey(_))
        ));
    }
}
