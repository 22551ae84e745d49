//! HTTP object-store backend.
//!
//! Objects are addressed as `{base_url}/{key}`:
//! - `GET` reads, `PUT` writes, `DELETE` removes, `HEAD` returns metadata
//! - `GET {base_url}?prefix=<p>` returns a JSON array of keys

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, Method, StatusCode};

use super::{validate_key, ContentStore, ObjectMetadata, StorageError, StorageResult};

#[derive(Debug, Clone)]
pub struct RemoteStore {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl RemoteStore {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            token,
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request with optional auth header.
    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.request(method, url);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    fn object_url(&self, key: &str) -> StorageResult<String> {
        validate_key(key)?;
        Ok(format!("{}/{}", self.base_url, key))
    }

    /// Convert a non-success status into a storage error.
    async fn check(key: &str, response: reqwest::Response) -> StorageResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(key.to_string()));
        }
        let body = response.text().await.unwrap_or_default();
        tracing::warn!("Object store returned {} for '{}'", status, key);
        Err(StorageError::Backend(format!("{}: {}", status, body)))
    }
}

#[async_trait]
impl ContentStore for RemoteStore {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self.metadata(key).await {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn read(&self, key: &str) -> StorageResult<String> {
        let url = self.object_url(key)?;
        let response = self.request(Method::GET, &url).send().await?;
        let response = Self::check(key, response).await?;
        Ok(response.text().await?)
    }

    async fn write(&self, key: &str, content: &str) -> StorageResult<()> {
        let url = self.object_url(key)?;
        let response = self
            .request(Method::PUT, &url)
            .header(header::CONTENT_TYPE, "text/markdown; charset=utf-8")
            .body(content.to_string())
            .send()
            .await?;
        Self::check(key, response).await?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let response = self
            .request(Method::GET, &self.base_url)
            .query(&[("prefix", prefix)])
            .send()
            .await?;
        let response = match Self::check(prefix, response).await {
            Ok(r) => r,
            Err(StorageError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut keys: Vec<String> = response.json().await?;
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let url = self.object_url(key)?;
        let response = self.request(Method::DELETE, &url).send().await?;
        Self::check(key, response).await?;
        Ok(())
    }

    async fn metadata(&self, key: &str) -> StorageResult<ObjectMetadata> {
        let url = self.object_url(key)?;
        let response = self.request(Method::HEAD, &url).send().await?;
        let response = Self::check(key, response).await?;

        let headers = response.headers();
        let size = headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let last_modified = headers
            .get(header::LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Ok(ObjectMetadata {
            key: key.to_string(),
            size,
            last_modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let store = RemoteStore::new("https://blobs.example.com/vishkar/", None);
        assert_eq!(store.base_url(), "https://blobs.example.com/vishkar");
        assert_eq!(
            store.object_url("agents/a.md").unwrap(),
            "https://blobs.example.com/vishkar/agents/a.md"
        );
    }

    #[test]
    fn object_urls_reject_traversal() {
        let store = RemoteStore::new("https://blobs.example.com", None);
        assert!(store.object_url("../x").is_err());
    }
}
