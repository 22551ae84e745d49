use std::sync::Arc;

use futures::future::join_all;

use super::{log_omitted, ServiceError};
use crate::config::Subdirectories;
use crate::models::{Context, ContextSource};
use crate::storage::{join_key, ContentStore};

/// Loads context documents and project rule files.
pub struct ContextService {
    store: Arc<dyn ContentStore>,
    contexts_dir: String,
    projects_dir: String,
    rules_file: String,
}

impl ContextService {
    pub fn new(store: Arc<dyn ContentStore>, dirs: &Subdirectories) -> Self {
        Self {
            store,
            contexts_dir: dirs.contexts.clone(),
            projects_dir: dirs.projects.clone(),
            rules_file: dirs.project_rules_file.clone(),
        }
    }

    fn key_for(&self, name: &str) -> String {
        if name.ends_with(".md") {
            join_key(&[&self.contexts_dir, name])
        } else {
            join_key(&[&self.contexts_dir, &format!("{name}.md")])
        }
    }

    /// Load one context from the library. Missing or unreadable documents
    /// yield `None`.
    pub async fn load(&self, name: &str) -> Option<Context> {
        let key = self.key_for(name);
        let content = match self.store.read(&key).await {
            Ok(content) => content,
            Err(e) => {
                log_omitted("Context", name, &e);
                return None;
            }
        };

        match Context::new(name, content, ContextSource::Global) {
            Ok(ctx) => {
                tracing::debug!("Loaded context '{}' from {}", name, key);
                Some(ctx)
            }
            Err(e) => {
                tracing::warn!("Context '{}' rejected: {}", name, e);
                None
            }
        }
    }

    /// Load several contexts concurrently, keeping request order and
    /// dropping the ones that could not be loaded.
    pub async fn load_many(&self, names: &[String]) -> Vec<Context> {
        join_all(names.iter().map(|name| self.load(name)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// Load the rule file for a project directory relative to the projects
    /// area of the store.
    pub async fn load_project_rules(
        &self,
        project_path: &str,
    ) -> Result<Option<Context>, ServiceError> {
        let relative = normalize_project_path(project_path)?;
        let key = join_key(&[&self.projects_dir, &relative, &self.rules_file]);

        match self.store.read(&key).await {
            Ok(content) => Ok(Context::new(relative, content, ContextSource::ProjectRules).ok()),
            Err(e) => {
                log_omitted("Project rules", &relative, &e);
                Ok(None)
            }
        }
    }
}

/// Validate a caller-supplied project path and normalize separators.
fn normalize_project_path(path: &str) -> Result<String, ServiceError> {
    let normalized = path.trim().replace('\\', "/");
    let normalized = normalized.trim_start_matches("./").trim_end_matches('/');

    let escapes = normalized.is_empty()
        || normalized.starts_with('/')
        || normalized.contains(':')
        || normalized.split('/').any(|segment| segment == "..");

    if escapes {
        tracing::warn!("Rejected project path '{}'", path);
        return Err(ServiceError::PathTraversal(path.to_string()));
    }
    Ok(normalized.to_string())
}
