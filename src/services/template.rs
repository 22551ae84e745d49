use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use super::log_omitted;
use crate::config::Subdirectories;
use crate::models::{extract_variables, Template, TemplateSource};
use crate::storage::{join_key, ContentStore};

/// A template after variable substitution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenderedTemplate {
    pub name: String,
    pub content: String,
    /// Placeholders that had no value and are still in `content`.
    pub unresolved: Vec<String>,
}

impl RenderedTemplate {
    pub fn from_template(template: &Template, values: &HashMap<String, String>) -> Self {
        let content = template.render(values);
        let unresolved = extract_variables(&content);
        Self {
            name: template.name().to_string(),
            content,
            unresolved,
        }
    }
}

/// Loads library templates and renders them.
pub struct TemplateService {
    store: Arc<dyn ContentStore>,
    templates_dir: String,
}

impl TemplateService {
    pub fn new(store: Arc<dyn ContentStore>, dirs: &Subdirectories) -> Self {
        Self {
            store,
            templates_dir: dirs.templates.clone(),
        }
    }

    pub async fn load(&self, name: &str) -> Option<Template> {
        let file = if name.ends_with(".md") {
            name.to_string()
        } else {
            format!("{name}.md")
        };
        let key = join_key(&[&self.templates_dir, &file]);

        let content = match self.store.read(&key).await {
            Ok(content) => content,
            Err(e) => {
                log_omitted("Template", name, &e);
                return None;
            }
        };

        Template::new(name, content, TemplateSource::Library)
            .inspect_err(|e| tracing::warn!("Template '{}' rejected: {}", name, e))
            .ok()
    }

    pub async fn load_many(&self, names: &[String]) -> Vec<Template> {
        join_all(names.iter().map(|name| self.load(name)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// Load a library template and substitute `values` into it.
    pub async fn render(
        &self,
        name: &str,
        values: &HashMap<String, String>,
    ) -> Option<RenderedTemplate> {
        let template = self.load(name).await?;
        Some(RenderedTemplate::from_template(&template, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStore;

    #[tokio::test]
    async fn renders_library_template() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        store
            .write(
                "templates/user-story.md",
                "As a {{persona}}, I want {{goal}}.",
            )
            .await
            .unwrap();
        let service = TemplateService::new(Arc::new(store), &Subdirectories::default());

        let mut values = HashMap::new();
        values.insert("persona".to_string(), "shopper".to_string());

        let rendered = service.render("user-story", &values).await.unwrap();
        assert_eq!(rendered.content, "As a shopper, I want {{goal}}.");
        assert_eq!(rendered.unresolved, vec!["goal"]);

        assert!(service.render("missing", &values).await.is_none());
    }
}
