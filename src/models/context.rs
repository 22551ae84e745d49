use serde::{Deserialize, Serialize};

use super::ModelError;

/// Where a context document came from.
///
/// - `Global`: The shared context library
/// - `ProjectRules`: A project's own rule file
/// - `Custom`: Text supplied directly by the caller
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContextSource {
    Global,
    ProjectRules,
    Custom,
}

impl ContextSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::ProjectRules => "project_rules",
            Self::Custom => "custom",
        }
    }
}

/// A named guidance document.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Context {
    name: String,
    content: String,
    source: ContextSource,
}

impl Context {
    pub fn new(
        name: impl Into<String>,
        content: impl Into<String>,
        source: ContextSource,
    ) -> Result<Self, ModelError> {
        let name = name.into();
        let content = content.into();

        if name.trim().is_empty() {
            return Err(ModelError::EmptyName { entity: "context" });
        }
        if content.trim().is_empty() {
            return Err(ModelError::EmptyContent {
                entity: "context",
                name,
            });
        }

        Ok(Self {
            name,
            content,
            source,
        })
    }

    /// Build a context from caller-supplied text.
    pub fn custom(name: impl Into<String>, content: impl Into<String>) -> Result<Self, ModelError> {
        Self::new(name, content, ContextSource::Custom)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn source(&self) -> ContextSource {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_content() {
        let err = Context::new("security", "   \n", ContextSource::Global).unwrap_err();
        assert_eq!(
            err,
            ModelError::EmptyContent {
                entity: "context",
                name: "security".to_string()
            }
        );
    }

    #[test]
    fn rejects_blank_name() {
        assert!(Context::new("", "body", ContextSource::Global).is_err());
    }

    #[test]
    fn custom_contexts_are_tagged_custom() {
        let ctx = Context::custom("notes", "Remember the audit trail").unwrap();
        assert_eq!(ctx.source(), ContextSource::Custom);
        assert_eq!(ctx.name(), "notes");
    }
}
