//! Document services, selection engines and the orchestrator that ties them
//! together.
//!
//! - [`ContextService`], [`TemplateService`], [`AgentService`]: load documents
//!   from a [`ContentStore`](crate::storage::ContentStore)
//! - [`CombinationService`]: picks the best pre-authored combination
//! - [`IntentAnalyzer`]: classifies free-text task statements
//! - [`FileAgentMatcher`]: recommends agents for file paths
//! - [`EnhancedContextService`]: runs the whole context request
//! - [`Services`]: wires everything from configuration

mod agent;
mod combination;
mod context;
mod enhanced;
mod factory;
mod file_matcher;
mod intent;
mod template;

pub use agent::*;
pub use combination::*;
pub use context::*;
pub use enhanced::*;
pub use factory::*;
pub use file_matcher::*;
pub use intent::*;
pub use template::*;

use thiserror::Error;

use crate::config::ConfigError;
use crate::models::ModelError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Either query_type or task_statement is required")]
    MissingQueryType,

    #[error("Invalid query_type '{value}'. Allowed values: {}", allowed.join(", "))]
    InvalidQueryType { value: String, allowed: Vec<String> },

    #[error("Path '{0}' must be relative and stay inside the project directory")]
    PathTraversal(String),

    #[error("{0} is disabled in server settings")]
    FeatureDisabled(&'static str),

    #[error("Timed out after {0} ms loading documents")]
    Timeout(u64),
}

impl ServiceError {
    /// Caller mistakes, as opposed to server-side failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingQueryType
                | Self::InvalidQueryType { .. }
                | Self::PathTraversal(_)
                | Self::FeatureDisabled(_)
        )
    }
}

/// Log why a named document is being left out of a result.
///
/// Missing documents and backend failures are both omitted; they are only
/// told apart in the log level.
pub(crate) fn log_omitted(kind: &str, name: &str, err: &StorageError) {
    match err {
        StorageError::NotFound(_) => tracing::warn!("{} '{}' not found, omitting", kind, name),
        other => tracing::error!("{} '{}' could not be read, omitting: {}", kind, name, other),
    }
}
