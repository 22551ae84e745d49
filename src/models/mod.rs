//! Domain models for Vishkar.
//!
//! # Documents
//!
//! - [`Context`]: A named guidance document from the global library, a project's
//!   rule file, or supplied by the caller.
//! - [`Template`]: A named document with `{{variable}}` placeholders.
//! - [`Agent`]: A specialist profile, either a domain expert or a technical role.
//!
//! Documents are built fresh from store content on every load and never
//! mutated afterwards.
//!
//! # Selection
//!
//! - [`ContextCombination`]: Pre-authored bundle tying a query type to the
//!   contexts, templates and agents that serve it.
//! - [`QueryParams`]: The structured parameters a combination is matched against.
//! - [`AnalyzedIntent`]: The result of classifying a free-text task statement.

mod agent;
mod combination;
mod condition;
mod context;
mod query;
mod template;

pub use agent::*;
pub use combination::*;
pub use condition::*;
pub use context::*;
pub use query::*;
pub use template::*;

use thiserror::Error;

/// Errors raised when a document fails construction-time validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("{entity} name must not be empty")]
    EmptyName { entity: &'static str },

    #[error("{entity} '{name}' has empty content")]
    EmptyContent { entity: &'static str, name: String },

    #[error("agent '{id}' content is too short ({len} characters, minimum {min})")]
    ContentTooShort { id: String, len: usize, min: usize },

    #[error("Invalid agent type '{0}'. Must be: domain_expert or technical")]
    InvalidAgentType(String),
}
