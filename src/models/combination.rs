use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ConditionExpr;

/// A pre-authored bundle of contexts, templates and agents for one kind of
/// request.
///
/// Combinations are reference data: they are read from the catalog document
/// at startup and never modified by request handling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContextCombination {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub query_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<String>,
    pub base_contexts: Vec<String>,
    #[serde(default)]
    pub conditional_contexts: Vec<ConditionalContext>,
    #[serde(default)]
    pub templates: Vec<String>,
    /// Agent ids, most preferred first.
    #[serde(default)]
    pub agents: Vec<String>,
    #[serde(default)]
    pub guidance: BTreeMap<String, String>,
}

/// Extra contexts included when `condition` holds for the request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConditionalContext {
    pub condition: ConditionExpr,
    pub contexts: Vec<String>,
    pub reason: String,
}

/// Why a context name was selected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectionSource {
    Base,
    Conditional,
}

/// A context name chosen for a request, with the reason it was chosen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectedContext {
    pub name: String,
    pub source: SelectionSource,
    pub reason: String,
}

/// A conditional rule that matched a request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchedCondition {
    pub condition: String,
    pub contexts: Vec<String>,
    pub reason: String,
}
