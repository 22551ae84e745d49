//! Request and response types for tools.

use std::collections::HashMap;

use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::{Agent, AgentSummary};
use crate::services::{FileMatchResult, MatchError};

// ============================================================
// Request Types
// ============================================================

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct NoArguments {}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LoadContextRequest {
    #[schemars(description = "Query type whose mapped contexts and templates should be loaded")]
    pub query_type: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AnalyzeTaskIntentRequest {
    #[schemars(description = "Free-text description of the task to classify")]
    pub task_statement: String,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GetContextualAgentRequest {
    #[schemars(description = "File paths being worked on")]
    #[serde(default)]
    pub file_paths: Option<Vec<String>>,
    #[schemars(description = "A single file path, used when file_paths is not given")]
    #[serde(default)]
    pub file_path: Option<String>,
    #[schemars(description = "Also return the full profiles of the recommended agents")]
    #[serde(default)]
    pub include_agent_details: Option<bool>,
}

impl GetContextualAgentRequest {
    /// `file_paths`, plus `file_path` when given.
    pub fn paths(&self) -> Vec<String> {
        let mut paths = self.file_paths.clone().unwrap_or_default();
        if let Some(path) = &self.file_path {
            paths.push(path.clone());
        }
        paths
    }
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListAgentsRequest {
    #[schemars(description = "'all' (default), 'domain_expert' or 'technical'")]
    #[serde(default)]
    pub agent_type: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LoadAgentRequest {
    #[schemars(description = "Agent id, e.g. 'a-backend-engineer'")]
    pub agent_id: String,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct RefreshAgentCacheRequest {
    #[schemars(description = "Agent id to refresh. Omit to refresh every agent")]
    #[serde(default)]
    pub agent_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ValidateAgentProfileRequest {
    #[schemars(description = "Agent id to validate")]
    pub agent_id: String,
    #[schemars(
        description = "Treat missing specializations, sections and a thin description as errors"
    )]
    #[serde(default)]
    pub strict_mode: Option<bool>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct RenderTemplateRequest {
    #[schemars(description = "Library template name, e.g. 'user-story'")]
    #[serde(default)]
    pub template_name: Option<String>,
    #[schemars(description = "Template text to render instead of a library template")]
    #[serde(default)]
    pub template_content: Option<String>,
    #[schemars(description = "Values for {{placeholders}}")]
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct SdlcGuidanceRequest {
    #[schemars(
        description = "Only this phase: discovery, design, implementation, testing, release or operations"
    )]
    #[serde(default)]
    pub phase: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct EngineeringStandardsRequest {
    #[schemars(description = "Only this area, e.g. 'code-review', 'testing', 'security'")]
    #[serde(default)]
    pub area: Option<String>,
}

// ============================================================
// Response Types
// ============================================================

#[derive(Debug, Serialize)]
pub struct QueryTypeInfo {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct QueryTypeList {
    pub query_types: Vec<QueryTypeInfo>,
}

#[derive(Debug, Serialize)]
pub struct AgentRecommendationResponse {
    #[serde(flatten)]
    pub result: FileMatchResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_details: Option<Vec<Agent>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ContextualAgentResponse {
    Recommended(AgentRecommendationResponse),
    Usage(MatchError),
}

#[derive(Debug, Serialize)]
pub struct AgentListResponse {
    pub agent_type: String,
    pub total: usize,
    pub agents: Vec<AgentSummary>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub refreshed: String,
    pub message: String,
}
