//! The tool surface shared by the HTTP JSON-RPC endpoint and the stdio MCP
//! server.

pub mod guidance;
mod types;

pub use types::*;

use rmcp::schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::{
    Agent, AgentType, AnalyzedIntent, ProfileValidation, Template, TemplateSource,
};
use crate::services::{
    ContextOutcome, EnhancedContextRequest, MappedContext, RenderedTemplate, ServiceError,
    Services,
};

// JSON-RPC error codes used by the transports.
pub const AUTH_REQUIRED: i64 = -32001;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("{0}")]
    Failed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    pub fn code(&self) -> i64 {
        match self {
            Self::InvalidArguments { .. } => INVALID_PARAMS,
            Self::UnknownTool(_) | Self::Failed(_) => METHOD_NOT_FOUND,
            Self::Internal(_) => INTERNAL_ERROR,
        }
    }

    fn invalid(tool: &str, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.to_string(),
            message: message.into(),
        }
    }
}

impl From<ServiceError> for ToolError {
    fn from(err: ServiceError) -> Self {
        if err.is_validation() {
            Self::Failed(err.to_string())
        } else {
            tracing::error!("Tool failed: {}", err);
            Self::Internal(err.to_string())
        }
    }
}

/// A tool's result as JSON, with whether it is an error-shaped result.
#[derive(Debug, Clone)]
pub struct ToolReply {
    pub payload: Value,
    pub is_error: bool,
}

impl ToolReply {
    fn ok<T: Serialize>(value: &T) -> Result<Self, ToolError> {
        Self::new(value, false)
    }

    fn new<T: Serialize>(value: &T, is_error: bool) -> Result<Self, ToolError> {
        let payload =
            serde_json::to_value(value).map_err(|e| ToolError::Internal(e.to_string()))?;
        Ok(Self { payload, is_error })
    }

    /// The payload as pretty-printed JSON text.
    pub fn text(&self) -> String {
        serde_json::to_string_pretty(&self.payload).unwrap_or_else(|_| self.payload.to_string())
    }
}

/// Tool listing entry, in MCP `tools/list` shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

fn definition<T: JsonSchema>(name: &str, description: &str) -> ToolDefinition {
    let schema = rmcp::schemars::schema_for!(T);
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: serde_json::to_value(&schema).unwrap_or(Value::Null),
    }
}

pub const LOAD_ENHANCED_CONTEXT: &str = "load_enhanced_context";
pub const LOAD_CONTEXT: &str = "load_context";
pub const LIST_QUERY_TYPES: &str = "list_query_types";
pub const ANALYZE_TASK_INTENT: &str = "analyze_task_intent";
pub const GET_CONTEXTUAL_AGENT: &str = "get_contextual_agent";
pub const LIST_AGENTS: &str = "list_vishkar_agents";
pub const LOAD_AGENT: &str = "load_vishkar_agent";
pub const REFRESH_AGENT_CACHE: &str = "refresh_agent_cache";
pub const VALIDATE_AGENT_PROFILE: &str = "validate_vishkar_agent_profile";
pub const RENDER_TEMPLATE: &str = "render_template";
pub const GET_SDLC_GUIDANCE: &str = "get_sdlc_guidance";
pub const GET_ENGINEERING_STANDARDS: &str = "get_engineering_standards";
pub const GET_POC_GUIDE: &str = "get_poc_guide";

/// Every tool with its input schema.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        definition::<EnhancedContextRequest>(
            LOAD_ENHANCED_CONTEXT,
            "Select and load the best combination of contexts, templates, project rules and \
             agent for a task. Give query_type, or task_statement to infer it.",
        ),
        definition::<LoadContextRequest>(
            LOAD_CONTEXT,
            "Load the contexts and templates mapped to a query type, without scoring.",
        ),
        definition::<NoArguments>(
            LIST_QUERY_TYPES,
            "List the allowed query types with descriptions.",
        ),
        definition::<AnalyzeTaskIntentRequest>(
            ANALYZE_TASK_INTENT,
            "Classify a task statement into query type, intent, scope, complexity, output \
             format and domains, with confidence and reasoning.",
        ),
        definition::<GetContextualAgentRequest>(
            GET_CONTEXTUAL_AGENT,
            "Recommend specialist agents for the files being worked on.",
        ),
        definition::<ListAgentsRequest>(LIST_AGENTS, "List agent profiles, optionally by type."),
        definition::<LoadAgentRequest>(LOAD_AGENT, "Load one agent profile by id."),
        definition::<RefreshAgentCacheRequest>(
            REFRESH_AGENT_CACHE,
            "Drop cached agent profiles so they are re-read from storage.",
        ),
        definition::<ValidateAgentProfileRequest>(
            VALIDATE_AGENT_PROFILE,
            "Check an agent profile for missing or thin fields.",
        ),
        definition::<RenderTemplateRequest>(
            RENDER_TEMPLATE,
            "Render a library template, or given template text, with variables.",
        ),
        definition::<SdlcGuidanceRequest>(
            GET_SDLC_GUIDANCE,
            "SDLC phases with goals, activities and exit criteria.",
        ),
        definition::<EngineeringStandardsRequest>(
            GET_ENGINEERING_STANDARDS,
            "Engineering standards by area.",
        ),
        definition::<NoArguments>(GET_POC_GUIDE, "How to run a proof of concept."),
    ]
}

fn parse_args<T>(tool: &str, arguments: Value) -> Result<T, ToolError>
where
    T: DeserializeOwned + Default,
{
    if arguments.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(arguments).map_err(|e| ToolError::invalid(tool, e.to_string()))
}

fn parse_required<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::invalid(tool, e.to_string()))
}

/// Typed tool implementations over [`Services`].
#[derive(Clone)]
pub struct Toolbox {
    services: Services,
}

impl Toolbox {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Run a tool by name with JSON arguments.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<ToolReply, ToolError> {
        tracing::debug!("Calling tool '{}'", name);
        match name {
            LOAD_ENHANCED_CONTEXT => {
                let outcome = self
                    .load_enhanced_context(parse_args(name, arguments)?)
                    .await;
                ToolReply::new(&outcome, outcome.is_error())
            }
            LOAD_CONTEXT => {
                let req: LoadContextRequest = parse_required(name, arguments)?;
                ToolReply::ok(&self.load_context(&req.query_type).await?)
            }
            LIST_QUERY_TYPES => ToolReply::ok(&self.list_query_types()?),
            ANALYZE_TASK_INTENT => {
                let req: AnalyzeTaskIntentRequest = parse_required(name, arguments)?;
                ToolReply::ok(&self.analyze_task_intent(&req.task_statement)?)
            }
            GET_CONTEXTUAL_AGENT => {
                let response = self
                    .get_contextual_agent(parse_args(name, arguments)?)
                    .await?;
                let is_error = matches!(response, ContextualAgentResponse::Usage(_));
                ToolReply::new(&response, is_error)
            }
            LIST_AGENTS => {
                let req: ListAgentsRequest = parse_args(name, arguments)?;
                ToolReply::ok(&self.list_agents(req.agent_type.as_deref()).await?)
            }
            LOAD_AGENT => {
                let req: LoadAgentRequest = parse_required(name, arguments)?;
                ToolReply::ok(&self.load_agent(&req.agent_id).await?)
            }
            REFRESH_AGENT_CACHE => {
                let req: RefreshAgentCacheRequest = parse_args(name, arguments)?;
                ToolReply::ok(&self.refresh_agent_cache(req.agent_id.as_deref()))
            }
            VALIDATE_AGENT_PROFILE => {
                let req: ValidateAgentProfileRequest = parse_required(name, arguments)?;
                let strict = req.strict_mode.unwrap_or(false);
                ToolReply::ok(&self.validate_agent_profile(&req.agent_id, strict).await?)
            }
            RENDER_TEMPLATE => {
                ToolReply::ok(&self.render_template(parse_args(name, arguments)?).await?)
            }
            GET_SDLC_GUIDANCE => {
                let req: SdlcGuidanceRequest = parse_args(name, arguments)?;
                ToolReply::ok(&self.sdlc_guidance(req.phase.as_deref())?)
            }
            GET_ENGINEERING_STANDARDS => {
                let req: EngineeringStandardsRequest = parse_args(name, arguments)?;
                ToolReply::ok(&self.engineering_standards(req.area.as_deref())?)
            }
            GET_POC_GUIDE => ToolReply::ok(&guidance::poc_guide()),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    // ============================================================
    // Context tools
    // ============================================================

    pub async fn load_enhanced_context(&self, req: EnhancedContextRequest) -> ContextOutcome {
        self.services.enhanced.load(req).await
    }

    pub async fn load_context(&self, query_type: &str) -> Result<MappedContext, ToolError> {
        Ok(self.services.enhanced.load_mapped(query_type).await?)
    }

    pub fn list_query_types(&self) -> Result<QueryTypeList, ToolError> {
        let bundle = self.services.config.load().map_err(ServiceError::from)?;
        let query_types = bundle
            .mappings
            .allowed_query_types
            .iter()
            .map(|name| QueryTypeInfo {
                name: name.clone(),
                description: bundle
                    .mappings
                    .get(name)
                    .map(|m| m.description.clone())
                    .unwrap_or_default(),
            })
            .collect();
        Ok(QueryTypeList { query_types })
    }

    pub fn analyze_task_intent(&self, statement: &str) -> Result<AnalyzedIntent, ToolError> {
        let bundle = self.services.config.load().map_err(ServiceError::from)?;
        if !bundle.settings.features.intent_analysis {
            return Err(ServiceError::FeatureDisabled("Intent analysis").into());
        }
        Ok(self.services.analyzer.analyze(statement))
    }

    // ============================================================
    // Agent tools
    // ============================================================

    pub async fn get_contextual_agent(
        &self,
        req: GetContextualAgentRequest,
    ) -> Result<ContextualAgentResponse, ToolError> {
        let bundle = self.services.config.load().map_err(ServiceError::from)?;
        if !bundle.settings.features.agent_recommendation {
            return Err(ServiceError::FeatureDisabled("Agent recommendation").into());
        }

        let result = match self.services.matcher.recommend(&req.paths()) {
            Ok(result) => result,
            Err(usage) => return Ok(ContextualAgentResponse::Usage(usage)),
        };

        let agent_details = if req.include_agent_details.unwrap_or(false) {
            let ids: Vec<String> = result
                .recommended_agents
                .iter()
                .map(|r| r.agent_id.clone())
                .collect();
            let loaded =
                futures::future::join_all(ids.iter().map(|id| self.services.agents.load(id)))
                    .await;
            Some(
                loaded
                    .into_iter()
                    .filter_map(|r| r.ok().flatten())
                    .collect::<Vec<Agent>>(),
            )
        } else {
            None
        };

        Ok(ContextualAgentResponse::Recommended(
            AgentRecommendationResponse {
                result,
                agent_details,
            },
        ))
    }

    pub async fn list_agents(
        &self,
        agent_type: Option<&str>,
    ) -> Result<AgentListResponse, ToolError> {
        let filter = match agent_type.map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(other) => Some(AgentType::parse(other).map_err(|_| {
                ToolError::invalid(
                    LIST_AGENTS,
                    format!(
                        "Invalid agent_type '{}'. Must be: all, domain_expert or technical",
                        other
                    ),
                )
            })?),
        };

        let agents = self.services.agents.list(filter).await;
        Ok(AgentListResponse {
            agent_type: filter.map_or("all", |t| t.as_str()).to_string(),
            total: agents.len(),
            agents,
        })
    }

    pub async fn load_agent(&self, id: &str) -> Result<Agent, ToolError> {
        self.services
            .agents
            .load(id)
            .await?
            .ok_or_else(|| ToolError::Failed(format!("Agent '{}' not found", id)))
    }

    pub fn refresh_agent_cache(&self, id: Option<&str>) -> RefreshResponse {
        self.services.refresh_agents(id);
        match id {
            Some(id) => RefreshResponse {
                refreshed: id.to_string(),
                message: format!("Agent '{}' will be reloaded on next use", id),
            },
            None => RefreshResponse {
                refreshed: "all".to_string(),
                message: "All agents will be reloaded on next use".to_string(),
            },
        }
    }

    pub async fn validate_agent_profile(
        &self,
        id: &str,
        strict: bool,
    ) -> Result<ProfileValidation, ToolError> {
        self.services
            .agents
            .validate(id, strict)
            .await?
            .ok_or_else(|| ToolError::Failed(format!("Agent '{}' not found", id)))
    }

    // ============================================================
    // Templates and guidance
    // ============================================================

    pub async fn render_template(
        &self,
        req: RenderTemplateRequest,
    ) -> Result<RenderedTemplate, ToolError> {
        if let Some(content) = req.template_content.filter(|c| !c.trim().is_empty()) {
            let name = req.template_name.unwrap_or_else(|| "custom".to_string());
            let template = Template::new(name, content, TemplateSource::Custom)
                .map_err(|e| ToolError::invalid(RENDER_TEMPLATE, e.to_string()))?;
            return Ok(RenderedTemplate::from_template(&template, &req.variables));
        }

        let Some(name) = req.template_name.filter(|n| !n.trim().is_empty()) else {
            return Err(ToolError::invalid(
                RENDER_TEMPLATE,
                "either template_name or template_content is required",
            ));
        };

        self.services
            .templates
            .render(&name, &req.variables)
            .await
            .ok_or_else(|| ToolError::Failed(format!("Template '{}' not found", name)))
    }

    pub fn sdlc_guidance(&self, phase: Option<&str>) -> Result<guidance::SdlcGuidance, ToolError> {
        guidance::sdlc_guidance(phase).ok_or_else(|| {
            ToolError::Failed(format!(
                "Unknown SDLC phase '{}'. Allowed values: {}",
                phase.unwrap_or_default(),
                guidance::sdlc_phase_names().join(", ")
            ))
        })
    }

    pub fn engineering_standards(
        &self,
        area: Option<&str>,
    ) -> Result<guidance::EngineeringStandards, ToolError> {
        guidance::engineering_standards(area).ok_or_else(|| {
            ToolError::Failed(format!(
                "Unknown standards area '{}'. Allowed values: {}",
                area.unwrap_or_default(),
                guidance::standard_area_names().join(", ")
            ))
        })
    }
}
