//! MCP server over stdio.

use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Serialize;

use crate::services::{EnhancedContextRequest, Services};
use crate::tools::*;

#[derive(Clone)]
pub struct McpServer {
    toolbox: Toolbox,
    tool_router: ToolRouter<Self>,
}

impl McpServer {
    pub fn new(services: Services) -> Self {
        Self {
            toolbox: Toolbox::new(services),
            tool_router: Self::tool_router(),
        }
    }

    pub fn toolbox(&self) -> &Toolbox {
        &self.toolbox
    }

    /// Names of the tools registered with the router.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        names.sort();
        names
    }

    fn reply<T: Serialize>(value: &T, is_error: bool) -> Result<CallToolResult, McpError> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        if is_error {
            Ok(CallToolResult::error(vec![Content::text(json)]))
        } else {
            Ok(CallToolResult::success(vec![Content::text(json)]))
        }
    }

    fn success<T: Serialize>(result: Result<T, ToolError>) -> Result<CallToolResult, McpError> {
        match result {
            Ok(value) => Self::reply(&value, false),
            Err(e) => Err(to_mcp_error(e)),
        }
    }
}

fn to_mcp_error(err: ToolError) -> McpError {
    match err {
        ToolError::Internal(msg) => McpError::internal_error(msg, None),
        other => McpError::invalid_params(other.to_string(), None),
    }
}

#[tool_router]
impl McpServer {
    // ============================================================
    // Context Tools
    // ============================================================

    #[tool(
        description = "Load the best-matching bundle of guidance for a task: contexts, templates, project rules and a specialist agent, rendered as one markdown document. Pass query_type (e.g. 'story', 'security'), or task_statement to have it inferred. Explicit fields override inferred ones. Errors come back as {isError, message, allowedValues}."
    )]
    async fn load_enhanced_context(
        &self,
        params: Parameters<EnhancedContextRequest>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = self.toolbox.load_enhanced_context(params.0).await;
        Self::reply(&outcome, outcome.is_error())
    }

    #[tool(
        description = "Load the contexts and templates mapped to a query type, without scoring or conditional rules."
    )]
    async fn load_context(
        &self,
        params: Parameters<LoadContextRequest>,
    ) -> Result<CallToolResult, McpError> {
        Self::success(self.toolbox.load_context(&params.0.query_type).await)
    }

    #[tool(description = "List the allowed query types with their descriptions.")]
    async fn list_query_types(&self) -> Result<CallToolResult, McpError> {
        Self::success(self.toolbox.list_query_types())
    }

    #[tool(
        description = "Classify a free-text task statement. Returns query_type, task_intent, scope, complexity, output_format, domain_focus, a confidence in [0, 1] and the reasoning behind each choice."
    )]
    async fn analyze_task_intent(
        &self,
        params: Parameters<AnalyzeTaskIntentRequest>,
    ) -> Result<CallToolResult, McpError> {
        Self::success(self.toolbox.analyze_task_intent(&params.0.task_statement))
    }

    // ============================================================
    // Agent Tools
    // ============================================================

    #[tool(
        description = "Recommend specialist agents for the files you are working on. Pass file_paths (or file_path). Agents are ranked by how many file patterns named them; paths matching no pattern fall back to the default agent. Set include_agent_details=true to get full profiles."
    )]
    async fn get_contextual_agent(
        &self,
        params: Parameters<GetContextualAgentRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.toolbox.get_contextual_agent(params.0).await {
            Ok(response) => {
                let is_error = matches!(response, ContextualAgentResponse::Usage(_));
                Self::reply(&response, is_error)
            }
            Err(e) => Err(to_mcp_error(e)),
        }
    }

    #[tool(
        description = "List agent profiles. agent_type filters by 'domain_expert' or 'technical'; 'all' or omitted lists every agent."
    )]
    async fn list_vishkar_agents(
        &self,
        params: Parameters<ListAgentsRequest>,
    ) -> Result<CallToolResult, McpError> {
        Self::success(self.toolbox.list_agents(params.0.agent_type.as_deref()).await)
    }

    #[tool(description = "Load one agent profile by id, including its full markdown body.")]
    async fn load_vishkar_agent(
        &self,
        params: Parameters<LoadAgentRequest>,
    ) -> Result<CallToolResult, McpError> {
        Self::success(self.toolbox.load_agent(&params.0.agent_id).await)
    }

    #[tool(
        description = "Drop cached agent profiles so edits in the library are picked up. Pass agent_id for one agent, or omit it for all."
    )]
    async fn refresh_agent_cache(
        &self,
        params: Parameters<RefreshAgentCacheRequest>,
    ) -> Result<CallToolResult, McpError> {
        Self::reply(
            &self.toolbox.refresh_agent_cache(params.0.agent_id.as_deref()),
            false,
        )
    }

    #[tool(
        description = "Check an agent profile for completeness. Strict mode turns missing specializations and sections into errors."
    )]
    async fn validate_vishkar_agent_profile(
        &self,
        params: Parameters<ValidateAgentProfileRequest>,
    ) -> Result<CallToolResult, McpError> {
        let req = params.0;
        Self::success(
            self.toolbox
                .validate_agent_profile(&req.agent_id, req.strict_mode.unwrap_or(false))
                .await,
        )
    }

    // ============================================================
    // Templates and Guidance
    // ============================================================

    #[tool(
        description = "Render a template with variables. Use template_name for a library template or template_content for your own text. Placeholders are written {{name}}; any without a value are listed as unresolved."
    )]
    async fn render_template(
        &self,
        params: Parameters<RenderTemplateRequest>,
    ) -> Result<CallToolResult, McpError> {
        Self::success(self.toolbox.render_template(params.0).await)
    }

    #[tool(
        description = "SDLC phases with goals, activities and exit criteria. Pass phase to get just one."
    )]
    async fn get_sdlc_guidance(
        &self,
        params: Parameters<SdlcGuidanceRequest>,
    ) -> Result<CallToolResult, McpError> {
        Self::success(self.toolbox.sdlc_guidance(params.0.phase.as_deref()))
    }

    #[tool(description = "Engineering standards by area. Pass area to get just one.")]
    async fn get_engineering_standards(
        &self,
        params: Parameters<EngineeringStandardsRequest>,
    ) -> Result<CallToolResult, McpError> {
        Self::success(self.toolbox.engineering_standards(params.0.area.as_deref()))
    }

    #[tool(description = "How to scope, run and conclude a proof of concept.")]
    async fn get_poc_guide(&self) -> Result<CallToolResult, McpError> {
        Self::reply(&guidance::poc_guide(), false)
    }
}

#[tool_handler]
impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: rmcp::model::Implementation {
                name: "vishkar".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            instructions: Some(
                r#"Vishkar serves engineering guidance for the task at hand.

START HERE:
- load_enhanced_context: describe the task in task_statement (or give query_type)
  and receive the contexts, templates, project rules and agent profile to follow
- get_contextual_agent: pass the files you are editing to find the right specialist

OTHER TOOLS:
- analyze_task_intent: see how a task statement is classified
- list_query_types / load_context: browse the library by query type
- list_vishkar_agents / load_vishkar_agent / validate_vishkar_agent_profile
- render_template: fill in a template's {{placeholders}}
- get_sdlc_guidance / get_engineering_standards / get_poc_guide

Follow project rules over library contexts when they conflict."#
                    .into(),
            ),
            ..Default::default()
        }
    }
}

pub async fn run_stdio_server(services: Services) -> anyhow::Result<()> {
    use tokio::io::{stdin, stdout};

    tracing::info!("Starting MCP server via stdio");

    let service = McpServer::new(services);
    let server = service.serve((stdin(), stdout())).await?;

    let quit_reason = server.waiting().await?;
    tracing::info!("MCP server stopped: {:?}", quit_reason);

    Ok(())
}
