//! MCP server integration tests.
//!
//! Tests are organized into three sections:
//! - Registration: the tool router and server info
//! - Context and agent tools
//! - Templates and guidance

use std::collections::HashMap;
use std::sync::Arc;

use rmcp::ServerHandler;
use serde_json::json;
use vishkar_mcp::config::ConfigLoader;
use vishkar_mcp::mcp::McpServer;
use vishkar_mcp::services::Services;
use vishkar_mcp::tools::*;

/// Helper to create a test MCP server over the repository library.
fn setup() -> McpServer {
    let config = ConfigLoader::new(concat!(env!("CARGO_MANIFEST_DIR"), "/config"));
    let services = Services::build(Arc::new(config)).expect("Failed to build services");
    McpServer::new(services)
}

// ============================================================
// Registration
// ============================================================

mod registration {
    use super::*;

    #[test]
    fn router_and_definitions_agree() {
        let server = setup();

        let mut defined: Vec<String> = tool_definitions().into_iter().map(|t| t.name).collect();
        defined.sort();

        assert_eq!(server.tool_names(), defined);
        assert_eq!(defined.len(), 13);
    }

    #[test]
    fn server_info_names_vishkar() {
        let server = setup();

        let info = server.get_info();

        assert_eq!(info.server_info.name, "vishkar");
        assert!(info.capabilities.tools.is_some());
        assert!(info
            .instructions
            .is_some_and(|i| i.contains("load_enhanced_context")));
    }
}

// ============================================================
// Context and agent tools
// ============================================================

mod context_tools {
    use super::*;

    #[tokio::test]
    async fn list_query_types_describes_each_type() {
        let server = setup();

        let list = server.toolbox().list_query_types().expect("lists");

        assert_eq!(list.query_types.len(), 12);
        assert!(list.query_types.iter().all(|q| !q.description.is_empty()));
    }

    #[tokio::test]
    async fn load_context_returns_mapped_documents() {
        let server = setup();

        let mapped = server.toolbox().load_context("pr-review").await.expect("loads");

        assert_eq!(mapped.query_type, "pr-review");
        assert!(mapped
            .contexts
            .iter()
            .any(|c| c.name() == "code-review-checklist"));
    }

    #[tokio::test]
    async fn load_context_rejects_unknown_types() {
        let server = setup();

        let err = server.toolbox().load_context("poetry").await.unwrap_err();

        assert_eq!(err.code(), METHOD_NOT_FOUND);
        assert!(err.to_string().contains("Allowed values"));
    }

    #[tokio::test]
    async fn call_dispatches_by_name() {
        let server = setup();

        let reply = server
            .toolbox()
            .call(
                ANALYZE_TASK_INTENT,
                json!({ "task_statement": "Break down the checkout feature into sub-tasks" }),
            )
            .await
            .expect("tool runs");

        assert!(!reply.is_error);
        assert_eq!(reply.payload["query_type"], "story-breakdown");
    }

    #[tokio::test]
    async fn call_requires_arguments_for_required_fields() {
        let server = setup();

        let err = server
            .toolbox()
            .call(LOAD_AGENT, json!(null))
            .await
            .unwrap_err();

        assert_eq!(err.code(), INVALID_PARAMS);
    }
}

mod agent_tools {
    use super::*;

    #[tokio::test]
    async fn contextual_agent_includes_details_on_request() {
        let server = setup();

        let response = server
            .toolbox()
            .get_contextual_agent(GetContextualAgentRequest {
                file_path: Some("infra/main.tf".to_string()),
                include_agent_details: Some(true),
                ..Default::default()
            })
            .await
            .expect("recommends");

        let ContextualAgentResponse::Recommended(rec) = response else {
            panic!("expected a recommendation");
        };
        assert_eq!(rec.result.primary_agent, "a-devops-engineer");
        let details = rec.agent_details.expect("details requested");
        assert_eq!(details[0].id(), "a-devops-engineer");
    }

    #[tokio::test]
    async fn contextual_agent_explains_usage_without_paths() {
        let server = setup();

        let response = server
            .toolbox()
            .get_contextual_agent(GetContextualAgentRequest::default())
            .await
            .expect("responds");

        assert!(matches!(response, ContextualAgentResponse::Usage(_)));
    }

    #[tokio::test]
    async fn list_agents_filters_by_type() {
        let server = setup();

        let technical = server
            .toolbox()
            .list_agents(Some("technical"))
            .await
            .expect("lists");
        let all = server.toolbox().list_agents(None).await.expect("lists");

        assert_eq!(technical.agent_type, "technical");
        assert_eq!(all.agent_type, "all");
        assert_eq!(technical.total + 2, all.total);
    }

    #[tokio::test]
    async fn load_agent_reports_missing_profiles() {
        let server = setup();

        let err = server.toolbox().load_agent("a-wizard").await.unwrap_err();

        assert!(matches!(err, ToolError::Failed(_)));
    }

    #[tokio::test]
    async fn validates_profiles_in_strict_mode() {
        let server = setup();

        let report = server
            .toolbox()
            .validate_agent_profile("de-payments-expert", true)
            .await
            .expect("validates");

        assert!(report.valid);
        assert!(report.strict);
    }

    #[tokio::test]
    async fn refresh_reports_its_scope() {
        let server = setup();

        assert_eq!(server.toolbox().refresh_agent_cache(None).refreshed, "all");
        assert_eq!(
            server
                .toolbox()
                .refresh_agent_cache(Some("a-qa-engineer"))
                .refreshed,
            "a-qa-engineer"
        );
    }
}

// ============================================================
// Templates and guidance
// ============================================================

mod templates_and_guidance {
    use super::*;

    #[tokio::test]
    async fn renders_library_templates() {
        let server = setup();

        let mut variables = HashMap::new();
        variables.insert("title".to_string(), "Password reset".to_string());

        let rendered = server
            .toolbox()
            .render_template(RenderTemplateRequest {
                template_name: Some("user-story".to_string()),
                template_content: None,
                variables,
            })
            .await
            .expect("renders");

        assert!(rendered.content.starts_with("# Password reset"));
        assert!(rendered.unresolved.contains(&"persona".to_string()));
    }

    #[tokio::test]
    async fn renders_custom_content() {
        let server = setup();

        let mut variables = HashMap::new();
        variables.insert("name".to_string(), "Ada".to_string());

        let rendered = server
            .toolbox()
            .render_template(RenderTemplateRequest {
                template_name: None,
                template_content: Some("Hello {{name}}".to_string()),
                variables,
            })
            .await
            .expect("renders");

        assert_eq!(rendered.content, "Hello Ada");
        assert!(rendered.unresolved.is_empty());
    }

    #[tokio::test]
    async fn render_needs_a_name_or_content() {
        let server = setup();

        let err = server
            .toolbox()
            .render_template(RenderTemplateRequest::default())
            .await
            .unwrap_err();

        assert_eq!(err.code(), INVALID_PARAMS);
    }

    #[test]
    fn sdlc_guidance_filters_by_phase() {
        let server = setup();

        let all = server.toolbox().sdlc_guidance(None).expect("all phases");
        let testing = server
            .toolbox()
            .sdlc_guidance(Some("testing"))
            .expect("one phase");

        assert_eq!(all.phases.len(), 6);
        assert_eq!(testing.phases.len(), 1);
        assert_eq!(testing.phases[0].name, "testing");
        assert!(server.toolbox().sdlc_guidance(Some("vibes")).is_err());
    }

    #[test]
    fn engineering_standards_filter_by_area() {
        let server = setup();

        let security = server
            .toolbox()
            .engineering_standards(Some("security"))
            .expect("one area");

        assert_eq!(security.areas.len(), 1);
        assert!(!security.areas[0].rules.is_empty());
    }
}
