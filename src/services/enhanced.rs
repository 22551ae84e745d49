//! The context request pipeline.
//!
//! 1. Resolve structured parameters from the request, analyzing the task
//!    statement when one is given. Explicit fields win over inferred ones.
//! 2. Pick the best combination and collect its base and conditional
//!    contexts.
//! 3. Load contexts, templates, project rules and the agent concurrently,
//!    bounded by the configured request timeout.
//! 4. Assemble the result and its markdown rendering.
//!
//! [`EnhancedContextService::load`] never returns an error: failures come
//! back as a [`ContextFailure`] so the transport can hand them over as is.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{
    AgentService, CombinationService, ContextService, IntentAnalyzer, ServiceError,
    TemplateService,
};
use crate::config::{ConfigError, ConfigLoader, QueryMappings, ServerSettings};
use crate::models::{
    Agent, AnalyzedIntent, Context, QueryParams, SelectedContext, SelectionSource, Template,
};

/// A context request as received from a caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct EnhancedContextRequest {
    #[schemars(
        description = "Query type, e.g. 'story', 'epic', 'security'. Required unless task_statement is given"
    )]
    #[serde(default)]
    pub query_type: Option<String>,
    #[schemars(
        description = "Free-text description of the task. Analyzed to infer any field not given explicitly"
    )]
    #[serde(default)]
    pub task_statement: Option<String>,
    #[schemars(description = "create, refine, breakdown, review, plan or implement")]
    #[serde(default)]
    pub task_intent: Option<String>,
    #[schemars(description = "epic, story, subtask, portfolio, theme or spike")]
    #[serde(default)]
    pub scope: Option<String>,
    #[schemars(description = "simple, medium, complex or critical")]
    #[serde(default)]
    pub complexity: Option<String>,
    #[schemars(description = "jira, confluence, github or gitlab")]
    #[serde(default)]
    pub output_format: Option<String>,
    #[schemars(description = "Domains to focus on, e.g. ['security', 'payments']")]
    #[serde(default)]
    pub domain_focus: Option<Vec<String>>,
    #[schemars(description = "Include SDLC checklist contexts")]
    #[serde(default)]
    pub include_sdlc_checks: Option<bool>,
    #[schemars(description = "The user's original request, echoed in the document header")]
    #[serde(default)]
    pub user_query: Option<String>,
    #[schemars(
        description = "Project directory, relative to the projects library, whose rules.md should be included"
    )]
    #[serde(default)]
    pub project_path: Option<String>,
    #[schemars(description = "Extra context text to include as is")]
    #[serde(default)]
    pub additional_context: Option<String>,
}

impl EnhancedContextRequest {
    pub fn for_query_type(query_type: impl Into<String>) -> Self {
        Self {
            query_type: Some(query_type.into()),
            ..Default::default()
        }
    }

    pub fn for_statement(statement: impl Into<String>) -> Self {
        Self {
            task_statement: Some(statement.into()),
            ..Default::default()
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CombinationSummary {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// A loaded context with the reason it was selected.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LoadedContext {
    #[serde(flatten)]
    pub context: Context,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionSource>,
    pub reason: String,
}

/// Result of a successful context request.
#[derive(Debug, Clone, Serialize)]
pub struct EnhancedContext {
    pub params: QueryParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalyzedIntent>,
    pub combination: CombinationSummary,
    pub reasoning: Vec<String>,
    pub contexts: Vec<LoadedContext>,
    pub templates: Vec<Template>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<Agent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_rules: Option<Context>,
    pub guidance: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_query: Option<String>,
    /// Markdown rendering of everything above.
    pub document: String,
}

impl EnhancedContext {
    pub fn context_names(&self) -> Vec<&str> {
        self.contexts.iter().map(|c| c.context.name()).collect()
    }
}

/// Error-shaped result of a context request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContextFailure {
    pub is_error: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
}

impl From<&ServiceError> for ContextFailure {
    fn from(err: &ServiceError) -> Self {
        let allowed_values = match err {
            ServiceError::InvalidQueryType { allowed, .. } => Some(allowed.clone()),
            _ => None,
        };
        Self {
            is_error: true,
            message: err.to_string(),
            allowed_values,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ContextOutcome {
    Loaded(Box<EnhancedContext>),
    Failed(ContextFailure),
}

impl ContextOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn loaded(&self) -> Option<&EnhancedContext> {
        match self {
            Self::Loaded(ctx) => Some(ctx),
            Self::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ContextFailure> {
        match self {
            Self::Loaded(_) => None,
            Self::Failed(f) => Some(f),
        }
    }
}

/// Documents listed for a query type in the mappings document.
#[derive(Debug, Clone, Serialize)]
pub struct MappedContext {
    pub query_type: String,
    pub description: String,
    pub contexts: Vec<Context>,
    pub templates: Vec<Template>,
}

/// Turn a request into query parameters.
///
/// Returns the analysis too when the task statement was analyzed.
pub fn resolve_params(
    request: &EnhancedContextRequest,
    mappings: &QueryMappings,
    settings: &ServerSettings,
    analyzer: &IntentAnalyzer,
) -> Result<(QueryParams, Option<AnalyzedIntent>), ServiceError> {
    let explicit_type = non_blank(&request.query_type).map(|t| t.to_lowercase());
    let statement = non_blank(&request.task_statement);

    let analysis = match statement {
        Some(text) if settings.features.intent_analysis => Some(analyzer.analyze(&text)),
        Some(_) if explicit_type.is_none() => {
            return Err(ServiceError::FeatureDisabled("Intent analysis"));
        }
        Some(_) => {
            tracing::debug!("Intent analysis disabled, ignoring task statement");
            None
        }
        None => None,
    };

    let query_type = explicit_type
        .or_else(|| analysis.as_ref().map(|a| a.query_type.clone()))
        .ok_or(ServiceError::MissingQueryType)?;

    if !mappings.is_allowed(&query_type) {
        return Err(ServiceError::InvalidQueryType {
            value: query_type,
            allowed: mappings.allowed_query_types.clone(),
        });
    }

    let inferred = analysis.as_ref();
    let domain_focus = match &request.domain_focus {
        Some(domains) if !domains.is_empty() => domains.clone(),
        _ => inferred.map(|a| a.domain_focus.clone()).unwrap_or_default(),
    };

    let params = QueryParams {
        query_type,
        task_intent: non_blank(&request.task_intent)
            .or_else(|| inferred.map(|a| a.task_intent.clone())),
        scope: non_blank(&request.scope).or_else(|| inferred.and_then(|a| a.scope.clone())),
        complexity: non_blank(&request.complexity)
            .or_else(|| inferred.and_then(|a| a.complexity.clone())),
        output_format: non_blank(&request.output_format)
            .or_else(|| inferred.and_then(|a| a.output_format.clone())),
        domain_focus,
        include_sdlc_checks: request
            .include_sdlc_checks
            .unwrap_or(settings.features.sdlc_checks),
    };

    Ok((params, analysis))
}

/// Keep the first selection of each context name.
fn dedup_selections(selected: Vec<SelectedContext>) -> Vec<SelectedContext> {
    let mut seen = HashSet::new();
    selected
        .into_iter()
        .filter(|s| seen.insert(s.name.clone()))
        .collect()
}

/// Runs context requests end to end.
pub struct EnhancedContextService {
    config: Arc<ConfigLoader>,
    analyzer: IntentAnalyzer,
    contexts: Arc<ContextService>,
    templates: Arc<TemplateService>,
    agents: Arc<AgentService>,
}

impl EnhancedContextService {
    pub fn new(
        config: Arc<ConfigLoader>,
        contexts: Arc<ContextService>,
        templates: Arc<TemplateService>,
        agents: Arc<AgentService>,
    ) -> Self {
        Self {
            config,
            analyzer: IntentAnalyzer::new(),
            contexts,
            templates,
            agents,
        }
    }

    pub async fn load(&self, request: EnhancedContextRequest) -> ContextOutcome {
        match self.try_load(request).await {
            Ok(ctx) => ContextOutcome::Loaded(Box::new(ctx)),
            Err(e) => {
                if e.is_validation() {
                    tracing::warn!("Context request rejected: {}", e);
                } else {
                    tracing::error!("Context request failed: {}", e);
                }
                ContextOutcome::Failed(ContextFailure::from(&e))
            }
        }
    }

    pub async fn try_load(
        &self,
        request: EnhancedContextRequest,
    ) -> Result<EnhancedContext, ServiceError> {
        let bundle = self.config.load()?;
        let settings = &bundle.settings;

        let (params, analysis) =
            resolve_params(&request, &bundle.mappings, settings, &self.analyzer)?;

        let combinations = CombinationService::new(bundle.catalog.clone());
        let combination = combinations.find_best(&params).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "default combination '{}' is missing",
                bundle.catalog.default_combination
            ))
        })?;

        let selections = dedup_selections(combinations.all_contexts(combination, &params));
        let names: Vec<String> = selections.iter().map(|s| s.name.clone()).collect();

        let template_names = if combination.templates.is_empty() {
            bundle
                .mappings
                .get(&params.query_type)
                .map(|m| m.templates.clone())
                .unwrap_or_default()
        } else {
            combination.templates.clone()
        };

        let mut preferred = combination.agents.clone();
        if !preferred.contains(&settings.default_agent) {
            preferred.push(settings.default_agent.clone());
        }
        let recommend_agent = settings.features.agent_recommendation;

        let project_path = non_blank(&request.project_path);
        let fan_out = async {
            tokio::join!(
                self.contexts.load_many(&names),
                self.templates.load_many(&template_names),
                async {
                    match &project_path {
                        Some(path) => self.contexts.load_project_rules(path).await,
                        None => Ok(None),
                    }
                },
                async {
                    if recommend_agent {
                        self.agents.first_available(&preferred).await
                    } else {
                        None
                    }
                },
            )
        };

        let timeout_ms = settings.request_timeout_ms;
        let (loaded, templates, rules, agent) = if timeout_ms == 0 {
            fan_out.await
        } else {
            tokio::time::timeout(Duration::from_millis(timeout_ms), fan_out)
                .await
                .map_err(|_| ServiceError::Timeout(timeout_ms))?
        };
        let project_rules = rules?;

        let by_name: HashMap<&str, &SelectedContext> =
            selections.iter().map(|s| (s.name.as_str(), s)).collect();
        let mut contexts: Vec<LoadedContext> = loaded
            .into_iter()
            .map(|context| {
                let selection = by_name.get(context.name()).copied();
                LoadedContext {
                    selection: selection.map(|s| s.source),
                    reason: selection.map(|s| s.reason.clone()).unwrap_or_default(),
                    context,
                }
            })
            .collect();

        if let Some(text) = non_blank(&request.additional_context) {
            contexts.push(LoadedContext {
                context: Context::custom("additional-context", text)?,
                selection: None,
                reason: "supplied with the request".to_string(),
            });
        }

        let mut reasoning = analysis
            .as_ref()
            .map(|a| a.reasoning.clone())
            .unwrap_or_default();
        reasoning.extend(combinations.explain(combination, &params));

        tracing::info!(
            "Context for '{}' via '{}': {} context(s), {} template(s), agent {}",
            params.query_type,
            combination.id,
            contexts.len(),
            templates.len(),
            agent.as_ref().map_or("none", |a| a.id())
        );

        let mut result = EnhancedContext {
            combination: CombinationSummary {
                id: combination.id.clone(),
                name: combination.name.clone(),
                description: combination.description.clone(),
            },
            guidance: combination.guidance.clone(),
            params,
            analysis,
            reasoning,
            contexts,
            templates,
            agent,
            project_rules,
            user_query: non_blank(&request.user_query).or_else(|| non_blank(&request.task_statement)),
            document: String::new(),
        };
        result.document = render_document(&result);
        Ok(result)
    }

    /// Basic mode: the contexts and templates the mappings document lists
    /// for a query type, without scoring.
    pub async fn load_mapped(&self, query_type: &str) -> Result<MappedContext, ServiceError> {
        let bundle = self.config.load()?;
        let query_type = query_type.trim().to_lowercase();
        if !bundle.mappings.is_allowed(&query_type) {
            return Err(ServiceError::InvalidQueryType {
                value: query_type,
                allowed: bundle.mappings.allowed_query_types.clone(),
            });
        }

        let Some(mapping) = bundle.mappings.get(&query_type) else {
            tracing::warn!("No document mapping for query type '{}'", query_type);
            return Ok(MappedContext {
                query_type,
                description: String::new(),
                contexts: Vec::new(),
                templates: Vec::new(),
            });
        };

        let (contexts, templates) = tokio::join!(
            self.contexts.load_many(&mapping.contexts),
            self.templates.load_many(&mapping.templates),
        );

        Ok(MappedContext {
            description: mapping.description.clone(),
            query_type,
            contexts,
            templates,
        })
    }
}

/// Render a context result as one markdown document.
pub fn render_document(ctx: &EnhancedContext) -> String {
    let mut doc = String::new();

    let _ = writeln!(doc, "# Context: {}", ctx.params.query_type);
    let _ = writeln!(
        doc,
        "\n**Combination:** {} (`{}`)",
        ctx.combination.name, ctx.combination.id
    );
    if let Some(query) = &ctx.user_query {
        let _ = writeln!(doc, "**Request:** {}", query);
    }
    if let Some(analysis) = &ctx.analysis {
        let _ = writeln!(doc, "**Confidence:** {:.2}", analysis.confidence);
    }

    if !ctx.reasoning.is_empty() {
        doc.push_str("\n## Reasoning\n\n");
        for line in &ctx.reasoning {
            let _ = writeln!(doc, "- {}", line);
        }
    }

    if let Some(agent) = &ctx.agent {
        let _ = writeln!(doc, "\n## Agent: {}\n", agent.name());
        if !agent.description().is_empty() {
            let _ = writeln!(doc, "{}\n", agent.description());
        }
        if !agent.specializations().is_empty() {
            let _ = writeln!(
                doc,
                "Specializations: {}\n",
                agent.specializations().join(", ")
            );
        }
        let _ = writeln!(doc, "{}", agent.content().trim());
    }

    if !ctx.contexts.is_empty() {
        doc.push_str("\n## Contexts\n");
        for loaded in &ctx.contexts {
            let _ = writeln!(
                doc,
                "\n### {} ({})\n",
                loaded.context.name(),
                loaded.context.source().as_str()
            );
            if !loaded.reason.is_empty() {
                let _ = writeln!(doc, "_{}_\n", loaded.reason);
            }
            let _ = writeln!(doc, "{}", loaded.context.content().trim());
        }
    }

    if !ctx.templates.is_empty() {
        doc.push_str("\n## Templates\n");
        for template in &ctx.templates {
            let _ = writeln!(doc, "\n### {}\n", template.name());
            let variables = template.variables();
            if !variables.is_empty() {
                let _ = writeln!(doc, "Variables: {}\n", variables.join(", "));
            }
            let _ = writeln!(doc, "{}", template.content().trim());
        }
    }

    if let Some(rules) = &ctx.project_rules {
        let _ = writeln!(doc, "\n## Project Rules: {}\n", rules.name());
        let _ = writeln!(doc, "{}", rules.content().trim());
    }

    if !ctx.guidance.is_empty() {
        doc.push_str("\n## Guidance\n\n");
        for (key, value) in &ctx.guidance {
            let _ = writeln!(doc, "- **{}**: {}", key, value);
        }
    }

    doc
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn mappings() -> QueryMappings {
        QueryMappings {
            mappings: BTreeMap::new(),
            allowed_query_types: vec!["story".to_string(), "security".to_string()],
        }
    }

    #[test]
    fn explicit_fields_win_over_analysis() {
        let request = EnhancedContextRequest {
            query_type: Some("Story".to_string()),
            task_statement: Some("Review the security of our critical payments API".to_string()),
            complexity: Some("simple".to_string()),
            ..Default::default()
        };
        let (params, analysis) = resolve_params(
            &request,
            &mappings(),
            &ServerSettings::default(),
            &IntentAnalyzer::new(),
        )
        .unwrap();

        let analysis = analysis.expect("statement analyzed");
        assert_eq!(analysis.complexity.as_deref(), Some("critical"));
        assert_eq!(params.query_type, "story");
        assert_eq!(params.complexity.as_deref(), Some("simple"));
        assert_eq!(params.task_intent.as_deref(), Some("review"));
        assert!(params.domain_focus.contains(&"payments".to_string()));
    }

    #[test]
    fn missing_query_type_is_rejected() {
        let err = resolve_params(
            &EnhancedContextRequest::default(),
            &mappings(),
            &ServerSettings::default(),
            &IntentAnalyzer::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::MissingQueryType));
    }

    #[test]
    fn unknown_query_type_lists_allowed_values() {
        let err = resolve_params(
            &EnhancedContextRequest::for_query_type("poetry"),
            &mappings(),
            &ServerSettings::default(),
            &IntentAnalyzer::new(),
        )
        .unwrap_err();
        let failure = ContextFailure::from(&err);
        assert!(failure.is_error);
        assert_eq!(
            failure.allowed_values,
            Some(vec!["story".to_string(), "security".to_string()])
        );
    }

    #[test]
    fn disabled_analysis_requires_query_type() {
        let mut settings = ServerSettings::default();
        settings.features.intent_analysis = false;
        let err = resolve_params(
            &EnhancedContextRequest::for_statement("write a story"),
            &mappings(),
            &settings,
            &IntentAnalyzer::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::FeatureDisabled(_)));
    }

    #[test]
    fn dedup_keeps_first_selection() {
        let selected = vec![
            SelectedContext {
                name: "a".to_string(),
                source: SelectionSource::Base,
                reason: "base".to_string(),
            },
            SelectedContext {
                name: "a".to_string(),
                source: SelectionSource::Conditional,
                reason: "rule".to_string(),
            },
        ];
        let deduped = dedup_selections(selected);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].source, SelectionSource::Base);
    }
}
