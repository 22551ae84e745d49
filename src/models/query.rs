use serde::{Deserialize, Serialize};

/// Structured parameters a context request is matched with.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryParams {
    pub query_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain_focus: Vec<String>,
    #[serde(default)]
    pub include_sdlc_checks: bool,
}

impl QueryParams {
    pub fn new(query_type: impl Into<String>) -> Self {
        Self {
            query_type: query_type.into(),
            ..Default::default()
        }
    }

    pub fn task_intent(mut self, intent: impl Into<String>) -> Self {
        self.task_intent = Some(intent.into());
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn complexity(mut self, complexity: impl Into<String>) -> Self {
        self.complexity = Some(complexity.into());
        self
    }

    pub fn output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = Some(format.into());
        self
    }

    pub fn domain_focus<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.domain_focus = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn include_sdlc_checks(mut self, include: bool) -> Self {
        self.include_sdlc_checks = include;
        self
    }
}

/// Classification of a free-text task statement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyzedIntent {
    pub query_type: String,
    pub task_intent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain_focus: Vec<String>,
    /// Overall confidence in `[0, 1]`.
    pub confidence: f64,
    pub reasoning: Vec<String>,
}
