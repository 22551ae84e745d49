//! Agent recommendations from file paths.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_AGENT: &str = "a-senior-developer";

const NO_PATHS: &str = "no file paths provided";
const USAGE: &str = "Pass `file_paths` (array of paths) or `file_path` (single path), e.g. \
                     {\"file_paths\": [\"backend/src/main.py\", \"frontend/App.tsx\"]}";

const PLACEHOLDER_ANY: &str = "\u{0}A";

/// Translate a glob into an anchored regex.
///
/// Literal characters are escaped first, then `**` becomes `.*` (crossing
/// separators), `*` becomes `[^/]*` and `?` any single character. `**/`
/// still needs at least one directory, so `**/Dockerfile` does not match a
/// root `Dockerfile`.
pub fn glob_to_regex(glob: &str) -> String {
    let mut pattern = String::with_capacity(glob.len() * 2);
    for ch in glob.chars() {
        match ch {
            '*' | '?' | '/' => pattern.push(ch),
            c if c.is_alphanumeric() || c == '_' || c == '-' => pattern.push(c),
            c => pattern.push_str(&regex::escape(&c.to_string())),
        }
    }

    let pattern = pattern
        .replace("**", PLACEHOLDER_ANY)
        .replace('*', "[^/]*")
        .replace(PLACEHOLDER_ANY, ".*")
        .replace('?', ".");

    format!("^{pattern}$")
}

#[derive(Debug, Clone)]
pub struct PatternRule {
    glob: String,
    regex: Regex,
    agents: Vec<String>,
}

impl PatternRule {
    pub fn new(glob: &str, agents: &[&str]) -> Result<Self, regex::Error> {
        Ok(Self {
            glob: glob.to_string(),
            regex: Regex::new(&glob_to_regex(glob))?,
            agents: agents.iter().map(|a| a.to_string()).collect(),
        })
    }

    pub fn glob(&self) -> &str {
        &self.glob
    }

    pub fn agents(&self) -> &[String] {
        &self.agents
    }

    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

static RULE_TABLE: &[(&str, &[&str])] = &[
    ("backend/**/*.py", &["a-backend-engineer", "a-python-developer"]),
    ("backend/**/*", &["a-backend-engineer"]),
    ("**/*.py", &["a-python-developer"]),
    ("frontend/**/*.tsx", &["a-frontend-developer", "a-react-developer"]),
    ("frontend/**/*.ts", &["a-frontend-developer"]),
    ("**/components/**/*", &["a-frontend-developer", "a-ui-designer"]),
    ("**/*.css", &["a-ui-designer"]),
    ("**/*.scss", &["a-ui-designer"]),
    ("**/api/**/*", &["a-api-designer"]),
    ("**/*.sql", &["a-database-engineer"]),
    ("**/migrations/**/*", &["a-database-engineer"]),
    ("**/Dockerfile", &["a-devops-engineer"]),
    ("**/*.tf", &["a-devops-engineer"]),
    ("**/k8s/**/*", &["a-devops-engineer"]),
    (".github/workflows/*.yml", &["a-devops-engineer"]),
    ("**/auth/**/*", &["a-security-engineer"]),
    ("**/security/**/*", &["a-security-engineer"]),
    ("**/payments/**/*", &["de-payments-expert"]),
    ("**/tests/**/*", &["a-qa-engineer"]),
    ("**/*.test.*", &["a-qa-engineer"]),
    ("**/*_test.*", &["a-qa-engineer"]),
    ("docs/**/*", &["a-technical-writer"]),
    ("**/*.md", &["a-technical-writer"]),
    ("**/*.rs", &["a-rust-engineer"]),
    ("**/*.go", &["a-go-developer"]),
];

static DEFAULT_RULES: LazyLock<Vec<PatternRule>> = LazyLock::new(|| {
    RULE_TABLE
        .iter()
        .map(|(glob, agents)| PatternRule::new(glob, agents).expect("built-in glob is valid"))
        .collect()
});

/// How many matched rules named an agent, across all paths.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentRecommendation {
    pub agent_id: String,
    pub match_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathMatch {
    pub path: String,
    pub patterns: Vec<String>,
    pub agents: Vec<String>,
    /// True when no rule matched and the default agent was assigned.
    pub defaulted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileMatchResult {
    pub files_analyzed: usize,
    pub primary_agent: String,
    pub recommended_agents: Vec<AgentRecommendation>,
    pub matches: Vec<PathMatch>,
}

impl FileMatchResult {
    pub fn agent_ids(&self) -> Vec<&str> {
        self.recommended_agents
            .iter()
            .map(|r| r.agent_id.as_str())
            .collect()
    }
}

/// Usage error returned instead of a result, meant to be shown to the caller
/// as is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchError {
    pub error: String,
    pub usage: String,
}

impl MatchError {
    fn no_paths() -> Self {
        Self {
            error: NO_PATHS.to_string(),
            usage: USAGE.to_string(),
        }
    }
}

fn normalize_path(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    path.trim_start_matches("./").to_string()
}

/// Matches file paths against an ordered rule table.
#[derive(Debug, Clone)]
pub struct FileAgentMatcher {
    rules: Vec<PatternRule>,
    default_agent: String,
}

impl Default for FileAgentMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_AGENT)
    }
}

impl FileAgentMatcher {
    /// Built-in rule table with the given fallback agent.
    pub fn new(default_agent: impl Into<String>) -> Self {
        Self::with_rules(DEFAULT_RULES.clone(), default_agent)
    }

    pub fn with_rules(rules: Vec<PatternRule>, default_agent: impl Into<String>) -> Self {
        Self {
            rules,
            default_agent: default_agent.into(),
        }
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    pub fn default_agent(&self) -> &str {
        &self.default_agent
    }

    /// Every rule matching `path`, in table order.
    pub fn match_path(&self, path: &str) -> PathMatch {
        let path = normalize_path(path);
        let matched: Vec<&PatternRule> = self.rules.iter().filter(|r| r.matches(&path)).collect();

        if matched.is_empty() {
            return PathMatch {
                path,
                patterns: Vec::new(),
                agents: vec![self.default_agent.clone()],
                defaulted: true,
            };
        }

        PathMatch {
            path,
            patterns: matched.iter().map(|r| r.glob.clone()).collect(),
            agents: matched
                .iter()
                .flat_map(|r| r.agents.iter().cloned())
                .collect(),
            defaulted: false,
        }
    }

    /// Rank agents by how often they were matched across `paths`.
    ///
    /// Ties are broken by agent id.
    pub fn recommend<S: AsRef<str>>(&self, paths: &[S]) -> Result<FileMatchResult, MatchError> {
        let paths: Vec<&str> = paths
            .iter()
            .map(AsRef::as_ref)
            .filter(|p| !p.trim().is_empty())
            .collect();
        if paths.is_empty() {
            return Err(MatchError::no_paths());
        }

        let matches: Vec<PathMatch> = paths.iter().map(|p| self.match_path(p)).collect();

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for m in &matches {
            for agent in &m.agents {
                *counts.entry(agent.as_str()).or_default() += 1;
            }
        }

        let mut recommended: Vec<AgentRecommendation> = counts
            .into_iter()
            .map(|(agent_id, match_count)| AgentRecommendation {
                agent_id: agent_id.to_string(),
                match_count,
            })
            .collect();
        recommended.sort_by(|a, b| {
            b.match_count
                .cmp(&a.match_count)
                .then_with(|| a.agent_id.cmp(&b.agent_id))
        });

        tracing::debug!(
            "Matched {} path(s) to {} agent(s)",
            matches.len(),
            recommended.len()
        );

        let primary_agent = recommended
            .first()
            .map(|r| r.agent_id.clone())
            .unwrap_or_else(|| self.default_agent.clone());

        Ok(FileMatchResult {
            files_analyzed: matches.len(),
            primary_agent,
            recommended_agents: recommended,
            matches,
        })
    }
}
