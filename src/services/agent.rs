//! Agent profile library.
//!
//! Profiles are markdown files under the agents directory. Metadata comes
//! from YAML front matter when present:
//!
//! ```text
//! ---
//! name: Backend Engineer
//! description: Designs and operates server-side systems
//! type: technical
//! specializations: [apis, databases]
//! model: sonnet
//! ---
//! # Backend Engineer
//! ...
//! ```
//!
//! Without front matter the first `# ` heading is the name, the first
//! paragraph after it is the description, and bullets under a
//! `## Specializations` heading are the specializations.

use std::sync::Arc;

use futures::future::join_all;
use serde::Deserialize;

use super::{log_omitted, ServiceError};
use crate::cache::Cache;
use crate::config::Subdirectories;
use crate::models::{Agent, AgentSummary, AgentType, NewAgent, ProfileValidation};
use crate::storage::{join_key, ContentStore};

/// Metadata recovered from a profile, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type", alias = "agent_type")]
    pub agent_type: Option<String>,
    #[serde(default, alias = "skills")]
    pub specializations: Vec<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// Result of reading a profile's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedProfile {
    FrontMatter(ProfileMetadata),
    HeadingFallback(ProfileMetadata),
    Failed(String),
}

/// Parse profile metadata: front matter first, markdown headings second.
pub fn parse_profile(content: &str) -> ParsedProfile {
    match extract_front_matter(content) {
        Some(yaml) => match serde_yaml::from_str::<ProfileMetadata>(yaml) {
            Ok(meta) => ParsedProfile::FrontMatter(meta),
            Err(e) => ParsedProfile::Failed(format!("invalid front matter: {}", e)),
        },
        None => parse_headings(content),
    }
}

/// Text between an opening `---` line and the next `---` line.
fn extract_front_matter(content: &str) -> Option<&str> {
    let rest = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some(&rest[..offset]);
        }
        offset += line.len();
    }
    None
}

fn parse_headings(content: &str) -> ParsedProfile {
    let mut meta = ProfileMetadata::default();
    let mut in_specializations = false;

    for line in content.lines() {
        let trimmed = line.trim();

        if let Some(title) = trimmed.strip_prefix("# ") {
            if meta.name.is_none() {
                meta.name = Some(title.trim().to_string());
            }
            in_specializations = false;
            continue;
        }
        if let Some(section) = trimmed.strip_prefix("## ") {
            in_specializations = section.trim().eq_ignore_ascii_case("specializations");
            continue;
        }

        if in_specializations {
            if let Some(item) = trimmed
                .strip_prefix("- ")
                .or_else(|| trimmed.strip_prefix("* "))
            {
                meta.specializations.push(item.trim().to_string());
            }
            continue;
        }

        if meta.name.is_some()
            && meta.description.is_none()
            && !trimmed.is_empty()
            && !trimmed.starts_with('#')
        {
            meta.description = Some(trimmed.to_string());
        }
    }

    if meta.name.is_none() {
        return ParsedProfile::Failed("no front matter and no '# ' heading".to_string());
    }
    ParsedProfile::HeadingFallback(meta)
}

/// Profiles filed under a `domain` directory or prefixed `de-` are domain
/// experts unless their metadata says otherwise.
fn inferred_type(id: &str) -> AgentType {
    let lowered = id.to_ascii_lowercase();
    let file = lowered.rsplit('/').next().unwrap_or(&lowered);
    if lowered.contains("domain") || file.starts_with("de-") {
        AgentType::DomainExpert
    } else {
        AgentType::Technical
    }
}

/// Build an agent from raw profile text.
pub fn build_agent(id: &str, content: &str) -> Result<Agent, ServiceError> {
    let meta = match parse_profile(content) {
        ParsedProfile::FrontMatter(meta) | ParsedProfile::HeadingFallback(meta) => meta,
        ParsedProfile::Failed(reason) => {
            tracing::debug!("Agent '{}' metadata unreadable: {}", id, reason);
            ProfileMetadata::default()
        }
    };

    let agent_type = match meta.agent_type.as_deref() {
        Some(raw) => AgentType::parse(raw)?,
        None => inferred_type(id),
    };

    let agent = Agent::new(NewAgent {
        id: id.to_string(),
        name: meta.name.unwrap_or_default(),
        content: content.to_string(),
        description: meta.description.unwrap_or_default(),
        agent_type,
        specializations: meta.specializations,
        model: meta.model,
    })?;
    Ok(agent)
}

/// Lists, loads, caches and validates agent profiles.
pub struct AgentService {
    store: Arc<dyn ContentStore>,
    agents_dir: String,
    cache: Arc<dyn Cache<Agent>>,
}

impl AgentService {
    pub fn new(
        store: Arc<dyn ContentStore>,
        dirs: &Subdirectories,
        cache: Arc<dyn Cache<Agent>>,
    ) -> Self {
        Self {
            store,
            agents_dir: dirs.agents.clone(),
            cache,
        }
    }

    fn key_for(&self, id: &str) -> String {
        join_key(&[&self.agents_dir, &format!("{id}.md")])
    }

    /// Load a profile by id.
    ///
    /// Returns `Ok(None)` when the profile is missing or unreadable, and an
    /// error when it exists but is malformed.
    pub async fn load(&self, id: &str) -> Result<Option<Agent>, ServiceError> {
        if let Some(agent) = self.cache.get(id) {
            tracing::debug!("Agent cache hit for '{}'", id);
            return Ok(Some(agent));
        }

        let content = match self.store.read(&self.key_for(id)).await {
            Ok(content) => content,
            Err(e) => {
                log_omitted("Agent", id, &e);
                return Ok(None);
            }
        };

        let agent = build_agent(id, &content)?;
        self.cache.set(id, agent.clone());
        Ok(Some(agent))
    }

    /// All agent ids in the library, sorted.
    pub async fn ids(&self) -> Vec<String> {
        let prefix = format!("{}/", self.agents_dir.trim_end_matches('/'));
        let keys = match self.store.list(&prefix).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::error!("Could not list agents: {}", e);
                return Vec::new();
            }
        };

        keys.iter()
            .filter_map(|key| key.strip_prefix(&prefix)?.strip_suffix(".md"))
            .map(str::to_string)
            .collect()
    }

    /// Summaries of every loadable agent, optionally filtered by type.
    pub async fn list(&self, filter: Option<AgentType>) -> Vec<AgentSummary> {
        let ids = self.ids().await;
        let loaded = join_all(ids.iter().map(|id| self.load(id))).await;

        let mut summaries: Vec<AgentSummary> = ids
            .iter()
            .zip(loaded)
            .filter_map(|(id, result)| match result {
                Ok(agent) => agent,
                Err(e) => {
                    tracing::warn!("Skipping agent '{}': {}", id, e);
                    None
                }
            })
            .filter(|agent| filter.map_or(true, |t| agent.agent_type() == t))
            .map(|agent| agent.summary())
            .collect();

        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    /// Load the first agent in `preferred` that exists and is well-formed.
    pub async fn first_available(&self, preferred: &[String]) -> Option<Agent> {
        for id in preferred {
            match self.load(id).await {
                Ok(Some(agent)) => return Some(agent),
                Ok(None) => continue,
                Err(e) => tracing::warn!("Skipping agent '{}': {}", id, e),
            }
        }
        None
    }

    /// Drop one cached profile, or all of them.
    pub fn refresh(&self, id: Option<&str>) {
        match id {
            Some(id) => {
                tracing::info!("Refreshing cached agent '{}'", id);
                self.cache.delete(id);
            }
            None => {
                tracing::info!("Refreshing all cached agents");
                self.cache.clear();
            }
        }
    }

    /// Validate a profile. `Ok(None)` when it does not exist.
    pub async fn validate(
        &self,
        id: &str,
        strict: bool,
    ) -> Result<Option<ProfileValidation>, ServiceError> {
        match self.load(id).await {
            Ok(Some(agent)) => Ok(Some(agent.validate(strict))),
            Ok(None) => Ok(None),
            Err(ServiceError::Model(e)) => Ok(Some(ProfileValidation {
                agent_id: id.to_string(),
                strict,
                valid: false,
                errors: vec![e.to_string()],
                warnings: Vec::new(),
            })),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::storage::LocalStore;

    const FRONT_MATTER: &str = "---\nname: Backend Engineer\ndescription: Designs and operates server-side systems\ntype: technical\nspecializations:\n  - apis\n  - databases\nmodel: sonnet\n---\n# Backend Engineer\n\n## Responsibilities\nOwns services end to end.\n";

    const HEADINGS: &str = "# Payments Expert\n\nKnows card networks, settlement and PCI DSS scope reduction.\n\n## Specializations\n- card payments\n- reconciliation\n\n## Approach\nStart from the money flow.\n";

    #[test]
    fn parses_front_matter() {
        let ParsedProfile::FrontMatter(meta) = parse_profile(FRONT_MATTER) else {
            panic!("expected front matter");
        };
        assert_eq!(meta.name.as_deref(), Some("Backend Engineer"));
        assert_eq!(meta.specializations, vec!["apis", "databases"]);
        assert_eq!(meta.model.as_deref(), Some("sonnet"));
    }

    #[test]
    fn falls_back_to_headings() {
        let ParsedProfile::HeadingFallback(meta) = parse_profile(HEADINGS) else {
            panic!("expected heading fallback");
        };
        assert_eq!(meta.name.as_deref(), Some("Payments Expert"));
        assert_eq!(
            meta.description.as_deref(),
            Some("Knows card networks, settlement and PCI DSS scope reduction.")
        );
        assert_eq!(meta.specializations, vec!["card payments", "reconciliation"]);
    }

    #[test]
    fn reports_unparseable_profiles() {
        assert!(matches!(
            parse_profile("---\nname: [unclosed\n---\nbody"),
            ParsedProfile::Failed(_)
        ));
        assert!(matches!(
            parse_profile("just some text"),
            ParsedProfile::Failed(_)
        ));
    }

    #[test]
    fn infers_type_from_id() {
        let agent = build_agent("de-payments-expert", HEADINGS).unwrap();
        assert_eq!(agent.agent_type(), AgentType::DomainExpert);
        assert_eq!(inferred_type("domain-experts/health"), AgentType::DomainExpert);
        assert_eq!(inferred_type("a-backend-engineer"), AgentType::Technical);
    }

    #[test]
    fn rejects_unknown_declared_type() {
        let content = FRONT_MATTER.replace("type: technical", "type: wizard");
        assert!(matches!(
            build_agent("a-backend-engineer", &content),
            Err(ServiceError::Model(_))
        ));
    }

    async fn setup() -> (tempfile::TempDir, LocalStore, AgentService) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        store
            .write("agents/a-backend-engineer.md", FRONT_MATTER)
            .await
            .unwrap();
        store
            .write("agents/de-payments-expert.md", HEADINGS)
            .await
            .unwrap();
        store.write("agents/broken.md", "tiny").await.unwrap();
        let service = AgentService::new(
            Arc::new(store.clone()),
            &Subdirectories::default(),
            Arc::new(MemoryCache::new()),
        );
        (dir, store, service)
    }

    #[tokio::test]
    async fn lists_and_filters_agents() {
        let (_dir, _store, service) = setup().await;

        let all = service.list(None).await;
        let ids: Vec<&str> = all.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a-backend-engineer", "de-payments-expert"]);

        let experts = service.list(Some(AgentType::DomainExpert)).await;
        assert_eq!(experts.len(), 1);
        assert_eq!(experts[0].id, "de-payments-expert");
    }

    #[tokio::test]
    async fn caches_until_refreshed() {
        let (_dir, store, service) = setup().await;
        let first = service.load("a-backend-engineer").await.unwrap().unwrap();
        assert_eq!(first.name(), "Backend Engineer");

        let renamed = FRONT_MATTER.replace("name: Backend Engineer", "name: Platform Engineer");
        store
            .write("agents/a-backend-engineer.md", &renamed)
            .await
            .unwrap();

        let cached = service.load("a-backend-engineer").await.unwrap().unwrap();
        assert_eq!(cached.name(), "Backend Engineer");

        service.refresh(Some("a-backend-engineer"));
        let fresh = service.load("a-backend-engineer").await.unwrap().unwrap();
        assert_eq!(fresh.name(), "Platform Engineer");
    }

    #[tokio::test]
    async fn validation_reports_malformed_and_missing_profiles() {
        let (_dir, _store, service) = setup().await;

        let broken = service.validate("broken", false).await.unwrap().unwrap();
        assert!(!broken.valid);

        assert!(service.validate("ghost", true).await.unwrap().is_none());

        let strict = service
            .validate("a-backend-engineer", true)
            .await
            .unwrap()
            .unwrap();
        assert!(strict.valid, "{:?}", strict.errors);
    }

    #[tokio::test]
    async fn first_available_skips_missing_and_broken() {
        let (_dir, _store, service) = setup().await;
        let preferred = vec![
            "ghost".to_string(),
            "broken".to_string(),
            "de-payments-expert".to_string(),
        ];
        let agent = service.first_available(&preferred).await.unwrap();
        assert_eq!(agent.id(), "de-payments-expert");
    }
}
