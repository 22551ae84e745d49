use serde::{Deserialize, Serialize};

/// Which backend holds the document library.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    Local,
    Remote,
}

impl StorageMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Some(Self::Local),
            "remote" => Some(Self::Remote),
            _ => None,
        }
    }
}

/// How documents and agent profiles are cached.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// Unbounded in-process map
    Memory,
    /// Entries expire after `ttlSeconds`
    Ttl,
    /// No caching
    None,
}

impl CacheMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "ttl" => Some(Self::Ttl),
            "none" | "off" => Some(Self::None),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Subdirectories {
    pub contexts: String,
    pub templates: String,
    pub agents: String,
    pub projects: String,
    /// File name of a project's rule document inside its directory.
    pub project_rules_file: String,
}

impl Default for Subdirectories {
    fn default() -> Self {
        Self {
            contexts: "contexts".to_string(),
            templates: "templates".to_string(),
            agents: "agents".to_string(),
            projects: "projects".to_string(),
            project_rules_file: "rules.md".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheSettings {
    pub mode: CacheMode,
    pub ttl_seconds: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            mode: CacheMode::Ttl,
            ttl_seconds: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureFlags {
    /// Accept free-text `task_statement` in context requests.
    pub intent_analysis: bool,
    /// Recommend agents: `get_contextual_agent` and the agent section of
    /// context requests.
    pub agent_recommendation: bool,
    /// Default for `include_sdlc_checks` when the caller omits it.
    pub sdlc_checks: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            intent_analysis: true,
            agent_recommendation: true,
            sdlc_checks: false,
        }
    }
}

/// Server-level settings from `server.json`, with environment overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    pub storage_mode: StorageMode,
    /// Directory holding the document library in local mode. Relative paths
    /// resolve against the config directory.
    pub content_root: String,
    pub remote_base_url: Option<String>,
    #[serde(skip_serializing)]
    pub remote_token: Option<String>,
    pub subdirectories: Subdirectories,
    pub cache: CacheSettings,
    pub features: FeatureFlags,
    /// Upper bound on loading the documents for one context request.
    pub request_timeout_ms: u64,
    /// Agent recommended when no file pattern matches.
    pub default_agent: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            storage_mode: StorageMode::Local,
            content_root: "../content".to_string(),
            remote_base_url: None,
            remote_token: None,
            subdirectories: Subdirectories::default(),
            cache: CacheSettings::default(),
            features: FeatureFlags::default(),
            request_timeout_ms: 10_000,
            default_agent: "a-senior-developer".to_string(),
        }
    }
}

impl ServerSettings {
    /// Apply `VISHKAR_*` environment variables on top of the file settings.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(mode) = lookup("VISHKAR_STORAGE_MODE") {
            match StorageMode::from_str(&mode) {
                Some(mode) => self.storage_mode = mode,
                None => tracing::warn!("Ignoring unknown VISHKAR_STORAGE_MODE '{}'", mode),
            }
        }
        if let Some(root) = lookup("VISHKAR_CONTENT_ROOT") {
            self.content_root = root;
        }
        if let Some(url) = lookup("VISHKAR_REMOTE_URL") {
            self.remote_base_url = Some(url);
        }
        if let Some(token) = lookup("VISHKAR_REMOTE_TOKEN") {
            self.remote_token = Some(token);
        }
        if let Some(mode) = lookup("VISHKAR_CACHE_MODE") {
            match CacheMode::from_str(&mode) {
                Some(mode) => self.cache.mode = mode,
                None => tracing::warn!("Ignoring unknown VISHKAR_CACHE_MODE '{}'", mode),
            }
        }
    }
}
