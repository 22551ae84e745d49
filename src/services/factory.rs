use std::sync::{Arc, OnceLock};
use std::time::Duration;

use super::{
    AgentService, ContextService, EnhancedContextService, FileAgentMatcher, IntentAnalyzer,
    ServiceError, TemplateService,
};
use crate::cache::{Cache, MemoryCache, TtlCache};
use crate::config::{CacheMode, CacheSettings, ConfigError, ConfigLoader, StorageMode};
use crate::models::Agent;
use crate::storage::{join_key, CachedStore, ContentStore, LocalStore, RemoteStore};

fn build_cache<V>(settings: &CacheSettings) -> Option<Arc<dyn Cache<V>>>
where
    V: Clone + Send + Sync + 'static,
{
    match settings.mode {
        CacheMode::Memory => Some(Arc::new(MemoryCache::new())),
        CacheMode::Ttl => Some(Arc::new(TtlCache::with_ttl(Duration::from_secs(
            settings.ttl_seconds,
        )))),
        CacheMode::None => None,
    }
}

/// Every service, built from one configuration and one content store.
#[derive(Clone)]
pub struct Services {
    pub config: Arc<ConfigLoader>,
    pub store: Arc<dyn ContentStore>,
    pub contexts: Arc<ContextService>,
    pub templates: Arc<TemplateService>,
    pub agents: Arc<AgentService>,
    pub analyzer: IntentAnalyzer,
    pub matcher: Arc<FileAgentMatcher>,
    pub enhanced: Arc<EnhancedContextService>,
    content_cache: Option<Arc<dyn Cache<String>>>,
    agents_dir: String,
}

impl Services {
    /// Build the storage backend named in the server settings and wire the
    /// services on top of it.
    pub fn build(config: Arc<ConfigLoader>) -> Result<Self, ServiceError> {
        let bundle = config.load()?;
        let settings = &bundle.settings;
        let content_cache = build_cache::<String>(&settings.cache);

        let store: Arc<dyn ContentStore> = match settings.storage_mode {
            StorageMode::Local => {
                let root = bundle.content_root();
                tracing::info!("Serving content from {}", root.display());
                let local = LocalStore::new(root);
                match &content_cache {
                    Some(cache) => Arc::new(CachedStore::new(local, cache.clone())),
                    None => Arc::new(local),
                }
            }
            StorageMode::Remote => {
                let url = settings.remote_base_url.clone().ok_or_else(|| {
                    ConfigError::Invalid(
                        "storageMode is 'remote' but remoteBaseUrl is not set".to_string(),
                    )
                })?;
                tracing::info!("Serving content from remote store {}", url);
                let remote = RemoteStore::new(url, settings.remote_token.clone());
                match &content_cache {
                    Some(cache) => Arc::new(CachedStore::new(remote, cache.clone())),
                    None => Arc::new(remote),
                }
            }
        };

        Self::assemble(config, store, content_cache)
    }

    /// Wire the services over an existing store, without a content cache.
    pub fn with_store(
        config: Arc<ConfigLoader>,
        store: Arc<dyn ContentStore>,
    ) -> Result<Self, ServiceError> {
        Self::assemble(config, store, None)
    }

    fn assemble(
        config: Arc<ConfigLoader>,
        store: Arc<dyn ContentStore>,
        content_cache: Option<Arc<dyn Cache<String>>>,
    ) -> Result<Self, ServiceError> {
        let bundle = config.load()?;
        let settings = &bundle.settings;
        let dirs = &settings.subdirectories;

        let agent_cache: Arc<dyn Cache<Agent>> =
            build_cache(&settings.cache).unwrap_or_else(|| Arc::new(MemoryCache::new()));

        let contexts = Arc::new(ContextService::new(store.clone(), dirs));
        let templates = Arc::new(TemplateService::new(store.clone(), dirs));
        let agents = Arc::new(AgentService::new(store.clone(), dirs, agent_cache));
        let enhanced = Arc::new(EnhancedContextService::new(
            config.clone(),
            contexts.clone(),
            templates.clone(),
            agents.clone(),
        ));

        Ok(Self {
            matcher: Arc::new(FileAgentMatcher::new(settings.default_agent.clone())),
            analyzer: IntentAnalyzer::new(),
            agents_dir: dirs.agents.clone(),
            config,
            store,
            contexts,
            templates,
            agents,
            enhanced,
            content_cache,
        })
    }

    /// Process-wide services built from [`ConfigLoader::global`].
    ///
    /// A failed build is not remembered; the next call tries again.
    pub fn shared() -> Result<Self, ServiceError> {
        static SHARED: OnceLock<Services> = OnceLock::new();
        if let Some(services) = SHARED.get() {
            return Ok(services.clone());
        }

        let built = Self::build(ConfigLoader::global())?;
        Ok(SHARED.get_or_init(|| built).clone())
    }

    /// Drop cached agent profiles, and their cached documents, so the next
    /// load reads the store again.
    pub fn refresh_agents(&self, id: Option<&str>) {
        self.agents.refresh(id);
        if let Some(cache) = &self.content_cache {
            match id {
                Some(id) => cache.delete(&join_key(&[&self.agents_dir, &format!("{id}.md")])),
                None => cache.clear(),
            }
        }
    }
}
