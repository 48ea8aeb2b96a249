use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::jobs::JobStore;
use dashmap::DashMap;
use embedding::{build_provider, EmbeddingProvider};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Rate limit tracking: API key -> (count, window_start)
    pub rate_limiter: Arc<DashMap<String, (u32, std::time::Instant)>>,

    /// Embedding provider shared by every request and job
    pub provider: Arc<dyn EmbeddingProvider>,

    /// Background allocation jobs
    pub jobs: JobStore,
}

impl ServerState {
    /// Create new server state, building the embedding provider from config.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let provider = build_provider(&config.embedding)?;
        Self::with_provider(config, provider)
    }

    /// Create server state around an existing provider.
    pub fn with_provider(
        config: ServerConfig,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> ServerResult<Self> {
        config
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        let jobs = JobStore::new(
            config.max_concurrent_jobs,
            config.job_timeout(),
            config.job_retention,
        );

        Ok(Self {
            config: Arc::new(config),
            rate_limiter: Arc::new(DashMap::new()),
            provider,
            jobs,
        })
    }

    /// Whether `/api/v1/*` requires a key at all.
    pub fn auth_enabled(&self) -> bool {
        !self.config.api_keys.is_empty()
    }

    /// Check if API key is valid
    pub fn is_valid_api_key(&self, key: &str) -> bool {
        self.config.api_keys.contains(key)
    }

    /// Check rate limit for API key
    pub fn check_rate_limit(&self, key: &str) -> bool {
        let now = std::time::Instant::now();
        let window = std::time::Duration::from_secs(60);
        let limit = self.config.rate_limit_per_minute;

        let mut entry = self.rate_limiter.entry(key.to_string()).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        // Reset if window has passed
        if now.duration_since(*window_start) > window {
            *count = 0;
            *window_start = now;
        }

        if *count >= limit {
            return false;
        }

        *count += 1;
        true
    }
}
