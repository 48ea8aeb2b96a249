use allocator::AllocationConfig;
use embedding::EmbeddingConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Rate limit: requests per minute per API key
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,

    /// API keys for `/api/v1/*`. Empty disables authentication.
    #[serde(default)]
    pub api_keys: HashSet<String>,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Student roster used by `/process-data` and by jobs that omit one
    #[serde(default = "default_students_path")]
    pub students_path: PathBuf,

    /// Supervisor roster used by `/process-data` and by jobs that omit one
    #[serde(default = "default_supervisors_path")]
    pub supervisors_path: PathBuf,

    /// Allocation jobs allowed to run at once; the rest wait for a permit
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Wall-clock budget for one job (embedding included)
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    /// Finished jobs kept for lookup before the oldest are dropped
    #[serde(default = "default_job_retention")]
    pub job_retention: usize,

    #[serde(default)]
    pub allocation: AllocationConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
            api_keys: HashSet::new(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
            students_path: default_students_path(),
            supervisors_path: default_supervisors_path(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            job_timeout_secs: default_job_timeout_secs(),
            job_retention: default_job_retention(),
            allocation: AllocationConfig::default(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from an optional `topicmatch` config file and
    /// `TOPICMATCH__*` environment variables (e.g. `TOPICMATCH__PORT`,
    /// `TOPICMATCH__EMBEDDING__MODE`).
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::with_name("topicmatch").required(false))
            // Override with environment variables
            .add_source(
                config::Environment::with_prefix("TOPICMATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("api_keys")
                    .try_parsing(true),
            );

        let config: ServerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        if config.api_keys.is_empty() {
            tracing::warn!("No API keys configured, /api/v1 routes are unauthenticated");
        }

        Ok(config)
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_concurrent_jobs == 0 {
            anyhow::bail!("max_concurrent_jobs must be greater than zero");
        }
        if self.job_timeout_secs == 0 {
            anyhow::bail!("job_timeout_secs must be greater than zero");
        }
        self.allocation.validate()?;
        Ok(())
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_body_size_mb() -> usize {
    10
}

fn default_rate_limit_per_minute() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_students_path() -> PathBuf {
    PathBuf::from("data/List_of_Topics.json")
}

fn default_supervisors_path() -> PathBuf {
    PathBuf::from("data/List_of_research_areas.json")
}

fn default_max_concurrent_jobs() -> usize {
    2
}

fn default_job_timeout_secs() -> u64 {
    600
}

fn default_job_retention() -> usize {
    100
}
