//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::storage::config::StorageConfig;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 9999;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default request body limit for submissions (256 KiB, the SQS message ceiling).
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 256 * 1024;

/// Default CORS allowed origin.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "*";

// ============================================================================
// Queue Configuration Constants
// ============================================================================

/// Messages requested per receive call.
pub const DEFAULT_MAX_MESSAGES: i32 = 1;

/// Long-poll wait in seconds (SQS maximum is 20).
pub const DEFAULT_WAIT_TIME_SECS: i32 = 20;

/// Visibility timeout in seconds; longer than the slowest observed job.
pub const DEFAULT_VISIBILITY_TIMEOUT_SECS: i32 = 150;

/// Pause after a failed receive call before polling again.
pub const DEFAULT_POLL_ERROR_BACKOFF_SECS: u64 = 5;

// ============================================================================
// Worker Configuration Constants
// ============================================================================

/// Jobs processed at the same time.
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Archiving program.
pub const DEFAULT_ARCHIVE_PROGRAM: &str = "zip";

/// Archiving program arguments, before the archive path and input directory.
pub const DEFAULT_ARCHIVE_ARGS: &str = "-r -q -D";

/// Timeout for each outbound notification request.
pub const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 30;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub queue: QueueConfig,
    pub worker: WorkerConfig,
    pub storage: StorageConfig,
}

/// HTTP submission endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
    pub body_limit_bytes: usize,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

/// Queue connection and polling configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub url: String,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub max_messages: i32,
    pub wait_time_secs: i32,
    pub visibility_timeout_secs: i32,
    pub poll_error_backoff_secs: u64,
}

impl std::fmt::Debug for QueueConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueConfig")
            .field("url", &self.url)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("static_credentials", &self.access_key_id.is_some())
            .field("max_messages", &self.max_messages)
            .field("wait_time_secs", &self.wait_time_secs)
            .field("visibility_timeout_secs", &self.visibility_timeout_secs)
            .field("poll_error_backoff_secs", &self.poll_error_backoff_secs)
            .finish()
    }
}

impl QueueConfig {
    pub fn poll_error_backoff(&self) -> Duration {
        Duration::from_secs(self.poll_error_backoff_secs)
    }
}

/// Job execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub concurrency: usize,
    pub workspace_root: PathBuf,
    pub archive_program: String,
    pub archive_args: Vec<String>,
    pub notify_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let config = Config {
            server: ServerConfig {
                host: std::env::var("ZIPPER_HOST").unwrap_or(defaults.server.host),
                port: env_parse("ZIPPER_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_parse(
                    "ZIPPER_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ),
                body_limit_bytes: env_parse("ZIPPER_BODY_LIMIT", DEFAULT_BODY_LIMIT_BYTES),
            },
            cors: CorsConfig {
                allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| DEFAULT_CORS_ALLOWED_ORIGIN.to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                allow_credentials: env_parse("CORS_ALLOW_CREDENTIALS", false),
            },
            queue: QueueConfig {
                url: std::env::var("ZIPPER_QUEUE_URL")
                    .map_err(|_| anyhow::anyhow!("ZIPPER_QUEUE_URL must be set"))?,
                region: env_opt("ZIPPER_QUEUE_REGION"),
                endpoint: env_opt("ZIPPER_QUEUE_ENDPOINT"),
                access_key_id: env_opt("ZIPPER_QUEUE_ACCESS_KEY_ID"),
                secret_access_key: env_opt("ZIPPER_QUEUE_SECRET_ACCESS_KEY"),
                max_messages: env_parse("ZIPPER_MAX_MESSAGES", DEFAULT_MAX_MESSAGES),
                wait_time_secs: env_parse("ZIPPER_WAIT_TIME", DEFAULT_WAIT_TIME_SECS),
                visibility_timeout_secs: env_parse(
                    "ZIPPER_VISIBILITY_TIMEOUT",
                    DEFAULT_VISIBILITY_TIMEOUT_SECS,
                ),
                poll_error_backoff_secs: env_parse(
                    "ZIPPER_POLL_ERROR_BACKOFF",
                    DEFAULT_POLL_ERROR_BACKOFF_SECS,
                ),
            },
            worker: WorkerConfig {
                concurrency: env_parse("ZIPPER_CONCURRENCY", DEFAULT_CONCURRENCY),
                workspace_root: env_opt("ZIPPER_WORKSPACE_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.worker.workspace_root),
                archive_program: std::env::var("ZIPPER_ARCHIVE_PROGRAM")
                    .unwrap_or_else(|_| DEFAULT_ARCHIVE_PROGRAM.to_string()),
                archive_args: split_args(
                    &std::env::var("ZIPPER_ARCHIVE_ARGS")
                        .unwrap_or_else(|_| DEFAULT_ARCHIVE_ARGS.to_string()),
                ),
                notify_timeout_secs: env_parse(
                    "ZIPPER_NOTIFY_TIMEOUT",
                    DEFAULT_NOTIFY_TIMEOUT_SECS,
                ),
            },
            storage: StorageConfig::from_env(),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.queue.url.trim().is_empty() {
            anyhow::bail!("Queue URL cannot be empty");
        }

        if !(1..=10).contains(&self.queue.max_messages) {
            anyhow::bail!(
                "Queue max_messages must be between 1 and 10, got {}",
                self.queue.max_messages
            );
        }

        if !(0..=20).contains(&self.queue.wait_time_secs) {
            anyhow::bail!(
                "Queue wait_time_secs must be between 0 and 20, got {}",
                self.queue.wait_time_secs
            );
        }

        if !(0..=43_200).contains(&self.queue.visibility_timeout_secs) {
            anyhow::bail!(
                "Queue visibility_timeout_secs must be between 0 and 43200, got {}",
                self.queue.visibility_timeout_secs
            );
        }

        if self.queue.access_key_id.is_some() != self.queue.secret_access_key.is_some() {
            anyhow::bail!(
                "ZIPPER_QUEUE_ACCESS_KEY_ID and ZIPPER_QUEUE_SECRET_ACCESS_KEY must be set together"
            );
        }

        if self.worker.concurrency == 0 {
            anyhow::bail!("Worker concurrency must be greater than 0");
        }

        if self.worker.archive_program.trim().is_empty() {
            anyhow::bail!("Archive program cannot be empty");
        }

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: false,
            },
            queue: QueueConfig {
                url: String::new(),
                region: None,
                endpoint: None,
                access_key_id: None,
                secret_access_key: None,
                max_messages: DEFAULT_MAX_MESSAGES,
                wait_time_secs: DEFAULT_WAIT_TIME_SECS,
                visibility_timeout_secs: DEFAULT_VISIBILITY_TIMEOUT_SECS,
                poll_error_backoff_secs: DEFAULT_POLL_ERROR_BACKOFF_SECS,
            },
            worker: WorkerConfig {
                concurrency: DEFAULT_CONCURRENCY,
                workspace_root: std::env::temp_dir(),
                archive_program: DEFAULT_ARCHIVE_PROGRAM.to_string(),
                archive_args: split_args(DEFAULT_ARCHIVE_ARGS),
                notify_timeout_secs: DEFAULT_NOTIFY_TIMEOUT_SECS,
            },
            storage: StorageConfig::default(),
        }
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn split_args(args: &str) -> Vec<String> {
    args.split_whitespace().map(str::to_string).collect()
}
