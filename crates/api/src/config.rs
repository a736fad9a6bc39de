use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    /// Firebase Cloud Messaging configuration
    #[serde(default)]
    pub fcm: FcmConfig,
    /// Push dispatch configuration
    #[serde(default)]
    pub push: PushConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: config.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Shared secret for the admin routes (`X-Admin-Key`). Admin routes answer
    /// 503 while this is empty.
    #[serde(default)]
    pub admin_api_key: String,
}

/// Firebase Cloud Messaging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FcmConfig {
    /// Whether FCM delivery is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Firebase project id
    #[serde(default)]
    pub project_id: String,

    /// Service account credentials: inline JSON or a path to the JSON file
    #[serde(default)]
    pub credentials: String,

    /// HTTP timeout for FCM requests in milliseconds
    #[serde(default = "default_fcm_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries on 5xx and transport errors
    #[serde(default = "default_fcm_max_retries")]
    pub max_retries: u32,

    /// Send with high Android/APNs priority
    #[serde(default)]
    pub high_priority: bool,
}

impl Default for FcmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            project_id: String::new(),
            credentials: String::new(),
            timeout_ms: default_fcm_timeout_ms(),
            max_retries: default_fcm_max_retries(),
            high_priority: false,
        }
    }
}

/// Push dispatch configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    /// Master switch for the dispatcher (scheduled sweep and admin triggers)
    #[serde(default = "default_push_enabled")]
    pub enabled: bool,

    /// Notifications handled per dispatcher pass
    #[serde(default = "default_push_batch_size")]
    pub batch_size: i64,

    /// Seconds between scheduled dispatcher passes
    #[serde(default = "default_push_interval_secs")]
    pub interval_secs: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: default_push_enabled(),
            batch_size: default_push_batch_size(),
            interval_secs: default_push_interval_secs(),
        }
    }
}

impl From<&PushConfig> for domain::services::DispatchConfig {
    fn from(config: &PushConfig) -> Self {
        Self {
            enabled: config.enabled,
            batch_size: config.batch_size,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    2
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_fcm_timeout_ms() -> u64 {
    10_000
}
fn default_fcm_max_retries() -> u32 {
    3
}
fn default_push_enabled() -> bool {
    true
}
fn default_push_batch_size() -> i64 {
    100
}
fn default_push_interval_secs() -> u64 {
    60
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with BN__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("BN").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Builds from embedded defaults so tests do not depend on config files.
    /// Validation is skipped to allow partial configs.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30

            [database]
            url = ""
            max_connections = 20
            min_connections = 2
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [security]
            cors_origins = []
            admin_api_key = ""

            [fcm]
            enabled = false
            project_id = ""
            credentials = ""
            timeout_ms = 10000
            max_retries = 3
            high_priority = false

            [push]
            enabled = true
            batch_size = 100
            interval_secs = 60
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "BN__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.push.batch_size <= 0 {
            return Err(ConfigValidationError::InvalidValue(
                "push.batch_size must be greater than 0".to_string(),
            ));
        }

        if self.push.interval_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "push.interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.fcm.enabled {
            if self.fcm.project_id.is_empty() {
                return Err(ConfigValidationError::MissingRequired(
                    "fcm.project_id is required when FCM is enabled".to_string(),
                ));
            }
            if self.fcm.credentials.is_empty() {
                return Err(ConfigValidationError::MissingRequired(
                    "fcm.credentials is required when FCM is enabled".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
