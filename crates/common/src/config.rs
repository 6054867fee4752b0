use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use validator::{Validate, ValidationError};

// Default constants
pub const DEFAULT_DIALECT: &str = "sqlite3";
pub const DEFAULT_DATABASE_URL: &str = ":memory:";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_SLOW_QUERY_THRESHOLD_MS: u64 = 200;

pub const ENV_PREFIX: &str = "TESSERA";

const KNOWN_DIALECTS: &[&str] = &["mysql", "postgres", "postgresql", "sqlite3", "sqlite"];

#[derive(Debug, Deserialize, Default, Clone, Validate)]
pub struct AppConfig {
    #[serde(default)]
    #[validate(nested)]
    pub database: DatabaseSettings,
    #[serde(default)]
    #[validate(nested)]
    pub logging: LoggingSettings,
    #[serde(default)]
    #[validate(nested)]
    pub sharding: ShardingSettings,
}

/// How result rows are written into entity values.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccessorSetting {
    Reflect,
    #[default]
    Offset,
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct DatabaseSettings {
    #[serde(default = "default_dialect")]
    #[validate(custom(function = "validate_dialect"))]
    pub dialect: String,

    #[serde(default = "default_database_url")]
    #[validate(length(min = 1))]
    pub url: String,

    #[serde(default)]
    pub accessor: AccessorSetting,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            dialect: default_dialect(),
            url: default_database_url(),
            accessor: AccessorSetting::default(),
        }
    }
}

fn default_dialect() -> String {
    DEFAULT_DIALECT.to_string()
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

fn validate_dialect(dialect: &str) -> Result<(), ValidationError> {
    if KNOWN_DIALECTS.contains(&dialect.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ValidationError::new("unknown_dialect"))
    }
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    #[validate(custom(function = "validate_log_directive"))]
    pub level: String,

    #[serde(default)]
    pub json: bool,

    #[serde(default = "default_slow_query_threshold_ms")]
    pub slow_query_threshold_ms: u64,
}

impl LoggingSettings {
    pub fn slow_query_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_query_threshold_ms)
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            slow_query_threshold_ms: default_slow_query_threshold_ms(),
        }
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_slow_query_threshold_ms() -> u64 {
    DEFAULT_SLOW_QUERY_THRESHOLD_MS
}

fn validate_log_directive(level: &str) -> Result<(), ValidationError> {
    tracing_subscriber::EnvFilter::try_new(level)
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_log_directive"))
}

#[derive(Debug, Deserialize, Default, Clone, Validate)]
#[validate(schema(function = "validate_unique_shard_names"))]
pub struct ShardingSettings {
    #[serde(default)]
    #[validate(nested)]
    pub shards: Vec<ShardSettings>,
}

/// One logical database: a master plus optional read replicas.
#[derive(Debug, Deserialize, Clone, Validate)]
pub struct ShardSettings {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub master: String,
    #[serde(default)]
    pub slaves: Vec<String>,
}

fn validate_unique_shard_names(settings: &ShardingSettings) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for shard in &settings.shards {
        if !seen.insert(shard.name.as_str()) {
            let mut err = ValidationError::new("duplicate_shard_name");
            err.add_param("name".into(), &shard.name);
            return Err(err);
        }
    }
    Ok(())
}

impl AppConfig {
    /// Loads configuration from `path` (if it exists), then applies
    /// `TESSERA__SECTION__KEY` environment overrides.
    pub fn from_file(path: &str) -> Result<Self> {
        let builder = config::Config::builder();

        let builder = if std::path::Path::new(path).exists() {
            builder.add_source(config::File::with_name(path))
        } else {
            builder
        };

        // TESSERA__DATABASE__URL -> database.url
        let builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build().context("Failed to build configuration")?;

        let app_config: AppConfig = cfg
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed: {:?}", e))?;

        Ok(app_config)
    }
}
