//! Configuration management

use clap::Parser;
use config::{Config as ConfigBuilder, ConfigError as BuilderError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid server configuration: {0}")]
    InvalidServer(String),

    #[error("Invalid database configuration: {0}")]
    InvalidDatabase(String),

    #[error("Invalid logging configuration: {0}")]
    InvalidLogging(String),

    #[error("Invalid provider configuration: {0}")]
    InvalidProviders(String),

    #[error("Invalid import configuration: {0}")]
    InvalidImport(String),

    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

impl From<BuilderError> for ConfigError {
    fn from(err: BuilderError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub providers: ProvidersConfig,
    pub import: ImportConfig,
}

impl Config {
    /// Load configuration with precedence: CLI args > Environment variables > Config file > Defaults
    pub fn load() -> Result<Self, ConfigError> {
        let cli_args = CliArgs::parse();

        let mut builder = Self::builder_with_defaults()?;

        // Config file, if specified
        if let Some(config_path) = &cli_args.config {
            if !config_path.exists() {
                return Err(ConfigError::FileNotFound(config_path.display().to_string()));
            }
            builder = builder.add_source(File::from(config_path.as_path()));
        }

        // Environment variables, prefixed with BOOKSHELF and using __ for nesting.
        // Example: BOOKSHELF__SERVER__PORT=8080
        builder = builder.add_source(
            Environment::with_prefix("BOOKSHELF")
                .separator("__")
                .try_parsing(true),
        );

        // CLI overrides (highest priority)
        if let Some(host) = &cli_args.host {
            builder = builder.set_override("server.host", host.clone())?;
        }
        if let Some(port) = cli_args.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(db_path) = &cli_args.database {
            builder = builder.set_override("database.path", db_path.display().to_string())?;
        }
        if let Some(log_level) = &cli_args.log_level {
            builder = builder.set_override("logging.level", log_level.clone())?;
        }

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file path, with defaults filled in
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let config: Config = Self::builder_with_defaults()?
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn builder_with_defaults(
    ) -> Result<config::builder::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let builder = ConfigBuilder::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("database.path", "./data/bookshelf.db")?
            .set_default("database.connection_pool_size", 10)?
            .set_default("database.busy_timeout", 5000)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "text")?
            .set_default("logging.output", "stdout")?
            .set_default("providers.cache_ttl_secs", 900)?
            .set_default("providers.request_timeout_secs", 20)?
            .set_default("providers.google_books.enabled", true)?
            .set_default("providers.google_books.priority", 1)?
            .set_default("providers.open_library.enabled", true)?
            .set_default("providers.open_library.priority", 2)?
            .set_default("providers.goodreads.enabled", true)?
            .set_default("providers.goodreads.priority", 3)?
            .set_default("providers.goodreads.min_request_interval_ms", 1000)?
            .set_default("providers.amazon.enabled", false)?
            .set_default("providers.amazon.priority", 4)?
            .set_default("providers.amazon.domain", "amazon.com")?
            .set_default("providers.amazon.min_request_interval_ms", 1500)?
            .set_default("providers.comicvine.enabled", false)?
            .set_default("providers.comicvine.priority", 5)?
            .set_default("providers.comicvine.api_key", "")?
            .set_default("providers.hardcover.enabled", false)?
            .set_default("providers.hardcover.priority", 6)?
            .set_default("providers.hardcover.api_token", "")?
            .set_default("import.csv_session_ttl_secs", 3600)?
            .set_default("import.audible_session_ttl_secs", 1800)?
            .set_default("import.sweep_interval_secs", 300)?
            .set_default("import.max_upload_mb", 10)?;
        Ok(builder)
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.logging.validate()?;
        self.providers.validate()?;
        self.import.validate()?;
        Ok(())
    }
}

/// Command-line arguments for configuration override
#[derive(Debug, Parser)]
#[command(name = "bookshelf")]
#[command(about = "BookShelf Backend Server", long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (TOML format)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Server host address
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Database file path
    #[arg(short, long, value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::InvalidServer("host cannot be empty".to_string()));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidServer("port must be greater than 0".to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub connection_pool_size: usize,
    pub busy_timeout: u64, // milliseconds
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidDatabase("path cannot be empty".to_string()));
        }

        if self.connection_pool_size == 0 {
            return Err(ConfigError::InvalidDatabase(
                "connection_pool_size must be greater than 0".to_string(),
            ));
        }

        if self.busy_timeout == 0 {
            return Err(ConfigError::InvalidDatabase(
                "busy_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
    pub log_dir: Option<PathBuf>,
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.as_str()) {
            return Err(ConfigError::InvalidLogging(format!(
                "level must be one of: {:?}",
                valid_levels
            )));
        }

        let valid_formats = ["json", "text"];
        if !valid_formats.contains(&self.format.as_str()) {
            return Err(ConfigError::InvalidLogging(format!(
                "format must be one of: {:?}",
                valid_formats
            )));
        }

        let valid_outputs = ["stdout", "file"];
        if !valid_outputs.contains(&self.output.as_str()) {
            return Err(ConfigError::InvalidLogging(format!(
                "output must be one of: {:?}",
                valid_outputs
            )));
        }

        if self.output == "file" && self.log_dir.is_none() {
            return Err(ConfigError::InvalidLogging(
                "log_dir must be specified when output is 'file'".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    /// TTL for per-adapter response caches, seconds
    pub cache_ttl_secs: u64,
    /// Outbound HTTP timeout, seconds
    pub request_timeout_secs: u64,
    pub google_books: ProviderToggle,
    pub open_library: ProviderToggle,
    pub goodreads: ScrapedProviderConfig,
    pub amazon: AmazonProviderConfig,
    pub comicvine: ComicVineProviderConfig,
    pub hardcover: HardcoverProviderConfig,
}

impl ProvidersConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::InvalidProviders(
                "cache_ttl_secs must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidProviders(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.amazon.domain.is_empty() {
            return Err(ConfigError::InvalidProviders(
                "amazon.domain cannot be empty".to_string(),
            ));
        }

        if self.amazon.domain.contains("://") {
            return Err(ConfigError::InvalidProviders(
                "amazon.domain must be a bare host, not a URL".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderToggle {
    pub enabled: bool,
    pub priority: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapedProviderConfig {
    pub enabled: bool,
    pub priority: u32,
    pub min_request_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AmazonProviderConfig {
    pub enabled: bool,
    pub priority: u32,
    pub domain: String,
    pub min_request_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComicVineProviderConfig {
    pub enabled: bool,
    pub priority: u32,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HardcoverProviderConfig {
    pub enabled: bool,
    pub priority: u32,
    pub api_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    pub csv_session_ttl_secs: u64,
    pub audible_session_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub max_upload_mb: u64,
}

impl ImportConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.csv_session_ttl_secs == 0 {
            return Err(ConfigError::InvalidImport(
                "csv_session_ttl_secs must be greater than 0".to_string(),
            ));
        }

        if self.audible_session_ttl_secs == 0 {
            return Err(ConfigError::InvalidImport(
                "audible_session_ttl_secs must be greater than 0".to_string(),
            ));
        }

        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidImport(
                "sweep_interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.max_upload_mb == 0 {
            return Err(ConfigError::InvalidImport(
                "max_upload_mb must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
