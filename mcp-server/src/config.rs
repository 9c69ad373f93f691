use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    /// `db_path` (§6). `None` falls back to an in-process sqlite file next
    /// to the working directory.
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// `bind_host` (§6).
    pub listen_addr: String,
    /// `bind_port` (§6). Reserved for the out-of-scope transport; the
    /// stdio dispatcher doesn't bind a socket, but the knob is kept so the
    /// configuration surface matches the one a transport would consume.
    pub port: u16,
    pub workers: usize,
    /// `sprint_enabled` (§6) — feature flag for the out-of-scope
    /// collaborative room subsystem. Always `false` in this build.
    pub sprint_enabled: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
    Compact,
}

/// Tunables for the coordination engine itself (§6).
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EngineConfig {
    pub output_clip_bytes: usize,
    pub agent_offline_after_ms: i64,
    pub default_claim_ttl_seconds: u64,
    pub max_claim_ttl_seconds: u64,
    pub min_claim_ttl_seconds: u64,
    pub claim_extend_default_seconds: u64,
    pub dep_closure_max_depth: usize,
}

impl Config {
    /// Load configuration from environment variables and config files.
    pub fn from_env() -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        builder = builder.add_source(File::from_str(
            include_str!("../config/default.toml"),
            FileFormat::Toml,
        ));

        if let Ok(config_file) = env::var("CONFIG_FILE") {
            builder = builder.add_source(
                File::with_name(&config_file)
                    .required(false)
                    .format(FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("MCP")
                .separator("_")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let mut result: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Self::apply_standard_env_vars(&mut result);

        Ok(result)
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let builder = ConfigBuilder::builder()
            .add_source(File::with_name(path).format(FileFormat::Toml))
            .add_source(
                Environment::with_prefix("MCP")
                    .separator("_")
                    .try_parsing(true),
            );

        let config = builder
            .build()
            .context("Failed to build configuration from file")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration from file")
    }

    fn apply_standard_env_vars(config: &mut Config) {
        if let Ok(database_url) = env::var("DATABASE_URL") {
            config.database.url = Some(database_url);
        }
        if let Ok(listen_addr) = env::var("LISTEN_ADDR") {
            config.server.listen_addr = listen_addr;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.logging.level = log_level;
        }
    }

    #[allow(dead_code)]
    pub fn merge_with_env(mut self) -> Result<Self> {
        Self::apply_standard_env_vars(&mut self);
        Ok(self)
    }

    /// `db_path` with a fallback for local/dev runs (§6).
    pub fn database_url(&self) -> String {
        match &self.database.url {
            Some(url) => url.clone(),
            None => "sqlite://./scrum.sqlite".to_string(),
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.listen_addr, self.server.port)
    }

    pub fn validate(&self) -> Result<()> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(anyhow::anyhow!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                ));
            }
        }

        let database_url = self.database_url();
        if !database_url.starts_with("sqlite://") && database_url != ":memory:" {
            return Err(anyhow::anyhow!(
                "Only SQLite databases are supported. URL must start with 'sqlite://'. Got: {}",
                database_url
            ));
        }

        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }
        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("Database max_connections must be greater than 0"));
        }
        if self.engine.min_claim_ttl_seconds == 0 {
            return Err(anyhow::anyhow!("engine.min_claim_ttl_seconds must be greater than 0"));
        }
        if self.engine.min_claim_ttl_seconds > self.engine.max_claim_ttl_seconds {
            return Err(anyhow::anyhow!(
                "engine.min_claim_ttl_seconds ({}) cannot exceed max_claim_ttl_seconds ({})",
                self.engine.min_claim_ttl_seconds,
                self.engine.max_claim_ttl_seconds
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                connection_timeout: 30,
            },
            server: ServerConfig {
                listen_addr: "127.0.0.1".to_string(),
                port: 4177,
                workers: 4,
                sprint_enabled: false,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
            engine: EngineConfig {
                output_clip_bytes: 64 * 1024,
                agent_offline_after_ms: 300_000,
                default_claim_ttl_seconds: 900,
                max_claim_ttl_seconds: 3600,
                min_claim_ttl_seconds: 5,
                claim_extend_default_seconds: 300,
                dep_closure_max_depth: 100,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let config = Config::default();
        assert_eq!(config.server.listen_addr, "127.0.0.1");
        assert_eq!(config.server.port, 4177);
        assert_eq!(config.engine.default_claim_ttl_seconds, 900);
        assert_eq!(config.engine.max_claim_ttl_seconds, 3600);
        assert_eq!(config.engine.min_claim_ttl_seconds, 5);
        assert_eq!(config.engine.agent_offline_after_ms, 300_000);
    }

    #[test]
    fn database_url_falls_back_when_unset() {
        let config = Config::default();
        assert_eq!(config.database_url(), "sqlite://./scrum.sqlite");
    }

    #[test]
    fn database_url_honors_override() {
        let mut config = Config::default();
        config.database.url = Some("sqlite://custom.db".to_string());
        assert_eq!(config.database_url(), "sqlite://custom.db");
    }

    #[test]
    fn server_address_formats_host_and_port() {
        let config = Config::default();
        assert_eq!(config.server_address(), "127.0.0.1:4177");
    }

    #[test]
    fn validation_rejects_bad_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_inverted_ttl_bounds() {
        let mut config = Config::default();
        config.engine.min_claim_ttl_seconds = 4000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn environment_override_sets_database_url() {
        env::set_var("DATABASE_URL", "sqlite://test.db");
        let config = Config::default().merge_with_env().unwrap();
        assert_eq!(config.database.url, Some("sqlite://test.db".to_string()));
        env::remove_var("DATABASE_URL");
    }
}
