use crate::search::SearchConfig;
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Content repository configuration
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/local.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: ITEM_SERVICE_)
            .add_source(
                config::Environment::with_prefix("ITEM_SERVICE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            search: SearchConfig::default(),
            repository: RepositoryConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Path prefix every item route is mounted under
    #[serde(default = "default_route_base")]
    pub route_base: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            route_base: default_route_base(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Logical databases served by the repository
    #[serde(default = "default_databases")]
    pub databases: Vec<String>,

    /// Database used when a request leaves it empty
    #[serde(default = "default_database")]
    pub default_database: String,

    /// Language used when a request leaves it empty
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Populate the repository and indexes with sample content at startup
    #[serde(default)]
    pub seed_sample_content: bool,
}

impl RepositoryConfig {
    /// Resolve a requested database name, falling back to the default
    pub fn database_or_default<'a>(&'a self, requested: &'a str) -> &'a str {
        if requested.trim().is_empty() {
            &self.default_database
        } else {
            requested
        }
    }

    /// Canonical name of a known database, matched case-insensitively
    pub fn known_database(&self, requested: &str) -> Option<&str> {
        let requested = self.database_or_default(requested);
        self.databases
            .iter()
            .find(|name| name.eq_ignore_ascii_case(requested))
            .map(String::as_str)
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            databases: default_databases(),
            default_database: default_database(),
            default_language: default_language(),
            seed_sample_content: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Service name
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            service_name: default_service_name(),
            prometheus_enabled: true,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_route_base() -> String {
    "/sitecore/api/ssc".to_string()
}

fn default_databases() -> Vec<String> {
    vec!["master".to_string(), "web".to_string(), "core".to_string()]
}

fn default_database() -> String {
    "master".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "item-service".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        assert_eq!(default_http_port(), 8080);
        assert_eq!(default_route_base(), "/sitecore/api/ssc");
        assert_eq!(default_log_level(), "info");
        assert!(default_true());
    }

    #[test]
    fn test_embedded_defaults_deserialize() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.repository.default_database, "master");
        assert_eq!(config.search.default_page_size, 10);
        assert_eq!(
            config.search.indexes.get("web").map(String::as_str),
            Some("sitecore_web_index")
        );
    }

    #[test]
    fn test_known_database() {
        let repository = RepositoryConfig::default();
        assert_eq!(repository.known_database("WEB"), Some("web"));
        assert_eq!(repository.known_database(""), Some("master"));
        assert_eq!(repository.known_database("staging"), None);
    }
}
