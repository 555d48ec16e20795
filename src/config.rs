//! Configuration file handling.
//!
//! This module handles loading `.logboard.toml` files and merging them with
//! command-line arguments and environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::analysis::DEFAULT_TOP_SECTIONS;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".logboard.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Log store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Dashboard presentation settings.
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Which log store backend to read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// JSON-lines files in a local directory
    #[default]
    File,
    /// Firestore over its REST API
    Firestore,
}

/// Log store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend to use.
    #[serde(default)]
    pub backend: StoreBackend,

    /// Directory holding `<collection>.jsonl` files (file backend).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Collection holding event records.
    #[serde(default = "default_logs_collection")]
    pub logs_collection: String,

    /// Collection holding product records.
    #[serde(default = "default_products_collection")]
    pub products_collection: String,

    /// Firestore settings.
    #[serde(default)]
    pub firestore: FirestoreConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            data_dir: default_data_dir(),
            logs_collection: default_logs_collection(),
            products_collection: default_products_collection(),
            firestore: FirestoreConfig::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_logs_collection() -> String {
    "logs".to_string()
}

fn default_products_collection() -> String {
    "products".to_string()
}

/// Firestore REST settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirestoreConfig {
    /// Google Cloud project id.
    #[serde(default)]
    pub project_id: Option<String>,

    /// Database id.
    #[serde(default = "default_database")]
    pub database: String,

    /// API root. Point this at an emulator for local runs.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// File holding the OAuth access token. Re-read on every query and
    /// preferred over `access_token`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,

    /// OAuth access token. Only ever taken from the environment.
    #[serde(skip)]
    pub access_token: Option<String>,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            database: default_database(),
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            token_file: None,
            access_token: None,
        }
    }
}

fn default_database() -> String {
    "(default)".to_string()
}

fn default_base_url() -> String {
    "https://firestore.googleapis.com".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Dashboard presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Page title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Number of sections shown in the time-on-task chart.
    #[serde(default = "default_top_sections")]
    pub top_sections: usize,

    /// Rank feature usage by count, highest first.
    #[serde(default = "default_true")]
    pub sort_features: bool,

    /// Rank categories by count instead of first-seen order.
    #[serde(default)]
    pub sort_categories: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            top_sections: default_top_sections(),
            sort_features: true,
            sort_categories: false,
        }
    }
}

fn default_title() -> String {
    "App Analytics Dashboard".to_string()
}

fn default_top_sections() -> usize {
    DEFAULT_TOP_SECTIONS
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments and environment.
    ///
    /// Only values the user actually supplied override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref host) = args.host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }

        if let Some(backend) = args.store {
            self.store.backend = backend;
        }
        if let Some(ref dir) = args.data_dir {
            self.store.data_dir = dir.clone();
        }

        if let Some(ref project) = args.project_id {
            self.store.firestore.project_id = Some(project.clone());
        }
        if let Some(ref token) = args.access_token {
            self.store.firestore.access_token = Some(token.clone());
        }
        if let Some(ref path) = args.token_file {
            self.store.firestore.token_file = Some(path.clone());
        }
        if let Some(ref emulator) = args.emulator_host {
            self.store.firestore.base_url = format!("http://{}", emulator);
        }

        if let Some(ref title) = args.title {
            self.dashboard.title = title.clone();
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.store.backend, StoreBackend::File);
        assert_eq!(config.store.logs_collection, "logs");
        assert_eq!(config.dashboard.top_sections, 5);
        assert!(config.dashboard.sort_features);
        assert!(!config.dashboard.sort_categories);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[server]
port = 9090

[store]
backend = "firestore"
logs_collection = "app_logs"

[store.firestore]
project_id = "uni-marketplace"

[dashboard]
top_sections = 3
sort_categories = true
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.store.backend, StoreBackend::Firestore);
        assert_eq!(config.store.logs_collection, "app_logs");
        assert_eq!(config.store.products_collection, "products");
        assert_eq!(
            config.store.firestore.project_id.as_deref(),
            Some("uni-marketplace")
        );
        assert_eq!(config.store.firestore.database, "(default)");
        assert_eq!(config.dashboard.top_sections, 3);
        assert!(config.dashboard.sort_categories);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[dashboard]\ntitle = \"Marketplace\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.dashboard.title, "Marketplace");
    }

    #[test]
    fn test_load_invalid_file_fails() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = \"eighty\"").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_merge_with_args() {
        let args = Args::parse_from([
            "logboard",
            "--store",
            "firestore",
            "--project-id",
            "demo",
            "--emulator-host",
            "localhost:8080",
            "--token-file",
            "/run/secrets/firestore-token",
            "--host",
            "0.0.0.0",
            "--port",
            "3000",
        ]);

        let mut config = Config::default();
        config.merge_with_args(&args);

        assert_eq!(config.store.backend, StoreBackend::Firestore);
        assert_eq!(config.store.firestore.project_id.as_deref(), Some("demo"));
        assert_eq!(config.store.firestore.base_url, "http://localhost:8080");
        assert_eq!(config.server.port, 3000);
        assert_eq!(
            config.store.firestore.token_file.as_deref(),
            Some(std::path::Path::new("/run/secrets/firestore-token"))
        );
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.dashboard.top_sections, 5);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[store]"));
        assert!(toml_str.contains("[dashboard]"));
        assert!(!toml_str.contains("access_token"));
    }
}
