//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and environment fallbacks.

use crate::config::StoreBackend;
use clap::Parser;
use std::path::PathBuf;

/// Logboard - analytics dashboard over a marketplace event log
///
/// Reads feature-usage, response-time and session events plus the product
/// catalog, and serves the aggregates as a page of bar charts.
///
/// Examples:
///   logboard --data-dir ./data
///   logboard --store firestore --project-id my-project
///   logboard --data-dir ./data --output dashboard.html
///   logboard --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .logboard.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log store backend
    #[arg(long, value_name = "BACKEND", env = "LOGBOARD_STORE")]
    pub store: Option<StoreBackend>,

    /// Directory holding logs.jsonl and products.jsonl (file backend)
    #[arg(long, value_name = "DIR", env = "LOGBOARD_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Google Cloud project id (firestore backend)
    #[arg(long, value_name = "ID", env = "FIRESTORE_PROJECT_ID")]
    pub project_id: Option<String>,

    /// OAuth access token sent as a bearer token (firestore backend)
    #[arg(long, value_name = "TOKEN", env = "FIRESTORE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// File holding the access token, re-read on every query (firestore backend)
    #[arg(long, value_name = "FILE", env = "FIRESTORE_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Firestore emulator host:port; switches the backend to plain HTTP
    #[arg(long, value_name = "HOST:PORT", env = "FIRESTORE_EMULATOR_HOST")]
    pub emulator_host: Option<String>,

    /// Address to bind the HTTP server to
    #[arg(long, value_name = "HOST", env = "LOGBOARD_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, value_name = "PORT", env = "LOGBOARD_PORT")]
    pub port: Option<u16>,

    /// Dashboard page title
    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    /// Render the dashboard once to this file and exit instead of serving
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format for --output (html, json)
    #[arg(long, default_value = "html", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .logboard.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for a one-off render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// HTML page with charts (default)
    #[default]
    Html,
    /// Raw summary as JSON
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.port == Some(0) {
            return Err("Port must be between 1 and 65535".to_string());
        }

        if let Some(ref dir) = self.data_dir {
            if !dir.is_dir() {
                return Err(format!("Data directory does not exist: {}", dir.display()));
            }
        }

        if let Some(ref project) = self.project_id {
            if project.trim().is_empty() {
                return Err("Project id must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
