//! Configuration for the search system

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL used to build per-document resource links
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Background ingestion configuration
    #[serde(default)]
    pub processing: ProcessingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            database: DatabaseConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("docsearch.db"),
        }
    }
}

/// Background ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Number of parallel ingestion workers (default: CPU count, max 4)
    pub workers: Option<usize>,
    /// Capacity of the ingestion job queue
    pub queue_depth: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            workers: None, // Auto-detect from CPU count
            queue_depth: 1000,
        }
    }
}

impl ProcessingConfig {
    /// Resolve the effective worker count
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| num_cpus::get().min(4)).max(1)
    }
}
