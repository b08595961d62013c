//! Configuration Management
//!
//! Handles persistent configuration storage for the restspec CLI.

use anyhow::{Context, Result};
use restspec::http::transport::DEFAULT_USER_AGENT;
use restspec::HttpTransport;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default spec location (URL or file path)
    #[serde(default)]
    pub spec: Option<String>,
    /// Base URL used when no spec is given
    #[serde(default)]
    pub base_url: Option<String>,
    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Config {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("restspec").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };

        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Get effective spec location (CLI > config)
    pub fn effective_spec(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string).or_else(|| self.spec.clone())
    }

    /// Get effective base URL (CLI > config)
    pub fn effective_base_url(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string).or_else(|| self.base_url.clone())
    }

    /// Set spec location and save
    pub fn set_spec(&mut self, spec: &str) -> Result<()> {
        self.spec = Some(spec.to_string());
        self.save()
    }

    /// Build the HTTP transport described by this configuration
    pub fn transport(&self) -> Result<HttpTransport> {
        let mut builder = HttpTransport::builder().user_agent(
            self.user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        );
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }
        builder.build().context("Failed to create HTTP client")
    }
}
