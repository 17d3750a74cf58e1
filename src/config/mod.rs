//! Configuration module
//!
//! Handles loading, layering and validating session configuration.

mod env;
mod file;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use env::EnvConfig;
pub use file::{find_config, is_yaml_file};

/// Session configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Port of the first worker slot; slot `n` uses `base_port + n`
    pub base_port: u16,

    /// Maximum number of concurrently live runs
    pub concurrency: usize,

    /// Dispatch whole feature files instead of single scenarios
    pub batch_by_file: bool,

    /// Directory searched for features when no targets are given
    pub features_dir: PathBuf,

    /// Print each run's captured output as it completes
    pub echo_output: bool,

    /// Test runner invocation
    pub runner: RunnerConfig,

    /// Companion backend pool
    pub backend: BackendConfig,

    /// Per-slot database naming
    pub database: DatabaseConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_port: 8990,
            concurrency: 5,
            batch_by_file: false,
            features_dir: PathBuf::from("features"),
            echo_output: true,
            runner: RunnerConfig::default(),
            backend: BackendConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        Ok(config)
    }

    /// Resolve the layered configuration: explicit path, then the
    /// `CARAMBALLEL_CONFIG` variable, then the standard locations, then
    /// defaults. Environment overrides are applied on top.
    pub fn resolve(explicit: Option<&Path>, env: &EnvConfig) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| env.config_file.clone())
            .or_else(find_config);

        let mut config = match path {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                Self::load(&path)?
            }
            None => Self::default(),
        };

        if env.has_any() {
            tracing::debug!("Applying CARAMBALLEL_* environment overrides");
        }
        env.apply(&mut config);
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            anyhow::bail!("Concurrency limit must be at least 1");
        }

        if self.runner.program.is_empty() {
            anyhow::bail!("Runner program must not be empty");
        }

        if self.runner.use_headless_wrapper && self.runner.headless_wrapper.is_empty() {
            anyhow::bail!("Headless wrapper is enabled but no wrapper command is configured");
        }

        if self.port_for(self.concurrency - 1).is_none() {
            anyhow::bail!(
                "{} worker slots starting at port {} exceed port {}",
                self.concurrency,
                self.base_port,
                u16::MAX
            );
        }

        if self.backend.program.is_empty() {
            anyhow::bail!("Backend program must not be empty");
        }

        if self.backend.poll_interval_ms == 0 {
            anyhow::bail!("Backend poll interval must be greater than zero");
        }

        Ok(())
    }

    /// Port assigned to a worker slot
    pub fn port_for(&self, offset: usize) -> Option<u16> {
        u16::try_from(offset)
            .ok()
            .and_then(|offset| self.base_port.checked_add(offset))
    }
}

/// Test runner invocation settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Runner program and its fixed leading arguments
    pub program: Vec<String>,

    /// Wrap runs so they work without a display server
    pub use_headless_wrapper: bool,

    /// Command placed in front of the runner when wrapping
    pub headless_wrapper: Vec<String>,

    /// Connect each run to the backend listening on its slot port
    pub multiplexed: bool,

    /// Flags preceding the port when multiplexed
    pub multiplex_flags: Vec<String>,

    /// Extra tokens passed to the runner before the work item
    pub extra_args: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: strings(&["bundle", "exec", "cucumber"]),
            use_headless_wrapper: true,
            headless_wrapper: strings(&["xvfb-run", "--auto-servernum"]),
            multiplexed: true,
            multiplex_flags: strings(&["--drb", "--port"]),
            extra_args: Vec::new(),
        }
    }
}

/// Companion backend pool settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend program; the slot port is appended
    pub program: Vec<String>,

    /// Wait until every backend accepts connections
    pub wait_for_ready: bool,

    /// Interval between readiness probes
    pub poll_interval_ms: u64,

    /// Give up waiting after this many seconds (0 waits forever)
    pub ready_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            program: strings(&["bundle", "exec", "spork", "cucumber", "-p"]),
            wait_for_ready: true,
            poll_interval_ms: 1000,
            ready_timeout_secs: 0,
        }
    }
}

/// Per-slot database naming
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Environment variable receiving the database name
    pub env_var: String,

    /// Prefix of the database name; the slot offset is appended
    pub prefix: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            env_var: "CUCUMBER_DB".to_string(),
            prefix: None,
        }
    }
}

impl DatabaseConfig {
    /// Environment assignment for a slot, if database naming is enabled
    pub fn env_for(&self, offset: usize) -> Option<(String, String)> {
        self.prefix
            .as_ref()
            .map(|prefix| (self.env_var.clone(), format!("{prefix}{offset}")))
    }
}

fn strings(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|t| t.to_string()).collect()
}
