//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;
use std::path::PathBuf;

use super::AppConfig;

/// Environment variable prefix
const ENV_PREFIX: &str = "CARAMBALLEL";

/// Overrides read from `CARAMBALLEL_*` variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Config file from CARAMBALLEL_CONFIG
    pub config_file: Option<PathBuf>,
    /// Concurrency from CARAMBALLEL_NUM_PROCS
    pub concurrency: Option<usize>,
    /// Base port from CARAMBALLEL_BASE_PORT
    pub base_port: Option<u16>,
    /// Whitespace separated runner args from CARAMBALLEL_RUNNER_ARGS
    pub runner_args: Option<String>,
    /// Feature directory from CARAMBALLEL_FEATURES_DIR
    pub features_dir: Option<PathBuf>,
    /// Headless wrapper toggle from CARAMBALLEL_XVFB
    pub headless_wrapper: Option<bool>,
    /// Multiplexed backend toggle from CARAMBALLEL_SPORK
    pub multiplexed: Option<bool>,
    /// Batch mode from CARAMBALLEL_RUN_FEATURES
    pub batch_by_file: Option<bool>,
    /// Database prefix from CARAMBALLEL_DB_PREFIX
    pub db_prefix: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            config_file: get_env("CONFIG").map(PathBuf::from),
            concurrency: get_env_parse("NUM_PROCS"),
            base_port: get_env_parse("BASE_PORT"),
            runner_args: get_env("RUNNER_ARGS"),
            features_dir: get_env("FEATURES_DIR").map(PathBuf::from),
            headless_wrapper: get_env_bool("XVFB"),
            multiplexed: get_env_bool("SPORK"),
            batch_by_file: get_env_bool("RUN_FEATURES"),
            db_prefix: get_env("DB_PREFIX"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.config_file.is_some()
            || self.concurrency.is_some()
            || self.base_port.is_some()
            || self.runner_args.is_some()
            || self.features_dir.is_some()
            || self.headless_wrapper.is_some()
            || self.multiplexed.is_some()
            || self.batch_by_file.is_some()
            || self.db_prefix.is_some()
    }

    /// Apply the overrides that are set
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(port) = self.base_port {
            config.base_port = port;
        }
        if let Some(args) = &self.runner_args {
            config.runner.extra_args = args.split_whitespace().map(str::to_string).collect();
        }
        if let Some(dir) = &self.features_dir {
            config.features_dir = dir.clone();
        }
        if let Some(enabled) = self.headless_wrapper {
            config.runner.use_headless_wrapper = enabled;
        }
        if let Some(enabled) = self.multiplexed {
            config.runner.multiplexed = enabled;
        }
        if let Some(enabled) = self.batch_by_file {
            config.batch_by_file = enabled;
        }
        if let Some(prefix) = &self.db_prefix {
            config.database.prefix = Some(prefix.clone());
        }
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| parse_bool(&v))
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "1" | "true" | "yes" | "on" | "enabled"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_config_default() {
        let config = EnvConfig::default();
        assert!(!config.has_any());
        assert!(config.concurrency.is_none());
    }

    #[test]
    fn test_apply_overrides() {
        let env = EnvConfig {
            concurrency: Some(9),
            runner_args: Some("--tags  @wip -f progress".to_string()),
            headless_wrapper: Some(false),
            db_prefix: Some("ci_".to_string()),
            ..Default::default()
        };
        assert!(env.has_any());

        let mut config = AppConfig::default();
        env.apply(&mut config);

        assert_eq!(config.concurrency, 9);
        assert_eq!(config.runner.extra_args, ["--tags", "@wip", "-f", "progress"]);
        assert!(!config.runner.use_headless_wrapper);
        assert!(config.runner.multiplexed);
        assert_eq!(config.database.prefix.as_deref(), Some("ci_"));
        assert_eq!(config.base_port, 8990);
    }

    #[test]
    fn test_env_bool_parsing() {
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("on"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("nope"));
    }

    #[test]
    fn test_load_reads_prefixed_variables() {
        env::set_var("CARAMBALLEL_BASE_PORT", "7100");
        let config = EnvConfig::load();
        env::remove_var("CARAMBALLEL_BASE_PORT");

        assert_eq!(config.base_port, Some(7100));
    }
}
