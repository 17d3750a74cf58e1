//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::Parser;
use std::path::PathBuf;

use crate::config::AppConfig;

/// Run cucumber features or scenarios in parallel
#[derive(Parser, Debug)]
#[command(name = "caramballel")]
#[command(version)]
#[command(about = "Run cucumber features or scenarios in parallel, one port per worker")]
#[command(long_about = None)]
pub struct Args {
    /// Features, directories or `path:line` scenarios to run
    pub targets: Vec<String>,

    /// Number of concurrent cucumber processes
    #[arg(short = 'n', long)]
    pub num_procs: Option<usize>,

    /// Arguments passed to cucumber (whitespace separated)
    #[arg(long, visible_alias = "cucumber-args", allow_hyphen_values = true)]
    pub runner_args: Option<String>,

    /// Port of the first spork instance
    #[arg(long)]
    pub base_port: Option<u16>,

    /// Do not wrap cucumber in xvfb-run
    #[arg(long)]
    pub no_xvfb_wrapper: bool,

    /// Run one feature per process rather than individual scenarios
    #[arg(long)]
    pub run_features: bool,

    /// Do not connect cucumber to spork
    #[arg(long)]
    pub no_spork: bool,

    /// Launch the spork services instead of running features
    #[arg(long)]
    pub run_spork: bool,

    /// Prefix for per-slot database names
    #[arg(long, visible_alias = "mongo-db")]
    pub db_prefix: Option<String>,

    /// Don't wait for all spork processes to accept connections
    #[arg(long)]
    pub no_wait_for_spork: bool,

    /// Configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Summary format (text, json, json-pretty)
    #[arg(short, long, default_value = "text")]
    pub format: String,

    /// Do not echo cucumber output
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Apply command line overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(num_procs) = self.num_procs {
            config.concurrency = num_procs;
        }
        if let Some(args) = &self.runner_args {
            config.runner.extra_args = args.split_whitespace().map(str::to_string).collect();
        }
        if let Some(port) = self.base_port {
            config.base_port = port;
        }
        if self.no_xvfb_wrapper {
            config.runner.use_headless_wrapper = false;
        }
        if self.run_features {
            config.batch_by_file = true;
        }
        if self.no_spork {
            config.runner.multiplexed = false;
        }
        if let Some(prefix) = &self.db_prefix {
            config.database.prefix = Some(prefix.clone());
        }
        if self.no_wait_for_spork {
            config.backend.wait_for_ready = false;
        }
        if self.quiet {
            config.echo_output = false;
        }
    }
}
