//! Runner command construction
//!
//! Turns the runner configuration, a worker slot and a work item into the
//! argv of one runner invocation.

use std::fmt;

use super::DispatchError;
use crate::config::{DatabaseConfig, RunnerConfig};
use crate::models::WorkItem;

/// Fully resolved process invocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.envs {
            write!(f, "{key}={value} ")?;
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Template shared by all runs of a session
#[derive(Clone, Debug)]
pub struct CommandTemplate {
    runner: RunnerConfig,
    database: DatabaseConfig,
}

impl CommandTemplate {
    pub fn new(runner: RunnerConfig, database: DatabaseConfig) -> Result<Self, DispatchError> {
        if runner.program.is_empty() {
            return Err(DispatchError::InvalidConfig(
                "runner program is empty".to_string(),
            ));
        }
        if runner.use_headless_wrapper && runner.headless_wrapper.is_empty() {
            return Err(DispatchError::InvalidConfig(
                "headless wrapper is enabled but empty".to_string(),
            ));
        }
        Ok(Self { runner, database })
    }

    /// Build the invocation for one run
    pub fn build(&self, item: &WorkItem, offset: usize, port: u16) -> Invocation {
        let mut argv: Vec<String> = Vec::new();

        if self.runner.use_headless_wrapper {
            argv.extend(self.runner.headless_wrapper.iter().cloned());
        }
        argv.extend(self.runner.program.iter().cloned());

        if self.runner.multiplexed {
            argv.extend(self.runner.multiplex_flags.iter().cloned());
            argv.push(port.to_string());
        }

        argv.extend(self.runner.extra_args.iter().cloned());
        argv.push(item.to_string());

        let program = argv.remove(0);
        Invocation {
            program,
            args: argv,
            envs: self.database.env_for(offset).into_iter().collect(),
        }
    }
}
