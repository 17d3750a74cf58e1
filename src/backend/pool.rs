//! Backend process pool

use anyhow::{Context, Result};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::config::AppConfig;

/// A launched backend server bound to one worker slot
#[derive(Debug)]
pub struct BackendProcess {
    pub offset: usize,
    pub port: u16,
    child: Child,
}

impl BackendProcess {
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }
}

/// One backend per worker slot
#[derive(Debug, Default)]
pub struct BackendPool {
    processes: Vec<BackendProcess>,
}

impl BackendPool {
    /// Build the argv for the backend on a slot
    pub fn command_for(config: &AppConfig, offset: usize) -> Result<(Vec<String>, u16)> {
        let port = config
            .port_for(offset)
            .with_context(|| format!("No port available for backend slot {offset}"))?;
        let mut argv = config.backend.program.clone();
        argv.push(port.to_string());
        Ok((argv, port))
    }

    /// Start `config.concurrency` backends on consecutive ports
    pub fn launch(config: &AppConfig) -> Result<Self> {
        let mut processes = Vec::with_capacity(config.concurrency);

        for offset in 0..config.concurrency {
            let (argv, port) = Self::command_for(config, offset)?;
            let (program, args) = argv
                .split_first()
                .context("Backend program must not be empty")?;

            let mut command = Command::new(program);
            command.args(args).stdin(Stdio::null());
            if let Some((key, value)) = config.database.env_for(offset) {
                command.env(key, value);
            }

            let child = command
                .spawn()
                .with_context(|| format!("Failed to launch backend `{}`", argv.join(" ")))?;

            info!(
                "Started backend {} on port {} (pid {:?})",
                offset,
                port,
                child.id()
            );
            processes.push(BackendProcess {
                offset,
                port,
                child,
            });
        }

        Ok(Self { processes })
    }

    pub fn ports(&self) -> Vec<u16> {
        self.processes.iter().map(|p| p.port).collect()
    }

    /// Leave the backends running after this process exits
    pub fn detach(self) -> Vec<u32> {
        self.processes
            .iter()
            .filter_map(|process| {
                let pid = process.pid()?;
                debug!(
                    "Detaching backend {} on port {} (pid {})",
                    process.offset, process.port, pid
                );
                Some(pid)
            })
            .collect()
    }
}
