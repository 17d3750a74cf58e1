//! Run execution
//!
//! Launches one runner process for a work item on a reserved worker slot
//! and captures its output.

use std::future::Future;
use std::io::Write;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::command::{CommandTemplate, Invocation};
use super::offsets::OffsetAllocator;
use super::DispatchError;
use crate::models::{RunReport, WorkItem};

/// Output of a finished process
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    /// `None` when terminated by a signal or when waiting failed
    pub exit_code: Option<i32>,
}

/// Starts runner processes
pub trait Launcher: Send + Sync + 'static {
    /// Run the invocation to completion and capture its standard output.
    ///
    /// Only failures to start the process are errors; a process that fails
    /// is reported through its output and exit code.
    fn launch(
        &self,
        invocation: Invocation,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<CapturedOutput, DispatchError>> + Send;
}

/// Launches real child processes
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    async fn launch(
        &self,
        invocation: Invocation,
        cancel: CancellationToken,
    ) -> Result<CapturedOutput, DispatchError> {
        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .envs(invocation.envs.iter().cloned())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DispatchError::Launch {
                program: invocation.program.clone(),
                source,
            })?;

        tokio::select! {
            output = child.wait_with_output() => match output {
                Ok(output) => Ok(CapturedOutput {
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    exit_code: output.status.code(),
                }),
                Err(e) => {
                    warn!("Failed to collect output of `{}`: {}", invocation, e);
                    Ok(CapturedOutput::default())
                }
            },
            // Dropping the wait future kills the child
            () = cancel.cancelled() => Err(DispatchError::Cancelled),
        }
    }
}

/// Executes single runs against the shared worker slots
pub struct RunExecutor<L> {
    launcher: L,
    template: CommandTemplate,
    offsets: Arc<OffsetAllocator>,
    base_port: u16,
    echo_output: bool,
}

impl<L: Launcher> RunExecutor<L> {
    pub fn new(
        launcher: L,
        template: CommandTemplate,
        offsets: Arc<OffsetAllocator>,
        base_port: u16,
    ) -> Self {
        Self {
            launcher,
            template,
            offsets,
            base_port,
            echo_output: false,
        }
    }

    /// Print each run's raw output to stdout when it completes
    pub fn with_echo(mut self, echo_output: bool) -> Self {
        self.echo_output = echo_output;
        self
    }

    /// Run one work item on the smallest free worker slot
    pub async fn execute(
        &self,
        ordinal: usize,
        item: WorkItem,
        cancel: CancellationToken,
    ) -> Result<RunReport, DispatchError> {
        let lease = self.offsets.acquire();
        let offset = lease.offset();
        let port = u16::try_from(offset)
            .ok()
            .and_then(|offset| self.base_port.checked_add(offset))
            .ok_or(DispatchError::PortRange {
                base_port: self.base_port,
                offset,
            })?;

        let invocation = self.template.build(&item, offset, port);
        debug!("Run #{} on slot {}: {}", ordinal, offset, invocation);

        let start = Instant::now();
        let captured = self.launcher.launch(invocation, cancel).await?;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        if self.echo_output {
            echo(&captured.stdout);
        }

        let lines = split_lines(&captured.stdout);
        drop(lease);

        Ok(RunReport {
            ordinal,
            item,
            offset,
            port,
            exit_code: captured.exit_code,
            lines,
            duration_ms,
        })
    }
}

/// Split captured text into lines, dropping the empty tail after a final newline
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

fn echo(text: &str) {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
        warn!("Failed to echo run output: {}", e);
    }
}
