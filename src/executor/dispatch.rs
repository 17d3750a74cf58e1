//! Admission-controlled dispatch
//!
//! Starts one run per work item in input order, never letting more than the
//! configured number of runs be live at once, and reduces the collected
//! output once every run has finished.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::command::CommandTemplate;
use super::ledger::OutputLedger;
use super::offsets::OffsetAllocator;
use super::runner::{Launcher, RunExecutor};
use super::DispatchError;
use crate::config::AppConfig;
use crate::models::{RunReport, WorkItem};
use crate::stats::Statistics;
use crate::utils::Timer;

type RunResult = Result<RunReport, DispatchError>;

/// Gauge of live runs with its high-water mark
#[derive(Debug, Default)]
pub struct LiveRuns {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl LiveRuns {
    /// Count a run as live until the guard is dropped
    pub fn enter(self: &Arc<Self>) -> LiveGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        LiveGuard {
            live: Arc::clone(self),
        }
    }

    #[cfg(test)]
    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Keeps a run counted as live
#[derive(Debug)]
pub struct LiveGuard {
    live: Arc<LiveRuns>,
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.live.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Process outcomes of the runs settled so far
#[derive(Debug, Default)]
struct Progress {
    completed: usize,
    failed: usize,
}

/// One dispatcher invocation: configuration plus all shared run state
pub struct RunSession<L> {
    executor: Arc<RunExecutor<L>>,
    concurrency: usize,
    offsets: Arc<OffsetAllocator>,
    ledger: Arc<OutputLedger>,
    live: Arc<LiveRuns>,
    timer: Timer,
    cancel: CancellationToken,
}

impl<L: Launcher> RunSession<L> {
    /// Create a session. The timer starts now.
    pub fn new(config: &AppConfig, launcher: L) -> Result<Self, DispatchError> {
        if config.concurrency == 0 {
            return Err(DispatchError::InvalidConfig(
                "concurrency limit must be at least 1".to_string(),
            ));
        }

        let template = CommandTemplate::new(config.runner.clone(), config.database.clone())?;
        let offsets = Arc::new(OffsetAllocator::new());
        let executor = RunExecutor::new(launcher, template, Arc::clone(&offsets), config.base_port)
            .with_echo(config.echo_output);

        Ok(Self {
            executor: Arc::new(executor),
            concurrency: config.concurrency,
            offsets,
            ledger: Arc::new(OutputLedger::new()),
            live: Arc::new(LiveRuns::default()),
            timer: Timer::start(),
            cancel: CancellationToken::new(),
        })
    }

    /// Token that aborts the session when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[cfg(test)]
    pub fn ledger(&self) -> &OutputLedger {
        &self.ledger
    }

    #[cfg(test)]
    pub fn offsets(&self) -> &OffsetAllocator {
        &self.offsets
    }

    #[cfg(test)]
    pub fn live(&self) -> &LiveRuns {
        &self.live
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// Current statistics over everything collected so far
    pub fn statistics(&self) -> Statistics {
        Statistics::compute(&self.ledger.snapshot(), &self.timer)
    }

    /// Run every item and return the reduced statistics.
    ///
    /// The first fatal error stops the batch: unlaunched items are skipped
    /// and live runs are aborted, which kills their processes.
    pub async fn run_all(&self, items: Vec<WorkItem>) -> Result<Statistics, DispatchError> {
        info!(
            "Dispatching {} work item(s) with at most {} concurrent run(s)",
            items.len(),
            self.concurrency
        );

        let slots = Arc::new(Semaphore::new(self.concurrency));
        let mut runs: JoinSet<RunResult> = JoinSet::new();
        let mut progress = Progress::default();

        for (index, item) in items.into_iter().enumerate() {
            let ordinal = index + 1;

            let permit = loop {
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => {
                        return Err(abort(&mut runs, DispatchError::Cancelled).await);
                    }
                    Some(joined) = runs.join_next(), if !runs.is_empty() => {
                        if let Err(e) = settle(joined, &mut progress) {
                            return Err(abort(&mut runs, e).await);
                        }
                    }
                    permit = Arc::clone(&slots).acquire_owned() => {
                        break permit.map_err(|_| DispatchError::Cancelled)?;
                    }
                }
            };

            info!("Starting run #{}: {}", ordinal, item);

            let executor = Arc::clone(&self.executor);
            let ledger = Arc::clone(&self.ledger);
            let live = self.live.enter();
            let cancel = self.cancel.child_token();

            runs.spawn(async move {
                let _permit = permit;
                let _live = live;
                let report = executor.execute(ordinal, item, cancel).await?;
                ledger.append(report.lines.iter().cloned());
                Ok(report)
            });
        }

        while !runs.is_empty() {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    return Err(abort(&mut runs, DispatchError::Cancelled).await);
                }
                Some(joined) = runs.join_next() => {
                    if let Err(e) = settle(joined, &mut progress) {
                        return Err(abort(&mut runs, e).await);
                    }
                }
            }
        }

        debug!(
            "Ledger holds {} line(s) from {} run(s)",
            self.ledger.len(),
            self.ledger.blocks()
        );
        let stats = self
            .statistics()
            .with_runs(progress.completed, progress.failed);
        info!(
            "All {} run(s) finished in {}, {} failed (peak {} live)",
            progress.completed,
            stats.runtime(),
            progress.failed,
            self.live.peak()
        );
        Ok(stats)
    }
}

/// Account for one finished run task
fn settle(
    joined: Result<RunResult, JoinError>,
    progress: &mut Progress,
) -> Result<(), DispatchError> {
    match joined {
        Ok(Ok(report)) => {
            progress.completed += 1;
            if report.succeeded() {
                debug!("{}", report);
            } else {
                progress.failed += 1;
                info!("{}", report);
            }
            Ok(())
        }
        Ok(Err(e)) => Err(e),
        Err(e) if e.is_panic() => Err(DispatchError::Panicked(e.to_string())),
        Err(_) => Err(DispatchError::Cancelled),
    }
}

/// Abort every live run and wait until their tasks are gone
async fn abort(runs: &mut JoinSet<RunResult>, error: DispatchError) -> DispatchError {
    if error.is_configuration() {
        error!("Aborting {} live run(s): {}", runs.len(), error);
    } else {
        warn!("Aborting {} live run(s): {}", runs.len(), error);
    }
    runs.shutdown().await;
    error
}
