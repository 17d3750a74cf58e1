//! caramballel - parallel cucumber runner
//!
//! Runs cucumber features or single scenarios as separate processes, at
//! most `--num-procs` at a time. Every live process owns a worker slot whose
//! offset selects its spork port (`base_port + offset`) and optionally its
//! database name. Output of all runs is collected and the scenario and step
//! counts are summed up at the end.
//!
//! ## Usage
//!
//! ```bash
//! # Start one spork per worker slot and wait until they listen
//! caramballel --run-spork -n 4
//!
//! # Run every scenario in ./features on four workers
//! caramballel -n 4
//!
//! # Run whole feature files without spork or xvfb
//! caramballel --run-features --no-spork --no-xvfb-wrapper features/login.feature
//! ```

use anyhow::{anyhow, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};

mod backend;
mod cli;
mod config;
mod discovery;
mod executor;
mod models;
mod output;
mod stats;
mod utils;

use backend::{BackendPool, ReadinessConfig};
use cli::Args;
use config::{AppConfig, EnvConfig};
use executor::{ProcessLauncher, RunSession};
use output::{OutputFormat, SessionSummary, SummaryFormatter};
use utils::{init_logger, LogLevel};

/// Exit code when some scenarios or steps did not pass
const EXIT_TESTS_FAILED: u8 = 1;
/// Exit code for configuration and launch errors
const EXIT_FATAL: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logger(LogLevel::from_flags(args.verbose, args.quiet));

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let env = EnvConfig::load();
    let mut config = AppConfig::resolve(args.config.as_deref(), &env)?;
    args.apply(&mut config);
    config.validate()?;

    let format = OutputFormat::from_str(&args.format)
        .ok_or_else(|| anyhow!("Unknown output format: {}", args.format))?;

    if args.run_spork {
        launch_backends(&config).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let items =
        discovery::collect_work_items(&args.targets, &config.features_dir, config.batch_by_file)?;
    if items.is_empty() {
        warn!("No scenarios or features found");
    }
    let work_items = items.len();

    let session = RunSession::new(&config, ProcessLauncher)?;
    let cancel = session.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping all runs");
            cancel.cancel();
        }
    });

    let statistics = session.run_all(items).await?;
    let summary = SessionSummary::new(
        session.timer().started_at(),
        work_items,
        config.concurrency,
        statistics,
    );

    println!("{}", SummaryFormatter::new(format).format(&summary));

    Ok(if summary.all_passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_TESTS_FAILED)
    })
}

/// Start the backend pool and leave it running
async fn launch_backends(config: &AppConfig) -> Result<()> {
    let pool = BackendPool::launch(config)?;
    let ports = pool.ports();

    if config.backend.wait_for_ready {
        backend::wait_for_ports(&ports, &ReadinessConfig::from(&config.backend)).await?;
    }

    let pids = pool.detach();
    info!("Started {} backend(s) on ports {:?} (pids {:?})", pids.len(), ports, pids);
    Ok(())
}
