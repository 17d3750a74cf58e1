//! Run execution engine
//!
//! Worker slot allocation, runner invocation and admission-controlled
//! dispatch of work items.

mod command;
mod dispatch;
mod error;
mod ledger;
mod offsets;
mod runner;

pub use dispatch::RunSession;
pub use error::DispatchError;
pub use runner::ProcessLauncher;
