//! Data models for parallel cucumber runs
//!
//! Work items handed to the dispatcher and the reports each run returns.

mod run;
mod work_item;

pub use run::RunReport;
pub use work_item::WorkItem;
