//! Companion backend pool
//!
//! Launches one backend server per worker slot and waits until they accept
//! connections, so multiplexed runs can attach to them by port.

mod health;
mod pool;

pub use health::{wait_for_ports, ReadinessConfig};
pub use pool::BackendPool;
