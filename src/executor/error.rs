//! Dispatch errors
//!
//! Only failures that make the whole session meaningless are errors here.
//! Failing scenarios and non-zero exit codes are data and surface through
//! the statistics instead.

use std::io;
use thiserror::Error;

/// Session-fatal dispatch errors
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No port available for worker slot {offset} (base port {base_port})")]
    PortRange { base_port: u16, offset: usize },

    #[error("Run task panicked: {0}")]
    Panicked(String),

    #[error("Dispatch cancelled")]
    Cancelled,
}

impl DispatchError {
    /// Whether the error was caused by configuration rather than a runtime event
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DispatchError::Launch { .. }
                | DispatchError::InvalidConfig(_)
                | DispatchError::PortRange { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DispatchError::Launch {
            program: "xvfb-run".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.to_string(), "Failed to launch `xvfb-run`: not found");
        assert!(err.is_configuration());
        assert!(!DispatchError::Cancelled.is_configuration());
    }
}
