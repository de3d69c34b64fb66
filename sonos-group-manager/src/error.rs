//! Error types for the group manager

use std::path::PathBuf;

use sonos_control::ControlError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManagerError {
    /// A device query or command failed
    #[error(transparent)]
    Control(#[from] ControlError),

    /// Discovery found no zone players
    #[error("Could not detect Sonos network!")]
    NoZonesDiscovered,

    /// Another process holds the PID file lock
    #[error("Another instance is already running!")]
    AlreadyRunning,

    #[error("PID file {path}: {source}")]
    PidFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, ManagerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use sonos_control::SoapError;

    #[test]
    fn test_startup_failures_carry_operator_messages() {
        assert_eq!(
            ManagerError::AlreadyRunning.to_string(),
            "Another instance is already running!"
        );
        assert_eq!(
            ManagerError::NoZonesDiscovered.to_string(),
            "Could not detect Sonos network!"
        );
    }

    #[test]
    fn test_control_errors_are_transparent() {
        let error: ManagerError = ControlError::from(SoapError::Fault(800)).into();
        assert_eq!(error.to_string(), "SOAP fault: error code 800");
    }
}
