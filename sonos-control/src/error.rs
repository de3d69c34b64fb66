//! Error types for the device layer

use thiserror::Error;

/// Errors that can occur during SOAP communication
#[derive(Debug, Error)]
pub enum SoapError {
    /// Network or HTTP communication error
    #[error("Network/HTTP error: {0}")]
    Network(String),

    /// XML parsing error
    #[error("XML parsing error: {0}")]
    Parse(String),

    /// SOAP fault returned by the device
    #[error("SOAP fault: error code {0}")]
    Fault(u16),
}

/// Errors raised by discovery, control and event subscription
#[derive(Debug, Error)]
pub enum ControlError {
    /// A SOAP or GENA request failed
    #[error(transparent)]
    Soap(#[from] SoapError),

    /// SSDP discovery could not run
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// A device response or event body could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// The zone is not known to the registry (no UUID recorded for it)
    #[error("Unknown zone: {0}")]
    UnknownZone(String),

    /// The NOTIFY callback server could not be started
    #[error("Callback server error: {0}")]
    CallbackServer(String),

    /// Subscription lifecycle failure
    #[error("Subscription error: {0}")]
    Subscription(String),
}

/// Convenience Result alias for device layer operations
pub type Result<T> = std::result::Result<T, ControlError>;
