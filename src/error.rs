//! # Error Types
//!
//! Custom error types for Wheel Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for Wheel Bridge
#[derive(Debug, Error)]
pub enum WheelBridgeError {
    /// Serial port could not be opened or configured
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// I/O failure on an open connection (device unplugged, read error)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Virtual device creation or report commit failed
    #[error("Virtual device error: {0}")]
    Device(String),

    /// Host has no virtual gamepad capability
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Button token table failed startup validation
    #[error("Invalid button token table: {0}")]
    TokenTable(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WheelBridgeError {
    /// Returns true for errors the dispatch loop recovers from by reconnecting.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Io(_))
    }
}

/// Result type alias for Wheel Bridge
pub type Result<T> = std::result::Result<T, WheelBridgeError>;
