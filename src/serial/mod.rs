//! # Serial Communication Module
//!
//! Handles the serial link to the wheel microcontroller.
//!
//! This module handles:
//! - Opening the serial port at 115,200 baud (8N1)
//! - Probing default device paths when no port is configured
//! - Reading newline-delimited telemetry with a polling timeout
//! - Reconnecting with a fixed backoff after errors
//!
//! ## Link States
//!
//! ```text
//! Disconnected -> Connecting -> Connected
//!       ^                           |
//!       +--------- (error) ---------+
//! ```
//!
//! [`TransportManager::connect`] never gives up: failed attempts are logged
//! and retried after a fixed delay until a port opens.

pub mod port_trait;

use std::time::Duration;

use async_trait::async_trait;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::error::{Result, WheelBridgeError};
use port_trait::{LineReader, LineTransport};

/// Wheel firmware baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Delay between failed connection attempts
pub const CONNECT_BACKOFF: Duration = Duration::from_secs(3);

/// Pause between closing a failed connection and reconnecting
pub const RECONNECT_PAUSE: Duration = Duration::from_secs(1);

/// Polling timeout for a single line read
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Default device paths to try (in order of preference)
#[cfg(not(windows))]
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // Native USB boards (Leonardo, Micro, Uno R3+)
    "/dev/ttyUSB0", // USB-to-serial adapters (CH340, FTDI)
];

/// Default device paths to try (in order of preference)
#[cfg(windows)]
pub const DEFAULT_DEVICE_PATHS: &[&str] = &["COM5"];

/// Source of new connections
#[async_trait]
pub trait Connector: Send {
    /// Connection type produced by [`Connector::open`]
    type Transport: LineTransport;

    /// Make one attempt to open a connection
    async fn open(&mut self) -> Result<Self::Transport>;

    /// Human-readable target for log messages
    fn describe(&self) -> String;
}

/// Serial connection to the wheel microcontroller
pub type SerialTransport = LineReader<tokio_serial::SerialStream>;

/// Opens the wheel's serial port
///
/// Candidate paths are tried in order on every attempt, so the device may
/// re-enumerate under a different name after being unplugged.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    paths: Vec<String>,
    baud_rate: u32,
}

impl SerialConnector {
    /// Create a connector for the given candidate paths
    ///
    /// # Examples
    ///
    /// ```
    /// use wheel_bridge::serial::SerialConnector;
    ///
    /// let connector = SerialConnector::new(vec!["/dev/ttyACM0".to_string()], 115_200);
    /// assert_eq!(connector.paths(), ["/dev/ttyACM0"]);
    /// ```
    pub fn new(paths: Vec<String>, baud_rate: u32) -> Self {
        Self { paths, baud_rate }
    }

    /// Create a connector probing [`DEFAULT_DEVICE_PATHS`]
    pub fn with_default_paths(baud_rate: u32) -> Self {
        Self::new(
            DEFAULT_DEVICE_PATHS.iter().map(|p| p.to_string()).collect(),
            baud_rate,
        )
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Open a specific serial port with 8N1 settings
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| WheelBridgeError::Serial(format!("Failed to open {}: {}", path, e)))
    }
}

#[async_trait]
impl Connector for SerialConnector {
    type Transport = SerialTransport;

    async fn open(&mut self) -> Result<SerialTransport> {
        for path in &self.paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, self.baud_rate) {
                Ok(port) => {
                    info!("Connected to {} at {} baud", path, self.baud_rate);
                    return Ok(LineReader::new(port));
                }
                Err(e) => {
                    debug!("{}", e);
                    continue;
                }
            }
        }

        Err(WheelBridgeError::SerialPortNotFound(self.paths.join(", ")))
    }

    fn describe(&self) -> String {
        self.paths.join(" | ")
    }
}

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

/// Owns connection establishment and recovery for one connector
#[derive(Debug)]
pub struct TransportManager<C> {
    connector: C,
    connect_backoff: Duration,
    reconnect_pause: Duration,
    state: LinkState,
    reconnects: u64,
}

impl<C: Connector> TransportManager<C> {
    /// Create a manager with the standard 3s backoff and 1s reconnect pause
    pub fn new(connector: C) -> Self {
        Self::with_timing(connector, CONNECT_BACKOFF, RECONNECT_PAUSE)
    }

    pub fn with_timing(connector: C, connect_backoff: Duration, reconnect_pause: Duration) -> Self {
        Self {
            connector,
            connect_backoff,
            reconnect_pause,
            state: LinkState::Disconnected,
            reconnects: 0,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Number of completed reconnects since startup
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    /// Open a connection, retrying forever
    ///
    /// Only returns once a connection is open.
    pub async fn connect(&mut self) -> C::Transport {
        loop {
            self.state = LinkState::Connecting;

            match self.connector.open().await {
                Ok(transport) => {
                    self.state = LinkState::Connected;
                    return transport;
                }
                Err(e) => {
                    self.state = LinkState::Disconnected;
                    warn!("Serial connection failed: {}", e);
                    info!(
                        "Retrying {} in {} seconds...",
                        self.connector.describe(),
                        self.connect_backoff.as_secs_f32()
                    );
                    tokio::time::sleep(self.connect_backoff).await;
                }
            }
        }
    }

    /// Replace a failed connection with a fresh one
    ///
    /// Closes `transport` (errors ignored), waits the reconnect pause, then
    /// blocks in [`TransportManager::connect`] and swaps the new connection in.
    pub async fn reconnect(&mut self, transport: &mut C::Transport) {
        if let Err(e) = transport.close().await {
            debug!("Ignoring error while closing serial port: {}", e);
        }
        self.state = LinkState::Disconnected;

        tokio::time::sleep(self.reconnect_pause).await;

        *transport = self.connect().await;
        self.reconnects += 1;
        info!("Reconnected to serial device (reconnect #{})", self.reconnects);
    }
}
