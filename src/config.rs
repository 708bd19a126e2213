//! # Configuration Module
//!
//! Builds and validates the runtime configuration from command-line
//! arguments. There is no configuration file; every setting has a default
//! matching the stock wheel firmware.

use std::time::Duration;

use clap::Parser;

use crate::error::{Result, WheelBridgeError};
use crate::serial::{DEFAULT_BAUD_RATE, DEFAULT_DEVICE_PATHS};
use crate::steering::curve::{PotRange, DEFAULT_EXPONENT, POT_MAX, POT_MIN};
use crate::steering::tracker::ANGLE_THRESHOLD;

/// Highest reading the wheel's 10-bit ADC can report
pub const ADC_MAX: i32 = 1023;

/// Baud rates the wheel firmware can be built with
pub const SUPPORTED_BAUD_RATES: [u32; 6] = [9600, 19200, 38400, 57600, 115_200, 230_400];

/// Command-line arguments
#[derive(Debug, Clone, Parser)]
#[command(name = "wheel-bridge", version, about)]
pub struct Cli {
    /// Serial device of the wheel (probes common paths when omitted)
    #[arg(short, long)]
    pub port: Option<String>,

    /// Serial baud rate
    #[arg(short, long, default_value_t = default_baud_rate())]
    pub baud: u32,

    /// Line polling timeout in milliseconds
    #[arg(long, default_value_t = default_read_timeout_ms())]
    pub read_timeout_ms: u64,

    /// Delay between failed connection attempts in milliseconds
    #[arg(long, default_value_t = default_connect_backoff_ms())]
    pub connect_backoff_ms: u64,

    /// Pause before reconnecting after a serial error, in milliseconds
    #[arg(long, default_value_t = default_reconnect_pause_ms())]
    pub reconnect_pause_ms: u64,

    /// Wait after the first connection for the board to finish resetting
    #[arg(long, default_value_t = default_settle_ms())]
    pub settle_ms: u64,

    /// How long a tapped button is held, in milliseconds
    #[arg(long, default_value_t = default_hold_ms())]
    pub hold_ms: u64,

    /// Steering response curve exponent (1.0 = linear)
    #[arg(long, default_value_t = default_exponent())]
    pub exponent: f64,

    /// Minimum steering change in degrees before the stick is updated
    #[arg(long, default_value_t = default_threshold_deg())]
    pub threshold: f64,

    /// Potentiometer reading at full left lock
    #[arg(long, default_value_t = default_pot_min())]
    pub pot_min: i32,

    /// Potentiometer reading at full right lock
    #[arg(long, default_value_t = default_pot_max())]
    pub pot_max: i32,

    /// Let readings outside pot-min..pot-max extrapolate instead of saturating
    #[arg(long)]
    pub no_clamp: bool,

    /// Require button lines to match a token exactly
    #[arg(long)]
    pub exact_tokens: bool,

    /// Decode and map input without creating a virtual gamepad
    #[arg(long)]
    pub dry_run: bool,
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub serial: SerialConfig,
    pub steering: SteeringConfig,
    pub buttons: ButtonConfig,
    pub dry_run: bool,
}

/// Serial port configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SerialConfig {
    /// Candidate device paths, tried in order
    pub ports: Vec<String>,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    pub connect_backoff_ms: u64,
    pub reconnect_pause_ms: u64,
    pub settle_ms: u64,
}

/// Steering axis configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SteeringConfig {
    pub pot_min: i32,
    pub pot_max: i32,
    pub exponent: f64,
    pub threshold_deg: f64,
    pub clamp_samples: bool,
}

/// Button configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ButtonConfig {
    pub hold_ms: u64,
    pub exact_tokens: bool,
}

// Default value functions
fn default_ports() -> Vec<String> {
    DEFAULT_DEVICE_PATHS.iter().map(|p| p.to_string()).collect()
}
fn default_baud_rate() -> u32 { DEFAULT_BAUD_RATE }
fn default_read_timeout_ms() -> u64 { 1000 }
fn default_connect_backoff_ms() -> u64 { 3000 }
fn default_reconnect_pause_ms() -> u64 { 1000 }
fn default_settle_ms() -> u64 { 3000 }

fn default_pot_min() -> i32 { POT_MIN }
fn default_pot_max() -> i32 { POT_MAX }
fn default_exponent() -> f64 { DEFAULT_EXPONENT }
fn default_threshold_deg() -> f64 { ANGLE_THRESHOLD }

fn default_hold_ms() -> u64 { 50 }

impl Default for Config {
    fn default() -> Self {
        Self {
            serial: SerialConfig {
                ports: default_ports(),
                baud_rate: default_baud_rate(),
                read_timeout_ms: default_read_timeout_ms(),
                connect_backoff_ms: default_connect_backoff_ms(),
                reconnect_pause_ms: default_reconnect_pause_ms(),
                settle_ms: default_settle_ms(),
            },
            steering: SteeringConfig {
                pot_min: default_pot_min(),
                pot_max: default_pot_max(),
                exponent: default_exponent(),
                threshold_deg: default_threshold_deg(),
                clamp_samples: true,
            },
            buttons: ButtonConfig {
                hold_ms: default_hold_ms(),
                exact_tokens: false,
            },
            dry_run: false,
        }
    }
}

fn invalid(msg: impl Into<String>) -> WheelBridgeError {
    WheelBridgeError::Config(msg.into())
}

impl Config {
    /// Build a validated configuration from parsed arguments
    ///
    /// # Errors
    ///
    /// Returns `Config` if any value is out of its valid range
    ///
    /// # Examples
    ///
    /// ```
    /// use clap::Parser;
    /// use wheel_bridge::config::{Cli, Config};
    ///
    /// let cli = Cli::parse_from(["wheel-bridge", "--port", "/dev/ttyUSB1"]);
    /// let config = Config::from_cli(cli)?;
    /// assert_eq!(config.serial.ports, vec!["/dev/ttyUSB1".to_string()]);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let config = Self {
            serial: SerialConfig {
                ports: cli.port.map_or_else(default_ports, |p| vec![p]),
                baud_rate: cli.baud,
                read_timeout_ms: cli.read_timeout_ms,
                connect_backoff_ms: cli.connect_backoff_ms,
                reconnect_pause_ms: cli.reconnect_pause_ms,
                settle_ms: cli.settle_ms,
            },
            steering: SteeringConfig {
                pot_min: cli.pot_min,
                pot_max: cli.pot_max,
                exponent: cli.exponent,
                threshold_deg: cli.threshold,
                clamp_samples: !cli.no_clamp,
            },
            buttons: ButtonConfig {
                hold_ms: cli.hold_ms,
                exact_tokens: cli.exact_tokens,
            },
            dry_run: cli.dry_run,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.ports.is_empty() || self.serial.ports.iter().any(|p| p.is_empty()) {
            return Err(invalid("serial port cannot be empty"));
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(format!(
                "baud_rate must be one of: {:?}",
                SUPPORTED_BAUD_RATES
            )));
        }

        // Validate timing fields
        if self.serial.read_timeout_ms == 0 || self.serial.read_timeout_ms > 10_000 {
            return Err(invalid("read_timeout_ms must be between 1 and 10000"));
        }

        for (name, value) in [
            ("connect_backoff_ms", self.serial.connect_backoff_ms),
            ("reconnect_pause_ms", self.serial.reconnect_pause_ms),
        ] {
            if value == 0 || value > 60_000 {
                return Err(invalid(format!("{} must be between 1 and 60000", name)));
            }
        }

        if self.serial.settle_ms > 10_000 {
            return Err(invalid("settle_ms must be at most 10000"));
        }

        if self.buttons.hold_ms == 0 || self.buttons.hold_ms > 1000 {
            return Err(invalid("hold_ms must be between 1 and 1000"));
        }

        // Validate potentiometer calibration
        let steering = &self.steering;
        if steering.pot_min < 0 || steering.pot_max > ADC_MAX {
            return Err(invalid(format!(
                "pot_min and pot_max must be within 0..={}",
                ADC_MAX
            )));
        }

        if steering.pot_min >= steering.pot_max {
            return Err(invalid("pot_min must be less than pot_max"));
        }

        if !steering.exponent.is_finite() || steering.exponent < 1.0 {
            return Err(invalid("exponent must be a finite value >= 1.0"));
        }

        if !steering.threshold_deg.is_finite() || steering.threshold_deg <= 0.0 {
            return Err(invalid("threshold must be greater than 0"));
        }

        Ok(())
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.serial.read_timeout_ms)
    }

    pub fn connect_backoff(&self) -> Duration {
        Duration::from_millis(self.serial.connect_backoff_ms)
    }

    pub fn reconnect_pause(&self) -> Duration {
        Duration::from_millis(self.serial.reconnect_pause_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.serial.settle_ms)
    }

    pub fn hold(&self) -> Duration {
        Duration::from_millis(self.buttons.hold_ms)
    }

    pub fn pot_range(&self) -> PotRange {
        PotRange::new(self.steering.pot_min, self.steering.pot_max)
    }
}
