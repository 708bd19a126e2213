//! # Wheel Bridge
//!
//! Drive a virtual Xbox 360 gamepad from a serial steering wheel controller.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Set up logging with tracing subscriber
//!    - Parse and validate command-line configuration
//!    - Validate the button token table
//!    - Create the virtual gamepad (exits if the host cannot)
//!
//! 2. **Main Loop**
//!    - Connect to the wheel, retrying every 3 seconds
//!    - Translate each serial line into stick or button updates
//!    - Reconnect after serial errors
//!
//! 3. **Shutdown**
//!    - Ctrl+C stops the loop and releases the virtual device
//!
//! Expected output:
//! ```text
//! INFO wheel_bridge: Wheel Bridge v0.1.0 starting...
//! INFO wheel_bridge::gamepad::uinput: Created virtual Xbox 360 pad 'Wheel Bridge Virtual Xbox 360 Pad'
//! INFO wheel_bridge::serial: Connected to /dev/ttyACM0 at 115200 baud
//! INFO wheel_bridge::bridge: Listening for serial input...
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wheel_bridge::bridge::{Bridge, BridgeSettings};
use wheel_bridge::config::{Cli, Config};
use wheel_bridge::gamepad::{self, VirtualGamepad};
use wheel_bridge::protocol::tokens::{validate_token_table, ButtonToken};
use wheel_bridge::serial::{SerialConnector, TransportManager};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Wheel Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_cli(Cli::parse()).context("invalid arguments")?;
    validate_token_table(&ButtonToken::ALL)?;

    let backend = gamepad::open_backend(config.dry_run)
        .context("virtual gamepad unavailable")?;
    let gamepad = VirtualGamepad::with_exponent(backend, config.steering.exponent);

    let connector = SerialConnector::new(config.serial.ports.clone(), config.serial.baud_rate);
    let link = TransportManager::with_timing(
        connector,
        config.connect_backoff(),
        config.reconnect_pause(),
    );
    let settings = BridgeSettings::from(&config);

    let session = async move {
        let mut bridge = Bridge::start(link, gamepad, settings).await;
        bridge.run().await;
    };

    tokio::select! {
        _ = session => {}
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for Ctrl+C")?;
            info!("Received Ctrl+C, shutting down...");
        }
    }

    Ok(())
}
