//! # Virtual Gamepad Module
//!
//! Drives a virtual Xbox 360 controller from steering angles and button taps.
//!
//! This module handles:
//! - The [`GamepadBackend`] capability trait (stage state, commit a report)
//! - Picking a backend at startup by probing the host
//! - Converting steering angles into curved left-stick deflection
//! - Timed button taps (press, hold, release)
//!
//! ## Backends
//!
//! | Backend | Platform | Behaviour |
//! |---------|----------|-----------|
//! | `uinput::UinputGamepad` | Linux with `/dev/uinput` | Real virtual pad |
//! | `vigem::VigemGamepad` | Windows with ViGEmBus | Real virtual pad |
//! | [`null::NullGamepad`] | any (`--dry-run`) | Accepts and discards everything |

pub mod null;
#[cfg(target_os = "linux")]
pub mod uinput;
#[cfg(windows)]
pub mod vigem;

use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, WheelBridgeError};
use crate::steering::curve::{angle_to_axis, apply_response_curve, DEFAULT_EXPONENT};

/// Default time a tapped button stays pressed.
pub const DEFAULT_HOLD: Duration = Duration::from_millis(50);

/// Path of the Linux user-space input device node.
#[cfg(target_os = "linux")]
pub const UINPUT_PATH: &str = "/dev/uinput";

/// Digital controls the wheel can tap on the virtual pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VirtualButton {
    A,
    B,
    X,
    Y,
    DpadLeft,
    DpadRight,
    LeftShoulder,
    RightShoulder,
}

impl std::fmt::Display for VirtualButton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            VirtualButton::A => "A",
            VirtualButton::B => "B",
            VirtualButton::X => "X",
            VirtualButton::Y => "Y",
            VirtualButton::DpadLeft => "DPad Left",
            VirtualButton::DpadRight => "DPad Right",
            VirtualButton::LeftShoulder => "LB",
            VirtualButton::RightShoulder => "RB",
        };
        f.write_str(name)
    }
}

/// Low-level access to a virtual controller.
///
/// `set_*` calls stage state; nothing reaches the host until
/// [`GamepadBackend::commit`] sends the report.
#[cfg_attr(test, mockall::automock)]
pub trait GamepadBackend {
    /// Stages the left stick position (each axis -32768 to 32767).
    fn set_left_stick(&mut self, x: i32, y: i32) -> Result<()>;

    /// Stages a button as pressed or released.
    fn set_button(&mut self, button: VirtualButton, pressed: bool) -> Result<()>;

    /// Flushes staged state to the host as one report.
    fn commit(&mut self) -> Result<()>;
}

impl<T: GamepadBackend + ?Sized> GamepadBackend for Box<T> {
    fn set_left_stick(&mut self, x: i32, y: i32) -> Result<()> {
        (**self).set_left_stick(x, y)
    }

    fn set_button(&mut self, button: VirtualButton, pressed: bool) -> Result<()> {
        (**self).set_button(button, pressed)
    }

    fn commit(&mut self) -> Result<()> {
        (**self).commit()
    }
}

/// Steering-wheel view of a virtual controller.
///
/// Owns the backend for the life of the process; dropping it releases the
/// OS device.
#[derive(Debug)]
pub struct VirtualGamepad<B> {
    backend: B,
    exponent: f64,
}

impl<B: GamepadBackend> VirtualGamepad<B> {
    /// Wraps a backend using the default response curve.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self::with_exponent(backend, DEFAULT_EXPONENT)
    }

    #[must_use]
    pub fn with_exponent(backend: B, exponent: f64) -> Self {
        Self { backend, exponent }
    }

    /// Points the left stick according to a steering angle.
    ///
    /// The angle is saturated to ±90°, its sine scaled by `magnitude`
    /// (0.0 to 1.0) and the stick range, then shaped by the response curve.
    /// The vertical axis is always centered. Returns the X value written.
    ///
    /// # Errors
    ///
    /// Returns `Device` if the backend rejects the update or commit.
    pub fn set_left_stick(&mut self, angle_degrees: f64, magnitude: f64) -> Result<i32> {
        let raw = angle_to_axis(angle_degrees, magnitude);
        let x = apply_response_curve(raw, self.exponent);
        self.backend.set_left_stick(x, 0)?;
        self.backend.commit()?;
        debug!("Left stick: angle {:.1}° -> x {}", angle_degrees, x);
        Ok(x)
    }

    /// Presses `button`, holds it for `hold`, then releases it.
    ///
    /// Each transition is committed separately. The caller is suspended for
    /// the whole hold; on a single-task loop nothing else runs meanwhile.
    ///
    /// # Errors
    ///
    /// Returns `Device` if the press or release cannot be committed. A failed
    /// press skips the hold and the release.
    pub async fn tap(&mut self, button: VirtualButton, hold: Duration) -> Result<()> {
        self.backend.set_button(button, true)?;
        self.backend.commit()?;

        tokio::time::sleep(hold).await;

        self.backend.set_button(button, false)?;
        self.backend.commit()?;
        debug!("Tapped {} for {:?}", button, hold);
        Ok(())
    }
}

/// Host support for creating a virtual gamepad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    /// A real backend can be created.
    Available,
    /// No backend on this host, with the reason.
    Missing(String),
}

/// Checks whether this host can create a virtual gamepad.
#[must_use]
pub fn probe_capability() -> Capability {
    #[cfg(target_os = "linux")]
    {
        if std::path::Path::new(UINPUT_PATH).exists() {
            Capability::Available
        } else {
            Capability::Missing(format!(
                "{} not found (is the uinput module loaded?)",
                UINPUT_PATH
            ))
        }
    }

    #[cfg(windows)]
    {
        match vigem::probe_bus() {
            Ok(()) => Capability::Available,
            Err(reason) => Capability::Missing(reason),
        }
    }

    #[cfg(not(any(target_os = "linux", windows)))]
    {
        Capability::Missing(format!(
            "no virtual gamepad backend for {}",
            std::env::consts::OS
        ))
    }
}

/// Opens the backend for this run.
///
/// `dry_run` selects the no-op backend without probing. Otherwise the host
/// must pass [`probe_capability`] and the real device must initialise.
///
/// # Errors
///
/// - `UnsupportedPlatform`: the host has no virtual gamepad capability
/// - `Device`: the capability exists but device creation failed
pub fn open_backend(dry_run: bool) -> Result<Box<dyn GamepadBackend>> {
    if dry_run {
        info!("Dry run: virtual gamepad output disabled");
        return Ok(Box::new(null::NullGamepad::default()));
    }

    match probe_capability() {
        Capability::Available => open_platform_backend(),
        Capability::Missing(reason) => Err(WheelBridgeError::UnsupportedPlatform(reason)),
    }
}

#[cfg(target_os = "linux")]
fn open_platform_backend() -> Result<Box<dyn GamepadBackend>> {
    Ok(Box::new(uinput::UinputGamepad::create()?))
}

#[cfg(windows)]
fn open_platform_backend() -> Result<Box<dyn GamepadBackend>> {
    Ok(Box::new(vigem::VigemGamepad::create()?))
}

#[cfg(not(any(target_os = "linux", windows)))]
fn open_platform_backend() -> Result<Box<dyn GamepadBackend>> {
    Err(WheelBridgeError::UnsupportedPlatform(
        std::env::consts::OS.to_string(),
    ))
}
