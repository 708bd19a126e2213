//! # ViGEmBus Gamepad Backend
//!
//! Creates a virtual wired Xbox 360 controller on Windows through the
//! ViGEmBus driver. XInput games see it like any other pad.
//!
//! The whole controller state lives in one [`XGamepad`] report. Staging
//! edits that report; [`GamepadBackend::commit`] submits it.
//!
//! ## Buttons
//!
//! | Button | XInput bit |
//! |--------|------------|
//! | A / B / X / Y | `XButtons::A` / `B` / `X` / `Y` |
//! | LB / RB | `XButtons::LB` / `RB` |
//! | DPad Left / Right | `XButtons::LEFT` / `RIGHT` |

use tracing::info;
use vigem_client::{Client, TargetId, XButtons, XGamepad, Xbox360Wired};

use super::{GamepadBackend, VirtualButton};
use crate::error::{Result, WheelBridgeError};

/// XInput button bit for a virtual button.
#[must_use]
pub fn button_mask(button: VirtualButton) -> u16 {
    match button {
        VirtualButton::A => XButtons::A,
        VirtualButton::B => XButtons::B,
        VirtualButton::X => XButtons::X,
        VirtualButton::Y => XButtons::Y,
        VirtualButton::DpadLeft => XButtons::LEFT,
        VirtualButton::DpadRight => XButtons::RIGHT,
        VirtualButton::LeftShoulder => XButtons::LB,
        VirtualButton::RightShoulder => XButtons::RB,
    }
}

fn stick_value(value: i32) -> i16 {
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

fn bus_error(context: &str) -> impl Fn(vigem_client::Error) -> WheelBridgeError + '_ {
    move |e| WheelBridgeError::Device(format!("{}: {}", context, e))
}

/// Checks that the ViGEmBus driver is installed and reachable.
///
/// # Errors
///
/// Returns the reason when the bus cannot be opened.
pub fn probe_bus() -> std::result::Result<(), String> {
    Client::connect()
        .map(drop)
        .map_err(|e| format!("ViGEmBus not reachable ({}); is the driver installed?", e))
}

/// Virtual Xbox 360 pad plugged into ViGEmBus.
///
/// Dropping it unplugs the controller.
pub struct VigemGamepad {
    target: Xbox360Wired<Client>,
    report: XGamepad,
}

impl std::fmt::Debug for VigemGamepad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VigemGamepad")
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

impl VigemGamepad {
    /// Connects to the bus and plugs in a wired Xbox 360 controller.
    ///
    /// # Errors
    ///
    /// Returns `Device` if the bus is missing or refuses the controller.
    pub fn create() -> Result<Self> {
        let client = Client::connect().map_err(bus_error("Failed to connect to ViGEmBus"))?;

        let mut target = Xbox360Wired::new(client, TargetId::XBOX360_WIRED);
        target
            .plugin()
            .map_err(bus_error("Failed to plug in virtual pad"))?;
        target
            .wait_ready()
            .map_err(bus_error("Virtual pad did not become ready"))?;

        info!("Created virtual Xbox 360 pad on ViGEmBus");

        Ok(Self {
            target,
            report: XGamepad::default(),
        })
    }
}

/// Applies a button transition to a report.
fn stage_button(report: &mut XGamepad, button: VirtualButton, pressed: bool) {
    let mask = button_mask(button);
    if pressed {
        report.buttons.raw |= mask;
    } else {
        report.buttons.raw &= !mask;
    }
}

impl GamepadBackend for VigemGamepad {
    fn set_left_stick(&mut self, x: i32, y: i32) -> Result<()> {
        self.report.thumb_lx = stick_value(x);
        self.report.thumb_ly = stick_value(y);
        Ok(())
    }

    fn set_button(&mut self, button: VirtualButton, pressed: bool) -> Result<()> {
        stage_button(&mut self.report, button, pressed);
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.target
            .update(&self.report)
            .map_err(bus_error("Failed to submit report"))
    }
}
