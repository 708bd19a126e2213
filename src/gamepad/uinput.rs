//! # uinput Gamepad Backend
//!
//! Creates a virtual Xbox 360 controller through the Linux uinput interface
//! using evdev.
//!
//! The device mirrors what the `xpad` driver exposes for a wired pad, so
//! games and Steam Input pick it up without extra mapping.
//!
//! ## Buttons (EV_KEY)
//!
//! | Button | evdev Code |
//! |--------|------------|
//! | A | BTN_SOUTH |
//! | B | BTN_EAST |
//! | X | BTN_NORTH |
//! | Y | BTN_WEST |
//! | LB | BTN_TL |
//! | RB | BTN_TR |
//! | Back / Start / Guide | BTN_SELECT / BTN_START / BTN_MODE |
//! | L3 / R3 | BTN_THUMBL / BTN_THUMBR |
//!
//! ## Axes (EV_ABS)
//!
//! | Axis | evdev Code | Range |
//! |------|------------|-------|
//! | Left Stick X/Y | ABS_X / ABS_Y | -32768..32767 |
//! | Right Stick X/Y | ABS_RX / ABS_RY | -32768..32767 |
//! | Triggers | ABS_Z / ABS_RZ | 0..255 |
//! | D-Pad | ABS_HAT0X / ABS_HAT0Y | -1..1 |

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{
    AbsInfo, AbsoluteAxisType, AttributeSet, BusType, EventType, InputEvent, InputId, Key,
    UinputAbsSetup,
};
use tracing::info;

use super::{GamepadBackend, VirtualButton};
use crate::error::{Result, WheelBridgeError};

/// Microsoft vendor ID
const XBOX360_VENDOR_ID: u16 = 0x045e;

/// Xbox 360 wired controller product ID
const XBOX360_PRODUCT_ID: u16 = 0x028e;

const XBOX360_VERSION: u16 = 0x0110;

/// Name shown to the host
pub const DEVICE_NAME: &str = "Wheel Bridge Virtual Xbox 360 Pad";

pub const STICK_MIN: i32 = -32768;
pub const STICK_MAX: i32 = 32767;
const STICK_FUZZ: i32 = 16;
const STICK_FLAT: i32 = 128;

pub const TRIGGER_MAX: i32 = 255;

const PAD_KEYS: [Key; 11] = [
    Key::BTN_SOUTH,
    Key::BTN_EAST,
    Key::BTN_NORTH,
    Key::BTN_WEST,
    Key::BTN_TL,
    Key::BTN_TR,
    Key::BTN_SELECT,
    Key::BTN_START,
    Key::BTN_MODE,
    Key::BTN_THUMBL,
    Key::BTN_THUMBR,
];

/// Translates a button transition into the event the pad would report.
///
/// Face and shoulder buttons are keys; D-pad directions move the hat axis.
#[must_use]
pub fn button_event(button: VirtualButton, pressed: bool) -> InputEvent {
    let key = |key: Key| InputEvent::new(EventType::KEY, key.code(), i32::from(pressed));
    let hat = |direction: i32| {
        InputEvent::new(
            EventType::ABSOLUTE,
            AbsoluteAxisType::ABS_HAT0X.0,
            if pressed { direction } else { 0 },
        )
    };

    match button {
        VirtualButton::A => key(Key::BTN_SOUTH),
        VirtualButton::B => key(Key::BTN_EAST),
        VirtualButton::X => key(Key::BTN_NORTH),
        VirtualButton::Y => key(Key::BTN_WEST),
        VirtualButton::LeftShoulder => key(Key::BTN_TL),
        VirtualButton::RightShoulder => key(Key::BTN_TR),
        VirtualButton::DpadLeft => hat(-1),
        VirtualButton::DpadRight => hat(1),
    }
}

fn stick_event(axis: AbsoluteAxisType, value: i32) -> InputEvent {
    InputEvent::new(
        EventType::ABSOLUTE,
        axis.0,
        value.clamp(STICK_MIN, STICK_MAX),
    )
}

fn device_error(context: &str) -> impl Fn(std::io::Error) -> WheelBridgeError + '_ {
    move |e| WheelBridgeError::Device(format!("{}: {}", context, e))
}

/// Virtual Xbox 360 pad backed by `/dev/uinput`.
///
/// Staged events are buffered and written in one batch, terminated by a
/// single SYN_REPORT, on [`GamepadBackend::commit`].
pub struct UinputGamepad {
    device: VirtualDevice,
    pending: Vec<InputEvent>,
}

impl std::fmt::Debug for UinputGamepad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UinputGamepad")
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl UinputGamepad {
    /// Creates and registers the virtual pad.
    ///
    /// # Errors
    ///
    /// Returns `Device` if `/dev/uinput` cannot be opened (usually a
    /// permissions problem) or the kernel rejects the device description.
    pub fn create() -> Result<Self> {
        let mut keys = AttributeSet::<Key>::new();
        for key in PAD_KEYS {
            keys.insert(key);
        }

        let stick = AbsInfo::new(0, STICK_MIN, STICK_MAX, STICK_FUZZ, STICK_FLAT, 0);
        let trigger = AbsInfo::new(0, 0, TRIGGER_MAX, 0, 0, 0);
        let hat = AbsInfo::new(0, -1, 1, 0, 0, 0);

        let mut builder = VirtualDeviceBuilder::new()
            .map_err(device_error("Failed to open uinput"))?
            .name(DEVICE_NAME)
            .input_id(InputId::new(
                BusType::BUS_USB,
                XBOX360_VENDOR_ID,
                XBOX360_PRODUCT_ID,
                XBOX360_VERSION,
            ))
            .with_keys(&keys)
            .map_err(device_error("Failed to register buttons"))?;

        for (axis, info) in [
            (AbsoluteAxisType::ABS_X, stick),
            (AbsoluteAxisType::ABS_Y, stick),
            (AbsoluteAxisType::ABS_RX, stick),
            (AbsoluteAxisType::ABS_RY, stick),
            (AbsoluteAxisType::ABS_Z, trigger),
            (AbsoluteAxisType::ABS_RZ, trigger),
            (AbsoluteAxisType::ABS_HAT0X, hat),
            (AbsoluteAxisType::ABS_HAT0Y, hat),
        ] {
            builder = builder
                .with_absolute_axis(&UinputAbsSetup::new(axis, info))
                .map_err(device_error("Failed to register axis"))?;
        }

        let device = builder
            .build()
            .map_err(device_error("Failed to create virtual pad"))?;

        info!("Created virtual Xbox 360 pad '{}'", DEVICE_NAME);

        Ok(Self {
            device,
            pending: Vec::with_capacity(4),
        })
    }
}

impl GamepadBackend for UinputGamepad {
    fn set_left_stick(&mut self, x: i32, y: i32) -> Result<()> {
        self.pending.push(stick_event(AbsoluteAxisType::ABS_X, x));
        self.pending.push(stick_event(AbsoluteAxisType::ABS_Y, y));
        Ok(())
    }

    fn set_button(&mut self, button: VirtualButton, pressed: bool) -> Result<()> {
        self.pending.push(button_event(button, pressed));
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        // emit() appends the SYN_REPORT
        let result = self
            .device
            .emit(&self.pending)
            .map_err(device_error("Failed to send report"));
        self.pending.clear();
        result
    }
}
