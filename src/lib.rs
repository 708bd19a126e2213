//! # Wheel Bridge Library
//!
//! Drive a virtual Xbox 360 gamepad from a serial steering wheel controller.
//!
//! This library provides the core functionality for translating the line
//! telemetry of a potentiometer wheel (steering readings and button tokens)
//! into left-stick deflection and button taps on a virtual pad.

pub mod bridge;
pub mod config;
pub mod error;
pub mod gamepad;
pub mod protocol;
pub mod serial;
pub mod steering;
