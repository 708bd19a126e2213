//! # Wheel Line Protocol
//!
//! Newline-delimited ASCII telemetry from the wheel microcontroller.
//!
//! This module handles:
//! - The button token table and its startup validation
//! - Classifying lines into button presses, axis samples and junk

pub mod decoder;
pub mod tokens;
