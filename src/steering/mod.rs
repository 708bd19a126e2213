//! # Steering Module
//!
//! Turns raw potentiometer readings into joystick deflection.
//!
//! This module handles:
//! - Mapping readings to steering angles
//! - Shaping axis values with a response curve
//! - Suppressing sub-degree jitter

pub mod curve;
pub mod tracker;
