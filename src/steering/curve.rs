//! # Response Curve Module
//!
//! Converts potentiometer readings into steering angles and shapes joystick
//! axis values with a power curve.
//!
//! ## Angle Mapping
//!
//! The potentiometer reports 0-1023, with the usable mechanical travel of the
//! wheel calibrated to 25-1010. That span is mapped linearly onto -180°..180°.
//! Readings outside the calibrated span extrapolate past ±180°; callers that
//! want saturation use [`clamp_sample`] first.
//!
//! ## Response Curve
//!
//! The formula used is: `output = sign(input) * (|input| / 32767)^exponent * 32767`
//!
//! - `exponent = 1.0`: Linear response
//! - `exponent = 2.0`: Reduced sensitivity around center (default)
//! - `exponent = 3.0`: Strong center softening
//!
//! Full deflection is preserved at both ends for every exponent.
//!
//! ## Usage
//!
//! ```
//! use wheel_bridge::steering::curve::{apply_response_curve, map_angle, PotRange};
//!
//! let range = PotRange::default();
//! assert_eq!(map_angle(25, &range), -180.0);
//!
//! // Half deflection is softened to a quarter with the default exponent
//! assert_eq!(apply_response_curve(16384, 2.0), 8192);
//! ```

/// Maximum magnitude of the virtual stick axis.
pub const AXIS_MAX: i32 = 32767;

/// Default response curve exponent.
pub const DEFAULT_EXPONENT: f64 = 2.0;

/// Lowest calibrated potentiometer reading (full left).
pub const POT_MIN: i32 = 25;
/// Highest calibrated potentiometer reading (full right).
pub const POT_MAX: i32 = 1010;

/// Steering angle at the low end of the potentiometer span.
pub const ANGLE_MIN: f64 = -180.0;
/// Steering angle at the high end of the potentiometer span.
pub const ANGLE_MAX: f64 = 180.0;

/// Largest angle the wheel can express on the joystick axis.
pub const STICK_ANGLE_LIMIT: f64 = 90.0;

/// Input and output spans of the potentiometer-to-angle map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PotRange {
    /// Raw reading mapped to `out_min`.
    pub in_min: i32,
    /// Raw reading mapped to `out_max`.
    pub in_max: i32,
    /// Angle in degrees at `in_min`.
    pub out_min: f64,
    /// Angle in degrees at `in_max`.
    pub out_max: f64,
}

impl Default for PotRange {
    fn default() -> Self {
        Self {
            in_min: POT_MIN,
            in_max: POT_MAX,
            out_min: ANGLE_MIN,
            out_max: ANGLE_MAX,
        }
    }
}

impl PotRange {
    /// Creates a range with custom calibration endpoints and the default ±180° output.
    #[must_use]
    pub fn new(in_min: i32, in_max: i32) -> Self {
        Self {
            in_min,
            in_max,
            ..Self::default()
        }
    }

    /// Midpoint of the calibrated input span (0° for a symmetric output span).
    #[must_use]
    pub fn center(&self) -> f64 {
        f64::from(self.in_min + self.in_max) / 2.0
    }
}

/// Maps a raw potentiometer reading to a steering angle in degrees.
///
/// Plain linear interpolation; values outside `in_min..=in_max` extrapolate.
///
/// # Examples
///
/// ```
/// use wheel_bridge::steering::curve::{map_angle, PotRange};
///
/// let range = PotRange::default();
/// assert_eq!(map_angle(1010, &range), 180.0);
/// assert!(map_angle(1023, &range) > 180.0);
/// ```
#[must_use]
pub fn map_angle(sample: i32, range: &PotRange) -> f64 {
    let span_in = f64::from(range.in_max - range.in_min);
    let span_out = range.out_max - range.out_min;
    f64::from(sample - range.in_min) * span_out / span_in + range.out_min
}

/// Saturates a raw reading to the calibrated span.
#[must_use]
pub fn clamp_sample(sample: i32, range: &PotRange) -> i32 {
    sample.clamp(range.in_min, range.in_max)
}

/// Applies the power response curve to a signed axis value.
///
/// Inputs are saturated to ±32767 first, so the function is total.
/// The result is truncated toward zero.
///
/// # Arguments
///
/// * `value` - Axis value (-32767 to 32767)
/// * `exponent` - Curve exponent, `1.0` is linear
///
/// # Examples
///
/// ```
/// use wheel_bridge::steering::curve::apply_response_curve;
///
/// assert_eq!(apply_response_curve(0, 2.0), 0);
/// assert_eq!(apply_response_curve(32767, 2.0), 32767);
/// assert_eq!(apply_response_curve(-32767, 2.0), -32767);
/// ```
#[must_use]
pub fn apply_response_curve(value: i32, exponent: f64) -> i32 {
    let value = value.clamp(-AXIS_MAX, AXIS_MAX);
    let sign = if value >= 0 { 1.0 } else { -1.0 };
    let normalized = f64::from(value.abs()) / f64::from(AXIS_MAX);
    let curved = normalized.powf(exponent);
    (sign * curved * f64::from(AXIS_MAX)) as i32
}

/// Converts a steering angle into a raw horizontal stick value.
///
/// The angle is saturated to ±90°, projected with `sin`, and scaled by
/// `magnitude` (0.0 to 1.0) and the axis range. The response curve is not
/// applied here.
#[must_use]
pub fn angle_to_axis(angle_degrees: f64, magnitude: f64) -> i32 {
    let angle = angle_degrees.clamp(-STICK_ANGLE_LIMIT, STICK_ANGLE_LIMIT);
    let x = angle.to_radians().sin();
    (x * magnitude.clamp(0.0, 1.0) * f64::from(AXIS_MAX)) as i32
}
