//! # Steering Change Tracker
//!
//! Suppresses axis updates that move less than a threshold away from the
//! last angle actually sent to the virtual device. Potentiometer readings
//! jitter by a few counts even when the wheel is still; without this guard
//! every jitter would become a HID report.

/// Default minimum change in degrees before a new angle is emitted.
pub const ANGLE_THRESHOLD: f64 = 1.0;

/// Remembers the last emitted steering angle.
///
/// # Examples
///
/// ```
/// use wheel_bridge::steering::tracker::AngleTracker;
///
/// let mut tracker = AngleTracker::default();
/// assert!(tracker.should_emit(10.0));   // first sample always passes
/// assert!(!tracker.should_emit(10.4));  // jitter
/// assert!(tracker.should_emit(12.0));
/// assert_eq!(tracker.last_emitted(), Some(12.0));
/// ```
#[derive(Debug, Clone)]
pub struct AngleTracker {
    prev_angle: Option<f64>,
    threshold: f64,
}

impl Default for AngleTracker {
    fn default() -> Self {
        Self::new(ANGLE_THRESHOLD)
    }
}

impl AngleTracker {
    /// Creates a tracker with the given threshold in degrees.
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            prev_angle: None,
            threshold,
        }
    }

    /// Decides whether `new_angle` should be sent and records it if so.
    ///
    /// Returns true for the first sample, or when the angle differs from the
    /// last emitted one by at least the threshold. Rejected samples leave the
    /// stored angle untouched, so slow drift still accumulates to an update.
    pub fn should_emit(&mut self, new_angle: f64) -> bool {
        let emit = match self.prev_angle {
            None => true,
            Some(prev) => (new_angle - prev).abs() >= self.threshold,
        };
        if emit {
            self.prev_angle = Some(new_angle);
        }
        emit
    }

    /// Puts back a reference angle taken from [`AngleTracker::last_emitted`].
    ///
    /// Used when an accepted angle never reached the device, so the next
    /// sample is judged against what the device actually shows.
    pub fn revert(&mut self, previous: Option<f64>) {
        self.prev_angle = previous;
    }

    /// Last angle that passed [`AngleTracker::should_emit`].
    #[must_use]
    pub fn last_emitted(&self) -> Option<f64> {
        self.prev_angle
    }

    /// Configured threshold in degrees.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}
