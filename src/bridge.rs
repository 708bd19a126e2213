//! # Dispatch Loop
//!
//! The bridge's steady-state control loop: read a line, decode it, and act on
//! the virtual gamepad.
//!
//! ## Control Flow
//!
//! Each [`Bridge::step`]:
//!
//! 1. Polls the transport for one line (returns idle after the read timeout)
//! 2. Decodes the line
//! 3. Blank and unrecognised lines are logged and skipped
//! 4. Button tokens tap their virtual button (the loop waits out the hold)
//! 5. Potentiometer samples are mapped to an angle, sign-flipped, filtered
//!    through the change threshold, and written to the left stick
//! 6. Transport errors close the port, pause, and reconnect
//!
//! Per-line failures never end the loop; only process termination does.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::gamepad::{GamepadBackend, VirtualGamepad};
use crate::protocol::decoder::{LineDecoder, LineEvent, TokenMatch};
use crate::protocol::tokens::ButtonToken;
use crate::serial::port_trait::LineTransport;
use crate::serial::{Connector, TransportManager};
use crate::steering::curve::{clamp_sample, map_angle, PotRange};
use crate::steering::tracker::AngleTracker;

/// Stick deflection used for steering (full range)
pub const STEERING_MAGNITUDE: f64 = 1.0;

/// Number of samples between status log messages
const LOG_INTERVAL_SAMPLES: u64 = 1000;

/// Loop behaviour that does not belong to the transport or the device
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub read_timeout: Duration,
    pub hold: Duration,
    pub settle: Duration,
    pub pot_range: PotRange,
    pub clamp_samples: bool,
    pub threshold_deg: f64,
    pub token_match: TokenMatch,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for BridgeSettings {
    fn from(config: &Config) -> Self {
        Self {
            read_timeout: config.read_timeout(),
            hold: config.hold(),
            settle: config.settle(),
            pot_range: config.pot_range(),
            clamp_samples: config.steering.clamp_samples,
            threshold_deg: config.steering.threshold_deg,
            token_match: if config.buttons.exact_tokens {
                TokenMatch::Exact
            } else {
                TokenMatch::Contains
            },
        }
    }
}

/// What a single loop iteration did
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// No complete line within the read timeout
    Idle,
    /// Blank line
    Skipped,
    /// Unrecognised line
    Invalid(String),
    /// Button tapped
    Tapped(ButtonToken),
    /// Stick moved to this X value
    AxisUpdated(i32),
    /// Sample within the change threshold, nothing sent
    AxisSuppressed,
    /// The device rejected the action for this line
    ActionFailed,
    /// The transport failed and was replaced
    Reconnected,
}

/// Running counters, logged periodically
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BridgeStats {
    pub lines: u64,
    pub samples: u64,
    pub axis_updates: u64,
    pub taps: u64,
    pub invalid: u64,
    pub action_failures: u64,
    pub reconnects: u64,
}

/// Connects a line transport to a virtual gamepad
pub struct Bridge<C: Connector, B> {
    link: TransportManager<C>,
    transport: C::Transport,
    decoder: LineDecoder,
    tracker: AngleTracker,
    gamepad: VirtualGamepad<B>,
    settings: BridgeSettings,
    stats: BridgeStats,
}

impl<C: Connector, B: GamepadBackend> Bridge<C, B> {
    /// Connect (retrying forever) and prepare the loop
    ///
    /// Waits `settings.settle` after the first connection: most boards reset
    /// when the port opens and print nothing useful until they boot.
    pub async fn start(
        mut link: TransportManager<C>,
        gamepad: VirtualGamepad<B>,
        settings: BridgeSettings,
    ) -> Self {
        let transport = link.connect().await;

        if !settings.settle.is_zero() {
            info!("Waiting {:?} for the controller to settle...", settings.settle);
            tokio::time::sleep(settings.settle).await;
        }
        info!("Listening for serial input...");

        Self {
            link,
            transport,
            decoder: LineDecoder::new(settings.token_match),
            tracker: AngleTracker::new(settings.threshold_deg),
            gamepad,
            settings,
            stats: BridgeStats::default(),
        }
    }

    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    pub fn tracker(&self) -> &AngleTracker {
        &self.tracker
    }

    /// Run the loop until the process is terminated
    pub async fn run(&mut self) {
        loop {
            self.step().await;
        }
    }

    /// One loop iteration
    pub async fn step(&mut self) -> StepOutcome {
        match self.transport.read_line(self.settings.read_timeout).await {
            Ok(None) => StepOutcome::Idle,
            Ok(Some(line)) => self.handle_line(&line).await,
            Err(e) => {
                error!("Serial error: {}", e);
                info!("Attempting to reconnect to serial...");
                self.link.reconnect(&mut self.transport).await;
                self.stats.reconnects += 1;
                StepOutcome::Reconnected
            }
        }
    }

    /// Decode one line and apply it to the gamepad
    pub async fn handle_line(&mut self, line: &str) -> StepOutcome {
        self.stats.lines += 1;

        match self.decoder.decode(line) {
            LineEvent::Empty => StepOutcome::Skipped,
            LineEvent::Invalid(raw) => {
                self.stats.invalid += 1;
                warn!("Invalid input received: '{}'", raw);
                StepOutcome::Invalid(raw)
            }
            LineEvent::ButtonPress(token) => self.handle_button(token).await,
            LineEvent::AxisSample(sample) => self.handle_sample(sample),
        }
    }

    async fn handle_button(&mut self, token: ButtonToken) -> StepOutcome {
        let button = token.action();
        match self.gamepad.tap(button, self.settings.hold).await {
            Ok(()) => {
                self.stats.taps += 1;
                debug!("{} -> {}", token, button);
                StepOutcome::Tapped(token)
            }
            Err(e) => {
                self.stats.action_failures += 1;
                warn!("Error executing action for {}: {}", token, e);
                StepOutcome::ActionFailed
            }
        }
    }

    fn handle_sample(&mut self, sample: i32) -> StepOutcome {
        self.stats.samples += 1;
        if self.stats.samples % LOG_INTERVAL_SAMPLES == 0 {
            info!(
                "Processed {} samples ({} stick updates, {} taps, {} invalid, {} reconnects)",
                self.stats.samples,
                self.stats.axis_updates,
                self.stats.taps,
                self.stats.invalid,
                self.stats.reconnects
            );
        }

        let sample = if self.settings.clamp_samples {
            clamp_sample(sample, &self.settings.pot_range)
        } else {
            sample
        };

        // Wheel rotation and stick X run in opposite directions
        let angle = -map_angle(sample, &self.settings.pot_range);

        let previous = self.tracker.last_emitted();
        if !self.tracker.should_emit(angle) {
            return StepOutcome::AxisSuppressed;
        }

        match self.gamepad.set_left_stick(angle, STEERING_MAGNITUDE) {
            Ok(x) => {
                self.stats.axis_updates += 1;
                StepOutcome::AxisUpdated(x)
            }
            Err(e) => {
                // The device still shows the old angle
                self.tracker.revert(previous);
                self.stats.action_failures += 1;
                warn!("Failed to update steering axis: {}", e);
                StepOutcome::ActionFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WheelBridgeError;
    use crate::gamepad::mocks::{DeviceOp, RecordingGamepad};
    use crate::gamepad::{MockGamepadBackend, VirtualButton};
    use crate::serial::port_trait::mocks::{MockConnector, Scripted};
    use crate::serial::READ_TIMEOUT;
    use tokio::time::Instant;

    fn settings() -> BridgeSettings {
        BridgeSettings {
            settle: Duration::ZERO,
            ..BridgeSettings::default()
        }
    }

    async fn bridge_with(
        attempts: Vec<Option<Vec<Scripted>>>,
        settings: BridgeSettings,
    ) -> (Bridge<MockConnector, RecordingGamepad>, RecordingGamepad) {
        let recorder = RecordingGamepad::new();
        let link = TransportManager::new(MockConnector::new(attempts));
        let bridge = Bridge::start(link, VirtualGamepad::new(recorder.clone()), settings).await;
        (bridge, recorder)
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_delay_on_start() {
        let start = Instant::now();
        let (_bridge, _) = bridge_with(vec![Some(vec![])], BridgeSettings::default()).await;
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_when_no_data() {
        let (mut bridge, recorder) = bridge_with(vec![Some(vec![])], settings()).await;

        let start = Instant::now();
        assert_eq!(bridge.step().await, StepOutcome::Idle);
        assert_eq!(start.elapsed(), READ_TIMEOUT);
        assert!(recorder.ops().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sample_moves_stick_with_inverted_sign() {
        let (mut bridge, recorder) = bridge_with(
            vec![Some(vec![Scripted::Line("1010"), Scripted::Line("25")])],
            settings(),
        )
        .await;

        // Full right on the wheel is full left on the stick
        assert_eq!(bridge.step().await, StepOutcome::AxisUpdated(-32767));
        assert_eq!(bridge.step().await, StepOutcome::AxisUpdated(32767));
        assert_eq!(
            recorder.ops(),
            vec![
                DeviceOp::Stick(-32767, 0),
                DeviceOp::Commit,
                DeviceOp::Stick(32767, 0),
                DeviceOp::Commit,
            ]
        );
        assert_eq!(bridge.tracker().last_emitted(), Some(180.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_center_sample_centers_stick() {
        let (mut bridge, _) =
            bridge_with(vec![Some(vec![Scripted::Line("518")])], settings()).await;
        // 518 is 0.18° right of center; the curve flattens it to zero
        assert_eq!(bridge.step().await, StepOutcome::AxisUpdated(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_jitter_is_suppressed() {
        let (mut bridge, recorder) = bridge_with(
            vec![Some(vec![
                Scripted::Line("600"),
                Scripted::Line("601"),
                Scripted::Line("602"),
                Scripted::Line("604"),
            ])],
            settings(),
        )
        .await;

        // 1 count is about 0.37°
        assert!(matches!(bridge.step().await, StepOutcome::AxisUpdated(_)));
        assert_eq!(bridge.step().await, StepOutcome::AxisSuppressed);
        assert_eq!(bridge.step().await, StepOutcome::AxisSuppressed);
        assert!(matches!(bridge.step().await, StepOutcome::AxisUpdated(_)));

        let commits = recorder
            .ops()
            .into_iter()
            .filter(|op| *op == DeviceOp::Commit)
            .count();
        assert_eq!(commits, 2);
        assert_eq!(bridge.stats().samples, 4);
        assert_eq!(bridge.stats().axis_updates, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_sample_is_clamped() {
        let (mut bridge, _) =
            bridge_with(vec![Some(vec![Scripted::Line("1023")])], settings()).await;
        bridge.step().await;
        assert_eq!(bridge.tracker().last_emitted(), Some(-180.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_sample_extrapolates_without_clamp() {
        let (mut bridge, _) = bridge_with(
            vec![Some(vec![Scripted::Line("1023")])],
            BridgeSettings {
                clamp_samples: false,
                ..settings()
            },
        )
        .await;
        assert_eq!(bridge.step().await, StepOutcome::AxisUpdated(-32767));
        assert!(bridge.tracker().last_emitted().unwrap() < -180.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_button_tap_blocks_loop_for_hold() {
        let (mut bridge, recorder) = bridge_with(
            vec![Some(vec![Scripted::Line("Button3"), Scripted::Line("500")])],
            settings(),
        )
        .await;

        let start = Instant::now();
        assert_eq!(
            bridge.step().await,
            StepOutcome::Tapped(ButtonToken::Button3)
        );
        assert_eq!(start.elapsed(), Duration::from_millis(50));

        assert!(matches!(bridge.step().await, StepOutcome::AxisUpdated(_)));

        let ops = recorder.timed_ops();
        assert_eq!(ops[0].1, DeviceOp::Button(VirtualButton::X, true));
        assert_eq!(ops[2].1, DeviceOp::Button(VirtualButton::X, false));
        // The sample after the tap is handled only after the release
        assert!(ops[4].0 >= ops[3].0);
        assert!(matches!(ops[4].1, DeviceOp::Stick(_, 0)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shift_tokens_map_to_shoulders() {
        let (mut bridge, recorder) = bridge_with(
            vec![Some(vec![Scripted::Line("upShift"), Scripted::Line("downShift")])],
            settings(),
        )
        .await;

        bridge.step().await;
        bridge.step().await;

        let presses: Vec<DeviceOp> = recorder
            .ops()
            .into_iter()
            .filter(|op| matches!(op, DeviceOp::Button(_, true)))
            .collect();
        assert_eq!(
            presses,
            vec![
                DeviceOp::Button(VirtualButton::RightShoulder, true),
                DeviceOp::Button(VirtualButton::LeftShoulder, true),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_and_empty_lines_are_skipped() {
        let (mut bridge, recorder) = bridge_with(
            vec![Some(vec![Scripted::Line("garbage"), Scripted::Line("")])],
            settings(),
        )
        .await;

        assert_eq!(
            bridge.step().await,
            StepOutcome::Invalid("garbage".to_string())
        );
        assert_eq!(bridge.step().await, StepOutcome::Skipped);
        assert!(recorder.ops().is_empty());
        assert_eq!(bridge.stats().invalid, 1);
        assert_eq!(bridge.stats().lines, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exact_token_mode() {
        let (mut bridge, _) = bridge_with(
            vec![Some(vec![Scripted::Line("xButton1x")])],
            BridgeSettings {
                token_match: TokenMatch::Exact,
                ..settings()
            },
        )
        .await;

        assert_eq!(
            bridge.step().await,
            StepOutcome::Invalid("xButton1x".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_action_does_not_stop_loop() {
        let mut backend = MockGamepadBackend::new();
        backend.expect_set_button().returning(|_, _| Ok(()));
        backend.expect_set_left_stick().returning(|_, _| Ok(()));
        let mut commits = 0;
        backend.expect_commit().returning(move || {
            commits += 1;
            if commits == 1 {
                Err(WheelBridgeError::Device("driver unavailable".into()))
            } else {
                Ok(())
            }
        });

        let link = TransportManager::new(MockConnector::new(vec![Some(vec![
            Scripted::Line("Button1"),
            Scripted::Line("300"),
        ])]));
        let mut bridge = Bridge::start(link, VirtualGamepad::new(backend), settings()).await;

        assert_eq!(bridge.step().await, StepOutcome::ActionFailed);
        assert!(matches!(bridge.step().await, StepOutcome::AxisUpdated(_)));
        assert_eq!(bridge.stats().action_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_stick_update_is_retried_by_same_angle() {
        let mut backend = MockGamepadBackend::new();
        backend.expect_set_left_stick().returning(|_, _| Ok(()));
        let mut commits = 0;
        backend.expect_commit().times(2).returning(move || {
            commits += 1;
            if commits == 1 {
                Err(WheelBridgeError::Device("driver unavailable".into()))
            } else {
                Ok(())
            }
        });

        let link = TransportManager::new(MockConnector::new(vec![Some(vec![
            Scripted::Line("800"),
            Scripted::Line("800"),
            Scripted::Line("801"),
        ])]));
        let mut bridge = Bridge::start(link, VirtualGamepad::new(backend), settings()).await;

        assert_eq!(bridge.step().await, StepOutcome::ActionFailed);
        assert_eq!(bridge.tracker().last_emitted(), None);

        // Same reading again: the device never got it, so it is sent
        assert!(matches!(bridge.step().await, StepOutcome::AxisUpdated(_)));
        assert_eq!(bridge.step().await, StepOutcome::AxisSuppressed);
        assert_eq!(bridge.stats().axis_updates, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_mid_loop_resumes_decoding() {
        let connector = MockConnector::new(vec![
            Some(vec![Scripted::Line("300"), Scripted::Fail("device unplugged")]),
            None,
            Some(vec![Scripted::Line("Button2"), Scripted::Line("900")]),
        ]);
        let log = connector.log_handle();
        let recorder = RecordingGamepad::new();
        let link = TransportManager::new(connector);
        let mut bridge =
            Bridge::start(link, VirtualGamepad::new(recorder.clone()), settings()).await;

        assert!(matches!(bridge.step().await, StepOutcome::AxisUpdated(_)));

        let start = Instant::now();
        assert_eq!(bridge.step().await, StepOutcome::Reconnected);
        // 1s pause, one failed attempt, 3s backoff
        assert_eq!(start.elapsed(), Duration::from_secs(4));

        assert_eq!(
            bridge.step().await,
            StepOutcome::Tapped(ButtonToken::Button2)
        );
        assert!(matches!(bridge.step().await, StepOutcome::AxisUpdated(_)));

        assert_eq!(
            *log.lock().unwrap(),
            vec!["open 1", "close 1", "open failed", "open 2"]
        );
        assert_eq!(bridge.stats().reconnects, 1);
        assert!(recorder
            .ops()
            .contains(&DeviceOp::Button(VirtualButton::B, true)));
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.buttons.exact_tokens = true;
        config.steering.clamp_samples = false;

        let settings = BridgeSettings::from(&config);
        assert_eq!(settings.token_match, TokenMatch::Exact);
        assert!(!settings.clamp_samples);
        assert_eq!(settings.hold, Duration::from_millis(50));
        assert_eq!(settings.read_timeout, READ_TIMEOUT);
    }
}
