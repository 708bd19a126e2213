//! # Button Tokens
//!
//! Text identifiers the wheel firmware prints for discrete buttons, and the
//! virtual gamepad button each one taps.
//!
//! | Token | Virtual button |
//! |-------|----------------|
//! | `Button1` | A |
//! | `Button2` | B |
//! | `Button3` | X |
//! | `Button4` | Y |
//! | `Button5` | D-Pad Left |
//! | `Button6` | D-Pad Right |
//! | `Button7` | Left Shoulder (LB) |
//! | `Button8` | Right Shoulder (RB) |
//! | `upShift` | Right Shoulder (RB) |
//! | `downShift` | Left Shoulder (LB) |

use crate::error::{Result, WheelBridgeError};
use crate::gamepad::VirtualButton;

/// A button identifier emitted by the wheel firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonToken {
    Button1,
    Button2,
    Button3,
    Button4,
    Button5,
    Button6,
    Button7,
    Button8,
    UpShift,
    DownShift,
}

impl ButtonToken {
    /// All tokens, in matching order.
    pub const ALL: [ButtonToken; 10] = [
        ButtonToken::Button1,
        ButtonToken::Button2,
        ButtonToken::Button3,
        ButtonToken::Button4,
        ButtonToken::Button5,
        ButtonToken::Button6,
        ButtonToken::Button7,
        ButtonToken::Button8,
        ButtonToken::UpShift,
        ButtonToken::DownShift,
    ];

    /// Wire text of the token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ButtonToken::Button1 => "Button1",
            ButtonToken::Button2 => "Button2",
            ButtonToken::Button3 => "Button3",
            ButtonToken::Button4 => "Button4",
            ButtonToken::Button5 => "Button5",
            ButtonToken::Button6 => "Button6",
            ButtonToken::Button7 => "Button7",
            ButtonToken::Button8 => "Button8",
            ButtonToken::UpShift => "upShift",
            ButtonToken::DownShift => "downShift",
        }
    }

    /// Virtual button tapped when this token arrives.
    #[must_use]
    pub const fn action(self) -> VirtualButton {
        match self {
            ButtonToken::Button1 => VirtualButton::A,
            ButtonToken::Button2 => VirtualButton::B,
            ButtonToken::Button3 => VirtualButton::X,
            ButtonToken::Button4 => VirtualButton::Y,
            ButtonToken::Button5 => VirtualButton::DpadLeft,
            ButtonToken::Button6 => VirtualButton::DpadRight,
            ButtonToken::Button7 | ButtonToken::DownShift => VirtualButton::LeftShoulder,
            ButtonToken::Button8 | ButtonToken::UpShift => VirtualButton::RightShoulder,
        }
    }

    /// Finds the token equal to `text`.
    #[must_use]
    pub fn exact(text: &str) -> Option<ButtonToken> {
        Self::ALL.into_iter().find(|t| t.as_str() == text)
    }

    /// Finds the first token contained anywhere in `text`.
    #[must_use]
    pub fn contained_in(text: &str) -> Option<ButtonToken> {
        Self::ALL.into_iter().find(|t| text.contains(t.as_str()))
    }
}

impl std::fmt::Display for ButtonToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks that no token text occurs inside another.
///
/// Substring matching is only unambiguous when this holds, so it runs once
/// at startup before the first line is read.
///
/// # Errors
///
/// Returns `TokenTable` naming the first overlapping pair.
pub fn validate_token_table(tokens: &[ButtonToken]) -> Result<()> {
    for (i, a) in tokens.iter().enumerate() {
        for (j, b) in tokens.iter().enumerate() {
            if i != j && b.as_str().contains(a.as_str()) {
                return Err(WheelBridgeError::TokenTable(format!(
                    "'{}' occurs inside '{}'",
                    a, b
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_is_disjoint() {
        assert!(validate_token_table(&ButtonToken::ALL).is_ok());
    }

    #[test]
    fn test_duplicate_token_rejected() {
        let tokens = [ButtonToken::Button1, ButtonToken::Button1];
        match validate_token_table(&tokens) {
            Err(WheelBridgeError::TokenTable(msg)) => assert!(msg.contains("Button1")),
            other => panic!("Expected TokenTable error, got: {:?}", other),
        }
    }

    #[test]
    fn test_action_table() {
        assert_eq!(ButtonToken::Button1.action(), VirtualButton::A);
        assert_eq!(ButtonToken::Button2.action(), VirtualButton::B);
        assert_eq!(ButtonToken::Button3.action(), VirtualButton::X);
        assert_eq!(ButtonToken::Button4.action(), VirtualButton::Y);
        assert_eq!(ButtonToken::Button5.action(), VirtualButton::DpadLeft);
        assert_eq!(ButtonToken::Button6.action(), VirtualButton::DpadRight);
        assert_eq!(ButtonToken::Button7.action(), VirtualButton::LeftShoulder);
        assert_eq!(ButtonToken::Button8.action(), VirtualButton::RightShoulder);
        assert_eq!(ButtonToken::UpShift.action(), VirtualButton::RightShoulder);
        assert_eq!(ButtonToken::DownShift.action(), VirtualButton::LeftShoulder);
    }

    #[test]
    fn test_exact_lookup() {
        assert_eq!(ButtonToken::exact("upShift"), Some(ButtonToken::UpShift));
        assert_eq!(ButtonToken::exact("upshift"), None);
        assert_eq!(ButtonToken::exact("Button3 "), None);
    }

    #[test]
    fn test_contained_lookup() {
        assert_eq!(
            ButtonToken::contained_in("pressed:downShift"),
            Some(ButtonToken::DownShift)
        );
        assert_eq!(ButtonToken::contained_in("512"), None);
    }

    #[test]
    fn test_display_matches_wire_text() {
        for token in ButtonToken::ALL {
            assert_eq!(token.to_string(), token.as_str());
        }
    }
}
