//! # Line Decoder
//!
//! Classifies one line of wheel telemetry.
//!
//! The firmware prints either a potentiometer reading (`"512"`) or a button
//! token (`"Button3"`, `"upShift"`). Anything else is reported as
//! [`LineEvent::Invalid`]; decoding never fails.

use std::num::IntErrorKind;

use super::tokens::ButtonToken;

/// Longest line, newline included, a reader should hand to the decoder.
///
/// Firmware lines are a handful of characters. Readers cut runaway input at
/// this length, and the decoder rejects anything that long outright.
pub const MAX_LINE_LEN: usize = 256;

/// Characters of an overlong line kept for the log.
const OVERLONG_PREVIEW: usize = 32;

/// How button tokens are recognised in a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenMatch {
    /// The token may appear anywhere in the line.
    #[default]
    Contains,
    /// The whole trimmed line must equal the token.
    Exact,
}

/// A decoded telemetry line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// Blank line, nothing to do.
    Empty,
    /// A button token was recognised.
    ButtonPress(ButtonToken),
    /// A raw potentiometer reading.
    AxisSample(i32),
    /// Unrecognised content, kept for logging.
    Invalid(String),
}

/// Decodes telemetry lines with a fixed token matching mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineDecoder {
    mode: TokenMatch,
}

impl LineDecoder {
    #[must_use]
    pub fn new(mode: TokenMatch) -> Self {
        Self { mode }
    }

    #[must_use]
    pub fn mode(&self) -> TokenMatch {
        self.mode
    }

    /// Decodes a single line.
    ///
    /// Surrounding whitespace is ignored. Button tokens are checked before
    /// the integer parse, in table order. Readings outside the `i32` range
    /// saturate instead of being rejected. Lines of [`MAX_LINE_LEN`] bytes or
    /// more are invalid whatever they contain.
    ///
    /// # Examples
    ///
    /// ```
    /// use wheel_bridge::protocol::decoder::{LineDecoder, LineEvent};
    /// use wheel_bridge::protocol::tokens::ButtonToken;
    ///
    /// let decoder = LineDecoder::default();
    /// assert_eq!(decoder.decode("Button3"), LineEvent::ButtonPress(ButtonToken::Button3));
    /// assert_eq!(decoder.decode("512\r\n"), LineEvent::AxisSample(512));
    /// assert_eq!(decoder.decode(""), LineEvent::Empty);
    /// ```
    #[must_use]
    pub fn decode(&self, line: &str) -> LineEvent {
        if line.len() >= MAX_LINE_LEN {
            let preview: String = line.chars().take(OVERLONG_PREVIEW).collect();
            return LineEvent::Invalid(format!("{}... ({} bytes)", preview, line.len()));
        }

        let line = line.trim();
        if line.is_empty() {
            return LineEvent::Empty;
        }

        let token = match self.mode {
            TokenMatch::Contains => ButtonToken::contained_in(line),
            TokenMatch::Exact => ButtonToken::exact(line),
        };
        if let Some(token) = token {
            return LineEvent::ButtonPress(token);
        }

        match parse_sample(line) {
            Some(value) => LineEvent::AxisSample(value),
            None => LineEvent::Invalid(line.to_string()),
        }
    }
}

/// Parses a decimal reading, saturating at the `i32` bounds.
fn parse_sample(text: &str) -> Option<i32> {
    match text.parse::<i64>() {
        Ok(value) => Some(value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(i32::MAX),
            IntErrorKind::NegOverflow => Some(i32::MIN),
            _ => None,
        },
    }
}

/// Decodes a line with the default (substring) token matching.
#[must_use]
pub fn decode(line: &str) -> LineEvent {
    LineDecoder::default().decode(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_button() {
        assert_eq!(decode("Button3"), LineEvent::ButtonPress(ButtonToken::Button3));
        assert_eq!(decode("upShift"), LineEvent::ButtonPress(ButtonToken::UpShift));
        assert_eq!(decode("downShift\r"), LineEvent::ButtonPress(ButtonToken::DownShift));
    }

    #[test]
    fn test_decode_sample() {
        assert_eq!(decode("512"), LineEvent::AxisSample(512));
        assert_eq!(decode("  0 "), LineEvent::AxisSample(0));
        assert_eq!(decode("1023\n"), LineEvent::AxisSample(1023));
        assert_eq!(decode("-5"), LineEvent::AxisSample(-5));
    }

    #[test]
    fn test_decode_invalid() {
        assert_eq!(decode("garbage"), LineEvent::Invalid("garbage".to_string()));
        assert_eq!(decode("5 12"), LineEvent::Invalid("5 12".to_string()));
        assert_eq!(decode("12.5"), LineEvent::Invalid("12.5".to_string()));
    }

    #[test]
    fn test_out_of_range_sample_saturates() {
        assert_eq!(decode("99999999999"), LineEvent::AxisSample(i32::MAX));
        assert_eq!(decode("-99999999999"), LineEvent::AxisSample(i32::MIN));
        assert_eq!(
            decode("123456789012345678901234567890"),
            LineEvent::AxisSample(i32::MAX)
        );
        assert_eq!(decode("+700"), LineEvent::AxisSample(700));
    }

    #[test]
    fn test_overlong_line_is_invalid() {
        let digits = "7".repeat(MAX_LINE_LEN);
        match decode(&digits) {
            LineEvent::Invalid(text) => {
                assert!(text.starts_with(&"7".repeat(OVERLONG_PREVIEW)));
                assert!(text.ends_with("(256 bytes)"), "got {text}");
            }
            other => panic!("Expected Invalid, got: {:?}", other),
        }

        let mut with_token = "x".repeat(MAX_LINE_LEN);
        with_token.push_str("Button1");
        assert!(matches!(decode(&with_token), LineEvent::Invalid(_)));

        // One byte shorter is still decoded normally
        let fits = format!("{}Button1", " ".repeat(MAX_LINE_LEN - 8));
        assert_eq!(decode(&fits), LineEvent::ButtonPress(ButtonToken::Button1));
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(decode(""), LineEvent::Empty);
        assert_eq!(decode("   \r\n"), LineEvent::Empty);
    }

    #[test]
    fn test_substring_match_wins_over_number() {
        assert_eq!(
            decode("btn:Button7;"),
            LineEvent::ButtonPress(ButtonToken::Button7)
        );
    }

    #[test]
    fn test_exact_mode_rejects_embedded_token() {
        let decoder = LineDecoder::new(TokenMatch::Exact);
        assert_eq!(decoder.mode(), TokenMatch::Exact);
        assert_eq!(
            decoder.decode("btn:Button7;"),
            LineEvent::Invalid("btn:Button7;".to_string())
        );
        assert_eq!(
            decoder.decode(" Button7 "),
            LineEvent::ButtonPress(ButtonToken::Button7)
        );
        assert_eq!(decoder.decode("300"), LineEvent::AxisSample(300));
    }

    #[test]
    fn test_invalid_keeps_trimmed_text() {
        assert_eq!(decode("  hello \r"), LineEvent::Invalid("hello".to_string()));
    }
}
