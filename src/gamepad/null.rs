//! No-op gamepad backend.
//!
//! Used when output is disabled: the bridge still reads, decodes and maps
//! every line, but nothing is sent to the host.

use tracing::trace;

use super::{GamepadBackend, VirtualButton};
use crate::error::Result;

/// Backend that accepts every update and discards it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullGamepad {
    commits: u64,
}

impl NullGamepad {
    /// Number of reports that would have been sent.
    #[must_use]
    pub fn commits(&self) -> u64 {
        self.commits
    }
}

impl GamepadBackend for NullGamepad {
    fn set_left_stick(&mut self, x: i32, y: i32) -> Result<()> {
        trace!("(dry run) left stick x={} y={}", x, y);
        Ok(())
    }

    fn set_button(&mut self, button: VirtualButton, pressed: bool) -> Result<()> {
        trace!("(dry run) {} {}", button, if pressed { "down" } else { "up" });
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.commits += 1;
        Ok(())
    }
}
