//! Outbound status frames for the on-device OLED.
//!
//! Each call builds exactly one frame and performs exactly one write. Write
//! failures are returned to the caller unchanged.

use crate::codec::{self, CommandGroup, Frame, TelemetrySample};
use crate::error::{Error, Result};
use crate::session::DeviceSession;
use tracing::debug;

/// Largest index/total the single-byte selection fields can carry.
pub const MAX_SELECTION_FIELD: usize = u8::MAX as usize;

/// Writes display frames for one command group through the shared session.
pub struct DisplayWriter<'a> {
    session: &'a mut DeviceSession,
    group: CommandGroup,
}

impl<'a> DisplayWriter<'a> {
    pub fn new(session: &'a mut DeviceSession, group: CommandGroup) -> Self {
        Self { session, group }
    }

    /// Group every frame from this writer is tagged with.
    pub fn group(&self) -> CommandGroup {
        self.group
    }

    /// `[group, 0x01, index, total, label]`. Index and total above 255 are a caller error.
    pub fn show_selection(&mut self, index: usize, total: usize, label: &str) -> Result<()> {
        let index = selection_field("selection_index", index)?;
        let total = selection_field("selection_total", total)?;
        debug!(group = %self.group, index, total, label, "Display selection");
        self.send(&Frame::selection(self.group, index, total, label))
    }

    /// `[group, 0x04, text]`, text truncated at a code point boundary.
    pub fn show_status(&mut self, text: &str) -> Result<()> {
        debug!(group = %self.group, text, "Display status");
        self.send(&Frame::status_text(self.group, text))
    }

    /// `[group, 0x04, value]`.
    pub fn show_state(&mut self, value: u8) -> Result<()> {
        debug!(group = %self.group, value, "Display state");
        self.send(&Frame::state(self.group, value))
    }

    /// Telemetry push; always tagged 0xF0 regardless of the writer's group.
    pub fn show_telemetry(&mut self, sample: &TelemetrySample) -> Result<()> {
        self.session.write(&codec::encode_telemetry(sample))
    }

    fn send(&mut self, frame: &Frame) -> Result<()> {
        self.session.write(&codec::encode(frame))
    }
}

fn selection_field(field: &'static str, value: usize) -> Result<u8> {
    u8::try_from(value).map_err(|_| Error::OutOfRange {
        field,
        value: value as u64,
        min: 0,
        max: MAX_SELECTION_FIELD as u64,
    })
}
