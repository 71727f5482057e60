//! Raw HID frame encoding and decoding.
//!
//! Every report is 33 bytes in both directions:
//! - byte 0: report ID (always 0x00 for the QMK raw-data interface)
//! - byte 1: command group (controller family)
//! - byte 2: command code (0x01 CW, 0x02 CCW, 0x03 press, 0x04+ family-specific)
//! - bytes 3..33: payload, zero padded
//!
//! The telemetry group (0xF0) is the one exception: it is host-to-device only and
//! its payload starts directly at byte 2. See [`encode_telemetry`].

use crate::error::{Error, Result};

/// Full report length including the report ID byte.
pub const REPORT_LEN: usize = 33;
/// Report ID used by the raw-data interface.
pub const REPORT_ID: u8 = 0x00;
/// Bytes available after report ID, group, and code.
pub const PAYLOAD_LEN: usize = REPORT_LEN - 3;
/// Label capacity of a selection frame (5-byte fixed header).
pub const LABEL_CAPACITY: usize = 27;
/// Text capacity of a status frame. The firmware stops reading at 27 bytes.
pub const STATUS_TEXT_CAPACITY: usize = 27;

/// One raw report as written to or read from the device.
pub type Report = [u8; REPORT_LEN];

/// Well-known command codes.
pub mod codes {
    /// Encoder turned clockwise (inbound) / selection update (outbound).
    pub const ROTATE_CW: u8 = 0x01;
    /// Encoder turned counter-clockwise.
    pub const ROTATE_CCW: u8 = 0x02;
    /// Encoder button pressed.
    pub const PRESS: u8 = 0x03;
    /// Family-specific status echo (mute state byte, status text).
    pub const STATUS: u8 = 0x04;
    /// Outbound selection update shares the code of clockwise rotation.
    pub const SELECTION: u8 = ROTATE_CW;
}

/// Controller family carried in byte 1 of every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum CommandGroup {
    Telemetry = 0xF0,
    Volume = 0xF1,
    Voice = 0xF2,
    Lamp = 0xF3,
}

impl CommandGroup {
    /// All known groups.
    pub const ALL: &'static [CommandGroup] = &[
        CommandGroup::Telemetry,
        CommandGroup::Volume,
        CommandGroup::Voice,
        CommandGroup::Lamp,
    ];

    /// Look up a group from its tag byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0xF0 => Some(Self::Telemetry),
            0xF1 => Some(Self::Volume),
            0xF2 => Some(Self::Voice),
            0xF3 => Some(Self::Lamp),
            _ => None,
        }
    }

    /// Tag byte on the wire.
    pub fn as_byte(&self) -> u8 {
        *self as u8
    }

    /// Short lowercase name, also accepted by [`CommandGroup::from_name`].
    pub fn name(&self) -> &'static str {
        match self {
            Self::Telemetry => "telemetry",
            Self::Volume => "volume",
            Self::Voice => "voice",
            Self::Lamp => "lamp",
        }
    }

    /// Parse a group from a CLI-friendly name or a hex tag such as `0xF2`.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if let Some(hex) = lower.strip_prefix("0x") {
            return u8::from_str_radix(hex, 16).ok().and_then(Self::from_byte);
        }
        match lower.as_str() {
            "telemetry" | "monitor" => Some(Self::Telemetry),
            "volume" | "audio" => Some(Self::Volume),
            "voice" | "discord" => Some(Self::Voice),
            "lamp" | "lifx" => Some(Self::Lamp),
            _ => None,
        }
    }
}

impl std::fmt::Display for CommandGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.as_byte())
    }
}

/// Encoder rotation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    /// +1 for clockwise, -1 for counter-clockwise.
    pub fn sign(&self) -> i32 {
        match self {
            Self::Clockwise => 1,
            Self::CounterClockwise => -1,
        }
    }
}

/// Meaning of an inbound command code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Rotate(Direction),
    Press,
    /// 0x04 and above, interpreted by the owning controller.
    Extended(u8),
}

impl Command {
    pub fn from_code(code: u8) -> Self {
        match code {
            codes::ROTATE_CW => Self::Rotate(Direction::Clockwise),
            codes::ROTATE_CCW => Self::Rotate(Direction::CounterClockwise),
            codes::PRESS => Self::Press,
            other => Self::Extended(other),
        }
    }
}

/// A decoded (or to-be-encoded) report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub group: CommandGroup,
    pub code: u8,
    pub payload: [u8; PAYLOAD_LEN],
}

/// Frame read from the device.
pub type InboundFrame = Frame;
/// Frame written to the device.
pub type OutboundFrame = Frame;

impl Frame {
    /// Build a frame from a payload slice, zero padding the rest.
    pub fn new(group: CommandGroup, code: u8, payload: &[u8]) -> Result<Self> {
        if payload.len() > PAYLOAD_LEN {
            return Err(Error::OutOfRange {
                field: "payload_len",
                value: payload.len() as u64,
                min: 0,
                max: PAYLOAD_LEN as u64,
            });
        }
        let mut buf = [0u8; PAYLOAD_LEN];
        buf[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            group,
            code,
            payload: buf,
        })
    }

    /// Selection update: `[index, total, label...]`, label truncated to 27 bytes.
    pub fn selection(group: CommandGroup, index: u8, total: u8, label: &str) -> Self {
        let mut payload = [0u8; PAYLOAD_LEN];
        payload[0] = index;
        payload[1] = total;
        let text = truncate_utf8(label, LABEL_CAPACITY);
        payload[2..2 + text.len()].copy_from_slice(text.as_bytes());
        Self {
            group,
            code: codes::SELECTION,
            payload,
        }
    }

    /// Single status byte (e.g. voice mute state).
    pub fn state(group: CommandGroup, value: u8) -> Self {
        let mut payload = [0u8; PAYLOAD_LEN];
        payload[0] = value;
        Self {
            group,
            code: codes::STATUS,
            payload,
        }
    }

    /// Free-text status message, truncated to 27 bytes.
    pub fn status_text(group: CommandGroup, text: &str) -> Self {
        let mut payload = [0u8; PAYLOAD_LEN];
        let text = truncate_utf8(text, STATUS_TEXT_CAPACITY);
        payload[..text.len()].copy_from_slice(text.as_bytes());
        Self {
            group,
            code: codes::STATUS,
            payload,
        }
    }

    /// Interpret the command code.
    pub fn command(&self) -> Command {
        Command::from_code(self.code)
    }

    /// Read back `(index, total, label)` from a selection-shaped payload.
    pub fn selection_fields(&self) -> (u8, u8, String) {
        (
            self.payload[0],
            self.payload[1],
            text_from_payload(&self.payload[2..2 + LABEL_CAPACITY]),
        )
    }
}

/// Decode a raw report.
///
/// Returns `None` when byte 1 is not a known command group, or the buffer is too
/// short to carry a group and code. Byte 0 (report ID) is not inspected.
pub fn decode(raw: &[u8]) -> Option<InboundFrame> {
    if raw.len() < 3 {
        return None;
    }
    let group = CommandGroup::from_byte(raw[1])?;
    let mut payload = [0u8; PAYLOAD_LEN];
    let body = &raw[3..raw.len().min(REPORT_LEN)];
    payload[..body.len()].copy_from_slice(body);
    Some(Frame {
        group,
        code: raw[2],
        payload,
    })
}

/// Encode a frame into a fixed-size report with byte 0 forced to the report ID.
pub fn encode(frame: &OutboundFrame) -> Report {
    let mut buf = [0u8; REPORT_LEN];
    buf[0] = REPORT_ID;
    buf[1] = frame.group.as_byte();
    buf[2] = frame.code;
    buf[3..].copy_from_slice(&frame.payload);
    buf
}

/// One system telemetry sample for the on-device monitor screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetrySample {
    /// CPU load percent.
    pub cpu: u8,
    /// GPU load percent.
    pub gpu: u8,
    /// GPU memory usage percent.
    pub vram: u16,
    /// Round-trip ping in milliseconds.
    pub ping_ms: u16,
}

/// Encode a telemetry push: `[0, F0, cpu, gpu, vram_hi, vram_lo, ping_hi, ping_lo]`.
pub fn encode_telemetry(sample: &TelemetrySample) -> Report {
    let mut buf = [0u8; REPORT_LEN];
    buf[0] = REPORT_ID;
    buf[1] = CommandGroup::Telemetry.as_byte();
    buf[2] = sample.cpu;
    buf[3] = sample.gpu;
    buf[4..6].copy_from_slice(&sample.vram.to_be_bytes());
    buf[6..8].copy_from_slice(&sample.ping_ms.to_be_bytes());
    buf
}

/// Decode a telemetry report produced by [`encode_telemetry`].
pub fn decode_telemetry(raw: &[u8]) -> Option<TelemetrySample> {
    if raw.len() < 8 || raw[1] != CommandGroup::Telemetry.as_byte() {
        return None;
    }
    Some(TelemetrySample {
        cpu: raw[2],
        gpu: raw[3],
        vram: u16::from_be_bytes([raw[4], raw[5]]),
        ping_ms: u16::from_be_bytes([raw[6], raw[7]]),
    })
}

/// Longest prefix of `text` that fits in `max` bytes without splitting a code point.
pub fn truncate_utf8(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Text up to the first NUL byte, replacing invalid sequences.
pub fn text_from_payload(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
