//! encoder-bridge-core: raw HID framing, device session, and controller dispatch.
//!
//! This crate turns raw-HID reports from a QMK keyboard's rotary encoders into
//! typed events, routes them to per-family controllers, and writes status frames
//! back to the keyboard's OLED.

pub mod cache;
pub mod codec;
pub mod comm;
pub mod config;
pub mod controllers;
pub mod device;
pub mod display;
pub mod error;
pub mod event_loop;
#[cfg(test)]
mod integration_tests;
pub mod registry;
pub mod selection;
pub mod session;
pub mod transport;

/// OffReno USB Vendor ID.
pub const OFFRENO_VID: u16 = 0x6E61;

/// Product and interface identifiers.
pub mod ids {
    /// TIDBIT macro pad.
    pub const TIDBIT_PID: u16 = 0x6064;
    /// QMK raw HID vendor usage page.
    pub const RAW_HID_USAGE_PAGE: u16 = 0xFF60;
    /// QMK raw HID usage.
    pub const RAW_HID_USAGE: u16 = 0x61;
}
