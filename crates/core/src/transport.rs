//! HID transport abstraction for device communication.
//!
//! Provides a trait-based transport layer so that real HID devices and
//! mock devices share the same interface.

use crate::codec::Report;
use crate::error::Result;
use serde::Serialize;
use std::time::Duration;

/// One HID interface as reported by enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceDescriptor {
    /// Opaque platform path used to open the interface.
    pub path: String,
    pub vendor_id: u16,
    pub product_id: u16,
    /// Usage page; 0 when the platform does not report it.
    pub usage_page: u16,
    /// Usage; 0 when the platform does not report it.
    pub usage: u16,
    pub interface_number: i32,
    pub product: Option<String>,
    pub serial: Option<String>,
}

/// Result of a bounded read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A full report, normalized so byte 0 is the report ID.
    Report(Report),
    /// Nothing arrived within the timeout. Not an error.
    TimedOut,
}

/// Abstraction over an open raw-HID interface.
pub trait ReportTransport: Send {
    /// Block for at most `timeout` waiting for one input report.
    fn read_report(&mut self, timeout: Duration) -> Result<ReadOutcome>;

    /// Write one output report.
    fn write_report(&mut self, report: &Report) -> Result<()>;
}

/// Abstraction over HID enumeration and open.
pub trait HidBackend {
    /// List every attached HID interface.
    fn enumerate(&self) -> Result<Vec<DeviceDescriptor>>;

    /// Open the interface at `path`.
    fn open(&self, path: &str) -> Result<Box<dyn ReportTransport>>;
}


#[cfg(test)]
mod tests {
    use super::mock::MockTransport;
    use super::*;

    #[test]
    fn mock_empty_script_times_out() {
        let mut mock = MockTransport::new();
        let outcome = mock.read_report(Duration::from_millis(1)).unwrap();
        assert_eq!(outcome, ReadOutcome::TimedOut);
        assert_eq!(mock.read_calls(), 1);
    }

    #[test]
    fn mock_records_writes_and_injects_failure() {
        let mut mock = MockTransport::new();
        let report = [0u8; crate::codec::REPORT_LEN];
        mock.fail_next_writes(1);
        assert!(mock.write_report(&report).is_err());
        assert!(mock.write_report(&report).is_ok());
        assert_eq!(mock.writes().len(), 1);
    }
}
