//! Device session: exclusive owner of one open raw-HID handle.

use crate::codec::Report;
use crate::device::{find_device, DeviceIdentity};
use crate::error::{Error, Result};
use crate::transport::{HidBackend, ReadOutcome, ReportTransport};
use std::time::Duration;
use tracing::{info, trace};

/// An open device handle. Reads and writes fail with [`Error::SessionClosed`]
/// once [`DeviceSession::close`] has run.
pub struct DeviceSession {
    path: String,
    transport: Option<Box<dyn ReportTransport>>,
}

impl DeviceSession {
    /// Open the interface at `path`.
    pub fn open(backend: &dyn HidBackend, path: &str) -> Result<Self> {
        let transport = backend.open(path).map_err(|e| match e {
            Error::SessionOpen { .. } | Error::PermissionDenied(_) => e,
            other => Error::SessionOpen {
                path: path.to_string(),
                reason: other.to_string(),
            },
        })?;
        info!(path, "Device session opened");
        Ok(Self::from_transport(path, transport))
    }

    /// Locate the raw-data interface for `identity` and open it.
    pub fn locate_and_open(backend: &dyn HidBackend, identity: &DeviceIdentity) -> Result<Self> {
        let path = find_device(backend, identity)?;
        Self::open(backend, &path)
    }

    /// Wrap an already-open transport.
    pub fn from_transport(path: &str, transport: Box<dyn ReportTransport>) -> Self {
        Self {
            path: path.to_string(),
            transport: Some(transport),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Wait up to `timeout` for one input report.
    pub fn read(&mut self, timeout: Duration) -> Result<ReadOutcome> {
        let transport = self.transport.as_mut().ok_or(Error::SessionClosed)?;
        let outcome = transport.read_report(timeout)?;
        if let ReadOutcome::Report(report) = &outcome {
            trace!(report_hex = format_args!("{:02X?}", &report[..8]), "RX");
        }
        Ok(outcome)
    }

    /// Write one output report. No retry.
    pub fn write(&mut self, report: &Report) -> Result<()> {
        let transport = self.transport.as_mut().ok_or(Error::SessionClosed)?;
        trace!(report_hex = format_args!("{:02X?}", &report[..8]), "TX");
        transport.write_report(report)
    }

    /// Release the handle. Idempotent.
    pub fn close(&mut self) {
        if self.transport.take().is_some() {
            info!(path = %self.path, "Device session closed");
        }
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::REPORT_LEN;
    use crate::transport::mock::{descriptor, MockHidBackend, MockTransport};

    #[test]
    fn open_and_read_write() {
        let backend = MockHidBackend::new(vec![descriptor("raw", 0x6E61, 0x6064, 0xFF60, 0x61)]);
        backend.transport.push_report(&[0x00, 0xF2, 0x01]);

        let mut session =
            DeviceSession::locate_and_open(&backend, &DeviceIdentity::default()).unwrap();
        assert_eq!(session.path(), "raw");

        match session.read(Duration::from_millis(100)).unwrap() {
            ReadOutcome::Report(report) => assert_eq!(report[1], 0xF2),
            ReadOutcome::TimedOut => panic!("expected a report"),
        }
        assert_eq!(
            session.read(Duration::from_millis(100)).unwrap(),
            ReadOutcome::TimedOut
        );

        session.write(&[0u8; REPORT_LEN]).unwrap();
        assert_eq!(backend.transport.writes().len(), 1);
    }

    #[test]
    fn open_failure_is_session_open_error() {
        let mut backend = MockHidBackend::new(vec![descriptor("raw", 0x6E61, 0x6064, 0xFF60, 0x61)]);
        backend.open_error = Some("permission denied".into());
        let err = DeviceSession::open(&backend, "raw").err().unwrap();
        assert!(matches!(err, Error::SessionOpen { .. }));
    }

    #[test]
    fn closed_session_rejects_io() {
        let mut session = DeviceSession::from_transport("raw", Box::new(MockTransport::new()));
        session.close();
        assert!(!session.is_open());
        assert!(matches!(
            session.read(Duration::from_millis(1)),
            Err(Error::SessionClosed)
        ));
        assert!(matches!(
            session.write(&[0u8; REPORT_LEN]),
            Err(Error::SessionClosed)
        ));
        // Second close is a no-op.
        session.close();
    }
}
