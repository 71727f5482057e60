//! System telemetry push (group 0xF0).
//!
//! The device never sends events for this group; the controller only uses the
//! loop tick to push a fresh sample at a fixed interval.

use crate::codec::{Direction, TelemetrySample};
use crate::display::DisplayWriter;
use crate::error::Result;
use crate::registry::Controller;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Source of CPU/GPU/ping readings. `None` skips this interval.
pub trait TelemetrySource {
    fn sample(&mut self) -> Option<TelemetrySample>;
}

pub struct TelemetryController<S> {
    source: S,
    interval: Duration,
    last_push: Option<Instant>,
    enabled: bool,
}

impl<S: TelemetrySource> TelemetryController<S> {
    pub fn new(source: S, interval: Duration) -> Self {
        Self {
            source,
            interval,
            last_push: None,
            enabled: true,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn due(&self, now: Instant) -> bool {
        match self.last_push {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }
}

impl<S: TelemetrySource> Controller for TelemetryController<S> {
    fn name(&self) -> &str {
        "telemetry"
    }

    fn on_rotate(&mut self, _direction: Direction, _display: &mut DisplayWriter<'_>) -> Result<()> {
        Ok(())
    }

    /// Pauses or resumes pushing.
    fn on_press(&mut self, _display: &mut DisplayWriter<'_>) -> Result<()> {
        self.enabled = !self.enabled;
        debug!(enabled = self.enabled, "Telemetry push toggled");
        Ok(())
    }

    fn on_tick(&mut self, now: Instant, display: &mut DisplayWriter<'_>) -> Result<()> {
        if !self.enabled || !self.due(now) {
            return Ok(());
        }
        self.last_push = Some(now);
        match self.source.sample() {
            Some(sample) => {
                trace!(?sample, "Telemetry push");
                display.show_telemetry(&sample)
            }
            None => {
                debug!("Telemetry sample unavailable");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_telemetry, CommandGroup};
    use crate::session::DeviceSession;
    use crate::transport::mock::MockTransport;

    struct Fixed(Option<TelemetrySample>);

    impl TelemetrySource for Fixed {
        fn sample(&mut self) -> Option<TelemetrySample> {
            self.0
        }
    }

    const SAMPLE: TelemetrySample = TelemetrySample {
        cpu: 12,
        gpu: 34,
        vram: 56,
        ping_ms: 20,
    };

    #[test]
    fn pushes_once_per_interval() {
        let mock = MockTransport::new();
        let mut session = DeviceSession::from_transport("mock", Box::new(mock.clone()));
        let mut display = DisplayWriter::new(&mut session, CommandGroup::Telemetry);
        let mut telemetry = TelemetryController::new(Fixed(Some(SAMPLE)), Duration::from_secs(1));

        let start = Instant::now();
        for ms in [0, 100, 500, 999, 1000, 1500, 2000] {
            telemetry
                .on_tick(start + Duration::from_millis(ms), &mut display)
                .unwrap();
        }
        let writes = mock.writes();
        assert_eq!(writes.len(), 3);
        assert_eq!(decode_telemetry(&writes[0]), Some(SAMPLE));
    }

    #[test]
    fn press_pauses_push() {
        let mock = MockTransport::new();
        let mut session = DeviceSession::from_transport("mock", Box::new(mock.clone()));
        let mut display = DisplayWriter::new(&mut session, CommandGroup::Telemetry);
        let mut telemetry = TelemetryController::new(Fixed(Some(SAMPLE)), Duration::from_secs(1));

        telemetry.on_press(&mut display).unwrap();
        assert!(!telemetry.is_enabled());
        telemetry.on_tick(Instant::now(), &mut display).unwrap();
        assert!(mock.writes().is_empty());
    }

    #[test]
    fn missing_sample_writes_nothing() {
        let mock = MockTransport::new();
        let mut session = DeviceSession::from_transport("mock", Box::new(mock.clone()));
        let mut display = DisplayWriter::new(&mut session, CommandGroup::Telemetry);
        let mut telemetry = TelemetryController::new(Fixed(None), Duration::from_secs(1));

        telemetry.on_tick(Instant::now(), &mut display).unwrap();
        assert!(mock.writes().is_empty());
    }
}
