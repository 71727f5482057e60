//! Integration tests: exercise the full flow using a simulated keyboard.
//!
//! These tests script a mock raw-HID transport, register real controllers with
//! fake backends, and drive the event loop through read→decode→dispatch→write.

#[cfg(test)]
mod tests {
    use crate::codec::{decode, decode_telemetry, CommandGroup, TelemetrySample};
    use crate::config::{BridgeConfig, LampConfig};
    use crate::controllers::lamp::fake::FakeLamp;
    use crate::controllers::voice::fake::{roster, FakeVoice};
    use crate::controllers::volume::fake::FakeMixer;
    use crate::controllers::{
        membership_channel, LampController, TelemetryController, TelemetrySource,
        VoiceController, VolumeController,
    };
    use crate::device::DeviceIdentity;
    use crate::event_loop::{EventLoop, LoopState, TickOutcome};
    use crate::registry::ControllerRegistry;
    use crate::session::DeviceSession;
    use crate::transport::mock::{descriptor, MockHidBackend, MockTransport};
    use std::time::Duration;

    fn open(mock: &MockTransport) -> DeviceSession {
        DeviceSession::from_transport("mock", Box::new(mock.clone()))
    }

    /// Voice controller preloaded with a three-person roster via the feed.
    fn voice_with_roster(names: &[&str]) -> VoiceController<FakeVoice> {
        let (tx, rx) = membership_channel();
        tx.send(roster(names)).unwrap();
        VoiceController::new(FakeVoice::default()).with_feed(rx)
    }

    /// Scenario A: clockwise on the voice family with three participants at index 0.
    #[test]
    fn voice_clockwise_selects_next_participant() {
        let mock = MockTransport::new();
        let mut registry = ControllerRegistry::new();
        registry.register(
            CommandGroup::Voice,
            Box::new(voice_with_roster(&["alice", "bob", "carol"])),
        );
        let mut lp = EventLoop::new(open(&mock), registry);

        // First tick: idle read, then the feed delivers the roster (one write).
        assert_eq!(lp.tick().unwrap(), TickOutcome::Idle);
        assert_eq!(mock.writes().len(), 1);

        mock.push_report(&[0x00, 0xF2, 0x01]);
        assert_eq!(lp.tick().unwrap(), TickOutcome::Dispatched);

        let writes = mock.writes();
        assert_eq!(writes.len(), 2);
        let frame = decode(&writes[1]).unwrap();
        assert_eq!(frame.group, CommandGroup::Voice);
        assert_eq!(frame.selection_fields(), (1, 3, "bob".to_string()));
    }

    /// Scenario B: lamp press while no lamp can be discovered.
    #[test]
    fn lamp_press_without_target_is_silent() {
        let mock = MockTransport::new();
        mock.push_report(&[0x00, 0xF3, 0x03]);
        mock.push_report(&[0x00, 0xF3, 0x03]);

        let lamp = FakeLamp {
            present: false,
            ..FakeLamp::default()
        };
        let mut registry = ControllerRegistry::new();
        registry.register(
            CommandGroup::Lamp,
            Box::new(LampController::new(lamp, LampConfig::default(), Duration::from_secs(5))),
        );
        let mut lp = EventLoop::new(open(&mock), registry);

        assert_eq!(lp.tick().unwrap(), TickOutcome::Dispatched);
        assert_eq!(lp.tick().unwrap(), TickOutcome::Dispatched);
        assert_eq!(lp.tick().unwrap(), TickOutcome::Idle);
        assert_eq!(lp.state(), LoopState::Running);
        assert!(mock.writes().is_empty());
        assert_eq!(mock.read_calls(), 3);
    }

    /// Scenario C: 50 consecutive timeouts.
    #[test]
    fn idle_loop_writes_nothing() {
        let mock = MockTransport::new();
        mock.push_timeouts(50);
        let mut registry = ControllerRegistry::new();
        registry.register(
            CommandGroup::Voice,
            Box::new(VoiceController::new(FakeVoice::default())),
        );
        registry.register(
            CommandGroup::Lamp,
            Box::new(LampController::new(
                FakeLamp::default(),
                LampConfig::default(),
                Duration::from_secs(5),
            )),
        );
        let mut lp = EventLoop::new(open(&mock), registry);

        for _ in 0..50 {
            assert_eq!(lp.tick().unwrap(), TickOutcome::Idle);
        }
        assert!(mock.writes().is_empty());
        assert_eq!(lp.state(), LoopState::Running);
        assert_eq!(lp.stats().timeouts, 50);
    }

    /// Scenario D: a failed write stops the loop and no further reads happen.
    #[test]
    fn write_failure_stops_loop() {
        let mock = MockTransport::new();
        let mut registry = ControllerRegistry::new();
        registry.register(
            CommandGroup::Voice,
            Box::new(voice_with_roster(&["alice", "bob", "carol"])),
        );
        let mut lp = EventLoop::new(open(&mock), registry);
        lp.tick().unwrap();
        let reads_before = mock.read_calls();

        mock.push_report(&[0x00, 0xF2, 0x01]);
        mock.push_report(&[0x00, 0xF2, 0x01]);
        mock.fail_next_writes(1);

        assert!(lp.run().is_err());
        assert_eq!(lp.state(), LoopState::Stopped);
        assert_eq!(mock.read_calls(), reads_before + 1);
        assert_eq!(lp.tick().unwrap(), TickOutcome::Stopped);
        assert_eq!(mock.read_calls(), reads_before + 1);
    }

    /// Attach pushes an existing selection before the first read.
    #[test]
    fn attach_pushes_initial_selection() {
        let mock = MockTransport::new();
        let mut voice = VoiceController::new(FakeVoice::default());
        {
            let mut scratch = open(&MockTransport::new());
            let mut display = crate::display::DisplayWriter::new(&mut scratch, CommandGroup::Voice);
            voice
                .apply_membership(roster(&["alice", "bob"]), &mut display)
                .unwrap();
        }
        let mut registry = ControllerRegistry::new();
        registry.register(CommandGroup::Voice, Box::new(voice));
        let mut lp = EventLoop::new(open(&mock), registry);

        lp.attach().unwrap();
        lp.attach().unwrap();
        let writes = mock.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(decode(&writes[0]).unwrap().selection_fields(), (0, 2, "alice".into()));
    }

    /// All four families share one session; each frame reaches only its controller.
    #[test]
    fn multiplexed_families_on_one_session() {
        struct Steady;
        impl TelemetrySource for Steady {
            fn sample(&mut self) -> Option<TelemetrySample> {
                Some(TelemetrySample {
                    cpu: 50,
                    gpu: 60,
                    vram: 70,
                    ping_ms: 15,
                })
            }
        }

        let config = BridgeConfig {
            volume: crate::config::VolumeConfig {
                game_names: vec!["cs2".into()],
                ..Default::default()
            },
            ..BridgeConfig::default()
        };
        let mock = MockTransport::new();
        let mut registry = ControllerRegistry::new();
        registry.register(
            CommandGroup::Telemetry,
            Box::new(TelemetryController::new(Steady, Duration::from_secs(3600))),
        );
        registry.register(
            CommandGroup::Volume,
            Box::new(VolumeController::new(
                FakeMixer::with_sessions(&[(1, "Discord.exe", 0.5), (2, "cs2.exe", 0.5)]),
                config.volume.clone(),
                config.cache_ttl(),
            )),
        );
        registry.register(
            CommandGroup::Lamp,
            Box::new(LampController::new(
                FakeLamp::default(),
                config.lamp.clone(),
                config.cache_ttl(),
            )),
        );
        registry.register(
            CommandGroup::Voice,
            Box::new(voice_with_roster(&["alice", "bob"])),
        );
        let mut lp = EventLoop::new(open(&mock), registry).with_poll_timeout(config.poll_timeout());

        mock.push_report(&[0x00, 0xF1, 0x01]); // volume CW: no frame
        mock.push_report(&[0x00, 0xF3, 0x03]); // lamp press: "Lamp OFF"
        mock.push_report(&[0x00, 0xF2, 0x02]); // voice CCW: selection 1/2
        mock.push_report(&[0x00, 0x99, 0x01]); // foreign tag: ignored
        for _ in 0..4 {
            lp.tick().unwrap();
        }

        let writes = mock.writes();
        // tick 1: volume (no frame), telemetry push, voice roster
        assert_eq!(decode_telemetry(&writes[0]).map(|s| s.cpu), Some(50));
        assert_eq!(decode(&writes[1]).unwrap().selection_fields(), (0, 2, "alice".into()));
        // tick 2: lamp status
        let lamp = decode(&writes[2]).unwrap();
        assert_eq!(lamp.group, CommandGroup::Lamp);
        assert_eq!(crate::codec::text_from_payload(&lamp.payload), "Lamp OFF");
        // tick 3: voice selection wraps backwards
        assert_eq!(decode(&writes[3]).unwrap().selection_fields(), (1, 2, "bob".into()));
        assert_eq!(writes.len(), 4);

        let stats = lp.stats();
        assert_eq!(stats.dispatched, 3);
        assert_eq!(stats.ignored, 1);
    }

    /// Locate, open, and run against a mock backend end to end.
    #[test]
    fn locate_open_and_dispatch() {
        let backend = MockHidBackend::new(vec![
            descriptor("kbd", 0x6E61, 0x6064, 0x0001, 0x06),
            descriptor("raw", 0x6E61, 0x6064, 0xFF60, 0x61),
        ]);
        backend.transport.push_report(&[0x00, 0xF3, 0x01]);
        let session = DeviceSession::locate_and_open(&backend, &DeviceIdentity::default()).unwrap();
        assert_eq!(session.path(), "raw");

        let mut registry = ControllerRegistry::new();
        registry.register(
            CommandGroup::Lamp,
            Box::new(LampController::new(
                FakeLamp::default(),
                LampConfig::default(),
                Duration::from_secs(5),
            )),
        );
        let mut lp = EventLoop::new(session, registry);
        assert_eq!(lp.tick().unwrap(), TickOutcome::Dispatched);
        let frame = decode(&backend.transport.writes()[0]).unwrap();
        assert_eq!(crate::codec::text_from_payload(&frame.payload), "Brightness 60%");
    }
}
