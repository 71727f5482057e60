//! The polling loop: read, decode, dispatch, repeat.
//!
//! Single-threaded per session. A tick performs one bounded read; the read's own
//! timeout is the only wait, so an idle loop never spins.

use crate::codec;
use crate::comm::{ErrorClass, SessionStatus};
use crate::error::{Error, Result};
use crate::registry::ControllerRegistry;
use crate::session::DeviceSession;
use crate::transport::ReadOutcome;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// Default read timeout per tick.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Loop state. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No report within the timeout.
    Idle,
    /// Report decoded and delivered to its controller (handler errors included).
    Dispatched,
    /// Report not for us: unknown group or no registered controller.
    Ignored,
    /// Read failed with a transient error; retried next tick.
    Retried,
    /// Loop is stopped; nothing was read.
    Stopped,
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub reads: u64,
    pub timeouts: u64,
    pub dispatched: u64,
    pub ignored: u64,
}

/// Cloneable handle that asks a running loop to stop after its current tick.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives one device session and its controllers.
pub struct EventLoop {
    session: DeviceSession,
    registry: ControllerRegistry,
    state: LoopState,
    poll_timeout: Duration,
    stop: StopHandle,
    stats: LoopStats,
    attached: bool,
}

impl EventLoop {
    pub fn new(session: DeviceSession, registry: ControllerRegistry) -> Self {
        let state = if session.is_open() {
            LoopState::Running
        } else {
            LoopState::Stopped
        };
        Self {
            session,
            registry,
            state,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            stop: StopHandle::default(),
            stats: LoopStats::default(),
            attached: false,
        }
    }

    /// Override the per-tick read timeout.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn registry(&self) -> &ControllerRegistry {
        &self.registry
    }

    /// Give every controller a chance to push its initial display state.
    /// Runs at most once; `tick` calls it implicitly.
    pub fn attach(&mut self) -> Result<()> {
        if self.attached || self.state == LoopState::Stopped {
            return Ok(());
        }
        self.attached = true;
        let result = self.registry.attach_all(&mut self.session);
        self.check(result)
    }

    /// Perform one read/decode/dispatch cycle.
    ///
    /// Returns `Err` only for session-fatal errors, after which the loop is stopped
    /// and the session closed.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        if self.state == LoopState::Stopped {
            return Ok(TickOutcome::Stopped);
        }
        if self.stop.is_stop_requested() {
            info!("Stop requested");
            self.shut_down();
            return Ok(TickOutcome::Stopped);
        }
        self.attach()?;

        self.stats.reads += 1;
        let outcome = match self.session.read(self.poll_timeout) {
            Ok(ReadOutcome::TimedOut) => {
                self.stats.timeouts += 1;
                trace!("Read timed out");
                TickOutcome::Idle
            }
            Ok(ReadOutcome::Report(raw)) => match codec::decode(&raw) {
                Some(frame) => match self.registry.dispatch(&frame, &mut self.session) {
                    Ok(false) => {
                        self.stats.ignored += 1;
                        TickOutcome::Ignored
                    }
                    Ok(true) => {
                        self.stats.dispatched += 1;
                        TickOutcome::Dispatched
                    }
                    Err(e) if ErrorClass::classify(&e).is_session_fatal() => {
                        return Err(self.fail(e));
                    }
                    Err(e) => {
                        // The frame reached its controller; only the handler failed.
                        warn!(group = %frame.group, error = %e, "Handler error ignored");
                        self.stats.dispatched += 1;
                        TickOutcome::Dispatched
                    }
                },
                None => {
                    debug!(tag = format_args!("0x{:02X}", raw[1]), "Report not for us");
                    self.stats.ignored += 1;
                    TickOutcome::Ignored
                }
            },
            Err(e) => {
                if ErrorClass::classify(&e).is_session_fatal() {
                    return Err(self.fail(e));
                }
                warn!(error = %e, "Transient read error");
                TickOutcome::Retried
            }
        };

        let result = self.registry.tick_all(Instant::now(), &mut self.session);
        self.check(result)?;
        Ok(outcome)
    }

    /// Tick until the loop stops. Returns `Ok` only for a requested stop.
    pub fn run(&mut self) -> Result<()> {
        info!(
            path = self.session.path(),
            controllers = self.registry.len(),
            "Event loop running"
        );
        while self.state == LoopState::Running {
            self.tick()?;
        }
        info!(stats = ?self.stats, "Event loop finished");
        Ok(())
    }

    /// Status to surface once the loop has returned.
    pub fn status_after(result: &Result<()>) -> SessionStatus {
        match result {
            Ok(()) => SessionStatus::Stopped,
            Err(e) => SessionStatus::from_error(e),
        }
    }

    /// Hook results: fatal errors stop the loop, others are logged and absorbed.
    fn check(&mut self, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(e) if ErrorClass::classify(&e).is_session_fatal() => Err(self.fail(e)),
            Err(e) => {
                warn!(error = %e, "Handler error ignored");
                Ok(())
            }
        }
    }

    fn fail(&mut self, e: Error) -> Error {
        error!(error = %e, "Session-fatal error, stopping event loop");
        self.shut_down();
        e
    }

    fn shut_down(&mut self) {
        self.state = LoopState::Stopped;
        self.session.close();
    }
}
