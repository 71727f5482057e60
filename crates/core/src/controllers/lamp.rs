//! Smart lamp control (group 0xF3).
//!
//! Rotation steps brightness, press toggles power. The lamp handle comes from
//! network discovery and is cached; an absent lamp is skipped silently.

use crate::cache::ResourceCache;
use crate::codec::Direction;
use crate::config::LampConfig;
use crate::display::DisplayWriter;
use crate::error::{BackendError, BackendResult, Result};
use crate::registry::Controller;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Full-scale brightness on the lamp's 16-bit scale.
pub const FULL_BRIGHTNESS: u16 = u16::MAX;

const LAMP_KEY: &str = "lamp";

/// Lamp backend. Implementations must bound their own network calls.
pub trait LampBackend {
    type Lamp: Clone;

    /// Discover the lamp to control. `None` if nothing answered.
    fn find_lamp(&mut self) -> Option<Self::Lamp>;

    fn brightness(&mut self, lamp: &Self::Lamp) -> BackendResult<u16>;

    fn set_brightness(
        &mut self,
        lamp: &Self::Lamp,
        brightness: u16,
        transition: Duration,
    ) -> BackendResult<()>;

    fn power(&mut self, lamp: &Self::Lamp) -> BackendResult<bool>;

    fn set_power(
        &mut self,
        lamp: &Self::Lamp,
        on: bool,
        transition: Duration,
    ) -> BackendResult<()>;
}

pub struct LampController<B: LampBackend> {
    backend: B,
    config: LampConfig,
    lamps: ResourceCache<&'static str, B::Lamp>,
}

/// Brightness after one detent, clamped to the configured range.
pub fn step_brightness(current: u16, direction: Direction, config: &LampConfig) -> u16 {
    let next = current as i32 + direction.sign() * config.brightness_step as i32;
    next.clamp(config.min_brightness as i32, config.max_brightness as i32) as u16
}

/// Brightness as a whole percentage of full scale.
pub fn brightness_percent(brightness: u16) -> u32 {
    brightness as u32 * 100 / FULL_BRIGHTNESS as u32
}

impl<B: LampBackend> LampController<B> {
    pub fn new(backend: B, config: LampConfig, ttl: Duration) -> Self {
        Self {
            backend,
            config,
            lamps: ResourceCache::new(ttl),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn lamp(&mut self) -> Option<B::Lamp> {
        let backend = &mut self.backend;
        self.lamps.get(&LAMP_KEY, |_| backend.find_lamp()).cloned()
    }

    fn adjust_brightness(&mut self, lamp: &B::Lamp, direction: Direction) -> BackendResult<u16> {
        let current = self.backend.brightness(lamp)?;
        let next = step_brightness(current, direction, &self.config);
        let transition = Duration::from_millis(self.config.brightness_transition_ms as u64);
        self.backend.set_brightness(lamp, next, transition)?;
        Ok(next)
    }

    fn toggle_power(&mut self, lamp: &B::Lamp) -> BackendResult<bool> {
        let on = !self.backend.power(lamp)?;
        let transition = Duration::from_millis(self.config.power_transition_ms as u64);
        self.backend.set_power(lamp, on, transition)?;
        Ok(on)
    }

    fn report_failure(&mut self, e: &BackendError, display: &mut DisplayWriter<'_>) -> Result<()> {
        warn!(error = %e, "Lamp action failed");
        if e.invalidates_target() {
            self.lamps.invalidate(&LAMP_KEY);
        }
        display.show_status("Lamp error")
    }
}

impl<B: LampBackend> Controller for LampController<B> {
    fn name(&self) -> &str {
        "lamp"
    }

    fn on_rotate(&mut self, direction: Direction, display: &mut DisplayWriter<'_>) -> Result<()> {
        let Some(lamp) = self.lamp() else {
            debug!("No lamp, brightness change skipped");
            return Ok(());
        };
        match self.adjust_brightness(&lamp, direction) {
            Ok(brightness) => {
                let percent = brightness_percent(brightness);
                info!(percent, "Lamp brightness");
                display.show_status(&format!("Brightness {percent}%"))
            }
            Err(e) => self.report_failure(&e, display),
        }
    }

    fn on_press(&mut self, display: &mut DisplayWriter<'_>) -> Result<()> {
        let Some(lamp) = self.lamp() else {
            debug!("No lamp, toggle skipped");
            return Ok(());
        };
        match self.toggle_power(&lamp) {
            Ok(on) => {
                info!(on, "Lamp power toggled");
                display.show_status(if on { "Lamp ON" } else { "Lamp OFF" })
            }
            Err(e) => self.report_failure(&e, display),
        }
    }
}
