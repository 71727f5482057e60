//! Controller registry: one handler per command group.

use crate::codec::{Command, CommandGroup, Direction, InboundFrame};
use crate::display::DisplayWriter;
use crate::error::Result;
use crate::session::DeviceSession;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info};

/// Handler capability for one controller family.
///
/// Every method returns only display/session errors. Backend failures are
/// handled inside the controller and must not be propagated.
pub trait Controller {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Encoder turned one detent.
    fn on_rotate(&mut self, direction: Direction, display: &mut DisplayWriter<'_>) -> Result<()>;

    /// Encoder button pressed.
    fn on_press(&mut self, display: &mut DisplayWriter<'_>) -> Result<()>;

    /// Family-specific command codes (0x04 and above).
    fn on_command(
        &mut self,
        code: u8,
        _payload: &[u8],
        _display: &mut DisplayWriter<'_>,
    ) -> Result<()> {
        debug!(controller = self.name(), code, "Unhandled command code");
        Ok(())
    }

    /// Called once when the event loop starts, before the first read.
    fn on_attach(&mut self, _display: &mut DisplayWriter<'_>) -> Result<()> {
        Ok(())
    }

    /// Called once per loop tick, after the read outcome has been handled.
    fn on_tick(&mut self, _now: Instant, _display: &mut DisplayWriter<'_>) -> Result<()> {
        Ok(())
    }
}

/// Static mapping from command group to controller.
#[derive(Default)]
pub struct ControllerRegistry {
    controllers: BTreeMap<CommandGroup, Box<dyn Controller>>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `controller` for `group`. A second registration replaces the first.
    pub fn register(&mut self, group: CommandGroup, controller: Box<dyn Controller>) {
        let name = controller.name().to_string();
        if let Some(old) = self.controllers.insert(group, controller) {
            info!(%group, replaced = old.name(), with = %name, "Controller replaced");
        } else {
            debug!(%group, controller = %name, "Controller registered");
        }
    }

    pub fn is_registered(&self, group: CommandGroup) -> bool {
        self.controllers.contains_key(&group)
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Registered groups in tag order.
    pub fn groups(&self) -> Vec<CommandGroup> {
        self.controllers.keys().copied().collect()
    }

    /// Route `frame` to its controller. Returns `Ok(false)` if no controller is registered.
    pub fn dispatch(&mut self, frame: &InboundFrame, session: &mut DeviceSession) -> Result<bool> {
        let Some(controller) = self.controllers.get_mut(&frame.group) else {
            debug!(group = %frame.group, code = frame.code, "No controller for group");
            return Ok(false);
        };
        let mut display = DisplayWriter::new(session, frame.group);
        match frame.command() {
            Command::Rotate(direction) => controller.on_rotate(direction, &mut display)?,
            Command::Press => controller.on_press(&mut display)?,
            Command::Extended(code) => controller.on_command(code, &frame.payload, &mut display)?,
        }
        Ok(true)
    }

    /// Run `on_attach` for every controller.
    pub fn attach_all(&mut self, session: &mut DeviceSession) -> Result<()> {
        for (group, controller) in self.controllers.iter_mut() {
            let mut display = DisplayWriter::new(session, *group);
            controller.on_attach(&mut display)?;
        }
        Ok(())
    }

    /// Run `on_tick` for every controller.
    pub fn tick_all(&mut self, now: Instant, session: &mut DeviceSession) -> Result<()> {
        for (group, controller) in self.controllers.iter_mut() {
            let mut display = DisplayWriter::new(session, *group);
            controller.on_tick(now, &mut display)?;
        }
        Ok(())
    }
}
