//! Voice-chat participant control (group 0xF2).
//!
//! Rotation walks the participant list, press toggles server mute on the
//! selected participant. The list follows membership snapshots pushed by the
//! backend.

use crate::codec::Direction;
use crate::display::DisplayWriter;
use crate::error::{BackendResult, Result};
use crate::registry::Controller;
use crate::selection::{Identified, ReplaceOutcome, Selection};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::time::Instant;
use tracing::{debug, info, warn};

/// One member of a voice channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Stable account id. Display names can collide, ids cannot.
    pub id: u64,
    pub display_name: String,
    pub channel: String,
    pub bot: bool,
}

impl Participant {
    pub fn new(id: u64, display_name: &str, channel: &str) -> Self {
        Self {
            id,
            display_name: display_name.to_string(),
            channel: channel.to_string(),
            bot: false,
        }
    }
}

impl Identified for Participant {
    type Id = u64;

    fn id(&self) -> u64 {
        self.id
    }

    fn label(&self) -> &str {
        &self.display_name
    }
}

/// Voice-chat backend. Implementations must bound their own network calls.
pub trait VoiceBackend {
    /// Flip server mute for `participant`, returning the new state.
    fn toggle_mute(&mut self, participant: &Participant) -> BackendResult<bool>;
}

/// Receiving end of membership snapshots.
pub type MembershipFeed = Receiver<Vec<Participant>>;

/// Channel for pushing membership snapshots from the backend's event thread.
pub fn membership_channel() -> (Sender<Vec<Participant>>, MembershipFeed) {
    mpsc::channel()
}

pub struct VoiceController<B> {
    backend: B,
    selection: Selection<Participant>,
    feed: Option<MembershipFeed>,
}

impl<B: VoiceBackend> VoiceController<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            selection: Selection::new(),
            feed: None,
        }
    }

    /// Consume snapshots from `feed` on every tick.
    pub fn with_feed(mut self, feed: MembershipFeed) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn selection(&self) -> &Selection<Participant> {
        &self.selection
    }

    /// Apply a membership snapshot. Bots are dropped; an unchanged list writes nothing.
    pub fn apply_membership(
        &mut self,
        snapshot: Vec<Participant>,
        display: &mut DisplayWriter<'_>,
    ) -> Result<ReplaceOutcome> {
        let humans: Vec<Participant> = snapshot.into_iter().filter(|p| !p.bot).collect();
        let outcome = self.selection.replace(humans);
        if outcome == ReplaceOutcome::Unchanged {
            return Ok(outcome);
        }
        info!(
            count = self.selection.len(),
            index = ?self.selection.index(),
            "Voice participants updated"
        );
        self.show_current(display)?;
        Ok(outcome)
    }

    fn show_current(&self, display: &mut DisplayWriter<'_>) -> Result<()> {
        match (self.selection.index(), self.selection.current()) {
            (Some(index), Some(p)) => {
                display.show_selection(index, self.selection.len(), &p.display_name)
            }
            _ => display.show_selection(0, 0, ""),
        }
    }

    /// Latest pending snapshot, dropping older ones.
    fn drain_feed(&mut self) -> Option<Vec<Participant>> {
        let feed = self.feed.as_ref()?;
        let mut latest = None;
        let mut closed = false;
        loop {
            match feed.try_recv() {
                Ok(snapshot) => latest = Some(snapshot),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    closed = true;
                    break;
                }
            }
        }
        if closed {
            debug!("Membership feed closed");
            self.feed = None;
        }
        latest
    }
}

impl<B: VoiceBackend> Controller for VoiceController<B> {
    fn name(&self) -> &str {
        "voice"
    }

    fn on_rotate(&mut self, direction: Direction, display: &mut DisplayWriter<'_>) -> Result<()> {
        if self.selection.rotate(direction.sign()).is_none() {
            debug!("No participants to select");
            return Ok(());
        }
        self.show_current(display)
    }

    fn on_press(&mut self, display: &mut DisplayWriter<'_>) -> Result<()> {
        let Some(participant) = self.selection.current() else {
            debug!("Press with no participant selected");
            return Ok(());
        };
        match self.backend.toggle_mute(participant) {
            Ok(muted) => {
                info!(
                    participant = %participant.display_name,
                    muted,
                    "Mute toggled"
                );
                display.show_state(u8::from(muted))
            }
            Err(e) => {
                warn!(participant = %participant.display_name, error = %e, "Mute toggle failed");
                Ok(())
            }
        }
    }

    fn on_attach(&mut self, display: &mut DisplayWriter<'_>) -> Result<()> {
        if self.selection.is_empty() {
            return Ok(());
        }
        self.show_current(display)
    }

    fn on_tick(&mut self, _now: Instant, display: &mut DisplayWriter<'_>) -> Result<()> {
        if let Some(snapshot) = self.drain_feed() {
            self.apply_membership(snapshot, display)?;
        }
        Ok(())
    }
}
