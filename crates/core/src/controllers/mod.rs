//! Controller families, one per command group.
//!
//! Each controller owns its state and talks to the outside world only through
//! its backend trait. Backend failures stop at the controller.

pub mod lamp;
pub mod telemetry;
pub mod voice;
pub mod volume;

pub use lamp::{LampBackend, LampController};
pub use telemetry::{TelemetryController, TelemetrySource};
pub use voice::{membership_channel, MembershipFeed, Participant, VoiceBackend, VoiceController};
pub use volume::{AudioBackend, AudioSession, VolumeController};
