//! Chat/game volume balance (group 0xF1).
//!
//! Clockwise raises the game and lowers the chat app, counter-clockwise the
//! reverse. Press resets master to 100% and both apps to the balance level.
//! Both audio sessions are resolved by process-name match and cached.

use crate::cache::ResourceCache;
use crate::codec::Direction;
use crate::config::VolumeConfig;
use crate::display::DisplayWriter;
use crate::error::{BackendError, BackendResult, Result};
use crate::registry::Controller;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One application's audio session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSession {
    pub id: u32,
    pub process_name: String,
}

/// OS mixer backend.
pub trait AudioBackend {
    /// First session whose process name contains `name_part`, case-insensitive.
    fn find_session(&mut self, name_part: &str) -> Option<AudioSession>;

    fn session_volume(&mut self, session: &AudioSession) -> BackendResult<f32>;

    fn set_session_volume(
        &mut self,
        session: &AudioSession,
        volume: f32,
    ) -> BackendResult<()>;

    fn set_master_volume(&mut self, volume: f32) -> BackendResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Role {
    Chat,
    Game,
}

/// Whether `process_name` is the chat app itself (e.g. `Discord.exe` for `discord`).
pub fn is_chat_process(process_name: &str, chat_app: &str) -> bool {
    let lower = process_name.to_lowercase();
    let stem = lower.split('.').next().unwrap_or_default();
    stem == chat_app.to_lowercase()
}

/// First configured game that resolves to a session other than the chat app.
pub fn resolve_game<B: AudioBackend + ?Sized>(
    backend: &mut B,
    config: &VolumeConfig,
) -> Option<AudioSession> {
    let chat = config.chat_app.to_lowercase();
    config
        .game_names
        .iter()
        .filter(|name| name.to_lowercase() != chat)
        .filter_map(|name| backend.find_session(name))
        .find(|session| !is_chat_process(&session.process_name, &chat))
}

pub struct VolumeController<B> {
    backend: B,
    config: VolumeConfig,
    sessions: ResourceCache<Role, AudioSession>,
}

impl<B: AudioBackend> VolumeController<B> {
    pub fn new(backend: B, config: VolumeConfig, ttl: Duration) -> Self {
        Self {
            backend,
            config,
            sessions: ResourceCache::new(ttl),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn session(&mut self, role: Role) -> Option<AudioSession> {
        let backend = &mut self.backend;
        let config = &self.config;
        self.sessions
            .get(&role, |role| match role {
                Role::Chat => backend.find_session(&config.chat_app),
                Role::Game => resolve_game(backend, config),
            })
            .cloned()
    }

    fn both_sessions(&mut self) -> Option<(AudioSession, AudioSession)> {
        let chat = self.session(Role::Chat);
        let game = self.session(Role::Game);
        match (chat, game) {
            (Some(chat), Some(game)) => Some((chat, game)),
            (None, _) => {
                debug!(app = %self.config.chat_app, "Chat audio session not found");
                None
            }
            (_, None) => {
                debug!("Game audio session not found");
                None
            }
        }
    }

    fn shift(
        &mut self,
        chat: &AudioSession,
        game: &AudioSession,
        direction: Direction,
    ) -> BackendResult<(f32, f32)> {
        let delta = direction.sign() as f32 * self.config.step;
        let chat_vol = (self.backend.session_volume(chat)? - delta).clamp(0.0, 1.0);
        let game_vol = (self.backend.session_volume(game)? + delta).clamp(0.0, 1.0);
        self.backend.set_session_volume(chat, chat_vol)?;
        self.backend.set_session_volume(game, game_vol)?;
        Ok((chat_vol, game_vol))
    }

    fn balance(
        &mut self,
        chat: &AudioSession,
        game: &AudioSession,
    ) -> BackendResult<()> {
        let level = self.config.balance_level;
        self.backend.set_master_volume(1.0)?;
        self.backend.set_session_volume(chat, level)?;
        self.backend.set_session_volume(game, level)?;
        Ok(())
    }

    fn absorb(&mut self, e: BackendError) {
        warn!(error = %e, "Volume action failed");
        if e.invalidates_target() {
            self.sessions.clear();
        }
    }
}

impl<B: AudioBackend> Controller for VolumeController<B> {
    fn name(&self) -> &str {
        "volume"
    }

    fn on_rotate(&mut self, direction: Direction, _display: &mut DisplayWriter<'_>) -> Result<()> {
        let Some((chat, game)) = self.both_sessions() else {
            return Ok(());
        };
        match self.shift(&chat, &game, direction) {
            Ok((chat_vol, game_vol)) => info!(
                chat = format_args!("{:.0}%", chat_vol * 100.0),
                game = format_args!("{:.0}%", game_vol * 100.0),
                "Volumes shifted"
            ),
            Err(e) => self.absorb(e),
        }
        Ok(())
    }

    fn on_press(&mut self, _display: &mut DisplayWriter<'_>) -> Result<()> {
        let Some((chat, game)) = self.both_sessions() else {
            return Ok(());
        };
        match self.balance(&chat, &game) {
            Ok(()) => info!(level = self.config.balance_level, "Volumes balanced"),
            Err(e) => self.absorb(e),
        }
        Ok(())
    }
}
